#![allow(missing_docs)]
use miette::Diagnostic;
use thiserror::Error;

/// A `Result` typedef to use with the [`CacheError`] type
pub type Result<T> = std::result::Result<T, CacheError>;

/// A generic “error” for the HTTP caching layer
#[derive(Error, Diagnostic, Debug)]
#[non_exhaustive]
pub enum CacheError {
    #[error(transparent)]
    #[diagnostic(code(http_client_cache::general))]
    General(#[from] anyhow::Error),
    #[error(transparent)]
    #[diagnostic(code(http_client_cache::io_error))]
    IoError(#[from] std::io::Error),
    #[error(transparent)]
    #[diagnostic(code(http_client_cache::http_error))]
    HttpError(#[from] http::Error),
    #[error(transparent)]
    #[diagnostic(code(http_client_cache::invalid_status_code))]
    InvalidStatusCode(#[from] http::status::InvalidStatusCode),
    #[error(transparent)]
    #[diagnostic(code(http_client_cache::header_to_str_error))]
    HeaderToStrError(#[from] http::header::ToStrError),
    #[error(transparent)]
    #[diagnostic(code(http_client_cache::invalid_method))]
    InvalidMethod(#[from] http::method::InvalidMethod),
    #[error(transparent)]
    #[diagnostic(code(http_client_cache::invalid_uri))]
    InvalidUri(#[from] http::uri::InvalidUri),
    #[error(transparent)]
    #[diagnostic(code(http_client_cache::invalid_header_value))]
    InvalidHeaderValue(#[from] http::header::InvalidHeaderValue),
    #[error(transparent)]
    #[diagnostic(code(http_client_cache::invalid_header_name))]
    InvalidHeaderName(#[from] http::header::InvalidHeaderName),
    #[cfg(feature = "storage-cacache")]
    #[error(transparent)]
    #[diagnostic(code(http_client_cache::cacache_error))]
    CaCacheError(#[from] cacache::Error),
    #[cfg(feature = "storage-cacache")]
    #[error(transparent)]
    #[diagnostic(code(http_client_cache::serialization_error))]
    SerializationError(#[from] Box<bincode::ErrorKind>),
    #[error("stored body of {size} bytes exceeds the configured {limit} byte limit")]
    #[diagnostic(code(http_client_cache::resource_size_exceeded))]
    ResourceSizeExceeded {
        /// Bytes seen before the producer was cut off.
        size: u64,
        /// Configured maximum object size.
        limit: u64,
    },
    #[error("revalidation queue is full")]
    #[diagnostic(code(http_client_cache::scheduler_rejected))]
    SchedulerRejected,
    #[error("scheduler is shut down")]
    #[diagnostic(code(http_client_cache::scheduler_shutdown))]
    SchedulerShutdown,
    #[error("storage backend failure: {0}")]
    #[diagnostic(code(http_client_cache::storage_error))]
    StorageError(String),
    #[error("error parsing header value")]
    #[diagnostic(code(http_client_cache::bad_header))]
    BadHeader,
    #[error("request URI is not an absolute http(s) URL")]
    #[diagnostic(code(http_client_cache::bad_request_uri))]
    BadRequestUri,
}
