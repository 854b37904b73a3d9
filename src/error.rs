//! Crate-wide error type.
//!
//! The variants map onto the error kinds in the design: cache failures are
//! always recovered locally by callers in this crate (never surfaced to a
//! recognition caller), store failures in read paths surface, store failures
//! in write paths surface after the cursor scope has rolled back.

use uuid::Uuid;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("fingerprint store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("fingerprint store error (transient, rolled back): {0}")]
    StoreTransient(#[source] diesel::result::Error),

    #[error("hash cache unavailable: {0}")]
    CacheUnavailable(#[source] redis::RedisError),

    #[error("song already exists: {0}")]
    DuplicateSong(Uuid),

    #[error("not found")]
    NotFound,
}

impl From<diesel::result::Error> for Error {
    fn from(e: diesel::result::Error) -> Self {
        match e {
            diesel::result::Error::NotFound => Error::NotFound,
            other => Error::StoreTransient(other),
        }
    }
}

impl From<diesel::ConnectionError> for Error {
    fn from(e: diesel::ConnectionError) -> Self {
        Error::StoreUnavailable(e.to_string())
    }
}

impl From<redis::RedisError> for Error {
    fn from(e: redis::RedisError) -> Self {
        Error::CacheUnavailable(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
