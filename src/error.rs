use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Resource already exists: {0}")]
    AlreadyExists(String),

    #[error("Write conflict on {0}")]
    Conflict(String),

    #[error("Store unavailable: {0}")]
    Transient(String),

    #[error("Invalid resource: {0}")]
    Invalid(String),

    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Classifies an API server failure for the object described by `target`.
    ///
    /// Status codes the engine reacts to get their own variant; anything else
    /// stays wrapped so the original cause is kept for the error policy.
    pub fn from_kube(err: kube::Error, target: impl Into<String>) -> Self {
        let target = target.into();
        match err {
            kube::Error::Api(ae) => match ae.code {
                404 => Error::NotFound(target),
                409 if ae.reason == "AlreadyExists" => Error::AlreadyExists(target),
                409 => Error::Conflict(target),
                400 | 422 => Error::Invalid(format!("{}: {}", target, ae.message)),
                429 | 500..=599 => Error::Transient(format!("{}: {}", target, ae.message)),
                _ => Error::Kube(kube::Error::Api(ae)),
            },
            other => Error::Kube(other),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, Error::AlreadyExists(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Conflict(_))
    }

    /// Network and availability failures; the dispatcher's backoff is expected
    /// to clear these.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Transient(_) => true,
            Error::Kube(kube::Error::Api(_)) => false,
            Error::Kube(_) | Error::Io(_) => true,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
