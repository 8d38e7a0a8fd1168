use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Missing or malformed label/path supplied by the caller.
    #[error("validation error: {0}")]
    Validation(String),
    /// Duplicate path, or a referenced parent that does not exist.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Move target is the moved node itself or one of its descendants.
    #[error("bad move: {0}")]
    BadMove(String),
    /// The store rejected rows whose path is inconsistent with their parent link.
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),
    #[error("storage error: {0}")]
    Storage(String),
}

impl Error {
    /// Integrity failures raised by the store rather than by input validation.
    pub fn is_integrity(&self) -> bool {
        matches!(self, Error::Conflict(_) | Error::ConstraintViolation(_))
    }
}
