use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{0} is not supported by this data source")]
    Unsupported(&'static str),
    #[error("state lock poisoned")]
    StateLock,
}

impl AppError {
    /// True for failures worth routing through a fallback source rather
    /// than surfacing to the user.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Http(_))
    }
}
