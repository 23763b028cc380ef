use thiserror::Error;

#[derive(Error, Debug)]
pub enum LeadScoutError {
    #[error("planning error: {0}")]
    Planning(String),

    #[error("adapter error: {0}")]
    Adapter(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, LeadScoutError>;
