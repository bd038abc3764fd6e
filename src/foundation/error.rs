pub type PaintboxResult<T> = Result<T, PaintboxError>;

#[derive(thiserror::Error, Debug)]
pub enum PaintboxError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("expression error: {0}")]
    Expression(String),

    #[error("serialization error: {0}")]
    Serde(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PaintboxError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn expression(msg: impl Into<String>) -> Self {
        Self::Expression(msg.into())
    }

    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}
