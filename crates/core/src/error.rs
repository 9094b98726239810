#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Invalid booking reference: {0}")]
    InvalidPnr(String),

    #[error("Validation failed: {0}")]
    Validation(String),
}

impl From<validator::ValidationErrors> for CoreError {
    fn from(errors: validator::ValidationErrors) -> Self {
        CoreError::Validation(errors.to_string())
    }
}
