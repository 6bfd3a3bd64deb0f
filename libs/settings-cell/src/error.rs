use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Setting not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<anyhow::Error> for SettingsError {
    fn from(e: anyhow::Error) -> Self {
        SettingsError::Database(e.to_string())
    }
}
