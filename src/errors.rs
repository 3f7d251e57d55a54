use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Config(String),

    #[error("{0}")]
    Credentials(String),

    #[error("{0}")]
    SecretStore(String),

    #[error("{0}")]
    Report(String),

    #[error("{0}")]
    Io(String),
}
