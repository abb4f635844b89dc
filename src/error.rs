
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExchequerError {
    #[error("Config error: {0}")]
    Config(String),
    #[error("Persistence error: {0}")]
    Persistence(String),
    #[error("Record corruption: {message}")]
    Corruption { message: String },
    #[error("Not a wrappable resource: {0}")]
    Unwrappable(String),
    #[error("Invalid worth: {0}")]
    InvalidWorth(f64),
    #[error("Parse error: {message}")]
    Parse { message: String, command: Option<usize> },
    #[error("Execution error: {0}")]
    Execution(String),
    #[error("Lock poisoned: {0}")]
    Lock(String),
}

pub type Result<T> = std::result::Result<T, ExchequerError>;

// Helper conversions
impl From<std::io::Error> for ExchequerError {
    fn from(e: std::io::Error) -> Self { Self::Persistence(e.to_string()) }
}
impl From<serde_json::Error> for ExchequerError {
    fn from(e: serde_json::Error) -> Self { Self::Corruption { message: e.to_string() } }
}
