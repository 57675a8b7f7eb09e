use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Unknown role: {0}")]
    UnknownRole(String),

    #[error("Unknown article status: {0}")]
    UnknownStatus(String),

    #[error("Title must contain at least one word character")]
    EmptySlug,
}
