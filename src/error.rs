use thiserror::Error;

#[derive(Debug, Error)]
pub enum WbxmlError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("schema error for {type_name}: {reason}")]
    Schema {
        type_name: &'static str,
        reason: String,
    },
    #[error("unexpected end of input")]
    UnexpectedEof,
    #[error("malformed token {0:#04x}")]
    MalformedToken(u8),
    #[error("element content is not a decimal integer: {0:?}")]
    ContentFormat(String),
    #[error("element content is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),
    #[error("decoded value does not match the record schema")]
    SlotMismatch,
}

pub type Result<T> = std::result::Result<T, WbxmlError>;
