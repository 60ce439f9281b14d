//! Error types for gravity-init

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GravityError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Decoding error: {0}")]
    DecodingError(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),

    #[error("Invalid instruction: {0}")]
    InvalidInstruction(String),

    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    #[error("Signature error: {0}")]
    SignatureError(String),

    #[error("Buffer too small: needed {needed} bytes, got {available}")]
    BufferTooSmall {
        needed: usize,
        available: usize,
    },

    #[error("Blockhash fetch failed: {message} (endpoint: {endpoint})")]
    BlockhashFetch {
        endpoint: String,
        message: String,
    },

    #[error("Submission failed: {message} (endpoint: {endpoint}, code: {code:?})")]
    Submission {
        endpoint: String,
        message: String,
        code: Option<i64>,
    },
}

impl From<std::io::Error> for GravityError {
    fn from(err: std::io::Error) -> Self {
        GravityError::SerializationError(err.to_string())
    }
}

impl From<bs58::decode::Error> for GravityError {
    fn from(err: bs58::decode::Error) -> Self {
        GravityError::DecodingError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, GravityError>;
