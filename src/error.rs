//! SecretKey Error Types
//!
//! 라이브러리 전역 에러 타입 정의

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// secretkey 라이브러리 에러
#[derive(Error, Debug)]
pub enum SecretKeyError {
    #[error("Improperly configured: {0}")]
    MissingConfiguration(String),

    #[error("The SECRET_KEY_FILE '{}' already exists.", .0.display())]
    AlreadyExists(PathBuf),

    #[error("The secret key file '{}' does not exist.", .0.display())]
    NotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid key length '{0}'")]
    InvalidLength(i64),

    #[error("A signature already exists for {0}.")]
    SignatureExists(String),

    #[error("The {0} setting is read-only")]
    ReadOnlyAttribute(&'static str),

    #[error("Signature does not match the current secret key")]
    SignatureInvalid,

    #[error(
        "The database used to store the signature is not ready. \
         You may need to run 'secretkey migrate' first."
    )]
    SchemaNotReady,

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, SecretKeyError>;

/// 명령 응답용 직렬화 가능한 에러
#[derive(Debug, Serialize)]
pub struct CommandError {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
}

impl CommandError {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        CommandError {
            code: code.to_string(),
            message: message.into(),
            details: None,
        }
    }
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(details) = &self.details {
            write!(f, "\n\n{}", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for CommandError {}

impl From<SecretKeyError> for CommandError {
    fn from(error: SecretKeyError) -> Self {
        let code = match &error {
            SecretKeyError::MissingConfiguration(_) => "MISSING_CONFIGURATION",
            SecretKeyError::AlreadyExists(_) => "ALREADY_EXISTS",
            SecretKeyError::NotFound(_) => "NOT_FOUND",
            SecretKeyError::Io(_) => "IO_ERROR",
            SecretKeyError::InvalidLength(_) => "INVALID_LENGTH",
            SecretKeyError::SignatureExists(_) => "SIGNATURE_EXISTS",
            SecretKeyError::ReadOnlyAttribute(_) => "READ_ONLY_ATTRIBUTE",
            SecretKeyError::SignatureInvalid => "SIGNATURE_INVALID",
            SecretKeyError::SchemaNotReady => "SCHEMA_NOT_READY",
            SecretKeyError::Database(_) => "DB_ERROR",
        };

        CommandError {
            code: code.to_string(),
            message: error.to_string(),
            details: None,
        }
    }
}

/// 명령 결과 타입
pub type CommandResult<T> = std::result::Result<T, CommandError>;
