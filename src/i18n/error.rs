//! Error types for catalog loading and plural-rule parsing.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading, decoding or encoding a message catalog.
///
/// These never cross the controller boundary: the controller logs them and
/// reports a failed load (or drops the file) instead.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported catalog format: {0}")]
    UnsupportedFormat(String),

    #[error("invalid MO magic number {0:#010x}")]
    InvalidMagic(u32),

    #[error("unsupported MO revision {0}")]
    UnsupportedRevision(u32),

    #[error("catalog truncated while reading {0}")]
    Truncated(&'static str),

    #[error("catalog contains invalid UTF-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error("invalid JSON catalog: {0}")]
    Json(#[from] serde_json::Error),

    #[error("JSON catalog has no locale_data for any domain")]
    MissingLocaleData,

    #[error("catalog could not be decoded: {0}")]
    Decode(String),
}

/// Errors raised while parsing a `plural=` expression.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PluralParseError {
    #[error("unexpected character '{0}' in plural expression")]
    UnexpectedChar(char),

    #[error("unexpected token {0} in plural expression")]
    UnexpectedToken(String),

    #[error("plural expression ended unexpectedly")]
    UnexpectedEnd,

    #[error("integer literal out of range in plural expression")]
    LiteralOverflow,
}

/// Errors raised while validating a locale identifier.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LocaleError {
    #[error("locale identifier is empty")]
    Empty,

    #[error("invalid locale identifier '{0}' (expected e.g. en_US or pt_BR_formal)")]
    Invalid(String),
}
