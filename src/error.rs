//! Error and warning types returned by the encoders and the raster layer.

use thiserror::Error;

/// Warning: an option was invalid and has been ignored or replaced.
pub const WARN_INVALID_OPTION: i32 = 2;
/// Warning: an ECI was added automatically to encode the input.
pub const WARN_USES_ECI: i32 = 3;
/// Warning: the symbol was produced but does not meet its standard.
pub const WARN_NONCOMPLIANT: i32 = 4;
/// Any return value at or above this is an error, below it the symbol is usable.
pub const ERROR_THRESHOLD: i32 = 5;
pub const ERROR_TOO_LONG: i32 = 5;
pub const ERROR_INVALID_DATA: i32 = 6;
pub const ERROR_INVALID_CHECK: i32 = 7;
pub const ERROR_INVALID_OPTION: i32 = 8;
pub const ERROR_ENCODING_PROBLEM: i32 = 9;

/// The category of a fatal error, used when building an [Error] from a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    TooLong,
    InvalidData,
    InvalidCheck,
    InvalidOption,
    EncodingProblem,
}

impl ErrorKind {
    pub const fn code(self) -> i32 {
        match self {
            ErrorKind::TooLong => ERROR_TOO_LONG,
            ErrorKind::InvalidData => ERROR_INVALID_DATA,
            ErrorKind::InvalidCheck => ERROR_INVALID_CHECK,
            ErrorKind::InvalidOption => ERROR_INVALID_OPTION,
            ErrorKind::EncodingProblem => ERROR_ENCODING_PROBLEM,
        }
    }

    /// Wrap a formatted diagnostic into the matching [Error] variant.
    pub fn with_message(self, message: String) -> Error {
        match self {
            ErrorKind::TooLong => Error::TooLong(message),
            ErrorKind::InvalidData => Error::InvalidData(message),
            ErrorKind::InvalidCheck => Error::InvalidCheck(message),
            ErrorKind::InvalidOption => Error::InvalidOption(message),
            ErrorKind::EncodingProblem => Error::EncodingProblem(message),
        }
    }
}

/// A fatal encoding or rendering error. The message is the same text stored
/// in the symbol's `errtxt`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Input needs more codewords or characters than allowed.
    #[error("{0}")]
    TooLong(String),
    /// A character or value failed a class or range check.
    #[error("{0}")]
    InvalidData(String),
    /// A supplied check digit does not match the computed one.
    #[error("{0}")]
    InvalidCheck(String),
    /// An option is outside of its legal range.
    #[error("{0}")]
    InvalidOption(String),
    /// Internal invariant violation.
    #[error("{0}")]
    EncodingProblem(String),
}

impl Error {
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Error::TooLong(_) => ErrorKind::TooLong,
            Error::InvalidData(_) => ErrorKind::InvalidData,
            Error::InvalidCheck(_) => ErrorKind::InvalidCheck,
            Error::InvalidOption(_) => ErrorKind::InvalidOption,
            Error::EncodingProblem(_) => ErrorKind::EncodingProblem,
        }
    }

    /// Integer severity, always `>= ERROR_THRESHOLD`.
    pub const fn code(&self) -> i32 {
        self.kind().code()
    }

    pub fn message(&self) -> &str {
        match self {
            Error::TooLong(m)
            | Error::InvalidData(m)
            | Error::InvalidCheck(m)
            | Error::InvalidOption(m)
            | Error::EncodingProblem(m) => m,
        }
    }
}

/// A non-fatal condition: the symbol is still usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Warning {
    InvalidOption,
    UsesEci,
    NonCompliant,
}

impl Warning {
    pub const fn code(self) -> i32 {
        match self {
            Warning::InvalidOption => WARN_INVALID_OPTION,
            Warning::UsesEci => WARN_USES_ECI,
            Warning::NonCompliant => WARN_NONCOMPLIANT,
        }
    }

    /// Keep the more severe of two warnings.
    pub fn max(a: Option<Warning>, b: Option<Warning>) -> Option<Warning> {
        match (a, b) {
            (Some(x), Some(y)) => Some(if y.code() > x.code() { y } else { x }),
            (x, None) => x,
            (None, y) => y,
        }
    }
}

/// Map an encode result onto the integer severity scale.
pub fn severity(result: &Result<Option<Warning>>) -> i32 {
    match result {
        Ok(None) => 0,
        Ok(Some(w)) => w.code(),
        Err(e) => e.code(),
    }
}

pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_disjoint() {
        for w in [Warning::InvalidOption, Warning::UsesEci, Warning::NonCompliant] {
            assert!(w.code() < ERROR_THRESHOLD);
        }
        for k in [ErrorKind::TooLong, ErrorKind::InvalidData, ErrorKind::InvalidCheck,
                ErrorKind::InvalidOption, ErrorKind::EncodingProblem] {
            assert!(k.code() >= ERROR_THRESHOLD);
            assert_eq!(k.with_message(String::new()).kind(), k);
        }
    }

    #[test]
    fn test_warning_max() {
        assert_eq!(Warning::max(Some(Warning::UsesEci), Some(Warning::NonCompliant)), Some(Warning::NonCompliant));
        assert_eq!(Warning::max(Some(Warning::UsesEci), None), Some(Warning::UsesEci));
        assert_eq!(Warning::max(None, None), None);
    }

    #[test]
    fn test_severity() {
        assert_eq!(severity(&Ok(None)), 0);
        assert_eq!(severity(&Ok(Some(Warning::UsesEci))), WARN_USES_ECI);
        assert_eq!(severity(&Err(Error::TooLong("x".into()))), ERROR_TOO_LONG);
        assert_eq!(Error::InvalidData("msg".into()).to_string(), "msg");
    }
}
