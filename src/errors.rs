use std::fmt;

/// Custom error type for the query builder, including specific error codes.
///
/// The SQL generator itself never returns this type; it degrades to advisory
/// text instead. Everything around it (store, saved queries, commands,
/// assistant) reports failures through these variants.
#[derive(Debug)]
pub enum Error {
    /// I/O-related error (e.g., file operations).
    /// Error code: 1000
    Io(std::io::Error),
    /// Key-value store error (e.g., unreadable data directory).
    /// Error code: 2000
    Storage(String),
    /// Command or column spec syntax error.
    /// Error code: 3000
    Syntax(String),
    /// Value encoding/decoding error.
    /// Error code: 4000
    Serialization(String),
    /// Referenced column or saved query does not exist.
    /// Error code: 5000
    NotFound(String),
    /// Assistant collaborator failed or is not configured.
    /// Error code: 6000
    Assistant(String),
    /// Invalid operation (e.g., saving an advisory placeholder).
    /// Error code: 7000
    InvalidOperation(String),
    /// Miscellaneous uncategorized error.
    /// Error code: 9000
    Other(String),
}

impl Error {
    /// Returns the error code associated with this error variant.
    ///
    /// # Examples
    /// ```
    /// let err = Error::Syntax("Unknown command".to_string());
    /// assert_eq!(err.code(), 3000);
    /// ```
    pub fn code(&self) -> u32 {
        match self {
            Error::Io(_) => 1000,
            Error::Storage(_) => 2000,
            Error::Syntax(_) => 3000,
            Error::Serialization(_) => 4000,
            Error::NotFound(_) => 5000,
            Error::Assistant(_) => 6000,
            Error::InvalidOperation(_) => 7000,
            Error::Other(_) => 9000,
        }
    }

    /// Returns a human-readable error category for this error variant.
    pub fn category(&self) -> &'static str {
        match self {
            Error::Io(_) => "I/O",
            Error::Storage(_) => "Storage",
            Error::Syntax(_) => "Syntax",
            Error::Serialization(_) => "Serialization",
            Error::NotFound(_) => "Not Found",
            Error::Assistant(_) => "Assistant",
            Error::InvalidOperation(_) => "Invalid Operation",
            Error::Other(_) => "Other",
        }
    }

    /// Returns the bare message without the code prefix.
    pub fn message(&self) -> String {
        match self {
            Error::Io(e) => e.to_string(),
            Error::Storage(msg)
            | Error::Syntax(msg)
            | Error::Serialization(msg)
            | Error::NotFound(msg)
            | Error::Assistant(msg)
            | Error::InvalidOperation(msg)
            | Error::Other(msg) => msg.clone(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "[{}] I/O Error: {}", self.code(), e),
            Error::Storage(msg) => write!(f, "[{}] Storage Error: {}", self.code(), msg),
            Error::Syntax(msg) => write!(f, "[{}] Syntax Error: {}", self.code(), msg),
            Error::Serialization(msg) => {
                write!(f, "[{}] Serialization Error: {}", self.code(), msg)
            }
            Error::NotFound(msg) => write!(f, "[{}] Not Found: {}", self.code(), msg),
            Error::Assistant(msg) => write!(f, "[{}] Assistant Error: {}", self.code(), msg),
            Error::InvalidOperation(msg) => {
                write!(f, "[{}] Invalid Operation: {}", self.code(), msg)
            }
            Error::Other(msg) => write!(f, "[{}] Unknown Error: {}", self.code(), msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<std::string::FromUtf8Error> for Error {
    fn from(err: std::string::FromUtf8Error) -> Self {
        Error::Serialization(format!("UTF-8 conversion error: {}", err))
    }
}

impl From<bincode::error::EncodeError> for Error {
    fn from(err: bincode::error::EncodeError) -> Self {
        Error::Serialization(format!("Failed to encode value: {}", err))
    }
}

impl From<bincode::error::DecodeError> for Error {
    fn from(err: bincode::error::DecodeError) -> Self {
        Error::Serialization(format!("Failed to decode value: {}", err))
    }
}

/// Convenience macro to create an `Error` with a formatted message.
///
/// # Examples
/// ```
/// let err = err!(NotFound, "No column at position {}", 3);
/// assert_eq!(err.code(), 5000);
/// assert_eq!(err.to_string(), "[5000] Not Found: No column at position 3");
/// ```
#[macro_export]
macro_rules! err {
    ($variant:ident, $msg:expr) => {
        $crate::errors::Error::$variant($msg.to_string())
    };
    ($variant:ident, $fmt:expr, $($arg:tt)*) => {
        $crate::errors::Error::$variant(format!($fmt, $($arg)*))
    };
}
