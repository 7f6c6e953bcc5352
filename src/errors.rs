use thiserror::Error;

/// The result type used throughout this crate.
pub type Result<T> = std::result::Result<T, RedError>;

/// The error type returned by every fallible entry point in this crate.
///
/// The source is boxed so that `Result<T, RedError>` stays small regardless of which
/// variant is in play.
#[derive(Error, Debug)]
pub struct RedError {
    /// The kind of error that occurred.
    pub source: Box<RedErrorKind>,
}

impl RedError {
    /// Wrap a `RedErrorKind` in a `RedError`.
    pub fn new(kind: RedErrorKind) -> Self {
        RedError {
            source: Box::new(kind),
        }
    }

    /// A malformed regex, glob, or brace count, at the given byte position.
    pub fn parse(pos: usize, msg: impl Into<String>) -> Self {
        Self::new(RedErrorKind::Parse {
            pos,
            msg: msg.into(),
        })
    }

    /// Caller misuse: bad result value, empty buffer, unknown pattern language, ...
    pub fn api(msg: impl Into<String>) -> Self {
        Self::new(RedErrorKind::Api(msg.into()))
    }

    /// A budget or format capacity was exceeded.
    pub fn limit(msg: impl Into<String>) -> Self {
        Self::new(RedErrorKind::Limit(msg.into()))
    }

    /// An internal invariant of the minimizer was violated.
    pub fn minimize(msg: impl Into<String>) -> Self {
        Self::new(RedErrorKind::Minimize(msg.into()))
    }

    /// Overflow while computing an on-disk offset.
    pub fn serialize(msg: impl Into<String>) -> Self {
        Self::new(RedErrorKind::Serialize(msg.into()))
    }

    /// A serialized program failed to validate, or an unsupported format was requested.
    pub fn exec(msg: impl Into<String>) -> Self {
        Self::new(RedErrorKind::Exec(msg.into()))
    }

    /// An assertion reachable only on a bug in this crate.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(RedErrorKind::Internal(msg.into()))
    }
}

impl std::fmt::Display for RedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.source)
    }
}

/// The closed taxonomy of error kinds this crate can raise.
#[derive(Error, Debug)]
pub enum RedErrorKind {
    /// Scanner or parser detected malformed input; carries the byte position.
    #[error("parse error at byte {pos}: {msg}")]
    Parse {
        /// Byte offset into the pattern text where the error was detected.
        pos: usize,
        /// Human-readable description.
        msg: String,
    },

    /// Caller misuse: result <= 0, empty buffer, unrecognised pattern language, ...
    #[error("api misuse: {0}")]
    Api(String),

    /// Budget exhausted, result too large for any format, too many states, ...
    #[error("limit exceeded: {0}")]
    Limit(String),

    /// Internal invariant violated during partition refinement.
    #[error("minimizer invariant violated: {0}")]
    Minimize(String),

    /// Overflow while computing an on-disk offset.
    #[error("serialization error: {0}")]
    Serialize(String),

    /// Unsupported format, bad magic, bad checksum, or bad version in a serialized image.
    #[error("exec error: {0}")]
    Exec(String),

    /// An assertion failure reachable only on a source bug.
    #[error("internal error: {0}")]
    Internal(String),
}
