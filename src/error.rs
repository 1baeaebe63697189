//! Unified error type.

use std::fmt;

/// Error currency for middleware constructors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The error returned when a chain fails to materialize.
///
/// There is exactly one way for composition to fail: a constructor refuses to
/// wrap the handler it was given. The error remembers which constructor that
/// was (its position in the chain, counting from zero) and keeps the
/// constructor's own error as [`source`](std::error::Error::source).
#[derive(Debug)]
pub struct Error {
    index: usize,
    source: BoxError,
}

impl Error {
    pub(crate) fn construct(index: usize, source: BoxError) -> Self {
        Self { index, source }
    }

    /// Position of the failing constructor within the chain.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Consumes the error, returning what the constructor reported.
    pub fn into_source(self) -> BoxError {
        self.source
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "middleware #{}: {}", self.index, self.source)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&*self.source)
    }
}
