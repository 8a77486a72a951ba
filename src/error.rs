//! Error types for the core. Each failure domain gets its own small struct
//! rather than a single umbrella enum.
use std::fmt;

/// Raised by [`crate::config::Config::parse`] on an unknown key, an
/// unknown enum-valued option, or a missing required argument. Fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError(pub String);

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "config error: {}", self.0)
    }
}
impl std::error::Error for ConfigError {}

/// Raised by genome/builder construction on structural violations
/// (parameter count mismatch, forward edge with non-increasing depth). Fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TryFromGenomeBuilderError(pub &'static str);

impl fmt::Display for TryFromGenomeBuilderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid genome builder state: {}", self.0)
    }
}
impl std::error::Error for TryFromGenomeBuilderError {}

/// Raised when a mutation or crossover result has an output unreachable from
/// every enabled input. Not fatal to the strategy: the caller discards the
/// candidate and retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputsUnreachableError;

impl fmt::Display for OutputsUnreachableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "candidate genome has an unreachable output")
    }
}
impl std::error::Error for OutputsUnreachableError {}

/// Raised when a serialized genome stream is shorter than its declared
/// lengths, or otherwise malformed. Fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeserializeError(pub String);

impl fmt::Display for DeserializeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "deserialize error: {}", self.0)
    }
}
impl std::error::Error for DeserializeError {}

/// Raised when repopulation is configured to draw from two distinct other
/// filled islands but fewer than two exist. A configuration bug, fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmptyParentPoolError;

impl fmt::Display for EmptyParentPoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "repopulation requires at least two filled islands, found fewer"
        )
    }
}
impl std::error::Error for EmptyParentPoolError {}
