//! Error types for the streaming engine
//!
//! Errors are organized by domain for better diagnostics:
//! - [`ConfigError`]: Parameter validation, unknown control codes, allocation
//! - [`ControllerError`]: Peripheral handshake and DMA submission failures
//! - [`StreamError`]: State machine and session failures
//!
//! The unified [`Error`] enum wraps all domain errors and is returned
//! by most engine methods.
//!
//! Ring buffer overruns and underruns are not errors. They are counted in
//! [`StreamStats::missed_chunks`](crate::StreamStats) and never surfaced.

// =============================================================================
// Configuration Errors
// =============================================================================

/// Configuration and control-surface errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Tunable or argument out of range; the previous value is kept
    InvalidParameter,
    /// Unknown control code
    UnsupportedOperation,
    /// Ring or cyclic buffer allocation failed
    OutOfMemory,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ConfigError {
    /// Returns a human-readable description of the error
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ConfigError::InvalidParameter => "invalid parameter",
            ConfigError::UnsupportedOperation => "unsupported operation",
            ConfigError::OutOfMemory => "out of memory",
        }
    }
}

// =============================================================================
// Controller Errors
// =============================================================================

/// Hardware transfer controller errors
///
/// Every controller failure is recovered to an idle peripheral before it is
/// reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControllerError {
    /// Peripheral kept its enable flag set past the disable timeout
    DisableTimeout,
    /// Peripheral never reported active after start
    DidNotStart,
    /// Cyclic DMA descriptor could not be prepared or submitted
    SubmissionFailed,
}

impl core::fmt::Display for ControllerError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ControllerError {
    /// Returns a human-readable description of the error
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ControllerError::DisableTimeout => "peripheral disable timed out",
            ControllerError::DidNotStart => "peripheral did not start",
            ControllerError::SubmissionFailed => "cyclic DMA submission failed",
        }
    }

    /// Whether this is a bounded-wait timeout on the peripheral status
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(
            self,
            ControllerError::DisableTimeout | ControllerError::DidNotStart
        )
    }
}

// =============================================================================
// Stream Errors
// =============================================================================

/// State machine and session errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StreamError {
    /// Peripheral still active, or a session is already open; retry later
    Busy,
    /// Blocking acquisition aborted by an interrupt signal
    Interrupted,
    /// No session is open
    NotOpen,
}

impl core::fmt::Display for StreamError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl StreamError {
    /// Returns a human-readable description of the error
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            StreamError::Busy => "resource busy",
            StreamError::Interrupted => "interrupted",
            StreamError::NotOpen => "stream not open",
        }
    }
}

// =============================================================================
// Unified Error Type
// =============================================================================

/// This enum wraps all domain-specific errors for unified error handling.
///
/// ```ignore
/// match session.set_state(StreamState::RxChannel0) {
///     Err(Error::Stream(StreamError::Busy)) => { /* retry */ }
///     Err(e) if e.is_hardware_timeout() => { /* peripheral stuck */ }
///     _ => {}
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Configuration error
    Config(ConfigError),
    /// Controller error
    Controller(ControllerError),
    /// Stream error
    Stream(StreamError),
}

impl Error {
    /// Whether the caller should retry because the hardware is still busy
    #[must_use]
    pub const fn is_busy(&self) -> bool {
        matches!(self, Error::Stream(StreamError::Busy))
    }

    /// Whether a bounded wait on the peripheral status expired
    #[must_use]
    pub const fn is_hardware_timeout(&self) -> bool {
        match self {
            Error::Controller(e) => e.is_timeout(),
            _ => false,
        }
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::Config(e) => write!(f, "config: {}", e.as_str()),
            Error::Controller(e) => write!(f, "controller: {}", e.as_str()),
            Error::Stream(e) => write!(f, "stream: {}", e.as_str()),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

impl From<ControllerError> for Error {
    fn from(e: ControllerError) -> Self {
        Error::Controller(e)
    }
}

impl From<StreamError> for Error {
    fn from(e: StreamError) -> Self {
        Error::Stream(e)
    }
}

/// Result type alias for engine operations
pub type Result<T> = core::result::Result<T, Error>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = core::result::Result<T, ConfigError>;

/// Result type alias for controller operations
pub type ControllerResult<T> = core::result::Result<T, ControllerError>;

/// Result type alias for stream operations
pub type StreamResult<T> = core::result::Result<T, StreamError>;

// =============================================================================
// Unit Tests
// =============================================================================
