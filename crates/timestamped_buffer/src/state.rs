//! Buffer lifecycle.
//!
//! ```text
//! Uninitialized --set_format--> FormatSet --start--> Streaming <--pause/resume--> Paused
//!        \_______________________\______________________\__________________\--close--> Closed
//! ```

use std::fmt;

use contracts::BufferError;

/// Lifecycle state of a typed buffer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum StreamState {
    #[default]
    Uninitialized,
    FormatSet,
    Streaming,
    Paused,
    Closed,
}

impl StreamState {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamState::Uninitialized => "uninitialized",
            StreamState::FormatSet => "format_set",
            StreamState::Streaming => "streaming",
            StreamState::Paused => "paused",
            StreamState::Closed => "closed",
        }
    }

    /// Whether producers may write
    #[inline]
    pub fn accepts_writes(&self) -> bool {
        matches!(self, StreamState::Streaming)
    }

    /// State after a format was applied
    pub fn on_set_format(self) -> Result<Self, BufferError> {
        match self {
            StreamState::Uninitialized | StreamState::FormatSet => Ok(StreamState::FormatSet),
            StreamState::Paused => Ok(StreamState::Paused),
            _ => Err(BufferError::invalid_state("set format", self)),
        }
    }

    pub fn on_start(self) -> Result<Self, BufferError> {
        match self {
            StreamState::FormatSet | StreamState::Paused => Ok(StreamState::Streaming),
            StreamState::Uninitialized => Err(BufferError::FormatNotSet),
            _ => Err(BufferError::invalid_state("start", self)),
        }
    }

    pub fn on_pause(self) -> Result<Self, BufferError> {
        match self {
            StreamState::Streaming => Ok(StreamState::Paused),
            _ => Err(BufferError::invalid_state("pause", self)),
        }
    }

    pub fn on_resume(self) -> Result<Self, BufferError> {
        match self {
            StreamState::Paused => Ok(StreamState::Streaming),
            _ => Err(BufferError::invalid_state("resume", self)),
        }
    }

    /// Resizing and clearing are configuration changes
    pub fn check_reconfigure(self, operation: &'static str) -> Result<(), BufferError> {
        match self {
            StreamState::Streaming | StreamState::Closed => {
                Err(BufferError::invalid_state(operation, self))
            }
            _ => Ok(()),
        }
    }
}

impl fmt::Display for StreamState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
