//! Layered error definitions
//!
//! Categorized by path: item lookup (consumer) / buffer write (producer) / config

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ItemUid;

// ===== Lookup (consumer path) =====

/// Flat status of a lookup, used for log fields and metric labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Ok,
    NotAvailableYet,
    NotAvailableAnymore,
    UnknownError,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Ok => "ok",
            ItemStatus::NotAvailableYet => "not_available_yet",
            ItemStatus::NotAvailableAnymore => "not_available_anymore",
            ItemStatus::UnknownError => "unknown_error",
        }
    }
}

/// Why a uid or time could not be resolved to a buffered item.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ItemError {
    /// Requested uid/time is newer than anything produced so far
    #[error("item not available yet")]
    NotAvailableYet,

    /// Requested uid/time was overwritten by newer items
    #[error("item not available anymore")]
    NotAvailableAnymore,

    /// Anything that is not a plain range miss
    #[error("item lookup failed: {message}")]
    Unknown { message: String },
}

impl ItemError {
    pub fn unknown(message: impl Into<String>) -> Self {
        Self::Unknown {
            message: message.into(),
        }
    }

    pub fn status(&self) -> ItemStatus {
        match self {
            ItemError::NotAvailableYet => ItemStatus::NotAvailableYet,
            ItemError::NotAvailableAnymore => ItemStatus::NotAvailableAnymore,
            ItemError::Unknown { .. } => ItemStatus::UnknownError,
        }
    }
}

/// Status of an arbitrary lookup result.
pub fn lookup_status<T>(result: &Result<T, ItemError>) -> ItemStatus {
    match result {
        Ok(_) => ItemStatus::Ok,
        Err(e) => e.status(),
    }
}

// ===== Write / configuration (producer path) =====

/// How a buffer error should be treated by the acquisition loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Expected during normal streaming (same frame delivered twice)
    Transient,
    /// Caller handed in something that does not fit the buffer setup
    Configuration,
    /// Acquisition should stop
    Fatal,
}

/// Errors raised by buffer writes and buffer configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BufferError {
    /// Filtered timestamp does not advance past the latest committed item
    #[error("timestamp {timestamp} is not newer than latest item ({latest})")]
    DuplicateTimestamp { timestamp: f64, latest: f64 },

    /// NaN or infinite timestamp
    #[error("invalid timestamp: {timestamp}")]
    InvalidTimestamp { timestamp: f64 },

    /// Payload format differs from the buffer format
    #[error("format mismatch: buffer expects {expected}, got {actual}")]
    FormatMismatch { expected: String, actual: String },

    /// No format configured yet
    #[error("buffer format has not been set")]
    FormatNotSet,

    /// Format cannot describe any item (zero-sized or oversized frames)
    #[error("unusable buffer format {format}: {message}")]
    InvalidFormat { format: String, message: String },

    /// Requested capacity is unusable
    #[error("invalid buffer size: {requested}")]
    InvalidBufferSize { requested: usize },

    /// Operation not allowed in the current lifecycle state
    #[error("cannot {operation} while buffer is {state}")]
    InvalidState {
        operation: &'static str,
        state: String,
    },

    /// Producer handed in no data at all
    #[error("empty payload")]
    EmptyPayload,

    /// Producer handed in fewer bytes than the format requires
    #[error("payload too short: need {required} bytes, got {actual}")]
    PayloadTooShort { required: usize, actual: usize },

    /// Payload content is unusable (e.g. non-finite transform)
    #[error("invalid payload: {message}")]
    InvalidPayload { message: String },
}

impl BufferError {
    pub fn invalid_state(operation: &'static str, state: impl ToString) -> Self {
        Self::InvalidState {
            operation,
            state: state.to_string(),
        }
    }

    pub fn format_mismatch(expected: impl ToString, actual: impl ToString) -> Self {
        Self::FormatMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    pub fn invalid_format(format: impl ToString, message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            format: format.to_string(),
            message: message.into(),
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            BufferError::DuplicateTimestamp { .. } => ErrorSeverity::Transient,
            BufferError::InvalidTimestamp { .. }
            | BufferError::FormatMismatch { .. }
            | BufferError::FormatNotSet
            | BufferError::InvalidFormat { .. }
            | BufferError::InvalidBufferSize { .. }
            | BufferError::InvalidState { .. } => ErrorSeverity::Configuration,
            BufferError::EmptyPayload
            | BufferError::PayloadTooShort { .. }
            | BufferError::InvalidPayload { .. } => ErrorSeverity::Fatal,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.severity() == ErrorSeverity::Transient
    }

    /// Short label for metrics
    pub fn reason(&self) -> &'static str {
        match self {
            BufferError::DuplicateTimestamp { .. } => "duplicate_timestamp",
            BufferError::InvalidTimestamp { .. } => "invalid_timestamp",
            BufferError::FormatMismatch { .. } => "format_mismatch",
            BufferError::FormatNotSet => "format_not_set",
            BufferError::InvalidFormat { .. } => "invalid_format",
            BufferError::InvalidBufferSize { .. } => "invalid_buffer_size",
            BufferError::InvalidState { .. } => "invalid_state",
            BufferError::EmptyPayload => "empty_payload",
            BufferError::PayloadTooShort { .. } => "payload_too_short",
            BufferError::InvalidPayload { .. } => "invalid_payload",
        }
    }
}

/// Uid assigned to an accepted write, or the reason it was refused.
pub type AddResult = Result<ItemUid, BufferError>;

// ===== Configuration =====

/// Configuration / IO errors
#[derive(Debug, Error)]
pub enum ContractError {
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    /// Buffer setup rejected while applying configuration
    #[error("buffer '{buffer_id}' rejected configuration: {source}")]
    BufferSetup {
        buffer_id: String,
        #[source]
        source: BufferError,
    },

    /// Device could not be started or stopped
    #[error("device '{device_id}' error: {message}")]
    Device { device_id: String, message: String },

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ContractError {
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn device(device_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Device {
            device_id: device_id.into(),
            message: message.into(),
        }
    }

    pub fn buffer_setup(buffer_id: impl Into<String>, source: BufferError) -> Self {
        Self::BufferSetup {
            buffer_id: buffer_id.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_timestamp_is_transient() {
        let err = BufferError::DuplicateTimestamp {
            timestamp: 5.0,
            latest: 5.0,
        };
        assert!(err.is_transient());
        assert_eq!(err.reason(), "duplicate_timestamp");
    }

    #[test]
    fn test_severity_classes() {
        assert_eq!(
            BufferError::format_mismatch("640x480x1@8", "320x240x1@8").severity(),
            ErrorSeverity::Configuration
        );
        assert_eq!(BufferError::EmptyPayload.severity(), ErrorSeverity::Fatal);
        assert_eq!(
            BufferError::InvalidBufferSize { requested: 0 }.severity(),
            ErrorSeverity::Configuration
        );
    }

    #[test]
    fn test_lookup_status() {
        let ok: Result<u64, ItemError> = Ok(3);
        assert_eq!(lookup_status(&ok), ItemStatus::Ok);
        let gone: Result<u64, ItemError> = Err(ItemError::NotAvailableAnymore);
        assert_eq!(lookup_status(&gone), ItemStatus::NotAvailableAnymore);
        assert_eq!(ItemError::unknown("nan").status(), ItemStatus::UnknownError);
    }

    #[test]
    fn test_invalid_format_is_configuration() {
        let err = BufferError::invalid_format("0x2x1@8bpp", "frame has no pixels");
        assert_eq!(err.severity(), ErrorSeverity::Configuration);
        assert_eq!(err.reason(), "invalid_format");
        assert!(err.to_string().contains("0x2x1@8bpp"));
    }
}
