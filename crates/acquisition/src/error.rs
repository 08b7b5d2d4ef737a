//! Acquisition errors

use contracts::{BufferError, ContractError, SourceId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AcquisitionError {
    /// Configuration could not be applied
    #[error(transparent)]
    Config(#[from] ContractError),

    /// A buffer refused its setup
    #[error("buffer '{buffer_id}' setup failed: {source}")]
    Buffer {
        buffer_id: SourceId,
        #[source]
        source: BufferError,
    },

    /// No buffer with this id
    #[error("unknown buffer '{0}'")]
    UnknownBuffer(String),

    /// Device thread could not be spawned or was started twice
    #[error("device '{device_id}': {message}")]
    Device { device_id: SourceId, message: String },
}

impl AcquisitionError {
    pub fn buffer(buffer_id: &SourceId, source: BufferError) -> Self {
        Self::Buffer {
            buffer_id: buffer_id.clone(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, AcquisitionError>;
