//! What a typed buffer stores and how its slots are shaped.

use std::fmt::{Debug, Display};

use contracts::{BufferError, FrameFormat, TransformChannel, TransformSample, VideoFrame};

/// Slot layout of a typed buffer.
///
/// A format decides how every slot payload is allocated and whether a given
/// payload still fits. Changing a buffer's format reallocates all slots.
pub trait ItemFormat: Clone + PartialEq + Display + Debug + Send + 'static {
    /// Per-slot payload
    type Payload: Clone + Default + Debug + Send + 'static;

    /// Short kind label for logs and metrics
    const KIND: &'static str;

    /// Empty payload laid out for this format
    fn allocate(&self) -> Self::Payload;

    /// Whether `payload` is laid out for this format
    fn describes(&self, payload: &Self::Payload) -> bool;

    /// Reject formats no slot can be allocated for
    fn check(&self) -> Result<(), BufferError> {
        Ok(())
    }
}

impl ItemFormat for FrameFormat {
    type Payload = VideoFrame;

    const KIND: &'static str = "video";

    fn allocate(&self) -> VideoFrame {
        VideoFrame::allocate(*self)
    }

    fn describes(&self, payload: &VideoFrame) -> bool {
        payload.format == *self && payload.data.len() == self.frame_bytes()
    }

    fn check(&self) -> Result<(), BufferError> {
        if self.is_empty() {
            return Err(BufferError::invalid_format(self, "frame has no pixels"));
        }
        if self.checked_frame_bytes().is_none() {
            return Err(BufferError::invalid_format(self, "frame size overflows"));
        }
        Ok(())
    }
}

impl ItemFormat for TransformChannel {
    type Payload = TransformSample;

    const KIND: &'static str = "tracker";

    fn allocate(&self) -> TransformSample {
        TransformSample {
            channel: self.clone(),
            ..Default::default()
        }
    }

    fn describes(&self, payload: &TransformSample) -> bool {
        payload.channel == *self
    }
}
