//! Video frame buffers.

use contracts::{AddResult, BufferError, FrameFormat, RawFrame, TimingSample};

use crate::facade::{ItemFacade, ItemTiming};

/// Buffer of fixed-format image frames
pub type VideoBuffer = ItemFacade<FrameFormat>;

impl ItemFacade<FrameFormat> {
    /// Store a frame with caller-supplied timestamps.
    ///
    /// Rows are repacked when the producer's row stride differs from the
    /// packed row size, and `skip_bytes` of header are ignored.
    pub fn add_frame(
        &self,
        frame: &RawFrame<'_>,
        unfiltered_timestamp: f64,
        filtered_timestamp: f64,
        frame_number: Option<i64>,
    ) -> AddResult {
        self.commit(
            ItemTiming::Stamped {
                unfiltered: unfiltered_timestamp,
                filtered: filtered_timestamp,
            },
            frame_number,
            |format| validate_frame(format, frame),
            |format, payload| copy_rows(format, frame, &mut payload.data),
        )
    }

    /// Store a frame, deriving the filtered timestamp from `sample`
    pub fn add_frame_with_filtering(&self, frame: &RawFrame<'_>, sample: TimingSample) -> AddResult {
        self.commit(
            ItemTiming::Sample(sample),
            sample.frame_number,
            |format| validate_frame(format, frame),
            |format, payload| copy_rows(format, frame, &mut payload.data),
        )
    }
}

fn validate_frame(format: &FrameFormat, frame: &RawFrame<'_>) -> Result<(), BufferError> {
    if frame.data.is_empty() {
        return Err(BufferError::EmptyPayload);
    }
    if !format.matches(frame.size, frame.bits_per_pixel) {
        return Err(BufferError::format_mismatch(format, frame.format()));
    }
    let row_bytes = format.bytes_per_row();
    if frame.stride() < row_bytes {
        return Err(BufferError::InvalidPayload {
            message: format!(
                "row stride {} is shorter than a row ({row_bytes} bytes)",
                frame.stride()
            ),
        });
    }
    let required = frame.required_len().ok_or_else(|| BufferError::InvalidPayload {
        message: format!(
            "frame geometry overflows (stride {}, skip {} bytes)",
            frame.stride(),
            frame.skip_bytes
        ),
    })?;
    if frame.data.len() < required {
        return Err(BufferError::PayloadTooShort {
            required,
            actual: frame.data.len(),
        });
    }
    Ok(())
}

/// Copy `frame` into the packed slot buffer. Bounds are checked by
/// [`validate_frame`].
fn copy_rows(format: &FrameFormat, frame: &RawFrame<'_>, out: &mut [u8]) {
    let row_bytes = format.bytes_per_row();
    let stride = frame.stride();
    let src = &frame.data[frame.skip_bytes..];

    if stride == row_bytes {
        let len = format.frame_bytes();
        out[..len].copy_from_slice(&src[..len]);
        return;
    }

    for (row, dst) in out.chunks_exact_mut(row_bytes).enumerate() {
        let start = row * stride;
        dst.copy_from_slice(&src[start..start + row_bytes]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::ItemError;

    fn streaming(format: FrameFormat, capacity: usize) -> VideoBuffer {
        let buffer = VideoBuffer::new("us", capacity).unwrap();
        buffer.set_frame_format(format).unwrap();
        buffer.start().unwrap();
        buffer
    }

    #[test]
    fn test_packed_frame_round_trip() {
        let format = FrameFormat::planar(4, 2, 8);
        let buffer = streaming(format, 3);
        let pixels: Vec<u8> = (0..8).collect();

        let uid = buffer
            .add_frame(&RawFrame::packed(&pixels, [4, 2, 1], 8), 1.0, 1.0, Some(10))
            .unwrap();
        let item = buffer.get_item(uid).unwrap();
        assert_eq!(item.payload.data, pixels);
        assert_eq!(item.payload.format, format);
        assert_eq!(item.index, Some(10));
    }

    #[test]
    fn test_padded_rows_with_header_are_repacked() {
        let format = FrameFormat::planar(3, 2, 8);
        let buffer = streaming(format, 2);
        // 2 header bytes, rows of 3 pixels padded to 5 bytes
        let data = [0xAA, 0xAA, 1, 2, 3, 0, 0, 4, 5, 6, 0, 0];
        let frame = RawFrame::packed(&data, [3, 2, 1], 8)
            .with_skip_bytes(2)
            .with_row_stride(5);

        let uid = buffer.add_frame(&frame, 1.0, 1.0, None).unwrap();
        assert_eq!(buffer.get_item(uid).unwrap().payload.data, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_last_row_padding_is_optional() {
        let buffer = streaming(FrameFormat::planar(2, 2, 8), 2);
        let data = [1, 2, 9, 3, 4];
        let frame = RawFrame::packed(&data, [2, 2, 1], 8).with_row_stride(3);
        assert!(buffer.add_frame(&frame, 1.0, 1.0, None).is_ok());
    }

    #[test]
    fn test_format_mismatch_rejected() {
        let buffer = streaming(FrameFormat::planar(4, 2, 8), 2);
        let pixels = [0u8; 16];
        let err = buffer
            .add_frame(&RawFrame::packed(&pixels, [4, 2, 1], 16), 1.0, 1.0, None)
            .unwrap_err();
        assert!(matches!(err, BufferError::FormatMismatch { .. }));
        assert_eq!(buffer.next_uid(), 0);
    }

    #[test]
    fn test_short_and_empty_payloads_rejected() {
        let buffer = streaming(FrameFormat::planar(4, 2, 8), 2);
        let short = [0u8; 7];
        assert_eq!(
            buffer.add_frame(&RawFrame::packed(&short, [4, 2, 1], 8), 1.0, 1.0, None),
            Err(BufferError::PayloadTooShort {
                required: 8,
                actual: 7
            })
        );
        assert_eq!(
            buffer.add_frame(&RawFrame::packed(&[], [4, 2, 1], 8), 1.0, 1.0, None),
            Err(BufferError::EmptyPayload)
        );
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_stride_shorter_than_row_rejected() {
        let buffer = streaming(FrameFormat::planar(4, 2, 8), 2);
        let pixels = [0u8; 16];
        let frame = RawFrame::packed(&pixels, [4, 2, 1], 8).with_row_stride(3);
        assert!(matches!(
            buffer.add_frame(&frame, 1.0, 1.0, None),
            Err(BufferError::InvalidPayload { .. })
        ));
    }

    #[test]
    fn test_empty_format_refused() {
        let buffer = VideoBuffer::new("us", 2).unwrap();
        assert!(matches!(
            buffer.set_frame_format(FrameFormat::planar(0, 2, 8)),
            Err(BufferError::InvalidFormat { .. })
        ));
        assert!(buffer.format().is_none());

        // writes still need a format, so nothing can be reserved
        assert!(buffer.start().is_err());
        let frame = RawFrame::packed(&[1, 2, 3], [0, 2, 1], 8).with_row_stride(3);
        assert!(matches!(
            buffer.add_frame(&frame, 1.0, 1.0, None),
            Err(BufferError::InvalidState { .. })
        ));
        assert_eq!(buffer.next_uid(), 0);
    }

    #[test]
    fn test_overflowing_geometry_rejected_before_reserving() {
        let buffer = streaming(FrameFormat::planar(2, 2, 8), 2);
        let pixels = [0u8; 4];
        for frame in [
            RawFrame::packed(&pixels, [2, 2, 1], 8).with_row_stride(usize::MAX),
            RawFrame::packed(&pixels, [2, 2, 1], 8).with_skip_bytes(usize::MAX),
        ] {
            assert!(matches!(
                buffer.add_frame(&frame, 1.0, 1.0, None),
                Err(BufferError::InvalidPayload { .. })
            ));
        }
        assert_eq!(buffer.next_uid(), 0);
        assert_eq!(buffer.get_item(0), Err(ItemError::NotAvailableYet));
    }

    #[test]
    fn test_capacity_three_scenario_with_frames() {
        let buffer = streaming(FrameFormat::planar(1, 1, 8), 3);
        for (i, t) in [1.0, 2.0, 3.0, 4.0].into_iter().enumerate() {
            let px = [i as u8];
            let uid = buffer
                .add_frame(&RawFrame::packed(&px, [1, 1, 1], 8), t, t, None)
                .unwrap();
            assert_eq!(uid, i as u64);
        }
        assert_eq!(buffer.get_item(0), Err(ItemError::NotAvailableAnymore));
        let latest = buffer.get_item(3).unwrap();
        assert_eq!(latest.filtered_timestamp, 4.0);
        assert_eq!(latest.payload.data, vec![3]);
        assert_eq!(buffer.get_item_uid_from_time(2.5), Ok(1));
    }

    #[test]
    fn test_filtered_frames_use_frame_number_as_index() {
        let buffer = streaming(FrameFormat::planar(1, 1, 8), 8);
        let px = [0u8];
        for frame in 0..5i64 {
            let sample = TimingSample::system(100.0 + frame as f64 * 0.1, Some(frame));
            let uid = buffer
                .add_frame_with_filtering(&RawFrame::packed(&px, [1, 1, 1], 8), sample)
                .unwrap();
            assert_eq!(buffer.get_item(uid).unwrap().index, Some(frame));
        }
        let latest = buffer.latest_timestamp().unwrap();
        assert!((latest - 100.4).abs() < 1e-9);
    }
}
