//! Item formats - what a typed buffer stores in every slot
//!
//! - `FrameFormat` / `VideoFrame`: fixed-size image frames
//! - `TransformChannel` / `TransformSample`: one tracked tool transform

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::SourceId;

/// Frame geometry shared by every slot of a video buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameFormat {
    /// Frame size in pixels (columns, rows, slices)
    pub size: [u32; 3],

    /// Bits per pixel
    pub bits_per_pixel: u32,
}

impl FrameFormat {
    pub fn new(size: [u32; 3], bits_per_pixel: u32) -> Self {
        Self {
            size,
            bits_per_pixel,
        }
    }

    /// 2D frame helper
    pub fn planar(width: u32, height: u32, bits_per_pixel: u32) -> Self {
        Self::new([width, height, 1], bits_per_pixel)
    }

    /// Packed bytes per row (rounded up to whole bytes)
    pub fn bytes_per_row(&self) -> usize {
        (self.size[0] as usize * self.bits_per_pixel as usize).div_ceil(8)
    }

    /// Rows across all slices
    pub fn rows(&self) -> usize {
        self.size[1] as usize * self.size[2] as usize
    }

    /// Packed frame size in bytes
    pub fn frame_bytes(&self) -> usize {
        self.bytes_per_row() * self.rows()
    }

    /// Packed frame size, `None` if it does not fit in `usize`
    pub fn checked_frame_bytes(&self) -> Option<usize> {
        (self.size[0] as usize)
            .checked_mul(self.bits_per_pixel as usize)
            .map(|bits| bits.div_ceil(8))?
            .checked_mul((self.size[1] as usize).checked_mul(self.size[2] as usize)?)
    }

    /// A dimension or the bit depth is zero
    pub fn is_empty(&self) -> bool {
        self.size.contains(&0) || self.bits_per_pixel == 0
    }

    /// Whether a producer frame with this geometry fits the format
    pub fn matches(&self, size: [u32; 3], bits_per_pixel: u32) -> bool {
        self.size == size && self.bits_per_pixel == bits_per_pixel
    }
}

impl fmt::Display for FrameFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{}x{}@{}bpp",
            self.size[0], self.size[1], self.size[2], self.bits_per_pixel
        )
    }
}

/// Pixel storage of one video slot.
#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoFrame {
    pub format: FrameFormat,
    pub data: Vec<u8>,
}

impl Clone for VideoFrame {
    fn clone(&self) -> Self {
        Self {
            format: self.format,
            data: self.data.clone(),
        }
    }

    // reuses the pixel allocation of `self`
    fn clone_from(&mut self, source: &Self) {
        self.format = source.format;
        self.data.clone_from(&source.data);
    }
}

impl VideoFrame {
    /// Zero-filled frame of the given format
    pub fn allocate(format: FrameFormat) -> Self {
        Self {
            format,
            data: vec![0; format.frame_bytes()],
        }
    }

    /// Bytes of one packed row
    pub fn row(&self, row: usize) -> Option<&[u8]> {
        let len = self.format.bytes_per_row();
        self.data.get(row * len..(row + 1) * len)
    }
}

/// Producer-side view of a frame as handed over by a device SDK.
#[derive(Debug, Clone, Copy)]
pub struct RawFrame<'a> {
    /// Source bytes (may start with a header and contain row padding)
    pub data: &'a [u8],

    /// Frame size in pixels
    pub size: [u32; 3],

    pub bits_per_pixel: u32,

    /// Header bytes to skip before the first row
    pub skip_bytes: usize,

    /// Distance between row starts in `data`; `None` means tightly packed
    pub row_stride: Option<usize>,
}

impl<'a> RawFrame<'a> {
    /// Tightly packed frame without header
    pub fn packed(data: &'a [u8], size: [u32; 3], bits_per_pixel: u32) -> Self {
        Self {
            data,
            size,
            bits_per_pixel,
            skip_bytes: 0,
            row_stride: None,
        }
    }

    pub fn with_skip_bytes(mut self, skip_bytes: usize) -> Self {
        self.skip_bytes = skip_bytes;
        self
    }

    pub fn with_row_stride(mut self, row_stride: usize) -> Self {
        self.row_stride = Some(row_stride);
        self
    }

    pub fn format(&self) -> FrameFormat {
        FrameFormat::new(self.size, self.bits_per_pixel)
    }

    /// Effective input stride
    pub fn stride(&self) -> usize {
        self.row_stride
            .unwrap_or_else(|| self.format().bytes_per_row())
    }

    /// Minimum number of bytes `data` must hold for this geometry, `None`
    /// if that overflows `usize`
    pub fn required_len(&self) -> Option<usize> {
        let format = self.format();
        let rows = format.rows();
        if rows == 0 {
            return Some(self.skip_bytes);
        }
        self.stride()
            .checked_mul(rows - 1)?
            .checked_add(format.bytes_per_row())?
            .checked_add(self.skip_bytes)
    }
}

/// Homogeneous 4x4 transform, row major.
pub type Matrix4 = [[f64; 4]; 4];

pub const IDENTITY: Matrix4 = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

/// Tracking state reported with every transform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    Ok,
    #[default]
    Missing,
    OutOfView,
    OutOfVolume,
    RequestTimeout,
}

impl ToolStatus {
    pub fn is_valid(&self) -> bool {
        matches!(self, ToolStatus::Ok)
    }
}

/// Identity of a tracker buffer: the transform from a tool frame to a
/// reference frame.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransformChannel {
    pub from: SourceId,
    pub to: SourceId,
}

impl TransformChannel {
    pub fn new(from: impl Into<SourceId>, to: impl Into<SourceId>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn name(&self) -> SourceId {
        SourceId::transform_name(&self.from, &self.to)
    }
}

impl fmt::Display for TransformChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}To{}", self.from, self.to)
    }
}

/// One tracker reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformSample {
    pub channel: TransformChannel,
    pub matrix: Matrix4,
    pub status: ToolStatus,
}

impl Default for TransformSample {
    fn default() -> Self {
        Self {
            channel: TransformChannel::default(),
            matrix: IDENTITY,
            status: ToolStatus::Missing,
        }
    }
}

impl TransformSample {
    pub fn translation(&self) -> [f64; 3] {
        [self.matrix[0][3], self.matrix[1][3], self.matrix[2][3]]
    }
}
