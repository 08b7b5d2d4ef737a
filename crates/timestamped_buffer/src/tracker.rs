//! Tracker transform buffers.

use contracts::{
    AddResult, BufferError, ItemError, Matrix4, TimingSample, ToolStatus, TransformChannel,
    TransformSample,
};
use nalgebra::{Matrix3, Rotation3, UnitQuaternion, Vector3};

use crate::facade::{ItemFacade, ItemTiming};

/// Buffer of one tool's transforms
pub type TrackerBuffer = ItemFacade<TransformChannel>;

impl ItemFacade<TransformChannel> {
    /// Store a transform with caller-supplied timestamps
    pub fn add_transform(
        &self,
        matrix: &Matrix4,
        status: ToolStatus,
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
            |_| validate_matrix(matrix),
            |_, payload| {
                payload.matrix = *matrix;
                payload.status = status;
            },
        )
    }

    /// Store a transform, deriving the filtered timestamp from `sample`
    pub fn add_transform_with_filtering(
        &self,
        matrix: &Matrix4,
        status: ToolStatus,
        sample: TimingSample,
    ) -> AddResult {
        self.commit(
            ItemTiming::Sample(sample),
            sample.frame_number,
            |_| validate_matrix(matrix),
            |_, payload| {
                payload.matrix = *matrix;
                payload.status = status;
            },
        )
    }

    /// Transform at an arbitrary time.
    ///
    /// Interpolates between the items around `time`: translation linearly,
    /// rotation by quaternion slerp. If either neighbour is not tracked
    /// (`status != Ok`) the nearer one is returned as is.
    pub fn get_transform_interpolated(&self, time: f64) -> Result<TransformSample, ItemError> {
        let ring = self.buffer().lock();
        let uid = ring.item_uid_from_time(time)?;
        let before = ring.item(uid)?;
        let Ok(after) = ring.item(uid + 1) else {
            return Ok(before.payload.clone());
        };

        let span = after.filtered_timestamp - before.filtered_timestamp;
        let t = ((time - before.filtered_timestamp) / span).clamp(0.0, 1.0);
        if !before.payload.status.is_valid() || !after.payload.status.is_valid() {
            let nearest = if t < 0.5 { before } else { after };
            return Ok(nearest.payload.clone());
        }

        Ok(TransformSample {
            channel: before.payload.channel.clone(),
            matrix: interpolate(&before.payload.matrix, &after.payload.matrix, t),
            status: ToolStatus::Ok,
        })
    }
}

fn validate_matrix(matrix: &Matrix4) -> Result<(), BufferError> {
    if matrix.iter().flatten().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(BufferError::InvalidPayload {
            message: "transform contains non-finite values".to_string(),
        })
    }
}

fn rotation(m: &Matrix4) -> UnitQuaternion<f64> {
    let r = Matrix3::new(
        m[0][0], m[0][1], m[0][2], m[1][0], m[1][1], m[1][2], m[2][0], m[2][1], m[2][2],
    );
    UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix(&r))
}

fn translation(m: &Matrix4) -> Vector3<f64> {
    Vector3::new(m[0][3], m[1][3], m[2][3])
}

fn interpolate(a: &Matrix4, b: &Matrix4, t: f64) -> Matrix4 {
    let q = rotation(a).slerp(&rotation(b), t);
    let p = translation(a).lerp(&translation(b), t);
    let r = q.to_rotation_matrix();

    let mut out = contracts::IDENTITY;
    for (row, out_row) in out.iter_mut().take(3).enumerate() {
        for (col, value) in out_row.iter_mut().take(3).enumerate() {
            *value = r[(row, col)];
        }
        out_row[3] = p[row];
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::IDENTITY;
    use std::f64::consts::FRAC_PI_2;

    fn streaming() -> TrackerBuffer {
        let buffer = TrackerBuffer::new("ProbeToTracker", 8).unwrap();
        buffer
            .set_frame_format(TransformChannel::new("Probe", "Tracker"))
            .unwrap();
        buffer.start().unwrap();
        buffer
    }

    fn rot_z(angle: f64, x: f64) -> Matrix4 {
        let (s, c) = angle.sin_cos();
        [
            [c, -s, 0.0, x],
            [s, c, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ]
    }

    #[test]
    fn test_add_and_read_transform() {
        let buffer = streaming();
        let m = rot_z(0.3, 12.0);
        let uid = buffer
            .add_transform(&m, ToolStatus::Ok, 1.0, 1.0, Some(1))
            .unwrap();
        let item = buffer.get_item(uid).unwrap();
        assert_eq!(item.payload.matrix, m);
        assert_eq!(item.payload.status, ToolStatus::Ok);
        assert_eq!(item.payload.channel, TransformChannel::new("Probe", "Tracker"));
    }

    #[test]
    fn test_non_finite_matrix_rejected() {
        let buffer = streaming();
        let mut m = IDENTITY;
        m[1][3] = f64::NAN;
        assert!(matches!(
            buffer.add_transform(&m, ToolStatus::Ok, 1.0, 1.0, None),
            Err(BufferError::InvalidPayload { .. })
        ));
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_interpolation_midpoint() {
        let buffer = streaming();
        buffer
            .add_transform(&rot_z(0.0, 0.0), ToolStatus::Ok, 1.0, 1.0, None)
            .unwrap();
        buffer
            .add_transform(&rot_z(FRAC_PI_2, 10.0), ToolStatus::Ok, 2.0, 2.0, None)
            .unwrap();

        let mid = buffer.get_transform_interpolated(1.5).unwrap();
        let expected = rot_z(FRAC_PI_2 / 2.0, 5.0);
        for row in 0..4 {
            for col in 0..4 {
                assert!(
                    (mid.matrix[row][col] - expected[row][col]).abs() < 1e-6,
                    "[{row}][{col}] {} != {}",
                    mid.matrix[row][col],
                    expected[row][col]
                );
            }
        }
    }

    #[test]
    fn test_interpolation_with_missing_neighbour() {
        let buffer = streaming();
        buffer
            .add_transform(&rot_z(0.0, 1.0), ToolStatus::Ok, 1.0, 1.0, None)
            .unwrap();
        buffer
            .add_transform(&IDENTITY, ToolStatus::OutOfView, 2.0, 2.0, None)
            .unwrap();

        let early = buffer.get_transform_interpolated(1.2).unwrap();
        assert_eq!(early.status, ToolStatus::Ok);
        assert_eq!(early.translation()[0], 1.0);
        let late = buffer.get_transform_interpolated(1.8).unwrap();
        assert_eq!(late.status, ToolStatus::OutOfView);
    }

    #[test]
    fn test_interpolation_range() {
        let buffer = streaming();
        assert_eq!(
            buffer.get_transform_interpolated(1.0),
            Err(ItemError::NotAvailableYet)
        );
        buffer
            .add_transform(&IDENTITY, ToolStatus::Ok, 1.0, 1.0, None)
            .unwrap();
        assert_eq!(buffer.get_transform_interpolated(1.0).unwrap().matrix, IDENTITY);
        assert_eq!(
            buffer.get_transform_interpolated(0.5),
            Err(ItemError::NotAvailableAnymore)
        );
    }
}
