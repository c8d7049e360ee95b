//! Fixed-layout detection output.
//!
//! Each row is `[image_id, label, confidence, xmin, ymin, xmax, ymax]`.
//! Rows past the last detection are padding: `image_id == -1`, zeros
//! elsewhere.

use crate::bbox::BBox;
use crate::util::{DetOutError, DetOutResult};

/// Values per output row.
pub const DETECTION_SIZE: usize = 7;
/// Image id written into padding rows.
pub const PADDING_IMAGE_ID: f32 = -1.0;

const PADDING_ROW: [f32; DETECTION_SIZE] = [PADDING_IMAGE_ID, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];

/// One final detection.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Detection {
    /// Index of the image within the batch.
    pub image_id: usize,
    pub label: usize,
    pub confidence: f32,
    /// Box in normalized coordinates.
    pub bbox: BBox,
}

impl Detection {
    /// Parses an output row, returning `None` for padding (a negative or NaN
    /// image id).
    pub fn from_row(row: &[f32]) -> Option<Self> {
        if row.len() < DETECTION_SIZE || row[0].is_nan() || row[0] < 0.0 {
            return None;
        }
        Some(Self {
            image_id: row[0] as usize,
            label: row[1] as usize,
            confidence: row[2],
            bbox: BBox::new(row[3], row[4], row[5], row[6]),
        })
    }

    /// Encodes the detection as an output row.
    pub fn to_row(&self) -> [f32; DETECTION_SIZE] {
        [
            self.image_id as f32,
            self.label as f32,
            self.confidence,
            self.bbox.xmin,
            self.bbox.ymin,
            self.bbox.xmax,
            self.bbox.ymax,
        ]
    }

    /// Returns the detection with its box mapped to a `width` x `height`
    /// pixel image.
    pub fn scaled(self, width: f32, height: f32) -> Self {
        Self {
            bbox: self.bbox.scale(width, height),
            ..self
        }
    }
}

/// Owned `[rows, 7]` output buffer, padding-initialized.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectionTensor {
    data: Vec<f32>,
}

impl DetectionTensor {
    /// Creates a tensor of `rows` padding rows.
    pub fn padded(rows: usize) -> Self {
        let mut data = Vec::with_capacity(rows * DETECTION_SIZE);
        for _ in 0..rows {
            data.extend_from_slice(&PADDING_ROW);
        }
        Self { data }
    }

    /// Wraps an existing flat buffer.
    pub fn from_vec(data: Vec<f32>) -> DetOutResult<Self> {
        if data.len() % DETECTION_SIZE != 0 {
            return Err(DetOutError::ShapeMismatch {
                tensor: "output",
                expected: (data.len() / DETECTION_SIZE + 1) * DETECTION_SIZE,
                got: data.len(),
            });
        }
        Ok(Self { data })
    }

    /// Row capacity.
    pub fn rows(&self) -> usize {
        self.data.len() / DETECTION_SIZE
    }

    /// Returns row `idx`, if in range.
    pub fn row(&self, idx: usize) -> Option<&[f32]> {
        let start = idx.checked_mul(DETECTION_SIZE)?;
        self.data.get(start..start + DETECTION_SIZE)
    }

    /// Iterates over non-padding rows in order.
    pub fn detections(&self) -> impl Iterator<Item = Detection> + '_ {
        self.data
            .chunks_exact(DETECTION_SIZE)
            .filter_map(Detection::from_row)
    }

    /// Number of non-padding rows.
    pub fn num_detections(&self) -> usize {
        self.detections().count()
    }

    /// Flat row-major view of every row, padding included.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Consumes the tensor, returning the flat buffer.
    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }
}

/// Writes `detections` row by row into `out` and pads the remaining rows.
///
/// `out.len()` must be a multiple of [`DETECTION_SIZE`] with room for every
/// detection; callers validate this beforehand.
pub(crate) fn write_rows(out: &mut [f32], detections: &[Detection]) {
    let (filled, rest) = out.split_at_mut(detections.len() * DETECTION_SIZE);
    for (row, det) in filled.chunks_exact_mut(DETECTION_SIZE).zip(detections) {
        row.copy_from_slice(&det.to_row());
    }
    for row in rest.chunks_exact_mut(DETECTION_SIZE) {
        row.copy_from_slice(&PADDING_ROW);
    }
}
