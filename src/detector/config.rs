//! Decoder configuration and its validation.

use crate::decode::CodeType;
use crate::prior::{PriorCoords, NORMALIZED_PRIOR_SIZE, PIXEL_PRIOR_SIZE};
use crate::util::math::in_unit_range;
use crate::util::{DetOutError, DetOutResult};

/// Parameters of the detection-output stage, fixed at construction.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectionOutputConfig {
    /// Number of classes including the background class.
    pub num_classes: usize,
    /// Class never emitted as a detection; `None` keeps every class.
    pub background_label_id: Option<usize>,
    /// One box set shared by every class instead of one per class.
    pub share_location: bool,
    /// Offsets already include the variance; priors then carry none.
    pub variance_encoded_in_target: bool,
    /// Offset encoding used by the network.
    pub code_type: CodeType,
    /// Scores must be strictly above this value to become candidates.
    pub confidence_threshold: f32,
    /// IoU at or above which a lower-ranked box is suppressed.
    pub nms_threshold: f32,
    /// Adaptive NMS decay, `1.0` disables it.
    pub eta: f32,
    /// Maximum candidates per class entering NMS.
    pub top_k: usize,
    /// Maximum detections emitted per image.
    pub keep_top_k: usize,
    /// Priors are in `[0, 1]`; otherwise they are pixels with a leading
    /// image id per row.
    pub normalized: bool,
    /// Network input width, used to normalize pixel priors.
    pub input_width: f32,
    /// Network input height, used to normalize pixel priors.
    pub input_height: f32,
    /// Clamp decoded boxes to `[0, 1]` before suppression.
    pub clip_boxes: bool,
    /// Clamp emitted boxes to `[0, 1]`.
    pub clip_after_nms: bool,
    /// The prior buffer holds one block per image instead of one shared block.
    pub priors_per_image: bool,
    /// Decode images on the rayon pool (ignored without the `rayon` feature).
    pub parallel: bool,
}

impl Default for DetectionOutputConfig {
    fn default() -> Self {
        Self {
            num_classes: 21,
            background_label_id: Some(0),
            share_location: true,
            variance_encoded_in_target: false,
            code_type: CodeType::CenterSize,
            confidence_threshold: 0.0,
            nms_threshold: 0.3,
            eta: 1.0,
            top_k: 400,
            keep_top_k: 200,
            normalized: true,
            input_width: 1.0,
            input_height: 1.0,
            clip_boxes: false,
            clip_after_nms: false,
            priors_per_image: false,
            parallel: false,
        }
    }
}

impl DetectionOutputConfig {
    /// Checks every field, failing on the first invalid one.
    pub fn validate(&self) -> DetOutResult<()> {
        if self.num_classes == 0 {
            return Err(invalid("num_classes", "must be at least 1"));
        }
        if let Some(bg) = self.background_label_id {
            if bg >= self.num_classes {
                return Err(invalid("background_label_id", "must be below num_classes"));
            }
        }
        if !in_unit_range(self.confidence_threshold) {
            return Err(invalid("confidence_threshold", "must lie in [0, 1]"));
        }
        if !in_unit_range(self.nms_threshold) {
            return Err(invalid("nms_threshold", "must lie in [0, 1]"));
        }
        if !(self.eta > 0.0 && self.eta <= 1.0) {
            return Err(invalid("eta", "must lie in (0, 1]"));
        }
        if self.top_k == 0 {
            return Err(invalid("top_k", "must be positive"));
        }
        if self.keep_top_k == 0 {
            return Err(invalid("keep_top_k", "must be positive"));
        }
        if !self.normalized {
            if !(self.input_width.is_finite() && self.input_width > 0.0) {
                return Err(invalid("input_width", "must be positive for pixel priors"));
            }
            if !(self.input_height.is_finite() && self.input_height > 0.0) {
                return Err(invalid("input_height", "must be positive for pixel priors"));
            }
        }
        Ok(())
    }

    /// Values per prior row.
    pub fn prior_size(&self) -> usize {
        if self.normalized {
            NORMALIZED_PRIOR_SIZE
        } else {
            PIXEL_PRIOR_SIZE
        }
    }

    /// Box sets per prior in the localization tensor.
    pub fn num_loc_classes(&self) -> usize {
        if self.share_location {
            1
        } else {
            self.num_classes
        }
    }

    pub(crate) fn prior_coords(&self) -> PriorCoords {
        if self.normalized {
            PriorCoords::Normalized
        } else {
            PriorCoords::Pixel {
                width: self.input_width,
                height: self.input_height,
            }
        }
    }
}

fn invalid(field: &'static str, reason: &'static str) -> DetOutError {
    DetOutError::InvalidConfig { field, reason }
}
