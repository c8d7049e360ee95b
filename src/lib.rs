//! detout is the detection-output stage of SSD and Faster R-CNN style
//! detectors.
//!
//! It decodes regression offsets against priors, filters class confidences,
//! runs per-class greedy NMS and emits a fixed-capacity tensor of
//! `[image_id, label, confidence, xmin, ymin, xmax, ymax]` rows. Images of a
//! batch can be decoded in parallel via the `rayon` feature.

pub mod bbox;
mod candidate;
pub mod decode;
pub mod detector;
pub mod lowlevel;
pub mod output;
pub mod prior;
mod trace;
pub mod util;

pub use bbox::BBox;
pub use decode::{CodeType, LocLayout};
pub use detector::{
    infer_num_classes, DetectionInputs, DetectionOutput, DetectionOutputConfig, InputShape,
};
pub use output::{Detection, DetectionTensor, DETECTION_SIZE, PADDING_IMAGE_ID};
pub use util::{DetOutError, DetOutResult};

pub use candidate::nms::nms_greedy;
pub use candidate::topk::{Candidate, TopK};
