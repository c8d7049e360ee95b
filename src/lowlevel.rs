//! Low-level building blocks for custom post-processing pipelines.
//!
//! These expose box geometry, prior views, decode formulas and the candidate
//! selection primitives used by [`DetectionOutput`](crate::DetectionOutput).
//! Most users only need the top-level decoder.

pub use crate::bbox::BBox;
pub use crate::candidate::nms::nms_greedy;
pub use crate::candidate::topk::{candidate_cmp_desc, sort_candidates_desc, Candidate, TopK};
pub use crate::decode::{CodeType, LocLayout};
pub use crate::prior::{
    prior_block_len, PriorCoords, PriorSet, NORMALIZED_PRIOR_SIZE, PIXEL_PRIOR_SIZE,
    PRIOR_TERMINATOR,
};
