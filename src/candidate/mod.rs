//! Candidate selection and pruning utilities.
//!
//! Includes bounded Top-K collection and per-class greedy IoU suppression.

pub(crate) mod nms;
pub(crate) mod topk;
