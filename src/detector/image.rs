//! Per-image decoding, filtering, suppression and selection.

use crate::candidate::nms::nms_greedy;
use crate::candidate::topk::{Candidate, TopK};
use crate::decode::{decode_boxes, DecodeOptions, LocLayout};
use crate::detector::{DetectionInputs, DetectionOutputConfig, InputShape};
use crate::output::Detection;
use crate::prior::PriorSet;
use crate::trace::{trace_event, trace_span};
use crate::util::DetOutResult;

/// Runs the full pipeline for image `image` of an already validated batch.
///
/// Returns at most `keep_top_k` detections in rank order.
pub(crate) fn detect_image(
    cfg: &DetectionOutputConfig,
    layout: LocLayout,
    shape: &InputShape,
    inputs: &DetectionInputs<'_>,
    image: usize,
) -> DetOutResult<Vec<Detection>> {
    let _span = trace_span!("decode_image", image = image).entered();

    let priors = PriorSet::new(
        shape.prior_slice(inputs.priors, image),
        shape.num_priors,
        cfg.prior_size(),
        !cfg.variance_encoded_in_target,
        cfg.prior_coords(),
    )?;
    let loc = shape.loc_slice(inputs.loc, image);
    let conf = shape.conf_slice(inputs.conf, image);

    let skip_loc_class = match layout {
        LocLayout::Shared => None,
        LocLayout::PerClass { .. } => cfg.background_label_id,
    };
    let decoded = decode_boxes(
        loc,
        &priors,
        DecodeOptions {
            code_type: cfg.code_type,
            layout,
            skip_loc_class,
            clip: cfg.clip_boxes,
        },
    );

    let num_valid = priors.num_valid();
    let num_classes = shape.num_classes;
    let mut merged = TopK::new(cfg.keep_top_k);
    let mut num_candidates = 0usize;
    let mut num_kept = 0usize;

    for label in 0..num_classes {
        if cfg.background_label_id == Some(label) {
            continue;
        }
        let loc_class = layout.loc_class(label);
        let mut per_class = TopK::new(cfg.top_k);
        for p in 0..num_valid {
            let score = conf[p * num_classes + label];
            if score > cfg.confidence_threshold {
                per_class.push(Candidate {
                    prior_idx: p,
                    label,
                    score,
                    bbox: decoded.get(loc_class, p),
                });
                num_candidates += 1;
            }
        }
        if per_class.is_empty() {
            continue;
        }
        let kept = nms_greedy(&per_class.into_sorted_desc(), cfg.nms_threshold, cfg.eta);
        num_kept += kept.len();
        merged.extend(kept);
    }

    let selected = merged.into_sorted_desc();
    trace_event!(
        "image_detections",
        image = image,
        priors = num_valid,
        candidates = num_candidates,
        after_nms = num_kept,
        emitted = selected.len()
    );

    Ok(selected
        .into_iter()
        .map(|c| Detection {
            image_id: image,
            label: c.label,
            confidence: c.score,
            bbox: if cfg.clip_after_nms {
                c.bbox.clip_unit()
            } else {
                c.bbox
            },
        })
        .collect())
}
