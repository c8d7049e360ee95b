//! Greedy IoU non-maximum suppression.

use crate::candidate::topk::Candidate;

/// Applies greedy non-maximum suppression to candidates of one class.
///
/// `candidates` must already be in rank order (best first). A candidate is
/// dropped when its IoU with any kept candidate reaches the current
/// threshold. After each kept candidate, an `eta` below 1 shrinks a
/// threshold that is still above 0.5; `eta == 1` gives plain greedy NMS.
pub fn nms_greedy(candidates: &[Candidate], nms_threshold: f32, eta: f32) -> Vec<Candidate> {
    let mut threshold = nms_threshold;
    let mut kept: Vec<Candidate> = Vec::new();

    'outer: for candidate in candidates.iter().copied() {
        for kept_candidate in kept.iter() {
            if candidate.bbox.iou(&kept_candidate.bbox) >= threshold {
                continue 'outer;
            }
        }
        kept.push(candidate);
        if eta < 1.0 && threshold > 0.5 {
            threshold *= eta;
        }
    }

    kept
}

#[cfg(test)]
mod tests {
    use super::nms_greedy;
    use crate::bbox::BBox;
    use crate::candidate::topk::Candidate;

    fn cand(prior_idx: usize, score: f32, bbox: BBox) -> Candidate {
        Candidate {
            prior_idx,
            label: 1,
            score,
            bbox,
        }
    }

    #[test]
    fn identical_boxes_keep_only_the_best() {
        let b = BBox::new(0.1, 0.1, 0.4, 0.4);
        let kept = nms_greedy(&[cand(0, 0.9, b), cand(1, 0.8, b)], 0.3, 1.0);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].prior_idx, 0);
    }

    #[test]
    fn overlap_below_threshold_survives() {
        let a = BBox::new(0.0, 0.0, 0.4, 0.4);
        let b = BBox::new(0.2, 0.0, 0.6, 0.4); // IoU 1/3
        let kept = nms_greedy(&[cand(0, 0.9, a), cand(1, 0.8, b)], 0.5, 1.0);
        assert_eq!(kept.len(), 2);
        let kept = nms_greedy(&[cand(0, 0.9, a), cand(1, 0.8, b)], 0.3, 1.0);
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn suppressed_candidates_do_not_suppress_others() {
        // b overlaps a and c, a and c are disjoint
        let a = BBox::new(0.0, 0.0, 0.4, 0.4);
        let b = BBox::new(0.1, 0.0, 0.5, 0.4);
        let c = BBox::new(0.45, 0.0, 0.85, 0.4);
        let kept = nms_greedy(&[cand(0, 0.9, a), cand(1, 0.8, b), cand(2, 0.7, c)], 0.3, 1.0);
        let idx: Vec<usize> = kept.iter().map(|k| k.prior_idx).collect();
        assert_eq!(idx, vec![0, 2]);
    }

    #[test]
    fn eta_only_tightens_suppression() {
        let a = BBox::new(0.0, 0.0, 0.4, 0.4);
        let b = BBox::new(0.5, 0.0, 0.9, 0.4);
        let c = BBox::new(0.06, 0.0, 0.46, 0.4); // IoU with a ~0.74
        let items = [cand(0, 0.9, a), cand(1, 0.8, b), cand(2, 0.7, c)];
        let plain = nms_greedy(&items, 0.8, 1.0);
        let adaptive = nms_greedy(&items, 0.8, 0.9);
        assert_eq!(plain.len(), 3);
        assert!(adaptive.len() <= plain.len());
        assert_eq!(adaptive.len(), 2);
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert!(nms_greedy(&[], 0.3, 1.0).is_empty());
    }
}
