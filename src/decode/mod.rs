//! Box decoding from regression offsets and priors.
//!
//! The decode formula is selected once by [`CodeType`]; the location layout
//! (one box set shared by every class, or one per class) by [`LocLayout`].

use crate::bbox::BBox;
use crate::prior::PriorSet;

/// Encoding used by the network for its regression offsets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CodeType {
    /// Offsets are added to the prior corners.
    Corner,
    /// Offsets move the prior center and scale its size (SSD, Faster R-CNN).
    #[default]
    CenterSize,
    /// Offsets are added to the prior corners in units of the prior size.
    CornerSize,
}

impl CodeType {
    /// Decodes one offset quadruple `loc` against `prior`.
    ///
    /// `variance` scales each offset component; pass `[1.0; 4]` when the
    /// offsets already include it.
    pub fn decode(self, prior: BBox, variance: [f32; 4], loc: [f32; 4]) -> BBox {
        match self {
            CodeType::Corner => BBox::new(
                prior.xmin + variance[0] * loc[0],
                prior.ymin + variance[1] * loc[1],
                prior.xmax + variance[2] * loc[2],
                prior.ymax + variance[3] * loc[3],
            ),
            CodeType::CenterSize => {
                let pw = prior.width();
                let ph = prior.height();
                let (pcx, pcy) = prior.center();
                let cx = variance[0] * loc[0] * pw + pcx;
                let cy = variance[1] * loc[1] * ph + pcy;
                let w = (variance[2] * loc[2]).exp() * pw;
                let h = (variance[3] * loc[3]).exp() * ph;
                BBox::from_center_size(cx, cy, w, h)
            }
            CodeType::CornerSize => {
                let pw = prior.width();
                let ph = prior.height();
                BBox::new(
                    prior.xmin + variance[0] * loc[0] * pw,
                    prior.ymin + variance[1] * loc[1] * ph,
                    prior.xmax + variance[2] * loc[2] * pw,
                    prior.ymax + variance[3] * loc[3] * ph,
                )
            }
        }
    }
}

/// How many box sets the localization tensor carries per prior.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LocLayout {
    /// One box per prior, reused for every class.
    Shared,
    /// One box per prior and class.
    PerClass { num_classes: usize },
}

impl LocLayout {
    /// Selects the layout from the `share_location` flag.
    pub fn from_share_location(share_location: bool, num_classes: usize) -> Self {
        if share_location {
            LocLayout::Shared
        } else {
            LocLayout::PerClass { num_classes }
        }
    }

    /// Number of box sets per prior.
    pub fn num_loc_classes(self) -> usize {
        match self {
            LocLayout::Shared => 1,
            LocLayout::PerClass { num_classes } => num_classes,
        }
    }

    /// Box set used for class `label`.
    pub fn loc_class(self, label: usize) -> usize {
        match self {
            LocLayout::Shared => 0,
            LocLayout::PerClass { .. } => label,
        }
    }
}

/// Options shared by every box decoded for one call.
#[derive(Clone, Copy, Debug)]
pub(crate) struct DecodeOptions {
    pub code_type: CodeType,
    pub layout: LocLayout,
    /// Box set left undecoded (the background class in per-class layouts).
    pub skip_loc_class: Option<usize>,
    pub clip: bool,
}

/// Decoded boxes of one image, indexed by location class then prior.
pub(crate) struct DecodedBoxes {
    boxes: Vec<BBox>,
    num_priors: usize,
}

impl DecodedBoxes {
    pub(crate) fn get(&self, loc_class: usize, prior: usize) -> BBox {
        self.boxes[loc_class * self.num_priors + prior]
    }
}

/// Decodes every valid prior of one image.
///
/// `loc` is the image's slice of the localization tensor, laid out as
/// `[num_priors, num_loc_classes, 4]`.
pub(crate) fn decode_boxes(loc: &[f32], priors: &PriorSet<'_>, opts: DecodeOptions) -> DecodedBoxes {
    let num_loc_classes = opts.layout.num_loc_classes();
    let num_priors = priors.num_valid();
    let mut boxes = vec![BBox::default(); num_loc_classes * num_priors];

    for c in 0..num_loc_classes {
        if opts.skip_loc_class == Some(c) {
            continue;
        }
        for p in 0..num_priors {
            let start = (p * num_loc_classes + c) * 4;
            let l = &loc[start..start + 4];
            let mut decoded = opts.code_type.decode(
                priors.bbox(p),
                priors.variance(p),
                [l[0], l[1], l[2], l[3]],
            );
            if opts.clip {
                decoded = decoded.clip_unit();
            }
            boxes[c * num_priors + p] = decoded;
        }
    }

    DecodedBoxes { boxes, num_priors }
}

#[cfg(test)]
mod tests {
    use super::{decode_boxes, CodeType, DecodeOptions, LocLayout};
    use crate::bbox::BBox;
    use crate::prior::{PriorCoords, PriorSet};

    fn assert_box(b: BBox, expected: [f32; 4]) {
        for (got, want) in b.to_array().iter().zip(expected.iter()) {
            assert!((got - want).abs() < 1e-5, "{b:?} != {expected:?}");
        }
    }

    #[test]
    fn center_size_with_zero_offsets_returns_prior() {
        let prior = BBox::new(0.2, 0.3, 0.6, 0.5);
        let b = CodeType::CenterSize.decode(prior, [0.1, 0.1, 0.2, 0.2], [0.0; 4]);
        assert_box(b, [0.2, 0.3, 0.6, 0.5]);
    }

    #[test]
    fn center_size_applies_variance_and_exp() {
        let prior = BBox::new(0.0, 0.0, 0.4, 0.2);
        // center shifts by 0.1 * 1.0 * 0.4 in x; width doubles via exp(ln 2)
        let ln2 = 2.0f32.ln();
        let b = CodeType::CenterSize.decode(prior, [0.1, 0.1, 0.5, 0.5], [1.0, 0.0, 2.0 * ln2, 0.0]);
        assert_box(b, [-0.16, 0.0, 0.64, 0.2]);
    }

    #[test]
    fn corner_adds_scaled_offsets() {
        let prior = BBox::new(0.1, 0.1, 0.5, 0.5);
        let b = CodeType::Corner.decode(prior, [0.5; 4], [0.2, -0.2, 0.4, 0.0]);
        assert_box(b, [0.2, 0.0, 0.7, 0.5]);
    }

    #[test]
    fn corner_size_scales_by_prior_size() {
        let prior = BBox::new(0.0, 0.0, 0.5, 0.25);
        let b = CodeType::CornerSize.decode(prior, [1.0; 4], [0.2, 0.4, 0.2, 0.4]);
        assert_box(b, [0.1, 0.1, 0.6, 0.35]);
    }

    #[test]
    fn per_class_layout_skips_background_and_clips() {
        let priors = [0.1, 0.1, 0.5, 0.5];
        let set = PriorSet::new(&priors, 1, 4, false, PriorCoords::Normalized).unwrap();
        let loc = [
            9.0, 9.0, 9.0, 9.0, // class 0, skipped
            -1.0, 0.0, 1.0, 0.0, // class 1
        ];
        let decoded = decode_boxes(
            &loc,
            &set,
            DecodeOptions {
                code_type: CodeType::Corner,
                layout: LocLayout::PerClass { num_classes: 2 },
                skip_loc_class: Some(0),
                clip: true,
            },
        );
        assert_eq!(decoded.get(0, 0), BBox::default());
        assert_box(decoded.get(1, 0), [0.0, 0.1, 1.0, 0.5]);
    }

    #[test]
    fn shared_layout_uses_box_set_zero() {
        let layout = LocLayout::from_share_location(true, 5);
        assert_eq!(layout.num_loc_classes(), 1);
        assert_eq!(layout.loc_class(3), 0);
        let layout = LocLayout::from_share_location(false, 5);
        assert_eq!(layout.num_loc_classes(), 5);
        assert_eq!(layout.loc_class(3), 3);
    }
}
