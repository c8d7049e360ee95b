//! Input tensors and the shape checks run before any decoding.

use crate::detector::DetectionOutputConfig;
use crate::prior::{prior_block_len, prior_row_len};
use crate::util::{DetOutError, DetOutResult};

/// The three flat tensors produced by the network for one batch.
#[derive(Clone, Copy, Debug)]
pub struct DetectionInputs<'a> {
    /// Regression offsets, `[batch, num_priors, num_loc_classes, 4]`.
    pub loc: &'a [f32],
    /// Class confidences, `[batch, num_priors, num_classes]`.
    pub conf: &'a [f32],
    /// Prior blocks, one shared or one per image.
    pub priors: &'a [f32],
}

impl<'a> DetectionInputs<'a> {
    pub fn new(loc: &'a [f32], conf: &'a [f32], priors: &'a [f32]) -> Self {
        Self { loc, conf, priors }
    }
}

/// Dimensions of one call, resolved from the configuration and the prior
/// tensor length.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InputShape {
    pub batch_size: usize,
    pub num_priors: usize,
    pub num_classes: usize,
    pub num_loc_classes: usize,
    /// Elements per prior block.
    pub prior_block_len: usize,
    /// Whether each image has its own prior block.
    pub priors_per_image: bool,
}

impl InputShape {
    /// Resolves and checks the shape of `inputs` for `batch_size` images.
    pub fn resolve(
        cfg: &DetectionOutputConfig,
        inputs: &DetectionInputs<'_>,
        batch_size: usize,
    ) -> DetOutResult<Self> {
        if batch_size == 0 {
            return Err(DetOutError::InvalidInput("batch size must be at least 1"));
        }

        let with_variance = !cfg.variance_encoded_in_target;
        let prior_size = cfg.prior_size();
        let blocks = if cfg.priors_per_image { batch_size } else { 1 };
        let got = inputs.priors.len();
        let unit = blocks
            .checked_mul(prior_row_len(prior_size, with_variance))
            .ok_or(DetOutError::ShapeMismatch {
                tensor: "priors",
                expected: usize::MAX,
                got,
            })?;
        if got == 0 || got % unit != 0 {
            return Err(DetOutError::ShapeMismatch {
                tensor: "priors",
                expected: (got / unit).max(1) * unit,
                got,
            });
        }
        let num_priors = got / unit;

        let num_classes = cfg.num_classes;
        let num_loc_classes = cfg.num_loc_classes();
        let shape = Self {
            batch_size,
            num_priors,
            num_classes,
            num_loc_classes,
            prior_block_len: prior_block_len(num_priors, prior_size, with_variance),
            priors_per_image: cfg.priors_per_image,
        };

        check_len("loc", batch_size, shape.loc_per_image(), inputs.loc.len())?;
        check_len("conf", batch_size, shape.conf_per_image(), inputs.conf.len())?;
        Ok(shape)
    }

    /// Localization elements per image.
    pub fn loc_per_image(&self) -> usize {
        self.num_priors
            .saturating_mul(self.num_loc_classes)
            .saturating_mul(4)
    }

    /// Confidence elements per image.
    pub fn conf_per_image(&self) -> usize {
        self.num_priors.saturating_mul(self.num_classes)
    }

    pub(crate) fn loc_slice<'a>(&self, loc: &'a [f32], image: usize) -> &'a [f32] {
        let n = self.loc_per_image();
        &loc[image * n..(image + 1) * n]
    }

    pub(crate) fn conf_slice<'a>(&self, conf: &'a [f32], image: usize) -> &'a [f32] {
        let n = self.conf_per_image();
        &conf[image * n..(image + 1) * n]
    }

    pub(crate) fn prior_slice<'a>(&self, priors: &'a [f32], image: usize) -> &'a [f32] {
        let block = if self.priors_per_image { image } else { 0 };
        &priors[block * self.prior_block_len..(block + 1) * self.prior_block_len]
    }
}

/// Checks a batched tensor of `per_image` elements per image. A product that
/// overflows cannot match any slice length and is reported as `usize::MAX`.
fn check_len(tensor: &'static str, batch_size: usize, per_image: usize, got: usize) -> DetOutResult<()> {
    let expected = batch_size.checked_mul(per_image).unwrap_or(usize::MAX);
    if expected != got {
        return Err(DetOutError::ShapeMismatch {
            tensor,
            expected,
            got,
        });
    }
    Ok(())
}

/// Infers the class count of a per-class box layout from tensor lengths.
///
/// `loc_len` and `priors_len` cover a single image and `prior_size` is the
/// number of values per prior row (variances excluded).
pub fn infer_num_classes(loc_len: usize, priors_len: usize, prior_size: usize) -> DetOutResult<usize> {
    if prior_size == 0 || priors_len == 0 || priors_len % prior_size != 0 {
        return Err(DetOutError::InvalidInput(
            "prior tensor length is not a multiple of the prior size",
        ));
    }
    let per_class = (priors_len / prior_size) * 4;
    if loc_len == 0 || loc_len % per_class != 0 {
        return Err(DetOutError::InvalidInput(
            "cannot infer the number of classes from the localization tensor",
        ));
    }
    Ok(loc_len / per_class)
}

#[cfg(test)]
mod tests {
    use super::{infer_num_classes, DetectionInputs, InputShape};
    use crate::detector::DetectionOutputConfig;
    use crate::util::DetOutError;

    #[test]
    fn resolves_shared_priors_with_variance() {
        let cfg = DetectionOutputConfig {
            num_classes: 3,
            ..DetectionOutputConfig::default()
        };
        let loc = vec![0.0; 2 * 5 * 4];
        let conf = vec![0.0; 2 * 5 * 3];
        let priors = vec![0.0; 5 * 8];
        let shape = InputShape::resolve(&cfg, &DetectionInputs::new(&loc, &conf, &priors), 2).unwrap();
        assert_eq!(shape.num_priors, 5);
        assert_eq!(shape.prior_block_len, 40);
        assert_eq!(shape.loc_per_image(), 20);
        assert_eq!(shape.prior_slice(&priors, 1).len(), 40);
    }

    #[test]
    fn resolves_per_image_pixel_priors() {
        let cfg = DetectionOutputConfig {
            num_classes: 2,
            share_location: false,
            variance_encoded_in_target: true,
            normalized: false,
            input_width: 10.0,
            input_height: 10.0,
            priors_per_image: true,
            ..DetectionOutputConfig::default()
        };
        let loc = vec![0.0; 2 * 3 * 2 * 4];
        let conf = vec![0.0; 2 * 3 * 2];
        let priors: Vec<f32> = (0..2 * 3 * 5).map(|v| v as f32).collect();
        let shape = InputShape::resolve(&cfg, &DetectionInputs::new(&loc, &conf, &priors), 2).unwrap();
        assert_eq!(shape.num_priors, 3);
        assert_eq!(shape.prior_slice(&priors, 1)[0], 15.0);
    }

    #[test]
    fn reports_conf_mismatch() {
        let cfg = DetectionOutputConfig {
            num_classes: 2,
            variance_encoded_in_target: true,
            ..DetectionOutputConfig::default()
        };
        let loc = vec![0.0; 8];
        let conf = vec![0.0; 5];
        let priors = vec![0.0; 8];
        let err = InputShape::resolve(&cfg, &DetectionInputs::new(&loc, &conf, &priors), 1)
            .err()
            .unwrap();
        assert_eq!(
            err,
            DetOutError::ShapeMismatch {
                tensor: "conf",
                expected: 4,
                got: 5,
            }
        );
    }

    #[test]
    fn zero_batch_is_invalid() {
        let cfg = DetectionOutputConfig::default();
        let err = InputShape::resolve(&cfg, &DetectionInputs::new(&[], &[], &[]), 0)
            .err()
            .unwrap();
        assert_eq!(err, DetOutError::InvalidInput("batch size must be at least 1"));
    }

    #[test]
    fn infers_class_count_from_proposals() {
        // 300 proposals of 5 values, 21 classes
        assert_eq!(infer_num_classes(300 * 4 * 21, 300 * 5, 5), Ok(21));
        assert!(infer_num_classes(300 * 4 * 21 + 1, 300 * 5, 5).is_err());
        assert!(infer_num_classes(84, 7, 5).is_err());
    }
}
