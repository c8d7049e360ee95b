//! The detection-output stage.
//!
//! [`DetectionOutput`] turns localization offsets, class confidences and
//! priors into a fixed-capacity `[batch * keep_top_k, 7]` detection tensor.
//! Every image goes through the same steps: decode boxes, keep scores above
//! the confidence floor, select the per-class top-k, suppress overlaps per
//! class, and select the per-image top-k across classes.

mod config;
mod image;
mod shape;

pub use config::DetectionOutputConfig;
pub use shape::{infer_num_classes, DetectionInputs, InputShape};

use crate::decode::LocLayout;
use crate::output::{write_rows, Detection, DetectionTensor, DETECTION_SIZE};
use crate::trace::{trace_event, trace_span};
use crate::util::{DetOutError, DetOutResult};
#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Validated detection-output stage.
///
/// Holds no per-call state; one instance can serve concurrent calls.
#[derive(Clone, Debug)]
pub struct DetectionOutput {
    cfg: DetectionOutputConfig,
    layout: LocLayout,
}

impl DetectionOutput {
    /// Validates `cfg` and builds the stage.
    pub fn new(cfg: DetectionOutputConfig) -> DetOutResult<Self> {
        cfg.validate()?;
        let layout = LocLayout::from_share_location(cfg.share_location, cfg.num_classes);
        Ok(Self { cfg, layout })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &DetectionOutputConfig {
        &self.cfg
    }

    /// Returns the localization layout selected by the configuration.
    pub fn loc_layout(&self) -> LocLayout {
        self.layout
    }

    /// Checks `inputs` against the configuration without decoding.
    pub fn input_shape(
        &self,
        inputs: &DetectionInputs<'_>,
        batch_size: usize,
    ) -> DetOutResult<InputShape> {
        InputShape::resolve(&self.cfg, inputs, batch_size)
    }

    /// Row capacity of the output for `batch_size` images.
    pub fn output_rows(&self, batch_size: usize) -> DetOutResult<usize> {
        batch_size
            .checked_mul(self.cfg.keep_top_k)
            .filter(|rows| rows.checked_mul(DETECTION_SIZE).is_some())
            .ok_or(DetOutError::InvalidInput("output size overflows usize"))
    }

    /// Decodes a batch into a freshly allocated output tensor.
    pub fn decode(
        &self,
        inputs: DetectionInputs<'_>,
        batch_size: usize,
    ) -> DetOutResult<DetectionTensor> {
        self.input_shape(&inputs, batch_size)?;
        let mut out = DetectionTensor::padded(self.output_rows(batch_size)?);
        self.decode_into(inputs, batch_size, out.as_mut_slice())?;
        Ok(out)
    }

    /// Decodes a batch into `out` and returns the number of detections.
    ///
    /// `out` must hold exactly `output_rows(batch_size) * 7` values. It is
    /// left untouched when the call fails.
    pub fn decode_into(
        &self,
        inputs: DetectionInputs<'_>,
        batch_size: usize,
        out: &mut [f32],
    ) -> DetOutResult<usize> {
        let shape = self.input_shape(&inputs, batch_size)?;
        let expected = self.output_rows(batch_size)? * DETECTION_SIZE;
        if out.len() != expected {
            return Err(DetOutError::ShapeMismatch {
                tensor: "output",
                expected,
                got: out.len(),
            });
        }

        let _span = trace_span!(
            "detection_output",
            batch = batch_size,
            priors = shape.num_priors,
            classes = shape.num_classes
        )
        .entered();

        let per_image = self.detect_batch(&shape, &inputs)?;
        let detections: Vec<Detection> = per_image.into_iter().flatten().collect();
        write_rows(out, &detections);

        trace_event!("detections_written", count = detections.len());
        Ok(detections.len())
    }

    fn detect_batch(
        &self,
        shape: &InputShape,
        inputs: &DetectionInputs<'_>,
    ) -> DetOutResult<Vec<Vec<Detection>>> {
        #[cfg(feature = "rayon")]
        if self.cfg.parallel {
            return (0..shape.batch_size)
                .into_par_iter()
                .map(|image| image::detect_image(&self.cfg, self.layout, shape, inputs, image))
                .collect();
        }

        (0..shape.batch_size)
            .map(|image| image::detect_image(&self.cfg, self.layout, shape, inputs, image))
            .collect()
    }
}
