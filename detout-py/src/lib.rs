//! Python bindings for the detout detection-output decoder.
//!
//! Exposes the decoder configuration and the batch decode call to Python via
//! PyO3, taking and returning numpy `float32` arrays.

use numpy::{PyArray2, PyArrayMethods, PyReadonlyArrayDyn, PyUntypedArrayMethods};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use detout::{
    CodeType, DetOutError, Detection as RustDetection, DetectionInputs,
    DetectionOutput as RustDetectionOutput, DetectionOutputConfig as RustConfig, DETECTION_SIZE,
};

/// Convert a DetOutError to a Python exception.
fn to_py_err(err: DetOutError) -> PyErr {
    PyValueError::new_err(err.to_string())
}

fn parse_code_type(name: &str) -> PyResult<CodeType> {
    match name.to_lowercase().as_str() {
        "corner" => Ok(CodeType::Corner),
        "center_size" => Ok(CodeType::CenterSize),
        "corner_size" => Ok(CodeType::CornerSize),
        _ => Err(PyValueError::new_err(
            "code_type must be 'corner', 'center_size' or 'corner_size'",
        )),
    }
}

fn code_type_name(code_type: CodeType) -> &'static str {
    match code_type {
        CodeType::Corner => "corner",
        CodeType::CenterSize => "center_size",
        CodeType::CornerSize => "corner_size",
    }
}

/// A single detection.
#[pyclass]
#[derive(Clone)]
pub struct Detection {
    /// Index of the image within the batch.
    #[pyo3(get)]
    pub image_id: usize,
    #[pyo3(get)]
    pub label: usize,
    #[pyo3(get)]
    pub confidence: f32,
    #[pyo3(get)]
    pub xmin: f32,
    #[pyo3(get)]
    pub ymin: f32,
    #[pyo3(get)]
    pub xmax: f32,
    #[pyo3(get)]
    pub ymax: f32,
}

#[pymethods]
impl Detection {
    fn __repr__(&self) -> String {
        format!(
            "Detection(image_id={}, label={}, confidence={:.4}, box=({:.3}, {:.3}, {:.3}, {:.3}))",
            self.image_id, self.label, self.confidence, self.xmin, self.ymin, self.xmax, self.ymax
        )
    }
}

impl From<RustDetection> for Detection {
    fn from(d: RustDetection) -> Self {
        Self {
            image_id: d.image_id,
            label: d.label,
            confidence: d.confidence,
            xmin: d.bbox.xmin,
            ymin: d.bbox.ymin,
            xmax: d.bbox.xmax,
            ymax: d.bbox.ymax,
        }
    }
}

/// Detection-output decoder.
#[pyclass]
pub struct DetectionOutput {
    inner: RustDetectionOutput,
}

#[pymethods]
impl DetectionOutput {
    /// Create a decoder.
    ///
    /// Args:
    ///     num_classes: Number of classes including background
    ///     background_label_id: Class never emitted, None keeps all (default: 0)
    ///     share_location: One box set shared by all classes (default: True)
    ///     variance_encoded_in_target: Priors carry no variances (default: False)
    ///     code_type: "corner", "center_size" or "corner_size" (default: "center_size")
    ///     confidence_threshold: Minimum score, exclusive (default: 0.0)
    ///     nms_threshold: IoU suppression threshold (default: 0.3)
    ///     eta: Adaptive NMS decay (default: 1.0)
    ///     top_k: Candidates per class entering NMS (default: 400)
    ///     keep_top_k: Detections per image (default: 200)
    ///     normalized: Priors are normalized (default: True)
    ///     input_width: Network input width for pixel priors (default: 1.0)
    ///     input_height: Network input height for pixel priors (default: 1.0)
    ///     clip_boxes: Clamp boxes before NMS (default: False)
    ///     clip_after_nms: Clamp emitted boxes (default: False)
    ///     priors_per_image: One prior block per image (default: False)
    ///     parallel: Decode images in parallel (default: False)
    #[new]
    #[pyo3(signature = (
        num_classes,
        background_label_id = Some(0),
        share_location = true,
        variance_encoded_in_target = false,
        code_type = "center_size",
        confidence_threshold = 0.0,
        nms_threshold = 0.3,
        eta = 1.0,
        top_k = 400,
        keep_top_k = 200,
        normalized = true,
        input_width = 1.0,
        input_height = 1.0,
        clip_boxes = false,
        clip_after_nms = false,
        priors_per_image = false,
        parallel = false
    ))]
    #[allow(clippy::too_many_arguments)]
    fn new(
        num_classes: usize,
        background_label_id: Option<usize>,
        share_location: bool,
        variance_encoded_in_target: bool,
        code_type: &str,
        confidence_threshold: f32,
        nms_threshold: f32,
        eta: f32,
        top_k: usize,
        keep_top_k: usize,
        normalized: bool,
        input_width: f32,
        input_height: f32,
        clip_boxes: bool,
        clip_after_nms: bool,
        priors_per_image: bool,
        parallel: bool,
    ) -> PyResult<Self> {
        let cfg = RustConfig {
            num_classes,
            background_label_id,
            share_location,
            variance_encoded_in_target,
            code_type: parse_code_type(code_type)?,
            confidence_threshold,
            nms_threshold,
            eta,
            top_k,
            keep_top_k,
            normalized,
            input_width,
            input_height,
            clip_boxes,
            clip_after_nms,
            priors_per_image,
            parallel,
        };
        let inner = RustDetectionOutput::new(cfg).map_err(to_py_err)?;
        Ok(Self { inner })
    }

    /// Decode a batch into a `[batch * keep_top_k, 7]` float32 array.
    ///
    /// Args:
    ///     loc: Localization offsets, any shape, C-contiguous
    ///     conf: Class confidences, leading dimension is the batch
    ///     priors: Prior tensor
    ///     batch_size: Images in the batch (default: conf.shape[0])
    #[pyo3(signature = (loc, conf, priors, batch_size = None))]
    fn decode<'py>(
        &self,
        py: Python<'py>,
        loc: PyReadonlyArrayDyn<'py, f32>,
        conf: PyReadonlyArrayDyn<'py, f32>,
        priors: PyReadonlyArrayDyn<'py, f32>,
        batch_size: Option<usize>,
    ) -> PyResult<Bound<'py, PyArray2<f32>>> {
        let batch_size = resolve_batch(&conf, batch_size);
        let inputs = DetectionInputs::new(loc.as_slice()?, conf.as_slice()?, priors.as_slice()?);
        let out = self.inner.decode(inputs, batch_size).map_err(to_py_err)?;
        let rows = out.rows();
        numpy::PyArray1::from_vec(py, out.into_vec()).reshape([rows, DETECTION_SIZE])
    }

    /// Decode a batch and return the real detections only.
    #[pyo3(signature = (loc, conf, priors, batch_size = None))]
    fn detections(
        &self,
        loc: PyReadonlyArrayDyn<'_, f32>,
        conf: PyReadonlyArrayDyn<'_, f32>,
        priors: PyReadonlyArrayDyn<'_, f32>,
        batch_size: Option<usize>,
    ) -> PyResult<Vec<Detection>> {
        let batch_size = resolve_batch(&conf, batch_size);
        let inputs = DetectionInputs::new(loc.as_slice()?, conf.as_slice()?, priors.as_slice()?);
        let out = self.inner.decode(inputs, batch_size).map_err(to_py_err)?;
        Ok(out.detections().map(Detection::from).collect())
    }

    /// Row capacity of the output for `batch_size` images.
    fn output_rows(&self, batch_size: usize) -> PyResult<usize> {
        self.inner.output_rows(batch_size).map_err(to_py_err)
    }

    #[getter]
    fn num_classes(&self) -> usize {
        self.inner.config().num_classes
    }

    #[getter]
    fn keep_top_k(&self) -> usize {
        self.inner.config().keep_top_k
    }

    fn __repr__(&self) -> String {
        let cfg = self.inner.config();
        format!(
            "DetectionOutput(num_classes={}, code_type='{}', nms_threshold={}, top_k={}, keep_top_k={})",
            cfg.num_classes,
            code_type_name(cfg.code_type),
            cfg.nms_threshold,
            cfg.top_k,
            cfg.keep_top_k
        )
    }
}

fn resolve_batch(conf: &PyReadonlyArrayDyn<'_, f32>, batch_size: Option<usize>) -> usize {
    batch_size.unwrap_or_else(|| {
        let shape = conf.shape();
        if shape.len() >= 2 {
            shape[0]
        } else {
            1
        }
    })
}

/// Python module for detection-output decoding.
#[pymodule]
fn _detout(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<Detection>()?;
    m.add_class::<DetectionOutput>()?;
    m.add("DETECTION_SIZE", DETECTION_SIZE)?;
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    Ok(())
}
