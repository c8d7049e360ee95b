use clap::Parser;
use detout::lowlevel::{NORMALIZED_PRIOR_SIZE, PIXEL_PRIOR_SIZE};
use detout::{
    infer_num_classes, CodeType, Detection, DetectionInputs, DetectionOutput,
    DetectionOutputConfig,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const SCHEMA_JSON: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.schema.json"));
const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

#[derive(Parser, Debug)]
#[command(author, version, about = "detout CLI (JSON config driven)")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "config.json")]
    config: PathBuf,
    /// Print the JSON schema and exit.
    #[arg(long)]
    print_schema: bool,
    /// Print an example config and exit.
    #[arg(long)]
    print_example: bool,
    /// Enable tracing output for the decoder stages.
    #[arg(long)]
    trace: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum CodeTypeConfig {
    Corner,
    CenterSize,
    CornerSize,
}

impl From<CodeTypeConfig> for CodeType {
    fn from(value: CodeTypeConfig) -> Self {
        match value {
            CodeTypeConfig::Corner => CodeType::Corner,
            CodeTypeConfig::CenterSize => CodeType::CenterSize,
            CodeTypeConfig::CornerSize => CodeType::CornerSize,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct DecoderConfigJson {
    num_classes: Option<usize>,
    background_label_id: Option<usize>,
    share_location: bool,
    variance_encoded_in_target: bool,
    code_type: CodeTypeConfig,
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
}

impl Default for DecoderConfigJson {
    fn default() -> Self {
        let cfg = DetectionOutputConfig::default();
        Self {
            num_classes: None,
            background_label_id: cfg.background_label_id,
            share_location: cfg.share_location,
            variance_encoded_in_target: cfg.variance_encoded_in_target,
            code_type: CodeTypeConfig::CenterSize,
            confidence_threshold: cfg.confidence_threshold,
            nms_threshold: cfg.nms_threshold,
            eta: cfg.eta,
            top_k: cfg.top_k,
            keep_top_k: cfg.keep_top_k,
            normalized: cfg.normalized,
            input_width: cfg.input_width,
            input_height: cfg.input_height,
            clip_boxes: cfg.clip_boxes,
            clip_after_nms: cfg.clip_after_nms,
            priors_per_image: cfg.priors_per_image,
            parallel: cfg.parallel,
        }
    }
}

impl DecoderConfigJson {
    fn into_config(self, num_classes: usize) -> DetectionOutputConfig {
        DetectionOutputConfig {
            num_classes,
            background_label_id: self.background_label_id,
            share_location: self.share_location,
            variance_encoded_in_target: self.variance_encoded_in_target,
            code_type: self.code_type.into(),
            confidence_threshold: self.confidence_threshold,
            nms_threshold: self.nms_threshold,
            eta: self.eta,
            top_k: self.top_k,
            keep_top_k: self.keep_top_k,
            normalized: self.normalized,
            input_width: self.input_width,
            input_height: self.input_height,
            clip_boxes: self.clip_boxes,
            clip_after_nms: self.clip_after_nms,
            priors_per_image: self.priors_per_image,
            parallel: self.parallel,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct Config {
    loc_path: String,
    conf_path: String,
    priors_path: String,
    batch_size: usize,
    image_sizes: Vec<[f32; 2]>,
    report_threshold: f32,
    output_path: Option<String>,
    decoder: DecoderConfigJson,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            loc_path: String::new(),
            conf_path: String::new(),
            priors_path: String::new(),
            batch_size: 1,
            image_sizes: Vec::new(),
            report_threshold: 0.5,
            output_path: None,
            decoder: DecoderConfigJson::default(),
        }
    }
}

#[derive(Debug, Serialize)]
struct DetectionRecord {
    image_id: usize,
    label: usize,
    confidence: f32,
    xmin: f32,
    ymin: f32,
    xmax: f32,
    ymax: f32,
    reported: bool,
}

impl DetectionRecord {
    fn new(det: Detection, report_threshold: f32) -> Self {
        Self {
            image_id: det.image_id,
            label: det.label,
            confidence: det.confidence,
            xmin: det.bbox.xmin,
            ymin: det.bbox.ymin,
            xmax: det.bbox.xmax,
            ymax: det.bbox.ymax,
            reported: det.confidence > report_threshold,
        }
    }
}

#[derive(Debug, Serialize)]
struct Output {
    num_classes: usize,
    rows: usize,
    detections: Vec<DetectionRecord>,
}

/// Reads a flat f32 tensor from raw little-endian `.bin` or a JSON array.
fn load_tensor(path: &str) -> Result<Vec<f32>, Box<dyn std::error::Error>> {
    let is_bin = Path::new(path)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("bin"));
    if is_bin {
        let bytes = fs::read(path)?;
        if bytes.len() % 4 != 0 {
            return Err(format!("{path}: length {} is not a multiple of 4", bytes.len()).into());
        }
        return Ok(bytes
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect());
    }
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

/// Derives the class count from tensor sizes when the config leaves it out.
fn guess_num_classes(
    decoder: &DecoderConfigJson,
    batch_size: usize,
    loc_len: usize,
    conf_len: usize,
    priors_len: usize,
) -> Result<usize, Box<dyn std::error::Error>> {
    let prior_size = if decoder.normalized {
        NORMALIZED_PRIOR_SIZE
    } else {
        PIXEL_PRIOR_SIZE
    };
    let row_len = if decoder.variance_encoded_in_target {
        prior_size
    } else {
        prior_size + 4
    };
    let blocks = if decoder.priors_per_image { batch_size } else { 1 };
    let num_priors = priors_len / blocks / row_len;
    if num_priors == 0 {
        return Err("prior tensor is too small to hold a single prior".into());
    }

    let num_classes = if decoder.share_location {
        conf_len / batch_size / num_priors
    } else {
        infer_num_classes(loc_len / batch_size, num_priors * prior_size, prior_size)?
    };
    Ok(num_classes)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env().add_directive("detout=debug".parse()?))
            .with_target(false)
            .init();
    }

    if cli.print_schema {
        println!("{SCHEMA_JSON}");
        return Ok(());
    }
    if cli.print_example {
        println!("{EXAMPLE_JSON}");
        return Ok(());
    }

    let config_text = fs::read_to_string(&cli.config)?;
    let config: Config = serde_json::from_str(&config_text)?;
    if config.loc_path.is_empty() || config.conf_path.is_empty() || config.priors_path.is_empty()
    {
        return Err("loc_path, conf_path and priors_path must be set in the config".into());
    }
    if config.batch_size == 0 {
        return Err("batch_size must be at least 1".into());
    }
    if !config.image_sizes.is_empty() && config.image_sizes.len() != config.batch_size {
        warn!(
            "{} image sizes given for batch size {}, boxes stay normalized",
            config.image_sizes.len(),
            config.batch_size
        );
    }

    let loc = load_tensor(&config.loc_path)?;
    let conf = load_tensor(&config.conf_path)?;
    let priors = load_tensor(&config.priors_path)?;

    let num_classes = match config.decoder.num_classes {
        Some(n) => n,
        None => {
            let n = guess_num_classes(
                &config.decoder,
                config.batch_size,
                loc.len(),
                conf.len(),
                priors.len(),
            )?;
            info!("num_classes guessed: {n}");
            n
        }
    };

    let detector = DetectionOutput::new(config.decoder.into_config(num_classes))?;
    let out = detector.decode(
        DetectionInputs::new(&loc, &conf, &priors),
        config.batch_size,
    )?;
    info!(
        "{} detections in {} rows",
        out.num_detections(),
        out.rows()
    );

    let pixel_sizes = config.image_sizes.len() == config.batch_size;
    let detections = out
        .detections()
        .map(|det| match config.image_sizes.get(det.image_id) {
            Some(&[w, h]) if pixel_sizes => det.scaled(w, h),
            _ => det,
        })
        .map(|det| DetectionRecord::new(det, config.report_threshold))
        .collect();

    let output = Output {
        num_classes,
        rows: out.rows(),
        detections,
    };
    let json = serde_json::to_string_pretty(&output)?;

    match config.output_path {
        Some(path) => fs::write(path, json)?,
        None => println!("{json}"),
    }

    Ok(())
}
