use detout::lowlevel::{nms_greedy, prior_block_len, Candidate, PriorCoords, PriorSet, TopK};
use detout::{
    infer_num_classes, BBox, CodeType, DetOutError, Detection, DetectionInputs, DetectionOutput,
    DetectionOutputConfig, DetectionTensor, LocLayout,
};

#[test]
fn config_rejects_zero_classes() {
    let err = DetectionOutput::new(DetectionOutputConfig {
        num_classes: 0,
        ..DetectionOutputConfig::default()
    })
    .err()
    .unwrap();
    assert_eq!(
        err,
        DetOutError::InvalidConfig {
            field: "num_classes",
            reason: "must be at least 1",
        }
    );
}

#[test]
fn config_rejects_out_of_range_thresholds() {
    let cases = [
        (
            DetectionOutputConfig {
                confidence_threshold: 1.5,
                ..DetectionOutputConfig::default()
            },
            "confidence_threshold",
        ),
        (
            DetectionOutputConfig {
                nms_threshold: -0.1,
                ..DetectionOutputConfig::default()
            },
            "nms_threshold",
        ),
        (
            DetectionOutputConfig {
                eta: 0.0,
                ..DetectionOutputConfig::default()
            },
            "eta",
        ),
        (
            DetectionOutputConfig {
                top_k: 0,
                ..DetectionOutputConfig::default()
            },
            "top_k",
        ),
        (
            DetectionOutputConfig {
                keep_top_k: 0,
                ..DetectionOutputConfig::default()
            },
            "keep_top_k",
        ),
    ];
    for (cfg, field) in cases {
        match DetectionOutput::new(cfg) {
            Err(DetOutError::InvalidConfig { field: got, .. }) => assert_eq!(got, field),
            other => panic!("expected config error for {field}, got {other:?}"),
        }
    }
}

#[test]
fn layout_follows_share_location() {
    let shared = DetectionOutput::new(DetectionOutputConfig::default()).unwrap();
    assert_eq!(shared.loc_layout(), LocLayout::Shared);

    let per_class = DetectionOutput::new(DetectionOutputConfig {
        num_classes: 4,
        share_location: false,
        ..DetectionOutputConfig::default()
    })
    .unwrap();
    assert_eq!(per_class.loc_layout(), LocLayout::PerClass { num_classes: 4 });
}

#[test]
fn input_shape_reports_prior_remainder() {
    let det = DetectionOutput::new(DetectionOutputConfig {
        num_classes: 2,
        ..DetectionOutputConfig::default()
    })
    .unwrap();
    // two priors with variances need 16 values
    let priors = [0.0f32; 13];
    let err = det
        .input_shape(&DetectionInputs::new(&[], &[], &priors), 1)
        .err()
        .unwrap();
    assert_eq!(
        err,
        DetOutError::ShapeMismatch {
            tensor: "priors",
            expected: 8,
            got: 13,
        }
    );

    let err = det
        .input_shape(&DetectionInputs::new(&[], &[], &[]), 1)
        .err()
        .unwrap();
    assert_eq!(
        err,
        DetOutError::ShapeMismatch {
            tensor: "priors",
            expected: 8,
            got: 0,
        }
    );
}

#[test]
fn error_messages_name_the_tensor() {
    let err = DetOutError::ShapeMismatch {
        tensor: "conf",
        expected: 12,
        got: 10,
    };
    assert_eq!(
        err.to_string(),
        "shape mismatch for conf tensor: expected 12 elements, got 10"
    );
}

#[test]
fn infer_num_classes_matches_demo_layout() {
    assert_eq!(infer_num_classes(200 * 4 * 91, 200 * 5, 5), Ok(91));
    assert_eq!(
        infer_num_classes(10, 200 * 5, 5),
        Err(DetOutError::InvalidInput(
            "cannot infer the number of classes from the localization tensor"
        ))
    );
}

#[test]
fn lowlevel_pipeline_matches_decoder() {
    let block = [0.1, 0.1, 0.4, 0.4, 0.15, 0.1, 0.45, 0.4];
    assert_eq!(prior_block_len(2, 4, false), block.len());
    let priors = PriorSet::new(&block, 2, 4, false, PriorCoords::Normalized).unwrap();

    let scores = [0.7f32, 0.9];
    let mut topk = TopK::new(10);
    for (p, &score) in scores.iter().enumerate() {
        let bbox = CodeType::Corner.decode(priors.bbox(p), priors.variance(p), [0.0; 4]);
        topk.push(Candidate {
            prior_idx: p,
            label: 1,
            score,
            bbox,
        });
    }
    assert_eq!(topk.len(), 2);
    let kept = nms_greedy(&topk.into_sorted_desc(), 0.5, 1.0);
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].prior_idx, 1);

    let det = DetectionOutput::new(DetectionOutputConfig {
        num_classes: 2,
        code_type: CodeType::Corner,
        variance_encoded_in_target: true,
        nms_threshold: 0.5,
        keep_top_k: 3,
        ..DetectionOutputConfig::default()
    })
    .unwrap();
    let conf = [0.0, 0.7, 0.0, 0.9];
    let out = det
        .decode(DetectionInputs::new(&[0.0; 8], &conf, &block), 1)
        .unwrap();
    let dets: Vec<Detection> = out.detections().collect();
    assert_eq!(dets.len(), 1);
    assert_eq!(dets[0].bbox, kept[0].bbox);
}

#[test]
fn detection_rows_round_trip_through_tensor() {
    let det = Detection {
        image_id: 2,
        label: 5,
        confidence: 0.75,
        bbox: BBox::new(0.1, 0.2, 0.3, 0.4),
    };
    let mut data = det.to_row().to_vec();
    data.extend_from_slice(&[-1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
    let tensor = DetectionTensor::from_vec(data).unwrap();
    assert_eq!(tensor.rows(), 2);
    assert_eq!(tensor.num_detections(), 1);
    assert_eq!(Detection::from_row(tensor.row(0).unwrap()), Some(det));
    assert_eq!(Detection::from_row(tensor.row(1).unwrap()), None);
    assert_eq!(tensor.into_vec().len(), 14);
}
