#![cfg(feature = "rayon")]

use detout::{DetectionInputs, DetectionOutput, DetectionOutputConfig};

fn make_inputs(batch: usize, num_priors: usize, num_classes: usize) -> (Vec<f32>, Vec<f32>, Vec<f32>) {
    let mut priors = Vec::with_capacity(num_priors * 8);
    for p in 0..num_priors {
        let x = ((p * 7) % 10) as f32 / 10.0;
        let y = ((p * 3) % 10) as f32 / 10.0;
        priors.extend_from_slice(&[x, y, x + 0.15, y + 0.2]);
    }
    for _ in 0..num_priors {
        priors.extend_from_slice(&[0.1, 0.1, 0.2, 0.2]);
    }

    let loc = (0..batch * num_priors * 4)
        .map(|i| (((i * 37) % 19) as f32 - 9.0) / 30.0)
        .collect();
    let conf = (0..batch * num_priors * num_classes)
        .map(|i| ((i * 53 + i / 7) % 101) as f32 / 100.0)
        .collect();
    (loc, conf, priors)
}

#[test]
fn parallel_matches_sequential() {
    let batch = 6;
    let num_priors = 200;
    let num_classes = 5;
    let (loc, conf, priors) = make_inputs(batch, num_priors, num_classes);
    let inputs = DetectionInputs::new(&loc, &conf, &priors);

    let base_cfg = DetectionOutputConfig {
        num_classes,
        confidence_threshold: 0.3,
        nms_threshold: 0.45,
        top_k: 50,
        keep_top_k: 25,
        ..DetectionOutputConfig::default()
    };
    let seq = DetectionOutput::new(DetectionOutputConfig {
        parallel: false,
        ..base_cfg.clone()
    })
    .unwrap();
    let par = DetectionOutput::new(DetectionOutputConfig {
        parallel: true,
        ..base_cfg
    })
    .unwrap();

    let seq_out = seq.decode(inputs, batch).unwrap();
    let par_out = par.decode(inputs, batch).unwrap();

    assert!(seq_out.num_detections() > 0);
    assert_eq!(seq_out, par_out);
}
