//! Static metrics logs and dataset fixtures used across harnesses.
//!
//! Each log is a `&'static str` exactly as a trainer would leave it in
//! `metrics.json`: one record per line, trailing newline included.

/// The two-step log from the end-to-end scenario.
pub const LOG_TWO_STEPS: &str = "{\"loss\": 0.5, \"accuracy\": 0.9}\n{\"loss\": 0.3, \"accuracy\": 0.95}\n";

/// Report expected for [`LOG_TWO_STEPS`].
pub const REPORT_TWO_STEPS: &str =
    r#"{"metrics": [{"loss": 0.5, "accuracy": 0.9}, {"loss": 0.3, "accuracy": 0.95}]}"#;

/// Lines in the shape a Detectron2-style trainer writes every 20 iterations.
pub const LOG_DETECTRON: &str = concat!(
    "{\"data_time\": 0.0021, \"eta_seconds\": 1520.3, \"fast_rcnn/cls_accuracy\": 0.8125, \"iteration\": 19, \"loss_box_reg\": 0.3101, \"loss_cls\": 0.4412, \"lr\": 0.000399, \"time\": 0.4011, \"total_loss\": 1.2043}\n",
    "{\"data_time\": 0.0019, \"eta_seconds\": 1512.8, \"fast_rcnn/cls_accuracy\": 0.8437, \"iteration\": 39, \"loss_box_reg\": 0.2954, \"loss_cls\": 0.3877, \"lr\": 0.000799, \"time\": 0.3987, \"total_loss\": 1.0311}\n",
    "{\"data_time\": 0.0020, \"eta_seconds\": 1505.1, \"fast_rcnn/cls_accuracy\": 0.8593, \"iteration\": 59, \"loss_box_reg\": 0.2870, \"loss_cls\": 0.3302, \"lr\": 0.001199, \"time\": 0.3992, \"total_loss\": 0.9520}\n",
    "{\"bbox/AP\": 41.37, \"bbox/AP50\": 63.2, \"bbox/AP75\": 44.9, \"iteration\": 59}\n",
);

/// Logs that must be rejected, with the 1-based line the error points at.
pub const LOGS_MALFORMED: &[(&str, &str, usize)] = &[
    ("missing_separator", "{\"loss\" 0.5}\n", 1),
    ("non_numeric", "{\"loss\": 0.5}\n{\"loss\": high}\n", 2),
    ("nan_value", "{\"loss\": NaN}\n", 1),
    ("truncated_line", "{\"loss\": 0.5}\n{\"loss\": 0.4\n", 2),
    ("quoted_value", "{\"loss\": \"0.5\"}\n", 1),
];

/// Minimal valid COCO annotation file.
pub const COCO_ANNOTATIONS: &str = r#"{
  "images": [
    {"id": 1, "file_name": "0001.jpg", "width": 640, "height": 480},
    {"id": 2, "file_name": "0002.jpg", "width": 640, "height": 480}
  ],
  "annotations": [
    {"id": 1, "image_id": 1, "category_id": 1, "bbox": [10, 20, 50, 40], "area": 2000, "iscrowd": 0},
    {"id": 2, "image_id": 2, "category_id": 1, "bbox": [30, 30, 20, 20], "area": 400, "iscrowd": 0}
  ],
  "categories": [{"id": 1, "name": "polyp"}]
}"#;

/// A model definition in Detectron2's YAML layout.
pub const MODEL_YAML: &str = "\
_BASE_: \"../Base-RCNN-FPN.yaml\"
MODEL:
  WEIGHTS: \"detectron2://ImageNetPretrained/MSRA/R-50.pkl\"
  ROI_HEADS:
    NUM_CLASSES: 1
SOLVER:
  BASE_LR: 0.02
  MAX_ITER: 60
";

/// Build a log of `n` records with a decreasing loss.
pub fn synthetic_log(n: usize) -> String {
    (0..n)
        .map(|i| {
            format!(
                "{{\"iteration\": {}, \"total_loss\": {}, \"lr\": 0.02}}\n",
                i * 20 + 19,
                1.0 / (i as f64 + 1.0)
            )
        })
        .collect()
}
