// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Predict response types

use serde::{Deserialize, Serialize};

use crate::vision::{top_detection, ClassNameTable, Detection};

/// Class reported when nothing was detected
pub const NO_DETECTION_CLASS: &str = "none";

/// Response from POST /predict/
///
/// Serializes as `{"class": "<name>", "probability": <0..1>}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PredictionResult {
    /// Name of the most confident detected class
    #[serde(rename = "class")]
    pub class_name: String,
    /// Confidence of that detection (0.0-1.0)
    pub probability: f32,
}

impl PredictionResult {
    /// The `{"class": "none", "probability": 0.0}` result
    pub fn none() -> Self {
        Self {
            class_name: NO_DETECTION_CLASS.to_string(),
            probability: 0.0,
        }
    }

    /// Build the result from the most confident detection
    pub fn from_detections(detections: &[Detection], class_names: &ClassNameTable) -> Self {
        match top_detection(detections) {
            Some(top) => Self {
                class_name: class_names.resolve(top.class_index),
                probability: top.confidence,
            },
            None => Self::none(),
        }
    }
}
