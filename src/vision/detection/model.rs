// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! YOLO object detection model on ONNX Runtime
//!
//! Loads an Ultralytics-style YOLO export (`.onnx`) once at startup and runs
//! it on CPU. Class names and input size are read from the export's custom
//! metadata when present.

use image::RgbImage;
use ndarray::Array4;
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, info, warn};

use super::class_names::ClassNameTable;
use super::detector::{InferenceError, ObjectDetector};
use super::postprocessing::{decode_output, PostprocessParams};
use super::preprocessing::{preprocess_for_detection, Letterbox, DEFAULT_INPUT_SIZE};
use super::types::Detection;

/// Load-time settings for a detection model
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionParams {
    /// Square input size; `None` uses the model metadata or 640
    pub input_size: Option<u32>,
    /// Intra-op thread count for ONNX Runtime
    pub intra_threads: usize,
    /// Confidence / NMS filtering
    pub postprocess: PostprocessParams,
}

impl Default for DetectionParams {
    fn default() -> Self {
        Self {
            input_size: None,
            intra_threads: 4,
            postprocess: PostprocessParams::default(),
        }
    }
}

/// YOLO detection model backed by an ONNX Runtime session
#[derive(Clone)]
pub struct YoloDetectionModel {
    /// ONNX Runtime session (runs are serialized)
    session: Arc<Mutex<Session>>,
    /// Model input name
    input_name: String,
    /// Square model input size
    input_size: u32,
    /// Class index -> name table
    class_names: ClassNameTable,
    /// Post-inference filtering
    postprocess: PostprocessParams,
}

impl std::fmt::Debug for YoloDetectionModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YoloDetectionModel")
            .field("input_name", &self.input_name)
            .field("input_size", &self.input_size)
            .field("num_classes", &self.class_names.len())
            .field("postprocess", &self.postprocess)
            .finish_non_exhaustive()
    }
}

impl YoloDetectionModel {
    /// Load a YOLO model from an ONNX file
    ///
    /// # Arguments
    /// - `model_path`: Path to the exported `.onnx` model
    /// - `params`: Input size, threading and filtering settings
    /// - `class_names`: Explicit class table; `None` reads the model's
    ///   `names` metadata
    ///
    /// # Errors
    /// Returns error if:
    /// - Model file not found
    /// - ONNX Runtime initialization fails
    pub async fn new<P: AsRef<Path>>(
        model_path: P,
        params: DetectionParams,
        class_names: Option<ClassNameTable>,
    ) -> Result<Self, InferenceError> {
        let model_path = model_path.as_ref();

        if !model_path.exists() {
            return Err(InferenceError::ModelNotFound(
                model_path.display().to_string(),
            ));
        }

        info!("Loading YOLO detection model from {}", model_path.display());

        let session = Session::builder()
            .map_err(|e| load_err("Failed to create session builder", e))?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .map_err(|e| load_err("Failed to set CPU execution provider", e))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| load_err("Failed to set optimization level", e))?
            .with_intra_threads(params.intra_threads)
            .map_err(|e| load_err("Failed to set intra threads", e))?
            .commit_from_file(model_path)
            .map_err(|e| {
                load_err(
                    &format!("Failed to load model from {}", model_path.display()),
                    e,
                )
            })?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "images".to_string());

        let class_names = match class_names {
            Some(table) => table,
            None => match read_metadata(&session, "names")
                .and_then(|names| ClassNameTable::from_metadata(&names))
            {
                Some(table) => table,
                None => {
                    warn!("Model has no class name metadata; names will be class<N>");
                    ClassNameTable::default()
                }
            },
        };

        let input_size = params
            .input_size
            .or_else(|| read_metadata(&session, "imgsz").and_then(|v| parse_imgsz(&v)))
            .unwrap_or(DEFAULT_INPUT_SIZE);

        debug!(
            "Detection model loaded - input: {}, size: {}, classes: {}",
            input_name,
            input_size,
            class_names.len()
        );

        info!("✅ YOLO detection model loaded successfully (CPU-only)");

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
            input_size,
            class_names,
            postprocess: params.postprocess,
        })
    }

    /// Square input size the model runs at
    pub fn input_size(&self) -> u32 {
        self.input_size
    }

    /// Filtering parameters in effect
    pub fn postprocess_params(&self) -> &PostprocessParams {
        &self.postprocess
    }

    /// Run a blank input once so the first request does not pay graph setup cost
    pub fn warmup(&self) -> Result<(), InferenceError> {
        let size = self.input_size as usize;
        let input = Array4::<f32>::zeros((1, 3, size, size));
        let letterbox = Letterbox::compute(self.input_size, self.input_size, self.input_size);

        let start = Instant::now();
        self.run(input, &letterbox)?;
        debug!("Detection warmup took {}ms", start.elapsed().as_millis());
        Ok(())
    }

    /// Run the session on a preprocessed `[1, 3, S, S]` tensor
    fn run(
        &self,
        input: Array4<f32>,
        letterbox: &Letterbox,
    ) -> Result<Vec<Detection>, InferenceError> {
        let mut session = self.session.lock().map_err(|_| InferenceError::Poisoned)?;

        let input_value = Value::from_array(input)
            .map_err(|e| InferenceError::Runtime(format!("Failed to create input tensor: {}", e)))?;

        let outputs = session
            .run(ort::inputs![&self.input_name => input_value])
            .map_err(|e| InferenceError::Runtime(e.to_string()))?;

        let output_tensor = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e| {
                InferenceError::UnexpectedOutput(format!("Failed to extract output tensor: {}", e))
            })?;

        decode_output(
            output_tensor.view(),
            self.class_names.num_classes(),
            &self.postprocess,
            letterbox,
        )
    }
}

impl ObjectDetector for YoloDetectionModel {
    fn detect(&self, image: &RgbImage) -> Result<Vec<Detection>, InferenceError> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(InferenceError::InvalidInput(format!(
                "image has zero size ({}x{})",
                width, height
            )));
        }

        let start = Instant::now();
        let (input, letterbox) = preprocess_for_detection(image, self.input_size);
        let detections = self.run(input, &letterbox)?;

        debug!(
            "Detected {} objects in {}x{} image ({}ms)",
            detections.len(),
            width,
            height,
            start.elapsed().as_millis()
        );

        Ok(detections)
    }

    fn class_names(&self) -> &ClassNameTable {
        &self.class_names
    }
}

fn load_err<E: std::fmt::Display>(stage: &str, e: E) -> InferenceError {
    InferenceError::ModelLoad(format!("{}: {}", stage, e))
}

/// Read a custom metadata entry from an ONNX session
fn read_metadata(session: &Session, key: &str) -> Option<String> {
    let metadata = session.metadata().ok()?;
    metadata.custom(key).ok().flatten()
}

/// Parse Ultralytics `imgsz` metadata (`[640, 640]` or `640`)
///
/// Non-square sizes are not supported by the letterbox; the larger side wins.
fn parse_imgsz(value: &str) -> Option<u32> {
    value
        .trim_matches(|c| c == '[' || c == ']' || c == '(' || c == ')')
        .split(',')
        .filter_map(|part| part.trim().parse::<u32>().ok())
        .max()
        .filter(|size| *size > 0)
}
