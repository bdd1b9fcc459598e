// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! YOLO object detection
//!
//! Components:
//! - `detector` - `ObjectDetector` trait and `InferenceError`
//! - `model` - ONNX Runtime YOLO implementation
//! - `preprocessing` - Letterbox and tensor conversion
//! - `postprocessing` - Output decoding and NMS
//! - `class_names` - Class index -> name table
//! - `selector` - Top detection selection

pub mod class_names;
pub mod detector;
pub mod model;
pub mod postprocessing;
pub mod preprocessing;
pub mod selector;
pub mod types;

pub use class_names::ClassNameTable;
pub use detector::{InferenceError, ObjectDetector};
pub use model::{DetectionParams, YoloDetectionModel};
pub use postprocessing::PostprocessParams;
pub use selector::top_detection;
pub use types::{BoundingBox, Detection};
