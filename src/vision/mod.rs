// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vision processing module for CPU-based image analysis
//!
//! This module provides:
//! - Upload decoding to RGB pixel buffers
//! - YOLO object detection via ONNX Runtime

pub mod detection;
pub mod image_utils;

pub use detection::{
    top_detection, BoundingBox, ClassNameTable, Detection, DetectionParams, InferenceError,
    ObjectDetector, YoloDetectionModel,
};
pub use image_utils::{decode_image_bytes, detect_format, ImageError, ImageInfo};
