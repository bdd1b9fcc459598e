// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Object detector seam used by the prediction endpoint

use image::RgbImage;
use thiserror::Error;

use super::class_names::ClassNameTable;
use super::types::Detection;

/// Errors raised while loading or running a detection model
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Detection model not found: {0}")]
    ModelNotFound(String),

    #[error("Failed to load detection model: {0}")]
    ModelLoad(String),

    #[error("Invalid detector input: {0}")]
    InvalidInput(String),

    #[error("Detection inference failed: {0}")]
    Runtime(String),

    #[error("Unexpected detection output: {0}")]
    UnexpectedOutput(String),

    #[error("Detection session is unavailable (lock poisoned)")]
    Poisoned,
}

/// A loaded detector that finds objects in RGB images
///
/// Implementations are shared read-only across requests, so `detect` takes
/// `&self` and any interior session state must handle its own locking.
#[cfg_attr(test, mockall::automock)]
pub trait ObjectDetector: Send + Sync {
    /// Run detection on an `H x W x 3` RGB image
    fn detect(&self, image: &RgbImage) -> Result<Vec<Detection>, InferenceError>;

    /// Class index -> name table for this detector's output
    fn class_names(&self) -> &ClassNameTable;
}
