// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Predict API endpoint module
//!
//! Provides POST /predict/ for reporting the most confident detected object.

pub mod handler;
pub mod response;
pub mod upload;

pub use handler::{predict_handler, run_prediction};
pub use response::{PredictionResult, NO_DETECTION_CLASS};
pub use upload::{read_upload, UploadedFile, FILE_FIELD};
