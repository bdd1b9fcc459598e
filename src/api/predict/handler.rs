// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Predict endpoint handler

use axum::{extract::State, Json};
use axum_extra::extract::multipart::{Multipart, MultipartRejection};
use std::time::Instant;
use tracing::{debug, info};

use super::response::PredictionResult;
use super::upload::read_upload;
use crate::api::errors::ApiError;
use crate::api::http_server::AppState;
use crate::vision::{decode_image_bytes, ObjectDetector};

/// POST /predict/ - Report the most confident object in an uploaded image
///
/// # Request
/// `multipart/form-data` with the image in the `file` field. The declared
/// content type is ignored; the bytes are sniffed.
///
/// # Response
/// - `class`: Name of the most confident detection, or `"none"`
/// - `probability`: Its confidence (0.0-1.0), or `0.0`
///
/// # Errors
/// - 400 Bad Request: Malformed multipart body
/// - 422 Unprocessable Entity: No file in the form
/// - 500 Internal Server Error: Image decoding or detection failed
pub async fn predict_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<PredictionResult>, ApiError> {
    let mut multipart = multipart.map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
    let upload = read_upload(&mut multipart).await?;

    debug!(
        "Predict request: field={:?}, file={:?}, content_type={:?}, {} bytes",
        upload.field_name,
        upload.file_name,
        upload.content_type,
        upload.data.len()
    );

    let start = Instant::now();
    let detector = state.detector.clone();

    // Decoding and inference are CPU-bound; keep them off the async workers
    let result = tokio::task::spawn_blocking(move || run_prediction(detector.as_ref(), &upload.data))
        .await
        .map_err(|e| ApiError::InternalError(format!("prediction task failed: {}", e)))??;

    info!(
        "Prediction complete: class={}, probability={:.3}, {}ms",
        result.class_name,
        result.probability,
        start.elapsed().as_millis()
    );

    Ok(Json(result))
}

/// Decode an uploaded image, run the detector and pick the top detection
pub fn run_prediction(
    detector: &dyn ObjectDetector,
    bytes: &[u8],
) -> Result<PredictionResult, ApiError> {
    let (image, info) = decode_image_bytes(bytes)?;
    debug!(
        "Decoded image: {}x{} {:?}, {} bytes",
        info.width, info.height, info.format, info.size_bytes
    );

    let detections = detector.detect(&image)?;
    debug!("{} detections", detections.len());

    Ok(PredictionResult::from_detections(
        &detections,
        detector.class_names(),
    ))
}
