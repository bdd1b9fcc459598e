// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Multipart upload extraction for the predict endpoint

use axum::body::Bytes;
use axum::http::StatusCode;
use axum_extra::extract::multipart::{Multipart, MultipartError};
use tracing::debug;

use crate::api::errors::ApiError;

/// Name of the form field carrying the image
pub const FILE_FIELD: &str = "file";

/// A file read from a multipart form
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Form field name
    pub field_name: Option<String>,
    /// Client-supplied file name
    pub file_name: Option<String>,
    /// Declared content type (informational only)
    pub content_type: Option<String>,
    /// Raw file bytes
    pub data: Bytes,
}

/// Read the uploaded image from a multipart form
///
/// The part named `file` is preferred. If the form has no such part, the
/// first part that carries a file name is used instead.
///
/// # Errors
/// - 400 if the multipart body is malformed
/// - 413 if the body exceeds the configured upload limit
/// - 422 if no file part is present
pub async fn read_upload(multipart: &mut Multipart) -> Result<UploadedFile, ApiError> {
    let mut fallback: Option<UploadedFile> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let field_name = field.name().map(str::to_string);
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);

        let is_file_field = field_name.as_deref() == Some(FILE_FIELD);
        if !is_file_field && (file_name.is_none() || fallback.is_some()) {
            debug!("Skipping multipart field {:?}", field_name);
            continue;
        }

        let data = field.bytes().await.map_err(multipart_error)?;
        let upload = UploadedFile {
            field_name,
            file_name,
            content_type,
            data,
        };

        if is_file_field {
            return Ok(upload);
        }
        fallback = Some(upload);
    }

    fallback.ok_or_else(|| ApiError::ValidationError {
        field: FILE_FIELD.to_string(),
        message: "a multipart file field is required".to_string(),
    })
}

fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(e.body_text())
    } else {
        ApiError::InvalidRequest(e.body_text())
    }
}
