// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Selection of the single most confident detection

use super::types::Detection;

/// Return the detection with the highest confidence
///
/// On exact ties the earliest detection wins. NaN confidences never win.
/// Returns `None` for an empty slice.
pub fn top_detection(detections: &[Detection]) -> Option<&Detection> {
    detections.iter().fold(None, |best: Option<&Detection>, candidate| match best {
        Some(current) if !(candidate.confidence > current.confidence) => Some(current),
        _ if candidate.confidence.is_nan() => best,
        _ => Some(candidate),
    })
}
