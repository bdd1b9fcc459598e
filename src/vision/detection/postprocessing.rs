// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Decoding of raw YOLO output tensors into detections
//!
//! Supported layouts (batch dimension optional):
//! - `[1, 4 + nc, N]` YOLOv8/YOLO11 export, channels first, no objectness
//! - `[1, N, 4 + nc]` the same data transposed
//! - `[1, N, 5 + nc]` YOLOv5 export with an objectness column
//!
//! When the class count is known, the channel count (`nc + 4` or `nc + 5`)
//! picks the layout. Otherwise the shorter axis is taken as channels and
//! no objectness column is assumed.

use ndarray::{ArrayView2, ArrayViewD, Axis, Ix2};
use std::cmp::Ordering;

use super::detector::InferenceError;
use super::preprocessing::Letterbox;
use super::types::{BoundingBox, Detection};

/// Default confidence threshold (Ultralytics `predict` default)
pub const DEFAULT_CONF_THRESHOLD: f32 = 0.25;

/// Default IoU threshold for NMS (Ultralytics `predict` default)
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.7;

/// Default cap on detections kept per image
pub const DEFAULT_MAX_DETECTIONS: usize = 300;

/// Filtering parameters applied after inference
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PostprocessParams {
    pub conf_threshold: f32,
    pub iou_threshold: f32,
    pub max_detections: usize,
}

impl Default for PostprocessParams {
    fn default() -> Self {
        Self {
            conf_threshold: DEFAULT_CONF_THRESHOLD,
            iou_threshold: DEFAULT_IOU_THRESHOLD,
            max_detections: DEFAULT_MAX_DETECTIONS,
        }
    }
}

/// Memory layout of the prediction tensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputLayout {
    /// `[channels, anchors]`, box then class scores
    ChannelsFirst,
    /// `[anchors, channels]`, box then class scores
    Rows,
    /// `[anchors, channels]`, box, objectness, then class scores
    RowsWithObjectness,
}

impl OutputLayout {
    fn has_objectness(self) -> bool {
        matches!(self, OutputLayout::RowsWithObjectness)
    }
}

/// Work out the layout of a 2D prediction matrix
///
/// `num_classes` is the size of the class table, or 0 when unknown. A known
/// class count decides first, so square `[4 + nc, 4 + nc]` outputs from
/// small input sizes stay channels-first. The shape alone is used only when
/// no channel count matches.
pub fn infer_layout(rows: usize, cols: usize, num_classes: usize) -> OutputLayout {
    if num_classes > 0 {
        if rows == num_classes + 4 {
            return OutputLayout::ChannelsFirst;
        }
        if cols == num_classes + 5 {
            return OutputLayout::RowsWithObjectness;
        }
        if cols == num_classes + 4 {
            return OutputLayout::Rows;
        }
    }

    if rows < cols {
        OutputLayout::ChannelsFirst
    } else {
        OutputLayout::Rows
    }
}

/// Strip the batch dimension and return the prediction matrix
fn prediction_matrix(output: ArrayViewD<'_, f32>) -> Result<ArrayView2<'_, f32>, InferenceError> {
    let shape = output.shape().to_vec();
    let matrix = match shape.len() {
        3 if shape[0] == 1 => output.index_axis_move(Axis(0), 0),
        3 => {
            return Err(InferenceError::UnexpectedOutput(format!(
                "batch size {} in output {:?}, expected 1",
                shape[0], shape
            )))
        }
        2 => output,
        _ => {
            return Err(InferenceError::UnexpectedOutput(format!(
                "output shape {:?}, expected [1, C, N] or [1, N, C]",
                shape
            )))
        }
    };

    matrix
        .into_dimensionality::<Ix2>()
        .map_err(|e| InferenceError::UnexpectedOutput(e.to_string()))
}

/// Decode a raw YOLO output tensor into detections in original-image pixels
///
/// Results are sorted by descending confidence; equal confidences keep
/// anchor order.
pub fn decode_output(
    output: ArrayViewD<'_, f32>,
    num_classes: usize,
    params: &PostprocessParams,
    letterbox: &Letterbox,
) -> Result<Vec<Detection>, InferenceError> {
    let matrix = prediction_matrix(output)?;
    let (rows, cols) = matrix.dim();
    let layout = infer_layout(rows, cols, num_classes);

    // Normalise to one row per anchor
    let anchors = match layout {
        OutputLayout::ChannelsFirst => matrix.reversed_axes(),
        OutputLayout::Rows | OutputLayout::RowsWithObjectness => matrix,
    };

    let channels = anchors.ncols();
    let class_offset = if layout.has_objectness() { 5 } else { 4 };
    if channels <= class_offset {
        return Err(InferenceError::UnexpectedOutput(format!(
            "{} channels per anchor leaves no class scores",
            channels
        )));
    }

    let mut candidates = Vec::new();
    for anchor in anchors.rows() {
        let objectness = if layout.has_objectness() { anchor[4] } else { 1.0 };

        let (class_index, class_score) = anchor
            .iter()
            .skip(class_offset)
            .enumerate()
            .fold((0usize, f32::MIN), |best, (index, &score)| {
                if score > best.1 {
                    (index, score)
                } else {
                    best
                }
            });

        let confidence = objectness * class_score;
        if !(confidence > params.conf_threshold) {
            continue;
        }

        candidates.push(Detection::new(
            class_index,
            confidence,
            BoundingBox::from_center(anchor[0], anchor[1], anchor[2], anchor[3]),
        ));
    }

    let mut kept = non_max_suppression(candidates, params.iou_threshold, params.max_detections);
    for detection in &mut kept {
        detection.bounding_box = letterbox.to_original(&detection.bounding_box);
    }

    Ok(kept)
}

/// Greedy class-aware non-maximum suppression
///
/// A box is dropped when it overlaps an already kept box of the same class
/// with IoU above `iou_threshold`.
pub fn non_max_suppression(
    mut candidates: Vec<Detection>,
    iou_threshold: f32,
    max_detections: usize,
) -> Vec<Detection> {
    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
    });

    let mut kept: Vec<Detection> = Vec::new();
    for candidate in candidates {
        if kept.len() >= max_detections {
            break;
        }

        let suppressed = kept.iter().any(|existing| {
            existing.class_index == candidate.class_index
                && existing.bounding_box.iou(&candidate.bounding_box) > iou_threshold
        });

        if !suppressed {
            kept.push(candidate);
        }
    }

    kept
}
