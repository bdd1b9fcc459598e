// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image preprocessing for YOLO detection models

use image::imageops::{self, FilterType};
use image::RgbImage;
use ndarray::Array4;

use super::types::BoundingBox;

/// Default square input size for YOLO models
pub const DEFAULT_INPUT_SIZE: u32 = 640;

/// Grey value used for letterbox padding (Ultralytics convention)
pub const PAD_VALUE: u8 = 114;

/// Geometry of a letterbox transform, used to map boxes back
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    /// Resize ratio applied to the original image
    pub scale: f32,
    /// Horizontal padding (left) in model-input pixels
    pub pad_x: f32,
    /// Vertical padding (top) in model-input pixels
    pub pad_y: f32,
    /// Original image width
    pub orig_width: u32,
    /// Original image height
    pub orig_height: u32,
}

impl Letterbox {
    /// Compute the letterbox transform for an image into a square target
    pub fn compute(orig_width: u32, orig_height: u32, target_size: u32) -> Self {
        let scale = (target_size as f32 / orig_width as f32)
            .min(target_size as f32 / orig_height as f32);

        let new_w = ((orig_width as f32 * scale).round() as u32).clamp(1, target_size);
        let new_h = ((orig_height as f32 * scale).round() as u32).clamp(1, target_size);

        Self {
            scale,
            pad_x: ((target_size - new_w) / 2) as f32,
            pad_y: ((target_size - new_h) / 2) as f32,
            orig_width,
            orig_height,
        }
    }

    /// Resized (unpadded) dimensions inside the target square
    pub fn resized_dimensions(&self, target_size: u32) -> (u32, u32) {
        let w = ((self.orig_width as f32 * self.scale).round() as u32).clamp(1, target_size);
        let h = ((self.orig_height as f32 * self.scale).round() as u32).clamp(1, target_size);
        (w, h)
    }

    /// Map a box from model-input space back to original-image pixels
    pub fn to_original(&self, bbox: &BoundingBox) -> BoundingBox {
        BoundingBox {
            x1: (bbox.x1 - self.pad_x) / self.scale,
            y1: (bbox.y1 - self.pad_y) / self.scale,
            x2: (bbox.x2 - self.pad_x) / self.scale,
            y2: (bbox.y2 - self.pad_y) / self.scale,
        }
        .clip(self.orig_width as f32, self.orig_height as f32)
    }
}

/// Preprocess an RGB image for YOLO detection
///
/// Steps:
/// 1. Resize with aspect ratio preservation to fit `target_size`
/// 2. Centre on a `target_size` square padded with grey (114)
/// 3. Scale pixels to [0, 1]
/// 4. Convert to NCHW tensor format [1, 3, S, S]
pub fn preprocess_for_detection(image: &RgbImage, target_size: u32) -> (Array4<f32>, Letterbox) {
    let (orig_w, orig_h) = image.dimensions();
    let letterbox = Letterbox::compute(orig_w, orig_h, target_size);
    let (new_w, new_h) = letterbox.resized_dimensions(target_size);

    let resized = if (new_w, new_h) == (orig_w, orig_h) {
        image.clone()
    } else {
        imageops::resize(image, new_w, new_h, FilterType::Triangle)
    };

    let size = target_size as usize;
    let mut tensor = Array4::from_elem((1, 3, size, size), PAD_VALUE as f32 / 255.0);

    let offset_x = letterbox.pad_x as usize;
    let offset_y = letterbox.pad_y as usize;

    for (x, y, pixel) in resized.enumerate_pixels() {
        let tx = offset_x + x as usize;
        let ty = offset_y + y as usize;
        for c in 0..3 {
            tensor[[0, c, ty, tx]] = pixel[c] as f32 / 255.0;
        }
    }

    (tensor, letterbox)
}
