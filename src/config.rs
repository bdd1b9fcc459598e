// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Process configuration for the prediction server
//!
//! Every option can be given as a command-line flag or an environment
//! variable (a `.env` file is loaded first by `main`).

use anyhow::{Context, Result};
use clap::Parser;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use crate::vision::detection::postprocessing::{
    DEFAULT_CONF_THRESHOLD, DEFAULT_IOU_THRESHOLD, DEFAULT_MAX_DETECTIONS,
};
use crate::vision::detection::{DetectionParams, PostprocessParams};

/// Default upload limit (10MB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// YOLO prediction server
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "yolo-predict-node")]
#[command(version)]
#[command(about = "Serve POST /predict/ with a YOLO ONNX model", long_about = None)]
pub struct ServerConfig {
    /// Address to listen on
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "API_PORT", default_value_t = 8000)]
    pub port: u16,

    /// Path to the exported YOLO ONNX model
    #[arg(long, env = "MODEL_PATH", default_value = "./models/custom_yolo.onnx")]
    pub model_path: PathBuf,

    /// Optional class names file (one per line); overrides model metadata
    #[arg(long, env = "CLASS_NAMES_PATH")]
    pub class_names_path: Option<PathBuf>,

    /// Minimum confidence for a detection to be kept
    #[arg(long, env = "CONF_THRESHOLD", default_value_t = DEFAULT_CONF_THRESHOLD)]
    pub conf_threshold: f32,

    /// IoU threshold for non-maximum suppression
    #[arg(long, env = "IOU_THRESHOLD", default_value_t = DEFAULT_IOU_THRESHOLD)]
    pub iou_threshold: f32,

    /// Maximum detections kept per image
    #[arg(long, env = "MAX_DETECTIONS", default_value_t = DEFAULT_MAX_DETECTIONS)]
    pub max_detections: usize,

    /// Square model input size; defaults to the model metadata, then 640
    #[arg(long, env = "INPUT_SIZE")]
    pub input_size: Option<u32>,

    /// ONNX Runtime intra-op threads
    #[arg(long, env = "INTRA_THREADS", default_value_t = 4)]
    pub intra_threads: usize,

    /// Maximum request body size in bytes
    #[arg(long, env = "MAX_UPLOAD_BYTES", default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
    pub max_upload_bytes: usize,
}

impl ServerConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.conf_threshold) {
            return Err(format!(
                "conf_threshold must be within [0, 1], got {}",
                self.conf_threshold
            ));
        }

        if !(0.0..=1.0).contains(&self.iou_threshold) {
            return Err(format!(
                "iou_threshold must be within [0, 1], got {}",
                self.iou_threshold
            ));
        }

        if self.max_detections == 0 {
            return Err("max_detections must be greater than 0".to_string());
        }

        if let Some(size) = self.input_size {
            if size == 0 || size % 32 != 0 {
                return Err(format!(
                    "input_size must be a positive multiple of 32, got {}",
                    size
                ));
            }
        }

        if self.intra_threads == 0 {
            return Err("intra_threads must be greater than 0".to_string());
        }

        if self.max_upload_bytes == 0 {
            return Err("max_upload_bytes must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Socket address built from `host` and `port`
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self
            .host
            .parse()
            .with_context(|| format!("Invalid listen host {}", self.host))?;
        Ok(SocketAddr::new(ip, self.port))
    }

    /// Detector load settings derived from this configuration
    pub fn detection_params(&self) -> DetectionParams {
        DetectionParams {
            input_size: self.input_size,
            intra_threads: self.intra_threads,
            postprocess: PostprocessParams {
                conf_threshold: self.conf_threshold,
                iou_threshold: self.iou_threshold,
                max_detections: self.max_detections,
            },
        }
    }
}
