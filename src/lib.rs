// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod config;
pub mod version;
pub mod vision;

pub use api::{create_router, start_server, ApiError, AppState, PredictionResult};
pub use config::ServerConfig;
pub use vision::{ClassNameTable, Detection, InferenceError, ObjectDetector, YoloDetectionModel};
