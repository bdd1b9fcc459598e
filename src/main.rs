// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::{env, sync::Arc};
use yolo_predict_node::{
    api::{start_server, AppState},
    config::ServerConfig,
    vision::{ClassNameTable, ObjectDetector, YoloDetectionModel},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    dotenv::dotenv().ok();

    println!("🚀 Starting {}...\n", yolo_predict_node::version::get_version_string());
    println!("📦 BUILD VERSION: {}", yolo_predict_node::version::VERSION);
    println!("📅 Build Date: {}", yolo_predict_node::version::BUILD_DATE);
    println!("🧩 Features: {}", yolo_predict_node::version::FEATURES.join(", "));
    println!();

    let config = ServerConfig::parse();
    config
        .validate()
        .map_err(|e| anyhow!("Invalid configuration: {}", e))?;

    let class_names = match &config.class_names_path {
        Some(path) => {
            let table = ClassNameTable::from_file(path)
                .with_context(|| format!("Failed to load class names from {}", path.display()))?;
            println!("🏷️  Loaded {} class names from {}", table.len(), path.display());
            Some(table)
        }
        None => None,
    };

    println!("📦 Loading model: {}", config.model_path.display());
    let model = match YoloDetectionModel::new(
        &config.model_path,
        config.detection_params(),
        class_names,
    )
    .await
    {
        Ok(model) => model,
        Err(e) => {
            eprintln!("❌ Failed to load model: {}", e);
            eprintln!("   Set MODEL_PATH to an exported YOLO .onnx file.");
            return Err(e.into());
        }
    };

    model.warmup().context("Model warmup failed")?;
    println!("✅ Model loaded successfully");
    println!("   Input size: {}", model.input_size());
    println!("   Classes: {}", model.class_names().len());
    println!(
        "   Confidence threshold: {}",
        model.postprocess_params().conf_threshold
    );

    let state = AppState::new(Arc::new(model));

    println!("\n🌐 Serving POST /predict/ on {}:{}", config.host, config.port);
    start_server(&config, state).await?;

    println!("👋 Shutdown complete");
    Ok(())
}
