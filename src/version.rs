// Version information for the YOLO prediction node

/// Full version string with feature description
pub const VERSION: &str = "v0.1.0-yolo-predict-2026-10-19";

/// Semantic version number
pub const VERSION_NUMBER: &str = env!("CARGO_PKG_VERSION");

/// Build date
pub const BUILD_DATE: &str = "2026-10-19";

/// Supported features in this version
pub const FEATURES: &[&str] = &[
    "yolo-onnx",
    "multipart-upload",
    "top-detection",
    "class-name-metadata",
];

/// Get formatted version string for logging
pub fn get_version_string() -> String {
    format!("YOLO Predict Node {} ({})", VERSION_NUMBER, BUILD_DATE)
}
