// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! End-to-end tests for POST /predict/
//!
//! The router is driven with `oneshot` against a fixture detector so the
//! HTTP surface can be checked without an ONNX model on disk.

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use serde_json::Value;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::util::ServiceExt;
use yolo_predict_node::{
    api::{create_router, AppState},
    vision::{BoundingBox, ClassNameTable, Detection, InferenceError, ObjectDetector},
};

const BOUNDARY: &str = "yolo-predict-test-boundary";
const MAX_UPLOAD: usize = 1024 * 1024;

/// Detector returning a fixed answer and counting calls
struct FixtureDetector {
    detections: Vec<Detection>,
    class_names: ClassNameTable,
    failure: Option<String>,
    calls: AtomicUsize,
}

impl FixtureDetector {
    fn returning(detections: Vec<Detection>) -> Self {
        Self {
            detections,
            class_names: ClassNameTable::new(["cat", "dog", "tumbler"]),
            failure: None,
            calls: AtomicUsize::new(0),
        }
    }

    fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::returning(vec![])
        }
    }
}

impl ObjectDetector for FixtureDetector {
    fn detect(&self, _image: &RgbImage) -> Result<Vec<Detection>, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.failure {
            Some(message) => Err(InferenceError::Runtime(message.clone())),
            None => Ok(self.detections.clone()),
        }
    }

    fn class_names(&self) -> &ClassNameTable {
        &self.class_names
    }
}

fn det(class_index: usize, confidence: f32) -> Detection {
    Detection::new(
        class_index,
        confidence,
        BoundingBox {
            x1: 2.0,
            y1: 2.0,
            x2: 20.0,
            y2: 20.0,
        },
    )
}

fn app(detector: Arc<FixtureDetector>) -> Router {
    create_router(AppState::new(detector), MAX_UPLOAD)
}

fn encode(format: ImageFormat) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(32, 24, Rgb([120, 80, 40])));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, format).unwrap();
    buf.into_inner()
}

/// Build a multipart body with one part per `(field, filename, bytes)`
fn multipart_body(parts: &[(&str, Option<&str>, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (field, filename, data) in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match filename {
            Some(name) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                     Content-Type: application/octet-stream\r\n\r\n",
                    field, name
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", field).as_bytes(),
            ),
        }
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn predict_request(uri: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

fn assert_probability(json: &Value, expected: f64) {
    let actual = json["probability"].as_f64().unwrap();
    assert!(
        (actual - expected).abs() < 1e-6,
        "probability {} != {}",
        actual,
        expected
    );
}

#[tokio::test]
async fn test_single_detection_returns_class_and_probability() {
    let detector = Arc::new(FixtureDetector::returning(vec![det(0, 0.92)]));
    let body = multipart_body(&[("file", Some("cat.jpg"), &encode(ImageFormat::Jpeg))]);

    let (status, json) = send(app(detector.clone()), predict_request("/predict/", body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["class"], "cat");
    assert_probability(&json, 0.92);
    assert_eq!(json.as_object().unwrap().len(), 2);
    assert_eq!(detector.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_highest_confidence_wins() {
    let detector = Arc::new(FixtureDetector::returning(vec![det(1, 0.40), det(0, 0.85)]));
    let body = multipart_body(&[("file", Some("pets.png"), &encode(ImageFormat::Png))]);

    let (status, json) = send(app(detector), predict_request("/predict/", body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["class"], "cat");
    assert_probability(&json, 0.85);
}

#[tokio::test]
async fn test_tie_reports_first_detection() {
    let detector = Arc::new(FixtureDetector::returning(vec![det(2, 0.7), det(1, 0.7)]));
    let body = multipart_body(&[("file", Some("tie.png"), &encode(ImageFormat::Png))]);

    let (_, json) = send(app(detector), predict_request("/predict/", body)).await;

    assert_eq!(json["class"], "tumbler");
}

#[tokio::test]
async fn test_no_detections_returns_none() {
    let detector = Arc::new(FixtureDetector::returning(vec![]));
    let body = multipart_body(&[("file", Some("empty.png"), &encode(ImageFormat::Png))]);

    let (status, json) = send(app(detector), predict_request("/predict/", body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["class"], "none");
    assert_eq!(json["probability"].as_f64(), Some(0.0));
}

#[tokio::test]
async fn test_non_image_upload_returns_500_with_error() {
    let detector = Arc::new(FixtureDetector::returning(vec![det(0, 0.9)]));
    let body = multipart_body(&[("file", Some("notes.txt"), b"just some text")]);

    let (status, json) = send(app(detector.clone()), predict_request("/predict/", body)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!json["error"].as_str().unwrap().is_empty());
    assert!(json.get("class").is_none());
    assert_eq!(detector.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_inference_failure_returns_500_with_message() {
    let detector = Arc::new(FixtureDetector::failing("tensor shape mismatch"));
    let body = multipart_body(&[("file", Some("cat.png"), &encode(ImageFormat::Png))]);

    let (status, json) = send(app(detector), predict_request("/predict/", body)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(json["error"]
        .as_str()
        .unwrap()
        .contains("tensor shape mismatch"));
}

#[tokio::test]
async fn test_repeated_requests_are_identical() {
    let detector = Arc::new(FixtureDetector::returning(vec![det(1, 0.66)]));
    let image = encode(ImageFormat::Png);
    let router = app(detector.clone());

    let (_, first) = send(
        router.clone(),
        predict_request("/predict/", multipart_body(&[("file", Some("a.png"), &image)])),
    )
    .await;
    let (_, second) = send(
        router,
        predict_request("/predict/", multipart_body(&[("file", Some("a.png"), &image)])),
    )
    .await;

    assert_eq!(first, second);
    assert_eq!(detector.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_missing_file_field_returns_422() {
    let detector = Arc::new(FixtureDetector::returning(vec![]));
    let body = multipart_body(&[("comment", None, b"no image here")]);

    let (status, json) = send(app(detector), predict_request("/predict/", body)).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(json["error"].as_str().unwrap().contains("file"));
}

#[tokio::test]
async fn test_file_under_other_field_name_is_accepted() {
    let detector = Arc::new(FixtureDetector::returning(vec![det(1, 0.5)]));
    let body = multipart_body(&[
        ("comment", None, b"hello"),
        ("image", Some("dog.png"), &encode(ImageFormat::Png)),
    ]);

    let (status, json) = send(app(detector), predict_request("/predict/", body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["class"], "dog");
}

#[tokio::test]
async fn test_predict_without_trailing_slash() {
    let detector = Arc::new(FixtureDetector::returning(vec![det(0, 0.3)]));
    let body = multipart_body(&[("file", Some("cat.png"), &encode(ImageFormat::Png))]);

    let (status, json) = send(app(detector), predict_request("/predict", body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["class"], "cat");
}

#[tokio::test]
async fn test_non_multipart_body_returns_400() {
    let detector = Arc::new(FixtureDetector::returning(vec![]));
    let request = Request::builder()
        .method(Method::POST)
        .uri("/predict/")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"file": "cat.png"}"#))
        .unwrap();

    let (status, json) = send(app(detector), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn test_oversized_upload_returns_413() {
    let detector = Arc::new(FixtureDetector::returning(vec![det(0, 0.9)]));
    let router = create_router(AppState::new(detector.clone()), 1024);
    let body = multipart_body(&[("file", Some("huge.png"), &vec![0u8; 10 * 1024])]);

    let (status, json) = send(router, predict_request("/predict/", body)).await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert!(!json["error"].as_str().unwrap().is_empty());
    assert_eq!(detector.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_get_is_not_allowed() {
    let detector = Arc::new(FixtureDetector::returning(vec![]));
    let request = Request::builder()
        .method(Method::GET)
        .uri("/predict/")
        .body(Body::empty())
        .unwrap();

    let response = app(detector).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}
