//! Integration test: Server API endpoints

mod common;

use admit_risk::error::UNSUPPORTED_FORMAT_MESSAGE;
use admit_risk::server::{create_router, AppState, ServerConfig};
use admit_risk::utils::DataLoader;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use polars::prelude::*;
use std::sync::Arc;
use tower::ServiceExt;

fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        model_path: common::model_path(),
        feature_params_path: None,
        max_upload_size: 10 * 1024 * 1024,
        request_timeout_secs: 30,
        cors_origin: None,
    }
}

fn test_app() -> axum::Router {
    let config = test_config();
    let state = Arc::new(AppState::from_config(config.clone()).unwrap());
    create_router(state, &config)
}

async fn upload(uri: &str, file_name: &str, content: &[u8]) -> Response {
    let (content_type, body) = common::multipart_file(file_name, content);
    test_app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, content_type)
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn body_bytes(response: Response) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()
}

async fn error_message(response: Response) -> String {
    let json: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    json["error"].as_str().unwrap().to_string()
}

/// Parse a returned workbook back into a data frame.
async fn returned_table(response: Response) -> DataFrame {
    let bytes = body_bytes(response).await;
    DataLoader::new().load_bytes(&bytes, "predictions.xlsx").unwrap()
}

fn floats(df: &DataFrame, name: &str) -> Vec<f64> {
    let series = df.column(name).unwrap().cast(&DataType::Float64).unwrap();
    series.f64().unwrap().into_no_null_iter().collect()
}

fn labels(df: &DataFrame, name: &str) -> Vec<i64> {
    let series = df.column(name).unwrap().cast(&DataType::Int64).unwrap();
    series.i64().unwrap().into_no_null_iter().collect()
}

#[tokio::test]
async fn test_csv_upload_returns_workbook() {
    let csv = common::admissions_csv();
    let response = upload("/predict/", "admissions.csv", csv.as_bytes()).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    );
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=predictions.xlsx"
    );

    let table = returned_table(response).await;
    assert_eq!(table.height(), common::ROWS.len());
    assert_eq!(table.width(), common::header().len() + 3);

    let names: Vec<String> = table.get_column_names().iter().map(|s| s.to_string()).collect();
    assert_eq!(&names[names.len() - 3..], &["prob_class_0", "prob_class_1", "prediction"]);
    assert_eq!(&names[..names.len() - 3], common::header().as_slice());

    let p0 = floats(&table, "prob_class_0");
    let p1 = floats(&table, "prob_class_1");
    let prediction = labels(&table, "prediction");
    for i in 0..table.height() {
        assert!((p0[i] + p1[i] - 1.0).abs() < 1e-9);
        assert_eq!(prediction[i], if p1[i] >= 0.5 { 1 } else { 0 });
    }
    assert_eq!(prediction[0], 1);
    assert_eq!(prediction[1], 0);
}

#[tokio::test]
async fn test_route_without_trailing_slash() {
    let csv = common::admissions_csv();
    let response = upload("/predict", "admissions.csv", csv.as_bytes()).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_original_columns_are_preserved() {
    let csv = common::admissions_csv();
    let table = returned_table(upload("/predict/", "admissions.csv", csv.as_bytes()).await).await;

    let gender: Vec<String> = table
        .column("gender")
        .unwrap()
        .str()
        .unwrap()
        .into_no_null_iter()
        .map(String::from)
        .collect();
    let expected: Vec<String> = common::ROWS.iter().map(|r| r.3.to_string()).collect();
    assert_eq!(gender, expected);

    let comorb = table.column("comorb_count").unwrap();
    assert_eq!(comorb.null_count(), 1);
}

#[tokio::test]
async fn test_unsupported_extension() {
    let response = upload("/predict/", "data.txt", b"a,b\n1,2\n").await;
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(error_message(response).await, UNSUPPORTED_FORMAT_MESSAGE);
}

#[tokio::test]
async fn test_csv_and_xlsx_agree() {
    let csv = common::admissions_csv();
    let from_csv = returned_table(upload("/predict/", "admissions.csv", csv.as_bytes()).await).await;
    let from_xlsx =
        returned_table(upload("/predict/", "admissions.XLSX", &common::admissions_xlsx()).await).await;

    assert_eq!(labels(&from_csv, "prediction"), labels(&from_xlsx, "prediction"));

    let a = floats(&from_csv, "prob_class_1");
    let b = floats(&from_xlsx, "prob_class_1");
    for (x, y) in a.iter().zip(b.iter()) {
        assert!((x - y).abs() < 1e-12);
    }
}

#[tokio::test]
async fn test_missing_column_is_named() {
    let csv = common::admissions_csv_without(&["gender"]);
    let response = upload("/predict/", "admissions.csv", csv.as_bytes()).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error_message(response).await, "Missing required column(s): gender");
}

#[tokio::test]
async fn test_malformed_workbook() {
    let response = upload("/predict/", "admissions.xlsx", b"definitely not a zip archive").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(error_message(response).await.starts_with("Could not parse XLSX file"));
}

#[tokio::test]
async fn test_no_file_uploaded() {
    let (content_type, body) = common::multipart_text("note", "hello");
    let response = test_app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/predict/")
                .header(header::CONTENT_TYPE, content_type)
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_message(response).await, "No file uploaded");
}

#[tokio::test]
async fn test_non_multipart_body_gets_json_error() {
    let response = test_app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/predict/")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"rows": []}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(!error_message(response).await.is_empty());
}

#[tokio::test]
async fn test_health_endpoint() {
    let response = test_app()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(json["status"], "healthy");
}

#[tokio::test]
async fn test_model_endpoint() {
    let response = test_app()
        .oneshot(Request::builder().uri("/model").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(json["objective"], "binary:logistic");
    assert_eq!(json["n_trees"], 3);
    assert_eq!(json["feature_names"][3], "gender");
    assert_eq!(json["frozen_feature_params"], false);
}

#[tokio::test]
async fn test_unknown_route_returns_json_404() {
    let response = test_app()
        .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(!error_message(response).await.is_empty());
}

#[tokio::test]
async fn test_get_on_predict_is_not_allowed() {
    let response = test_app()
        .oneshot(Request::builder().uri("/predict/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_cors_mirrors_origin_with_credentials() {
    let response = test_app()
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/predict/")
                .header(header::ORIGIN, "http://frontend.local:3000")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "http://frontend.local:3000");
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_METHODS], "POST");
}
