pub mod error;
pub mod routes;
pub mod state;

use axum::{routing::{get, post}, Router};
use tower_http::trace::TraceLayer;
use crate::adapters::http::state::HttpState;

pub fn router(state: HttpState) -> Router {
    Router::new()
        .route("/", get(routes::read_root))
        .route("/api/v1/predict_by_category", post(routes::predict_by_category))
        .route("/api/v1/predict_image", post(routes::predict_image))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::{fake_service, FakeUploads};
    use crate::domain::errors::CATEGORY_RANGE_MSG;
    use axum::{body::Body, http::{Request, StatusCode}};
    use serde_json::{json, Value};
    use std::sync::{atomic::Ordering, Arc};
    use tower::ServiceExt;

    fn app(uploads: FakeUploads) -> (Router, Arc<crate::application::testing::FakeDetector>) {
        let (svc, detector, _) = fake_service(uploads);
        (router(HttpState { search: Arc::new(svc) }), detector)
    }

    async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    fn category(number: i64) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/v1/predict_by_category")
            .header("content-type", "application/json")
            .body(Body::from(json!({ "number": number }).to_string()))
            .unwrap()
    }

    fn upload(field: &str, file_name: &str) -> Request<Body> {
        let body = format!(
            "--XBOUNDARY\r\n\
             Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
             Content-Type: image/png\r\n\r\n\
             ignored\r\n\
             --XBOUNDARY--\r\n",
            field, file_name
        );
        Request::builder()
            .method("POST")
            .uri("/api/v1/predict_image")
            .header("content-type", "multipart/form-data; boundary=XBOUNDARY")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn root_returns_banner() {
        let (app, _) = app(FakeUploads::default());
        let req = Request::builder().uri("/").body(Body::empty()).unwrap();
        let (status, body) = send(app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "message": routes::BANNER }));
    }

    #[tokio::test]
    async fn out_of_range_category_gets_advisory_message() {
        for n in [0, 81, -3] {
            let (app, detector) = app(FakeUploads::default());
            let (status, body) = send(app, category(n)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body, json!({ "msg": CATEGORY_RANGE_MSG }));
            assert_eq!(detector.calls.load(Ordering::SeqCst), 0);
        }
    }

    #[tokio::test]
    async fn category_prediction_returns_parallel_sequences() {
        let (app, _) = app(FakeUploads::default());
        let (status, body) = send(app, category(5)).await;
        assert_eq!(status, StatusCode::OK);

        let len = body["class_ids"].as_array().unwrap().len();
        assert_eq!(len, 2);
        for key in ["rois", "masks", "scores"] {
            assert_eq!(body[key].as_array().unwrap().len(), len, "{}", key);
        }
        assert_eq!(body["rois"][0], json!([1, 2, 3, 4]));
        // imagen de 16x12 -> máscaras de 12 filas por 16 columnas
        assert_eq!(body["masks"][0].as_array().unwrap().len(), 12);
        assert_eq!(body["masks"][0][0].as_array().unwrap().len(), 16);
    }

    #[tokio::test]
    async fn rgba_upload_is_accepted() {
        let (app, detector) = app(FakeUploads::rgba("street.png", 64, 64));
        let (status, body) = send(app, upload("image_file", "street.png")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["scores"].as_array().unwrap().len(), 2);
        assert_eq!(detector.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn upload_errors_map_to_status_codes() {
        let (app_missing, _) = app(FakeUploads::default());
        let (status, body) = send(app_missing, upload("image_file", "ghost.png")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().contains("ghost.png"));

        let (app_field, _) = app(FakeUploads::default());
        let (status, _) = send(app_field, upload("other", "ghost.png")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (app_path, _) = app(FakeUploads::default());
        let (status, _) = send(app_path, upload("image_file", "../ghost.png")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
