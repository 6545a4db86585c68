use super::PodValidator;
use crate::error::Result;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use kube::core::admission::{AdmissionRequest, AdmissionResponse, AdmissionReview};
use kube::core::DynamicObject;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

pub const VALIDATE_POD_PATH: &str = "/validate--v1-pod";

pub fn router(validator: Arc<PodValidator>) -> Router {
    Router::new()
        .route(VALIDATE_POD_PATH, post(validate_pod))
        .route("/healthz", get(healthz))
        .with_state(validator)
}

async fn validate_pod(
    State(validator): State<Arc<PodValidator>>,
    Json(review): Json<AdmissionReview<DynamicObject>>,
) -> (StatusCode, Json<AdmissionReview<DynamicObject>>) {
    let request: AdmissionRequest<DynamicObject> = match review.try_into() {
        Ok(request) => request,
        Err(e) => {
            warn!("Rejecting malformed admission review: {}", e);
            return (
                StatusCode::BAD_REQUEST,
                Json(AdmissionResponse::invalid(e.to_string()).into_review()),
            );
        }
    };

    (StatusCode::OK, Json(validator.review(&request).into_review()))
}

async fn healthz() -> &'static str {
    "ok"
}

/// Serves the webhook over plain HTTP until `shutdown` resolves. TLS is
/// terminated in front of the process.
pub async fn serve<F>(addr: SocketAddr, validator: Arc<PodValidator>, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(addr).await?;
    info!("Admission webhook listening on {}", addr);
    axum::serve(listener, router(validator))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}
