use std::sync::Arc;

use appdb_operator::admission::server::{router, VALIDATE_POD_PATH};
use appdb_operator::admission::{
    rejection_message, validate_pod, AuditLog, FieldError, PodValidator, ValidationVerdict,
};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use k8s_openapi::api::core::v1::Pod;
use kube::core::admission::{AdmissionRequest, AdmissionReview, Operation};
use kube::core::DynamicObject;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tower::ServiceExt;

#[derive(Default)]
struct RecordingAudit {
    requests: Mutex<Vec<String>>,
    evaluated: Mutex<Vec<String>>,
    violations: Mutex<Vec<String>>,
}

impl AuditLog for RecordingAudit {
    fn request_received(&self, operation: &Operation, kind: &str, name: &str) {
        self.requests
            .lock()
            .push(format!("{operation:?} {kind} {name}"));
    }

    fn object_evaluated(&self, name: &str, _body: &str) {
        self.evaluated.lock().push(name.to_string());
    }

    fn violation_found(&self, _name: &str, error: &FieldError) {
        self.violations.lock().push(error.path.clone());
    }
}

fn container(name: &str, resources: Value) -> Value {
    json!({ "name": name, "image": "nginx", "resources": resources })
}

fn full_resources() -> Value {
    json!({
        "requests": { "cpu": "250m", "memory": "128Mi" },
        "limits": { "cpu": "1", "memory": "1Gi" }
    })
}

fn pod(name: &str, containers: Vec<Value>) -> Value {
    json!({
        "apiVersion": "v1",
        "kind": "Pod",
        "metadata": { "name": name, "namespace": "default" },
        "spec": { "containers": containers }
    })
}

fn typed(value: Value) -> Pod {
    serde_json::from_value(value).unwrap()
}

fn review(operation: &str, kind: &str, object: Value) -> Value {
    json!({
        "apiVersion": "admission.k8s.io/v1",
        "kind": "AdmissionReview",
        "request": {
            "uid": "705ab4f5-6393-11e8-b7cc-42010a800002",
            "kind": { "group": "", "version": "v1", "kind": kind },
            "resource": { "group": "", "version": "v1", "resource": "pods" },
            "operation": operation,
            "userInfo": {},
            "name": object["metadata"]["name"].as_str().unwrap_or_default(),
            "namespace": "default",
            "object": object,
            "dryRun": false
        }
    })
}

fn request(review: Value) -> AdmissionRequest<DynamicObject> {
    let review: AdmissionReview<DynamicObject> = serde_json::from_value(review).unwrap();
    review.try_into().unwrap()
}

#[test]
fn accepts_pod_with_full_resources_and_audits_it() {
    let audit = RecordingAudit::default();
    let pod = typed(pod("web", vec![container("web", full_resources())]));

    let verdict = validate_pod(&pod, None, &audit);

    assert!(verdict.is_accept());
    assert_eq!(*audit.evaluated.lock(), vec!["web".to_string()]);
    assert!(audit.violations.lock().is_empty());
}

#[test]
fn reports_every_missing_limit_across_containers() {
    let audit = RecordingAudit::default();
    let requests_only = json!({ "requests": { "cpu": "100m", "memory": "64Mi" } });
    let pod = typed(pod(
        "web",
        vec![
            container("a", requests_only.clone()),
            container("b", requests_only),
        ],
    ));

    let verdict = validate_pod(&pod, None, &audit);

    let paths: Vec<&str> = verdict.errors().iter().map(|e| e.path.as_str()).collect();
    assert_eq!(
        paths,
        vec![
            "spec.containers[0].resources.limits.cpu",
            "spec.containers[0].resources.limits.memory",
            "spec.containers[1].resources.limits.cpu",
            "spec.containers[1].resources.limits.memory",
        ]
    );
    assert_eq!(verdict.errors()[0].reason, "cpu limit must be specified");
    assert_eq!(verdict.errors()[1].reason, "memory limit must be specified");
    assert_eq!(audit.violations.lock().len(), 4);
}

#[test]
fn container_without_resources_violates_all_four_fields() {
    let pod = typed(pod("bare", vec![json!({ "name": "c", "image": "nginx" })]));

    let verdict = validate_pod(&pod, None, &RecordingAudit::default());

    assert_eq!(verdict.errors().len(), 4);
    assert!(verdict.errors().iter().all(|e| e.value == "0"));
    assert_eq!(verdict.errors()[0].reason, "cpu request must be specified");
}

#[test]
fn zero_quantity_is_rejected() {
    let resources = json!({
        "requests": { "cpu": "0", "memory": "128Mi" },
        "limits": { "cpu": "1", "memory": "0Mi" }
    });
    let pod = typed(pod("web", vec![container("web", resources)]));

    let verdict = validate_pod(&pod, None, &RecordingAudit::default());

    let errors = verdict.errors();
    assert_eq!(errors.len(), 2);
    assert_eq!(errors[0].path, "spec.containers[0].resources.requests.cpu");
    assert_eq!(errors[0].value, "0");
    assert_eq!(errors[1].path, "spec.containers[0].resources.limits.memory");
    assert_eq!(errors[1].value, "0Mi");
}

#[test]
fn negative_quantity_counts_as_specified() {
    let resources = json!({
        "requests": { "cpu": "-1", "memory": "128Mi" },
        "limits": { "cpu": "1", "memory": "1Gi" }
    });
    let pod = typed(pod("web", vec![container("web", resources)]));

    let verdict = validate_pod(&pod, None, &RecordingAudit::default());

    assert_eq!(verdict, ValidationVerdict::Accept);
}

#[test]
fn malformed_quantity_is_rejected() {
    let resources = json!({
        "requests": { "cpu": "lots", "memory": "128Mi" },
        "limits": { "cpu": "1", "memory": "1Gi" }
    });
    let pod = typed(pod("web", vec![container("web", resources)]));

    let verdict = validate_pod(&pod, None, &RecordingAudit::default());

    assert_eq!(verdict.errors().len(), 1);
    assert_eq!(verdict.errors()[0].value, "lots");
}

#[test]
fn pod_without_containers_is_accepted() {
    let pod = typed(pod("empty", vec![]));
    assert_eq!(
        validate_pod(&pod, None, &RecordingAudit::default()),
        ValidationVerdict::Accept
    );
}

#[test]
fn rejection_message_lists_every_field() {
    let errors = vec![
        FieldError {
            path: "spec.containers[0].resources.limits.cpu".to_string(),
            value: "0".to_string(),
            reason: "cpu limit must be specified".to_string(),
        },
        FieldError {
            path: "spec.containers[0].resources.limits.memory".to_string(),
            value: "0".to_string(),
            reason: "memory limit must be specified".to_string(),
        },
    ];

    assert_eq!(
        rejection_message("web", &errors),
        "Pod \"web\" is invalid: [\
         spec.containers[0].resources.limits.cpu: Invalid value: \"0\": cpu limit must be specified, \
         spec.containers[0].resources.limits.memory: Invalid value: \"0\": memory limit must be specified]"
    );
}

#[test]
fn review_denies_create_of_invalid_pod() {
    let audit = Arc::new(RecordingAudit::default());
    let validator = PodValidator::new(audit.clone());
    let object = pod("web", vec![json!({ "name": "c", "image": "nginx" })]);

    let response = validator.review(&request(review("CREATE", "Pod", object)));

    assert!(!response.allowed);
    assert!(response.result.message.starts_with("Pod \"web\" is invalid: ["));
    assert_eq!(*audit.requests.lock(), vec!["Create Pod web".to_string()]);
}

#[test]
fn review_allows_update_of_valid_pod() {
    let validator = PodValidator::new(Arc::new(RecordingAudit::default()));
    let object = pod("web", vec![container("web", full_resources())]);

    let response = validator.review(&request(review("UPDATE", "Pod", object)));

    assert!(response.allowed);
}

#[test]
fn review_allows_delete_without_validation() {
    let audit = Arc::new(RecordingAudit::default());
    let validator = PodValidator::new(audit.clone());
    let object = pod("web", vec![json!({ "name": "c", "image": "nginx" })]);

    let response = validator.review(&request(review("DELETE", "Pod", object)));

    assert!(response.allowed);
    assert!(audit.evaluated.lock().is_empty());
}

#[test]
fn review_denies_unsupported_kind() {
    let validator = PodValidator::new(Arc::new(RecordingAudit::default()));
    let object = json!({
        "apiVersion": "v1",
        "kind": "ConfigMap",
        "metadata": { "name": "settings", "namespace": "default" }
    });

    let response = validator.review(&request(review("CREATE", "ConfigMap", object)));

    assert!(!response.allowed);
    assert_eq!(
        response.result.message,
        "expected a Pod object but got ConfigMap"
    );
}

#[tokio::test]
async fn webhook_route_answers_with_admission_review() {
    let app = router(Arc::new(PodValidator::new(Arc::new(
        RecordingAudit::default(),
    ))));
    let body = review(
        "CREATE",
        "Pod",
        pod("web", vec![json!({ "name": "c", "image": "nginx" })]),
    );

    let response = app
        .oneshot(
            Request::post(VALIDATE_POD_PATH)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let answer: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(answer["kind"], "AdmissionReview");
    assert_eq!(
        answer["response"]["uid"],
        "705ab4f5-6393-11e8-b7cc-42010a800002"
    );
    assert_eq!(answer["response"]["allowed"], false);
}

#[tokio::test]
async fn healthz_is_ok() {
    let app = router(Arc::new(PodValidator::new(Arc::new(
        RecordingAudit::default(),
    ))));

    let response = app
        .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}
