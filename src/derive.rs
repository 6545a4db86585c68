//! Desired children of an `AppWithDb`.
//!
//! Everything here is a pure function of the parent's name and image: the
//! same parent always yields the same three specs, in the same order, with
//! the same names.

use crate::crd::{AppWithDb, AppWithDbSpec};
use crate::types::{ChildSpec, Labels, ResourceQuantities, ServiceSpec, WorkloadSpec};
use kube::ResourceExt;

pub const DATABASE_SUFFIX: &str = "-postgres";
pub const APP_SUFFIX: &str = "-app";

pub const DATABASE_COMPONENT: &str = "db";
pub const APP_COMPONENT: &str = "app";

pub const POSTGRES_IMAGE: &str = "postgres:15.1";
pub const POSTGRES_PORT: i32 = 5432;
pub const POSTGRES_DB: &str = "db";
pub const POSTGRES_USER: &str = "user";
pub const POSTGRES_PASSWORD: &str = "password";

pub const CONNECTION_STRING_ENV: &str = "CONNECTION_STRING";

const PULL_POLICY: &str = "IfNotPresent";

pub fn database_name(parent: &str) -> String {
    format!("{parent}{DATABASE_SUFFIX}")
}

pub fn app_name(parent: &str) -> String {
    format!("{parent}{APP_SUFFIX}")
}

/// Address of the database service as seen from the application pod.
pub fn connection_string(parent: &str) -> String {
    format!(
        "postgres://{POSTGRES_USER}:{POSTGRES_PASSWORD}@{}:{POSTGRES_PORT}/{POSTGRES_DB}?sslmode=disable",
        database_name(parent)
    )
}

pub fn default_requests() -> ResourceQuantities {
    ResourceQuantities::new("250m", "128Mi")
}

pub fn default_limits() -> ResourceQuantities {
    ResourceQuantities::new("1000m", "1024Mi")
}

/// Database workload, database service, application workload.
pub fn derive(app: &AppWithDb) -> Vec<ChildSpec> {
    derive_children(&app.name_any(), &app.spec)
}

pub fn derive_children(parent: &str, spec: &AppWithDbSpec) -> Vec<ChildSpec> {
    let db_labels = Labels::component(parent, DATABASE_COMPONENT);
    let app_labels = Labels::component(parent, APP_COMPONENT);

    let database = WorkloadSpec::new(
        database_name(parent),
        "postgres",
        POSTGRES_IMAGE,
        default_requests(),
        default_limits(),
    )
    .selector_labels(db_labels.clone())
    .image_pull_policy(PULL_POLICY)
    .env("POSTGRES_DB", POSTGRES_DB)
    .env("POSTGRES_USER", POSTGRES_USER)
    .env("POSTGRES_PASSWORD", POSTGRES_PASSWORD)
    .port(POSTGRES_PORT);

    let database_service = ServiceSpec::new(database_name(parent), db_labels)
        .port(POSTGRES_PORT)
        .protocol("TCP");

    let application = WorkloadSpec::new(
        app_name(parent),
        "app",
        spec.image.clone(),
        default_requests(),
        default_limits(),
    )
    .selector_labels(app_labels)
    .image_pull_policy(PULL_POLICY)
    .env(CONNECTION_STRING_ENV, connection_string(parent));

    vec![
        ChildSpec::Workload(database),
        ChildSpec::Service(database_service),
        ChildSpec::Workload(application),
    ]
}
