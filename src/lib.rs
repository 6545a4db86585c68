pub mod admission;
pub mod config;
pub mod crd;
pub mod derive;
pub mod error;
pub mod operator;
pub mod ownership;
pub mod reconcile;
pub mod store;
pub mod types;

pub use config::OperatorConfig;
pub use crd::{AppWithDb, AppWithDbSpec, AppWithDbStatus};
pub use error::{Error, Result};
pub use operator::Operator;
pub use reconcile::{AppReconciler, LabelPolicy, LabelReconciler, ReconcileOutcome, ResourceId};
pub use store::{KubeStore, ObjectStore};

pub mod prelude {
    pub use crate::admission::{PodValidator, ValidationVerdict};
    pub use crate::config::OperatorConfig;
    pub use crate::crd::{AppWithDb, AppWithDbSpec};
    pub use crate::error::{Error, Result};
    pub use crate::reconcile::app::ConvergenceMode;
    pub use crate::reconcile::{
        AppReconciler, LabelPolicy, LabelReconciler, ReconcileOutcome, ResourceId,
    };
    pub use crate::store::ObjectStore;
    pub use crate::types::{ChildKind, ChildObject, ChildSpec};

    pub use std::sync::Arc;
    pub use std::time::Duration;
}
