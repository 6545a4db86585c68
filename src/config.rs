use crate::error::{Error, Result};
use crate::reconcile::app::ConvergenceMode;
use crate::reconcile::LabelPolicy;
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct OperatorConfig {
    /// Restrict the AppWithDb controller to one namespace; `None` watches all.
    pub watch_namespace: Option<String>,
    pub field_manager: String,
    pub error_requeue: Duration,
    pub convergence_mode: ConvergenceMode,
    pub label_policy: LabelPolicy,
    pub enable_labeler: bool,
    pub enable_webhook: bool,
    pub webhook_addr: SocketAddr,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            watch_namespace: None,
            field_manager: "appdb-operator".to_string(),
            error_requeue: Duration::from_secs(60),
            convergence_mode: ConvergenceMode::CreateOnly,
            label_policy: LabelPolicy::default(),
            enable_labeler: true,
            enable_webhook: true,
            webhook_addr: SocketAddr::from(([0, 0, 0, 0], 9443)),
        }
    }
}

impl OperatorConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(val) = lookup("WATCH_NAMESPACE").filter(|v| !v.is_empty()) {
            config.watch_namespace = Some(val);
        }

        if let Some(val) = lookup("FIELD_MANAGER") {
            config.field_manager = val;
        }

        if let Some(val) = lookup("ERROR_REQUEUE_SECS") {
            let secs: u64 = val.parse().map_err(|_| {
                Error::InvalidConfig(format!("Invalid ERROR_REQUEUE_SECS: {val}"))
            })?;
            config.error_requeue = Duration::from_secs(secs);
        }

        if let Some(val) = lookup("CONVERGENCE_MODE") {
            config.convergence_mode = val.parse()?;
        }

        if let Some(val) = lookup("LABEL_KEY") {
            config.label_policy.key = val;
        }

        if let Some(val) = lookup("LABEL_VALUE") {
            config.label_policy.value = val;
        }

        if let Some(val) = lookup("LABEL_PREFIX") {
            config.label_policy.prefix = val;
        }

        if let Some(val) = lookup("LABEL_SUFFIX") {
            config.label_policy.suffix = val;
        }

        if let Some(val) = lookup("ENABLE_LABELER") {
            config.enable_labeler = parse_bool("ENABLE_LABELER", &val)?;
        }

        if let Some(val) = lookup("ENABLE_WEBHOOK") {
            config.enable_webhook = parse_bool("ENABLE_WEBHOOK", &val)?;
        }

        if let Some(val) = lookup("WEBHOOK_ADDR") {
            config.webhook_addr = val
                .parse()
                .map_err(|_| Error::InvalidConfig(format!("Invalid WEBHOOK_ADDR: {val}")))?;
        }

        if config.label_policy.key.is_empty() {
            return Err(Error::InvalidConfig("LABEL_KEY must not be empty".to_string()));
        }

        Ok(config)
    }
}

fn parse_bool(key: &str, val: &str) -> Result<bool> {
    match val {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(Error::InvalidConfig(format!("Invalid {key}: {val}"))),
    }
}
