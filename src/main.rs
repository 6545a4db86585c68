use appdb_operator::{AppWithDb, Operator, OperatorConfig, Result};
use kube::CustomResourceExt;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // `appdb-operator crd` prints the CustomResourceDefinition for installation.
    if std::env::args().nth(1).as_deref() == Some("crd") {
        println!("{}", serde_json::to_string_pretty(&AppWithDb::crd())?);
        return Ok(());
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = OperatorConfig::from_env()?;
    Operator::new(config).run().await
}
