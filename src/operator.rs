use crate::admission::{server, PodValidator, TracingAuditLog};
use crate::config::OperatorConfig;
use crate::crd::AppWithDb;
use crate::error::{Error, Result};
use crate::reconcile::{AppReconciler, LabelReconciler, ResourceId};
use crate::store::{KubeStore, ObjectStore};
use futures::future::{self, BoxFuture};
use futures::{FutureExt, StreamExt};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Namespace, Service};
use kube::runtime::controller::{Action, Controller};
use kube::runtime::watcher::Config as WatcherConfig;
use kube::{Api, Client, Resource, ResourceExt};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// Runs the AppWithDb controller, the namespace labeler and the admission
/// webhook side by side until a shutdown signal arrives.
pub struct Operator {
    config: OperatorConfig,
}

struct ControllerContext<R> {
    reconciler: R,
    error_requeue: Duration,
}

impl Operator {
    pub fn new(config: OperatorConfig) -> Self {
        Self { config }
    }

    pub async fn run(self) -> Result<()> {
        let client = Client::try_default().await.map_err(Error::Kube)?;
        let store: Arc<dyn ObjectStore> =
            Arc::new(KubeStore::new(client.clone(), &self.config.field_manager));

        let mut tasks: Vec<BoxFuture<'static, Result<()>>> = vec![run_app_controller(
            client.clone(),
            Arc::clone(&store),
            &self.config,
        )
        .boxed()];

        if self.config.enable_labeler {
            tasks.push(
                run_namespace_labeler(client.clone(), Arc::clone(&store), &self.config).boxed(),
            );
        }

        if self.config.enable_webhook {
            let validator = Arc::new(PodValidator::new(Arc::new(TracingAuditLog::default())));
            let shutdown = shutdown_signal().inspect_err(|e| {
                error!("Failed to install shutdown signal handlers: {}", e);
            })?;
            tasks.push(server::serve(self.config.webhook_addr, validator, shutdown).boxed());
        }

        future::try_join_all(tasks).await?;
        info!("Operator stopped");
        Ok(())
    }
}

/// Resolves on the first SIGINT or SIGTERM, the signals the controllers'
/// `shutdown_on_signal` reacts to. Handlers are installed before returning,
/// so a signal sent afterwards is never missed.
#[cfg(unix)]
pub fn shutdown_signal() -> Result<impl Future<Output = ()> + Send + 'static> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;

    Ok(async move {
        tokio::select! {
            _ = interrupt.recv() => info!("Received SIGINT, shutting down"),
            _ = terminate.recv() => info!("Received SIGTERM, shutting down"),
        }
    })
}

#[cfg(not(unix))]
pub fn shutdown_signal() -> Result<impl Future<Output = ()> + Send + 'static> {
    Ok(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    })
}

fn run_app_controller(
    client: Client,
    store: Arc<dyn ObjectStore>,
    config: &OperatorConfig,
) -> impl std::future::Future<Output = Result<()>> + Send + 'static {
    let (apps, deployments, services): (Api<AppWithDb>, Api<Deployment>, Api<Service>) =
        match &config.watch_namespace {
            Some(ns) => (
                Api::namespaced(client.clone(), ns),
                Api::namespaced(client.clone(), ns),
                Api::namespaced(client, ns),
            ),
            None => (
                Api::all(client.clone()),
                Api::all(client.clone()),
                Api::all(client),
            ),
        };

    let ctx = Arc::new(ControllerContext {
        reconciler: AppReconciler::new(store).mode(config.convergence_mode),
        error_requeue: config.error_requeue,
    });

    async move {
        info!(
            "Starting controller for {}/{}",
            AppWithDb::group(&()),
            AppWithDb::kind(&())
        );

        Controller::new(apps, WatcherConfig::default())
            .owns(deployments, WatcherConfig::default())
            .owns(services, WatcherConfig::default())
            .shutdown_on_signal()
            .run(reconcile_app, error_policy, ctx)
            .for_each(|result| async move {
                match result {
                    Ok((resource, action)) => {
                        info!("Reconciled {} - {:?}", resource.name, action);
                    }
                    Err(e) => {
                        error!("Reconciliation error: {:?}", e);
                    }
                }
            })
            .await;

        Ok(())
    }
}

fn run_namespace_labeler(
    client: Client,
    store: Arc<dyn ObjectStore>,
    config: &OperatorConfig,
) -> impl std::future::Future<Output = Result<()>> + Send + 'static {
    let namespaces: Api<Namespace> = Api::all(client);
    let ctx = Arc::new(ControllerContext {
        reconciler: LabelReconciler::new(store, config.label_policy.clone()),
        error_requeue: config.error_requeue,
    });

    async move {
        info!("Starting namespace labeler");

        Controller::new(namespaces, WatcherConfig::default())
            .shutdown_on_signal()
            .run(reconcile_namespace, error_policy, ctx)
            .for_each(|result| async move {
                if let Err(e) = result {
                    error!("Namespace reconciliation error: {:?}", e);
                }
            })
            .await;

        Ok(())
    }
}

async fn reconcile_app(
    app: Arc<AppWithDb>,
    ctx: Arc<ControllerContext<AppReconciler>>,
) -> Result<Action> {
    let id = ResourceId::of(app.as_ref());
    ctx.reconciler.reconcile(&id).await.into_action()
}

async fn reconcile_namespace(
    namespace: Arc<Namespace>,
    ctx: Arc<ControllerContext<LabelReconciler>>,
) -> Result<Action> {
    let id = ResourceId::cluster(namespace.name_any());
    ctx.reconciler.reconcile(&id).await.into_action()
}

fn error_policy<K, R>(resource: Arc<K>, error: &Error, ctx: Arc<ControllerContext<R>>) -> Action
where
    K: Resource,
{
    error!("Error reconciling {}: {:?}", resource.name_any(), error);
    Action::requeue(ctx.error_requeue)
}
