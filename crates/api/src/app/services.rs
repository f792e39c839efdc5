//! Runtime wiring: store, change feed, modules and the trigger runner.

use std::sync::{Arc, Mutex};

use tracing::{info, warn};

use recordkeep_events::{DocumentChange, InMemoryEventBus};
use recordkeep_functions::{Module, ModuleExports, RunnerHandle, TriggerRunner};
use recordkeep_infra::{DocumentStore, InMemoryDocumentStore, PublishingDocumentStore};
use recordkeep_records::RecordsModule;

use crate::config::AppConfig;

pub type ChangeBus = Arc<InMemoryEventBus<DocumentChange>>;

/// Shared application services.
///
/// Owns the trigger runner: triggers keep firing for as long as the services
/// (and therefore the router holding them) are alive.
pub struct AppServices {
    pub exports: ModuleExports,
    runner: Mutex<Option<RunnerHandle>>,
}

impl AppServices {
    /// Stop the trigger runner. Later calls are no-ops.
    pub async fn shutdown(&self) {
        let handle = match self.runner.lock() {
            Ok(mut runner) => runner.take(),
            Err(_) => {
                warn!("runner lock poisoned; cannot shut down trigger runner");
                None
            }
        };
        if let Some(handle) = handle {
            handle.shutdown().await;
        }
    }
}

pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    let bus: ChangeBus = Arc::new(InMemoryEventBus::new());
    let store = build_store(config, bus.clone()).await?;

    let modules: Vec<Box<dyn Module>> =
        vec![Box::new(RecordsModule::new(store.clone()).with_failure_policy(config.failure_policy))];

    let mut exports = ModuleExports::default();
    for module in &modules {
        let module_exports = module.exports();
        info!(
            module = module.name(),
            functions = ?module_exports.functions.keys().collect::<Vec<_>>(),
            triggers = ?module_exports.triggers.keys().collect::<Vec<_>>(),
            "module registered"
        );
        exports.merge(module_exports)?;
    }

    let runner = TriggerRunner::new(config.trigger_retry.clone()).with_triggers(exports.triggers.clone());
    let handle = runner.spawn(bus.as_ref());

    Ok(AppServices {
        exports,
        runner: Mutex::new(Some(handle)),
    })
}

async fn build_store(config: &AppConfig, bus: ChangeBus) -> anyhow::Result<Arc<dyn DocumentStore>> {
    #[cfg(feature = "postgres")]
    if let Some(url) = &config.database_url {
        let postgres = recordkeep_infra::PostgresDocumentStore::connect(url).await?;
        info!("using postgres document store");
        return Ok(Arc::new(PublishingDocumentStore::new(postgres, bus)));
    }

    if config.database_url.is_some() {
        warn!("DATABASE_URL is set but the postgres feature is disabled; using in-memory store");
    }
    info!("using in-memory document store");
    Ok(Arc::new(PublishingDocumentStore::new(InMemoryDocumentStore::new(), bus)))
}
