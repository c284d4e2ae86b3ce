//! Hybrid SQLite adapter: native columns discovered from the live schema
//! plus a `json` blob holding the full object state.
//!
//! Layout:
//! - `sync.rs`: one-time table creation, column discovery, readiness token
//! - `translator.rs`: instance <-> row translation and statement building
//!
//! Every operation waits for the readiness token, then issues exactly one
//! statement through the gateway (`update` may first load an uncached
//! instance).

pub mod sync;
pub mod translator;

pub use sync::{ColumnDescriptor, Readiness, TableColumns};
pub use translator::{RowTranslator, Statement};

use crate::config::{CONFIG, Config};
use crate::db::GatewayHandle;
use crate::error::DaoError;
use crate::model::{Instance, ModelRegistry, Record};
use futures::future::try_join_all;
use std::collections::HashMap;
use std::sync::Arc;
use sync::ReadyFuture;
use tracing::{debug, info};

pub struct SqliteDao {
    gateway: GatewayHandle,
    registry: Arc<dyn ModelRegistry>,
    translator: RowTranslator,
    kinds: Vec<String>,
    ready: ReadyFuture,
}

impl SqliteDao {
    /// Open the store from `cfg` and build an adapter over it.
    pub async fn connect(
        cfg: &Config,
        registry: impl ModelRegistry + 'static,
    ) -> Result<Self, DaoError> {
        let gateway = GatewayHandle::spawn(cfg).await?;
        Ok(Self::new(gateway, registry, cfg))
    }

    /// `connect` with the process-wide configuration (`HYBRID_DAO_*`, `.env`).
    pub async fn from_env(registry: impl ModelRegistry + 'static) -> Result<Self, DaoError> {
        Self::connect(&CONFIG, registry).await
    }

    /// Build an adapter over an existing gateway. Schema synchronization is
    /// deferred until the first operation (or `ensure_ready`).
    pub fn new(gateway: GatewayHandle, registry: impl ModelRegistry + 'static, cfg: &Config) -> Self {
        let registry: Arc<dyn ModelRegistry> = Arc::new(registry);
        let kinds = registry.kinds();
        let ready = sync::readiness(gateway.clone(), kinds.clone());
        Self {
            gateway,
            registry,
            translator: RowTranslator::new(cfg.pretty_json),
            kinds,
            ready,
        }
    }

    pub fn gateway(&self) -> &GatewayHandle {
        &self.gateway
    }

    pub fn registry(&self) -> &Arc<dyn ModelRegistry> {
        &self.registry
    }

    /// Wait for (or drive) schema synchronization. Concurrent callers share
    /// one run; a failure is returned to every caller, now and later.
    pub async fn ensure_ready(&self) -> Result<Readiness, DaoError> {
        Ok(self.ready.clone().await?)
    }

    /// Cached column list for `kind`.
    pub async fn columns(&self, kind: &str) -> Result<TableColumns, DaoError> {
        let ready = self.ensure_ready().await?;
        Ok(ready.columns(kind)?.clone())
    }

    async fn hydrate(&self, kind: &str, row: Record) -> Result<Instance, DaoError> {
        let instance = self.translator.from_row(self.registry.as_ref(), kind, row)?;
        instance.ready().await?;
        Ok(instance)
    }

    pub async fn create(&self, kind: &str, data: Record) -> Result<Instance, DaoError> {
        let ready = self.ensure_ready().await?;
        let columns = ready.columns(kind)?;
        let instance = self.registry.create(kind, data)?;
        instance.ready().await?;

        let stmt = self.translator.insert(kind, columns, &instance)?;
        self.gateway.execute(stmt.sql, stmt.params).await?;
        self.registry.remember(kind, instance.clone());
        debug!(kind, id = instance.id(), "created");
        Ok(instance)
    }

    /// Merge `data` into the stored instance and persist it.
    /// Fails with `NotFound` when no row carries `id`.
    pub async fn update(&self, kind: &str, id: &str, data: Record) -> Result<Instance, DaoError> {
        let ready = self.ensure_ready().await?;
        let columns = ready.columns(kind)?;
        let current = match self.registry.cached(kind, id) {
            Some(current) => current,
            None => self
                .fetch_by_id(kind, id)
                .await?
                .ok_or_else(|| DaoError::not_found(kind, id))?,
        };
        let instance = self.registry.update(kind, &current, data)?;
        instance.ready().await?;

        let stmt = self.translator.update(kind, columns, &instance)?;
        let affected = self.gateway.execute(stmt.sql, stmt.params).await?;
        if affected == 0 {
            // Stale cache entry: the row is gone from the store.
            self.registry.forget(kind, id);
            return Err(DaoError::not_found(kind, id));
        }
        self.registry.remember(kind, instance.clone());
        debug!(kind, id, "updated");
        Ok(instance)
    }

    /// Remove `id`. Returns the cached instance when it had been loaded.
    /// Fails with `NotFound` when no row carries `id`.
    pub async fn delete(&self, kind: &str, id: &str) -> Result<Option<Instance>, DaoError> {
        let ready = self.ensure_ready().await?;
        ready.columns(kind)?;

        let stmt = translator::delete_by_id(kind, id);
        let affected = self.gateway.execute(stmt.sql, stmt.params).await?;
        let removed = self.registry.forget(kind, id);
        if affected == 0 {
            return Err(DaoError::not_found(kind, id));
        }
        debug!(kind, id, "deleted");
        Ok(removed)
    }

    pub async fn fetch_by_id(&self, kind: &str, id: &str) -> Result<Option<Instance>, DaoError> {
        let ready = self.ensure_ready().await?;
        ready.columns(kind)?;

        let stmt = translator::select_by_id(kind, id);
        let rows = self.gateway.fetch(stmt.sql, stmt.params).await?;
        let Some(row) = rows.into_iter().next() else {
            return Ok(None);
        };
        let instance = self.hydrate(kind, row).await?;
        self.registry.remember(kind, instance.clone());
        Ok(Some(instance))
    }

    pub async fn fetch_all(&self, kind: &str) -> Result<HashMap<String, Instance>, DaoError> {
        let ready = self.ensure_ready().await?;
        ready.columns(kind)?;

        let stmt = translator::select_all(kind);
        let rows = self.gateway.fetch(stmt.sql, stmt.params).await?;
        let instances = try_join_all(rows.into_iter().map(|row| self.hydrate(kind, row))).await?;
        Ok(instances
            .into_iter()
            .map(|instance| {
                self.registry.remember(kind, instance.clone());
                (instance.id().to_string(), instance)
            })
            .collect())
    }

    /// Delete every row of every registered kind and clear the read-cache.
    /// The first failing delete aborts the rest; earlier deletes stay applied.
    pub async fn reset(&self) -> Result<(), DaoError> {
        self.ensure_ready().await?;
        for kind in &self.kinds {
            let stmt = translator::delete_all(kind);
            self.gateway.execute(stmt.sql, stmt.params).await?;
        }
        self.registry.clear();
        info!(kinds = self.kinds.len(), "store reset");
        Ok(())
    }

    /// Release the store connection.
    pub async fn close(&self) -> Result<(), DaoError> {
        self.gateway.close().await
    }
}
