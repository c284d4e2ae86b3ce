//! One-time schema synchronization and the readiness token it resolves.

use crate::db::schema::{TABLE_INFO_SQL, create_table_sql};
use crate::db::{GatewayHandle, ID_COLUMN, JSON_COLUMN};
use crate::error::{DaoError, SchemaError};
use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, error, info};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnDescriptor {
    pub name: String,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn is_id(&self) -> bool {
        self.name == ID_COLUMN
    }

    pub fn is_json(&self) -> bool {
        self.name == JSON_COLUMN
    }
}

/// Column list of one kind's table, in live schema order.
///
/// Holds exactly one `id` and one `json` column and no duplicate names;
/// checked once when the table is synchronized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableColumns {
    columns: Vec<ColumnDescriptor>,
}

impl TableColumns {
    pub fn new(kind: &str, columns: Vec<ColumnDescriptor>) -> Result<Self, SchemaError> {
        {
            let mut seen = HashSet::new();
            if let Some(dup) = columns.iter().find(|c| !seen.insert(c.name.as_str())) {
                return Err(SchemaError::new(kind, format!("duplicate column `{}`", dup.name)));
            }
        }
        for required in [ID_COLUMN, JSON_COLUMN] {
            if !columns.iter().any(|c| c.name == required) {
                return Err(SchemaError::new(
                    kind,
                    format!("table is missing the `{required}` column"),
                ));
            }
        }
        Ok(Self { columns })
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.columns.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Columns assignable by an UPDATE: everything but `id`, in cache order.
    pub fn settable(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.columns.iter().filter(|c| !c.is_id())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Resolved readiness token: when synchronization finished and what it found.
#[derive(Debug, Clone)]
pub struct Readiness {
    pub ready_at: DateTime<Utc>,
    columns: Arc<HashMap<String, TableColumns>>,
}

impl Readiness {
    pub fn columns(&self, kind: &str) -> Result<&TableColumns, DaoError> {
        self.columns
            .get(kind)
            .ok_or_else(|| DaoError::UnknownKind(kind.to_string()))
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }
}

/// Shared in-flight synchronization. Every clone awaits the same run.
pub type ReadyFuture = Shared<BoxFuture<'static, Result<Readiness, SchemaError>>>;

/// Build the readiness future for `kinds`. Nothing runs until it is first polled.
pub fn readiness(gateway: GatewayHandle, kinds: Vec<String>) -> ReadyFuture {
    async move { synchronize(&gateway, &kinds).await }
        .boxed()
        .shared()
}

/// SQLite table names compare ASCII case-insensitively, so kinds that differ
/// only by case would share one table.
pub fn check_distinct_tables(kinds: &[String]) -> Result<(), SchemaError> {
    let mut seen: HashMap<String, &str> = HashMap::with_capacity(kinds.len());
    for kind in kinds {
        if let Some(first) = seen.insert(kind.to_ascii_lowercase(), kind) {
            return Err(SchemaError::new(
                kind.as_str(),
                format!("table name collides with kind `{first}`"),
            ));
        }
    }
    Ok(())
}

async fn synchronize(gateway: &GatewayHandle, kinds: &[String]) -> Result<Readiness, SchemaError> {
    info!(kinds = ?kinds, "synchronizing schema");
    check_distinct_tables(kinds).inspect_err(|e| {
        error!(error = %e, "schema synchronization failed");
    })?;
    let mut columns = HashMap::with_capacity(kinds.len());
    for kind in kinds {
        let table = sync_kind(gateway, kind).await.inspect_err(|e| {
            error!(kind = %kind, error = %e, "schema synchronization failed");
        })?;
        debug!(kind = %kind, columns = ?table.names(), "columns cached");
        columns.insert(kind.clone(), table);
    }
    let ready_at = Utc::now();
    info!(%ready_at, "schema ready");
    Ok(Readiness {
        ready_at,
        columns: Arc::new(columns),
    })
}

async fn sync_kind(gateway: &GatewayHandle, kind: &str) -> Result<TableColumns, SchemaError> {
    if kind.is_empty() {
        return Err(SchemaError::new(kind, "model kind name must not be empty"));
    }
    gateway
        .execute(create_table_sql(kind), Vec::new())
        .await
        .map_err(|e| SchemaError::new(kind, e.to_string()))?;
    let rows = gateway
        .fetch(TABLE_INFO_SQL, vec![Value::String(kind.to_string())])
        .await
        .map_err(|e| SchemaError::new(kind, e.to_string()))?;
    let descriptors = rows
        .iter()
        .map(|row| {
            row.get("name")
                .and_then(Value::as_str)
                .map(ColumnDescriptor::new)
                .ok_or_else(|| SchemaError::new(kind, "introspection returned a nameless column"))
        })
        .collect::<Result<Vec<_>, _>>()?;
    TableColumns::new(kind, descriptors)
}
