use crate::config::Config;
use crate::db::codec::{bind_all, row_to_record};
use crate::error::DaoError;
use crate::model::Record;
use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::str::FromStr;
use tracing::{debug, info, warn};

pub type SqlitePool = Pool<Sqlite>;

/// Messages handled by the engine gateway actor.
#[derive(Debug)]
pub enum GatewayMessage {
    /// Run one statement; replies with the number of rows affected.
    Execute(String, Vec<Value>, RpcReplyPort<Result<u64, DaoError>>),
    /// Run one query; replies with every row as a column-name keyed record.
    Fetch(String, Vec<Value>, RpcReplyPort<Result<Vec<Record>, DaoError>>),
    /// Close the pool and stop the actor.
    Close(RpcReplyPort<()>),
}

/// Handle for issuing statements through the gateway actor.
///
/// The actor processes one message at a time, so statements reach the store
/// strictly in the order they were sent.
#[derive(Clone)]
pub struct GatewayHandle {
    actor: ActorRef<GatewayMessage>,
}

impl GatewayHandle {
    /// Open the store described by `cfg` and spawn a gateway owning it.
    pub async fn spawn(cfg: &Config) -> Result<Self, DaoError> {
        let connect_opts = SqliteConnectOptions::from_str(cfg.database_url.as_str())
            .map_err(|e| DaoError::StoreUnavailable(format!("invalid database url: {e}")))?
            .create_if_missing(true)
            .busy_timeout(cfg.busy_timeout());
        // One connection: statements never interleave, and `sqlite::memory:`
        // keeps a single database for the gateway's lifetime.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(connect_opts)
            .await
            .map_err(|e| DaoError::StoreUnavailable(format!("connect failed: {e}")))?;
        Self::with_pool(pool).await
    }

    /// Spawn a gateway around an already opened pool.
    pub async fn with_pool(pool: SqlitePool) -> Result<Self, DaoError> {
        let (actor, _jh) = Actor::spawn(None, EngineGateway, pool)
            .await
            .map_err(|e| DaoError::StoreUnavailable(format!("failed to spawn gateway: {e}")))?;
        Ok(Self { actor })
    }

    pub async fn execute(
        &self,
        sql: impl Into<String>,
        params: Vec<Value>,
    ) -> Result<u64, DaoError> {
        let sql = sql.into();
        ractor::call!(self.actor, GatewayMessage::Execute, sql, params)
            .map_err(|e| DaoError::StoreUnavailable(format!("Execute RPC failed: {e}")))?
    }

    pub async fn fetch(
        &self,
        sql: impl Into<String>,
        params: Vec<Value>,
    ) -> Result<Vec<Record>, DaoError> {
        let sql = sql.into();
        ractor::call!(self.actor, GatewayMessage::Fetch, sql, params)
            .map_err(|e| DaoError::StoreUnavailable(format!("Fetch RPC failed: {e}")))?
    }

    /// Release the store connection. Fails if the gateway is already gone.
    pub async fn close(&self) -> Result<(), DaoError> {
        ractor::call!(self.actor, GatewayMessage::Close)
            .map_err(|e| DaoError::StoreUnavailable(format!("Close RPC failed: {e}")))
    }
}

struct GatewayState {
    pool: SqlitePool,
}

impl GatewayState {
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<u64, DaoError> {
        let query = bind_all(sqlx::query(sql), params);
        let done = query.execute(&self.pool).await?;
        Ok(done.rows_affected())
    }

    async fn fetch(&self, sql: &str, params: &[Value]) -> Result<Vec<Record>, DaoError> {
        let query = bind_all(sqlx::query(sql), params);
        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(row_to_record).collect()
    }
}

/// ractor-based engine gateway
struct EngineGateway;

#[ractor::async_trait]
impl Actor for EngineGateway {
    type Msg = GatewayMessage;
    type State = GatewayState;
    type Arguments = SqlitePool;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        pool: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        debug!("EngineGateway started");
        Ok(GatewayState { pool })
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            GatewayMessage::Execute(sql, params, rp) => {
                let result = state.execute(&sql, &params).await;
                match &result {
                    Ok(rows_affected) => {
                        debug!(sql = %sql, params = ?params, rows_affected, "execute")
                    }
                    Err(e) => warn!(sql = %sql, params = ?params, error = %e, "execute failed"),
                }
                let _ = rp.send(result);
            }
            GatewayMessage::Fetch(sql, params, rp) => {
                let result = state.fetch(&sql, &params).await;
                match &result {
                    Ok(rows) => debug!(sql = %sql, params = ?params, rows = rows.len(), "fetch"),
                    Err(e) => warn!(sql = %sql, params = ?params, error = %e, "fetch failed"),
                }
                let _ = rp.send(result);
            }
            GatewayMessage::Close(rp) => {
                state.pool.close().await;
                info!("store connection closed");
                myself.stop(Some("closed".to_string()));
                let _ = rp.send(());
            }
        }
        Ok(())
    }
}
