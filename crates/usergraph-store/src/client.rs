//! Neo4j connection management and the user store client.

use std::time::Duration;

use std::future::Future;

use neo4rs::{query, ConfigBuilder, Graph, Query};
use serde::Deserialize;
use tokio::time::{sleep, timeout, Instant};

/// Probe statement run during connect. neo4rs builds its pool lazily, so
/// only a real round-trip proves the server is accepting queries.
const PROBE: &str = "MATCH () RETURN 1 LIMIT 1";

/// Errors from graph store operations.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("Neo4j did not become reachable within {waited_secs}s")]
    ConnectTimeout { waited_secs: u64 },

    #[error("Client is not connected: connect was never called, or close was")]
    NotConnected,

    #[error("Neo4j config error: {0}")]
    Config(String),

    #[error("Neo4j query error: {0}")]
    Query(#[from] neo4rs::Error),

    #[error("Unconditional statement in {operation} returned no row")]
    EmptyResult { operation: &'static str },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Configuration for connecting to Neo4j.
///
/// Loaded from the `[neo4j]` section of `usergraph.toml` or
/// `USERGRAPH__NEO4J__` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphConfig {
    #[serde(default = "default_uri")]
    pub uri: String,

    #[serde(default = "default_user")]
    pub user: String,

    #[serde(default = "default_password")]
    pub password: String,

    /// Maximum time to wait for the server to accept the probe statement.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Pause between connection attempts.
    #[serde(default = "default_retry_interval")]
    pub retry_interval_secs: u64,
}

fn default_uri() -> String {
    "bolt://localhost:7687".to_string()
}

fn default_user() -> String {
    "neo4j".to_string()
}

fn default_password() -> String {
    "usergraph-dev".to_string()
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_retry_interval() -> u64 {
    2
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            uri: default_uri(),
            user: default_user(),
            password: default_password(),
            connect_timeout_secs: default_connect_timeout(),
            retry_interval_secs: default_retry_interval(),
        }
    }
}

/// Neo4j user store client.
///
/// Holds exactly one connection handle for its lifetime. The client has
/// two states: connected (after a successful [`GraphClient::connect`])
/// and disconnected (after [`GraphClient::close`]); every operation
/// requires the connected state and fails with [`GraphError::NotConnected`]
/// otherwise. Not `Clone`: the handle is not designed for concurrent use.
pub struct GraphClient {
    graph: Option<Graph>,
}

impl std::fmt::Debug for GraphClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphClient")
            .field("connected", &self.graph.is_some())
            .finish()
    }
}

impl GraphClient {
    /// Connect to Neo4j, waiting for the server to come up.
    ///
    /// Each attempt opens the driver and runs a probe statement; failed
    /// attempts are logged and retried after `retry_interval_secs` until
    /// the elapsed time exceeds `connect_timeout_secs`.
    pub async fn connect(config: &GraphConfig) -> Result<Self, GraphError> {
        let graph = retry_until_deadline(
            || Self::try_connect(config),
            Duration::from_secs(config.connect_timeout_secs),
            Duration::from_secs(config.retry_interval_secs),
        )
        .await?;

        tracing::info!(uri = %config.uri, "Connected to Neo4j");
        Ok(Self { graph: Some(graph) })
    }

    /// Single connection attempt: build the driver config, open the pool,
    /// prove reachability with the probe.
    async fn try_connect(config: &GraphConfig) -> Result<Graph, GraphError> {
        let neo_config = ConfigBuilder::default()
            .uri(&config.uri)
            .user(&config.user)
            .password(&config.password)
            .build()
            .map_err(|e| GraphError::Config(e.to_string()))?;

        let graph = Graph::connect(neo_config).await?;
        graph.run(query(PROBE)).await?;
        Ok(graph)
    }

    /// Release the connection handle. Idempotent: closing twice is a no-op.
    pub fn close(&mut self) {
        if self.graph.take().is_some() {
            tracing::info!("Neo4j connection released");
        }
    }

    fn graph(&self) -> Result<&Graph, GraphError> {
        self.graph.as_ref().ok_or(GraphError::NotConnected)
    }

    /// Execute a write-only statement (CREATE, SET, DELETE).
    pub async fn run(&self, query: Query) -> Result<(), GraphError> {
        self.graph()?.run(query).await?;
        Ok(())
    }

    /// Execute a statement and collect all rows.
    pub async fn query_rows(&self, query: Query) -> Result<Vec<neo4rs::Row>, GraphError> {
        let mut stream = self.graph()?.execute(query).await?;
        let mut rows = Vec::new();
        while let Some(row) = stream.next().await? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Execute a statement and return the first row, if any.
    pub async fn query_one(&self, query: Query) -> Result<Option<neo4rs::Row>, GraphError> {
        let mut stream = self.graph()?.execute(query).await?;
        Ok(stream.next().await?)
    }

    /// Build a client in the disconnected state, for exercising the
    /// state-machine guards without a server.
    #[cfg(test)]
    pub(crate) fn detached() -> Self {
        Self { graph: None }
    }
}

/// Run `attempt` until it succeeds or `timeout_after` elapses, pausing
/// `retry` between attempts. The deadline is computed once up front and
/// each attempt is capped at the time remaining, so a hanging attempt
/// cannot overshoot it.
async fn retry_until_deadline<T, F, Fut>(
    mut attempt: F,
    timeout_after: Duration,
    retry: Duration,
) -> Result<T, GraphError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, GraphError>>,
{
    let started = Instant::now();
    let deadline = started + timeout_after;
    let mut attempts: u32 = 0;

    loop {
        attempts += 1;
        let remaining = deadline.saturating_duration_since(Instant::now());
        let outcome = match timeout(remaining, attempt()).await {
            Ok(outcome) => outcome,
            Err(_) => Err(GraphError::ConnectTimeout {
                waited_secs: started.elapsed().as_secs(),
            }),
        };

        match outcome {
            Ok(value) => return Ok(value),
            Err(e) => {
                if Instant::now() >= deadline {
                    return Err(GraphError::ConnectTimeout {
                        waited_secs: started.elapsed().as_secs(),
                    });
                }
                tracing::warn!(attempt = attempts, error = %e, "Not ready, retrying");
                sleep(retry).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GraphConfig::default();
        assert_eq!(config.uri, "bolt://localhost:7687");
        assert_eq!(config.user, "neo4j");
        assert_eq!(config.connect_timeout_secs, 30);
        assert_eq!(config.retry_interval_secs, 2);
    }

    #[test]
    fn test_config_fills_missing_fields() {
        let config: GraphConfig = serde_json::from_str(r#"{"uri": "bolt://db:7687"}"#).unwrap();
        assert_eq!(config.uri, "bolt://db:7687");
        assert_eq!(config.user, "neo4j");
        assert_eq!(config.retry_interval_secs, 2);
    }

    #[tokio::test]
    async fn test_operations_require_connect() {
        let client = GraphClient::detached();
        let err = client.list_users().await.unwrap_err();
        assert!(matches!(err, GraphError::NotConnected));

        let err = client.create_user("Alice", 25).await.unwrap_err();
        assert!(matches!(err, GraphError::NotConnected));
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let mut client = GraphClient::detached();
        client.close();
        client.close();

        let err = client.list_users().await.unwrap_err();
        assert!(matches!(err, GraphError::NotConnected));
    }

    #[tokio::test]
    async fn test_retry_succeeds_once_the_store_comes_up() {
        let mut calls = 0u32;
        let result: Result<u32, GraphError> = retry_until_deadline(
            || {
                calls += 1;
                let ready = calls > 3;
                async move {
                    if ready {
                        Ok(7)
                    } else {
                        Err(GraphError::NotConnected)
                    }
                }
            },
            Duration::from_secs(5),
            Duration::from_millis(10),
        )
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls, 4);
    }

    #[tokio::test]
    async fn test_hanging_attempt_cannot_overshoot_the_deadline() {
        let started = std::time::Instant::now();
        let result: Result<(), GraphError> = retry_until_deadline(
            || async {
                sleep(Duration::from_secs(60)).await;
                Ok(())
            },
            Duration::from_millis(200),
            Duration::from_millis(50),
        )
        .await;

        assert!(matches!(
            result.unwrap_err(),
            GraphError::ConnectTimeout { .. }
        ));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_connect_times_out_against_unreachable_server() {
        let config = GraphConfig {
            // Discard port: nothing listens there, attempts fail fast.
            uri: "bolt://127.0.0.1:9".to_string(),
            connect_timeout_secs: 1,
            retry_interval_secs: 1,
            ..GraphConfig::default()
        };

        let started = std::time::Instant::now();
        let err = GraphClient::connect(&config).await.unwrap_err();

        assert!(matches!(err, GraphError::ConnectTimeout { .. }));
        assert!(started.elapsed() >= Duration::from_secs(1));
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
