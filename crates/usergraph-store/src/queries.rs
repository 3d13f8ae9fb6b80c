//! Read operations and the records they return.

use neo4rs::query;

use crate::client::{GraphClient, GraphError};

/// A user row as confirmed by the store.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct UserRecord {
    pub name: String,
    pub age: i64,
}

/// An arbitrary node from the ad hoc dump: its labels plus a loose
/// property bag.
#[derive(Debug, Clone, serde::Serialize)]
pub struct AnyNodeRecord {
    pub labels: Vec<String>,
    pub properties: serde_json::Value,
}

impl GraphClient {
    /// List every user. Fully materialized before return; order is
    /// whatever the store yields and is not guaranteed stable.
    pub async fn list_users(&self) -> Result<Vec<UserRecord>, GraphError> {
        let q = query("MATCH (u:User) RETURN u.name AS name, u.age AS age");

        let rows = self.query_rows(q).await?;
        let mut users = Vec::with_capacity(rows.len());
        for row in rows {
            users.push(row_to_user(&row)?);
        }
        Ok(users)
    }

    /// Fetch up to `limit` nodes of any label, for inspection.
    pub async fn dump_nodes(&self, limit: i64) -> Result<Vec<AnyNodeRecord>, GraphError> {
        let q = query("MATCH (n) RETURN n, labels(n) AS labels, keys(n) AS keys LIMIT $limit")
            .param("limit", limit);

        let rows = self.query_rows(q).await?;
        let mut nodes = Vec::with_capacity(rows.len());
        for row in rows {
            let node: neo4rs::Node = row.get("n").map_err(|e| {
                GraphError::Serialization(format!("Failed to deserialize node: {e}"))
            })?;
            let labels: Vec<String> = row.get("labels").unwrap_or_default();
            let keys: Vec<String> = row.get("keys").unwrap_or_default();
            nodes.push(node_to_record(&node, labels, &keys));
        }
        Ok(nodes)
    }
}

/// Convert a row with `name` / `age` columns into a UserRecord.
pub(crate) fn row_to_user(row: &neo4rs::Row) -> Result<UserRecord, GraphError> {
    let name: String = row
        .get("name")
        .map_err(|e| GraphError::Serialization(format!("Failed to read name: {e}")))?;
    let age: i64 = row
        .get("age")
        .map_err(|e| GraphError::Serialization(format!("Failed to read age: {e}")))?;
    Ok(UserRecord { name, age })
}

/// Convert a neo4rs::Node to an AnyNodeRecord. Every key is kept: scalar
/// and list properties map to their JSON equivalents, anything else
/// (temporal, spatial, nested) gets a placeholder rather than vanishing
/// from the dump.
fn node_to_record(node: &neo4rs::Node, labels: Vec<String>, keys: &[String]) -> AnyNodeRecord {
    let mut props = serde_json::Map::new();
    for key in keys {
        let value = if let Ok(s) = node.get::<String>(key) {
            serde_json::Value::String(s)
        } else if let Ok(i) = node.get::<i64>(key) {
            serde_json::Value::from(i)
        } else if let Ok(f) = node.get::<f64>(key) {
            serde_json::Value::from(f)
        } else if let Ok(b) = node.get::<bool>(key) {
            serde_json::Value::Bool(b)
        } else if let Ok(list) = node.get::<Vec<String>>(key) {
            serde_json::Value::from(list)
        } else if let Ok(list) = node.get::<Vec<i64>>(key) {
            serde_json::Value::from(list)
        } else {
            serde_json::Value::String("<unsupported property type>".to_string())
        };
        props.insert(key.clone(), value);
    }

    AnyNodeRecord {
        labels,
        properties: serde_json::Value::Object(props),
    }
}
