//! Write operations for the user store.
//!
//! Each method issues a single parameterized statement as its own
//! auto-committed unit of work. Values are always bound as parameters,
//! never spliced into statement text.

use neo4rs::query;

use crate::client::{GraphClient, GraphError};
use crate::queries::{row_to_user, UserRecord};

impl GraphClient {
    /// Create a user node and return the attributes as confirmed by the
    /// store.
    ///
    /// No uniqueness constraint exists on `name`: creating the same name
    /// twice yields two distinct nodes.
    pub async fn create_user(&self, name: &str, age: i64) -> Result<UserRecord, GraphError> {
        let q = query(
            "CREATE (u:User {name: $name, age: $age})
             RETURN u.name AS name, u.age AS age",
        )
        .param("name", name.to_string())
        .param("age", age);

        match self.query_one(q).await? {
            Some(row) => row_to_user(&row),
            None => Err(GraphError::EmptyResult {
                operation: "create_user",
            }),
        }
    }

    /// Set the age of every user matching `name`.
    ///
    /// When several nodes share the name, the SET applies to all of them
    /// but only the first row the store yields is reported back; which of
    /// the matches that is, is up to the store. Returns `None` when
    /// nothing matched.
    pub async fn update_user_age(
        &self,
        name: &str,
        new_age: i64,
    ) -> Result<Option<UserRecord>, GraphError> {
        let q = query(
            "MATCH (u:User {name: $name})
             SET u.age = $new_age
             RETURN u.name AS name, u.age AS age",
        )
        .param("name", name.to_string())
        .param("new_age", new_age);

        match self.query_one(q).await? {
            Some(row) => Ok(Some(row_to_user(&row)?)),
            None => Ok(None),
        }
    }

    /// Delete every user matching `name`.
    /// Returns the count of deleted nodes; zero matches is not an error.
    pub async fn delete_user(&self, name: &str) -> Result<i64, GraphError> {
        let q = query(
            "MATCH (u:User {name: $name})
             DETACH DELETE u
             RETURN count(u) AS cnt",
        )
        .param("name", name.to_string());

        match self.query_one(q).await? {
            Some(row) => Ok(row.get::<i64>("cnt").unwrap_or(0)),
            None => Ok(0),
        }
    }
}
