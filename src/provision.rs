//! Database provisioning.

use crate::config::DatabaseName;
use crate::db::DatabaseClient;
use crate::error::{CheckError, Result};
use tracing::info;

/// Drops the database if it exists, then creates it empty.
///
/// Both statements run in order on the same connection. Any failure aborts
/// without retry or cleanup.
pub async fn provision_database(
    conn: &mut dyn DatabaseClient,
    database: &DatabaseName,
) -> Result<()> {
    info!("Provisioning database {database}");

    for statement in [
        format!("DROP DATABASE IF EXISTS {database}"),
        format!("CREATE DATABASE {database}"),
    ] {
        conn.execute(&statement)
            .await
            .map_err(|source| CheckError::Provision {
                database: database.to_string(),
                statement: statement.clone(),
                source,
            })?;
    }

    Ok(())
}
