//! Sequential script execution on one connection.

use crate::config::DatabaseName;
use crate::db::DatabaseClient;
use crate::error::{CheckError, Result};
use crate::report::Reporter;
use crate::script::Script;
use tracing::{debug, info};

/// Selects `database`, then executes every statement of `script` in order.
///
/// Stops at the first failing statement. Statements that already ran stay
/// applied. Returns the number of statements executed.
pub async fn run_script(
    conn: &mut dyn DatabaseClient,
    script: &Script,
    database: &DatabaseName,
    reporter: &mut dyn Reporter,
) -> Result<usize> {
    conn.use_database(database.as_str())
        .await
        .map_err(|source| CheckError::ScriptExecution {
            index: 0,
            statement: format!("USE {database}"),
            source,
        })?;

    info!(
        "Running {} statements from {} in {database}",
        script.len(),
        script.label()
    );
    reporter.script_started(script);

    for statement in script.statements() {
        reporter.statement_started(statement);
        debug!("Executing statement #{}", statement.index);

        conn.execute(&statement.sql)
            .await
            .map_err(|source| CheckError::ScriptExecution {
                index: statement.index,
                statement: statement.sql.clone(),
                source,
            })?;
    }

    reporter.script_completed(script);
    Ok(script.len())
}
