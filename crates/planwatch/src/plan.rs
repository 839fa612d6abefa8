//! Execution-plan retrieval, polymorphic over the database dialect.
//!
//! The engine asks the configured dialect for an execution plan of the
//! literal SQL it reconstructed. Retrieval goes through the [`PlanExecutor`]
//! collaborator (one configured connection to the database under diagnosis).
//! Every failure path — driver error, unsupported syntax, timeout — is
//! logged and mapped to an empty plan so the capture pipeline never stalls.

use crate::error::{WatchError, WatchResult};
use std::time::Duration;

/// Width of the key column in the rendered key/value plan table.
const KEY_WIDTH: usize = 20;

/// One row of an execution plan: ordered column-name/value pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanRow {
    columns: Vec<(String, String)>,
}

impl PlanRow {
    /// Create an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column, keeping insertion order.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.columns.push((name.into(), value.into()));
    }

    /// Builder-style [`PlanRow::push`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(name, value);
        self
    }

    /// Value of the first column with the given name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Iterate over columns in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.columns.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl FromIterator<(String, String)> for PlanRow {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self {
            columns: iter.into_iter().collect(),
        }
    }
}

/// The query-execution collaborator used for plan retrieval.
///
/// One implementation per driver; the engine only ever issues read-only
/// EXPLAIN-family statements through it.
pub trait PlanExecutor: Send + Sync {
    /// Run `sql` and return every result row as a [`PlanRow`].
    fn query_for_list(
        &self,
        sql: &str,
    ) -> impl std::future::Future<Output = WatchResult<Vec<PlanRow>>> + Send;
}

/// Database dialect the plan provider speaks, selected at configuration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    /// `EXPLAIN <sql>`; the plan is the returned row set
    MySql,
    /// `EXPLAIN <sql>`; row-returning like MySQL
    Postgres,
    /// `EXPLAIN PLAN FOR <sql>` followed by a read of the plan view
    Oracle,
    /// No EXPLAIN facility configured; always yields an empty plan
    #[default]
    Disabled,
}

impl Dialect {
    /// Map a driver identifier (e.g. a JDBC-style driver class name or a
    /// connection-URL scheme) onto a dialect.
    pub fn from_driver(driver: &str) -> WatchResult<Self> {
        let lower = driver.to_ascii_lowercase();
        if lower.contains("mysql") || lower.contains("mariadb") {
            Ok(Dialect::MySql)
        } else if lower.contains("postgres") {
            Ok(Dialect::Postgres)
        } else if lower.contains("oracle") {
            Ok(Dialect::Oracle)
        } else {
            Err(WatchError::UnsupportedDialect(driver.to_string()))
        }
    }
}

/// Dialect-aware plan retrieval and rendering.
#[derive(Debug, Clone)]
pub struct Explainer {
    dialect: Dialect,
    timeout: Option<Duration>,
}

impl Explainer {
    /// Create an explainer for the given dialect, with no timeout.
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            timeout: None,
        }
    }

    /// Bound the plan round trip; expiry behaves like any provider failure.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// The configured dialect.
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Retrieve the execution plan for `sql`.
    ///
    /// Never fails: provider errors and timeouts are logged at warn level
    /// and collapse to an empty plan.
    pub async fn explain<E: PlanExecutor>(&self, executor: &E, sql: &str) -> Vec<PlanRow> {
        match self.try_explain(executor, sql).await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!(
                    target: "planwatch.plan",
                    error = %e,
                    sql = %sql,
                    "execution plan retrieval failed"
                );
                Vec::new()
            }
        }
    }

    async fn try_explain<E: PlanExecutor>(
        &self,
        executor: &E,
        sql: &str,
    ) -> WatchResult<Vec<PlanRow>> {
        match self.dialect {
            Dialect::Disabled => Ok(Vec::new()),
            Dialect::MySql | Dialect::Postgres => {
                self.run(executor, &format!("EXPLAIN {sql}")).await
            }
            Dialect::Oracle => {
                self.run(executor, &format!("EXPLAIN PLAN FOR {sql}")).await?;
                self.run(executor, "SELECT * FROM TABLE(DBMS_XPLAN.DISPLAY)")
                    .await
            }
        }
    }

    async fn run<E: PlanExecutor>(&self, executor: &E, sql: &str) -> WatchResult<Vec<PlanRow>> {
        match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, executor.query_for_list(sql))
                .await
                .map_err(|_| WatchError::Timeout(timeout))?,
            None => executor.query_for_list(sql).await,
        }
    }

    /// Render plan rows for display. Pure and idempotent.
    pub fn render(&self, rows: &[PlanRow]) -> String {
        match self.dialect {
            Dialect::Disabled => String::new(),
            Dialect::MySql | Dialect::Postgres => render_key_value_table(rows),
            Dialect::Oracle => render_concatenated(rows),
        }
    }
}

/// One fixed-width two-column Key/Value table per row, keys truncated to
/// [`KEY_WIDTH`] with an ellipsis.
fn render_key_value_table(rows: &[PlanRow]) -> String {
    let mut out = String::new();
    let separator = format!("{}+", "+".repeat(KEY_WIDTH + 4));
    for (i, row) in rows.iter().enumerate() {
        out.push_str(&format!("Lvl {}\n", i + 1));
        out.push_str(&separator);
        out.push('\n');
        out.push_str(&format!("| {:KEY_WIDTH$} | {} |\n", "Key", "Value"));
        out.push_str(&separator);
        out.push('\n');
        for (name, value) in row.iter() {
            out.push_str(&format!(
                "| {:KEY_WIDTH$} | {} |\n",
                truncate_key(name, KEY_WIDTH),
                value
            ));
        }
        out.push_str(&separator);
        out.push_str("\n\n");
    }
    out
}

/// All column values per row concatenated, rows separated by newlines.
fn render_concatenated(rows: &[PlanRow]) -> String {
    let mut out = String::new();
    for row in rows {
        for (_, value) in row.iter() {
            out.push_str(value);
        }
        out.push('\n');
    }
    out
}

fn truncate_key(key: &str, width: usize) -> String {
    if key.chars().count() <= width {
        return key.to_string();
    }
    let mut truncated: String = key.chars().take(width - 1).collect();
    truncated.push('…');
    truncated
}

/// [`PlanExecutor`] backed by a `tokio_postgres` client.
///
/// Uses the simple-query protocol so every plan column comes back as text,
/// which is all the renderer needs.
#[cfg(feature = "postgres")]
pub struct PgPlanExecutor {
    client: tokio_postgres::Client,
}

#[cfg(feature = "postgres")]
impl PgPlanExecutor {
    /// Wrap a connected client.
    pub fn new(client: tokio_postgres::Client) -> Self {
        Self { client }
    }
}

#[cfg(feature = "postgres")]
impl PlanExecutor for PgPlanExecutor {
    async fn query_for_list(&self, sql: &str) -> WatchResult<Vec<PlanRow>> {
        use tokio_postgres::SimpleQueryMessage;

        let messages = self
            .client
            .simple_query(sql)
            .await
            .map_err(|e| WatchError::plan_provider(e.to_string()))?;

        let mut rows = Vec::new();
        for message in messages {
            if let SimpleQueryMessage::Row(row) = message {
                let mut plan_row = PlanRow::new();
                for (i, column) in row.columns().iter().enumerate() {
                    plan_row.push(column.name(), row.get(i).unwrap_or("NULL"));
                }
                rows.push(plan_row);
            }
        }
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records every statement it receives and replays canned rows.
    struct RecordingExecutor {
        seen: Mutex<Vec<String>>,
        rows: Vec<PlanRow>,
    }

    impl RecordingExecutor {
        fn new(rows: Vec<PlanRow>) -> Self {
            Self {
                seen: Mutex::new(Vec::new()),
                rows,
            }
        }

        fn seen(&self) -> Vec<String> {
            self.seen.lock().unwrap().clone()
        }
    }

    impl PlanExecutor for RecordingExecutor {
        async fn query_for_list(&self, sql: &str) -> WatchResult<Vec<PlanRow>> {
            self.seen.lock().unwrap().push(sql.to_string());
            Ok(self.rows.clone())
        }
    }

    struct FailingExecutor;
    impl PlanExecutor for FailingExecutor {
        async fn query_for_list(&self, _sql: &str) -> WatchResult<Vec<PlanRow>> {
            Err(WatchError::plan_provider("connection refused"))
        }
    }

    struct HangingExecutor;
    impl PlanExecutor for HangingExecutor {
        async fn query_for_list(&self, _sql: &str) -> WatchResult<Vec<PlanRow>> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(vec![])
        }
    }

    #[test]
    fn dialect_from_driver() {
        assert_eq!(
            Dialect::from_driver("com.mysql.cj.jdbc.Driver").unwrap(),
            Dialect::MySql
        );
        assert_eq!(
            Dialect::from_driver("postgresql://localhost").unwrap(),
            Dialect::Postgres
        );
        assert_eq!(
            Dialect::from_driver("oracle.jdbc.OracleDriver").unwrap(),
            Dialect::Oracle
        );
        assert!(matches!(
            Dialect::from_driver("org.h2.Driver"),
            Err(WatchError::UnsupportedDialect(_))
        ));
    }

    #[tokio::test]
    async fn mysql_issues_single_explain() {
        let executor = RecordingExecutor::new(vec![PlanRow::new().with("id", "1")]);
        let explainer = Explainer::new(Dialect::MySql);

        let rows = explainer.explain(&executor, "SELECT 1").await;
        assert_eq!(rows.len(), 1);
        assert_eq!(executor.seen(), ["EXPLAIN SELECT 1"]);
    }

    #[tokio::test]
    async fn oracle_issues_two_step_explain() {
        let executor = RecordingExecutor::new(vec![PlanRow::new().with("PLAN_TABLE_OUTPUT", "x")]);
        let explainer = Explainer::new(Dialect::Oracle);

        explainer.explain(&executor, "SELECT 1").await;
        assert_eq!(
            executor.seen(),
            [
                "EXPLAIN PLAN FOR SELECT 1",
                "SELECT * FROM TABLE(DBMS_XPLAN.DISPLAY)"
            ]
        );
    }

    #[tokio::test]
    async fn disabled_dialect_never_touches_executor() {
        let executor = RecordingExecutor::new(vec![PlanRow::new().with("id", "1")]);
        let explainer = Explainer::new(Dialect::Disabled);

        let rows = explainer.explain(&executor, "SELECT 1").await;
        assert!(rows.is_empty());
        assert!(executor.seen().is_empty());
        assert_eq!(explainer.render(&rows), "");
    }

    #[tokio::test]
    async fn provider_failure_collapses_to_empty_plan() {
        let explainer = Explainer::new(Dialect::MySql);
        let rows = explainer.explain(&FailingExecutor, "SELECT 1").await;
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn timeout_collapses_to_empty_plan() {
        let explainer =
            Explainer::new(Dialect::MySql).with_timeout(Duration::from_millis(10));
        let rows = explainer.explain(&HangingExecutor, "SELECT 1").await;
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn expiry_surfaces_internally_as_timeout_error() {
        let explainer =
            Explainer::new(Dialect::MySql).with_timeout(Duration::from_millis(10));
        let err = explainer
            .try_explain(&HangingExecutor, "SELECT 1")
            .await
            .unwrap_err();
        assert!(err.is_timeout());
    }

    #[test]
    fn key_value_table_rendering() {
        let rows = vec![
            PlanRow::new()
                .with("id", "1")
                .with("select_type", "SIMPLE"),
        ];
        let explainer = Explainer::new(Dialect::MySql);
        let text = explainer.render(&rows);

        assert!(text.starts_with("Lvl 1\n"));
        assert!(text.contains("| Key                  | Value |"));
        assert!(text.contains("| id                   | 1 |"));
        assert!(text.contains("| select_type          | SIMPLE |"));
    }

    #[test]
    fn long_keys_are_truncated_with_ellipsis() {
        let rows = vec![PlanRow::new().with("a_very_long_plan_column_name", "v")];
        let explainer = Explainer::new(Dialect::MySql);
        let text = explainer.render(&rows);
        assert!(text.contains("a_very_long_plan_co…"));
        assert!(!text.contains("a_very_long_plan_column_name"));
    }

    #[test]
    fn concatenated_rendering_joins_values_per_row() {
        let rows = vec![
            PlanRow::new().with("PLAN_TABLE_OUTPUT", "| SELECT STATEMENT |"),
            PlanRow::new().with("PLAN_TABLE_OUTPUT", "| TABLE ACCESS FULL |"),
        ];
        let explainer = Explainer::new(Dialect::Oracle);
        assert_eq!(
            explainer.render(&rows),
            "| SELECT STATEMENT |\n| TABLE ACCESS FULL |\n"
        );
    }

    #[test]
    fn rendering_is_idempotent() {
        let rows = vec![PlanRow::new().with("id", "1")];
        let explainer = Explainer::new(Dialect::MySql);
        assert_eq!(explainer.render(&rows), explainer.render(&rows));
    }
}
