//! End-to-end capture demo with a canned plan executor.
//!
//! Run with: `cargo run --example capture`

use planwatch::{
    BindValue, Dialect, MemorySink, PlanExecutor, PlanRow, SqlEvent, SqlWatcher, WatchConfig,
    WatchResult,
};
use std::sync::Arc;

/// Pretends to be a MySQL connection: answers every EXPLAIN with one row.
struct CannedExecutor;

impl PlanExecutor for CannedExecutor {
    async fn query_for_list(&self, _sql: &str) -> WatchResult<Vec<PlanRow>> {
        Ok(vec![
            PlanRow::new()
                .with("id", "1")
                .with("select_type", "SIMPLE")
                .with("table", "user")
                .with("type", "const")
                .with("possible_keys", "PRIMARY")
                .with("rows", "1"),
        ])
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().init();

    let sink = Arc::new(MemorySink::new());
    let config = WatchConfig::new()
        .with_base_path("demo")
        .with_dialect(Dialect::MySql)
        .with_plan_timeout(std::time::Duration::from_secs(2));
    let watcher = SqlWatcher::new(CannedExecutor, config).with_sink_arc(sink.clone());

    let mut scope = watcher.new_scope();

    let frames = vec![
        "orm::client::query:88".to_string(),
        "demo::users::find_by_id:21".to_string(),
    ];
    watcher
        .handle(
            &mut scope,
            SqlEvent::statement_with_frames("SELECT * FROM user WHERE id = ? AND name = ?", frames),
        )
        .await;

    // Bind notifications as a text-based instrumentation layer would emit them.
    for line in [
        "binding parameter (1:INTEGER) <- [42]",
        "binding parameter (2:VARCHAR) <- [O'Brien]",
    ] {
        match BindValue::parse_log_line(line) {
            Some(value) => watcher.handle(&mut scope, SqlEvent::bind(value)).await,
            None => eprintln!("unparseable bind line: {line}"),
        }
    }

    for block in sink.blocks() {
        println!("{block}");
    }
}
