//! Diagnostic record rendering and forwarding.
//!
//! Once a statement is finalized, the emitter combines caller context,
//! literal SQL, and the rendered plan into one text block and forwards it to
//! two collaborators: the structured logger (`tracing`) and a durable
//! append-only sink.

use std::sync::Mutex;

/// The final correlated diagnostic for one executed statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticRecord {
    /// Resolved caller context
    pub caller: String,
    /// Fully-bound SQL text
    pub literal_sql: String,
    /// Rendered execution plan
    pub plan_text: String,
}

impl DiagnosticRecord {
    /// Render the record as the diagnostic text block.
    ///
    /// `EXECUTION_PLANS:` (no space after the colon) is the grep marker
    /// established log consumers already search for.
    pub fn render_block(&self) -> String {
        format!(
            "EXECUTION_PLANS:Method '{}' was executed. The associated SQL query, with bound arguments, is: '{}'.\n{}",
            self.caller, self.literal_sql, self.plan_text
        )
    }
}

/// A durable append-only sink for diagnostic blocks.
///
/// The persistent implementation (file, table, external collector) lives
/// outside this crate; implement this trait to receive each block.
pub trait DiagnosticSink: Send + Sync {
    /// Append one diagnostic block.
    fn append(&self, text: &str);
}

/// A sink that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl DiagnosticSink for NoopSink {
    fn append(&self, _text: &str) {}
}

/// An in-memory sink, useful in tests and demos.
#[derive(Debug, Default)]
pub struct MemorySink {
    blocks: Mutex<Vec<String>>,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every appended block, oldest first.
    pub fn blocks(&self) -> Vec<String> {
        self.blocks.lock().unwrap().clone()
    }
}

impl DiagnosticSink for MemorySink {
    fn append(&self, text: &str) {
        self.blocks.lock().unwrap().push(text.to_string());
    }
}

/// Forward a finalized record to the structured logger and the sink.
pub fn emit(record: &DiagnosticRecord, sink: &dyn DiagnosticSink) {
    let block = record.render_block();
    tracing::info!(
        target: "planwatch.diagnostic",
        caller = %record.caller,
        sql = %record.literal_sql,
        "{block}"
    );
    sink.append(&block);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_contains_caller_sql_and_plan() {
        let record = DiagnosticRecord {
            caller: "myapp::users::find:31".to_string(),
            literal_sql: "SELECT * FROM user WHERE id = 42".to_string(),
            plan_text: "Lvl 1\nplan".to_string(),
        };
        let block = record.render_block();
        assert!(block.starts_with("EXECUTION_PLANS:Method 'myapp::users::find:31'"));
        assert!(block.contains("'SELECT * FROM user WHERE id = 42'"));
        assert!(block.ends_with("Lvl 1\nplan"));
    }

    #[test]
    fn memory_sink_collects_blocks_in_order() {
        let sink = MemorySink::new();
        sink.append("first");
        sink.append("second");
        assert_eq!(sink.blocks(), ["first", "second"]);
    }

    #[test]
    fn emit_forwards_to_sink() {
        let sink = MemorySink::new();
        let record = DiagnosticRecord {
            caller: "a".to_string(),
            literal_sql: "SELECT 1".to_string(),
            plan_text: String::new(),
        };
        emit(&record, &sink);
        assert_eq!(sink.blocks().len(), 1);
        assert!(sink.blocks()[0].contains("SELECT 1"));
    }
}
