//! Per-scope query statistics and N+1 detection.
//!
//! A correlation scope retains every statement of one request/transaction,
//! which is exactly the window where N+1 problems show up: the same template
//! executed once per parent row instead of once with a join or batch fetch.
//! At the end of the scope, [`ScopeStatistics`] groups the retained
//! statements by template and flags templates that repeated beyond a
//! threshold.

use crate::buffer::CorrelationBuffer;

/// Execution count for one SQL template within a scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateStats {
    /// Template SQL text
    pub sql: String,
    /// Number of executions in the scope
    pub count: usize,
    /// Distinct caller contexts that executed it, in first-seen order
    pub callers: Vec<String>,
}

/// Statements of one scope grouped by template, in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct ScopeStatistics {
    templates: Vec<TemplateStats>,
}

impl ScopeStatistics {
    /// Build statistics from a scope's correlation buffer.
    ///
    /// Only retained statements are counted; with a very small
    /// `max_history` the oldest finalized entries of a long transaction may
    /// already be evicted.
    pub fn from_buffer(buffer: &CorrelationBuffer) -> Self {
        let mut templates: Vec<TemplateStats> = Vec::new();
        for statement in buffer.iter() {
            match templates.iter_mut().find(|t| t.sql == statement.sql) {
                Some(existing) => {
                    existing.count += 1;
                    if !existing.callers.contains(&statement.caller) {
                        existing.callers.push(statement.caller.clone());
                    }
                }
                None => templates.push(TemplateStats {
                    sql: statement.sql.clone(),
                    count: 1,
                    callers: vec![statement.caller.clone()],
                }),
            }
        }
        Self { templates }
    }

    /// Every template seen in the scope, in first-seen order.
    pub fn templates(&self) -> &[TemplateStats] {
        &self.templates
    }

    /// Templates executed at least `threshold` times.
    pub fn repeated(&self, threshold: usize) -> Vec<&TemplateStats> {
        self.templates
            .iter()
            .filter(|t| t.count >= threshold.max(2))
            .collect()
    }

    /// Check the scope for an N+1 pattern and log the outcome.
    ///
    /// When some template repeated at least `threshold` times, a warning
    /// naming the repeated fetches and the originating method is logged and
    /// its text returned; otherwise a trace line is logged and `None`
    /// returned.
    pub fn report_n_plus_one(&self, method: &str, threshold: usize) -> Option<String> {
        let repeated = self.repeated(threshold);
        if repeated.is_empty() {
            tracing::trace!(
                target: "planwatch.stats",
                method = %method,
                "no N+1 issue detected"
            );
            return None;
        }

        let queries: Vec<&str> = self.templates.iter().map(|t| t.sql.as_str()).collect();
        let details: Vec<String> = repeated
            .iter()
            .map(|t| {
                format!(
                    "Number of repeated executions: {}, Template: {}",
                    t.count, t.sql
                )
            })
            .collect();
        let warning = format!(
            "N+1 problem detected. Queries: {queries:?}; Method: {method}; Summary: {details:?}"
        );
        tracing::warn!(target: "planwatch.stats", "{warning}");
        Some(warning)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::CorrelationBuffer;

    fn buffer_with(statements: &[(&str, &str)]) -> CorrelationBuffer {
        let mut buffer = CorrelationBuffer::new(64);
        for (sql, caller) in statements {
            buffer.open_statement(*sql, *caller);
        }
        buffer
    }

    #[test]
    fn statements_group_by_template() {
        let buffer = buffer_with(&[
            ("SELECT * FROM orders WHERE user_id = ?", "a"),
            ("SELECT * FROM item WHERE order_id = ?", "b"),
            ("SELECT * FROM item WHERE order_id = ?", "b"),
            ("SELECT * FROM item WHERE order_id = ?", "c"),
        ]);
        let stats = ScopeStatistics::from_buffer(&buffer);

        assert_eq!(stats.templates().len(), 2);
        assert_eq!(stats.templates()[0].count, 1);
        assert_eq!(stats.templates()[1].count, 3);
        assert_eq!(stats.templates()[1].callers, ["b", "c"]);
    }

    #[test]
    fn repeated_respects_threshold() {
        let buffer = buffer_with(&[
            ("SELECT 1", "a"),
            ("SELECT 2", "a"),
            ("SELECT 2", "a"),
            ("SELECT 2", "a"),
        ]);
        let stats = ScopeStatistics::from_buffer(&buffer);

        assert_eq!(stats.repeated(2).len(), 1);
        assert_eq!(stats.repeated(3).len(), 1);
        assert_eq!(stats.repeated(4).len(), 0);
    }

    #[test]
    fn single_executions_are_not_an_issue() {
        let buffer = buffer_with(&[("SELECT 1", "a"), ("SELECT 2", "a")]);
        let stats = ScopeStatistics::from_buffer(&buffer);

        assert!(stats.report_n_plus_one("myapp::orders::list:40", 2).is_none());
    }

    #[test]
    fn repeated_template_produces_warning() {
        let buffer = buffer_with(&[
            ("SELECT * FROM orders WHERE user_id = ?", "m"),
            ("SELECT * FROM item WHERE order_id = ?", "m"),
            ("SELECT * FROM item WHERE order_id = ?", "m"),
        ]);
        let stats = ScopeStatistics::from_buffer(&buffer);

        let warning = stats
            .report_n_plus_one("myapp::orders::list:40", 2)
            .unwrap();
        assert!(warning.starts_with("N+1 problem detected."));
        assert!(warning.contains("Method: myapp::orders::list:40"));
        assert!(warning.contains("Number of repeated executions: 2"));
        assert!(warning.contains("SELECT * FROM item WHERE order_id = ?"));
    }

    #[test]
    fn empty_scope_yields_no_statistics() {
        let buffer = CorrelationBuffer::new(8);
        let stats = ScopeStatistics::from_buffer(&buffer);
        assert!(stats.templates().is_empty());
        assert!(stats.report_n_plus_one("m", 2).is_none());
    }
}
