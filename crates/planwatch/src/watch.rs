//! Event dispatcher driving the capture pipeline.
//!
//! The [`SqlWatcher`] receives statement and bind notifications, drives the
//! per-scope correlation buffer, and on completion runs the binder, queries
//! the plan provider, and forwards the diagnostic. It never returns an error
//! to the instrumentation caller; every failure is contained as a warning
//! log line.

use crate::bind::bind_literal;
use crate::buffer::CorrelationBuffer;
use crate::caller::CallerResolver;
use crate::config::WatchConfig;
use crate::emit::{emit, DiagnosticRecord, DiagnosticSink, NoopSink};
use crate::event::SqlEvent;
use crate::plan::{Explainer, PlanExecutor};
use crate::stats::ScopeStatistics;
use std::sync::Arc;

/// Correlation state for one logical request/transaction.
///
/// Each concurrent caller owns its own scope and passes it explicitly
/// through the dispatch path, so bind events can never be misattributed to a
/// statement opened by another caller and the plan round trip of one scope
/// never blocks another.
#[derive(Debug)]
pub struct CorrelationScope {
    pub(crate) buffer: CorrelationBuffer,
}

impl CorrelationScope {
    /// Create a scope retaining at most `max_history` statements.
    pub fn new(max_history: usize) -> Self {
        Self {
            buffer: CorrelationBuffer::new(max_history),
        }
    }

    /// The scope's correlation buffer.
    pub fn buffer(&self) -> &CorrelationBuffer {
        &self.buffer
    }

    /// Group the scope's retained statements by template.
    pub fn statistics(&self) -> ScopeStatistics {
        ScopeStatistics::from_buffer(&self.buffer)
    }
}

/// The event dispatcher: correlates notifications and emits diagnostics.
pub struct SqlWatcher<E> {
    executor: E,
    explainer: Explainer,
    resolver: CallerResolver,
    sink: Arc<dyn DiagnosticSink>,
    config: WatchConfig,
}

impl<E: PlanExecutor> SqlWatcher<E> {
    /// Create a watcher over the given plan-query executor.
    pub fn new(executor: E, config: WatchConfig) -> Self {
        let mut explainer = Explainer::new(config.dialect);
        if let Some(timeout) = config.plan_timeout {
            explainer = explainer.with_timeout(timeout);
        }
        let resolver = CallerResolver::new(config.base_path.clone());
        Self {
            executor,
            explainer,
            resolver,
            sink: Arc::new(NoopSink),
            config,
        }
    }

    /// Set the durable diagnostic sink.
    pub fn with_sink<S: DiagnosticSink + 'static>(mut self, sink: S) -> Self {
        self.sink = Arc::new(sink);
        self
    }

    /// Set the durable diagnostic sink from an Arc.
    pub fn with_sink_arc(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Get the current configuration.
    pub fn config(&self) -> &WatchConfig {
        &self.config
    }

    /// Get a reference to the inner executor.
    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Create a scope sized per this watcher's configuration.
    pub fn new_scope(&self) -> CorrelationScope {
        CorrelationScope::new(self.config.max_history)
    }

    /// Summarize a scope at the end of its request/transaction and warn when
    /// one template repeated often enough to look like an N+1 pattern.
    ///
    /// `method` names the transaction-opening method for the warning. Any
    /// warning is also forwarded to the diagnostic sink.
    pub fn report_statistics(&self, scope: &CorrelationScope, method: &str) {
        let stats = scope.statistics();
        if let Some(warning) = stats.report_n_plus_one(method, self.config.n_plus_one_threshold) {
            self.sink.append(&warning);
        }
    }

    /// Dispatch one notification against a scope.
    ///
    /// Completion is re-evaluated after every event, so a statement with
    /// zero placeholders finalizes on the statement notification alone.
    pub async fn handle(&self, scope: &mut CorrelationScope, event: SqlEvent) {
        match event {
            SqlEvent::Statement { sql, frames } => {
                let caller = self.resolver.resolve(&frames);
                tracing::debug!(target: "planwatch", sql = %sql, caller = %caller, "statement opened");
                scope.buffer.open_statement(sql, caller);
            }
            SqlEvent::Bind { value } => {
                if let Err(e) = scope.buffer.push_bind(value) {
                    tracing::warn!(target: "planwatch", error = %e, "dropping bind event");
                    return;
                }
            }
        }
        self.evaluate(scope).await;
    }

    /// Finalize the last statement if it just became complete.
    ///
    /// `mark_complete` only succeeds once per statement, so a finalized
    /// statement is never evaluated again.
    async fn evaluate(&self, scope: &mut CorrelationScope) {
        let Some(last) = scope.buffer.last_mut() else {
            return;
        };
        if !last.mark_complete() {
            return;
        }

        let literal_sql = bind_literal(&last.sql, &last.binds);
        let rows = self.explainer.explain(&self.executor, &literal_sql).await;
        let plan_text = self.explainer.render(&rows);

        let record = DiagnosticRecord {
            caller: last.caller.clone(),
            literal_sql,
            plan_text,
        };
        last.mark_finalized(rows);
        emit(&record, self.sink.as_ref());
    }
}
