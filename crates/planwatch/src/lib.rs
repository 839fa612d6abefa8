//! # planwatch
//!
//! Runtime SQL capture and execution-plan correlation for instrumented
//! data-access layers.
//!
//! planwatch observes executed SQL statements and their bound parameters as
//! they happen, reconstructs the literal (fully-bound) query text, retrieves
//! a database-side execution plan for it, and emits one correlated
//! diagnostic per statement. It is meant for engineers investigating
//! inefficient queries in a live application.
//!
//! ## Pipeline
//!
//! - a statement notification opens a new entry in the scope's correlation
//!   buffer, tagged with the resolved caller context
//! - bind notifications append to the most recently opened entry
//! - once every placeholder has a value (immediately, for statements without
//!   placeholders), the binder produces literal SQL, the configured dialect
//!   is asked for an execution plan, and the diagnostic is forwarded to the
//!   structured logger and the configured sink
//! - at the end of the scope, [`SqlWatcher::report_statistics`] groups the
//!   retained statements by template and warns when one template repeated
//!   often enough to look like an N+1 pattern
//!
//! All failures are contained: a stray bind is dropped with a warning, an
//! unrenderable value leaves its placeholder unresolved, and a failed or
//! timed-out plan query collapses to an empty plan. Nothing propagates to
//! the instrumented caller.
//!
//! ## Example
//!
//! ```rust,ignore
//! use planwatch::{BindValue, Dialect, MemorySink, SqlEvent, SqlWatcher, WatchConfig};
//!
//! let config = WatchConfig::new()
//!     .with_base_path("myapp")
//!     .with_dialect(Dialect::MySql)
//!     .with_plan_timeout(std::time::Duration::from_secs(2));
//!
//! let watcher = SqlWatcher::new(executor, config).with_sink(MemorySink::new());
//!
//! // One scope per request/transaction.
//! let mut scope = watcher.new_scope();
//! watcher.handle(&mut scope, SqlEvent::statement("SELECT * FROM user WHERE id = ?")).await;
//! watcher.handle(&mut scope, SqlEvent::bind(BindValue::integer("42"))).await;
//! ```

pub mod bind;
pub mod buffer;
pub mod caller;
pub mod config;
pub mod emit;
pub mod error;
pub mod event;
pub mod plan;
pub mod stats;
pub mod watch;

pub use bind::{bind_literal, count_placeholders};
pub use buffer::{CorrelationBuffer, PendingStatement, StatementState};
pub use caller::{CallerResolver, UNKNOWN_METHOD};
pub use config::WatchConfig;
pub use emit::{DiagnosticRecord, DiagnosticSink, MemorySink, NoopSink};
pub use error::{WatchError, WatchResult};
pub use event::{BindType, BindValue, SqlEvent};
pub use plan::{Dialect, Explainer, PlanExecutor, PlanRow};
pub use stats::{ScopeStatistics, TemplateStats};
pub use watch::{CorrelationScope, SqlWatcher};

#[cfg(feature = "postgres")]
pub use plan::PgPlanExecutor;
