//! Correlation buffer linking statement events to their bind events.
//!
//! The buffer is an ordered store of in-flight and finalized statements.
//! Bind values append only to the most recently opened statement, and a
//! statement moves strictly forward through Open → Complete → Finalized.
//! History is bounded: once the buffer reaches capacity, the oldest
//! finalized entry is evicted when a new statement opens. An in-flight
//! entry is never evicted.

use crate::bind::count_placeholders;
use crate::error::{WatchError, WatchResult};
use crate::event::BindValue;
use crate::plan::PlanRow;
use std::collections::VecDeque;

/// Lifecycle state of a captured statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementState {
    /// Waiting for bind events
    Open,
    /// All placeholders bound; ready to finalize
    Complete,
    /// Literal SQL produced, plan collected, diagnostic emitted
    Finalized,
}

/// One captured statement with its bound values and collected plan.
#[derive(Debug, Clone)]
pub struct PendingStatement {
    /// Template SQL text with `?` placeholders
    pub sql: String,
    /// Resolved caller context for the execution
    pub caller: String,
    /// Bound values, in arrival order
    pub binds: Vec<BindValue>,
    /// Execution plan rows collected at finalization
    pub plan: Vec<PlanRow>,
    placeholder_count: usize,
    state: StatementState,
}

impl PendingStatement {
    fn new(sql: String, caller: String) -> Self {
        let placeholder_count = count_placeholders(&sql);
        Self {
            sql,
            caller,
            binds: Vec::new(),
            plan: Vec::new(),
            placeholder_count,
            state: StatementState::Open,
        }
    }

    /// Number of `?` placeholders in the template.
    pub fn placeholder_count(&self) -> usize {
        self.placeholder_count
    }

    /// Current lifecycle state.
    pub fn state(&self) -> StatementState {
        self.state
    }

    /// Whether every placeholder has a bound value.
    pub fn is_complete(&self) -> bool {
        self.binds.len() == self.placeholder_count
    }

    /// Move Open → Complete. Returns `false` if the statement is not Open or
    /// not yet fully bound; the state never regresses.
    pub fn mark_complete(&mut self) -> bool {
        if self.state == StatementState::Open && self.is_complete() {
            self.state = StatementState::Complete;
            true
        } else {
            false
        }
    }

    /// Move Complete → Finalized, storing the collected plan rows.
    pub fn mark_finalized(&mut self, plan: Vec<PlanRow>) -> bool {
        if self.state == StatementState::Complete {
            self.plan = plan;
            self.state = StatementState::Finalized;
            true
        } else {
            false
        }
    }
}

/// Ordered store of captured statements for one correlation scope.
///
/// One buffer belongs to one logical request/transaction; it is mutated only
/// by that scope's event stream, so no internal locking is needed.
#[derive(Debug)]
pub struct CorrelationBuffer {
    statements: VecDeque<PendingStatement>,
    max_history: usize,
}

impl CorrelationBuffer {
    /// Create a buffer retaining at most `max_history` statements.
    pub fn new(max_history: usize) -> Self {
        Self {
            statements: VecDeque::new(),
            max_history: max_history.max(1),
        }
    }

    /// Open a new statement, evicting the oldest finalized entry if the
    /// buffer is at capacity.
    pub fn open_statement(&mut self, sql: impl Into<String>, caller: impl Into<String>) {
        while self.statements.len() >= self.max_history {
            match self.statements.front() {
                Some(front) if front.state() == StatementState::Finalized => {
                    self.statements.pop_front();
                }
                // Never evict an in-flight entry
                _ => break,
            }
        }
        self.statements
            .push_back(PendingStatement::new(sql.into(), caller.into()));
    }

    /// Append a bound value to the most recently opened statement.
    ///
    /// Fails with an attribution error when there is no statement to attach
    /// to, or when the last statement already left the Open state.
    pub fn push_bind(&mut self, value: BindValue) -> WatchResult<()> {
        let Some(last) = self.statements.back_mut() else {
            return Err(WatchError::attribution(
                "bind event arrived with an empty buffer",
            ));
        };
        if last.state() != StatementState::Open {
            return Err(WatchError::attribution(format!(
                "bind event arrived after statement completion (state {:?})",
                last.state()
            )));
        }
        last.binds.push(value);
        Ok(())
    }

    /// Most recently opened statement.
    pub fn last(&self) -> Option<&PendingStatement> {
        self.statements.back()
    }

    /// Most recently opened statement, mutable.
    pub fn last_mut(&mut self) -> Option<&mut PendingStatement> {
        self.statements.back_mut()
    }

    /// Number of retained statements.
    pub fn len(&self) -> usize {
        self.statements.len()
    }

    /// Whether the buffer holds no statements.
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Iterate over retained statements, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &PendingStatement> {
        self.statements.iter()
    }
}
