//! Notification events consumed from the instrumented persistence layer.
//!
//! The engine consumes two kinds of notifications: a statement notification
//! carrying the templated SQL text, and a bind notification carrying one
//! positional parameter value. Bind values arrive as a typed
//! [`BindValue`] so the core never has to scrape strings; an edge parser for
//! text-based instrumentation lines is provided for layers that only expose
//! their log output.

use crate::error::WatchError;
use regex::Regex;
use std::sync::OnceLock;

/// Declared type tag of a bound parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindType {
    /// Character/string types (CHAR, VARCHAR, NVARCHAR, ...)
    Varchar,
    /// 32-bit integer
    Integer,
    /// 64-bit integer
    BigInt,
    /// Any other declared type; the literal tag is kept for logging
    Other(String),
}

impl BindType {
    /// Map a raw type tag from an instrumentation line onto a [`BindType`].
    pub fn from_tag(tag: &str) -> Self {
        let upper = tag.to_ascii_uppercase();
        if upper.contains("CHAR") {
            BindType::Varchar
        } else if upper.contains("BIGINT") {
            BindType::BigInt
        } else if upper.contains("INTEGER") {
            BindType::Integer
        } else {
            BindType::Other(tag.to_string())
        }
    }
}

/// One bound parameter value: the raw encoded text plus its declared type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindValue {
    /// Raw value text, exactly as bound
    pub raw: String,
    /// Declared parameter type
    pub ty: BindType,
}

impl BindValue {
    /// Create a bind value from raw text and a declared type.
    pub fn new(raw: impl Into<String>, ty: BindType) -> Self {
        Self {
            raw: raw.into(),
            ty,
        }
    }

    /// Convenience constructor for a string-typed value.
    pub fn varchar(raw: impl Into<String>) -> Self {
        Self::new(raw, BindType::Varchar)
    }

    /// Convenience constructor for an integer-typed value.
    pub fn integer(raw: impl Into<String>) -> Self {
        Self::new(raw, BindType::Integer)
    }

    /// Parse a textual bind notification emitted by a logging-based
    /// instrumentation layer, e.g.
    /// `binding parameter (1:VARCHAR) <- [O'Brien]`.
    ///
    /// The bracketed segment is the value; the type tag is located anywhere
    /// in the surrounding text. Returns `None` when no bracketed segment can
    /// be found (the caller should treat this as a formatting failure and
    /// leave the corresponding placeholder unresolved).
    pub fn parse_log_line(line: &str) -> Option<Self> {
        static VALUE_RE: OnceLock<Regex> = OnceLock::new();
        let re = VALUE_RE.get_or_init(|| Regex::new(r"\[([^\]]*)\]").expect("valid regex"));

        let Some(value) = re.captures(line).and_then(|c| c.get(1)) else {
            tracing::warn!(
                target: "planwatch",
                error = %WatchError::formatting("bind notification has no bracketed value segment"),
                line = %line,
                "ignoring bind notification"
            );
            return None;
        };
        Some(Self::new(value.as_str(), BindType::from_tag(line)))
    }
}

/// A notification from the instrumented persistence layer.
#[derive(Debug, Clone)]
pub enum SqlEvent {
    /// A templated SQL statement began execution.
    Statement {
        /// Template text, with `?` positional placeholders
        sql: String,
        /// Simplified call stack at notification time, innermost first,
        /// one `module::path:line` string per frame
        frames: Vec<String>,
    },
    /// One positional parameter was bound to the most recently opened statement.
    Bind {
        /// The bound value
        value: BindValue,
    },
}

impl SqlEvent {
    /// Create a statement event with no captured call stack.
    pub fn statement(sql: impl Into<String>) -> Self {
        Self::Statement {
            sql: sql.into(),
            frames: Vec::new(),
        }
    }

    /// Create a statement event with a captured call stack.
    pub fn statement_with_frames(sql: impl Into<String>, frames: Vec<String>) -> Self {
        Self::Statement {
            sql: sql.into(),
            frames,
        }
    }

    /// Create a bind event.
    pub fn bind(value: BindValue) -> Self {
        Self::Bind { value }
    }
}
