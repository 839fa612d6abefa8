//! Caller-context resolution.
//!
//! A SQL execution usually sits under a deep framework call chain; the frame
//! worth reporting is the first one inside the application's own code. The
//! resolver walks a simplified call-stack representation (one
//! `module::path:line` string per frame, innermost first) and picks the
//! first frame under the configured base path.

/// Sentinel returned when no frame matches the base path.
pub const UNKNOWN_METHOD: &str = "Unknown method";

/// Resolves the user-code entry point of a SQL execution.
#[derive(Debug, Clone)]
pub struct CallerResolver {
    base_path: String,
}

impl CallerResolver {
    /// Create a resolver for the given base path (e.g. the application's
    /// root module path), supplied once at startup.
    pub fn new(base_path: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// The configured base path.
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// First frame containing the base path, or [`UNKNOWN_METHOD`].
    pub fn resolve<S: AsRef<str>>(&self, frames: &[S]) -> String {
        frames
            .iter()
            .map(AsRef::as_ref)
            .find(|frame| frame.contains(&self.base_path))
            .map(str::to_string)
            .unwrap_or_else(|| UNKNOWN_METHOD.to_string())
    }
}
