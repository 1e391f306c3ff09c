//! Launch correlation
//!
//! A launch owns one root `TraceContext`. Each pipeline step logs under a
//! child of it, so events from concurrent snipe builds carry both the launch
//! id and the span of the step that emitted them.

use std::fmt;

use uuid::Uuid;

/// Launch id shared by every span of one launch
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationId(String);

impl CorrelationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn span_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(16);
    id
}

/// Position of one step in the launch's span tree
#[derive(Debug, Clone)]
pub struct TraceContext {
    correlation_id: CorrelationId,
    span_id: String,
    parent_span_id: Option<String>,
    operation: String,
}

impl TraceContext {
    /// Root span of a fresh launch
    pub fn new_launch() -> Self {
        Self::with_correlation(CorrelationId::new(), "launch")
    }

    /// Root span under an id chosen by the caller (e.g. a bundle id)
    pub fn with_correlation(correlation_id: CorrelationId, operation: &str) -> Self {
        Self {
            correlation_id,
            span_id: span_id(),
            parent_span_id: None,
            operation: operation.to_string(),
        }
    }

    pub fn child(&self, operation: &str) -> Self {
        Self {
            correlation_id: self.correlation_id.clone(),
            span_id: span_id(),
            parent_span_id: Some(self.span_id.clone()),
            operation: operation.to_string(),
        }
    }

    pub fn correlation_id(&self) -> &CorrelationId {
        &self.correlation_id
    }

    pub fn span_id(&self) -> &str {
        &self.span_id
    }

    pub fn parent_span_id(&self) -> Option<&str> {
        self.parent_span_id.as_deref()
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }
}

impl From<&str> for CorrelationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}
