use std::fmt::Debug;

use thiserror::Error;

/// Contract violation raised while composing a scene component.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{component}: {message}")]
pub struct CompositionError {
    component: String,
    message: String,
    context: Option<String>,
}

impl CompositionError {
    pub fn new(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            message: message.into(),
            context: None,
        }
    }

    /// Attaches a debug rendering of the offending value.
    pub fn with_context(mut self, context: &impl Debug) -> Self {
        self.context = Some(format!("{context:?}"));
        self
    }

    /// Name of the component that violated its contract.
    pub fn component(&self) -> &str {
        &self.component
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }
}
