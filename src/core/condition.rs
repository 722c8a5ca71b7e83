//! Branch condition model

use crate::core::context::ProcessingContext;
use serde_json::Value;
use std::fmt;

type Predicate = Box<dyn Fn(&ProcessingContext) -> anyhow::Result<bool>>;

/// Predicate over the processing context used by conditional steps
pub struct Condition {
    /// Human-readable form, for logs
    pub description: String,
    predicate: Predicate,
}

impl Condition {
    pub fn new<F>(description: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&ProcessingContext) -> anyhow::Result<bool> + 'static,
    {
        Self {
            description: description.into(),
            predicate: Box::new(predicate),
        }
    }

    /// True when the primary table has at least one row
    pub fn has_rows() -> Self {
        Self::new("has rows", |ctx| Ok(ctx.data().height() > 0))
    }

    /// True when the primary table contains the column
    pub fn has_column(column: impl Into<String>) -> Self {
        let column = column.into();
        Self::new(format!("has column {}", column), move |ctx| {
            Ok(ctx
                .data()
                .get_column_names()
                .iter()
                .any(|name| name.as_str() == column))
        })
    }

    /// True when the variable is set to exactly `value`
    pub fn variable_equals(key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        let value = value.into();
        Self::new(format!("{} == {}", key, value), move |ctx| {
            Ok(ctx.variable(&key) == Some(&value))
        })
    }

    pub fn has_auxiliary(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(format!("has auxiliary {}", name), move |ctx| {
            Ok(ctx.has_auxiliary_data(&name))
        })
    }

    /// Evaluate against a context
    pub fn evaluate(&self, context: &ProcessingContext) -> anyhow::Result<bool> {
        (self.predicate)(context)
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Condition")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}
