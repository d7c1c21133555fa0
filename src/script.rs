//! Scripting and query collaborators used by computed keys.
//!
//! Both services are opaque to the property layer: it hands over source
//! text plus bindings and receives a value back.

use std::collections::BTreeMap;

use crate::context::SecurityContext;
use crate::model::Value;
use crate::object::GraphObject;
use crate::Result;

/// Extra input for one evaluation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvaluationConfig {
    /// Named variables visible to the expression, e.g. `value` on writes.
    pub bindings: BTreeMap<String, Value>,
}

impl EvaluationConfig {
    pub fn bind(mut self, name: impl Into<String>, value: Value) -> Self {
        self.bindings.insert(name.into(), value);
        self
    }
}

/// Errors accumulated while evaluating an expression.
#[derive(Debug, Clone, Default, PartialEq, Eq, thiserror::Error)]
#[error("{}", errors.join("; "))]
pub struct ScriptError {
    pub errors: Vec<String>,
}

impl ScriptError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { errors: vec![message.into()] }
    }
}

/// Evaluates scripted expressions against an entity.
pub trait ScriptEvaluator: Send + Sync {
    fn evaluate(
        &self,
        ctx: &SecurityContext,
        entity: &GraphObject,
        source: &str,
        debug_label: &str,
        source_id: Option<&str>,
        config: &EvaluationConfig,
    ) -> std::result::Result<Value, ScriptError>;
}

/// Adapter turning a closure into a `ScriptEvaluator`.
pub struct FnEvaluator<F>(pub F);

impl<F> ScriptEvaluator for FnEvaluator<F>
where
    F: Fn(&SecurityContext, &GraphObject, &str, &EvaluationConfig) -> std::result::Result<Value, ScriptError>
        + Send
        + Sync,
{
    fn evaluate(
        &self,
        ctx: &SecurityContext,
        entity: &GraphObject,
        source: &str,
        _debug_label: &str,
        _source_id: Option<&str>,
        config: &EvaluationConfig,
    ) -> std::result::Result<Value, ScriptError> {
        (self.0)(ctx, entity, source, config)
    }
}

/// Runs graph queries for query-backed keys.
pub trait QueryService: Send + Sync {
    fn query(
        &self,
        ctx: &SecurityContext,
        query: &str,
        params: &BTreeMap<String, Value>,
    ) -> Result<Vec<Value>>;
}
