//! The seam to the scripting collaborator.
//!
//! The evaluator itself is external. The engine only needs to register callables,
//! read and write named variables, and evaluate a line of source.

use crate::error::ScriptError;
use glam::DVec3;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// A value crossing the script boundary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ScriptValue {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Vector(DVec3),
    List(Vec<ScriptValue>),
}

impl ScriptValue {
    /// Numeric view of `Int` and `Float`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ScriptValue::Int(i) => Some(*i as f64),
            ScriptValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ScriptValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// A `Vector`, or a list of exactly three numbers.
    pub fn as_vector(&self) -> Option<DVec3> {
        match self {
            ScriptValue::Vector(v) => Some(*v),
            ScriptValue::List(items) if items.len() == 3 => {
                let x = items[0].as_f64()?;
                let y = items[1].as_f64()?;
                let z = items[2].as_f64()?;
                Some(DVec3::new(x, y, z))
            }
            _ => None,
        }
    }
}

impl fmt::Display for ScriptValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptValue::Nil => write!(f, "nil"),
            ScriptValue::Bool(b) => write!(f, "{b}"),
            ScriptValue::Int(i) => write!(f, "{i}"),
            ScriptValue::Float(x) => write!(f, "{x}"),
            ScriptValue::Str(s) => write!(f, "{s}"),
            ScriptValue::Vector(v) => write!(f, "({}, {}, {})", v.x, v.y, v.z),
            ScriptValue::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

/// Read access to the evaluator's named variables.
pub trait Variables {
    fn var(&self, name: &str) -> Option<ScriptValue>;
}

/// A host function exposed to scripts.
pub type Callable =
    Arc<dyn Fn(&dyn Variables, &[ScriptValue]) -> Result<ScriptValue, ScriptError> + Send + Sync>;

/// Wraps a closure as a [`Callable`].
pub fn callable<F>(f: F) -> Callable
where
    F: Fn(&dyn Variables, &[ScriptValue]) -> Result<ScriptValue, ScriptError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// The scripting evaluator, as seen by the engine.
pub trait ScriptHost: Variables + Send {
    /// Makes `callable` available to scripts under `name`, replacing any previous one.
    fn register(&mut self, name: &str, callable: Callable);

    fn set_var(&mut self, name: &str, value: ScriptValue);

    /// Evaluates one top-level expression.
    fn eval(&mut self, source: &str) -> Result<ScriptValue, ScriptError>;
}
