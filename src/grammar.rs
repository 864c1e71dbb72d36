//! Character-based L-System rewriting.
//!
//! A [`Grammar`] rewrites its axiom through ordered production rules. Constants are
//! copied verbatim; any other symbol is replaced by the output of the first rule
//! that names it, or dropped when no rule does. There is no length cap: output can
//! grow exponentially with the number of passes, so callers bound `passes`.

use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use symbios::{SymbiosState, SymbolTable};

/// A production rule `input -> output`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub input: char,
    pub output: String,
}

/// An L-System definition.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Grammar {
    /// Symbols that are rewritten.
    #[serde(default)]
    pub variables: Vec<char>,
    /// Symbols copied verbatim.
    #[serde(default)]
    pub constants: Vec<char>,
    /// Rules in priority order; the first match wins.
    #[serde(default)]
    pub rules: Vec<Rule>,
    pub axiom: String,
    /// Default turn angle in degrees for interpreters that need one.
    #[serde(default)]
    pub angle: Option<f64>,
}

impl Grammar {
    pub fn new(axiom: impl Into<String>) -> Self {
        Self {
            axiom: axiom.into(),
            ..Default::default()
        }
    }

    pub fn with_variables(mut self, symbols: &str) -> Self {
        self.variables.extend(symbols.chars());
        self
    }

    pub fn with_constants(mut self, symbols: &str) -> Self {
        self.constants.extend(symbols.chars());
        self
    }

    pub fn with_rule(mut self, input: char, output: impl Into<String>) -> Self {
        self.rules.push(Rule {
            input,
            output: output.into(),
        });
        self
    }

    pub fn with_angle(mut self, angle: f64) -> Self {
        self.angle = Some(angle);
        self
    }

    /// Checks that no symbol is both a variable and a constant.
    pub fn validate(&self) -> EngineResult<()> {
        if let Some(c) = self.variables.iter().find(|c| self.constants.contains(c)) {
            return Err(EngineError::Grammar(format!(
                "symbol '{c}' is declared both variable and constant"
            )));
        }
        Ok(())
    }

    pub fn is_constant(&self, symbol: char) -> bool {
        self.constants.contains(&symbol)
    }

    /// Output of the first rule for `symbol`, if any.
    pub fn production(&self, symbol: char) -> Option<&str> {
        self.rules
            .iter()
            .find(|rule| rule.input == symbol)
            .map(|rule| rule.output.as_str())
    }

    /// Applies one rewriting pass to `input`.
    pub fn expand_once(&self, input: &str) -> String {
        let mut output = String::with_capacity(input.len() * 2);
        for c in input.chars() {
            if self.is_constant(c) {
                output.push(c);
            } else if let Some(replacement) = self.production(c) {
                output.push_str(replacement);
            }
        }
        output
    }

    /// Rewrites the axiom `passes` times. Zero passes returns the axiom.
    pub fn expand(&self, passes: usize) -> String {
        (0..passes).fold(self.axiom.clone(), |acc, _| self.expand_once(&acc))
    }

    /// Expands the grammar and interns the result as a `symbios` instruction stream.
    ///
    /// Every character becomes one module with no parameters; symbols are interned
    /// into `table` on first sight.
    pub fn expand_state(&self, passes: usize, table: &mut SymbolTable) -> EngineResult<SymbiosState> {
        let mut state = SymbiosState::new();
        let mut buf = [0u8; 4];
        for c in self.expand(passes).chars() {
            let name: &str = c.encode_utf8(&mut buf);
            if table.resolve_id(name).is_none() {
                table
                    .intern(name)
                    .map_err(|e| EngineError::Symbol(format!("{e:?}")))?;
            }
            let id = table
                .resolve_id(name)
                .ok_or_else(|| EngineError::Symbol(format!("'{name}' was not interned")))?;
            state
                .push(id, 0.0, &[])
                .map_err(|e| EngineError::Symbol(format!("{e:?}")))?;
        }
        Ok(state)
    }
}

/// Zero-argument operations keyed by symbol.
pub type OperationTable<'a> = HashMap<char, Box<dyn FnMut() -> EngineResult<()> + 'a>>;

/// Runs the operation bound to each symbol of `sequence`, in order.
///
/// Symbols with no bound operation are skipped. The first failing operation stops
/// the run and its error is returned.
pub fn execute(sequence: &str, operations: &mut OperationTable<'_>) -> EngineResult<()> {
    for c in sequence.chars() {
        if let Some(op) = operations.get_mut(&c) {
            op()?;
        }
    }
    Ok(())
}
