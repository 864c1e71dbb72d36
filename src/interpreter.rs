//! Interpreter that drives a [`Turtle`] from an L-System symbol sequence.
//!
//! The entry point is [`TurtleInterpreter`]. Configure it with a [`TurtleConfig`],
//! register symbol-to-operation mappings via [`TurtleInterpreter::set_op`] or
//! [`TurtleInterpreter::populate_standard_symbols`], then call
//! [`TurtleInterpreter::run`] with a [`symbios::SymbiosState`], typically produced by
//! [`Grammar::expand_state`](crate::Grammar::expand_state).

use crate::error::EngineResult;
use crate::turtle::{Turtle, TurtleOp};
use symbios::{SymbiosState, SymbolTable};

/// Configuration for turtle interpretation.
#[derive(Clone, Debug)]
pub struct TurtleConfig {
    /// Distance moved by `F`/`f` if no parameter is provided.
    pub default_step: f64,
    /// Rotation angle in degrees for yaw/pitch/roll if no parameter is provided.
    pub default_angle: f64,
}

impl Default for TurtleConfig {
    fn default() -> Self {
        Self {
            default_step: 1.0,
            default_angle: 90.0,
        }
    }
}

/// Interprets L-System output as turtle commands.
pub struct TurtleInterpreter {
    op_map: Vec<TurtleOp>,
    config: TurtleConfig,
}

impl TurtleInterpreter {
    /// Creates a new interpreter with the given configuration and an empty symbol map.
    pub fn new(config: TurtleConfig) -> Self {
        Self {
            op_map: Vec::new(),
            config,
        }
    }

    /// Assigns a single [`TurtleOp`] to a symbol ID, growing the map as needed.
    pub fn set_op(&mut self, sym_id: u16, op: TurtleOp) {
        let idx = sym_id as usize;
        if idx >= self.op_map.len() {
            self.op_map.resize(idx + 1, TurtleOp::Ignore);
        }
        self.op_map[idx] = op;
    }

    pub fn config(&self) -> &TurtleConfig {
        &self.config
    }

    /// Registers the conventional turtle symbols found in `interner`.
    ///
    /// Symbols that are not present in the interner are silently skipped.
    pub fn populate_standard_symbols(&mut self, interner: &SymbolTable) {
        let mappings = [
            ("F", TurtleOp::Draw),
            ("f", TurtleOp::Move),
            ("+", TurtleOp::Yaw(1.0)),
            ("-", TurtleOp::Yaw(-1.0)),
            ("&", TurtleOp::Pitch(1.0)),
            ("^", TurtleOp::Pitch(-1.0)),
            ("\\", TurtleOp::Roll(1.0)),
            ("/", TurtleOp::Roll(-1.0)),
            ("|", TurtleOp::TurnAround),
            ("G", TurtleOp::GridAlign),
            ("[", TurtleOp::Push),
            ("]", TurtleOp::Pop),
        ];

        for (sym, op) in mappings {
            if let Some(id) = interner.resolve_id(sym) {
                self.set_op(id, op);
            }
        }
    }

    /// Walks every symbol in `state` in order and applies its operation to `turtle`.
    ///
    /// Parameter 0, when present, overrides the step length or angle. Unmapped
    /// symbols are ignored. A `]` with nothing saved stops the walk with
    /// [`EngineError::EmptyStack`](crate::EngineError::EmptyStack); the moves made
    /// before it stay applied.
    pub fn run(&self, state: &SymbiosState, turtle: &mut Turtle) -> EngineResult<()> {
        for i in 0..state.len() {
            let view = match state.get_view(i) {
                Some(v) => v,
                None => break,
            };

            let op = self
                .op_map
                .get(view.sym as usize)
                .unwrap_or(&TurtleOp::Ignore);

            let p = |idx: usize, def: f64| -> f64 {
                view.params.get(idx).map(|&x| x as f64).unwrap_or(def)
            };
            let angle = p(0, self.config.default_angle);

            match op {
                TurtleOp::Draw => {
                    let pen = turtle.state().pen_down;
                    turtle.pen_down();
                    turtle.forward(p(0, self.config.default_step));
                    if !pen {
                        turtle.pen_up();
                    }
                }
                TurtleOp::Move => {
                    let pen = turtle.state().pen_down;
                    turtle.pen_up();
                    turtle.forward(p(0, self.config.default_step));
                    if pen {
                        turtle.pen_down();
                    }
                }
                TurtleOp::Yaw(s) => turtle.yaw(angle * s),
                TurtleOp::Pitch(s) => turtle.pitch(angle * s),
                TurtleOp::Roll(s) => turtle.roll(angle * s),
                TurtleOp::TurnAround => turtle.yaw(180.0),
                TurtleOp::GridAlign => turtle.grid_align(),
                TurtleOp::PenUp => turtle.pen_up(),
                TurtleOp::PenDown => turtle.pen_down(),
                TurtleOp::Push => turtle.push(),
                TurtleOp::Pop => turtle.pop()?,
                TurtleOp::Ignore => {}
            }
        }

        Ok(())
    }
}
