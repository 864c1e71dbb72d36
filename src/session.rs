//! One connection's worth of engine state and its receive loop.
//!
//! A [`Session`] owns the dispatcher, the space, the turtle and the script host for
//! the lifetime of a single connection. Inbound messages are handled one at a time
//! by [`Session::run`]; [`Session::evaluate`] may be called concurrently from a
//! console thread. Shared state is behind `parking_lot` mutexes and the script host
//! is never locked from a dispatcher callback.

use crate::calibrate::{CalibrationTicket, WorldCalibrator};
use crate::command::{self, Level};
use crate::config::SessionConfig;
use crate::dispatcher::{CommandDispatcher, ExpiredRequest, Resolution};
use crate::error::{EngineError, EngineResult, ScriptError, TransportError};
use crate::grammar::Grammar;
use crate::interpreter::{TurtleConfig, TurtleInterpreter};
use crate::protocol::{ChatKind, ChatMessage, Message, Transport};
use crate::script::{Callable, ScriptHost, ScriptValue, Variables, callable};
use crate::space::{MaterialSpec, SharedSpace, Space};
use crate::turtle::Turtle;
use glam::DVec3;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::Duration;
use symbios::SymbolTable;

/// Target selector for broadcasts.
const EVERYONE: &str = "@a";

/// Bounds on how long the receive loop waits before sweeping a quiet connection.
const MIN_SWEEP_POLL: Duration = Duration::from_millis(10);
const MAX_SWEEP_POLL: Duration = Duration::from_secs(1);

/// Turns the space's placement log into `setblock` commands.
struct Placer<T: Transport> {
    dispatcher: Arc<CommandDispatcher<T>>,
    space: SharedSpace,
    delay: Duration,
}

impl<T: Transport> Placer<T> {
    /// Sends every pending placement, skipping exact repeats of the previous voxel.
    fn flush(&self) -> EngineResult<usize> {
        let placements = self.space.lock().drain();
        let mut last: Option<([i64; 3], &MaterialSpec)> = None;
        let mut sent = 0;
        for placement in &placements {
            let key = (command::voxel(placement.position), &placement.material);
            if last == Some(key) {
                continue;
            }
            self.dispatcher
                .send_no_callback(command::setblock(placement))?;
            last = Some(key);
            sent += 1;
            if !self.delay.is_zero() {
                std::thread::sleep(self.delay);
            }
        }
        if sent > 0 {
            tracing::debug!("realized {} of {} placements", sent, placements.len());
        }
        Ok(sent)
    }
}

fn broadcast<T: Transport>(
    dispatcher: &CommandDispatcher<T>,
    level: Level,
    text: &str,
) -> EngineResult<()> {
    dispatcher
        .send_no_callback(command::tellraw(EVERYONE, level, &[text]))
        .map(|_| ())
}

fn number(function: &str, args: &[ScriptValue], idx: usize) -> Result<f64, ScriptError> {
    args.get(idx)
        .and_then(ScriptValue::as_f64)
        .ok_or_else(|| ScriptError::invalid(function, format!("argument {} should be a number", idx + 1)))
}

/// Reads the `block`/`data` script variables, falling back to `default`.
fn current_material(
    function: &str,
    vars: &dyn Variables,
    default: &MaterialSpec,
) -> Result<MaterialSpec, ScriptError> {
    let name = match vars.var("block") {
        Some(ScriptValue::Str(name)) => name,
        Some(_) => return Err(ScriptError::invalid(function, "variable 'block' should be a string")),
        None => default.name.clone(),
    };
    let data = match vars.var("data") {
        Some(ScriptValue::Int(d)) => u8::try_from(d)
            .map_err(|_| ScriptError::invalid(function, "variable 'data' should fit in a byte"))?,
        Some(_) => return Err(ScriptError::invalid(function, "variable 'data' should be an integer")),
        None => default.data,
    };
    Ok(MaterialSpec { name, data })
}

/// Engine state scoped to one connection.
pub struct Session<T: Transport + 'static, H: ScriptHost> {
    config: SessionConfig,
    dispatcher: Arc<CommandDispatcher<T>>,
    space: SharedSpace,
    turtle: Arc<Mutex<Turtle>>,
    calibrator: Arc<WorldCalibrator<T>>,
    placer: Arc<Placer<T>>,
    host: Mutex<H>,
}

impl<T: Transport + 'static, H: ScriptHost> Session<T, H> {
    /// Builds the session and registers the engine's callables with `host`.
    pub fn new(transport: T, host: H, config: SessionConfig) -> Self {
        let dispatcher = Arc::new(CommandDispatcher::new(transport, config.user.bot.clone()));
        let space = Space::shared();
        let turtle = Arc::new(Mutex::new(Turtle::new(
            Arc::clone(&space),
            config.plot.material(),
        )));
        let calibrator = Arc::new(WorldCalibrator::new(
            Arc::clone(&dispatcher),
            Arc::clone(&space),
            config.user.operator.clone(),
        ));
        let placer = Arc::new(Placer {
            dispatcher: Arc::clone(&dispatcher),
            space: Arc::clone(&space),
            delay: config.plot.placement_delay(),
        });

        let session = Self {
            config,
            dispatcher,
            space,
            turtle,
            calibrator,
            placer,
            host: Mutex::new(host),
        };
        session.install();
        session
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &Arc<CommandDispatcher<T>> {
        &self.dispatcher
    }

    pub fn space(&self) -> &SharedSpace {
        &self.space
    }

    pub fn turtle(&self) -> &Arc<Mutex<Turtle>> {
        &self.turtle
    }

    /// Locks the script host, e.g. to load scripts before [`run`](Self::run).
    pub fn host(&self) -> parking_lot::MutexGuard<'_, H> {
        self.host.lock()
    }

    fn install(&self) {
        let mut host = self.host.lock();
        host.set_var("block", ScriptValue::Str(self.config.plot.block.clone()));
        host.set_var("data", ScriptValue::Int(i64::from(self.config.plot.data)));

        host.register("probe-position", self.probe_position_callable());
        host.register("plot", self.plot_callable());

        let placer = Arc::clone(&self.placer);
        host.register(
            "flush",
            callable(move |_, _| {
                let sent = placer.flush()?;
                Ok(ScriptValue::Int(sent as i64))
            }),
        );

        self.install_turtle(&mut *host);
    }

    fn probe_position_callable(&self) -> Callable {
        let calibrator = Arc::clone(&self.calibrator);
        let dispatcher = Arc::downgrade(&self.dispatcher);
        let turtle = Arc::downgrade(&self.turtle);
        callable(move |_, _| {
            let (reporter, turtle) = (dispatcher.clone(), turtle.clone());
            calibrator.calibrate_with(move |outcome| on_calibrated(&reporter, &turtle, outcome))?;
            Ok(ScriptValue::Nil)
        })
    }

    fn plot_callable(&self) -> Callable {
        let space = Arc::clone(&self.space);
        let default = self.config.plot.material();
        callable(move |vars, args| {
            let arg = args
                .first()
                .ok_or_else(|| ScriptError::invalid("plot", "expected a vector or a vector sequence"))?;
            let material = current_material("plot", vars, &default)?;

            if let Some(offset) = arg.as_vector() {
                space.lock().plot_relative(offset, material);
                return Ok(ScriptValue::Nil);
            }
            let ScriptValue::List(items) = arg else {
                return Err(ScriptError::invalid(
                    "plot",
                    "first argument should be a vector or a vector sequence",
                ));
            };
            let offsets = items
                .iter()
                .map(|item| {
                    item.as_vector().ok_or_else(|| {
                        ScriptError::invalid("plot", format!("'{item}' is not a vector"))
                    })
                })
                .collect::<Result<Vec<DVec3>, _>>()?;
            let mut space = space.lock();
            for offset in offsets {
                space.plot_relative(offset, material.clone());
            }
            Ok(ScriptValue::Nil)
        })
    }

    fn install_turtle(&self, host: &mut H) {
        type Step = fn(&mut Turtle, &[f64]) -> EngineResult<()>;
        let ops: [(&str, usize, Step); 19] = [
            ("forward", 1, |t, a| {
                t.forward(a[0]);
                Ok(())
            }),
            ("back", 1, |t, a| {
                t.backward(a[0]);
                Ok(())
            }),
            ("yaw", 1, |t, a| {
                t.yaw(a[0]);
                Ok(())
            }),
            ("pitch", 1, |t, a| {
                t.pitch(a[0]);
                Ok(())
            }),
            ("roll", 1, |t, a| {
                t.roll(a[0]);
                Ok(())
            }),
            ("right", 1, |t, a| {
                t.turn_right(a[0]);
                Ok(())
            }),
            ("left", 1, |t, a| {
                t.turn_left(a[0]);
                Ok(())
            }),
            ("up", 1, |t, a| {
                t.up(a[0]);
                Ok(())
            }),
            ("down", 1, |t, a| {
                t.down(a[0]);
                Ok(())
            }),
            ("set-angle", 3, |t, a| {
                t.set_angle(a[0], a[1], a[2]);
                Ok(())
            }),
            ("set-vertical", 1, |t, a| {
                t.set_vertical(a[0]);
                Ok(())
            }),
            ("set-roll", 1, |t, a| {
                t.set_roll(a[0]);
                Ok(())
            }),
            ("goto", 3, |t, a| {
                t.goto(DVec3::new(a[0], a[1], a[2]));
                Ok(())
            }),
            ("pen-up", 0, |t, _| {
                t.pen_up();
                Ok(())
            }),
            ("pen-down", 0, |t, _| {
                t.pen_down();
                Ok(())
            }),
            ("grid-align", 0, |t, _| {
                t.grid_align();
                Ok(())
            }),
            ("push", 0, |t, _| {
                t.push();
                Ok(())
            }),
            ("pop", 0, |t, _| t.pop()),
            ("home", 0, |t, _| {
                t.home();
                Ok(())
            }),
        ];

        for (name, arity, step) in ops {
            let turtle = Arc::clone(&self.turtle);
            let default = self.config.plot.material();
            host.register(
                name,
                callable(move |vars, args| {
                    let values = (0..arity)
                        .map(|i| number(name, args, i))
                        .collect::<Result<Vec<f64>, _>>()?;
                    let material = current_material(name, vars, &default)?;
                    let mut turtle = turtle.lock();
                    turtle.set_material(material);
                    step(&mut turtle, &values)?;
                    Ok(ScriptValue::Vector(turtle.position()))
                }),
            );
        }
    }

    /// Exposes `grammar` to scripts as `name(passes)`, drawn with the session turtle.
    pub fn register_grammar(&self, name: &str, grammar: Grammar, config: TurtleConfig) -> EngineResult<()> {
        grammar.validate()?;
        let config = TurtleConfig {
            default_angle: grammar.angle.unwrap_or(config.default_angle),
            ..config
        };
        let turtle = Arc::clone(&self.turtle);
        let function = name.to_string();
        let default = self.config.plot.material();
        let grammar_callable = callable(move |vars, args| {
            let passes = number(&function, args, 0)?;
            let material = current_material(&function, vars, &default)?;
            if passes < 0.0 || passes.fract() != 0.0 {
                return Err(ScriptError::invalid(&function, "passes should be a non-negative integer"));
            }
            let mut table = SymbolTable::new();
            let state = grammar.expand_state(passes as usize, &mut table)?;
            let mut interpreter = TurtleInterpreter::new(config.clone());
            interpreter.populate_standard_symbols(&table);
            let mut turtle = turtle.lock();
            turtle.set_material(material);
            interpreter.run(&state, &mut turtle)?;
            Ok(ScriptValue::Int(state.len() as i64))
        });
        self.host.lock().register(name, grammar_callable);
        Ok(())
    }

    /// Starts a calibration outside of any script.
    ///
    /// On success the session turtle is moved to the new origin.
    pub fn calibrate(&self) -> EngineResult<CalibrationTicket> {
        let reporter = Arc::downgrade(&self.dispatcher);
        let turtle = Arc::downgrade(&self.turtle);
        self.calibrator
            .calibrate_with(move |outcome| on_calibrated(&reporter, &turtle, outcome))
    }

    /// Sends every pending placement to the world.
    pub fn flush_placements(&self) -> EngineResult<usize> {
        self.placer.flush()
    }

    /// Evaluates one top-level expression and realizes whatever it plotted.
    ///
    /// Script errors are returned to the caller; they never end the session.
    pub fn evaluate(&self, source: &str) -> Result<ScriptValue, ScriptError> {
        let result = self.host.lock().eval(source);
        match &result {
            Ok(value) => tracing::info!("==> {}", value),
            Err(e) => tracing::error!("{}", e),
        }
        self.flush_placements()?;
        result
    }

    /// Evaluates an operator chat line and broadcasts the result to everyone.
    pub fn evaluate_chat(&self, source: &str) -> EngineResult<()> {
        match self.evaluate(source) {
            Ok(value) => broadcast(&self.dispatcher, Level::Info, &value.to_string()),
            Err(ScriptError::Engine(EngineError::Transport(e))) => Err(e.into()),
            Err(e) => broadcast(&self.dispatcher, Level::Error, &e.to_string()),
        }
    }

    /// Handles one inbound message.
    pub fn handle(&self, message: Message) -> EngineResult<()> {
        match message {
            Message::CommandResult(result) => {
                if let Resolution::Failed(EngineError::Transport(e)) = self.dispatcher.resolve(&result) {
                    return Err(e.into());
                }
            }
            Message::Chat(ChatMessage { sender, body, kind }) => {
                if kind == ChatKind::Chat
                    && !self.config.user.operator.is_empty()
                    && sender == self.config.user.operator
                {
                    tracing::info!("[{}] {}", sender, body);
                    self.evaluate_chat(&body)?;
                }
            }
            Message::CommandRequest(request) => {
                tracing::debug!("ignoring inbound command request '{}'", request.text);
            }
        }
        Ok(())
    }

    /// Purges pending requests older than the configured request timeout.
    ///
    /// Without a timeout nothing expires. Dropping an unanswered probe also ends its
    /// calibration.
    pub fn sweep_expired(&self) -> Vec<ExpiredRequest> {
        match self.config.dispatch.request_timeout() {
            Some(timeout) => self.dispatcher.sweep_expired(timeout),
            None => Vec::new(),
        }
    }

    /// Processes inbound messages in arrival order until the transport closes.
    ///
    /// With a request timeout configured, expired requests are swept after every
    /// message and also whenever the connection stays quiet for a poll interval.
    /// A closed stream ends the loop normally; any other transport failure ends it
    /// with an error. Requests still pending at that point are abandoned.
    pub fn run(&self) -> EngineResult<()> {
        tracing::info!("session for <{}> started", self.config.user.bot);
        let poll = self
            .config
            .dispatch
            .request_timeout()
            .map(|timeout| timeout.clamp(MIN_SWEEP_POLL, MAX_SWEEP_POLL));
        let transport = self.dispatcher.transport();
        let outcome = loop {
            let received = match poll {
                Some(poll) => transport.receive_timeout(poll),
                None => transport.receive().map(Some),
            };
            let message = match received {
                Ok(Some(message)) => message,
                Ok(None) => {
                    self.sweep_expired();
                    continue;
                }
                Err(TransportError::Closed) => break Ok(()),
                Err(e) => break Err(EngineError::from(e)),
            };
            if let Err(e) = self.handle(message) {
                break Err(e);
            }
            self.sweep_expired();
        };

        let abandoned = self.dispatcher.abandon_all();
        match &outcome {
            Ok(()) => tracing::info!("session closed ({} requests abandoned)", abandoned),
            Err(e) => tracing::error!("session terminated: {} ({} requests abandoned)", e, abandoned),
        }
        outcome
    }

    /// Closes the transport; the peer's loop sees the end of the stream.
    pub fn close(&self) {
        self.dispatcher.transport().close();
    }
}

fn on_calibrated<T: Transport>(
    dispatcher: &Weak<CommandDispatcher<T>>,
    turtle: &Weak<Mutex<Turtle>>,
    outcome: &EngineResult<DVec3>,
) {
    if outcome.is_ok()
        && let Some(turtle) = turtle.upgrade()
    {
        turtle.lock().home();
    }
    report_calibration(dispatcher, outcome);
}

fn report_calibration<T: Transport>(dispatcher: &Weak<CommandDispatcher<T>>, outcome: &EngineResult<DVec3>) {
    let Some(dispatcher) = dispatcher.upgrade() else {
        return;
    };
    let sent = match outcome {
        Ok(origin) => broadcast(
            &dispatcher,
            Level::Info,
            &format!("Position got: {} {} {}", origin.x, origin.y, origin.z),
        ),
        Err(e) => broadcast(&dispatcher, Level::Error, &e.to_string()),
    };
    if let Err(e) = sent {
        tracing::warn!("could not report calibration: {}", e);
    }
}
