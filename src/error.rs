//! Error types shared by the construction engine, the dispatcher and the session.

use thiserror::Error;

/// Failures of the underlying duplex message stream.
///
/// Any of these terminates the active session loop.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The stream was closed, either locally or by the peer.
    #[error("transport closed")]
    Closed,

    /// The connection dropped while a message was in flight.
    #[error("transport disconnected: {0}")]
    Disconnected(String),
}

/// Errors raised by the construction engine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// A response payload did not have the expected shape.
    #[error("parse error: {0}")]
    Parse(String),

    /// Send or receive on the transport failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// `pop` was called with no saved turtle state.
    #[error("snapshot stack is empty")]
    EmptyStack,

    /// A calibration was requested while another one is still waiting for its response.
    #[error("a position probe is already in flight")]
    CalibrationBusy,

    /// The grammar definition is inconsistent.
    #[error("invalid grammar: {0}")]
    Grammar(String),

    /// The symbol table or instruction stream rejected a symbol.
    #[error("symbol table: {0}")]
    Symbol(String),

    /// The configuration file could not be read or parsed.
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Errors surfaced to the scripting collaborator by a registered callable.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScriptError {
    /// The callable was invoked with arguments of the wrong shape.
    #[error("{function}: {message}")]
    InvalidArgument {
        /// Name of the callable.
        function: String,
        /// What was expected.
        message: String,
    },

    /// No callable is registered under this name.
    #[error("unknown function: {0}")]
    UnknownFunction(String),

    /// The evaluator rejected the expression.
    #[error("evaluation failed: {0}")]
    Eval(String),

    /// An engine operation failed underneath the callable.
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl ScriptError {
    pub(crate) fn invalid(function: &str, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            function: function.to_string(),
            message: message.into(),
        }
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
