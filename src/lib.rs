//! # voxel-turtle
//!
//! A construction engine for remote voxel worlds. Scripts steer a 3D turtle, directly or
//! through [Symbios](https://crates.io/crates/symbios)-backed L-System grammars; the
//! voxels it traces are logged in a [`Space`] and realized as world commands.
//!
//! Commands travel over an abstract [`Transport`]. The [`CommandDispatcher`] tags each
//! one with a correlation id and routes the world's answer back to the callback that
//! asked, and the [`WorldCalibrator`] uses that round trip to find the real coordinate
//! behind the engine's logical origin.

pub mod calibrate;
pub mod command;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod grammar;
pub mod interpreter;
pub mod orientation;
pub mod protocol;
pub mod raster;
pub mod script;
pub mod session;
pub mod space;
pub mod turtle;

pub use calibrate::*;
pub use config::*;
pub use dispatcher::*;
pub use error::*;
pub use grammar::*;
pub use interpreter::*;
pub use protocol::*;
pub use raster::*;
pub use script::*;
pub use session::*;
pub use space::*;
pub use turtle::*;
