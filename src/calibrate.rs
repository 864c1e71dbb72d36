//! Discovery of the world coordinate behind the logical origin.
//!
//! The probe runs with command feedback switched on, since that is what makes the
//! world echo the tested position back. Feedback is switched off again when the
//! [`FeedbackScope`] guard drops: after a successful parse, after a parse error, and
//! also when the pending probe is swept or abandoned without ever being answered.

use crate::command;
use crate::dispatcher::CommandDispatcher;
use crate::error::{EngineError, EngineResult};
use crate::protocol::{CommandResult, Transport};
use crate::space::SharedSpace;
use crossbeam_channel::{Receiver, Sender, bounded};
use glam::DVec3;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

/// Extracts the probed position from the first output line of `result`.
///
/// The tokens are the line's parameters, or its whitespace-separated text when it
/// carries none. Exactly three integers are accepted.
pub fn parse_probe(result: &CommandResult) -> EngineResult<DVec3> {
    let line = result
        .output
        .first()
        .ok_or_else(|| EngineError::Parse("probe result has no output".to_string()))?;

    let tokens: Vec<&str> = if line.parameters.is_empty() {
        line.text.split_whitespace().collect()
    } else {
        line.parameters.iter().map(|p| p.trim()).collect()
    };
    if tokens.len() != 3 {
        return Err(EngineError::Parse(format!(
            "probe returned {} coordinates, expected 3",
            tokens.len()
        )));
    }

    let mut xyz = [0i64; 3];
    for (slot, token) in xyz.iter_mut().zip(&tokens) {
        *slot = token
            .parse()
            .map_err(|_| EngineError::Parse(format!("'{token}' is not an integer coordinate")))?;
    }
    Ok(DVec3::new(xyz[0] as f64, xyz[1] as f64, xyz[2] as f64))
}

/// Handle on the outcome of one calibration.
pub struct CalibrationTicket {
    outcome: Receiver<EngineResult<DVec3>>,
}

impl CalibrationTicket {
    /// Blocks up to `timeout` for the outcome.
    ///
    /// `None` means no result yet, or the probe was dropped unanswered.
    pub fn wait(&self, timeout: Duration) -> Option<EngineResult<DVec3>> {
        self.outcome.recv_timeout(timeout).ok()
    }

    pub fn try_outcome(&self) -> Option<EngineResult<DVec3>> {
        self.outcome.try_recv().ok()
    }
}

/// Keeps command feedback on and the calibrator busy for as long as it lives.
struct FeedbackScope<T: Transport> {
    dispatcher: Weak<CommandDispatcher<T>>,
    busy: Arc<AtomicBool>,
}

impl<T: Transport> Drop for FeedbackScope<T> {
    fn drop(&mut self) {
        if let Some(dispatcher) = self.dispatcher.upgrade()
            && let Err(e) = dispatcher.send_no_callback(command::command_feedback(false))
        {
            tracing::warn!("could not switch command feedback off: {}", e);
        }
        self.busy.store(false, Ordering::Release);
    }
}

/// Runs the position probe and moves the space's origin onto the answer.
///
/// One calibration may be in flight at a time; a second request is refused with
/// [`EngineError::CalibrationBusy`].
pub struct WorldCalibrator<T: Transport> {
    dispatcher: Arc<CommandDispatcher<T>>,
    space: SharedSpace,
    target: String,
    busy: Arc<AtomicBool>,
}

impl<T: Transport + 'static> WorldCalibrator<T> {
    /// `target` is the entity whose position is probed.
    pub fn new(
        dispatcher: Arc<CommandDispatcher<T>>,
        space: SharedSpace,
        target: impl Into<String>,
    ) -> Self {
        Self {
            dispatcher,
            space,
            target: target.into(),
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Starts a calibration and returns immediately.
    pub fn calibrate(&self) -> EngineResult<CalibrationTicket> {
        self.calibrate_with(|_| {})
    }

    /// Like [`calibrate`](Self::calibrate), also handing the outcome to `report`
    /// on the receive path once the probe is answered.
    pub fn calibrate_with<R>(&self, report: R) -> EngineResult<CalibrationTicket>
    where
        R: FnOnce(&EngineResult<DVec3>) + Send + 'static,
    {
        if self.busy.swap(true, Ordering::AcqRel) {
            return Err(EngineError::CalibrationBusy);
        }

        if let Err(e) = self
            .dispatcher
            .send_no_callback(command::command_feedback(true))
        {
            self.busy.store(false, Ordering::Release);
            return Err(e);
        }

        let scope = FeedbackScope {
            dispatcher: Arc::downgrade(&self.dispatcher),
            busy: Arc::clone(&self.busy),
        };
        let (tx, rx): (Sender<EngineResult<DVec3>>, _) = bounded(1);
        let space = Arc::clone(&self.space);

        // On a failed send the closure is dropped unrun, which drops the scope too.
        self.dispatcher
            .send(command::probe(&self.target), move |result| {
                let _scope = scope;
                let outcome = parse_probe(result);
                match &outcome {
                    Ok(origin) => {
                        space.lock().set_origin(*origin);
                        tracing::info!("origin calibrated to {}", origin);
                    }
                    Err(e) => tracing::error!("calibration failed: {}", e),
                }
                report(&outcome);
                let _ = tx.send(outcome.clone());
                outcome.map(|_| ())
            })?;

        Ok(CalibrationTicket { outcome: rx })
    }
}
