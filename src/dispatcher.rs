//! Correlation of outgoing commands with their results.
//!
//! Every correlated command carries a fresh v4 UUID. The pending table maps that id
//! to the callback registered by the sender and is shared between the send side
//! (script evaluation, follow-up commands issued by callbacks) and the receive loop,
//! so it sits behind a mutex. The lock is never held while a callback runs:
//! callbacks are free to send more commands.

use crate::error::EngineResult;
use crate::protocol::{CommandRequest, CommandResult, Message, Transport};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Invoked once with the result of the command it was registered for.
pub type Callback = Box<dyn FnOnce(&CommandResult) -> EngineResult<()> + Send>;

struct PendingRequest {
    command: String,
    submitted: Instant,
    callback: Callback,
}

/// A pending request purged by [`CommandDispatcher::sweep_expired`].
#[derive(Clone, Debug, PartialEq)]
pub struct ExpiredRequest {
    pub correlation_id: Uuid,
    pub command: String,
    pub age: Duration,
}

/// Outcome of routing one inbound [`CommandResult`].
#[derive(Debug, PartialEq)]
pub enum Resolution {
    /// The callback ran and succeeded.
    Resolved,
    /// The callback ran and returned an error.
    Failed(crate::EngineError),
    /// No pending request had this id; the result was dropped.
    Unmatched,
}

/// Sends commands and routes results back to their callbacks.
pub struct CommandDispatcher<T: Transport> {
    transport: T,
    origin: String,
    pending: Mutex<HashMap<Uuid, PendingRequest>>,
}

impl<T: Transport> CommandDispatcher<T> {
    /// `origin` is the identity the commands are issued as.
    pub fn new(transport: T, origin: impl Into<String>) -> Self {
        Self {
            transport,
            origin: origin.into(),
            pending: Mutex::new(HashMap::new()),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Number of requests still waiting for a result.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_pending(&self, id: &Uuid) -> bool {
        self.pending.lock().contains_key(id)
    }

    /// Sends `command` and registers `callback` for its result. Does not wait.
    ///
    /// The entry is registered before the request goes out so that a fast reply
    /// cannot miss it; if the send fails the entry is withdrawn again.
    pub fn send<F>(&self, command: impl Into<String>, callback: F) -> EngineResult<Uuid>
    where
        F: FnOnce(&CommandResult) -> EngineResult<()> + Send + 'static,
    {
        let command = command.into();
        let id = Uuid::new_v4();
        self.pending.lock().insert(
            id,
            PendingRequest {
                command: command.clone(),
                submitted: Instant::now(),
                callback: Box::new(callback),
            },
        );

        tracing::debug!("-> [{}] {}", id, command);
        if let Err(e) = self.transmit(id, command) {
            let withdrawn = self.pending.lock().remove(&id);
            drop(withdrawn);
            return Err(e);
        }
        Ok(id)
    }

    /// Sends `command` without registering a callback; any result is ignored.
    pub fn send_no_callback(&self, command: impl Into<String>) -> EngineResult<Uuid> {
        let command = command.into();
        let id = Uuid::new_v4();
        tracing::debug!("-> [{}] {} (no callback)", id, command);
        self.transmit(id, command)?;
        Ok(id)
    }

    fn transmit(&self, id: Uuid, text: String) -> EngineResult<()> {
        self.transport
            .send(Message::CommandRequest(CommandRequest {
                correlation_id: id,
                origin: self.origin.clone(),
                text,
            }))
            .map_err(Into::into)
    }

    /// Routes `result` to the callback registered under its id.
    ///
    /// The entry is removed before the callback runs, so a duplicate result finds
    /// nothing and is dropped like any unknown id.
    pub fn resolve(&self, result: &CommandResult) -> Resolution {
        let entry = self.pending.lock().remove(&result.correlation_id);
        let Some(entry) = entry else {
            tracing::trace!("dropping result for unknown id {}", result.correlation_id);
            return Resolution::Unmatched;
        };

        if !result.success {
            tracing::debug!("command '{}' reported failure", entry.command);
        }
        match (entry.callback)(result) {
            Ok(()) => Resolution::Resolved,
            Err(e) => {
                tracing::warn!("callback for '{}' failed: {}", entry.command, e);
                Resolution::Failed(e)
            }
        }
    }

    /// Purges pending requests older than `max_age` and returns them, oldest first.
    ///
    /// Their callbacks are dropped without being called, after the table lock is
    /// released.
    pub fn sweep_expired(&self, max_age: Duration) -> Vec<ExpiredRequest> {
        let now = Instant::now();
        let purged: Vec<(Uuid, PendingRequest)> = {
            let mut pending = self.pending.lock();
            let stale: Vec<Uuid> = pending
                .iter()
                .filter(|(_, entry)| now.duration_since(entry.submitted) > max_age)
                .map(|(id, _)| *id)
                .collect();
            stale
                .into_iter()
                .filter_map(|id| pending.remove(&id).map(|entry| (id, entry)))
                .collect()
        };

        let mut expired: Vec<ExpiredRequest> = purged
            .into_iter()
            .map(|(correlation_id, entry)| ExpiredRequest {
                correlation_id,
                command: entry.command,
                age: now.duration_since(entry.submitted),
            })
            .collect();
        expired.sort_by(|a, b| b.age.cmp(&a.age));
        for request in &expired {
            tracing::warn!(
                "command '{}' expired after {:?} without a result",
                request.command,
                request.age
            );
        }
        expired
    }

    /// Drops every pending request, e.g. when the connection ends.
    pub fn abandon_all(&self) -> usize {
        let abandoned = std::mem::take(&mut *self.pending.lock());
        if !abandoned.is_empty() {
            tracing::warn!("abandoning {} unanswered commands", abandoned.len());
        }
        abandoned.len()
    }
}
