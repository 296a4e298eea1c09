//! The external engine the driver calls back into.

mod quickjs;

pub use quickjs::QuickJsEngine;

use std::cell::RefCell;
use std::collections::VecDeque;

use crate::driver::commands::{encode_batch, Command};
use crate::error::Result;
use crate::ids::CallbackId;
use crate::value::Value;

pub trait Engine {
    /// Delivers `payload` to the handler registered as `callback_id`.
    fn callback(&self, callback_id: CallbackId, payload: Option<Value>) -> Result<Option<Value>>;

    /// Serialized batches emitted since the last call.
    fn take_pending_batches(&self) -> Vec<String> {
        Vec::new()
    }
}

type Responder = Box<dyn Fn(&RecordingEngine, CallbackId, Option<&Value>) -> Option<Value>>;

/// Engine driven from Rust: records every invocation and answers through a closure.
pub struct RecordingEngine {
    calls: RefCell<Vec<(CallbackId, Option<Value>)>>,
    outbox: RefCell<VecDeque<String>>,
    responder: Responder,
}

impl Default for RecordingEngine {
    fn default() -> Self {
        Self::with_responder(|_, _, _| None)
    }
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_responder(
        responder: impl Fn(&RecordingEngine, CallbackId, Option<&Value>) -> Option<Value> + 'static,
    ) -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
            outbox: RefCell::new(VecDeque::new()),
            responder: Box::new(responder),
        }
    }

    pub fn calls(&self) -> Vec<(CallbackId, Option<Value>)> {
        self.calls.borrow().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }

    /// Queues a serialized batch for the next pump.
    pub fn emit(&self, batch: impl Into<String>) {
        self.outbox.borrow_mut().push_back(batch.into());
    }

    pub fn emit_commands(&self, commands: &[Command]) {
        match encode_batch(commands) {
            Ok(batch) => self.emit(batch),
            Err(error) => tracing::error!(target: "dom_driver::engine", %error, "failed to encode batch"),
        }
    }
}

impl Engine for RecordingEngine {
    fn callback(&self, callback_id: CallbackId, payload: Option<Value>) -> Result<Option<Value>> {
        let response = (self.responder)(self, callback_id, payload.as_ref());
        self.calls.borrow_mut().push((callback_id, payload));
        Ok(response)
    }

    fn take_pending_batches(&self) -> Vec<String> {
        self.outbox.borrow_mut().drain(..).collect()
    }
}
