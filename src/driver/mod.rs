//! Applies engine command batches to the live document and routes native events back.

pub mod bridge;
pub mod commands;
pub mod executor;

use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;

use kuchiki::NodeRef;
use tokio::task::JoinHandle;
use tracing::{debug, error};

pub use bridge::{EventBridge, EventKind};
pub use commands::{decode_batch, encode_batch, Command};
pub use executor::BatchReport;

use crate::config::DriverConfig;
use crate::dom::{Document, ElementFactory, NativeEvent, NodeRegistry};
use crate::engine::Engine;
use crate::error::{DriverError, Result};
use crate::history::HistoryLocation;
use crate::ids::{CallbackId, NodeId};
use crate::value::Value;

pub(crate) struct DriverInner {
    pub(crate) document: Rc<Document>,
    pub(crate) registry: NodeRegistry,
    pub(crate) factory: ElementFactory,
    pub(crate) bridge: EventBridge,
    engine: Rc<dyn Engine>,
    tasks: RefCell<Vec<JoinHandle<()>>>,
    fatal: RefCell<Option<DriverError>>,
}

impl DriverInner {
    /// Calls into the engine, then applies whatever batches the callback emitted.
    pub(crate) fn invoke_callback(
        self: &Rc<Self>,
        callback_id: CallbackId,
        payload: Option<Value>,
    ) -> Option<Value> {
        let response = match self.engine.callback(callback_id, payload) {
            Ok(response) => response,
            Err(error) => {
                error!(target: "dom_driver::bridge", %callback_id, %error, "engine callback failed");
                None
            }
        };

        if let Err(error) = self.pump() {
            self.fatal.borrow_mut().get_or_insert(error);
        }
        response
    }

    pub(crate) fn pump(self: &Rc<Self>) -> Result<()> {
        loop {
            let batches = self.engine.take_pending_batches();
            if batches.is_empty() {
                return Ok(());
            }
            for raw in batches {
                self.apply_payload(&raw)?;
            }
        }
    }

    /// Runs `task` on the current `LocalSet` and tracks it for [`DomDriver::settle`].
    pub(crate) fn spawn(&self, task: impl Future<Output = ()> + 'static) {
        let handle = tokio::task::spawn_local(task);
        let mut tasks = self.tasks.borrow_mut();
        tasks.retain(|task| !task.is_finished());
        tasks.push(handle);
    }
}

/// Executor and event bridge bound to one document and one engine.
///
/// Background work (drop file reads, the autofocus pass) is spawned with
/// `tokio::task::spawn_local`, so the driver must be used from inside a
/// `tokio::task::LocalSet`.
pub struct DomDriver {
    inner: Rc<DriverInner>,
}

impl DomDriver {
    pub fn new(engine: Rc<dyn Engine>, history: Rc<dyn HistoryLocation>) -> Result<Self> {
        Self::with_config(DriverConfig::default(), engine, history)
    }

    pub fn with_config(
        config: DriverConfig,
        engine: Rc<dyn Engine>,
        history: Rc<dyn HistoryLocation>,
    ) -> Result<Self> {
        let document = Rc::new(Document::parse(&config.shell_html)?);
        let inner = DriverInner {
            registry: NodeRegistry::new(Rc::clone(&document)),
            factory: ElementFactory::new(&document, history, &config),
            bridge: EventBridge::new(Rc::clone(&document), config.guard_dragover),
            document,
            engine,
            tasks: RefCell::new(Vec::new()),
            fatal: RefCell::new(None),
        };
        debug!(target: "dom_driver", ?config, "driver created");
        Ok(Self {
            inner: Rc::new(inner),
        })
    }

    pub fn document(&self) -> &Rc<Document> {
        &self.inner.document
    }

    pub fn registry(&self) -> &NodeRegistry {
        &self.inner.registry
    }

    pub fn bridge(&self) -> &EventBridge {
        &self.inner.bridge
    }

    /// Node currently registered under `id`.
    pub fn node(&self, id: NodeId) -> Option<NodeRef> {
        self.inner.registry.get("node", id).ok()
    }

    /// Decodes and applies one serialized batch.
    ///
    /// Only an unknown command kind is returned as an error; every other
    /// failure is logged and counted in the report.
    pub fn apply_payload(&self, raw: &str) -> Result<BatchReport> {
        self.inner.apply_payload(raw)
    }

    pub fn apply_commands(&self, commands: &[Command]) -> BatchReport {
        self.inner.apply_commands(commands)
    }

    /// Applies batches the engine emitted outside a callback.
    pub fn pump(&self) -> Result<()> {
        self.inner.pump()
    }

    /// Delivers a native event to `target`.
    ///
    /// Fails only when a batch the engine emitted while handling the event
    /// carried an unknown command kind.
    pub fn dispatch_event(&self, target: &NodeRef, event: &mut NativeEvent) -> Result<()> {
        self.inner.document.dispatch_event(target, event);
        self.take_fatal()
    }

    pub fn dispatch_to(&self, id: NodeId, event: &mut NativeEvent) -> Result<()> {
        let target = self.inner.registry.get("dispatch", id)?;
        self.dispatch_event(&target, event)
    }

    pub fn debug_nodes(&self, ids: &[NodeId]) {
        self.inner.registry.debug_nodes(ids);
    }

    /// Waits for every background task, including ones spawned while waiting.
    pub async fn settle(&self) -> Result<()> {
        loop {
            let pending: Vec<JoinHandle<()>> = self.inner.tasks.borrow_mut().drain(..).collect();
            if pending.is_empty() {
                break;
            }
            for handle in pending {
                if let Err(error) = handle.await {
                    error!(target: "dom_driver", %error, "background task failed");
                }
            }
        }
        self.take_fatal()
    }

    fn take_fatal(&self) -> Result<()> {
        match self.inner.fatal.borrow_mut().take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}
