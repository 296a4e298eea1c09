use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use futures_util::future::try_join_all;
use kuchiki::NodeRef;
use tracing::{debug, error, warn};

use super::DriverInner;
use crate::dom::document::{html_local_name, Document, FormControl, Listener, ListenerId};
use crate::dom::event::{DroppedFile, EventData, NativeEvent, TransferItem};
use crate::dom::registry::NodeRegistry;
use crate::error::{DriverError, Result};
use crate::ids::{CallbackId, NodeId};
use crate::value::{ListBuilder, Value};

/// Event names a callback can be registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Click,
    Submit,
    Input,
    Change,
    Blur,
    MouseDown,
    MouseUp,
    MouseEnter,
    MouseLeave,
    KeyDown,
    HookKeyDown,
    Drop,
    Load,
}

impl EventKind {
    pub const ALL: [EventKind; 13] = [
        EventKind::Click,
        EventKind::Submit,
        EventKind::Input,
        EventKind::Change,
        EventKind::Blur,
        EventKind::MouseDown,
        EventKind::MouseUp,
        EventKind::MouseEnter,
        EventKind::MouseLeave,
        EventKind::KeyDown,
        EventKind::HookKeyDown,
        EventKind::Drop,
        EventKind::Load,
    ];

    pub fn parse(name: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == name)
            .ok_or_else(|| DriverError::UnsupportedEvent(name.to_string()))
    }

    pub fn name(self) -> &'static str {
        match self {
            EventKind::Click => "click",
            EventKind::Submit => "submit",
            EventKind::Input => "input",
            EventKind::Change => "change",
            EventKind::Blur => "blur",
            EventKind::MouseDown => "mousedown",
            EventKind::MouseUp => "mouseup",
            EventKind::MouseEnter => "mouseenter",
            EventKind::MouseLeave => "mouseleave",
            EventKind::KeyDown => "keydown",
            EventKind::HookKeyDown => "hook_keydown",
            EventKind::Drop => "drop",
            EventKind::Load => "load",
        }
    }

    /// The native event the listener is attached for.
    pub fn dom_event(self) -> &'static str {
        match self {
            EventKind::HookKeyDown => "keydown",
            other => other.name(),
        }
    }

    pub fn is_document_scoped(self) -> bool {
        matches!(self, EventKind::HookKeyDown)
    }
}

#[derive(Debug, Clone, Copy)]
struct RegisteredCallback {
    kind: EventKind,
    listener: ListenerId,
}

/// Owns every listener the driver installs: engine callbacks keyed by
/// [`CallbackId`] and the document-level listeners. All of them are removed
/// from the document when the bridge is dropped.
pub struct EventBridge {
    document: Rc<Document>,
    callbacks: RefCell<HashMap<CallbackId, RegisteredCallback>>,
    document_listeners: RefCell<Vec<ListenerId>>,
}

impl EventBridge {
    pub(crate) fn new(document: Rc<Document>, guard_dragover: bool) -> Self {
        let bridge = Self {
            document,
            callbacks: RefCell::new(HashMap::new()),
            document_listeners: RefCell::new(Vec::new()),
        };
        if guard_dragover {
            let listener = bridge.document.add_event_listener(
                bridge.document.root(),
                "dragover",
                Rc::new(|event: &mut NativeEvent, _: &NodeRef| event.prevent_default()),
            );
            bridge.document_listeners.borrow_mut().push(listener);
        }
        bridge
    }

    pub fn is_registered(&self, callback_id: CallbackId) -> bool {
        self.callbacks.borrow().contains_key(&callback_id)
    }

    pub fn callback_count(&self) -> usize {
        self.callbacks.borrow().len()
    }

    pub fn document_listener_count(&self) -> usize {
        self.document_listeners.borrow().len()
    }

    pub(crate) fn add(
        &self,
        inner: &Rc<DriverInner>,
        node_id: NodeId,
        event_name: &str,
        callback_id: CallbackId,
    ) -> Result<()> {
        let kind = EventKind::parse(event_name)?;
        if self.is_registered(callback_id) {
            return Err(DriverError::DuplicateRegistration(callback_id));
        }

        let target = if kind.is_document_scoped() {
            self.document.root().clone()
        } else {
            inner.registry.get("callback_add", node_id)?
        };

        let weak = Rc::downgrade(inner);
        let handler: Listener = Rc::new(move |event: &mut NativeEvent, _: &NodeRef| {
            if let Some(inner) = weak.upgrade() {
                handle_event(&inner, kind, callback_id, event);
            }
        });
        let listener = self
            .document
            .add_event_listener(&target, kind.dom_event(), handler);

        if kind.is_document_scoped() {
            self.document_listeners.borrow_mut().push(listener);
        }
        self.callbacks
            .borrow_mut()
            .insert(callback_id, RegisteredCallback { kind, listener });

        debug!(target: "dom_driver::bridge", %callback_id, %node_id, event = kind.name(), "callback added");
        Ok(())
    }

    pub(crate) fn remove(
        &self,
        registry: &NodeRegistry,
        node_id: NodeId,
        event_name: &str,
        callback_id: CallbackId,
    ) -> Result<()> {
        let registered = self.callbacks.borrow_mut().remove(&callback_id).ok_or_else(|| {
            DriverError::CallbackNotFound {
                label: "callback_remove".to_string(),
                id: callback_id,
            }
        })?;

        self.document.remove_event_listener(registered.listener);
        if registered.kind.name() != event_name {
            warn!(
                target: "dom_driver::bridge",
                %callback_id,
                registered = registered.kind.name(),
                requested = event_name,
                "callback removed under a different event name"
            );
        }

        if registered.kind.is_document_scoped() {
            self.document_listeners
                .borrow_mut()
                .retain(|listener| *listener != registered.listener);
        } else {
            registry.get("callback_remove", node_id)?;
        }

        debug!(target: "dom_driver::bridge", %callback_id, "callback removed");
        Ok(())
    }
}

impl Drop for EventBridge {
    fn drop(&mut self) {
        for (_, registered) in self.callbacks.get_mut().drain() {
            self.document.remove_event_listener(registered.listener);
        }
        for listener in self.document_listeners.get_mut().drain(..) {
            self.document.remove_event_listener(listener);
        }
    }
}

fn handle_event(
    inner: &Rc<DriverInner>,
    kind: EventKind,
    callback_id: CallbackId,
    event: &mut NativeEvent,
) {
    match kind {
        EventKind::Click => {
            event.prevent_default();
            if let Some(response) = inner.invoke_callback(callback_id, None) {
                if response.get_bool("stop_propagation") {
                    event.stop_propagation();
                }
                if response.get_bool("prevent_default") {
                    event.prevent_default();
                }
            }
        }
        EventKind::Submit | EventKind::Load => {
            event.prevent_default();
            inner.invoke_callback(callback_id, None);
        }
        EventKind::Blur | EventKind::MouseEnter | EventKind::MouseLeave => {
            inner.invoke_callback(callback_id, None);
        }
        EventKind::MouseDown | EventKind::MouseUp => {
            let consumed = inner
                .invoke_callback(callback_id, None)
                .map(|response| response.is_truthy())
                .unwrap_or(false);
            if consumed {
                event.prevent_default();
            }
        }
        EventKind::Input | EventKind::Change => handle_control_event(inner, kind, callback_id, event),
        EventKind::KeyDown | EventKind::HookKeyDown => {
            let Some(keyboard) = event.keyboard() else {
                warn!(target: "dom_driver::bridge", event = kind.name(), "not a keyboard event, ignored");
                return;
            };
            let payload = ListBuilder::new()
                .push_str(&keyboard.key)
                .push_str(&keyboard.code)
                .push_bool(keyboard.alt_key)
                .push_bool(keyboard.ctrl_key)
                .push_bool(keyboard.shift_key)
                .push_bool(keyboard.meta_key)
                .build();
            let response = inner.invoke_callback(callback_id, Some(payload));
            if response.map(|response| response.is_true()).unwrap_or(false) {
                event.prevent_default();
                event.stop_propagation();
            }
        }
        EventKind::Drop => handle_drop(inner, callback_id, event),
    }
}

fn handle_control_event(
    inner: &Rc<DriverInner>,
    kind: EventKind,
    callback_id: CallbackId,
    event: &mut NativeEvent,
) {
    let Some(target) = event.target().cloned() else {
        warn!(target: "dom_driver::bridge", event = kind.name(), "event without target, ignored");
        return;
    };

    let accepted = match Document::form_control(&target) {
        Some(FormControl::Input | FormControl::TextArea) => true,
        Some(FormControl::Select) => kind == EventKind::Change,
        None => false,
    };
    if !accepted {
        let error = DriverError::type_mismatch(kind.name(), "text input control", describe(&target));
        warn!(target: "dom_driver::bridge", %error, "event dropped");
        return;
    }

    let value = inner.document.control_value(&target).unwrap_or_default();
    inner.invoke_callback(callback_id, Some(Value::String(value)));
}

fn handle_drop(inner: &Rc<DriverInner>, callback_id: CallbackId, event: &mut NativeEvent) {
    event.prevent_default();

    let transfer = match event.data() {
        EventData::Drag(Some(transfer)) => transfer.clone(),
        EventData::Drag(None) => {
            error!(target: "dom_driver::bridge", "drop: event carries no data transfer");
            return;
        }
        _ => {
            warn!(target: "dom_driver::bridge", "drop: not a drag event, ignored");
            return;
        }
    };

    let mut files: Vec<DroppedFile> = Vec::new();
    for (index, item) in transfer.items.into_iter().enumerate() {
        match item {
            TransferItem::File(file) => files.push(file),
            TransferItem::Text(_) => {
                error!(target: "dom_driver::bridge", index, "drop: item is not a file");
            }
        }
    }
    if files.is_empty() {
        error!(target: "dom_driver::bridge", %callback_id, "drop: no files to send");
        return;
    }

    let weak = Rc::downgrade(inner);
    inner.spawn(async move {
        let files = match try_join_all(files.into_iter().map(DroppedFile::read)).await {
            Ok(files) => files,
            Err(error) => {
                error!(target: "dom_driver::bridge", %callback_id, %error, "drop: reading files failed");
                return;
            }
        };
        let Some(inner) = weak.upgrade() else {
            return;
        };
        if !inner.bridge.is_registered(callback_id) {
            let error = DriverError::CallbackNotFound {
                label: "drop".to_string(),
                id: callback_id,
            };
            error!(target: "dom_driver::bridge", %error, "drop: callback removed while reading");
            return;
        }

        let payload = files
            .into_iter()
            .fold(ListBuilder::new(), |list, (name, bytes)| {
                list.push_list(move |entry| entry.push_str(&name).push_buffer(bytes))
            })
            .build();
        inner.invoke_callback(callback_id, Some(payload));
    });
}

fn describe(node: &NodeRef) -> String {
    if let Some(name) = html_local_name(node) {
        return format!("<{name}>");
    }
    if let Some(element) = node.as_element() {
        return format!("<{}>", element.name.local);
    }
    if node.as_text().is_some() {
        return "text node".to_string();
    }
    if node.as_comment().is_some() {
        return "comment node".to_string();
    }
    "document node".to_string()
}
