use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use html5ever::{namespace_url, ns};
use kuchiki::traits::*;
use kuchiki::{Node, NodeRef};
use tracing::trace;

use super::event::NativeEvent;
use crate::error::{DriverError, Result};

pub type Listener = Rc<dyn Fn(&mut NativeEvent, &NodeRef)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct ListenerEntry {
    id: ListenerId,
    target: Weak<Node>,
    event_type: String,
    handler: Listener,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormControl {
    Input,
    TextArea,
    Select,
}

/// The live document the driver mutates.
///
/// Besides the node tree it owns the listener table, the active element and the
/// viewport scroll offset. Listeners hold their target weakly so a node that the
/// registry drops is not kept alive by its handlers.
pub struct Document {
    root: NodeRef,
    head: NodeRef,
    body: NodeRef,
    listeners: RefCell<Vec<ListenerEntry>>,
    next_listener: Cell<u64>,
    focused: RefCell<Option<NodeRef>>,
    scroll: Cell<(f64, f64)>,
}

impl Document {
    pub fn parse(html: &str) -> Result<Self> {
        let root = kuchiki::parse_html().one(html);
        let head = select_required(&root, "head")?;
        let body = select_required(&root, "body")?;
        Ok(Self {
            root,
            head,
            body,
            listeners: RefCell::new(Vec::new()),
            next_listener: Cell::new(1),
            focused: RefCell::new(None),
            scroll: Cell::new((0.0, 0.0)),
        })
    }

    pub fn root(&self) -> &NodeRef {
        &self.root
    }

    pub fn head(&self) -> &NodeRef {
        &self.head
    }

    pub fn body(&self) -> &NodeRef {
        &self.body
    }

    pub fn to_html(&self) -> String {
        self.root.to_string()
    }

    pub fn is_connected(&self, node: &NodeRef) -> bool {
        node.inclusive_ancestors().any(|ancestor| ancestor == self.root)
    }

    pub fn add_event_listener(
        &self,
        target: &NodeRef,
        event_type: &str,
        handler: Listener,
    ) -> ListenerId {
        let id = ListenerId(self.next_listener.get());
        self.next_listener.set(id.0 + 1);

        let mut listeners = self.listeners.borrow_mut();
        listeners.retain(|entry| entry.target.strong_count() > 0);
        listeners.push(ListenerEntry {
            id,
            target: Rc::downgrade(&target.0),
            event_type: event_type.to_string(),
            handler,
        });
        id
    }

    pub fn remove_event_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|entry| entry.id != id);
        listeners.len() != before
    }

    /// Number of listeners whose target is still alive.
    pub fn listener_count(&self) -> usize {
        self.listeners
            .borrow()
            .iter()
            .filter(|entry| entry.target.strong_count() > 0)
            .count()
    }

    pub fn listeners_on(&self, target: &NodeRef, event_type: &str) -> usize {
        self.handlers_for(target, event_type).len()
    }

    /// Runs the listeners on `target` and, for bubbling events, on each ancestor.
    pub fn dispatch_event(&self, target: &NodeRef, event: &mut NativeEvent) {
        event.set_target(target.clone());

        let path: Vec<NodeRef> = if event.bubbles() {
            target.inclusive_ancestors().collect()
        } else {
            vec![target.clone()]
        };

        for current in path {
            let handlers = self.handlers_for(&current, event.event_type());
            for (id, handler) in handlers {
                // listeners removed by an earlier handler in this dispatch are skipped
                if !self.is_listening(id) {
                    continue;
                }
                handler(&mut *event, &current);
            }
            if event.propagation_stopped() {
                trace!(target: "dom_driver::document", event = event.event_type(), "propagation stopped");
                break;
            }
        }
    }

    fn handlers_for(&self, node: &NodeRef, event_type: &str) -> Vec<(ListenerId, Listener)> {
        let node_ptr = Rc::as_ptr(&node.0);
        self.listeners
            .borrow()
            .iter()
            .filter(|entry| entry.event_type == event_type && Weak::as_ptr(&entry.target) == node_ptr)
            .map(|entry| (entry.id, Rc::clone(&entry.handler)))
            .collect()
    }

    fn is_listening(&self, id: ListenerId) -> bool {
        self.listeners.borrow().iter().any(|entry| entry.id == id)
    }

    /// Moves focus to `node`; only connected elements can take focus.
    pub fn focus(&self, node: &NodeRef) -> bool {
        if node.as_element().is_none() || !self.is_connected(node) {
            return false;
        }
        *self.focused.borrow_mut() = Some(node.clone());
        true
    }

    pub fn active_element(&self) -> Option<NodeRef> {
        self.focused.borrow().clone()
    }

    pub fn scroll_to(&self, x: f64, y: f64) {
        self.scroll.set((x, y));
    }

    pub fn scroll_position(&self) -> (f64, f64) {
        self.scroll.get()
    }

    pub fn form_control(node: &NodeRef) -> Option<FormControl> {
        match html_local_name(node)?.as_str() {
            "input" => Some(FormControl::Input),
            "textarea" => Some(FormControl::TextArea),
            "select" => Some(FormControl::Select),
            _ => None,
        }
    }

    /// Current value of a form control, or `None` for any other node.
    pub fn control_value(&self, node: &NodeRef) -> Option<String> {
        let element = node.as_element()?;
        match Self::form_control(node)? {
            FormControl::Input => Some(
                element
                    .attributes
                    .borrow()
                    .get("value")
                    .unwrap_or_default()
                    .to_string(),
            ),
            FormControl::TextArea => Some(node.text_contents()),
            FormControl::Select => {
                let options: Vec<NodeRef> = node
                    .descendants()
                    .filter(|candidate| html_local_name(candidate).as_deref() == Some("option"))
                    .collect();
                let chosen = options
                    .iter()
                    .find(|option| has_attribute(option, "selected"))
                    .or_else(|| options.first());
                Some(chosen.map(option_value).unwrap_or_default())
            }
        }
    }

    /// Replaces the live value of a form control, as typing or picking an option would.
    pub fn set_control_value(&self, node: &NodeRef, value: &str) -> bool {
        let Some(control) = Self::form_control(node) else {
            return false;
        };
        match control {
            FormControl::Input => {
                if let Some(element) = node.as_element() {
                    element
                        .attributes
                        .borrow_mut()
                        .insert("value", value.to_string());
                }
            }
            FormControl::TextArea => replace_text_children(node, value),
            FormControl::Select => {
                for option in node
                    .descendants()
                    .filter(|candidate| html_local_name(candidate).as_deref() == Some("option"))
                {
                    if let Some(element) = option.as_element() {
                        let mut attributes = element.attributes.borrow_mut();
                        if option_value(&option) == value {
                            attributes.insert("selected", String::new());
                        } else {
                            attributes.remove("selected");
                        }
                    }
                }
            }
        }
        true
    }
}

fn select_required(root: &NodeRef, tag: &'static str) -> Result<NodeRef> {
    root.select_first(tag)
        .map(|element| element.as_node().clone())
        .map_err(|_| DriverError::InvalidShell(tag))
}

/// Local name of an element in the HTML namespace.
pub(crate) fn html_local_name(node: &NodeRef) -> Option<String> {
    let element = node.as_element()?;
    if element.name.ns != ns!(html) {
        return None;
    }
    Some(element.name.local.to_string())
}

fn has_attribute(node: &NodeRef, name: &str) -> bool {
    node.as_element()
        .map(|element| element.attributes.borrow().contains(name))
        .unwrap_or(false)
}

fn option_value(option: &NodeRef) -> String {
    option
        .as_element()
        .and_then(|element| element.attributes.borrow().get("value").map(str::to_string))
        .unwrap_or_else(|| option.text_contents().trim().to_string())
}

pub(crate) fn replace_text_children(node: &NodeRef, value: &str) {
    let children: Vec<NodeRef> = node.children().collect();
    for child in children {
        child.detach();
    }
    if !value.is_empty() {
        node.append(NodeRef::new_text(value));
    }
}
