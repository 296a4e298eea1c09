use std::rc::Rc;

use kuchiki::NodeRef;
use tracing::{debug, error, warn};

use super::commands::{decode_batch, Command};
use super::DriverInner;
use crate::dom::document::{replace_text_children, Document, FormControl};
use crate::dom::registry::NodeKind;
use crate::error::{DriverError, Result};
use crate::ids::NodeId;

/// Outcome of applying one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub applied: usize,
    pub failed: usize,
    /// The payload could not be decoded and nothing was applied.
    pub decode_failed: bool,
}

impl BatchReport {
    fn decode_failure() -> Self {
        Self {
            decode_failed: true,
            ..Self::default()
        }
    }
}

/// Ids scheduled for focus by one batch, in first-scheduled order.
#[derive(Debug, Default)]
struct PendingAutofocus {
    ids: Vec<NodeId>,
}

impl PendingAutofocus {
    fn schedule(&mut self, id: NodeId) {
        if !self.ids.contains(&id) {
            self.ids.push(id);
        }
    }
}

impl DriverInner {
    pub(crate) fn apply_payload(self: &Rc<Self>, raw: &str) -> Result<BatchReport> {
        match decode_batch(raw) {
            Ok(commands) => Ok(self.apply_commands(&commands)),
            Err(error @ DriverError::UnknownCommand(_)) => {
                error!(target: "dom_driver::executor", %error, payload = raw, "command vocabulary mismatch");
                Err(error)
            }
            Err(error) => {
                error!(target: "dom_driver::executor", %error, payload = raw, "batch rejected");
                Ok(BatchReport::decode_failure())
            }
        }
    }

    pub(crate) fn apply_commands(self: &Rc<Self>, commands: &[Command]) -> BatchReport {
        let mut report = BatchReport::default();
        let mut autofocus = PendingAutofocus::default();

        for command in commands {
            match self.apply_command(command) {
                Ok(()) => report.applied += 1,
                Err(error) => {
                    report.failed += 1;
                    error!(target: "dom_driver::executor", kind = command.kind(), %error, ?command, "command failed");
                }
            }
            if let Some(id) = command.autofocus_target() {
                autofocus.schedule(id);
            }
        }

        if !autofocus.ids.is_empty() {
            self.schedule_focus(autofocus.ids);
        }

        debug!(
            target: "dom_driver::executor",
            applied = report.applied,
            failed = report.failed,
            "batch applied"
        );
        report
    }

    fn apply_command(self: &Rc<Self>, command: &Command) -> Result<()> {
        match command {
            Command::CreateNode { id, name } => {
                let node = self.factory.create_element(name);
                self.registry.create(*id, NodeKind::Element, node);
            }
            Command::CreateText { id, value } => {
                self.registry
                    .create(*id, NodeKind::Text, NodeRef::new_text(value.as_str()));
            }
            Command::CreateComment { id, value } => {
                self.registry
                    .create(*id, NodeKind::Comment, NodeRef::new_comment(value.as_str()));
            }
            Command::UpdateText { id, value } => self.update_text(*id, value)?,
            Command::SetAttr { id, name, value } => self.set_attribute(*id, name, value)?,
            Command::RemoveAttr { id, name } => self.remove_attribute(*id, name)?,
            Command::RemoveNode { id } => {
                self.registry
                    .delete_kind("remove_node", *id, NodeKind::Element)?
                    .detach();
            }
            Command::RemoveText { id } => {
                self.registry
                    .delete_kind("remove_text", *id, NodeKind::Text)?
                    .detach();
            }
            Command::RemoveComment { id } => {
                self.registry
                    .delete_kind("remove_comment", *id, NodeKind::Comment)?
                    .detach();
            }
            Command::InsertBefore {
                parent,
                child,
                ref_id,
            } => self.registry.insert_before(*parent, *child, *ref_id)?,
            Command::InsertCss { selector, value } => {
                self.registry.insert_css(selector.as_deref(), value);
            }
            Command::CallbackAdd {
                id,
                event_name,
                callback_id,
            } => self.bridge.add(self, *id, event_name, *callback_id)?,
            Command::CallbackRemove {
                id,
                event_name,
                callback_id,
            } => self
                .bridge
                .remove(&self.registry, *id, event_name, *callback_id)?,
            Command::MountNode { id } => self.registry.mount(*id)?,
        }
        Ok(())
    }

    fn update_text(&self, id: NodeId, value: &str) -> Result<()> {
        let entry = self.registry.entry("update_text", id)?;
        let contents = match entry.kind {
            NodeKind::Text => entry.handle.as_text(),
            NodeKind::Comment => entry.handle.as_comment(),
            NodeKind::Element => None,
        };
        let Some(contents) = contents else {
            return Err(DriverError::type_mismatch(
                format!("update_text id={id}"),
                "text or comment",
                entry.kind.as_str(),
            ));
        };
        *contents.borrow_mut() = value.to_string();
        Ok(())
    }

    fn set_attribute(&self, id: NodeId, name: &str, value: &str) -> Result<()> {
        if name.is_empty() {
            return Err(DriverError::InvalidCommand(format!(
                "set_attr id={id}: empty attribute name"
            )));
        }
        let node = self.registry.get_element("set_attr", id)?;
        if let Some(element) = node.as_element() {
            element
                .attributes
                .borrow_mut()
                .insert(name, value.to_string());
        }

        if name == "value" && Document::form_control(&node) == Some(FormControl::TextArea) {
            replace_text_children(&node, value);
        }
        Ok(())
    }

    fn remove_attribute(&self, id: NodeId, name: &str) -> Result<()> {
        let node = self.registry.get_element("remove_attr", id)?;
        if let Some(element) = node.as_element() {
            element.attributes.borrow_mut().remove(name);
        }

        if name == "value" && Document::form_control(&node) == Some(FormControl::TextArea) {
            replace_text_children(&node, "");
        }
        Ok(())
    }

    /// Focuses the scheduled nodes once the current batch has returned to the event loop.
    fn schedule_focus(self: &Rc<Self>, ids: Vec<NodeId>) {
        let weak = Rc::downgrade(self);
        self.spawn(async move {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            for id in ids {
                let node = match inner.registry.get_element(&format!("set focus {id}"), id) {
                    Ok(node) => node,
                    Err(error) => {
                        error!(target: "dom_driver::executor", %error, "autofocus skipped");
                        continue;
                    }
                };
                if inner.document.focus(&node) {
                    debug!(target: "dom_driver::executor", %id, "autofocus");
                } else {
                    warn!(target: "dom_driver::executor", %id, "autofocus target is not attached to the document");
                }
            }
        });
    }
}
