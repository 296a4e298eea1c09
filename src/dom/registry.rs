use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use kuchiki::NodeRef;
use tracing::{error, info};

use super::document::Document;
use super::factory::qualified_name;
use crate::error::{DriverError, Result};
use crate::ids::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Element,
    Text,
    Comment,
}

impl NodeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Element => "element",
            NodeKind::Text => "text",
            NodeKind::Comment => "comment",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RegisteredNode {
    pub kind: NodeKind,
    pub handle: NodeRef,
}

/// Engine-assigned ids mapped to the nodes they own.
///
/// `label` arguments only name the caller in diagnostics.
pub struct NodeRegistry {
    document: Rc<Document>,
    nodes: RefCell<HashMap<NodeId, RegisteredNode>>,
}

impl NodeRegistry {
    pub fn new(document: Rc<Document>) -> Self {
        Self {
            document,
            nodes: RefCell::new(HashMap::new()),
        }
    }

    pub fn create(&self, id: NodeId, kind: NodeKind, handle: NodeRef) {
        let previous = self
            .nodes
            .borrow_mut()
            .insert(id, RegisteredNode { kind, handle });
        if let Some(previous) = previous {
            error!(
                target: "dom_driver::registry",
                %id,
                previous = previous.kind.as_str(),
                "node id reused without delete, replacing"
            );
        }
    }

    pub fn entry(&self, label: &str, id: NodeId) -> Result<RegisteredNode> {
        self.nodes
            .borrow()
            .get(&id)
            .cloned()
            .ok_or_else(|| DriverError::not_found(label, id))
    }

    pub fn get(&self, label: &str, id: NodeId) -> Result<NodeRef> {
        self.entry(label, id).map(|entry| entry.handle)
    }

    pub fn get_kind(&self, label: &str, id: NodeId, kind: NodeKind) -> Result<NodeRef> {
        let entry = self.entry(label, id)?;
        if entry.kind != kind {
            return Err(DriverError::type_mismatch(
                format!("{label} id={id}"),
                kind.as_str(),
                entry.kind.as_str(),
            ));
        }
        Ok(entry.handle)
    }

    pub fn get_element(&self, label: &str, id: NodeId) -> Result<NodeRef> {
        self.get_kind(label, id, NodeKind::Element)
    }

    pub fn delete(&self, label: &str, id: NodeId) -> Result<NodeRef> {
        self.nodes
            .borrow_mut()
            .remove(&id)
            .map(|entry| entry.handle)
            .ok_or_else(|| DriverError::not_found(label, id))
    }

    /// Removes an entry of the expected kind; a mismatched kind leaves it registered.
    pub fn delete_kind(&self, label: &str, id: NodeId, kind: NodeKind) -> Result<NodeRef> {
        self.get_kind(label, id, kind)?;
        self.delete(label, id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.borrow().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.borrow().is_empty()
    }

    pub fn insert_before(&self, parent: NodeId, child: NodeId, ref_id: Option<NodeId>) -> Result<()> {
        let parent_node = self.get("insert_before parent", parent)?;
        let child_node = self.get("insert_before child", child)?;

        if parent_node
            .inclusive_ancestors()
            .any(|ancestor| ancestor == child_node)
        {
            return Err(DriverError::InvalidCommand(format!(
                "insert_before: child id={child} is parent id={parent} or one of its ancestors"
            )));
        }

        match ref_id {
            None => parent_node.append(child_node),
            Some(ref_id) => {
                let ref_node = self.get("insert_before ref", ref_id)?;
                if ref_node == child_node {
                    return Ok(());
                }
                if ref_node.parent().as_ref() != Some(&parent_node) {
                    return Err(DriverError::InvalidCommand(format!(
                        "insert_before: ref id={ref_id} is not a child of parent id={parent}"
                    )));
                }
                ref_node.insert_before(child_node);
            }
        }
        Ok(())
    }

    /// Appends a `<style>` element to the document head.
    pub fn insert_css(&self, selector: Option<&str>, body: &str) {
        let css = match selector {
            Some(selector) => format!("{selector} {{ {body} }}"),
            None => body.to_string(),
        };
        let style = NodeRef::new_element(qualified_name("style", false), None);
        style.append(NodeRef::new_text(css));
        self.document.head().append(style);
    }

    pub fn mount(&self, id: NodeId) -> Result<()> {
        let node = self.get("mount_node", id)?;
        self.document.body().append(node);
        Ok(())
    }

    pub fn debug_nodes(&self, ids: &[NodeId]) {
        let nodes = self.nodes.borrow();
        for id in ids {
            match nodes.get(id) {
                Some(entry) => info!(
                    target: "dom_driver::registry",
                    %id,
                    kind = entry.kind.as_str(),
                    html = %entry.handle.to_string(),
                    "debug node"
                ),
                None => info!(target: "dom_driver::registry", %id, "debug node: missing"),
            }
        }
    }
}
