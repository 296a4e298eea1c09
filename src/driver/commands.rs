//! Command vocabulary emitted by the engine.
//!
//! A batch is a JSON array of objects tagged by `type`. Decoding is two-phase:
//! every element's `type` is checked against the closed set of kinds first, so
//! an unknown kind anywhere in the batch is reported as
//! [`DriverError::UnknownCommand`] before any field validation. Field errors are
//! reported as [`DriverError::BatchDecode`] naming the offending command.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{DriverError, Result};
use crate::ids::{CallbackId, NodeId};

pub const COMMAND_KINDS: [&str; 14] = [
    "create_node",
    "create_text",
    "create_comment",
    "update_text",
    "set_attr",
    "remove_attr",
    "remove_node",
    "remove_text",
    "remove_comment",
    "insert_before",
    "insert_css",
    "callback_add",
    "callback_remove",
    "mount_node",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    CreateNode {
        id: NodeId,
        name: String,
    },
    CreateText {
        id: NodeId,
        value: String,
    },
    CreateComment {
        id: NodeId,
        value: String,
    },
    UpdateText {
        id: NodeId,
        value: String,
    },
    SetAttr {
        id: NodeId,
        name: String,
        value: String,
    },
    RemoveAttr {
        id: NodeId,
        name: String,
    },
    RemoveNode {
        id: NodeId,
    },
    RemoveText {
        id: NodeId,
    },
    RemoveComment {
        id: NodeId,
    },
    InsertBefore {
        parent: NodeId,
        child: NodeId,
        #[serde(default)]
        ref_id: Option<NodeId>,
    },
    InsertCss {
        #[serde(default)]
        selector: Option<String>,
        value: String,
    },
    CallbackAdd {
        id: NodeId,
        event_name: String,
        callback_id: CallbackId,
    },
    CallbackRemove {
        id: NodeId,
        event_name: String,
        callback_id: CallbackId,
    },
    MountNode {
        id: NodeId,
    },
}

impl Command {
    pub fn kind(&self) -> &'static str {
        match self {
            Command::CreateNode { .. } => "create_node",
            Command::CreateText { .. } => "create_text",
            Command::CreateComment { .. } => "create_comment",
            Command::UpdateText { .. } => "update_text",
            Command::SetAttr { .. } => "set_attr",
            Command::RemoveAttr { .. } => "remove_attr",
            Command::RemoveNode { .. } => "remove_node",
            Command::RemoveText { .. } => "remove_text",
            Command::RemoveComment { .. } => "remove_comment",
            Command::InsertBefore { .. } => "insert_before",
            Command::InsertCss { .. } => "insert_css",
            Command::CallbackAdd { .. } => "callback_add",
            Command::CallbackRemove { .. } => "callback_remove",
            Command::MountNode { .. } => "mount_node",
        }
    }

    /// The node id this command schedules for the autofocus pass, if any.
    pub fn autofocus_target(&self) -> Option<NodeId> {
        match self {
            Command::SetAttr { id, name, .. } if name.eq_ignore_ascii_case("autofocus") => Some(*id),
            _ => None,
        }
    }
}

pub fn decode_batch(raw: &str) -> Result<Vec<Command>> {
    let items: Vec<JsonValue> =
        serde_json::from_str(raw).map_err(|error| DriverError::BatchDecode(error.to_string()))?;

    for (index, item) in items.iter().enumerate() {
        let kind = item
            .get("type")
            .and_then(JsonValue::as_str)
            .ok_or_else(|| {
                DriverError::BatchDecode(format!("command #{index}: missing string field 'type'"))
            })?;
        if !COMMAND_KINDS.contains(&kind) {
            return Err(DriverError::UnknownCommand(kind.to_string()));
        }
    }

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::from_value(item)
                .map_err(|error| DriverError::BatchDecode(format!("command #{index}: {error}")))
        })
        .collect()
}

pub fn encode_batch(commands: &[Command]) -> serde_json::Result<String> {
    serde_json::to_string(commands)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_tagged_commands() {
        let raw = r#"[
            {"type": "create_node", "id": 1, "name": "div"},
            {"type": "insert_before", "parent": 0, "child": 1, "ref_id": null},
            {"type": "insert_css", "selector": null, "value": "body {}"},
            {"type": "callback_add", "id": 1, "event_name": "click", "callback_id": 9}
        ]"#;
        let commands = decode_batch(raw).unwrap();
        assert_eq!(
            commands,
            vec![
                Command::CreateNode { id: NodeId(1), name: "div".into() },
                Command::InsertBefore { parent: NodeId(0), child: NodeId(1), ref_id: None },
                Command::InsertCss { selector: None, value: "body {}".into() },
                Command::CallbackAdd {
                    id: NodeId(1),
                    event_name: "click".into(),
                    callback_id: CallbackId(9),
                },
            ]
        );
    }

    #[test]
    fn missing_ref_id_means_append() {
        let commands = decode_batch(r#"[{"type": "insert_before", "parent": 1, "child": 2}]"#).unwrap();
        assert_eq!(
            commands,
            vec![Command::InsertBefore { parent: NodeId(1), child: NodeId(2), ref_id: None }]
        );
    }

    #[test]
    fn unknown_kind_wins_over_field_errors() {
        let raw = r#"[
            {"type": "create_node", "id": "not-a-number", "name": "div"},
            {"type": "teleport_node", "id": 1}
        ]"#;
        match decode_batch(raw) {
            Err(DriverError::UnknownCommand(kind)) => assert_eq!(kind, "teleport_node"),
            other => panic!("expected UnknownCommand, got {other:?}"),
        }
    }

    #[test]
    fn malformed_fields_name_the_command() {
        let error = decode_batch(r#"[{"type": "set_attr", "id": 1, "name": "class"}]"#).unwrap_err();
        match error {
            DriverError::BatchDecode(message) => {
                assert!(message.starts_with("command #0"), "{message}");
                assert!(message.contains("value"), "{message}");
            }
            other => panic!("expected BatchDecode, got {other:?}"),
        }
        assert!(matches!(decode_batch("{not json"), Err(DriverError::BatchDecode(_))));
        assert!(matches!(decode_batch(r#"[{"id": 1}]"#), Err(DriverError::BatchDecode(_))));
    }

    #[test]
    fn autofocus_is_matched_case_insensitively() {
        let set = |name: &str| Command::SetAttr {
            id: NodeId(4),
            name: name.into(),
            value: String::new(),
        };
        assert_eq!(set("autofocus").autofocus_target(), Some(NodeId(4)));
        assert_eq!(set("AutoFocus").autofocus_target(), Some(NodeId(4)));
        assert_eq!(set("autofocused").autofocus_target(), None);
        assert_eq!(Command::MountNode { id: NodeId(4) }.autofocus_target(), None);
    }

    #[test]
    fn encoded_batches_decode_back() {
        let commands = vec![Command::SetAttr {
            id: NodeId(2),
            name: "class".into(),
            value: "row".into(),
        }];
        let raw = encode_batch(&commands).unwrap();
        assert!(raw.contains(r#""type":"set_attr""#));
        assert_eq!(decode_batch(&raw).unwrap(), commands);
    }
}
