use std::path::{Path, PathBuf};

use keyboard_types::{Code, Key, Modifiers};
use kuchiki::NodeRef;

use crate::error::{DriverError, Result};

const NON_BUBBLING: [&str; 5] = ["blur", "focus", "mouseenter", "mouseleave", "load"];

/// Key event fields forwarded to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeyboardData {
    pub key: String,
    pub code: String,
    pub alt_key: bool,
    pub ctrl_key: bool,
    pub shift_key: bool,
    pub meta_key: bool,
}

impl KeyboardData {
    pub fn new(key: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            code: code.into(),
            ..Default::default()
        }
    }

    pub fn from_keyboard_types(key: &Key, code: Code, modifiers: Modifiers) -> Self {
        Self {
            key: key.to_string(),
            code: code.to_string(),
            alt_key: modifiers.alt(),
            ctrl_key: modifiers.ctrl(),
            shift_key: modifiers.shift(),
            meta_key: modifiers.meta(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileContents {
    Memory(Vec<u8>),
    Path(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedFile {
    pub name: String,
    pub contents: FileContents,
}

impl DroppedFile {
    pub fn in_memory(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            contents: FileContents::Memory(bytes.into()),
        }
    }

    /// A file on disk, named after its final path component.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            name,
            contents: FileContents::Path(path.to_path_buf()),
        }
    }

    /// Reads the complete contents, yielding `(name, bytes)`.
    pub async fn read(self) -> Result<(String, Vec<u8>)> {
        match self.contents {
            FileContents::Memory(bytes) => Ok((self.name, bytes)),
            FileContents::Path(path) => match tokio::fs::read(&path).await {
                Ok(bytes) => Ok((self.name, bytes)),
                Err(source) => Err(DriverError::AsyncIo {
                    name: self.name,
                    source,
                }),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferItem {
    File(DroppedFile),
    /// Dragged text or other non-file payload.
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DataTransfer {
    pub items: Vec<TransferItem>,
}

impl DataTransfer {
    pub fn with_files(files: impl IntoIterator<Item = DroppedFile>) -> Self {
        Self {
            items: files.into_iter().map(TransferItem::File).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EventData {
    #[default]
    None,
    Keyboard(KeyboardData),
    /// `None` when the drag carried no transfer payload at all.
    Drag(Option<DataTransfer>),
}

/// An event delivered by the host to the live document.
#[derive(Debug, Clone)]
pub struct NativeEvent {
    event_type: String,
    bubbles: bool,
    data: EventData,
    target: Option<NodeRef>,
    default_prevented: bool,
    propagation_stopped: bool,
}

impl NativeEvent {
    pub fn new(event_type: impl Into<String>) -> Self {
        let event_type = event_type.into();
        let bubbles = !NON_BUBBLING.contains(&event_type.as_str());
        Self {
            event_type,
            bubbles,
            data: EventData::None,
            target: None,
            default_prevented: false,
            propagation_stopped: false,
        }
    }

    pub fn with_data(mut self, data: EventData) -> Self {
        self.data = data;
        self
    }

    pub fn keydown(data: KeyboardData) -> Self {
        Self::new("keydown").with_data(EventData::Keyboard(data))
    }

    pub fn drop(transfer: Option<DataTransfer>) -> Self {
        Self::new("drop").with_data(EventData::Drag(transfer))
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn bubbles(&self) -> bool {
        self.bubbles
    }

    pub fn data(&self) -> &EventData {
        &self.data
    }

    pub fn keyboard(&self) -> Option<&KeyboardData> {
        match &self.data {
            EventData::Keyboard(data) => Some(data),
            _ => None,
        }
    }

    pub fn target(&self) -> Option<&NodeRef> {
        self.target.as_ref()
    }

    pub(crate) fn set_target(&mut self, target: NodeRef) {
        self.target = Some(target);
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }

    pub fn propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }
}
