//! The live document side: node tree, events, element construction and the id registry.

pub mod document;
pub mod event;
pub mod factory;
pub mod registry;

pub use document::{Document, FormControl, Listener, ListenerId};
pub use event::{DataTransfer, DroppedFile, EventData, KeyboardData, NativeEvent, TransferItem};
pub use factory::ElementFactory;
pub use registry::{NodeKind, NodeRegistry, RegisteredNode};
