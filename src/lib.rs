//! Executes DOM command batches emitted by an external engine against a live
//! HTML document, and bridges native events on that document back to the
//! engine as callback invocations.

pub mod config;
pub mod dom;
pub mod driver;
pub mod engine;
pub mod error;
pub mod history;
pub mod ids;
pub mod logging;
pub mod value;

pub use config::DriverConfig;
pub use driver::{BatchReport, Command, DomDriver, EventKind};
pub use engine::{Engine, QuickJsEngine, RecordingEngine};
pub use error::{DriverError, Result};
pub use history::{HistoryLocation, MemoryHistory};
pub use ids::{CallbackId, NodeId};
pub use value::{ListBuilder, Value};
