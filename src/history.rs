use std::cell::RefCell;
use std::rc::Rc;

/// Client-side navigation collaborator used by intercepted anchor clicks.
pub trait HistoryLocation {
    fn push(&self, path: &str);
}

/// In-memory history stack; clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct MemoryHistory {
    entries: Rc<RefCell<Vec<String>>>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.borrow().clone()
    }

    pub fn current(&self) -> Option<String> {
        self.entries.borrow().last().cloned()
    }
}

impl HistoryLocation for MemoryHistory {
    fn push(&self, path: &str) {
        tracing::debug!(target: "dom_driver::history", path, "push");
        self.entries.borrow_mut().push(path.to_string());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkTarget<'a> {
    /// Leave the click to the document's default navigation.
    Native,
    /// Prevent the default and push this path onto the history.
    ClientSide(&'a str),
}

/// Decides how a click on an anchor with the given `href` is handled.
pub fn classify_href(href: Option<&str>) -> LinkTarget<'_> {
    let Some(href) = href else {
        return LinkTarget::Native;
    };

    const NATIVE_PREFIXES: [&str; 4] = ["#", "http://", "https://", "//"];
    if NATIVE_PREFIXES.iter().any(|prefix| href.starts_with(prefix)) {
        return LinkTarget::Native;
    }

    LinkTarget::ClientSide(href)
}
