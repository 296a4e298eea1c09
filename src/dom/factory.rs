use std::rc::{Rc, Weak};

use html5ever::{namespace_url, ns, LocalName, QualName};
use kuchiki::NodeRef;
use tracing::debug;

use super::document::Document;
use super::event::NativeEvent;
use crate::config::DriverConfig;
use crate::history::{classify_href, HistoryLocation, LinkTarget};

pub fn qualified_name(tag: &str, svg: bool) -> QualName {
    let local = LocalName::from(tag);
    if svg {
        QualName::new(None, ns!(svg), local)
    } else {
        QualName::new(None, ns!(html), local)
    }
}

pub(crate) fn is_anchor(tag: &str) -> bool {
    tag.trim().eq_ignore_ascii_case("a")
}

/// Builds element nodes for `create_node`.
pub struct ElementFactory {
    document: Weak<Document>,
    history: Rc<dyn HistoryLocation>,
    config: DriverConfig,
}

impl ElementFactory {
    pub fn new(
        document: &Rc<Document>,
        history: Rc<dyn HistoryLocation>,
        config: &DriverConfig,
    ) -> Self {
        Self {
            document: Rc::downgrade(document),
            history,
            config: config.clone(),
        }
    }

    pub fn create_element(&self, tag: &str) -> NodeRef {
        let node = NodeRef::new_element(qualified_name(tag, self.config.is_svg_tag(tag)), None);

        if self.config.intercept_links && is_anchor(tag) {
            self.intercept_anchor(&node);
        }
        node
    }

    fn intercept_anchor(&self, anchor: &NodeRef) {
        let Some(document) = self.document.upgrade() else {
            return;
        };
        let weak_document = Rc::downgrade(&document);
        let history = Rc::clone(&self.history);

        document.add_event_listener(
            anchor,
            "click",
            Rc::new(move |event: &mut NativeEvent, anchor: &NodeRef| {
                let href = anchor
                    .as_element()
                    .and_then(|element| element.attributes.borrow().get("href").map(str::to_string));

                let LinkTarget::ClientSide(path) = classify_href(href.as_deref()) else {
                    return;
                };

                debug!(target: "dom_driver::factory", path, "client-side navigation");
                event.prevent_default();
                history.push(path);
                if let Some(document) = weak_document.upgrade() {
                    document.scroll_to(0.0, 0.0);
                }
            }),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_SHELL_HTML;
    use crate::history::MemoryHistory;
    use html5ever::Namespace;

    fn factory() -> (Rc<Document>, MemoryHistory, ElementFactory) {
        let document = Rc::new(Document::parse(DEFAULT_SHELL_HTML).unwrap());
        let history = MemoryHistory::new();
        let factory = ElementFactory::new(
            &document,
            Rc::new(history.clone()),
            &DriverConfig::default(),
        );
        (document, history, factory)
    }

    fn namespace(node: &NodeRef) -> Namespace {
        node.as_element().unwrap().name.ns.clone()
    }

    #[test]
    fn svg_and_path_use_the_svg_namespace() {
        let (_document, _history, factory) = factory();
        assert_eq!(namespace(&factory.create_element("svg")), ns!(svg));
        assert_eq!(namespace(&factory.create_element("path")), ns!(svg));
        assert_eq!(namespace(&factory.create_element("div")), ns!(html));
        assert_eq!(namespace(&factory.create_element("SVG")), ns!(html), "tag match is exact");
    }

    #[test]
    fn anchor_detection_ignores_case_and_padding() {
        assert!(is_anchor("a"));
        assert!(is_anchor("A"));
        assert!(is_anchor(" a "));
        assert!(!is_anchor("abbr"));
    }

    #[test]
    fn relative_anchor_clicks_stay_client_side() {
        let (document, history, factory) = factory();
        let anchor = factory.create_element("a");
        anchor
            .as_element()
            .unwrap()
            .attributes
            .borrow_mut()
            .insert("href", "/settings".to_string());
        document.body().append(anchor.clone());
        document.scroll_to(0.0, 420.0);

        let mut event = NativeEvent::new("click");
        document.dispatch_event(&anchor, &mut event);

        assert!(event.default_prevented());
        assert_eq!(history.entries(), vec!["/settings"]);
        assert_eq!(document.scroll_position(), (0.0, 0.0));
    }

    #[test]
    fn external_anchor_clicks_are_left_alone() {
        let (document, history, factory) = factory();
        let anchor = factory.create_element("a");
        anchor
            .as_element()
            .unwrap()
            .attributes
            .borrow_mut()
            .insert("href", "https://example.com".to_string());
        document.body().append(anchor.clone());

        let mut event = NativeEvent::new("click");
        document.dispatch_event(&anchor, &mut event);

        assert!(!event.default_prevented());
        assert!(history.entries().is_empty());
    }
}
