use std::rc::Rc;

use dom_driver::dom::{KeyboardData, NativeEvent};
use dom_driver::{DomDriver, DriverConfig, MemoryHistory, NodeId, QuickJsEngine};
use tokio::task::LocalSet;

const COUNTER_APP: &str = r#"
let count = 0;
let lastKey = null;

__dom_driver.bulk_update([
    { type: "create_node", id: 1, name: "button" },
    { type: "create_text", id: 2, value: "count: 0" },
    { type: "insert_before", parent: 1, child: 2, ref_id: null },
    { type: "mount_node", id: 1 },
    { type: "callback_add", id: 1, event_name: "click", callback_id: 10 },
    { type: "callback_add", id: 0, event_name: "hook_keydown", callback_id: 11 },
]);

globalThis.onDomEvent = (id, payload) => {
    if (id === 10n) {
        count += 1;
        __dom_driver.bulk_update([{ type: "update_text", id: 2, value: `count: ${count}` }]);
        return { stop_propagation: true };
    }
    if (id === 11n) {
        const [key, code, alt, ctrl] = payload;
        lastKey = `${ctrl ? "Ctrl+" : ""}${key}`;
        __dom_driver.bulk_update([{ type: "set_attr", id: 1, name: "data-key", value: lastKey }]);
        return key === "Escape";
    }
    return undefined;
};
"#;

#[tokio::test]
async fn script_engine_drives_the_document() {
    LocalSet::new()
        .run_until(async {
            let config = DriverConfig {
                engine_entry_point: "onDomEvent".to_string(),
                ..DriverConfig::default()
            };
            let engine = Rc::new(QuickJsEngine::from_config(&config).expect("engine"));
            engine.eval(COUNTER_APP, "counter.js").expect("evaluate script");

            let driver = DomDriver::with_config(config, engine, Rc::new(MemoryHistory::new()))
                .expect("driver");
            driver.pump().expect("initial render");
            assert!(
                driver
                    .document()
                    .to_html()
                    .contains("<button>count: 0</button>"),
                "{}",
                driver.document().to_html()
            );

            for _ in 0..2 {
                let mut click = NativeEvent::new("click");
                driver.dispatch_to(NodeId(1), &mut click).expect("dispatch");
                assert!(click.default_prevented());
                assert!(click.propagation_stopped());
            }
            assert_eq!(driver.node(NodeId(2)).expect("text").text_contents(), "count: 2");

            let mut ctrl_s = NativeEvent::keydown(KeyboardData {
                ctrl_key: true,
                ..KeyboardData::new("s", "KeyS")
            });
            driver.dispatch_to(NodeId(2), &mut ctrl_s).expect("dispatch");
            assert!(!ctrl_s.default_prevented());
            assert!(
                driver.document().to_html().contains(r#"data-key="Ctrl+s""#),
                "{}",
                driver.document().to_html()
            );

            let mut escape = NativeEvent::keydown(KeyboardData::new("Escape", "Escape"));
            driver.dispatch_to(NodeId(1), &mut escape).expect("dispatch");
            assert!(escape.default_prevented() && escape.propagation_stopped());
        })
        .await;
}
