use std::io::Write;
use std::rc::Rc;

use dom_driver::dom::{DataTransfer, DroppedFile, NativeEvent, TransferItem};
use dom_driver::{CallbackId, Command, DomDriver, MemoryHistory, NodeId, RecordingEngine, Value};
use tokio::task::LocalSet;

fn drop_zone(engine: &Rc<RecordingEngine>) -> DomDriver {
    let driver = DomDriver::new(engine.clone(), Rc::new(MemoryHistory::new())).expect("driver");
    driver
        .apply_payload(
            r#"[
                {"type": "create_node", "id": 1, "name": "div"},
                {"type": "mount_node", "id": 1},
                {"type": "callback_add", "id": 1, "event_name": "drop", "callback_id": 40}
            ]"#,
        )
        .expect("apply");
    driver
}

fn file_entry(name: &str, bytes: &[u8]) -> Value {
    Value::List(vec![Value::from(name), Value::buffer(bytes)])
}

#[tokio::test]
async fn all_files_arrive_in_one_ordered_dispatch() {
    LocalSet::new()
        .run_until(async {
            let mut on_disk = tempfile::NamedTempFile::new().expect("temp file");
            on_disk.write_all(b"from disk").expect("write");
            let disk_name = on_disk
                .path()
                .file_name()
                .expect("file name")
                .to_string_lossy()
                .into_owned();

            let engine = Rc::new(RecordingEngine::new());
            let driver = drop_zone(&engine);

            let transfer = DataTransfer::with_files([
                DroppedFile::in_memory("a.txt", b"alpha".to_vec()),
                DroppedFile::from_path(on_disk.path()),
                DroppedFile::in_memory("c.bin", vec![0, 1, 2]),
            ]);
            let mut event = NativeEvent::drop(Some(transfer));
            driver.dispatch_to(NodeId(1), &mut event).expect("dispatch");

            assert!(event.default_prevented());
            assert_eq!(engine.call_count(), 0, "the dispatch waits for every read");

            driver.settle().await.expect("settle");
            assert_eq!(
                engine.calls(),
                vec![(
                    CallbackId(40),
                    Some(Value::List(vec![
                        file_entry("a.txt", b"alpha"),
                        file_entry(&disk_name, b"from disk"),
                        file_entry("c.bin", &[0, 1, 2]),
                    ]))
                )]
            );
        })
        .await;
}

#[tokio::test]
async fn drops_without_files_dispatch_nothing() {
    LocalSet::new()
        .run_until(async {
            let engine = Rc::new(RecordingEngine::new());
            let driver = drop_zone(&engine);

            let mut text_only = NativeEvent::drop(Some(DataTransfer {
                items: vec![TransferItem::Text("dragged words".into())],
            }));
            driver.dispatch_to(NodeId(1), &mut text_only).expect("dispatch");
            assert!(text_only.default_prevented());

            let mut empty = NativeEvent::drop(Some(DataTransfer::default()));
            driver.dispatch_to(NodeId(1), &mut empty).expect("dispatch");

            let mut no_transfer = NativeEvent::drop(None);
            driver.dispatch_to(NodeId(1), &mut no_transfer).expect("dispatch");

            driver.settle().await.expect("settle");
            assert_eq!(engine.call_count(), 0);
        })
        .await;
}

#[tokio::test]
async fn one_unreadable_file_abandons_the_whole_drop() {
    LocalSet::new()
        .run_until(async {
            let directory = tempfile::tempdir().expect("temp dir");
            let missing = directory.path().join("vanished.txt");

            let engine = Rc::new(RecordingEngine::new());
            let driver = drop_zone(&engine);

            let transfer = DataTransfer::with_files([
                DroppedFile::in_memory("ok.txt", b"fine".to_vec()),
                DroppedFile::from_path(&missing),
            ]);
            driver
                .dispatch_to(NodeId(1), &mut NativeEvent::drop(Some(transfer)))
                .expect("dispatch");

            driver.settle().await.expect("settle");
            assert_eq!(engine.call_count(), 0);
        })
        .await;
}

#[tokio::test]
async fn callback_removed_while_reading_is_not_invoked() {
    LocalSet::new()
        .run_until(async {
            let engine = Rc::new(RecordingEngine::new());
            let driver = drop_zone(&engine);

            let transfer = DataTransfer::with_files([DroppedFile::in_memory("late.txt", b"x".to_vec())]);
            driver
                .dispatch_to(NodeId(1), &mut NativeEvent::drop(Some(transfer)))
                .expect("dispatch");
            driver.apply_commands(&[Command::CallbackRemove {
                id: NodeId(1),
                event_name: "drop".into(),
                callback_id: CallbackId(40),
            }]);

            driver.settle().await.expect("settle");
            assert_eq!(engine.call_count(), 0);
        })
        .await;
}
