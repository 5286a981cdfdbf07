//! Integration tests for synchronous box operations.

mod common;

use common::{open_store, open_tasks, Gate, Gated, Tag, Task};
use objbox::{Config, ObxError};
use proptest::prelude::*;
use std::thread;
use std::time::Duration;

#[test]
fn put_assigns_id_and_get_round_trips() {
    let (_ob, tasks) = open_tasks();

    let mut task = Task::new("write tests", 2);
    let id = tasks.put(&mut task).unwrap();
    assert_ne!(id, 0);
    assert_eq!(task.id, id);

    let loaded = tasks.get(id).unwrap().expect("task exists");
    assert_eq!(loaded, task);
}

#[test]
fn put_with_id_is_upsert() {
    let (_ob, tasks) = open_tasks();

    let mut task = Task::new("draft", 1).with_id(500);
    assert_eq!(tasks.put(&mut task).unwrap(), 500);

    task.done = true;
    task.text = "final".to_string();
    assert_eq!(tasks.put(&mut task).unwrap(), 500);

    assert_eq!(tasks.count().unwrap(), 1);
    let loaded = tasks.get(500).unwrap().unwrap();
    assert!(loaded.done);
    assert_eq!(loaded.text, "final");

    // New objects continue after the highest ID seen.
    assert_eq!(tasks.put(&mut Task::new("next", 0)).unwrap(), 501);
}

#[test]
fn get_missing_is_none() {
    let (_ob, tasks) = open_tasks();
    assert!(tasks.get(12345).unwrap().is_none());
}

#[test]
fn put_all_preserves_order() {
    let (_ob, tasks) = open_tasks();

    let mut batch: Vec<Task> = (0..10).map(|i| Task::new(format!("task {i}"), i)).collect();
    let ids = tasks.put_all(&mut batch).unwrap();

    assert_eq!(ids.len(), 10);
    for (task, id) in batch.iter().zip(&ids) {
        assert_eq!(task.id, *id);
        assert_eq!(tasks.get(*id).unwrap().unwrap().text, task.text);
    }
    assert!(ids.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(tasks.count().unwrap(), 10);
}

#[test]
fn put_all_empty_returns_no_ids() {
    let (_ob, tasks) = open_tasks();
    tasks.put(&mut Task::new("existing", 1)).unwrap();

    let ids = tasks.put_all(&mut []).unwrap();
    assert!(ids.is_empty());
    assert_eq!(tasks.count().unwrap(), 1);
}

#[test]
fn put_all_rolls_back_on_failure() {
    let (_ob, tasks) = open_tasks();
    tasks.put(&mut Task::new("before", 1)).unwrap();

    // The reserved ID fails inside the engine after two objects were put.
    let mut batch = vec![
        Task::new("one", 1),
        Task::new("two", 2),
        Task::new("reserved", 3).with_id(u64::MAX),
        Task::new("four", 4),
    ];
    let err = tasks.put_all(&mut batch).unwrap_err();
    assert!(matches!(err, ObxError::InvalidArgument { .. }), "{err}");

    assert_eq!(tasks.count().unwrap(), 1);
    assert_eq!(batch[0].id, 0);
    assert_eq!(batch[1].id, 0);
}

#[test]
fn put_all_rolls_back_on_binding_failure() {
    let (_ob, tasks) = open_tasks();

    let mut batch = vec![Task::new("ok", 1), Task::new("bad", -1)];
    let err = tasks.put_all(&mut batch).unwrap_err();
    assert!(matches!(err, ObxError::Binding { .. }));
    assert_eq!(tasks.count().unwrap(), 0);
}

#[test]
fn remove_and_not_found() {
    let (_ob, tasks) = open_tasks();
    let id = tasks.put(&mut Task::new("short-lived", 1)).unwrap();

    tasks.remove(id).unwrap();
    assert!(tasks.get(id).unwrap().is_none());
    assert!(!tasks.contains(id).unwrap());

    let err = tasks.remove(id).unwrap_err();
    assert!(err.is_not_found(), "{err}");
}

#[test]
fn remove_all_then_count_is_zero() {
    let (_ob, tasks) = open_tasks();
    let mut batch: Vec<Task> = (0..25).map(|i| Task::new(format!("t{i}"), i)).collect();
    tasks.put_all(&mut batch).unwrap();
    assert_eq!(tasks.count().unwrap(), 25);

    tasks.remove_all().unwrap();
    assert_eq!(tasks.count().unwrap(), 0);
    assert!(tasks.get_all().unwrap().is_empty());

    // Removing from an empty box is fine.
    tasks.remove_all().unwrap();
}

#[test]
fn get_all_returns_every_object() {
    let (_ob, tasks) = open_tasks();
    let mut batch: Vec<Task> = (0..5).map(|i| Task::new(format!("t{i}"), i)).collect();
    tasks.put_all(&mut batch).unwrap();

    let mut all = tasks.get_all().unwrap();
    all.sort_by_key(|t| t.id);
    assert_eq!(all, batch);
}

#[test]
fn boxes_are_isolated_per_type() {
    let ob = open_store(Config::default());
    let tasks = ob.box_for::<Task>().unwrap();
    let tags = ob.box_for::<Tag>().unwrap();

    tasks.put(&mut Task::new("task", 1)).unwrap();
    let mut tag = Tag {
        id: 0,
        name: "urgent".to_string(),
    };
    let tag_id = tags.put(&mut tag).unwrap();

    // Each type has its own ID sequence.
    assert_eq!(tag_id, 1);
    assert_eq!(tasks.count().unwrap(), 1);
    assert_eq!(tags.count().unwrap(), 1);

    tasks.remove_all().unwrap();
    assert_eq!(tags.get(tag_id).unwrap().unwrap(), tag);
}

#[test]
fn operations_after_close_fail() {
    let (_ob, tasks) = open_tasks();
    let id = tasks.put(&mut Task::new("x", 1)).unwrap();
    tasks.close().unwrap();

    assert!(tasks.get(id).unwrap_err().is_closed());
    assert!(tasks.count().unwrap_err().is_closed());
    assert!(tasks.contains(id).unwrap_err().is_closed());
    assert!(tasks.remove(id).unwrap_err().is_closed());
    assert!(tasks.put_all(&mut [Task::new("y", 1)]).unwrap_err().is_closed());
    assert!(tasks.close().unwrap_err().is_closed());
}

#[test]
fn store_close_closes_boxes() {
    let (ob, tasks) = open_tasks();
    tasks.put(&mut Task::new("x", 1)).unwrap();

    ob.close().unwrap();
    assert!(tasks.is_closed());
    assert!(tasks.get_all().unwrap_err().is_closed());
}

#[test]
fn box_for_during_close_never_outlives_the_store() {
    let ob = open_store(Config::default());
    let gated = ob.box_for::<Gated>().unwrap();
    let gate = Gate::new();

    thread::scope(|s| {
        let holder = s.spawn(|| gated.put(&mut Gated::gated("held", &gate)));
        gate.entered.wait();

        // Close waits on the in-flight put; the late box_for lands meanwhile.
        let closer = s.spawn(|| ob.close());
        thread::sleep(Duration::from_millis(50));
        let late = s.spawn(|| ob.box_for::<Task>());
        thread::sleep(Duration::from_millis(50));
        gate.release.wait();

        holder.join().unwrap().unwrap();
        closer.join().unwrap().unwrap();
        match late.join().unwrap() {
            Ok(tasks) => {
                assert!(tasks.is_closed());
                assert!(tasks.close().unwrap_err().is_closed());
            }
            Err(err) => assert!(err.is_closed(), "{err}"),
        }
    });

    assert!(ob.is_closed());
    assert!(gated.is_closed());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn arbitrary_tasks_round_trip(
        text in "\\PC{1,40}",
        priority in 0i64..10_000,
        done in any::<bool>(),
        id in prop_oneof![Just(0u64), 1u64..1_000_000],
    ) {
        let (_ob, tasks) = open_tasks();
        let mut task = Task { id, text, priority, done };

        let assigned = tasks.put(&mut task).unwrap();
        if id != 0 {
            prop_assert_eq!(assigned, id);
        }
        prop_assert_eq!(tasks.get(assigned).unwrap(), Some(task));
    }
}
