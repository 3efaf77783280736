use super::*;
use crate::runtime::Runtime;
use crate::TestScheduler;
use std::sync::Arc;

#[derive(Debug)]
struct Input {
    value: String,
}

fn runtime() -> Runtime {
    Runtime::new(Arc::new(TestScheduler::default()))
}

#[test]
fn list_finds_entries_by_event_and_key() {
    let mut hooks = HookList::default();
    let click = hooks.register("click", "save");
    hooks.register("click", "cancel");

    let found = hooks.find("click", "save").unwrap();
    assert!(Rc::ptr_eq(&found, &click));
    assert!(hooks.find("input", "save").is_none());
    assert_eq!(hooks.len(), 2);
}

#[test]
fn value_is_visible_only_in_the_following_frame() {
    let runtime = runtime();
    let mut hooks = HookList::default();
    let slot = hooks.register("input", "text");
    let mut listener = listener(
        Rc::downgrade(&slot),
        runtime.handle(),
        typed("input", |event: &Input| event.value.clone()),
    );

    runtime.begin_pass();
    runtime.end_pass();
    listener(&Input {
        value: "hi".to_owned(),
    });

    assert!(runtime.is_dirty());
    assert_eq!(slot.borrow().fired_frame(), Some(1));
    assert_eq!(slot.borrow().read::<String>(1), None);
    assert_eq!(slot.borrow().read::<String>(2), Some("hi".to_owned()));
    assert_eq!(slot.borrow().read::<String>(3), None);
}

#[test]
fn mismatched_payload_is_ignored() {
    let runtime = runtime();
    let mut hooks = HookList::default();
    let slot = hooks.register("input", "text");
    let mut listener = listener(
        Rc::downgrade(&slot),
        runtime.handle(),
        typed("input", |event: &Input| event.value.len()),
    );
    runtime.begin_pass();
    runtime.end_pass();

    listener(&42_u32);

    assert!(!runtime.is_dirty());
    assert_eq!(slot.borrow().fired_frame(), None);
}

#[test]
fn reading_with_another_type_yields_nothing() {
    let runtime = runtime();
    let mut hooks = HookList::default();
    let slot = hooks.register("input", "text");
    let mut listener = listener(
        Rc::downgrade(&slot),
        runtime.handle(),
        typed("input", |event: &Input| event.value.clone()),
    );
    runtime.begin_pass();
    runtime.end_pass();
    listener(&Input {
        value: "hi".to_owned(),
    });

    assert_eq!(slot.borrow().read::<usize>(2), None);
    assert_eq!(slot.borrow().read::<String>(2), Some("hi".to_owned()));
}

#[test]
fn listener_outliving_its_slot_does_nothing() {
    let runtime = runtime();
    let mut hooks = HookList::default();
    let slot = hooks.register("click", FIRED_KEY);
    let mut listener = listener(Rc::downgrade(&slot), runtime.handle(), presence());
    runtime.begin_pass();
    runtime.end_pass();
    drop(slot);
    drop(hooks);

    listener(&());

    assert!(!runtime.is_dirty());
}
