use std::cell::RefCell;
use std::rc::Rc;

use imtree_testing::prelude::*;

#[derive(Debug, Clone, PartialEq)]
struct Todo {
    id: u32,
    title: String,
    done: bool,
}

struct Change(String);

fn todo(id: u32, title: &str) -> Todo {
    Todo {
        id,
        title: title.to_owned(),
        done: false,
    }
}

type Model = Rc<RefCell<Vec<Todo>>>;

fn todo_view(model: Model) -> impl FnMut(&mut Cursor<'_>) + 'static {
    move |c| {
        c.element("input");
        c.set_attribute("placeholder", "What needs doing?");
        if let Some(title) = c.hook("change", "title", |event: &Change| event.0.clone()) {
            let mut todos = model.borrow_mut();
            let id = todos.iter().map(|todo| todo.id).max().unwrap_or(0) + 1;
            todos.push(Todo {
                id,
                title,
                done: false,
            });
        }

        let mut removed = Vec::new();
        c.enter_container("ul");
        for todo in model.borrow_mut().iter_mut() {
            let item = c.enter_container("li");
            c.set_attribute("data-id", &todo.id.to_string());

            c.element("button");
            c.set_attribute("data-action", "toggle");
            if c.fired("click") {
                todo.done = !todo.done;
            }
            if todo.done {
                c.append_class("checked");
            }

            c.text(&todo.title);

            c.element("button");
            c.set_attribute("data-action", "remove");
            if c.fired("click") {
                c.mark_removed(item);
                removed.push(todo.id);
            }
            c.leave_container();
        }
        c.leave_container();
        model.borrow_mut().retain(|todo| !removed.contains(&todo.id));
    }
}

fn button(harness: &ViewHarness, id: u32, action: &str) -> NodeId {
    let item = harness
        .find_by_attribute("data-id", &id.to_string())
        .expect("todo item");
    harness
        .host()
        .children(item)
        .into_iter()
        .find(|node| harness.host().attribute(*node, "data-action") == Some(action))
        .expect("todo button")
}

fn setup() -> (ViewHarness, Model) {
    let model: Model = Rc::new(RefCell::new(vec![todo(1, "Write docs"), todo(2, "Review")]));
    let mut harness = ViewHarness::new();
    harness
        .set_content(todo_view(Rc::clone(&model)))
        .expect("initial render");
    (harness, model)
}

#[test]
fn renders_the_initial_list() {
    let (harness, _model) = setup();
    let items = harness.find_all_by_tag("li");
    assert_eq!(items.len(), 2);
    assert_eq!(harness.text_content(items[0]), "Write docs");
    let input = harness.find_by_tag("input").expect("input");
    assert_eq!(
        harness.host().attribute(input, "placeholder"),
        Some("What needs doing?")
    );
}

#[test]
fn change_event_adds_a_todo_on_the_next_pass() {
    let (mut harness, model) = setup();

    let passes = harness
        .fire("input", "change", &Change("Buy milk".to_owned()))
        .expect("pump");

    assert_eq!(passes, 1);
    assert_eq!(model.borrow().len(), 3);
    let items = harness.find_all_by_tag("li");
    assert_eq!(items.len(), 3);
    assert_eq!(harness.text_content(items[2]), "Buy milk");
    assert_eq!(harness.host().attribute(items[2], "data-id"), Some("3"));

    // The change was consumed; another pass does not add it again.
    harness.rerender().expect("rerender");
    assert_eq!(model.borrow().len(), 3);
}

#[test]
fn toggle_marks_the_button_and_persists() {
    let (mut harness, model) = setup();
    let toggle = button(&harness, 1, "toggle");

    harness.dispatch(toggle, "click", &());
    harness.pump_until_idle().expect("pump");

    assert!(model.borrow()[0].done);
    assert_eq!(harness.host().attribute(toggle, "class"), Some("checked"));

    harness.host_mut().clear_ops();
    let report = harness.rerender().expect("rerender");
    assert_eq!(report.attribute_writes, 0);
    assert_eq!(harness.host().attribute(toggle, "class"), Some("checked"));
}

#[test]
fn remove_detaches_only_the_removed_item() {
    let (mut harness, model) = setup();
    harness
        .fire("input", "change", &Change("Buy milk".to_owned()))
        .expect("pump");
    let before = harness.find_all_by_tag("li");
    let remove = button(&harness, 1, "remove");

    harness.dispatch(remove, "click", &());
    harness.pump_until_idle().expect("pump");

    let report = harness.last_report().expect("report");
    assert_eq!(report.created, 0);
    assert_eq!(report.detached, 1);
    assert_eq!(harness.find_all_by_tag("li"), before[1..].to_vec());
    assert_eq!(
        model.borrow().iter().map(|todo| todo.id).collect::<Vec<_>>(),
        vec![2, 3]
    );

    let report = harness.rerender().expect("rerender");
    assert!(report.is_structurally_idle());
    assert_eq!(harness.text_content(before[1]), "Review");
}
