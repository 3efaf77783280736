use super::*;

struct Input(String);

fn reconciler() -> Reconciler<MemoryHost> {
    let mut host = MemoryHost::new();
    let root = host.create_element("root");
    Reconciler::new(host, root)
}

fn todo_item(label: &str, done: bool) {
    container("li", || {
        if done {
            append_class("done");
        }
        text(label);
    });
}

#[test]
fn ambient_calls_reach_the_installed_cursor() {
    let mut r = reconciler();
    r.frame(|_| {
        container("ul", || {
            todo_item("write tests", true);
            todo_item("ship", false);
        });
    })
    .unwrap();

    assert_eq!(
        r.host().dump(r.root()),
        "<root><ul><li class=\"done\">write tests</li><li>ship</li></ul></root>"
    );
}

#[test]
fn ambient_and_explicit_calls_share_one_cursor() {
    let mut r = reconciler();
    r.frame(|c| {
        c.enter_container("nav");
        element("a");
        set_attribute("href", "/");
        assert_eq!(c.last_touched(), last_touched());
        c.leave_container();
        assert_eq!(current_frame(), 1);
    })
    .unwrap();

    assert_eq!(
        r.host().dump(r.root()),
        "<root><nav><a href=\"/\"></a></nav></root>"
    );
}

#[test]
fn ambient_state_and_hooks() {
    let mut r = reconciler();
    let mut typed = Vec::new();
    let view = |typed: &mut Vec<Option<String>>| {
        element("input");
        let value = hook("input", "value", |event: &Input| event.0.clone());
        if let Some(value) = &value {
            set_state("last", value.clone());
        }
        typed.push(value);
        with_element_state(|state| state.get::<String>("last").cloned())
    };

    r.frame(|_| {
        view(&mut typed);
    })
    .unwrap();
    let input = r.host().children(r.root())[0];
    r.host_mut()
        .dispatch(input, "input", &Input("hello".to_owned()));
    assert!(r.is_dirty());

    let mut stored = None;
    r.frame(|_| {
        stored = view(&mut typed);
    })
    .unwrap();

    assert_eq!(typed, vec![None, Some("hello".to_owned())]);
    assert_eq!(stored, Some("hello".to_owned()));
}

#[test]
fn ambient_mark_removed_and_rerender() {
    let mut r = reconciler();
    r.frame(|_| {
        element("a");
        element("b");
        element("c");
    })
    .unwrap();
    let b = r.host().children(r.root())[1];

    r.frame(|_| {
        element("a");
        mark_removed(b);
        element("c");
        request_rerender();
        assert!(is_dirty());
        assert!(!fired("click"));
        assert_eq!(state("visits", 0_u8), 0);
    })
    .unwrap();

    assert_eq!(
        r.host().dump(r.root()),
        "<root><a></a><c></c></root>"
    );
    assert!(r.is_dirty());
}

#[test]
fn ambient_helpers_cover_styles_and_stable_ids() {
    let mut r = reconciler();
    r.frame(|_| {
        enter_container_with_id("dialog", "modal");
        set_style("display:block;");
        append_style("top:0;");
        style_property("left", "0");
        assert_eq!(
            get_attribute("style").as_deref(),
            Some("display:block;top:0;left:0;")
        );
        leave_container();
        element_with_id("hr", "rule");
    })
    .unwrap();

    let modal = r.stable_node("modal").unwrap();
    assert_eq!(
        r.host().attribute(modal, "style"),
        Some("display:block;top:0;left:0;")
    );
    assert!(r.stable_node("rule").is_some());
}

#[test]
#[should_panic(expected = "no cursor installed")]
fn ambient_call_outside_a_pass_panics() {
    text("orphan");
}

#[test]
fn with_current_cursor_opt_is_none_between_passes() {
    assert!(with_current_cursor_opt(|cursor| cursor.current_frame()).is_none());
    let mut r = reconciler();
    r.frame(|_| {
        assert_eq!(with_current_cursor_opt(|cursor| cursor.current_frame()), Some(1));
    })
    .unwrap();
}
