use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::mpsc::{self, Sender, TryRecvError};
use std::thread;
use std::time::Duration;

use imtree_core::{self as ui, Host, MemoryHost, NodeId};
use imtree_runtime_std::{FrameLoop, LoopConfig};

const SCRIPT_STEP: Duration = Duration::from_millis(25);

struct Todo {
    id: u32,
    title: String,
    done: bool,
}

#[derive(Default)]
struct App {
    todos: Vec<Todo>,
    next_id: u32,
}

impl App {
    fn add(&mut self, title: &str) {
        if title.is_empty() {
            return;
        }
        self.next_id += 1;
        self.todos.push(Todo {
            id: self.next_id,
            title: title.to_owned(),
            done: false,
        });
    }

    fn remaining(&self) -> usize {
        self.todos.iter().filter(|todo| !todo.done).count()
    }
}

/// Payload of the `submit` event on the new-todo input.
struct TextInput(String);

struct Click;

enum Command {
    Add(String),
    Toggle(u32),
    Remove(u32),
    ClearCompleted,
    Quit,
}

fn todo_app(app: &RefCell<App>) {
    ui::container("header", || {
        ui::container("h1", || {
            ui::text("todos");
        });
        ui::element("input");
        ui::set_attribute("placeholder", "What needs to be done?");
        ui::append_class("new-todo");
        if let Some(title) = ui::hook("submit", "new-todo", |event: &TextInput| event.0.clone()) {
            app.borrow_mut().add(title.trim());
        }
    });

    let mut rendered = Vec::new();
    let mut removed = Vec::new();
    ui::container("ul", || {
        for todo in app.borrow_mut().todos.iter_mut() {
            let node = todo_item(todo);
            if todo_removed(node) {
                removed.push(todo.id);
            }
            rendered.push((todo.id, todo.done, node));
        }
    });

    ui::container("footer", || {
        let remaining = app.borrow().remaining();
        let unit = if remaining == 1 { "item" } else { "items" };
        ui::text(&format!("{remaining} {unit} left"));

        ui::element("button");
        ui::append_class("clear-completed");
        if ui::fired("click") {
            for (id, done, node) in &rendered {
                if *done && !removed.contains(id) {
                    ui::mark_removed(*node);
                    removed.push(*id);
                }
            }
        }
    });

    if !removed.is_empty() {
        log::debug!("removing todos {removed:?}");
        app.borrow_mut()
            .todos
            .retain(|todo| !removed.contains(&todo.id));
        ui::request_rerender();
    }
}

fn todo_item(todo: &mut Todo) -> NodeId {
    let node = ui::enter_container("li");
    ui::set_attribute("data-id", &todo.id.to_string());

    ui::element("input");
    ui::set_attribute("type", "checkbox");
    if ui::fired("click") {
        todo.done = !todo.done;
    }
    if todo.done {
        ui::set_attribute("checked", "");
    }

    ui::container("label", || {
        ui::text(&todo.title);
    });

    ui::element("button");
    ui::append_class("destroy");
    ui::leave_container();
    node
}

/// Whether the destroy button of the item just rendered was clicked; queues
/// the item for removal if so.
fn todo_removed(node: NodeId) -> bool {
    let clicked = ui::fired("click");
    if clicked {
        ui::mark_removed(node);
    }
    clicked
}

fn find(host: &MemoryHost, root: NodeId, matches: impl Fn(NodeId) -> bool) -> Option<NodeId> {
    let mut pending = vec![root];
    while let Some(node) = pending.pop() {
        if matches(node) {
            return Some(node);
        }
        pending.extend(host.children(node).into_iter().rev());
    }
    None
}

fn item_control(host: &MemoryHost, root: NodeId, id: u32, tag: &str) -> Option<NodeId> {
    let id = id.to_string();
    let item = find(host, root, |node| {
        host.tag(node) == Some("li") && host.attribute(node, "data-id") == Some(id.as_str())
    })?;
    host.children(item)
        .into_iter()
        .find(|child| host.tag(*child) == Some(tag))
}

fn deliver(frame_loop: &mut FrameLoop<MemoryHost>, command: Command) {
    let root = frame_loop.reconciler().root();
    let host = frame_loop.host();
    let by_class = |class: &'static str| {
        find(host, root, move |node| host.attribute(node, "class") == Some(class))
    };
    let (target, event, payload): (Option<NodeId>, &str, Box<dyn Any>) = match command {
        Command::Add(title) => (by_class("new-todo"), "submit", Box::new(TextInput(title))),
        Command::Toggle(id) => (item_control(host, root, id, "input"), "click", Box::new(Click)),
        Command::Remove(id) => (item_control(host, root, id, "button"), "click", Box::new(Click)),
        Command::ClearCompleted => (by_class("clear-completed"), "click", Box::new(Click)),
        Command::Quit => return,
    };
    match target {
        Some(node) => {
            frame_loop.host_mut().dispatch(node, event, &*payload);
        }
        None => log::warn!("no target for `{event}`"),
    }
}

/// Plays the part of a user, one command per step.
fn script(commands: Sender<Command>) {
    let steps = [
        Command::Add("Buy milk".to_owned()),
        Command::Add("Walk the dog".to_owned()),
        Command::Toggle(1),
        Command::Toggle(3),
        Command::Remove(2),
        Command::ClearCompleted,
        Command::Quit,
    ];
    for step in steps {
        thread::sleep(SCRIPT_STEP);
        if commands.send(step).is_err() {
            return;
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let app = Rc::new(RefCell::new(App::default()));
    app.borrow_mut().add("Read the docs");

    let mut host = MemoryHost::new();
    let root = host.create_element("body");
    let view_app = Rc::clone(&app);
    let mut frame_loop = FrameLoop::with_config(host, root, LoopConfig::default(), move |_| {
        todo_app(&view_app);
    });
    frame_loop
        .scheduler()
        .set_waker(|| log::trace!("frame requested"));

    let (sender, receiver) = mpsc::channel();
    let user = thread::spawn(move || script(sender));

    loop {
        match receiver.try_recv() {
            Ok(Command::Quit) | Err(TryRecvError::Disconnected) => break,
            Ok(command) => deliver(&mut frame_loop, command),
            Err(TryRecvError::Empty) => {}
        }
        if frame_loop.tick() {
            log::info!(
                "frame {}: {}",
                frame_loop.reconciler().current_frame(),
                frame_loop.host().dump(root)
            );
        }
        thread::sleep(frame_loop.config().poll_interval);
    }

    if user.join().is_err() {
        log::error!("script thread panicked");
    }
    if let Some(stats) = frame_loop.timings().stats() {
        log::info!(
            "{} frames, avg {:?}, min {:?}, max {:?}, last {:?}",
            frame_loop.timings().len(),
            stats.avg,
            stats.min,
            stats.max,
            stats.last
        );
    }
    log::info!("{} todo(s) left", app.borrow().todos.len());
}
