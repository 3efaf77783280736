//! The ambient cursor.
//!
//! While a view runs, the cursor of its pass sits on a thread-local stack so
//! helper functions can emit nodes without threading the cursor through
//! every call. Nested installs (a fallback view, a pass started from inside
//! another) shadow the outer cursor until they return.

use std::cell::RefCell;
use std::mem;

use crate::cursor::Cursor;
use crate::runtime;

thread_local! {
    static CURRENT_CURSOR: RefCell<Vec<*mut ()>> = RefCell::new(Vec::new());
}

pub(crate) struct Guard {
    _private: (),
}

impl Drop for Guard {
    fn drop(&mut self) {
        CURRENT_CURSOR.with(|stack| {
            stack.borrow_mut().pop();
        });
        runtime::pop_active_runtime();
    }
}

/// Pushes `cursor` as the ambient one until the returned guard drops.
pub(crate) fn push(cursor: &mut Cursor<'_>) -> Guard {
    runtime::push_active_runtime(&cursor.runtime_handle());
    CURRENT_CURSOR.with(|stack| stack.borrow_mut().push(cursor as *mut Cursor<'_> as *mut ()));
    Guard { _private: () }
}

/// Runs `f` with the innermost installed cursor.
///
/// # Panics
///
/// Panics if no cursor is installed on this thread.
pub fn with_current_cursor<R>(f: impl FnOnce(&mut Cursor<'_>) -> R) -> R {
    match with_current_cursor_opt(f) {
        Some(result) => result,
        None => panic!("no cursor installed"),
    }
}

/// Like [`with_current_cursor`], but returns `None` outside a pass.
pub fn with_current_cursor_opt<R>(f: impl FnOnce(&mut Cursor<'_>) -> R) -> Option<R> {
    let ptr = CURRENT_CURSOR.with(|stack| stack.borrow().last().copied())?;
    // SAFETY: the pointer was pushed by `push` from a live `&mut Cursor`
    // and is popped by the guard before that borrow ends.
    let cursor = unsafe { &mut *(ptr as *mut Cursor<'static>) };
    let cursor: &mut Cursor<'_> =
        unsafe { mem::transmute::<&mut Cursor<'static>, &mut Cursor<'_>>(cursor) };
    Some(f(cursor))
}
