//! Scope stack
//!
//! Every thread owns a stack of active scope values. A [`ScopeGuard`] pops
//! its own entry when dropped, so release happens exactly once on every exit
//! path: normal fall-through, `?` early return, or a panic unwinding the
//! block. Guards are not `Send`; they must be dropped on the thread that
//! created them.
//!
//! Release is by identity, not by position. Dropping an outer guard before
//! an inner one removes the outer entry and leaves the inner one in place.
//!
//! A new thread starts with an empty stack. To carry scopes across, capture
//! a [`ScopeChain`] in the parent and call [`ScopeChain::enter`] in the child.
//!
//! Tokio tasks that share a thread also share its stack, so each entry is
//! tagged with the task that pushed it (or none, outside any task) and only
//! the current task's entries are visible. A guard held across `.await` in a
//! `spawn_local` task or a `block_on` future stays private to that path.
//! Async code that wants scopes to follow it between worker threads uses
//! [`in_task_scope`], which keeps them in task-local storage.

use serde::Serialize;
use std::cell::RefCell;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::task;

use crate::formatter;
use crate::log_record::LogArg;

static NEXT_SCOPE_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static STACK: RefCell<Vec<StackEntry>> = const { RefCell::new(Vec::new()) };
}

struct StackEntry {
    id: u64,
    owner: Option<task::Id>,
    value: ScopeValue,
}

impl StackEntry {
    fn visible_to(&self, owner: Option<task::Id>) -> bool {
        self.owner == owner
    }
}

tokio::task_local! {
    static TASK_SCOPES: ScopeChain;
}

/// One entry on the scope stack.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeValue {
    pub template: Option<String>,
    pub message: String,
    pub args: Vec<LogArg>,
}

impl ScopeValue {
    /// Renders `template` with `args` into a scope value.
    pub fn new(template: &str, args: &[LogArg]) -> Self {
        let (message, args) = formatter::render_and_bind(Some(template), args);
        ScopeValue {
            template: Some(template.to_string()),
            message,
            args,
        }
    }

    /// A scope that is just a piece of text.
    pub fn text(message: impl Into<String>) -> Self {
        ScopeValue {
            template: None,
            message: message.into(),
            args: Vec::new(),
        }
    }
}

impl From<&str> for ScopeValue {
    fn from(message: &str) -> Self {
        ScopeValue::text(message)
    }
}

impl From<String> for ScopeValue {
    fn from(message: String) -> Self {
        ScopeValue::text(message)
    }
}

/// Snapshot of active scopes, outermost first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScopeChain {
    values: Vec<ScopeValue>,
}

impl ScopeChain {
    /// Captures the scopes active on the calling thread or task.
    pub fn capture() -> Self {
        current_chain()
    }

    pub fn values(&self) -> &[ScopeValue] {
        &self.values
    }

    pub fn into_values(self) -> Vec<ScopeValue> {
        self.values
    }

    pub fn messages(&self) -> Vec<&str> {
        self.values.iter().map(|v| v.message.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Pushes every captured value onto the calling thread's stack. The
    /// returned guard releases all of them together.
    pub fn enter(&self) -> ScopeGuard {
        let ids = self.values.iter().cloned().map(push_entry).collect();
        ScopeGuard::new(ids)
    }
}

/// RAII handle for one or more scope entries.
#[must_use = "the scope is released as soon as the guard is dropped"]
#[derive(Debug)]
pub struct ScopeGuard {
    ids: Vec<u64>,
    _thread_bound: PhantomData<*const ()>,
}

impl ScopeGuard {
    fn new(ids: Vec<u64>) -> Self {
        ScopeGuard {
            ids,
            _thread_bound: PhantomData,
        }
    }

    /// Releases the scope now instead of at the end of the block.
    pub fn release(self) {}
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        let ids = std::mem::take(&mut self.ids);
        let _ = STACK.try_with(|stack| {
            if let Ok(mut stack) = stack.try_borrow_mut() {
                stack.retain(|entry| !ids.contains(&entry.id));
            }
        });
    }
}

fn push_entry(value: ScopeValue) -> u64 {
    let id = NEXT_SCOPE_ID.fetch_add(1, Ordering::Relaxed);
    let owner = task::try_id();
    STACK.with(|stack| stack.borrow_mut().push(StackEntry { id, owner, value }));
    id
}

/// Pushes `value` onto the calling thread's stack.
pub fn push(value: impl Into<ScopeValue>) -> ScopeGuard {
    ScopeGuard::new(vec![push_entry(value.into())])
}

/// Task-local scopes (outermost) followed by the entries this thread or
/// task pushed.
pub fn current_chain() -> ScopeChain {
    let mut values = TASK_SCOPES
        .try_with(|chain| chain.values.clone())
        .unwrap_or_default();
    let owner = task::try_id();
    STACK.with(|stack| {
        values.extend(
            stack
                .borrow()
                .iter()
                .filter(|entry| entry.visible_to(owner))
                .map(|entry| entry.value.clone()),
        );
    });
    ScopeChain { values }
}

/// Number of stack entries visible to the calling thread or task.
pub fn depth() -> usize {
    let owner = task::try_id();
    STACK.with(|stack| {
        stack
            .borrow()
            .iter()
            .filter(|entry| entry.visible_to(owner))
            .count()
    })
}

/// Runs `future` with `value` appended to the task-local scopes. Nested
/// calls accumulate; tasks spawned from inside start without them.
pub async fn in_task_scope<F>(value: impl Into<ScopeValue>, future: F) -> F::Output
where
    F: Future,
{
    let mut chain = TASK_SCOPES.try_with(|chain| chain.clone()).unwrap_or_default();
    chain.values.push(value.into());
    TASK_SCOPES.scope(chain, future).await
}
