//! Toast notification queue.
//!
//! Each entry walks `created -> visible -> hiding -> removed`.  New entries
//! go to the head; overflow beyond `max_notifications` is dropped from the
//! tail immediately.  Timed expiry and the post-animation purge are
//! transitions on a [`Timeline`] that fire from [`NotificationStore::tick`].

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use serde::Serialize;

use crate::constants::{
    DEFAULT_MAX_NOTIFICATIONS, ERROR_DURATION_MS, INFO_DURATION_MS, NOTIFICATION_ANIMATION_MS,
    SUCCESS_DURATION_MS, WARNING_DURATION_MS,
};
use crate::error::ApiError;
use crate::scheduling::{Clock, Timeline, TimerId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Error,
    Warning,
    Info,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationKind::Success => "success",
            NotificationKind::Error => "error",
            NotificationKind::Warning => "warning",
            NotificationKind::Info => "info",
        }
    }

    pub fn default_title(self) -> &'static str {
        match self {
            NotificationKind::Success => "成功",
            NotificationKind::Error => "错误",
            NotificationKind::Warning => "警告",
            NotificationKind::Info => "提示",
        }
    }

    pub fn default_duration_ms(self) -> u64 {
        match self {
            NotificationKind::Success => SUCCESS_DURATION_MS,
            NotificationKind::Error => ERROR_DURATION_MS,
            NotificationKind::Warning => WARNING_DURATION_MS,
            NotificationKind::Info => INFO_DURATION_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    /// `0` means sticky: only a manual `remove` hides it.
    pub duration_ms: u64,
    pub created_at_ms: u64,
    pub visible: bool,
}

#[derive(Debug, Clone, PartialEq)]
enum Transition {
    Expire(String),
    Purge(String),
    PurgeAll,
}

#[derive(Debug, Default)]
struct QueueState {
    items: Vec<Notification>,
    max: usize,
    timeline: Timeline<Transition>,
    expiries: HashMap<String, TimerId>,
}

pub struct NotificationStore {
    clock: Rc<dyn Clock>,
    state: RefCell<QueueState>,
    revision: Cell<u64>,
}

impl NotificationStore {
    pub fn new(clock: Rc<dyn Clock>) -> Self {
        Self::with_max(clock, DEFAULT_MAX_NOTIFICATIONS)
    }

    pub fn with_max(clock: Rc<dyn Clock>, max: usize) -> Self {
        Self {
            clock,
            state: RefCell::new(QueueState {
                max: max.max(1),
                ..Default::default()
            }),
            revision: Cell::new(0),
        }
    }

    /// Bumped on every change so renderers can skip redundant redraws.
    pub fn revision(&self) -> u64 {
        self.revision.get()
    }

    fn touch(&self) {
        self.revision.set(self.revision.get().wrapping_add(1));
    }

    pub fn add(&self, kind: NotificationKind, title: &str, message: &str, duration_ms: u64) -> String {
        let now = self.clock.now_ms();
        let id = uuid::Uuid::new_v4().to_string();
        let mut state = self.state.borrow_mut();

        state.items.insert(
            0,
            Notification {
                id: id.clone(),
                kind,
                title: title.to_string(),
                message: message.to_string(),
                duration_ms,
                created_at_ms: now,
                visible: true,
            },
        );

        let max = state.max;
        if state.items.len() > max {
            let evicted: Vec<Notification> = state.items.drain(max..).collect();
            for old in evicted {
                if let Some(timer) = state.expiries.remove(&old.id) {
                    state.timeline.cancel(timer);
                }
                log::debug!("notification {} evicted", old.id);
            }
        }

        if duration_ms > 0 {
            let timer = state
                .timeline
                .schedule(now + duration_ms, Transition::Expire(id.clone()));
            state.expiries.insert(id.clone(), timer);
        }

        drop(state);
        self.touch();
        id
    }

    /// Start hiding `id`.  Unknown or already-hiding ids are ignored.
    pub fn remove(&self, id: &str) {
        let now = self.clock.now_ms();
        self.hide(id, now);
    }

    fn hide(&self, id: &str, at_ms: u64) {
        let mut state = self.state.borrow_mut();
        let Some(entry) = state.items.iter_mut().find(|n| n.id == id) else {
            return;
        };
        if !entry.visible {
            return;
        }
        entry.visible = false;

        if let Some(timer) = state.expiries.remove(id) {
            state.timeline.cancel(timer);
        }
        state.timeline.schedule(
            at_ms + NOTIFICATION_ANIMATION_MS,
            Transition::Purge(id.to_string()),
        );
        drop(state);
        self.touch();
    }

    /// Hide everything, then empty the queue once the animation is over.
    pub fn clear_all(&self) {
        let now = self.clock.now_ms();
        let mut state = self.state.borrow_mut();
        for entry in state.items.iter_mut() {
            entry.visible = false;
        }
        let expiries: Vec<TimerId> = state.expiries.drain().map(|(_, t)| t).collect();
        for timer in expiries {
            state.timeline.cancel(timer);
        }
        state
            .timeline
            .schedule(now + NOTIFICATION_ANIMATION_MS, Transition::PurgeAll);
        drop(state);
        self.touch();
    }

    /// Fire every transition that is due.  Returns how many fired.
    pub fn tick(&self) -> usize {
        let now = self.clock.now_ms();
        let mut fired = 0;
        loop {
            let next = self.state.borrow_mut().timeline.pop_due(now);
            let Some((due, transition)) = next else {
                break;
            };
            fired += 1;
            match transition {
                Transition::Expire(id) => {
                    self.state.borrow_mut().expiries.remove(&id);
                    self.hide(&id, due);
                }
                Transition::Purge(id) => {
                    let mut state = self.state.borrow_mut();
                    if let Some(pos) = state.items.iter().position(|n| n.id == id) {
                        state.items.remove(pos);
                    }
                }
                Transition::PurgeAll => {
                    self.state.borrow_mut().items.clear();
                }
            }
        }
        if fired > 0 {
            self.touch();
        }
        fired
    }

    pub fn success(&self, message: &str) -> String {
        self.notify(NotificationKind::Success, message)
    }

    pub fn error(&self, message: &str) -> String {
        self.notify(NotificationKind::Error, message)
    }

    pub fn warning(&self, message: &str) -> String {
        self.notify(NotificationKind::Warning, message)
    }

    pub fn info(&self, message: &str) -> String {
        self.notify(NotificationKind::Info, message)
    }

    /// Add with the kind's default title and duration.
    pub fn notify(&self, kind: NotificationKind, message: &str) -> String {
        self.add(kind, kind.default_title(), message, kind.default_duration_ms())
    }

    /// Error toast for a failed API call: the server's message when it sent
    /// one, otherwise `fallback`.
    pub fn api_error(&self, error: &ApiError, fallback: &str) -> String {
        self.error(&error.message_or(fallback))
    }

    /// Snapshot of the queue, newest first.
    pub fn notifications(&self) -> Vec<Notification> {
        self.state.borrow().items.clone()
    }

    pub fn visible(&self) -> Vec<Notification> {
        self.state
            .borrow()
            .items
            .iter()
            .filter(|n| n.visible)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.state.borrow().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.borrow().items.is_empty()
    }

    pub fn max_notifications(&self) -> usize {
        self.state.borrow().max
    }

    /// Earliest pending transition, so a driver can sleep until then.
    pub fn next_due(&self) -> Option<u64> {
        self.state.borrow().timeline.next_due()
    }
}
