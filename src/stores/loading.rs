//! Global progress bar plus independent per-module spinners.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::future::Future;
use std::rc::Rc;

use crate::constants::{DEFAULT_LOADING_MESSAGE, LOADING_HIDE_DELAY_MS};
use crate::scheduling::{Clock, Timeline, TimerId};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModuleLoading {
    pub active: bool,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GlobalLoading {
    pub is_loading: bool,
    pub message: String,
    /// Always within `0..=100`.
    pub progress: u8,
}

#[derive(Debug, Default)]
struct LoadingState {
    global: GlobalLoading,
    modules: BTreeMap<String, ModuleLoading>,
    loading_count: usize,
    timeline: Timeline<()>,
    pending_reset: Option<TimerId>,
}

pub struct LoadingStore {
    clock: Rc<dyn Clock>,
    state: RefCell<LoadingState>,
    revision: Cell<u64>,
}

impl LoadingStore {
    pub fn new(clock: Rc<dyn Clock>) -> Self {
        Self {
            clock,
            state: RefCell::new(LoadingState::default()),
            revision: Cell::new(0),
        }
    }

    pub fn revision(&self) -> u64 {
        self.revision.get()
    }

    fn touch(&self) {
        self.revision.set(self.revision.get().wrapping_add(1));
    }

    pub fn start_loading(&self, message: Option<&str>) {
        let mut state = self.state.borrow_mut();
        // A restart supersedes the delayed reset of a previous run.
        if let Some(timer) = state.pending_reset.take() {
            state.timeline.cancel(timer);
        }
        state.global = GlobalLoading {
            is_loading: true,
            message: message.unwrap_or(DEFAULT_LOADING_MESSAGE).to_string(),
            progress: 0,
        };
        drop(state);
        self.touch();
    }

    /// Set progress, clamped into `[0, 100]`.
    pub fn update_progress(&self, progress: f64, message: Option<&str>) {
        let clamped = if progress.is_nan() {
            0.0
        } else {
            progress.clamp(0.0, 100.0)
        };
        let mut state = self.state.borrow_mut();
        state.global.progress = clamped.round() as u8;
        if let Some(message) = message {
            state.global.message = message.to_string();
        }
        drop(state);
        self.touch();
    }

    /// Jump to 100% now; the bar disappears after the hide delay.
    pub fn end_loading(&self) {
        let now = self.clock.now_ms();
        let mut state = self.state.borrow_mut();
        state.global.progress = 100;
        if let Some(timer) = state.pending_reset.take() {
            state.timeline.cancel(timer);
        }
        let timer = state.timeline.schedule(now + LOADING_HIDE_DELAY_MS, ());
        state.pending_reset = Some(timer);
        drop(state);
        self.touch();
    }

    pub fn tick(&self) -> usize {
        let now = self.clock.now_ms();
        let mut fired = 0;
        let mut state = self.state.borrow_mut();
        while state.timeline.pop_due(now).is_some() {
            state.global = GlobalLoading::default();
            state.pending_reset = None;
            fired += 1;
        }
        drop(state);
        if fired > 0 {
            self.touch();
        }
        fired
    }

    /// Restarting an active module only replaces its message.
    pub fn start_module_loading(&self, module: &str, message: &str) {
        let mut state = self.state.borrow_mut();
        let previous = state.modules.insert(
            module.to_string(),
            ModuleLoading {
                active: true,
                message: message.to_string(),
            },
        );
        if !previous.is_some_and(|m| m.active) {
            state.loading_count += 1;
        }
        drop(state);
        self.touch();
    }

    /// Only an active module decrements the counter.
    pub fn end_module_loading(&self, module: &str) {
        let mut state = self.state.borrow_mut();
        let was_active = match state.modules.get_mut(module) {
            Some(entry) if entry.active => {
                entry.active = false;
                true
            }
            _ => false,
        };
        if was_active {
            state.loading_count = state.loading_count.saturating_sub(1);
        }
        drop(state);
        if was_active {
            self.touch();
        }
    }

    pub fn clear_all_module_loading(&self) {
        let mut state = self.state.borrow_mut();
        state.modules.clear();
        state.loading_count = 0;
        drop(state);
        self.touch();
    }

    pub fn is_module_loading(&self, module: &str) -> bool {
        self.state
            .borrow()
            .modules
            .get(module)
            .map(|m| m.active)
            .unwrap_or(false)
    }

    pub fn module_message(&self, module: &str) -> Option<String> {
        self.state
            .borrow()
            .modules
            .get(module)
            .filter(|m| m.active)
            .map(|m| m.message.clone())
    }

    pub fn active_loading_modules(&self) -> Vec<String> {
        self.state
            .borrow()
            .modules
            .iter()
            .filter(|(_, m)| m.active)
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn loading_count(&self) -> usize {
        self.state.borrow().loading_count
    }

    pub fn global(&self) -> GlobalLoading {
        self.state.borrow().global.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().global.is_loading
    }

    /// Run `op` with `module` marked as loading.  The flag is cleared whether
    /// the operation succeeds or fails.
    pub async fn with_loading<T, E, F>(&self, module: &str, op: F, message: &str) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
    {
        self.start_module_loading(module, message);
        let result = op.await;
        self.end_module_loading(module);
        result
    }

    /// Run `op` behind the global progress bar.
    pub async fn with_global_loading<T, E, F>(&self, op: F, message: Option<&str>) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
    {
        self.start_loading(message);
        let result = op.await;
        self.end_loading();
        result
    }
}
