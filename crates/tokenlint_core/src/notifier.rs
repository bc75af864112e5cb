//! Listener notification for accepted diagnostics.

use std::collections::HashMap;

use tokenlint_plugin::Violation;

/// Receives accepted diagnostics whose code starts with the prefix it was
/// registered for.
pub trait Listener: Send {
    /// Called once per accepted diagnostic.
    fn notify(&mut self, code: &str, violation: &Violation);
}

/// Dispatches accepted diagnostics to listeners keyed by code prefix.
#[derive(Default)]
pub struct Notifier {
    listeners: HashMap<String, Vec<Box<dyn Listener>>>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener for every code starting with `prefix`.
    pub fn register_listener(&mut self, prefix: impl Into<String>, listener: Box<dyn Listener>) {
        self.listeners
            .entry(prefix.into())
            .or_default()
            .push(listener);
    }

    /// Notifies the listeners of every non-empty prefix of `code`, longest
    /// prefix first.
    pub fn notify(&mut self, code: &str, violation: &Violation) {
        if self.listeners.is_empty() {
            return;
        }

        let mut prefix = code;
        while !prefix.is_empty() {
            if let Some(listeners) = self.listeners.get_mut(prefix) {
                for listener in listeners.iter_mut() {
                    listener.notify(code, violation);
                }
            }
            let cut = prefix
                .char_indices()
                .next_back()
                .map_or(0, |(idx, _)| idx);
            prefix = &prefix[..cut];
        }
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut prefixes: Vec<&String> = self.listeners.keys().collect();
        prefixes.sort();
        f.debug_struct("Notifier")
            .field("prefixes", &prefixes)
            .finish()
    }
}
