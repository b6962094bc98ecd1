use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::action::Action;

/// Capability name to action lookup used when preparing a saga.
#[derive(Clone, Default)]
pub struct ActionRegistry {
    actions: HashMap<String, Arc<dyn Action>>,
}

impl ActionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `action` under `capability`, replacing any earlier entry.
    #[must_use]
    pub fn with(mut self, capability: impl Into<String>, action: impl Action + 'static) -> Self {
        self.insert(capability, Arc::new(action));
        self
    }

    pub fn insert(&mut self, capability: impl Into<String>, action: Arc<dyn Action>) {
        self.actions.insert(capability.into(), action);
    }

    #[must_use]
    pub fn get(&self, capability: &str) -> Option<Arc<dyn Action>> {
        self.actions.get(capability).cloned()
    }

    #[must_use]
    pub fn contains(&self, capability: &str) -> bool {
        self.actions.contains_key(capability)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

impl fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.actions.keys().collect();
        names.sort();
        f.debug_struct("ActionRegistry")
            .field("capabilities", &names)
            .finish()
    }
}
