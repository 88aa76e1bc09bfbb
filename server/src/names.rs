use std::collections::HashMap;

use crate::server_types::UserId;

// Index of live nicknames, lives inside the registry so the coarse lock covers it.
// Lookups are exact and case sensitive.
pub struct Names {
    index: HashMap<String, UserId>,
}

impl Names {
    pub fn new() -> Self {
        Names {
            index: HashMap::new(),
        }
    }

    // Follows HashSet insert semantics returning bool, e.g.
    // If the name was not taken, it now maps to id and true is returned.
    // If the name is already held by a live user, nothing changes and false is returned.
    pub fn insert(&mut self, name: &str, id: UserId) -> bool {
        if self.index.contains_key(name) {
            return false
        }
        self.index.insert(name.to_owned(), id);
        true
    }

    pub fn get(&self, name: &str) -> Option<UserId> {
        self.index.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    // only removes if the name still belongs to id
    pub fn remove(&mut self, name: &str, id: UserId) -> bool {
        if self.index.get(name) == Some(&id) {
            self.index.remove(name);
            true
        } else {
            false
        }
    }

    // move id from old to new, false if new is taken
    pub fn rename(&mut self, old: &str, new: &str, id: UserId) -> bool {
        if !self.insert(new, id) {
            return false
        }
        self.remove(old, id);
        true
    }
}

impl Default for Names {
    fn default() -> Self {
        Names::new()
    }
}
