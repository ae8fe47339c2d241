//! Navigation service contract and an in-memory history.

use serde::{Deserialize, Serialize};

/// State carried by a login redirect: where the visitor was heading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectState {
    pub from: String,
}

/// The host's navigation/history service.
pub trait Navigator {
    /// Replace the current entry with `to`, attaching `state`.
    fn redirect(&mut self, to: &str, state: RedirectState);

    /// Push a new entry.
    fn navigate(&mut self, to: &str);

    /// Go back one entry. Returns `false` when there is nothing to go back to.
    fn back(&mut self) -> bool;
}

/// A history entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub path: String,
    pub state: Option<RedirectState>,
}

/// In-memory navigation stack.
#[derive(Debug, Clone)]
pub struct History {
    entries: Vec<Entry>,
}

impl History {
    pub fn new(start: impl Into<String>) -> Self {
        Self {
            entries: vec![Entry {
                path: start.into(),
                state: None,
            }],
        }
    }

    pub fn current(&self) -> &Entry {
        // The stack is never empty: `back` refuses to pop the last entry.
        &self.entries[self.entries.len() - 1]
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new("/")
    }
}

impl Navigator for History {
    fn redirect(&mut self, to: &str, state: RedirectState) {
        if let Some(last) = self.entries.last_mut() {
            *last = Entry {
                path: to.to_string(),
                state: Some(state),
            };
        }
    }

    fn navigate(&mut self, to: &str) {
        self.entries.push(Entry {
            path: to.to_string(),
            state: None,
        });
    }

    fn back(&mut self) -> bool {
        if self.entries.len() > 1 {
            self.entries.pop();
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redirect_replaces_current_entry() {
        let mut history = History::new("/");
        history.navigate("/chantiers");
        history.redirect(
            "/login",
            RedirectState {
                from: "/chantiers".into(),
            },
        );

        assert_eq!(history.entries().len(), 2);
        assert_eq!(history.current().path, "/login");
        assert_eq!(
            history.current().state.as_ref().map(|s| s.from.as_str()),
            Some("/chantiers")
        );
    }

    #[test]
    fn back_stops_at_first_entry() {
        let mut history = History::new("/");
        history.navigate("/messages");
        assert!(history.back());
        assert_eq!(history.current().path, "/");
        assert!(!history.back());
    }
}
