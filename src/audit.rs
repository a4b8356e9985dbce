// src/audit.rs - Mutation audit trail
//
// Every state-changing operation leaves one structured line in the log,
// carrying a human-readable description of what changed.
use std::fmt::Write as _;

#[derive(Debug, Default)]
pub struct ChangeSet {
    entries: Vec<String>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn created(&mut self, field: &str, value: &str) {
        self.entries.push(format!("{}='{}'", field, value));
    }

    pub fn add(&mut self, field: &str, old: &str, new: &str) {
        if old != new {
            self.entries
                .push(format!("{}: '{}' -> '{}'", field, old, new));
        }
    }

    pub fn add_opt(&mut self, field: &str, old: &Option<String>, new: &Option<String>) {
        if old != new {
            self.entries.push(format!(
                "{}: '{}' -> '{}'",
                field,
                old.as_deref().unwrap_or(""),
                new.as_deref().unwrap_or("")
            ));
        }
    }

    pub fn deleted(&mut self, field: &str, value: &str) {
        self.entries.push(format!("removed {}='{}'", field, value));
    }

    pub fn has_changes(&self) -> bool {
        !self.entries.is_empty()
    }

    pub fn to_description(&self) -> String {
        self.entries.join(", ")
    }
}

/// Records one audit event.
pub fn record(action: &str, entity_type: &str, entity_id: &str, description: &str) {
    let mut line = format!("{} {}", action, entity_type);
    if !entity_id.is_empty() {
        let _ = write!(line, " {}", entity_id);
    }
    if !description.is_empty() {
        let _ = write!(line, ": {}", description);
    }
    log::info!(target: "audit", "{}", line);
}
