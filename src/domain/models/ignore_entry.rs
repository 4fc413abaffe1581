//! IgnoreEntry: containers the agent must not re-report or act on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IgnoreEntry {
    pub container_id: String,
    pub host_id: String,
    pub reason: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl IgnoreEntry {
    pub fn new(container_id: impl Into<String>, host_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            container_id: container_id.into(),
            host_id: host_id.into(),
            reason: reason.into(),
            created_at: Utc::now(),
            expires_at: None,
        }
    }

    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(exp) => now < exp,
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_without_expiry_is_always_active() {
        let entry = IgnoreEntry::new("c1", "h1", "manual override");
        assert!(entry.is_active(Utc::now() + chrono::Duration::days(3650)));
    }

    #[test]
    fn entry_expires() {
        let mut entry = IgnoreEntry::new("c1", "h1", "temporary");
        entry.expires_at = Some(Utc::now() - chrono::Duration::seconds(1));
        assert!(!entry.is_active(Utc::now()));
    }
}
