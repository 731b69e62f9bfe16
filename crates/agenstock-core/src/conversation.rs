//! Ordered, append-only conversation model.
//!
//! Entries are kept in arrival order and never reordered. An entry's text can
//! only change while it is still streaming; [`Conversation::finish`] freezes it.

use std::fmt;
use std::time::SystemTime;

use crate::error::{Error, Result};

/// Who produced an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    /// Map a stored `message_type` (`user`, `ai`, `system`) to a role.
    pub fn from_message_type(message_type: &str) -> Self {
        match message_type {
            "ai" | "assistant" => Self::Assistant,
            "system" => Self::System,
            _ => Self::User,
        }
    }
}

/// Stable handle to an entry, valid until the conversation is cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryRef(u64);

impl fmt::Display for EntryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entry#{}", self.0)
    }
}

/// One entry in the conversation.
#[derive(Debug, Clone)]
pub struct ConversationEntry {
    id: EntryRef,
    pub role: Role,
    text: String,
    streaming: bool,
    created_at: SystemTime,
}

impl ConversationEntry {
    pub const fn id(&self) -> EntryRef {
        self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whether the entry still accepts streamed text.
    pub const fn is_streaming(&self) -> bool {
        self.streaming
    }

    pub const fn created_at(&self) -> SystemTime {
        self.created_at
    }
}

/// Ordered list of conversation entries.
#[derive(Debug, Default)]
pub struct Conversation {
    entries: Vec<ConversationEntry>,
    next_id: u64,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a finished entry.
    pub fn append(&mut self, role: Role, text: impl Into<String>) -> EntryRef {
        self.push(role, text.into(), false)
    }

    /// Append an entry that keeps accepting text until finished.
    pub fn append_streaming(&mut self, role: Role, text: impl Into<String>) -> EntryRef {
        self.push(role, text.into(), true)
    }

    fn push(&mut self, role: Role, text: String, streaming: bool) -> EntryRef {
        let id = EntryRef(self.next_id);
        self.next_id += 1;
        self.entries.push(ConversationEntry {
            id,
            role,
            text,
            streaming,
            created_at: SystemTime::now(),
        });
        id
    }

    /// Append `text` to a live streaming entry.
    pub fn append_to_active(&mut self, target: EntryRef, text: &str) -> Result<()> {
        let entry = self.active_mut(target)?;
        entry.text.push_str(text);
        Ok(())
    }

    /// Replace the whole text of a live streaming entry.
    pub fn replace_text(&mut self, target: EntryRef, text: impl Into<String>) -> Result<()> {
        let entry = self.active_mut(target)?;
        entry.text = text.into();
        Ok(())
    }

    /// Freeze a streaming entry. Finishing an already finished entry is a no-op.
    pub fn finish(&mut self, target: EntryRef) -> Result<()> {
        let entry = self
            .position(target)
            .map(|i| &mut self.entries[i])
            .ok_or(Error::InvalidTarget(target))?;
        entry.streaming = false;
        Ok(())
    }

    /// Drop all entries. Previously issued references become invalid.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn get(&self, target: EntryRef) -> Option<&ConversationEntry> {
        self.position(target).map(|i| &self.entries[i])
    }

    pub fn entries(&self) -> &[ConversationEntry] {
        &self.entries
    }

    pub fn last(&self) -> Option<&ConversationEntry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn active_mut(&mut self, target: EntryRef) -> Result<&mut ConversationEntry> {
        match self.position(target) {
            Some(i) if self.entries[i].streaming => Ok(&mut self.entries[i]),
            _ => Err(Error::InvalidTarget(target)),
        }
    }

    // Ids are handed out in insertion order, so the list is sorted by id.
    fn position(&self, target: EntryRef) -> Option<usize> {
        self.entries.binary_search_by_key(&target.0, |e| e.id.0).ok()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn entries_keep_arrival_order() {
        let mut conv = Conversation::new();
        conv.append(Role::System, "welcome");
        conv.append(Role::User, "hi");
        conv.append_streaming(Role::Assistant, "");
        let roles: Vec<Role> = conv.entries().iter().map(|e| e.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant]);
    }

    #[test]
    fn append_to_active_concatenates() {
        let mut conv = Conversation::new();
        let target = conv.append_streaming(Role::Assistant, "");
        conv.append_to_active(target, "AAPL ").unwrap();
        conv.append_to_active(target, "is $190").unwrap();
        assert_eq!(conv.get(target).unwrap().text(), "AAPL is $190");
    }

    #[test]
    fn finished_entry_rejects_text() {
        let mut conv = Conversation::new();
        let target = conv.append_streaming(Role::Assistant, "done");
        conv.finish(target).unwrap();
        let err = conv.append_to_active(target, "more").unwrap_err();
        assert!(matches!(err, Error::InvalidTarget(r) if r == target));
        assert_eq!(conv.get(target).unwrap().text(), "done");
    }

    #[test]
    fn cleared_reference_is_invalid() {
        let mut conv = Conversation::new();
        let target = conv.append_streaming(Role::Assistant, "");
        conv.clear();
        assert!(matches!(
            conv.append_to_active(target, "x"),
            Err(Error::InvalidTarget(_))
        ));
        // Fresh entries never reuse an old id.
        let fresh = conv.append_streaming(Role::Assistant, "");
        assert_ne!(fresh, target);
        assert!(conv.append_to_active(target, "x").is_err());
    }

    #[test]
    fn replace_text_overwrites_streaming_entry() {
        let mut conv = Conversation::new();
        let target = conv.append_streaming(Role::Assistant, "partial");
        conv.replace_text(target, "complete answer").unwrap();
        assert_eq!(conv.get(target).unwrap().text(), "complete answer");
    }

    #[test]
    fn finish_is_idempotent() {
        let mut conv = Conversation::new();
        let target = conv.append_streaming(Role::Assistant, "");
        conv.finish(target).unwrap();
        conv.finish(target).unwrap();
        assert!(!conv.get(target).unwrap().is_streaming());
    }

    #[test]
    fn created_at_survives_edits() {
        let mut conv = Conversation::new();
        let target = conv.append_streaming(Role::Assistant, "");
        let created = conv.get(target).unwrap().created_at();
        std::thread::sleep(std::time::Duration::from_millis(5));
        conv.append_to_active(target, "AAPL ").unwrap();
        conv.replace_text(target, "AAPL is $190").unwrap();
        conv.finish(target).unwrap();
        assert_eq!(conv.get(target).unwrap().created_at(), created);
    }

    #[test]
    fn role_from_stored_message_type() {
        assert_eq!(Role::from_message_type("ai"), Role::Assistant);
        assert_eq!(Role::from_message_type("system"), Role::System);
        assert_eq!(Role::from_message_type("user"), Role::User);
    }
}
