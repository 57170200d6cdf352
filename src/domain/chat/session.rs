//! Chat session aggregate.
//!
//! A session belongs to exactly one owner. Only the owner may read or
//! mutate it or its messages; the ownership check happens in the
//! application layer, since the store itself is owner-agnostic.

use crate::domain::foundation::{SessionId, Timestamp, UserId, ValidationError};
use serde::{Deserialize, Serialize};

/// Placeholder title given to sessions before their first message.
pub const DEFAULT_TITLE: &str = "New conversation";

/// Maximum length for a session title, in characters.
pub const MAX_TITLE_LENGTH: usize = 200;

const TITLE_EXCERPT_THRESHOLD: usize = 20;
const TITLE_EXCERPT_LENGTH: usize = 17;
const TITLE_ELLIPSIS: &str = "...";

/// Builds a session title from the first user message.
///
/// Texts longer than 20 characters become their first 17 characters
/// followed by `...`. Shorter texts are used as-is. Lengths are counted in
/// Unicode scalar values, never bytes.
pub fn derive_title(first_message: &str) -> String {
    let mut chars = first_message.chars();
    let excerpt: String = chars.by_ref().take(TITLE_EXCERPT_LENGTH).collect();
    let remaining = chars.count();

    if TITLE_EXCERPT_LENGTH + remaining > TITLE_EXCERPT_THRESHOLD {
        format!("{}{}", excerpt, TITLE_ELLIPSIS)
    } else {
        first_message.to_string()
    }
}

/// A conversation between one owner and the generation backend.
///
/// # Invariants
///
/// - `id` is globally unique
/// - `title` is non-empty and at most `MAX_TITLE_LENGTH` characters
/// - `last_activity_at` never precedes `created_at`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSession {
    id: SessionId,
    owner: UserId,
    title: String,
    created_at: Timestamp,
    last_activity_at: Timestamp,
    deleted: bool,
}

impl ChatSession {
    /// Opens a new session for `owner`.
    ///
    /// # Errors
    ///
    /// - `EmptyField` if the title is blank
    /// - `TooLong` if the title exceeds `MAX_TITLE_LENGTH`
    pub fn new(owner: UserId, title: impl Into<String>) -> Result<Self, ValidationError> {
        let title = title.into();
        Self::validate_title(&title)?;

        let now = Timestamp::now();
        Ok(Self {
            id: SessionId::new(),
            owner,
            title,
            created_at: now,
            last_activity_at: now,
            deleted: false,
        })
    }

    /// Opens a new session whose title is derived from its first message.
    pub fn for_first_message(owner: UserId, first_message: &str) -> Result<Self, ValidationError> {
        Self::new(owner, derive_title(first_message))
    }

    /// Reconstitute a session from persistence (no validation).
    pub fn reconstitute(
        id: SessionId,
        owner: UserId,
        title: String,
        created_at: Timestamp,
        last_activity_at: Timestamp,
        deleted: bool,
    ) -> Self {
        Self {
            id,
            owner,
            title,
            created_at,
            last_activity_at,
            deleted,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn owner(&self) -> &UserId {
        &self.owner
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn created_at(&self) -> &Timestamp {
        &self.created_at
    }

    pub fn last_activity_at(&self) -> &Timestamp {
        &self.last_activity_at
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// True when `user` owns this session and it has not been deleted.
    pub fn is_visible_to(&self, user: &UserId) -> bool {
        !self.deleted && &self.owner == user
    }

    /// True while the session still carries the placeholder title.
    pub fn has_default_title(&self) -> bool {
        self.title == DEFAULT_TITLE
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Behavior
    // ─────────────────────────────────────────────────────────────────────────

    /// Replaces the placeholder title with an excerpt of `first_message`.
    ///
    /// Returns the new title when a change was made. Titles that are no
    /// longer the placeholder are left alone.
    pub fn title_from_first_message(&mut self, first_message: &str) -> Option<&str> {
        if !self.has_default_title() {
            return None;
        }
        let derived = derive_title(first_message);
        if derived.trim().is_empty() {
            return None;
        }
        self.title = derived;
        Some(&self.title)
    }

    /// Renames the session.
    ///
    /// # Errors
    ///
    /// - `EmptyField` if the title is blank
    /// - `TooLong` if the title exceeds `MAX_TITLE_LENGTH`
    pub fn rename(&mut self, title: impl Into<String>) -> Result<(), ValidationError> {
        let title = title.into();
        Self::validate_title(&title)?;
        self.title = title;
        Ok(())
    }

    /// Records activity at `at`.
    pub fn touch(&mut self, at: Timestamp) {
        if at.is_after(&self.last_activity_at) {
            self.last_activity_at = at;
        }
    }

    pub fn mark_deleted(&mut self) {
        self.deleted = true;
    }

    fn validate_title(title: &str) -> Result<(), ValidationError> {
        if title.trim().is_empty() {
            return Err(ValidationError::empty_field("title"));
        }
        let len = title.chars().count();
        if len > MAX_TITLE_LENGTH {
            return Err(ValidationError::too_long("title", MAX_TITLE_LENGTH, len));
        }
        Ok(())
    }
}
