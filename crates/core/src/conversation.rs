//! Conversation-related types.
//!
//! A [`Session`] holds everything one user accumulates while chatting:
//! the turn log, the text of uploaded documents and the map currently on
//! screen. Nothing here outlives the session.

use std::fmt::{self, Display};

use crate::map::MapArtifact;

/// Who said something.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    /// The person chatting.
    User,
    /// The model.
    Assistant,
}

impl Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "User"),
            Role::Assistant => write!(f, "Assistant"),
        }
    }
}

/// One message in the conversation log.
///
/// Turns are immutable once appended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Turn {
    role: Role,
    message: String,
}

impl Turn {
    /// Creates a user turn.
    #[inline]
    pub fn user<S: Into<String>>(message: S) -> Self {
        Self {
            role: Role::User,
            message: message.into(),
        }
    }

    /// Creates an assistant turn.
    #[inline]
    pub fn assistant<S: Into<String>>(message: S) -> Self {
        Self {
            role: Role::Assistant,
            message: message.into(),
        }
    }

    /// Returns who said this.
    #[inline]
    pub fn role(&self) -> Role {
        self.role
    }

    /// Returns the message text.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Text extracted from an uploaded document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Document {
    identity: String,
    text: String,
}

impl Document {
    /// Returns the identity the document was uploaded under, usually the
    /// file name.
    #[inline]
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Returns the extracted plain text.
    #[inline]
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// State of one interactive session.
///
/// The turn log is append-only: corrections are new turns, and nothing
/// short of [`Session::reset`] removes an entry.
#[derive(Clone, Debug, Default)]
pub struct Session {
    turns: Vec<Turn>,
    // Upload order is kept so prompts are stable between exchanges.
    documents: Vec<Document>,
    current_map: Option<MapArtifact>,
}

impl Session {
    /// Creates an empty session.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a turn to the log.
    #[inline]
    pub fn append(&mut self, turn: Turn) {
        trace!("appending a {} turn", turn.role);
        self.turns.push(turn);
    }

    /// Returns the turns in conversational order.
    #[inline]
    pub fn snapshot(&self) -> &[Turn] {
        &self.turns
    }

    /// Returns whether a document with this identity is already known.
    #[inline]
    pub fn has_document(&self, identity: &str) -> bool {
        self.documents.iter().any(|doc| doc.identity == identity)
    }

    /// Stores a document's text.
    ///
    /// Returns `false` and leaves the table untouched if the identity is
    /// already present.
    pub fn put_document<S1, S2>(&mut self, identity: S1, text: S2) -> bool
    where
        S1: Into<String>,
        S2: Into<String>,
    {
        let identity = identity.into();
        if self.has_document(&identity) {
            return false;
        }
        self.documents.push(Document {
            identity,
            text: text.into(),
        });
        true
    }

    /// Returns all documents in upload order.
    #[inline]
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// Returns the map currently shown, if any.
    #[inline]
    pub fn current_map(&self) -> Option<&MapArtifact> {
        self.current_map.as_ref()
    }

    /// Replaces the current map. Only one map exists at a time.
    #[inline]
    pub fn replace_map(&mut self, map: MapArtifact) {
        self.current_map = Some(map);
    }

    /// Clears turns, documents and the current map in one step.
    #[inline]
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::{Coordinates, Location};
    use crate::map::MapBuilder;

    #[test]
    fn test_append_keeps_order() {
        let mut session = Session::new();
        session.append(Turn::user("Where to in May?"));
        session.append(Turn::assistant("Try Lisbon."));
        session.append(Turn::user("Actually, June."));

        let roles: Vec<_> = session.snapshot().iter().map(Turn::role).collect();
        assert_eq!(roles, [Role::User, Role::Assistant, Role::User]);
        assert_eq!(session.snapshot()[1].message(), "Try Lisbon.");
    }

    #[test]
    fn test_put_document_is_idempotent() {
        let mut session = Session::new();
        assert!(session.put_document("march.pdf", "Hotel 120 EUR"));
        assert!(!session.put_document("march.pdf", "something else"));

        assert_eq!(session.documents().len(), 1);
        assert_eq!(session.documents()[0].text(), "Hotel 120 EUR");
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut session = Session::new();
        session.append(Turn::user("Hi"));
        session.put_document("a.pdf", "Taxi 30 USD");
        let map = MapBuilder::default()
            .build(
                &[Location::new("Paris", Coordinates::new(48.8566, 2.3522))],
                10,
            )
            .unwrap();
        session.replace_map(map);

        session.reset();

        assert!(session.snapshot().is_empty());
        assert!(session.documents().is_empty());
        assert!(session.current_map().is_none());
    }
}
