//! Chat identity type for core messages.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatKind {
    Private,
    Group,
    Supergroup,
    Channel,
}

/// Chat (private, group or channel) identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    pub id: i64,
    pub kind: ChatKind,
}

impl Chat {
    pub fn private(id: i64) -> Self {
        Self {
            id,
            kind: ChatKind::Private,
        }
    }

    pub fn group(id: i64) -> Self {
        Self {
            id,
            kind: ChatKind::Group,
        }
    }

    /// Group and supergroup chats only react to prefixed messages.
    pub fn is_group(&self) -> bool {
        matches!(self.kind, ChatKind::Group | ChatKind::Supergroup)
    }
}
