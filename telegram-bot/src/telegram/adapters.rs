use crate::core::{Chat, ChatKind, Message, ToCoreMessage, ToCoreUser, User};

/// Telegram user → core [`User`].
pub struct TelegramUserWrapper<'a>(pub &'a teloxide::types::User);

impl<'a> ToCoreUser for TelegramUserWrapper<'a> {
    fn to_core(&self) -> User {
        User {
            id: self.0.id.0 as i64,
            username: self.0.username.clone(),
            first_name: Some(self.0.first_name.clone()),
            last_name: self.0.last_name.clone(),
        }
    }
}

/// Telegram message → core [`Message`]. Non-text messages get empty content.
pub struct TelegramMessageWrapper<'a>(pub &'a teloxide::types::Message);

impl<'a> TelegramMessageWrapper<'a> {
    fn chat_kind(&self) -> ChatKind {
        let chat = &self.0.chat;
        if chat.is_group() {
            ChatKind::Group
        } else if chat.is_supergroup() {
            ChatKind::Supergroup
        } else if chat.is_channel() {
            ChatKind::Channel
        } else {
            ChatKind::Private
        }
    }
}

impl<'a> ToCoreMessage for TelegramMessageWrapper<'a> {
    fn to_core(&self) -> Message {
        Message {
            id: self.0.id.to_string(),
            user: self
                .0
                .from
                .as_ref()
                .map(|u| TelegramUserWrapper(u).to_core())
                .unwrap_or_default(),
            chat: Chat {
                id: self.0.chat.id.0,
                kind: self.chat_kind(),
            },
            content: self.0.text().unwrap_or("").to_string(),
            created_at: self.0.date,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_wrapper_copies_names() {
        let user = teloxide::types::User {
            id: teloxide::types::UserId(123),
            is_bot: false,
            first_name: "Ada".to_string(),
            last_name: Some("Lovelace".to_string()),
            username: Some("ada".to_string()),
            language_code: Some("en".to_string()),
            is_premium: false,
            added_to_attachment_menu: false,
        };

        let core_user = TelegramUserWrapper(&user).to_core();

        assert_eq!(core_user.id, 123);
        assert_eq!(core_user.username.as_deref(), Some("ada"));
        assert_eq!(core_user.first_name.as_deref(), Some("Ada"));
        assert_eq!(core_user.last_name.as_deref(), Some("Lovelace"));
    }

    #[test]
    fn user_wrapper_minimal_user() {
        let user = teloxide::types::User {
            id: teloxide::types::UserId(456),
            is_bot: false,
            first_name: "Min".to_string(),
            last_name: None,
            username: None,
            language_code: None,
            is_premium: false,
            added_to_attachment_menu: false,
        };

        let core_user = TelegramUserWrapper(&user).to_core();

        assert_eq!(core_user.id, 456);
        assert!(core_user.username.is_none());
        assert!(core_user.last_name.is_none());
    }
}
