//! Live-feed actions.
//!
//! A live chat feed emits a stream of actions, one JSON object per line, each
//! tagged by `type`. Only `addChatItemAction` carries a chat message; every
//! other action kind deserializes to [`FeedAction::Other`] and is ignored by
//! the ingestor.

use serde::{Deserialize, Serialize};

use crate::MessageDraft;

/// One action from the live feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FeedAction {
    /// A new chat message.
    #[serde(rename = "addChatItemAction")]
    AddChatItem {
        #[serde(rename = "authorName")]
        author_name: String,
        #[serde(default)]
        message: Vec<MessageRun>,
    },
    /// Any action kind the relay does not speak (superchats, polls, bans, ...).
    #[serde(other)]
    Other,
}

/// A fragment of a chat message body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageRun {
    Text {
        text: String,
    },
    Emoji {
        #[serde(rename = "emojiText")]
        emoji_text: String,
    },
}

/// Renders message runs into plain text.
pub fn stringify(runs: &[MessageRun]) -> String {
    runs.iter()
        .map(|run| match run {
            MessageRun::Text { text } => text.as_str(),
            MessageRun::Emoji { emoji_text } => emoji_text.as_str(),
        })
        .collect()
}

impl FeedAction {
    /// Normalizes a chat action into a message draft. Other kinds yield `None`.
    pub fn into_draft(self) -> Option<MessageDraft> {
        match self {
            FeedAction::AddChatItem {
                author_name,
                message,
            } => Some(MessageDraft::new(author_name, stringify(&message))),
            FeedAction::Other => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_item_becomes_draft() {
        let line = r#"{"type":"addChatItemAction","authorName":"Budi","message":[{"text":"halo "},{"emojiText":"👋"}]}"#;
        let action: FeedAction = serde_json::from_str(line).unwrap();
        let draft = action.into_draft().unwrap();
        assert_eq!(draft.speaker, "Budi");
        assert_eq!(draft.text, "halo 👋");
    }

    #[test]
    fn unknown_action_kinds_are_ignored() {
        let line = r#"{"type":"addSuperChatItemAction","amount":"$5"}"#;
        let action: FeedAction = serde_json::from_str(line).unwrap();
        assert_eq!(action, FeedAction::Other);
        assert!(action.into_draft().is_none());
    }

    #[test]
    fn empty_message_renders_empty_text() {
        assert_eq!(stringify(&[]), "");
    }
}
