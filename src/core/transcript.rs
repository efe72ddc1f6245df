//! Turns stored messages into chat bubbles.

use crate::infrastructure::entities::{Message, MessageKind};

pub const THINKING_INDICATOR: &str = "AI is thinking...";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    /// Right-aligned.
    Student,
    /// Left-aligned.
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bubble {
    pub speaker: Speaker,
    pub text: String,
    pub badge: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptLine {
    Bubble(Bubble),
    Thinking,
}

fn badge(kind: MessageKind) -> Option<&'static str> {
    match kind {
        MessageKind::Text => None,
        MessageKind::Image => Some("image"),
        MessageKind::Voice => Some("voice"),
    }
}

/// One student bubble and one assistant bubble per message, in the given order.
pub fn render_transcript(messages: &[Message], busy: bool) -> Vec<TranscriptLine> {
    let mut lines: Vec<TranscriptLine> = messages
        .iter()
        .flat_map(|message| {
            [
                TranscriptLine::Bubble(Bubble {
                    speaker: Speaker::Student,
                    text: message.content.clone(),
                    badge: badge(message.message_type),
                }),
                TranscriptLine::Bubble(Bubble {
                    speaker: Speaker::Assistant,
                    text: message.ai_response.clone(),
                    badge: None,
                }),
            ]
        })
        .collect();

    if busy {
        lines.push(TranscriptLine::Thinking);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn message(content: &str, kind: MessageKind, reply: &str) -> Message {
        Message {
            id: Uuid::new_v4(),
            session_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            content: content.to_owned(),
            message_type: kind,
            ai_response: reply.to_owned(),
            image_url: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_each_message_renders_a_pair() {
        let messages = vec![
            message("What is 2+2?", MessageKind::Text, "4"),
            message("explain photosynthesis", MessageKind::Voice, "Plants turn light into sugar."),
        ];

        let lines = render_transcript(&messages, false);
        assert_eq!(lines.len(), 4);
        assert_eq!(
            lines[2],
            TranscriptLine::Bubble(Bubble {
                speaker: Speaker::Student,
                text: "explain photosynthesis".to_owned(),
                badge: Some("voice"),
            })
        );
        assert_eq!(
            lines[3],
            TranscriptLine::Bubble(Bubble {
                speaker: Speaker::Assistant,
                text: "Plants turn light into sugar.".to_owned(),
                badge: None,
            })
        );
    }

    #[test]
    fn test_busy_appends_thinking_indicator() {
        let lines = render_transcript(&[], true);
        assert_eq!(lines, vec![TranscriptLine::Thinking]);
    }

    #[test]
    fn test_reply_whitespace_is_preserved() {
        let messages = vec![message("list", MessageKind::Text, "1.\n  2.\n")];
        let lines = render_transcript(&messages, false);

        match &lines[1] {
            TranscriptLine::Bubble(bubble) => assert_eq!(bubble.text, "1.\n  2.\n"),
            other => panic!("unexpected line {other:?}"),
        }
    }
}
