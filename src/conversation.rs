use crate::types::{ResponseRecord, Sender};

/// Ordered, append-only record of the conversation.
///
/// Only the presentation thread owns the log, so there is exactly one writer.
#[derive(Debug, Default)]
pub struct ConversationLog {
    entries: Vec<ResponseRecord>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, record: ResponseRecord) -> &ResponseRecord {
        self.entries.push(record);
        &self.entries[self.entries.len() - 1]
    }

    pub fn entries(&self) -> &[ResponseRecord] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&ResponseRecord> {
        self.entries.last()
    }
}

/// Render a record as a chat bubble: the message, then `sender • HH:MM`
/// (user messages are right-aligned by indentation).
pub fn render_bubble(record: &ResponseRecord) -> String {
    let indent = match record.sender {
        Sender::User => "        ",
        Sender::Assistant => "",
    };
    let mut bubble = String::new();
    for line in record.display_text.lines() {
        bubble.push_str(indent);
        bubble.push_str(line);
        bubble.push('\n');
    }
    bubble.push_str(&format!(
        "{}  {} • {}\n",
        indent,
        record.label(),
        record.timestamp.format("%H:%M")
    ));
    bubble
}
