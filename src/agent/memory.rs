// src/agent/memory.rs
//
// Session chat history with an approximate token budget.

use std::collections::VecDeque;

use crate::llm::ChatMessage;
use tracing::debug;

/// Rough token estimate of a text, four characters per token
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}

/// Ordered user/assistant history, trimmed from the oldest end to stay under the token limit
#[derive(Debug, Clone)]
pub struct ChatMemory {
    messages: VecDeque<ChatMessage>,
    token_limit: usize,
}

impl ChatMemory {
    pub fn new(token_limit: usize) -> Self {
        Self {
            messages: VecDeque::new(),
            token_limit,
        }
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push_back(message);
        self.trim();
    }

    /// Store one user/assistant exchange
    pub fn push_exchange(&mut self, user: &str, assistant: &str) {
        self.push(ChatMessage::user(user));
        self.push(ChatMessage::assistant(assistant));
    }

    pub fn messages(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn token_count(&self) -> usize {
        self.messages.iter().map(|m| estimate_tokens(&m.content)).sum()
    }

    pub fn token_limit(&self) -> usize {
        self.token_limit
    }

    // The newest message is kept even when it alone exceeds the limit
    fn trim(&mut self) {
        let mut dropped = 0;
        while self.messages.len() > 1 && self.token_count() > self.token_limit {
            self.messages.pop_front();
            dropped += 1;
        }
        if dropped > 0 {
            debug!(dropped, remaining = self.messages.len(), "Trimmed chat memory");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_estimate() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
    }

    #[test]
    fn oldest_messages_are_dropped() {
        let mut memory = ChatMemory::new(10);
        memory.push_exchange(&"a".repeat(16), &"b".repeat(16));
        assert_eq!(memory.len(), 2);
        assert_eq!(memory.token_count(), 8);
        memory.push(ChatMessage::user("c".repeat(16)));
        assert_eq!(memory.len(), 2);
        let first = memory.messages().next().unwrap();
        assert_eq!(first.role, "assistant");
        assert!(memory.token_count() <= memory.token_limit());
    }

    #[test]
    fn oversized_message_is_kept_alone() {
        let mut memory = ChatMemory::new(2);
        memory.push(ChatMessage::user("short"));
        memory.push(ChatMessage::assistant("x".repeat(100)));
        assert_eq!(memory.len(), 1);
        memory.clear();
        assert!(memory.is_empty());
    }
}
