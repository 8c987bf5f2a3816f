//! Running transcript of a consultation.
//!
//! The transcript is an append-only list of labeled stage outputs. Prompts see
//! it as one newline-joined string, built with [`update_history`].

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Append `new_message` to `history`, separated by a newline.
/// An empty history yields `new_message` unchanged.
pub fn update_history(history: &str, new_message: &str) -> String {
    if history.is_empty() {
        new_message.to_string()
    } else {
        format!("{}\n{}", history, new_message)
    }
}

/// Limits applied after every append. Oldest entries are evicted first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptBudget {
    pub max_entries: Option<usize>,
    pub max_chars: Option<usize>,
}

impl TranscriptBudget {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn is_unbounded(&self) -> bool {
        self.max_entries.is_none() && self.max_chars.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    entries: VecDeque<String>,
    #[serde(default)]
    budget: TranscriptBudget,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_budget(budget: TranscriptBudget) -> Self {
        Self {
            entries: VecDeque::new(),
            budget,
        }
    }

    /// Replace the budget, evicting immediately if the new one is tighter
    pub fn set_budget(&mut self, budget: TranscriptBudget) {
        self.budget = budget;
        self.enforce_budget();
    }

    pub fn append(&mut self, entry: impl Into<String>) {
        self.entries.push_back(entry.into());
        self.enforce_budget();
    }

    /// Append `"{label}: {output}"`
    pub fn record(&mut self, label: &str, output: &str) {
        self.append(format!("{}: {}", label, output));
    }

    /// Append every entry of `other`, in order
    pub fn extend_from(&mut self, other: &Transcript) {
        for entry in &other.entries {
            self.append(entry.clone());
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn as_text(&self) -> String {
        self.entries
            .iter()
            .fold(String::new(), |history, entry| update_history(&history, entry))
    }

    fn text_len(&self) -> usize {
        let separators = self.entries.len().saturating_sub(1);
        self.entries
            .iter()
            .map(|entry| entry.chars().count())
            .sum::<usize>()
            + separators
    }

    fn enforce_budget(&mut self) {
        // the newest entry always survives, even when it alone exceeds the budget
        if let Some(max_entries) = self.budget.max_entries {
            while self.entries.len() > max_entries.max(1) {
                self.entries.pop_front();
            }
        }
        if let Some(max_chars) = self.budget.max_chars {
            while self.entries.len() > 1 && self.text_len() > max_chars {
                self.entries.pop_front();
            }
        }
    }
}

impl std::fmt::Display for Transcript {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.as_text())
    }
}
