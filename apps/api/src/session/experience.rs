//! Experience Store — the user's résumé, as an insertion-ordered list of titled records.
//!
//! There is no structured résumé model beyond this: `format_all()` is the only
//! representation of "the CV" handed to the prompts.

use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// One professional experience, keyed by its title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperienceRecord {
    pub title: String,
    pub description: String,
    pub date_range: String,
}

impl ExperienceRecord {
    /// `"{title} ({date_range})\n{description}\n"`
    fn to_block(&self) -> String {
        format!("{} ({})\n{}\n", self.title, self.date_range, self.description)
    }
}

/// Title → record mapping that keeps insertion order.
///
/// Re-adding an existing title replaces the record in place; it does not move it.
#[derive(Debug, Clone, Default)]
pub struct ExperienceStore {
    records: Vec<ExperienceRecord>,
}

impl ExperienceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or fully replaces the record keyed by `title`.
    /// Every field must be non-blank; on failure the store is untouched.
    pub fn add(&mut self, title: &str, description: &str, date_range: &str) -> Result<(), AppError> {
        if [title, description, date_range]
            .iter()
            .any(|field| field.trim().is_empty())
        {
            return Err(AppError::Validation(
                "Veuillez remplir tous les champs".to_string(),
            ));
        }

        let record = ExperienceRecord {
            title: title.to_string(),
            description: description.to_string(),
            date_range: date_range.to_string(),
        };

        match self.records.iter_mut().find(|r| r.title == title) {
            Some(existing) => *existing = record,
            None => self.records.push(record),
        }
        Ok(())
    }

    /// Removes the record keyed by `title`, returning it if it existed.
    pub fn remove(&mut self, title: &str) -> Option<ExperienceRecord> {
        let idx = self.records.iter().position(|r| r.title == title)?;
        Some(self.records.remove(idx))
    }

    pub fn list(&self) -> &[ExperienceRecord] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Flattened résumé text: one block per record, in store order, joined by newlines.
    pub fn format_all(&self) -> String {
        self.records
            .iter()
            .map(ExperienceRecord::to_block)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}
