use crate::{
    error::{GenAIError, Result},
    models::GenerationResult,
};

/// Generated results, most recent first. Nothing is ever persisted.
#[derive(Debug, Clone, Default)]
pub struct History {
    entries: Vec<GenerationResult>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, result: GenerationResult) {
        self.entries.insert(0, result);
    }

    /// Moves the entry at `index` to the front, keeping the relative order
    /// of everything else. Index 0 is already current and is left alone.
    pub fn select(&mut self, index: usize) -> Result<&GenerationResult> {
        if index >= self.entries.len() {
            return Err(GenAIError::InvalidRequest(format!(
                "no history entry #{} ({} available)",
                index,
                self.entries.len()
            )));
        }
        if index > 0 {
            let selected = self.entries.remove(index);
            self.entries.insert(0, selected);
        }
        Ok(&self.entries[0])
    }

    pub fn current(&self) -> Option<&GenerationResult> {
        self.entries.first()
    }

    pub fn entries(&self) -> &[GenerationResult] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
