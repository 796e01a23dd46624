use crate::error::{Result, ScanError};

/// Ordered, immutable set of keywords matched case-insensitively as substrings
/// of detected text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordSet {
    original: Vec<String>,
    lowered: Vec<String>,
}

impl KeywordSet {
    /// Builds a set from raw user input. Entries are trimmed and empty entries
    /// are dropped; duplicates (ignoring case) keep their first position.
    pub fn new<I, S>(keywords: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut original = Vec::new();
        let mut lowered: Vec<String> = Vec::new();

        for keyword in keywords {
            let trimmed = keyword.as_ref().trim();
            if trimmed.is_empty() {
                continue;
            }
            let lower = trimmed.to_lowercase();
            if lowered.contains(&lower) {
                continue;
            }
            original.push(trimmed.to_string());
            lowered.push(lower);
        }

        if original.is_empty() {
            return Err(ScanError::InvalidConfig(
                "keyword list must contain at least one non-empty keyword".to_string(),
            ));
        }

        Ok(Self { original, lowered })
    }

    pub fn matches(&self, text: &str) -> bool {
        let text = text.to_lowercase();
        self.lowered.iter().any(|k| text.contains(k.as_str()))
    }

    pub fn as_slice(&self) -> &[String] {
        &self.original
    }

    pub fn len(&self) -> usize {
        self.original.len()
    }

    pub fn is_empty(&self) -> bool {
        self.original.is_empty()
    }
}
