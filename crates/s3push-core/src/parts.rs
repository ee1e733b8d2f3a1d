//! Per-part results.
//!
//! Part tasks never share mutable state. Each returns its own result, and the
//! coordinator folds them into a [`PartsReport`] after every task has finished.

use std::collections::BTreeMap;

use s3push_model::types::{CompleteMultipartUpload, CompletedPart};

use crate::error::{PartFailure, UploadError};

/// Completion tokens (ETags) keyed by 1-based part number, kept in ascending order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionTokens {
    tokens: BTreeMap<u32, String>,
}

impl CompletionTokens {
    /// An empty set of tokens.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the token of `part_number`.
    ///
    /// Returns `false` and keeps the existing token if the part was already recorded.
    pub fn insert(&mut self, part_number: u32, token: impl Into<String>) -> bool {
        match self.tokens.entry(part_number) {
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(token.into());
                true
            }
            std::collections::btree_map::Entry::Occupied(_) => false,
        }
    }

    /// The token of `part_number`, if recorded.
    #[must_use]
    pub fn get(&self, part_number: u32) -> Option<&str> {
        self.tokens.get(&part_number).map(String::as_str)
    }

    /// Number of recorded parts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Whether no part has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Part numbers in `1..=expected` with no token.
    #[must_use]
    pub fn missing(&self, expected: u32) -> Vec<u32> {
        (1..=expected)
            .filter(|n| !self.tokens.contains_key(n))
            .collect()
    }

    /// Build the completion document, parts in ascending order.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::MissingParts`] unless every part in `1..=expected`
    /// has a token, and [`UploadError::UnexpectedParts`] if any token lies
    /// outside that range.
    ///
    /// # Examples
    ///
    /// ```
    /// use s3push_core::parts::CompletionTokens;
    ///
    /// let mut tokens = CompletionTokens::new();
    /// tokens.insert(2, "\"b\"");
    /// tokens.insert(1, "\"a\"");
    ///
    /// let doc = tokens.clone().into_document(2).unwrap();
    /// assert_eq!(doc.parts[0].part_number, 1);
    /// assert!(tokens.into_document(3).is_err());
    /// ```
    pub fn into_document(self, expected: u32) -> Result<CompleteMultipartUpload, UploadError> {
        let missing = self.missing(expected);
        if !missing.is_empty() {
            return Err(UploadError::MissingParts { missing });
        }

        let unexpected: Vec<u32> = self
            .tokens
            .keys()
            .copied()
            .filter(|n| !(1..=expected).contains(n))
            .collect();
        if !unexpected.is_empty() {
            return Err(UploadError::UnexpectedParts { unexpected });
        }

        let parts = self
            .tokens
            .into_iter()
            .map(|(part_number, e_tag)| CompletedPart { part_number, e_tag })
            .collect();
        Ok(CompleteMultipartUpload { parts })
    }
}

/// Outcome of the upload-parts phase.
#[derive(Debug, Default)]
pub struct PartsReport {
    /// Tokens of the parts that succeeded.
    pub tokens: CompletionTokens,
    /// Parts that failed, in ascending part order.
    pub failures: Vec<PartFailure>,
}

impl PartsReport {
    /// Whether all `expected` parts succeeded.
    #[must_use]
    pub fn is_complete(&self, expected: usize) -> bool {
        self.failures.is_empty() && self.tokens.len() == expected
    }

    /// Return the tokens if all `expected` parts succeeded.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::IncompleteUpload`] carrying every failure otherwise.
    pub fn into_tokens(mut self, expected: usize) -> Result<CompletionTokens, UploadError> {
        if self.is_complete(expected) {
            return Ok(self.tokens);
        }
        self.failures.sort_by_key(|failure| failure.part_number);
        Err(UploadError::IncompleteUpload {
            expected,
            completed: self.tokens.len(),
            failures: self.failures,
        })
    }
}
