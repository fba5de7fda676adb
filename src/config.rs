use crate::core::{OdbError, Result};
use crate::transaction::DEFAULT_MAX_CAS_RETRIES;
use serde::Deserialize;
use std::num::NonZeroUsize;

/// What to do when a caller suggests an id that is already taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SuggestedIdPolicy {
    /// Quietly issue the next unused id instead.
    #[default]
    FallBackToNext,
    /// Fail the insert with an input error.
    Reject,
}

/// Database configuration
///
/// Built with chained setters or loaded from JSON; unset fields keep their
/// defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OdbConfig {
    /// Times an edit is re-run after losing a commit race
    pub max_cas_retries: usize,

    /// Page size used when a paged select gives no count; `None` is unlimited
    pub default_page_size: Option<NonZeroUsize>,

    /// Handling of taken suggested ids on insert
    pub suggested_id_policy: SuggestedIdPolicy,
}

impl Default for OdbConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl OdbConfig {
    pub fn new() -> Self {
        Self {
            max_cas_retries: DEFAULT_MAX_CAS_RETRIES,
            default_page_size: None,
            suggested_id_policy: SuggestedIdPolicy::FallBackToNext,
        }
    }

    /// Set the commit retry limit
    pub fn max_cas_retries(mut self, retries: usize) -> Self {
        self.max_cas_retries = retries;
        self
    }

    /// Set the default page size
    pub fn default_page_size(mut self, size: NonZeroUsize) -> Self {
        self.default_page_size = Some(size);
        self
    }

    /// Set the suggested-id policy
    pub fn suggested_id_policy(mut self, policy: SuggestedIdPolicy) -> Self {
        self.suggested_id_policy = policy;
        self
    }

    /// Parse from JSON
    ///
    /// # Examples
    ///
    /// ```
    /// use obsdb::{OdbConfig, SuggestedIdPolicy};
    ///
    /// let config = OdbConfig::from_json_str(r#"{"suggestedIdPolicy": "REJECT"}"#).unwrap();
    /// assert_eq!(config.suggested_id_policy, SuggestedIdPolicy::Reject);
    /// assert_eq!(config.max_cas_retries, 128);
    /// ```
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| OdbError::input(format!("invalid configuration: {e}")))
    }
}
