//! Progress record carried between invocations
//!
//! A [`ProgressRecord`] is the only state that survives a suspension. The
//! external scheduler hands it back verbatim on the next invocation, so it must
//! serialize deterministically and hold nothing but plain data.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const COOLED_SUFFIX: &str = "#cooled";
const DONE_SUFFIX: &str = "#done";

/// Serializable progress of one lifecycle operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord<M> {
    /// Best-known representation of the resource
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_model: Option<M>,

    /// Step markers: `<step>` (call issued), `<step>#cooled`, `<step>#done`
    #[serde(default)]
    pub step_flags: BTreeMap<String, bool>,

    /// Named counters that must survive re-invocation
    #[serde(default)]
    pub retry_counters: BTreeMap<String, u32>,

    /// Identifiers captured by earlier steps for later ones
    #[serde(default)]
    pub remembered_identifiers: BTreeMap<String, String>,
}

impl<M> Default for ProgressRecord<M> {
    fn default() -> Self {
        Self {
            resource_model: None,
            step_flags: BTreeMap::new(),
            retry_counters: BTreeMap::new(),
            remembered_identifiers: BTreeMap::new(),
        }
    }
}

impl<M> ProgressRecord<M> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(mut self, model: M) -> Self {
        self.resource_model = Some(model);
        self
    }

    /// Whether the step's mutating call has already been issued
    pub fn is_invoked(&self, step: &str) -> bool {
        self.flag(step)
    }

    pub fn mark_invoked(&mut self, step: &str) {
        self.step_flags.insert(step.to_string(), true);
    }

    /// Whether the step already served its cool-down re-invocation
    pub fn is_cooled(&self, step: &str) -> bool {
        self.flag(&format!("{}{}", step, COOLED_SUFFIX))
    }

    pub fn mark_cooled(&mut self, step: &str) {
        self.step_flags
            .insert(format!("{}{}", step, COOLED_SUFFIX), true);
    }

    /// Whether the step completed on an earlier pass
    pub fn is_done(&self, step: &str) -> bool {
        self.flag(&format!("{}{}", step, DONE_SUFFIX))
    }

    pub fn mark_done(&mut self, step: &str) {
        self.step_flags.insert(format!("{}{}", step, DONE_SUFFIX), true);
    }

    fn flag(&self, key: &str) -> bool {
        self.step_flags.get(key).copied().unwrap_or(false)
    }

    pub fn counter(&self, key: &str) -> u32 {
        self.retry_counters.get(key).copied().unwrap_or(0)
    }

    /// Increment a counter and return its new value
    pub fn increment(&mut self, key: &str) -> u32 {
        let count = self.retry_counters.entry(key.to_string()).or_insert(0);
        *count = count.saturating_add(1);
        *count
    }

    pub fn reset_counter(&mut self, key: &str) {
        self.retry_counters.remove(key);
    }

    pub fn remember(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.remembered_identifiers.insert(key.into(), value.into());
    }

    pub fn try_identifier(&self, key: &str) -> Option<&str> {
        self.remembered_identifiers.get(key).map(String::as_str)
    }

    /// Identifier remembered by an earlier step
    ///
    /// # Panics
    ///
    /// Panics when no step remembered `key`. Chains are declared so that the
    /// producing step always runs first; reaching this is a wiring bug.
    pub fn identifier(&self, key: &str) -> &str {
        match self.try_identifier(key) {
            Some(value) => value,
            None => panic!("identifier '{}' was never remembered by an earlier step", key),
        }
    }
}

impl<M: Serialize> ProgressRecord<M> {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl<M: serde::de::DeserializeOwned> ProgressRecord<M> {
    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }
}
