use crate::error::ValidationError;
use crate::rule::Rule;
use std::collections::HashMap;
use std::sync::RwLock;

/// Concurrent store of active rules.
///
/// Read-mostly: evaluators take the read lock and never block each other.
/// Writes (administrative create/update/delete) take the write lock and
/// validate before applying, so a rejected rule is never partially stored.
#[derive(Default)]
pub struct RuleStore {
    rules: RwLock<HashMap<String, Rule>>,
}

impl RuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new rule. Rejects duplicates and invalid rules.
    pub fn insert(&self, rule: Rule) -> Result<(), ValidationError> {
        rule.validate()?;
        let mut rules = self.rules.write().unwrap();
        if rules.contains_key(&rule.id) {
            return Err(ValidationError::DuplicateId { id: rule.id });
        }
        tracing::info!(rule_id = %rule.id, sensor = %rule.sensor, "Rule created");
        rules.insert(rule.id.clone(), rule);
        Ok(())
    }

    /// Create or fully replace a rule (upsert).
    pub fn replace(&self, rule: Rule) -> Result<(), ValidationError> {
        rule.validate()?;
        let mut rules = self.rules.write().unwrap();
        tracing::info!(rule_id = %rule.id, "Rule replaced");
        rules.insert(rule.id.clone(), rule);
        Ok(())
    }

    /// Delete a rule by id.
    pub fn remove(&self, id: &str) -> Result<Rule, ValidationError> {
        let mut rules = self.rules.write().unwrap();
        rules.remove(id).ok_or_else(|| ValidationError::UnknownRule {
            id: id.to_string(),
        })
    }

    pub fn get(&self, id: &str) -> Option<Rule> {
        self.rules.read().unwrap().get(id).cloned()
    }

    /// All rules, sorted by id for a stable listing.
    pub fn list(&self) -> Vec<Rule> {
        let rules = self.rules.read().unwrap();
        let mut all: Vec<Rule> = rules.values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }

    pub fn len(&self) -> usize {
        self.rules.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.read().unwrap().is_empty()
    }
}
