//! Rule registry
//!
//! Maps rule IDs to factories. The registry is built once at startup and
//! handed to the engine; every run asks it for fresh rule instances bound to
//! the settings of that run, so no rule carries state between runs.

use super::base::Rule;
use super::graph_connectivity::GraphConnectivityRule;
use super::metadata_integrity::MetadataIntegrityRule;
use super::naked_links::NakedLinksRule;
use super::note_atomicity::NoteAtomicityRule;
use super::predicate_consistency::PredicateConsistencyRule;
use crate::config::{
    Settings, GRAPH_CONNECTIVITY, METADATA_INTEGRITY, NAKED_LINKS, NOTE_ATOMICITY,
    PREDICATE_CONSISTENCY,
};
use indexmap::IndexMap;
use std::sync::Arc;
use tracing::debug;

/// Builds a rule instance from the current settings
pub type RuleFactory = Arc<dyn Fn(&Settings) -> Arc<dyn Rule> + Send + Sync>;

#[derive(Clone, Default)]
pub struct RuleRegistry {
    factories: IndexMap<String, RuleFactory>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the five built-in rules
    pub fn with_builtin_rules() -> Self {
        let mut registry = Self::new();
        registry.register(METADATA_INTEGRITY, |s| {
            Arc::new(MetadataIntegrityRule::new(s.required_metadata_fields.clone(), s.language))
        });
        registry.register(NOTE_ATOMICITY, |s| {
            Arc::new(NoteAtomicityRule::new(s.max_note_length, s.language))
        });
        registry.register(NAKED_LINKS, |s| Arc::new(NakedLinksRule::new(s.min_context_length)));
        registry.register(GRAPH_CONNECTIVITY, |s| Arc::new(GraphConnectivityRule::new(s.language)));
        registry.register(PREDICATE_CONSISTENCY, |s| {
            Arc::new(PredicateConsistencyRule::new(s.predicate_usage_threshold, s.language))
        });
        registry
    }

    /// Register a factory. A duplicate ID replaces the earlier entry in place.
    pub fn register<F>(&mut self, id: &str, factory: F)
    where
        F: Fn(&Settings) -> Arc<dyn Rule> + Send + Sync + 'static,
    {
        let replaced = self.factories.insert(id.to_string(), Arc::new(factory)).is_some();
        if replaced {
            debug!("Replaced rule registration: {}", id);
        } else {
            debug!("Registered rule: {}", id);
        }
    }

    pub fn rule_ids(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.factories.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Fresh instances of every registered rule, in registration order
    pub fn instantiate(&self, settings: &Settings) -> Vec<Arc<dyn Rule>> {
        self.factories.values().map(|factory| factory(settings)).collect()
    }

    pub fn instantiate_one(&self, id: &str, settings: &Settings) -> Option<Arc<dyn Rule>> {
        self.factories.get(id).map(|factory| factory(settings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DiagnosticIssue;
    use crate::rules::corpus::Corpus;
    use anyhow::Result;

    struct Named(&'static str);

    impl Rule for Named {
        fn id(&self) -> &'static str {
            METADATA_INTEGRITY
        }
        fn name(&self) -> &'static str {
            self.0
        }
        fn description(&self) -> &'static str {
            "test rule"
        }
        fn check(&self, _corpus: &Corpus) -> Result<Vec<DiagnosticIssue>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_builtin_rules_registered_in_order() {
        let registry = RuleRegistry::with_builtin_rules();
        assert_eq!(
            registry.rule_ids(),
            vec![
                METADATA_INTEGRITY,
                NOTE_ATOMICITY,
                NAKED_LINKS,
                GRAPH_CONNECTIVITY,
                PREDICATE_CONSISTENCY
            ]
        );
        let rules = registry.instantiate(&Settings::default());
        let ids: Vec<&str> = rules.iter().map(|r| r.id()).collect();
        assert_eq!(ids, registry.rule_ids());
    }

    #[test]
    fn test_duplicate_registration_last_write_wins() {
        let mut registry = RuleRegistry::with_builtin_rules();
        registry.register(METADATA_INTEGRITY, |_| Arc::new(Named("replacement")));

        assert_eq!(registry.len(), 5);
        let rule = registry.instantiate_one(METADATA_INTEGRITY, &Settings::default()).unwrap();
        assert_eq!(rule.name(), "replacement");
        assert_eq!(registry.rule_ids()[0], METADATA_INTEGRITY);
    }

    #[test]
    fn test_instances_are_fresh_per_call() {
        let registry = RuleRegistry::with_builtin_rules();
        let a = registry.instantiate_one(NAKED_LINKS, &Settings::default()).unwrap();
        let b = registry.instantiate_one(NAKED_LINKS, &Settings::default()).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert!(registry.instantiate_one("unknown", &Settings::default()).is_none());
    }
}
