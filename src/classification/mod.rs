pub mod config;
pub mod mapping;
pub mod rules;

use log::debug;
use std::sync::Arc;

pub use config::{DepartmentAssignment, TaxonomyConfig, ToolKit};
pub use mapping::LegacyMappingTable;
pub use rules::{Rule, RuleChain, SearchText};

use crate::models::core::{Entity, TierLevel};
use crate::models::taxonomy::BusinessFunctionCode;

/// Assigns taxonomy values from an entity's free text using the injected rule chains.
/// Each classify call yields at most one label.
#[derive(Debug, Clone)]
pub struct Classifier {
    config: Arc<TaxonomyConfig>,
}

impl Classifier {
    pub fn new(config: TaxonomyConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn from_shared(config: Arc<TaxonomyConfig>) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TaxonomyConfig {
        &self.config
    }

    pub fn map_legacy_value(&self, raw: &str) -> Option<BusinessFunctionCode> {
        self.config.legacy_mappings.map_legacy_value(raw)
    }

    /// Never fails: falls back to the configured default tier.
    pub fn classify_tier(&self, entity: &Entity) -> TierLevel {
        let text = SearchText::from_entity(entity);
        match self.config.tier_rules.first_match(&text) {
            Some(rule) => {
                debug!(
                    "Tier for '{}' -> {} via '{}' rule (keyword '{}')",
                    entity.name,
                    rule.result,
                    rule.label,
                    rule.matched_keyword(&text).unwrap_or_default()
                );
                rule.result
            }
            None => {
                debug!("Tier for '{}' -> default {}", entity.name, self.config.default_tier);
                self.config.default_tier
            }
        }
    }

    /// `None` means the entity needs manual classification.
    pub fn classify_business_function(&self, entity: &Entity) -> Option<BusinessFunctionCode> {
        let text = SearchText::from_entity(entity);
        self.config
            .business_function_rules
            .first_match(&text)
            .map(|rule| rule.result)
    }

    pub fn classify_department(&self, entity: &Entity) -> Option<&DepartmentAssignment> {
        let text = SearchText::from_entity(entity);
        self.config
            .department_rules
            .first_match(&text)
            .map(|rule| &rule.result)
    }

    pub fn classify_toolkit(&self, entity: &Entity) -> Option<&ToolKit> {
        let text = SearchText::from_entity(entity);
        self.config.toolkit_rules.first_match(&text).map(|rule| &rule.result)
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(TaxonomyConfig::default())
    }
}
