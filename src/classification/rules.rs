// src/classification/rules.rs - Ordered keyword rule chains (first match wins)
use serde::{Deserialize, Serialize};

use crate::error::{TaxonomyError, TaxonomyResult};
use crate::models::core::Entity;

/// Lowercase concatenation of the free-text fields an entity is classified on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchText(String);

impl SearchText {
    pub fn from_entity(entity: &Entity) -> Self {
        let parts = [
            Some(entity.name.as_str()),
            Some(entity.display_name.as_str()),
            entity.role.as_deref(),
            entity.description.as_deref(),
        ];
        let joined = parts
            .iter()
            .flatten()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        Self(joined.to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn contains(&self, keyword: &str) -> bool {
        self.0.contains(keyword)
    }
}

/// One rule: a disjunction of lowercase substring tests tagged with its result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule<T> {
    pub label: String,
    pub keywords: Vec<String>,
    pub result: T,
}

impl<T> Rule<T> {
    pub fn new(label: &str, keywords: &[&str], result: T) -> Self {
        Self {
            label: label.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            result,
        }
    }

    pub fn matches(&self, text: &SearchText) -> bool {
        self.keywords.iter().any(|k| text.contains(k))
    }

    /// First keyword that fires, for audit output.
    pub fn matched_keyword(&self, text: &SearchText) -> Option<&str> {
        self.keywords
            .iter()
            .find(|k| text.contains(k))
            .map(String::as_str)
    }
}

/// Rules evaluated strictly in order. The order is the precedence contract: an entity
/// matching several rules gets the result of the earliest one and nothing else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleChain<T> {
    rules: Vec<Rule<T>>,
}

impl<T> RuleChain<T> {
    pub fn new(rules: Vec<Rule<T>>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[Rule<T>] {
        &self.rules
    }

    pub fn first_match(&self, text: &SearchText) -> Option<&Rule<T>> {
        self.rules.iter().find(|rule| rule.matches(text))
    }

    /// Keywords must be non-empty and lowercase, otherwise they would match everything
    /// or nothing against the lowercased search text.
    pub fn validate(&self, chain_name: &str) -> TaxonomyResult<()> {
        for rule in &self.rules {
            if rule.keywords.is_empty() {
                return Err(TaxonomyError::Configuration(format!(
                    "{} rule '{}' has no keywords",
                    chain_name, rule.label
                )));
            }
            for keyword in &rule.keywords {
                if keyword.trim().is_empty() || *keyword != keyword.to_lowercase() {
                    return Err(TaxonomyError::Configuration(format!(
                        "{} rule '{}' has invalid keyword '{}'",
                        chain_name, rule.label, keyword
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> RuleChain<u8> {
        RuleChain::new(vec![
            Rule::new("tool", &["api", "connector"], 5),
            Rule::new("worker", &["bot", "processor"], 4),
            Rule::new("expert", &["expert", "advisor"], 2),
        ])
    }

    #[test]
    fn test_first_match_wins() {
        let mut entity = Entity::new("1", "reg-api-bot");
        entity.display_name = "Regulatory API Bot".into();
        let text = SearchText::from_entity(&entity);
        let chain = chain();
        let rule = chain.first_match(&text).unwrap();
        assert_eq!(rule.result, 5);
        assert_eq!(rule.matched_keyword(&text), Some("api"));
    }

    #[test]
    fn test_no_match_returns_none() {
        let entity = Entity::new("1", "Labeling Reviewer");
        assert!(chain().first_match(&SearchText::from_entity(&entity)).is_none());
    }

    #[test]
    fn test_search_text_concatenates_optional_fields() {
        let mut entity = Entity::new("1", "pv-agent");
        entity.display_name = "PV Agent".into();
        entity.role = Some("  Case Processor ".into());
        entity.description = None;
        assert_eq!(SearchText::from_entity(&entity).as_str(), "pv-agent pv agent case processor");
    }

    #[test]
    fn test_validate_rejects_uppercase_and_empty_keywords() {
        let bad = RuleChain::new(vec![Rule::new("x", &["API"], 1u8)]);
        assert!(bad.validate("tier").is_err());
        let empty = RuleChain::new(vec![Rule::new("x", &[""], 1u8)]);
        assert!(empty.validate("tier").is_err());
        assert!(chain().validate("tier").is_ok());
    }
}
