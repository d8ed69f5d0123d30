// src/classification/config.rs - Immutable taxonomy configuration injected into the classifier
use log::info;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::env;
use std::fs;
use std::path::Path;

use crate::classification::mapping::{default_legacy_mappings, LegacyMappingTable};
use crate::classification::rules::{Rule, RuleChain};
use crate::error::{TaxonomyError, TaxonomyResult};
use crate::models::core::TierLevel;
use crate::models::taxonomy::BusinessFunctionCode;

pub const TAXONOMY_CONFIG_PATH_ENV: &str = "TAXONOMY_CONFIG_PATH";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepartmentAssignment {
    pub department: String,
    pub business_function: BusinessFunctionCode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolKit {
    pub name: String,
    pub tools: Vec<String>,
}

/// Every table and rule chain the engine classifies with. Loaded once per run and
/// never mutated; tests build alternates instead of touching shared state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxonomyConfig {
    pub legacy_mappings: LegacyMappingTable,
    pub tier_rules: RuleChain<TierLevel>,
    pub default_tier: TierLevel,
    pub business_function_rules: RuleChain<BusinessFunctionCode>,
    pub department_rules: RuleChain<DepartmentAssignment>,
    pub toolkit_rules: RuleChain<ToolKit>,
}

impl Default for TaxonomyConfig {
    fn default() -> Self {
        Self {
            legacy_mappings: default_legacy_mappings(),
            tier_rules: default_tier_rules(),
            default_tier: TierLevel::Specialist,
            business_function_rules: default_business_function_rules(),
            department_rules: default_department_rules(),
            toolkit_rules: default_toolkit_rules(),
        }
    }
}

impl TaxonomyConfig {
    /// Built-in taxonomy unless `TAXONOMY_CONFIG_PATH` points at a JSON replacement.
    pub fn from_env() -> TaxonomyResult<Self> {
        match env::var(TAXONOMY_CONFIG_PATH_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::from_json_file(path.trim()),
            _ => {
                info!("Using built-in taxonomy configuration");
                Ok(Self::default())
            }
        }
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> TaxonomyResult<Self> {
        let path = path.as_ref();
        info!("Loading taxonomy configuration from {}", path.display());
        let raw = fs::read_to_string(path).map_err(|e| {
            TaxonomyError::Configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> TaxonomyResult<Self> {
        let config: TaxonomyConfig = serde_json::from_str(raw)
            .map_err(|e| TaxonomyError::Configuration(format!("invalid taxonomy json: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> TaxonomyResult<()> {
        self.tier_rules.validate("tier")?;
        self.business_function_rules.validate("business_function")?;
        self.department_rules.validate("department")?;
        self.toolkit_rules.validate("toolkit")?;
        for rule in self.toolkit_rules.rules() {
            if rule.result.tools.is_empty() {
                return Err(TaxonomyError::Configuration(format!(
                    "toolkit '{}' assigns no tools",
                    rule.result.name
                )));
            }
        }
        Ok(())
    }

    /// SHA-256 of the canonical JSON form, recorded with every run so results can be
    /// traced back to the exact rules that produced them.
    pub fn fingerprint(&self) -> String {
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        hex::encode(Sha256::digest(&bytes))
    }
}

/// Checked tool -> worker -> expert -> specialist -> master. Changing this order
/// changes outcomes for agents whose text hits more than one list.
pub fn default_tier_rules() -> RuleChain<TierLevel> {
    RuleChain::new(vec![
        Rule::new(
            "tool",
            &[
                " api", "api ", "api-", "api_", "tool", "connector", "integration", "parser",
                "calculator", "converter", "extractor", "lookup", "scraper",
            ],
            TierLevel::Tool,
        ),
        Rule::new(
            "worker",
            &[
                "worker", "bot", "processor", "executor", "handler", "controller", "automation",
                "assistant", "monitor", "tracker", "scheduler",
            ],
            TierLevel::Worker,
        ),
        Rule::new(
            "expert",
            &["expert", "advisor", "consultant", "strategist", "senior", "principal", "scientist"],
            TierLevel::Expert,
        ),
        Rule::new(
            "specialist",
            &["specialist", "analyst", "coordinator", "reviewer", "writer", "manager", "associate"],
            TierLevel::Specialist,
        ),
        Rule::new(
            "master",
            &["master", "orchestrator", "director", "head of", "chief"],
            TierLevel::Master,
        ),
    ])
}

pub fn default_business_function_rules() -> RuleChain<BusinessFunctionCode> {
    use BusinessFunctionCode::*;
    RuleChain::new(vec![
        Rule::new(
            "medical_writing",
            &[
                "medical writ",
                "medical-writ",
                "clinical study report",
                "csr",
                "narrative",
                "manuscript",
                "writer",
            ],
            MedicalWriting,
        ),
        Rule::new(
            "safety_pharmacovigilance",
            &[
                "pharmacovigilance",
                "drug safety",
                "adverse event",
                "signal detect",
                "safety",
                "psur",
                "pbrer",
                "icsr",
            ],
            SafetyPharmacovigilance,
        ),
        Rule::new(
            "regulatory_affairs",
            &[
                "regulatory",
                "submission",
                "fda",
                "ectd",
                "labeling",
                "labelling",
                "dossier",
                "health authority",
            ],
            RegulatoryAffairs,
        ),
        Rule::new(
            "quality_assurance",
            &["quality", "gmp", "gxp", "capa", "audit", "deviation", "validation"],
            QualityAssurance,
        ),
        Rule::new(
            "clinical_development",
            &["clinical", "trial", "protocol", "biostatist", "site monitor", "patient recruit"],
            ClinicalDevelopment,
        ),
        Rule::new(
            "market_access",
            &["market access", "reimbursement", "payer", "heor", "health econom", "pricing"],
            MarketAccess,
        ),
        Rule::new(
            "medical_affairs",
            &["medical affairs", "medical information", "medical science liaison", "msl"],
            MedicalAffairs,
        ),
    ])
}

fn department(
    label: &str,
    keywords: &[&str],
    function: BusinessFunctionCode,
) -> Rule<DepartmentAssignment> {
    Rule::new(
        label,
        keywords,
        DepartmentAssignment {
            department: label.to_string(),
            business_function: function,
        },
    )
}

pub fn default_department_rules() -> RuleChain<DepartmentAssignment> {
    use BusinessFunctionCode::*;
    RuleChain::new(vec![
        department(
            "Regulatory Writing",
            &["clinical study report", "csr", "regulatory writ"],
            MedicalWriting,
        ),
        department("Publications", &["manuscript", "publication"], MedicalWriting),
        department(
            "Case Processing",
            &["case processing", "icsr", "adverse event"],
            SafetyPharmacovigilance,
        ),
        department("Signal Management", &["signal"], SafetyPharmacovigilance),
        department(
            "Aggregate Reporting",
            &["psur", "pbrer", "dsur", "aggregate report"],
            SafetyPharmacovigilance,
        ),
        department(
            "Regulatory Strategy",
            &["regulatory strateg", "pathway", "health authority meeting"],
            RegulatoryAffairs,
        ),
        department(
            "Regulatory Operations",
            &["submission", "ectd", "publishing", "regulatory operation"],
            RegulatoryAffairs,
        ),
        department("Labeling", &["labeling", "labelling"], RegulatoryAffairs),
        department("GMP Compliance", &["gmp", "manufactur"], QualityAssurance),
        department("Audit & Inspection", &["audit", "inspection"], QualityAssurance),
        department("Biostatistics", &["biostatist", "statistic"], ClinicalDevelopment),
        department(
            "Clinical Operations",
            &["clinical operation", "site monitor", "enrollment", "recruit"],
            ClinicalDevelopment,
        ),
        department("HEOR", &["heor", "health econom", "cost-effect"], MarketAccess),
        department("Medical Information", &["medical information", "inquiry"], MedicalAffairs),
    ])
}

fn toolkit(name: &str, keywords: &[&str], tools: &[&str]) -> Rule<ToolKit> {
    Rule::new(
        name,
        keywords,
        ToolKit {
            name: name.to_string(),
            tools: tools.iter().map(|t| t.to_string()).collect(),
        },
    )
}

pub fn default_toolkit_rules() -> RuleChain<ToolKit> {
    RuleChain::new(vec![
        toolkit(
            "literature_research",
            &["literature", "pubmed", "publication", "manuscript"],
            &["pubmed_search", "citation_formatter"],
        ),
        toolkit(
            "safety_database",
            &["safety", "adverse event", "pharmacovigilance", "signal"],
            &["faers_query", "meddra_coder"],
        ),
        toolkit(
            "regulatory_intelligence",
            &["regulatory", "fda", "guidance", "submission"],
            &["fda_guidance_search", "ema_document_search", "ectd_validator"],
        ),
        toolkit(
            "clinical_trials",
            &["clinical", "trial", "protocol"],
            &["clinicaltrials_gov_search", "sample_size_calculator"],
        ),
        toolkit(
            "document_authoring",
            &["writ", "document", "report"],
            &["document_generator", "template_library"],
        ),
        toolkit(
            "analytics",
            &["analy", "statist", "data"],
            &["python_sandbox", "chart_builder"],
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(TaxonomyConfig::default().validate().is_ok());
    }

    #[test]
    fn test_fingerprint_tracks_rule_changes() {
        let base = TaxonomyConfig::default();
        assert_eq!(base.fingerprint(), TaxonomyConfig::default().fingerprint());
        assert_eq!(base.fingerprint().len(), 64);

        let mut changed = base.clone();
        changed.default_tier = TierLevel::Worker;
        assert_ne!(base.fingerprint(), changed.fingerprint());
    }

    #[test]
    fn test_from_json_str_loads_alternate_taxonomy() {
        let raw = r#"{
            "legacy_mappings": { "RA": "regulatory_affairs" },
            "tier_rules": [ { "label": "tool", "keywords": ["widget"], "result": 5 } ],
            "default_tier": 4,
            "business_function_rules": [],
            "department_rules": [],
            "toolkit_rules": []
        }"#;
        let config = TaxonomyConfig::from_json_str(raw).unwrap();
        assert_eq!(
            config.legacy_mappings.map_legacy_value("RA"),
            Some(BusinessFunctionCode::RegulatoryAffairs)
        );
        assert_eq!(config.default_tier, TierLevel::Worker);
        assert_eq!(config.tier_rules.rules().len(), 1);
    }

    #[test]
    fn test_from_json_str_rejects_bad_tier_and_empty_toolkit() {
        let bad_tier = r#"{
            "legacy_mappings": {}, "tier_rules": [], "default_tier": 9,
            "business_function_rules": [], "department_rules": [], "toolkit_rules": []
        }"#;
        assert!(matches!(
            TaxonomyConfig::from_json_str(bad_tier),
            Err(TaxonomyError::Configuration(_))
        ));

        let empty_kit = r#"{
            "legacy_mappings": {}, "tier_rules": [], "default_tier": 3,
            "business_function_rules": [], "department_rules": [],
            "toolkit_rules": [
                { "label": "k", "keywords": ["x"], "result": { "name": "k", "tools": [] } }
            ]
        }"#;
        assert!(TaxonomyConfig::from_json_str(empty_kit).is_err());
    }

    #[test]
    fn test_from_json_file_missing_is_configuration_error() {
        let err = TaxonomyConfig::from_json_file("/nonexistent/taxonomy.json").unwrap_err();
        assert!(matches!(err, TaxonomyError::Configuration(_)));
    }
}
