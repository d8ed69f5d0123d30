// src/reconcile/jobs.rs - Per-field reconciliation decisions
use serde_json::{json, Value};
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::classification::Classifier;
use crate::error::TaxonomyError;
use crate::models::core::Entity;
use crate::models::stats_models::JobKind;
use crate::models::taxonomy::{BusinessFunctionCode, Department, TaxonomySnapshot};

/// What a reconciler wants done with one entity.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Stored value already has the target format; nothing to compute.
    AlreadyCanonical,
    /// Write this value to the reconciler's field.
    Update(Value),
    /// No mapping or rule produced a value. The detail is shown to the operator.
    NeedsReview(String),
    /// The job does not apply to this entity.
    NotApplicable(String),
}

/// One taxonomy field and the way its target value is derived. Implementations are
/// pure: all I/O happens in the driver.
pub trait FieldReconciler {
    fn job(&self) -> JobKind;
    fn field(&self) -> &'static str;
    fn current_value(&self, entity: &Entity) -> Value;
    fn decide(&self, entity: &Entity, taxonomy: &TaxonomySnapshot) -> Decision;
}

/// Format check only: a canonical taxonomy reference is a UUID. Whether the UUID
/// exists is not checked here.
pub fn is_canonical_id(value: &str) -> bool {
    Uuid::parse_str(value.trim()).is_ok()
}

/// A stored business-function reference is canonical when it has the UUID format or
/// names a row of the snapshot (integer-keyed taxonomy tables).
fn is_canonical_function(value: &str, taxonomy: &TaxonomySnapshot) -> bool {
    is_canonical_id(value) || taxonomy.function_by_id(value.trim()).is_some()
}

fn is_canonical_department(value: &str, taxonomy: &TaxonomySnapshot) -> bool {
    is_canonical_id(value) || taxonomy.department_by_id(value.trim()).is_some()
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

pub struct BusinessFunctionReconciler {
    classifier: Classifier,
}

impl BusinessFunctionReconciler {
    pub fn new(classifier: Classifier) -> Self {
        Self { classifier }
    }

    fn target_code(&self, entity: &Entity) -> Result<BusinessFunctionCode, String> {
        match non_blank(&entity.business_function) {
            Some(_) => {
                // exact lookup on the value as stored, untrimmed
                let raw = entity.business_function.as_deref().unwrap_or_default();
                self.classifier.map_legacy_value(raw).ok_or_else(|| {
                    TaxonomyError::MappingMiss {
                        field: "business_function",
                        raw: raw.to_string(),
                        suggestion: self
                            .classifier
                            .config()
                            .legacy_mappings
                            .suggest(raw)
                            .map(str::to_string),
                    }
                    .to_string()
                })
            }
            None => self
                .classifier
                .classify_business_function(entity)
                .ok_or_else(|| "no business function rule matched".to_string()),
        }
    }
}

impl FieldReconciler for BusinessFunctionReconciler {
    fn job(&self) -> JobKind {
        JobKind::BusinessFunction
    }

    fn field(&self) -> &'static str {
        "business_function"
    }

    fn current_value(&self, entity: &Entity) -> Value {
        json!(entity.business_function)
    }

    fn decide(&self, entity: &Entity, taxonomy: &TaxonomySnapshot) -> Decision {
        if non_blank(&entity.business_function)
            .map_or(false, |v| is_canonical_function(v, taxonomy))
        {
            return Decision::AlreadyCanonical;
        }
        let code = match self.target_code(entity) {
            Ok(code) => code,
            Err(detail) => return Decision::NeedsReview(detail),
        };
        match taxonomy.function_for_code(code) {
            Some(function) => Decision::Update(json!(function.id)),
            None => Decision::NeedsReview(format!(
                "business function '{}' is not in the taxonomy tables",
                code
            )),
        }
    }
}

pub struct DepartmentReconciler {
    classifier: Classifier,
}

impl DepartmentReconciler {
    pub fn new(classifier: Classifier) -> Self {
        Self { classifier }
    }

    fn target_department<'t>(
        &self,
        entity: &Entity,
        taxonomy: &'t TaxonomySnapshot,
    ) -> Result<&'t Department, String> {
        if let Some(raw) = non_blank(&entity.department) {
            return taxonomy.department_by_name(raw).ok_or_else(|| {
                TaxonomyError::MappingMiss {
                    field: "department",
                    raw: raw.to_string(),
                    suggestion: None,
                }
                .to_string()
            });
        }
        let assignment = self
            .classifier
            .classify_department(entity)
            .ok_or_else(|| "no department rule matched".to_string())?;
        taxonomy
            .department_by_name(&assignment.department)
            .ok_or_else(|| {
                format!("department '{}' is not in the taxonomy tables", assignment.department)
            })
    }
}

impl FieldReconciler for DepartmentReconciler {
    fn job(&self) -> JobKind {
        JobKind::Department
    }

    fn field(&self) -> &'static str {
        "department"
    }

    fn current_value(&self, entity: &Entity) -> Value {
        json!(entity.department)
    }

    fn decide(&self, entity: &Entity, taxonomy: &TaxonomySnapshot) -> Decision {
        if non_blank(&entity.department).map_or(false, |v| is_canonical_department(v, taxonomy)) {
            return Decision::AlreadyCanonical;
        }
        let department = match self.target_department(entity, taxonomy) {
            Ok(d) => d,
            Err(detail) => return Decision::NeedsReview(detail),
        };

        // A department must sit under the entity's business function once that is canonical.
        let entity_function =
            non_blank(&entity.business_function).filter(|bf| is_canonical_function(bf, taxonomy));
        if let (Some(entity_bf), Some(dept_bf)) =
            (entity_function, department.business_function_id.as_deref())
        {
            if entity_bf.trim() != dept_bf {
                let owner = taxonomy
                    .function_by_id(dept_bf)
                    .map(|f| f.name.as_str())
                    .unwrap_or(dept_bf);
                return Decision::NeedsReview(format!(
                    "department '{}' belongs to '{}', not to the agent's business function",
                    department.name, owner
                ));
            }
        }
        Decision::Update(json!(department.id))
    }
}

pub struct TierReconciler {
    classifier: Classifier,
}

impl TierReconciler {
    pub fn new(classifier: Classifier) -> Self {
        Self { classifier }
    }
}

impl FieldReconciler for TierReconciler {
    fn job(&self) -> JobKind {
        JobKind::Tier
    }

    fn field(&self) -> &'static str {
        "tier"
    }

    fn current_value(&self, entity: &Entity) -> Value {
        json!(entity.tier)
    }

    fn decide(&self, entity: &Entity, _taxonomy: &TaxonomySnapshot) -> Decision {
        if entity.tier_level().is_some() {
            return Decision::AlreadyCanonical;
        }
        Decision::Update(json!(self.classifier.classify_tier(entity).as_i64()))
    }
}

pub struct ToolKitReconciler {
    classifier: Classifier,
}

impl ToolKitReconciler {
    pub fn new(classifier: Classifier) -> Self {
        Self { classifier }
    }
}

impl FieldReconciler for ToolKitReconciler {
    fn job(&self) -> JobKind {
        JobKind::ToolKit
    }

    fn field(&self) -> &'static str {
        "tools"
    }

    fn current_value(&self, entity: &Entity) -> Value {
        json!(entity.tools)
    }

    /// Tools are only ever added; existing assignments are kept.
    fn decide(&self, entity: &Entity, _taxonomy: &TaxonomySnapshot) -> Decision {
        let kit = match self.classifier.classify_toolkit(entity) {
            Some(kit) => kit,
            None => return Decision::NotApplicable("no tool kit rule matched".to_string()),
        };
        if kit.tools.iter().all(|t| entity.tools.contains(t)) {
            return Decision::AlreadyCanonical;
        }
        let merged: BTreeSet<&String> = entity.tools.iter().chain(kit.tools.iter()).collect();
        Decision::Update(json!(merged.into_iter().collect::<Vec<_>>()))
    }
}

/// Reconciler for a job kind. Duplicate detection has none.
pub fn reconciler_for(job: JobKind, classifier: Classifier) -> Option<Box<dyn FieldReconciler>> {
    match job {
        JobKind::BusinessFunction => Some(Box::new(BusinessFunctionReconciler::new(classifier))),
        JobKind::Department => Some(Box::new(DepartmentReconciler::new(classifier))),
        JobKind::Tier => Some(Box::new(TierReconciler::new(classifier))),
        JobKind::ToolKit => Some(Box::new(ToolKitReconciler::new(classifier))),
        JobKind::Duplicates => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::taxonomy::BusinessFunction;

    const RA_ID: &str = "5b2f4c1e-8f0a-4c6e-9d1b-2a7e3f9c0d11";
    const MW_ID: &str = "0c9d7e2a-1b3f-4a5c-8e6d-7f0a1b2c3d44";
    const DEPT_ID: &str = "9e8d7c6b-5a4f-4e3d-2c1b-0a9f8e7d6c55";

    fn taxonomy() -> TaxonomySnapshot {
        TaxonomySnapshot::new(
            vec![
                BusinessFunction {
                    id: RA_ID.into(),
                    name: "Regulatory Affairs".into(),
                },
                BusinessFunction {
                    id: MW_ID.into(),
                    name: "Medical Writing".into(),
                },
            ],
            vec![Department {
                id: DEPT_ID.into(),
                name: "Regulatory Strategy".into(),
                business_function_id: Some(RA_ID.into()),
            }],
        )
    }

    fn agent(name: &str) -> Entity {
        Entity::new("e-1", name)
    }

    #[test]
    fn test_canonical_id_format_check() {
        assert!(is_canonical_id(RA_ID));
        assert!(is_canonical_id(&format!(" {} ", RA_ID)));
        assert!(!is_canonical_id("regulatory_affairs"));
        assert!(!is_canonical_id(""));
    }

    #[test]
    fn test_business_function_legacy_value() {
        let r = BusinessFunctionReconciler::new(Classifier::default());
        let mut e = agent("clinical-pharmacist");
        e.business_function = Some("clinical_pharmacy".into());
        assert_eq!(r.decide(&e, &taxonomy()), Decision::Update(json!(MW_ID)));

        e.business_function = Some(RA_ID.into());
        assert_eq!(r.decide(&e, &taxonomy()), Decision::AlreadyCanonical);
    }

    #[test]
    fn test_business_function_miss_never_defaults() {
        let r = BusinessFunctionReconciler::new(Classifier::default());
        let mut e = agent("regulatory-writer");
        // wrong case: no fuzzy fallback, and the classifier is not consulted either
        e.business_function = Some("regulatory affairs".into());
        match r.decide(&e, &taxonomy()) {
            Decision::NeedsReview(detail) => {
                assert!(detail.contains("'regulatory affairs'"));
                assert!(detail.contains("Regulatory Affairs"));
            }
            other => panic!("expected needs review, got {:?}", other),
        }
    }

    #[test]
    fn test_business_function_classified_when_missing() {
        let r = BusinessFunctionReconciler::new(Classifier::default());
        let e = agent("FDA Submission Planner");
        assert_eq!(r.decide(&e, &taxonomy()), Decision::Update(json!(RA_ID)));

        // classified, but the taxonomy tables do not carry the function
        let e = agent("Payer Pricing Model");
        assert!(matches!(r.decide(&e, &taxonomy()), Decision::NeedsReview(_)));
    }

    #[test]
    fn test_department_by_raw_name_and_by_rule() {
        let r = DepartmentReconciler::new(Classifier::default());
        let mut e = agent("strategy-agent");
        e.department = Some("regulatory_strategy".into());
        assert_eq!(r.decide(&e, &taxonomy()), Decision::Update(json!(DEPT_ID)));

        let e = agent("Regulatory Strategist");
        assert_eq!(r.decide(&e, &taxonomy()), Decision::Update(json!(DEPT_ID)));

        let mut e = agent("strategy-agent");
        e.department = Some("Launch Excellence".into());
        assert!(matches!(r.decide(&e, &taxonomy()), Decision::NeedsReview(_)));
    }

    #[test]
    fn test_department_must_match_business_function() {
        let r = DepartmentReconciler::new(Classifier::default());
        let mut e = agent("Regulatory Strategist");
        e.business_function = Some(MW_ID.into());
        match r.decide(&e, &taxonomy()) {
            Decision::NeedsReview(detail) => assert!(detail.contains("Regulatory Affairs")),
            other => panic!("expected needs review, got {:?}", other),
        }
    }

    #[test]
    fn test_department_already_canonical() {
        let r = DepartmentReconciler::new(Classifier::default());
        let mut e = agent("Regulatory Strategist");
        e.department = Some(DEPT_ID.into());
        assert_eq!(r.decide(&e, &taxonomy()), Decision::AlreadyCanonical);

        // a uuid is canonical by format even before the row is loaded
        e.department = Some("11111111-2222-4333-8444-555555555555".into());
        assert_eq!(r.decide(&e, &taxonomy()), Decision::AlreadyCanonical);
    }

    #[test]
    fn test_integer_keyed_taxonomy_references_are_canonical() {
        let snapshot = TaxonomySnapshot::new(
            vec![
                BusinessFunction {
                    id: "7".into(),
                    name: "Medical Writing".into(),
                },
                BusinessFunction {
                    id: "8".into(),
                    name: "Regulatory Affairs".into(),
                },
            ],
            vec![Department {
                id: "12".into(),
                name: "Regulatory Strategy".into(),
                business_function_id: Some("8".into()),
            }],
        );
        let classifier = Classifier::default();

        let mut e = agent("Regulatory Strategist");
        e.business_function = Some("7".into());
        let bf = BusinessFunctionReconciler::new(classifier.clone());
        assert_eq!(bf.decide(&e, &snapshot), Decision::AlreadyCanonical);

        // the consistency check still applies to integer references
        let dept = DepartmentReconciler::new(classifier);
        assert!(matches!(dept.decide(&e, &snapshot), Decision::NeedsReview(_)));
        e.business_function = Some("8".into());
        assert_eq!(dept.decide(&e, &snapshot), Decision::Update(json!("12")));
        e.department = Some("12".into());
        assert_eq!(dept.decide(&e, &snapshot), Decision::AlreadyCanonical);

        // an unknown number is still a legacy value
        e.business_function = Some("99".into());
        assert!(matches!(bf.decide(&e, &snapshot), Decision::NeedsReview(_)));
    }

    #[test]
    fn test_tier_only_fills_missing_or_invalid() {
        let r = TierReconciler::new(Classifier::default());
        let mut e = agent("Regulatory API Bot");
        assert_eq!(r.decide(&e, &taxonomy()), Decision::Update(json!(5)));
        e.tier = Some(7);
        assert_eq!(r.decide(&e, &taxonomy()), Decision::Update(json!(5)));
        e.tier = Some(2);
        assert_eq!(r.decide(&e, &taxonomy()), Decision::AlreadyCanonical);
    }

    #[test]
    fn test_toolkit_adds_missing_tools_only() {
        let r = ToolKitReconciler::new(Classifier::default());
        let mut e = agent("Adverse Event Triage");
        e.tools = vec!["meddra_coder".into(), "custom_tool".into()];
        assert_eq!(
            r.decide(&e, &taxonomy()),
            Decision::Update(json!(["custom_tool", "faers_query", "meddra_coder"]))
        );

        e.tools.push("faers_query".into());
        assert_eq!(r.decide(&e, &taxonomy()), Decision::AlreadyCanonical);

        assert!(matches!(
            r.decide(&agent("Athena"), &taxonomy()),
            Decision::NotApplicable(_)
        ));
    }

    #[test]
    fn test_reconciler_for() {
        let classifier = Classifier::default();
        assert_eq!(
            reconciler_for(JobKind::Tier, classifier.clone()).unwrap().field(),
            "tier"
        );
        assert!(reconciler_for(JobKind::Duplicates, classifier).is_none());
    }
}
