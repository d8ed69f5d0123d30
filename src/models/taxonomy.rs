// src/models/taxonomy.rs
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{TaxonomyError, TaxonomyResult};
use crate::matching::name::normalize;
use crate::models::core::Record;

/// Canonical business-function codes. The code strings are stable identifiers and
/// must never change once data has been reconciled against them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BusinessFunctionCode {
    RegulatoryAffairs,
    ClinicalDevelopment,
    SafetyPharmacovigilance,
    QualityAssurance,
    MedicalWriting,
    MarketAccess,
    MedicalAffairs,
}

impl BusinessFunctionCode {
    pub const ALL: [BusinessFunctionCode; 7] = [
        BusinessFunctionCode::RegulatoryAffairs,
        BusinessFunctionCode::ClinicalDevelopment,
        BusinessFunctionCode::SafetyPharmacovigilance,
        BusinessFunctionCode::QualityAssurance,
        BusinessFunctionCode::MedicalWriting,
        BusinessFunctionCode::MarketAccess,
        BusinessFunctionCode::MedicalAffairs,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BusinessFunctionCode::RegulatoryAffairs => "regulatory_affairs",
            BusinessFunctionCode::ClinicalDevelopment => "clinical_development",
            BusinessFunctionCode::SafetyPharmacovigilance => "safety_pharmacovigilance",
            BusinessFunctionCode::QualityAssurance => "quality_assurance",
            BusinessFunctionCode::MedicalWriting => "medical_writing",
            BusinessFunctionCode::MarketAccess => "market_access",
            BusinessFunctionCode::MedicalAffairs => "medical_affairs",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            BusinessFunctionCode::RegulatoryAffairs => "Regulatory Affairs",
            BusinessFunctionCode::ClinicalDevelopment => "Clinical Development",
            BusinessFunctionCode::SafetyPharmacovigilance => "Safety & Pharmacovigilance",
            BusinessFunctionCode::QualityAssurance => "Quality Assurance",
            BusinessFunctionCode::MedicalWriting => "Medical Writing",
            BusinessFunctionCode::MarketAccess => "Market Access",
            BusinessFunctionCode::MedicalAffairs => "Medical Affairs",
        }
    }
}

impl fmt::Display for BusinessFunctionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BusinessFunctionCode {
    type Err = TaxonomyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BusinessFunctionCode::ALL
            .iter()
            .copied()
            .find(|code| code.as_str() == s)
            .ok_or_else(|| {
                TaxonomyError::Configuration(format!("unknown business function code '{}'", s))
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessFunction {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Department {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub business_function_id: Option<String>,
}

/// Taxonomy state read once at the start of a run.
#[derive(Debug, Clone, Default)]
pub struct TaxonomySnapshot {
    pub business_functions: Vec<BusinessFunction>,
    pub departments: Vec<Department>,
}

impl TaxonomySnapshot {
    pub fn new(business_functions: Vec<BusinessFunction>, departments: Vec<Department>) -> Self {
        Self {
            business_functions,
            departments,
        }
    }

    pub fn from_records(functions: &[Record], departments: &[Record]) -> TaxonomyResult<Self> {
        let business_functions = functions
            .iter()
            .map(|r| parse_record::<BusinessFunction>(r, "business function"))
            .collect::<TaxonomyResult<Vec<_>>>()?;
        let departments = departments
            .iter()
            .map(|r| parse_record::<Department>(r, "department"))
            .collect::<TaxonomyResult<Vec<_>>>()?;
        Ok(Self::new(business_functions, departments))
    }

    /// Resolves a canonical code to the stored function whose name normalizes to the
    /// same key as either the code or its display label.
    pub fn function_for_code(&self, code: BusinessFunctionCode) -> Option<&BusinessFunction> {
        let by_code = normalize(code.as_str());
        let by_label = normalize(code.display_name());
        self.business_functions.iter().find(|bf| {
            let key = normalize(&bf.name);
            key == by_code || key == by_label
        })
    }

    pub fn function_by_id(&self, id: &str) -> Option<&BusinessFunction> {
        self.business_functions.iter().find(|bf| bf.id == id)
    }

    pub fn department_by_id(&self, id: &str) -> Option<&Department> {
        self.departments.iter().find(|d| d.id == id)
    }

    pub fn department_by_name(&self, name: &str) -> Option<&Department> {
        let key = normalize(name);
        if key.is_empty() {
            return None;
        }
        self.departments.iter().find(|d| normalize(&d.name) == key)
    }
}

fn parse_record<T: serde::de::DeserializeOwned>(record: &Record, what: &str) -> TaxonomyResult<T> {
    let mut record = record.clone();
    // Ids may be integer or uuid columns; the engine treats them as opaque strings.
    for key in ["id", "business_function_id"] {
        if let Some(serde_json::Value::Number(n)) = record.get(key) {
            let as_string = n.to_string();
            record.insert(key.to_string(), serde_json::Value::String(as_string));
        }
    }
    serde_json::from_value(serde_json::Value::Object(record))
        .map_err(|e| TaxonomyError::MalformedRecord(format!("{}: {}", what, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot() -> TaxonomySnapshot {
        TaxonomySnapshot::new(
            vec![
                BusinessFunction { id: "bf-ra".into(), name: "Regulatory Affairs".into() },
                BusinessFunction { id: "bf-mw".into(), name: "medical_writing".into() },
            ],
            vec![Department {
                id: "d-1".into(),
                name: "Regulatory Strategy".into(),
                business_function_id: Some("bf-ra".into()),
            }],
        )
    }

    #[test]
    fn test_function_for_code_matches_label_or_code() {
        let snap = snapshot();
        let ra = snap.function_for_code(BusinessFunctionCode::RegulatoryAffairs);
        assert_eq!(ra.unwrap().id, "bf-ra");
        let mw = snap.function_for_code(BusinessFunctionCode::MedicalWriting);
        assert_eq!(mw.unwrap().id, "bf-mw");
        assert!(snap.function_for_code(BusinessFunctionCode::MarketAccess).is_none());
    }

    #[test]
    fn test_department_lookup_is_normalized() {
        let snap = snapshot();
        assert_eq!(snap.department_by_name("regulatory-strategy").unwrap().id, "d-1");
        assert!(snap.department_by_name("  ").is_none());
    }

    #[test]
    fn test_lookup_by_id() {
        let snap = snapshot();
        assert_eq!(snap.function_by_id("bf-mw").unwrap().name, "medical_writing");
        assert_eq!(snap.department_by_id("d-1").unwrap().name, "Regulatory Strategy");
        assert!(snap.department_by_id("bf-ra").is_none());
    }

    #[test]
    fn test_code_from_str() {
        assert_eq!(
            "market_access".parse::<BusinessFunctionCode>().unwrap(),
            BusinessFunctionCode::MarketAccess
        );
        assert!("Market Access".parse::<BusinessFunctionCode>().is_err());
    }

    #[test]
    fn test_from_records_accepts_numeric_ids() {
        let functions = vec![json!({"id": 7, "name": "Quality Assurance"})
            .as_object()
            .cloned()
            .unwrap()];
        let departments = vec![json!({"id": 3, "name": "GMP Compliance", "business_function_id": 7})
            .as_object()
            .cloned()
            .unwrap()];
        let snap = TaxonomySnapshot::from_records(&functions, &departments).unwrap();
        assert_eq!(snap.business_functions[0].id, "7");
        assert_eq!(snap.departments[0].business_function_id.as_deref(), Some("7"));
    }
}
