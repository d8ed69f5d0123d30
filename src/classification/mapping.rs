// src/classification/mapping.rs - Exact-match legacy label dictionary
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strsim::{jaro_winkler, levenshtein};

use crate::matching::name::normalize;
use crate::models::taxonomy::BusinessFunctionCode;

const MIN_SUGGESTION_SIMILARITY: f64 = 0.85;

/// Legacy label -> canonical business function. Lookups are exact and case-sensitive;
/// a miss means the value needs manual classification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LegacyMappingTable {
    entries: BTreeMap<String, BusinessFunctionCode>,
}

impl LegacyMappingTable {
    pub fn new(entries: BTreeMap<String, BusinessFunctionCode>) -> Self {
        Self { entries }
    }

    pub fn from_pairs(pairs: &[(&str, BusinessFunctionCode)]) -> Self {
        Self::new(pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect())
    }

    pub fn map_legacy_value(&self, raw: &str) -> Option<BusinessFunctionCode> {
        self.entries.get(raw).copied()
    }

    /// Closest known label for a missed lookup. Reported to the operator only.
    ///
    /// A label equal to the value ignoring case wins, then one equal after
    /// normalization. Otherwise the highest Jaro-Winkler score above the threshold, with
    /// ties (common for shared prefixes) broken by edit distance and then by table order.
    pub fn suggest(&self, raw: &str) -> Option<&str> {
        let wanted = raw.trim().to_lowercase();
        if wanted.is_empty() {
            return None;
        }
        if let Some(label) = self.entries.keys().find(|label| label.to_lowercase() == wanted) {
            return Some(label.as_str());
        }
        let wanted_key = normalize(&wanted);
        if !wanted_key.is_empty() {
            if let Some(label) = self.entries.keys().find(|label| normalize(label) == wanted_key) {
                return Some(label.as_str());
            }
        }

        let mut best: Option<(&String, f64, usize)> = None;
        for label in self.entries.keys() {
            let lowered = label.to_lowercase();
            let score = jaro_winkler(&wanted, &lowered);
            if score < MIN_SUGGESTION_SIMILARITY {
                continue;
            }
            let distance = levenshtein(&wanted, &lowered);
            let better = match best {
                None => true,
                Some((_, best_score, best_distance)) => {
                    score > best_score || (score == best_score && distance < best_distance)
                }
            };
            if better {
                best = Some((label, score, distance));
            }
        }
        best.map(|(label, _, _)| label.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Labels seen in the legacy `business_function` column.
pub fn default_legacy_mappings() -> LegacyMappingTable {
    use BusinessFunctionCode::*;
    LegacyMappingTable::from_pairs(&[
        ("Regulatory Affairs", RegulatoryAffairs),
        ("Regulatory", RegulatoryAffairs),
        ("regulatory", RegulatoryAffairs),
        ("regulatory_affairs", RegulatoryAffairs),
        ("Regulatory Operations", RegulatoryAffairs),
        ("Clinical Development", ClinicalDevelopment),
        ("Clinical Operations", ClinicalDevelopment),
        ("Clinical", ClinicalDevelopment),
        ("clinical", ClinicalDevelopment),
        ("clinical_development", ClinicalDevelopment),
        ("clinical_operations", ClinicalDevelopment),
        ("Biostatistics", ClinicalDevelopment),
        ("Pharmacovigilance", SafetyPharmacovigilance),
        ("Drug Safety", SafetyPharmacovigilance),
        ("Safety", SafetyPharmacovigilance),
        ("safety", SafetyPharmacovigilance),
        ("pharmacovigilance", SafetyPharmacovigilance),
        ("safety_pharmacovigilance", SafetyPharmacovigilance),
        ("Quality Assurance", QualityAssurance),
        ("Quality", QualityAssurance),
        ("QA", QualityAssurance),
        ("quality", QualityAssurance),
        ("quality_assurance", QualityAssurance),
        ("GxP Compliance", QualityAssurance),
        ("Medical Writing", MedicalWriting),
        ("medical_writing", MedicalWriting),
        ("clinical_pharmacy", MedicalWriting),
        ("Scientific Writing", MedicalWriting),
        ("Market Access", MarketAccess),
        ("market_access", MarketAccess),
        ("HEOR", MarketAccess),
        ("Health Economics", MarketAccess),
        ("Pricing & Reimbursement", MarketAccess),
        ("Medical Affairs", MedicalAffairs),
        ("medical_affairs", MedicalAffairs),
        ("Medical Information", MedicalAffairs),
        ("medical_information", MedicalAffairs),
    ])
}
