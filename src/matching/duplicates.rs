// src/matching/duplicates.rs - Duplicate agent detection across four key strengths
use serde::Serialize;
use std::collections::BTreeMap;

use crate::matching::name::normalize;
use crate::models::core::Entity;

pub type DuplicateGroups<'a> = BTreeMap<String, Vec<&'a Entity>>;

/// Four independent groupings, strongest to weakest. Only groups with two or more
/// entities are kept. An exact-name collision breaks the uniqueness of `name` and is a
/// hard error; a normalized display-name collision only warrants a human look.
#[derive(Debug, Default, Serialize)]
pub struct DuplicateReport<'a> {
    pub exact_name: DuplicateGroups<'a>,
    pub exact_display_name: DuplicateGroups<'a>,
    pub normalized_name: DuplicateGroups<'a>,
    pub normalized_display_name: DuplicateGroups<'a>,
}

impl<'a> DuplicateReport<'a> {
    pub fn has_hard_duplicates(&self) -> bool {
        !self.exact_name.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.exact_name.is_empty()
            && self.exact_display_name.is_empty()
            && self.normalized_name.is_empty()
            && self.normalized_display_name.is_empty()
    }

    /// (exact name, exact display name, normalized name, normalized display name) group counts.
    pub fn group_counts(&self) -> (usize, usize, usize, usize) {
        (
            self.exact_name.len(),
            self.exact_display_name.len(),
            self.normalized_name.len(),
            self.normalized_display_name.len(),
        )
    }
}

/// Groups entities by exact and normalized name/display-name keys. Read-only and
/// deterministic: keys are ordered and entities keep their input order within a group.
pub fn find_duplicates(entities: &[Entity]) -> DuplicateReport<'_> {
    let mut exact_name: DuplicateGroups = BTreeMap::new();
    let mut exact_display_name: DuplicateGroups = BTreeMap::new();
    let mut normalized_name: DuplicateGroups = BTreeMap::new();
    let mut normalized_display_name: DuplicateGroups = BTreeMap::new();

    for entity in entities {
        push_key(&mut exact_name, entity.name.clone(), entity);
        push_key(&mut exact_display_name, entity.display_name.clone(), entity);
        push_key(&mut normalized_name, normalize(&entity.name), entity);
        push_key(&mut normalized_display_name, normalize(&entity.display_name), entity);
    }

    DuplicateReport {
        exact_name: retain_collisions(exact_name),
        exact_display_name: retain_collisions(exact_display_name),
        normalized_name: retain_collisions(normalized_name),
        normalized_display_name: retain_collisions(normalized_display_name),
    }
}

fn push_key<'a>(groups: &mut DuplicateGroups<'a>, key: String, entity: &'a Entity) {
    // blank keys never identify anything
    if key.trim().is_empty() {
        return;
    }
    groups.entry(key).or_default().push(entity);
}

fn retain_collisions(mut groups: DuplicateGroups<'_>) -> DuplicateGroups<'_> {
    groups.retain(|_, members| members.len() > 1);
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(id: &str, name: &str, display_name: &str) -> Entity {
        let mut e = Entity::new(id, name);
        e.display_name = display_name.to_string();
        e
    }

    #[test]
    fn test_normalized_collision_is_not_exact_collision() {
        let entities = vec![entity("1", "Foo Bot", "Foo"), entity("2", "foo-bot", "Foo ")];
        let report = find_duplicates(&entities);

        assert!(report.exact_name.is_empty());
        assert!(report.exact_display_name.is_empty());
        let group = report.normalized_name.get("foobot").expect("normalized name group");
        assert_eq!(group.iter().map(|e| e.id.as_str()).collect::<Vec<_>>(), vec!["1", "2"]);
        assert_eq!(report.normalized_display_name.get("foo").map(Vec::len), Some(2));
        assert!(!report.has_hard_duplicates());
    }

    #[test]
    fn test_exact_name_collision_is_hard() {
        let entities = vec![
            entity("1", "ind-writer", "IND Writer"),
            entity("2", "ind-writer", "IND Writer v2"),
            entity("3", "csr-writer", "CSR Writer"),
        ];
        let report = find_duplicates(&entities);
        assert!(report.has_hard_duplicates());
        assert_eq!(report.exact_name["ind-writer"].len(), 2);
        // exact collisions also collide after normalization
        assert_eq!(report.normalized_name["indwriter"].len(), 2);
        assert_eq!(report.group_counts(), (1, 0, 1, 0));
    }

    #[test]
    fn test_blank_keys_are_ignored() {
        let entities = vec![entity("1", "a", ""), entity("2", "b", ""), entity("3", "--", "!!")];
        let report = find_duplicates(&entities);
        assert!(report.is_empty());
    }

    #[test]
    fn test_detection_does_not_mutate_and_is_deterministic() {
        let entities = vec![
            entity("1", "Signal Detector", "Signal Detector"),
            entity("2", "signal_detector", "Signal detector"),
            entity("3", "SIGNAL DETECTOR", "Signal Detector"),
        ];
        let before = entities.clone();
        let first = serde_json::to_string(&find_duplicates(&entities)).unwrap();
        let second = serde_json::to_string(&find_duplicates(&entities)).unwrap();
        assert_eq!(first, second);
        assert_eq!(entities, before);
    }
}
