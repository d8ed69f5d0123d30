// src/matching/name.rs - Name normalization for fuzzy equality keys
use once_cell::sync::Lazy;
use regex::Regex;

static SEPARATORS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[-_\s]+").expect("valid separator regex"));
static NON_ALPHANUMERIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9]").expect("valid alphanumeric regex"));

/// Canonical comparison key: lowercase, separators dropped, then anything outside
/// `[a-z0-9]` dropped. Not for display.
pub fn normalize(s: &str) -> String {
    let lowered = s.to_lowercase();
    let without_separators = SEPARATORS.replace_all(&lowered, "");
    NON_ALPHANUMERIC.replace_all(&without_separators, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_basic() {
        assert_eq!(normalize("Foo Bot"), "foobot");
        assert_eq!(normalize("foo-bot"), "foobot");
        assert_eq!(normalize("FOO_BOT"), "foobot");
        assert_eq!(normalize("Safety & Pharmacovigilance"), "safetypharmacovigilance");
        assert_eq!(normalize("  ICH E6(R2) Advisor! "), "iche6r2advisor");
    }

    #[test]
    fn test_normalize_empty_and_symbols_only() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("--- __ !!"), "");
    }

    #[test]
    fn test_normalize_drops_non_ascii_letters() {
        assert_eq!(normalize("Café Évaluateur"), "cafvaluateur");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let samples = [
            "Regulatory API Bot",
            "clinical_pharmacy",
            "Müller-Lyer İstanbul",
            "\tTabs\nand\r\nnewlines",
            "ẞharp ǅ",
            "",
        ];
        for s in samples {
            let once = normalize(s);
            assert_eq!(normalize(&once), once, "not idempotent for {:?}", s);
        }
    }
}
