// src/utils/env.rs
use log::{debug, info};

/// Loads `.env` if present. Variables already set in the process environment win.
pub fn load_env() {
    match dotenv::dotenv() {
        Ok(path) => info!("Loaded environment from {}", path.display()),
        Err(e) => debug!("No .env file loaded ({}); using process environment", e),
    }
}

/// Reads a boolean flag, falling back to `default` when unset or unparsable.
pub fn env_flag(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<bool>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_env_flag() {
        env::remove_var("TAXONOMY_TEST_FLAG");
        assert!(env_flag("TAXONOMY_TEST_FLAG", true));

        env::set_var("TAXONOMY_TEST_FLAG", "false");
        assert!(!env_flag("TAXONOMY_TEST_FLAG", true));

        env::set_var("TAXONOMY_TEST_FLAG", "nope");
        assert!(!env_flag("TAXONOMY_TEST_FLAG", false));

        env::remove_var("TAXONOMY_TEST_FLAG");
    }
}
