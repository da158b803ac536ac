//! Human-readable tool titles and descriptions.
//!
//! Each string has a stable key and a built-in default. A deployment can
//! override any of them with an environment variable named `GITHUB_MCP_<KEY>`.

use std::collections::BTreeMap;
use std::env;

const ENV_PREFIX: &str = "GITHUB_MCP_";

#[derive(Debug, Clone, Default)]
pub struct Translations {
    overrides: BTreeMap<String, String>,
}

impl Translations {
    pub fn from_env() -> Self {
        let overrides = env::vars()
            .filter_map(|(k, v)| k.strip_prefix(ENV_PREFIX).map(|key| (key.to_string(), v)))
            .collect();
        Self { overrides }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            overrides: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn t(&self, key: &str, default: &str) -> String {
        self.overrides
            .get(key)
            .cloned()
            .unwrap_or_else(|| default.to_string())
    }

    /// Effective value of every key in `defaults`, for `--export-translations`.
    pub fn export(&self, defaults: &[(&str, &str)]) -> BTreeMap<String, String> {
        defaults
            .iter()
            .map(|(k, d)| (k.to_string(), self.t(k, d)))
            .collect()
    }
}
