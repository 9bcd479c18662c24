//! Configuration schema.

use serde::{Deserialize, Serialize};

/// Placeholder written into freshly created config files. Tokens equal to
/// this value are treated as unset and never launched.
pub const TOKEN_PLACEHOLDER: &str = "replace_with_your_token_here";

/// Parsed `config.yml` contents.
///
/// The token list preserves file order, including duplicates, placeholder
/// and blank entries. Filtering of unusable entries happens at launch time
/// so the list always mirrors what the operator wrote.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Ordered list of tunnel tokens, one child process per usable entry.
    pub tokenlist: Vec<String>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            tokenlist: vec![
                TOKEN_PLACEHOLDER.to_string(),
                "another_token_if_needed".to_string(),
            ],
        }
    }
}

impl BridgeConfig {
    /// Whether a token entry is semantically unset (placeholder or blank).
    pub fn is_unset(token: &str) -> bool {
        token == TOKEN_PLACEHOLDER || token.trim().is_empty()
    }

    /// True when at least one entry would actually be launched.
    pub fn has_usable_tokens(&self) -> bool {
        self.tokenlist.iter().any(|t| !Self::is_unset(t))
    }
}
