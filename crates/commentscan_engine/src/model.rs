use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Matches keyed by search token. Tokens without matches have no entry.
pub type TokenMatches = BTreeMap<String, Vec<CommentMatch>>;

/// A comment group that contains a search token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CommentMatch {
    /// Path of the file as it was scanned
    pub file_name: String,
    /// 1-based line the comment group starts on
    pub line_number: usize,
    /// Rendered text of the whole comment group
    pub line_content: String,
}

/// Outcome of scanning a package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ScanResult {
    pub package_name: String,
    pub binary_only: bool,
    /// `None` exactly when `binary_only` is set
    pub matches: Option<TokenMatches>,
}

impl ScanResult {
    pub fn with_matches(package_name: impl Into<String>, matches: TokenMatches) -> Self {
        Self {
            package_name: package_name.into(),
            binary_only: false,
            matches: Some(matches),
        }
    }

    pub fn binary_only(package_name: impl Into<String>) -> Self {
        Self {
            package_name: package_name.into(),
            binary_only: true,
            matches: None,
        }
    }

    /// Matches for `token`, empty when there are none.
    pub fn matches_for(&self, token: &str) -> &[CommentMatch] {
        self.matches
            .as_ref()
            .and_then(|matches| matches.get(token))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}
