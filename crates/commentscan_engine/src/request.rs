/* 📖 # Why accept two spellings for every request field?

Existing clients post `{"PackageName": "fmt", "Tokens": ["TODO"]}` while the query
string form uses `package` and `tokens`. Both spellings are accepted in JSON bodies,
and `Tokens` may be a list or a single comma separated string, so either client
style can use either endpoint shape.
*/

use percent_encoding::percent_decode_str;
use serde::{Deserialize, Deserializer, Serialize};

use commentscan_base::{CommentscanError, CommentscanResult};

/// What to scan for and where.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScanRequest {
    #[serde(rename = "PackageName", alias = "package", default)]
    pub package_name: String,
    /// Case-sensitive substrings, in the order given
    #[serde(
        rename = "Tokens",
        alias = "tokens",
        default,
        deserialize_with = "deserialize_tokens"
    )]
    pub tokens: Vec<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TokensField {
    List(Vec<String>),
    Joined(String),
}

fn deserialize_tokens<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<TokensField>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(TokensField::List(tokens)) => tokens.into_iter().filter(|t| !t.is_empty()).collect(),
        Some(TokensField::Joined(joined)) => split_tokens(&joined),
    })
}

/// Split a comma separated token list, dropping empty entries.
pub fn split_tokens(joined: &str) -> Vec<String> {
    joined
        .split(',')
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

impl ScanRequest {
    pub fn new(package_name: impl Into<String>, tokens: Vec<String>) -> Self {
        Self {
            package_name: package_name.into(),
            tokens,
        }
    }

    /// Parse a JSON request body.
    pub fn from_json(body: &[u8]) -> CommentscanResult<Self> {
        serde_json::from_slice(body)
            .map_err(|e| Box::new(CommentscanError::validation(e.to_string())))
    }

    /// Build a request from `package` and `tokens` query parameters.
    ///
    /// Values are percent-decoded with `+` read as a space. The first occurrence of a
    /// parameter wins.
    pub fn from_query(query: &str) -> CommentscanResult<Self> {
        let mut package = None;
        let mut tokens = None;
        for pair in query.split('&').filter(|pair| !pair.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let key = decode_query_component(key)?;
            let slot = match key.as_str() {
                "package" => &mut package,
                "tokens" => &mut tokens,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(decode_query_component(value)?);
            }
        }

        let package = package.filter(|value| !value.is_empty()).ok_or_else(|| {
            Box::new(CommentscanError::validation(
                "the query must contain the parameter `package`",
            ))
        })?;
        let tokens = tokens.filter(|value| !value.is_empty()).ok_or_else(|| {
            Box::new(CommentscanError::validation(
                "the query must contain the parameter `tokens`",
            ))
        })?;
        Ok(Self::new(package, split_tokens(&tokens)))
    }

    /// Reject requests without a package or without tokens.
    pub fn validate(&self) -> CommentscanResult<()> {
        if self.package_name.is_empty() {
            return Err(Box::new(CommentscanError::validation(
                "The parameter `PackageName` cannot be empty",
            )));
        }
        if self.tokens.is_empty() {
            return Err(Box::new(CommentscanError::validation(
                "The parameter `Tokens` cannot be empty",
            )));
        }
        Ok(())
    }
}

fn decode_query_component(component: &str) -> CommentscanResult<String> {
    let spaced = component.replace('+', " ");
    percent_decode_str(&spaced)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|_| {
            Box::new(CommentscanError::validation(format!(
                "invalid percent-encoding in query: {}",
                component
            )))
        })
}
