/*!
Property selectors.

Algorithm descriptors carry a property definition such as
`"provider=fips,fips=yes"`. Consumers fetch with a property query made of
comma-separated clauses:

- `name=value` requires the property to be defined with that value
- `name!=value` requires it to be undefined or defined differently
- a bare `name` means `name=yes`

Names and values compare case-insensitively. An empty query matches any
definition.
*/

use std::str::FromStr;

use crate::error::FetchError;

/// One clause of a property query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Clause {
    Equals { name: String, value: String },
    NotEquals { name: String, value: String },
}

/// A parsed property query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyQuery {
    clauses: Vec<Clause>,
}

impl PropertyQuery {
    /// Query that matches everything
    pub fn any() -> Self {
        Self::default()
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    /// Whether a descriptor with this property definition satisfies the query
    pub fn matches(&self, definition: &str) -> bool {
        let defined = parse_definition(definition);
        let lookup = |name: &str| {
            defined
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.as_str())
        };

        self.clauses.iter().all(|clause| match clause {
            Clause::Equals { name, value } => lookup(name) == Some(value.as_str()),
            Clause::NotEquals { name, value } => lookup(name) != Some(value.as_str()),
        })
    }
}

impl FromStr for PropertyQuery {
    type Err = FetchError;

    fn from_str(query: &str) -> Result<Self, Self::Err> {
        let mut clauses = Vec::new();

        for raw in query.split(',') {
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }

            let clause = if let Some((name, value)) = raw.split_once("!=") {
                Clause::NotEquals {
                    name: normalize(name, raw)?,
                    value: normalize(value, raw)?,
                }
            } else if let Some((name, value)) = raw.split_once('=') {
                Clause::Equals {
                    name: normalize(name, raw)?,
                    value: normalize(value, raw)?,
                }
            } else {
                Clause::Equals {
                    name: normalize(raw, raw)?,
                    value: "yes".into(),
                }
            };
            clauses.push(clause);
        }

        Ok(Self { clauses })
    }
}

fn normalize(token: &str, clause: &str) -> Result<String, FetchError> {
    let token = token.trim();
    let valid = !token.is_empty()
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));

    if valid {
        Ok(token.to_ascii_lowercase())
    } else {
        Err(FetchError::InvalidPropertyQuery(clause.to_string()))
    }
}

/// Split a property definition into lowercase `(name, value)` pairs.
///
/// Definitions are written by the provider and trusted; malformed pieces
/// are dropped rather than reported.
pub fn parse_definition(definition: &str) -> Vec<(String, String)> {
    definition
        .split(',')
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .map(|piece| match piece.split_once('=') {
            Some((name, value)) => (name.trim().to_ascii_lowercase(), value.trim().to_ascii_lowercase()),
            None => (piece.to_ascii_lowercase(), "yes".to_string()),
        })
        .collect()
}
