//! Typed phase identifiers
//!
//! A phase id is a zero-padded numeric sequence plus a slug, e.g. `06-auth-flow`.
//! Parsing is a small hand-rolled scanner returning a `Result`, so malformed ids
//! surface at the boundary instead of deep in a call chain.

use crate::error::PhasedError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of a phase: two-digit (or longer) sequence + slug
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(try_from = "String", into = "String")]
pub struct PhaseId {
    pub sequence: u32,
    pub slug: String,
}

impl PhaseId {
    pub fn new(sequence: u32, slug: impl Into<String>) -> Self {
        Self {
            sequence,
            slug: slug.into(),
        }
    }

    /// Parse `NN-slug`: at least two leading digits, a hyphen, then a
    /// lowercase alphanumeric-with-hyphens slug.
    pub fn parse(input: &str) -> Result<Self, PhasedError> {
        let invalid = |message: &str| PhasedError::Validation {
            message: format!("invalid phase id '{}': {}", input, message),
        };

        let digits: String = input.chars().take_while(|c| c.is_ascii_digit()).collect();
        if digits.len() < 2 {
            return Err(invalid("expected a two-digit sequence prefix"));
        }

        let rest = &input[digits.len()..];
        let slug = match rest.strip_prefix('-') {
            Some(s) if !s.is_empty() => s,
            _ => return Err(invalid("expected '-slug' after the sequence prefix")),
        };

        let slug_ok = slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
            && !slug.starts_with('-')
            && !slug.ends_with('-');
        if !slug_ok {
            return Err(invalid(
                "slug must be lowercase alphanumeric with interior hyphens",
            ));
        }

        let sequence: u32 = digits
            .parse()
            .map_err(|_| invalid("sequence prefix out of range"))?;

        Ok(Self {
            sequence,
            slug: slug.to_string(),
        })
    }

    /// Human title derived from the slug (`auth-flow` → `auth flow`)
    pub fn default_title(&self) -> String {
        self.slug.replace('-', " ")
    }
}

impl fmt::Display for PhaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}-{}", self.sequence, self.slug)
    }
}

impl FromStr for PhaseId {
    type Err = PhasedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PhaseId::parse(s)
    }
}

impl TryFrom<String> for PhaseId {
    type Error = PhasedError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        PhaseId::parse(&value)
    }
}

impl From<PhaseId> for String {
    fn from(id: PhaseId) -> Self {
        id.to_string()
    }
}
