use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::ReconcileError;

/// Message used for every payload that fails to parse.
pub const INVALID_INPUT: &str = "Invalid input provided";

// ---------------------------------------------------------------------------
// Query
// ---------------------------------------------------------------------------

/// One caller query. Only `query` drives matching; the rest of the
/// reconciliation query object is accepted and ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryInput {
    pub query: String,
}

/// Queries keyed by the caller's opaque labels (`q0`, `q1`, ...).
pub type QueryBatch = BTreeMap<String, QueryInput>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub id: String,
    pub name: String,
    pub score: u32,
    #[serde(rename = "match")]
    pub is_match: bool,
}

/// `{result: [...]}` for one label. An empty list is the no-match marker.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryResult {
    pub result: Vec<MatchResult>,
}

impl QueryResult {
    pub fn empty() -> Self {
        Self { result: Vec::new() }
    }

    pub fn matched(result: MatchResult) -> Self {
        Self { result: vec![result] }
    }

    pub fn is_empty(&self) -> bool {
        self.result.is_empty()
    }
}

/// Label → result map. Serializes as the bare map.
#[derive(Debug, Clone, Default)]
pub struct QueryResponse {
    pub results: BTreeMap<String, QueryResult>,
    pub diagnostics: Diagnostics,
}

impl Serialize for QueryResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.results.serialize(serializer)
    }
}

// ---------------------------------------------------------------------------
// Property specifiers
// ---------------------------------------------------------------------------

/// Requested property. Every stage dispatches on all three variants.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PropertySpec {
    /// Knowledge-graph property such as `P180`.
    Property(String),
    /// Page wikitext.
    Wikitext,
    /// File caption in one language (`Cen` → `en`).
    Caption(String),
}

pub const WIKITEXT_ID: &str = "wikitext";
pub const WIKITEXT_NAME: &str = "Wikitext";
pub const CAPTION_MARKER: char = 'C';

impl PropertySpec {
    pub fn parse(id: &str) -> Self {
        if id == WIKITEXT_ID {
            return Self::Wikitext;
        }
        match id.strip_prefix(CAPTION_MARKER) {
            Some(lang) if is_language_code(lang) => Self::Caption(lang.to_string()),
            _ => Self::Property(id.to_string()),
        }
    }

    /// Identifier as it appears in `meta` and `rows`.
    pub fn id(&self) -> String {
        match self {
            Self::Property(id) => id.clone(),
            Self::Wikitext => WIKITEXT_ID.to_string(),
            Self::Caption(lang) => format!("{CAPTION_MARKER}{lang}"),
        }
    }
}

pub fn caption_name(lang: &str) -> String {
    format!("Caption [{lang}]")
}

/// Language code as used by the repository: `en`, `pt-br`, `zh-hans`.
pub fn is_language_code(value: &str) -> bool {
    static LANG: OnceLock<Regex> = OnceLock::new();
    LANG.get_or_init(|| {
        Regex::new(r"(?i)^[a-z]{2,3}(-[a-z0-9]{1,8})*$").expect("language code pattern is valid")
    })
    .is_match(value)
}

// ---------------------------------------------------------------------------
// Extend
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct PropertyRef {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExtendRequest {
    pub ids: Vec<String>,
    pub properties: Vec<PropertyRef>,
}

impl ExtendRequest {
    pub fn specs(&self) -> Vec<PropertySpec> {
        self.properties.iter().map(|p| PropertySpec::parse(&p.id)).collect()
    }
}

/// One value in an extension row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ValueCell {
    Text {
        #[serde(rename = "str")]
        text: String,
    },
    Date {
        date: String,
    },
    Entity {
        id: String,
        name: String,
    },
}

impl ValueCell {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn date(date: impl Into<String>) -> Self {
        Self::Date { date: date.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetaEntry {
    pub id: String,
    pub name: String,
}

/// property id → cells
pub type Row = BTreeMap<String, Vec<ValueCell>>;

#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtendResult {
    pub meta: Vec<MetaEntry>,
    pub rows: BTreeMap<String, Row>,
    #[serde(skip)]
    pub diagnostics: Diagnostics,
}

// ---------------------------------------------------------------------------
// Suggest + proposals
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuggestItem {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SuggestResponse {
    pub result: Vec<SuggestItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntitySuggestion {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EntitySuggestResponse {
    pub result: Vec<EntitySuggestion>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PropertyProposals {
    #[serde(rename = "type")]
    pub type_id: String,
    pub properties: Vec<MetaEntry>,
    #[serde(skip)]
    pub diagnostics: Diagnostics,
}

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

/// Counts of data dropped on purpose while serving one request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    /// Entity lookup batches skipped after a remote failure.
    pub failed_batches: usize,
    /// Properties or entities without a label in the requested language.
    pub unresolved_labels: usize,
    /// Claims with no value or an unrecognized datatype.
    pub dropped_claims: usize,
    /// Query labels no returned page mapped back to.
    pub unmatched_queries: usize,
    /// Returned pages that matched no query.
    pub orphan_pages: usize,
}

impl Diagnostics {
    pub fn is_clean(&self) -> bool {
        *self == Self::default()
    }
}

// ---------------------------------------------------------------------------
// Request parsing
// ---------------------------------------------------------------------------

pub fn parse_queries(input: &str) -> Result<QueryBatch, ReconcileError> {
    serde_json::from_str(input).map_err(|_| ReconcileError::invalid_input(INVALID_INPUT))
}

/// `None` for the empty request `{}`, which the protocol answers with `{}`.
pub fn parse_extend(input: &str) -> Result<Option<ExtendRequest>, ReconcileError> {
    let value: serde_json::Value =
        serde_json::from_str(input).map_err(|_| ReconcileError::invalid_input(INVALID_INPUT))?;
    if value.as_object().is_some_and(|o| o.is_empty()) {
        return Ok(None);
    }
    serde_json::from_value(value)
        .map(Some)
        .map_err(|_| ReconcileError::invalid_input(INVALID_INPUT))
}
