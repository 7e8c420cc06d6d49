//! Statement value decoding.
//!
//! A statement's `mainsnak.datavalue` carries a runtime `type` tag. Each
//! recognized tag has one entry in [`DECODERS`]; anything else becomes
//! [`Claim::Unrecognized`] and is dropped. Entity references are not
//! decoded to a cell here: they need a label lookup, which the extension
//! builder does once per property for all ids.

use serde_json::{Number, Value};

use crate::model::ValueCell;

/// One statement value, tagged by datatype.
#[derive(Debug, Clone, PartialEq)]
pub enum Claim {
    EntityRef(String),
    Time(String),
    Text(String),
    Coordinate { latitude: Number, longitude: Number },
    Monolingual { text: String, language: String },
    Quantity(String),
    /// Datatype tag with no decoder, or a recognized tag with a bad payload.
    Unrecognized(String),
    /// `somevalue` / `novalue` snaks carry no datavalue.
    NoValue,
}

/// Outcome of decoding one claim.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    Cell(ValueCell),
    /// Entity id awaiting label resolution.
    Deferred(String),
    Dropped,
}

type DecodeFn = fn(&Value) -> Option<Claim>;

/// datavalue `type` → payload decoder.
const DECODERS: &[(&str, DecodeFn)] = &[
    ("wikibase-entityid", entity_ref),
    ("time", time),
    ("string", string),
    ("globecoordinate", coordinate),
    ("monolingualtext", monolingual),
    ("quantity", quantity),
];

impl Claim {
    /// Build a claim from a full statement object (`{mainsnak: {...}}`).
    pub fn from_statement(statement: &Value) -> Self {
        match statement.get("mainsnak").and_then(|snak| snak.get("datavalue")) {
            Some(datavalue) => Self::from_datavalue(datavalue),
            None => Self::NoValue,
        }
    }

    /// Build a claim from a `{type, value}` datavalue.
    pub fn from_datavalue(datavalue: &Value) -> Self {
        let tag = datavalue["type"].as_str().unwrap_or_default();
        DECODERS
            .iter()
            .find(|(name, _)| *name == tag)
            .and_then(|(_, decode)| decode(&datavalue["value"]))
            .unwrap_or_else(|| Self::Unrecognized(tag.to_string()))
    }
}

pub fn decode(claim: &Claim) -> Decoded {
    match claim {
        Claim::EntityRef(id) => Decoded::Deferred(id.clone()),
        Claim::Time(time) => Decoded::Cell(ValueCell::date(date_part(time))),
        Claim::Text(text) | Claim::Quantity(text) => Decoded::Cell(ValueCell::text(text.clone())),
        Claim::Coordinate { latitude, longitude } => {
            Decoded::Cell(ValueCell::text(format!("{latitude},{longitude}")))
        }
        Claim::Monolingual { text, language } => {
            Decoded::Cell(ValueCell::text(format!("{text} [{language}]")))
        }
        Claim::Unrecognized(_) | Claim::NoValue => Decoded::Dropped,
    }
}

/// `+2009-06-23T00:00:00Z` → `2009-06-23`
fn date_part(time: &str) -> &str {
    let time = time.trim_start_matches(['+', '-']);
    time.split('T').next().unwrap_or(time)
}

// ── Payload decoders ────────────────────────────────────────────────

fn entity_ref(value: &Value) -> Option<Claim> {
    if let Some(id) = value["id"].as_str() {
        return Some(Claim::EntityRef(id.to_string()));
    }
    // Older payloads only carry the numeric id.
    let numeric = value["numeric-id"].as_u64()?;
    let prefix = match value["entity-type"].as_str() {
        Some("property") => 'P',
        _ => 'Q',
    };
    Some(Claim::EntityRef(format!("{prefix}{numeric}")))
}

fn time(value: &Value) -> Option<Claim> {
    value["time"].as_str().map(|t| Claim::Time(t.to_string()))
}

fn string(value: &Value) -> Option<Claim> {
    value.as_str().map(|s| Claim::Text(s.to_string()))
}

fn coordinate(value: &Value) -> Option<Claim> {
    match (&value["latitude"], &value["longitude"]) {
        (Value::Number(lat), Value::Number(lon)) => Some(Claim::Coordinate {
            latitude: lat.clone(),
            longitude: lon.clone(),
        }),
        _ => None,
    }
}

fn monolingual(value: &Value) -> Option<Claim> {
    Some(Claim::Monolingual {
        text: value["text"].as_str()?.to_string(),
        language: value["language"].as_str()?.to_string(),
    })
}

fn quantity(value: &Value) -> Option<Claim> {
    value["amount"].as_str().map(|a| Claim::Quantity(a.to_string()))
}
