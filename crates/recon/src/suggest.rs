use log::debug;

use crate::error::ReconcileError;
use crate::extend::describe_properties;
use crate::gateway::{FetchJson, Gateway};
use crate::model::{
    caption_name, is_language_code, Diagnostics, EntitySuggestResponse, EntitySuggestion, PropertyProposals,
    PropertySpec, SuggestItem, SuggestResponse, CAPTION_MARKER, WIKITEXT_ID, WIKITEXT_NAME,
};

pub const CAPTION_DESCRIPTION: &str = "Image Captions";
pub const WIKITEXT_DESCRIPTION: &str = "Text associated with the file, in wiki markup";

/// Type id every proposal and manifest entry uses.
pub const MEDIA_TYPE_ID: &str = "mediafile";
pub const MEDIA_TYPE_NAME: &str = "Media file";

/// Full-text hits returned by entity suggest.
pub const ENTITY_SUGGEST_LIMIT: u32 = 10;

/// Properties proposed when none are configured.
pub const DEFAULT_PROPOSED_PROPERTIES: &[&str] = &[
    "wikitext", "P180", "P6243", "P921", "P170", "P571", "P1071", "P195", "P7482", "P6216", "P275", "P1259",
];

/// Candidates for a property prefix.
///
/// A caption prefix (`Cen`, `cpt-br`) and a wikitext-like prefix each yield
/// one synthetic candidate and nothing else. Any other prefix goes to the
/// knowledge-graph property search.
pub fn suggest_properties<F: FetchJson>(
    gateway: &Gateway<F>,
    prefix: &str,
    lang: &str,
) -> Result<SuggestResponse, ReconcileError> {
    if let Some(caption_lang) = caption_language(prefix) {
        return Ok(SuggestResponse {
            result: vec![SuggestItem {
                id: PropertySpec::Caption(caption_lang.to_string()).id(),
                name: caption_name(caption_lang),
                description: Some(CAPTION_DESCRIPTION.to_string()),
            }],
        });
    }

    if is_wikitext_like(prefix) {
        return Ok(SuggestResponse {
            result: vec![SuggestItem {
                id: WIKITEXT_ID.to_string(),
                name: WIKITEXT_NAME.to_string(),
                description: Some(WIKITEXT_DESCRIPTION.to_string()),
            }],
        });
    }

    let hits = gateway.search_properties(prefix, lang)?;
    debug!("property suggest {prefix:?}: {} hits", hits.len());
    Ok(SuggestResponse {
        result: hits
            .into_iter()
            .map(|hit| SuggestItem { id: hit.id, name: hit.label, description: hit.description })
            .collect(),
    })
}

/// Files whose text matches `prefix`, as `M<pageid>` candidates.
pub fn suggest_entities<F: FetchJson>(
    gateway: &Gateway<F>,
    prefix: &str,
) -> Result<EntitySuggestResponse, ReconcileError> {
    let hits = gateway.search_files(prefix, ENTITY_SUGGEST_LIMIT)?;
    Ok(EntitySuggestResponse {
        result: hits
            .into_iter()
            .map(|hit| EntitySuggestion { id: format!("M{}", hit.page_id), name: hit.title })
            .collect(),
    })
}

/// Properties to offer for extension, labelled in `lang`.
pub fn propose_properties<F: FetchJson>(
    gateway: &Gateway<F>,
    properties: &[String],
    lang: &str,
) -> Result<PropertyProposals, ReconcileError> {
    let specs: Vec<PropertySpec> = properties.iter().map(|id| PropertySpec::parse(id)).collect();
    let (properties, unresolved) = describe_properties(gateway, &specs, lang)?;
    Ok(PropertyProposals {
        type_id: MEDIA_TYPE_ID.to_string(),
        properties,
        diagnostics: Diagnostics { unresolved_labels: unresolved, ..Diagnostics::default() },
    })
}

/// Language of a caption prefix, matched case-insensitively on the marker.
fn caption_language(prefix: &str) -> Option<&str> {
    let mut chars = prefix.chars();
    let marker = chars.next()?;
    if !marker.eq_ignore_ascii_case(&CAPTION_MARKER) {
        return None;
    }
    let lang = chars.as_str();
    is_language_code(lang).then_some(lang)
}

/// True when `prefix` and `wikitext` contain one another, ignoring case.
fn is_wikitext_like(prefix: &str) -> bool {
    let prefix = prefix.trim().to_lowercase();
    !prefix.is_empty() && (WIKITEXT_ID.contains(&prefix) || prefix.contains(WIKITEXT_ID))
}
