use std::collections::{BTreeMap, BTreeSet};

use log::warn;

use crate::gateway::{PageInfo, TitleSearch};
use crate::model::{Diagnostics, MatchResult, QueryResponse, QueryResult};

/// Score reported for an exact title match.
pub const EXACT_SCORE: u32 = 100;

/// One caller query after normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedQuery {
    pub label: String,
    pub title: String,
}

/// Map batch search pages back to the caller's labels.
///
/// Pages are joined to queries through their title: first the exact
/// canonical title, then any `normalized` alias the remote reports. Every
/// label gets exactly one result; labels no page maps to get the empty
/// result. A matched result is never replaced by an empty one, so pages may
/// arrive in any order and in any number.
pub fn match_pages(queries: &[NormalizedQuery], search: &TitleSearch) -> QueryResponse {
    let mut by_title: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for q in queries {
        by_title.entry(q.title.as_str()).or_default().push(q.label.as_str());
    }

    // remote title → every submitted title it was normalized from
    let mut aliases: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for (from, to) in &search.normalized {
        aliases.entry(to.as_str()).or_default().push(from.as_str());
    }

    let mut results: BTreeMap<String, QueryResult> = BTreeMap::new();
    let mut diagnostics = Diagnostics::default();

    for page in &search.pages {
        let labels = labels_for(page.title.as_str(), &by_title, &aliases);
        if labels.is_empty() {
            warn!("search returned page {:?} that matches no query", page.title);
            diagnostics.orphan_pages += 1;
            continue;
        }

        let result = page_result(page);
        for label in labels {
            let slot = results.entry(label.to_string()).or_default();
            if slot.is_empty() {
                *slot = result.clone();
            }
        }
    }

    let answered: BTreeSet<&str> = results.keys().map(String::as_str).collect();
    let unanswered: Vec<String> = queries
        .iter()
        .filter(|q| !answered.contains(q.label.as_str()))
        .map(|q| q.label.clone())
        .collect();
    if !unanswered.is_empty() {
        warn!(
            "{} of {} queries had no page in the search response",
            unanswered.len(),
            queries.len()
        );
    }
    for label in unanswered {
        diagnostics.unmatched_queries += 1;
        results.insert(label, QueryResult::empty());
    }

    QueryResponse { results, diagnostics }
}

/// Labels reaching `title` directly or through any alias, deduplicated.
fn labels_for<'a>(
    title: &str,
    by_title: &BTreeMap<&str, Vec<&'a str>>,
    aliases: &BTreeMap<&str, Vec<&str>>,
) -> BTreeSet<&'a str> {
    let direct = by_title.get(title).into_iter().flatten();
    let via_alias = aliases
        .get(title)
        .into_iter()
        .flatten()
        .filter_map(|from| by_title.get(*from))
        .flatten();
    direct.chain(via_alias).copied().collect()
}

fn page_result(page: &PageInfo) -> QueryResult {
    match page.page_id {
        Some(page_id) => QueryResult::matched(MatchResult {
            id: format!("M{page_id}"),
            name: page.title.clone(),
            score: EXACT_SCORE,
            is_match: true,
        }),
        None => QueryResult::empty(),
    }
}
