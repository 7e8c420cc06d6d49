//! Request-level facade over the engine.
//!
//! `Reconciler` owns one [`Gateway`] and the per-deployment options, and
//! exposes each protocol operation as a method taking already-parsed input.

use log::info;

use crate::error::ReconcileError;
use crate::extend::build_extend;
use crate::gateway::{FetchJson, Gateway};
use crate::manifest::{build_manifest, Manifest};
use crate::matcher::{match_pages, NormalizedQuery};
use crate::model::{
    EntitySuggestResponse, ExtendRequest, ExtendResult, PropertyProposals, QueryBatch, QueryResponse,
    SuggestResponse,
};
use crate::normalize::normalize;
use crate::preview::{render_preview, PreviewSize};
use crate::suggest::{self, DEFAULT_PROPOSED_PROPERTIES};

#[derive(Debug, Clone, PartialEq)]
pub struct ReconcilerOptions {
    /// Language used when a request does not name one.
    pub default_lang: String,
    pub preview: PreviewSize,
    /// Property ids offered by `propose_properties`.
    pub proposed_properties: Vec<String>,
}

impl Default for ReconcilerOptions {
    fn default() -> Self {
        Self {
            default_lang: "en".to_string(),
            preview: PreviewSize::default(),
            proposed_properties: DEFAULT_PROPOSED_PROPERTIES.iter().map(|p| p.to_string()).collect(),
        }
    }
}

pub struct Reconciler<F> {
    gateway: Gateway<F>,
    options: ReconcilerOptions,
}

impl<F: FetchJson> Reconciler<F> {
    pub fn new(gateway: Gateway<F>, options: ReconcilerOptions) -> Self {
        Self { gateway, options }
    }

    pub fn gateway(&self) -> &Gateway<F> {
        &self.gateway
    }

    pub fn options(&self) -> &ReconcilerOptions {
        &self.options
    }

    /// Resolve every query to a media id, or to the empty result.
    pub fn query(&self, batch: &QueryBatch) -> Result<QueryResponse, ReconcileError> {
        let queries = batch
            .iter()
            .map(|(label, input)| {
                normalize(&input.query, &self.gateway)
                    .map(|title| NormalizedQuery { label: label.clone(), title })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut titles: Vec<String> = queries.iter().map(|q| q.title.clone()).collect();
        titles.sort();
        titles.dedup();

        let search = self.gateway.search_titles(&titles)?;
        let response = match_pages(&queries, &search);
        info!(
            "query: {} labels, {} matched, {} unmatched",
            queries.len(),
            response.results.values().filter(|r| !r.is_empty()).count(),
            response.diagnostics.unmatched_queries
        );
        Ok(response)
    }

    /// `None` for the empty request, which the protocol answers with `{}`.
    pub fn extend(&self, request: Option<&ExtendRequest>, lang: Option<&str>) -> Result<Option<ExtendResult>, ReconcileError> {
        match request {
            Some(request) => build_extend(&self.gateway, request, self.lang(lang)).map(Some),
            None => Ok(None),
        }
    }

    pub fn suggest_properties(&self, prefix: &str, lang: Option<&str>) -> Result<SuggestResponse, ReconcileError> {
        suggest::suggest_properties(&self.gateway, prefix, self.lang(lang))
    }

    pub fn suggest_entities(&self, prefix: &str) -> Result<EntitySuggestResponse, ReconcileError> {
        suggest::suggest_entities(&self.gateway, prefix)
    }

    pub fn propose_properties(&self, lang: Option<&str>) -> Result<PropertyProposals, ReconcileError> {
        suggest::propose_properties(&self.gateway, &self.options.proposed_properties, self.lang(lang))
    }

    pub fn preview(&self, media_id: &str) -> Result<Option<String>, ReconcileError> {
        render_preview(&self.gateway, media_id, self.options.preview)
    }

    pub fn manifest(&self, service_url: &str, lang: Option<&str>) -> Manifest {
        build_manifest(service_url, self.lang(lang), self.options.preview)
    }

    fn lang<'a>(&'a self, lang: Option<&'a str>) -> &'a str {
        lang.unwrap_or(&self.options.default_lang)
    }
}
