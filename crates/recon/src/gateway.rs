//! Remote metadata gateway.
//!
//! Stateless wrapper around the repository API (search, parse, media
//! entities) and the knowledge-graph API (labels, property search). All
//! transport goes through [`FetchJson`]; endpoints are passed in explicitly.
//!
//! Bulk entity lookups are split into batches of at most [`MAX_BATCH_SIZE`]
//! ids. A batch the remote rejects is skipped and counted; the remaining
//! batches are still merged.

use std::collections::BTreeMap;

use log::{debug, warn};
use serde_json::{Map, Value};

use crate::error::ReconcileError;

/// Hard limit the remote service puts on ids per entity lookup.
pub const MAX_BATCH_SIZE: usize = 50;

pub const COMMONS_API: &str = "https://commons.wikimedia.org/w/api.php";
pub const WIKIDATA_API: &str = "https://www.wikidata.org/w/api.php";

/// File namespace on the repository.
const FILE_NAMESPACE: &str = "6";

/// Transport capability: GET `url` with `params`, decode the body as JSON.
pub trait FetchJson {
    fn fetch_json(&self, url: &str, params: &[(&str, &str)]) -> Result<Value, ReconcileError>;
}

impl<T: FetchJson + ?Sized> FetchJson for &T {
    fn fetch_json(&self, url: &str, params: &[(&str, &str)]) -> Result<Value, ReconcileError> {
        (**self).fetch_json(url, params)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// Media repository API (search, parse, mediainfo entities).
    pub commons_api: String,
    /// Knowledge-graph API (labels, property search).
    pub wikidata_api: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            commons_api: COMMONS_API.to_string(),
            wikidata_api: WIKIDATA_API.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// One page of a batch title search.
#[derive(Debug, Clone, PartialEq)]
pub struct PageInfo {
    /// Absent when the remote marks the title as missing or invalid.
    pub page_id: Option<u64>,
    pub title: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TitleSearch {
    pub pages: Vec<PageInfo>,
    /// `(from, to)` rewrites the remote applied to submitted titles.
    pub normalized: Vec<(String, String)>,
}

/// Media entity with its statements grouped by property id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityRecord {
    pub statements: BTreeMap<String, Vec<Value>>,
}

impl EntityRecord {
    /// Statements for `property`, empty if the entity has none.
    pub fn statements_for(&self, property: &str) -> &[Value] {
        self.statements.get(property).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityBatch {
    pub entities: BTreeMap<String, EntityRecord>,
    pub failed_batches: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelBatch {
    /// id → label in the requested language. Ids without one are absent.
    pub labels: BTreeMap<String, String>,
    pub failed_batches: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyHit {
    pub id: String,
    pub label: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileHit {
    pub page_id: u64,
    pub title: String,
}

/// Display metadata for one media file.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaInfo {
    pub url: String,
    pub title: String,
    pub width: u64,
    pub height: u64,
    pub size: u64,
}

// ---------------------------------------------------------------------------
// Gateway
// ---------------------------------------------------------------------------

pub struct Gateway<F> {
    fetcher: F,
    endpoints: Endpoints,
    batch_size: usize,
}

impl<F: FetchJson> Gateway<F> {
    pub fn new(fetcher: F, endpoints: Endpoints) -> Self {
        Self { fetcher, endpoints, batch_size: MAX_BATCH_SIZE }
    }

    /// Override the batch size. Clamped to `1..=MAX_BATCH_SIZE`.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.clamp(1, MAX_BATCH_SIZE);
        self
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Title of the page with numeric id `page_id`, if it exists.
    pub fn title_for_page_id(&self, page_id: u64) -> Result<Option<String>, ReconcileError> {
        let id = page_id.to_string();
        let url = &self.endpoints.commons_api;
        let body = self.call(url, &[("action", "query"), ("format", "json"), ("pageids", &id)])?;
        let page = query_pages(url, &body)?.get(&id);
        Ok(page
            .filter(|p| p.get("missing").is_none())
            .and_then(|p| p["title"].as_str())
            .map(String::from))
    }

    /// Batch title search. One call with all titles pipe-joined.
    pub fn search_titles(&self, titles: &[String]) -> Result<TitleSearch, ReconcileError> {
        if titles.is_empty() {
            return Ok(TitleSearch::default());
        }
        let joined = titles.join("|");
        let url = &self.endpoints.commons_api;
        let body = self.call(
            url,
            &[("action", "query"), ("format", "json"), ("prop", "imageinfo"), ("titles", &joined)],
        )?;

        let pages = query_pages(url, &body)?
            .values()
            .filter_map(|page| {
                let title = page["title"].as_str()?.to_string();
                let page_id = if page.get("missing").is_some() || page.get("invalid").is_some() {
                    None
                } else {
                    page["pageid"].as_u64()
                };
                Some(PageInfo { page_id, title })
            })
            .collect();

        let normalized = body["query"]["normalized"]
            .as_array()
            .map(|list| {
                list.iter()
                    .filter_map(|n| Some((n["from"].as_str()?.to_string(), n["to"].as_str()?.to_string())))
                    .collect()
            })
            .unwrap_or_default();

        Ok(TitleSearch { pages, normalized })
    }

    /// Media entities for `ids` from the repository, batched and merged.
    pub fn get_entities(&self, ids: &[String], lang: &str) -> Result<EntityBatch, ReconcileError> {
        let (merged, failed_batches) =
            self.fetch_entities_batched(&self.endpoints.commons_api, ids, &[("languages", lang)])?;
        let entities = merged
            .into_iter()
            .map(|(id, value)| {
                let record = entity_record(&value);
                (id, record)
            })
            .collect();
        Ok(EntityBatch { entities, failed_batches })
    }

    /// Knowledge-graph labels for `ids` (items or properties) in `lang`.
    pub fn get_labels(&self, ids: &[String], lang: &str) -> Result<LabelBatch, ReconcileError> {
        if ids.is_empty() {
            return Ok(LabelBatch::default());
        }
        let (merged, failed_batches) = self.fetch_entities_batched(
            &self.endpoints.wikidata_api,
            ids,
            &[("languages", lang), ("props", "labels")],
        )?;
        let labels = merged
            .into_iter()
            .filter_map(|(id, value)| {
                let label = value["labels"][lang]["value"].as_str()?.to_string();
                Some((id, label))
            })
            .collect();
        Ok(LabelBatch { labels, failed_batches })
    }

    /// Raw wikitext of the page behind media id `M<n>`.
    pub fn get_wikitext(&self, page_id: u64) -> Result<String, ReconcileError> {
        let id = page_id.to_string();
        let url = &self.endpoints.commons_api;
        let body = self.call(
            url,
            &[("action", "parse"), ("format", "json"), ("prop", "wikitext"), ("pageid", &id)],
        )?;
        body["parse"]["wikitext"]["*"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| ReconcileError::remote(url, "parse response has no wikitext"))
    }

    /// Captions of one media entity: language → text.
    pub fn get_captions(&self, media_id: &str) -> Result<BTreeMap<String, String>, ReconcileError> {
        let url = &self.endpoints.commons_api;
        let body = self.call(
            url,
            &[("action", "wbgetentities"), ("format", "json"), ("props", "labels"), ("ids", media_id)],
        )?;
        let entity = body["entities"]
            .get(media_id)
            .ok_or_else(|| ReconcileError::remote(url, format!("no entity {media_id} in caption response")))?;
        Ok(entity["labels"]
            .as_object()
            .map(|labels| {
                labels
                    .iter()
                    .filter_map(|(lang, label)| Some((lang.clone(), label["value"].as_str()?.to_string())))
                    .collect()
            })
            .unwrap_or_default())
    }

    /// Knowledge-graph property search.
    pub fn search_properties(&self, prefix: &str, lang: &str) -> Result<Vec<PropertyHit>, ReconcileError> {
        let url = &self.endpoints.wikidata_api;
        let body = self.call(
            url,
            &[
                ("action", "wbsearchentities"),
                ("format", "json"),
                ("language", lang),
                ("type", "property"),
                ("search", prefix),
            ],
        )?;
        let hits = body["search"]
            .as_array()
            .ok_or_else(|| ReconcileError::remote(url, "search response has no results list"))?;
        Ok(hits
            .iter()
            .filter_map(|hit| {
                Some(PropertyHit {
                    id: hit["id"].as_str()?.to_string(),
                    label: hit["label"].as_str()?.to_string(),
                    description: hit["description"].as_str().map(String::from),
                })
            })
            .collect())
    }

    /// Full-text search over the file namespace.
    pub fn search_files(&self, text: &str, limit: u32) -> Result<Vec<FileHit>, ReconcileError> {
        let url = &self.endpoints.commons_api;
        let limit = limit.to_string();
        let body = self.call(
            url,
            &[
                ("action", "query"),
                ("list", "search"),
                ("srsearch", text),
                ("srnamespace", FILE_NAMESPACE),
                ("srlimit", &limit),
                ("format", "json"),
            ],
        )?;
        let hits = body["query"]["search"]
            .as_array()
            .ok_or_else(|| ReconcileError::remote(url, "search response has no results list"))?;
        Ok(hits
            .iter()
            .filter_map(|hit| {
                Some(FileHit {
                    page_id: hit["pageid"].as_u64()?,
                    title: hit["title"].as_str()?.to_string(),
                })
            })
            .collect())
    }

    /// Display metadata for a page id. `None` if the page does not exist.
    pub fn media_info(&self, page_id: u64) -> Result<Option<MediaInfo>, ReconcileError> {
        let id = page_id.to_string();
        let url = &self.endpoints.commons_api;
        let body = self.call(
            url,
            &[
                ("action", "query"),
                ("pageids", &id),
                ("format", "json"),
                ("prop", "imageinfo"),
                ("iiprop", "url|size"),
            ],
        )?;
        let Some(page) = query_pages(url, &body)?.get(&id) else {
            return Ok(None);
        };
        if page.get("missing").is_some() {
            return Ok(None);
        }
        let info = &page["imageinfo"][0];
        let (Some(title), Some(media_url)) = (page["title"].as_str(), info["url"].as_str()) else {
            return Ok(None);
        };
        Ok(Some(MediaInfo {
            url: media_url.to_string(),
            title: title.to_string(),
            width: info["width"].as_u64().unwrap_or(0),
            height: info["height"].as_u64().unwrap_or(0),
            size: info["size"].as_u64().unwrap_or(0),
        }))
    }

    // ── Internal helpers ────────────────────────────────────────────

    /// Call the remote and turn an API-level `error` object into `Remote`.
    fn call(&self, url: &str, params: &[(&str, &str)]) -> Result<Value, ReconcileError> {
        debug!("GET {url} {}", describe_params(params));
        let body = self.fetcher.fetch_json(url, params)?;
        if let Some(message) = api_error(&body) {
            return Err(ReconcileError::remote(url, message));
        }
        Ok(body)
    }

    /// `wbgetentities` over `ids` in chunks of `batch_size`.
    ///
    /// Returns the union of all `entities` maps and the number of skipped
    /// batches. A batch is skipped when the remote answers with an `error`
    /// object or the transport fails; if every batch fails on transport the
    /// last error is returned instead. A body with neither `entities` nor
    /// `error` is rejected as invalid input.
    fn fetch_entities_batched(
        &self,
        url: &str,
        ids: &[String],
        extra: &[(&str, &str)],
    ) -> Result<(Map<String, Value>, usize), ReconcileError> {
        let mut merged = Map::new();
        let mut failed = 0;
        let mut last_transport_error = None;
        let batches = ids.chunks(self.batch_size);
        let batch_count = batches.len();

        for (index, chunk) in batches.enumerate() {
            let joined = chunk.join("|");
            let mut params = vec![("action", "wbgetentities"), ("format", "json"), ("ids", joined.as_str())];
            params.extend_from_slice(extra);

            debug!("GET {url} batch {}/{batch_count} ({} ids)", index + 1, chunk.len());
            let body = match self.fetcher.fetch_json(url, &params) {
                Ok(body) => body,
                Err(err) => {
                    warn!("entity batch {}/{batch_count} skipped: {err}", index + 1);
                    failed += 1;
                    last_transport_error = Some(err);
                    continue;
                }
            };

            if let Some(message) = api_error(&body) {
                warn!("entity batch {}/{batch_count} skipped: {message}", index + 1);
                failed += 1;
                continue;
            }

            match body.get("entities").and_then(Value::as_object) {
                Some(entities) => {
                    merged.extend(entities.iter().map(|(k, v)| (k.clone(), v.clone())));
                }
                None => {
                    return Err(ReconcileError::invalid_input(format!(
                        "entity lookup response from {url} has no entities"
                    )));
                }
            }
        }

        if batch_count > 0 && merged.is_empty() {
            if let Some(err) = last_transport_error.filter(|_| failed == batch_count) {
                return Err(err);
            }
        }

        Ok((merged, failed))
    }
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Message of an API-level `error` object, if the body carries one.
fn api_error(body: &Value) -> Option<String> {
    let error = body.get("error")?;
    let message = error["info"]
        .as_str()
        .or_else(|| error["code"].as_str())
        .unwrap_or("unknown error");
    Some(message.to_string())
}

fn query_pages<'a>(url: &str, body: &'a Value) -> Result<&'a Map<String, Value>, ReconcileError> {
    body["query"]["pages"]
        .as_object()
        .ok_or_else(|| ReconcileError::remote(url, "query response has no pages"))
}

fn entity_record(value: &Value) -> EntityRecord {
    // The repository sends `"statements": []` for an entity without any.
    let source = value
        .get("statements")
        .filter(|s| s.is_object())
        .or_else(|| value.get("claims"))
        .and_then(Value::as_object);
    let statements = source
        .map(|map| {
            map.iter()
                .map(|(property, claims)| {
                    (property.clone(), claims.as_array().cloned().unwrap_or_default())
                })
                .collect()
        })
        .unwrap_or_default();
    EntityRecord { statements }
}

fn describe_params(params: &[(&str, &str)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}
