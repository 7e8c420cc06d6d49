use std::collections::{BTreeMap, BTreeSet};

use log::{info, warn};

use crate::claims::{decode, Claim, Decoded};
use crate::error::ReconcileError;
use crate::gateway::{EntityBatch, FetchJson, Gateway};
use crate::model::{
    caption_name, Diagnostics, ExtendRequest, ExtendResult, MetaEntry, PropertySpec, Row, ValueCell,
    WIKITEXT_ID, WIKITEXT_NAME,
};
use crate::normalize::{normalize_media_id, page_id_of};

/// Build `meta` and `rows` for `request`.
///
/// `rows` has an entry for every distinct requested id, and each entry has
/// a (possibly empty) list for every requested property.
pub fn build_extend<F: FetchJson>(
    gateway: &Gateway<F>,
    request: &ExtendRequest,
    lang: &str,
) -> Result<ExtendResult, ReconcileError> {
    let ids = canonical_ids(&request.ids)?;
    let specs = dedup(request.specs());
    let mut diagnostics = Diagnostics::default();

    let (meta, unresolved) = describe_properties(gateway, &specs, lang)?;
    diagnostics.unresolved_labels += unresolved;

    let mut rows: BTreeMap<String, Row> = ids.iter().map(|id| (id.clone(), Row::new())).collect();

    let entities = if specs.iter().any(|s| matches!(s, PropertySpec::Property(_))) {
        let batch = gateway.get_entities(&ids, lang)?;
        diagnostics.failed_batches += batch.failed_batches;
        batch
    } else {
        EntityBatch::default()
    };

    let mut captions: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();

    for spec in &specs {
        let key = spec.id();
        match spec {
            PropertySpec::Property(property) => {
                let cells = property_cells(gateway, &entities, &ids, property, lang, &mut diagnostics)?;
                for (id, values) in cells {
                    if let Some(row) = rows.get_mut(&id) {
                        row.insert(key.clone(), values);
                    }
                }
            }
            PropertySpec::Wikitext => {
                for id in &ids {
                    let text = gateway.get_wikitext(page_id_of(id)?)?;
                    if let Some(row) = rows.get_mut(id) {
                        row.insert(key.clone(), vec![ValueCell::text(text)]);
                    }
                }
            }
            PropertySpec::Caption(caption_lang) => {
                for id in &ids {
                    if !captions.contains_key(id) {
                        captions.insert(id.clone(), gateway.get_captions(id)?);
                    }
                    let values = captions
                        .get(id)
                        .and_then(|by_lang| by_lang.get(caption_lang))
                        .map(|text| vec![ValueCell::text(text.clone())])
                        .unwrap_or_default();
                    if let Some(row) = rows.get_mut(id) {
                        row.insert(key.clone(), values);
                    }
                }
            }
        }
    }

    info!(
        "extend: {} ids x {} properties ({} meta entries, {} failed batches, {} dropped claims)",
        ids.len(),
        specs.len(),
        meta.len(),
        diagnostics.failed_batches,
        diagnostics.dropped_claims
    );

    Ok(ExtendResult { meta, rows, diagnostics })
}

/// `meta` entries for `specs`: synthetic properties first, in request
/// order, then knowledge-graph properties labelled through one lookup.
/// Returns the entries and the number of properties left without a label.
pub fn describe_properties<F: FetchJson>(
    gateway: &Gateway<F>,
    specs: &[PropertySpec],
    lang: &str,
) -> Result<(Vec<MetaEntry>, usize), ReconcileError> {
    let mut meta = Vec::new();
    let mut properties = Vec::new();

    for spec in specs {
        match spec {
            PropertySpec::Wikitext => meta.push(MetaEntry {
                id: WIKITEXT_ID.to_string(),
                name: WIKITEXT_NAME.to_string(),
            }),
            PropertySpec::Caption(caption_lang) => meta.push(MetaEntry {
                id: spec.id(),
                name: caption_name(caption_lang),
            }),
            PropertySpec::Property(id) => properties.push(id.clone()),
        }
    }

    let labels = gateway.get_labels(&properties, lang)?;
    let mut unresolved = 0;
    for id in properties {
        match labels.labels.get(&id) {
            Some(name) => meta.push(MetaEntry { id, name: name.clone() }),
            None => {
                warn!("property {id} has no label in {lang:?}; omitted from meta");
                unresolved += 1;
            }
        }
    }

    Ok((meta, unresolved))
}

/// Cells of one knowledge-graph property for every id. Entity references
/// from all ids are labelled together and appended after the other cells.
fn property_cells<F: FetchJson>(
    gateway: &Gateway<F>,
    entities: &EntityBatch,
    ids: &[String],
    property: &str,
    lang: &str,
    diagnostics: &mut Diagnostics,
) -> Result<Vec<(String, Vec<ValueCell>)>, ReconcileError> {
    let mut scanned = Vec::with_capacity(ids.len());
    let mut pending: BTreeSet<String> = BTreeSet::new();

    for id in ids {
        let statements = entities
            .entities
            .get(id)
            .map(|record| record.statements_for(property))
            .unwrap_or(&[]);

        let mut cells = Vec::new();
        let mut refs = Vec::new();
        for statement in statements {
            match decode(&Claim::from_statement(statement)) {
                Decoded::Cell(cell) => cells.push(cell),
                Decoded::Deferred(entity) => {
                    pending.insert(entity.clone());
                    refs.push(entity);
                }
                Decoded::Dropped => diagnostics.dropped_claims += 1,
            }
        }
        scanned.push((id.clone(), cells, refs));
    }

    let pending: Vec<String> = pending.into_iter().collect();
    let labels = gateway.get_labels(&pending, lang)?;
    diagnostics.failed_batches += labels.failed_batches;
    diagnostics.unresolved_labels += pending.iter().filter(|e| !labels.labels.contains_key(*e)).count();

    Ok(scanned
        .into_iter()
        .map(|(id, mut cells, refs)| {
            cells.extend(refs.into_iter().map(|entity| {
                let name = labels.labels.get(&entity).cloned().unwrap_or_else(|| entity.clone());
                ValueCell::Entity { id: entity, name }
            }));
            (id, cells)
        })
        .collect())
}

/// Bare, distinct media ids in request order.
fn canonical_ids(raw: &[String]) -> Result<Vec<String>, ReconcileError> {
    let ids = raw.iter().map(|id| normalize_media_id(id)).collect::<Result<Vec<_>, _>>()?;
    Ok(dedup(ids))
}

fn dedup<T: Clone + Ord>(items: Vec<T>) -> Vec<T> {
    let mut seen = BTreeSet::new();
    items.into_iter().filter(|item| seen.insert(item.clone())).collect()
}
