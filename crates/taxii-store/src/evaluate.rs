//! Query evaluation shared by every store.
//!
//! Stores only differ in how they fetch candidate records; filtering, version
//! selection and paging happen here so the semantics are identical.
//!
//! Order of operations:
//! 1. restrict to the collection (nothing there is `CollectionNotFound`)
//! 2. `match[id]` and `match[type]`
//! 3. version selection per object id
//! 4. `added_after` (strictly later)
//! 5. sort by date added, then id, then version
//! 6. page by offset and record limit

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use chrono::{DateTime, Utc};

use taxii_core::{Bundle, CollectionQuery, StixObject, VersionSelector, timestamp};

use crate::error::{StoreError, StoreResult};
use crate::models::{BundleResult, ResultRange, StoredObject};

/// Evaluate `query` over `records`.
pub fn evaluate<'a, I>(records: I, query: &CollectionQuery) -> StoreResult<BundleResult>
where
    I: IntoIterator<Item = &'a StoredObject>,
{
    let in_collection: Vec<&StoredObject> = records
        .into_iter()
        .filter(|r| r.collection_id == query.collection_id)
        .collect();

    if in_collection.is_empty() {
        return Err(StoreError::CollectionNotFound(query.collection_id.clone()));
    }

    let matched: Vec<&StoredObject> = in_collection
        .into_iter()
        .filter(|r| query.object_ids.is_empty() || query.object_ids.iter().any(|id| id == r.id()))
        .filter(|r| {
            query.object_types.is_empty()
                || r.object
                    .object_type()
                    .is_some_and(|t| query.object_types.iter().any(|wanted| wanted == t))
        })
        .collect();

    let selectors = query.version_selectors();
    let mut selected = select_versions(matched, &selectors);

    if let Some(after) = query.added_after {
        selected.retain(|r| r.date_added > after);
    }

    selected.sort_by(|a, b| {
        a.date_added
            .cmp(&b.date_added)
            .then_with(|| a.id().cmp(b.id()))
            .then_with(|| version_key(a).cmp(&version_key(b)))
    });

    let total = selected.len();
    if total == 0 {
        return Err(StoreError::NoResults(query.collection_id.clone()));
    }

    let offset = query.offset();
    if offset >= total {
        return Err(StoreError::RangeNotSatisfiable {
            begin: offset,
            total,
        });
    }

    let end = total.min(offset + query.record_limit());
    let page = &selected[offset..end];

    Ok(BundleResult {
        bundle: Bundle::new(page.iter().map(|r| r.object.clone()).collect()),
        date_added_first: page.first().map(|r| r.date_added),
        date_added_last: page.last().map(|r| r.date_added),
        range: page.last().map(|_| ResultRange {
            first: offset,
            last: end - 1,
            total,
        }),
    })
}

/// Pick one version out of the stored versions of a single object.
///
/// `version` is a `match[version]` style selector; `all` is rejected since a
/// lookup returns exactly one object. A collection restricts the candidates.
pub fn select_object<'a, I>(
    records: I,
    collection_id: Option<&str>,
    id: &str,
    version: &str,
) -> StoreResult<StixObject>
where
    I: IntoIterator<Item = &'a StoredObject>,
{
    let selector = VersionSelector::parse(version)
        .map_err(|e| StoreError::InvalidQuery(e.to_string()))?;
    if selector == VersionSelector::All {
        return Err(StoreError::InvalidQuery(
            "a single object lookup needs one version".to_string(),
        ));
    }

    let versions: Vec<&StoredObject> = records
        .into_iter()
        .filter(|r| r.id() == id)
        .filter(|r| collection_id.is_none_or(|c| r.collection_id == c))
        .collect();

    select_versions(versions, &[selector])
        .into_iter()
        .next()
        .map(|r| r.object.clone())
        .ok_or_else(|| StoreError::ObjectNotFound {
            id: id.to_string(),
            version: version.to_string(),
        })
}

/// Keep the records that at least one selector picks, judged per object id.
fn select_versions<'a>(
    records: Vec<&'a StoredObject>,
    selectors: &[VersionSelector],
) -> Vec<&'a StoredObject> {
    if selectors.contains(&VersionSelector::All) {
        return records;
    }

    let mut bounds: HashMap<&str, (VersionKey, VersionKey)> = HashMap::new();
    for &record in &records {
        let key = version_key(record);
        match bounds.entry(record.id()) {
            Entry::Occupied(mut entry) => {
                let (min, max) = entry.get_mut();
                if key < *min {
                    *min = key.clone();
                }
                if key > *max {
                    *max = key;
                }
            }
            Entry::Vacant(entry) => {
                entry.insert((key.clone(), key));
            }
        }
    }

    records
        .into_iter()
        .filter(|record| {
            let key = version_key(record);
            let (min, max) = &bounds[record.id()];
            selectors.iter().any(|selector| match selector {
                VersionSelector::First => key == *min,
                VersionSelector::Last => key == *max,
                VersionSelector::All => true,
                VersionSelector::At(at) => key.0 == Some(*at),
            })
        })
        .collect()
}

/// Sort key for object versions: the parsed timestamp, then the raw string
/// for versions that do not parse.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct VersionKey(Option<DateTime<Utc>>, String);

fn version_key(record: &StoredObject) -> VersionKey {
    let raw = record.object.version().unwrap_or_default();
    VersionKey(timestamp::parse(raw).ok(), raw.to_string())
}
