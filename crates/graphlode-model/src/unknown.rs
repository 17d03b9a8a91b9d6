//! Unknown-property preservation.
//!
//! Property keys containing ':' belong to namespaces the topology does
//! not declare. Instead of dropping them, the importer folds them into
//! a single JSON object stored under the topology's unknown key, and
//! the exporter splices them back so unrecognized data survives a full
//! import/export round trip.

use std::collections::BTreeMap;

use serde_json::Value as Json;
use tracing::warn;

use crate::value::ValueList;

/// Collect the unknown-namespaced properties of a node into a JSON
/// blob. Returns `None` when the node carries no unknown keys; the
/// blob is serialized with sorted keys so the result is stable.
pub fn preserve_unknown(properties: &BTreeMap<String, ValueList>) -> Option<String> {
    let mut unknown = serde_json::Map::new();
    for (key, values) in properties {
        if !key.contains(':') {
            continue;
        }
        let json: Vec<Json> = values.iter().map(|v| v.to_json()).collect();
        // Single values are stored unwrapped, matching the input form.
        let json = match <[Json; 1]>::try_from(json) {
            Ok([single]) => single,
            Err(list) => Json::Array(list),
        };
        unknown.insert(key.clone(), json);
    }
    if unknown.is_empty() {
        None
    } else {
        Some(Json::Object(unknown).to_string())
    }
}

/// Splice a preserved unknown-property blob back into a property map.
/// Malformed blobs are logged and skipped rather than failing the
/// export.
pub fn restore_unknown(blob: &str, properties: &mut BTreeMap<String, ValueList>) {
    let parsed: Json = match serde_json::from_str(blob) {
        Ok(parsed) => parsed,
        Err(err) => {
            warn!(error = %err, "ignoring malformed unknown-property blob");
            return;
        }
    };
    let Json::Object(map) = parsed else {
        warn!("ignoring unknown-property blob that is not an object");
        return;
    };
    for (key, value) in map {
        let values = match value {
            Json::Array(items) => items
                .into_iter()
                .map(|v| crate::Value::from_json(&v))
                .collect(),
            other => vec![crate::Value::from_json(&other)],
        };
        properties.insert(key, values);
    }
}
