//! Index definitions posted to `POST /indexes` by `init`.

use serde_json::{Value, json};

use super::{annotations_index, autocomplete_index};

const CONFIG_VERSION: &str = "0.8";

/// Annotation records: searchable `body.value`, raw-tokenised identity and
/// filter fields, `created` as a fast datetime for range clauses.
pub fn annotations_index_config(index_id: &str) -> Value {
    json!({
        "version": CONFIG_VERSION,
        "index_id": annotations_index(index_id),
        "doc_mapping": {
            "mode": "dynamic",
            "field_mappings": [
                { "name": "id", "type": "text", "tokenizer": "raw" },
                { "name": "type", "type": "text", "tokenizer": "raw" },
                { "name": "motivation", "type": "text", "tokenizer": "raw", "fast": true },
                {
                    "name": "body",
                    "type": "json",
                    "tokenizer": "default",
                    "record": "position"
                },
                { "name": "target", "type": "json", "tokenizer": "raw" },
                {
                    "name": "created",
                    "type": "datetime",
                    "input_formats": ["rfc3339"],
                    "output_format": "rfc3339",
                    "fast": true
                }
            ]
        },
        "search_settings": {
            "default_search_fields": ["body.value"]
        },
        "indexing_settings": {
            "commit_timeout_secs": 30
        }
    })
}

/// Autocomplete term records, sortable by `frequency`.
pub fn autocomplete_index_config(index_id: &str) -> Value {
    json!({
        "version": CONFIG_VERSION,
        "index_id": autocomplete_index(index_id),
        "doc_mapping": {
            "field_mappings": [
                { "name": "term", "type": "text", "tokenizer": "raw" },
                { "name": "language", "type": "text", "tokenizer": "raw" },
                { "name": "frequency", "type": "u64", "fast": true }
            ]
        },
        "search_settings": {
            "default_search_fields": ["term"]
        },
        "indexing_settings": {
            "commit_timeout_secs": 30
        }
    })
}
