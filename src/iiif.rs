//! IIIF Presentation 3 / W3C Web Annotation document model.
//!
//! Source documents are loose JSON-LD, so they stay as `serde_json::Value`
//! and are classified into a [`Document`] variant by their declared `type`.
//! The accessors below pull out only what the loader walks.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::error::{AnnoSearchError, Result};

/// Entry point types accepted by a load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[value(rename_all = "PascalCase")]
pub enum SourceKind {
    Manifest,
    Collection,
    AnnotationCollection,
}

impl SourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Manifest => "Manifest",
            Self::Collection => "Collection",
            Self::AnnotationCollection => "AnnotationCollection",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fetched document, tagged by its declared type.
#[derive(Debug, Clone, PartialEq)]
pub enum Document {
    Manifest(Value),
    Collection(Value),
    AnnotationPage(Value),
    AnnotationCollection(Value),
}

impl Document {
    pub fn parse(value: Value) -> Result<Self> {
        match declared_type(&value) {
            Some("Manifest") => Ok(Self::Manifest(value)),
            Some("Collection") => Ok(Self::Collection(value)),
            Some("AnnotationPage") => Ok(Self::AnnotationPage(value)),
            Some("AnnotationCollection") => Ok(Self::AnnotationCollection(value)),
            Some(other) => Err(AnnoSearchError::parse(format!(
                "Unsupported document type: {other}"
            ))),
            None => Err(AnnoSearchError::parse("Document has no type")),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Manifest(_) => "Manifest",
            Self::Collection(_) => "Collection",
            Self::AnnotationPage(_) => "AnnotationPage",
            Self::AnnotationCollection(_) => "AnnotationCollection",
        }
    }

    /// Unwrap the body if it is of the expected kind.
    pub fn expect(self, kind: SourceKind) -> Result<Value> {
        match (kind, self) {
            (SourceKind::Manifest, Self::Manifest(v))
            | (SourceKind::Collection, Self::Collection(v))
            | (SourceKind::AnnotationCollection, Self::AnnotationCollection(v)) => Ok(v),
            (kind, other) => Err(AnnoSearchError::parse(format!(
                "Specification should be a {kind}, found {}",
                other.type_name()
            ))),
        }
    }

    pub fn into_annotation_page(self) -> Result<Value> {
        match self {
            Self::AnnotationPage(page) => Ok(page),
            other => Err(AnnoSearchError::parse(format!(
                "Expected an AnnotationPage, found {}",
                other.type_name()
            ))),
        }
    }
}

/// A textual annotation body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextualBody {
    pub value: String,
    pub language: Option<String>,
}

/// Where a page or collection comes from: inline in its parent, or by URI.
#[derive(Debug, Clone, PartialEq)]
pub enum Embedded {
    Inline(Value),
    Reference(String),
}

pub fn declared_type(value: &Value) -> Option<&str> {
    value
        .get("type")
        .or_else(|| value.get("@type"))
        .and_then(Value::as_str)
}

pub fn document_id(value: &Value) -> Option<&str> {
    value
        .get("id")
        .or_else(|| value.get("@id"))
        .and_then(Value::as_str)
        .filter(|id| !id.trim().is_empty())
}

fn items(value: &Value) -> &[Value] {
    value
        .get("items")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Resolve a nested page/collection entry. Entries with `items` are inline;
/// anything else has to be fetched by id.
fn embedded(entry: &Value) -> Option<Embedded> {
    match entry {
        Value::String(uri) => Some(Embedded::Reference(uri.clone())),
        Value::Object(obj) if obj.contains_key("items") => Some(Embedded::Inline(entry.clone())),
        Value::Object(_) => document_id(entry).map(|id| Embedded::Reference(id.to_string())),
        _ => None,
    }
}

/// The W3C annotation pages hanging off every canvas of a manifest, in order.
pub fn manifest_annotation_pages(manifest: &Value) -> Vec<Value> {
    items(manifest)
        .iter()
        .filter(|canvas| declared_type(canvas).is_none_or(|t| t == "Canvas"))
        .filter_map(|canvas| canvas.get("annotations").and_then(Value::as_array))
        .flatten()
        .cloned()
        .collect()
}

pub fn annotation_page_source(entry: &Value) -> Option<Embedded> {
    embedded(entry)
}

/// Manifest members of a collection.
pub fn collection_manifests(collection: &Value) -> Vec<&Value> {
    items(collection)
        .iter()
        .filter(|item| declared_type(item) == Some("Manifest"))
        .collect()
}

/// Nested collection members of a collection.
pub fn collection_subcollections(collection: &Value) -> Vec<Embedded> {
    items(collection)
        .iter()
        .filter(|item| declared_type(item) == Some("Collection"))
        .filter_map(embedded)
        .collect()
}

/// The `first` page of a W3C AnnotationCollection.
pub fn annotation_collection_first(collection: &Value) -> Option<Embedded> {
    collection.get("first").and_then(embedded)
}

/// Annotations of a page. Entries without an explicit type are kept.
pub fn page_annotations(page: &Value) -> impl Iterator<Item = &Value> {
    items(page)
        .iter()
        .filter(|item| item.is_object())
        .filter(|item| declared_type(item).is_none_or(|t| t == "Annotation"))
}

/// The page's `next` link, as a string or `{id}` object.
pub fn page_next(page: &Value) -> Option<String> {
    match page.get("next")? {
        Value::String(uri) if !uri.trim().is_empty() => Some(uri.clone()),
        obj @ Value::Object(_) => document_id(obj).map(str::to_string),
        _ => None,
    }
}

/// Textual bodies of an annotation. `body` may be a single object or an array.
pub fn textual_bodies(annotation: &Value) -> Vec<TextualBody> {
    let bodies: Vec<&Value> = match annotation.get("body") {
        Some(Value::Array(list)) => list.iter().collect(),
        Some(body @ Value::Object(_)) => vec![body],
        _ => Vec::new(),
    };
    bodies
        .into_iter()
        .filter(|body| declared_type(body).is_none_or(|t| t == "TextualBody"))
        .filter_map(|body| {
            let value = body.get("value").and_then(Value::as_str)?;
            Some(TextualBody {
                value: value.to_string(),
                language: first_language(body.get("language")),
            })
        })
        .collect()
}

fn first_language(language: Option<&Value>) -> Option<String> {
    match language? {
        Value::String(lang) => Some(lang.clone()),
        Value::Array(list) => list.first().and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

/// `{id, type}` provenance object attached to annotation targets.
pub fn part_of(source_uri: &str, kind: SourceKind) -> Value {
    json!({ "id": source_uri, "type": kind.as_str() })
}

/// Rewrite an annotation target so it carries `partOf`.
pub fn target_with_part_of(target: Option<&Value>, part_of: &Value) -> Value {
    match target {
        Some(Value::String(id)) => json!({ "id": id, "partOf": part_of }),
        Some(Value::Object(obj)) => {
            let mut obj = obj.clone();
            obj.insert("partOf".into(), part_of.clone());
            Value::Object(obj)
        }
        Some(Value::Array(list)) => Value::Array(
            list.iter()
                .map(|t| target_with_part_of(Some(t), part_of))
                .collect(),
        ),
        _ => {
            let mut obj = Map::new();
            obj.insert("partOf".into(), part_of.clone());
            Value::Object(obj)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest() -> Value {
        json!({
            "id": "https://example.org/manifest",
            "type": "Manifest",
            "items": [
                {
                    "id": "https://example.org/canvas/1",
                    "type": "Canvas",
                    "annotations": [
                        { "id": "https://example.org/page/1", "type": "AnnotationPage" },
                        {
                            "id": "https://example.org/page/2",
                            "type": "AnnotationPage",
                            "items": []
                        }
                    ]
                },
                { "id": "https://example.org/canvas/2", "type": "Canvas" }
            ]
        })
    }

    #[test]
    fn parse_classifies_by_type() {
        let doc = Document::parse(manifest()).unwrap();
        assert_eq!(doc.type_name(), "Manifest");
        assert!(Document::parse(json!({"type": "Canvas"})).is_err());
        assert!(Document::parse(json!({"id": "x"})).is_err());
    }

    #[test]
    fn expect_rejects_wrong_kind() {
        let doc = Document::parse(json!({"type": "Collection", "items": []})).unwrap();
        let err = doc.expect(SourceKind::Manifest).unwrap_err();
        assert_eq!(err.kind(), "parse");
        assert!(err.to_string().contains("should be a Manifest"));
    }

    #[test]
    fn annotation_pages_unwrap_only_as_pages() {
        let page = json!({"id": "https://example.org/page/1", "type": "AnnotationPage", "items": []});
        let doc = Document::parse(page.clone()).unwrap();
        assert_eq!(doc.into_annotation_page().unwrap(), page);

        let err = Document::parse(manifest()).unwrap().into_annotation_page().unwrap_err();
        assert_eq!(err.kind(), "parse");
        assert!(err.to_string().contains("found Manifest"));
    }

    #[test]
    fn manifest_pages_inline_and_reference() {
        let pages = manifest_annotation_pages(&manifest());
        assert_eq!(pages.len(), 2);
        assert_eq!(
            annotation_page_source(&pages[0]),
            Some(Embedded::Reference("https://example.org/page/1".into()))
        );
        assert!(matches!(
            annotation_page_source(&pages[1]),
            Some(Embedded::Inline(_))
        ));
    }

    #[test]
    fn textual_bodies_handle_arrays_and_languages() {
        let anno = json!({
            "body": [
                { "type": "TextualBody", "value": "Hello", "language": ["en", "fr"] },
                { "type": "Image", "id": "https://example.org/img.jpg" },
                { "type": "TextualBody", "value": "Bonjour", "language": "fr" }
            ]
        });
        let bodies = textual_bodies(&anno);
        assert_eq!(bodies.len(), 2);
        assert_eq!(bodies[0].language.as_deref(), Some("en"));
        assert_eq!(bodies[1].value, "Bonjour");
    }

    #[test]
    fn next_link_accepts_string_or_object() {
        assert_eq!(page_next(&json!({"next": "https://x/2"})).as_deref(), Some("https://x/2"));
        assert_eq!(
            page_next(&json!({"next": {"id": "https://x/3", "type": "AnnotationPage"}})).as_deref(),
            Some("https://x/3")
        );
        assert_eq!(page_next(&json!({})), None);
    }

    #[test]
    fn target_rewrite_covers_all_shapes() {
        let part = part_of("https://example.org/manifest", SourceKind::Manifest);

        let wrapped = target_with_part_of(Some(&json!("https://example.org/canvas/1")), &part);
        assert_eq!(wrapped["id"], "https://example.org/canvas/1");
        assert_eq!(wrapped["partOf"]["type"], "Manifest");

        let merged = target_with_part_of(
            Some(&json!({"type": "SpecificResource", "source": "c1"})),
            &part,
        );
        assert_eq!(merged["source"], "c1");
        assert_eq!(merged["partOf"]["id"], "https://example.org/manifest");

        let mapped = target_with_part_of(Some(&json!(["a", {"id": "b"}])), &part);
        assert_eq!(mapped.as_array().unwrap().len(), 2);
        assert!(mapped.as_array().unwrap().iter().all(|t| t.get("partOf").is_some()));

        let missing = target_with_part_of(None, &part);
        assert_eq!(missing["partOf"], part);
    }

    #[test]
    fn collection_members_split_by_type() {
        let collection = json!({
            "type": "Collection",
            "items": [
                { "id": "https://x/m1", "type": "Manifest" },
                { "id": "https://x/c1", "type": "Collection" },
                { "id": "https://x/c2", "type": "Collection", "items": [] }
            ]
        });
        assert_eq!(collection_manifests(&collection).len(), 1);
        let subs = collection_subcollections(&collection);
        assert_eq!(subs.len(), 2);
        assert_eq!(subs[0], Embedded::Reference("https://x/c1".into()));
        assert!(matches!(subs[1], Embedded::Inline(_)));
    }
}
