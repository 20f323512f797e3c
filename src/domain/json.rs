//! JSON boundary adapter
//!
//! Converts FHIR-style JSON resources into a [`Document`] tree and back.
//! JSON does not carry element types, so primitives and nested objects are
//! typed from a hint table keyed by element name, falling back to the JSON
//! kind of the value.

use super::errors::AnonymizerError;
use super::node::{Document, NodeId};
use super::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::HashMap;

/// Instance types whose values render as JSON integers
const INTEGER_TYPES: &[&str] = &["integer", "positiveInt", "unsignedInt"];

/// Element-name → instance-type hints used while reading JSON
///
/// Hints are only applied when they agree with the JSON kind: complex type
/// names (leading uppercase) type objects, primitive type names type scalars.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeHints(HashMap<String, String>);

impl TypeHints {
    /// Empty hint table (only JSON-kind inference)
    pub fn empty() -> Self {
        Self(HashMap::new())
    }

    /// Add or replace a hint
    pub fn with_hint(mut self, element: impl Into<String>, instance_type: impl Into<String>) -> Self {
        self.0.insert(element.into(), instance_type.into());
        self
    }

    /// Merge another table over this one
    pub fn extend(&mut self, other: &TypeHints) {
        for (element, instance_type) in &other.0 {
            self.0.insert(element.clone(), instance_type.clone());
        }
    }

    fn complex_type(&self, element: &str) -> Option<&str> {
        self.0
            .get(element)
            .map(String::as_str)
            .filter(|t| t.starts_with(|c: char| c.is_ascii_uppercase()))
    }

    fn primitive_type(&self, element: &str) -> Option<&str> {
        self.0
            .get(element)
            .map(String::as_str)
            .filter(|t| t.starts_with(|c: char| c.is_ascii_lowercase()))
    }
}

impl Default for TypeHints {
    fn default() -> Self {
        let builtin = [
            ("address", "Address"),
            ("name", "HumanName"),
            ("telecom", "ContactPoint"),
            ("identifier", "Identifier"),
            ("meta", "Meta"),
            ("security", "Coding"),
            ("tag", "Coding"),
            ("coding", "Coding"),
            ("code", "CodeableConcept"),
            ("period", "Period"),
            ("valueQuantity", "Quantity"),
            ("quantity", "Quantity"),
            ("subject", "Reference"),
            ("birthDate", "date"),
            ("deceasedDateTime", "dateTime"),
            ("effectiveDateTime", "dateTime"),
            ("issued", "instant"),
            ("lastUpdated", "instant"),
            ("gender", "code"),
            ("status", "code"),
            ("id", "id"),
            ("multipleBirthInteger", "integer"),
        ];
        Self(
            builtin
                .iter()
                .map(|(element, ty)| (element.to_string(), ty.to_string()))
                .collect(),
        )
    }
}

/// Reads JSON resources into documents
#[derive(Debug, Clone, Default)]
pub struct JsonDocumentReader {
    hints: TypeHints,
}

impl JsonDocumentReader {
    /// Reader using the built-in hints
    pub fn new() -> Self {
        Self::default()
    }

    /// Reader using the given hints on top of the built-ins
    pub fn with_hints(hints: &TypeHints) -> Self {
        let mut merged = TypeHints::default();
        merged.extend(hints);
        Self { hints: merged }
    }

    /// Parse a JSON resource; the top level must be an object with `resourceType`
    pub fn read(&self, value: &Value) -> Result<Document> {
        let object = value.as_object().ok_or_else(|| {
            AnonymizerError::Document("Top-level JSON value must be an object".to_string())
        })?;
        let resource_type = object
            .get("resourceType")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                AnonymizerError::Document("Top-level object has no resourceType".to_string())
            })?;

        let mut document = Document::new(resource_type);
        let root = document.root();
        self.read_members(&mut document, root, object);
        Ok(document)
    }

    /// Parse a JSON string
    pub fn read_str(&self, input: &str) -> Result<Document> {
        let value: Value = serde_json::from_str(input)?;
        self.read(&value)
    }

    fn read_members(&self, document: &mut Document, parent: NodeId, object: &Map<String, Value>) {
        for (key, value) in object {
            if key == "resourceType" {
                continue;
            }
            match value {
                Value::Array(items) => {
                    for item in items {
                        self.read_value(document, parent, key, item, true);
                    }
                }
                other => self.read_value(document, parent, key, other, false),
            }
        }
    }

    fn read_value(
        &self,
        document: &mut Document,
        parent: NodeId,
        key: &str,
        value: &Value,
        array_member: bool,
    ) {
        match value {
            Value::Null => {}
            Value::Object(object) => {
                let embedded = object.get("resourceType").and_then(Value::as_str);
                let instance_type = embedded
                    .or_else(|| self.hints.complex_type(key))
                    .unwrap_or("BackboneElement")
                    .to_string();
                let id = document.add_child(parent, key, instance_type, None, array_member);
                if embedded.is_some() {
                    document.mark_resource(id);
                }
                self.read_members(document, id, object);
            }
            Value::Array(items) => {
                // Nested arrays are not valid FHIR; flatten them into repeats
                for item in items {
                    self.read_value(document, parent, key, item, true);
                }
            }
            Value::String(s) => {
                let ty = self.hints.primitive_type(key).unwrap_or("string").to_string();
                document.add_child(parent, key, ty, Some(s.clone()), array_member);
            }
            Value::Number(n) => {
                let inferred = if n.is_f64() { "decimal" } else { "integer" };
                let ty = self.hints.primitive_type(key).unwrap_or(inferred).to_string();
                document.add_child(parent, key, ty, Some(n.to_string()), array_member);
            }
            Value::Bool(b) => {
                let ty = self.hints.primitive_type(key).unwrap_or("boolean").to_string();
                document.add_child(parent, key, ty, Some(b.to_string()), array_member);
            }
        }
    }
}

/// Render a document back to JSON
///
/// Leaves whose value was removed are omitted. Security labels written into
/// `meta.security` by the engine are ordinary nodes and render as codings.
pub fn write_document(document: &Document) -> Value {
    write_node(document, document.root()).unwrap_or_else(|| {
        let mut object = Map::new();
        object.insert(
            "resourceType".to_string(),
            Value::String(document.root_type().to_string()),
        );
        Value::Object(object)
    })
}

fn write_node(document: &Document, id: NodeId) -> Option<Value> {
    let node = document.node(id);

    if node.children().is_empty() {
        if document.is_resource(id) {
            let mut object = Map::new();
            object.insert(
                "resourceType".to_string(),
                Value::String(node.instance_type().to_string()),
            );
            return Some(Value::Object(object));
        }
        return node
            .value()
            .map(|value| scalar_to_json(node.instance_type(), value));
    }

    let mut object = Map::new();
    if document.is_resource(id) {
        object.insert(
            "resourceType".to_string(),
            Value::String(node.instance_type().to_string()),
        );
    }

    // Group children by name, keeping first-occurrence order
    let mut order: Vec<&str> = Vec::new();
    let mut groups: HashMap<&str, (bool, Vec<Value>)> = HashMap::new();
    for child in node.children() {
        let child_node = document.node(*child);
        let Some(rendered) = write_node(document, *child) else {
            continue;
        };
        let entry = groups.entry(child_node.name()).or_insert_with(|| {
            order.push(child_node.name());
            (false, Vec::new())
        });
        entry.0 |= child_node.is_array_member();
        entry.1.push(rendered);
    }

    for name in order {
        if let Some((is_array, mut values)) = groups.remove(name) {
            let rendered = if is_array || values.len() > 1 {
                Value::Array(values)
            } else {
                values.remove(0)
            };
            object.insert(name.to_string(), rendered);
        }
    }

    if object.is_empty() {
        None
    } else {
        Some(Value::Object(object))
    }
}

fn scalar_to_json(instance_type: &str, value: &str) -> Value {
    if INTEGER_TYPES.contains(&instance_type) {
        if let Ok(n) = value.parse::<i64>() {
            return Value::Number(n.into());
        }
    }
    if instance_type == "decimal" {
        if let Some(n) = value.parse::<f64>().ok().and_then(Number::from_f64) {
            return Value::Number(n);
        }
    }
    if instance_type == "boolean" {
        if let Ok(b) = value.parse::<bool>() {
            return Value::Bool(b);
        }
    }
    Value::String(value.to_string())
}
