//! Structural shapes and the unifier that widens them.
//!
//! A `Shape` is the union of every structural variant observed at one
//! position: a set of scalar kinds, at most one object variant and at most one
//! array variant. Folding a value into a shape only ever adds kinds and
//! properties, and only ever shrinks `required`, so the result does not depend
//! on the order values are folded in.
//!
//! Shapes persist as JSON-Schema documents (`type`, `properties`, `required`,
//! `items`); see `Shape::to_document`.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::error::{Error, Result};
use crate::record::Record;

/// Structural kind of a JSON value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Kind {
    Null,
    Boolean,
    Integer,
    Number,
    String,
    Array,
    Object,
}

impl Kind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Null => "null",
            Kind::Boolean => "boolean",
            Kind::Integer => "integer",
            Kind::Number => "number",
            Kind::String => "string",
            Kind::Array => "array",
            Kind::Object => "object",
        }
    }

    pub fn parse(s: &str) -> Option<Kind> {
        Some(match s {
            "null" => Kind::Null,
            "boolean" => Kind::Boolean,
            "integer" => Kind::Integer,
            "number" => Kind::Number,
            "string" => Kind::String,
            "array" => Kind::Array,
            "object" => Kind::Object,
            _ => return None,
        })
    }

    pub fn of(v: &Value) -> Kind {
        match v {
            Value::Null => Kind::Null,
            Value::Bool(_) => Kind::Boolean,
            Value::Number(n) if is_integer_literal(n) => Kind::Integer,
            Value::Number(_) => Kind::Number,
            Value::String(_) => Kind::String,
            Value::Array(_) => Kind::Array,
            Value::Object(_) => Kind::Object,
        }
    }

    fn is_scalar(&self) -> bool {
        !matches!(self, Kind::Array | Kind::Object)
    }
}

/// Integers are classified by their literal text, so values outside the
/// i64/u64 range stay `integer`. `5.0` and `1e3` are numbers.
fn is_integer_literal(n: &Number) -> bool {
    n.is_i64() || n.is_u64() || !n.to_string().contains(|c: char| matches!(c, '.' | 'e' | 'E'))
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Object variant: named fields plus the fields present in every observed object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectShape {
    pub properties: BTreeMap<String, Shape>,
    /// `None` until an object has been observed here.
    pub required: Option<BTreeSet<String>>,
}

impl ObjectShape {
    fn observe(&mut self, map: &Map<String, Value>) {
        for (name, value) in map {
            self.properties.entry(name.clone()).or_default().observe(value);
        }
        let keys: BTreeSet<String> = map.keys().cloned().collect();
        self.narrow_required(Some(&keys));
    }

    fn merge(&mut self, other: &ObjectShape) {
        for (name, shape) in &other.properties {
            self.properties.entry(name.clone()).or_default().merge(shape);
        }
        self.narrow_required(other.required.as_ref());
    }

    // `None` behaves as the set of all names.
    fn narrow_required(&mut self, other: Option<&BTreeSet<String>>) {
        let Some(other) = other else { return };
        self.required = Some(match self.required.take() {
            None => other.clone(),
            Some(mine) => mine.intersection(other).cloned().collect(),
        });
    }

    pub fn is_required(&self, name: &str) -> bool {
        self.required.as_ref().is_some_and(|r| r.contains(name))
    }

    fn is_superset_of(&self, other: &ObjectShape) -> bool {
        let props = other.properties.iter().all(|(name, theirs)| {
            self.properties
                .get(name)
                .is_some_and(|mine| mine.is_superset_of(theirs))
        });
        let required = match (&self.required, &other.required) {
            (_, None) => true,
            (None, Some(_)) => false,
            (Some(mine), Some(theirs)) => mine.is_subset(theirs),
        };
        props && required
    }
}

/// Array variant. `items` stays `None` while only empty arrays were seen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArrayShape {
    pub items: Option<Box<Shape>>,
}

impl ArrayShape {
    fn observe(&mut self, values: &[Value]) {
        for v in values {
            self.items.get_or_insert_with(Default::default).observe(v);
        }
    }

    fn merge(&mut self, other: &ArrayShape) {
        if let Some(theirs) = &other.items {
            self.items.get_or_insert_with(Default::default).merge(theirs);
        }
    }

    fn is_superset_of(&self, other: &ArrayShape) -> bool {
        match (&self.items, &other.items) {
            (_, None) => true,
            (None, Some(_)) => false,
            (Some(mine), Some(theirs)) => mine.is_superset_of(theirs),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct Shape {
    scalars: BTreeSet<Kind>,
    object: Option<ObjectShape>,
    array: Option<ArrayShape>,
}

impl Shape {
    /// Seed for a stream with no persisted shape: `{"type":"object","properties":{}}`.
    pub fn empty_object() -> Self {
        Self {
            object: Some(ObjectShape::default()),
            ..Default::default()
        }
    }

    pub fn of_value(v: &Value) -> Self {
        let mut s = Shape::default();
        s.observe(v);
        s
    }

    /// Every kind this shape admits, sorted.
    pub fn kinds(&self) -> BTreeSet<Kind> {
        let mut out = self.scalars.clone();
        if self.array.is_some() {
            out.insert(Kind::Array);
        }
        if self.object.is_some() {
            out.insert(Kind::Object);
        }
        out
    }

    pub fn object(&self) -> Option<&ObjectShape> {
        self.object.as_ref()
    }

    pub fn array(&self) -> Option<&ArrayShape> {
        self.array.as_ref()
    }

    pub fn property(&self, name: &str) -> Option<&Shape> {
        self.object.as_ref().and_then(|o| o.properties.get(name))
    }

    /// Widen this shape with one observed value.
    pub fn observe(&mut self, v: &Value) {
        match v {
            Value::Object(map) => self.object.get_or_insert_with(Default::default).observe(map),
            Value::Array(items) => self.array.get_or_insert_with(Default::default).observe(items),
            scalar => {
                self.scalars.insert(Kind::of(scalar));
            }
        }
    }

    /// Widen this shape with every variant of `other`.
    pub fn merge(&mut self, other: &Shape) {
        self.scalars.extend(other.scalars.iter().copied());
        if let Some(theirs) = &other.object {
            self.object.get_or_insert_with(Default::default).merge(theirs);
        }
        if let Some(theirs) = &other.array {
            self.array.get_or_insert_with(Default::default).merge(theirs);
        }
    }

    /// True when every variant, field and item shape of `other` is admitted
    /// here and no field required here is optional in `other`.
    pub fn is_superset_of(&self, other: &Shape) -> bool {
        if !self.scalars.is_superset(&other.scalars) {
            return false;
        }
        let objects = match (&self.object, &other.object) {
            (_, None) => true,
            (None, Some(_)) => false,
            (Some(mine), Some(theirs)) => mine.is_superset_of(theirs),
        };
        let arrays = match (&self.array, &other.array) {
            (_, None) => true,
            (None, Some(_)) => false,
            (Some(mine), Some(theirs)) => mine.is_superset_of(theirs),
        };
        objects && arrays
    }

    /// Render as a JSON-Schema document. Keys are emitted in sorted order.
    pub fn to_document(&self) -> Value {
        let mut doc = Map::new();
        let mut kinds: Vec<Value> = self
            .kinds()
            .into_iter()
            .map(|k| Value::String(k.as_str().to_string()))
            .collect();
        if kinds.len() == 1 {
            doc.insert("type".into(), kinds.remove(0));
        } else if !kinds.is_empty() {
            doc.insert("type".into(), Value::Array(kinds));
        }
        if let Some(obj) = &self.object {
            let props: Map<String, Value> = obj
                .properties
                .iter()
                .map(|(k, v)| (k.clone(), v.to_document()))
                .collect();
            doc.insert("properties".into(), Value::Object(props));
            if let Some(req) = &obj.required {
                doc.insert(
                    "required".into(),
                    Value::Array(req.iter().cloned().map(Value::String).collect()),
                );
            }
        }
        if let Some(ArrayShape { items: Some(items) }) = &self.array {
            doc.insert("items".into(), items.to_document());
        }
        Value::Object(doc)
    }

    /// Parse a JSON-Schema document. `anyOf`/`oneOf` alternatives are unified
    /// into a single shape; unknown keywords are ignored.
    pub fn from_document(doc: &Value) -> Result<Self> {
        let map = doc
            .as_object()
            .ok_or_else(|| Error::Schema(format!("shape document must be an object, got {doc}")))?;

        let mut shape = Shape::default();
        let mut kinds = BTreeSet::new();
        match map.get("type") {
            None => {}
            Some(Value::String(s)) => {
                kinds.insert(parse_kind(s)?);
            }
            Some(Value::Array(list)) => {
                for t in list {
                    let s = t
                        .as_str()
                        .ok_or_else(|| Error::Schema(format!("type entries must be strings, got {t}")))?;
                    kinds.insert(parse_kind(s)?);
                }
            }
            Some(other) => {
                return Err(Error::Schema(format!("type must be a string or array, got {other}")))
            }
        }

        shape.scalars = kinds.iter().copied().filter(Kind::is_scalar).collect();

        let has_props = map.contains_key("properties") || map.contains_key("required");
        if kinds.contains(&Kind::Object) || (kinds.is_empty() && has_props) {
            shape.object = Some(parse_object(map)?);
        }
        if kinds.contains(&Kind::Array) || (kinds.is_empty() && map.contains_key("items")) {
            let items = match map.get("items") {
                Some(doc) => Some(Box::new(Shape::from_document(doc)?)),
                None => None,
            };
            shape.array = Some(ArrayShape { items });
        }

        for keyword in ["anyOf", "oneOf"] {
            if let Some(alts) = map.get(keyword) {
                let alts = alts
                    .as_array()
                    .ok_or_else(|| Error::Schema(format!("{keyword} must be an array")))?;
                for alt in alts {
                    shape.merge(&Shape::from_document(alt)?);
                }
            }
        }

        Ok(shape)
    }
}

fn parse_kind(s: &str) -> Result<Kind> {
    Kind::parse(s).ok_or_else(|| Error::Schema(format!("unknown type name '{s}'")))
}

fn parse_object(map: &Map<String, Value>) -> Result<ObjectShape> {
    let mut obj = ObjectShape::default();
    match map.get("properties") {
        None => {}
        Some(Value::Object(props)) => {
            for (name, doc) in props {
                let field = Shape::from_document(doc)
                    .map_err(|e| e.with_context(format!("property '{name}'")))?;
                obj.properties.insert(name.clone(), field);
            }
        }
        Some(other) => {
            return Err(Error::Schema(format!("properties must be an object, got {other}")))
        }
    }
    if let Some(req) = map.get("required") {
        let list = req
            .as_array()
            .ok_or_else(|| Error::Schema(format!("required must be an array, got {req}")))?;
        let mut names = BTreeSet::new();
        for n in list {
            let n = n
                .as_str()
                .ok_or_else(|| Error::Schema(format!("required entries must be strings, got {n}")))?;
            names.insert(n.to_string());
        }
        obj.required = Some(names);
    }
    Ok(obj)
}

impl From<Shape> for Value {
    fn from(s: Shape) -> Value {
        s.to_document()
    }
}

impl TryFrom<Value> for Shape {
    type Error = Error;

    fn try_from(v: Value) -> Result<Shape> {
        Shape::from_document(&v)
    }
}

/// Folds records into a stream's shape, starting from a seed.
#[derive(Debug, Clone)]
pub struct ShapeBuilder {
    shape: Shape,
    records: u64,
}

impl ShapeBuilder {
    /// Start from the persisted shape, or the empty object shape when there is none.
    pub fn new(seed: Option<&Shape>) -> Self {
        Self {
            shape: seed.cloned().unwrap_or_else(Shape::empty_object),
            records: 0,
        }
    }

    pub fn add_record(&mut self, record: &Record) {
        self.shape
            .object
            .get_or_insert_with(Default::default)
            .observe(record);
        self.records += 1;
    }

    pub fn records_seen(&self) -> u64 {
        self.records
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn finish(self) -> Shape {
        self.shape
    }
}

/// `merge(seed, records) → shape` in one call.
pub fn merge<'a>(seed: Option<&Shape>, records: impl IntoIterator<Item = &'a Record>) -> Shape {
    let mut b = ShapeBuilder::new(seed);
    for r in records {
        b.add_record(r);
    }
    b.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rec(v: Value) -> Record {
        match v {
            Value::Object(m) => m,
            other => panic!("not an object: {other}"),
        }
    }

    fn kinds(s: &Shape) -> Vec<&'static str> {
        s.kinds().iter().map(|k| k.as_str()).collect()
    }

    #[test]
    fn empty_seed_document() {
        assert_eq!(
            Shape::empty_object().to_document(),
            json!({"type": "object", "properties": {}})
        );
    }

    #[test]
    fn optional_and_required_fields() {
        let records = [
            rec(json!({"id": 1})),
            rec(json!({"id": 2, "amt": 5.0})),
            rec(json!({"id": 3})),
        ];
        let shape = merge(None, &records);
        let obj = shape.object().unwrap();
        assert!(obj.is_required("id"));
        assert!(!obj.is_required("amt"));
        assert_eq!(kinds(shape.property("id").unwrap()), vec!["integer"]);
        assert_eq!(kinds(shape.property("amt").unwrap()), vec!["number"]);
        assert_eq!(
            shape.to_document(),
            json!({
                "type": "object",
                "properties": {
                    "amt": {"type": "number"},
                    "id": {"type": "integer"}
                },
                "required": ["id"]
            })
        );
    }

    #[test]
    fn conflicting_kinds_are_kept_as_union() {
        let records = [
            rec(json!({"v": 1})),
            rec(json!({"v": "one"})),
            rec(json!({"v": null})),
            rec(json!({"v": 1.5})),
        ];
        let shape = merge(None, &records);
        assert_eq!(
            kinds(shape.property("v").unwrap()),
            vec!["null", "integer", "number", "string"]
        );
        assert_eq!(
            shape.property("v").unwrap().to_document(),
            json!({"type": ["null", "integer", "number", "string"]})
        );
    }

    #[test]
    fn nested_objects_and_arrays() {
        let records = [
            rec(json!({"user": {"name": "a", "tags": ["x"]}})),
            rec(json!({"user": {"name": "b", "age": 3, "tags": []}, "list": [1, "two", {"k": true}]})),
        ];
        let shape = merge(None, &records);
        let user = shape.property("user").unwrap();
        assert!(user.object().unwrap().is_required("name"));
        assert!(user.object().unwrap().is_required("tags"));
        assert!(!user.object().unwrap().is_required("age"));
        let tags = user.property("tags").unwrap();
        assert_eq!(
            kinds(tags.array().unwrap().items.as_deref().unwrap()),
            vec!["string"]
        );
        let list_items = shape
            .property("list")
            .unwrap()
            .array()
            .unwrap()
            .items
            .as_deref()
            .unwrap();
        assert_eq!(kinds(list_items), vec!["integer", "string", "object"]);
        assert!(list_items.object().unwrap().is_required("k"));
    }

    #[test]
    fn integers_beyond_u64_stay_integers() {
        let big: Value = serde_json::from_str(r#"{"id":123456789012345678901234567,"f":1.0,"e":2e3}"#).unwrap();
        let shape = merge(None, [&rec(big.clone())]);
        assert_eq!(kinds(shape.property("id").unwrap()), vec!["integer"]);
        assert_eq!(kinds(shape.property("f").unwrap()), vec!["number"]);
        assert_eq!(kinds(shape.property("e").unwrap()), vec!["number"]);
        assert_eq!(big["id"].to_string(), "123456789012345678901234567");
    }

    #[test]
    fn empty_array_has_no_items() {
        let shape = merge(None, &[rec(json!({"a": []}))]);
        assert_eq!(shape.property("a").unwrap().to_document(), json!({"type": "array"}));
    }

    #[test]
    fn order_does_not_matter() {
        let r1 = rec(json!({"id": 1, "tags": ["a"]}));
        let r2 = rec(json!({"id": "x", "extra": {"n": null}}));
        let r3 = rec(json!({"id": 2.5, "tags": [1], "extra": {"n": 1, "m": false}}));
        let seed = Shape::from_document(&json!({
            "type": "object",
            "properties": {"id": {"type": "integer"}, "old": {"type": "string"}},
            "required": ["id", "old"]
        }))
        .unwrap();

        let a = merge(Some(&seed), [&r1, &r2, &r3]);
        let b = merge(Some(&seed), [&r3, &r1, &r2]);
        let c = merge(Some(&seed), [&r2, &r3, &r1]);
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(a.to_document(), c.to_document());
    }

    #[test]
    fn more_records_only_widen() {
        let r1 = [rec(json!({"id": 1, "name": "a"})), rec(json!({"id": 2, "name": "b"}))];
        let r2 = [rec(json!({"id": "3"})), rec(json!({"id": 4, "flag": true}))];
        let seed = Shape::empty_object();

        let small = merge(Some(&seed), &r1);
        let big = merge(Some(&seed), r1.iter().chain(r2.iter()));
        assert!(big.is_superset_of(&small));
        assert!(big.is_superset_of(&seed));
        assert!(!small.is_superset_of(&big));
        assert!(!big.object().unwrap().is_required("name"));
    }

    #[test]
    fn seed_is_preserved_and_widened() {
        let seed = merge(None, &[rec(json!({"id": 1, "legacy": "x"}))]);
        let next = merge(Some(&seed), &[rec(json!({"id": 2}))]);
        assert!(next.property("legacy").is_some());
        assert!(next.is_superset_of(&seed));
        assert!(!next.object().unwrap().is_required("legacy"));
    }

    #[test]
    fn document_round_trip() {
        let shape = merge(
            None,
            &[
                rec(json!({"a": [1, {"b": null}], "c": {"d": "x"}, "e": 1})),
                rec(json!({"a": [], "e": "s"})),
            ],
        );
        let doc = shape.to_document();
        let back = Shape::from_document(&doc).unwrap();
        assert_eq!(back, shape);
        assert_eq!(back.to_document(), doc);

        let via_serde: Shape = serde_json::from_value(serde_json::to_value(&shape).unwrap()).unwrap();
        assert_eq!(via_serde, shape);
    }

    #[test]
    fn any_of_alternatives_are_unified() {
        let doc = json!({
            "$schema": "http://json-schema.org/schema#",
            "type": "object",
            "properties": {
                "v": {"anyOf": [{"type": "string"}, {"type": "array", "items": {"type": "integer"}}]}
            }
        });
        let shape = Shape::from_document(&doc).unwrap();
        let v = shape.property("v").unwrap();
        assert_eq!(kinds(v), vec!["string", "array"]);
        assert!(shape.object().unwrap().required.is_none());
    }

    #[test]
    fn malformed_documents_are_rejected() {
        assert!(Shape::from_document(&json!("object")).is_err());
        assert!(Shape::from_document(&json!({"type": "decimal"})).is_err());
        assert!(Shape::from_document(&json!({"type": "object", "properties": []})).is_err());
        let err = Shape::from_document(&json!({
            "type": "object",
            "properties": {"x": {"type": 7}}
        }))
        .unwrap_err();
        assert!(err.to_string().contains("property 'x'"));
    }
}
