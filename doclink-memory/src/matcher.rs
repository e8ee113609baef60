//! Value matching for in-memory index lookups.
//!
//! Index lookups are equality lookups. Values are compared after normalizing their BSON
//! representation, so an `Int32` lookup value matches an `Int64` or `Double` field holding
//! the same number. Integers compare exactly; a `Double` equals an integer only when it is
//! integral and within `i64` range.

use bson::{Bson, Document, datetime::DateTime, oid::ObjectId, spec::BinarySubtype};
use std::collections::HashMap;

/// Type-erased, comparable representation of BSON values.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Bool(bool),
    /// `Int32` and `Int64`.
    Integer(i64),
    Double(f64),
    DateTime(DateTime),
    String(&'a str),
    ObjectId(ObjectId),
    Binary(BinarySubtype, &'a [u8]),
    Array(Vec<Comparable<'a>>),
    Map(HashMap<&'a str, Comparable<'a>>),
    /// Values that never compare equal, not even to themselves.
    Opaque,
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Null => Comparable::Null,
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Integer(i64::from(*value)),
            Bson::Int64(value) => Comparable::Integer(*value),
            Bson::Double(value) => Comparable::Double(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::ObjectId(value) => Comparable::ObjectId(*value),
            Bson::Binary(binary) => Comparable::Binary(binary.subtype, &binary.bytes),
            Bson::Array(arr) => Comparable::Array(
                arr
                    .iter()
                    .map(Comparable::from)
                    .collect::<Vec<_>>()
            ),
            Bson::Document(doc) => Comparable::Map(
                doc
                    .iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect::<HashMap<_, _>>()
            ),
            _ => Comparable::Opaque,
        }
    }
}

impl<'a> PartialEq for Comparable<'a> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Integer(a), Comparable::Integer(b)) => a == b,
            (Comparable::Double(a), Comparable::Double(b)) => a == b,
            (Comparable::Integer(i), Comparable::Double(d))
            | (Comparable::Double(d), Comparable::Integer(i)) => integer_equals_double(*i, *d),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a == b,
            (Comparable::Binary(a_subtype, a), Comparable::Binary(b_subtype, b)) => {
                a_subtype == b_subtype && a == b
            }
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            _ => false,
        }
    }
}

// 2^63 is exact as an f64; `i64::MAX as f64` rounds up to it.
const I64_UPPER_BOUND: f64 = 9_223_372_036_854_775_808.0;

fn integer_equals_double(integer: i64, double: f64) -> bool {
    double.fract() == 0.0
        && double >= -I64_UPPER_BOUND
        && double < I64_UPPER_BOUND
        && double as i64 == integer
}

/// Equality matcher for one `field == value` lookup.
pub(crate) struct FieldMatcher<'a> {
    field: &'a str,
    value: Comparable<'a>,
}

impl<'a> FieldMatcher<'a> {
    pub fn new(field: &'a str, value: &'a Bson) -> Self {
        Self { field, value: Comparable::from(value) }
    }

    /// Returns `true` if `document` holds the field and its value equals the lookup value.
    /// Documents lacking the field never match.
    pub fn matches(&self, document: &Bson) -> bool {
        document
            .as_document()
            .and_then(|document: &Document| document.get(self.field))
            .is_some_and(|value| Comparable::from(value) == self.value)
    }

    /// Returns clones of the matching documents, preserving iteration order.
    pub fn filter_documents<'d>(&self, documents: impl IntoIterator<Item = &'d Bson>) -> Vec<Bson> {
        documents
            .into_iter()
            .filter(|document| self.matches(document))
            .cloned()
            .collect()
    }
}
