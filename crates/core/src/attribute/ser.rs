//! Marshaller: domain values to attribute trees.
//!
//! Dispatch follows the runtime shape reported by each `Serialize`
//! implementation, so any serde-enabled record marshals without a schema.

use std::collections::HashMap;
use std::fmt::Display;

use chrono::DateTime;
use serde::ser::{self, Serialize};

use super::error::{MarshalError, MarshalErrorKind, Segment};
use super::set::{NUMBER_SET, STRING_SET};
use super::value::{AttributeValue, Item};

/// Maximum nesting depth of a marshalled value; matches the store's own limit.
pub const MAX_DEPTH: usize = 32;

/// Marshals a record into a top-level item.
///
/// Fails with [`MarshalErrorKind::NotARecord`] when the value does not
/// marshal to a map (strings, numbers, lists, ...).
pub fn to_item<T>(value: &T) -> Result<Item, MarshalError>
where
    T: Serialize + ?Sized,
{
    match to_attribute_value(value)? {
        AttributeValue::M(map) => Ok(map),
        other => Err(MarshalError::new(MarshalErrorKind::NotARecord(
            other.kind(),
        ))),
    }
}

/// Marshals any value into a single attribute.
pub fn to_attribute_value<T>(value: &T) -> Result<AttributeValue, MarshalError>
where
    T: Serialize + ?Sized,
{
    value.serialize(Marshaller { depth: 0 })
}

#[derive(Debug, Clone, Copy)]
struct Marshaller {
    depth: usize,
}

impl Marshaller {
    /// Marshaller for the children of a container at the current depth.
    fn nested(self) -> Result<Self, MarshalError> {
        let depth = self.depth + 1;
        if depth > MAX_DEPTH {
            return Err(MarshalError::new(MarshalErrorKind::DepthLimitExceeded(
                MAX_DEPTH,
            )));
        }
        Ok(Self { depth })
    }

    fn number(self, value: impl Display) -> Result<AttributeValue, MarshalError> {
        let text = value.to_string();
        if !fits_store_number(&text) {
            return Err(MarshalError::new(MarshalErrorKind::NumberOutOfRange(text)));
        }
        Ok(AttributeValue::N(text))
    }

    fn set<T>(self, value: &T, name: &'static str) -> Result<AttributeValue, MarshalError>
    where
        T: Serialize + ?Sized,
    {
        let elements = match value.serialize(self)? {
            AttributeValue::L(elements) => elements,
            other => {
                return Err(ser::Error::custom(format!(
                    "set must contain a sequence, found {}",
                    other.kind()
                )))
            }
        };

        // The store rejects empty sets; an empty list reads back the same way.
        if elements.is_empty() {
            tracing::debug!(set = name, "empty set marshalled as an empty list");
            return Ok(AttributeValue::L(elements));
        }

        let mut members: Vec<String> = Vec::with_capacity(elements.len());
        for (index, element) in elements.into_iter().enumerate() {
            let member = match (name, element) {
                (STRING_SET, AttributeValue::S(s)) => s,
                (NUMBER_SET, AttributeValue::N(n)) => n,
                (_, other) => {
                    let err: MarshalError = ser::Error::custom(format!(
                        "set members must all be {}, found {}",
                        if name == STRING_SET { "strings" } else { "numbers" },
                        other.kind()
                    ));
                    return Err(err.within(Segment::Index(index)));
                }
            };
            if !members.contains(&member) {
                members.push(member);
            }
        }

        Ok(if name == STRING_SET {
            AttributeValue::Ss(members)
        } else {
            AttributeValue::Ns(members)
        })
    }
}

/// Significant digits the store keeps for a number.
pub const MAX_NUMBER_PRECISION: usize = 38;

/// Accepts plain decimal text (no exponent) whose significant digits fit
/// [`MAX_NUMBER_PRECISION`] and whose magnitude lies in `1E-130..1E+126`.
fn fits_store_number(text: &str) -> bool {
    let unsigned = text.strip_prefix('-').unwrap_or(text);
    let (integer, fraction) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    let digits: Vec<u8> = integer.bytes().chain(fraction.bytes()).collect();

    let Some(first) = digits.iter().position(|&d| d != b'0') else {
        return true;
    };
    let last = digits.iter().rposition(|&d| d != b'0').unwrap_or(first);
    let exponent = integer.len() as i64 - 1 - first as i64;

    last - first < MAX_NUMBER_PRECISION && (-130..=125).contains(&exponent)
}

macro_rules! marshal_integer {
    ($($method:ident: $ty:ty),* $(,)?) => {
        $(
            fn $method(self, v: $ty) -> Result<AttributeValue, MarshalError> {
                self.number(v)
            }
        )*
    };
}

impl ser::Serializer for Marshaller {
    type Ok = AttributeValue;
    type Error = MarshalError;

    type SerializeSeq = ListMarshaller;
    type SerializeTuple = ListMarshaller;
    type SerializeTupleStruct = ListMarshaller;
    type SerializeTupleVariant = VariantMarshaller<ListMarshaller>;
    type SerializeMap = MapMarshaller;
    type SerializeStruct = MapMarshaller;
    type SerializeStructVariant = VariantMarshaller<MapMarshaller>;

    fn serialize_bool(self, v: bool) -> Result<AttributeValue, MarshalError> {
        Ok(AttributeValue::Bool(v))
    }

    marshal_integer! {
        serialize_i8: i8,
        serialize_i16: i16,
        serialize_i32: i32,
        serialize_i64: i64,
        serialize_i128: i128,
        serialize_u8: u8,
        serialize_u16: u16,
        serialize_u32: u32,
        serialize_u64: u64,
        serialize_u128: u128,
    }

    fn serialize_f32(self, v: f32) -> Result<AttributeValue, MarshalError> {
        if !v.is_finite() {
            return Err(MarshalError::new(MarshalErrorKind::NonFiniteNumber));
        }
        self.number(v)
    }

    fn serialize_f64(self, v: f64) -> Result<AttributeValue, MarshalError> {
        if !v.is_finite() {
            return Err(MarshalError::new(MarshalErrorKind::NonFiniteNumber));
        }
        self.number(v)
    }

    fn serialize_char(self, v: char) -> Result<AttributeValue, MarshalError> {
        Ok(AttributeValue::S(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> Result<AttributeValue, MarshalError> {
        Ok(AttributeValue::S(v.to_string()))
    }

    fn serialize_bytes(self, _v: &[u8]) -> Result<AttributeValue, MarshalError> {
        Err(MarshalError::new(MarshalErrorKind::Unsupported("byte array")))
    }

    fn serialize_none(self) -> Result<AttributeValue, MarshalError> {
        Ok(AttributeValue::Null)
    }

    fn serialize_some<T>(self, value: &T) -> Result<AttributeValue, MarshalError>
    where
        T: Serialize + ?Sized,
    {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<AttributeValue, MarshalError> {
        Ok(AttributeValue::Null)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<AttributeValue, MarshalError> {
        Ok(AttributeValue::Null)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<AttributeValue, MarshalError> {
        Ok(AttributeValue::S(variant.to_string()))
    }

    fn serialize_newtype_struct<T>(
        self,
        name: &'static str,
        value: &T,
    ) -> Result<AttributeValue, MarshalError>
    where
        T: Serialize + ?Sized,
    {
        match name {
            STRING_SET | NUMBER_SET => self.set(value, name),
            _ => value.serialize(self),
        }
    }

    fn serialize_newtype_variant<T>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<AttributeValue, MarshalError>
    where
        T: Serialize + ?Sized,
    {
        let inner = value
            .serialize(self.nested()?)
            .map_err(|e| e.within(Segment::Field(variant.to_string())))?;
        Ok(AttributeValue::M(HashMap::from([(
            variant.to_string(),
            inner,
        )])))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<ListMarshaller, MarshalError> {
        Ok(ListMarshaller {
            element: self.nested()?,
            items: Vec::with_capacity(len.unwrap_or(0)),
        })
    }

    fn serialize_tuple(self, len: usize) -> Result<ListMarshaller, MarshalError> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<ListMarshaller, MarshalError> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<VariantMarshaller<ListMarshaller>, MarshalError> {
        Ok(VariantMarshaller {
            variant,
            inner: self.nested()?.serialize_seq(Some(len))?,
        })
    }

    fn serialize_map(self, len: Option<usize>) -> Result<MapMarshaller, MarshalError> {
        Ok(MapMarshaller {
            value: self.nested()?,
            entries: HashMap::with_capacity(len.unwrap_or(0)),
            pending_key: None,
        })
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<MapMarshaller, MarshalError> {
        self.serialize_map(Some(len))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<VariantMarshaller<MapMarshaller>, MarshalError> {
        Ok(VariantMarshaller {
            variant,
            inner: self.nested()?.serialize_map(Some(len))?,
        })
    }

    fn collect_str<T>(self, value: &T) -> Result<AttributeValue, MarshalError>
    where
        T: Display + ?Sized,
    {
        let text = value.to_string();
        if crate::keys::is_valid_id(&text) || DateTime::parse_from_rfc3339(&text).is_ok() {
            tracing::debug!(value = %text, "marshalling value through its textual form");
        } else {
            tracing::warn!(
                value = %text,
                value_type = std::any::type_name::<T>(),
                "no structured form, falling back to the value's text"
            );
        }
        Ok(AttributeValue::S(text))
    }
}

#[doc(hidden)]
pub struct ListMarshaller {
    element: Marshaller,
    items: Vec<AttributeValue>,
}

impl ListMarshaller {
    fn push<T>(&mut self, value: &T) -> Result<(), MarshalError>
    where
        T: Serialize + ?Sized,
    {
        let index = self.items.len();
        let item = value
            .serialize(self.element)
            .map_err(|e| e.within(Segment::Index(index)))?;
        self.items.push(item);
        Ok(())
    }
}

impl ser::SerializeSeq for ListMarshaller {
    type Ok = AttributeValue;
    type Error = MarshalError;

    fn serialize_element<T>(&mut self, value: &T) -> Result<(), MarshalError>
    where
        T: Serialize + ?Sized,
    {
        self.push(value)
    }

    fn end(self) -> Result<AttributeValue, MarshalError> {
        Ok(AttributeValue::L(self.items))
    }
}

impl ser::SerializeTuple for ListMarshaller {
    type Ok = AttributeValue;
    type Error = MarshalError;

    fn serialize_element<T>(&mut self, value: &T) -> Result<(), MarshalError>
    where
        T: Serialize + ?Sized,
    {
        self.push(value)
    }

    fn end(self) -> Result<AttributeValue, MarshalError> {
        Ok(AttributeValue::L(self.items))
    }
}

impl ser::SerializeTupleStruct for ListMarshaller {
    type Ok = AttributeValue;
    type Error = MarshalError;

    fn serialize_field<T>(&mut self, value: &T) -> Result<(), MarshalError>
    where
        T: Serialize + ?Sized,
    {
        self.push(value)
    }

    fn end(self) -> Result<AttributeValue, MarshalError> {
        Ok(AttributeValue::L(self.items))
    }
}

#[doc(hidden)]
pub struct MapMarshaller {
    value: Marshaller,
    entries: HashMap<String, AttributeValue>,
    pending_key: Option<String>,
}

impl MapMarshaller {
    fn insert<T>(&mut self, key: String, value: &T) -> Result<(), MarshalError>
    where
        T: Serialize + ?Sized,
    {
        match value.serialize(self.value) {
            Ok(attribute) => {
                self.entries.insert(key, attribute);
                Ok(())
            }
            Err(e) => Err(e.within(Segment::Field(key))),
        }
    }
}

/// Map keys must end up as text; numbers and booleans fall back to their
/// decimal/textual form.
fn map_key(key: AttributeValue) -> Result<String, MarshalError> {
    match key {
        AttributeValue::S(s) => Ok(s),
        AttributeValue::N(n) => {
            tracing::warn!(key = %n, "non-string map key marshalled as text");
            Ok(n)
        }
        AttributeValue::Bool(b) => {
            tracing::warn!(key = b, "non-string map key marshalled as text");
            Ok(b.to_string())
        }
        other => Err(MarshalError::new(MarshalErrorKind::Unsupported(
            match other {
                AttributeValue::Null => "null map key",
                _ => "composite map key",
            },
        ))),
    }
}

impl ser::SerializeMap for MapMarshaller {
    type Ok = AttributeValue;
    type Error = MarshalError;

    fn serialize_key<T>(&mut self, key: &T) -> Result<(), MarshalError>
    where
        T: Serialize + ?Sized,
    {
        let key = key.serialize(self.value)?;
        self.pending_key = Some(map_key(key)?);
        Ok(())
    }

    fn serialize_value<T>(&mut self, value: &T) -> Result<(), MarshalError>
    where
        T: Serialize + ?Sized,
    {
        let key = self
            .pending_key
            .take()
            .ok_or_else(|| ser::Error::custom("map value serialized before its key"))?;
        self.insert(key, value)
    }

    fn end(self) -> Result<AttributeValue, MarshalError> {
        Ok(AttributeValue::M(self.entries))
    }
}

impl ser::SerializeStruct for MapMarshaller {
    type Ok = AttributeValue;
    type Error = MarshalError;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<(), MarshalError>
    where
        T: Serialize + ?Sized,
    {
        self.insert(key.to_string(), value)
    }

    fn end(self) -> Result<AttributeValue, MarshalError> {
        Ok(AttributeValue::M(self.entries))
    }
}

/// Wraps the payload of a tuple or struct enum variant as `{variant: payload}`.
#[doc(hidden)]
pub struct VariantMarshaller<I> {
    variant: &'static str,
    inner: I,
}

impl<I> VariantMarshaller<I> {
    fn wrap(variant: &'static str, payload: AttributeValue) -> AttributeValue {
        AttributeValue::M(HashMap::from([(variant.to_string(), payload)]))
    }

    fn context(&self, err: MarshalError) -> MarshalError {
        err.within(Segment::Field(self.variant.to_string()))
    }
}

impl ser::SerializeTupleVariant for VariantMarshaller<ListMarshaller> {
    type Ok = AttributeValue;
    type Error = MarshalError;

    fn serialize_field<T>(&mut self, value: &T) -> Result<(), MarshalError>
    where
        T: Serialize + ?Sized,
    {
        let result = self.inner.push(value);
        result.map_err(|e| self.context(e))
    }

    fn end(self) -> Result<AttributeValue, MarshalError> {
        let payload = ser::SerializeSeq::end(self.inner)?;
        Ok(Self::wrap(self.variant, payload))
    }
}

impl ser::SerializeStructVariant for VariantMarshaller<MapMarshaller> {
    type Ok = AttributeValue;
    type Error = MarshalError;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<(), MarshalError>
    where
        T: Serialize + ?Sized,
    {
        let result = self.inner.insert(key.to_string(), value);
        result.map_err(|e| self.context(e))
    }

    fn end(self) -> Result<AttributeValue, MarshalError> {
        let payload = ser::SerializeMap::end(self.inner)?;
        Ok(Self::wrap(self.variant, payload))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde::Serialize;

    use super::*;
    use crate::attribute::{NumberSet, StringSet};

    fn s(value: &str) -> AttributeValue {
        AttributeValue::S(value.to_string())
    }

    fn n(value: &str) -> AttributeValue {
        AttributeValue::N(value.to_string())
    }

    #[derive(Serialize)]
    struct Sample {
        id: String,
        price: f64,
        tags: Vec<String>,
        note: Option<String>,
    }

    #[test]
    fn test_marshal_record_with_null_field() {
        let sample = Sample {
            id: "a1".to_string(),
            price: 2.5,
            tags: vec!["x".to_string(), "y".to_string()],
            note: None,
        };

        let item = to_item(&sample).unwrap();

        assert_eq!(item.len(), 4);
        assert_eq!(item["id"], s("a1"));
        assert_eq!(item["price"], n("2.5"));
        assert_eq!(item["tags"], AttributeValue::L(vec![s("x"), s("y")]));
        assert_eq!(item["note"], AttributeValue::Null);
    }

    #[test]
    fn test_numbers_keep_their_lexical_form() {
        assert_eq!(to_attribute_value(&3).unwrap(), n("3"));
        assert_eq!(to_attribute_value(&8.5).unwrap(), n("8.5"));
        assert_eq!(to_attribute_value(&-42i64).unwrap(), n("-42"));
        assert_eq!(to_attribute_value(&0.1f32).unwrap(), n("0.1"));
        assert_eq!(to_attribute_value(&u64::MAX).unwrap(), n("18446744073709551615"));
    }

    #[test]
    fn test_non_finite_float_is_rejected() {
        let err = to_attribute_value(&f64::NAN).unwrap_err();
        assert_eq!(err.kind, MarshalErrorKind::NonFiniteNumber);
    }

    #[test]
    fn test_empty_list_is_kept() {
        #[derive(Serialize)]
        struct Holder {
            items: Vec<u32>,
        }

        let item = to_item(&Holder { items: vec![] }).unwrap();
        assert_eq!(item["items"], AttributeValue::L(vec![]));
    }

    #[test]
    fn test_skipped_fields_are_omitted() {
        #[derive(Serialize)]
        struct Partial {
            name: &'static str,
            #[serde(skip_serializing_if = "Option::is_none")]
            icon: Option<String>,
            color: Option<String>,
        }

        let item = to_item(&Partial {
            name: "Drinks",
            icon: None,
            color: None,
        })
        .unwrap();

        assert!(!item.contains_key("icon"));
        assert_eq!(item["color"], AttributeValue::Null);
    }

    #[test]
    fn test_top_level_must_be_a_record() {
        let err = to_item(&"plain").unwrap_err();
        assert_eq!(err.kind, MarshalErrorKind::NotARecord("string"));
        assert!(err.path.is_root());
    }

    #[test]
    fn test_bytes_are_unsupported_and_reported_with_path() {
        #[derive(Serialize)]
        struct Blob<'a> {
            #[serde(with = "serde_bytes_like")]
            data: &'a [u8],
        }

        mod serde_bytes_like {
            pub fn serialize<S: serde::Serializer>(v: &&[u8], s: S) -> Result<S::Ok, S::Error> {
                s.serialize_bytes(v)
            }
        }

        let err = to_item(&Blob { data: b"abc" }).unwrap_err();
        assert_eq!(err.kind, MarshalErrorKind::Unsupported("byte array"));
        assert_eq!(err.path.to_string(), "data");
    }

    #[test]
    fn test_error_path_points_into_nested_lists() {
        #[derive(Serialize)]
        struct Modifier {
            #[serde(rename = "priceDelta")]
            price_delta: f64,
        }
        #[derive(Serialize)]
        struct Line {
            modifiers: Vec<Modifier>,
        }
        #[derive(Serialize)]
        struct Doc {
            items: Vec<Line>,
        }

        let doc = Doc {
            items: vec![
                Line { modifiers: vec![] },
                Line {
                    modifiers: vec![
                        Modifier { price_delta: 1.0 },
                        Modifier {
                            price_delta: f64::INFINITY,
                        },
                    ],
                },
            ],
        };

        let err = to_item(&doc).unwrap_err();
        assert_eq!(err.path.to_string(), "items[1].modifiers[1].priceDelta");
    }

    #[test]
    fn test_enums_use_external_tagging() {
        #[derive(Serialize)]
        enum Station {
            Kitchen,
            Bar { seats: u8 },
            Remote(String),
        }

        assert_eq!(to_attribute_value(&Station::Kitchen).unwrap(), s("Kitchen"));

        let bar = to_attribute_value(&Station::Bar { seats: 4 }).unwrap();
        let inner = bar.as_m().unwrap()["Bar"].as_m().unwrap();
        assert_eq!(inner["seats"], n("4"));

        let remote = to_attribute_value(&Station::Remote("patio".to_string())).unwrap();
        assert_eq!(remote.as_m().unwrap()["Remote"], s("patio"));
    }

    #[test]
    fn test_sets_marshal_to_native_set_types() {
        let tags: StringSet = ["vegan", "spicy"].into_iter().collect();
        assert_eq!(
            to_attribute_value(&tags).unwrap(),
            AttributeValue::Ss(vec!["spicy".to_string(), "vegan".to_string()])
        );

        let sizes = NumberSet(vec![1.5, 2.0, 1.5]);
        assert_eq!(
            to_attribute_value(&sizes).unwrap(),
            AttributeValue::Ns(vec!["1.5".to_string(), "2".to_string()])
        );

        assert_eq!(
            to_attribute_value(&StringSet::new()).unwrap(),
            AttributeValue::L(vec![])
        );
    }

    #[test]
    fn test_integer_map_keys_fall_back_to_text() {
        let map = BTreeMap::from([(1u32, "one"), (2u32, "two")]);
        let value = to_attribute_value(&map).unwrap();
        let entries = value.as_m().unwrap();
        assert_eq!(entries["1"], s("one"));
        assert_eq!(entries["2"], s("two"));
    }

    #[test]
    fn test_display_values_fall_back_to_text() {
        let id = uuid::Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap();
        assert_eq!(
            to_attribute_value(&id).unwrap(),
            s("550e8400-e29b-41d4-a716-446655440000")
        );

        let at = chrono::DateTime::parse_from_rfc3339("2024-01-15T10:30:00Z").unwrap();
        assert_eq!(
            to_attribute_value(&at).unwrap(),
            s("2024-01-15T10:30:00Z")
        );

        let addr: std::net::Ipv4Addr = "10.0.0.7".parse().unwrap();
        assert_eq!(to_attribute_value(&addr).unwrap(), s("10.0.0.7"));
    }

    #[test]
    fn test_numbers_beyond_store_limits_are_rejected_with_path() {
        #[derive(Serialize)]
        struct Reading {
            value: f64,
        }

        let err = to_item(&Reading { value: f64::MAX }).unwrap_err();
        assert!(matches!(err.kind, MarshalErrorKind::NumberOutOfRange(_)));
        assert_eq!(err.path.to_string(), "value");

        let err = to_item(&Reading { value: 5e-324 }).unwrap_err();
        assert!(matches!(err.kind, MarshalErrorKind::NumberOutOfRange(_)));

        let err = to_attribute_value(&u128::MAX).unwrap_err();
        assert!(matches!(err.kind, MarshalErrorKind::NumberOutOfRange(_)));
    }

    #[test]
    fn test_numbers_within_store_limits_are_kept() {
        assert_eq!(to_attribute_value(&0).unwrap(), n("0"));
        assert_eq!(to_attribute_value(&-0.000125).unwrap(), n("-0.000125"));
        assert_eq!(to_attribute_value(&i64::MIN).unwrap(), n("-9223372036854775808"));
        assert!(to_attribute_value(&1e100).is_ok());
        assert!(to_attribute_value(&1e-130).is_ok());
        assert!(to_attribute_value(&1e-131).is_err());
    }

    #[test]
    fn test_depth_limit_guards_runaway_nesting() {
        #[derive(Serialize)]
        struct Node {
            next: Option<Box<Node>>,
        }

        let mut node = Node { next: None };
        for _ in 0..(MAX_DEPTH + 4) {
            node = Node {
                next: Some(Box::new(node)),
            };
        }

        let err = to_item(&node).unwrap_err();
        assert_eq!(err.kind, MarshalErrorKind::DepthLimitExceeded(MAX_DEPTH));
        assert!(err.path.to_string().starts_with("next.next"));
    }
}
