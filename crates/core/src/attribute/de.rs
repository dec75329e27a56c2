//! Unmarshaller: attribute trees back into domain values.
//!
//! The target's `Deserialize` implementation is the shape table: it names
//! the expected fields and, through its deserialize hints, whether a number
//! should come back as an integer or a float.

use std::collections::hash_map;
use std::fmt;
use std::vec;

use serde::de::value::StringDeserializer;
use serde::de::{
    self, DeserializeOwned, DeserializeSeed, Deserializer, EnumAccess, MapAccess, SeqAccess,
    Unexpected, VariantAccess, Visitor,
};

use super::error::{Segment, UnmarshalError};
use super::value::{AttributeValue, Item};

/// Unmarshals a top-level item into a record.
pub fn from_item<T>(item: Item) -> Result<T, UnmarshalError>
where
    T: DeserializeOwned,
{
    T::deserialize(Unmarshaller(AttributeValue::M(item)))
}

/// Unmarshals a single attribute into any value.
pub fn from_attribute_value<T>(value: AttributeValue) -> Result<T, UnmarshalError>
where
    T: DeserializeOwned,
{
    T::deserialize(Unmarshaller(value))
}

/// A number read from the store, classified by its lexical content.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    UInt(u64),
    Float(f64),
}

/// Classifies stored number text when the target does not pin a kind.
///
/// Text without a decimal point or exponent that fits `i64` (or `u64`) is an
/// integer; everything else is a float.
pub fn infer_number(text: &str) -> Result<Number, UnmarshalError> {
    let text = text.trim();
    if !text.contains(['.', 'e', 'E']) {
        if let Ok(v) = text.parse::<i64>() {
            return Ok(Number::Int(v));
        }
        if let Ok(v) = text.parse::<u64>() {
            return Ok(Number::UInt(v));
        }
    }
    parse_float(text).map(Number::Float)
}

fn parse_float(text: &str) -> Result<f64, UnmarshalError> {
    match text.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(de::Error::custom(format!("`{text}` is not a number"))),
    }
}

/// Converts stored number text into the integer type the target asks for.
///
/// Integral values written with a decimal point or exponent (`3.0`, `1e3`)
/// are accepted; fractional values and values outside the range of `T` are
/// errors.
fn parse_integer<T>(text: &str) -> Result<T, UnmarshalError>
where
    T: TryFrom<i128>,
{
    let text = text.trim();
    let wide = match text.parse::<i128>() {
        Ok(v) => v,
        Err(_) => {
            let v = parse_float(text)?;
            if v.fract() != 0.0 || v.abs() >= i128::MAX as f64 {
                return Err(de::Error::custom(format!(
                    "number `{text}` is not an integer"
                )));
            }
            v as i128
        }
    };
    T::try_from(wide).map_err(|_| {
        de::Error::custom(format!(
            "number `{text}` is out of range for {}",
            std::any::type_name::<T>()
        ))
    })
}

fn unexpected(value: &AttributeValue) -> Unexpected<'_> {
    match value {
        AttributeValue::S(s) => Unexpected::Str(s),
        AttributeValue::N(_) => Unexpected::Other("number"),
        AttributeValue::Bool(b) => Unexpected::Bool(*b),
        AttributeValue::Null => Unexpected::Unit,
        AttributeValue::L(_) | AttributeValue::Ss(_) | AttributeValue::Ns(_) => Unexpected::Seq,
        AttributeValue::M(_) => Unexpected::Map,
    }
}

struct Unmarshaller(AttributeValue);

macro_rules! unmarshal_integer {
    ($($method:ident => $visit:ident: $ty:ty),* $(,)?) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, UnmarshalError> {
                match self.0 {
                    AttributeValue::N(text) => visitor.$visit(parse_integer::<$ty>(&text)?),
                    other => Unmarshaller(other).deserialize_any(visitor),
                }
            }
        )*
    };
}

impl<'de> Deserializer<'de> for Unmarshaller {
    type Error = UnmarshalError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, UnmarshalError> {
        match self.0 {
            AttributeValue::S(s) => visitor.visit_string(s),
            AttributeValue::N(text) => match infer_number(&text)? {
                Number::Int(v) => visitor.visit_i64(v),
                Number::UInt(v) => visitor.visit_u64(v),
                Number::Float(v) => visitor.visit_f64(v),
            },
            AttributeValue::Bool(b) => visitor.visit_bool(b),
            AttributeValue::Null => visitor.visit_unit(),
            AttributeValue::L(items) => visitor.visit_seq(ListAccess::new(items)),
            AttributeValue::M(entries) => visitor.visit_map(EntryAccess::new(entries)),
            AttributeValue::Ss(members) => visitor.visit_seq(ListAccess::new(
                members.into_iter().map(AttributeValue::S).collect(),
            )),
            AttributeValue::Ns(members) => visitor.visit_seq(ListAccess::new(
                members.into_iter().map(AttributeValue::N).collect(),
            )),
        }
    }

    unmarshal_integer! {
        deserialize_i8 => visit_i8: i8,
        deserialize_i16 => visit_i16: i16,
        deserialize_i32 => visit_i32: i32,
        deserialize_i64 => visit_i64: i64,
        deserialize_i128 => visit_i128: i128,
        deserialize_u8 => visit_u8: u8,
        deserialize_u16 => visit_u16: u16,
        deserialize_u32 => visit_u32: u32,
        deserialize_u64 => visit_u64: u64,
        deserialize_u128 => visit_u128: u128,
    }

    fn deserialize_f32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, UnmarshalError> {
        match self.0 {
            AttributeValue::N(text) => visitor.visit_f32(parse_float(&text)? as f32),
            other => Unmarshaller(other).deserialize_any(visitor),
        }
    }

    fn deserialize_f64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, UnmarshalError> {
        match self.0 {
            AttributeValue::N(text) => visitor.visit_f64(parse_float(&text)?),
            other => Unmarshaller(other).deserialize_any(visitor),
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, UnmarshalError> {
        match self.0 {
            AttributeValue::Null => visitor.visit_none(),
            other => visitor.visit_some(Unmarshaller(other)),
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, UnmarshalError> {
        match self.0 {
            AttributeValue::Null => visitor.visit_unit(),
            other => Err(de::Error::invalid_type(unexpected(&other), &visitor)),
        }
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, UnmarshalError> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, UnmarshalError> {
        match self.0 {
            AttributeValue::S(variant) => {
                visitor.visit_enum(StringDeserializer::<UnmarshalError>::new(variant))
            }
            AttributeValue::M(entries) if entries.len() == 1 => {
                let (variant, payload) = entries
                    .into_iter()
                    .next()
                    .ok_or_else(|| de::Error::custom("empty enum map"))?;
                visitor.visit_enum(VariantPayload { variant, payload })
            }
            other => Err(de::Error::invalid_type(unexpected(&other), &visitor)),
        }
    }

    serde::forward_to_deserialize_any! {
        bool char str string bytes byte_buf unit_struct seq tuple tuple_struct
        map struct identifier ignored_any
    }
}

struct ListAccess {
    items: vec::IntoIter<AttributeValue>,
    index: usize,
}

impl ListAccess {
    fn new(items: Vec<AttributeValue>) -> Self {
        Self {
            items: items.into_iter(),
            index: 0,
        }
    }
}

impl<'de> SeqAccess<'de> for ListAccess {
    type Error = UnmarshalError;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>, UnmarshalError>
    where
        T: DeserializeSeed<'de>,
    {
        let Some(item) = self.items.next() else {
            return Ok(None);
        };
        let index = self.index;
        self.index += 1;
        seed.deserialize(Unmarshaller(item))
            .map(Some)
            .map_err(|e| e.within(Segment::Index(index)))
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.items.len())
    }
}

struct EntryAccess {
    entries: hash_map::IntoIter<String, AttributeValue>,
    pending: Option<(String, AttributeValue)>,
}

impl EntryAccess {
    fn new(entries: Item) -> Self {
        Self {
            entries: entries.into_iter(),
            pending: None,
        }
    }
}

impl<'de> MapAccess<'de> for EntryAccess {
    type Error = UnmarshalError;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>, UnmarshalError>
    where
        K: DeserializeSeed<'de>,
    {
        let Some((key, value)) = self.entries.next() else {
            return Ok(None);
        };
        let parsed = seed
            .deserialize(KeyUnmarshaller(key.clone()))
            .map_err(|e| e.within(Segment::Field(key.clone())))?;
        self.pending = Some((key, value));
        Ok(Some(parsed))
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value, UnmarshalError>
    where
        V: DeserializeSeed<'de>,
    {
        let (key, value) = self
            .pending
            .take()
            .ok_or_else(|| de::Error::custom("map value requested before its key"))?;
        seed.deserialize(Unmarshaller(value))
            .map_err(|e| e.within(Segment::Field(key)))
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.entries.len())
    }
}

/// Map keys are always stored as text; integer and bool keys are parsed back.
struct KeyUnmarshaller(String);

macro_rules! unmarshal_key_integer {
    ($($method:ident => $visit:ident: $ty:ty),* $(,)?) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, UnmarshalError> {
                visitor.$visit(parse_integer::<$ty>(&self.0)?)
            }
        )*
    };
}

impl<'de> Deserializer<'de> for KeyUnmarshaller {
    type Error = UnmarshalError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, UnmarshalError> {
        visitor.visit_string(self.0)
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, UnmarshalError> {
        match self.0.as_str() {
            "true" => visitor.visit_bool(true),
            "false" => visitor.visit_bool(false),
            other => Err(de::Error::invalid_value(Unexpected::Str(other), &visitor)),
        }
    }

    unmarshal_key_integer! {
        deserialize_i8 => visit_i8: i8,
        deserialize_i16 => visit_i16: i16,
        deserialize_i32 => visit_i32: i32,
        deserialize_i64 => visit_i64: i64,
        deserialize_u8 => visit_u8: u8,
        deserialize_u16 => visit_u16: u16,
        deserialize_u32 => visit_u32: u32,
        deserialize_u64 => visit_u64: u64,
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, UnmarshalError> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, UnmarshalError> {
        visitor.visit_enum(StringDeserializer::<UnmarshalError>::new(self.0))
    }

    serde::forward_to_deserialize_any! {
        i128 u128 f32 f64 char str string bytes byte_buf option unit unit_struct
        seq tuple tuple_struct map struct identifier ignored_any
    }
}

/// Payload of an externally tagged enum stored as `{variant: payload}`.
struct VariantPayload {
    variant: String,
    payload: AttributeValue,
}

impl<'de> EnumAccess<'de> for VariantPayload {
    type Error = UnmarshalError;
    type Variant = Self;

    fn variant_seed<V>(self, seed: V) -> Result<(V::Value, Self), UnmarshalError>
    where
        V: DeserializeSeed<'de>,
    {
        let variant = seed.deserialize(KeyUnmarshaller(self.variant.clone()))?;
        Ok((variant, self))
    }
}

impl<'de> VariantAccess<'de> for VariantPayload {
    type Error = UnmarshalError;

    fn unit_variant(self) -> Result<(), UnmarshalError> {
        match self.payload {
            AttributeValue::Null => Ok(()),
            other => Err(de::Error::invalid_type(unexpected(&other), &"unit variant")),
        }
    }

    fn newtype_variant_seed<T>(self, seed: T) -> Result<T::Value, UnmarshalError>
    where
        T: DeserializeSeed<'de>,
    {
        let variant = self.variant;
        seed.deserialize(Unmarshaller(self.payload))
            .map_err(|e| e.within(Segment::Field(variant)))
    }

    fn tuple_variant<V: Visitor<'de>>(
        self,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, UnmarshalError> {
        let variant = self.variant;
        Deserializer::deserialize_seq(Unmarshaller(self.payload), visitor)
            .map_err(|e| e.within(Segment::Field(variant)))
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, UnmarshalError> {
        let variant = self.variant;
        Deserializer::deserialize_map(Unmarshaller(self.payload), visitor)
            .map_err(|e| e.within(Segment::Field(variant)))
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(v) => write!(f, "{v}"),
            Number::UInt(v) => write!(f, "{v}"),
            Number::Float(v) => write!(f, "{v}"),
        }
    }
}
