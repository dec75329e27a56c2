//! Set wrappers that marshal to the store's native `Ss` / `Ns` attributes.
//!
//! Serde has no notion of a set distinct from a sequence, so these types
//! announce themselves through a reserved newtype-struct name the marshaller
//! recognises. Every other serializer sees a plain sequence.

use std::collections::BTreeSet;
use std::fmt;
use std::marker::PhantomData;

use serde::de::{Deserialize, Deserializer, SeqAccess, Visitor};
use serde::ser::{Serialize, Serializer};

pub(crate) const STRING_SET: &str = "$raven::StringSet";
pub(crate) const NUMBER_SET: &str = "$raven::NumberSet";

/// A set of strings, stored as `Ss`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringSet(pub BTreeSet<String>);

impl StringSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, value: impl Into<String>) -> bool {
        self.0.insert(value.into())
    }

    pub fn contains(&self, value: &str) -> bool {
        self.0.contains(value)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for StringSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// A set of numbers, stored as `Ns`. Duplicate values are collapsed on write.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NumberSet<T = f64>(pub Vec<T>);

impl<T> FromIterator<T> for NumberSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Serialize for StringSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_newtype_struct(STRING_SET, &self.0)
    }
}

impl<T: Serialize> Serialize for NumberSet<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_newtype_struct(NUMBER_SET, &self.0)
    }
}

struct SetVisitor<C> {
    name: &'static str,
    marker: PhantomData<C>,
}

impl<'de, C> Visitor<'de> for SetVisitor<C>
where
    C: Deserialize<'de> + FromIterator<<C as IntoIterator>::Item> + IntoIterator,
    <C as IntoIterator>::Item: Deserialize<'de>,
{
    type Value = C;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a {}", self.name.trim_start_matches("$raven::"))
    }

    fn visit_newtype_struct<D: Deserializer<'de>>(self, deserializer: D) -> Result<C, D::Error> {
        C::deserialize(deserializer)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<C, A::Error> {
        let mut items = Vec::new();
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(items.into_iter().collect())
    }
}

impl<'de> Deserialize<'de> for StringSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let visitor = SetVisitor::<BTreeSet<String>> {
            name: STRING_SET,
            marker: PhantomData,
        };
        deserializer
            .deserialize_newtype_struct(STRING_SET, visitor)
            .map(StringSet)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for NumberSet<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let visitor = SetVisitor::<Vec<T>> {
            name: NUMBER_SET,
            marker: PhantomData,
        };
        deserializer
            .deserialize_newtype_struct(NUMBER_SET, visitor)
            .map(NumberSet)
    }
}
