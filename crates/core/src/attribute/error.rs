use std::fmt;

use thiserror::Error;

/// One step in the path from the item root to a nested value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Field(String),
    Index(usize),
}

/// Location of a value inside an item, rendered as `items[2].modifiers[0].priceDelta`.
///
/// Paths are assembled while an error propagates back to the root: every
/// enclosing list or map prepends its own segment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldPath(Vec<Segment>);

impl FieldPath {
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    fn prepend(&mut self, segment: Segment) {
        self.0.insert(0, segment);
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("<root>");
        }
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                Segment::Field(name) if i == 0 => write!(f, "{name}")?,
                Segment::Field(name) => write!(f, ".{name}")?,
                Segment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

/// Reasons a domain value cannot be turned into an attribute tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarshalErrorKind {
    /// The top-level value is not a record or map.
    NotARecord(&'static str),
    /// NaN or infinite floats have no decimal representation.
    NonFiniteNumber,
    /// A value type with no attribute representation (raw bytes).
    Unsupported(&'static str),
    /// Decimal text the store cannot hold (precision or magnitude).
    NumberOutOfRange(String),
    /// Nesting deeper than the store allows, usually a back-referenced graph.
    DepthLimitExceeded(usize),
    /// Error raised by a `Serialize` implementation.
    Custom(String),
}

impl fmt::Display for MarshalErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarshalErrorKind::NotARecord(found) => {
                write!(f, "top-level value must be a record, found {found}")
            }
            MarshalErrorKind::NonFiniteNumber => f.write_str("number is NaN or infinite"),
            MarshalErrorKind::NumberOutOfRange(text) => {
                write!(f, "number {text} exceeds the store's precision or magnitude")
            }
            MarshalErrorKind::Unsupported(what) => write!(f, "{what} cannot be represented"),
            MarshalErrorKind::DepthLimitExceeded(limit) => {
                write!(f, "nesting exceeds {limit} levels (cyclic value?)")
            }
            MarshalErrorKind::Custom(msg) => f.write_str(msg),
        }
    }
}

/// Error raised by the marshaller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot marshal `{path}`: {kind}")]
pub struct MarshalError {
    pub path: FieldPath,
    pub kind: MarshalErrorKind,
}

impl MarshalError {
    pub(crate) fn new(kind: MarshalErrorKind) -> Self {
        Self {
            path: FieldPath::default(),
            kind,
        }
    }

    pub(crate) fn within(mut self, segment: Segment) -> Self {
        self.path.prepend(segment);
        self
    }
}

impl serde::ser::Error for MarshalError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Self::new(MarshalErrorKind::Custom(msg.to_string()))
    }
}

/// Error raised by the unmarshaller, naming the offending field path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot unmarshal `{path}`: {message}")]
pub struct UnmarshalError {
    pub path: FieldPath,
    pub message: String,
}

impl UnmarshalError {
    pub(crate) fn within(mut self, segment: Segment) -> Self {
        self.path.prepend(segment);
        self
    }
}

impl serde::de::Error for UnmarshalError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Self {
            path: FieldPath::default(),
            message: msg.to_string(),
        }
    }
}
