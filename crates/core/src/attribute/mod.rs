//! Conversion between domain records and the store's attribute tree.
//!
//! [`to_item`] and [`from_item`] are driven entirely by the records' serde
//! implementations, so any `Serialize + Deserialize` type round-trips without
//! a hand-written schema.

mod de;
mod error;
mod ser;
mod set;
mod value;

pub use de::{from_attribute_value, from_item, infer_number, Number};
pub use error::{FieldPath, MarshalError, MarshalErrorKind, Segment, UnmarshalError};
pub use ser::{to_attribute_value, to_item, MAX_DEPTH, MAX_NUMBER_PRECISION};
pub use set::{NumberSet, StringSet};
pub use value::{AttributeValue, Item};
