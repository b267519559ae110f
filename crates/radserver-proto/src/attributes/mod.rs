//! RADIUS attributes: the type-length-value record, its decoded value, and
//! the table of standard attribute types.

mod attribute;
mod types;
mod value;

pub use attribute::Attribute;
pub use types::AttributeType;
pub use value::AttributeValue;
