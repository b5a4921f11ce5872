pub mod attribute;
pub mod codes;
pub mod value;

pub use attribute::{Attribute, RadiusAttribute, VendorSpecific, decode_attributes};
pub use value::AttributeValue;
