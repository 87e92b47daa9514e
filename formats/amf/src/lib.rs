pub mod amf0;
pub mod errors;

pub use amf0::{ObjectPairs, Value};
pub use amf0::{bool, ecma_array, null, number, object, string, undefined};
