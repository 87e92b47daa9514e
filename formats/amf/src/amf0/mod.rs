use std::io;

use utils::traits::dynamic_sized_packet::DynamicSizedPacket;

use crate::errors::AmfResult;

pub mod reader;
pub mod writer;

///! @see: AMF0 specification, 2.1 Types Overview
pub mod amf0_marker {
    pub const NUMBER: u8 = 0x00;
    pub const BOOLEAN: u8 = 0x01;
    pub const STRING: u8 = 0x02;
    pub const OBJECT: u8 = 0x03;
    pub const MOVIECLIP: u8 = 0x04;
    pub const NULL: u8 = 0x05;
    pub const UNDEFINED: u8 = 0x06;
    pub const REFERENCE: u8 = 0x07;
    pub const ECMA_ARRAY: u8 = 0x08;
    pub const OBJECT_END: u8 = 0x09;
    pub const STRICT_ARRAY: u8 = 0x0A;
    pub const DATE: u8 = 0x0B;
    pub const LONG_STRING: u8 = 0x0C;
    pub const UNSUPPORTED: u8 = 0x0D;
    pub const RECORDSET: u8 = 0x0E;
    pub const XML_DOCUMENT: u8 = 0x0F;
    pub const TYPED_OBJECT: u8 = 0x10;
    pub const AVMPLUS_OBJECT: u8 = 0x11;
}

/// Insertion-ordered key-value entries for Object and ECMAArray values.
///
/// `set` replaces any prior entry with the same key and appends the new
/// pair at the tail, so iteration observes the order of the last set per
/// key. Flash clients (FMLE among them) reject connect responses whose
/// property order differs from the one the server composed, which makes
/// this ordering part of the wire contract.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjectPairs {
    entries: Vec<(String, Value)>,
}

impl ObjectPairs {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn set<K>(&mut self, key: K, value: Value)
    where
        K: Into<String>,
    {
        let key = key.into();
        self.entries.retain(|(k, _)| k != &key);
        self.entries.push((key, value));
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, Value)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<(String, Value)> {
        self.entries
    }

    /// Encoded size of the entries plus the empty-key + ObjectEnd
    /// terminator, without the leading marker/count prefix.
    pub fn wire_bytes_count(&self) -> usize {
        self.entries
            .iter()
            .map(|(k, v)| 2 + k.len() + v.get_packet_bytes_count())
            .sum::<usize>()
            + 3
    }
}

impl From<Vec<(String, Value)>> for ObjectPairs {
    fn from(entries: Vec<(String, Value)>) -> Self {
        Self { entries }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Boolean(bool),
    String(String),
    Object(ObjectPairs),
    Null,
    Undefined,
    ECMAArray { count: u32, entries: ObjectPairs },
    ObjectEnd,
}

impl Value {
    pub fn read_from<R>(reader: &mut R) -> AmfResult<Option<Self>>
    where
        R: io::Read,
    {
        reader::Reader::new(reader).read()
    }

    pub fn read_all<R>(reader: &mut R) -> AmfResult<Vec<Self>>
    where
        R: io::Read,
    {
        reader::Reader::new(reader).read_all()
    }

    pub fn try_as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn try_as_f64(&self) -> Option<f64> {
        match *self {
            Value::Number(n) => Some(n),
            _ => None,
        }
    }

    pub fn try_as_bool(&self) -> Option<bool> {
        match *self {
            Value::Boolean(b) => Some(b),
            _ => None,
        }
    }

    /// Object and ECMAArray both carry ordered pairs; everything else is
    /// handed back unchanged.
    pub fn try_into_pairs(self) -> Result<ObjectPairs, Self> {
        match self {
            Value::Object(pairs) => Ok(pairs),
            Value::ECMAArray { count: _, entries } => Ok(entries),
            value => Err(value),
        }
    }
}

/// Makes a `String` value.
pub fn string<T>(t: T) -> Value
where
    String: From<T>,
{
    Value::String(String::from(t))
}

/// Makes a `Number` value.
pub fn number<T>(t: T) -> Value
where
    f64: From<T>,
{
    Value::Number(f64::from(t))
}

/// Makes a `Boolean` value.
pub fn bool(t: bool) -> Value {
    Value::Boolean(t)
}

pub fn null() -> Value {
    Value::Null
}

pub fn undefined() -> Value {
    Value::Undefined
}

pub fn object(pairs: ObjectPairs) -> Value {
    Value::Object(pairs)
}

/// Makes an `ECMAArray` with its associative count mirroring the entries.
pub fn ecma_array(entries: ObjectPairs) -> Value {
    Value::ECMAArray {
        count: entries.len() as u32,
        entries,
    }
}

impl DynamicSizedPacket for Value {
    fn get_packet_bytes_count(&self) -> usize {
        match self {
            Value::Number(_) => 1 + 8,
            Value::Boolean(_) => 1 + 1,
            Value::String(s) => 1 + 2 + s.len(),
            Value::Object(pairs) => 1 + pairs.wire_bytes_count(),
            Value::Null => 1,
            Value::Undefined => 1,
            Value::ECMAArray { count: _, entries } => 1 + 4 + entries.wire_bytes_count(),
            Value::ObjectEnd => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ObjectPairs, Value};

    #[test]
    fn pairs_keep_insertion_order() {
        let mut pairs = ObjectPairs::new();
        pairs.set("fmsVer", Value::String("FMS/3,5,3,888".to_string()));
        pairs.set("capabilities", Value::Number(127.0));
        pairs.set("mode", Value::Number(1.0));

        let keys: Vec<&str> = pairs.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["fmsVer", "capabilities", "mode"]);
    }

    #[test]
    fn set_moves_replaced_key_to_tail() {
        let mut pairs = ObjectPairs::new();
        pairs.set("a", Value::Number(1.0));
        pairs.set("b", Value::Number(2.0));
        pairs.set("c", Value::Number(3.0));
        pairs.set("a", Value::Number(4.0));

        let keys: Vec<&str> = pairs.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["b", "c", "a"]);
        assert_eq!(pairs.get("a"), Some(&Value::Number(4.0)));
        assert_eq!(pairs.len(), 3);
    }

    #[test]
    fn pairs_from_decode_order() {
        let pairs: ObjectPairs = vec![
            ("second".to_string(), Value::Boolean(true)),
            ("first".to_string(), Value::Null),
        ]
        .into();
        let keys: Vec<&str> = pairs.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["second", "first"]);
    }
}
