use std::io;

use byteorder::{BigEndian, WriteBytesExt};
use utils::traits::writer::WriteTo;

use crate::errors::{AmfError, AmfResult};

use super::{ObjectPairs, Value, amf0_marker};

impl<W: io::Write> WriteTo<W> for Value {
    type Error = AmfError;
    fn write_to(&self, writer: &mut W) -> Result<(), Self::Error> {
        match self {
            Value::Number(n) => Self::write_number(writer, *n),
            Value::Boolean(b) => Self::write_boolean(writer, *b),
            Value::String(s) => Self::write_string(writer, s),
            Value::Object(pairs) => Self::write_object(writer, pairs),
            Value::Null => Self::write_null(writer),
            Value::Undefined => Self::write_undefined(writer),
            Value::ECMAArray { count, entries } => Self::write_ecma_array(writer, *count, entries),
            Value::ObjectEnd => Self::write_object_end(writer),
        }
    }
}

impl Value {
    pub fn write_number<W: io::Write>(writer: &mut W, v: f64) -> AmfResult<()> {
        writer.write_u8(amf0_marker::NUMBER)?;
        writer.write_f64::<BigEndian>(v)?;
        Ok(())
    }

    pub fn write_boolean<W: io::Write>(writer: &mut W, v: bool) -> AmfResult<()> {
        writer.write_u8(amf0_marker::BOOLEAN)?;
        writer.write_u8(v as u8)?;
        Ok(())
    }

    fn write_utf8_inner<W: io::Write>(writer: &mut W, v: &str) -> AmfResult<()> {
        if v.len() >= 0xFFFF {
            return Err(AmfError::StringSizeOutOfRange { length: v.len() });
        }
        writer.write_u16::<BigEndian>(v.len() as u16)?;
        writer.write_all(v.as_bytes())?;
        Ok(())
    }

    pub fn write_string<W: io::Write>(writer: &mut W, v: &str) -> AmfResult<()> {
        writer.write_u8(amf0_marker::STRING)?;
        Self::write_utf8_inner(writer, v)?;
        Ok(())
    }

    fn write_pairs_inner<W: io::Write>(writer: &mut W, pairs: &ObjectPairs) -> AmfResult<()> {
        for (key, value) in pairs.iter() {
            Self::write_utf8_inner(writer, key)?;
            value.write_to(writer)?;
        }
        writer.write_u16::<BigEndian>(0)?;
        writer.write_u8(amf0_marker::OBJECT_END)?;
        Ok(())
    }

    pub fn write_object<W: io::Write>(writer: &mut W, pairs: &ObjectPairs) -> AmfResult<()> {
        writer.write_u8(amf0_marker::OBJECT)?;
        Self::write_pairs_inner(writer, pairs)?;
        Ok(())
    }

    pub fn write_null<W: io::Write>(writer: &mut W) -> AmfResult<()> {
        writer.write_u8(amf0_marker::NULL)?;
        Ok(())
    }

    pub fn write_undefined<W: io::Write>(writer: &mut W) -> AmfResult<()> {
        writer.write_u8(amf0_marker::UNDEFINED)?;
        Ok(())
    }

    pub fn write_ecma_array<W: io::Write>(
        writer: &mut W,
        count: u32,
        entries: &ObjectPairs,
    ) -> AmfResult<()> {
        writer.write_u8(amf0_marker::ECMA_ARRAY)?;
        writer.write_u32::<BigEndian>(count)?;
        Self::write_pairs_inner(writer, entries)?;
        Ok(())
    }

    fn write_object_end<W: io::Write>(writer: &mut W) -> AmfResult<()> {
        writer.write_u8(amf0_marker::OBJECT_END)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use utils::traits::{dynamic_sized_packet::DynamicSizedPacket, writer::WriteTo};

    use crate::{
        amf0::{ObjectPairs, Value, reader::Reader},
        errors::AmfError,
    };

    fn encode(value: &Value) -> Vec<u8> {
        let mut bytes = Vec::new();
        value.write_to(&mut bytes).unwrap();
        bytes
    }

    fn decode(mut bytes: &[u8]) -> Value {
        Reader::new(&mut bytes).read().unwrap().unwrap()
    }

    fn sample_values() -> Vec<Value> {
        let mut object = ObjectPairs::new();
        object.set("tcUrl", Value::String("rtmp://host:1935/live".to_string()));
        object.set("objectEncoding", Value::Number(0.0));

        let mut inner = ObjectPairs::new();
        inner.set("level", Value::String("status".to_string()));
        let mut data = ObjectPairs::new();
        data.set("version", Value::String("0.1.0".to_string()));
        inner.set(
            "data",
            Value::ECMAArray {
                count: 1,
                entries: data,
            },
        );

        vec![
            Value::Number(3.5),
            Value::Number(f64::MIN),
            Value::Boolean(true),
            Value::Boolean(false),
            Value::String(String::new()),
            Value::String("connect".to_string()),
            Value::Null,
            Value::Undefined,
            Value::Object(object),
            Value::Object(inner),
            Value::ECMAArray {
                count: 0,
                entries: ObjectPairs::new(),
            },
        ]
    }

    #[test]
    fn round_trip_preserves_values() {
        for value in sample_values() {
            assert_eq!(decode(&encode(&value)), value);
        }
    }

    #[test]
    fn reported_size_matches_encoding() {
        for value in sample_values() {
            assert_eq!(value.get_packet_bytes_count(), encode(&value).len());
        }
    }

    #[test]
    fn accepted_bytes_re_encode_identically() {
        // a connect command object as a client would send it
        let bytes: Vec<u8> = {
            let mut b = vec![0x03];
            b.extend_from_slice(&[0x00, 0x05]);
            b.extend_from_slice(b"tcUrl");
            b.extend_from_slice(&[0x02, 0x00, 0x15]);
            b.extend_from_slice(b"rtmp://host:1935/live");
            b.extend_from_slice(&[0x00, 0x00, 0x09]);
            b
        };
        let value = decode(&bytes);
        assert_eq!(encode(&value), bytes);
    }

    #[test]
    fn ecma_array_count_survives_round_trip() {
        // some encoders write count 0 regardless of the entries
        let bytes = [
            0x08, 0x00, 0x00, 0x00, 0x00, // count 0
            0x00, 0x01, b'k', 0x01, 0x01, // k: true
            0x00, 0x00, 0x09,
        ];
        let value = decode(&bytes);
        assert_eq!(encode(&value), bytes);
    }

    #[test]
    fn oversized_string_is_rejected() {
        let value = Value::String("x".repeat(0xFFFF));
        let mut sink = Vec::new();
        assert!(matches!(
            value.write_to(&mut sink),
            Err(AmfError::StringSizeOutOfRange { length: 0xFFFF })
        ));
    }

    #[test]
    fn object_key_order_is_preserved_on_the_wire() {
        let mut pairs = ObjectPairs::new();
        pairs.set("fmsVer", Value::String("FMS/3,5,3,888".to_string()));
        pairs.set("capabilities", Value::Number(127.0));
        pairs.set("mode", Value::Number(1.0));
        let encoded = encode(&Value::Object(pairs.clone()));

        let decoded = decode(&encoded).try_into_pairs().unwrap();
        let keys: Vec<&str> = decoded.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["fmsVer", "capabilities", "mode"]);
    }
}
