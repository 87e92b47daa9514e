use std::io;

use byteorder::{BigEndian, ReadBytesExt};

use crate::errors::{AmfError, AmfResult};

use super::{ObjectPairs, Value, amf0_marker};

#[derive(Debug)]
pub struct Reader<'a, R> {
    inner: &'a mut R,
}

impl<'a, R> Reader<'a, R>
where
    R: io::Read,
{
    pub fn new(inner: &'a mut R) -> Self {
        Self { inner }
    }

    /// Reads one value. A clean EOF before the marker byte yields
    /// `Ok(None)`; anything truncated past the marker is an error.
    pub fn read(&mut self) -> AmfResult<Option<Value>> {
        let marker = match self.inner.read_u8() {
            Ok(marker) => marker,
            Err(_) => return Ok(None),
        };
        let value = match marker {
            amf0_marker::NUMBER => self.read_number()?,
            amf0_marker::BOOLEAN => self.read_boolean()?,
            amf0_marker::STRING => self.read_string()?,
            amf0_marker::OBJECT => self.read_object()?,
            amf0_marker::NULL => Value::Null,
            amf0_marker::UNDEFINED => Value::Undefined,
            amf0_marker::ECMA_ARRAY => self.read_ecma_array()?,
            amf0_marker::OBJECT_END => Value::ObjectEnd,
            marker if marker <= amf0_marker::AVMPLUS_OBJECT => {
                return Err(AmfError::Unsupported { marker });
            }
            marker => return Err(AmfError::Unknown { marker }),
        };
        Ok(Some(value))
    }

    pub fn read_all(&mut self) -> AmfResult<Vec<Value>> {
        let mut result = Vec::new();
        while let Some(value) = self.read()? {
            result.push(value);
        }
        Ok(result)
    }

    fn read_number(&mut self) -> AmfResult<Value> {
        let number = self.inner.read_f64::<BigEndian>()?;
        Ok(Value::Number(number))
    }

    fn read_boolean(&mut self) -> AmfResult<Value> {
        let byte = self.inner.read_u8()?;
        Ok(Value::Boolean(byte != 0))
    }

    fn read_utf8_inner(&mut self, len: usize) -> AmfResult<String> {
        let mut buffer = vec![0; len];
        self.inner.read_exact(&mut buffer)?;
        if !buffer.is_ascii() {
            tracing::warn!("amf0 string carries bytes above 0x7F, keeping the string");
        }
        match String::from_utf8(buffer) {
            Ok(result) => Ok(result),
            Err(err) => Ok(String::from_utf8_lossy(err.as_bytes()).into_owned()),
        }
    }

    fn read_string(&mut self) -> AmfResult<Value> {
        let len = self.inner.read_u16::<BigEndian>()?;
        self.read_utf8_inner(len as usize).map(Value::String)
    }

    fn read_key_value_pairs_inner(&mut self) -> AmfResult<ObjectPairs> {
        let mut result: Vec<(String, Value)> = Vec::new();
        loop {
            let len = self.inner.read_u16::<BigEndian>()?;
            let key = self.read_utf8_inner(len as usize)?;
            match self.read()? {
                Some(Value::ObjectEnd) if key.is_empty() => break,
                Some(value) => result.push((key, value)),
                None => return Err(AmfError::UnexpectedEof),
            }
        }
        Ok(result.into())
    }

    fn read_object(&mut self) -> AmfResult<Value> {
        let pairs = self.read_key_value_pairs_inner()?;
        Ok(Value::Object(pairs))
    }

    fn read_ecma_array(&mut self) -> AmfResult<Value> {
        let count = self.inner.read_u32::<BigEndian>()?;
        let entries = self.read_key_value_pairs_inner()?;
        Ok(Value::ECMAArray { count, entries })
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        amf0::{ObjectPairs, Value, amf0_marker},
        errors::{AmfError, AmfResult},
    };

    use super::Reader;

    fn decode(mut bytes: &[u8]) -> AmfResult<Option<Value>> {
        Reader::new(&mut bytes).read()
    }

    #[test]
    fn number() {
        let bytes = [
            0x00, 0x40, 0x0C, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // 3.5
        ];
        assert_eq!(decode(&bytes).unwrap().unwrap(), Value::Number(3.5));
    }

    #[test]
    fn boolean() {
        assert_eq!(
            decode(&[0x01, 0x01]).unwrap().unwrap(),
            Value::Boolean(true)
        );
        assert_eq!(
            decode(&[0x01, 0x00]).unwrap().unwrap(),
            Value::Boolean(false)
        );
        // any nonzero byte is true
        assert_eq!(
            decode(&[0x01, 0x7F]).unwrap().unwrap(),
            Value::Boolean(true)
        );
    }

    #[test]
    fn string() {
        let bytes = [0x02, 0x00, 0x05, b'h', b'e', b'l', b'l', b'o'];
        assert_eq!(
            decode(&bytes).unwrap().unwrap(),
            Value::String("hello".to_string())
        );
    }

    #[test]
    fn string_with_high_bytes_is_kept() {
        let bytes = [0x02, 0x00, 0x02, 0xC3, 0xA9]; // utf8 'é'
        assert_eq!(
            decode(&bytes).unwrap().unwrap(),
            Value::String("é".to_string())
        );
    }

    #[test]
    fn object() {
        let bytes = [
            0x03, // object
            0x00, 0x03, b'f', b'o', b'o', 0x02, 0x00, 0x03, b'b', b'a', b'r', // foo: "bar"
            0x00, 0x03, b'n', b'u', b'm', 0x00, 0x3F, 0xF0, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, // num: 1.0
            0x00, 0x00, 0x09, // object end
        ];
        let mut pairs = ObjectPairs::new();
        pairs.set("foo", Value::String("bar".to_string()));
        pairs.set("num", Value::Number(1.0));
        assert_eq!(decode(&bytes).unwrap().unwrap(), Value::Object(pairs));
    }

    #[test]
    fn ecma_array() {
        let bytes = [
            0x08, 0x00, 0x00, 0x00, 0x01, // ecma array, count 1
            0x00, 0x01, b'a', 0x02, 0x00, 0x01, b'b', // a: "b"
            0x00, 0x00, 0x09,
        ];
        let mut entries = ObjectPairs::new();
        entries.set("a", Value::String("b".to_string()));
        assert_eq!(
            decode(&bytes).unwrap().unwrap(),
            Value::ECMAArray { count: 1, entries }
        );
    }

    #[test]
    fn null_and_undefined() {
        assert_eq!(decode(&[0x05]).unwrap().unwrap(), Value::Null);
        assert_eq!(decode(&[0x06]).unwrap().unwrap(), Value::Undefined);
    }

    #[test]
    fn empty_input_is_none() {
        assert!(decode(&[]).unwrap().is_none());
    }

    #[test]
    fn unsupported_markers() {
        assert!(matches!(
            decode(&[amf0_marker::STRICT_ARRAY]),
            Err(AmfError::Unsupported {
                marker: amf0_marker::STRICT_ARRAY
            })
        ));
        assert!(matches!(
            decode(&[amf0_marker::DATE]),
            Err(AmfError::Unsupported {
                marker: amf0_marker::DATE
            })
        ));
        assert!(matches!(
            decode(&[0x42]),
            Err(AmfError::Unknown { marker: 0x42 })
        ));
    }

    #[test]
    fn truncated_object_fails() {
        let bytes = [
            0x03, 0x00, 0x03, b'f', b'o', b'o', 0x02, 0x00, 0x03, b'b', b'a', b'r',
            // missing terminator
        ];
        assert!(decode(&bytes).is_err());
    }

    #[test]
    fn read_all_collects_a_command_body() {
        let mut bytes: Vec<u8> = vec![0x02, 0x00, 0x07];
        bytes.extend_from_slice(b"connect");
        bytes.extend_from_slice(&[0x00, 0x3F, 0xF0, 0, 0, 0, 0, 0, 0]); // 1.0
        bytes.push(0x05); // null
        let mut slice = bytes.as_slice();
        let values = Reader::new(&mut slice).read_all().unwrap();
        assert_eq!(values.len(), 3);
        assert_eq!(values[0], Value::String("connect".to_string()));
        assert_eq!(values[1], Value::Number(1.0));
        assert_eq!(values[2], Value::Null);
    }
}
