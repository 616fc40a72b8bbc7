use crate::element::ElementType;
use crate::reader::TlvReader;
use crate::writer::{TlvEncode, TlvWriter};
use crate::{Error, Result, Tag};

/// Any single TLV element, containers included, held in memory.
#[derive(Clone, Debug, PartialEq)]
pub enum TlvValue {
    Int(i64),
    UInt(u64),
    Bool(bool),
    Float(f32),
    Double(f64),
    String(String),
    Bytes(Box<[u8]>),
    Null,
    Structure(Vec<(Tag, TlvValue)>),
    Array(Vec<TlvValue>),
    List(Vec<(Tag, TlvValue)>),
}

impl TlvValue {
    /// The element type this value is written as. Integers use the smallest
    /// width that holds them.
    pub fn element_type(&self) -> ElementType {
        match self {
            TlvValue::Int(value) => ElementType::signed_for(*value),
            TlvValue::UInt(value) => ElementType::unsigned_for(*value),
            TlvValue::Bool(true) => ElementType::True,
            TlvValue::Bool(false) => ElementType::False,
            TlvValue::Float(_) => ElementType::Float32,
            TlvValue::Double(_) => ElementType::Float64,
            TlvValue::String(value) => ElementType::utf8_string_for(value.len()),
            TlvValue::Bytes(value) => ElementType::byte_string_for(value.len()),
            TlvValue::Null => ElementType::Null,
            TlvValue::Structure(_) => ElementType::Structure,
            TlvValue::Array(_) => ElementType::Array,
            TlvValue::List(_) => ElementType::List,
        }
    }

    pub fn write(&self, tag: Tag, writer: &mut TlvWriter) -> Result<()> {
        match self {
            TlvValue::Int(value) => writer.put_signed(tag, *value),
            TlvValue::UInt(value) => writer.put_unsigned(tag, *value),
            TlvValue::Bool(value) => writer.put_bool(tag, *value),
            TlvValue::Float(value) => writer.put_f32(tag, *value),
            TlvValue::Double(value) => writer.put_f64(tag, *value),
            TlvValue::String(value) => writer.put_string(tag, value),
            TlvValue::Bytes(value) => writer.put_bytes(tag, value),
            TlvValue::Null => writer.put_null(tag),
            TlvValue::Structure(entries) => {
                writer.start_structure(tag)?;
                for (entry_tag, entry) in entries {
                    entry.write(*entry_tag, writer)?;
                }
                writer.end_structure()
            }
            TlvValue::Array(items) => {
                writer.start_array(tag)?;
                for item in items {
                    item.write(Tag::Anonymous, writer)?;
                }
                writer.end_array()
            }
            TlvValue::List(entries) => {
                writer.start_list(tag)?;
                for (entry_tag, entry) in entries {
                    entry.write(*entry_tag, writer)?;
                }
                writer.end_list()
            }
        }
    }

    /// Reads the next element, whatever its tag.
    pub fn read(reader: &mut TlvReader<'_>) -> Result<(Tag, TlvValue)> {
        let Some(tag) = reader.peek_tag()? else {
            return Err(Self::nothing_to_read(Tag::Anonymous, reader));
        };
        let value = Self::read_tagged(tag, reader)?;
        Ok((tag, value))
    }

    /// Reads the next element, which must carry `tag`.
    pub fn read_tagged(tag: Tag, reader: &mut TlvReader<'_>) -> Result<TlvValue> {
        let Some(element_type) = reader.peek_element_type()? else {
            return Err(Self::nothing_to_read(tag, reader));
        };

        let value = match element_type {
            t if t.is_unsigned_int() => TlvValue::UInt(reader.get_u64(tag)?),
            t if t.is_signed_int() => TlvValue::Int(reader.get_i64(tag)?),
            t if t.is_bool() => TlvValue::Bool(reader.get_bool(tag)?),
            ElementType::Float32 => TlvValue::Float(reader.get_f32(tag)?),
            ElementType::Float64 => TlvValue::Double(reader.get_f64(tag)?),
            t if t.is_utf8_string() => TlvValue::String(reader.get_string(tag)?.to_string()),
            t if t.is_byte_string() => TlvValue::Bytes(reader.get_bytes(tag)?.into()),
            ElementType::Structure => {
                reader.enter_structure(tag)?;
                TlvValue::Structure(Self::read_entries(reader)?)
            }
            ElementType::List => {
                reader.enter_list(tag)?;
                TlvValue::List(Self::read_entries(reader)?)
            }
            ElementType::Array => {
                reader.enter_array(tag)?;
                let mut items = Vec::new();
                while reader.peek_tag()?.is_some() {
                    items.push(Self::read_tagged(Tag::Anonymous, reader)?);
                }
                reader.exit_container()?;
                TlvValue::Array(items)
            }
            _ => {
                reader.get_null(tag)?;
                TlvValue::Null
            }
        };
        Ok(value)
    }

    fn read_entries(reader: &mut TlvReader<'_>) -> Result<Vec<(Tag, TlvValue)>> {
        let mut entries = Vec::new();
        while reader.peek_tag()?.is_some() {
            entries.push(Self::read(reader)?);
        }
        reader.exit_container()?;
        Ok(entries)
    }

    fn nothing_to_read(tag: Tag, reader: &TlvReader<'_>) -> Error {
        if reader.depth() > 0 {
            Error::UnexpectedEndOfContainer(tag)
        } else {
            Error::Truncated {
                needed: 1,
                remaining: 0,
            }
        }
    }

    pub fn as_array(&self) -> Option<&[TlvValue]> {
        match self {
            TlvValue::Array(items) => Some(items),
            _ => None,
        }
    }
}

impl TlvEncode for TlvValue {
    fn encode(&self, tag: Tag, writer: &mut TlvWriter) -> Result<()> {
        self.write(tag, writer)
    }
}

macro_rules! impl_from {
    ($variant:ident, $target:ty, $($ty:ty),+) => {
        $(
            impl From<$ty> for TlvValue {
                fn from(value: $ty) -> Self {
                    TlvValue::$variant(value as $target)
                }
            }
        )+
    };
}

impl_from!(UInt, u64, u8, u16, u32, u64);
impl_from!(Int, i64, i8, i16, i32, i64);

impl From<bool> for TlvValue {
    fn from(value: bool) -> Self {
        TlvValue::Bool(value)
    }
}

impl From<f32> for TlvValue {
    fn from(value: f32) -> Self {
        TlvValue::Float(value)
    }
}

impl From<f64> for TlvValue {
    fn from(value: f64) -> Self {
        TlvValue::Double(value)
    }
}

impl From<&str> for TlvValue {
    fn from(value: &str) -> Self {
        TlvValue::String(value.to_string())
    }
}

impl From<String> for TlvValue {
    fn from(value: String) -> Self {
        TlvValue::String(value)
    }
}

impl From<&[u8]> for TlvValue {
    fn from(value: &[u8]) -> Self {
        TlvValue::Bytes(value.into())
    }
}

impl From<Box<[u8]>> for TlvValue {
    fn from(value: Box<[u8]>) -> Self {
        TlvValue::Bytes(value)
    }
}

/// Vectors become arrays; use `Box<[u8]>` or `&[u8]` for byte strings.
impl<T: Into<TlvValue>> From<Vec<T>> for TlvValue {
    fn from(value: Vec<T>) -> Self {
        TlvValue::Array(value.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod test {
    use crate::{Error, Tag, TlvReader, TlvValue, TlvWriter};

    fn nested() -> TlvValue {
        TlvValue::Structure(vec![
            (Tag::Context(0), TlvValue::UInt(70_000)),
            (Tag::Context(1), TlvValue::Int(-3)),
            (
                Tag::Context(2),
                TlvValue::Array(vec![TlvValue::from("a"), TlvValue::from("b")]),
            ),
            (
                Tag::Context(3),
                TlvValue::List(vec![
                    (Tag::CommonProfile(9), TlvValue::Null),
                    (Tag::Anonymous, TlvValue::Double(2.5)),
                ]),
            ),
            (Tag::Context(4), TlvValue::from(&[1u8, 2][..])),
            (Tag::Context(5), TlvValue::Bool(true)),
        ])
    }

    #[test]
    fn tree_survives_encoding() {
        let value = nested();
        let mut writer = TlvWriter::new();
        value.write(Tag::Anonymous, &mut writer).unwrap();
        let bytes = writer.finish().unwrap();

        let mut reader = TlvReader::new(&bytes);
        let (tag, decoded) = TlvValue::read(&mut reader).unwrap();
        assert_eq!(tag, Tag::Anonymous);
        assert_eq!(decoded, value);
        assert!(reader.is_exhausted());
    }

    #[test]
    fn read_on_empty_stream() {
        let mut reader = TlvReader::new(&[]);
        assert!(matches!(
            TlvValue::read(&mut reader),
            Err(Error::Truncated { .. })
        ));

        let mut reader = TlvReader::new(&[0x15, 0x18]);
        reader.enter_structure(Tag::Anonymous).unwrap();
        assert!(matches!(
            TlvValue::read_tagged(Tag::Context(0), &mut reader),
            Err(Error::UnexpectedEndOfContainer(Tag::Context(0)))
        ));
    }

    #[test]
    fn vec_into_array() {
        let value = TlvValue::from(vec![1u16, 2, 3]);
        assert_eq!(
            value.as_array().unwrap(),
            &[TlvValue::UInt(1), TlvValue::UInt(2), TlvValue::UInt(3)]
        );
    }
}
