//! Matter TLV: a tagged binary encoding for typed records exchanged between a
//! controller and devices.
//!
//! [`TlvWriter`] and [`TlvReader`] are the low level primitives. Record types
//! describe their fields once in a static [`StructSchema`] and implement
//! [`TlvStruct`] to get encode, decode and display for free.

use bytes::Bytes;
use matter_config::{ReaderConfig, WriterConfig};
use thiserror::Error;

pub mod display;
pub mod element;
pub mod reader;
pub mod schema;
pub mod tag;
pub mod value;
pub mod writer;

pub use display::StructDisplay;
pub use element::{ContainerType, ElementType};
pub use reader::{TlvDecode, TlvReader};
pub use schema::{FieldDescriptor, FieldSet, FieldType, FromValue, StructSchema, TlvStruct};
pub use tag::Tag;
pub use value::TlvValue;
pub use writer::{TlvEncode, TlvWriter};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Tried to end a container, but none is open")]
    StructureImbalance,
    #[error("Tried to end a {expected}, but the innermost open container is a {found}")]
    ContainerMismatch {
        expected: ContainerType,
        found: ContainerType,
    },
    #[error("Finished writing with {0} unclosed container(s)")]
    UnclosedContainers(usize),
    #[error("Expected tag {expected}, found {found}")]
    TagMismatch { expected: Tag, found: Tag },
    #[error("Expected {expected}, found {found} element")]
    TypeMismatch {
        expected: &'static str,
        found: ElementType,
    },
    #[error("Value {value} is out of range for {target}")]
    OutOfRange { value: i128, target: &'static str },
    #[error("TLV reading was cut short: needed {needed} bytes, {remaining} remaining")]
    Truncated { needed: usize, remaining: usize },
    #[error("Encountered an unknown TLV element type {0:#04x}")]
    UnknownElementType(u8),
    #[error("End of container with non-anonymous control byte {0:#04x}")]
    InvalidTagControl(u8),
    #[error("String element is not valid UTF-8")]
    InvalidUtf8,
    #[error("Length too large {0}")]
    LargeLength(u64),
    #[error("Reached the end of the container while expecting tag {0}")]
    UnexpectedEndOfContainer(Tag),
    #[error("Container exited with an unread element tagged {0}")]
    UnreadElements(Tag),
    #[error("Tag {tag} is not allowed {context}")]
    InvalidTag { tag: Tag, context: &'static str },
    #[error("Nesting depth exceeds the limit of {0}")]
    DepthExceeded(usize),
    #[error("Missing required field {field} of {schema}")]
    MissingField {
        schema: &'static str,
        field: &'static str,
    },
    #[error("Field with tag {tag} is not declared by {schema}")]
    UnknownField { schema: &'static str, tag: u8 },
}

impl Error {
    /// Whether the bytes themselves are broken, as opposed to disagreeing with
    /// the schema the caller expected.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            Error::Truncated { .. }
                | Error::UnknownElementType(_)
                | Error::InvalidTagControl(_)
                | Error::InvalidUtf8
                | Error::LargeLength(_)
        )
    }
}

/// Encodes `value` as an anonymous top-level structure.
pub fn to_bytes<T: TlvStruct>(value: &T) -> Result<Bytes> {
    to_bytes_with_config(value, &WriterConfig::default())
}

pub fn to_bytes_with_config<T: TlvStruct>(value: &T, config: &WriterConfig) -> Result<Bytes> {
    let mut writer = TlvWriter::with_config(config);
    value.to_tlv(Tag::Anonymous, &mut writer)?;
    writer.finish()
}

/// Decodes an anonymous top-level structure from the start of `bytes`.
///
/// Bytes after the structure are left alone; callers that care about trailing
/// data should drive a [`TlvReader`] themselves and check
/// [`TlvReader::is_exhausted`].
pub fn from_bytes<T: TlvStruct>(bytes: &[u8]) -> Result<T> {
    from_bytes_with_config(bytes, &ReaderConfig::default())
}

pub fn from_bytes_with_config<T: TlvStruct>(bytes: &[u8], config: &ReaderConfig) -> Result<T> {
    let mut reader = TlvReader::with_config(bytes, config);
    T::from_tlv(Tag::Anonymous, &mut reader)
}

#[cfg(test)]
mod test {
    use matter_config::{ReaderConfig, TrailingElements};

    use crate::{
        Error, FieldDescriptor, FieldSet, FieldType, StructSchema, Tag, TlvReader, TlvStruct,
        TlvWriter, from_bytes, from_bytes_with_config, to_bytes,
    };

    #[derive(Debug, PartialEq)]
    struct Reading {
        sensor: u16,
        level: u8,
        label: String,
    }

    const READING_SCHEMA: StructSchema = StructSchema {
        name: "Reading",
        fields: &[
            FieldDescriptor::new("sensor", 0, FieldType::UShort),
            FieldDescriptor::new("level", 1, FieldType::UByte),
            FieldDescriptor::new("label", 2, FieldType::String),
        ],
    };

    impl TlvStruct for Reading {
        const SCHEMA: &'static StructSchema = &READING_SCHEMA;

        fn to_fields(&self) -> FieldSet {
            FieldSet::new(Self::SCHEMA)
                .with(0, self.sensor)
                .with(1, self.level)
                .with(2, self.label.as_str())
        }

        fn from_fields(mut fields: FieldSet) -> crate::Result<Self> {
            Ok(Self {
                sensor: fields.take(0)?,
                level: fields.take(1)?,
                label: fields.take(2)?,
            })
        }
    }

    #[test]
    fn test_struct_bytes() {
        let reading = Reading {
            sensor: 0x0102,
            level: 9,
            label: "ok".to_string(),
        };

        let expected_bytes = [
            0x15, // Anonymous structure
            0x25, 0x00, // Context tag 0, uint16
            0x02, 0x01, // Value
            0x24, 0x01, // Context tag 1, uint8
            0x09, // Value
            0x2C, 0x02, // Context tag 2, utf8 string with 1-byte length
            0x02, // Length
            0x6F, 0x6B, // "ok"
            0x18, // End of container
        ];

        let bytes = to_bytes(&reading).unwrap();
        assert_eq!(bytes.as_ref(), expected_bytes);

        let decoded: Reading = from_bytes(&bytes).unwrap();
        assert_eq!(decoded, reading);
    }

    #[test]
    fn test_trailing_data_is_callers_concern() {
        let reading = Reading {
            sensor: 1,
            level: 2,
            label: String::new(),
        };
        let mut bytes = to_bytes(&reading).unwrap().to_vec();
        bytes.push(0x14);

        // The structure decodes; the trailing null is left for the caller
        let decoded: Reading = from_bytes(&bytes).unwrap();
        assert_eq!(decoded, reading);

        let mut reader = TlvReader::new(&bytes);
        Reading::from_tlv(Tag::Anonymous, &mut reader).unwrap();
        assert!(!reader.is_exhausted());
        assert_eq!(reader.remaining(), &[0x14]);
    }

    #[test]
    fn test_unknown_trailing_field() {
        let mut writer = TlvWriter::new();
        writer.start_structure(Tag::Anonymous).unwrap();
        writer.put(Tag::Context(0), 7u16).unwrap();
        writer.put(Tag::Context(1), 3u8).unwrap();
        writer.put(Tag::Context(2), "x").unwrap();
        writer.put(Tag::Context(9), true).unwrap();
        writer.end_structure().unwrap();
        let bytes = writer.finish().unwrap();

        let err = from_bytes::<Reading>(&bytes).unwrap_err();
        assert!(matches!(err, Error::UnreadElements(Tag::Context(9))));

        let config = ReaderConfig {
            trailing_elements: TrailingElements::Skip,
            ..ReaderConfig::default()
        };
        let decoded: Reading = from_bytes_with_config(&bytes, &config).unwrap();
        assert_eq!(decoded.sensor, 7);
        assert_eq!(decoded.label, "x");
    }

    #[test]
    fn test_malformed_classification() {
        let err = from_bytes::<Reading>(&[0x15, 0x25, 0x00, 0x02]).unwrap_err();
        assert!(err.is_malformed());

        let err = from_bytes::<Reading>(&[0x15, 0x24, 0x00, 0x02, 0x18]).unwrap_err();
        assert!(!err.is_malformed());
    }
}
