use std::fmt::{self, Display, Formatter};

use matter_tlv::{
    FieldDescriptor, FieldSet, FieldType, Result, StructDisplay, StructSchema, TlvStruct,
};

pub const TAG_START_TIMESTAMP: u8 = 0;
pub const TAG_END_TIMESTAMP: u8 = 1;
pub const TAG_OCCUPANCY: u8 = 2;
pub const TAG_CONFIDENCE: u8 = 3;

const PREDICTED_OCCUPANCY_SCHEMA: StructSchema = StructSchema {
    name: "OccupancySensingClusterPredictedOccupancyStruct",
    fields: &[
        FieldDescriptor::new("startTimestamp", TAG_START_TIMESTAMP, FieldType::UInt),
        FieldDescriptor::new("endTimestamp", TAG_END_TIMESTAMP, FieldType::UInt),
        FieldDescriptor::new("occupancy", TAG_OCCUPANCY, FieldType::UByte),
        FieldDescriptor::new("confidence", TAG_CONFIDENCE, FieldType::UByte),
    ],
};

/// A predicted occupancy level for a window of time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PredictedOccupancyStruct {
    /// Epoch seconds.
    pub start_timestamp: u32,
    pub end_timestamp: u32,
    pub occupancy: u8,
    /// Percent.
    pub confidence: u8,
}

impl PredictedOccupancyStruct {
    pub fn new(start_timestamp: u32, end_timestamp: u32, occupancy: u8, confidence: u8) -> Self {
        Self {
            start_timestamp,
            end_timestamp,
            occupancy,
            confidence,
        }
    }
}

impl TlvStruct for PredictedOccupancyStruct {
    const SCHEMA: &'static StructSchema = &PREDICTED_OCCUPANCY_SCHEMA;

    fn to_fields(&self) -> FieldSet {
        FieldSet::new(Self::SCHEMA)
            .with(TAG_START_TIMESTAMP, self.start_timestamp)
            .with(TAG_END_TIMESTAMP, self.end_timestamp)
            .with(TAG_OCCUPANCY, self.occupancy)
            .with(TAG_CONFIDENCE, self.confidence)
    }

    fn from_fields(mut fields: FieldSet) -> Result<Self> {
        Ok(Self {
            start_timestamp: fields.take(TAG_START_TIMESTAMP)?,
            end_timestamp: fields.take(TAG_END_TIMESTAMP)?,
            occupancy: fields.take(TAG_OCCUPANCY)?,
            confidence: fields.take(TAG_CONFIDENCE)?,
        })
    }
}

impl Display for PredictedOccupancyStruct {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        StructDisplay::new(&self.to_fields()).fmt(f)
    }
}

#[cfg(test)]
mod test {
    use matter_config::{ReaderConfig, TrailingElements};
    use matter_tlv::{
        Error, FieldSet, Tag, TlvReader, TlvStruct, TlvValue, TlvWriter, from_bytes, to_bytes,
    };

    use super::*;

    #[test]
    fn test_roundtrip() {
        let prediction = PredictedOccupancyStruct::new(1000, 2000, 1, 90);

        let expected_bytes = [
            0x15, // Anonymous structure
            0x26, 0x00, // Context tag 0, uint32
            0xE8, 0x03, 0x00, 0x00, // 1000
            0x26, 0x01, // Context tag 1, uint32
            0xD0, 0x07, 0x00, 0x00, // 2000
            0x24, 0x02, 0x01, // Context tag 2, uint8 1
            0x24, 0x03, 0x5A, // Context tag 3, uint8 90
            0x18, // End of container
        ];

        let bytes = to_bytes(&prediction).unwrap();
        assert_eq!(bytes.as_ref(), expected_bytes);

        let decoded: PredictedOccupancyStruct = from_bytes(&bytes).unwrap();
        assert_eq!(decoded, prediction);
    }

    #[test]
    fn test_context_tagged_inside_parent() {
        let prediction = PredictedOccupancyStruct::new(7, 8, 0, 100);

        let mut writer = TlvWriter::new();
        writer.start_list(Tag::Anonymous).unwrap();
        prediction.to_tlv(Tag::Context(4), &mut writer).unwrap();
        writer.end_list().unwrap();
        let bytes = writer.finish().unwrap();

        let mut reader = TlvReader::new(&bytes);
        reader.enter_list(Tag::Anonymous).unwrap();
        let decoded = PredictedOccupancyStruct::from_tlv(Tag::Context(4), &mut reader).unwrap();
        reader.exit_container().unwrap();
        assert_eq!(decoded, prediction);
        assert!(reader.is_exhausted());
    }

    #[test]
    fn test_wrong_field_tag() {
        let mut writer = TlvWriter::new();
        writer.start_structure(Tag::Anonymous).unwrap();
        writer.put_u32(Tag::Context(0), 1000).unwrap();
        writer.put_u32(Tag::Context(5), 2000).unwrap();
        writer.put_u8(Tag::Context(2), 1).unwrap();
        writer.put_u8(Tag::Context(3), 90).unwrap();
        writer.end_structure().unwrap();
        let bytes = writer.finish().unwrap();

        let err = from_bytes::<PredictedOccupancyStruct>(&bytes).unwrap_err();
        assert!(matches!(
            err,
            Error::TagMismatch {
                expected: Tag::Context(1),
                found: Tag::Context(5),
            }
        ));
    }

    #[test]
    fn test_fields_out_of_order() {
        let mut writer = TlvWriter::new();
        writer.start_structure(Tag::Anonymous).unwrap();
        writer.put_u32(Tag::Context(1), 2000).unwrap();
        writer.put_u32(Tag::Context(0), 1000).unwrap();
        writer.put_u8(Tag::Context(2), 1).unwrap();
        writer.put_u8(Tag::Context(3), 90).unwrap();
        writer.end_structure().unwrap();
        let bytes = writer.finish().unwrap();

        assert!(matches!(
            from_bytes::<PredictedOccupancyStruct>(&bytes),
            Err(Error::TagMismatch {
                expected: Tag::Context(0),
                found: Tag::Context(1),
            })
        ));
    }

    #[test]
    fn test_occupancy_out_of_range() {
        // Rejected before anything is written
        let fields = FieldSet::new(PredictedOccupancyStruct::SCHEMA)
            .with(TAG_START_TIMESTAMP, 1000u32)
            .with(TAG_END_TIMESTAMP, 2000u32)
            .with(TAG_OCCUPANCY, TlvValue::UInt(300))
            .with(TAG_CONFIDENCE, 90u8);
        let mut writer = TlvWriter::new();
        assert!(matches!(
            PredictedOccupancyStruct::SCHEMA.encode(&fields, Tag::Anonymous, &mut writer),
            Err(Error::OutOfRange {
                value: 300,
                target: "UByte",
            })
        ));
        assert!(writer.is_empty());

        // A peer that sent 300 in two bytes
        let mut writer = TlvWriter::new();
        writer.start_structure(Tag::Anonymous).unwrap();
        writer.put_u32(Tag::Context(0), 1000).unwrap();
        writer.put_u32(Tag::Context(1), 2000).unwrap();
        writer.put_u16(Tag::Context(2), 300).unwrap();
        writer.put_u8(Tag::Context(3), 90).unwrap();
        writer.end_structure().unwrap();
        let bytes = writer.finish().unwrap();

        assert!(matches!(
            from_bytes::<PredictedOccupancyStruct>(&bytes),
            Err(Error::OutOfRange {
                value: 300,
                target: "uint8",
            })
        ));
    }

    #[test]
    fn test_exit_with_unread_fields() {
        let bytes = to_bytes(&PredictedOccupancyStruct::new(1000, 2000, 1, 90)).unwrap();

        let mut reader = TlvReader::new(&bytes);
        reader.enter_structure(Tag::Anonymous).unwrap();
        assert_eq!(reader.get_u32(Tag::Context(0)).unwrap(), 1000);
        assert!(matches!(
            reader.exit_container(),
            Err(Error::UnreadElements(Tag::Context(1)))
        ));

        let config = ReaderConfig {
            trailing_elements: TrailingElements::Skip,
            ..ReaderConfig::default()
        };
        let mut reader = TlvReader::with_config(&bytes, &config);
        reader.enter_structure(Tag::Anonymous).unwrap();
        reader.exit_container().unwrap();
        assert!(reader.is_exhausted());
    }

    #[test]
    fn test_truncated() {
        let bytes = to_bytes(&PredictedOccupancyStruct::new(1000, 2000, 1, 90)).unwrap();
        for len in 0..bytes.len() {
            let err = from_bytes::<PredictedOccupancyStruct>(&bytes[..len]).unwrap_err();
            assert!(err.is_malformed(), "prefix of {len} bytes gave {err}");
        }
    }

    #[test]
    fn test_display() {
        let prediction = PredictedOccupancyStruct::new(1000, 2000, 1, 90);
        assert_eq!(
            prediction.to_string(),
            "OccupancySensingClusterPredictedOccupancyStruct {\n\
             \tstartTimestamp : 1000\n\
             \tendTimestamp : 2000\n\
             \toccupancy : 1\n\
             \tconfidence : 90\n\
             }\n"
        );
    }
}
