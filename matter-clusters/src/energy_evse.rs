use std::fmt::{self, Display, Formatter};

use matter_tlv::{
    FieldDescriptor, FieldSet, FieldType, Result, StructDisplay, StructSchema, TlvStruct,
    TlvValue,
};

pub const TAG_TARGET_TIME_MINUTES_PAST_MIDNIGHT: u8 = 0;
pub const TAG_TARGET_SOC: u8 = 1;
pub const TAG_ADDED_ENERGY: u8 = 2;

pub const TAG_DAY_OF_WEEK_FOR_SEQUENCE: u8 = 0;
pub const TAG_CHARGING_TARGETS: u8 = 1;

const CHARGING_TARGET_SCHEMA: StructSchema = StructSchema {
    name: "EnergyEvseClusterChargingTargetStruct",
    fields: &[
        FieldDescriptor::new(
            "targetTimeMinutesPastMidnight",
            TAG_TARGET_TIME_MINUTES_PAST_MIDNIGHT,
            FieldType::UShort,
        ),
        FieldDescriptor::new("targetSoC", TAG_TARGET_SOC, FieldType::UByte).optional(),
        FieldDescriptor::new("addedEnergy", TAG_ADDED_ENERGY, FieldType::Long).optional(),
    ],
};

const CHARGING_TARGET_SCHEDULE_SCHEMA: StructSchema = StructSchema {
    name: "EnergyEvseClusterChargingTargetScheduleStruct",
    fields: &[
        FieldDescriptor::new(
            "dayOfWeekForSequence",
            TAG_DAY_OF_WEEK_FOR_SEQUENCE,
            FieldType::UByte,
        ),
        FieldDescriptor::new(
            "chargingTargets",
            TAG_CHARGING_TARGETS,
            FieldType::Array(&FieldType::Struct(&CHARGING_TARGET_SCHEMA)),
        ),
    ],
};

/// Bits of [`ChargingTargetScheduleStruct::day_of_week_for_sequence`].
pub mod day_of_week {
    pub const SUNDAY: u8 = 0x01;
    pub const MONDAY: u8 = 0x02;
    pub const TUESDAY: u8 = 0x04;
    pub const WEDNESDAY: u8 = 0x08;
    pub const THURSDAY: u8 = 0x10;
    pub const FRIDAY: u8 = 0x20;
    pub const SATURDAY: u8 = 0x40;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChargingTargetStruct {
    pub target_time_minutes_past_midnight: u16,
    /// State of charge in percent.
    pub target_soc: Option<u8>,
    /// Milliwatt hours.
    pub added_energy: Option<i64>,
}

impl TlvStruct for ChargingTargetStruct {
    const SCHEMA: &'static StructSchema = &CHARGING_TARGET_SCHEMA;

    fn to_fields(&self) -> FieldSet {
        FieldSet::new(Self::SCHEMA)
            .with(
                TAG_TARGET_TIME_MINUTES_PAST_MIDNIGHT,
                self.target_time_minutes_past_midnight,
            )
            .with_optional(TAG_TARGET_SOC, self.target_soc)
            .with_optional(TAG_ADDED_ENERGY, self.added_energy)
    }

    fn from_fields(mut fields: FieldSet) -> Result<Self> {
        Ok(Self {
            target_time_minutes_past_midnight: fields.take(TAG_TARGET_TIME_MINUTES_PAST_MIDNIGHT)?,
            target_soc: fields.take_optional(TAG_TARGET_SOC)?,
            added_energy: fields.take_optional(TAG_ADDED_ENERGY)?,
        })
    }
}

impl Display for ChargingTargetStruct {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        StructDisplay::new(&self.to_fields()).fmt(f)
    }
}

/// Charging targets that apply on the days set in `day_of_week_for_sequence`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChargingTargetScheduleStruct {
    pub day_of_week_for_sequence: u8,
    pub charging_targets: Vec<ChargingTargetStruct>,
}

impl ChargingTargetScheduleStruct {
    pub fn applies_on(&self, day: u8) -> bool {
        self.day_of_week_for_sequence & day != 0
    }
}

impl TlvStruct for ChargingTargetScheduleStruct {
    const SCHEMA: &'static StructSchema = &CHARGING_TARGET_SCHEDULE_SCHEMA;

    fn to_fields(&self) -> FieldSet {
        let targets: Vec<TlvValue> = self
            .charging_targets
            .iter()
            .map(|target| target.to_fields().into_value())
            .collect();
        FieldSet::new(Self::SCHEMA)
            .with(TAG_DAY_OF_WEEK_FOR_SEQUENCE, self.day_of_week_for_sequence)
            .with(TAG_CHARGING_TARGETS, targets)
    }

    fn from_fields(mut fields: FieldSet) -> Result<Self> {
        Ok(Self {
            day_of_week_for_sequence: fields.take(TAG_DAY_OF_WEEK_FOR_SEQUENCE)?,
            charging_targets: fields.take_struct_list(TAG_CHARGING_TARGETS)?,
        })
    }
}

impl Display for ChargingTargetScheduleStruct {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        StructDisplay::new(&self.to_fields()).fmt(f)
    }
}

#[cfg(test)]
mod test {
    use matter_config::{ReaderConfig, TrailingElements};
    use matter_tlv::{Error, Tag, TlvWriter, from_bytes, from_bytes_with_config, to_bytes};

    use super::*;

    fn schedule() -> ChargingTargetScheduleStruct {
        ChargingTargetScheduleStruct {
            day_of_week_for_sequence: day_of_week::MONDAY | day_of_week::FRIDAY,
            charging_targets: vec![
                ChargingTargetStruct {
                    target_time_minutes_past_midnight: 420,
                    target_soc: Some(80),
                    added_energy: None,
                },
                ChargingTargetStruct {
                    target_time_minutes_past_midnight: 1080,
                    target_soc: None,
                    added_energy: Some(25_000_000),
                },
            ],
        }
    }

    #[test]
    fn test_optional_fields_bytes() {
        let target = ChargingTargetStruct {
            target_time_minutes_past_midnight: 420,
            target_soc: Some(80),
            added_energy: None,
        };

        let expected_bytes = [
            0x15, // Anonymous structure
            0x25, 0x00, // Context tag 0, uint16
            0xA4, 0x01, // 420
            0x24, 0x01, 0x50, // Context tag 1, uint8 80
            0x18, // End of container, no tag 2
        ];

        let bytes = to_bytes(&target).unwrap();
        assert_eq!(bytes.as_ref(), expected_bytes);
        assert_eq!(from_bytes::<ChargingTargetStruct>(&bytes).unwrap(), target);
    }

    #[test]
    fn test_optional_fields_swapped() {
        let mut writer = TlvWriter::new();
        writer.start_structure(Tag::Anonymous).unwrap();
        writer.put_u16(Tag::Context(0), 420).unwrap();
        writer.put_i64(Tag::Context(2), 5).unwrap();
        writer.put_u8(Tag::Context(1), 80).unwrap();
        writer.end_structure().unwrap();
        let bytes = writer.finish().unwrap();

        assert!(matches!(
            from_bytes::<ChargingTargetStruct>(&bytes),
            Err(Error::TagMismatch {
                expected: Tag::Context(1),
                found: Tag::Context(2),
            })
        ));

        let config = ReaderConfig {
            trailing_elements: TrailingElements::Skip,
            ..ReaderConfig::default()
        };
        assert!(matches!(
            from_bytes_with_config::<ChargingTargetStruct>(&bytes, &config),
            Err(Error::TagMismatch {
                expected: Tag::Context(1),
                found: Tag::Context(2),
            })
        ));
    }

    #[test]
    fn test_unknown_trailing_field_with_absent_optionals() {
        let mut writer = TlvWriter::new();
        writer.start_structure(Tag::Anonymous).unwrap();
        writer.put_u16(Tag::Context(0), 420).unwrap();
        writer.put_u8(Tag::Context(7), 1).unwrap();
        writer.end_structure().unwrap();
        let bytes = writer.finish().unwrap();

        assert!(matches!(
            from_bytes::<ChargingTargetStruct>(&bytes),
            Err(Error::UnreadElements(Tag::Context(7)))
        ));

        let config = ReaderConfig {
            trailing_elements: TrailingElements::Skip,
            ..ReaderConfig::default()
        };
        let target: ChargingTargetStruct = from_bytes_with_config(&bytes, &config).unwrap();
        assert_eq!(target.target_time_minutes_past_midnight, 420);
        assert_eq!(target.target_soc, None);
        assert_eq!(target.added_energy, None);
    }

    #[test]
    fn test_nested_schedule_roundtrip() {
        let schedule = schedule();
        let bytes = to_bytes(&schedule).unwrap();
        let decoded: ChargingTargetScheduleStruct = from_bytes(&bytes).unwrap();
        assert_eq!(decoded, schedule);
        assert!(decoded.applies_on(day_of_week::FRIDAY));
        assert!(!decoded.applies_on(day_of_week::SUNDAY));
    }

    #[test]
    fn test_empty_schedule() {
        let schedule = ChargingTargetScheduleStruct {
            day_of_week_for_sequence: 0,
            charging_targets: Vec::new(),
        };
        let bytes = to_bytes(&schedule).unwrap();
        assert_eq!(
            bytes.as_ref(),
            [0x15, 0x24, 0x00, 0x00, 0x36, 0x01, 0x18, 0x18]
        );
        assert_eq!(
            from_bytes::<ChargingTargetScheduleStruct>(&bytes).unwrap(),
            schedule
        );
    }

    #[test]
    fn test_array_elements_must_be_anonymous() {
        let mut writer = TlvWriter::new();
        writer.start_structure(Tag::Anonymous).unwrap();
        writer.put_u8(Tag::Context(0), 1).unwrap();
        writer.start_array(Tag::Context(1)).unwrap();
        assert!(matches!(
            writer.start_structure(Tag::Context(0)),
            Err(Error::InvalidTag { .. })
        ));
    }

    #[test]
    fn test_missing_required_nested_field() {
        let mut writer = TlvWriter::new();
        writer.start_structure(Tag::Anonymous).unwrap();
        writer.put_u8(Tag::Context(0), 1).unwrap();
        writer.start_array(Tag::Context(1)).unwrap();
        writer.start_structure(Tag::Anonymous).unwrap();
        writer.put_u8(Tag::Context(1), 50).unwrap();
        writer.end_structure().unwrap();
        writer.end_array().unwrap();
        writer.end_structure().unwrap();
        let bytes = writer.finish().unwrap();

        assert!(matches!(
            from_bytes::<ChargingTargetScheduleStruct>(&bytes),
            Err(Error::TagMismatch {
                expected: Tag::Context(0),
                found: Tag::Context(1),
            })
        ));
    }

    #[test]
    fn test_display_nested() {
        let schedule = ChargingTargetScheduleStruct {
            day_of_week_for_sequence: day_of_week::SATURDAY,
            charging_targets: vec![ChargingTargetStruct {
                target_time_minutes_past_midnight: 60,
                target_soc: None,
                added_energy: Some(-5),
            }],
        };
        assert_eq!(
            schedule.to_string(),
            "EnergyEvseClusterChargingTargetScheduleStruct {\n\
             \tdayOfWeekForSequence : 64\n\
             \tchargingTargets : [EnergyEvseClusterChargingTargetStruct {\n\
             \t\ttargetTimeMinutesPastMidnight : 60\n\
             \t\ttargetSoC : None\n\
             \t\taddedEnergy : -5\n\
             \t}]\n\
             }\n"
        );
    }
}
