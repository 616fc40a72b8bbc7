use std::fmt::{self, Display};

use crate::Error;

/// Mask selecting the element type bits of a control byte.
pub const ELEMENT_TYPE_MASK: u8 = 0x1F;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ElementType {
    Int8 = 0x00,
    Int16 = 0x01,
    Int32 = 0x02,
    Int64 = 0x03,
    UInt8 = 0x04,
    UInt16 = 0x05,
    UInt32 = 0x06,
    UInt64 = 0x07,
    False = 0x08,
    True = 0x09,
    Float32 = 0x0A,
    Float64 = 0x0B,
    Utf8String1 = 0x0C,
    Utf8String2 = 0x0D,
    Utf8String4 = 0x0E,
    Utf8String8 = 0x0F,
    ByteString1 = 0x10,
    ByteString2 = 0x11,
    ByteString4 = 0x12,
    ByteString8 = 0x13,
    Null = 0x14,
    Structure = 0x15,
    Array = 0x16,
    List = 0x17,
    EndOfContainer = 0x18,
}

impl ElementType {
    pub const fn id(self) -> u8 {
        self as u8
    }

    /// Extracts the element type from a control byte.
    pub fn from_control(control: u8) -> Result<Self, Error> {
        let id = control & ELEMENT_TYPE_MASK;
        let element_type = match id {
            0x00 => Self::Int8,
            0x01 => Self::Int16,
            0x02 => Self::Int32,
            0x03 => Self::Int64,
            0x04 => Self::UInt8,
            0x05 => Self::UInt16,
            0x06 => Self::UInt32,
            0x07 => Self::UInt64,
            0x08 => Self::False,
            0x09 => Self::True,
            0x0A => Self::Float32,
            0x0B => Self::Float64,
            0x0C => Self::Utf8String1,
            0x0D => Self::Utf8String2,
            0x0E => Self::Utf8String4,
            0x0F => Self::Utf8String8,
            0x10 => Self::ByteString1,
            0x11 => Self::ByteString2,
            0x12 => Self::ByteString4,
            0x13 => Self::ByteString8,
            0x14 => Self::Null,
            0x15 => Self::Structure,
            0x16 => Self::Array,
            0x17 => Self::List,
            0x18 => Self::EndOfContainer,
            _ => return Err(Error::UnknownElementType(id)),
        };
        Ok(element_type)
    }

    pub const fn is_signed_int(self) -> bool {
        matches!(self, Self::Int8 | Self::Int16 | Self::Int32 | Self::Int64)
    }

    pub const fn is_unsigned_int(self) -> bool {
        matches!(self, Self::UInt8 | Self::UInt16 | Self::UInt32 | Self::UInt64)
    }

    pub const fn is_bool(self) -> bool {
        matches!(self, Self::False | Self::True)
    }

    pub const fn is_utf8_string(self) -> bool {
        matches!(
            self,
            Self::Utf8String1 | Self::Utf8String2 | Self::Utf8String4 | Self::Utf8String8
        )
    }

    pub const fn is_byte_string(self) -> bool {
        matches!(
            self,
            Self::ByteString1 | Self::ByteString2 | Self::ByteString4 | Self::ByteString8
        )
    }

    pub const fn is_container(self) -> bool {
        matches!(self, Self::Structure | Self::Array | Self::List)
    }

    /// Number of value bytes that directly follow the tag.
    ///
    /// For strings this is the width of the length prefix, not of the payload.
    pub const fn value_width(self) -> usize {
        match self {
            Self::Int8 | Self::UInt8 | Self::Utf8String1 | Self::ByteString1 => 1,
            Self::Int16 | Self::UInt16 | Self::Utf8String2 | Self::ByteString2 => 2,
            Self::Int32 | Self::UInt32 | Self::Float32 | Self::Utf8String4 | Self::ByteString4 => {
                4
            }
            Self::Int64 | Self::UInt64 | Self::Float64 | Self::Utf8String8 | Self::ByteString8 => {
                8
            }
            Self::False
            | Self::True
            | Self::Null
            | Self::Structure
            | Self::Array
            | Self::List
            | Self::EndOfContainer => 0,
        }
    }

    /// Smallest unsigned integer type able to hold `value`.
    pub const fn unsigned_for(value: u64) -> Self {
        if value <= u8::MAX as u64 {
            Self::UInt8
        } else if value <= u16::MAX as u64 {
            Self::UInt16
        } else if value <= u32::MAX as u64 {
            Self::UInt32
        } else {
            Self::UInt64
        }
    }

    /// Smallest signed integer type able to hold `value`.
    pub const fn signed_for(value: i64) -> Self {
        if value >= i8::MIN as i64 && value <= i8::MAX as i64 {
            Self::Int8
        } else if value >= i16::MIN as i64 && value <= i16::MAX as i64 {
            Self::Int16
        } else if value >= i32::MIN as i64 && value <= i32::MAX as i64 {
            Self::Int32
        } else {
            Self::Int64
        }
    }

    /// String element type whose length prefix can hold `len`.
    pub const fn utf8_string_for(len: usize) -> Self {
        match Self::length_width(len) {
            1 => Self::Utf8String1,
            2 => Self::Utf8String2,
            4 => Self::Utf8String4,
            _ => Self::Utf8String8,
        }
    }

    /// Byte string element type whose length prefix can hold `len`.
    pub const fn byte_string_for(len: usize) -> Self {
        match Self::length_width(len) {
            1 => Self::ByteString1,
            2 => Self::ByteString2,
            4 => Self::ByteString4,
            _ => Self::ByteString8,
        }
    }

    const fn length_width(len: usize) -> usize {
        if len <= u8::MAX as usize {
            1
        } else if len <= u16::MAX as usize {
            2
        } else if len as u64 <= u32::MAX as u64 {
            4
        } else {
            8
        }
    }
}

impl Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::UInt8 => "uint8",
            Self::UInt16 => "uint16",
            Self::UInt32 => "uint32",
            Self::UInt64 => "uint64",
            Self::False | Self::True => "boolean",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::Utf8String1 | Self::Utf8String2 | Self::Utf8String4 | Self::Utf8String8 => {
                "utf8 string"
            }
            Self::ByteString1 | Self::ByteString2 | Self::ByteString4 | Self::ByteString8 => {
                "byte string"
            }
            Self::Null => "null",
            Self::Structure => "structure",
            Self::Array => "array",
            Self::List => "list",
            Self::EndOfContainer => "end of container",
        };
        f.write_str(name)
    }
}

/// The three container kinds a reader or writer can have open.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContainerType {
    Structure,
    Array,
    List,
}

impl ContainerType {
    pub const fn element_type(self) -> ElementType {
        match self {
            Self::Structure => ElementType::Structure,
            Self::Array => ElementType::Array,
            Self::List => ElementType::List,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Structure => "structure",
            Self::Array => "array",
            Self::List => "list",
        }
    }
}

impl Display for ContainerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod test {
    use super::ElementType;
    use crate::Error;

    #[test]
    fn control_byte_ignores_tag_bits() {
        assert_eq!(
            ElementType::from_control(0x26).unwrap(),
            ElementType::UInt32
        );
        assert_eq!(
            ElementType::from_control(0x15).unwrap(),
            ElementType::Structure
        );
        assert!(matches!(
            ElementType::from_control(0x19),
            Err(Error::UnknownElementType(0x19))
        ));
    }

    #[test]
    fn minimal_widths() {
        assert_eq!(ElementType::unsigned_for(255), ElementType::UInt8);
        assert_eq!(ElementType::unsigned_for(256), ElementType::UInt16);
        assert_eq!(ElementType::unsigned_for(u64::MAX), ElementType::UInt64);
        assert_eq!(ElementType::signed_for(-128), ElementType::Int8);
        assert_eq!(ElementType::signed_for(-129), ElementType::Int16);
        assert_eq!(ElementType::signed_for(i32::MIN as i64), ElementType::Int32);
        assert_eq!(ElementType::utf8_string_for(0), ElementType::Utf8String1);
        assert_eq!(ElementType::byte_string_for(300), ElementType::ByteString2);
    }
}
