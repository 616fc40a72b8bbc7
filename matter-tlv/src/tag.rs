use std::fmt::{self, Display};

use bytes::{Buf, BufMut, BytesMut};

use crate::{Error, Result};

pub const TAG_CONTROL_MASK: u8 = 0xE0;

pub const ANONYMOUS: u8 = 0x00;
pub const CONTEXT_SPECIFIC: u8 = 0x20;
pub const COMMON_PROFILE_2: u8 = 0x40;
pub const COMMON_PROFILE_4: u8 = 0x60;
pub const IMPLICIT_PROFILE_2: u8 = 0x80;
pub const IMPLICIT_PROFILE_4: u8 = 0xA0;
pub const FULLY_QUALIFIED_6: u8 = 0xC0;
pub const FULLY_QUALIFIED_8: u8 = 0xE0;

/// Identifies an element within its enclosing container.
///
/// Context tags only mean something relative to the structure or list they
/// appear in; the profile forms are globally scoped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Tag {
    Anonymous,
    Context(u8),
    CommonProfile(u32),
    ImplicitProfile(u32),
    FullyQualified {
        vendor_id: u16,
        profile_num: u16,
        tag_num: u32,
    },
}

impl Tag {
    pub const fn is_anonymous(&self) -> bool {
        matches!(self, Tag::Anonymous)
    }

    pub const fn is_context(&self) -> bool {
        matches!(self, Tag::Context(_))
    }

    /// Tag control bits for the control byte, using the shortest form.
    pub const fn control_bits(&self) -> u8 {
        match self {
            Tag::Anonymous => ANONYMOUS,
            Tag::Context(_) => CONTEXT_SPECIFIC,
            Tag::CommonProfile(num) => {
                if *num <= u16::MAX as u32 {
                    COMMON_PROFILE_2
                } else {
                    COMMON_PROFILE_4
                }
            }
            Tag::ImplicitProfile(num) => {
                if *num <= u16::MAX as u32 {
                    IMPLICIT_PROFILE_2
                } else {
                    IMPLICIT_PROFILE_4
                }
            }
            Tag::FullyQualified { tag_num, .. } => {
                if *tag_num <= u16::MAX as u32 {
                    FULLY_QUALIFIED_6
                } else {
                    FULLY_QUALIFIED_8
                }
            }
        }
    }

    /// Number of tag bytes that follow a control byte carrying `control`.
    pub const fn encoded_len(control: u8) -> usize {
        match control & TAG_CONTROL_MASK {
            ANONYMOUS => 0,
            CONTEXT_SPECIFIC => 1,
            COMMON_PROFILE_2 | IMPLICIT_PROFILE_2 => 2,
            COMMON_PROFILE_4 | IMPLICIT_PROFILE_4 => 4,
            FULLY_QUALIFIED_6 => 6,
            _ => 8,
        }
    }

    pub(crate) fn write_to(&self, buf: &mut BytesMut) {
        match *self {
            Tag::Anonymous => {}
            Tag::Context(num) => buf.put_u8(num),
            Tag::CommonProfile(num) | Tag::ImplicitProfile(num) => {
                if num <= u16::MAX as u32 {
                    buf.put_u16_le(num as u16);
                } else {
                    buf.put_u32_le(num);
                }
            }
            Tag::FullyQualified {
                vendor_id,
                profile_num,
                tag_num,
            } => {
                buf.put_u16_le(vendor_id);
                buf.put_u16_le(profile_num);
                if tag_num <= u16::MAX as u32 {
                    buf.put_u16_le(tag_num as u16);
                } else {
                    buf.put_u32_le(tag_num);
                }
            }
        }
    }

    /// Decodes the tag bytes that follow a control byte.
    pub(crate) fn read_from(control: u8, mut src: &[u8]) -> Result<Tag> {
        let needed = Self::encoded_len(control);
        if src.remaining() < needed {
            return Err(Error::Truncated {
                needed,
                remaining: src.remaining(),
            });
        }

        let tag = match control & TAG_CONTROL_MASK {
            ANONYMOUS => Tag::Anonymous,
            CONTEXT_SPECIFIC => Tag::Context(src.get_u8()),
            COMMON_PROFILE_2 => Tag::CommonProfile(src.get_u16_le() as u32),
            COMMON_PROFILE_4 => Tag::CommonProfile(src.get_u32_le()),
            IMPLICIT_PROFILE_2 => Tag::ImplicitProfile(src.get_u16_le() as u32),
            IMPLICIT_PROFILE_4 => Tag::ImplicitProfile(src.get_u32_le()),
            FULLY_QUALIFIED_6 => Tag::FullyQualified {
                vendor_id: src.get_u16_le(),
                profile_num: src.get_u16_le(),
                tag_num: src.get_u16_le() as u32,
            },
            _ => Tag::FullyQualified {
                vendor_id: src.get_u16_le(),
                profile_num: src.get_u16_le(),
                tag_num: src.get_u32_le(),
            },
        };
        Ok(tag)
    }
}

impl Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tag::Anonymous => write!(f, "anonymous"),
            Tag::Context(num) => write!(f, "context {num}"),
            Tag::CommonProfile(num) => write!(f, "common profile {num}"),
            Tag::ImplicitProfile(num) => write!(f, "implicit profile {num}"),
            Tag::FullyQualified {
                vendor_id,
                profile_num,
                tag_num,
            } => write!(f, "{vendor_id:#06x}:{profile_num:#06x}:{tag_num}"),
        }
    }
}
