use bytes::Buf;
use matter_config::{ReaderConfig, TrailingElements};

use crate::element::{ContainerType, ElementType};
use crate::{Error, Result, Tag};

#[derive(Clone, Copy, Debug)]
struct Header {
    tag: Tag,
    element_type: ElementType,
    /// Control byte plus tag bytes.
    len: usize,
}

/// Sequential reader over a borrowed TLV byte stream.
///
/// Every getter names the tag it expects; the element under the cursor must
/// carry exactly that tag and a compatible type. A failed getter leaves the
/// cursor where it was.
#[derive(Debug)]
pub struct TlvReader<'a> {
    buf: &'a [u8],
    pos: usize,
    containers: Vec<ContainerType>,
    config: ReaderConfig,
}

impl<'a> TlvReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self::with_config(buf, &ReaderConfig::default())
    }

    pub fn with_config(buf: &'a [u8], config: &ReaderConfig) -> Self {
        Self {
            buf,
            pos: 0,
            containers: Vec::new(),
            config: config.clone(),
        }
    }

    /// Number of currently entered containers.
    pub fn depth(&self) -> usize {
        self.containers.len()
    }

    /// Bytes not consumed yet.
    pub fn remaining(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    pub fn is_exhausted(&self) -> bool {
        self.pos == self.buf.len()
    }

    fn header(&self) -> Result<Header> {
        let rest = &self.buf[self.pos..];
        let Some(&control) = rest.first() else {
            return Err(Error::Truncated {
                needed: 1,
                remaining: 0,
            });
        };
        let element_type = ElementType::from_control(control)?;
        let tag = Tag::read_from(control, &rest[1..])?;
        if element_type == ElementType::EndOfContainer && !tag.is_anonymous() {
            return Err(Error::InvalidTagControl(control));
        }

        Ok(Header {
            tag,
            element_type,
            len: 1 + Tag::encoded_len(control),
        })
    }

    /// Header of the next element, which must carry `tag`.
    fn expect(&self, tag: Tag) -> Result<Header> {
        let header = self.header()?;
        if header.element_type == ElementType::EndOfContainer {
            return Err(Error::UnexpectedEndOfContainer(tag));
        }
        if header.tag != tag {
            return Err(Error::TagMismatch {
                expected: tag,
                found: header.tag,
            });
        }
        Ok(header)
    }

    /// `width` bytes directly following the header, or after an extra `skip`.
    fn value_bytes(&self, header: &Header, skip: usize, width: usize) -> Result<&'a [u8]> {
        let buf: &'a [u8] = self.buf;
        let start = (self.pos + header.len + skip).min(buf.len());
        let remaining = buf.len() - start;
        if remaining < width {
            return Err(Error::Truncated {
                needed: width,
                remaining,
            });
        }
        Ok(&buf[start..start + width])
    }

    /// Length prefix of a string element, checked against the configured limit.
    fn string_len(&self, header: &Header) -> Result<usize> {
        let width = header.element_type.value_width();
        let len = self.value_bytes(header, 0, width)?.get_uint_le(width);
        if len > self.config.max_element_len as u64 {
            return Err(Error::LargeLength(len));
        }
        Ok(len as usize)
    }

    /// Number of value bytes of a non-container element, payload included.
    fn value_len(&self, header: &Header) -> Result<usize> {
        let width = header.element_type.value_width();
        if header.element_type.is_utf8_string() || header.element_type.is_byte_string() {
            let len = self.string_len(header)?;
            self.value_bytes(header, width, len)?;
            Ok(width + len)
        } else {
            self.value_bytes(header, 0, width)?;
            Ok(width)
        }
    }

    /// Tag of the next element, or `None` at the end of the current container
    /// or of a top-level stream.
    pub fn peek_tag(&self) -> Result<Option<Tag>> {
        Ok(self.peek()?.map(|header| header.tag))
    }

    /// Element type of the next element, with the same end handling as
    /// [`TlvReader::peek_tag`].
    pub fn peek_element_type(&self) -> Result<Option<ElementType>> {
        Ok(self.peek()?.map(|header| header.element_type))
    }

    fn peek(&self) -> Result<Option<Header>> {
        if self.containers.is_empty() && self.is_exhausted() {
            return Ok(None);
        }
        let header = self.header()?;
        if header.element_type == ElementType::EndOfContainer {
            return Ok(None);
        }
        Ok(Some(header))
    }

    /// Whether the next element is a null.
    pub fn is_null(&self) -> Result<bool> {
        Ok(self.peek_element_type()? == Some(ElementType::Null))
    }

    fn enter(&mut self, tag: Tag, container: ContainerType) -> Result<()> {
        let header = self.expect(tag)?;
        if header.element_type != container.element_type() {
            return Err(Error::TypeMismatch {
                expected: container.name(),
                found: header.element_type,
            });
        }
        if self.containers.len() >= self.config.max_depth {
            return Err(Error::DepthExceeded(self.config.max_depth));
        }
        self.pos += header.len;
        self.containers.push(container);
        log::trace!(
            "entered {} tagged {} at depth {}",
            container,
            tag,
            self.containers.len()
        );
        Ok(())
    }

    pub fn enter_structure(&mut self, tag: Tag) -> Result<()> {
        self.enter(tag, ContainerType::Structure)
    }

    pub fn enter_array(&mut self, tag: Tag) -> Result<()> {
        self.enter(tag, ContainerType::Array)
    }

    pub fn enter_list(&mut self, tag: Tag) -> Result<()> {
        self.enter(tag, ContainerType::List)
    }

    /// Consumes the end of the innermost entered container.
    ///
    /// Unread elements before the end are an error under
    /// [`TrailingElements::Reject`] and are skipped under
    /// [`TrailingElements::Skip`].
    pub fn exit_container(&mut self) -> Result<()> {
        if self.containers.is_empty() {
            return Err(Error::StructureImbalance);
        }
        let start = self.pos;
        loop {
            let header = match self.header() {
                Ok(header) => header,
                Err(err) => {
                    self.pos = start;
                    return Err(err);
                }
            };
            if header.element_type == ElementType::EndOfContainer {
                self.pos += header.len;
                if let Some(container) = self.containers.pop() {
                    log::trace!("exited {} at depth {}", container, self.containers.len());
                }
                return Ok(());
            }
            match self.config.trailing_elements {
                TrailingElements::Reject => return Err(Error::UnreadElements(header.tag)),
                TrailingElements::Skip => {
                    log::debug!("skipping unread element tagged {}", header.tag);
                    if let Err(err) = self.skip_element() {
                        self.pos = start;
                        return Err(err);
                    }
                }
            }
        }
    }

    /// Skips the next element, including everything nested inside it.
    pub fn skip_element(&mut self) -> Result<()> {
        let header = self.header()?;
        if header.element_type == ElementType::EndOfContainer {
            return Err(Error::UnexpectedEndOfContainer(Tag::Anonymous));
        }
        if !header.element_type.is_container() {
            self.pos += header.len + self.value_len(&header)?;
            return Ok(());
        }

        let start = self.pos;
        self.pos += header.len;
        let mut depth = 1usize;
        while depth > 0 {
            let inner = match self.header() {
                Ok(inner) => inner,
                Err(err) => {
                    self.pos = start;
                    return Err(err);
                }
            };
            let advance = if inner.element_type == ElementType::EndOfContainer {
                depth -= 1;
                Ok(inner.len)
            } else if inner.element_type.is_container() {
                depth += 1;
                Ok(inner.len)
            } else {
                self.value_len(&inner).map(|len| inner.len + len)
            };
            match advance {
                Ok(advance) => self.pos += advance,
                Err(err) => {
                    self.pos = start;
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    fn get_unsigned(&mut self, tag: Tag, target: &'static str, max: u64) -> Result<u64> {
        let header = self.expect(tag)?;
        if !header.element_type.is_unsigned_int() {
            return Err(Error::TypeMismatch {
                expected: target,
                found: header.element_type,
            });
        }
        let width = header.element_type.value_width();
        let value = self.value_bytes(&header, 0, width)?.get_uint_le(width);
        if value > max {
            return Err(Error::OutOfRange {
                value: value as i128,
                target,
            });
        }
        self.pos += header.len + width;
        Ok(value)
    }

    fn get_signed(&mut self, tag: Tag, target: &'static str, min: i64, max: i64) -> Result<i64> {
        let header = self.expect(tag)?;
        if !header.element_type.is_signed_int() {
            return Err(Error::TypeMismatch {
                expected: target,
                found: header.element_type,
            });
        }
        let width = header.element_type.value_width();
        let value = self.value_bytes(&header, 0, width)?.get_int_le(width);
        if value < min || value > max {
            return Err(Error::OutOfRange {
                value: value as i128,
                target,
            });
        }
        self.pos += header.len + width;
        Ok(value)
    }

    /// Reads an unsigned integer of any encoded width that fits in a `u8`.
    pub fn get_u8(&mut self, tag: Tag) -> Result<u8> {
        self.get_unsigned(tag, "uint8", u8::MAX as u64)
            .map(|value| value as u8)
    }

    pub fn get_u16(&mut self, tag: Tag) -> Result<u16> {
        self.get_unsigned(tag, "uint16", u16::MAX as u64)
            .map(|value| value as u16)
    }

    pub fn get_u32(&mut self, tag: Tag) -> Result<u32> {
        self.get_unsigned(tag, "uint32", u32::MAX as u64)
            .map(|value| value as u32)
    }

    pub fn get_u64(&mut self, tag: Tag) -> Result<u64> {
        self.get_unsigned(tag, "uint64", u64::MAX)
    }

    pub fn get_i8(&mut self, tag: Tag) -> Result<i8> {
        self.get_signed(tag, "int8", i8::MIN as i64, i8::MAX as i64)
            .map(|value| value as i8)
    }

    pub fn get_i16(&mut self, tag: Tag) -> Result<i16> {
        self.get_signed(tag, "int16", i16::MIN as i64, i16::MAX as i64)
            .map(|value| value as i16)
    }

    pub fn get_i32(&mut self, tag: Tag) -> Result<i32> {
        self.get_signed(tag, "int32", i32::MIN as i64, i32::MAX as i64)
            .map(|value| value as i32)
    }

    pub fn get_i64(&mut self, tag: Tag) -> Result<i64> {
        self.get_signed(tag, "int64", i64::MIN, i64::MAX)
    }

    pub fn get_bool(&mut self, tag: Tag) -> Result<bool> {
        let header = self.expect(tag)?;
        let value = match header.element_type {
            ElementType::True => true,
            ElementType::False => false,
            found => {
                return Err(Error::TypeMismatch {
                    expected: "boolean",
                    found,
                });
            }
        };
        self.pos += header.len;
        Ok(value)
    }

    pub fn get_f32(&mut self, tag: Tag) -> Result<f32> {
        let header = self.expect(tag)?;
        if header.element_type != ElementType::Float32 {
            return Err(Error::TypeMismatch {
                expected: "float32",
                found: header.element_type,
            });
        }
        let value = self.value_bytes(&header, 0, 4)?.get_f32_le();
        self.pos += header.len + 4;
        Ok(value)
    }

    /// Reads a float64, widening a float32 element when that is what the stream holds.
    pub fn get_f64(&mut self, tag: Tag) -> Result<f64> {
        let header = self.expect(tag)?;
        let value = match header.element_type {
            ElementType::Float32 => self.value_bytes(&header, 0, 4)?.get_f32_le() as f64,
            ElementType::Float64 => self.value_bytes(&header, 0, 8)?.get_f64_le(),
            found => {
                return Err(Error::TypeMismatch {
                    expected: "float64",
                    found,
                });
            }
        };
        self.pos += header.len + header.element_type.value_width();
        Ok(value)
    }

    pub fn get_string(&mut self, tag: Tag) -> Result<&'a str> {
        let header = self.expect(tag)?;
        if !header.element_type.is_utf8_string() {
            return Err(Error::TypeMismatch {
                expected: "utf8 string",
                found: header.element_type,
            });
        }
        let width = header.element_type.value_width();
        let len = self.string_len(&header)?;
        let bytes = self.value_bytes(&header, width, len)?;
        let value = std::str::from_utf8(bytes).map_err(|_| Error::InvalidUtf8)?;
        self.pos += header.len + width + len;
        Ok(value)
    }

    pub fn get_bytes(&mut self, tag: Tag) -> Result<&'a [u8]> {
        let header = self.expect(tag)?;
        if !header.element_type.is_byte_string() {
            return Err(Error::TypeMismatch {
                expected: "byte string",
                found: header.element_type,
            });
        }
        let width = header.element_type.value_width();
        let len = self.string_len(&header)?;
        let value = self.value_bytes(&header, width, len)?;
        self.pos += header.len + width + len;
        Ok(value)
    }

    pub fn get_null(&mut self, tag: Tag) -> Result<()> {
        let header = self.expect(tag)?;
        if header.element_type != ElementType::Null {
            return Err(Error::TypeMismatch {
                expected: "null",
                found: header.element_type,
            });
        }
        self.pos += header.len;
        Ok(())
    }

    /// Reads any value implementing [`TlvDecode`] under `tag`.
    pub fn get<T: TlvDecode<'a>>(&mut self, tag: Tag) -> Result<T> {
        T::decode(tag, self)
    }
}

/// A value that can be read from a single TLV element.
pub trait TlvDecode<'a>: Sized {
    fn decode(tag: Tag, reader: &mut TlvReader<'a>) -> Result<Self>;
}

macro_rules! impl_decode {
    ($ty:ty, $get:ident) => {
        impl<'a> TlvDecode<'a> for $ty {
            fn decode(tag: Tag, reader: &mut TlvReader<'a>) -> Result<Self> {
                reader.$get(tag)
            }
        }
    };
}

impl_decode!(u8, get_u8);
impl_decode!(u16, get_u16);
impl_decode!(u32, get_u32);
impl_decode!(u64, get_u64);
impl_decode!(i8, get_i8);
impl_decode!(i16, get_i16);
impl_decode!(i32, get_i32);
impl_decode!(i64, get_i64);
impl_decode!(bool, get_bool);
impl_decode!(f32, get_f32);
impl_decode!(f64, get_f64);

impl<'a> TlvDecode<'a> for &'a str {
    fn decode(tag: Tag, reader: &mut TlvReader<'a>) -> Result<Self> {
        reader.get_string(tag)
    }
}

impl<'a> TlvDecode<'a> for &'a [u8] {
    fn decode(tag: Tag, reader: &mut TlvReader<'a>) -> Result<Self> {
        reader.get_bytes(tag)
    }
}

impl<'a> TlvDecode<'a> for String {
    fn decode(tag: Tag, reader: &mut TlvReader<'a>) -> Result<Self> {
        reader.get_string(tag).map(str::to_string)
    }
}

/// A null element decodes as `None`.
impl<'a, T: TlvDecode<'a>> TlvDecode<'a> for Option<T> {
    fn decode(tag: Tag, reader: &mut TlvReader<'a>) -> Result<Self> {
        if reader.is_null()? {
            reader.get_null(tag)?;
            Ok(None)
        } else {
            T::decode(tag, reader).map(Some)
        }
    }
}
