use bytes::{BufMut, Bytes, BytesMut};
use matter_config::WriterConfig;

use crate::element::{ContainerType, ElementType};
use crate::{Error, Result, Tag};

/// Linearizes tagged values into a TLV byte stream.
///
/// The writer owns its buffer until [`TlvWriter::finish`] hands it out. Open
/// containers are tracked on a stack so every `start_*` must be matched by the
/// corresponding `end_*` before finishing.
#[derive(Debug)]
pub struct TlvWriter {
    buf: BytesMut,
    containers: Vec<ContainerType>,
    max_depth: usize,
}

impl Default for TlvWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl TlvWriter {
    pub fn new() -> Self {
        Self::with_config(&WriterConfig::default())
    }

    pub fn with_config(config: &WriterConfig) -> Self {
        Self {
            buf: BytesMut::new(),
            containers: Vec::new(),
            max_depth: config.max_depth,
        }
    }

    /// Number of currently open containers.
    pub fn depth(&self) -> usize {
        self.containers.len()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Hands out the encoded bytes. Fails if a container is still open.
    pub fn finish(self) -> Result<Bytes> {
        if !self.containers.is_empty() {
            return Err(Error::UnclosedContainers(self.containers.len()));
        }
        Ok(self.buf.freeze())
    }

    fn check_tag(&self, tag: Tag) -> Result<()> {
        match self.containers.last() {
            None if tag.is_context() => Err(Error::InvalidTag {
                tag,
                context: "at the top level",
            }),
            Some(ContainerType::Structure) if tag.is_anonymous() => Err(Error::InvalidTag {
                tag,
                context: "inside a structure",
            }),
            Some(ContainerType::Array) if !tag.is_anonymous() => Err(Error::InvalidTag {
                tag,
                context: "inside an array",
            }),
            _ => Ok(()),
        }
    }

    fn write_header(&mut self, tag: Tag, element_type: ElementType) -> Result<()> {
        self.check_tag(tag)?;
        self.buf.put_u8(tag.control_bits() | element_type.id());
        tag.write_to(&mut self.buf);
        Ok(())
    }

    fn put_length(&mut self, element_type: ElementType, len: usize) {
        match element_type.value_width() {
            1 => self.buf.put_u8(len as u8),
            2 => self.buf.put_u16_le(len as u16),
            4 => self.buf.put_u32_le(len as u32),
            _ => self.buf.put_u64_le(len as u64),
        }
    }

    fn start_container(&mut self, tag: Tag, container: ContainerType) -> Result<()> {
        if self.containers.len() >= self.max_depth {
            return Err(Error::DepthExceeded(self.max_depth));
        }
        self.write_header(tag, container.element_type())?;
        self.containers.push(container);
        log::trace!(
            "started {} tagged {} at depth {}",
            container,
            tag,
            self.containers.len()
        );
        Ok(())
    }

    pub fn start_structure(&mut self, tag: Tag) -> Result<()> {
        self.start_container(tag, ContainerType::Structure)
    }

    pub fn start_array(&mut self, tag: Tag) -> Result<()> {
        self.start_container(tag, ContainerType::Array)
    }

    pub fn start_list(&mut self, tag: Tag) -> Result<()> {
        self.start_container(tag, ContainerType::List)
    }

    /// Closes the innermost open container, whatever its kind.
    pub fn end_container(&mut self) -> Result<ContainerType> {
        let container = self.containers.pop().ok_or(Error::StructureImbalance)?;
        self.buf.put_u8(ElementType::EndOfContainer.id());
        log::trace!("ended {} at depth {}", container, self.containers.len());
        Ok(container)
    }

    fn end_expected(&mut self, expected: ContainerType) -> Result<()> {
        match self.containers.last() {
            None => Err(Error::StructureImbalance),
            Some(found) if *found != expected => Err(Error::ContainerMismatch {
                expected,
                found: *found,
            }),
            Some(_) => self.end_container().map(|_| ()),
        }
    }

    pub fn end_structure(&mut self) -> Result<()> {
        self.end_expected(ContainerType::Structure)
    }

    pub fn end_array(&mut self) -> Result<()> {
        self.end_expected(ContainerType::Array)
    }

    pub fn end_list(&mut self) -> Result<()> {
        self.end_expected(ContainerType::List)
    }

    /// Writes any value implementing [`TlvEncode`] under `tag`.
    pub fn put<T: TlvEncode>(&mut self, tag: Tag, value: T) -> Result<()> {
        value.encode(tag, self)
    }

    pub fn put_u8(&mut self, tag: Tag, value: u8) -> Result<()> {
        self.write_header(tag, ElementType::UInt8)?;
        self.buf.put_u8(value);
        Ok(())
    }

    pub fn put_u16(&mut self, tag: Tag, value: u16) -> Result<()> {
        self.write_header(tag, ElementType::UInt16)?;
        self.buf.put_u16_le(value);
        Ok(())
    }

    pub fn put_u32(&mut self, tag: Tag, value: u32) -> Result<()> {
        self.write_header(tag, ElementType::UInt32)?;
        self.buf.put_u32_le(value);
        Ok(())
    }

    pub fn put_u64(&mut self, tag: Tag, value: u64) -> Result<()> {
        self.write_header(tag, ElementType::UInt64)?;
        self.buf.put_u64_le(value);
        Ok(())
    }

    pub fn put_i8(&mut self, tag: Tag, value: i8) -> Result<()> {
        self.write_header(tag, ElementType::Int8)?;
        self.buf.put_i8(value);
        Ok(())
    }

    pub fn put_i16(&mut self, tag: Tag, value: i16) -> Result<()> {
        self.write_header(tag, ElementType::Int16)?;
        self.buf.put_i16_le(value);
        Ok(())
    }

    pub fn put_i32(&mut self, tag: Tag, value: i32) -> Result<()> {
        self.write_header(tag, ElementType::Int32)?;
        self.buf.put_i32_le(value);
        Ok(())
    }

    pub fn put_i64(&mut self, tag: Tag, value: i64) -> Result<()> {
        self.write_header(tag, ElementType::Int64)?;
        self.buf.put_i64_le(value);
        Ok(())
    }

    /// Writes an unsigned integer using the smallest width that holds it.
    pub fn put_unsigned(&mut self, tag: Tag, value: u64) -> Result<()> {
        let element_type = ElementType::unsigned_for(value);
        self.write_header(tag, element_type)?;
        self.buf.put_uint_le(value, element_type.value_width());
        Ok(())
    }

    /// Writes a signed integer using the smallest width that holds it.
    pub fn put_signed(&mut self, tag: Tag, value: i64) -> Result<()> {
        let element_type = ElementType::signed_for(value);
        self.write_header(tag, element_type)?;
        self.buf.put_int_le(value, element_type.value_width());
        Ok(())
    }

    pub fn put_bool(&mut self, tag: Tag, value: bool) -> Result<()> {
        let element_type = if value {
            ElementType::True
        } else {
            ElementType::False
        };
        self.write_header(tag, element_type)
    }

    pub fn put_f32(&mut self, tag: Tag, value: f32) -> Result<()> {
        self.write_header(tag, ElementType::Float32)?;
        self.buf.put_f32_le(value);
        Ok(())
    }

    pub fn put_f64(&mut self, tag: Tag, value: f64) -> Result<()> {
        self.write_header(tag, ElementType::Float64)?;
        self.buf.put_f64_le(value);
        Ok(())
    }

    pub fn put_string(&mut self, tag: Tag, value: &str) -> Result<()> {
        let element_type = ElementType::utf8_string_for(value.len());
        self.write_header(tag, element_type)?;
        self.put_length(element_type, value.len());
        self.buf.put_slice(value.as_bytes());
        Ok(())
    }

    pub fn put_bytes(&mut self, tag: Tag, value: &[u8]) -> Result<()> {
        let element_type = ElementType::byte_string_for(value.len());
        self.write_header(tag, element_type)?;
        self.put_length(element_type, value.len());
        self.buf.put_slice(value);
        Ok(())
    }

    pub fn put_null(&mut self, tag: Tag) -> Result<()> {
        self.write_header(tag, ElementType::Null)
    }
}

/// A value that knows how to write itself as a single TLV element.
pub trait TlvEncode {
    fn encode(&self, tag: Tag, writer: &mut TlvWriter) -> Result<()>;
}

macro_rules! impl_encode {
    ($ty:ty, $put:ident) => {
        impl TlvEncode for $ty {
            fn encode(&self, tag: Tag, writer: &mut TlvWriter) -> Result<()> {
                writer.$put(tag, *self)
            }
        }
    };
}

impl_encode!(u8, put_u8);
impl_encode!(u16, put_u16);
impl_encode!(u32, put_u32);
impl_encode!(u64, put_u64);
impl_encode!(i8, put_i8);
impl_encode!(i16, put_i16);
impl_encode!(i32, put_i32);
impl_encode!(i64, put_i64);
impl_encode!(bool, put_bool);
impl_encode!(f32, put_f32);
impl_encode!(f64, put_f64);

impl TlvEncode for str {
    fn encode(&self, tag: Tag, writer: &mut TlvWriter) -> Result<()> {
        writer.put_string(tag, self)
    }
}

impl TlvEncode for String {
    fn encode(&self, tag: Tag, writer: &mut TlvWriter) -> Result<()> {
        writer.put_string(tag, self)
    }
}

impl TlvEncode for [u8] {
    fn encode(&self, tag: Tag, writer: &mut TlvWriter) -> Result<()> {
        writer.put_bytes(tag, self)
    }
}

/// `None` is written as a null element.
impl<T: TlvEncode> TlvEncode for Option<T> {
    fn encode(&self, tag: Tag, writer: &mut TlvWriter) -> Result<()> {
        match self {
            Some(value) => value.encode(tag, writer),
            None => writer.put_null(tag),
        }
    }
}

impl<T: TlvEncode + ?Sized> TlvEncode for &T {
    fn encode(&self, tag: Tag, writer: &mut TlvWriter) -> Result<()> {
        (**self).encode(tag, writer)
    }
}
