//! Static field tables and the single engine that encodes and decodes them.
//!
//! A record type declares its fields once as a [`StructSchema`]. Encoding
//! checks every value against its descriptor before a single byte is written,
//! then emits the fields in declaration order. Decoding reads them back in the
//! same order; any disagreement between stream and schema is an error.

use crate::reader::TlvReader;
use crate::value::TlvValue;
use crate::writer::TlvWriter;
use crate::{Error, Result, Tag};

/// Semantic type of a field; decides the wire width and the accepted range.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FieldType {
    Bool,
    UByte,
    UShort,
    UInt,
    ULong,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    String,
    Bytes,
    Struct(&'static StructSchema),
    Array(&'static FieldType),
}

impl FieldType {
    pub fn name(&self) -> &'static str {
        match self {
            FieldType::Bool => "Bool",
            FieldType::UByte => "UByte",
            FieldType::UShort => "UShort",
            FieldType::UInt => "UInt",
            FieldType::ULong => "ULong",
            FieldType::Byte => "Byte",
            FieldType::Short => "Short",
            FieldType::Int => "Int",
            FieldType::Long => "Long",
            FieldType::Float => "Float",
            FieldType::Double => "Double",
            FieldType::String => "String",
            FieldType::Bytes => "Bytes",
            FieldType::Struct(schema) => schema.name,
            FieldType::Array(_) => "Array",
        }
    }

    fn mismatch(&self, value: &TlvValue) -> Error {
        Error::TypeMismatch {
            expected: self.name(),
            found: value.element_type(),
        }
    }

    fn check(&self, value: &TlvValue) -> Result<()> {
        match (self, value) {
            (FieldType::UByte, TlvValue::UInt(v)) => check_unsigned(*v, u8::MAX as u64, "UByte"),
            (FieldType::UShort, TlvValue::UInt(v)) => {
                check_unsigned(*v, u16::MAX as u64, "UShort")
            }
            (FieldType::UInt, TlvValue::UInt(v)) => check_unsigned(*v, u32::MAX as u64, "UInt"),
            (FieldType::ULong, TlvValue::UInt(_)) => Ok(()),
            (FieldType::Byte, TlvValue::Int(v)) => {
                check_signed(*v, i8::MIN as i64, i8::MAX as i64, "Byte")
            }
            (FieldType::Short, TlvValue::Int(v)) => {
                check_signed(*v, i16::MIN as i64, i16::MAX as i64, "Short")
            }
            (FieldType::Int, TlvValue::Int(v)) => {
                check_signed(*v, i32::MIN as i64, i32::MAX as i64, "Int")
            }
            (FieldType::Long, TlvValue::Int(_))
            | (FieldType::Bool, TlvValue::Bool(_))
            | (FieldType::Float, TlvValue::Float(_))
            | (FieldType::Double, TlvValue::Double(_))
            | (FieldType::String, TlvValue::String(_))
            | (FieldType::Bytes, TlvValue::Bytes(_)) => Ok(()),
            (FieldType::Struct(schema), TlvValue::Structure(entries)) => {
                schema.validate_entries(entries)
            }
            (FieldType::Array(element), TlvValue::Array(items)) => {
                items.iter().try_for_each(|item| element.check(item))
            }
            _ => Err(self.mismatch(value)),
        }
    }

    fn write(&self, tag: Tag, value: &TlvValue, writer: &mut TlvWriter) -> Result<()> {
        match (self, value) {
            (_, TlvValue::Null) => writer.put_null(tag),
            (FieldType::Bool, TlvValue::Bool(v)) => writer.put_bool(tag, *v),
            (FieldType::UByte, TlvValue::UInt(v)) => writer.put_u8(tag, *v as u8),
            (FieldType::UShort, TlvValue::UInt(v)) => writer.put_u16(tag, *v as u16),
            (FieldType::UInt, TlvValue::UInt(v)) => writer.put_u32(tag, *v as u32),
            (FieldType::ULong, TlvValue::UInt(v)) => writer.put_u64(tag, *v),
            (FieldType::Byte, TlvValue::Int(v)) => writer.put_i8(tag, *v as i8),
            (FieldType::Short, TlvValue::Int(v)) => writer.put_i16(tag, *v as i16),
            (FieldType::Int, TlvValue::Int(v)) => writer.put_i32(tag, *v as i32),
            (FieldType::Long, TlvValue::Int(v)) => writer.put_i64(tag, *v),
            (FieldType::Float, TlvValue::Float(v)) => writer.put_f32(tag, *v),
            (FieldType::Double, TlvValue::Double(v)) => writer.put_f64(tag, *v),
            (FieldType::String, TlvValue::String(v)) => writer.put_string(tag, v),
            (FieldType::Bytes, TlvValue::Bytes(v)) => writer.put_bytes(tag, v),
            (FieldType::Struct(schema), TlvValue::Structure(entries)) => {
                schema.write_entries(entries, tag, writer)
            }
            (FieldType::Array(element), TlvValue::Array(items)) => {
                writer.start_array(tag)?;
                for item in items {
                    element.write(Tag::Anonymous, item, writer)?;
                }
                writer.end_array()
            }
            _ => Err(self.mismatch(value)),
        }
    }

    fn read(&self, tag: Tag, reader: &mut TlvReader<'_>) -> Result<TlvValue> {
        let value = match self {
            FieldType::Bool => TlvValue::Bool(reader.get_bool(tag)?),
            FieldType::UByte => TlvValue::UInt(reader.get_u8(tag)? as u64),
            FieldType::UShort => TlvValue::UInt(reader.get_u16(tag)? as u64),
            FieldType::UInt => TlvValue::UInt(reader.get_u32(tag)? as u64),
            FieldType::ULong => TlvValue::UInt(reader.get_u64(tag)?),
            FieldType::Byte => TlvValue::Int(reader.get_i8(tag)? as i64),
            FieldType::Short => TlvValue::Int(reader.get_i16(tag)? as i64),
            FieldType::Int => TlvValue::Int(reader.get_i32(tag)? as i64),
            FieldType::Long => TlvValue::Int(reader.get_i64(tag)?),
            FieldType::Float => TlvValue::Float(reader.get_f32(tag)?),
            FieldType::Double => TlvValue::Double(reader.get_f64(tag)?),
            FieldType::String => TlvValue::String(reader.get_string(tag)?.to_string()),
            FieldType::Bytes => TlvValue::Bytes(reader.get_bytes(tag)?.into()),
            FieldType::Struct(schema) => TlvValue::Structure(schema.read_entries(tag, reader)?),
            FieldType::Array(element) => {
                reader.enter_array(tag)?;
                let mut items = Vec::new();
                while reader.peek_tag()?.is_some() {
                    items.push(element.read(Tag::Anonymous, reader)?);
                }
                reader.exit_container()?;
                TlvValue::Array(items)
            }
        };
        Ok(value)
    }
}

fn check_unsigned(value: u64, max: u64, target: &'static str) -> Result<()> {
    if value > max {
        return Err(Error::OutOfRange {
            value: value as i128,
            target,
        });
    }
    Ok(())
}

fn check_signed(value: i64, min: i64, max: i64, target: &'static str) -> Result<()> {
    if value < min || value > max {
        return Err(Error::OutOfRange {
            value: value as i128,
            target,
        });
    }
    Ok(())
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    /// Context tag, unique within the schema.
    pub tag: u8,
    pub field_type: FieldType,
    /// May be absent from the structure.
    pub optional: bool,
    /// May be present as a null element.
    pub nullable: bool,
}

impl FieldDescriptor {
    pub const fn new(name: &'static str, tag: u8, field_type: FieldType) -> Self {
        Self {
            name,
            tag,
            field_type,
            optional: false,
            nullable: false,
        }
    }

    pub const fn optional(self) -> Self {
        Self {
            optional: true,
            ..self
        }
    }

    pub const fn nullable(self) -> Self {
        Self {
            nullable: true,
            ..self
        }
    }
}

/// Ordered field table of one record type.
#[derive(Debug, PartialEq)]
pub struct StructSchema {
    pub name: &'static str,
    /// Fields in ascending tag order.
    pub fields: &'static [FieldDescriptor],
}

fn lookup(entries: &[(Tag, TlvValue)], tag: u8) -> Option<&TlvValue> {
    entries
        .iter()
        .find(|(entry_tag, _)| *entry_tag == Tag::Context(tag))
        .map(|(_, value)| value)
}

impl StructSchema {
    /// Whether field tags are unique and strictly ascending. Usable in a
    /// `const` assertion next to the table.
    pub const fn has_ascending_tags(&self) -> bool {
        let mut i = 1;
        while i < self.fields.len() {
            if self.fields[i].tag <= self.fields[i - 1].tag {
                return false;
            }
            i += 1;
        }
        true
    }

    pub fn field(&self, tag: u8) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|field| field.tag == tag)
    }

    /// Checks `fields` against this schema without writing anything.
    pub fn validate(&self, fields: &FieldSet) -> Result<()> {
        self.validate_entries(&fields.entries)
    }

    fn validate_entries(&self, entries: &[(Tag, TlvValue)]) -> Result<()> {
        for (tag, _) in entries {
            match tag {
                Tag::Context(num) if self.field(*num).is_some() => {}
                Tag::Context(num) => {
                    return Err(Error::UnknownField {
                        schema: self.name,
                        tag: *num,
                    });
                }
                _ => {
                    return Err(Error::InvalidTag {
                        tag: *tag,
                        context: "as a structure field",
                    });
                }
            }
        }

        for field in self.fields {
            match lookup(entries, field.tag) {
                None if field.optional => {}
                None => {
                    return Err(Error::MissingField {
                        schema: self.name,
                        field: field.name,
                    });
                }
                Some(TlvValue::Null) if field.nullable => {}
                Some(value) => field.field_type.check(value)?,
            }
        }
        Ok(())
    }

    /// Writes `fields` as a structure tagged `tag`.
    ///
    /// Every value is validated first, so a range or type error leaves the
    /// writer untouched.
    pub fn encode(&self, fields: &FieldSet, tag: Tag, writer: &mut TlvWriter) -> Result<()> {
        self.validate(fields)?;
        self.write_entries(&fields.entries, tag, writer)
    }

    fn write_entries(
        &self,
        entries: &[(Tag, TlvValue)],
        tag: Tag,
        writer: &mut TlvWriter,
    ) -> Result<()> {
        writer.start_structure(tag)?;
        for field in self.fields {
            if let Some(value) = lookup(entries, field.tag) {
                field
                    .field_type
                    .write(Tag::Context(field.tag), value, writer)?;
            }
        }
        writer.end_structure()
    }

    /// Reads a structure tagged `tag`, fields in declaration order.
    pub fn decode(&'static self, tag: Tag, reader: &mut TlvReader<'_>) -> Result<FieldSet> {
        match self.read_entries(tag, reader) {
            Ok(entries) => Ok(FieldSet {
                schema: self,
                entries,
            }),
            Err(err) => {
                log::debug!("failed to decode {}: {}", self.name, err);
                Err(err)
            }
        }
    }

    fn read_entries(&self, tag: Tag, reader: &mut TlvReader<'_>) -> Result<Vec<(Tag, TlvValue)>> {
        reader.enter_structure(tag)?;
        let mut entries = Vec::with_capacity(self.fields.len());
        // Absent optional fields, each with the tag found in its place
        let mut passed: Vec<(Tag, Tag)> = Vec::new();
        for field in self.fields {
            let field_tag = Tag::Context(field.tag);
            let next = Self::next_in_order(&passed, reader)?;
            if field.optional && next != Some(field_tag) {
                match next {
                    Some(Tag::Context(num)) if num < field.tag => {
                        return Err(Error::TagMismatch {
                            expected: field_tag,
                            found: Tag::Context(num),
                        });
                    }
                    Some(found) => passed.push((field_tag, found)),
                    None => {}
                }
                continue;
            }
            let value = if field.nullable && reader.is_null()? {
                reader.get_null(field_tag)?;
                TlvValue::Null
            } else {
                field.field_type.read(field_tag, reader)?
            };
            entries.push((field_tag, value));
        }
        Self::next_in_order(&passed, reader)?;
        reader.exit_container()?;
        Ok(entries)
    }

    /// Peeks the next tag. An optional field showing up after it was taken as
    /// absent is reported against the element that stood in its place.
    fn next_in_order(passed: &[(Tag, Tag)], reader: &TlvReader<'_>) -> Result<Option<Tag>> {
        let next = reader.peek_tag()?;
        if let Some((expected, found)) = passed.iter().find(|(field_tag, _)| Some(*field_tag) == next)
        {
            return Err(Error::TagMismatch {
                expected: *expected,
                found: *found,
            });
        }
        Ok(next)
    }
}

/// Field values of one record, keyed by context tag.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldSet {
    schema: &'static StructSchema,
    entries: Vec<(Tag, TlvValue)>,
}

impl FieldSet {
    pub fn new(schema: &'static StructSchema) -> Self {
        debug_assert!(
            schema.has_ascending_tags(),
            "field tags of {} must be unique and ascending",
            schema.name
        );
        Self {
            schema,
            entries: Vec::with_capacity(schema.fields.len()),
        }
    }

    /// Wraps the entries of a decoded structure value.
    pub fn from_value(schema: &'static StructSchema, value: TlvValue) -> Result<Self> {
        match value {
            TlvValue::Structure(entries) => Ok(Self { schema, entries }),
            other => Err(Error::TypeMismatch {
                expected: schema.name,
                found: other.element_type(),
            }),
        }
    }

    pub fn schema(&self) -> &'static StructSchema {
        self.schema
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sets the field tagged `tag`, replacing a previous value.
    pub fn put(&mut self, tag: u8, value: impl Into<TlvValue>) {
        let value = value.into();
        match self
            .entries
            .iter_mut()
            .find(|(entry_tag, _)| *entry_tag == Tag::Context(tag))
        {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((Tag::Context(tag), value)),
        }
    }

    pub fn with(mut self, tag: u8, value: impl Into<TlvValue>) -> Self {
        self.put(tag, value);
        self
    }

    /// Sets the field only when `value` is present.
    pub fn with_optional<T: Into<TlvValue>>(self, tag: u8, value: Option<T>) -> Self {
        match value {
            Some(value) => self.with(tag, value),
            None => self,
        }
    }

    /// Sets the field, writing `None` as null.
    pub fn with_nullable<T: Into<TlvValue>>(self, tag: u8, value: Option<T>) -> Self {
        match value {
            Some(value) => self.with(tag, value),
            None => self.with(tag, TlvValue::Null),
        }
    }

    pub fn get(&self, tag: u8) -> Option<&TlvValue> {
        lookup(&self.entries, tag)
    }

    pub fn into_value(self) -> TlvValue {
        TlvValue::Structure(self.entries)
    }

    fn remove(&mut self, tag: u8) -> Option<TlvValue> {
        let index = self
            .entries
            .iter()
            .position(|(entry_tag, _)| *entry_tag == Tag::Context(tag))?;
        Some(self.entries.remove(index).1)
    }

    fn take_value(&mut self, tag: u8) -> Result<TlvValue> {
        self.remove(tag).ok_or_else(|| Error::MissingField {
            schema: self.schema.name,
            field: self
                .schema
                .field(tag)
                .map(|field| field.name)
                .unwrap_or("<undeclared>"),
        })
    }

    pub fn take<T: FromValue>(&mut self, tag: u8) -> Result<T> {
        T::from_value(self.take_value(tag)?)
    }

    /// `None` when the field is absent.
    pub fn take_optional<T: FromValue>(&mut self, tag: u8) -> Result<Option<T>> {
        self.remove(tag).map(T::from_value).transpose()
    }

    /// `None` when the field is null. The field itself must be present.
    pub fn take_nullable<T: FromValue>(&mut self, tag: u8) -> Result<Option<T>> {
        match self.take_value(tag)? {
            TlvValue::Null => Ok(None),
            value => T::from_value(value).map(Some),
        }
    }

    pub fn take_struct<T: TlvStruct>(&mut self, tag: u8) -> Result<T> {
        let value = self.take_value(tag)?;
        T::from_fields(FieldSet::from_value(T::SCHEMA, value)?)
    }

    pub fn take_struct_list<T: TlvStruct>(&mut self, tag: u8) -> Result<Vec<T>> {
        match self.take_value(tag)? {
            TlvValue::Array(items) => items
                .into_iter()
                .map(|item| T::from_fields(FieldSet::from_value(T::SCHEMA, item)?))
                .collect(),
            other => Err(Error::TypeMismatch {
                expected: "Array",
                found: other.element_type(),
            }),
        }
    }
}

impl From<FieldSet> for TlvValue {
    fn from(value: FieldSet) -> Self {
        value.into_value()
    }
}

/// Conversion out of a decoded [`TlvValue`].
pub trait FromValue: Sized {
    fn from_value(value: TlvValue) -> Result<Self>;
}

macro_rules! impl_from_value {
    ($variant:ident, $name:literal, $($ty:ty),+) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: TlvValue) -> Result<Self> {
                    match value {
                        TlvValue::$variant(v) => <$ty>::try_from(v).map_err(|_| Error::OutOfRange {
                            value: v as i128,
                            target: stringify!($ty),
                        }),
                        other => Err(Error::TypeMismatch {
                            expected: $name,
                            found: other.element_type(),
                        }),
                    }
                }
            }
        )+
    };
}

impl_from_value!(UInt, "unsigned integer", u8, u16, u32, u64);
impl_from_value!(Int, "signed integer", i8, i16, i32, i64);

impl FromValue for bool {
    fn from_value(value: TlvValue) -> Result<Self> {
        match value {
            TlvValue::Bool(v) => Ok(v),
            other => Err(Error::TypeMismatch {
                expected: "boolean",
                found: other.element_type(),
            }),
        }
    }
}

impl FromValue for f32 {
    fn from_value(value: TlvValue) -> Result<Self> {
        match value {
            TlvValue::Float(v) => Ok(v),
            other => Err(Error::TypeMismatch {
                expected: "float32",
                found: other.element_type(),
            }),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: TlvValue) -> Result<Self> {
        match value {
            TlvValue::Double(v) => Ok(v),
            TlvValue::Float(v) => Ok(v as f64),
            other => Err(Error::TypeMismatch {
                expected: "float64",
                found: other.element_type(),
            }),
        }
    }
}

impl FromValue for String {
    fn from_value(value: TlvValue) -> Result<Self> {
        match value {
            TlvValue::String(v) => Ok(v),
            other => Err(Error::TypeMismatch {
                expected: "utf8 string",
                found: other.element_type(),
            }),
        }
    }
}

impl FromValue for Box<[u8]> {
    fn from_value(value: TlvValue) -> Result<Self> {
        match value {
            TlvValue::Bytes(v) => Ok(v),
            other => Err(Error::TypeMismatch {
                expected: "byte string",
                found: other.element_type(),
            }),
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: TlvValue) -> Result<Self> {
        match value {
            TlvValue::Array(items) => items.into_iter().map(T::from_value).collect(),
            other => Err(Error::TypeMismatch {
                expected: "Array",
                found: other.element_type(),
            }),
        }
    }
}

impl FromValue for TlvValue {
    fn from_value(value: TlvValue) -> Result<Self> {
        Ok(value)
    }
}

/// A record type bound to a static field table.
///
/// Implementors only convert to and from a [`FieldSet`]; wire handling lives
/// in [`StructSchema`].
pub trait TlvStruct: Sized {
    const SCHEMA: &'static StructSchema;

    fn to_fields(&self) -> FieldSet;

    fn from_fields(fields: FieldSet) -> Result<Self>;

    fn to_tlv(&self, tag: Tag, writer: &mut TlvWriter) -> Result<()> {
        Self::SCHEMA.encode(&self.to_fields(), tag, writer)
    }

    fn from_tlv(tag: Tag, reader: &mut TlvReader<'_>) -> Result<Self> {
        Self::from_fields(Self::SCHEMA.decode(tag, reader)?)
    }
}
