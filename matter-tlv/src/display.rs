use std::fmt::{self, Display, Formatter, Write};

use crate::Tag;
use crate::schema::{FieldSet, FieldType, StructSchema};
use crate::value::TlvValue;

/// Human readable rendering of a record, one field per line:
///
/// ```text
/// Name {
/// 	field : value
/// }
/// ```
///
/// Fields follow declaration order. An absent optional field prints as
/// `None`.
pub struct StructDisplay<'a> {
    fields: &'a FieldSet,
}

impl<'a> StructDisplay<'a> {
    pub fn new(fields: &'a FieldSet) -> Self {
        Self { fields }
    }
}

impl Display for StructDisplay<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write_struct(f, self.fields.schema(), |tag| self.fields.get(tag), 0)?;
        f.write_char('\n')
    }
}

fn write_struct<'v, W: Write>(
    out: &mut W,
    schema: &StructSchema,
    lookup: impl Fn(u8) -> Option<&'v TlvValue>,
    indent: usize,
) -> fmt::Result {
    writeln!(out, "{} {{", schema.name)?;
    for field in schema.fields {
        write_indent(out, indent + 1)?;
        write!(out, "{} : ", field.name)?;
        match lookup(field.tag) {
            Some(value) => write_field(out, &field.field_type, value, indent + 1)?,
            None => out.write_str("None")?,
        }
        out.write_char('\n')?;
    }
    write_indent(out, indent)?;
    out.write_char('}')
}

fn write_indent<W: Write>(out: &mut W, indent: usize) -> fmt::Result {
    for _ in 0..indent {
        out.write_char('\t')?;
    }
    Ok(())
}

/// Nested records keep their field names; everything else falls back to the
/// plain value rendering.
fn write_field<W: Write>(
    out: &mut W,
    field_type: &FieldType,
    value: &TlvValue,
    indent: usize,
) -> fmt::Result {
    match (field_type, value) {
        (FieldType::Struct(schema), TlvValue::Structure(entries)) => write_struct(
            out,
            schema,
            |tag| {
                entries
                    .iter()
                    .find(|(entry_tag, _)| *entry_tag == Tag::Context(tag))
                    .map(|(_, entry)| entry)
            },
            indent,
        ),
        (FieldType::Array(element), TlvValue::Array(items)) => {
            out.write_char('[')?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.write_str(", ")?;
                }
                write_field(out, element, item, indent)?;
            }
            out.write_char(']')
        }
        _ => write_value(out, value, indent),
    }
}

fn write_value<W: Write>(out: &mut W, value: &TlvValue, indent: usize) -> fmt::Result {
    match value {
        TlvValue::Int(v) => write!(out, "{v}"),
        TlvValue::UInt(v) => write!(out, "{v}"),
        TlvValue::Bool(v) => write!(out, "{v}"),
        TlvValue::Float(v) => write!(out, "{v}"),
        TlvValue::Double(v) => write!(out, "{v}"),
        TlvValue::String(v) => out.write_str(v),
        TlvValue::Bytes(v) => {
            for byte in v.iter() {
                write!(out, "{byte:02x}")?;
            }
            Ok(())
        }
        TlvValue::Null => out.write_str("null"),
        TlvValue::Array(items) => {
            out.write_char('[')?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.write_str(", ")?;
                }
                write_value(out, item, indent)?;
            }
            out.write_char(']')
        }
        TlvValue::Structure(entries) | TlvValue::List(entries) => {
            out.write_str("{\n")?;
            for (tag, entry) in entries {
                write_indent(out, indent + 1)?;
                write!(out, "{tag} : ")?;
                write_value(out, entry, indent + 1)?;
                out.write_char('\n')?;
            }
            write_indent(out, indent)?;
            out.write_char('}')
        }
    }
}

#[cfg(test)]
mod test {
    use crate::{FieldDescriptor, FieldSet, FieldType, StructDisplay, StructSchema, TlvValue};

    const LAMP_SCHEMA: StructSchema = StructSchema {
        name: "Lamp",
        fields: &[
            FieldDescriptor::new("level", 0, FieldType::UByte),
            FieldDescriptor::new("name", 1, FieldType::String).optional(),
            FieldDescriptor::new("scene", 2, FieldType::UShort).nullable(),
            FieldDescriptor::new("key", 3, FieldType::Bytes),
        ],
    };

    #[test]
    fn renders_fields_in_declaration_order() {
        let fields = FieldSet::new(&LAMP_SCHEMA)
            .with(3, &[0xABu8, 0x01][..])
            .with(0, 200u8)
            .with_nullable(2, None::<u16>);

        assert_eq!(
            StructDisplay::new(&fields).to_string(),
            "Lamp {\n\tlevel : 200\n\tname : None\n\tscene : null\n\tkey : ab01\n}\n"
        );
    }

    #[test]
    fn renders_arrays() {
        const LIST_SCHEMA: StructSchema = StructSchema {
            name: "Groups",
            fields: &[FieldDescriptor::new("ids", 0, FieldType::Array(&FieldType::UShort))],
        };
        let fields = FieldSet::new(&LIST_SCHEMA).with(0, TlvValue::from(vec![1u16, 2]));
        assert_eq!(
            StructDisplay::new(&fields).to_string(),
            "Groups {\n\tids : [1, 2]\n}\n"
        );
    }

    #[test]
    fn renders_nested_records_with_field_names() {
        const OUTER_SCHEMA: StructSchema = StructSchema {
            name: "Room",
            fields: &[
                FieldDescriptor::new("lamps", 0, FieldType::Array(&FieldType::Struct(&LAMP_SCHEMA))),
            ],
        };
        let lamp = FieldSet::new(&LAMP_SCHEMA)
            .with(0, 1u8)
            .with(1, "desk")
            .with(2, 4u16)
            .with(3, &[0u8; 0][..]);
        let fields = FieldSet::new(&OUTER_SCHEMA).with(0, TlvValue::Array(vec![lamp.into()]));

        assert_eq!(
            StructDisplay::new(&fields).to_string(),
            "Room {\n\tlamps : [Lamp {\n\t\tlevel : 1\n\t\tname : desk\n\t\tscene : 4\n\t\tkey : \n\t}]\n}\n"
        );
    }
}
