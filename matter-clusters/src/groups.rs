use std::fmt::{self, Display, Formatter};

use matter_tlv::{
    FieldDescriptor, FieldSet, FieldType, Result, StructDisplay, StructSchema, TlvStruct,
};

pub const TAG_CAPACITY: u8 = 0;
pub const TAG_GROUP_LIST: u8 = 1;

const GET_GROUP_MEMBERSHIP_RESPONSE_SCHEMA: StructSchema = StructSchema {
    name: "GroupsClusterGetGroupMembershipResponse",
    fields: &[
        FieldDescriptor::new("capacity", TAG_CAPACITY, FieldType::UByte).nullable(),
        FieldDescriptor::new(
            "groupList",
            TAG_GROUP_LIST,
            FieldType::Array(&FieldType::UShort),
        ),
    ],
};

/// Reply to a GetGroupMembership command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GetGroupMembershipResponse {
    /// Remaining group table slots; `None` when the device cannot tell.
    pub capacity: Option<u8>,
    pub group_list: Vec<u16>,
}

impl TlvStruct for GetGroupMembershipResponse {
    const SCHEMA: &'static StructSchema = &GET_GROUP_MEMBERSHIP_RESPONSE_SCHEMA;

    fn to_fields(&self) -> FieldSet {
        FieldSet::new(Self::SCHEMA)
            .with_nullable(TAG_CAPACITY, self.capacity)
            .with(TAG_GROUP_LIST, self.group_list.clone())
    }

    fn from_fields(mut fields: FieldSet) -> Result<Self> {
        Ok(Self {
            capacity: fields.take_nullable(TAG_CAPACITY)?,
            group_list: fields.take(TAG_GROUP_LIST)?,
        })
    }
}

impl Display for GetGroupMembershipResponse {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        StructDisplay::new(&self.to_fields()).fmt(f)
    }
}
