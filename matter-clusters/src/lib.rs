//! Record types exchanged by Matter clusters, each bound to a static TLV
//! schema.

pub mod energy_evse;
pub mod groups;
pub mod occupancy_sensing;

#[cfg(test)]
mod test {
    use matter_tlv::TlvStruct;

    use crate::energy_evse::{ChargingTargetScheduleStruct, ChargingTargetStruct};
    use crate::groups::GetGroupMembershipResponse;
    use crate::occupancy_sensing::PredictedOccupancyStruct;

    #[test]
    fn schema_tags_ascend() {
        for schema in [
            PredictedOccupancyStruct::SCHEMA,
            ChargingTargetStruct::SCHEMA,
            ChargingTargetScheduleStruct::SCHEMA,
            GetGroupMembershipResponse::SCHEMA,
        ] {
            assert!(schema.has_ascending_tags(), "{}", schema.name);
        }
    }
}
