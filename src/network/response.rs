//! `KafkaResponse` dispatches a raw decoded frame to the per-API parser
//! named by the `KafkaRequest` it answers, matching `client.rs`'s
//! match-and-unwrap call sites (`if let KafkaResponse::Produce
//! (res) = res { ... }`) expect a single response sum type.

use protocol::{api_versions, fetch, group, init_producer_id, list_offsets, metadata,
              offset_commit, produce, sasl, admin, ApiKeys};
use errors::Result;

#[derive(Debug)]
pub enum KafkaResponse {
    Metadata(metadata::MetadataResponse),
    Produce(produce::ProduceResponse),
    Fetch(fetch::FetchResponse),
    ListOffsets(list_offsets::ListOffsetsResponse),
    FindCoordinator(group::FindCoordinatorResponse),
    JoinGroup(group::JoinGroupResponse),
    SyncGroup(group::SyncGroupResponse),
    Heartbeat(group::HeartbeatResponse),
    LeaveGroup(group::LeaveGroupResponse),
    OffsetCommit(offset_commit::OffsetCommitResponse),
    OffsetFetch(offset_commit::OffsetFetchResponse),
    InitProducerId(init_producer_id::InitProducerIdResponse),
    SaslHandshake(sasl::SaslHandshakeResponse),
    SaslAuthenticate(sasl::SaslAuthenticateResponse),
    ApiVersions(api_versions::ApiVersionsResponse),
    Admin(Vec<u8>),
}

impl KafkaResponse {
    pub fn api_key(&self) -> ApiKeys {
        match *self {
            KafkaResponse::Metadata(_) => ApiKeys::Metadata,
            KafkaResponse::Produce(_) => ApiKeys::Produce,
            KafkaResponse::Fetch(_) => ApiKeys::Fetch,
            KafkaResponse::ListOffsets(_) => ApiKeys::ListOffsets,
            KafkaResponse::FindCoordinator(_) => ApiKeys::FindCoordinator,
            KafkaResponse::JoinGroup(_) => ApiKeys::JoinGroup,
            KafkaResponse::SyncGroup(_) => ApiKeys::SyncGroup,
            KafkaResponse::Heartbeat(_) => ApiKeys::Heartbeat,
            KafkaResponse::LeaveGroup(_) => ApiKeys::LeaveGroup,
            KafkaResponse::OffsetCommit(_) => ApiKeys::OffsetCommit,
            KafkaResponse::OffsetFetch(_) => ApiKeys::OffsetFetch,
            KafkaResponse::InitProducerId(_) => ApiKeys::InitProducerId,
            KafkaResponse::SaslHandshake(_) => ApiKeys::SaslHandshake,
            KafkaResponse::SaslAuthenticate(_) => ApiKeys::SaslAuthenticate,
            KafkaResponse::ApiVersions(_) => ApiKeys::ApiVersions,
            KafkaResponse::Admin(_) => ApiKeys::CreateTopics,
        }
    }

    pub fn parse(api_key: ApiKeys, data: &[u8]) -> Result<KafkaResponse> {
        Ok(match api_key {
            ApiKeys::Metadata => KafkaResponse::Metadata(metadata::parse_metadata_response(data)?),
            ApiKeys::Produce => KafkaResponse::Produce(produce::parse_produce_response(data, true)?),
            ApiKeys::Fetch => KafkaResponse::Fetch(fetch::parse_fetch_response(data)?),
            ApiKeys::ListOffsets => {
                KafkaResponse::ListOffsets(list_offsets::parse_list_offsets_response(data)?)
            }
            ApiKeys::FindCoordinator => {
                KafkaResponse::FindCoordinator(group::parse_find_coordinator_response(data)?)
            }
            ApiKeys::JoinGroup => KafkaResponse::JoinGroup(group::parse_join_group_response(data)?),
            ApiKeys::SyncGroup => KafkaResponse::SyncGroup(group::parse_sync_group_response(data)?),
            ApiKeys::Heartbeat => KafkaResponse::Heartbeat(group::parse_heartbeat_response(data)?),
            ApiKeys::LeaveGroup => KafkaResponse::LeaveGroup(group::parse_leave_group_response(data)?),
            ApiKeys::OffsetCommit => {
                KafkaResponse::OffsetCommit(offset_commit::parse_offset_commit_response(data)?)
            }
            ApiKeys::OffsetFetch => {
                KafkaResponse::OffsetFetch(offset_commit::parse_offset_fetch_response(data)?)
            }
            ApiKeys::InitProducerId => {
                KafkaResponse::InitProducerId(init_producer_id::parse_init_producer_id_response(data)?)
            }
            ApiKeys::SaslHandshake => {
                KafkaResponse::SaslHandshake(sasl::parse_sasl_handshake_response(data)?)
            }
            ApiKeys::SaslAuthenticate => {
                KafkaResponse::SaslAuthenticate(sasl::parse_sasl_authenticate_response(data)?)
            }
            ApiKeys::ApiVersions => {
                KafkaResponse::ApiVersions(api_versions::parse_api_versions_response(data)?)
            }
            _ => {
                let parsed = admin::parse_admin_response(data)?;
                KafkaResponse::Admin(parsed.body.to_vec())
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_admin_api_key_falls_back_to_raw_body() {
        assert_eq!(KafkaResponse::Admin(Vec::new()).api_key(), ApiKeys::CreateTopics);
    }
}
