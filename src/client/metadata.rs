//! Cluster metadata snapshot: brokers plus topic/partition
//! placement, rebuilt fresh on every `Metadata` response — `Inner::
//! fetch_metadata` treats each response as the whole truth rather than
//! patching a running snapshot. Also home to `UsableApiVersions`, the
//! per-broker API-version table `Broker::api_version` consults, used
//! throughout `client.rs` (`UsableApiVersions::new(res.api_versions)`,
//! `.with_fallback_api_versions(...)`).

use std::collections::HashMap;

use client::cluster::{Broker, BrokerRef, Cluster, PartitionInfo};
use client::version::KafkaVersion;
use network::TopicPartition;
use protocol::api_versions::SupportedApiVersion;
use protocol::metadata::MetadataResponse;
use protocol::{ApiKeys, ApiVersion};

pub type TopicPartitions = HashMap<String, Vec<PartitionInfo>>;

/// The (minVersion, maxVersion) a broker reported per `apiKey`, keyed by
/// the numeric code since `ApiKeys` isn't `Hash`.
#[derive(Clone, Debug, Default)]
pub struct UsableApiVersions(HashMap<i16, (ApiVersion, ApiVersion)>);

impl UsableApiVersions {
    pub fn new(versions: Vec<SupportedApiVersion>) -> Self {
        UsableApiVersions(
            versions
                .into_iter()
                .map(|v| (v.api_key, (v.min_version, v.max_version)))
                .collect(),
        )
    }

    /// The highest version we can use for `api_key`, if the broker
    /// listed it at all.
    pub fn api_version(&self, api_key: ApiKeys) -> Option<ApiVersion> {
        self.0.get(&(api_key as i16)).map(|&(_, max)| max)
    }

    fn merge(mut self, other: UsableApiVersions) -> Self {
        for (k, v) in other.0 {
            self.0.entry(k).or_insert(v);
        }
        self
    }
}

#[derive(Clone, Debug, Default)]
pub struct Metadata {
    brokers: Vec<Broker>,
    topics: TopicPartitions,
    cluster_id: Option<String>,
    controller_id: i32,
}

impl From<MetadataResponse> for Metadata {
    fn from(res: MetadataResponse) -> Self {
        let brokers = res
            .brokers
            .into_iter()
            .map(|b| Broker::with_rack(b.node_id, b.host, b.port as u16, b.rack))
            .collect();

        let topics = res
            .topics
            .into_iter()
            .map(|topic| {
                let partitions = topic
                    .partitions
                    .into_iter()
                    .map(|p| PartitionInfo {
                        partition: p.partition_index,
                        leader: if p.leader_id < 0 {
                            None
                        } else {
                            Some(BrokerRef(p.leader_id))
                        },
                        replicas: p.replica_nodes,
                        isr: p.isr_nodes,
                    })
                    .collect();

                (topic.name, partitions)
            })
            .collect();

        Metadata {
            brokers,
            topics,
            cluster_id: res.cluster_id,
            controller_id: res.controller_id,
        }
    }
}

impl Metadata {
    pub fn cluster_id(&self) -> Option<&str> {
        self.cluster_id.as_ref().map(|s| s.as_str())
    }

    pub fn controller_id(&self) -> i32 {
        self.controller_id
    }

    pub fn topics(&self) -> &TopicPartitions {
        &self.topics
    }

    pub fn partitions(&self, topic: &str) -> Option<&[PartitionInfo]> {
        self.topics.get(topic).map(|ps| ps.as_slice())
    }

    /// Applies a freshly learned per-broker API version table, returning
    /// a new snapshot (brokers are small and cheap to clone; this keeps
    /// `Metadata` itself immutable once published, matching the
    /// `Rc<Metadata>` sharing model used throughout).
    pub fn with_api_versions(&self, versions: HashMap<BrokerRef, UsableApiVersions>) -> Self {
        let mut next = self.clone();
        for broker in &mut next.brokers {
            if let Some(v) = versions.get(&broker.as_ref()) {
                *broker = broker.clone().with_api_versions(v.clone());
            }
        }
        next
    }

    /// Applies a single fallback table to every broker that doesn't
    /// already have one, for clusters too old to answer `ApiVersions`.
    pub fn with_fallback_api_versions(&self, fallback: UsableApiVersions) -> Self {
        let mut next = self.clone();
        for broker in &mut next.brokers {
            let merged = broker
                .api_version_table()
                .cloned()
                .unwrap_or_default()
                .merge(fallback.clone());
            *broker = broker.clone().with_api_versions(merged);
        }
        next
    }
}

impl Cluster for Metadata {
    fn brokers(&self) -> &[Broker] {
        &self.brokers
    }

    fn find_broker(&self, broker_ref: BrokerRef) -> Option<&Broker> {
        self.brokers.iter().find(|b| b.as_ref() == broker_ref)
    }

    fn leader_for<'a>(&self, topic_partition: &TopicPartition<'a>) -> Option<&Broker> {
        let partitions = self.topics.get(topic_partition.topic_name.as_ref())?;
        let leader = partitions
            .iter()
            .find(|p| p.partition == topic_partition.partition)?
            .leader?;
        self.find_broker(leader)
    }
}

impl KafkaVersion {
    /// A conservative `(apiKey -> version 0)` table for every API this
    /// crate issues requests for, used when `ClientConfig
    /// ::api_version_request` is off or the broker predates
    /// `ApiVersions` entirely.
    pub fn api_versions(&self) -> UsableApiVersions {
        let keys = [
            ApiKeys::Produce,
            ApiKeys::Fetch,
            ApiKeys::ListOffsets,
            ApiKeys::Metadata,
            ApiKeys::OffsetCommit,
            ApiKeys::OffsetFetch,
            ApiKeys::FindCoordinator,
            ApiKeys::JoinGroup,
            ApiKeys::Heartbeat,
            ApiKeys::LeaveGroup,
            ApiKeys::SyncGroup,
            ApiKeys::SaslHandshake,
            ApiKeys::ApiVersions,
            ApiKeys::InitProducerId,
        ];

        UsableApiVersions::new(
            keys.iter()
                .map(|&api_key| SupportedApiVersion {
                    api_key: api_key as i16,
                    min_version: 0,
                    max_version: 0,
                })
                .collect(),
        )
    }
}

// Give `Broker` a way to read back its own version table for merging,
// without making the field public.
impl Broker {
    pub(crate) fn api_version_table(&self) -> Option<&UsableApiVersions> {
        self.api_versions_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::metadata::{BrokerMetadata, PartitionMetadata, TopicMetadata};
    use protocol::header::ResponseHeader;

    fn sample() -> MetadataResponse {
        MetadataResponse {
            header: ResponseHeader { correlation_id: 1 },
            throttle_time_ms: 0,
            brokers: vec![BrokerMetadata {
                node_id: 1,
                host: "broker1".to_owned(),
                port: 9092,
                rack: None,
            }],
            cluster_id: Some("cluster".to_owned()),
            controller_id: 1,
            topics: vec![TopicMetadata {
                error_code: 0,
                name: "orders".to_owned(),
                topic_id: [0u8; 16],
                is_internal: false,
                partitions: vec![PartitionMetadata {
                    error_code: 0,
                    partition_index: 0,
                    leader_id: 1,
                    leader_epoch: 0,
                    replica_nodes: vec![1],
                    isr_nodes: vec![1],
                }],
            }],
        }
    }

    #[test]
    fn leader_for_resolves_broker_from_partition_metadata() {
        let metadata = Metadata::from(sample());
        let tp = TopicPartition::new("orders", 0);
        let leader = metadata.leader_for(&tp).expect("leader");
        assert_eq!(leader.id(), 1);
    }

    #[test]
    fn fallback_api_versions_fill_gaps() {
        let metadata = Metadata::from(sample()).with_fallback_api_versions(KafkaVersion::default().api_versions());
        let broker = metadata.find_broker(BrokerRef(1)).unwrap();
        assert_eq!(broker.api_version(ApiKeys::Produce), Some(0));
    }
}
