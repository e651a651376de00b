//! Broker identity and the `Cluster` lookup surface `client::metadata`
//! implements, split out of `client.rs`'s inline usage (`broker.addr()`,
//! `broker.api_version(ApiKeys::X)`, `metadata.find_broker(coordinator)`,
//! `metadata.leader_for(&tp)`) to give those calls a home of their own.

use client::metadata::UsableApiVersions;
use network::TopicPartition;
use protocol::{ApiKeys, ApiVersion, PartitionId};

/// A lightweight, copyable handle to a broker inside one `Metadata`
/// snapshot. Stable for the life of that snapshot; becomes meaningless
/// once metadata is refreshed (a new snapshot may renumber brokers).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct BrokerRef(pub i32);

/// One broker as reported by a `Metadata` response, plus whatever API
/// versions we've since learned it supports.
#[derive(Clone, Debug, PartialEq)]
pub struct Broker {
    id: i32,
    host: String,
    port: u16,
    rack: Option<String>,
    api_versions: Option<UsableApiVersions>,
}

impl Broker {
    pub fn new<S: Into<String>>(id: i32, host: S, port: u16) -> Self {
        Broker {
            id,
            host: host.into(),
            port,
            rack: None,
            api_versions: None,
        }
    }

    pub fn with_rack<S: Into<String>>(id: i32, host: S, port: u16, rack: Option<String>) -> Self {
        Broker {
            id,
            host: host.into(),
            port,
            rack,
            api_versions: None,
        }
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn index(&self) -> i32 {
        self.id
    }

    pub fn rack(&self) -> Option<&str> {
        self.rack.as_ref().map(|s| s.as_str())
    }

    /// Resolvable via `ToSocketAddrs` (`broker.addr().to_socket_addrs()`).
    pub fn addr(&self) -> (&str, u16) {
        (&self.host, self.port)
    }

    pub fn as_ref(&self) -> BrokerRef {
        BrokerRef(self.id)
    }

    pub fn api_version(&self, api_key: ApiKeys) -> Option<ApiVersion> {
        self.api_versions.as_ref().and_then(|v| v.api_version(api_key))
    }

    pub fn with_api_versions(mut self, api_versions: UsableApiVersions) -> Self {
        self.api_versions = Some(api_versions);
        self
    }

    pub(crate) fn api_versions_ref(&self) -> Option<&UsableApiVersions> {
        self.api_versions.as_ref()
    }
}

/// One partition's placement, as carried in a `Metadata` snapshot.
#[derive(Clone, Debug, PartialEq)]
pub struct PartitionInfo {
    pub partition: PartitionId,
    pub leader: Option<BrokerRef>,
    pub replicas: Vec<i32>,
    pub isr: Vec<i32>,
}

/// The lookups `client::client::Inner` needs out of whatever holds the
/// current metadata snapshot.
pub trait Cluster {
    fn brokers(&self) -> &[Broker];

    fn find_broker(&self, broker_ref: BrokerRef) -> Option<&Broker>;

    fn leader_for<'a>(&self, topic_partition: &TopicPartition<'a>) -> Option<&Broker>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broker_addr_resolves_via_to_socket_addrs() {
        use std::net::ToSocketAddrs;

        let broker = Broker::new(1, "127.0.0.1", 9092);
        let mut addrs = broker.addr().to_socket_addrs().unwrap();
        assert_eq!(addrs.next().unwrap().port(), 9092);
    }
}
