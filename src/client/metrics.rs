//! Client-side counters/histograms, registered via the
//! `#[macro_use] extern crate prometheus;` pulled in at the crate root.
//! `KafkaClient::from_config` only builds this when `ClientConfig
//! ::metrics` is set, matching `Inner.metrics: Option<Rc<Metrics>>`.

use prometheus::{CounterVec, Histogram, HistogramOpts, Opts, Result as PrometheusResult};

#[derive(Debug)]
pub struct Metrics {
    pub requests: CounterVec,
    pub errors: CounterVec,
    pub request_latency: Histogram,
}

impl Metrics {
    pub fn new() -> PrometheusResult<Self> {
        let requests = CounterVec::new(
            Opts::new("kafka_client_requests_total", "requests sent per api"),
            &["api"],
        )?;
        let errors = CounterVec::new(
            Opts::new("kafka_client_errors_total", "failed requests per api"),
            &["api"],
        )?;
        let request_latency = Histogram::with_opts(HistogramOpts::new(
            "kafka_client_request_latency_seconds",
            "round trip latency per request",
        ))?;

        Ok(Metrics {
            requests,
            errors,
            request_latency,
        })
    }

    pub fn record_request(&self, api: &str) {
        self.requests.with_label_values(&[api]).inc();
    }

    pub fn record_error(&self, api: &str) {
        self.errors.with_label_values(&[api]).inc();
    }
}
