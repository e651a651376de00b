//! The bottom of the middleware stack `client::client::Inner.service`
//! wraps (`InFlightMiddleware<LogMiddleware<TimeoutMiddleware<
//! KafkaService>>>`): dials or reuses a pooled connection for the
//! request's target address, writes the frame, and decodes the matching
//! response. Matches the inline `self.service.call((addr, request))`
//! call sites throughout `client.rs`.

use std::cell::RefCell;
use std::net::SocketAddr;
use std::rc::Rc;
use std::time::Duration;

use futures::Future;
use tokio_core::reactor::Handle;
use tokio_service::Service;

use client::metrics::Metrics;
use client::StaticBoxFuture;
use errors::{Error, ErrorKind};
use network::{KafkaRequest, KafkaResponse, Pool};

/// Frames this crate issues never approach this; it only guards against
/// a corrupt length prefix turning a truncated read into an unbounded
/// allocation.
const MAX_FRAME_SIZE: usize = 100 * 1024 * 1024;

pub type FutureResponse = StaticBoxFuture<KafkaResponse>;

pub struct KafkaService<'a> {
    pool: Rc<RefCell<Pool>>,
    metrics: Option<Rc<Metrics>>,
    _marker: ::std::marker::PhantomData<&'a ()>,
}

impl<'a> KafkaService<'a> {
    pub fn new(handle: Handle, max_idle: Duration, metrics: Option<Rc<Metrics>>) -> Self {
        KafkaService {
            pool: Rc::new(RefCell::new(Pool::new(handle, MAX_FRAME_SIZE, max_idle))),
            metrics,
            _marker: ::std::marker::PhantomData,
        }
    }

    pub fn in_flight_requests(&self, addr: &SocketAddr) -> Option<usize> {
        self.pool.borrow().in_flight_requests(addr)
    }

    pub fn sweep_idle(&self) {
        self.pool.borrow_mut().sweep_idle();
    }
}

impl<'a> Service for KafkaService<'a> {
    type Request = (SocketAddr, KafkaRequest<'a>);
    type Response = KafkaResponse;
    type Error = Error;
    type Future = FutureResponse;

    fn call(&self, (addr, request): Self::Request) -> Self::Future {
        let api_key = request.api_key();
        let label = format!("{:?}", api_key);

        if let Some(ref metrics) = self.metrics {
            metrics.record_request(&label);
        }

        let frame = match request.into_frame() {
            Ok(frame) => frame,
            Err(err) => return FutureResponse::err(err),
        };

        let pool = self.pool.clone();
        let connect = pool.borrow_mut().get_or_connect(addr);
        let metrics = self.metrics.clone();

        FutureResponse::new(
            connect
                .and_then(move |connection| {
                    pool.borrow_mut().cache(addr, connection.clone());

                    connection
                        .call(frame)
                        .map_err(|err| ErrorKind::Network(err.to_string()).into())
                        .and_then(move |bytes| {
                            KafkaResponse::parse(api_key, &bytes).map_err(Error::from)
                        })
                })
                .then(move |result| {
                    if result.is_err() {
                        if let Some(ref metrics) = metrics {
                            metrics.record_error(&label);
                        }
                    }

                    result
                }),
        )
    }
}
