use crate::clients::ClientTable;
use crate::handler::{Handler, ResponseWriter};
use crate::inflight::{InFlightKey, InFlightSet};
use radserver_proto::{Dictionary, Packet, PacketError};
use std::fmt;
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use thiserror::Error;
use tokio::net::UdpSocket;
use tokio::sync::{Notify, Semaphore};
use tracing::{debug, info, trace};

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Packet error: {0}")]
    Packet(#[from] PacketError),
    #[error("Server is already listening")]
    AlreadyStarted,
    #[error("No handler configured")]
    NoHandler,
    #[error("Invalid client address: {0}")]
    InvalidClient(String),
    #[error("Cannot resolve {addr}: {reason}")]
    Resolve { addr: String, reason: String },
    #[error("Unknown network {0:?} (expected udp, udp4 or udp6)")]
    InvalidNetwork(String),
}

/// Address family used to resolve and bind the listen address
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Network {
    /// Any family; an empty host binds the IPv4 wildcard
    #[default]
    Udp,
    Udp4,
    Udp6,
}

impl Network {
    fn accepts(self, addr: &SocketAddr) -> bool {
        match self {
            Network::Udp => true,
            Network::Udp4 => addr.is_ipv4(),
            Network::Udp6 => addr.is_ipv6(),
        }
    }

    fn wildcard(self) -> IpAddr {
        match self {
            Network::Udp | Network::Udp4 => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            Network::Udp6 => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Network::Udp => "udp",
            Network::Udp4 => "udp4",
            Network::Udp6 => "udp6",
        })
    }
}

impl FromStr for Network {
    type Err = ServerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "" | "udp" => Ok(Network::Udp),
            "udp4" => Ok(Network::Udp4),
            "udp6" => Ok(Network::Udp6),
            _ => Err(ServerError::InvalidNetwork(s.to_string())),
        }
    }
}

/// RADIUS Server configuration
#[derive(Clone)]
pub struct ServerConfig {
    /// Listen address as `host:port`; `:port` listens on every interface
    pub addr: String,
    pub network: Network,
    /// Shared secret used when no clients are configured
    pub secret: Vec<u8>,
    /// Per-client secrets keyed by IP address or CIDR network, in match order
    pub clients: Vec<(String, Vec<u8>)>,
    pub dictionary: Arc<Dictionary>,
    pub handler: Option<Arc<dyn Handler>>,
    /// Upper bound on concurrently running handlers (unbounded if `None`)
    pub max_in_flight: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            addr: ":1812".to_string(),
            network: Network::Udp,
            secret: Vec::new(),
            clients: Vec::new(),
            dictionary: Arc::new(Dictionary::builtin()),
            handler: None,
            max_in_flight: None,
        }
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let clients: Vec<&str> = self.clients.iter().map(|(key, _)| key.as_str()).collect();
        f.debug_struct("ServerConfig")
            .field("addr", &self.addr)
            .field("network", &self.network)
            .field("clients", &clients)
            .field("dictionary", &self.dictionary)
            .field("has_handler", &self.handler.is_some())
            .field("max_in_flight", &self.max_in_flight)
            .finish()
    }
}

impl ServerConfig {
    pub fn new(addr: impl Into<String>, secret: impl Into<Vec<u8>>) -> Self {
        ServerConfig {
            addr: addr.into(),
            secret: secret.into(),
            ..Default::default()
        }
    }

    pub fn with_network(mut self, network: Network) -> Self {
        self.network = network;
        self
    }

    /// Add a client by IP address or CIDR network
    pub fn with_client(mut self, key: impl Into<String>, secret: impl Into<Vec<u8>>) -> Self {
        self.clients.push((key.into(), secret.into()));
        self
    }

    pub fn with_dictionary(mut self, dictionary: Arc<Dictionary>) -> Self {
        self.dictionary = dictionary;
        self
    }

    pub fn with_handler(mut self, handler: impl Handler + 'static) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = Some(max_in_flight);
        self
    }
}

enum State {
    Idle,
    Binding,
    Bound {
        local_addr: SocketAddr,
        shutdown: Arc<Notify>,
    },
    Closed,
}

/// State shared with the per-request tasks
struct Shared {
    secret: Vec<u8>,
    dictionary: Arc<Dictionary>,
    clients: RwLock<Vec<(String, Vec<u8>)>>,
    client_table: RwLock<Arc<ClientTable>>,
    in_flight: InFlightSet,
}

impl Shared {
    fn resolve_secret(&self, source_ip: IpAddr) -> Option<Vec<u8>> {
        let table = Arc::clone(
            &self
                .client_table
                .read()
                .unwrap_or_else(PoisonError::into_inner),
        );
        if table.is_empty() {
            return Some(self.secret.clone());
        }
        table.resolve(source_ip).map(<[u8]>::to_vec)
    }
}

/// RADIUS Server
///
/// One task receives datagrams; every datagram is then handled on its own
/// task: the client secret is resolved, the packet decoded, retransmissions of
/// a request that is still being handled are dropped, and the handler is
/// invoked with a [`ResponseWriter`].
pub struct Server {
    addr: String,
    network: Network,
    handler: Option<Arc<dyn Handler>>,
    max_in_flight: Option<usize>,
    shared: Arc<Shared>,
    state: Mutex<State>,
}

impl fmt::Debug for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Server")
            .field("addr", &self.addr)
            .field("network", &self.network)
            .field("local_addr", &self.local_addr())
            .finish_non_exhaustive()
    }
}

impl Server {
    pub fn new(config: ServerConfig) -> Self {
        Server {
            addr: config.addr,
            network: config.network,
            handler: config.handler,
            max_in_flight: config.max_in_flight,
            shared: Arc::new(Shared {
                secret: config.secret,
                dictionary: config.dictionary,
                clients: RwLock::new(config.clients),
                client_table: RwLock::new(Arc::new(ClientTable::new())),
                in_flight: InFlightSet::new(),
            }),
            state: Mutex::new(State::Idle),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Get the local address the server is listening on
    ///
    /// `None` unless the server is bound. Useful for tests binding to port 0.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        match &*self.state() {
            State::Bound { local_addr, .. } => Some(*local_addr),
            _ => None,
        }
    }

    pub fn dictionary(&self) -> &Arc<Dictionary> {
        &self.shared.dictionary
    }

    /// Register a client secret; takes effect at the next
    /// [`Server::reset_client_nets`] (done on every listen)
    pub fn add_client(&self, key: impl Into<String>, secret: impl Into<Vec<u8>>) {
        self.shared
            .clients
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((key.into(), secret.into()));
    }

    /// Rebuild the client lookup table from the registered clients
    pub fn reset_client_nets(&self) -> Result<(), ServerError> {
        let table = {
            let clients = self
                .shared
                .clients
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            ClientTable::from_clients(clients.iter())?
        };
        *self
            .shared
            .client_table
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Arc::new(table);
        Ok(())
    }

    /// Shared secret for a source address
    ///
    /// With no clients configured every source gets the default secret;
    /// otherwise `None` means the source is not a known client.
    pub fn resolve_secret(&self, source_ip: IpAddr) -> Option<Vec<u8>> {
        self.shared.resolve_secret(source_ip)
    }

    /// Number of requests whose handler is running
    pub fn in_flight(&self) -> usize {
        self.shared.in_flight.len()
    }

    /// Stop the receive loop
    ///
    /// [`Server::listen_and_serve`] returns `Ok(())` shortly after. Handlers
    /// that are already running are not cancelled.
    pub fn close(&self) {
        let mut state = self.state();
        if let State::Bound { shutdown, .. } = &*state {
            shutdown.notify_one();
        }
        if !matches!(*state, State::Idle) {
            *state = State::Closed;
        }
    }

    async fn resolve_addr(&self) -> Result<SocketAddr, ServerError> {
        let resolve_error = |reason: String| ServerError::Resolve {
            addr: self.addr.clone(),
            reason,
        };

        let (host, port) = self
            .addr
            .rsplit_once(':')
            .ok_or_else(|| resolve_error("missing port".to_string()))?;

        if host.is_empty() {
            let port = port
                .parse::<u16>()
                .map_err(|e| resolve_error(format!("invalid port: {}", e)))?;
            return Ok(SocketAddr::new(self.network.wildcard(), port));
        }

        tokio::net::lookup_host(self.addr.as_str())
            .await
            .map_err(|e| resolve_error(e.to_string()))?
            .find(|addr| self.network.accepts(addr))
            .ok_or_else(|| resolve_error(format!("no {} address", self.network)))
    }

    /// Bind the listen address and serve requests until [`Server::close`]
    ///
    /// Fails if the server is already listening, has no handler, the address
    /// cannot be resolved or bound, or a client key is invalid. A
    /// non-transient receive error ends the loop and is returned.
    pub async fn listen_and_serve(&self) -> Result<(), ServerError> {
        let handler = self.handler.clone().ok_or(ServerError::NoHandler)?;
        {
            let mut state = self.state();
            if matches!(*state, State::Binding | State::Bound { .. }) {
                return Err(ServerError::AlreadyStarted);
            }
            *state = State::Binding;
        }

        let (socket, local_addr) = match self.bind().await {
            Ok(bound) => bound,
            Err(e) => {
                let mut state = self.state();
                if matches!(*state, State::Binding) {
                    *state = State::Idle;
                }
                return Err(e);
            }
        };

        let shutdown = Arc::new(Notify::new());
        {
            let mut state = self.state();
            if !matches!(*state, State::Binding) {
                // Closed while binding
                return Ok(());
            }
            *state = State::Bound {
                local_addr,
                shutdown: Arc::clone(&shutdown),
            };
        }

        info!(
            local_addr = %local_addr,
            network = %self.network,
            "RADIUS server listening"
        );

        let result = self.serve(socket, local_addr, handler, &shutdown).await;

        {
            // A close followed by a new listen may already have replaced this
            // run's state
            let mut state = self.state();
            let this_run = matches!(
                &*state,
                State::Bound { shutdown: current, .. } if Arc::ptr_eq(current, &shutdown)
            );
            if this_run {
                *state = State::Closed;
            }
        }
        match &result {
            Ok(()) => info!(local_addr = %local_addr, "RADIUS server closed"),
            Err(e) => info!(local_addr = %local_addr, error = %e, "RADIUS server stopped"),
        }
        result
    }

    async fn bind(&self) -> Result<(UdpSocket, SocketAddr), ServerError> {
        let addr = self.resolve_addr().await?;
        let socket = UdpSocket::bind(addr).await?;
        let local_addr = socket.local_addr()?;
        self.reset_client_nets()?;
        Ok((socket, local_addr))
    }

    async fn serve(
        &self,
        socket: UdpSocket,
        local_addr: SocketAddr,
        handler: Arc<dyn Handler>,
        shutdown: &Notify,
    ) -> Result<(), ServerError> {
        let socket = Arc::new(socket);
        let semaphore = self.max_in_flight.map(|n| Arc::new(Semaphore::new(n)));
        let mut buf = vec![0u8; Packet::MAX_PACKET_SIZE];

        loop {
            let permit = match &semaphore {
                Some(semaphore) => tokio::select! {
                    permit = Arc::clone(semaphore).acquire_owned() => permit.ok(),
                    _ = shutdown.notified() => return Ok(()),
                },
                None => None,
            };

            let (len, remote_addr) = tokio::select! {
                received = socket.recv_from(&mut buf) => match received {
                    Ok(received) => received,
                    Err(e) if is_transient(&e) => {
                        debug!(error = %e, "Ignoring transient receive error");
                        continue;
                    }
                    Err(e) => return Err(ServerError::Io(e)),
                },
                _ = shutdown.notified() => return Ok(()),
            };

            if len == 0 {
                continue;
            }

            let dispatch = Dispatch {
                shared: Arc::clone(&self.shared),
                socket: Arc::clone(&socket),
                handler: Arc::clone(&handler),
                local_addr,
                remote_addr,
            };
            let datagram = buf[..len].to_vec();

            tokio::spawn(async move {
                dispatch.handle(datagram).await;
                drop(permit);
            });
        }
    }
}

fn is_transient(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
            | io::ErrorKind::TimedOut
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionRefused
    )
}

/// Everything one request task needs
struct Dispatch {
    shared: Arc<Shared>,
    socket: Arc<UdpSocket>,
    handler: Arc<dyn Handler>,
    local_addr: SocketAddr,
    remote_addr: SocketAddr,
}

impl Dispatch {
    async fn handle(self, datagram: Vec<u8>) {
        let remote_addr = self.remote_addr;
        let request_id = datagram.get(1).copied().unwrap_or(0);

        let Some(secret) = self.shared.resolve_secret(remote_addr.ip()) else {
            debug!(
                client_ip = %remote_addr.ip(),
                request_id = request_id,
                "Dropping datagram from unknown client"
            );
            return;
        };

        let packet = match Packet::parse(&datagram, &secret, Arc::clone(&self.shared.dictionary)) {
            Ok(packet) => packet,
            Err(e) => {
                debug!(
                    client_addr = %remote_addr,
                    request_id = request_id,
                    error = %e,
                    "Dropping undecodable datagram"
                );
                return;
            }
        };

        for warning in &packet.warnings {
            trace!(
                client_addr = %remote_addr,
                request_id = packet.identifier,
                attr_type = warning.attr_type,
                error = %warning.error,
                "Attribute kept undecoded"
            );
        }

        let Some(_guard) = self
            .shared
            .in_flight
            .try_insert(InFlightKey::new(remote_addr, packet.identifier))
        else {
            debug!(
                client_addr = %remote_addr,
                request_id = packet.identifier,
                "Dropping retransmission of in-flight request"
            );
            return;
        };

        debug!(
            packet_type = %packet.code,
            client_addr = %remote_addr,
            request_id = packet.identifier,
            "Received RADIUS packet"
        );

        let writer = ResponseWriter::new(self.socket, self.local_addr, remote_addr, &packet);
        self.handler.serve_radius(writer, packet).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::handler_fn;

    fn noop_handler() -> impl Handler {
        handler_fn(|_writer: ResponseWriter, _packet: Packet| async {})
    }

    #[test]
    fn test_network_parse() {
        assert_eq!("udp".parse::<Network>().unwrap(), Network::Udp);
        assert_eq!("UDP4".parse::<Network>().unwrap(), Network::Udp4);
        assert_eq!("udp6".parse::<Network>().unwrap(), Network::Udp6);
        assert!(matches!(
            "tcp".parse::<Network>(),
            Err(ServerError::InvalidNetwork(_))
        ));
        assert_eq!(Network::Udp4.to_string(), "udp4");
    }

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.addr, ":1812");
        assert_eq!(config.network, Network::Udp);
        assert!(config.handler.is_none());
        assert_eq!(config.dictionary.type_of("User-Name"), Some(1));
    }

    #[test]
    fn test_resolve_secret_without_clients_uses_default() {
        let server = Server::new(ServerConfig::new("127.0.0.1:0", "default"));
        server.reset_client_nets().unwrap();
        assert_eq!(
            server.resolve_secret("203.0.113.9".parse().unwrap()),
            Some(b"default".to_vec())
        );
    }

    #[test]
    fn test_resolve_secret_with_clients() {
        let server = Server::new(
            ServerConfig::new("127.0.0.1:0", "default")
                .with_client("10.0.0.0/8", "net")
                .with_client("10.0.0.5", "host"),
        );
        server.reset_client_nets().unwrap();

        assert_eq!(
            server.resolve_secret("10.0.0.5".parse().unwrap()),
            Some(b"host".to_vec())
        );
        assert_eq!(
            server.resolve_secret("10.9.9.9".parse().unwrap()),
            Some(b"net".to_vec())
        );
        assert_eq!(server.resolve_secret("192.0.2.1".parse().unwrap()), None);
    }

    #[test]
    fn test_add_client_applies_after_reset() {
        let server = Server::new(ServerConfig::new("127.0.0.1:0", "default"));
        server.add_client("192.0.2.1", "late");
        assert_eq!(
            server.resolve_secret("192.0.2.1".parse().unwrap()),
            Some(b"default".to_vec())
        );

        server.reset_client_nets().unwrap();
        assert_eq!(
            server.resolve_secret("192.0.2.1".parse().unwrap()),
            Some(b"late".to_vec())
        );
    }

    #[tokio::test]
    async fn test_listen_requires_handler() {
        let server = Server::new(ServerConfig::new("127.0.0.1:0", "secret"));
        assert!(matches!(
            server.listen_and_serve().await,
            Err(ServerError::NoHandler)
        ));
    }

    #[tokio::test]
    async fn test_invalid_client_fails_listen() {
        let server = Server::new(
            ServerConfig::new("127.0.0.1:0", "secret")
                .with_client("nas.example.com", "s")
                .with_handler(noop_handler()),
        );
        assert!(matches!(
            server.listen_and_serve().await,
            Err(ServerError::InvalidClient(_))
        ));
        assert!(server.local_addr().is_none());
    }

    #[tokio::test]
    async fn test_unresolvable_address() {
        let server = Server::new(ServerConfig::new("127.0.0.1", "secret").with_handler(noop_handler()));
        assert!(matches!(
            server.listen_and_serve().await,
            Err(ServerError::Resolve { .. })
        ));

        let server = Server::new(ServerConfig::new(":notaport", "secret").with_handler(noop_handler()));
        assert!(matches!(
            server.listen_and_serve().await,
            Err(ServerError::Resolve { .. })
        ));
    }

    #[tokio::test]
    async fn test_close_before_listen_is_noop() {
        let server = Server::new(ServerConfig::new("127.0.0.1:0", "secret"));
        server.close();
        assert!(server.local_addr().is_none());
    }

    #[test]
    fn test_transient_errors() {
        assert!(is_transient(&io::Error::from(io::ErrorKind::ConnectionReset)));
        assert!(is_transient(&io::Error::from(io::ErrorKind::WouldBlock)));
        assert!(!is_transient(&io::Error::from(io::ErrorKind::PermissionDenied)));
    }
}
