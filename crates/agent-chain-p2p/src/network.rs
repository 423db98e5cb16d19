use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use agent_chain_core::constants::{
    ADDR_EXCHANGE_INTERVAL_SECS, ADDR_REPLY_LIMIT, DIAL_TIMEOUT_SECS, DISCOVERY_INTERVAL_SECS,
    MAINTENANCE_INTERVAL_SECS, MAX_PEERS, MIN_PEERS, PEER_STALENESS_SECS, QUALITY_MIN_CANDIDATE,
    QUALITY_SHAREABLE,
};
use agent_chain_core::error::ChainError;
use futures::StreamExt;
use libp2p::request_response::{self, OutboundRequestId, ProtocolSupport};
use libp2p::swarm::dial_opts::DialOpts;
use libp2p::swarm::{ConnectionId, NetworkBehaviour, SwarmEvent};
use libp2p::{identify, multiaddr::Protocol, noise, ping, tcp, yamux, Multiaddr, PeerId, StreamProtocol, Swarm};
use tokio::sync::{mpsc, oneshot, watch, RwLock};
use tracing::{debug, info, warn};

use crate::config::P2pConfig;
use crate::known_addr::{KnownAddress, KnownAddressTable};
use crate::message::{msg_type, Ack, AddrEntry, AddrList, Message};
use crate::peer_table::PeerTable;

pub type Handler = Arc<dyn Fn(Message) + Send + Sync>;

#[derive(NetworkBehaviour)]
struct OverlayBehaviour {
    request_response: request_response::cbor::Behaviour<Message, Ack>,
    identify: identify::Behaviour,
    ping: ping::Behaviour,
}

enum Command {
    Broadcast { msg_type: String, data: Vec<u8> },
    SendTo { peer: PeerId, msg_type: String, data: Vec<u8>, respond: oneshot::Sender<Result<(), ChainError>> },
    Dial { addr: Multiaddr, known_key: (String, u16) },
}

/// Public handle to the overlay: the contract in §4.4 (`broadcast`,
/// `send_to`, `register_handler`) plus read access to the peer/known-address
/// tables for the RPC `/health` endpoint and the node's own status reporting.
#[derive(Clone)]
pub struct OverlayHandle {
    command_tx: mpsc::Sender<Command>,
    peer_table: Arc<RwLock<PeerTable>>,
    known_addresses: Arc<RwLock<KnownAddressTable>>,
    handlers: Arc<RwLock<HashMap<String, Handler>>>,
    shutdown_tx: watch::Sender<bool>,
    local_peer_id: PeerId,
}

impl OverlayHandle {
    pub fn local_peer_id(&self) -> String {
        self.local_peer_id.to_string()
    }

    /// Fan out `{type, payload}` to every currently connected peer (§4.4).
    /// Best-effort; individual send failures are logged by the driver task,
    /// never propagated here.
    pub async fn broadcast(&self, msg_type: impl Into<String>, payload: Vec<u8>) {
        let _ = self
            .command_tx
            .send(Command::Broadcast { msg_type: msg_type.into(), data: payload })
            .await;
    }

    /// Directed send to one connected peer. Fails with `PeerNotFound` if the
    /// peer id doesn't parse or isn't connected, `StreamError` on transport
    /// failure (§4.4).
    pub async fn send_to(
        &self,
        peer_id: &str,
        msg_type: impl Into<String>,
        payload: Vec<u8>,
    ) -> Result<(), ChainError> {
        let peer = PeerId::from_str(peer_id).map_err(|_| ChainError::PeerNotFound(peer_id.to_string()))?;
        if !self.peer_table.read().await.contains(&peer) {
            return Err(ChainError::PeerNotFound(peer_id.to_string()));
        }
        let (respond, rx) = oneshot::channel();
        self.command_tx
            .send(Command::SendTo { peer, msg_type: msg_type.into(), data: payload, respond })
            .await
            .map_err(|_| ChainError::StreamError("overlay driver gone".into()))?;
        rx.await.map_err(|_| ChainError::StreamError("overlay driver dropped response".into()))?
    }

    /// Install a callback invoked once per inbound message of `msg_type`
    /// (§4.4). Replaces any previously registered handler for the same type.
    pub async fn register_handler(&self, msg_type: impl Into<String>, handler: Handler) {
        self.handlers.write().await.insert(msg_type.into(), handler);
    }

    pub async fn peer_count(&self) -> usize {
        self.peer_table.read().await.len()
    }

    /// Stringified ids of every currently connected peer, in arbitrary order
    /// (used by the sync loop to pick "an arbitrary peer", §4.5).
    pub async fn peer_ids(&self) -> Vec<String> {
        self.peer_table
            .read()
            .await
            .peer_ids()
            .into_iter()
            .map(|p| p.to_string())
            .collect()
    }

    pub async fn known_address_count(&self) -> usize {
        self.known_addresses.read().await.len()
    }

    /// Dial a `host:port` directly, outside the discovery loop's own
    /// candidate selection (§4.7 "connect to any configured legacy boot
    /// nodes, best-effort", run once at startup).
    pub async fn dial(&self, host: &str, port: u16) {
        let addr: Multiaddr = match format!("/ip4/{host}/tcp/{port}").parse() {
            Ok(a) => a,
            Err(e) => {
                warn!(host, port, error = %e, "boot node address did not parse");
                return;
            }
        };
        let _ = self.command_tx.send(Command::Dial { addr, known_key: (host.to_string(), port) }).await;
    }

    /// Signal every loop (driver + discovery + address-exchange +
    /// maintenance) to stop (§4.7, §5).
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}

/// Owns the libp2p `Swarm`. Spawn `overlay.run()` in a dedicated task, share
/// the returned `OverlayHandle` with the consensus loop and RPC server.
pub struct Overlay {
    swarm: Swarm<OverlayBehaviour>,
    config: P2pConfig,
    command_rx: mpsc::Receiver<Command>,
    shutdown_rx: watch::Receiver<bool>,
    peer_table: Arc<RwLock<PeerTable>>,
    known_addresses: Arc<RwLock<KnownAddressTable>>,
    handlers: Arc<RwLock<HashMap<String, Handler>>>,
    pending_requests: HashMap<OutboundRequestId, oneshot::Sender<Result<(), ChainError>>>,
    pending_dials: HashMap<ConnectionId, (String, u16)>,
    remote_addrs: HashMap<PeerId, String>,
}

impl Overlay {
    pub fn new(config: P2pConfig) -> Result<(Self, OverlayHandle), Box<dyn std::error::Error + Send + Sync>> {
        let protocol = StreamProtocol::try_from_owned(config.protocol.clone())?;

        let mut swarm = libp2p::SwarmBuilder::with_new_identity()
            .with_tokio()
            .with_tcp(tcp::Config::default(), noise::Config::new, yamux::Config::default)?
            .with_behaviour(|key| {
                let request_response = request_response::cbor::Behaviour::new(
                    [(protocol, ProtocolSupport::Full)],
                    request_response::Config::default().with_request_timeout(Duration::from_secs(DIAL_TIMEOUT_SECS)),
                );
                let identify = identify::Behaviour::new(identify::Config::new(
                    config.protocol.clone(),
                    key.public(),
                ));
                let ping = ping::Behaviour::default();
                Ok(OverlayBehaviour { request_response, identify, ping })
            })?
            .build();

        let listen_addr: Multiaddr = format!("/ip4/0.0.0.0/tcp/{}", config.port).parse()?;
        swarm.listen_on(listen_addr)?;

        let local_peer_id = *swarm.local_peer_id();
        let (command_tx, command_rx) = mpsc::channel(256);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let peer_table = Arc::new(RwLock::new(PeerTable::new()));
        let known_addresses = Arc::new(RwLock::new(KnownAddressTable::new()));
        let handlers = Arc::new(RwLock::new(HashMap::new()));

        let handle = OverlayHandle {
            command_tx,
            peer_table: peer_table.clone(),
            known_addresses: known_addresses.clone(),
            handlers: handlers.clone(),
            shutdown_tx,
            local_peer_id,
        };

        let overlay = Self {
            swarm,
            config,
            command_rx,
            shutdown_rx,
            peer_table,
            known_addresses,
            handlers,
            pending_requests: HashMap::new(),
            pending_dials: HashMap::new(),
            remote_addrs: HashMap::new(),
        };

        Ok((overlay, handle))
    }

    /// Populate the known-address table from compiled seeds and DNS seeds
    /// (§4.4 bootstrap seeding, run once at start).
    pub async fn seed_bootstrap(&self) {
        let mut table = self.known_addresses.write().await;
        for seed in &self.config.compiled_seeds {
            if let Some((host, port)) = parse_host_port(seed) {
                table.seed(&host, port);
            }
        }
        for boot in &self.config.boot_nodes {
            if let Some((host, port)) = parse_host_port(boot) {
                table.seed(&host, port);
            }
        }
        for hostname in &self.config.dns_seeds {
            match tokio::net::lookup_host((hostname.as_str(), self.config.port)).await {
                Ok(addrs) => {
                    for addr in addrs {
                        table.seed(&addr.ip().to_string(), self.config.port);
                    }
                }
                Err(e) => warn!(hostname, error = %e, "DNS seed lookup failed"),
            }
        }
        info!(known = table.len(), "bootstrap seeding complete");
    }

    /// Drive the swarm event loop. Run in its own task; terminates when the
    /// shutdown signal fires.
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                _ = self.shutdown_rx.changed() => {
                    if *self.shutdown_rx.borrow() {
                        info!("overlay shutting down");
                        break;
                    }
                }
                Some(cmd) = self.command_rx.recv() => self.handle_command(cmd).await,
                event = self.swarm.select_next_some() => self.handle_swarm_event(event).await,
            }
        }
    }

    async fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Broadcast { msg_type, data } => {
                let from = self.swarm.local_peer_id().to_string();
                let msg = Message::new(msg_type, data, from);
                let peers: Vec<PeerId> = self.peer_table.read().await.peer_ids();
                for peer in peers {
                    self.swarm.behaviour_mut().request_response.send_request(&peer, msg.clone());
                }
            }
            Command::SendTo { peer, msg_type, data, respond } => {
                let from = self.swarm.local_peer_id().to_string();
                let msg = Message::new(msg_type, data, from);
                let request_id = self.swarm.behaviour_mut().request_response.send_request(&peer, msg);
                self.pending_requests.insert(request_id, respond);
            }
            Command::Dial { addr, known_key } => {
                let opts = DialOpts::unknown_peer_id().address(addr.clone()).build();
                let connection_id = opts.connection_id();
                self.pending_dials.insert(connection_id, known_key.clone());
                if let Err(e) = self.swarm.dial(opts) {
                    warn!(addr = %addr, error = %e, "dial failed to start");
                    self.pending_dials.remove(&connection_id);
                    self.known_addresses.write().await.record_failure(&known_key.0, known_key.1);
                }
            }
        }
    }

    async fn handle_swarm_event(&mut self, event: SwarmEvent<OverlayBehaviourEvent>) {
        match event {
            SwarmEvent::NewListenAddr { address, .. } => {
                info!(addr = %address, "overlay listening on");
            }
            SwarmEvent::ConnectionEstablished { peer_id, endpoint, connection_id, .. } => {
                let remote = endpoint.get_remote_address().to_string();
                self.remote_addrs.insert(peer_id, remote.clone());
                self.peer_table.write().await.insert(peer_id, remote);
                if let Some((host, port)) = self.pending_dials.remove(&connection_id) {
                    self.known_addresses.write().await.record_success(&host, port);
                }
                debug!(peer = %peer_id, "connection established");
            }
            SwarmEvent::ConnectionClosed { peer_id, .. } => {
                self.peer_table.write().await.remove(&peer_id);
                self.remote_addrs.remove(&peer_id);
                debug!(peer = %peer_id, "connection closed");
            }
            SwarmEvent::OutgoingConnectionError { connection_id, error, .. } => {
                if let Some((host, port)) = self.pending_dials.remove(&connection_id) {
                    debug!(host, port, error = %error, "dial failed");
                    self.known_addresses.write().await.record_failure(&host, port);
                }
            }
            SwarmEvent::Behaviour(OverlayBehaviourEvent::RequestResponse(event)) => {
                self.handle_request_response_event(event).await;
            }
            SwarmEvent::Behaviour(OverlayBehaviourEvent::Identify(identify::Event::Received {
                peer_id,
                ..
            })) => {
                self.peer_table.write().await.touch(&peer_id);
            }
            _ => {}
        }
    }

    async fn handle_request_response_event(
        &mut self,
        event: request_response::Event<Message, Ack>,
    ) {
        match event {
            request_response::Event::Message { peer, message } => match message {
                request_response::Message::Request { request, channel, .. } => {
                    self.peer_table.write().await.touch(&peer);
                    let _ = self.swarm.behaviour_mut().request_response.send_response(channel, Ack);
                    self.dispatch_inbound(peer, request).await;
                }
                request_response::Message::Response { request_id, response: _ } => {
                    if let Some(respond) = self.pending_requests.remove(&request_id) {
                        let _ = respond.send(Ok(()));
                    }
                }
            },
            request_response::Event::OutboundFailure { request_id, error, .. } => {
                if let Some(respond) = self.pending_requests.remove(&request_id) {
                    let _ = respond.send(Err(ChainError::StreamError(error.to_string())));
                }
            }
            request_response::Event::InboundFailure { peer, error, .. } => {
                debug!(peer = %peer, error = %error, "inbound request failed");
            }
            request_response::Event::ResponseSent { .. } => {}
        }
    }

    async fn dispatch_inbound(&mut self, peer: PeerId, message: Message) {
        match message.msg_type.as_str() {
            msg_type::GETADDR => {
                let shareable = self.known_addresses.read().await.shareable(QUALITY_SHAREABLE, ADDR_REPLY_LIMIT);
                let list = AddrList {
                    addresses: shareable.into_iter().map(|a| AddrEntry { host: a.host, port: a.port }).collect(),
                };
                let data = bincode::serialize(&list).expect("AddrList serialization is infallible");
                let from = self.swarm.local_peer_id().to_string();
                let msg = Message::new(msg_type::ADDR, data, from);
                self.swarm.behaviour_mut().request_response.send_request(&peer, msg);
            }
            msg_type::ADDR => {
                if let Ok(list) = bincode::deserialize::<AddrList>(&message.data) {
                    let mut table = self.known_addresses.write().await;
                    for entry in list.addresses {
                        if entry.host.parse::<std::net::IpAddr>().is_ok() && entry.port != 0 {
                            table.seed(&entry.host, entry.port);
                        }
                    }
                }
            }
            other => {
                let handler = self.handlers.read().await.get(other).cloned();
                if let Some(handler) = handler {
                    handler(message);
                }
            }
        }
    }
}

/// Periodic discovery loop (§4.4.2): if below `MIN_PEERS`, select
/// candidates from the known-address table and attempt connections.
pub async fn run_discovery_loop(handle: OverlayHandle, config: P2pConfig, mut shutdown_rx: watch::Receiver<bool>) {
    let mut interval = tokio::time::interval(Duration::from_secs(DISCOVERY_INTERVAL_SECS));
    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => { if *shutdown_rx.borrow() { break; } }
            _ = interval.tick() => {
                discover_once(&handle, &config).await;
            }
        }
    }
}

async fn discover_once(handle: &OverlayHandle, _config: &P2pConfig) {
    let peer_count = handle.peer_count().await;
    if peer_count >= MIN_PEERS {
        return;
    }
    let connected: Vec<String> = handle
        .peer_table
        .read()
        .await
        .remote_addrs()
        .iter()
        .filter_map(|addr| multiaddr_to_host_port(addr))
        .map(|(host, port)| KnownAddress::key(&host, port))
        .collect();
    let candidates = {
        let table = handle.known_addresses.read().await;
        table.candidates(&connected, QUALITY_MIN_CANDIDATE)
    };
    let need = (MIN_PEERS - peer_count).min(MAX_PEERS.saturating_sub(peer_count));
    for candidate in candidates.into_iter().take(need) {
        let addr: Multiaddr = match format!("/ip4/{}/tcp/{}", candidate.host, candidate.port).parse() {
            Ok(a) => a,
            Err(_) => continue,
        };
        let _ = handle
            .command_tx
            .send(Command::Dial { addr, known_key: (candidate.host, candidate.port) })
            .await;
    }
}

/// Address-exchange loop (§4.4.3): ask every connected peer for its known
/// addresses.
pub async fn run_addr_exchange_loop(handle: OverlayHandle, mut shutdown_rx: watch::Receiver<bool>) {
    let mut interval = tokio::time::interval(Duration::from_secs(ADDR_EXCHANGE_INTERVAL_SECS));
    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => { if *shutdown_rx.borrow() { break; } }
            _ = interval.tick() => {
                let peers: Vec<PeerId> = handle.peer_table.read().await.peer_ids();
                for peer in peers {
                    let _ = handle.send_to(&peer.to_string(), msg_type::GETADDR, Vec::new()).await;
                }
            }
        }
    }
}

/// Maintenance loop (§4.4.4): trigger discovery when under-peered, evict
/// stale known addresses.
pub async fn run_maintenance_loop(handle: OverlayHandle, config: P2pConfig, mut shutdown_rx: watch::Receiver<bool>) {
    let mut interval = tokio::time::interval(Duration::from_secs(MAINTENANCE_INTERVAL_SECS));
    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => { if *shutdown_rx.borrow() { break; } }
            _ = interval.tick() => {
                if handle.peer_count().await < MIN_PEERS {
                    discover_once(&handle, &config).await;
                }
                handle.known_addresses.write().await.evict_stale();
                handle.peer_table.write().await.evict_stale(PEER_STALENESS_SECS);
            }
        }
    }
}

fn parse_host_port(s: &str) -> Option<(String, u16)> {
    let s = s.trim();
    let (host, port) = s.rsplit_once(':')?;
    let port: u16 = port.parse().ok()?;
    Some((host.to_string(), port))
}

/// Recover the `(host, port)` the overlay dialed from a connection's remote
/// multiaddr, e.g. `/ip4/1.2.3.4/tcp/30333`. Used to key peer-table entries
/// against the known-address table, which is keyed by `host:port`.
fn multiaddr_to_host_port(s: &str) -> Option<(String, u16)> {
    let addr: Multiaddr = s.parse().ok()?;
    let mut host = None;
    let mut port = None;
    for proto in addr.iter() {
        match proto {
            Protocol::Ip4(ip) => host = Some(ip.to_string()),
            Protocol::Ip6(ip) => host = Some(ip.to_string()),
            Protocol::Dns(d) | Protocol::Dns4(d) | Protocol::Dns6(d) => host = Some(d.to_string()),
            Protocol::Tcp(p) => port = Some(p),
            _ => {}
        }
    }
    Some((host?, port?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_host_port_accepts_host_colon_port() {
        assert_eq!(parse_host_port("127.0.0.1:30333"), Some(("127.0.0.1".to_string(), 30333)));
    }

    #[test]
    fn parse_host_port_rejects_missing_port() {
        assert_eq!(parse_host_port("127.0.0.1"), None);
    }

    #[test]
    fn multiaddr_to_host_port_reads_ip4_tcp() {
        assert_eq!(
            multiaddr_to_host_port("/ip4/127.0.0.1/tcp/30333"),
            Some(("127.0.0.1".to_string(), 30333))
        );
    }

    #[test]
    fn multiaddr_to_host_port_rejects_addresses_without_tcp() {
        assert_eq!(multiaddr_to_host_port("/ip4/127.0.0.1"), None);
    }
}
