//! DCE RPC server
//!
//! Connection-oriented server over TCP:
//!
//! - Each connection handled in a separate Tokio task
//! - Semaphore-based connection limiting
//! - Interface registry keyed by interface UUID
//! - Request reassembly and response fragmentation
//! - Server statistics and graceful shutdown

use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use futures::future::BoxFuture;
use ndr::NdrContext;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{watch, RwLock, Semaphore};
use tracing::{debug, error, info, warn};

use crate::dcerpc::{
    provider_reason, BindAckPdu, BindNakPdu, BindPdu, BindResult, FaultPdu, FaultStatus,
    PacketFlags, Pdu, RequestPdu, ResponsePdu, SyntaxId, Uuid, NDR_TRANSFER_SYNTAX,
};
use crate::dcerpc_transport::{DceRpcTransport, DEFAULT_MAX_PDU_SIZE};
use crate::error::{Result, RpcError};
use crate::fragmentation::{FragmentAssembler, FragmentGenerator};

/// What a handler knows about the call it is serving
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallContext {
    pub call_id: u32,
    pub context_id: u16,
    pub opnum: u16,
    /// Byte order of the request stub; the response stub is written in it too
    pub ndr: NdrContext,
}

/// Operation handler function type
pub type OperationHandler =
    Arc<dyn Fn(CallContext, Bytes) -> BoxFuture<'static, Result<Bytes>> + Send + Sync>;

/// An interface version and its operations
pub struct Interface {
    pub syntax: SyntaxId,
    operations: HashMap<u16, OperationHandler>,
}

impl Interface {
    pub fn new(uuid: Uuid, major_version: u16, minor_version: u16) -> Self {
        Self::from_syntax(SyntaxId::new(uuid, major_version, minor_version))
    }

    pub fn from_syntax(syntax: SyntaxId) -> Self {
        Self {
            syntax,
            operations: HashMap::new(),
        }
    }

    /// Register an operation handler, replacing any previous one for `opnum`
    pub fn register_operation<F, Fut>(&mut self, opnum: u16, handler: F)
    where
        F: Fn(CallContext, Bytes) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Bytes>> + Send + 'static,
    {
        self.operations
            .insert(opnum, Arc::new(move |ctx, stub| Box::pin(handler(ctx, stub))));
    }

    pub fn get_operation(&self, opnum: u16) -> Option<&OperationHandler> {
        self.operations.get(&opnum)
    }

    pub fn operation_count(&self) -> usize {
        self.operations.len()
    }
}

/// Builder for creating DCE RPC interfaces with a fluent API
pub struct InterfaceBuilder {
    interface: Interface,
}

impl InterfaceBuilder {
    pub fn new(uuid: &str, major_version: u16, minor_version: u16) -> Option<Self> {
        let uuid = Uuid::parse(uuid)?;
        Some(Self::from_syntax(SyntaxId::new(uuid, major_version, minor_version)))
    }

    pub fn from_syntax(syntax: SyntaxId) -> Self {
        Self {
            interface: Interface::from_syntax(syntax),
        }
    }

    pub fn operation<F, Fut>(mut self, opnum: u16, handler: F) -> Self
    where
        F: Fn(CallContext, Bytes) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Bytes>> + Send + 'static,
    {
        self.interface.register_operation(opnum, handler);
        self
    }

    pub fn build(self) -> Interface {
        self.interface
    }
}

/// DCE RPC server configuration
#[derive(Debug, Clone)]
pub struct DceRpcServerConfig {
    pub max_pdu_size: usize,
    pub max_connections: usize,
    pub max_xmit_frag: u16,
    pub max_recv_frag: u16,
    /// Largest reassembled request stub
    pub max_stub_size: usize,
}

impl Default for DceRpcServerConfig {
    fn default() -> Self {
        Self {
            max_pdu_size: DEFAULT_MAX_PDU_SIZE,
            max_connections: 10000,
            max_xmit_frag: 4280,
            max_recv_frag: 4280,
            max_stub_size: 4 * 1024 * 1024,
        }
    }
}

/// Server statistics
#[derive(Debug, Default)]
pub struct ServerStats {
    pub connections_accepted: AtomicU64,
    pub connections_active: AtomicU64,
    pub connections_rejected: AtomicU64,
    pub requests_received: AtomicU64,
    pub requests_processed: AtomicU64,
    pub requests_failed: AtomicU64,
    pub bytes_received: AtomicU64,
    pub bytes_sent: AtomicU64,
}

impl ServerStats {
    pub fn snapshot(&self) -> ServerStatsSnapshot {
        ServerStatsSnapshot {
            connections_accepted: self.connections_accepted.load(Ordering::Relaxed),
            connections_active: self.connections_active.load(Ordering::Relaxed),
            connections_rejected: self.connections_rejected.load(Ordering::Relaxed),
            requests_received: self.requests_received.load(Ordering::Relaxed),
            requests_processed: self.requests_processed.load(Ordering::Relaxed),
            requests_failed: self.requests_failed.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`ServerStats`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerStatsSnapshot {
    pub connections_accepted: u64,
    pub connections_active: u64,
    pub connections_rejected: u64,
    pub requests_received: u64,
    pub requests_processed: u64,
    pub requests_failed: u64,
    pub bytes_received: u64,
    pub bytes_sent: u64,
}

type InterfaceMap = Arc<RwLock<HashMap<Uuid, Interface>>>;

/// DCE RPC server
pub struct DceRpcServer {
    interfaces: InterfaceMap,
    config: DceRpcServerConfig,
    assoc_group_counter: AtomicU32,
    stats: Arc<ServerStats>,
}

impl DceRpcServer {
    pub fn new() -> Self {
        Self::with_config(DceRpcServerConfig::default())
    }

    pub fn with_config(config: DceRpcServerConfig) -> Self {
        Self {
            interfaces: Arc::new(RwLock::new(HashMap::new())),
            config,
            assoc_group_counter: AtomicU32::new(1),
            stats: Arc::new(ServerStats::default()),
        }
    }

    pub fn config(&self) -> &DceRpcServerConfig {
        &self.config
    }

    pub fn stats(&self) -> &Arc<ServerStats> {
        &self.stats
    }

    /// Register an interface, replacing one with the same UUID
    pub async fn register_interface(&self, interface: Interface) {
        info!(
            "Registering interface {} ({} operations)",
            interface.syntax,
            interface.operation_count()
        );
        self.interfaces
            .write()
            .await
            .insert(interface.syntax.uuid, interface);
    }

    /// Bind `addr` and serve until an accept error
    pub async fn run(&self, addr: SocketAddr) -> Result<()> {
        let listener = TcpListener::bind(addr).await?;
        self.serve_until(listener, std::future::pending()).await
    }

    /// Bind `addr` and serve until `shutdown` resolves
    pub async fn run_until<F: Future<Output = ()>>(&self, addr: SocketAddr, shutdown: F) -> Result<()> {
        let listener = TcpListener::bind(addr).await?;
        self.serve_until(listener, shutdown).await
    }

    /// Serve an already bound listener until `shutdown` resolves.
    ///
    /// On shutdown the listener stops accepting, open connections finish the
    /// call in progress and close, and this returns once they are all gone.
    pub async fn serve_until<F: Future<Output = ()>>(
        &self,
        listener: TcpListener,
        shutdown: F,
    ) -> Result<()> {
        let local_addr = listener.local_addr()?;
        info!(
            "DCE RPC server listening on {} (max_connections: {})",
            local_addr, self.config.max_connections
        );

        let semaphore = Arc::new(Semaphore::new(self.config.max_connections));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    info!("Server shutting down gracefully");
                    let _ = shutdown_tx.send(true);
                    let permits = u32::try_from(self.config.max_connections).unwrap_or(u32::MAX);
                    let _ = semaphore.acquire_many(permits).await;
                    info!("All connections closed");
                    return Ok(());
                }

                result = listener.accept() => {
                    let (stream, peer_addr) = result?;

                    let permit = match semaphore.clone().try_acquire_owned() {
                        Ok(permit) => permit,
                        Err(_) => {
                            self.stats.connections_rejected.fetch_add(1, Ordering::Relaxed);
                            warn!("Connection limit reached, rejecting connection from {}", peer_addr);
                            drop(stream);
                            continue;
                        }
                    };

                    self.stats.connections_accepted.fetch_add(1, Ordering::Relaxed);
                    self.stats.connections_active.fetch_add(1, Ordering::Relaxed);
                    debug!("Accepted connection from {}", peer_addr);

                    let connection = Connection {
                        interfaces: Arc::clone(&self.interfaces),
                        config: self.config.clone(),
                        assoc_group_id: self.assoc_group_counter.fetch_add(1, Ordering::Relaxed),
                        stats: Arc::clone(&self.stats),
                        contexts: HashMap::new(),
                        max_xmit_frag: self.config.max_xmit_frag,
                        pending: None,
                    };
                    let shutdown_rx = shutdown_rx.clone();

                    tokio::spawn(async move {
                        let _permit = permit;
                        let stats = Arc::clone(&connection.stats);

                        let result = connection.run(stream, shutdown_rx).await;
                        stats.connections_active.fetch_sub(1, Ordering::Relaxed);

                        match result {
                            Ok(()) | Err(RpcError::ConnectionClosed) => {
                                debug!("Connection closed from {}", peer_addr);
                            }
                            Err(e) => {
                                warn!("Connection error from {}: {}", peer_addr, e);
                            }
                        }
                    });
                }
            }
        }
    }
}

impl Default for DceRpcServer {
    fn default() -> Self {
        Self::new()
    }
}

/// First fragment of a request still being reassembled
struct PendingRequest {
    call_id: u32,
    context_id: u16,
    opnum: u16,
    ndr: NdrContext,
    assembler: FragmentAssembler,
}

/// Per-connection state
struct Connection {
    interfaces: InterfaceMap,
    config: DceRpcServerConfig,
    assoc_group_id: u32,
    stats: Arc<ServerStats>,
    /// Accepted presentation contexts: context id to interface UUID
    contexts: HashMap<u16, Uuid>,
    max_xmit_frag: u16,
    pending: Option<PendingRequest>,
}

impl Connection {
    async fn run(mut self, stream: TcpStream, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let mut transport = DceRpcTransport::new(stream).with_max_pdu_size(self.config.max_pdu_size);

        loop {
            let data = tokio::select! {
                data = transport.read_pdu() => data?,
                _ = shutdown.changed() => return Ok(()),
            };
            self.stats
                .bytes_received
                .fetch_add(data.len() as u64, Ordering::Relaxed);

            let replies = match Pdu::decode(&data)? {
                Pdu::Bind(bind) => {
                    debug!(
                        "Received bind: call_id={}, contexts={}",
                        bind.header.call_id,
                        bind.context_list.len()
                    );
                    vec![self.process_bind(&bind).await]
                }
                Pdu::Request(request) => {
                    self.stats.requests_received.fetch_add(1, Ordering::Relaxed);
                    debug!(
                        "Received request: call_id={}, opnum={}, stub_len={}",
                        request.header.call_id,
                        request.opnum,
                        request.stub_data.len()
                    );
                    self.process_request(request).await
                }
                Pdu::Fault(fault) => {
                    warn!("Received fault from client: 0x{:08x}", fault.status);
                    Vec::new()
                }
                other => {
                    warn!("Unexpected {:?} PDU from client", other.header().packet_type);
                    Vec::new()
                }
            };

            for reply in replies {
                let encoded = reply.encode()?;
                self.stats
                    .bytes_sent
                    .fetch_add(encoded.len() as u64, Ordering::Relaxed);
                transport.write_pdu(&encoded).await?;
            }
        }
    }

    async fn process_bind(&mut self, bind: &BindPdu) -> Pdu {
        let call_id = bind.header.call_id;
        if bind.context_list.is_empty() {
            let mut nak = BindNakPdu::new(call_id, provider_reason::NOT_SPECIFIED);
            nak.header.data_rep = bind.header.data_rep;
            return Pdu::BindNak(nak);
        }

        let interfaces = self.interfaces.read().await;
        let mut ack = BindAckPdu::new(call_id, self.assoc_group_id);
        ack.header.data_rep = bind.header.data_rep;

        for context in &bind.context_list {
            let abstract_syntax = &context.abstract_syntax;
            let known = interfaces
                .get(&abstract_syntax.uuid)
                .is_some_and(|iface| iface.syntax.major_version() == abstract_syntax.major_version());
            let result = if !known {
                BindResult::rejected(provider_reason::ABSTRACT_SYNTAX_NOT_SUPPORTED)
            } else if !context.transfer_syntaxes.contains(&NDR_TRANSFER_SYNTAX) {
                BindResult::rejected(provider_reason::PROPOSED_TRANSFER_SYNTAXES_NOT_SUPPORTED)
            } else {
                self.contexts.insert(context.context_id, abstract_syntax.uuid);
                BindResult::accepted(NDR_TRANSFER_SYNTAX)
            };
            debug!(
                "Context {} for {}: {:?}",
                context.context_id, abstract_syntax, result.result
            );
            ack.results.push(result);
        }

        self.max_xmit_frag = self.config.max_xmit_frag.min(bind.max_recv_frag);
        ack.max_xmit_frag = self.max_xmit_frag;
        ack.max_recv_frag = self.config.max_recv_frag.min(bind.max_xmit_frag);
        Pdu::BindAck(ack)
    }

    /// Feed one request fragment; returns the reply PDUs once the call is complete
    async fn process_request(&mut self, request: RequestPdu) -> Vec<Pdu> {
        let header = &request.header;
        if header.packet_flags.is_first_frag() {
            self.pending = Some(PendingRequest {
                call_id: header.call_id,
                context_id: request.context_id,
                opnum: request.opnum,
                ndr: header.data_rep.context(),
                assembler: FragmentAssembler::new(self.config.max_stub_size),
            });
        }

        let Some(pending) = self.pending.as_mut() else {
            warn!("Request fragment for call {} without FIRST_FRAG", header.call_id);
            self.stats.requests_failed.fetch_add(1, Ordering::Relaxed);
            return vec![self.fault(&request, FaultStatus::FaultUnspec as u32, false)];
        };
        let stub = match pending.assembler.add_fragment(header, &request.stub_data) {
            Ok(Some(stub)) => stub,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!("Dropping call {}: {}", header.call_id, e);
                self.pending = None;
                self.stats.requests_failed.fetch_add(1, Ordering::Relaxed);
                return vec![self.fault(&request, e.fault_status(), false)];
            }
        };
        let Some(pending) = self.pending.take() else {
            return Vec::new();
        };
        let ctx = CallContext {
            call_id: pending.call_id,
            context_id: pending.context_id,
            opnum: pending.opnum,
            ndr: pending.ndr,
        };

        match self.dispatch(ctx, stub).await {
            Ok(result) => {
                self.stats.requests_processed.fetch_add(1, Ordering::Relaxed);
                let mut response = ResponsePdu::new(ctx.call_id, result);
                response.context_id = ctx.context_id;
                response.header.data_rep = request.header.data_rep;
                FragmentGenerator::fragment_response(&response, self.max_xmit_frag)
                    .into_iter()
                    .map(Pdu::Response)
                    .collect()
            }
            Err(e) => {
                self.stats.requests_failed.fetch_add(1, Ordering::Relaxed);
                let not_executed = matches!(
                    e,
                    RpcError::OperationUnavailable(_)
                        | RpcError::InterfaceNotFound(_)
                        | RpcError::ContextMismatch
                );
                if !not_executed {
                    error!("Operation {} failed: {}", ctx.opnum, e);
                }
                vec![self.fault(&request, e.fault_status(), not_executed)]
            }
        }
    }

    /// Resolve the bound interface and run the handler for `ctx.opnum`
    async fn dispatch(&self, ctx: CallContext, stub: Bytes) -> Result<Bytes> {
        let uuid = self
            .contexts
            .get(&ctx.context_id)
            .copied()
            .ok_or(RpcError::ContextMismatch)?;

        let handler = {
            let interfaces = self.interfaces.read().await;
            let interface = interfaces
                .get(&uuid)
                .ok_or_else(|| RpcError::InterfaceNotFound(uuid.to_string()))?;
            Arc::clone(
                interface
                    .get_operation(ctx.opnum)
                    .ok_or(RpcError::OperationUnavailable(ctx.opnum))?,
            )
        };

        handler(ctx, stub).await
    }

    fn fault(&self, request: &RequestPdu, status: u32, not_executed: bool) -> Pdu {
        let mut fault = FaultPdu::new(request.header.call_id, status);
        fault.context_id = request.context_id;
        fault.header.data_rep = request.header.data_rep;
        if not_executed {
            fault.header.packet_flags = fault
                .header
                .packet_flags
                .with(PacketFlags::DID_NOT_EXECUTE);
        }
        Pdu::Fault(fault)
    }
}
