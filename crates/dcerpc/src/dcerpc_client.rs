//! DCE RPC client
//!
//! Connects over TCP, binds one presentation context with the NDR 2.0
//! transfer syntax, then issues requests on that context. Calls are
//! serialized on the connection.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use bytes::Bytes;
use ndr::NdrContext;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, trace};

use crate::dcerpc::{BindPdu, ContextResult, DataRepresentation, Pdu, RequestPdu, SyntaxId};
use crate::dcerpc_transport::{DceRpcTransport, DEFAULT_MAX_PDU_SIZE};
use crate::error::{Result, RpcError};
use crate::fragmentation::{FragmentAssembler, FragmentGenerator};

/// Client-side connection settings
#[derive(Debug, Clone)]
pub struct DceRpcClientConfig {
    /// Largest fragment this client sends (before negotiation)
    pub max_xmit_frag: u16,
    /// Largest fragment this client accepts
    pub max_recv_frag: u16,
    /// Largest PDU the transport reads
    pub max_pdu_size: usize,
    /// Largest reassembled response stub
    pub max_response_size: usize,
    /// Byte order of outgoing PDUs and request stubs
    pub ndr: NdrContext,
    pub connect_timeout: Option<Duration>,
    /// Applies to each call, from the first request fragment to the last
    /// response fragment
    pub call_timeout: Option<Duration>,
}

impl Default for DceRpcClientConfig {
    fn default() -> Self {
        Self {
            max_xmit_frag: 4280,
            max_recv_frag: 4280,
            max_pdu_size: DEFAULT_MAX_PDU_SIZE,
            max_response_size: 4 * 1024 * 1024,
            ndr: NdrContext::default(),
            connect_timeout: None,
            call_timeout: None,
        }
    }
}

/// Reassembled response stub and the byte order it was written in
#[derive(Debug, Clone, PartialEq)]
pub struct CallResponse {
    pub stub: Bytes,
    pub ndr: NdrContext,
}

/// DCE RPC client for one interface on one connection
pub struct DceRpcClient {
    transport: Mutex<DceRpcTransport<TcpStream>>,
    call_id_counter: AtomicU32,
    interface: SyntaxId,
    config: DceRpcClientConfig,
    context_id: u16,
    max_xmit_frag: u16,
    max_recv_frag: u16,
    is_bound: bool,
}

impl DceRpcClient {
    /// Connect and bind with the default configuration
    pub async fn connect(addr: SocketAddr, interface: SyntaxId) -> Result<Self> {
        Self::connect_with_config(addr, interface, DceRpcClientConfig::default()).await
    }

    pub async fn connect_with_config(
        addr: SocketAddr,
        interface: SyntaxId,
        config: DceRpcClientConfig,
    ) -> Result<Self> {
        let stream = match config.connect_timeout {
            Some(timeout) => tokio::time::timeout(timeout, TcpStream::connect(addr))
                .await
                .map_err(|_| RpcError::Timeout)??,
            None => TcpStream::connect(addr).await?,
        };
        let mut client = Self::from_stream(stream, interface, config);
        client.bind().await?;
        Ok(client)
    }

    /// Wrap an existing connection; the client starts unbound
    pub fn from_stream(stream: TcpStream, interface: SyntaxId, config: DceRpcClientConfig) -> Self {
        let transport = DceRpcTransport::new(stream).with_max_pdu_size(config.max_pdu_size);
        Self {
            transport: Mutex::new(transport),
            call_id_counter: AtomicU32::new(1),
            interface,
            context_id: 0,
            max_xmit_frag: config.max_xmit_frag,
            max_recv_frag: config.max_recv_frag,
            config,
            is_bound: false,
        }
    }

    fn next_call_id(&self) -> u32 {
        self.call_id_counter.fetch_add(1, Ordering::Relaxed)
    }

    /// Perform the bind handshake
    pub async fn bind(&mut self) -> Result<()> {
        let call_id = self.next_call_id();
        let mut bind = BindPdu::new(call_id, self.interface);
        bind.header.data_rep = DataRepresentation::from_context(self.config.ndr);
        bind.max_xmit_frag = self.config.max_xmit_frag;
        bind.max_recv_frag = self.config.max_recv_frag;

        debug!("Sending bind: call_id={}, interface={}", call_id, self.interface);

        let pdu = {
            let transport = self.transport.get_mut();
            transport.write_pdu(&bind.encode()?).await?;
            transport.read_pdu_decoded().await?
        };

        match pdu {
            Pdu::BindAck(ack) => {
                if ack.header.call_id != call_id {
                    return Err(RpcError::CallIdMismatch {
                        expected: call_id,
                        got: ack.header.call_id,
                    });
                }
                let result = ack
                    .results
                    .first()
                    .ok_or_else(|| RpcError::BindFailed("no presentation context result".into()))?;
                if result.result != ContextResult::Acceptance {
                    return Err(RpcError::BindFailed(format!(
                        "{:?} (reason {})",
                        result.result, result.reason
                    )));
                }

                self.max_xmit_frag = self.config.max_xmit_frag.min(ack.max_recv_frag);
                self.max_recv_frag = self.config.max_recv_frag.min(ack.max_xmit_frag);
                self.is_bound = true;
                debug!(
                    "Bind accepted: max_xmit={}, max_recv={}",
                    self.max_xmit_frag, self.max_recv_frag
                );
                Ok(())
            }
            Pdu::BindNak(nak) => Err(RpcError::BindFailed(format!(
                "bind_nak reason {}",
                nak.reject_reason
            ))),
            Pdu::Fault(fault) => Err(RpcError::Fault(fault.status)),
            other => Err(RpcError::InvalidMessageType(other.header().packet_type as u8)),
        }
    }

    /// Issue one call with already-marshalled stub data.
    ///
    /// Requests larger than the negotiated fragment size are fragmented and
    /// fragmented responses are reassembled. A fault PDU becomes
    /// [`RpcError::Fault`].
    pub async fn call(&self, opnum: u16, stub_data: Bytes) -> Result<CallResponse> {
        if !self.is_bound {
            return Err(RpcError::NotBound);
        }
        let exchange = self.exchange(opnum, stub_data);
        match self.config.call_timeout {
            Some(timeout) => tokio::time::timeout(timeout, exchange)
                .await
                .map_err(|_| RpcError::Timeout)?,
            None => exchange.await,
        }
    }

    async fn exchange(&self, opnum: u16, stub_data: Bytes) -> Result<CallResponse> {
        let mut transport = self.transport.lock().await;
        let call_id = self.next_call_id();

        let mut request = RequestPdu::new(call_id, opnum, stub_data);
        request.context_id = self.context_id;
        request.header.data_rep = DataRepresentation::from_context(self.config.ndr);

        let fragments = FragmentGenerator::fragment_request(&request, self.max_xmit_frag);
        debug!(
            "Sending request: call_id={}, opnum={}, stub_len={}, fragments={}",
            call_id,
            opnum,
            request.stub_data.len(),
            fragments.len()
        );
        for fragment in &fragments {
            transport.write_pdu(&fragment.encode()?).await?;
        }

        let mut assembler = FragmentAssembler::new(self.config.max_response_size);
        loop {
            match transport.read_pdu_decoded().await? {
                Pdu::Response(response) => {
                    if response.header.call_id != call_id {
                        return Err(RpcError::CallIdMismatch {
                            expected: call_id,
                            got: response.header.call_id,
                        });
                    }
                    let ndr = response.header.data_rep.context();
                    if let Some(stub) = assembler.add_fragment(&response.header, &response.stub_data)? {
                        trace!("Response complete: call_id={}, {} bytes", call_id, stub.len());
                        return Ok(CallResponse { stub, ndr });
                    }
                }
                Pdu::Fault(fault) => {
                    if fault.header.call_id != call_id {
                        return Err(RpcError::CallIdMismatch {
                            expected: call_id,
                            got: fault.header.call_id,
                        });
                    }
                    debug!("Call {} faulted: status=0x{:08x}", call_id, fault.status);
                    return Err(RpcError::Fault(fault.status));
                }
                other => {
                    return Err(RpcError::InvalidMessageType(other.header().packet_type as u8));
                }
            }
        }
    }

    pub fn interface(&self) -> &SyntaxId {
        &self.interface
    }

    pub fn is_bound(&self) -> bool {
        self.is_bound
    }

    /// Byte order used for request stubs
    pub fn ndr_context(&self) -> NdrContext {
        self.config.ndr
    }

    /// Negotiated fragment sizes as (xmit, recv)
    pub fn fragment_sizes(&self) -> (u16, u16) {
        (self.max_xmit_frag, self.max_recv_frag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DceRpcClientConfig::default();
        assert_eq!(config.max_xmit_frag, 4280);
        assert_eq!(config.max_recv_frag, 4280);
        assert!(config.ndr.little_endian);
        assert_eq!(config.call_timeout, None);
    }

    #[tokio::test]
    async fn test_call_requires_bind() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let stream = TcpStream::connect(addr).await.unwrap();
        let client = DceRpcClient::from_stream(
            stream,
            crate::dcerpc::NDR_TRANSFER_SYNTAX,
            DceRpcClientConfig::default(),
        );
        assert!(!client.is_bound());
        assert!(matches!(client.call(0, Bytes::new()).await, Err(RpcError::NotBound)));
    }
}
