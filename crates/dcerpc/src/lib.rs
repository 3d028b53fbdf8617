//! DCE RPC (MS-RPCE) connection-oriented client and server
//!
//! A wire-compatible implementation of the DCE 1.1 RPC connection-oriented
//! protocol over TCP, with NDR 2.0 as the only transfer syntax. Stub data is
//! marshalled by the `ndr` crate.
//!
//! # Features
//!
//! - bind / bind_ack / bind_nak negotiation
//! - Request and response fragmentation
//! - Async server and client using Tokio
//! - Fault PDUs mapped to and from [`RpcError`]
//!
//! # Example
//!
//! ## TCP Server
//!
//! ```no_run
//! use dcerpc::{DceRpcServer, InterfaceBuilder};
//! use bytes::Bytes;
//!
//! #[tokio::main]
//! async fn main() {
//!     let interface = InterfaceBuilder::new(
//!         "12345678-1234-1234-1234-123456789012",
//!         1,
//!         0,
//!     )
//!     .unwrap()
//!     // Operation 0: echo the stub back
//!     .operation(0, |_ctx, stub: Bytes| async move { Ok(stub) })
//!     .build();
//!
//!     let server = DceRpcServer::new();
//!     server.register_interface(interface).await;
//!     server.run("127.0.0.1:12345".parse().unwrap()).await.unwrap();
//! }
//! ```
//!
//! ## TCP Client
//!
//! ```no_run
//! use dcerpc::{DceRpcClient, SyntaxId, Uuid};
//! use bytes::Bytes;
//!
//! #[tokio::main]
//! async fn main() {
//!     let interface = SyntaxId::new(
//!         Uuid::parse("12345678-1234-1234-1234-123456789012").unwrap(),
//!         1,
//!         0,
//!     );
//!
//!     let client = DceRpcClient::connect("127.0.0.1:12345".parse().unwrap(), interface)
//!         .await
//!         .unwrap();
//!
//!     let response = client.call(0, Bytes::from("hello")).await.unwrap();
//!     assert_eq!(response.stub.as_ref(), b"hello");
//! }
//! ```

pub mod error;

pub mod dcerpc;
pub mod dcerpc_client;
pub mod dcerpc_server;
pub mod dcerpc_transport;
pub mod fragmentation;

pub use error::{Result, RpcError};

pub use dcerpc::{
    provider_reason,
    BindAckPdu,
    BindNakPdu,
    BindPdu,
    BindResult,
    CharRep,
    ContextElement,
    ContextResult,
    DataRepresentation,
    FaultPdu,
    FaultStatus,
    FloatRep,
    IntRep,
    PacketFlags,
    PacketType,
    Pdu,
    PduHeader,
    RequestPdu,
    ResponsePdu,
    SyntaxId,
    Uuid,
    DCE_RPC_VERSION,
    DCE_RPC_VERSION_MINOR,
    NDR_SYNTAX_UUID,
    NDR_SYNTAX_VERSION,
    NDR_TRANSFER_SYNTAX,
};
pub use dcerpc_client::{CallResponse, DceRpcClient, DceRpcClientConfig};
pub use dcerpc_server::{
    CallContext, DceRpcServer, DceRpcServerConfig, Interface, InterfaceBuilder, OperationHandler,
    ServerStats, ServerStatsSnapshot,
};
pub use dcerpc_transport::{DceRpcTransport, DEFAULT_MAX_PDU_SIZE};
pub use fragmentation::{FragmentAssembler, FragmentGenerator};
