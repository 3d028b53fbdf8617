//! Server side of `dhcpsrv`
//!
//! Implement [`DhcpSrvServer`] for the operations the server supports and
//! register the result of [`create_dhcpsrv_interface`] with a
//! `dcerpc::DceRpcServer`. Operations left at their default body fault with
//! `nca_s_op_rng_error`.

use std::sync::Arc;

use bytes::Bytes;
use dcerpc::{CallContext, Interface, InterfaceBuilder, Result, RpcError};
use tracing::{debug, trace};

use crate::ops::*;
use crate::DHCPSRV_SYNTAX;

macro_rules! define_server_trait {
    ($($opnum:literal => $variant:ident, $method:ident, $idl:literal, $req:ident, $resp:ident;)*) => {
        /// Server trait for the `dhcpsrv` interface, one method per operation
        #[async_trait::async_trait]
        pub trait DhcpSrvServer: Send + Sync + 'static {
            $(
                #[doc = $idl]
                async fn $method(&self, _request: $req) -> Result<$resp> {
                    Err(RpcError::OperationUnavailable(Opnum::$variant as u16))
                }
            )*
        }

        /// Create a DCE RPC interface from an implementation
        pub fn create_dhcpsrv_interface<T: DhcpSrvServer>(impl_: Arc<T>) -> Interface {
            InterfaceBuilder::from_syntax(DHCPSRV_SYNTAX)
                $(
                    .operation(Opnum::$variant as u16, {
                        let impl_ = impl_.clone();
                        move |ctx: CallContext, stub: Bytes| {
                            let impl_ = impl_.clone();
                            async move {
                                let request: $req = decode_request(Opnum::$variant, &ctx, stub)?;
                                let response = impl_.$method(request).await?;
                                encode_response(Opnum::$variant, &ctx, &response)
                            }
                        }
                    })
                )*
                .build()
        }
    };
}

dhcpsrv_operations!(define_server_trait);

fn decode_request<Req: ndr::NdrDecode>(opnum: Opnum, ctx: &CallContext, stub: Bytes) -> Result<Req> {
    debug!(
        "Handling {}: call_id={}, stub_len={}",
        opnum,
        ctx.call_id,
        stub.len()
    );
    ndr::from_bytes(stub, ctx.ndr).map_err(|e| {
        debug!("Failed to decode {} request: {}", opnum, e);
        RpcError::Ndr(e)
    })
}

fn encode_response<Resp: ndr::NdrEncode + DhcpResponse>(
    opnum: Opnum,
    ctx: &CallContext,
    response: &Resp,
) -> Result<Bytes> {
    trace!(
        "{} returned 0x{:08x}: call_id={}",
        opnum,
        response.return_value(),
        ctx.call_id
    );
    Ok(ndr::to_bytes(response, ctx.ndr)?)
}
