//! DCE RPC transport layer
//!
//! Over TCP, PDUs are self-delimiting through the `frag_length` field of
//! the common header.

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::trace;

use crate::dcerpc::{Pdu, PduHeader};
use crate::error::{Result, RpcError};

/// Largest fragment accepted by default (a `u16` frag_length can not exceed it)
pub const DEFAULT_MAX_PDU_SIZE: usize = 65535;

/// Reads and writes whole PDUs on a byte stream
pub struct DceRpcTransport<T> {
    inner: T,
    max_pdu_size: usize,
    read_buf: BytesMut,
}

impl<T> DceRpcTransport<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            max_pdu_size: DEFAULT_MAX_PDU_SIZE,
            read_buf: BytesMut::with_capacity(8192),
        }
    }

    pub fn with_max_pdu_size(mut self, max_size: usize) -> Self {
        self.max_pdu_size = max_size;
        self
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: AsyncRead + Unpin> DceRpcTransport<T> {
    /// Read one complete fragment
    pub async fn read_pdu(&mut self) -> Result<Bytes> {
        self.fill_to(PduHeader::SIZE).await?;

        let header = PduHeader::decode(&self.read_buf)?;
        let frag_length = header.frag_length as usize;
        if frag_length < PduHeader::SIZE {
            return Err(RpcError::InvalidPduData(format!(
                "fragment length {frag_length} is shorter than the header"
            )));
        }
        if frag_length > self.max_pdu_size {
            return Err(RpcError::PduTooLarge {
                size: frag_length,
                max: self.max_pdu_size,
            });
        }

        self.fill_to(frag_length).await?;
        trace!(frag_length, ptype = ?header.packet_type, "read fragment");
        Ok(self.read_buf.split_to(frag_length).freeze())
    }

    pub async fn read_pdu_decoded(&mut self) -> Result<Pdu> {
        let data = self.read_pdu().await?;
        Pdu::decode(&data)
    }

    async fn fill_to(&mut self, len: usize) -> Result<()> {
        while self.read_buf.len() < len {
            if self.inner.read_buf(&mut self.read_buf).await? == 0 {
                return Err(if self.read_buf.is_empty() {
                    RpcError::ConnectionClosed
                } else {
                    RpcError::Io(std::io::Error::new(
                        std::io::ErrorKind::UnexpectedEof,
                        format!("incomplete PDU: expected {len} bytes, got {}", self.read_buf.len()),
                    ))
                });
            }
        }
        Ok(())
    }
}

impl<T: AsyncWrite + Unpin> DceRpcTransport<T> {
    /// Write an already encoded fragment
    pub async fn write_pdu(&mut self, data: &[u8]) -> Result<()> {
        self.inner.write_all(data).await?;
        self.inner.flush().await?;
        Ok(())
    }

    pub async fn write_pdu_encoded(&mut self, pdu: &Pdu) -> Result<()> {
        let data = pdu.encode()?;
        self.write_pdu(&data).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dcerpc::RequestPdu;
    use tokio::io::duplex;

    #[tokio::test]
    async fn test_pdu_roundtrip() {
        let (client, server) = duplex(1024);
        let mut client_transport = DceRpcTransport::new(client);
        let mut server_transport = DceRpcTransport::new(server);

        let write_handle = tokio::spawn(async move {
            let request = RequestPdu::new(1, 0, Bytes::from_static(b"hello"));
            client_transport
                .write_pdu_encoded(&Pdu::Request(request))
                .await
                .unwrap();
        });

        match server_transport.read_pdu_decoded().await.unwrap() {
            Pdu::Request(req) => {
                assert_eq!(req.header.call_id, 1);
                assert_eq!(req.opnum, 0);
                assert_eq!(req.stub_data.as_ref(), b"hello");
            }
            other => panic!("expected request PDU, got {:?}", other),
        }

        write_handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_multiple_pdus_in_one_read() {
        let (client, server) = duplex(4096);
        let mut client_transport = DceRpcTransport::new(client);
        let mut server_transport = DceRpcTransport::new(server);

        let mut batch = Vec::new();
        for i in 0..3u32 {
            let request = RequestPdu::new(i, i as u16, Bytes::from(format!("msg{i}")));
            batch.extend_from_slice(&request.encode().unwrap());
        }
        client_transport.write_pdu(&batch).await.unwrap();

        for i in 0..3u32 {
            match server_transport.read_pdu_decoded().await.unwrap() {
                Pdu::Request(req) => {
                    assert_eq!(req.header.call_id, i);
                    assert_eq!(req.opnum, i as u16);
                }
                other => panic!("expected request PDU, got {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_rejects_oversized_fragment() {
        let (client, server) = duplex(4096);
        let mut client_transport = DceRpcTransport::new(client);
        let mut server_transport = DceRpcTransport::new(server).with_max_pdu_size(32);

        let request = RequestPdu::new(1, 0, Bytes::from(vec![0u8; 64]));
        client_transport.write_pdu(&request.encode().unwrap()).await.unwrap();

        assert!(matches!(
            server_transport.read_pdu().await,
            Err(RpcError::PduTooLarge { size: 88, max: 32 })
        ));
    }

    #[tokio::test]
    async fn test_clean_close() {
        let (client, server) = duplex(64);
        drop(client);
        let mut server_transport = DceRpcTransport::new(server);
        assert!(matches!(
            server_transport.read_pdu().await,
            Err(RpcError::ConnectionClosed)
        ));
    }
}
