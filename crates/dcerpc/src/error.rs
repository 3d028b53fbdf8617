//! Error types for DCE RPC

use ndr::NdrError;
use thiserror::Error;

use crate::dcerpc::FaultStatus;

/// RPC error types
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("NDR error: {0}")]
    Ndr(#[from] NdrError),

    #[error("DCE RPC version mismatch: expected {expected}, got {got}")]
    VersionMismatch { expected: u8, got: u8 },

    #[error("interface not found: {0}")]
    InterfaceNotFound(String),

    #[error("operation unavailable: {0}")]
    OperationUnavailable(u16),

    #[error("invalid PDU: {0}")]
    InvalidPduData(String),

    #[error("invalid message type: {0}")]
    InvalidMessageType(u8),

    #[error("bind failed: {0}")]
    BindFailed(String),

    #[error("not bound")]
    NotBound,

    #[error("connection closed")]
    ConnectionClosed,

    #[error("timeout")]
    Timeout,

    #[error("fault: status 0x{0:08x}")]
    Fault(u32),

    #[error("context mismatch")]
    ContextMismatch,

    #[error("call ID mismatch: expected {expected}, got {got}")]
    CallIdMismatch { expected: u32, got: u32 },

    #[error("PDU too large: {size} bytes exceeds maximum {max}")]
    PduTooLarge { size: usize, max: usize },

    #[error("server error: {0}")]
    Server(String),
}

impl RpcError {
    /// Fault status reported to the caller when a handler fails with this error
    pub fn fault_status(&self) -> u32 {
        match self {
            RpcError::OperationUnavailable(_) => FaultStatus::OpRngError as u32,
            RpcError::InterfaceNotFound(_) => FaultStatus::UnkIf as u32,
            RpcError::Ndr(_) => FaultStatus::FaultNdr as u32,
            RpcError::ContextMismatch => FaultStatus::ContextMismatch as u32,
            RpcError::Fault(status) => *status,
            _ => FaultStatus::FaultUnspec as u32,
        }
    }
}

pub type Result<T> = std::result::Result<T, RpcError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_mapping() {
        assert_eq!(RpcError::OperationUnavailable(7).fault_status(), 0x1c010002);
        assert_eq!(RpcError::InterfaceNotFound("x".into()).fault_status(), 0x1c010003);
        assert_eq!(
            RpcError::Ndr(NdrError::InvalidEnumValue(9)).fault_status(),
            0x000006f7
        );
        assert_eq!(RpcError::Fault(0x5).fault_status(), 0x5);
        assert_eq!(RpcError::Timeout.fault_status(), 0x1c000012);
    }
}
