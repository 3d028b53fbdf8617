//! Common definitions shared between client and server

/// Default server address
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 6700;

/// Version reported by `R_DhcpGetVersion`
#[allow(dead_code)]
pub const SERVER_VERSION_MAJOR: u32 = 10;
#[allow(dead_code)]
pub const SERVER_VERSION_MINOR: u32 = 0;
