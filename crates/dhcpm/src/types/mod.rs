//! Wire types of the `dhcpsrv` interface

pub mod client;
pub mod common;
pub mod config;
pub mod mib;
pub mod option;
pub mod scan;
pub mod subnet;

pub use client::*;
pub use common::*;
pub use config::*;
pub use mib::*;
pub use option::*;
pub use scan::*;
pub use subnet::*;
