//! Socks Probe - batch checker for local SOCKS5 listeners
//!
//! Reads a list of local SOCKS5 listeners (typically one per upstream node of
//! a Clash profile), fetches an IP geolocation document through each of them,
//! and writes a CSV report with the egress address, location, ISP and latency.

pub mod proxy;

pub use proxy::*;

/// Library result type
pub type Result<T> = std::result::Result<T, proxy::Error>;
