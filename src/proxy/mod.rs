//! Proxy module for probing local SOCKS5 listeners
//!
//! This module provides functionality for:
//! - Loading the listener list from YAML
//! - Probing each listener through a SOCKS5 tunnel to a geolocation endpoint
//! - Running probes concurrently while keeping results in input order
//! - Writing the results as a CSV report

pub mod checker;
pub mod config;
pub mod error;
pub mod geo;
pub mod models;
pub mod report;
pub mod runner;

pub use checker::{ProbeConfig, Prober, ProxyChecker};
pub use config::ConfigLoader;
pub use error::Error;
pub use geo::GeoLocation;
pub use models::{Egress, Locale, ProbeOutcome, ProbeResult, ProxyDescriptor, StatusCode};
pub use report::{top_successes, ReportWriter, Summary};
pub use runner::BatchRunner;
