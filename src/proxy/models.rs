//! Proxy data models

use clap::ValueEnum;
use std::fmt;

/// One local SOCKS5 listener to probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyDescriptor {
    pub name: String,
    pub display_name: String,
    pub port: u16,
}

impl ProxyDescriptor {
    /// Create a descriptor whose display name is its name
    pub fn new(name: impl Into<String>, port: u16) -> Self {
        let name = name.into();
        Self {
            display_name: name.clone(),
            name,
            port,
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    /// Address of the listener as shown in reports
    pub fn proxy_address(&self) -> String {
        format!("socks5://localhost:{}", self.port)
    }
}

impl fmt::Display for ProxyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.proxy_address())
    }
}

/// Report language for status labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Locale {
    #[default]
    En,
    Zh,
}

/// Flat classification of a probe outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    Success,
    ConnectionFailed,
    Timeout,
    GeolocationLookupFailed,
}

impl StatusCode {
    pub const ALL: [StatusCode; 4] = [
        StatusCode::Success,
        StatusCode::ConnectionFailed,
        StatusCode::Timeout,
        StatusCode::GeolocationLookupFailed,
    ];

    pub fn label(self, locale: Locale) -> &'static str {
        match (self, locale) {
            (StatusCode::Success, Locale::En) => "Success",
            (StatusCode::ConnectionFailed, Locale::En) => "Connection Failed",
            (StatusCode::Timeout, Locale::En) => "Timeout",
            (StatusCode::GeolocationLookupFailed, Locale::En) => "Lookup Failed",
            (StatusCode::Success, Locale::Zh) => "成功",
            (StatusCode::ConnectionFailed, Locale::Zh) => "代理错误",
            (StatusCode::Timeout, Locale::Zh) => "超时",
            (StatusCode::GeolocationLookupFailed, Locale::Zh) => "失败",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label(Locale::En))
    }
}

/// Egress details reported by the lookup endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct Egress {
    pub remote_ip: String,
    pub country: String,
    pub city: String,
    pub isp: String,
    pub latency_ms: f64,
}

/// What happened when a proxy was probed
///
/// Failure variants carry a diagnostic reason for logs; it never reaches the report.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome {
    Success(Egress),
    ConnectionFailed(String),
    Timeout,
    GeolocationLookupFailed(String),
}

/// Result of probing a single descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeResult {
    pub descriptor: ProxyDescriptor,
    pub outcome: ProbeOutcome,
}

impl ProbeResult {
    pub fn success(descriptor: ProxyDescriptor, egress: Egress) -> Self {
        Self {
            descriptor,
            outcome: ProbeOutcome::Success(egress),
        }
    }

    pub fn connection_failed(descriptor: ProxyDescriptor, reason: impl Into<String>) -> Self {
        Self {
            descriptor,
            outcome: ProbeOutcome::ConnectionFailed(reason.into()),
        }
    }

    pub fn timeout(descriptor: ProxyDescriptor) -> Self {
        Self {
            descriptor,
            outcome: ProbeOutcome::Timeout,
        }
    }

    pub fn lookup_failed(descriptor: ProxyDescriptor, reason: impl Into<String>) -> Self {
        Self {
            descriptor,
            outcome: ProbeOutcome::GeolocationLookupFailed(reason.into()),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.outcome {
            ProbeOutcome::Success(_) => StatusCode::Success,
            ProbeOutcome::ConnectionFailed(_) => StatusCode::ConnectionFailed,
            ProbeOutcome::Timeout => StatusCode::Timeout,
            ProbeOutcome::GeolocationLookupFailed(_) => StatusCode::GeolocationLookupFailed,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ProbeOutcome::Success(_))
    }

    pub fn egress(&self) -> Option<&Egress> {
        match &self.outcome {
            ProbeOutcome::Success(egress) => Some(egress),
            _ => None,
        }
    }

    /// Diagnostic reason for failed probes
    pub fn reason(&self) -> Option<&str> {
        match &self.outcome {
            ProbeOutcome::ConnectionFailed(reason)
            | ProbeOutcome::GeolocationLookupFailed(reason) => Some(reason),
            ProbeOutcome::Timeout => Some("timed out"),
            ProbeOutcome::Success(_) => None,
        }
    }

    pub fn remote_ip(&self) -> Option<&str> {
        self.egress().map(|e| e.remote_ip.as_str())
    }

    pub fn country(&self) -> Option<&str> {
        self.egress().map(|e| e.country.as_str())
    }

    pub fn city(&self) -> Option<&str> {
        self.egress().map(|e| e.city.as_str())
    }

    pub fn isp(&self) -> Option<&str> {
        self.egress().map(|e| e.isp.as_str())
    }

    pub fn latency_ms(&self) -> Option<f64> {
        self.egress().map(|e| e.latency_ms)
    }
}
