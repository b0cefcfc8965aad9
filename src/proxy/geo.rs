//! Geolocation document returned by the IP lookup endpoint
//!
//! Field names of ipinfo.io (`ip`, `city`, `region`, `country`, `org`) and
//! ip-api.com (`query`, `city`, `regionName`, `country`, `isp`) are both accepted.

use crate::proxy::models::Egress;
use serde::{Deserialize, Serialize};

/// Placeholder for fields the endpoint did not report
pub const UNKNOWN_FIELD: &str = "-";

/// Geographic information about the egress address of a proxy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct GeoLocation {
    #[serde(default, alias = "query")]
    pub ip: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default, rename = "regionName")]
    pub region_name: Option<String>,
    #[serde(default)]
    pub isp: Option<String>,
    #[serde(default)]
    pub org: Option<String>,
}

impl GeoLocation {
    /// Decode a lookup response body
    pub fn from_slice(body: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(body)
    }

    /// Egress IP, if the endpoint reported a non-empty one
    pub fn remote_ip(&self) -> Option<&str> {
        non_empty(&self.ip)
    }

    /// City, falling back to the region name
    pub fn locality(&self) -> Option<&str> {
        non_empty(&self.city)
            .or_else(|| non_empty(&self.region_name))
            .or_else(|| non_empty(&self.region))
    }

    /// ISP, falling back to the organisation (ipinfo reports the ASN owner there)
    pub fn provider(&self) -> Option<&str> {
        non_empty(&self.isp).or_else(|| non_empty(&self.org))
    }

    /// Turn the document into egress details; `None` without an IP
    pub fn into_egress(self, latency_ms: f64) -> Option<Egress> {
        let remote_ip = self.remote_ip()?.to_string();
        Some(Egress {
            remote_ip,
            country: non_empty(&self.country).unwrap_or(UNKNOWN_FIELD).to_string(),
            city: self.locality().unwrap_or(UNKNOWN_FIELD).to_string(),
            isp: self.provider().unwrap_or(UNKNOWN_FIELD).to_string(),
            latency_ms,
        })
    }
}

impl std::fmt::Display for GeoLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<&str> = [self.locality(), non_empty(&self.country), self.provider()]
            .into_iter()
            .flatten()
            .collect();

        if parts.is_empty() {
            write!(f, "Unknown Location")
        } else {
            write!(f, "{}", parts.join(", "))
        }
    }
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}
