//! Country/region/city lookup for click enrichment.

use std::net::IpAddr;
use std::path::Path;

use maxminddb::{Reader, geoip2};
use tracing::{info, warn};

/// Country code recorded when an address cannot be located.
pub const UNKNOWN_COUNTRY: &str = "XX";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeoLocation {
    pub country_code: String,
    pub city: String,
    pub region: String,
}

impl GeoLocation {
    pub fn unknown() -> Self {
        Self {
            country_code: UNKNOWN_COUNTRY.to_string(),
            city: String::new(),
            region: String::new(),
        }
    }
}

/// Built once at startup and shared as `Arc<GeoIpResolver>`.
pub struct GeoIpResolver {
    reader: Option<Reader<Vec<u8>>>,
}

impl GeoIpResolver {
    /// Open the MaxMind database at `path`. A missing or unreadable file yields a
    /// disabled resolver.
    pub fn open(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            info!("GeoIP database not configured, click locations disabled");
            return Self::disabled();
        };

        match Reader::open_readfile(path) {
            Ok(reader) => {
                info!(path = %path.display(), "GeoIP database loaded");
                Self {
                    reader: Some(reader),
                }
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to open GeoIP database, click locations disabled");
                Self::disabled()
            }
        }
    }

    pub fn disabled() -> Self {
        Self { reader: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.reader.is_some()
    }

    /// Never fails; anything that cannot be resolved is [`GeoLocation::unknown`].
    pub fn lookup(&self, ip: &str) -> GeoLocation {
        let Some(reader) = &self.reader else {
            return GeoLocation::unknown();
        };
        let Ok(addr) = ip.trim().parse::<IpAddr>() else {
            return GeoLocation::unknown();
        };

        let city = match reader.lookup::<geoip2::City>(addr) {
            Ok(Some(city)) => city,
            Ok(None) => return GeoLocation::unknown(),
            Err(e) => {
                warn!(ip, error = %e, "GeoIP lookup failed");
                return GeoLocation::unknown();
            }
        };

        let country_code = city
            .country
            .as_ref()
            .and_then(|c| c.iso_code)
            .filter(|code| !code.is_empty())
            .unwrap_or(UNKNOWN_COUNTRY)
            .to_string();

        let city_name = city
            .city
            .as_ref()
            .and_then(|c| c.names.as_ref())
            .and_then(|names| names.get("en").copied())
            .unwrap_or_default()
            .to_string();

        let region = city
            .subdivisions
            .as_ref()
            .and_then(|subs| subs.first())
            .and_then(|sub| {
                sub.names
                    .as_ref()
                    .and_then(|names| names.get("en").copied())
                    .or(sub.iso_code)
            })
            .unwrap_or_default()
            .to_string();

        GeoLocation {
            country_code,
            city: city_name,
            region,
        }
    }
}
