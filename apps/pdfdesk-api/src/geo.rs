//! Offline IP geolocation
//!
//! Backed by a GeoLite2-City database opened once at startup and shared
//! read-only. Lookups never fail the caller; any problem degrades to
//! missing geolocation.

use std::net::IpAddr;
use std::path::Path;
use std::sync::Arc;

use maxminddb::{geoip2, MaxMindDBError, Reader};

pub const LOCAL: &str = "Local";

/// Country and region names
pub type Location = (Option<String>, Option<String>);

/// Any source able to map a public address to a location
pub trait GeoDatabase: Send + Sync {
    fn locate(&self, ip: IpAddr) -> Result<Location, String>;
}

pub struct MaxMindDatabase {
    reader: Reader<Vec<u8>>,
}

impl MaxMindDatabase {
    pub fn open(path: &Path) -> Result<Self, MaxMindDBError> {
        Ok(Self {
            reader: Reader::open_readfile(path)?,
        })
    }
}

impl GeoDatabase for MaxMindDatabase {
    fn locate(&self, ip: IpAddr) -> Result<Location, String> {
        let city: geoip2::City = match self.reader.lookup(ip) {
            Ok(city) => city,
            Err(MaxMindDBError::AddressNotFoundError(_)) => return Ok((None, None)),
            Err(e) => return Err(e.to_string()),
        };

        let country = city
            .country
            .and_then(|c| english_name(c.names.as_ref()).or(c.iso_code.map(str::to_string)));
        let region = city
            .subdivisions
            .and_then(|subs| subs.into_iter().next())
            .and_then(|s| english_name(s.names.as_ref()).or(s.iso_code.map(str::to_string)));

        Ok((country, region))
    }
}

fn english_name(names: Option<&std::collections::BTreeMap<&str, &str>>) -> Option<String> {
    names.and_then(|n| n.get("en")).map(|s| s.to_string())
}

#[derive(Clone, Default)]
pub struct GeoResolver {
    db: Option<Arc<dyn GeoDatabase>>,
}

impl GeoResolver {
    pub fn new(db: Arc<dyn GeoDatabase>) -> Self {
        Self { db: Some(db) }
    }

    pub fn disabled() -> Self {
        Self { db: None }
    }

    /// Open a MaxMind database; an unreadable file disables lookups
    pub fn open(path: &Path) -> Self {
        match MaxMindDatabase::open(path) {
            Ok(db) => {
                tracing::info!("Loaded GeoIP database from {}", path.display());
                Self::new(Arc::new(db))
            }
            Err(e) => {
                tracing::warn!(
                    "Could not open GeoIP database {}: {}; geolocation disabled",
                    path.display(),
                    e
                );
                Self::disabled()
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.db.is_some()
    }

    pub fn resolve(&self, ip_address: &str) -> Location {
        let Ok(ip) = ip_address.trim().parse::<IpAddr>() else {
            if !ip_address.trim().is_empty() {
                tracing::debug!("Unparsable client address: {}", ip_address);
            }
            return (None, None);
        };

        if is_local(&ip) {
            return (Some(LOCAL.to_string()), Some(LOCAL.to_string()));
        }

        let Some(db) = &self.db else {
            return (None, None);
        };
        match db.locate(ip) {
            Ok(location) => location,
            Err(e) => {
                tracing::warn!("GeoIP lookup failed for {}: {}", ip, e);
                (None, None)
            }
        }
    }
}

/// Loopback, private, link-local and unspecified ranges
fn is_local(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback() || v4.is_private() || v4.is_link_local() || v4.is_unspecified()
        }
        IpAddr::V6(v6) => {
            if let Some(v4) = v6.to_ipv4_mapped() {
                return is_local(&IpAddr::V4(v4));
            }
            let first = v6.segments()[0];
            v6.is_loopback()
                || v6.is_unspecified()
                || (first & 0xfe00) == 0xfc00
                || (first & 0xffc0) == 0xfe80
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeDb {
        calls: AtomicUsize,
        result: Result<Location, String>,
    }

    impl FakeDb {
        fn new(result: Result<Location, String>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                result,
            })
        }
    }

    impl GeoDatabase for FakeDb {
        fn locate(&self, _ip: IpAddr) -> Result<Location, String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone()
        }
    }

    fn local() -> Location {
        (Some("Local".into()), Some("Local".into()))
    }

    #[test]
    fn test_loopback_and_private_are_local() {
        let resolver = GeoResolver::disabled();
        for ip in ["127.0.0.1", "::1", "10.1.2.3", "192.168.0.10", "172.16.5.4", "fd00::1", "::ffff:192.168.1.1"] {
            assert_eq!(resolver.resolve(ip), local(), "{}", ip);
        }
    }

    #[test]
    fn test_local_skips_database() {
        let db = FakeDb::new(Ok((Some("Germany".into()), None)));
        let resolver = GeoResolver::new(db.clone());
        assert_eq!(resolver.resolve("127.0.0.1"), local());
        assert_eq!(db.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_public_address_without_database() {
        let resolver = GeoResolver::disabled();
        assert!(!resolver.is_enabled());
        assert_eq!(resolver.resolve("8.8.8.8"), (None, None));
    }

    #[test]
    fn test_empty_and_garbage_addresses() {
        let resolver = GeoResolver::new(FakeDb::new(Ok((Some("X".into()), None))));
        assert_eq!(resolver.resolve(""), (None, None));
        assert_eq!(resolver.resolve("not-an-ip"), (None, None));
    }

    #[test]
    fn test_public_address_uses_database() {
        let db = FakeDb::new(Ok((Some("United States".into()), Some("California".into()))));
        let resolver = GeoResolver::new(db.clone());
        assert_eq!(
            resolver.resolve("8.8.8.8"),
            (Some("United States".into()), Some("California".into()))
        );
        assert_eq!(db.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_lookup_error_degrades() {
        let resolver = GeoResolver::new(FakeDb::new(Err("corrupt".into())));
        assert_eq!(resolver.resolve("1.1.1.1"), (None, None));
    }

    #[test]
    fn test_missing_file_disables() {
        let resolver = GeoResolver::open(Path::new("/nonexistent/GeoLite2-City.mmdb"));
        assert!(!resolver.is_enabled());
    }
}
