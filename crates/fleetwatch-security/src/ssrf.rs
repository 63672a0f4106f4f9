//! SSRF validation for outbound webhook URLs.
//!
//! Runs before every delivery attempt; webhook URLs can be edited at any
//! time so results are never cached. Rejects non-http(s) schemes, missing
//! hosts, loopback/private/link-local/reserved IP literals, and hostnames
//! that resolve into internal namespaces by convention.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use url::{Host, Url};

/// Literal hostnames that always refer to the local machine.
const BLOCKED_HOSTNAMES: &[&str] = &[
    "localhost",
    "localhost.localdomain",
    "127.0.0.1",
    "0.0.0.0",
    "::1",
];

/// Hostname substrings conventionally reserved for internal networks.
const BLOCKED_SUBSTRINGS: &[&str] = &[".local", ".internal", ".lan", "localhost"];

/// Validate a webhook target URL against SSRF.
///
/// `allow_private` skips the IP and hostname classification for air-gapped
/// installs; the scheme and host-presence checks are enforced regardless.
/// Returns the rejection reason on failure.
pub fn validate_url(raw: &str, allow_private: bool) -> Result<(), String> {
    let url = Url::parse(raw).map_err(|e| format!("invalid URL: {e}"))?;

    match url.scheme() {
        "http" | "https" => {}
        other => return Err(format!("scheme '{other}' is not allowed")),
    }

    let host = url.host().ok_or_else(|| "URL has no host".to_string())?;

    if allow_private {
        return Ok(());
    }

    match host {
        Host::Domain(domain) => {
            let domain = domain.to_ascii_lowercase();
            if BLOCKED_HOSTNAMES.contains(&domain.as_str()) {
                return Err(format!("host '{domain}' is blocked"));
            }
            for needle in BLOCKED_SUBSTRINGS {
                if domain.contains(needle) {
                    return Err(format!("host '{domain}' matches blocked pattern '{needle}'"));
                }
            }
            Ok(())
        }
        Host::Ipv4(addr) => {
            if is_forbidden_ipv4(addr) {
                Err(format!("IP address {addr} is not publicly routable"))
            } else {
                Ok(())
            }
        }
        Host::Ipv6(addr) => {
            if is_forbidden_ipv6(addr) {
                Err(format!("IP address {addr} is not publicly routable"))
            } else {
                Ok(())
            }
        }
    }
}

/// Convenience predicate form of [`validate_url`].
pub fn is_safe_url(raw: &str, allow_private: bool) -> bool {
    validate_url(raw, allow_private).is_ok()
}

fn is_forbidden_ipv4(addr: Ipv4Addr) -> bool {
    addr.is_loopback()
        || addr.is_private()
        || addr.is_link_local()
        || addr.is_unspecified()
        || addr.is_broadcast()
        || addr.is_documentation()
        // 100.64.0.0/10 carrier-grade NAT
        || (addr.octets()[0] == 100 && (addr.octets()[1] & 0xc0) == 64)
        // 240.0.0.0/4 reserved
        || addr.octets()[0] >= 240
}

fn is_forbidden_ipv6(addr: Ipv6Addr) -> bool {
    if addr.is_loopback() || addr.is_unspecified() {
        return true;
    }
    // IPv4-mapped addresses inherit the IPv4 classification.
    if let Some(mapped) = addr.to_ipv4_mapped() {
        return is_forbidden_ipv4(mapped);
    }
    let segments = addr.segments();
    // fc00::/7 unique local
    if (segments[0] & 0xfe00) == 0xfc00 {
        return true;
    }
    // fe80::/10 link local
    if (segments[0] & 0xffc0) == 0xfe80 {
        return true;
    }
    false
}

/// Classify any IP literal (used when a resolver is available upstream).
pub fn is_forbidden_ip(addr: IpAddr) -> bool {
    match addr {
        IpAddr::V4(v4) => is_forbidden_ipv4(v4),
        IpAddr::V6(v6) => is_forbidden_ipv6(v6),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_https_url_passes() {
        assert!(validate_url("https://example.com/hook", false).is_ok());
        assert!(validate_url("http://hooks.example.org:8080/x?a=b", false).is_ok());
    }

    #[test]
    fn non_http_schemes_are_rejected() {
        assert!(validate_url("ftp://example.com/hook", false).is_err());
        assert!(validate_url("file:///etc/passwd", false).is_err());
        assert!(validate_url("gopher://example.com", false).is_err());
    }

    #[test]
    fn loopback_and_private_literals_are_rejected() {
        for url in [
            "http://127.0.0.1/hook",
            "http://127.8.8.8/hook",
            "http://10.0.0.5/hook",
            "http://172.16.1.1/hook",
            "http://192.168.1.10/hook",
            "http://169.254.169.254/latest/meta-data",
            "http://0.0.0.0/hook",
            "http://[::1]/hook",
            "http://[fe80::1]/hook",
            "http://[fd00::1]/hook",
        ] {
            assert!(validate_url(url, false).is_err(), "expected rejection: {url}");
        }
    }

    #[test]
    fn blocked_hostnames_and_suffixes_are_rejected() {
        for url in [
            "http://localhost/hook",
            "http://localhost.localdomain/hook",
            "https://myhost.local/hook",
            "https://db.internal/hook",
            "https://nas.lan/hook",
            "https://evil-localhost.example/hook",
        ] {
            assert!(validate_url(url, false).is_err(), "expected rejection: {url}");
        }
    }

    #[test]
    fn private_targets_allowed_when_configured() {
        assert!(validate_url("http://10.0.0.5/hook", true).is_ok());
        assert!(validate_url("http://localhost:9000/hook", true).is_ok());
        // The scheme requirement still holds.
        assert!(validate_url("ftp://10.0.0.5/hook", true).is_err());
    }

    #[test]
    fn reserved_ranges_are_rejected() {
        assert!(validate_url("http://100.64.0.1/hook", false).is_err());
        assert!(validate_url("http://240.0.0.1/hook", false).is_err());
        assert!(validate_url("http://198.51.100.7/hook", false).is_err());
    }
}
