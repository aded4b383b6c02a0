use std::{net::IpAddr, str::FromStr};

use actix_web::HttpRequest;
use log::{debug, trace};
use regex::Regex;

/// Get the remote IP address from the request. It uses 3 sources to determine the IP address, in decreasing order
/// of preference:
/// 1. The `X-Forwarded-For` header, iif `use_x_forwarded_for` is set to true in the configuration.
/// 2. The `Forwarded` header, iif `use_forwarded` is set to true in the configuration.
/// 3. The peer address from the connection info.
///
/// Clients can send either header themselves, and proxies append to them. Only the right-most entry, the one added
/// by the proxy in front of this server, is used.
pub fn get_remote_ip(req: &HttpRequest, use_x_forwarded_for: bool, use_forwarded: bool) -> Option<IpAddr> {
    let mut result = None;
    if use_x_forwarded_for {
        trace!("Checking X-Forwarded-For header");
        result = req
            .headers()
            .get("X-Forwarded-For")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.rsplit(',').next())
            .and_then(|s| IpAddr::from_str(s.trim()).ok());
        if let Some(ip) = result {
            debug!("Using X-Forwarded-For header for remote address: {ip}");
        }
    }
    if use_forwarded && result.is_none() {
        trace!("Checking Forwarded header");
        result = req
            .headers()
            .get("Forwarded")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.rsplit(',').next())
            .and_then(forwarded_for);
        if let Some(ip) = result {
            debug!("Using Forwarded header for remote address: {ip}");
        }
    }
    result.or_else(|| {
        let peer_addr = req.connection_info().peer_addr().map(|a| a.to_string());
        trace!("Using Peer address for remote address: {:?}", peer_addr);
        peer_addr.and_then(|s| IpAddr::from_str(&s).ok())
    })
}

/// Extracts the `for=` address from a `Forwarded` header value (RFC 7239). Quoted and bracketed IPv6 forms are
/// accepted.
fn forwarded_for(value: &str) -> Option<IpAddr> {
    let re = Regex::new(r#"(?i)for="?\[?(?P<ip>[0-9a-f.:]+)"#).ok()?;
    let caps = re.captures(value)?;
    IpAddr::from_str(caps.name("ip")?.as_str()).ok()
}

#[cfg(test)]
mod test {
    use actix_web::test::TestRequest;

    use super::*;

    #[test]
    fn forwarded_header_formats() {
        assert_eq!(forwarded_for("for=192.0.2.60;proto=http;by=203.0.113.43"), Some("192.0.2.60".parse().unwrap()));
        assert_eq!(forwarded_for(r#"For="[2001:db8:cafe::17]:4711""#), Some("2001:db8:cafe::17".parse().unwrap()));
        assert_eq!(forwarded_for("proto=https"), None);
    }

    #[test]
    fn remote_ip_preference() {
        let req = TestRequest::default()
            .peer_addr("10.0.0.1:5000".parse().unwrap())
            .insert_header(("X-Forwarded-For", "3.18.12.63"))
            .insert_header(("Forwarded", "for=3.130.192.231"))
            .to_http_request();
        assert_eq!(get_remote_ip(&req, true, true), Some("3.18.12.63".parse().unwrap()));
        assert_eq!(get_remote_ip(&req, false, true), Some("3.130.192.231".parse().unwrap()));
        assert_eq!(get_remote_ip(&req, false, false), Some("10.0.0.1".parse().unwrap()));
    }

    #[test]
    fn client_supplied_forwarding_entries_are_ignored() {
        // the client claims to be a Stripe address. The proxy appends the address it actually saw.
        let req = TestRequest::default()
            .peer_addr("10.0.0.1:5000".parse().unwrap())
            .insert_header(("X-Forwarded-For", "3.18.12.63, 203.0.113.9"))
            .insert_header(("Forwarded", "for=3.18.12.63, for=198.51.100.4;proto=https"))
            .to_http_request();
        assert_eq!(get_remote_ip(&req, true, false), Some("203.0.113.9".parse().unwrap()));
        assert_eq!(get_remote_ip(&req, false, true), Some("198.51.100.4".parse().unwrap()));
    }
}
