//! Network address parsing.

/// Where and how to reach one IRC server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerAddress {
    pub host: String,
    pub port: u16,
    pub tls: bool,
}

const PLAIN_PORT: u16 = 6667;
const TLS_PORT: u16 = 6697;

/// Parse a `host`, `host:port` or `host:+port` address string.
///
/// The `+` prefix on the port indicates explicit TLS. Port 6697 also implies
/// TLS. A bare host connects to 6667 without TLS. Returns `None` for an empty
/// host or a port that is not a number.
pub fn parse_address(addr: &str) -> Option<ServerAddress> {
    let addr = addr.trim();
    let (host, port, tls) = match addr.rfind(':') {
        // An unbracketed IPv6 literal has several colons and no port.
        Some(_) if addr.matches(':').count() > 1 && !addr.starts_with('[') => {
            (addr, PLAIN_PORT, false)
        }
        Some(colon_pos) => {
            let host = &addr[..colon_pos];
            let port_str = &addr[colon_pos + 1..];
            let (port_str, explicit_tls) = match port_str.strip_prefix('+') {
                Some(rest) => (rest, true),
                None => (port_str, false),
            };
            let port: u16 = port_str.parse().ok()?;
            (host, port, explicit_tls || port == TLS_PORT)
        }
        None => (addr, PLAIN_PORT, false),
    };

    let host = host.trim_start_matches('[').trim_end_matches(']');
    if host.is_empty() {
        return None;
    }

    Some(ServerAddress {
        host: host.to_string(),
        port,
        tls,
    })
}
