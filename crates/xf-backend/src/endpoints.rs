//! Candidate base URLs for a panel address typed by the user.

/// Ports tried when the address carries none. Empty means the scheme default.
const COMMON_PORTS: &[&str] = &["", ":80", ":8080", ":8000", ":8081", ":8443", ":443"];

/// Expand a user-entered server address into base URLs to try, in order.
///
/// `example.com` yields every scheme/port combination, `http://host:8080`
/// yields only the given authority under both schemes (given one first).
/// Results have no trailing slash and contain no duplicates.
pub fn generate_endpoints(server: &str) -> Vec<String> {
    let s = server.trim().trim_end_matches('/');

    let (schemes, host): (Vec<&str>, &str) = if let Some(rest) = s.strip_prefix("http://") {
        (vec!["http", "https"], rest)
    } else if let Some(rest) = s.strip_prefix("https://") {
        (vec!["https", "http"], rest)
    } else {
        (vec!["http", "https"], s)
    };

    // Bracketed IPv6 literals always get the port list.
    let ports: &[&str] = if host.contains(':') && !host.starts_with('[') {
        &[""]
    } else {
        COMMON_PORTS
    };

    let mut out: Vec<String> = Vec::with_capacity(schemes.len() * ports.len());
    for scheme in schemes {
        for port in ports {
            let url = format!("{scheme}://{host}{port}")
                .trim_end_matches('/')
                .to_string();
            if !out.contains(&url) {
                out.push(url);
            }
        }
    }
    out
}
