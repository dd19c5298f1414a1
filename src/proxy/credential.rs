use crate::ConfigError;
use std::fmt;

/// One proxy server with its login
///
/// Immutable once loaded; handed out by value for each attempt.
#[derive(Clone, PartialEq, Eq)]
pub struct ProxyCredential {
    /// Proxy address, e.g. `http://10.0.0.1:8080`
    pub server: String,
    pub username: String,
    pub password: String,
}

impl ProxyCredential {
    pub fn new(
        server: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            server: server.into(),
            username: username.into(),
            password: password.into(),
        }
    }
}

// Keep passwords out of logs and panic messages
impl fmt::Debug for ProxyCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyCredential")
            .field("server", &self.server)
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

impl fmt::Display for ProxyCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.server)
    }
}

/// Parses a single `ip:port:user:pass` line
///
/// `line_no` is 1-based and only used for the error message.
pub fn parse_proxy_line(line: &str, line_no: usize) -> Result<ProxyCredential, ConfigError> {
    let invalid = || ConfigError::InvalidProxy {
        line: line_no,
        content: line.to_string(),
    };

    let parts: Vec<&str> = line.trim().split(':').collect();
    let [ip, port, user, pass] = parts.as_slice() else {
        return Err(invalid());
    };

    if ip.is_empty() || user.is_empty() || port.parse::<u16>().is_err() {
        return Err(invalid());
    }

    Ok(ProxyCredential::new(
        format!("http://{}:{}", ip, port),
        *user,
        *pass,
    ))
}

/// Parses a whole credential file, skipping blank lines and `#` comments
pub fn parse_proxy_list(content: &str) -> Result<Vec<ProxyCredential>, ConfigError> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(idx, line)| parse_proxy_line(line, idx + 1))
        .collect()
}
