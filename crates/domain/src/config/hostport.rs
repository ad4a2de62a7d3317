use super::errors::ConfigError;

/// Split a `host[:port]` string, falling back to `default_port` when the
/// value carries no port. IPv6 literals may be bracketed (`[::1]:80`).
pub fn parse_host_port(value: &str, default_port: u16) -> Result<(String, u16), ConfigError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ConfigError::InvalidAddress(
            value.to_string(),
            "empty address".to_string(),
        ));
    }

    if let Some(rest) = value.strip_prefix('[') {
        let end = rest.find(']').ok_or_else(|| {
            ConfigError::InvalidAddress(value.to_string(), "unterminated '['".to_string())
        })?;
        let host = &rest[..end];
        let port = match rest[end + 1..].strip_prefix(':') {
            Some(port_str) => port_str.parse::<u16>().map_err(|e| {
                ConfigError::InvalidAddress(value.to_string(), e.to_string())
            })?,
            None => default_port,
        };
        return Ok((host.to_string(), port));
    }

    match value.rsplit_once(':') {
        Some((host, port_str)) => {
            let port = port_str.parse::<u16>().map_err(|e| {
                ConfigError::InvalidAddress(value.to_string(), e.to_string())
            })?;
            Ok((host.to_string(), port))
        }
        None => Ok((value.to_string(), default_port)),
    }
}
