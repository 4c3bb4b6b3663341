// ABOUTME: Server CLI parsing — connectionLimit, maxSize, and an optional port, with the exact
// ABOUTME: validation and exit-code-19 usage behaviour a general-purpose CLI parser wouldn't reproduce

const MAX_CONNECTION_LIMIT: u32 = 10_000;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// 0 means unlimited.
    pub connection_limit: u32,
    /// 0 means no explicit cap (the 32-bit length field is the only bound).
    pub max_image_bytes: u32,
    /// `None` means let the kernel pick a port. `Some` carries the raw
    /// command-line string uninterpreted: the original hands any non-"0"
    /// port straight to `getaddrinfo`/`bind` (`check_port`) rather than
    /// validating it up front, so a malformed or out-of-range value here
    /// surfaces as a bind failure (exit 10), not a usage error (exit 19).
    /// See [`crate::server::listener::bind`].
    pub port: Option<String>,
}

pub const USAGE: &str = "Usage: ./uqfacedetect connectionlimit maxsize [portnumber]";

impl ServerConfig {
    pub fn parse(args: &[String]) -> Result<ServerConfig, ()> {
        if args.len() < 2 || args.len() > 3 {
            return Err(());
        }

        let connection_limit = parse_cmd_line_number(&args[0]).ok_or(())?;
        if connection_limit > MAX_CONNECTION_LIMIT {
            return Err(());
        }

        let max_image_bytes = parse_cmd_line_number(&args[1]).ok_or(())?;

        let port = match args.get(2) {
            None => None,
            Some(s) if s.is_empty() || s == "0" => None,
            Some(s) => Some(s.clone()),
        };

        Ok(ServerConfig { connection_limit, max_image_bytes, port })
    }
}

/// Accepts an optional leading `+` followed by one or more decimal digits,
/// matching the reference's `valid_cmd_line_number` check, then parses it
/// as a `u32` (rejecting overflow rather than the reference's saturation,
/// since the spec only requires connectionLimit/maxSize to fit 32 bits).
fn parse_cmd_line_number(s: &str) -> Option<u32> {
    let digits = s.strip_prefix('+').unwrap_or(s);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse::<u32>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(args: &[&str]) -> Result<ServerConfig, ()> {
        ServerConfig::parse(&args.iter().map(|s| s.to_string()).collect::<Vec<_>>())
    }

    #[test]
    fn parses_minimal_args() {
        let config = cfg(&["5", "1000"]).unwrap();
        assert_eq!(config.connection_limit, 5);
        assert_eq!(config.max_image_bytes, 1000);
        assert_eq!(config.port, None);
    }

    #[test]
    fn zero_connection_limit_means_unlimited() {
        let config = cfg(&["0", "0"]).unwrap();
        assert_eq!(config.connection_limit, 0);
        assert_eq!(config.max_image_bytes, 0);
    }

    #[test]
    fn explicit_port_is_parsed() {
        let config = cfg(&["1", "1", "9000"]).unwrap();
        assert_eq!(config.port.as_deref(), Some("9000"));
    }

    #[test]
    fn port_of_zero_means_ephemeral() {
        let config = cfg(&["1", "1", "0"]).unwrap();
        assert_eq!(config.port, None);
    }

    #[test]
    fn out_of_range_port_is_not_a_command_line_error() {
        // A malformed/out-of-range port is not validated here; it is
        // deferred to the bind attempt (see `listener::bind`), so it must
        // surface as a bind failure (exit 10), not a usage error (exit 19).
        let config = cfg(&["1", "1", "99999"]).unwrap();
        assert_eq!(config.port.as_deref(), Some("99999"));
    }

    #[test]
    fn connection_limit_above_cap_is_rejected() {
        assert!(cfg(&["10001", "1"]).is_err());
    }

    #[test]
    fn non_numeric_argument_is_rejected() {
        assert!(cfg(&["abc", "1"]).is_err());
    }

    #[test]
    fn missing_required_argument_is_rejected() {
        assert!(cfg(&["5"]).is_err());
    }

    #[test]
    fn leading_plus_is_accepted() {
        let config = cfg(&["+5", "+10"]).unwrap();
        assert_eq!(config.connection_limit, 5);
        assert_eq!(config.max_image_bytes, 10);
    }
}
