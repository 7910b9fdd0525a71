//! Checks applied to a proposed torrc value before it is written.
//!
//! Every validator is a pure function returning [`TorrcError::InvalidFormat`]
//! with the violated rule as its reason.

use std::net::{IpAddr, Ipv6Addr};

use serde::Serialize;
use utoipa::ToSchema;

use crate::bandwidth::Unit;
use crate::torrc::{error::TorrcError, options};

/// Literal host name accepted wherever an IP address is expected.
pub const LOCALHOST: &str = "localhost";

const AUTO: &str = "auto";
const UNIX_PREFIX: &str = "unix:";

/// Which validator guards an option in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FieldRule {
    Any,
    /// Listener declaration such as `9050`, `auto` or `127.0.0.1:9050 IsolateDestAddr`.
    PortSpec,
    /// One of the option's `choices`.
    Choice,
    Bandwidth,
    PortMapping,
    OnionDir,
    IpOrLocalhost,
}

/// Validates a key/value pair about to be written with `Torrc::set`.
///
/// The key must be a single token and the value a non-empty single line. Keys
/// present in the option catalog are then checked with their [`FieldRule`];
/// unknown keys only get the generic checks.
///
/// # Errors
/// Returns [`TorrcError::InvalidFormat`] naming the first violated rule.
pub fn validate_option(key: &str, value: &str) -> Result<(), TorrcError> {
    if key.is_empty() || key.starts_with('#') || key.chars().any(char::is_whitespace) {
        return Err(TorrcError::invalid(format!("invalid option name: {key:?}")));
    }
    if value.trim().is_empty() {
        return Err(TorrcError::invalid("value must not be empty"));
    }
    if value.contains(['\n', '\r']) {
        return Err(TorrcError::invalid("value must be a single line"));
    }

    options::option(key).map_or(Ok(()), |option| option.validate(value))
}

/// Accepts a tor listener: `auto`, a port, `<ipv4-or-localhost>:<port>`,
/// `[<ipv6>]:<port>` or `unix:<path>`, followed by any number of flags such
/// as `IsolateDestAddr` or `SessionGroup=3`. The port itself may be `auto`.
///
/// # Errors
/// Returns [`TorrcError::InvalidFormat`] describing the malformed part.
pub fn validate_port_spec(value: &str) -> Result<(), TorrcError> {
    let mut tokens = value.split_whitespace();
    let listener = tokens
        .next()
        .ok_or_else(|| TorrcError::invalid("value must not be empty"))?;
    if tokens.any(|flag| !is_port_flag(flag)) {
        return Err(TorrcError::invalid("invalid port flag"));
    }

    if listener
        .strip_prefix(UNIX_PREFIX)
        .is_some_and(|socket| !socket.is_empty())
    {
        return Ok(());
    }

    let port = match listener.strip_prefix('[') {
        Some(bracketed) => {
            let (host, port) = bracketed
                .split_once("]:")
                .ok_or_else(|| TorrcError::invalid("invalid listen address"))?;
            if host.parse::<Ipv6Addr>().is_err() {
                return Err(TorrcError::invalid("invalid listen address"));
            }
            port
        }
        None => match listener.split_once(':') {
            Some((host, port)) if is_ip_or_localhost(host) && !host.contains(':') => port,
            Some(_) => return Err(TorrcError::invalid("invalid listen address")),
            None => listener,
        },
    };

    if port.eq_ignore_ascii_case(AUTO) || port.parse::<u16>().is_ok() {
        Ok(())
    } else {
        Err(TorrcError::invalid("invalid port"))
    }
}

/// Accepts exactly one of `choices`, surrounding whitespace ignored.
///
/// # Errors
/// Returns [`TorrcError::InvalidFormat`] listing the accepted values.
pub fn validate_choice(value: &str, choices: &[&str]) -> Result<(), TorrcError> {
    if choices.contains(&value.trim()) {
        Ok(())
    } else {
        Err(TorrcError::invalid(format!(
            "value must be one of: {}",
            choices.join(", ")
        )))
    }
}

/// Accepts `<integer><suffix>` with suffix `KB`, `MB`, `GB` or `TB`,
/// case-insensitive, with optional whitespace before the suffix.
///
/// # Errors
/// Returns [`TorrcError::InvalidFormat`] for an unknown suffix or a
/// non-numeric magnitude.
pub fn validate_bandwidth(value: &str) -> Result<(), TorrcError> {
    let normalized = value.trim().to_ascii_uppercase();
    for unit in Unit::ALL {
        if let Some(magnitude) = normalized.strip_suffix(unit.as_str()) {
            return if is_integer(magnitude.trim()) {
                Ok(())
            } else {
                Err(TorrcError::invalid("invalid numeric bandwidth value"))
            };
        }
    }
    Err(TorrcError::invalid(
        "invalid bandwidth format (e.g. 5MB, 100KB)",
    ))
}

/// Accepts `<virtual-port> <host>:<target-port>`.
///
/// Ports only need to be integers. The host is an IPv4 literal, `localhost`,
/// or a bracketed IPv6 literal such as `[::1]:8080`.
///
/// # Errors
/// Returns [`TorrcError::InvalidFormat`] describing the malformed part.
pub fn validate_port_mapping(value: &str) -> Result<(), TorrcError> {
    let parts: Vec<&str> = value.split_whitespace().collect();
    let [virtual_port, target] = parts.as_slice() else {
        return Err(TorrcError::invalid(
            "port mapping must be in format: <port> <host:port>",
        ));
    };

    if !is_integer(virtual_port) {
        return Err(TorrcError::invalid("invalid virtual port"));
    }

    let (host_ok, target_port) = match target.strip_prefix('[') {
        Some(bracketed) => {
            let (host, port) = bracketed
                .split_once("]:")
                .ok_or_else(|| TorrcError::invalid("invalid address format"))?;
            (host.parse::<Ipv6Addr>().is_ok(), port)
        }
        None => {
            let mut pieces = target.split(':');
            match (pieces.next(), pieces.next(), pieces.next()) {
                (Some(host), Some(port), None) => (is_ip_or_localhost(host), port),
                _ => return Err(TorrcError::invalid("invalid address format")),
            }
        }
    };

    if !host_ok {
        return Err(TorrcError::invalid("invalid IP or hostname"));
    }
    if !is_integer(target_port) {
        return Err(TorrcError::invalid("invalid target port"));
    }
    Ok(())
}

/// Rejects paths containing `..` or `~`, and paths shorter than 3 bytes.
///
/// This is a traversal heuristic, not a canonicalization check.
///
/// # Errors
/// Returns [`TorrcError::InvalidFormat`] for a rejected path.
pub fn validate_onion_dir(path: &str) -> Result<(), TorrcError> {
    if path.contains("..") || path.contains('~') {
        return Err(TorrcError::invalid("invalid HiddenServiceDir path"));
    }
    if path.len() < 3 {
        return Err(TorrcError::invalid("path too short"));
    }
    Ok(())
}

/// Accepts `localhost` or any IPv4/IPv6 literal. Names are never resolved.
///
/// # Errors
/// Returns [`TorrcError::InvalidFormat`] for anything else.
pub fn validate_ip_or_localhost(addr: &str) -> Result<(), TorrcError> {
    if is_ip_or_localhost(addr) {
        Ok(())
    } else {
        Err(TorrcError::invalid("invalid IP address"))
    }
}

fn is_port_flag(flag: &str) -> bool {
    flag.starts_with(|c: char| c.is_ascii_alphabetic())
        && flag.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'=')
}

fn is_ip_or_localhost(host: &str) -> bool {
    host == LOCALHOST || host.parse::<IpAddr>().is_ok()
}

/// Optional sign followed by at least one ASCII digit, of any length.
fn is_integer(text: &str) -> bool {
    let digits = text.strip_prefix(['+', '-']).unwrap_or(text);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}
