//! Shareable invite codes that point guests at a host.
//!
//! A code looks like `race:v1:<payload>` where the payload is unpadded base64
//! of a small JSON document. Bare `host:port` addresses are accepted too, so
//! players on the same network can skip the code entirely.

use std::net::SocketAddr;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const INVITE_DOMAIN: &str = "race";
const INVITE_VERSION: &str = "v1";

/// Identifier prefix emitted before the encoded invite payload.
pub const INVITE_HEADER: &str = "race:v1";

const FIELD_DELIMITER: char = ':';

#[derive(Debug, Serialize, Deserialize)]
struct InvitePayload {
    addr: String,
}

/// Errors that can occur while decoding invite codes.
#[derive(Debug, Error)]
pub enum InviteError {
    /// The provided code was empty or contained only whitespace.
    #[error("invite code was empty")]
    Empty,
    /// The code used an unsupported version identifier.
    #[error("invite version '{0}' is not supported")]
    UnsupportedVersion(String),
    /// The code ended before the payload segment.
    #[error("invite code is missing the payload")]
    MissingPayload,
    /// The base64 payload could not be decoded.
    #[error("could not decode invite payload: {0}")]
    InvalidEncoding(#[from] base64::DecodeError),
    /// The decoded payload could not be parsed.
    #[error("could not parse invite payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),
    /// The value is neither an invite code nor a `host:port` address.
    #[error("'{0}' is not an invite code or host:port address")]
    Unrecognised(String),
}

/// Encodes a host address into a single-line invite code.
#[must_use]
pub fn encode(addr: SocketAddr) -> String {
    let payload = InvitePayload {
        addr: addr.to_string(),
    };
    // A struct of one string field always serialises.
    let json = serde_json::to_vec(&payload).unwrap_or_default();
    format!("{INVITE_HEADER}{FIELD_DELIMITER}{}", URL_SAFE_NO_PAD.encode(json))
}

/// Resolves an invite code or bare address into a `host:port` string.
pub fn decode(value: &str) -> Result<String, InviteError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(InviteError::Empty);
    }

    let mut parts = trimmed.splitn(3, FIELD_DELIMITER);
    let domain = parts.next().unwrap_or_default();
    if domain != INVITE_DOMAIN {
        return bare_address(trimmed);
    }

    let version = parts.next().ok_or(InviteError::MissingPayload)?;
    // A host named like the domain, such as `race:4455`, is still an address.
    if version.parse::<u16>().is_ok() && parts.clone().next().is_none() {
        return bare_address(trimmed);
    }
    if version != INVITE_VERSION {
        return Err(InviteError::UnsupportedVersion(version.to_owned()));
    }
    let payload = parts
        .next()
        .filter(|payload| !payload.is_empty())
        .ok_or(InviteError::MissingPayload)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.as_bytes())?;
    let decoded: InvitePayload = serde_json::from_slice(&bytes)?;
    Ok(decoded.addr)
}

fn bare_address(value: &str) -> Result<String, InviteError> {
    let valid = match value.rsplit_once(FIELD_DELIMITER) {
        Some((host, port)) => !host.is_empty() && port.parse::<u16>().is_ok(),
        None => false,
    };
    if valid {
        Ok(value.to_owned())
    } else {
        Err(InviteError::Unrecognised(value.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoded_code_round_trips_to_the_address() {
        let addr: SocketAddr = "192.168.1.20:4455".parse().unwrap();
        let code = encode(addr);
        assert!(code.starts_with("race:v1:"));
        assert_eq!(decode(&code).unwrap(), "192.168.1.20:4455");
    }

    #[test]
    fn bare_addresses_are_accepted() {
        assert_eq!(decode(" localhost:9000 ").unwrap(), "localhost:9000");
        assert_eq!(decode("[::1]:9000").unwrap(), "[::1]:9000");
        assert_eq!(decode("race:4455").unwrap(), "race:4455");
    }

    #[test]
    fn malformed_codes_are_rejected() {
        assert!(matches!(decode("  "), Err(InviteError::Empty)));
        assert!(matches!(
            decode("race:v9:abc"),
            Err(InviteError::UnsupportedVersion(version)) if version == "v9"
        ));
        assert!(matches!(decode("race:v1:"), Err(InviteError::MissingPayload)));
        assert!(matches!(
            decode("race:v1:!!!"),
            Err(InviteError::InvalidEncoding(_))
        ));
        assert!(matches!(
            decode("not-an-address"),
            Err(InviteError::Unrecognised(_))
        ));
    }
}
