//! Reversible room address encoding for bridge round-trips.
//!
//! COLIBRI requests carry a `from` the bridge can address replies to. The
//! room node is hex-encoded and joined to the host with `/`, yielding a
//! full jid local to the MUC host the focus runs on; replies are mapped
//! back with [`decode`].

use jid::BareJid;

use crate::signalling::FocusError;

/// Encodes a room address into a bridge-facing token.
pub fn encode(room: &BareJid) -> String {
    let node = room.node.as_deref().unwrap_or_default();
    format!("{}/{}", room.domain, hex::encode(node.as_bytes()))
}

/// Decodes a bridge-facing token back into the room address.
pub fn decode(token: &str) -> Result<BareJid, FocusError> {
    let mut parts = token.splitn(2, '/');
    let domain = parts
        .next()
        .filter(|d| !d.is_empty())
        .ok_or_else(|| FocusError::BadToken(token.to_owned()))?;
    let hexed = parts
        .next()
        .ok_or_else(|| FocusError::BadToken(token.to_owned()))?;
    let node = hex::decode(hexed)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .ok_or_else(|| FocusError::BadToken(token.to_owned()))?;
    Ok(BareJid::new(node, domain))
}
