//! uWSGI binary packet codec.
//!
//! A packet is a 4-byte header `(u8 modifier1, u16 LE datasize,
//! u8 modifier2)` followed by `datasize` bytes of key/value entries, each a
//! `u16 LE` length-prefixed key and a `u16 LE` length-prefixed value.
//! Modifiers are carried but not validated.

use rustc_hash::FxHashMap;
use uwsgi_dns_domain::DomainError;

/// Field carrying the subscribed domain in a subscription packet.
pub const SUBSCRIPTION_KEY: &[u8] = b"key";

const HEADER_LEN: usize = 4;

/// Decode one packet into its key/value fields.
///
/// Consumes exactly the declared payload; bytes past the payload boundary
/// are ignored, and any length field that would cross it is an error.
pub fn decode(blob: &[u8]) -> Result<FxHashMap<Vec<u8>, Vec<u8>>, DomainError> {
    if blob.len() < HEADER_LEN {
        return Err(DomainError::MalformedPacket(format!(
            "{} bytes is shorter than the header",
            blob.len()
        )));
    }

    let datasize = u16::from_le_bytes([blob[1], blob[2]]) as usize;
    let body = blob.get(HEADER_LEN..HEADER_LEN + datasize).ok_or_else(|| {
        DomainError::MalformedPacket(format!(
            "declared payload of {} bytes, only {} present",
            datasize,
            blob.len() - HEADER_LEN
        ))
    })?;

    let mut fields = FxHashMap::default();
    let mut cursor = 0usize;
    while cursor < body.len() {
        let key = read_field(body, &mut cursor)?;
        let value = read_field(body, &mut cursor)?;
        fields.insert(key.to_vec(), value.to_vec());
    }

    Ok(fields)
}

fn read_field<'a>(body: &'a [u8], cursor: &mut usize) -> Result<&'a [u8], DomainError> {
    let prefix = body.get(*cursor..*cursor + 2).ok_or_else(|| {
        DomainError::MalformedPacket(format!("length prefix at offset {} past payload", *cursor))
    })?;
    let len = u16::from_le_bytes([prefix[0], prefix[1]]) as usize;
    *cursor += 2;

    let field = body.get(*cursor..*cursor + len).ok_or_else(|| {
        DomainError::MalformedPacket(format!(
            "field of {} bytes at offset {} past payload",
            len, *cursor
        ))
    })?;
    *cursor += len;
    Ok(field)
}

/// Encode key/value pairs into the same wire format.
pub fn encode(modifier1: u8, modifier2: u8, pairs: &[(&[u8], &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (key, value) in pairs {
        body.extend_from_slice(&(key.len() as u16).to_le_bytes());
        body.extend_from_slice(key);
        body.extend_from_slice(&(value.len() as u16).to_le_bytes());
        body.extend_from_slice(value);
    }

    let mut packet = Vec::with_capacity(HEADER_LEN + body.len());
    packet.push(modifier1);
    packet.extend_from_slice(&(body.len() as u16).to_le_bytes());
    packet.push(modifier2);
    packet.extend_from_slice(&body);
    packet
}
