//! Short unique identifiers
//!
//! A random UUID rendered in base57 (no look-alike characters), always
//! padded to [`TOKEN_LEN`] characters. A non-empty prefix is joined with `_`.

use uuid::Uuid;

const ALPHABET: &[u8; 57] = b"23456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// Length of the generated token; 57^22 covers the full 128-bit range.
pub const TOKEN_LEN: usize = 22;

/// Separator placed between a prefix and the token.
pub const SEPARATOR: char = '_';

/// Generate a new identifier, e.g. `usr_3W9x...` for prefix `usr`.
pub fn new_id(prefix: &str) -> String {
    let token = short_token();
    if prefix.is_empty() {
        return token;
    }
    let mut id = String::with_capacity(prefix.len() + 1 + TOKEN_LEN);
    id.push_str(prefix);
    id.push(SEPARATOR);
    id.push_str(&token);
    id
}

/// A bare 22 character token.
pub fn short_token() -> String {
    encode(Uuid::new_v4().as_u128())
}

fn encode(mut num: u128) -> String {
    let base = ALPHABET.len() as u128;
    let mut out = Vec::with_capacity(TOKEN_LEN);
    for _ in 0..TOKEN_LEN {
        out.push(ALPHABET[(num % base) as usize]);
        num /= base;
    }
    out.reverse();
    // alphabet is ASCII
    String::from_utf8(out).unwrap_or_default()
}

/// True when `id` looks like something [`new_id`] produced for `prefix`.
pub fn is_generated(id: &str, prefix: &str) -> bool {
    let token = if prefix.is_empty() {
        id
    } else {
        match id.strip_prefix(prefix).and_then(|rest| rest.strip_prefix(SEPARATOR)) {
            Some(rest) => rest,
            None => return false,
        }
    };
    token.len() == TOKEN_LEN && token.bytes().all(|b| ALPHABET.contains(&b))
}
