//! Base62 encoding of 64-bit identifiers.
//!
//! The alphabet is fixed (digits, then lowercase, then uppercase), so the
//! same integer always encodes to the same string in every process.

pub const ALPHABET: &[u8; 62] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

const BASE: u64 = ALPHABET.len() as u64;

/// Longest possible encoding, reached by `u64::MAX`.
pub const MAX_ENCODED_LEN: usize = 11;

/// Encodes `n` as a base62 string without padding.
///
/// Zero encodes to the first alphabet symbol, `"0"`.
pub fn encode(mut n: u64) -> String {
    let mut buf = [0_u8; MAX_ENCODED_LEN];
    let mut start = MAX_ENCODED_LEN;

    loop {
        start -= 1;
        buf[start] = ALPHABET[(n % BASE) as usize];
        n /= BASE;
        if n == 0 {
            break;
        }
    }

    // every byte comes from the ASCII alphabet
    buf[start..].iter().map(|&b| b as char).collect()
}

/// Decodes a base62 string produced by [`encode`].
///
/// Returns `None` for empty input, symbols outside the alphabet, leading
/// zeros (which `encode` never emits), or values that overflow `u64`.
pub fn decode(s: &str) -> Option<u64> {
    let bytes = s.as_bytes();
    if bytes.is_empty() || bytes.len() > MAX_ENCODED_LEN {
        return None;
    }
    if bytes.len() > 1 && bytes[0] == ALPHABET[0] {
        return None;
    }

    bytes.iter().try_fold(0_u64, |acc, &b| {
        let digit = symbol_value(b)?;
        acc.checked_mul(BASE)?.checked_add(digit)
    })
}

fn symbol_value(b: u8) -> Option<u64> {
    match b {
        b'0'..=b'9' => Some((b - b'0') as u64),
        b'a'..=b'z' => Some((b - b'a') as u64 + 10),
        b'A'..=b'Z' => Some((b - b'A') as u64 + 36),
        _ => None,
    }
}
