//! Fractional sort keys
//!
//! Sibling order under a parent is given by opaque strings compared byte by
//! byte. Stored keys may hold any characters. A new key is a prefix of one of
//! its neighbours followed by a character from `1-9a-z`, so generated keys
//! never end in `0` and always leave room on both sides. The first key under
//! an empty parent is `"i"`.
//!
//! Two keys leave no room when the upper one is the lower one followed only
//! by characters at or below `0` (`"a"` and `"a0"`), or when they are equal.

use thiserror::Error;

/// Characters a generated key may end with, ascending
const DIGITS: &[u8] = b"123456789abcdefghijklmnopqrstuvwxyz";
const ZERO: u8 = b'0';
const FIRST_KEY: &str = "i";

#[derive(Debug, Error, PartialEq)]
pub enum SortKeyError {
    #[error("No sort key fits between '{lower}' and '{upper}'")]
    NoRoom { lower: String, upper: String },
}

/// Middle of the digits strictly above `above` and below `below`
fn middle_digit(above: u8, below: Option<u8>) -> Option<char> {
    let range: Vec<u8> = DIGITS
        .iter()
        .copied()
        .filter(|&d| d > above && below.map_or(true, |b| d < b))
        .collect();
    range.get(range.len() / 2).map(|&d| char::from(d))
}

/// Returns a key strictly between `lower` and `upper`
///
/// `None` stands for the open end of the range, so `key_between(None, None)`
/// is the key for the first child of a parent.
pub fn key_between(lower: Option<&str>, upper: Option<&str>) -> Result<String, SortKeyError> {
    let low = lower.unwrap_or("");
    let key = match upper {
        None => Some(after(low, 0)),
        Some(high) if low < high => between(low, high),
        Some(_) => None,
    };

    key.ok_or_else(|| SortKeyError::NoRoom {
        lower: low.to_string(),
        upper: upper.unwrap_or("").to_string(),
    })
}

/// Returns a key sorting after `last`
pub fn key_after(last: Option<&str>) -> Result<String, SortKeyError> {
    key_between(last, None)
}

/// A key above `key` that keeps at least its first `keep` bytes
fn after(key: &str, keep: usize) -> String {
    for (at, &byte) in key.as_bytes().iter().enumerate().skip(keep) {
        // Only ASCII bytes have a digit above them, so `at` is a char boundary
        if let Some(digit) = middle_digit(byte, None) {
            return format!("{}{}", &key[..at], digit);
        }
    }
    format!("{}{}", key, FIRST_KEY)
}

/// A key strictly inside `(lower, upper)`; requires `lower < upper`
fn between(lower: &str, upper: &str) -> Option<String> {
    let (lo, hi) = (lower.as_bytes(), upper.as_bytes());
    let shared = lo.iter().zip(hi).take_while(|(a, b)| a == b).count();

    let Some(&lo_byte) = lo.get(shared) else {
        return below_suffix(upper, shared);
    };
    let &hi_byte = hi.get(shared)?;

    // `lo_byte` is below an ASCII digit, so `shared` is a char boundary
    if let Some(digit) = middle_digit(lo_byte, Some(hi_byte)) {
        return Some(format!("{}{}", &upper[..shared], digit));
    }
    if hi_byte.is_ascii() && hi.len() > shared + 1 {
        return Some(upper[..=shared].to_string());
    }
    Some(after(lower, shared + 1))
}

/// A key that extends `upper[..from]` and stays below `upper`
fn below_suffix(upper: &str, from: usize) -> Option<String> {
    let hi = upper.as_bytes();
    for at in from..hi.len() {
        if !upper.is_char_boundary(at) {
            continue;
        }
        let byte = hi[at];
        if let Some(digit) = middle_digit(ZERO, Some(byte)) {
            return Some(format!("{}{}", &upper[..at], digit));
        }
        if byte > ZERO {
            return Some(format!("{}0{}", &upper[..at], FIRST_KEY));
        }
    }
    None
}
