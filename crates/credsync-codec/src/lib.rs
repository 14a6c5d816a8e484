//! # Card Number Codec
//!
//! Lossless, bit-exact conversion between the raw card representation a
//! device reports (a big-endian byte buffer, often with leading zero bytes
//! stripped) and the arbitrary-precision decimal card number stored in the
//! assignment database.
//!
//! Card numbers routinely exceed the range of a 64-bit integer, so every
//! conversion goes through [`num_bigint::BigUint`]. Floating point is never
//! involved.
//!
//! The canonical database form is a fixed-width (64 nibble) uppercase hex
//! string; [`normalize_to_hex`] brings hex or base64 input into that form.

pub mod error;

pub use error::{CodecError, CodecResult};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use num_bigint::BigUint;

/// Canonical width of a card number in hex characters (nibbles).
pub const CANONICAL_HEX_WIDTH: usize = 64;

/// Decode a raw big-endian byte buffer into a decimal card number.
///
/// Leading zero bytes are ignored. An empty or all-zero buffer decodes to
/// `"0"`.
pub fn decode_to_decimal(raw: &[u8]) -> String {
    let stripped: &[u8] = match raw.iter().position(|b| *b != 0) {
        Some(first) => &raw[first..],
        None => &[],
    };

    if stripped.is_empty() {
        return "0".to_string();
    }

    BigUint::from_bytes_be(stripped).to_str_radix(10)
}

/// Decode a hex string into a decimal card number.
///
/// Accepts any-width hex (devices report truncated buffers); leading zeros
/// do not affect the result.
pub fn decode_hex_to_decimal(hex: &str) -> CodecResult<String> {
    let bytes = hex_to_bytes(hex)?;
    Ok(decode_to_decimal(&bytes))
}

/// Encode a decimal card number as big-endian uppercase hex, left-padded
/// with `'0'` to `width` characters.
///
/// A value wider than `width` is returned at its natural width (padded to
/// an even number of nibbles so it remains byte-aligned).
pub fn encode_to_hex(decimal: &str, width: usize) -> CodecResult<String> {
    let value = parse_decimal(decimal)?;
    let mut hex = format!("{value:X}");

    if hex.len() < width {
        hex = format!("{}{}", "0".repeat(width - hex.len()), hex);
    } else if hex.len() % 2 != 0 {
        hex.insert(0, '0');
    }

    Ok(hex)
}

/// Encode a decimal card number as standard base64 over its canonical-width
/// byte representation.
pub fn encode_to_base64(decimal: &str) -> CodecResult<String> {
    let hex = encode_to_hex(decimal, CANONICAL_HEX_WIDTH)?;
    let bytes = hex_to_bytes(&hex)?;
    Ok(BASE64.encode(bytes))
}

/// Normalize card data to the canonical fixed-width uppercase hex form.
///
/// Input consisting solely of hex digits is treated as hex; anything else
/// is attempted as base64. Input that is neither yields
/// [`CodecError::UnrecognizedFormat`].
pub fn normalize_to_hex(input: &str) -> CodecResult<String> {
    if !input.is_empty() && input.chars().all(|c| c.is_ascii_hexdigit()) {
        let decimal = decode_hex_to_decimal(input)?;
        return encode_to_hex(&decimal, CANONICAL_HEX_WIDTH);
    }

    match BASE64.decode(input) {
        Ok(bytes) => {
            let decimal = decode_to_decimal(&bytes);
            encode_to_hex(&decimal, CANONICAL_HEX_WIDTH)
        }
        Err(_) => Err(CodecError::UnrecognizedFormat {
            value: input.to_string(),
        }),
    }
}

/// Compare two card representations by numeric value.
///
/// Devices strip leading zero bytes, so `"AABBCC"` and the canonical
/// 64-nibble form of the same number must compare equal. Input that cannot
/// be decoded never compares equal to anything.
pub fn cards_equal(a: &str, b: &str) -> bool {
    match (decode_hex_to_decimal(a), decode_hex_to_decimal(b)) {
        (Ok(left), Ok(right)) => left == right,
        _ => false,
    }
}

fn parse_decimal(decimal: &str) -> CodecResult<BigUint> {
    if decimal.is_empty() || !decimal.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CodecError::invalid_decimal(decimal));
    }

    BigUint::parse_bytes(decimal.as_bytes(), 10)
        .ok_or_else(|| CodecError::invalid_decimal(decimal))
}

fn hex_to_bytes(hex: &str) -> CodecResult<Vec<u8>> {
    if hex.is_empty() {
        return Ok(Vec::new());
    }

    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(CodecError::invalid_hex(format!(
            "non-hex character in {hex:?}"
        )));
    }

    // Left-pad odd-width input so byte pairs line up.
    let padded;
    let aligned = if hex.len() % 2 == 0 {
        hex
    } else {
        padded = format!("0{hex}");
        &padded
    };

    aligned
        .as_bytes()
        .chunks(2)
        .map(|pair| {
            let s = std::str::from_utf8(pair)
                .map_err(|e| CodecError::invalid_hex(format!("byte {pair:?}: {e}")))?;
            u8::from_str_radix(s, 16)
                .map_err(|e| CodecError::invalid_hex(format!("byte {s:?}: {e}")))
        })
        .collect()
}
