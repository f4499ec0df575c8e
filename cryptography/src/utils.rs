//! Hexadecimal helpers shared by the public-facing encodings.

/// Converts bytes to a lowercase hexadecimal string.
pub fn hex(bytes: &[u8]) -> String {
    const DIGITS: &[u8; 16] = b"0123456789abcdef";
    let mut hex = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        hex.push(DIGITS[(byte >> 4) as usize] as char);
        hex.push(DIGITS[(byte & 0x0f) as usize] as char);
    }
    hex
}

/// Converts a hexadecimal string (either case) to bytes.
///
/// Returns `None` if the string has an odd length or contains a non-hex character.
pub fn from_hex(hex: &str) -> Option<Vec<u8>> {
    let hex = hex.as_bytes();
    if hex.len() % 2 != 0 {
        return None;
    }
    hex.chunks_exact(2)
        .map(|pair| Some((nibble(pair[0])? << 4) | nibble(pair[1])?))
        .collect()
}

/// Converts a hexadecimal string to bytes, stripping surrounding whitespace and/or a `0x` prefix.
///
/// Used for caller-supplied keys, digests, and signatures, which are often copied from
/// other tools with a prefix or trailing newline.
pub fn from_hex_formatted(hex: &str) -> Option<Vec<u8>> {
    let hex = hex.trim();
    let hex = hex
        .strip_prefix("0x")
        .or_else(|| hex.strip_prefix("0X"))
        .unwrap_or(hex);
    from_hex(hex)
}

fn nibble(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex() {
        // Test case 0: empty bytes
        let b = &[];
        let h = hex(b);
        assert_eq!(h, "");
        assert_eq!(from_hex(&h).unwrap(), b.to_vec());

        // Test case 1: single byte
        let b = &[0x01];
        let h = hex(b);
        assert_eq!(h, "01");
        assert_eq!(from_hex(&h).unwrap(), b.to_vec());

        // Test case 2: full nibble range
        let b = &[0x0f, 0xa0, 0xff];
        let h = hex(b);
        assert_eq!(h, "0fa0ff");
        assert_eq!(from_hex(&h).unwrap(), b.to_vec());

        // Test case 3: odd number of digits
        assert!(from_hex("0102030").is_none());

        // Test case 4: invalid hexadecimal character
        assert!(from_hex("01g3").is_none());

        // Test case 5: uppercase input
        assert_eq!(from_hex("0FA0FF").unwrap(), vec![0x0f, 0xa0, 0xff]);
    }

    #[test]
    fn test_from_hex_formatted() {
        let b = vec![0x01, 0x02, 0x03];

        // Test case 0: plain
        assert_eq!(from_hex_formatted("010203").unwrap(), b);

        // Test case 1: 0x prefix
        assert_eq!(from_hex_formatted("0x010203").unwrap(), b);
        assert_eq!(from_hex_formatted("0X010203").unwrap(), b);

        // Test case 2: surrounding whitespace
        assert_eq!(from_hex_formatted("  0x010203\n").unwrap(), b);

        // Test case 3: interior whitespace is not stripped
        assert!(from_hex_formatted("01 02 03").is_none());

        // Test case 4: multibyte characters never panic
        assert!(from_hex_formatted("é1").is_none());
    }
}
