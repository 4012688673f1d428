//! Fixed-width ASCII fields and ASCII-digit to BCD conversion.

/// Converts a string of decimal digits into `out_length` bytes.
///
/// With `packed` set, two digits go in each byte (BCD); otherwise one digit
/// per byte. The result is zero-padded on the left or truncated from the
/// left to exactly `out_length` bytes. Any non-digit character yields an
/// empty vector.
pub fn ascii_to_bcd(text: &str, packed: bool, out_length: usize) -> Vec<u8> {
    if !text.bytes().all(|b| b.is_ascii_digit()) {
        return Vec::new();
    }
    let digits: Vec<u8> = text.bytes().map(|b| b - b'0').collect();

    let bytes: Vec<u8> = if packed {
        let mut padded = digits;
        if padded.len() % 2 != 0 {
            padded.insert(0, 0);
        }
        padded.chunks(2).map(|pair| (pair[0] << 4) | pair[1]).collect()
    } else {
        digits
    };

    if bytes.len() >= out_length {
        bytes[bytes.len() - out_length..].to_vec()
    } else {
        let mut out = vec![0u8; out_length - bytes.len()];
        out.extend(bytes);
        out
    }
}

/// Encodes `text` into exactly `width` ASCII bytes, space padded on the right.
///
/// Non-ASCII characters are replaced with `?`; longer input is truncated.
pub fn to_ascii_field(text: &str, width: usize) -> Vec<u8> {
    let mut out: Vec<u8> = text
        .chars()
        .map(|c| if c.is_ascii() { c as u8 } else { b'?' })
        .take(width)
        .collect();
    out.resize(width, b' ');
    out
}

/// Decodes an ASCII field, trimming trailing spaces and NULs.
pub fn from_ascii_field(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| if b.is_ascii() { b as char } else { '?' })
        .collect::<String>()
        .trim_end_matches([' ', '\0'])
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_to_bcd_packed() {
        assert_eq!(ascii_to_bcd("1234", true, 2), vec![0x12, 0x34]);
        assert_eq!(ascii_to_bcd("123", true, 3), vec![0x00, 0x01, 0x23]);
        assert_eq!(ascii_to_bcd("123456", true, 2), vec![0x34, 0x56]);
    }

    #[test]
    fn test_ascii_to_bcd_unpacked() {
        assert_eq!(ascii_to_bcd("907", false, 4), vec![0, 9, 0, 7]);
    }

    #[test]
    fn test_ascii_to_bcd_fails_closed() {
        assert!(ascii_to_bcd("12a4", true, 2).is_empty());
        assert!(ascii_to_bcd("-1", false, 2).is_empty());
    }

    #[test]
    fn test_ascii_fields() {
        assert_eq!(to_ascii_field("AB", 3), b"AB ".to_vec());
        assert_eq!(to_ascii_field("ABCDEF", 3), b"ABC".to_vec());
        assert_eq!(from_ascii_field(b"XY \0"), "XY");
    }
}
