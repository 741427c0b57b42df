use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::error::{ClientError, Result};

/// Decode a base64url application server key into raw bytes.
///
/// Maps the URL-safe alphabet back to the standard one and pads to a
/// multiple of four before decoding.
pub fn decode_base64url(key: &str) -> Result<Vec<u8>> {
    let key = key.trim();
    if key.is_empty() {
        return Err(ClientError::InvalidKey("empty key".into()));
    }
    let mut standard: String = key
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();
    let padding = (4 - standard.len() % 4) % 4;
    standard.extend(std::iter::repeat('=').take(padding));
    Ok(STANDARD.decode(standard)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_key_decodes_to_known_bytes() {
        assert_eq!(decode_base64url("abc").unwrap(), vec![0x69, 0xb7]);
    }

    #[test]
    fn url_safe_characters_are_mapped() {
        // "-_8" is "+/8=" in the standard alphabet
        assert_eq!(decode_base64url("-_8").unwrap(), vec![0xfb, 0xff]);
    }

    #[test]
    fn p256_public_key_is_65_bytes() {
        let key = "BEl62iUYgUivxIkv69yViEuiBIa-Ib9-SkvMeAtA3LFgDzkrxZJjSgSnfckjBJuBkr3qBUYIHBQFLXYp5Nksh8U";
        let bytes = decode_base64url(key).unwrap();
        assert_eq!(bytes.len(), 65);
        assert_eq!(bytes[0], 0x04);
    }

    #[test]
    fn rejects_empty_and_garbage() {
        assert!(matches!(decode_base64url(""), Err(ClientError::InvalidKey(_))));
        assert!(decode_base64url("a!b@").is_err());
    }
}
