//! Content fingerprints (ETags).
//!
//! A fingerprint is the first 8 bytes of a domain-separated Blake3 hash of
//! the document text, hex encoded. It is order-sensitive: reordering lines
//! changes the fingerprint.

/// Length of a fingerprint string in hex characters.
pub const FINGERPRINT_LEN: usize = 16;

const DOMAIN: &[u8] = b"docsync-etag-v1:";

/// Compute the fingerprint of `content`.
pub fn fingerprint(content: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(DOMAIN);
    hasher.update(content.as_bytes());
    let hash = hasher.finalize();
    hex::encode(&hash.as_bytes()[..FINGERPRINT_LEN / 2])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_deterministic() {
        assert_eq!(fingerprint("hello"), fingerprint("hello"));
    }

    #[test]
    fn test_fingerprint_length() {
        assert_eq!(fingerprint("").len(), FINGERPRINT_LEN);
        assert_eq!(fingerprint("some longer text\nwith lines").len(), FINGERPRINT_LEN);
    }

    #[test]
    fn test_fingerprint_order_sensitive() {
        assert_ne!(fingerprint("a\nb"), fingerprint("b\na"));
    }

    #[test]
    fn test_fingerprint_distinguishes_whitespace() {
        assert_ne!(fingerprint("hello"), fingerprint("hello\n"));
        assert_ne!(fingerprint(""), fingerprint(" "));
    }
}
