//! Candidate classification
//!
//! Deterministic validation of scanner output. Address validity follows the
//! mixed-case checksum scheme: letter casing encodes a hash of the lowercase
//! digits, with all-lowercase and all-uppercase accepted as checksum-exempt
//! raw forms. Private keys are validated by actually deriving a key pair;
//! any decode failure means "not a private key", with no distinction between
//! malformed hex and an out-of-range scalar.

use crate::proto::WordKind;
use k256::ecdsa::SigningKey;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use sha3::{Digest, Keccak256};

pub(crate) fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Canonical mixed-case form of an address. Returns `None` unless the input
/// is `0x` followed by exactly 40 hex digits.
pub fn to_checksum_address(address: &str) -> Option<String> {
    let hex_part = address.strip_prefix("0x")?;
    if hex_part.len() != 40 || !hex_part.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }

    let lower = hex_part.to_lowercase();
    let hash = keccak256(lower.as_bytes());

    let mut out = String::with_capacity(42);
    out.push_str("0x");
    for (i, c) in lower.chars().enumerate() {
        let nibble = if i % 2 == 0 {
            hash[i / 2] >> 4
        } else {
            hash[i / 2] & 0x0f
        };
        if c.is_ascii_alphabetic() && nibble >= 8 {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
    }
    Some(out)
}

/// True for the canonical mixed-case form and for the checksum-exempt
/// all-lowercase / all-uppercase forms. Mixed case with the wrong
/// capitalization is invalid.
pub fn is_valid_address(address: &str) -> bool {
    let Some(hex_part) = address.strip_prefix("0x") else {
        return false;
    };
    if hex_part.len() != 40 || !hex_part.bytes().all(|b| b.is_ascii_hexdigit()) {
        return false;
    }

    if hex_part.bytes().all(|b| !b.is_ascii_uppercase())
        || hex_part.bytes().all(|b| !b.is_ascii_lowercase())
    {
        return true;
    }

    to_checksum_address(address).is_some_and(|canonical| canonical == address)
}

/// Derives the checksummed account address controlled by a private key.
/// Accepts the key with or without a `0x` prefix.
pub fn to_public_address(private_key: &str) -> Option<String> {
    let hex_part = private_key.strip_prefix("0x").unwrap_or(private_key);
    if hex_part.len() != 64 {
        return None;
    }

    let bytes = hex::decode(hex_part).ok()?;
    let signing = SigningKey::from_slice(&bytes).ok()?;
    let point = signing.verifying_key().to_encoded_point(false);

    // drop the 0x04 uncompressed-point tag, hash, keep the trailing 20 bytes
    let hash = keccak256(&point.as_bytes()[1..]);
    to_checksum_address(&format!("0x{}", hex::encode(&hash[12..])))
}

pub fn is_private_key(candidate: &str) -> bool {
    to_public_address(candidate).is_some()
}

/// What a word under the cursor is, tried in priority order: address first,
/// then private key, then name shape.
pub fn classify_word(word: &str) -> WordKind {
    if is_valid_address(word) {
        WordKind::Address
    } else if is_private_key(word) {
        WordKind::PrivateKey
    } else if looks_like_ens_name(word) {
        WordKind::EnsName
    } else {
        WordKind::Unknown
    }
}

fn looks_like_ens_name(word: &str) -> bool {
    match word.rsplit_once('.') {
        Some((head, tld)) => {
            !head.is_empty() && tld.len() == 3 && tld.bytes().all(|b| b.is_ascii_alphabetic())
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHECKSUM_VECTORS: [&str; 4] = [
        "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed",
        "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359",
        "0xdbF03B407c01E7cD3CBea99509d93f8DDDC8C6FB",
        "0xD1220A0cf47c7B9Be7A2E6BA89F429762e7b9aDb",
    ];

    #[test]
    fn test_checksum_accepts_canonical_forms() {
        for vector in CHECKSUM_VECTORS {
            assert!(is_valid_address(vector), "rejected {vector}");
            assert_eq!(to_checksum_address(vector).as_deref(), Some(vector));
        }
    }

    #[test]
    fn test_checksum_rejects_single_case_mutation() {
        for vector in CHECKSUM_VECTORS {
            let mut mutated: Vec<char> = vector.chars().collect();
            let flip = mutated
                .iter()
                .skip(2)
                .position(|c| c.is_ascii_alphabetic())
                .unwrap()
                + 2;
            mutated[flip] = if mutated[flip].is_ascii_uppercase() {
                mutated[flip].to_ascii_lowercase()
            } else {
                mutated[flip].to_ascii_uppercase()
            };
            let mutated: String = mutated.into_iter().collect();
            assert!(!is_valid_address(&mutated), "accepted {mutated}");
        }
    }

    #[test]
    fn test_raw_case_forms_are_exempt() {
        let canonical = CHECKSUM_VECTORS[0];
        let lower = canonical.to_lowercase();
        let upper = format!("0x{}", canonical[2..].to_uppercase());

        assert!(is_valid_address(&lower));
        assert!(is_valid_address(&upper));
    }

    #[test]
    fn test_checksum_is_idempotent() {
        let lower = "0xd8da6bf26964af9d7eed9e03e53415d37aa96045";
        let once = to_checksum_address(lower).unwrap();
        let twice = to_checksum_address(&once).unwrap();

        assert_eq!(once, "0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045");
        assert_eq!(once, twice);
    }

    #[test]
    fn test_malformed_addresses_rejected() {
        assert!(!is_valid_address("0x123"));
        assert!(!is_valid_address("d8da6bf26964af9d7eed9e03e53415d37aa96045"));
        assert!(!is_valid_address("0xg8da6bf26964af9d7eed9e03e53415d37aa96045"));
        assert!(to_checksum_address("0x123").is_none());
    }

    #[test]
    fn test_private_key_derives_known_address() {
        let key = format!("0x{}{}", "0".repeat(63), "1");
        assert_eq!(
            to_public_address(&key).as_deref(),
            Some("0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf")
        );

        // prefix is optional
        let bare = format!("{}{}", "0".repeat(63), "1");
        assert!(is_private_key(&bare));
    }

    #[test]
    fn test_private_key_rejects_out_of_range_scalars() {
        // zero and above-curve-order values decode as hex but are not keys
        assert!(!is_private_key(&"0".repeat(64)));
        assert!(!is_private_key(&"f".repeat(64)));
        assert!(!is_private_key("0x1234"));
        assert!(!is_private_key(&format!("{}zz", "0".repeat(62))));
    }

    #[test]
    fn test_classify_word_priority() {
        assert_eq!(
            classify_word("0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045"),
            WordKind::Address
        );
        assert_eq!(
            classify_word(&format!("0x{}{}", "0".repeat(63), "1")),
            WordKind::PrivateKey
        );
        assert_eq!(classify_word("vitalik.eth"), WordKind::EnsName);
        assert_eq!(classify_word("hello"), WordKind::Unknown);
        assert_eq!(classify_word("london.2024x"), WordKind::Unknown);
    }
}
