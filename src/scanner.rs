//! Candidate scanning
//!
//! Pure text-pattern extraction over a document. Finds substrings shaped
//! like addresses, private keys, and quoted ENS names, with boundary rules
//! that keep longer hex blobs from matching. No network, no state: every
//! validation pass re-scans the full text.

use crate::proto::StringLocation;
use once_cell::sync::Lazy;
use regex::Regex;

/// Hard cap per scan, independent of the configurable diagnostics limit.
const MAX_MATCHES: usize = 100;

static ADDRESS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"0x[0-9a-fA-F]{40}").unwrap());

static PRIVATE_KEY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(0x)?[0-9a-fA-F]{64}").unwrap());

static ENS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"["']([^"'\s]+\.[a-zA-Z]{3})["']"#).unwrap());

/// Finds `0x`-prefixed 40-hex-digit runs. A trailing alphanumeric character
/// disqualifies the match, so a longer hex blob is never reported as an
/// address with its tail cut off.
pub fn find_address_candidates(text: &str) -> Vec<StringLocation> {
    let index = LineIndex::new(text);
    let mut out = Vec::new();

    for m in ADDRESS_RE.find_iter(text) {
        if out.len() >= MAX_MATCHES {
            break;
        }
        if alnum_after(text, m.end()) {
            continue;
        }
        out.push(locate(text, &index, m.start(), m.end(), m.as_str().to_string()));
    }

    out
}

/// Finds 64-hex-digit runs with or without a `0x` prefix, requiring word
/// boundaries on both sides. Content is normalized to carry the prefix;
/// the reported range covers the text as written.
pub fn find_private_key_candidates(text: &str) -> Vec<StringLocation> {
    let index = LineIndex::new(text);
    let mut out = Vec::new();

    for m in PRIVATE_KEY_RE.find_iter(text) {
        if out.len() >= MAX_MATCHES {
            break;
        }
        if alnum_before(text, m.start()) || alnum_after(text, m.end()) {
            continue;
        }

        let content = if m.as_str().starts_with("0x") {
            m.as_str().to_string()
        } else {
            format!("0x{}", m.as_str())
        };
        out.push(locate(text, &index, m.start(), m.end(), content));
    }

    out
}

/// Finds quoted dotted names ending in a three-letter suffix. Quotes are
/// excluded from both the content and the reported range.
pub fn find_ens_candidates(text: &str) -> Vec<StringLocation> {
    let index = LineIndex::new(text);
    let mut out = Vec::new();

    for caps in ENS_RE.captures_iter(text) {
        if out.len() >= MAX_MATCHES {
            break;
        }
        if let Some(name) = caps.get(1) {
            out.push(locate(
                text,
                &index,
                name.start(),
                name.end(),
                name.as_str().to_string(),
            ));
        }
    }

    out
}

fn alnum_before(text: &str, offset: usize) -> bool {
    text[..offset]
        .chars()
        .next_back()
        .is_some_and(|c| c.is_ascii_alphanumeric())
}

fn alnum_after(text: &str, offset: usize) -> bool {
    text[offset..]
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphanumeric())
}

fn locate(
    text: &str,
    index: &LineIndex,
    start: usize,
    end: usize,
    content: String,
) -> StringLocation {
    let (start_line, start_col) = index.position(text, start);
    let (end_line, end_col) = index.position(text, end);
    StringLocation {
        start_line,
        start_col,
        end_line,
        end_col,
        content,
    }
}

/// Byte offsets of line starts, so regex match offsets convert to protocol
/// positions. Columns count UTF-16 code units.
struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    fn new(text: &str) -> Self {
        let mut starts = vec![0];
        for (i, b) in text.bytes().enumerate() {
            if b == b'\n' {
                starts.push(i + 1);
            }
        }
        Self { starts }
    }

    fn position(&self, text: &str, offset: usize) -> (u32, u32) {
        let line = self.starts.partition_point(|&s| s <= offset) - 1;
        let col = text[self.starts[line]..offset].encode_utf16().count();
        (line as u32, col as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finds_address_with_position() {
        let text = "let a = \"0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed\";";
        let found = find_address_candidates(text);

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].content, "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed");
        assert_eq!(found[0].start_line, 0);
        assert_eq!(found[0].start_col, 9);
        assert_eq!(found[0].end_col, 51);
    }

    #[test]
    fn test_address_on_later_line() {
        let text = "first line\nsend(0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045)";
        let found = find_address_candidates(text);

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].start_line, 1);
        assert_eq!(found[0].start_col, 5);
        assert_eq!(found[0].end_col, 47);
    }

    #[test]
    fn test_address_rejects_41_hex_run() {
        let text = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed1";
        assert!(find_address_candidates(text).is_empty());
    }

    #[test]
    fn test_address_cap() {
        let text: String = (0..120)
            .map(|i| format!("0x{:040x}", i))
            .collect::<Vec<_>>()
            .join("\n");
        assert_eq!(find_address_candidates(&text).len(), 100);
    }

    #[test]
    fn test_private_key_normalizes_prefix() {
        let bare = "a".repeat(64);
        let text = format!("key = {}", bare);
        let found = find_private_key_candidates(&text);

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].content, format!("0x{}", bare));
        assert_eq!(found[0].end_col - found[0].start_col, 64);
    }

    #[test]
    fn test_private_key_keeps_existing_prefix() {
        let text = format!("key = 0x{}", "1".repeat(64));
        let found = find_private_key_candidates(&text);

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].content, format!("0x{}", "1".repeat(64)));
        assert_eq!(found[0].end_col - found[0].start_col, 66);
    }

    #[test]
    fn test_private_key_requires_boundaries() {
        // 65 hex digits: no 64-digit window with clean boundaries
        let long = format!("0x{}", "b".repeat(65));
        assert!(find_private_key_candidates(&long).is_empty());

        // preceding alphanumeric character
        let glued = format!("zz{}", "c".repeat(64));
        assert!(find_private_key_candidates(&glued).is_empty());
    }

    #[test]
    fn test_ens_strips_quotes() {
        let text = "let name = \"vitalik.eth\";";
        let found = find_ens_candidates(text);

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].content, "vitalik.eth");
        assert_eq!(found[0].start_col, 12);
        assert_eq!(found[0].end_col, 23);
    }

    #[test]
    fn test_ens_single_quotes_and_subdomains() {
        let text = "resolve('pay.vitalik.eth')";
        let found = find_ens_candidates(text);

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].content, "pay.vitalik.eth");
    }

    #[test]
    fn test_ens_requires_quotes() {
        assert!(find_ens_candidates("vitalik.eth").is_empty());
    }

    #[test]
    fn test_columns_count_utf16_units() {
        // the emoji is two UTF-16 code units
        let text = "// \u{1F600} 0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";
        let found = find_address_candidates(text);

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].start_col, 6);
        assert_eq!(found[0].end_col, 48);
    }
}
