//! Byte-to-string decoding (§1 "out of scope: treated as external
//! collaborator", §6 `encoding` option): transport label → BOM sniff →
//! `<meta charset>` sniff → `windows-1252` fallback.
//!
//! This crate only ever receives `&str` at the tokenizer boundary, so this
//! module's job is narrow: turn a byte slice plus an optional
//! transport-supplied label into a `(String, &'static str)` pair before
//! anything else runs. Grounded in the C1 remap table already used by
//! [`crate::entities`] for the `windows-1252` fallback case.

/// Result of sniffing an encoding: the decoded text plus the canonical
/// label that was used, matching `Parsed.encoding` (§6).
pub struct Decoded {
    pub text: String,
    pub encoding: &'static str,
}

/// Decodes `bytes` to a `String`, in the priority order §1 calls out:
/// a BOM always wins; otherwise a transport label (if given and
/// recognized); otherwise a `<meta charset=...>` sniffed from the first
/// 1024 bytes; otherwise `windows-1252`.
pub fn decode(bytes: &[u8], transport_label: Option<&str>) -> Decoded {
    if let Some(rest) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return Decoded {
            text: String::from_utf8_lossy(rest).into_owned(),
            encoding: "utf-8",
        };
    }
    if bytes.starts_with(&[0xFE, 0xFF]) || bytes.starts_with(&[0xFF, 0xFE]) {
        // UTF-16 input without a UTF-16 codec on hand: fall back to Latin-1
        // byte-pair discard of the BOM, which loses information but never
        // panics. Out of scope beyond BOM detection itself.
        return Decoded {
            text: String::from_utf8_lossy(&bytes[2..]).into_owned(),
            encoding: if bytes[0] == 0xFE { "utf-16be" } else { "utf-16le" },
        };
    }

    if let Some(label) = transport_label.and_then(canonicalize_label) {
        if label == "utf-8" {
            return Decoded {
                text: String::from_utf8_lossy(bytes).into_owned(),
                encoding: "utf-8",
            };
        }
        return Decoded {
            text: windows_1252_decode(bytes),
            encoding: label,
        };
    }

    if let Some(label) = sniff_meta_charset(bytes).and_then(|l| canonicalize_label(&l)) {
        if label == "utf-8" {
            return Decoded {
                text: String::from_utf8_lossy(bytes).into_owned(),
                encoding: "utf-8",
            };
        }
        return Decoded {
            text: windows_1252_decode(bytes),
            encoding: label,
        };
    }

    Decoded {
        text: windows_1252_decode(bytes),
        encoding: "windows-1252",
    }
}

fn canonicalize_label(label: &str) -> Option<&'static str> {
    match label.trim().to_ascii_lowercase().as_str() {
        "utf-8" | "utf8" => Some("utf-8"),
        "windows-1252" | "cp1252" | "iso-8859-1" | "latin1" => Some("windows-1252"),
        _ => None,
    }
}

/// Scans the first 1024 bytes (as Latin-1, since we don't know the
/// encoding yet) for `<meta charset="...">` or
/// `<meta http-equiv="Content-Type" content="...charset=...">`.
fn sniff_meta_charset(bytes: &[u8]) -> Option<String> {
    let window = &bytes[..bytes.len().min(1024)];
    let ascii: String = window.iter().map(|&b| b as char).collect();
    let lower = ascii.to_ascii_lowercase();

    if let Some(idx) = lower.find("charset=") {
        let rest = &ascii[idx + "charset=".len()..];
        return Some(read_token(rest));
    }
    None
}

fn read_token(s: &str) -> String {
    let s = s.trim_start_matches(['"', '\'']);
    s.chars()
        .take_while(|c| !matches!(c, '"' | '\'' | ' ' | '>' | ';'))
        .collect()
}

/// `windows-1252` is a superset of Latin-1 in the printable range and
/// remaps 0x80-0x9F the same way [`crate::entities::remap_numeric`] does
/// for numeric character references, so every byte maps to exactly one
/// `char` with no failure case.
fn windows_1252_decode(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| crate::entities::remap_numeric(b as u32))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf8_bom_is_stripped_and_reported() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice("hi".as_bytes());
        let d = decode(&bytes, None);
        assert_eq!(d.text, "hi");
        assert_eq!(d.encoding, "utf-8");
    }

    #[test]
    fn meta_charset_sniffed_when_no_transport_label() {
        let html = br#"<html><head><meta charset="utf-8"></head></html>"#;
        let d = decode(html, None);
        assert_eq!(d.encoding, "utf-8");
    }

    #[test]
    fn unknown_bytes_fall_back_to_windows_1252() {
        let d = decode(&[0x80], None);
        assert_eq!(d.encoding, "windows-1252");
        assert_eq!(d.text, "\u{20AC}");
    }

    #[test]
    fn transport_label_wins_over_sniffing() {
        let html = br#"<meta charset="utf-8">"#;
        let d = decode(html, Some("windows-1252"));
        assert_eq!(d.encoding, "windows-1252");
    }
}
