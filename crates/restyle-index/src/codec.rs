//! Text-safe field codec for the flat index file
//!
//! Index records are one line each with tab-separated fields, so free text
//! (paths, notes) must not contain tabs, newlines or the list separator.
//! Fields pass through a reversible percent escape instead of being rejected.

/// Escape a free-text field for embedding in a tab-separated record line.
pub fn encode_field(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '%' => out.push_str("%25"),
            '\t' => out.push_str("%09"),
            '\n' => out.push_str("%0A"),
            '\r' => out.push_str("%0D"),
            '|' => out.push_str("%7C"),
            _ => out.push(c),
        }
    }
    out
}

/// Reverse [`encode_field`]. Unknown escapes are kept verbatim so a hand
/// edited file degrades instead of failing.
pub fn decode_field(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        let hi = chars.peek().copied();
        let code: Option<char> = match hi {
            Some(h) => {
                let mut it = chars.clone();
                it.next();
                let lo = it.peek().copied();
                match (h, lo) {
                    ('2', Some('5')) => Some('%'),
                    ('0', Some('9')) => Some('\t'),
                    ('0', Some('A')) => Some('\n'),
                    ('0', Some('D')) => Some('\r'),
                    ('7', Some('C')) => Some('|'),
                    _ => None,
                }
            }
            None => None,
        };
        match code {
            Some(decoded) => {
                chars.next();
                chars.next();
                out.push(decoded);
            }
            None => out.push('%'),
        }
    }
    out
}

/// Join an ordered path list into one encoded field.
pub fn encode_list(items: &[String]) -> String {
    items
        .iter()
        .map(|s| encode_field(s))
        .collect::<Vec<_>>()
        .join("|")
}

/// Split an encoded field back into its path list.
pub fn decode_list(s: &str) -> Vec<String> {
    if s.is_empty() {
        return Vec::new();
    }
    s.split('|').map(decode_field).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_special_characters() {
        let cases = [
            "plain",
            "with\ttab",
            "with\nnewline\rand cr",
            "percent 100% done",
            "pipe|separated",
            "früher später 写真 фото",
            "spaces and\tall of it\n|%",
        ];
        for case in cases {
            assert_eq!(decode_field(&encode_field(case)), case, "case: {:?}", case);
        }
    }

    #[test]
    fn test_encoded_is_line_safe() {
        let enc = encode_field("a\tb\nc|d%e");
        assert!(!enc.contains('\t'));
        assert!(!enc.contains('\n'));
        assert!(!enc.contains('|'));
    }

    #[test]
    fn test_list_roundtrip() {
        let items = vec![
            "sub/img 01/001.png".to_string(),
            "sub/img|02/002.png".to_string(),
            "ünïcode/003.png".to_string(),
        ];
        assert_eq!(decode_list(&encode_list(&items)), items);
        assert!(decode_list("").is_empty());
    }

    #[test]
    fn test_unknown_escape_kept() {
        assert_eq!(decode_field("50%"), "50%");
        assert_eq!(decode_field("%zz"), "%zz");
    }
}
