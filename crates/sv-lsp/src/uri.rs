//! Minimal `file://` URI handling.
//!
//! The server only ever sees file URIs from the client and only ever
//! emits them back, so a full URI implementation is not needed; percent
//! decoding covers the characters editors actually escape.

use std::path::{Path, PathBuf};

/// `file:///a/b%20c.sv` to `/a/b c.sv`. Returns `None` for non-file
/// schemes.
pub fn uri_to_path(uri: &str) -> Option<PathBuf> {
    let rest = uri.strip_prefix("file://")?;
    // Strip an authority component (usually empty): file://host/path.
    let path = match rest.find('/') {
        Some(0) => rest,
        Some(slash) => &rest[slash..],
        None => return None,
    };
    Some(PathBuf::from(percent_decode(path)))
}

/// `/a/b c.sv` to `file:///a/b%20c.sv`.
pub fn path_to_uri(path: &Path) -> String {
    let mut encoded = String::from("file://");
    for byte in path.to_string_lossy().bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'/' | b'.' | b'-' | b'_' | b'~' => {
                encoded.push(byte as char)
            }
            other => {
                encoded.push('%');
                encoded.push_str(&format!("{other:02X}"));
            }
        }
    }
    encoded
}

fn percent_decode(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut index = 0;
    while index < bytes.len() {
        if bytes[index] == b'%' && index + 2 < bytes.len() + 1 {
            if let Some(value) = hex_pair(bytes.get(index + 1), bytes.get(index + 2)) {
                out.push(value);
                index += 3;
                continue;
            }
        }
        out.push(bytes[index]);
        index += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_pair(high: Option<&u8>, low: Option<&u8>) -> Option<u8> {
    let high = (*high? as char).to_digit(16)?;
    let low = (*low? as char).to_digit(16)?;
    Some((high * 16 + low) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_plain_paths() {
        let path = PathBuf::from("/work/rtl/top.sv");
        assert_eq!(uri_to_path(&path_to_uri(&path)), Some(path));
    }

    #[test]
    fn decodes_escaped_characters() {
        assert_eq!(
            uri_to_path("file:///work/my%20project/a.sv"),
            Some(PathBuf::from("/work/my project/a.sv"))
        );
    }

    #[test]
    fn rejects_other_schemes() {
        assert_eq!(uri_to_path("untitled:Untitled-1"), None);
    }
}
