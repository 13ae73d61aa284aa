//! Path, text-decoding and time helpers shared by the reader and exporters.

use std::borrow::Cow;

/// Get a time-based token for synthesized file names.
pub fn time_seed_nanos() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(12345)
}

/// Strip UTF-8 BOM if present.
pub fn strip_bom(data: &[u8]) -> &[u8] {
    if data.starts_with(&[0xEF, 0xBB, 0xBF]) {
        &data[3..]
    } else {
        data
    }
}

/// Strip exactly one leading `/` from an archive path.
pub fn normalize_entry_path(path: &str) -> &str {
    path.strip_prefix('/').unwrap_or(path)
}

/// Resolve an href from the package document against the root directory.
///
/// An href starting with `/` is taken verbatim minus that slash. Anything
/// else is joined onto `root_dir`, and one leading `./` is stripped from the
/// result. No `..` collapsing is done.
///
/// ```ignore
/// assert_eq!(join_root("OEBPS", "text/ch1.xhtml"), "OEBPS/text/ch1.xhtml");
/// assert_eq!(join_root("OEBPS", "/cover.jpg"), "cover.jpg");
/// assert_eq!(join_root(".", "ch1.xhtml"), "ch1.xhtml");
/// ```
pub fn join_root(root_dir: &str, href: &str) -> String {
    if let Some(absolute) = href.strip_prefix('/') {
        return absolute.to_string();
    }

    let joined = if root_dir.is_empty() {
        href.to_string()
    } else {
        format!("{}/{}", root_dir.trim_end_matches('/'), href)
    };

    match joined.strip_prefix("./") {
        Some(stripped) => stripped.to_string(),
        None => joined,
    }
}

/// Directory portion of an archive path (`""` when there is none).
pub fn parent_dir(path: &str) -> &str {
    path.rfind('/').map(|i| &path[..i]).unwrap_or("")
}

/// Last path component, ignoring any trailing slashes.
///
/// Returns `""` for empty input or a bare `/`.
pub fn basename(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

/// Decode bytes to a string, handling various encodings.
///
/// This function:
/// 1. First tries UTF-8 (handles BOM automatically via encoding_rs)
/// 2. If malformed, tries the hint encoding (from `<?xml encoding="..."?>`)
/// 3. Falls back to Windows-1252 (common in old ebooks)
///
/// Uses `Cow<str>` to avoid allocation when the input is valid UTF-8.
pub fn decode_text<'a>(bytes: &'a [u8], hint_encoding: Option<&str>) -> Cow<'a, str> {
    let (result, _encoding, malformed) = encoding_rs::UTF_8.decode(bytes);

    if !malformed {
        return result;
    }

    if let Some(name) = hint_encoding
        && let Some(encoding) = encoding_rs::Encoding::for_label(name.as_bytes())
    {
        let (result, _, _) = encoding.decode(bytes);
        return result;
    }

    // Windows-1252 is a superset of ISO-8859-1
    let (result, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    result
}

/// Extract encoding from XML declaration.
///
/// Parses `<?xml ... encoding="..." ?>` within the first 100 bytes.
pub fn extract_xml_encoding(bytes: &[u8]) -> Option<&str> {
    let check_len = bytes.len().min(100);
    let prefix = &bytes[..check_len];

    let xml_start = prefix.windows(5).position(|w| w == b"<?xml")?;
    let after_xml = &prefix[xml_start..];

    let enc_pos = after_xml
        .windows(9)
        .position(|w| w.eq_ignore_ascii_case(b"encoding="))?;
    let after_enc = &after_xml[enc_pos + 9..];

    if after_enc.is_empty() {
        return None;
    }

    let quote = after_enc[0];
    if quote != b'"' && quote != b'\'' {
        return None;
    }

    let value_end = after_enc[1..].iter().position(|&b| b == quote)? + 1;

    std::str::from_utf8(&after_enc[1..value_end]).ok()
}
