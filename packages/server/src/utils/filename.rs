/// Final path component of a client-supplied filename. Browsers on Windows may send
/// full paths with backslashes.
pub fn basename(name: &str) -> &str {
    let trimmed = name.trim();
    trimmed
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(trimmed)
}

/// Longest extension (without the dot) kept on blob keys and references.
const MAX_EXTENSION_LEN: usize = 10;

/// Split a filename into its stem and lowercase extension (including the dot).
///
/// Dotfiles (`.env`) have no extension. Extensions that are too long or contain
/// anything but ASCII alphanumerics are treated as part of the stem.
pub fn split_extension(name: &str) -> (&str, Option<String>) {
    let base = basename(name);
    match base.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty()
                && !ext.is_empty()
                && ext.len() <= MAX_EXTENSION_LEN
                && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            (stem, Some(format!(".{}", ext.to_ascii_lowercase())))
        }
        _ => (base, None),
    }
}

/// Build a safe `Content-Disposition` header value.
pub fn content_disposition_value(filename: &str) -> String {
    let ascii_safe: String = basename(filename)
        .chars()
        .filter(|c| c.is_ascii_graphic() && !matches!(c, '"' | ';' | '\\'))
        .collect();
    let ascii_name = if ascii_safe.is_empty() {
        "download".to_string()
    } else {
        ascii_safe
    };

    // RFC 5987 percent-encoding for filename*.
    let encoded: String = basename(filename)
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'!'
            | b'#'
            | b'$'
            | b'&'
            | b'+'
            | b'-'
            | b'.'
            | b'^'
            | b'_'
            | b'`'
            | b'|'
            | b'~' => String::from(b as char),
            _ => format!("%{b:02X}"),
        })
        .collect();

    format!("inline; filename=\"{ascii_name}\"; filename*=UTF-8''{encoded}")
}
