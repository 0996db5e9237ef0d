//! `Content-Disposition` handling for uploads and downloads.
//!
//! Uploads announce the original file name; non-ASCII names use the RFC 5987
//! `filename*=utf-8''...` form. Downloads take their file name from the same
//! header when the service sends one.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// RFC 5987 `attr-char` minus ALPHA / DIGIT: everything else is escaped.
const ATTR_CHAR: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'!')
    .remove(b'#')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b'-')
    .remove(b'.')
    .remove(b'^')
    .remove(b'_')
    .remove(b'`')
    .remove(b'|')
    .remove(b'~');

/// Build the header value for uploading `filename`.
pub fn make_content_disposition(filename: &str) -> String {
    if filename.is_ascii() && !filename.contains('"') {
        format!("attachment; filename=\"{filename}\"")
    } else {
        format!(
            "attachment; filename*=utf-8''{}",
            utf8_percent_encode(filename, ATTR_CHAR)
        )
    }
}

/// Extract the file name from a `Content-Disposition` header value.
///
/// `filename*` wins over `filename` when both are present. The returned name
/// is reduced to its final path component.
pub fn filename_from_content_disposition(header: &str) -> Option<String> {
    let mut plain = None;
    let mut extended = None;

    for segment in header.split(';').map(str::trim) {
        let Some((key, value)) = segment.split_once('=') else {
            continue;
        };
        match key.trim().to_ascii_lowercase().as_str() {
            "filename*" => {
                let value = value.trim().trim_matches('"');
                // charset'language'percent-encoded
                let encoded = value.splitn(3, '\'').nth(2).unwrap_or(value);
                extended = percent_decode_str(encoded)
                    .decode_utf8()
                    .ok()
                    .map(|name| name.into_owned());
            }
            "filename" => {
                plain = Some(value.trim().trim_matches('"').to_string());
            }
            _ => {}
        }
    }

    extended
        .or(plain)
        .map(|name| sanitize_filename(&name))
        .filter(|name| !name.is_empty())
}

/// Strip directory components so a remote name can't escape the output dir.
pub fn sanitize_filename(name: &str) -> String {
    let last = name.rsplit(['/', '\\']).next().unwrap_or(name);
    match last {
        "." | ".." => String::new(),
        other => other.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_names_are_quoted() {
        assert_eq!(
            make_content_disposition("song one.mp3"),
            "attachment; filename=\"song one.mp3\""
        );
    }

    #[test]
    fn non_ascii_names_use_extended_form() {
        let header = make_content_disposition("песня.mp3");
        assert!(header.starts_with("attachment; filename*=utf-8''%D0%BF"));
        assert_eq!(
            filename_from_content_disposition(&header).as_deref(),
            Some("песня.mp3")
        );
    }

    #[test]
    fn attr_chars_stay_literal_and_spaces_are_escaped() {
        let header = make_content_disposition("dé mo+1.mp3");
        assert_eq!(header, "attachment; filename*=utf-8''d%C3%A9%20mo+1.mp3");
    }

    #[test]
    fn invalid_utf8_in_extended_name_falls_back_to_plain() {
        let h = "attachment; filename=\"plain.mp3\"; filename*=utf-8''%FF%FE.mp3";
        assert_eq!(filename_from_content_disposition(h).as_deref(), Some("plain.mp3"));
    }

    #[test]
    fn parses_plain_and_unquoted_names() {
        assert_eq!(
            filename_from_content_disposition("attachment; filename=\"a_vocals.mp3\"").as_deref(),
            Some("a_vocals.mp3")
        );
        assert_eq!(
            filename_from_content_disposition("attachment; filename=b.wav").as_deref(),
            Some("b.wav")
        );
    }

    #[test]
    fn extended_name_wins() {
        let h = "attachment; filename=\"fallback.mp3\"; filename*=UTF-8''caf%C3%A9.mp3";
        assert_eq!(filename_from_content_disposition(h).as_deref(), Some("café.mp3"));
    }

    #[test]
    fn path_components_are_stripped() {
        assert_eq!(
            filename_from_content_disposition("attachment; filename=\"../../etc/passwd\"")
                .as_deref(),
            Some("passwd")
        );
        assert_eq!(filename_from_content_disposition("attachment; filename=\"..\""), None);
        assert_eq!(filename_from_content_disposition("inline"), None);
    }
}
