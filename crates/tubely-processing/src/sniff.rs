//! Content-type resolution for uploads.
//!
//! A declared type is trusted unless it is absent or generic, in which case
//! the leading bytes decide. Only the signatures this service cares about are
//! recognised; anything else sniffs as `application/octet-stream`.

use tubely_core::constants::GENERIC_CONTENT_TYPE;

/// Strip parameters and normalise case: `Video/MP4; codecs=avc1` → `video/mp4`.
pub fn normalize_media_type(raw: &str) -> Option<String> {
    let essence = raw.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
    if essence.is_empty() || !essence.contains('/') {
        None
    } else {
        Some(essence)
    }
}

/// Media type detected from the first bytes of a file.
pub fn sniff_media_type(prefix: &[u8]) -> &'static str {
    if is_mp4(prefix) {
        "video/mp4"
    } else if prefix.starts_with(b"\x89PNG\r\n\x1a\n") {
        "image/png"
    } else if prefix.starts_with(b"\xff\xd8\xff") {
        "image/jpeg"
    } else if prefix.starts_with(b"GIF87a") || prefix.starts_with(b"GIF89a") {
        "image/gif"
    } else if prefix.len() >= 14 && &prefix[0..4] == b"RIFF" && &prefix[8..14] == b"WEBPVP" {
        "image/webp"
    } else {
        GENERIC_CONTENT_TYPE
    }
}

/// Effective media type of an upload: the declared type when it is specific,
/// otherwise whatever the prefix sniffs as.
///
/// A declared value that does not parse as `type/subtype` is kept as written
/// (trimmed, lowercased) and never replaced by the sniffed type.
pub fn resolve_media_type(declared: Option<&str>, prefix: &[u8]) -> String {
    let declared = declared.map(str::trim).filter(|raw| !raw.is_empty());
    match declared {
        Some(raw) => match normalize_media_type(raw) {
            Some(essence) if essence == GENERIC_CONTENT_TYPE => {
                sniff_media_type(prefix).to_string()
            }
            Some(essence) => essence,
            None => raw.to_ascii_lowercase(),
        },
        None => sniff_media_type(prefix).to_string(),
    }
}

/// File extension (with leading dot) for a media type.
///
/// Unknown types fall back to `.` + subtype as long as the subtype is a
/// plain token; anything that could form a path is refused.
pub fn extension_for(media_type: &str) -> Option<String> {
    let known = match media_type {
        "image/png" => Some(".png"),
        "image/jpeg" => Some(".jpg"),
        "image/gif" => Some(".gif"),
        "image/webp" => Some(".webp"),
        "video/mp4" => Some(".mp4"),
        "application/octet-stream" => Some(".bin"),
        _ => None,
    };
    if let Some(ext) = known {
        return Some(ext.to_string());
    }

    let (_, subtype) = media_type.split_once('/')?;
    let plain = !subtype.is_empty()
        && !subtype.contains("..")
        && subtype
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    plain.then(|| format!(".{}", subtype.to_ascii_lowercase()))
}

/// ISO base media file with an `mp4*` brand.
///
/// The first box must be `ftyp`, fully contained in the prefix, with the
/// major brand or one of the compatible brands starting with `mp4`. The
/// minor version word at offset 12 is skipped.
fn is_mp4(prefix: &[u8]) -> bool {
    if prefix.len() < 12 || &prefix[4..8] != b"ftyp" {
        return false;
    }
    let box_size = u32::from_be_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]) as usize;
    if box_size < 12 || box_size % 4 != 0 || prefix.len() < box_size {
        return false;
    }
    (8..box_size)
        .step_by(4)
        .filter(|&offset| offset != 12)
        .any(|offset| &prefix[offset..offset + 3] == b"mp4")
}
