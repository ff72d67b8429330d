//! Cheap facts about media bytes: type sniffing and container durations.

use std::path::Path;

/// Number of leading bytes needed to sniff a media type.
pub const SNIFF_LEN: usize = 64;

/// Guess a media type from the file extension. Only media types are known.
pub fn mime_from_name(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    Some(match ext.as_str() {
        "jpg" | "jpeg" | "jfif" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "heic" => "image/heic",
        "avif" => "image/avif",
        "svg" => "image/svg+xml",
        "mp4" | "m4v" => "video/mp4",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",
        "avi" => "video/x-msvideo",
        "ogv" => "video/ogg",
        _ => return None,
    })
}

/// Sniff a media type from magic bytes. Non-media matches are ignored.
pub fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    let head = &bytes[..bytes.len().min(SNIFF_LEN)];
    infer::get(head)
        .filter(|t| matches!(t.matcher_type(), infer::MatcherType::Image | infer::MatcherType::Video))
        .map(|t| t.mime_type())
}

/// Short format label for a media type (`image/jpeg` → `jpeg`), falling back
/// to the file extension.
pub fn format_label(mime: Option<&str>, name: &str) -> String {
    mime.and_then(|m| m.split('/').nth(1))
        .map(|sub| sub.split(['+', ';']).next().unwrap_or(sub).to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| Path::new(name).extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase))
        .unwrap_or_else(|| "unknown".to_string())
}

/// Read the movie duration from an ISO-BMFF container (MP4, MOV, M4V).
///
/// Looks for `moov/mvhd` and divides its duration by its timescale. Returns
/// `None` for anything else, including truncated or malformed boxes.
pub fn mp4_duration_seconds(bytes: &[u8]) -> Option<f64> {
    let moov = find_box(bytes, b"moov")?;
    let mvhd = find_box(moov, b"mvhd")?;
    let version = *mvhd.first()?;
    // version (1) + flags (3), then creation/modification times.
    let (timescale, duration) = match version {
        0 => (read_u32(mvhd, 12)?, u64::from(read_u32(mvhd, 16)?)),
        1 => (read_u32(mvhd, 20)?, read_u64(mvhd, 24)?),
        _ => return None,
    };
    // All-ones duration means "unknown" per ISO/IEC 14496-12.
    if timescale == 0 || duration == u64::MAX || (version == 0 && duration == u64::from(u32::MAX)) {
        return None;
    }
    Some(duration as f64 / f64::from(timescale))
}

/// Find the body of the first child box of type `kind` within `data`.
fn find_box<'a>(data: &'a [u8], kind: &[u8; 4]) -> Option<&'a [u8]> {
    let mut offset = 0usize;
    while offset + 8 <= data.len() {
        let size = read_u32(data, offset)? as usize;
        let (header, total) = match size {
            // Box extends to the end of the enclosing data.
            0 => (8, data.len() - offset),
            // 64-bit "largesize" follows the type.
            1 => (16, usize::try_from(read_u64(data, offset + 8)?).ok()?),
            n => (8, n),
        };
        if total < header || offset.checked_add(total)? > data.len() {
            return None;
        }
        if &data[offset + 4..offset + 8] == kind {
            return Some(&data[offset + header..offset + total]);
        }
        offset += total;
    }
    None
}

fn read_u32(data: &[u8], at: usize) -> Option<u32> {
    let bytes = data.get(at..at.checked_add(4)?)?;
    Some(u32::from_be_bytes(bytes.try_into().ok()?))
}

fn read_u64(data: &[u8], at: usize) -> Option<u64> {
    let bytes = data.get(at..at.checked_add(8)?)?;
    Some(u64::from_be_bytes(bytes.try_into().ok()?))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rstest::rstest;

    fn mp4_box(kind: &[u8; 4], body: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(body.len() + 8);
        out.extend_from_slice(&((body.len() + 8) as u32).to_be_bytes());
        out.extend_from_slice(kind);
        out.extend_from_slice(body);
        out
    }

    /// Smallest container `mp4_duration_seconds` understands: `ftyp` + `moov/mvhd` (v0).
    pub(crate) fn minimal_mp4(timescale: u32, duration: u32) -> Vec<u8> {
        let mut mvhd = vec![0u8; 4]; // version 0, no flags
        mvhd.extend_from_slice(&0u32.to_be_bytes()); // creation
        mvhd.extend_from_slice(&0u32.to_be_bytes()); // modification
        mvhd.extend_from_slice(&timescale.to_be_bytes());
        mvhd.extend_from_slice(&duration.to_be_bytes());
        mvhd.extend_from_slice(&[0u8; 80]);
        let mut file = mp4_box(b"ftyp", b"isom\0\0\x02\0isomiso2mp41");
        file.extend(mp4_box(b"moov", &mp4_box(b"mvhd", &mvhd)));
        file
    }

    #[rstest]
    #[case("photo.JPG", Some("image/jpeg"))]
    #[case("dir/anim.gif", Some("image/gif"))]
    #[case("clip.mov", Some("video/quicktime"))]
    #[case("clip.webm", Some("video/webm"))]
    #[case("README", None)]
    #[case("notes.txt", None)]
    fn test_mime_from_name(#[case] name: &str, #[case] expected: Option<&str>) {
        assert_eq!(mime_from_name(Path::new(name)), expected);
    }

    #[rstest]
    #[case(Some("image/jpeg"), "x.bin", "jpeg")]
    #[case(Some("image/svg+xml"), "x.svg", "svg")]
    #[case(None, "movie.MKV", "mkv")]
    #[case(None, "noext", "unknown")]
    fn test_format_label(#[case] mime: Option<&str>, #[case] name: &str, #[case] expected: &str) {
        assert_eq!(format_label(mime, name), expected);
    }

    #[test]
    fn test_sniff_png() {
        let png = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];
        assert_eq!(sniff_mime(&png), Some("image/png"));
        assert_eq!(sniff_mime(b"%PDF-1.7 definitely not media"), None);
    }

    #[test]
    fn test_mp4_duration() {
        let file = minimal_mp4(1000, 5500);
        assert_eq!(mp4_duration_seconds(&file), Some(5.5));
    }

    #[test]
    fn test_mp4_duration_rejects_garbage() {
        assert_eq!(mp4_duration_seconds(b""), None);
        assert_eq!(mp4_duration_seconds(b"definitely not an mp4 file"), None);
        assert_eq!(mp4_duration_seconds(&minimal_mp4(0, 10)), None);
        // Truncated in the middle of the moov box.
        let file = minimal_mp4(1000, 5500);
        assert_eq!(mp4_duration_seconds(&file[..file.len() - 20]), None);
    }
}
