//! Container signatures and minimal ISO-BMFF metadata reading.
//!
//! Enough to decide that the first bytes of a response are media the
//! trial can call "metadata ready", plus duration and dimensions when an
//! MP4 `moov` box happens to sit at the front of the file.

use crate::types::MediaDimensions;

const EBML_MAGIC: [u8; 4] = [0x1A, 0x45, 0xDF, 0xA3];
const TS_SYNC: u8 = 0x47;
const TS_PACKET: usize = 188;

/// Container short name for the leading bytes, `None` if unrecognised or
/// not enough data yet.
pub(crate) fn sniff_container(buf: &[u8]) -> Option<&'static str> {
    if buf.len() >= 8 && &buf[4..8] == b"ftyp" {
        return Some(if buf.len() >= 12 && &buf[8..12] == b"qt  " { "mov" } else { "mp4" });
    }
    if buf.starts_with(&EBML_MAGIC) {
        let head = &buf[..buf.len().min(64)];
        return Some(if contains(head, b"webm") { "webm" } else { "mkv" });
    }
    if buf.starts_with(b"OggS") {
        return Some("ogg");
    }
    if buf.starts_with(b"FLV") {
        return Some("flv");
    }
    if buf.len() >= 12 && buf.starts_with(b"RIFF") && &buf[8..12] == b"AVI " {
        return Some("avi");
    }
    if buf.starts_with(b"ID3") || (buf.len() >= 2 && buf[0] == 0xFF && buf[1] & 0xE0 == 0xE0) {
        return Some("mp3");
    }
    if buf.len() > TS_PACKET && buf[0] == TS_SYNC && buf[TS_PACKET] == TS_SYNC {
        return Some("ts");
    }

    let text = trim_text_prefix(buf);
    if text.starts_with(b"#EXTM3U") {
        return Some("hls");
    }
    if contains(&text[..text.len().min(1024)], b"<MPD") {
        return Some("dash");
    }
    None
}

/// Container implied by a declared MIME type, for responses whose bytes
/// did not sniff (e.g. short manifests).
pub(crate) fn container_from_declared(content_type: &str) -> Option<&'static str> {
    let mime = content_type.split(';').next()?.trim().to_ascii_lowercase();
    match crate::detect::container_for_mime(&mime) {
        "unknown" => None,
        known => Some(known),
    }
}

fn trim_text_prefix(buf: &[u8]) -> &[u8] {
    let buf = buf.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(buf);
    let start = buf
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(buf.len());
    &buf[start..]
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    find(haystack, needle, 0).is_some()
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from >= haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}

fn be_u32(buf: &[u8], at: usize) -> Option<u32> {
    let bytes = buf.get(at..at + 4)?;
    Some(u32::from_be_bytes(bytes.try_into().ok()?))
}

fn be_u64(buf: &[u8], at: usize) -> Option<u64> {
    let bytes = buf.get(at..at + 8)?;
    Some(u64::from_be_bytes(bytes.try_into().ok()?))
}

/// Duration in seconds from an `mvhd` box, if present in `buf`.
///
/// Offsets are relative to the box type tag.
pub(crate) fn mp4_duration_secs(buf: &[u8]) -> Option<f64> {
    let at = find(buf, b"mvhd", 0)?;
    let version = *buf.get(at + 4)?;
    let (timescale, duration) = if version == 1 {
        (be_u32(buf, at + 24)?, be_u64(buf, at + 28)?)
    } else {
        (be_u32(buf, at + 16)?, u64::from(be_u32(buf, at + 20)?))
    };
    if timescale == 0 {
        return None;
    }
    #[allow(clippy::cast_precision_loss)]
    Some(duration as f64 / f64::from(timescale))
}

/// Presentation size of the first visual track (`tkhd` with non-zero size).
pub(crate) fn mp4_dimensions(buf: &[u8]) -> Option<MediaDimensions> {
    let mut from = 0;
    while let Some(at) = find(buf, b"tkhd", from) {
        let version = *buf.get(at + 4)?;
        let width_at = if version == 1 { at + 92 } else { at + 80 };
        // 16.16 fixed point.
        let width = be_u32(buf, width_at)? >> 16;
        let height = be_u32(buf, width_at + 4)? >> 16;
        if width > 0 && height > 0 {
            return Some(MediaDimensions { width, height });
        }
        from = at + 4;
    }
    None
}
