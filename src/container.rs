//! Container sniffing and structure walking.
//!
//! Identifies the container from its magic bytes and walks its chunk/block
//! structure to find how many frames it declares, how long each frame is
//! shown, how often the animation loops and the canvas size. Nothing here
//! decodes pixels, so it is cheap enough to run on every file before choosing
//! a decode path.
//!
//! Probing is best-effort: a truncated or corrupt file yields whatever was
//! parsed before the damage. Whether the file actually decodes is decided
//! later by [`crate::decode`].

use serde::{Deserialize, Serialize};

const PNG_SIGNATURE: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Container format as identified from the file's leading bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerFormat {
    /// JPEG (`FF D8 FF`).
    Jpeg,
    /// PNG and APNG.
    Png,
    /// GIF87a and GIF89a.
    Gif,
    /// RIFF `WEBP`.
    WebP,
    /// ISO-BMFF with an `avif` or `avis` brand.
    Avif,
    /// No known signature matched.
    Unknown,
}

impl ContainerFormat {
    /// Lowercase name used in reports.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::WebP => "webp",
            Self::Avif => "avif",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ContainerFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Loop behavior declared by an animated container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopCount {
    /// Loops forever (a declared count of zero).
    Infinite,
    /// The declared, non-zero loop count as stored in the container.
    Finite(u32),
}

impl LoopCount {
    fn from_declared(count: u32) -> Self {
        if count == 0 { Self::Infinite } else { Self::Finite(count) }
    }
}

impl std::fmt::Display for LoopCount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Infinite => f.write_str("infinite"),
            Self::Finite(n) => write!(f, "{n}"),
        }
    }
}

/// Structural metadata of a container.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerInfo {
    /// Detected container format.
    pub format: ContainerFormat,
    /// Canvas dimensions, when the header could be read.
    pub canvas: Option<(u32, u32)>,
    /// Number of frames declared by the container (1 for still images).
    pub frame_count: u32,
    /// Per-frame display durations in milliseconds, when declared.
    pub frame_durations_ms: Vec<f64>,
    /// Declared loop behavior, when present.
    pub loop_count: Option<LoopCount>,
    /// The header marks the file as an animation (APNG `acTL`, WebP `VP8X`
    /// animation flag), whatever the number of frames walked.
    pub declares_animation: bool,
}

impl ContainerInfo {
    fn still(format: ContainerFormat) -> Self {
        Self {
            format,
            canvas: None,
            frame_count: 1,
            frame_durations_ms: Vec::new(),
            loop_count: None,
            declares_animation: false,
        }
    }

    /// Whether the container declares more than one frame.
    #[must_use]
    pub fn is_animated(&self) -> bool {
        self.frame_count > 1
    }

    /// Whether the file has to go through an animation decoder to learn its
    /// real frame count.
    ///
    /// GIF always qualifies: the walker only counts frames that are complete,
    /// so a stream cut inside its second frame would otherwise look like a
    /// clean still image.
    #[must_use]
    pub fn may_animate(&self) -> bool {
        self.format == ContainerFormat::Gif || self.declares_animation || self.is_animated()
    }

    /// Frames per second derived from the mean declared frame duration.
    #[must_use]
    pub fn fps(&self) -> Option<f64> {
        fps_from_durations(&self.frame_durations_ms)
    }
}

/// `1000 / mean(durations)`, or `None` when there are no durations or the mean
/// is not positive.
#[must_use]
pub fn fps_from_durations(durations_ms: &[f64]) -> Option<f64> {
    if durations_ms.is_empty() {
        return None;
    }
    let mean = durations_ms.iter().sum::<f64>() / durations_ms.len() as f64;
    (mean > 0.0).then(|| 1000.0 / mean)
}

/// Identify the container from its leading bytes.
#[must_use]
pub fn sniff(data: &[u8]) -> ContainerFormat {
    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        ContainerFormat::Jpeg
    } else if data.starts_with(PNG_SIGNATURE) {
        ContainerFormat::Png
    } else if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
        ContainerFormat::Gif
    } else if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
        ContainerFormat::WebP
    } else if is_avif(data) {
        ContainerFormat::Avif
    } else {
        ContainerFormat::Unknown
    }
}

/// Sniff the container and walk its structure.
#[must_use]
pub fn inspect(data: &[u8]) -> ContainerInfo {
    let format = sniff(data);
    let mut info = ContainerInfo::still(format);

    // Walkers stop at the first out-of-bounds read; partial results stand.
    match format {
        ContainerFormat::Gif => {
            let _ = walk_gif(data, &mut info);
        }
        ContainerFormat::Png => {
            let _ = walk_png(data, &mut info);
        }
        ContainerFormat::WebP => {
            let _ = walk_webp(data, &mut info);
        }
        ContainerFormat::Jpeg => info.canvas = parse_jpeg_dimensions(data),
        ContainerFormat::Avif => info.canvas = parse_ispe(data),
        ContainerFormat::Unknown => {}
    }

    info
}

fn is_avif(data: &[u8]) -> bool {
    if data.len() < 12 || &data[4..8] != b"ftyp" {
        return false;
    }
    let box_len = (be_u32(data, 0).unwrap_or(0) as usize).min(data.len());
    // Major brand at 8, minor version at 12, compatible brands from 16.
    let mut brands = std::iter::once(&data[8..12])
        .chain(data.get(16..box_len).unwrap_or(&[]).chunks_exact(4));
    brands.any(|b| b == b"avif" || b == b"avis")
}

fn be_u32(data: &[u8], at: usize) -> Option<u32> {
    let b = data.get(at..at + 4)?;
    Some(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
}

fn le_u32(data: &[u8], at: usize) -> Option<u32> {
    let b = data.get(at..at + 4)?;
    Some(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

fn le_u24(data: &[u8], at: usize) -> Option<u32> {
    let b = data.get(at..at + 3)?;
    Some(u32::from(b[0]) | u32::from(b[1]) << 8 | u32::from(b[2]) << 16)
}

fn le_u16(data: &[u8], at: usize) -> Option<u16> {
    let b = data.get(at..at + 2)?;
    Some(u16::from_le_bytes([b[0], b[1]]))
}

fn be_u16(data: &[u8], at: usize) -> Option<u16> {
    let b = data.get(at..at + 2)?;
    Some(u16::from_be_bytes([b[0], b[1]]))
}

/// Skip a chain of GIF data sub-blocks, returning the offset after the terminator.
fn skip_sub_blocks(data: &[u8], mut pos: usize) -> Option<usize> {
    loop {
        let len = usize::from(*data.get(pos)?);
        pos += 1;
        if len == 0 {
            return Some(pos);
        }
        pos += len;
    }
}

fn walk_gif(data: &[u8], info: &mut ContainerInfo) -> Option<()> {
    let width = le_u16(data, 6)?;
    let height = le_u16(data, 8)?;
    info.canvas = Some((u32::from(width), u32::from(height)));

    let packed = *data.get(10)?;
    let mut pos = 13 + color_table_len(packed);

    let mut frames = 0u32;
    let mut pending_delay: Option<f64> = None;

    loop {
        match *data.get(pos)? {
            0x21 => {
                let label = *data.get(pos + 1)?;
                pos += 2;
                match label {
                    // Graphic control extension: delay in centiseconds.
                    0xF9 => {
                        let delay_cs = le_u16(data, pos + 2)?;
                        pending_delay = Some(f64::from(delay_cs) * 10.0);
                    }
                    // Application extension: NETSCAPE2.0 carries the loop count.
                    0xFF => {
                        if data.get(pos + 1..pos + 12) == Some(b"NETSCAPE2.0".as_slice())
                            && data.get(pos + 13) == Some(&0x01)
                        {
                            let count = le_u16(data, pos + 14)?;
                            info.loop_count = Some(LoopCount::from_declared(u32::from(count)));
                        }
                    }
                    _ => {}
                }
                pos = skip_sub_blocks(data, pos)?;
            }
            0x2C => {
                let packed = *data.get(pos + 9)?;
                pos += 10 + color_table_len(packed);
                // LZW minimum code size, then the image data sub-blocks.
                pos = skip_sub_blocks(data, pos + 1)?;
                frames += 1;
                info.frame_count = frames;
                info.frame_durations_ms.push(pending_delay.take().unwrap_or(0.0));
            }
            _ => break,
        }
    }

    Some(())
}

/// Byte length of the color table flagged in a GIF packed field.
fn color_table_len(packed: u8) -> usize {
    if packed & 0x80 == 0 {
        0
    } else {
        3usize << (usize::from(packed & 0x07) + 1)
    }
}

fn walk_png(data: &[u8], info: &mut ContainerInfo) -> Option<()> {
    let mut pos = PNG_SIGNATURE.len();
    let mut declared_frames = None;

    while pos + 8 <= data.len() {
        let len = be_u32(data, pos)? as usize;
        let kind = data.get(pos + 4..pos + 8)?;
        let body = pos + 8;

        match kind {
            b"IHDR" => info.canvas = Some((be_u32(data, body)?, be_u32(data, body + 4)?)),
            b"acTL" => {
                info.declares_animation = true;
                declared_frames = Some(be_u32(data, body)?);
                info.loop_count = Some(LoopCount::from_declared(be_u32(data, body + 4)?));
            }
            b"fcTL" => {
                let num = be_u16(data, body + 20)?;
                let den = match be_u16(data, body + 22)? {
                    0 => 100,
                    d => d,
                };
                let delay_ms = f64::from(num) * 1000.0 / f64::from(den);
                info.frame_durations_ms.push(delay_ms);
            }
            b"IEND" => break,
            _ => {}
        }

        // length + type + data + crc
        pos = body + len + 4;
    }

    if let Some(frames) = declared_frames {
        info.frame_count = frames.max(1);
    }
    Some(())
}

fn walk_webp(data: &[u8], info: &mut ContainerInfo) -> Option<()> {
    let riff_end = (le_u32(data, 4)? as usize + 8).min(data.len());
    let mut pos = 12;
    let mut frames = 0u32;

    while pos + 8 <= riff_end {
        let fourcc = data.get(pos..pos + 4)?;
        let len = le_u32(data, pos + 4)? as usize;
        let body = pos + 8;

        match fourcc {
            b"VP8X" => {
                info.declares_animation = data.get(body).is_some_and(|flags| flags & 0x02 != 0);
                let width = le_u24(data, body + 4)? + 1;
                let height = le_u24(data, body + 7)? + 1;
                info.canvas = Some((width, height));
            }
            b"ANIM" => {
                let count = le_u16(data, body + 4)?;
                info.loop_count = Some(LoopCount::from_declared(u32::from(count)));
            }
            b"ANMF" => {
                frames += 1;
                let duration_ms = le_u24(data, body + 12)?;
                info.frame_durations_ms.push(f64::from(duration_ms));
            }
            b"VP8 " if info.canvas.is_none() => {
                if data.get(body + 3..body + 6) == Some([0x9D, 0x01, 0x2A].as_slice()) {
                    let width = u32::from(le_u16(data, body + 6)? & 0x3FFF);
                    let height = u32::from(le_u16(data, body + 8)? & 0x3FFF);
                    info.canvas = Some((width, height));
                }
            }
            b"VP8L" if info.canvas.is_none() => {
                if data.get(body) == Some(&0x2F) {
                    let bits = le_u32(data, body + 1)?;
                    info.canvas = Some(((bits & 0x3FFF) + 1, ((bits >> 14) & 0x3FFF) + 1));
                }
            }
            _ => {}
        }

        // Chunks are padded to an even length.
        pos = body + len + (len & 1);
    }

    if frames > 0 {
        info.frame_count = frames;
    }
    Some(())
}

fn parse_jpeg_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    let mut i = 2;
    while i + 9 < data.len() {
        if data[i] != 0xFF {
            i += 1;
            continue;
        }

        let marker = data[i + 1];

        // SOF markers (Start Of Frame), excluding DHT/JPG/DAC
        if matches!(marker, 0xC0..=0xCF) && !matches!(marker, 0xC4 | 0xC8 | 0xCC) {
            let height = u32::from(be_u16(data, i + 5)?);
            let width = u32::from(be_u16(data, i + 7)?);
            return Some((width, height));
        }

        let length = be_u16(data, i + 2)?;
        i += 2 + usize::from(length);
    }

    None
}

/// Dimensions from the first `ispe` (image spatial extents) property.
fn parse_ispe(data: &[u8]) -> Option<(u32, u32)> {
    let at = data.windows(4).position(|w| w == b"ispe")?;
    // fourcc, then version/flags, then width and height
    let width = be_u32(data, at + 8)?;
    let height = be_u32(data, at + 12)?;
    Some((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gif_header(width: u16, height: u16) -> Vec<u8> {
        let mut gif = b"GIF89a".to_vec();
        gif.extend_from_slice(&width.to_le_bytes());
        gif.extend_from_slice(&height.to_le_bytes());
        // Global color table with 2 entries.
        gif.extend_from_slice(&[0x80, 0, 0]);
        gif.extend_from_slice(&[0, 0, 0, 255, 255, 255]);
        gif
    }

    fn gif_frame(gif: &mut Vec<u8>, delay_cs: u16) {
        gif.extend_from_slice(&[0x21, 0xF9, 4, 0]);
        gif.extend_from_slice(&delay_cs.to_le_bytes());
        gif.extend_from_slice(&[0, 0]);
        gif.extend_from_slice(&[0x2C, 0, 0, 0, 0, 1, 0, 1, 0, 0]);
        gif.extend_from_slice(&[2, 2, 0x4C, 0x01, 0]);
    }

    #[test]
    fn test_sniff_signatures() {
        assert_eq!(sniff(&[0xFF, 0xD8, 0xFF, 0xE0]), ContainerFormat::Jpeg);
        assert_eq!(sniff(PNG_SIGNATURE), ContainerFormat::Png);
        assert_eq!(sniff(b"GIF87a......"), ContainerFormat::Gif);
        assert_eq!(sniff(b"RIFF\0\0\0\0WEBPVP8 "), ContainerFormat::WebP);
        assert_eq!(
            sniff(b"\0\0\0\x1cftypavif\0\0\0\0avifmif1"),
            ContainerFormat::Avif
        );
        assert_eq!(sniff(b"\0\0\0\x1cftypmif1\0\0\0\0mif1avis"), ContainerFormat::Avif);
        assert_eq!(sniff(b"hello world"), ContainerFormat::Unknown);
    }

    #[test]
    fn test_gif_frames_delays_and_loop() {
        let mut gif = gif_header(4, 3);
        gif.extend_from_slice(&[0x21, 0xFF, 11]);
        gif.extend_from_slice(b"NETSCAPE2.0");
        gif.extend_from_slice(&[3, 1, 0, 0, 0]);
        gif_frame(&mut gif, 10);
        gif_frame(&mut gif, 20);
        gif_frame(&mut gif, 30);
        gif.push(0x3B);

        let info = inspect(&gif);
        assert_eq!(info.format, ContainerFormat::Gif);
        assert_eq!(info.canvas, Some((4, 3)));
        assert_eq!(info.frame_count, 3);
        assert_eq!(info.frame_durations_ms, vec![100.0, 200.0, 300.0]);
        assert_eq!(info.loop_count, Some(LoopCount::Infinite));
        assert!(info.is_animated());
        assert!((info.fps().unwrap() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_single_frame_gif_is_still() {
        let mut gif = gif_header(1, 1);
        gif_frame(&mut gif, 0);
        gif.push(0x3B);

        let info = inspect(&gif);
        assert_eq!(info.frame_count, 1);
        assert!(!info.is_animated());
        assert_eq!(info.fps(), None);
        assert_eq!(info.loop_count, None);
    }

    #[test]
    fn test_truncated_gif_keeps_partial_count() {
        let mut gif = gif_header(2, 2);
        gif_frame(&mut gif, 5);
        gif_frame(&mut gif, 5);
        let cut = gif.len() - 3;
        gif.truncate(cut);

        let info = inspect(&gif);
        assert_eq!(info.frame_count, 1);
        assert!(!info.is_animated());
        assert!(info.may_animate());
    }

    #[test]
    fn test_png_ihdr_and_actl() {
        let mut png = PNG_SIGNATURE.to_vec();
        png.extend_from_slice(&13u32.to_be_bytes());
        png.extend_from_slice(b"IHDR");
        png.extend_from_slice(&100u32.to_be_bytes());
        png.extend_from_slice(&50u32.to_be_bytes());
        png.extend_from_slice(&[8, 6, 0, 0, 0]);
        png.extend_from_slice(&[0; 4]);
        png.extend_from_slice(&8u32.to_be_bytes());
        png.extend_from_slice(b"acTL");
        png.extend_from_slice(&4u32.to_be_bytes());
        png.extend_from_slice(&2u32.to_be_bytes());
        png.extend_from_slice(&[0; 4]);
        for _ in 0..4 {
            png.extend_from_slice(&26u32.to_be_bytes());
            png.extend_from_slice(b"fcTL");
            png.extend_from_slice(&[0; 20]);
            png.extend_from_slice(&1u16.to_be_bytes());
            png.extend_from_slice(&25u16.to_be_bytes());
            png.extend_from_slice(&[0, 0]);
            png.extend_from_slice(&[0; 4]);
        }

        let info = inspect(&png);
        assert_eq!(info.canvas, Some((100, 50)));
        assert_eq!(info.frame_count, 4);
        assert_eq!(info.loop_count, Some(LoopCount::Finite(2)));
        assert!(info.declares_animation);
        assert_eq!(info.frame_durations_ms, vec![40.0; 4]);
        assert!((info.fps().unwrap() - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_webp_vp8x_anim() {
        let mut chunks = Vec::new();
        chunks.extend_from_slice(b"VP8X");
        chunks.extend_from_slice(&10u32.to_le_bytes());
        chunks.extend_from_slice(&[0x02, 0, 0, 0]);
        chunks.extend_from_slice(&[63, 0, 0, 31, 0, 0]);
        chunks.extend_from_slice(b"ANIM");
        chunks.extend_from_slice(&6u32.to_le_bytes());
        chunks.extend_from_slice(&[0, 0, 0, 0, 3, 0]);
        for _ in 0..2 {
            chunks.extend_from_slice(b"ANMF");
            chunks.extend_from_slice(&16u32.to_le_bytes());
            chunks.extend_from_slice(&[0; 12]);
            chunks.extend_from_slice(&[50, 0, 0, 0]);
        }
        let mut webp = b"RIFF".to_vec();
        webp.extend_from_slice(&(chunks.len() as u32 + 4).to_le_bytes());
        webp.extend_from_slice(b"WEBP");
        webp.extend_from_slice(&chunks);

        let info = inspect(&webp);
        assert_eq!(info.format, ContainerFormat::WebP);
        assert_eq!(info.canvas, Some((64, 32)));
        assert_eq!(info.frame_count, 2);
        assert!(info.declares_animation);
        assert_eq!(info.loop_count, Some(LoopCount::Finite(3)));
        assert_eq!(info.frame_durations_ms, vec![50.0, 50.0]);
    }

    #[test]
    fn test_jpeg_sof_dimensions() {
        let mut jpeg = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x04, 0x00, 0x00];
        jpeg.extend_from_slice(&[0xFF, 0xC0, 0x00, 0x11, 0x08]);
        jpeg.extend_from_slice(&480u16.to_be_bytes());
        jpeg.extend_from_slice(&640u16.to_be_bytes());
        jpeg.extend_from_slice(&[3, 0, 0, 0, 0]);

        let info = inspect(&jpeg);
        assert_eq!(info.format, ContainerFormat::Jpeg);
        assert_eq!(info.canvas, Some((640, 480)));
        assert_eq!(info.frame_count, 1);
        assert!(!info.may_animate());
    }

    #[test]
    fn test_avif_ispe() {
        let mut avif = b"\0\0\0\x14ftypavif\0\0\0\0avif".to_vec();
        avif.extend_from_slice(&[0, 0, 0, 20]);
        avif.extend_from_slice(b"ispe");
        avif.extend_from_slice(&[0; 4]);
        avif.extend_from_slice(&320u32.to_be_bytes());
        avif.extend_from_slice(&240u32.to_be_bytes());

        let info = inspect(&avif);
        assert_eq!(info.format, ContainerFormat::Avif);
        assert_eq!(info.canvas, Some((320, 240)));
    }

    #[test]
    fn test_fps_from_durations() {
        assert_eq!(fps_from_durations(&[]), None);
        assert_eq!(fps_from_durations(&[0.0, 0.0]), None);
        assert!((fps_from_durations(&[100.0, 50.0, 150.0]).unwrap() - 10.0).abs() < 1e-9);
    }
}
