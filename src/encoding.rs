use std::fmt;

use anyhow::{Result, anyhow};
use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8, UTF_16BE, UTF_16LE};

/// How the encoding of an input was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectedBy {
    Flag,
    Bom,
    Guess,
    Utf8,
}

impl fmt::Display for DetectedBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DetectedBy::Flag => "--input-encoding",
            DetectedBy::Bom => "byte order mark",
            DetectedBy::Guess => "detector",
            DetectedBy::Utf8 => "utf-8",
        })
    }
}

#[derive(Debug, Clone)]
pub struct InputText {
    pub text: String,
    pub encoding: &'static Encoding,
    pub detected_by: DetectedBy,
    pub lossy: bool,
}

/// Decodes input bytes to text, either with a fixed encoding from
/// `--input-encoding` or by sniffing BOM, UTF-8 validity, then chardetng.
#[derive(Debug, Clone, Default)]
pub struct InputDecoder {
    forced: Option<&'static Encoding>,
}

impl InputDecoder {
    pub fn new(label: Option<&str>) -> Result<Self> {
        let forced = label
            .map(str::trim)
            .map(|label| {
                Encoding::for_label(label.as_bytes())
                    .ok_or_else(|| anyhow!("unknown input encoding '{label}'"))
            })
            .transpose()?;
        Ok(Self { forced })
    }

    pub fn decode(&self, bytes: &[u8]) -> InputText {
        let (encoding, detected_by) = match self.forced {
            Some(encoding) => (encoding, DetectedBy::Flag),
            None => sniff(bytes),
        };
        let (text, _, lossy) = encoding.decode(bytes);
        InputText {
            text: text.into_owned(),
            encoding,
            detected_by,
            lossy,
        }
    }
}

fn sniff(bytes: &[u8]) -> (&'static Encoding, DetectedBy) {
    if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
        return (UTF_8, DetectedBy::Bom);
    }
    if bytes.starts_with(&[0xFF, 0xFE]) {
        return (UTF_16LE, DetectedBy::Bom);
    }
    if bytes.starts_with(&[0xFE, 0xFF]) {
        return (UTF_16BE, DetectedBy::Bom);
    }
    if std::str::from_utf8(bytes).is_ok() {
        return (UTF_8, DetectedBy::Utf8);
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    (detector.guess(None, true), DetectedBy::Guess)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_ascii_is_utf8() {
        let decoded = InputDecoder::default().decode(b"Hello");
        assert_eq!(decoded.text, "Hello");
        assert_eq!(decoded.detected_by, DetectedBy::Utf8);
        assert!(!decoded.lossy);
    }

    #[test]
    fn bom_wins_over_sniffing() {
        let decoded = InputDecoder::default().decode(&[0xFF, 0xFE, 0x61, 0x00]);
        assert_eq!(decoded.detected_by, DetectedBy::Bom);
        assert_eq!(decoded.encoding.name(), "UTF-16LE");
        assert_eq!(decoded.text, "a");
    }

    #[test]
    fn forced_label_is_used() {
        let decoder = InputDecoder::new(Some("latin1")).expect("known label");
        let decoded = decoder.decode(&[0x63, 0x61, 0x66, 0xE9]);
        assert_eq!(decoded.detected_by, DetectedBy::Flag);
        assert_eq!(decoded.text, "café");
    }

    #[test]
    fn unknown_label_is_an_error() {
        assert!(InputDecoder::new(Some("no-such-encoding")).is_err());
    }
}
