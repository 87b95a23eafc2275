//! Text-safe transfer encodings for file bodies.

use base64::Engine as _;
use serde::Deserialize;

/// Input bytes per hex line (60 output characters)
const HEX_LINE_BYTES: usize = 30;
/// Output characters per base64 line
const BASE64_LINE_CHARS: usize = 76;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    /// Bytes verbatim
    #[default]
    Raw,
    /// Lowercase hex, 30 bytes per line
    Hex,
    /// Standard base64 with padding, 76 characters per line
    Base64,
}

impl Encoding {
    pub fn is_raw(self) -> bool {
        self == Self::Raw
    }

    /// Encode a whole buffer. Non-raw encodings always end with a newline.
    pub fn encode(self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::Raw => data.to_vec(),
            Self::Hex => {
                let lines: Vec<String> = data.chunks(HEX_LINE_BYTES).map(hex::encode).collect();
                finish_lines(lines, HEX_LINE_BYTES * 2)
            }
            Self::Base64 => {
                let encoded = base64::engine::general_purpose::STANDARD.encode(data);
                let lines: Vec<String> = encoded
                    .as_bytes()
                    .chunks(BASE64_LINE_CHARS)
                    .map(|c| String::from_utf8_lossy(c).into_owned())
                    .collect();
                finish_lines(lines, BASE64_LINE_CHARS)
            }
        }
    }
}

/// Every full line ends with a newline and the body always gets one more, so a
/// body filling its last line exactly ends in a blank line.
fn finish_lines(lines: Vec<String>, width: usize) -> Vec<u8> {
    let mut out = String::with_capacity(lines.iter().map(|l| l.len() + 1).sum::<usize>() + 1);
    for line in &lines {
        out.push_str(line);
        if line.len() == width {
            out.push('\n');
        }
    }
    out.push('\n');
    out.into_bytes()
}
