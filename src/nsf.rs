//! NSF (NES Sound Format) container parsing.
//!
//! An NSF file is a 128-byte header followed by the 6502 program body. The
//! header carries the entry points (`init`, `play`), where to place the body
//! in memory, song metadata, and region/expansion information:
//!
//! ```text
//! 0x00  5   magic "NESM\x1A" (only "NESM" is validated)
//! 0x05  1   version
//! 0x06  1   total songs
//! 0x07  1   starting song (1-based)
//! 0x08  2   load address (LE)
//! 0x0A  2   init address (LE)
//! 0x0C  2   play address (LE)
//! 0x0E  32  title (NUL-terminated)
//! 0x2E  32  artist
//! 0x4E  32  copyright
//! 0x6E  2   NTSC play speed in microseconds (LE)
//! 0x70  8   bankswitch init values
//! 0x78  2   PAL play speed in microseconds (LE)
//! 0x7A  1   region bits (bit 0: PAL, bit 1: dual)
//! 0x7B  1   expansion sound chips bitfield
//! 0x80  ..  program body
//! ```

use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

const NSF_MAGIC: [u8; 4] = [0x4E, 0x45, 0x53, 0x4D]; // "NESM"

/// Size of the NSF header; the program body starts here.
pub const HEADER_SIZE: usize = 0x80;

/// Region bit 0: tune is PAL.
const REGION_PAL: u8 = 0x01;
/// Region bit 1: tune supports both regions.
const REGION_DUAL: u8 = 0x02;

/// Errors that can occur when loading or parsing an NSF file.
#[derive(Debug, Error)]
pub enum NsfError {
    /// I/O error occurred while reading the file
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    /// The file is not a valid NSF
    #[error("invalid NSF format: {0}")]
    InvalidFormat(String),
}

/// A parsed NSF file: header fields plus the program body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nsf {
    /// Header version byte
    pub version: u8,

    /// Number of songs in the file
    pub total_songs: u8,

    /// 1-based index of the song to start with
    pub starting_song: u8,

    /// Address the body is copied to
    pub load_addr: u16,

    /// Entry point called once per song, with A = song index and X = region
    pub init_addr: u16,

    /// Entry point called once per tick to advance playback
    pub play_addr: u16,

    /// Song or album title
    pub title: String,

    /// Artist name
    pub artist: String,

    /// Copyright holder
    pub copyright: String,

    /// NTSC tick interval in microseconds
    pub ntsc_speed_us: u16,

    /// Initial bank numbers; all zero means no bankswitching
    pub bankswitch: [u8; 8],

    /// PAL tick interval in microseconds
    pub pal_speed_us: u16,

    /// Region bits (bit 0: PAL, bit 1: dual region)
    pub region: u8,

    /// Expansion sound chip bitfield
    pub expansion: u8,

    /// The 6502 program body (everything past the header)
    pub body: Vec<u8>,
}

impl Nsf {
    /// Load an NSF file from disk.
    ///
    /// # Errors
    ///
    /// Returns `NsfError::IoError` if the file cannot be read and
    /// `NsfError::InvalidFormat` if it is not a valid NSF.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use rustnsf::nsf::Nsf;
    ///
    /// let nsf = Nsf::load("tune.nsf").expect("failed to load NSF");
    /// println!("{} by {}", nsf.title, nsf.artist);
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, NsfError> {
        let bytes = fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    /// Parse an NSF image already in memory.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, NsfError> {
        if bytes.len() < HEADER_SIZE {
            return Err(NsfError::InvalidFormat(format!(
                "file is {} bytes, shorter than the {}-byte header",
                bytes.len(),
                HEADER_SIZE
            )));
        }

        // Only the 4-byte "NESM" prefix is validated; the 0x1A byte that
        // follows it is not checked.
        if bytes[0..4] != NSF_MAGIC {
            return Err(NsfError::InvalidFormat(
                "missing NESM magic number".to_string(),
            ));
        }

        let mut bankswitch = [0u8; 8];
        bankswitch.copy_from_slice(&bytes[0x70..0x78]);

        Ok(Nsf {
            version: bytes[0x05],
            total_songs: bytes[0x06],
            starting_song: bytes[0x07],
            load_addr: read_u16_le(bytes, 0x08),
            init_addr: read_u16_le(bytes, 0x0A),
            play_addr: read_u16_le(bytes, 0x0C),
            title: read_text(&bytes[0x0E..0x2E]),
            artist: read_text(&bytes[0x2E..0x4E]),
            copyright: read_text(&bytes[0x4E..0x6E]),
            ntsc_speed_us: read_u16_le(bytes, 0x6E),
            bankswitch,
            pal_speed_us: read_u16_le(bytes, 0x78),
            region: bytes[0x7A],
            expansion: bytes[0x7B],
            body: bytes[HEADER_SIZE..].to_vec(),
        })
    }

    /// Raw PAL bit of the region byte, independent of the dual-region bit.
    /// This is the value `init` receives in X.
    pub fn pal_bit(&self) -> bool {
        self.region & REGION_PAL != 0
    }

    /// Whether the tune is PAL-only (region bit 0 set, bit 1 clear).
    pub fn is_pal(&self) -> bool {
        self.pal_bit() && !self.is_dual_region()
    }

    /// Whether the tune supports both NTSC and PAL.
    pub fn is_dual_region(&self) -> bool {
        self.region & REGION_DUAL != 0
    }

    /// The tick interval for the tune's preferred region, in microseconds.
    /// Dual-region tunes are driven at the NTSC rate.
    pub fn play_speed_us(&self) -> u16 {
        if self.is_pal() {
            self.pal_speed_us
        } else {
            self.ntsc_speed_us
        }
    }

    /// Whether any bankswitch init value is nonzero. Bank-switched tunes
    /// need mapper hardware this core does not provide.
    pub fn uses_bankswitching(&self) -> bool {
        self.bankswitch.iter().any(|&b| b != 0)
    }

    /// Names of the expansion sound chips the tune requests.
    pub fn expansion_chips(&self) -> Vec<&'static str> {
        const CHIPS: [&str; 6] = [
            "VRC6",
            "VRC7",
            "FDS",
            "MMC5",
            "Namco 163",
            "Sunsoft 5B",
        ];
        CHIPS
            .iter()
            .enumerate()
            .filter(|(bit, _)| self.expansion & (1 << bit) != 0)
            .map(|(_, &name)| name)
            .collect()
    }
}

fn read_u16_le(bytes: &[u8], offset: usize) -> u16 {
    bytes[offset] as u16 | (bytes[offset + 1] as u16) << 8
}

/// Decode a fixed-size NUL-terminated text field, lossily.
fn read_text(field: &[u8]) -> String {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a minimal valid NSF image in memory for testing.
    fn build_nsf(body: &[u8]) -> Vec<u8> {
        let mut image = vec![0u8; HEADER_SIZE];
        image[0..5].copy_from_slice(b"NESM\x1A");
        image[0x05] = 1; // version
        image[0x06] = 3; // total songs
        image[0x07] = 2; // starting song
        image[0x08..0x0A].copy_from_slice(&0x8000u16.to_le_bytes());
        image[0x0A..0x0C].copy_from_slice(&0x8010u16.to_le_bytes());
        image[0x0C..0x0E].copy_from_slice(&0x8020u16.to_le_bytes());
        image[0x0E..0x0E + 10].copy_from_slice(b"Test Tune\0");
        image[0x2E..0x2E + 7].copy_from_slice(b"Nobody\0");
        image[0x4E..0x4E + 5].copy_from_slice(b"2024\0");
        image[0x6E..0x70].copy_from_slice(&16666u16.to_le_bytes());
        image[0x78..0x7A].copy_from_slice(&19997u16.to_le_bytes());
        image.extend_from_slice(body);
        image
    }

    #[test]
    fn test_valid_nsf_parsing() {
        let image = build_nsf(&[0xA9, 0x00, 0x60]);
        let nsf = Nsf::from_bytes(&image).expect("failed to parse test NSF");

        assert_eq!(nsf.version, 1);
        assert_eq!(nsf.total_songs, 3);
        assert_eq!(nsf.starting_song, 2);
        assert_eq!(nsf.load_addr, 0x8000);
        assert_eq!(nsf.init_addr, 0x8010);
        assert_eq!(nsf.play_addr, 0x8020);
        assert_eq!(nsf.title, "Test Tune");
        assert_eq!(nsf.artist, "Nobody");
        assert_eq!(nsf.copyright, "2024");
        assert_eq!(nsf.ntsc_speed_us, 16666);
        assert_eq!(nsf.pal_speed_us, 19997);
        assert_eq!(nsf.body, vec![0xA9, 0x00, 0x60]);
    }

    #[test]
    fn test_invalid_magic_number() {
        let mut image = build_nsf(&[]);
        image[0] = b'X';

        let result = Nsf::from_bytes(&image);
        assert!(result.is_err());

        if let Err(NsfError::InvalidFormat(msg)) = result {
            assert!(msg.contains("magic"));
        } else {
            panic!("expected InvalidFormat error");
        }
    }

    #[test]
    fn test_only_four_magic_bytes_validated() {
        // A nonstandard fifth byte is accepted; only "NESM" matters.
        let mut image = build_nsf(&[]);
        image[4] = 0x00;

        assert!(Nsf::from_bytes(&image).is_ok());
    }

    #[test]
    fn test_file_shorter_than_header() {
        let image = vec![0x4E, 0x45, 0x53, 0x4D];

        let result = Nsf::from_bytes(&image);
        assert!(matches!(result, Err(NsfError::InvalidFormat(_))));
    }

    #[test]
    fn test_empty_body() {
        let image = build_nsf(&[]);
        let nsf = Nsf::from_bytes(&image).unwrap();

        assert!(nsf.body.is_empty());
    }

    #[test]
    fn test_text_field_stops_at_nul() {
        let mut image = build_nsf(&[]);
        // Garbage after the terminator must not leak into the string.
        image[0x0E..0x0E + 4].copy_from_slice(b"Hi\0Z");

        let nsf = Nsf::from_bytes(&image).unwrap();
        assert_eq!(nsf.title, "Hi");
    }

    #[test]
    fn test_text_field_without_nul_uses_all_32_bytes() {
        let mut image = build_nsf(&[]);
        image[0x2E..0x4E].copy_from_slice(&[b'A'; 32]);

        let nsf = Nsf::from_bytes(&image).unwrap();
        assert_eq!(nsf.artist.len(), 32);
    }

    #[test]
    fn test_region_flags() {
        let mut image = build_nsf(&[]);

        let ntsc = Nsf::from_bytes(&image).unwrap();
        assert!(!ntsc.pal_bit());
        assert!(!ntsc.is_pal());
        assert!(!ntsc.is_dual_region());
        assert_eq!(ntsc.play_speed_us(), 16666);

        image[0x7A] = 0x01;
        let pal = Nsf::from_bytes(&image).unwrap();
        assert!(pal.pal_bit());
        assert!(pal.is_pal());
        assert_eq!(pal.play_speed_us(), 19997);

        // Dual-region: not "PAL-only", but the raw PAL bit is still set.
        image[0x7A] = 0x03;
        let dual = Nsf::from_bytes(&image).unwrap();
        assert!(dual.pal_bit());
        assert!(!dual.is_pal());
        assert!(dual.is_dual_region());
        assert_eq!(dual.play_speed_us(), 16666);
    }

    #[test]
    fn test_bankswitch_detection() {
        let mut image = build_nsf(&[]);

        let plain = Nsf::from_bytes(&image).unwrap();
        assert!(!plain.uses_bankswitching());

        image[0x70 + 3] = 4;
        let banked = Nsf::from_bytes(&image).unwrap();
        assert!(banked.uses_bankswitching());
        assert_eq!(banked.bankswitch[3], 4);
    }

    #[test]
    fn test_expansion_chips() {
        let mut image = build_nsf(&[]);
        image[0x7B] = 0b0001_0101; // VRC6, FDS, Namco 163

        let nsf = Nsf::from_bytes(&image).unwrap();
        assert_eq!(nsf.expansion_chips(), vec!["VRC6", "FDS", "Namco 163"]);
    }
}
