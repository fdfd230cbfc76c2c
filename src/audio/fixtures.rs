//! Synthetic audio files for tests.

use std::io::Cursor;

/// Silent 16-bit PCM WAV of the given shape.
pub fn wav_bytes(channels: u16, sample_rate: u32, seconds: u32) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let samples = sample_rate as usize * seconds as usize * channels as usize;

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).expect("wav writer");
        for _ in 0..samples {
            writer.write_sample(0i16).expect("write sample");
        }
        writer.finalize().expect("finalize wav fixture");
    }
    cursor.into_inner()
}

/// `fmt ` chunk layout for [`riff_wav`].
#[derive(Debug, Clone, Copy)]
pub enum RiffFormat {
    /// 16-byte `WAVE_FORMAT_PCM` chunk
    Pcm,
    /// 40-byte `WAVE_FORMAT_EXTENSIBLE` chunk with the PCM sub-format GUID
    Extensible,
}

const KSDATAFORMAT_SUBTYPE_PCM: [u8; 16] = [
    0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x10, 0x00, 0x80, 0x00, 0x00, 0xAA, 0x00, 0x38, 0x9B, 0x71,
];

/// Hand-assembled RIFF/WAVE file.
///
/// The `data` chunk header claims `declared_data_len` bytes while only
/// `actual_data_len` zero bytes follow, which models a file cut short.
pub fn riff_wav(
    format: RiffFormat,
    channels: u16,
    sample_rate: u32,
    bits_per_sample: u16,
    declared_data_len: u32,
    actual_data_len: u32,
) -> Vec<u8> {
    let block_align = channels * bits_per_sample.div_ceil(8);
    let byte_rate = sample_rate * u32::from(block_align);

    let mut fmt = Vec::new();
    let format_tag: u16 = match format {
        RiffFormat::Pcm => 1,
        RiffFormat::Extensible => 0xFFFE,
    };
    fmt.extend_from_slice(&format_tag.to_le_bytes());
    fmt.extend_from_slice(&channels.to_le_bytes());
    fmt.extend_from_slice(&sample_rate.to_le_bytes());
    fmt.extend_from_slice(&byte_rate.to_le_bytes());
    fmt.extend_from_slice(&block_align.to_le_bytes());
    fmt.extend_from_slice(&bits_per_sample.to_le_bytes());
    if let RiffFormat::Extensible = format {
        let channel_mask: u32 = (1u32 << channels) - 1;
        fmt.extend_from_slice(&22u16.to_le_bytes());
        fmt.extend_from_slice(&bits_per_sample.to_le_bytes());
        fmt.extend_from_slice(&channel_mask.to_le_bytes());
        fmt.extend_from_slice(&KSDATAFORMAT_SUBTYPE_PCM);
    }

    let riff_len = 4 + (8 + fmt.len() as u32) + (8 + declared_data_len);

    let mut out = Vec::new();
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&riff_len.to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&(fmt.len() as u32).to_le_bytes());
    out.extend_from_slice(&fmt);
    out.extend_from_slice(b"data");
    out.extend_from_slice(&declared_data_len.to_le_bytes());
    out.resize(out.len() + actual_data_len as usize, 0);
    out
}

/// Length of an MPEG-1 Layer III frame at 128 kbit/s, 44.1 kHz, no padding.
pub const MP3_FRAME_LEN: usize = 417;

/// Samples carried by one MPEG-1 Layer III frame.
pub const MP3_FRAME_SAMPLES: usize = 1152;

/// A run of `frames` MPEG-1 Layer III frames with silent (zeroed) payloads.
pub fn mp3_bytes(frames: usize, mono: bool) -> Vec<u8> {
    // sync + MPEG-1 + Layer III + no CRC, 128 kbit/s @ 44.1 kHz, channel mode
    let mode = if mono { 0xC4 } else { 0x44 };
    let header = [0xFF, 0xFB, 0x90, mode];

    let mut out = Vec::with_capacity(frames * MP3_FRAME_LEN);
    for _ in 0..frames {
        let mut frame = vec![0u8; MP3_FRAME_LEN];
        frame[..4].copy_from_slice(&header);
        out.extend_from_slice(&frame);
    }
    out
}
