//! Ogg/Opus voice notes built in memory, shaped like Telegram's.

const OPUS_RATE: u32 = 48_000;
/// Samples per 20 ms frame at 48 kHz.
const FRAME_SAMPLES: u64 = 960;
/// TOC byte: CELT-only fullband, 20 ms, mono, one frame.
const TOC_CELT_FB_20MS: u8 = 31 << 3;
const SILENT_PACKET: &[u8] = &[TOC_CELT_FB_20MS];
const STREAM_SERIAL: u32 = 0x746f_6e65;

/// A mono Ogg/Opus stream of `frames` 20 ms frames.
///
/// Each packet carries only its TOC byte, which libopus decodes as
/// concealment and, before any real audio, as digital silence.
pub fn silent_voice_note(frames: usize) -> Vec<u8> {
    let mut head = Vec::with_capacity(19);
    head.extend_from_slice(b"OpusHead");
    head.push(1); // version
    head.push(1); // channels
    head.extend_from_slice(&0u16.to_le_bytes()); // pre-skip
    head.extend_from_slice(&OPUS_RATE.to_le_bytes());
    head.extend_from_slice(&0i16.to_le_bytes()); // output gain
    head.push(0); // mapping family

    let vendor = b"tonalyzer";
    let mut tags = Vec::new();
    tags.extend_from_slice(b"OpusTags");
    tags.extend_from_slice(&(vendor.len() as u32).to_le_bytes());
    tags.extend_from_slice(vendor);
    tags.extend_from_slice(&0u32.to_le_bytes());

    let audio = vec![SILENT_PACKET; frames];

    let mut stream = ogg_page(0x02, 0, 0, &[head.as_slice()]);
    stream.extend(ogg_page(0x00, 0, 1, &[tags.as_slice()]));
    stream.extend(ogg_page(0x04, frames as u64 * FRAME_SAMPLES, 2, &audio));
    stream
}

fn ogg_page(header_type: u8, granule: u64, sequence: u32, packets: &[&[u8]]) -> Vec<u8> {
    let mut lacing = Vec::new();
    for packet in packets {
        lacing.extend(std::iter::repeat(255u8).take(packet.len() / 255));
        lacing.push((packet.len() % 255) as u8);
    }
    assert!(lacing.len() <= 255, "too many segments for one page");

    let mut page = Vec::new();
    page.extend_from_slice(b"OggS");
    page.push(0); // stream structure version
    page.push(header_type);
    page.extend_from_slice(&granule.to_le_bytes());
    page.extend_from_slice(&STREAM_SERIAL.to_le_bytes());
    page.extend_from_slice(&sequence.to_le_bytes());
    page.extend_from_slice(&[0; 4]); // checksum, filled below
    page.push(lacing.len() as u8);
    page.extend_from_slice(&lacing);
    for packet in packets {
        page.extend_from_slice(packet);
    }

    let crc = ogg_crc(&page);
    page[22..26].copy_from_slice(&crc.to_le_bytes());
    page
}

/// CRC-32 with polynomial 0x04c11db7, no reflection, zero init.
fn ogg_crc(bytes: &[u8]) -> u32 {
    bytes.iter().fold(0u32, |crc, &byte| {
        let mut reg = crc ^ ((byte as u32) << 24);
        for _ in 0..8 {
            reg = if reg & 0x8000_0000 != 0 {
                (reg << 1) ^ 0x04c1_1db7
            } else {
                reg << 1
            };
        }
        reg
    })
}
