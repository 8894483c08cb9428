//! `Birdsong` Constants
//!
//! Wire-format offsets, codec type tags, vendor identifiers and storage
//! limits shared by the codec modules, the descriptor and the registry.

/// Size of a media codec information element buffer (AVDTP codec IE limit)
pub const AVDT_CODEC_SIZE: usize = 20;

/// Offset of the Length Of Service Capability byte
pub const AVDT_LOSC_INDEX: usize = 0;

/// Offset of the media type byte (media type lives in the upper nibble)
pub const AVDT_MEDIA_TYPE_INDEX: usize = 1;

/// Offset of the codec type tag
pub const AVDT_CODEC_TYPE_INDEX: usize = 2;

/// Offset of the first codec-specific parameter byte
pub const AVDT_CODEC_PARAMS_INDEX: usize = 3;

/// Audio media type
pub const AVDT_MEDIA_TYPE_AUDIO: u8 = 0x00;

/// Codec type tag: SBC
pub const A2DP_MEDIA_CT_SBC: u8 = 0x00;

/// Codec type tag: MPEG-2,4 AAC
pub const A2DP_MEDIA_CT_AAC: u8 = 0x02;

/// Codec type tag: vendor specific (non-A2DP) codec
pub const A2DP_MEDIA_CT_NON_A2DP: u8 = 0xFF;

/// Offset of the little-endian 32-bit vendor identifier
pub const VENDOR_ID_START_IDX: usize = 3;

/// Offset of the little-endian 16-bit vendor codec identifier
pub const VENDOR_CODEC_ID_START_IDX: usize = 7;

/// Offset of the first vendor codec parameter byte
pub const VENDOR_PARAMS_START_IDX: usize = 9;

/// aptX vendor identifier (APT Licensing Ltd.)
pub const APTX_VENDOR_ID: u32 = 0x0000_004F;
/// aptX codec identifier
pub const APTX_CODEC_ID: u16 = 0x0001;

/// aptX-HD vendor identifier (Qualcomm Technologies International)
pub const APTX_HD_VENDOR_ID: u32 = 0x0000_00D7;
/// aptX-HD codec identifier
pub const APTX_HD_CODEC_ID: u16 = 0x0024;

/// LDAC vendor identifier (Sony Corporation)
pub const LDAC_VENDOR_ID: u32 = 0x0000_012D;
/// LDAC codec identifier
pub const LDAC_CODEC_ID: u16 = 0x00AA;

/// Opus vendor identifier (Google)
pub const OPUS_VENDOR_ID: u32 = 0x0000_00E0;
/// Opus codec identifier
pub const OPUS_CODEC_ID: u16 = 0x0001;

/// LHDC vendor identifier (Savitech)
pub const LHDC_VENDOR_ID: u32 = 0x0000_053A;
/// LHDC V2 codec identifier
pub const LHDC_V2_CODEC_ID: u16 = 0x4C32;
/// LHDC V3 codec identifier (shared with the V4 and LLAC sub-revisions)
pub const LHDC_V3_CODEC_ID: u16 = 0x4C33;
/// LHDC V5 codec identifier
pub const LHDC_V5_CODEC_ID: u16 = 0x4C35;

/// Number of source codec indices
pub const SOURCE_CODEC_COUNT: usize = 9;

/// Number of sink codec indices
pub const SINK_CODEC_COUNT: usize = 6;

/// Capacity of the registry maps and ordered lists (power of two for `FnvIndexMap`)
pub const MAX_CODECS: usize = 16;

/// Size of the hardware offload codec information structure
pub const OFFLOAD_CODEC_INFO_SIZE: usize = 32;

/// Maximum length of the offload capability token list
pub const MAX_OFFLOAD_CAPABILITY_LENGTH: usize = 64;
