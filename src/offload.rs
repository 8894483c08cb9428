//! Hardware offload encoding
//!
//! Re-packs a negotiated wire configuration into the fixed
//! [`OFFLOAD_CODEC_INFO_SIZE`]-byte structure consumed by offload hardware.
//! Field placement depends on the codec and, for LHDC, on the revision:
//!
//! ```text
//! SBC   [0] blocks|subbands|allocation  [1] min bitpool  [2] max bitpool
//!       [3] sample rate|channel mode
//! AAC   [0] object type  [1] VBR|bit rate (high bits)
//! other [0..4] vendor ID (LE)  [4..6] codec ID (LE)
//! LDAC  [6] quality  [7] channel mode
//! LHDC  [6] version  [7..9] bit rate  [9..11] max bit rate
//!       [11..13] min bit rate  [13] frame duration  [14] data interval
//!       [15] feature flags  [16] split / AR on
//! ```
//!
//! The byte offsets and tier constants are shared with the hardware and must
//! not be renumbered. The hardware tells LHDC revisions apart only by the
//! version byte, so every revision keeps its own mapping tables.

use crate::OffloadError;
use crate::codecs::vendor::VendorCodec;
use crate::codecs::vendor::lhdc::{
    LhdcFeatures, LhdcInfo, LhdcQuality, LhdcRevision, MAX_BIT_RATE_400K, MAX_BIT_RATE_500K,
    SPLIT_NONE, SPLIT_TWS, V5_MAX_BIT_RATE_400K, V5_MAX_BIT_RATE_500K, V5_MAX_BIT_RATE_900K,
    V5_MIN_BIT_RATE_64K, V5_MIN_BIT_RATE_128K, V5_MIN_BIT_RATE_256K, V5_VER_1, VER2, VER3, VER6,
};
use crate::codecs::{CodecFamily, is_source_codec_valid};
use crate::config::CodecConfig;
use crate::constants::OFFLOAD_CODEC_INFO_SIZE;
use crate::layout::{BitField, WordField, fits, lookup};

/// LDAC high quality (990 kbps)
pub const OFFLOAD_LDAC_QUALITY_HIGH: u8 = 0x00;
/// LDAC mid quality (660 kbps)
pub const OFFLOAD_LDAC_QUALITY_MID: u8 = 0x01;
/// LDAC low quality (330 kbps)
pub const OFFLOAD_LDAC_QUALITY_LOW: u8 = 0x02;
/// LDAC adaptive bit rate
pub const OFFLOAD_LDAC_QUALITY_ABR: u8 = 0x7F;

/// LHDC bit rate tier: 64 kbps
pub const OFFLOAD_LHDC_QUALITY_LOW0: u16 = 0x0001;
/// LHDC bit rate tier: 128 kbps
pub const OFFLOAD_LHDC_QUALITY_LOW1: u16 = 0x0002;
/// LHDC bit rate tier: 192 kbps
pub const OFFLOAD_LHDC_QUALITY_LOW2: u16 = 0x0004;
/// LHDC bit rate tier: 256 kbps
pub const OFFLOAD_LHDC_QUALITY_LOW3: u16 = 0x0008;
/// LHDC bit rate tier: 320 kbps
pub const OFFLOAD_LHDC_QUALITY_LOW4: u16 = 0x0010;
/// LHDC bit rate tier: 400 kbps
pub const OFFLOAD_LHDC_QUALITY_LOW: u16 = 0x0020;
/// LHDC bit rate tier: 500 kbps
pub const OFFLOAD_LHDC_QUALITY_MID: u16 = 0x0040;
/// LHDC bit rate tier: 900 kbps
pub const OFFLOAD_LHDC_QUALITY_HIGH: u16 = 0x0080;
/// LHDC bit rate tier: 1000 kbps
pub const OFFLOAD_LHDC_QUALITY_HIGH1: u16 = 0x0100;
/// LHDC adaptive bit rate
pub const OFFLOAD_LHDC_QUALITY_ABR: u16 = 0x8000;

/// LHDC version byte: V2
pub const OFFLOAD_LHDC_VER_V2: u8 = 0x01;
/// LHDC version byte: V3 only
pub const OFFLOAD_LHDC_VER_V3_ONLY: u8 = 0x02;
/// LHDC version byte: V4 only
pub const OFFLOAD_LHDC_VER_V4_ONLY: u8 = 0x04;
/// LHDC version byte: LLAC
pub const OFFLOAD_LHDC_VER_LLAC: u8 = 0x08;
/// LHDC version byte: V5
pub const OFFLOAD_LHDC_VER_V5: u8 = 0x10;

/// LHDC data interval with low latency (ms)
pub const OFFLOAD_LHDC_DATA_INTERVAL_10MS: u8 = 10;
/// LHDC data interval without low latency (ms)
pub const OFFLOAD_LHDC_DATA_INTERVAL_20MS: u8 = 20;
/// LHDC frame duration of 5 ms (in units of 100 us)
pub const OFFLOAD_LHDC_FRAME_DURATION_5000US: u8 = 50;

/// LHDC specific-1 flag: audio rendering
pub const OFFLOAD_LHDC_SPECIFIC_FEATURE_AR: u8 = 0x01;
/// LHDC specific-1 flag: just audio sampling
pub const OFFLOAD_LHDC_SPECIFIC_FEATURE_JAS: u8 = 0x02;
/// LHDC specific-1 flag: metadata
pub const OFFLOAD_LHDC_SPECIFIC_FEATURE_META: u8 = 0x04;
/// LHDC specific-2 flag: channel split (V2/V3)
pub const OFFLOAD_LHDC_SPECIFIC_FEATURE_SPLIT: u8 = 0x01;
/// LHDC specific-2 flag: audio rendering active (V5)
pub const OFFLOAD_LHDC_SPECIFIC_ACTION_AR_ON: u8 = 0x01;

const VENDOR_ID: [BitField; 4] = [
    BitField::byte(0),
    BitField::byte(1),
    BitField::byte(2),
    BitField::byte(3),
];
const CODEC_ID: WordField = WordField::new(4);

const LDAC_QUALITY: BitField = BitField::byte(6);
const LDAC_CHANNEL_MODE: BitField = BitField::byte(7);

const LHDC_VERSION: BitField = BitField::byte(6);
const LHDC_BIT_RATE: WordField = WordField::new(7);
const LHDC_MAX_BIT_RATE: WordField = WordField::new(9);
const LHDC_MIN_BIT_RATE: WordField = WordField::new(11);
const LHDC_FRAME_DURATION: BitField = BitField::byte(13);
const LHDC_DATA_INTERVAL: BitField = BitField::byte(14);
const LHDC_SPECIFIC_1: BitField = BitField::byte(15);
const LHDC_SPECIFIC_2: BitField = BitField::byte(16);

const _: () = assert!(fits(
    &[
        VENDOR_ID[0],
        VENDOR_ID[1],
        VENDOR_ID[2],
        VENDOR_ID[3],
        CODEC_ID.bytes()[0],
        CODEC_ID.bytes()[1],
        LDAC_QUALITY,
        LDAC_CHANNEL_MODE,
    ],
    OFFLOAD_CODEC_INFO_SIZE
));

const _: () = assert!(fits(
    &[
        VENDOR_ID[0],
        VENDOR_ID[1],
        VENDOR_ID[2],
        VENDOR_ID[3],
        CODEC_ID.bytes()[0],
        CODEC_ID.bytes()[1],
        LHDC_VERSION,
        LHDC_BIT_RATE.bytes()[0],
        LHDC_BIT_RATE.bytes()[1],
        LHDC_MAX_BIT_RATE.bytes()[0],
        LHDC_MAX_BIT_RATE.bytes()[1],
        LHDC_MIN_BIT_RATE.bytes()[0],
        LHDC_MIN_BIT_RATE.bytes()[1],
        LHDC_FRAME_DURATION,
        LHDC_DATA_INTERVAL,
        LHDC_SPECIFIC_1,
        LHDC_SPECIFIC_2,
    ],
    OFFLOAD_CODEC_INFO_SIZE
));

/// Wire byte to offload byte copies for SBC
const SBC_FIELDS: [(usize, usize); 4] = [(4, 0), (5, 1), (6, 2), (3, 3)];
/// Wire byte to offload byte copies for AAC
const AAC_FIELDS: [(usize, usize); 2] = [(3, 0), (6, 1)];

/// LDAC wire channel mode byte
const LDAC_WIRE_CHANNEL_MODE: BitField = BitField::byte(10);

/// Bit rate tier of every quality mode
const LHDC_QUALITY_TIERS: [(LhdcQuality, u16); 10] = [
    (LhdcQuality::Low0, OFFLOAD_LHDC_QUALITY_LOW0),
    (LhdcQuality::Low1, OFFLOAD_LHDC_QUALITY_LOW1),
    (LhdcQuality::Low2, OFFLOAD_LHDC_QUALITY_LOW2),
    (LhdcQuality::Low3, OFFLOAD_LHDC_QUALITY_LOW3),
    (LhdcQuality::Low4, OFFLOAD_LHDC_QUALITY_LOW4),
    (LhdcQuality::Low, OFFLOAD_LHDC_QUALITY_LOW),
    (LhdcQuality::Mid, OFFLOAD_LHDC_QUALITY_MID),
    (LhdcQuality::High, OFFLOAD_LHDC_QUALITY_HIGH),
    (LhdcQuality::High1, OFFLOAD_LHDC_QUALITY_HIGH1),
    (LhdcQuality::Abr, OFFLOAD_LHDC_QUALITY_ABR),
];

/// V2/V3 max bit rate field to tier (anything else is 900 kbps)
const LHDC_V3_MAX_TIERS: [(u8, u16); 2] = [
    (MAX_BIT_RATE_400K, OFFLOAD_LHDC_QUALITY_LOW),
    (MAX_BIT_RATE_500K, OFFLOAD_LHDC_QUALITY_MID),
];

/// V5 max bit rate field to tier (anything else is 1000 kbps)
const LHDC_V5_MAX_TIERS: [(u8, u16); 3] = [
    (V5_MAX_BIT_RATE_400K, OFFLOAD_LHDC_QUALITY_LOW),
    (V5_MAX_BIT_RATE_500K, OFFLOAD_LHDC_QUALITY_MID),
    (V5_MAX_BIT_RATE_900K, OFFLOAD_LHDC_QUALITY_HIGH),
];

/// V5 min bit rate field to tier (anything else is 400 kbps)
const LHDC_V5_MIN_TIERS: [(u8, u16); 3] = [
    (V5_MIN_BIT_RATE_64K, OFFLOAD_LHDC_QUALITY_LOW0),
    (V5_MIN_BIT_RATE_128K, OFFLOAD_LHDC_QUALITY_LOW1),
    (V5_MIN_BIT_RATE_256K, OFFLOAD_LHDC_QUALITY_LOW3),
];

/// Feature flags reported in the specific-1 byte
const LHDC_SPECIFIC_FEATURES: [(u16, u8); 3] = [
    (LhdcFeatures::AR, OFFLOAD_LHDC_SPECIFIC_FEATURE_AR),
    (LhdcFeatures::JAS, OFFLOAD_LHDC_SPECIFIC_FEATURE_JAS),
    (LhdcFeatures::META, OFFLOAD_LHDC_SPECIFIC_FEATURE_META),
];

/// Offload codec structure
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OffloadCodecInfo([u8; OFFLOAD_CODEC_INFO_SIZE]);

impl OffloadCodecInfo {
    /// Create an all-zero structure
    #[must_use]
    pub const fn new() -> Self {
        Self([0; OFFLOAD_CODEC_INFO_SIZE])
    }

    /// Get the raw bytes
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; OFFLOAD_CODEC_INFO_SIZE] {
        &self.0
    }
}

impl Default for OffloadCodecInfo {
    fn default() -> Self {
        Self::new()
    }
}

impl AsRef<[u8]> for OffloadCodecInfo {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Encode a negotiated configuration for offload hardware
///
/// `config` supplies the codec-specific selections (LDAC and LHDC quality)
/// that are not carried on the wire. Codecs without offload fields beyond
/// their IDs leave the rest of the structure zeroed.
///
/// # Errors
/// Returns `InvalidConfig` if `ota` is not a valid source codec element, and
/// `UnsupportedVersion`, `UnsupportedSplitMode` or `UnsupportedFrameDuration`
/// when an LHDC field has no offload representation. No structure is
/// produced on error.
pub fn encode_offload(ota: &[u8], config: &CodecConfig) -> Result<OffloadCodecInfo, OffloadError> {
    let mut out = OffloadCodecInfo::new();
    if !is_source_codec_valid(ota) {
        return Err(OffloadError::InvalidConfig);
    }

    match CodecFamily::identify(ota).ok_or(OffloadError::InvalidConfig)? {
        CodecFamily::Sbc => copy_fields(ota, &mut out.0, &SBC_FIELDS),
        CodecFamily::Aac => copy_fields(ota, &mut out.0, &AAC_FIELDS),
        CodecFamily::Vendor(codec) => {
            let (vendor_id, codec_id) = codec.ids();
            for (field, byte) in VENDOR_ID.iter().zip(vendor_id.to_le_bytes()) {
                field.set(&mut out.0, byte);
            }
            CODEC_ID.set(&mut out.0, codec_id);

            match codec {
                VendorCodec::Ldac => encode_ldac(ota, config, &mut out.0),
                VendorCodec::LhdcV2 => {
                    let info = parse_lhdc(ota, LhdcRevision::V2)?;
                    encode_lhdc_v2(&info, config, &mut out.0)?;
                }
                VendorCodec::LhdcV3 => {
                    let info = parse_lhdc(ota, LhdcRevision::V3)?;
                    encode_lhdc_v3(&info, config, &mut out.0)?;
                }
                VendorCodec::LhdcV5 => {
                    let info = parse_lhdc(ota, LhdcRevision::V5)?;
                    encode_lhdc_v5(&info, config, &mut out.0)?;
                }
                VendorCodec::Aptx | VendorCodec::AptxHd | VendorCodec::Opus => {}
            }
        }
    }
    Ok(out)
}

fn copy_fields(ota: &[u8], out: &mut [u8], fields: &[(usize, usize)]) {
    for &(from, to) in fields {
        BitField::byte(to).set(out, BitField::byte(from).get(ota));
    }
}

fn encode_ldac(ota: &[u8], config: &CodecConfig, out: &mut [u8]) {
    let quality = match config.codec_specific_1 {
        0 => OFFLOAD_LDAC_QUALITY_ABR,
        value => match value % 10 {
            0 => OFFLOAD_LDAC_QUALITY_HIGH,
            1 => OFFLOAD_LDAC_QUALITY_MID,
            2 => OFFLOAD_LDAC_QUALITY_LOW,
            _ => OFFLOAD_LDAC_QUALITY_ABR,
        },
    };
    LDAC_QUALITY.set(out, quality);
    LDAC_CHANNEL_MODE.set(out, LDAC_WIRE_CHANNEL_MODE.get(ota));
}

fn parse_lhdc(ota: &[u8], revision: LhdcRevision) -> Result<LhdcInfo, OffloadError> {
    LhdcInfo::parse(ota, revision, false)
        .or_else(|_| LhdcInfo::parse(ota, revision, true))
        .map_err(|_| OffloadError::InvalidConfig)
}

/// Quality mode selected in the low nibble of `codec_specific_1`
fn lhdc_quality(config: &CodecConfig) -> Option<LhdcQuality> {
    LhdcQuality::from_specific(LhdcQuality::MAGIC | (config.codec_specific_1 & 0x0F))
}

fn data_interval(info: &LhdcInfo) -> u8 {
    if info.features.contains(LhdcFeatures::LL) {
        OFFLOAD_LHDC_DATA_INTERVAL_10MS
    } else {
        OFFLOAD_LHDC_DATA_INTERVAL_20MS
    }
}

fn specific_features(info: &LhdcInfo) -> u8 {
    LHDC_SPECIFIC_FEATURES
        .iter()
        .filter(|(feature, _)| info.features.contains(*feature))
        .fold(0, |acc, (_, flag)| acc | flag)
}

fn split_flag(info: &LhdcInfo) -> Result<u8, OffloadError> {
    match info.split_mode {
        SPLIT_NONE => Ok(0),
        SPLIT_TWS => Ok(OFFLOAD_LHDC_SPECIFIC_FEATURE_SPLIT),
        other => {
            error!(
                "[{}] Unsupported split mode 0x{:X}",
                info.revision.name(),
                other
            );
            Err(OffloadError::UnsupportedSplitMode(other))
        }
    }
}

/// Bit rate tier of the selected quality mode, ABR when unknown
///
/// V2 and V3 have no HIGH1 tier and send HIGH instead.
fn bit_rate_tier(config: &CodecConfig, revision: LhdcRevision) -> u16 {
    match (lhdc_quality(config), revision) {
        (Some(LhdcQuality::High1), LhdcRevision::V2 | LhdcRevision::V3) => {
            OFFLOAD_LHDC_QUALITY_HIGH
        }
        (quality, _) => quality
            .and_then(|quality| lookup(&LHDC_QUALITY_TIERS, quality))
            .unwrap_or(OFFLOAD_LHDC_QUALITY_ABR),
    }
}

fn v3_max_tier(info: &LhdcInfo) -> u16 {
    lookup(&LHDC_V3_MAX_TIERS, info.max_bit_rate).unwrap_or(OFFLOAD_LHDC_QUALITY_HIGH)
}

fn encode_lhdc_v2(info: &LhdcInfo, config: &CodecConfig, out: &mut [u8]) -> Result<(), OffloadError> {
    if info.version > VER2 {
        error!("[LHDC V2] Unsupported version 0x{:X}", info.version);
        return Err(OffloadError::UnsupportedVersion(info.version));
    }
    let bit_rate = bit_rate_tier(config, LhdcRevision::V2);
    let split = split_flag(info)?;

    LHDC_VERSION.set(out, OFFLOAD_LHDC_VER_V2);
    LHDC_BIT_RATE.set(out, bit_rate);
    LHDC_MAX_BIT_RATE.set(out, v3_max_tier(info));
    LHDC_DATA_INTERVAL.set(out, data_interval(info));
    LHDC_SPECIFIC_2.set(out, split);
    debug!("[LHDC V2] Offload bit rate tier 0x{:X}", bit_rate);
    Ok(())
}

fn encode_lhdc_v3(info: &LhdcInfo, config: &CodecConfig, out: &mut [u8]) -> Result<(), OffloadError> {
    if info.version != VER3 && info.version != VER6 {
        error!("[LHDC V3] Unsupported version 0x{:X}", info.version);
        return Err(OffloadError::UnsupportedVersion(info.version));
    }
    let llac = info.features.contains(LhdcFeatures::LLAC);
    let v4 = info.features.contains(LhdcFeatures::V4);
    let version = match (llac, v4) {
        (true, false) => OFFLOAD_LHDC_VER_LLAC,
        (false, true) => OFFLOAD_LHDC_VER_V4_ONLY,
        _ => OFFLOAD_LHDC_VER_V3_ONLY,
    };
    let bit_rate = bit_rate_tier(config, LhdcRevision::V3);
    let min_bit_rate = if info.features.contains(LhdcFeatures::MIN_BR) {
        OFFLOAD_LHDC_QUALITY_LOW4
    } else {
        OFFLOAD_LHDC_QUALITY_LOW1
    };
    let split = split_flag(info)?;

    LHDC_VERSION.set(out, version);
    LHDC_BIT_RATE.set(out, bit_rate);
    LHDC_MAX_BIT_RATE.set(out, v3_max_tier(info));
    LHDC_MIN_BIT_RATE.set(out, min_bit_rate);
    LHDC_DATA_INTERVAL.set(out, data_interval(info));
    LHDC_SPECIFIC_1.set(out, specific_features(info));
    LHDC_SPECIFIC_2.set(out, split);
    debug!(
        "[LHDC V3] Offload version 0x{:X} bit rate tier 0x{:X} llac {} v4 {}",
        version,
        bit_rate,
        llac,
        v4
    );
    Ok(())
}

fn encode_lhdc_v5(info: &LhdcInfo, config: &CodecConfig, out: &mut [u8]) -> Result<(), OffloadError> {
    if info.version != V5_VER_1 {
        error!("[LHDC V5] Unsupported version 0x{:X}", info.version);
        return Err(OffloadError::UnsupportedVersion(info.version));
    }
    if info.frame_length == 0 {
        error!("[LHDC V5] Unsupported frame duration 0x{:X}", info.frame_length);
        return Err(OffloadError::UnsupportedFrameDuration(info.frame_length));
    }
    let bit_rate = bit_rate_tier(config, LhdcRevision::V5);
    let max_bit_rate =
        lookup(&LHDC_V5_MAX_TIERS, info.max_bit_rate).unwrap_or(OFFLOAD_LHDC_QUALITY_HIGH1);
    let min_bit_rate =
        lookup(&LHDC_V5_MIN_TIERS, info.min_bit_rate).unwrap_or(OFFLOAD_LHDC_QUALITY_LOW);

    LHDC_VERSION.set(out, OFFLOAD_LHDC_VER_V5);
    LHDC_BIT_RATE.set(out, bit_rate);
    LHDC_MAX_BIT_RATE.set(out, max_bit_rate);
    LHDC_MIN_BIT_RATE.set(out, min_bit_rate);
    LHDC_FRAME_DURATION.set(out, OFFLOAD_LHDC_FRAME_DURATION_5000US);
    LHDC_DATA_INTERVAL.set(out, data_interval(info));
    LHDC_SPECIFIC_1.set(out, specific_features(info));
    if info.ar_on {
        LHDC_SPECIFIC_2.set(out, OFFLOAD_LHDC_SPECIFIC_ACTION_AR_ON);
    }
    debug!("[LHDC V5] Offload bit rate tier 0x{:X}", bit_rate);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codecs::aac::AacInfo;
    use crate::codecs::sbc::SbcInfo;
    use crate::codecs::vendor::aptx::AptxInfo;
    use crate::codecs::vendor::ldac::{LDAC_QUALITY_MID, LdacInfo};
    use crate::codecs::vendor::lhdc::{SPLIT_TWS_PLUS, V5_FRAME_LEN_5MS};

    fn lhdc_config(quality: LhdcQuality) -> CodecConfig {
        CodecConfig {
            codec_specific_1: quality.to_specific(),
            ..CodecConfig::default()
        }
    }

    #[test]
    fn test_sbc_offload() {
        let config = SbcInfo {
            channel_mode: SbcInfo::CH_STEREO,
            ..SbcInfo::DEFAULT_CONFIG
        }
        .build();
        let offload = encode_offload(config.as_bytes(), &CodecConfig::default()).unwrap();
        assert_eq!(&offload.as_bytes()[..4], &[0x15, 0x02, 0x35, 0x22]);
        assert!(offload.as_bytes()[4..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_aac_offload() {
        let config = AacInfo::DEFAULT_CONFIG.build();
        let offload = encode_offload(config.as_bytes(), &CodecConfig::default()).unwrap();
        assert_eq!(&offload.as_bytes()[..3], &[0x80, 0x04, 0x00]);
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert_eq!(
            encode_offload(&[3, 0, 0x04, 0], &CodecConfig::default()),
            Err(OffloadError::InvalidConfig)
        );
        assert_eq!(
            encode_offload(&[], &CodecConfig::default()),
            Err(OffloadError::InvalidConfig)
        );
    }

    #[test]
    fn test_ldac_offload() {
        let config = LdacInfo::DEFAULT_CONFIG.build();
        let offload = encode_offload(config.as_bytes(), &CodecConfig::default()).unwrap();
        assert_eq!(
            &offload.as_bytes()[..8],
            &[0x2D, 0x01, 0x00, 0x00, 0xAA, 0x00, 0x7F, 0x01]
        );

        let mid = CodecConfig {
            codec_specific_1: LDAC_QUALITY_MID,
            ..CodecConfig::default()
        };
        let offload = encode_offload(config.as_bytes(), &mid).unwrap();
        assert_eq!(offload.as_bytes()[6], OFFLOAD_LDAC_QUALITY_MID);
    }

    #[test]
    fn test_aptx_offload_only_ids() {
        let config = AptxInfo::default_config(false).build();
        let offload = encode_offload(config.as_bytes(), &CodecConfig::default()).unwrap();
        assert_eq!(&offload.as_bytes()[..6], &[0x4F, 0x00, 0x00, 0x00, 0x01, 0x00]);
        assert!(offload.as_bytes()[6..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_lhdc_v3_offload() {
        let config = LhdcInfo::default_config(LhdcRevision::V3).build();
        let offload = encode_offload(config.as_bytes(), &lhdc_config(LhdcQuality::High)).unwrap();
        assert_eq!(
            &offload.as_bytes()[..17],
            &[
                0x3A, 0x05, 0x00, 0x00, 0x33, 0x4C, // IDs
                OFFLOAD_LHDC_VER_V3_ONLY,
                0x80, 0x00, // HIGH
                0x80, 0x00, // max HIGH
                0x02, 0x00, // min LOW1
                0x00, // no frame duration
                OFFLOAD_LHDC_DATA_INTERVAL_20MS,
                0x00,
                0x00,
            ]
        );

        let offload = encode_offload(config.as_bytes(), &lhdc_config(LhdcQuality::Low0)).unwrap();
        assert_eq!(LHDC_BIT_RATE.get(offload.as_bytes()), OFFLOAD_LHDC_QUALITY_LOW0);
    }

    #[test]
    fn test_lhdc_v3_quality_tiers() {
        let config = LhdcInfo::default_config(LhdcRevision::V3).build();
        let cases = [
            (LhdcQuality::Low0, OFFLOAD_LHDC_QUALITY_LOW0),
            (LhdcQuality::Low1, OFFLOAD_LHDC_QUALITY_LOW1),
            (LhdcQuality::Low2, OFFLOAD_LHDC_QUALITY_LOW2),
            (LhdcQuality::Low3, OFFLOAD_LHDC_QUALITY_LOW3),
            (LhdcQuality::Low4, OFFLOAD_LHDC_QUALITY_LOW4),
            (LhdcQuality::Low, OFFLOAD_LHDC_QUALITY_LOW),
            (LhdcQuality::Mid, OFFLOAD_LHDC_QUALITY_MID),
            (LhdcQuality::High, OFFLOAD_LHDC_QUALITY_HIGH),
            (LhdcQuality::High1, OFFLOAD_LHDC_QUALITY_HIGH),
            (LhdcQuality::Abr, OFFLOAD_LHDC_QUALITY_ABR),
        ];
        for (quality, tier) in cases {
            let offload = encode_offload(config.as_bytes(), &lhdc_config(quality)).unwrap();
            assert_eq!(LHDC_BIT_RATE.get(offload.as_bytes()), tier);
        }

        // Unknown quality nibble
        let unknown = CodecConfig {
            codec_specific_1: 0x0F,
            ..CodecConfig::default()
        };
        let offload = encode_offload(config.as_bytes(), &unknown).unwrap();
        assert_eq!(LHDC_BIT_RATE.get(offload.as_bytes()), OFFLOAD_LHDC_QUALITY_ABR);
    }

    #[test]
    fn test_lhdc_v3_version_byte() {
        let base = LhdcInfo::default_config(LhdcRevision::V3);
        let cases = [
            (LhdcFeatures::LLAC, OFFLOAD_LHDC_VER_LLAC),
            (LhdcFeatures::V4, OFFLOAD_LHDC_VER_V4_ONLY),
            (LhdcFeatures::LLAC | LhdcFeatures::V4, OFFLOAD_LHDC_VER_V3_ONLY),
        ];
        for (features, expected) in cases {
            let info = LhdcInfo {
                features: LhdcFeatures(features | LhdcFeatures::LL | LhdcFeatures::AR),
                ..base
            };
            let offload =
                encode_offload(info.build().as_bytes(), &CodecConfig::default()).unwrap();
            assert_eq!(LHDC_VERSION.get(offload.as_bytes()), expected);
            assert_eq!(
                LHDC_DATA_INTERVAL.get(offload.as_bytes()),
                OFFLOAD_LHDC_DATA_INTERVAL_10MS
            );
            assert_eq!(
                LHDC_SPECIFIC_1.get(offload.as_bytes()),
                OFFLOAD_LHDC_SPECIFIC_FEATURE_AR
            );
        }
    }

    #[test]
    fn test_lhdc_unsupported_version() {
        let info = LhdcInfo {
            version: 0x02,
            ..LhdcInfo::default_config(LhdcRevision::V3)
        };
        assert_eq!(
            encode_offload(info.build().as_bytes(), &CodecConfig::default()),
            Err(OffloadError::UnsupportedVersion(0x02))
        );

        let info = LhdcInfo {
            version: 0x04,
            ..LhdcInfo::default_config(LhdcRevision::V2)
        };
        assert_eq!(
            encode_offload(info.build().as_bytes(), &CodecConfig::default()),
            Err(OffloadError::UnsupportedVersion(0x04))
        );
    }

    #[test]
    fn test_lhdc_v2_lower_version() {
        let info = LhdcInfo {
            version: 0x00,
            ..LhdcInfo::default_config(LhdcRevision::V2)
        };
        let offload = encode_offload(info.build().as_bytes(), &CodecConfig::default()).unwrap();
        assert_eq!(LHDC_VERSION.get(offload.as_bytes()), OFFLOAD_LHDC_VER_V2);

        let info = LhdcInfo {
            version: 0x02,
            ..info
        };
        assert_eq!(
            encode_offload(info.build().as_bytes(), &CodecConfig::default()),
            Err(OffloadError::UnsupportedVersion(0x02))
        );
    }

    #[test]
    fn test_lhdc_unsupported_split_mode() {
        let info = LhdcInfo {
            split_mode: SPLIT_TWS_PLUS,
            ..LhdcInfo::default_config(LhdcRevision::V3)
        };
        assert_eq!(
            encode_offload(info.build().as_bytes(), &CodecConfig::default()),
            Err(OffloadError::UnsupportedSplitMode(SPLIT_TWS_PLUS))
        );

        let info = LhdcInfo {
            split_mode: SPLIT_TWS,
            ..LhdcInfo::default_config(LhdcRevision::V2)
        };
        let offload = encode_offload(info.build().as_bytes(), &CodecConfig::default()).unwrap();
        assert_eq!(
            LHDC_SPECIFIC_2.get(offload.as_bytes()),
            OFFLOAD_LHDC_SPECIFIC_FEATURE_SPLIT
        );
    }

    #[test]
    fn test_lhdc_v2_offload() {
        let config = LhdcInfo::default_config(LhdcRevision::V2).build();
        let offload = encode_offload(config.as_bytes(), &lhdc_config(LhdcQuality::High1)).unwrap();
        let bytes = offload.as_bytes();
        assert_eq!(LHDC_VERSION.get(bytes), OFFLOAD_LHDC_VER_V2);
        assert_eq!(LHDC_BIT_RATE.get(bytes), OFFLOAD_LHDC_QUALITY_HIGH);
        assert_eq!(LHDC_MIN_BIT_RATE.get(bytes), 0);
        assert_eq!(LHDC_SPECIFIC_1.get(bytes), 0);
    }

    #[test]
    fn test_lhdc_v5_offload() {
        let info = LhdcInfo {
            features: LhdcFeatures(LhdcFeatures::JAS | LhdcFeatures::META),
            ar_on: true,
            min_bit_rate: V5_MIN_BIT_RATE_128K,
            ..LhdcInfo::default_config(LhdcRevision::V5)
        };
        let offload =
            encode_offload(info.build().as_bytes(), &lhdc_config(LhdcQuality::High1)).unwrap();
        let bytes = offload.as_bytes();
        assert_eq!(&bytes[..6], &[0x3A, 0x05, 0x00, 0x00, 0x35, 0x4C]);
        assert_eq!(LHDC_VERSION.get(bytes), OFFLOAD_LHDC_VER_V5);
        assert_eq!(LHDC_BIT_RATE.get(bytes), OFFLOAD_LHDC_QUALITY_HIGH1);
        assert_eq!(LHDC_MAX_BIT_RATE.get(bytes), OFFLOAD_LHDC_QUALITY_HIGH1);
        assert_eq!(LHDC_MIN_BIT_RATE.get(bytes), OFFLOAD_LHDC_QUALITY_LOW1);
        assert_eq!(LHDC_FRAME_DURATION.get(bytes), OFFLOAD_LHDC_FRAME_DURATION_5000US);
        assert_eq!(
            LHDC_SPECIFIC_1.get(bytes),
            OFFLOAD_LHDC_SPECIFIC_FEATURE_JAS | OFFLOAD_LHDC_SPECIFIC_FEATURE_META
        );
        assert_eq!(LHDC_SPECIFIC_2.get(bytes), OFFLOAD_LHDC_SPECIFIC_ACTION_AR_ON);
    }

    #[test]
    fn test_lhdc_v5_frame_duration_required() {
        let info = LhdcInfo {
            frame_length: 0,
            ..LhdcInfo::default_config(LhdcRevision::V5)
        };
        assert_eq!(
            encode_offload(info.build().as_bytes(), &CodecConfig::default()),
            Err(OffloadError::UnsupportedFrameDuration(0))
        );
        let info = LhdcInfo {
            frame_length: V5_FRAME_LEN_5MS,
            ..info
        };
        assert!(encode_offload(info.build().as_bytes(), &CodecConfig::default()).is_ok());
    }
}
