//! SBC (Sub-Band Coding) codec
//!
//! SBC is the mandatory A2DP codec. Its information element carries four
//! parameter bytes after the common header:
//!
//! ```text
//! [3] sampling frequency (b7-4) | channel mode (b3-0)
//! [4] block length (b7-4) | subbands (b3-2) | allocation method (b1-0)
//! [5] minimum bitpool
//! [6] maximum bitpool
//! ```

use core::fmt::{self, Write};

use crate::codec_info::{CodecInfo, check_header};
use crate::codecs::negotiate::{
    FieldChoice, Negotiated, Negotiation, check_flags, first_of, select_or_fail, to_common,
};
use crate::config::{BitsPerSample, ChannelMode, CodecConfig, SampleRate};
use crate::constants::{A2DP_MEDIA_CT_SBC, AVDT_CODEC_SIZE};
use crate::layout::{BitField, fits, flags_within};
use crate::{CodecError, Role};

/// Length Of Service Capability of an SBC information element
pub const SBC_INFO_LEN: u8 = 6;

/// Smallest legal bitpool value
pub const SBC_MIN_BITPOOL: u8 = 2;
/// Largest legal bitpool value
pub const SBC_MAX_BITPOOL: u8 = 250;
/// Largest bitpool the local encoder uses (high quality, 328 kbps at 44.1 kHz)
pub const SBC_SOURCE_MAX_BITPOOL: u8 = 53;

const FREQ: BitField = BitField::new(3, 0xF0);
const CHANNEL_MODE: BitField = BitField::new(3, 0x0F);
const BLOCK_LENGTH: BitField = BitField::new(4, 0xF0);
const SUBBANDS: BitField = BitField::new(4, 0x0C);
const ALLOCATION: BitField = BitField::new(4, 0x03);
const MIN_BITPOOL: BitField = BitField::byte(5);
const MAX_BITPOOL: BitField = BitField::byte(6);

const _: () = assert!(fits(
    &[FREQ, CHANNEL_MODE, BLOCK_LENGTH, SUBBANDS, ALLOCATION, MIN_BITPOOL, MAX_BITPOOL],
    AVDT_CODEC_SIZE
));

/// Sampling frequencies in preference order
const SAMPLE_RATES: [(u8, SampleRate); 4] = [
    (SbcInfo::FREQ_48000, SampleRate(SampleRate::HZ_48000)),
    (SbcInfo::FREQ_44100, SampleRate(SampleRate::HZ_44100)),
    (SbcInfo::FREQ_32000, SampleRate(SampleRate::HZ_32000)),
    (SbcInfo::FREQ_16000, SampleRate(SampleRate::HZ_16000)),
];

/// Channel modes in preference order
const CHANNEL_MODES: [(u8, ChannelMode); 4] = [
    (SbcInfo::CH_JOINT_STEREO, ChannelMode(ChannelMode::STEREO)),
    (SbcInfo::CH_STEREO, ChannelMode(ChannelMode::STEREO)),
    (SbcInfo::CH_DUAL, ChannelMode(ChannelMode::STEREO)),
    (SbcInfo::CH_MONO, ChannelMode(ChannelMode::MONO)),
];

const _: () = assert!(flags_within(&SAMPLE_RATES, FREQ.mask));
const _: () = assert!(flags_within(&CHANNEL_MODES, CHANNEL_MODE.mask));

const BLOCK_ORDER: [u8; 4] = [
    SbcInfo::BLOCKS_16,
    SbcInfo::BLOCKS_12,
    SbcInfo::BLOCKS_8,
    SbcInfo::BLOCKS_4,
];
const SUBBAND_ORDER: [u8; 2] = [SbcInfo::SUBBANDS_8, SbcInfo::SUBBANDS_4];
const ALLOCATION_ORDER: [u8; 2] = [SbcInfo::ALLOC_LOUDNESS, SbcInfo::ALLOC_SNR];

/// Decoded SBC information element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SbcInfo {
    /// Sampling frequency flags
    pub sampling_frequency: u8,
    /// Channel mode flags
    pub channel_mode: u8,
    /// Block length flags
    pub block_length: u8,
    /// Subband flags
    pub subbands: u8,
    /// Allocation method flags
    pub allocation_method: u8,
    /// Minimum bitpool
    pub min_bitpool: u8,
    /// Maximum bitpool
    pub max_bitpool: u8,
}

impl SbcInfo {
    /// 16000 Hz
    pub const FREQ_16000: u8 = 0x80;
    /// 32000 Hz
    pub const FREQ_32000: u8 = 0x40;
    /// 44100 Hz
    pub const FREQ_44100: u8 = 0x20;
    /// 48000 Hz
    pub const FREQ_48000: u8 = 0x10;

    /// Mono
    pub const CH_MONO: u8 = 0x08;
    /// Dual channel
    pub const CH_DUAL: u8 = 0x04;
    /// Stereo
    pub const CH_STEREO: u8 = 0x02;
    /// Joint stereo
    pub const CH_JOINT_STEREO: u8 = 0x01;

    /// 4 blocks
    pub const BLOCKS_4: u8 = 0x80;
    /// 8 blocks
    pub const BLOCKS_8: u8 = 0x40;
    /// 12 blocks
    pub const BLOCKS_12: u8 = 0x20;
    /// 16 blocks
    pub const BLOCKS_16: u8 = 0x10;

    /// 4 subbands
    pub const SUBBANDS_4: u8 = 0x08;
    /// 8 subbands
    pub const SUBBANDS_8: u8 = 0x04;

    /// SNR allocation
    pub const ALLOC_SNR: u8 = 0x02;
    /// Loudness allocation
    pub const ALLOC_LOUDNESS: u8 = 0x01;

    /// Local source capabilities
    pub const SOURCE_CAPS: Self = Self {
        sampling_frequency: Self::FREQ_44100,
        channel_mode: Self::CH_MONO | Self::CH_DUAL | Self::CH_STEREO | Self::CH_JOINT_STEREO,
        block_length: Self::BLOCKS_4 | Self::BLOCKS_8 | Self::BLOCKS_12 | Self::BLOCKS_16,
        subbands: Self::SUBBANDS_4 | Self::SUBBANDS_8,
        allocation_method: Self::ALLOC_LOUDNESS,
        min_bitpool: SBC_MIN_BITPOOL,
        max_bitpool: SBC_SOURCE_MAX_BITPOOL,
    };

    /// Local sink capabilities
    pub const SINK_CAPS: Self = Self {
        sampling_frequency: Self::FREQ_44100 | Self::FREQ_48000,
        channel_mode: Self::CH_MONO | Self::CH_DUAL | Self::CH_STEREO | Self::CH_JOINT_STEREO,
        block_length: Self::BLOCKS_4 | Self::BLOCKS_8 | Self::BLOCKS_12 | Self::BLOCKS_16,
        subbands: Self::SUBBANDS_4 | Self::SUBBANDS_8,
        allocation_method: Self::ALLOC_LOUDNESS | Self::ALLOC_SNR,
        min_bitpool: SBC_MIN_BITPOOL,
        max_bitpool: SBC_MAX_BITPOOL,
    };

    /// Default configuration (44.1 kHz joint stereo, 16 blocks, 8 subbands, loudness)
    pub const DEFAULT_CONFIG: Self = Self {
        sampling_frequency: Self::FREQ_44100,
        channel_mode: Self::CH_JOINT_STEREO,
        block_length: Self::BLOCKS_16,
        subbands: Self::SUBBANDS_8,
        allocation_method: Self::ALLOC_LOUDNESS,
        min_bitpool: SBC_MIN_BITPOOL,
        max_bitpool: SBC_SOURCE_MAX_BITPOOL,
    };

    /// Local capabilities for a role
    #[must_use]
    pub const fn caps(role: Role) -> Self {
        match role {
            Role::Source => Self::SOURCE_CAPS,
            Role::Sink => Self::SINK_CAPS,
        }
    }

    /// Decode an SBC information element
    ///
    /// A configuration must carry exactly one flag per field, a capability at
    /// least one.
    ///
    /// # Errors
    /// Returns `InvalidCodecInfo` on a header mismatch, malformed flags or an
    /// out-of-range bitpool.
    pub fn parse(info: &[u8], is_capability: bool) -> Result<Self, CodecError> {
        check_header(info, SBC_INFO_LEN, A2DP_MEDIA_CT_SBC)?;

        let parsed = Self {
            sampling_frequency: check_flags(FREQ.get(info), is_capability)?,
            channel_mode: check_flags(CHANNEL_MODE.get(info), is_capability)?,
            block_length: check_flags(BLOCK_LENGTH.get(info), is_capability)?,
            subbands: check_flags(SUBBANDS.get(info), is_capability)?,
            allocation_method: check_flags(ALLOCATION.get(info), is_capability)?,
            min_bitpool: MIN_BITPOOL.get(info),
            max_bitpool: MAX_BITPOOL.get(info),
        };

        if parsed.min_bitpool < SBC_MIN_BITPOOL
            || parsed.max_bitpool > SBC_MAX_BITPOOL
            || parsed.min_bitpool > parsed.max_bitpool
        {
            return Err(CodecError::InvalidCodecInfo);
        }
        Ok(parsed)
    }

    /// Encode as an information element
    #[must_use]
    pub fn build(&self) -> CodecInfo {
        let mut info = CodecInfo::with_header(SBC_INFO_LEN, A2DP_MEDIA_CT_SBC);
        let buf = info.as_bytes_mut();
        FREQ.set(buf, self.sampling_frequency);
        CHANNEL_MODE.set(buf, self.channel_mode);
        BLOCK_LENGTH.set(buf, self.block_length);
        SUBBANDS.set(buf, self.subbands);
        ALLOCATION.set(buf, self.allocation_method);
        MIN_BITPOOL.set(buf, self.min_bitpool);
        MAX_BITPOOL.set(buf, self.max_bitpool);
        info
    }

    /// Check if every field shares at least one flag with `caps`
    #[must_use]
    pub const fn matches(&self, caps: &Self) -> bool {
        (self.sampling_frequency & caps.sampling_frequency) != 0
            && (self.channel_mode & caps.channel_mode) != 0
            && (self.block_length & caps.block_length) != 0
            && (self.subbands & caps.subbands) != 0
            && (self.allocation_method & caps.allocation_method) != 0
    }

    /// Sample rate in Hz
    #[must_use]
    pub const fn sample_rate(&self) -> Option<u32> {
        match self.sampling_frequency {
            Self::FREQ_16000 => Some(16000),
            Self::FREQ_32000 => Some(32000),
            Self::FREQ_44100 => Some(44100),
            Self::FREQ_48000 => Some(48000),
            _ => None,
        }
    }

    /// Number of audio channels
    #[must_use]
    pub const fn channel_count(&self) -> Option<u8> {
        match self.channel_mode {
            Self::CH_MONO => Some(1),
            Self::CH_DUAL | Self::CH_STEREO | Self::CH_JOINT_STEREO => Some(2),
            _ => None,
        }
    }

    /// Number of blocks per frame
    #[must_use]
    pub const fn blocks(&self) -> Option<u8> {
        match self.block_length {
            Self::BLOCKS_4 => Some(4),
            Self::BLOCKS_8 => Some(8),
            Self::BLOCKS_12 => Some(12),
            Self::BLOCKS_16 => Some(16),
            _ => None,
        }
    }

    /// Number of subbands
    #[must_use]
    pub const fn subband_count(&self) -> Option<u8> {
        match self.subbands {
            Self::SUBBANDS_4 => Some(4),
            Self::SUBBANDS_8 => Some(8),
            _ => None,
        }
    }

    /// Encoded frame length in bytes at the maximum bitpool
    #[must_use]
    pub fn frame_length(&self) -> Option<usize> {
        let subbands = usize::from(self.subband_count()?);
        let blocks = usize::from(self.blocks()?);
        let channels = usize::from(self.channel_count()?);
        let bitpool = usize::from(self.max_bitpool);

        let header = 4 + (4 * subbands * channels) / 8;
        let payload_bits = match self.channel_mode {
            Self::CH_MONO | Self::CH_DUAL => blocks * channels * bitpool,
            Self::CH_STEREO => blocks * bitpool,
            _ => subbands + blocks * bitpool,
        };
        Some(header + payload_bits.div_ceil(8))
    }

    /// Encoded bit rate in bits per second
    #[must_use]
    pub fn bit_rate(&self) -> Option<u32> {
        let frame_length = u32::try_from(self.frame_length()?).ok()?;
        let samples = u32::from(self.subband_count()?) * u32::from(self.blocks()?);
        Some(8 * frame_length * self.sample_rate()? / samples)
    }

    /// Sink track channel type (1 = mono, 3 = stereo)
    #[must_use]
    pub const fn sink_channel_type(&self) -> Option<u8> {
        match self.channel_mode {
            Self::CH_MONO => Some(1),
            Self::CH_DUAL | Self::CH_STEREO | Self::CH_JOINT_STEREO => Some(3),
            _ => None,
        }
    }

    /// Write a multi-line description
    ///
    /// # Errors
    /// Propagates writer errors.
    pub fn describe(&self, f: &mut impl Write) -> fmt::Result {
        writeln!(f, "\tname: SBC")?;
        writeln!(f, "\tsamp_freq: 0x{:02X}", self.sampling_frequency)?;
        writeln!(f, "\tch_mode: 0x{:02X}", self.channel_mode)?;
        writeln!(f, "\tblock_len: 0x{:02X}", self.block_length)?;
        writeln!(f, "\tnum_subbands: 0x{:02X}", self.subbands)?;
        writeln!(f, "\talloc_method: 0x{:02X}", self.allocation_method)?;
        write!(f, "\tBit pool Min:{} Max:{}", self.min_bitpool, self.max_bitpool)
    }
}

/// Capability snapshot of a local capability element
#[must_use]
pub fn local_capability(caps: &SbcInfo) -> CodecConfig {
    CodecConfig {
        sample_rate: to_common(&SAMPLE_RATES, caps.sampling_frequency),
        bits_per_sample: BitsPerSample(BitsPerSample::BITS_16),
        channel_mode: to_common(&CHANNEL_MODES, caps.channel_mode),
        ..CodecConfig::default()
    }
}

/// Negotiate an SBC configuration against a peer capability or configuration
///
/// # Errors
/// Returns `InvalidCodecInfo` if the peer buffer is malformed and
/// `NoCommonConfig` if the two sides share no configuration.
pub fn negotiate(
    local: &SbcInfo,
    peer_info: &[u8],
    ctx: &Negotiation<'_>,
) -> Result<Negotiated, CodecError> {
    let peer = SbcInfo::parse(peer_info, ctx.is_capability)?;

    let rates = FieldChoice::new(&SAMPLE_RATES, local.sampling_frequency, peer.sampling_frequency);
    let (freq, sample_rate) = select_or_fail(
        &rates,
        ctx.user.sample_rate,
        ctx.audio.sample_rate,
        SbcInfo::DEFAULT_CONFIG.sampling_frequency,
    )?;

    let modes = FieldChoice::new(&CHANNEL_MODES, local.channel_mode, peer.channel_mode);
    let (channel_mode_flag, channel_mode) = select_or_fail(
        &modes,
        ctx.user.channel_mode,
        ctx.audio.channel_mode,
        SbcInfo::DEFAULT_CONFIG.channel_mode,
    )?;

    let block_length = first_of(local.block_length & peer.block_length, &BLOCK_ORDER)
        .ok_or(CodecError::NoCommonConfig)?;
    let subbands =
        first_of(local.subbands & peer.subbands, &SUBBAND_ORDER).ok_or(CodecError::NoCommonConfig)?;
    let allocation_method = first_of(
        local.allocation_method & peer.allocation_method,
        &ALLOCATION_ORDER,
    )
    .ok_or(CodecError::NoCommonConfig)?;

    let min_bitpool = local.min_bitpool.max(peer.min_bitpool);
    let max_bitpool = local.max_bitpool.min(peer.max_bitpool);
    if min_bitpool > max_bitpool {
        warn!(
            "[SBC] No common bitpool range: {}..{}",
            min_bitpool,
            max_bitpool
        );
        return Err(CodecError::NoCommonConfig);
    }

    let result = SbcInfo {
        sampling_frequency: freq,
        channel_mode: channel_mode_flag,
        block_length,
        subbands,
        allocation_method,
        min_bitpool,
        max_bitpool,
    };

    let bits = BitsPerSample(BitsPerSample::BITS_16);
    let capability = CodecConfig {
        sample_rate: rates.capability(),
        bits_per_sample: bits,
        channel_mode: modes.capability(),
        ..CodecConfig::default()
    };

    Ok(Negotiated {
        ota_config: result.build(),
        config: CodecConfig {
            sample_rate,
            bits_per_sample: bits,
            channel_mode,
            ..CodecConfig::default()
        },
        capability,
        selectable: capability,
    })
}

/// Clamp the maximum bitpool of a configuration to what the local encoder uses
///
/// Returns `false` if the buffer is not a valid SBC configuration.
pub fn adjust(info: &mut CodecInfo) -> bool {
    let Ok(mut config) = SbcInfo::parse(info.as_bytes(), false) else {
        return false;
    };
    if config.max_bitpool > SBC_SOURCE_MAX_BITPOOL {
        config.max_bitpool = SBC_SOURCE_MAX_BITPOOL;
        config.min_bitpool = config.min_bitpool.min(SBC_SOURCE_MAX_BITPOOL);
        *info = config.build();
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer_caps() -> CodecInfo {
        SbcInfo::SINK_CAPS.build()
    }

    #[test]
    fn test_sbc_default_config_encoding() {
        let info = SbcInfo::DEFAULT_CONFIG.build();
        assert_eq!(
            &info.as_bytes()[..7],
            &[0x06, 0x00, 0x00, 0x21, 0x15, 0x02, 0x35]
        );
        assert_eq!(SbcInfo::parse(info.as_bytes(), false), Ok(SbcInfo::DEFAULT_CONFIG));
    }

    #[test]
    fn test_sbc_parse_rejects_multiple_flags_in_config() {
        let caps = SbcInfo::SOURCE_CAPS.build();
        assert!(SbcInfo::parse(caps.as_bytes(), true).is_ok());
        assert_eq!(
            SbcInfo::parse(caps.as_bytes(), false),
            Err(CodecError::InvalidCodecInfo)
        );
    }

    #[test]
    fn test_sbc_parse_rejects_bad_bitpool() {
        let mut config = SbcInfo::DEFAULT_CONFIG;
        config.min_bitpool = 60;
        assert!(SbcInfo::parse(config.build().as_bytes(), false).is_err());

        config.min_bitpool = 1;
        assert!(SbcInfo::parse(config.build().as_bytes(), false).is_err());
    }

    #[test]
    fn test_sbc_negotiate_defaults() {
        let empty = CodecConfig::default();
        let ctx = Negotiation::plain(&empty, true);
        let result = negotiate(&SbcInfo::SOURCE_CAPS, peer_caps().as_bytes(), &ctx).unwrap();

        assert_eq!(
            SbcInfo::parse(result.ota_config.as_bytes(), false),
            Ok(SbcInfo::DEFAULT_CONFIG)
        );
        assert_eq!(result.config.sample_rate, SampleRate(SampleRate::HZ_44100));
        assert_eq!(result.config.channel_mode, ChannelMode(ChannelMode::STEREO));
        assert_eq!(
            result.capability.channel_mode,
            ChannelMode(ChannelMode::MONO | ChannelMode::STEREO)
        );
    }

    #[test]
    fn test_sbc_negotiate_user_mono() {
        let empty = CodecConfig::default();
        let user = CodecConfig {
            channel_mode: ChannelMode(ChannelMode::MONO),
            ..CodecConfig::default()
        };
        let ctx = Negotiation {
            user: &user,
            ..Negotiation::plain(&empty, true)
        };
        let result = negotiate(&SbcInfo::SOURCE_CAPS, peer_caps().as_bytes(), &ctx).unwrap();
        let parsed = SbcInfo::parse(result.ota_config.as_bytes(), false).unwrap();
        assert_eq!(parsed.channel_mode, SbcInfo::CH_MONO);
        assert_eq!(result.config.channel_mode, ChannelMode(ChannelMode::MONO));
    }

    #[test]
    fn test_sbc_negotiate_no_common_rate() {
        let mut peer = SbcInfo::SINK_CAPS;
        peer.sampling_frequency = SbcInfo::FREQ_48000;
        let empty = CodecConfig::default();
        let ctx = Negotiation::plain(&empty, true);
        assert_eq!(
            negotiate(&SbcInfo::SOURCE_CAPS, peer.build().as_bytes(), &ctx),
            Err(CodecError::NoCommonConfig)
        );
        // The sink side accepts 48 kHz
        assert!(negotiate(&SbcInfo::SINK_CAPS, peer.build().as_bytes(), &ctx).is_ok());
    }

    #[test]
    fn test_sbc_negotiate_bitpool_intersection() {
        let mut peer = SbcInfo::SINK_CAPS;
        peer.min_bitpool = 10;
        peer.max_bitpool = 35;
        let empty = CodecConfig::default();
        let ctx = Negotiation::plain(&empty, true);
        let result = negotiate(&SbcInfo::SOURCE_CAPS, peer.build().as_bytes(), &ctx).unwrap();
        let parsed = SbcInfo::parse(result.ota_config.as_bytes(), false).unwrap();
        assert_eq!((parsed.min_bitpool, parsed.max_bitpool), (10, 35));

        peer.min_bitpool = 54;
        peer.max_bitpool = 250;
        assert_eq!(
            negotiate(&SbcInfo::SOURCE_CAPS, peer.build().as_bytes(), &ctx),
            Err(CodecError::NoCommonConfig)
        );
    }

    #[test]
    fn test_sbc_frame_length_and_bit_rate() {
        // 44.1 kHz joint stereo, 16 blocks, 8 subbands, bitpool 53
        let config = SbcInfo::DEFAULT_CONFIG;
        assert_eq!(config.frame_length(), Some(119));
        assert_eq!(config.bit_rate(), Some(327_993));
    }

    #[test]
    fn test_sbc_adjust_clamps_bitpool() {
        let mut config = SbcInfo::DEFAULT_CONFIG;
        config.max_bitpool = 64;
        let mut info = config.build();
        assert!(adjust(&mut info));
        assert_eq!(SbcInfo::parse(info.as_bytes(), false).unwrap().max_bitpool, 53);

        let mut invalid = CodecInfo::new();
        assert!(!adjust(&mut invalid));
    }
}
