//! MPEG-2/4 AAC codec
//!
//! ```text
//! [3]     object type
//! [4..6]  sampling frequency (12 bits, big-endian) | channels (b3-2 of [5])
//! [6]     VBR (b7) | bit rate (b22-16)
//! [7..9]  bit rate (b15-0, big-endian)
//! ```

use core::fmt::{self, Write};

use crate::codec_info::{CodecInfo, check_header};
use crate::codecs::negotiate::{
    FieldChoice, Negotiated, Negotiation, check_flags, first_of, select_or_fail, to_common,
};
use crate::config::{BitsPerSample, ChannelMode, CodecConfig, SampleRate};
use crate::constants::{A2DP_MEDIA_CT_AAC, AVDT_CODEC_SIZE};
use crate::layout::{BitField, fits, flags_within};
use crate::{CodecError, Role};

/// Length Of Service Capability of an AAC information element
pub const AAC_INFO_LEN: u8 = 8;

/// Bit rate advertised by the local encoder
pub const AAC_DEFAULT_BIT_RATE: u32 = 320_000;

/// RTP media header plus LATM framing carried in every media packet
pub const AAC_PACKET_OVERHEAD: u32 = 16;

/// Samples per AAC frame
const AAC_FRAME_SAMPLES: u32 = 1024;

const OBJECT_TYPE: BitField = BitField::byte(3);
const FREQ_HIGH: BitField = BitField::byte(4);
const FREQ_LOW: BitField = BitField::new(5, 0xF0);
const CHANNELS: BitField = BitField::new(5, 0x0C);
const VBR: BitField = BitField::new(6, 0x80);
const BIT_RATE_HIGH: BitField = BitField::new(6, 0x7F);
const BIT_RATE_MID: BitField = BitField::byte(7);
const BIT_RATE_LOW: BitField = BitField::byte(8);

const _: () = assert!(fits(
    &[
        OBJECT_TYPE,
        FREQ_HIGH,
        FREQ_LOW,
        CHANNELS,
        VBR,
        BIT_RATE_HIGH,
        BIT_RATE_MID,
        BIT_RATE_LOW
    ],
    AVDT_CODEC_SIZE
));

// Negotiation works on a compact one-byte code: 44.1 kHz in bit 0, the
// upper nibble of octet 5 (48/64/88.2/96 kHz) in place.
const RATE_CODE_44100: u8 = 0x01;

/// Sample rates in preference order (compact code)
const SAMPLE_RATES: [(u8, SampleRate); 4] = [
    (0x80, SampleRate(SampleRate::HZ_48000)),
    (RATE_CODE_44100, SampleRate(SampleRate::HZ_44100)),
    (0x20, SampleRate(SampleRate::HZ_88200)),
    (0x10, SampleRate(SampleRate::HZ_96000)),
];

/// Channel modes in preference order
const CHANNEL_MODES: [(u8, ChannelMode); 2] = [
    (AacInfo::CH_STEREO, ChannelMode(ChannelMode::STEREO)),
    (AacInfo::CH_MONO, ChannelMode(ChannelMode::MONO)),
];

const _: () = assert!(flags_within(&SAMPLE_RATES, 0xF1));
const _: () = assert!(flags_within(&CHANNEL_MODES, CHANNELS.mask));

const OBJECT_TYPE_ORDER: [u8; 4] = [
    AacInfo::OBJ_MPEG2_LC,
    AacInfo::OBJ_MPEG4_LC,
    AacInfo::OBJ_MPEG4_LTP,
    AacInfo::OBJ_MPEG4_SCALABLE,
];

/// Decoded AAC information element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AacInfo {
    /// Object type flags
    pub object_type: u8,
    /// Sampling frequency flags (12 bits)
    pub sampling_frequency: u16,
    /// Channel flags
    pub channels: u8,
    /// Variable bit rate
    pub vbr: bool,
    /// Bit rate in bits per second (0 = unspecified)
    pub bit_rate: u32,
}

impl AacInfo {
    /// MPEG-2 AAC LC
    pub const OBJ_MPEG2_LC: u8 = 0x80;
    /// MPEG-4 AAC LC
    pub const OBJ_MPEG4_LC: u8 = 0x40;
    /// MPEG-4 AAC LTP
    pub const OBJ_MPEG4_LTP: u8 = 0x20;
    /// MPEG-4 AAC scalable
    pub const OBJ_MPEG4_SCALABLE: u8 = 0x10;

    /// 8000 Hz
    pub const FREQ_8000: u16 = 0x8000;
    /// 11025 Hz
    pub const FREQ_11025: u16 = 0x4000;
    /// 12000 Hz
    pub const FREQ_12000: u16 = 0x2000;
    /// 16000 Hz
    pub const FREQ_16000: u16 = 0x1000;
    /// 22050 Hz
    pub const FREQ_22050: u16 = 0x0800;
    /// 24000 Hz
    pub const FREQ_24000: u16 = 0x0400;
    /// 32000 Hz
    pub const FREQ_32000: u16 = 0x0200;
    /// 44100 Hz
    pub const FREQ_44100: u16 = 0x0100;
    /// 48000 Hz
    pub const FREQ_48000: u16 = 0x0080;
    /// 64000 Hz
    pub const FREQ_64000: u16 = 0x0040;
    /// 88200 Hz
    pub const FREQ_88200: u16 = 0x0020;
    /// 96000 Hz
    pub const FREQ_96000: u16 = 0x0010;

    /// Mono
    pub const CH_MONO: u8 = 0x08;
    /// Stereo
    pub const CH_STEREO: u8 = 0x04;

    const FREQUENCIES: [(u16, u32); 12] = [
        (Self::FREQ_8000, 8000),
        (Self::FREQ_11025, 11025),
        (Self::FREQ_12000, 12000),
        (Self::FREQ_16000, 16000),
        (Self::FREQ_22050, 22050),
        (Self::FREQ_24000, 24000),
        (Self::FREQ_32000, 32000),
        (Self::FREQ_44100, 44100),
        (Self::FREQ_48000, 48000),
        (Self::FREQ_64000, 64000),
        (Self::FREQ_88200, 88200),
        (Self::FREQ_96000, 96000),
    ];

    /// Local source capabilities
    pub const SOURCE_CAPS: Self = Self {
        object_type: Self::OBJ_MPEG2_LC,
        sampling_frequency: Self::FREQ_44100 | Self::FREQ_48000,
        channels: Self::CH_STEREO,
        vbr: false,
        bit_rate: AAC_DEFAULT_BIT_RATE,
    };

    /// Local sink capabilities
    pub const SINK_CAPS: Self = Self {
        object_type: Self::OBJ_MPEG2_LC | Self::OBJ_MPEG4_LC,
        sampling_frequency: Self::FREQ_44100 | Self::FREQ_48000,
        channels: Self::CH_MONO | Self::CH_STEREO,
        vbr: true,
        bit_rate: 0,
    };

    /// Default configuration (MPEG-2 LC, 44.1 kHz stereo)
    pub const DEFAULT_CONFIG: Self = Self {
        object_type: Self::OBJ_MPEG2_LC,
        sampling_frequency: Self::FREQ_44100,
        channels: Self::CH_STEREO,
        vbr: false,
        bit_rate: AAC_DEFAULT_BIT_RATE,
    };

    /// Local capabilities for a role
    #[must_use]
    pub const fn caps(role: Role, vbr_enabled: bool) -> Self {
        match role {
            Role::Source => {
                let mut caps = Self::SOURCE_CAPS;
                caps.vbr = vbr_enabled;
                caps
            }
            Role::Sink => Self::SINK_CAPS,
        }
    }

    /// Decode an AAC information element
    ///
    /// # Errors
    /// Returns `InvalidCodecInfo` on a header mismatch or malformed flags.
    pub fn parse(info: &[u8], is_capability: bool) -> Result<Self, CodecError> {
        check_header(info, AAC_INFO_LEN, A2DP_MEDIA_CT_AAC)?;

        let sampling_frequency =
            (u16::from(FREQ_HIGH.get(info)) << 8) | u16::from(FREQ_LOW.get(info));
        let valid_frequency = if is_capability {
            sampling_frequency != 0
        } else {
            sampling_frequency.count_ones() == 1
        };
        if !valid_frequency {
            return Err(CodecError::InvalidCodecInfo);
        }

        Ok(Self {
            object_type: check_flags(OBJECT_TYPE.get(info), is_capability)?,
            sampling_frequency,
            channels: check_flags(CHANNELS.get(info), is_capability)?,
            vbr: VBR.get(info) != 0,
            bit_rate: (u32::from(BIT_RATE_HIGH.get(info)) << 16)
                | (u32::from(BIT_RATE_MID.get(info)) << 8)
                | u32::from(BIT_RATE_LOW.get(info)),
        })
    }

    /// Encode as an information element
    #[must_use]
    pub fn build(&self) -> CodecInfo {
        let mut info = CodecInfo::with_header(AAC_INFO_LEN, A2DP_MEDIA_CT_AAC);
        let buf = info.as_bytes_mut();
        let [freq_high, freq_low] = self.sampling_frequency.to_be_bytes();
        let [_, rate_high, rate_mid, rate_low] = self.bit_rate.to_be_bytes();
        OBJECT_TYPE.set(buf, self.object_type);
        FREQ_HIGH.set(buf, freq_high);
        FREQ_LOW.set(buf, freq_low);
        CHANNELS.set(buf, self.channels);
        VBR.set(buf, if self.vbr { 0x80 } else { 0 });
        BIT_RATE_HIGH.set(buf, rate_high);
        BIT_RATE_MID.set(buf, rate_mid);
        BIT_RATE_LOW.set(buf, rate_low);
        info
    }

    /// Check if every field shares at least one flag with `caps`
    #[must_use]
    pub const fn matches(&self, caps: &Self) -> bool {
        (self.object_type & caps.object_type) != 0
            && (self.sampling_frequency & caps.sampling_frequency) != 0
            && (self.channels & caps.channels) != 0
    }

    /// Sample rate in Hz
    #[must_use]
    pub fn sample_rate(&self) -> Option<u32> {
        Self::FREQUENCIES
            .iter()
            .find(|(flag, _)| *flag == self.sampling_frequency)
            .map(|(_, hz)| *hz)
    }

    /// Number of audio channels
    #[must_use]
    pub const fn channel_count(&self) -> Option<u8> {
        match self.channels {
            Self::CH_MONO => Some(1),
            Self::CH_STEREO => Some(2),
            _ => None,
        }
    }

    /// Sink track channel type (1 = mono, 3 = stereo)
    #[must_use]
    pub const fn sink_channel_type(&self) -> Option<u8> {
        match self.channels {
            Self::CH_MONO => Some(1),
            Self::CH_STEREO => Some(3),
            _ => None,
        }
    }

    /// Write a multi-line description
    ///
    /// # Errors
    /// Propagates writer errors.
    pub fn describe(&self, f: &mut impl Write) -> fmt::Result {
        writeln!(f, "\tname: AAC")?;
        writeln!(f, "\tobjectType: 0x{:02X}", self.object_type)?;
        writeln!(f, "\tsamp_freq: 0x{:04X}", self.sampling_frequency)?;
        writeln!(f, "\tch_mode: 0x{:02X}", self.channels)?;
        writeln!(f, "\tvariableBitRateSupport: {}", self.vbr)?;
        write!(f, "\tbitRate: {}", self.bit_rate)
    }
}

const fn rate_code(frequency: u16) -> u8 {
    let [high, low] = frequency.to_be_bytes();
    (high & RATE_CODE_44100) | (low & 0xF0)
}

const fn rate_flag(code: u8) -> u16 {
    (((code & RATE_CODE_44100) as u16) << 8) | ((code & 0xF0) as u16)
}

/// Highest bit rate a peer MTU can carry at a sample rate
#[must_use]
pub fn max_bit_rate_for_mtu(peer_mtu: u16, sample_rate: u32) -> Option<u32> {
    let payload = u32::from(peer_mtu).checked_sub(AAC_PACKET_OVERHEAD)?;
    Some(payload * 8 * sample_rate / AAC_FRAME_SAMPLES)
}

/// Capability snapshot of a local capability element
#[must_use]
pub fn local_capability(caps: &AacInfo) -> CodecConfig {
    CodecConfig {
        sample_rate: to_common(&SAMPLE_RATES, rate_code(caps.sampling_frequency)),
        bits_per_sample: BitsPerSample(BitsPerSample::BITS_16),
        channel_mode: to_common(&CHANNEL_MODES, caps.channels),
        ..CodecConfig::default()
    }
}

/// Negotiate an AAC configuration against a peer capability or configuration
///
/// The bit rate is the lower of both sides and, when the peer MTU is known,
/// capped to what one media packet per frame can carry.
///
/// # Errors
/// Returns `InvalidCodecInfo` if the peer buffer is malformed and
/// `NoCommonConfig` if the two sides share no configuration.
pub fn negotiate(
    local: &AacInfo,
    peer_info: &[u8],
    ctx: &Negotiation<'_>,
) -> Result<Negotiated, CodecError> {
    let peer = AacInfo::parse(peer_info, ctx.is_capability)?;

    let object_type = first_of(local.object_type & peer.object_type, &OBJECT_TYPE_ORDER)
        .ok_or(CodecError::NoCommonConfig)?;

    let rates = FieldChoice::new(
        &SAMPLE_RATES,
        rate_code(local.sampling_frequency),
        rate_code(peer.sampling_frequency),
    );
    let (rate, sample_rate) = select_or_fail(
        &rates,
        ctx.user.sample_rate,
        ctx.audio.sample_rate,
        rate_code(AacInfo::DEFAULT_CONFIG.sampling_frequency),
    )?;

    let modes = FieldChoice::new(&CHANNEL_MODES, local.channels, peer.channels);
    let (channels, channel_mode) = select_or_fail(
        &modes,
        ctx.user.channel_mode,
        ctx.audio.channel_mode,
        AacInfo::DEFAULT_CONFIG.channels,
    )?;

    let mut bit_rate = match (local.bit_rate, peer.bit_rate) {
        (0, peer_rate) => peer_rate,
        (local_rate, 0) => local_rate,
        (local_rate, peer_rate) => local_rate.min(peer_rate),
    };
    let mtu_cap = sample_rate
        .hz()
        .and_then(|hz| max_bit_rate_for_mtu(ctx.peer_params.peer_mtu, hz));
    if let Some(cap) = mtu_cap.filter(|cap| bit_rate > *cap) {
        debug!(
            "[AAC] Bit rate {} capped to {} by peer MTU {}",
            bit_rate,
            cap,
            ctx.peer_params.peer_mtu
        );
        bit_rate = cap;
    }

    let result = AacInfo {
        object_type,
        sampling_frequency: rate_flag(rate),
        channels,
        vbr: local.vbr && peer.vbr,
        bit_rate,
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PeerParams;

    #[test]
    fn test_aac_encoding() {
        let info = AacInfo::DEFAULT_CONFIG.build();
        assert_eq!(
            &info.as_bytes()[..9],
            &[0x08, 0x00, 0x02, 0x80, 0x01, 0x04, 0x04, 0xE2, 0x00]
        );
        assert_eq!(AacInfo::parse(info.as_bytes(), false), Ok(AacInfo::DEFAULT_CONFIG));
    }

    #[test]
    fn test_aac_vbr_and_bit_rate_share_octet() {
        let mut config = AacInfo::DEFAULT_CONFIG;
        config.vbr = true;
        config.bit_rate = 0x7F_FFFF;
        let info = config.build();
        assert_eq!(info.as_bytes()[6], 0xFF);
        let parsed = AacInfo::parse(info.as_bytes(), false).unwrap();
        assert!(parsed.vbr);
        assert_eq!(parsed.bit_rate, 0x7F_FFFF);
    }

    #[test]
    fn test_aac_parse_rejects_multiple_rates_in_config() {
        let caps = AacInfo::SOURCE_CAPS.build();
        assert!(AacInfo::parse(caps.as_bytes(), true).is_ok());
        assert!(AacInfo::parse(caps.as_bytes(), false).is_err());
    }

    #[test]
    fn test_aac_negotiate_defaults() {
        let empty = CodecConfig::default();
        let ctx = Negotiation::plain(&empty, true);
        let result = negotiate(&AacInfo::SOURCE_CAPS, AacInfo::SINK_CAPS.build().as_bytes(), &ctx)
            .unwrap();
        let parsed = AacInfo::parse(result.ota_config.as_bytes(), false).unwrap();
        assert_eq!(parsed.object_type, AacInfo::OBJ_MPEG2_LC);
        assert_eq!(parsed.sampling_frequency, AacInfo::FREQ_44100);
        assert_eq!(parsed.channels, AacInfo::CH_STEREO);
        assert!(!parsed.vbr);
        assert_eq!(parsed.bit_rate, AAC_DEFAULT_BIT_RATE);
        assert_eq!(
            result.capability.sample_rate,
            SampleRate(SampleRate::HZ_44100 | SampleRate::HZ_48000)
        );
    }

    #[test]
    fn test_aac_negotiate_user_rate_and_mtu_cap() {
        let empty = CodecConfig::default();
        let user = CodecConfig {
            sample_rate: SampleRate(SampleRate::HZ_48000),
            ..CodecConfig::default()
        };
        let ctx = Negotiation {
            user: &user,
            audio: &empty,
            peer_params: PeerParams::with_mtu(679),
            is_capability: true,
        };
        let result = negotiate(&AacInfo::SOURCE_CAPS, AacInfo::SINK_CAPS.build().as_bytes(), &ctx)
            .unwrap();
        let parsed = AacInfo::parse(result.ota_config.as_bytes(), false).unwrap();
        assert_eq!(parsed.sampling_frequency, AacInfo::FREQ_48000);
        // (679 - 16) * 8 * 48000 / 1024
        assert_eq!(parsed.bit_rate, 248_625);
    }

    #[test]
    fn test_aac_negotiate_vbr_needs_both_sides() {
        let empty = CodecConfig::default();
        let ctx = Negotiation::plain(&empty, true);
        let local = AacInfo::caps(Role::Source, true);
        let result = negotiate(&local, AacInfo::SINK_CAPS.build().as_bytes(), &ctx).unwrap();
        assert!(AacInfo::parse(result.ota_config.as_bytes(), false).unwrap().vbr);

        let mut peer = AacInfo::SINK_CAPS;
        peer.vbr = false;
        let result = negotiate(&local, peer.build().as_bytes(), &ctx).unwrap();
        assert!(!AacInfo::parse(result.ota_config.as_bytes(), false).unwrap().vbr);
    }

    #[test]
    fn test_aac_negotiate_no_common_object_type() {
        let mut peer = AacInfo::SINK_CAPS;
        peer.object_type = AacInfo::OBJ_MPEG4_LTP;
        let empty = CodecConfig::default();
        let ctx = Negotiation::plain(&empty, true);
        assert_eq!(
            negotiate(&AacInfo::SOURCE_CAPS, peer.build().as_bytes(), &ctx),
            Err(CodecError::NoCommonConfig)
        );
    }

    #[test]
    fn test_aac_rate_code_mapping() {
        assert_eq!(rate_code(AacInfo::FREQ_44100), 0x01);
        assert_eq!(rate_code(AacInfo::FREQ_48000 | AacInfo::FREQ_96000), 0x90);
        assert_eq!(rate_flag(0x01), AacInfo::FREQ_44100);
        assert_eq!(rate_flag(0x20), AacInfo::FREQ_88200);
    }
}
