//! Codec configuration records and registry options
//!
//! [`CodecConfig`] is the fixed-shape snapshot record every codec descriptor
//! keeps several copies of (negotiated config, capabilities, user and audio
//! overrides). The audio format fields are bitfields: a capability may carry
//! several flags, a selected configuration carries exactly one.

use core::fmt::{self, Write};

use heapless::{FnvIndexMap, String};

use crate::CodecIndex;
use crate::constants::{MAX_CODECS, MAX_OFFLOAD_CAPABILITY_LENGTH};

/// Common behaviour of the audio format bitfields
pub trait FlagSet: Copy + PartialEq {
    /// Raw flag bits
    fn bits(self) -> u32;

    /// Build from raw flag bits
    fn from_bits(bits: u32) -> Self;

    /// Check if no flag is set
    fn is_none(self) -> bool {
        self.bits() == 0
    }

    /// Union of two flag sets
    #[must_use]
    fn union(self, other: Self) -> Self {
        Self::from_bits(self.bits() | other.bits())
    }
}

/// Codec priority
///
/// Larger values are preferred. [`CodecPriority::DEFAULT`] asks the descriptor
/// to recompute its default priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CodecPriority(pub i32);

impl CodecPriority {
    /// Codec is disabled and excluded from negotiation
    pub const DISABLED: Self = Self(-1);
    /// Use the default priority
    pub const DEFAULT: Self = Self(0);
    /// Highest priority
    pub const HIGHEST: Self = Self(1_000_000);

    /// Check if this priority disables the codec
    #[must_use]
    pub const fn is_disabled(self) -> bool {
        self.0 == Self::DISABLED.0
    }

    /// Check if this is the "use default" sentinel
    #[must_use]
    pub const fn is_default(self) -> bool {
        self.0 == Self::DEFAULT.0
    }
}

impl Default for CodecPriority {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Sample rate support (bitfield)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SampleRate(pub u32);

impl SampleRate {
    /// No sample rate
    pub const NONE: u32 = 0x00;
    /// 44100 Hz
    pub const HZ_44100: u32 = 0x01;
    /// 48000 Hz
    pub const HZ_48000: u32 = 0x02;
    /// 88200 Hz
    pub const HZ_88200: u32 = 0x04;
    /// 96000 Hz
    pub const HZ_96000: u32 = 0x08;
    /// 176400 Hz
    pub const HZ_176400: u32 = 0x10;
    /// 192000 Hz
    pub const HZ_192000: u32 = 0x20;
    /// 16000 Hz
    pub const HZ_16000: u32 = 0x40;
    /// 24000 Hz
    pub const HZ_24000: u32 = 0x80;
    /// 32000 Hz
    pub const HZ_32000: u32 = 0x100;

    const NAMES: [(u32, u32); 9] = [
        (Self::HZ_44100, 44100),
        (Self::HZ_48000, 48000),
        (Self::HZ_88200, 88200),
        (Self::HZ_96000, 96000),
        (Self::HZ_176400, 176_400),
        (Self::HZ_192000, 192_000),
        (Self::HZ_16000, 16000),
        (Self::HZ_24000, 24000),
        (Self::HZ_32000, 32000),
    ];

    /// Check if the given rate flag is supported
    #[must_use]
    pub const fn supports(&self, rate: u32) -> bool {
        (self.0 & rate) != 0
    }

    /// Sample rate in Hz, if exactly one flag is set
    #[must_use]
    pub fn hz(&self) -> Option<u32> {
        Self::NAMES
            .iter()
            .find(|(flag, _)| *flag == self.0)
            .map(|(_, hz)| *hz)
    }

    /// Flag for a sample rate given in Hz
    #[must_use]
    pub fn from_hz(hz: u32) -> Self {
        Self(
            Self::NAMES
                .iter()
                .find(|(_, rate)| *rate == hz)
                .map_or(Self::NONE, |(flag, _)| *flag),
        )
    }
}

impl FlagSet for SampleRate {
    fn bits(self) -> u32 {
        self.0
    }

    fn from_bits(bits: u32) -> Self {
        Self(bits)
    }
}

impl fmt::Display for SampleRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (flag, hz) in Self::NAMES {
            if self.supports(flag) {
                if !first {
                    f.write_char('|')?;
                }
                write!(f, "{hz}")?;
                first = false;
            }
        }
        if first {
            write!(f, "UnknownSampleRate(0x{:x})", self.0)?;
        }
        Ok(())
    }
}

/// Bits per sample support (bitfield)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BitsPerSample(pub u8);

impl BitsPerSample {
    /// No bit depth
    pub const NONE: u8 = 0x00;
    /// 16 bits per sample
    pub const BITS_16: u8 = 0x01;
    /// 24 bits per sample
    pub const BITS_24: u8 = 0x02;
    /// 32 bits per sample
    pub const BITS_32: u8 = 0x04;

    const NAMES: [(u8, u8); 3] = [(Self::BITS_16, 16), (Self::BITS_24, 24), (Self::BITS_32, 32)];

    /// Check if the given bit depth flag is supported
    #[must_use]
    pub const fn supports(&self, bits: u8) -> bool {
        (self.0 & bits) != 0
    }

    /// Bit depth, if exactly one flag is set
    #[must_use]
    pub fn bits_per_sample(&self) -> Option<u8> {
        Self::NAMES
            .iter()
            .find(|(flag, _)| *flag == self.0)
            .map(|(_, bits)| *bits)
    }
}

impl FlagSet for BitsPerSample {
    fn bits(self) -> u32 {
        u32::from(self.0)
    }

    fn from_bits(bits: u32) -> Self {
        Self((bits & 0xFF) as u8)
    }
}

impl fmt::Display for BitsPerSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (flag, bits) in Self::NAMES {
            if self.supports(flag) {
                if !first {
                    f.write_char('|')?;
                }
                write!(f, "{bits}")?;
                first = false;
            }
        }
        if first {
            write!(f, "UnknownBitsPerSample(0x{:x})", self.0)?;
        }
        Ok(())
    }
}

/// Channel mode support (bitfield)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelMode(pub u8);

impl ChannelMode {
    /// No channel mode
    pub const NONE: u8 = 0x00;
    /// Mono
    pub const MONO: u8 = 0x01;
    /// Stereo
    pub const STEREO: u8 = 0x02;

    /// Check if the given channel mode flag is supported
    #[must_use]
    pub const fn supports(&self, mode: u8) -> bool {
        (self.0 & mode) != 0
    }

    /// Number of channels, if exactly one flag is set
    #[must_use]
    pub const fn channel_count(&self) -> Option<u8> {
        match self.0 {
            Self::MONO => Some(1),
            Self::STEREO => Some(2),
            _ => None,
        }
    }
}

impl FlagSet for ChannelMode {
    fn bits(self) -> u32 {
        u32::from(self.0)
    }

    fn from_bits(bits: u32) -> Self {
        Self((bits & 0xFF) as u8)
    }
}

impl fmt::Display for ChannelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.supports(Self::MONO), self.supports(Self::STEREO)) {
            (true, true) => f.write_str("MONO|STEREO"),
            (true, false) => f.write_str("MONO"),
            (false, true) => f.write_str("STEREO"),
            (false, false) => write!(f, "UnknownChannelMode(0x{:x})", self.0),
        }
    }
}

/// Codec configuration snapshot
///
/// Used for the negotiated configuration, the capability sets and the user
/// and audio overrides of a codec descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CodecConfig {
    /// Codec this record belongs to (`None` means "unspecified")
    pub codec_type: Option<CodecIndex>,
    /// Codec priority
    pub priority: CodecPriority,
    /// Sample rate flags
    pub sample_rate: SampleRate,
    /// Bits per sample flags
    pub bits_per_sample: BitsPerSample,
    /// Channel mode flags
    pub channel_mode: ChannelMode,
    /// Codec-specific field 1
    pub codec_specific_1: i64,
    /// Codec-specific field 2
    pub codec_specific_2: i64,
    /// Codec-specific field 3
    pub codec_specific_3: i64,
    /// Codec-specific field 4
    pub codec_specific_4: i64,
}

impl CodecConfig {
    /// Create an otherwise empty record for a codec with a given priority
    #[must_use]
    pub fn new(codec_type: CodecIndex, priority: CodecPriority) -> Self {
        Self {
            codec_type: Some(codec_type),
            priority,
            ..Self::default()
        }
    }

    /// Check if the record carries no explicit setting at all
    ///
    /// The codec type is not part of the check: an override naming a codec
    /// but setting nothing else is still empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.priority.is_default()
            && self.sample_rate.is_none()
            && self.bits_per_sample.is_none()
            && self.channel_mode.is_none()
            && self.codec_specific_1 == 0
            && self.codec_specific_2 == 0
            && self.codec_specific_3 == 0
            && self.codec_specific_4 == 0
    }

    /// Check if the record names a codec and carries a complete audio format
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.codec_type.is_some()
            && !self.sample_rate.is_none()
            && !self.bits_per_sample.is_none()
            && !self.channel_mode.is_none()
    }

    /// Check if the audio format of two records differs
    ///
    /// This is what forces the audio input path to restart.
    #[must_use]
    pub fn audio_format_differs(&self, other: &Self) -> bool {
        self.sample_rate != other.sample_rate
            || self.bits_per_sample != other.bits_per_sample
            || self.channel_mode != other.channel_mode
            || self.codec_specific_1 != other.codec_specific_1
            || self.codec_specific_2 != other.codec_specific_2
            || self.codec_specific_3 != other.codec_specific_3
            || self.codec_specific_4 != other.codec_specific_4
    }
}

impl fmt::Display for CodecConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_valid() {
            return f.write_str("Invalid");
        }
        write!(
            f,
            "Rate={} Bits={} Mode={}",
            self.sample_rate, self.bits_per_sample, self.channel_mode
        )
    }
}

/// Peer parameters used when (re)configuring the encoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PeerParams {
    /// Peer MTU in bytes (0 when unknown)
    pub peer_mtu: u16,
}

impl PeerParams {
    /// Create peer parameters with a known MTU
    #[must_use]
    pub const fn with_mtu(peer_mtu: u16) -> Self {
        Self { peer_mtu }
    }
}

/// Options for configuring a `CodecRegistry` instance
///
/// Property lookup is done by the caller; the registry consumes these values
/// once in `init()`.
///
/// # Examples
///
/// ```rust
/// use birdsong::{CodecIndex, CodecPriority, RegistryOptions};
///
/// // Only SBC, with offload for SBC and AAC
/// let options = RegistryOptions::default()
///     .with_vendor_codecs(false)
///     .with_offload("sbc-aac");
/// assert!(!options.vendor_codecs_enabled);
///
/// // Prefer LDAC over everything else
/// let options = RegistryOptions::default()
///     .with_priority(CodecIndex::SourceLdac, CodecPriority::HIGHEST);
/// assert_eq!(
///     options.priority_for(CodecIndex::SourceLdac),
///     CodecPriority::HIGHEST
/// );
/// ```
#[derive(Debug, Clone)]
pub struct RegistryOptions {
    /// Explicit priority overrides per codec
    pub priorities: FnvIndexMap<CodecIndex, CodecPriority, MAX_CODECS>,
    /// Platform supports A2DP hardware offload
    pub offload_supported: bool,
    /// A2DP hardware offload is disabled by the user
    pub offload_disabled: bool,
    /// `-` separated list of codecs the offload path can encode (e.g. `"sbc-aac-ldac"`)
    pub offload_capabilities: String<MAX_OFFLOAD_CAPABILITY_LENGTH>,
    /// Opus codec enabled
    pub opus_enabled: bool,
    /// Non-standard codecs (anything but SBC) enabled
    pub vendor_codecs_enabled: bool,
    /// AAC source advertises variable bit rate
    pub aac_vbr_enabled: bool,
}

impl RegistryOptions {
    /// Override the priority of one codec
    #[must_use]
    pub fn with_priority(mut self, index: CodecIndex, priority: CodecPriority) -> Self {
        self.priorities.insert(index, priority).ok();
        self
    }

    /// Enable hardware offload with the given capability token list
    ///
    /// Tokens that do not fit the capability buffer are dropped.
    #[must_use]
    pub fn with_offload(mut self, capabilities: &str) -> Self {
        self.offload_supported = true;
        self.offload_disabled = false;
        self.offload_capabilities.clear();
        for token in capabilities.split('-') {
            let separator = usize::from(!self.offload_capabilities.is_empty());
            if self.offload_capabilities.len() + separator + token.len()
                > MAX_OFFLOAD_CAPABILITY_LENGTH
            {
                break;
            }
            if separator == 1 {
                self.offload_capabilities.push('-').ok();
            }
            self.offload_capabilities.push_str(token).ok();
        }
        self
    }

    /// Enable or disable the Opus codec
    #[must_use]
    pub fn with_opus(mut self, enabled: bool) -> Self {
        self.opus_enabled = enabled;
        self
    }

    /// Enable or disable AAC variable bit rate
    #[must_use]
    pub fn with_aac_vbr(mut self, enabled: bool) -> Self {
        self.aac_vbr_enabled = enabled;
        self
    }

    /// Enable or disable every codec except SBC
    #[must_use]
    pub fn with_vendor_codecs(mut self, enabled: bool) -> Self {
        self.vendor_codecs_enabled = enabled;
        self
    }

    /// Check if hardware offload is usable at all
    #[must_use]
    pub const fn offload_enabled(&self) -> bool {
        self.offload_supported && !self.offload_disabled
    }

    /// Priority requested for a codec, [`CodecPriority::DEFAULT`] if not overridden
    #[must_use]
    pub fn priority_for(&self, index: CodecIndex) -> CodecPriority {
        self.priorities
            .get(&index)
            .copied()
            .unwrap_or(CodecPriority::DEFAULT)
    }
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self {
            priorities: FnvIndexMap::new(),
            offload_supported: false,
            offload_disabled: false,
            offload_capabilities: String::new(),
            opus_enabled: false,
            vendor_codecs_enabled: true,
            aac_vbr_enabled: false,
        }
    }
}
