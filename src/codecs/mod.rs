//! Codec families and capability dispatch
//!
//! Every operation on a raw information element first identifies the codec
//! family from the codec type tag (and, for vendor codecs, the vendor and
//! codec IDs), then forwards to that family's module. Unknown codecs are
//! reported as invalid, unsupported or absent rather than as errors.
//!
//! [`CodecVariant`] is the decoded, family-tagged view used for both local
//! capabilities and negotiation results.

pub mod aac;
pub mod negotiate;
pub mod sbc;
pub mod vendor;

use core::fmt::{self, Write};

use heapless::String;

use crate::codec_info::CodecInfo;
use crate::config::CodecConfig;
use crate::constants::{A2DP_MEDIA_CT_AAC, A2DP_MEDIA_CT_NON_A2DP, A2DP_MEDIA_CT_SBC};
use crate::{CodecError, CodecIndex, Role};

use aac::AacInfo;
use negotiate::{Negotiated, Negotiation};
use sbc::SbcInfo;
use vendor::VendorCodec;
use vendor::aptx::AptxInfo;
use vendor::ldac::LdacInfo;
use vendor::lhdc::{LhdcInfo, LhdcRevision};
use vendor::opus::OpusInfo;

pub use crate::codec_info::{codec_type, media_type};

/// Capacity of the human-readable codec description
pub const CODEC_INFO_STRING_SIZE: usize = 256;

/// Codec family of an information element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CodecFamily {
    /// SBC
    Sbc,
    /// MPEG-2/4 AAC
    Aac,
    /// Vendor-specific codec
    Vendor(VendorCodec),
}

impl CodecFamily {
    /// Identify the family of a raw information element
    #[must_use]
    pub fn identify(info: &[u8]) -> Option<Self> {
        match codec_type(info)? {
            A2DP_MEDIA_CT_SBC => Some(Self::Sbc),
            A2DP_MEDIA_CT_AAC => Some(Self::Aac),
            A2DP_MEDIA_CT_NON_A2DP => VendorCodec::identify(info).map(Self::Vendor),
            _ => None,
        }
    }

    /// Codec index implementing this family in a role
    ///
    /// aptX, aptX-HD and LHDC V2 have no sink implementation.
    #[must_use]
    pub const fn index(self, role: Role) -> Option<CodecIndex> {
        let (source, sink) = match self {
            Self::Sbc => (CodecIndex::SourceSbc, Some(CodecIndex::SinkSbc)),
            Self::Aac => (CodecIndex::SourceAac, Some(CodecIndex::SinkAac)),
            Self::Vendor(VendorCodec::Aptx) => (CodecIndex::SourceAptx, None),
            Self::Vendor(VendorCodec::AptxHd) => (CodecIndex::SourceAptxHd, None),
            Self::Vendor(VendorCodec::Ldac) => (CodecIndex::SourceLdac, Some(CodecIndex::SinkLdac)),
            Self::Vendor(VendorCodec::LhdcV2) => (CodecIndex::SourceLhdcV2, None),
            Self::Vendor(VendorCodec::LhdcV3) => {
                (CodecIndex::SourceLhdcV3, Some(CodecIndex::SinkLhdcV3))
            }
            Self::Vendor(VendorCodec::LhdcV5) => {
                (CodecIndex::SourceLhdcV5, Some(CodecIndex::SinkLhdcV5))
            }
            Self::Vendor(VendorCodec::Opus) => (CodecIndex::SourceOpus, Some(CodecIndex::SinkOpus)),
        };
        match role {
            Role::Source => Some(source),
            Role::Sink => sink,
        }
    }

    /// Family implemented by a codec index
    #[must_use]
    pub const fn of_index(index: CodecIndex) -> Self {
        match index {
            CodecIndex::SourceSbc | CodecIndex::SinkSbc => Self::Sbc,
            CodecIndex::SourceAac | CodecIndex::SinkAac => Self::Aac,
            CodecIndex::SourceAptx => Self::Vendor(VendorCodec::Aptx),
            CodecIndex::SourceAptxHd => Self::Vendor(VendorCodec::AptxHd),
            CodecIndex::SourceLdac | CodecIndex::SinkLdac => Self::Vendor(VendorCodec::Ldac),
            CodecIndex::SourceLhdcV2 => Self::Vendor(VendorCodec::LhdcV2),
            CodecIndex::SourceLhdcV3 | CodecIndex::SinkLhdcV3 => Self::Vendor(VendorCodec::LhdcV3),
            CodecIndex::SourceLhdcV5 | CodecIndex::SinkLhdcV5 => Self::Vendor(VendorCodec::LhdcV5),
            CodecIndex::SourceOpus | CodecIndex::SinkOpus => Self::Vendor(VendorCodec::Opus),
        }
    }
}

/// Decoded information element of any supported codec
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecVariant {
    /// SBC
    Sbc(SbcInfo),
    /// AAC
    Aac(AacInfo),
    /// aptX or aptX-HD
    Aptx(AptxInfo),
    /// LDAC
    Ldac(LdacInfo),
    /// LHDC (any revision)
    Lhdc(LhdcInfo),
    /// Opus
    Opus(OpusInfo),
}

impl CodecVariant {
    /// Local capabilities of a codec implementation
    #[must_use]
    pub const fn local_caps(index: CodecIndex, aac_vbr_enabled: bool) -> Self {
        let role = index.role();
        match index {
            CodecIndex::SourceSbc | CodecIndex::SinkSbc => Self::Sbc(SbcInfo::caps(role)),
            CodecIndex::SourceAac | CodecIndex::SinkAac => {
                Self::Aac(AacInfo::caps(role, aac_vbr_enabled))
            }
            CodecIndex::SourceAptx => Self::Aptx(AptxInfo::APTX_CAPS),
            CodecIndex::SourceAptxHd => Self::Aptx(AptxInfo::APTX_HD_CAPS),
            CodecIndex::SourceLdac | CodecIndex::SinkLdac => Self::Ldac(LdacInfo::caps(role)),
            CodecIndex::SourceLhdcV2 => Self::Lhdc(LhdcInfo::caps(LhdcRevision::V2, role)),
            CodecIndex::SourceLhdcV3 | CodecIndex::SinkLhdcV3 => {
                Self::Lhdc(LhdcInfo::caps(LhdcRevision::V3, role))
            }
            CodecIndex::SourceLhdcV5 | CodecIndex::SinkLhdcV5 => {
                Self::Lhdc(LhdcInfo::caps(LhdcRevision::V5, role))
            }
            CodecIndex::SourceOpus | CodecIndex::SinkOpus => Self::Opus(OpusInfo::caps(role)),
        }
    }

    /// Decode a raw information element
    ///
    /// # Errors
    /// Returns `UnsupportedCodec` for an unknown codec and `InvalidCodecInfo`
    /// for a malformed element of a known one.
    pub fn parse(info: &[u8], is_capability: bool) -> Result<Self, CodecError> {
        let family = CodecFamily::identify(info).ok_or(CodecError::UnsupportedCodec)?;
        Ok(match family {
            CodecFamily::Sbc => Self::Sbc(SbcInfo::parse(info, is_capability)?),
            CodecFamily::Aac => Self::Aac(AacInfo::parse(info, is_capability)?),
            CodecFamily::Vendor(codec) => match codec {
                VendorCodec::Aptx => Self::Aptx(AptxInfo::parse(info, false, is_capability)?),
                VendorCodec::AptxHd => Self::Aptx(AptxInfo::parse(info, true, is_capability)?),
                VendorCodec::Ldac => Self::Ldac(LdacInfo::parse(info, is_capability)?),
                VendorCodec::LhdcV2 => {
                    Self::Lhdc(LhdcInfo::parse(info, LhdcRevision::V2, is_capability)?)
                }
                VendorCodec::LhdcV3 => {
                    Self::Lhdc(LhdcInfo::parse(info, LhdcRevision::V3, is_capability)?)
                }
                VendorCodec::LhdcV5 => {
                    Self::Lhdc(LhdcInfo::parse(info, LhdcRevision::V5, is_capability)?)
                }
                VendorCodec::Opus => Self::Opus(OpusInfo::parse(info, is_capability)?),
            },
        })
    }

    /// Decode a configuration, falling back to a capability
    ///
    /// # Errors
    /// Same as [`CodecVariant::parse`].
    pub fn parse_any(info: &[u8]) -> Result<Self, CodecError> {
        Self::parse(info, false).or_else(|_| Self::parse(info, true))
    }

    /// Codec family
    #[must_use]
    pub const fn family(&self) -> CodecFamily {
        match self {
            Self::Sbc(_) => CodecFamily::Sbc,
            Self::Aac(_) => CodecFamily::Aac,
            Self::Aptx(aptx) if aptx.hd => CodecFamily::Vendor(VendorCodec::AptxHd),
            Self::Aptx(_) => CodecFamily::Vendor(VendorCodec::Aptx),
            Self::Ldac(_) => CodecFamily::Vendor(VendorCodec::Ldac),
            Self::Lhdc(lhdc) => CodecFamily::Vendor(match lhdc.revision {
                LhdcRevision::V2 => VendorCodec::LhdcV2,
                LhdcRevision::V3 => VendorCodec::LhdcV3,
                LhdcRevision::V5 => VendorCodec::LhdcV5,
            }),
            Self::Opus(_) => CodecFamily::Vendor(VendorCodec::Opus),
        }
    }

    /// Encode as an information element
    #[must_use]
    pub fn build(&self) -> CodecInfo {
        match self {
            Self::Sbc(info) => info.build(),
            Self::Aac(info) => info.build(),
            Self::Aptx(info) => info.build(),
            Self::Ldac(info) => info.build(),
            Self::Lhdc(info) => info.build(),
            Self::Opus(info) => info.build(),
        }
    }

    /// Check if `self` shares at least one flag per field with `caps`
    ///
    /// Elements of different families never match.
    #[must_use]
    pub fn matches(&self, caps: &Self) -> bool {
        match (self, caps) {
            (Self::Sbc(a), Self::Sbc(b)) => a.matches(b),
            (Self::Aac(a), Self::Aac(b)) => a.matches(b),
            (Self::Aptx(a), Self::Aptx(b)) => a.matches(b),
            (Self::Ldac(a), Self::Ldac(b)) => a.matches(b),
            (Self::Lhdc(a), Self::Lhdc(b)) => a.matches(b),
            (Self::Opus(a), Self::Opus(b)) => a.matches(b),
            _ => false,
        }
    }

    /// Display name
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Sbc(_) => "SBC",
            Self::Aac(_) => "AAC",
            Self::Aptx(info) if info.hd => "aptX-HD",
            Self::Aptx(_) => "aptX",
            Self::Ldac(_) => "LDAC",
            Self::Lhdc(info) => info.revision.name(),
            Self::Opus(_) => "Opus",
        }
    }

    /// Sample rate in Hz
    #[must_use]
    pub fn sample_rate(&self) -> Option<u32> {
        match self {
            Self::Sbc(info) => info.sample_rate(),
            Self::Aac(info) => info.sample_rate(),
            Self::Aptx(info) => info.sample_rate(),
            Self::Ldac(info) => info.sample_rate(),
            Self::Lhdc(info) => info.sample_rate(),
            Self::Opus(info) => info.sample_rate(),
        }
    }

    /// Bits per sample
    ///
    /// LDAC does not carry its bit depth on the wire and reports 32.
    #[must_use]
    pub fn bits_per_sample(&self) -> Option<u8> {
        match self {
            Self::Sbc(_) | Self::Aac(_) | Self::Opus(_) => Some(16),
            Self::Aptx(info) => Some(info.bits_per_sample()),
            Self::Ldac(_) => Some(32),
            Self::Lhdc(info) => info.bits_per_sample(),
        }
    }

    /// Number of audio channels
    #[must_use]
    pub const fn channel_count(&self) -> Option<u8> {
        match self {
            Self::Sbc(info) => info.channel_count(),
            Self::Aac(info) => info.channel_count(),
            Self::Aptx(info) => info.channel_count(),
            Self::Ldac(info) => info.channel_count(),
            Self::Lhdc(info) => info.channel_count(),
            Self::Opus(info) => info.channel_count(),
        }
    }

    /// Sink track channel type (1 = mono, 3 = stereo)
    #[must_use]
    pub const fn sink_channel_type(&self) -> Option<u8> {
        match self {
            Self::Sbc(info) => info.sink_channel_type(),
            Self::Aac(info) => info.sink_channel_type(),
            Self::Aptx(info) => match info.channel_count() {
                Some(1) => Some(1),
                Some(_) => Some(3),
                None => None,
            },
            Self::Ldac(info) => info.sink_channel_type(),
            Self::Lhdc(info) => info.sink_channel_type(),
            Self::Opus(info) => info.sink_channel_type(),
        }
    }

    /// Bit rate the element implies, if any
    ///
    /// LDAC and Opus select their rate at runtime and report `None`; LHDC
    /// reports its max bit rate.
    #[must_use]
    pub fn bit_rate(&self) -> Option<u32> {
        match self {
            Self::Sbc(info) => info.bit_rate(),
            Self::Aac(info) => (info.bit_rate != 0).then_some(info.bit_rate),
            Self::Aptx(info) => info.bit_rate(),
            Self::Lhdc(info) => info.max_bit_rate_bps(),
            Self::Ldac(_) | Self::Opus(_) => None,
        }
    }

    /// Write a multi-line description
    ///
    /// # Errors
    /// Propagates writer errors.
    pub fn describe(&self, f: &mut impl Write) -> fmt::Result {
        match self {
            Self::Sbc(info) => info.describe(f),
            Self::Aac(info) => info.describe(f),
            Self::Aptx(info) => info.describe(f),
            Self::Ldac(info) => info.describe(f),
            Self::Lhdc(info) => info.describe(f),
            Self::Opus(info) => info.describe(f),
        }
    }

    /// Capability snapshot of a local capability element
    #[must_use]
    pub fn local_capability(&self) -> CodecConfig {
        match self {
            Self::Sbc(caps) => sbc::local_capability(caps),
            Self::Aac(caps) => aac::local_capability(caps),
            Self::Aptx(caps) => vendor::aptx::local_capability(caps),
            Self::Ldac(caps) => vendor::ldac::local_capability(caps),
            Self::Lhdc(caps) => vendor::lhdc::local_capability(caps),
            Self::Opus(caps) => vendor::opus::local_capability(caps),
        }
    }

    /// Negotiate a configuration between these local capabilities and a peer element
    ///
    /// # Errors
    /// Returns `InvalidCodecInfo` if the peer element is malformed or of
    /// another family and `NoCommonConfig` if no configuration fits both.
    pub fn negotiate(
        &self,
        peer_info: &[u8],
        ctx: &Negotiation<'_>,
    ) -> Result<Negotiated, CodecError> {
        match self {
            Self::Sbc(local) => sbc::negotiate(local, peer_info, ctx),
            Self::Aac(local) => aac::negotiate(local, peer_info, ctx),
            Self::Aptx(local) => vendor::aptx::negotiate(local, peer_info, ctx),
            Self::Ldac(local) => vendor::ldac::negotiate(local, peer_info, ctx),
            Self::Lhdc(local) => vendor::lhdc::negotiate(local, peer_info, ctx),
            Self::Opus(local) => vendor::opus::negotiate(local, peer_info, ctx),
        }
    }
}

fn valid_for(info: &[u8], role: Role) -> bool {
    CodecFamily::identify(info).is_some_and(|family| family.index(role).is_some())
        && CodecVariant::parse_any(info).is_ok()
}

/// Check if an element is a valid configuration or capability of a local source codec
#[must_use]
pub fn is_source_codec_valid(info: &[u8]) -> bool {
    valid_for(info, Role::Source)
}

/// Check if an element is a valid configuration or capability of a local sink codec
#[must_use]
pub fn is_sink_codec_valid(info: &[u8]) -> bool {
    valid_for(info, Role::Sink)
}

/// Check if an element is a valid peer source element (handled by a local sink)
#[must_use]
pub fn is_peer_source_codec_valid(info: &[u8]) -> bool {
    valid_for(info, Role::Sink)
}

/// Check if an element is a valid peer sink element (handled by a local source)
#[must_use]
pub fn is_peer_sink_codec_valid(info: &[u8]) -> bool {
    valid_for(info, Role::Source)
}

fn supported_by_sink(info: &[u8], is_capability: bool) -> bool {
    let Some(index) = CodecFamily::identify(info).and_then(|family| family.index(Role::Sink)) else {
        return false;
    };
    CodecVariant::parse(info, is_capability)
        .is_ok_and(|parsed| parsed.matches(&CodecVariant::local_caps(index, false)))
}

/// Check if a configuration can be handled by the local sink
#[must_use]
pub fn is_sink_codec_supported(info: &[u8]) -> bool {
    supported_by_sink(info, false)
}

/// Check if a peer source capability overlaps the local sink capabilities
#[must_use]
pub fn is_peer_source_codec_supported(info: &[u8]) -> bool {
    supported_by_sink(info, true)
}

/// Check if two elements belong to the same codec
#[must_use]
pub fn codec_type_equals(a: &[u8], b: &[u8]) -> bool {
    match (codec_type(a), codec_type(b)) {
        (Some(A2DP_MEDIA_CT_NON_A2DP), Some(A2DP_MEDIA_CT_NON_A2DP)) => {
            let ids = |info: &[u8]| {
                (
                    crate::codec_info::vendor_id(info),
                    crate::codec_info::vendor_codec_id(info),
                )
            };
            let (a_ids, b_ids) = (ids(a), ids(b));
            a_ids.0.is_some() && a_ids.1.is_some() && a_ids == b_ids
        }
        (Some(a_type), Some(b_type)) => a_type == b_type,
        _ => false,
    }
}

/// Check if two elements describe the same codec with the same parameters
///
/// Both elements must decode; undecodable elements never compare equal.
#[must_use]
pub fn codec_equals(a: &[u8], b: &[u8]) -> bool {
    if !codec_type_equals(a, b) {
        return false;
    }
    match (CodecVariant::parse_any(a), CodecVariant::parse_any(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Name of the codec of an element, `"UNKNOWN CODEC"` if unknown
#[must_use]
pub fn codec_name(info: &[u8]) -> &'static str {
    CodecVariant::parse_any(info).map_or("UNKNOWN CODEC", |parsed| parsed.name())
}

fn parse_config(info: &[u8]) -> Option<CodecVariant> {
    CodecVariant::parse(info, false).ok()
}

/// Track sample rate in Hz of a configuration
#[must_use]
pub fn track_sample_rate(info: &[u8]) -> Option<u32> {
    parse_config(info)?.sample_rate()
}

/// Track bits per sample of a configuration
#[must_use]
pub fn track_bits_per_sample(info: &[u8]) -> Option<u8> {
    parse_config(info)?.bits_per_sample()
}

/// Track channel count of a configuration
#[must_use]
pub fn track_channel_count(info: &[u8]) -> Option<u8> {
    parse_config(info)?.channel_count()
}

/// Sink track channel type of a configuration (1 = mono, 3 = stereo)
#[must_use]
pub fn sink_track_channel_type(info: &[u8]) -> Option<u8> {
    parse_config(info)?.sink_channel_type()
}

/// Bit rate implied by a configuration
#[must_use]
pub fn track_bit_rate(info: &[u8]) -> Option<u32> {
    parse_config(info)?.bit_rate()
}

/// Check if media packets of a configuration carry an RTP header
///
/// aptX and aptX-HD only use one when content protection is enabled.
#[must_use]
pub fn uses_rtp_header(content_protection_enabled: bool, info: &[u8]) -> bool {
    match CodecFamily::identify(info) {
        Some(CodecFamily::Vendor(VendorCodec::Aptx | VendorCodec::AptxHd)) => {
            content_protection_enabled
        }
        _ => true,
    }
}

/// Default configuration used before any negotiation (SBC)
#[must_use]
pub fn init_default_codec() -> CodecInfo {
    SbcInfo::DEFAULT_CONFIG.build()
}

/// Adjust a configuration in place to what the local encoder supports
///
/// Returns `false` if the configuration is invalid or unknown.
pub fn adjust_codec(info: &mut CodecInfo) -> bool {
    match CodecFamily::identify(info.as_bytes()) {
        Some(CodecFamily::Sbc) => sbc::adjust(info),
        Some(_) => CodecVariant::parse(info.as_bytes(), false).is_ok(),
        None => false,
    }
}

/// Local source codec index handling an element
#[must_use]
pub fn source_codec_index(info: &[u8]) -> Option<CodecIndex> {
    CodecFamily::identify(info)?.index(Role::Source)
}

/// Local sink codec index handling an element
#[must_use]
pub fn sink_codec_index(info: &[u8]) -> Option<CodecIndex> {
    CodecFamily::identify(info)?.index(Role::Sink)
}

/// Name of a raw codec index, `"UNKNOWN CODEC INDEX"` if out of range
#[must_use]
pub fn codec_index_str(value: u8) -> &'static str {
    CodecIndex::from_value(value).map_or("UNKNOWN CODEC INDEX", CodecIndex::name)
}

/// Local capability element advertised for a codec index
#[must_use]
pub fn init_codec_config(index: CodecIndex, aac_vbr_enabled: bool) -> CodecInfo {
    CodecVariant::local_caps(index, aac_vbr_enabled).build()
}

/// Human-readable description of an element
#[must_use]
pub fn codec_info_string(info: &[u8]) -> String<CODEC_INFO_STRING_SIZE> {
    let mut out = String::new();
    let written = match CodecVariant::parse_any(info) {
        Ok(parsed) => parsed.describe(&mut out),
        Err(_) => write!(
            out,
            "Unsupported codec type: 0x{:02X}",
            codec_type(info).unwrap_or(0)
        ),
    };
    if written.is_err() {
        warn!("[CODEC] Codec description truncated");
    }
    out
}

/// Encoded frame size of a configuration, if the codec has a fixed one
#[must_use]
pub fn effective_frame_size(info: &[u8]) -> Option<usize> {
    match parse_config(info)? {
        CodecVariant::Sbc(sbc) => sbc.frame_length(),
        _ => None,
    }
}
