#![no_std]
#![doc = include_str!("../README.md")]
#![warn(missing_docs)]
#![allow(dead_code, clippy::too_many_lines)]

#[cfg(test)]
extern crate std;

#[cfg(test)]
use critical_section as _;

// This mod MUST go first, so that the others see its macros.
mod fmt;

pub mod codec_info;
pub mod codecs;
pub mod config;
pub mod constants;
pub mod descriptor;
pub mod layout;
pub mod offload;
pub mod registry;

pub use codec_info::CodecInfo;
pub use config::{
    BitsPerSample, ChannelMode, CodecConfig, CodecPriority, PeerParams, RegistryOptions,
    SampleRate,
};
pub use descriptor::{CodecDescriptor, ConfigUpdate};
pub use offload::{OffloadCodecInfo, encode_offload};
pub use registry::CodecRegistry;

use crate::constants::{SINK_CODEC_COUNT, SOURCE_CODEC_COUNT};

/// A2DP endpoint role of a codec implementation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Role {
    /// Audio source (encodes and sends audio)
    Source,
    /// Audio sink (receives and decodes audio)
    Sink,
}

/// Unique identifier of every codec implementation known to the stack
///
/// The numeric value of each variant is part of the contract: it is the
/// tie-breaker of the priority ordering and the input of the default
/// priority derivation (`1000 * (index + 1) + 1`). Source codecs come first,
/// sink codecs follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum CodecIndex {
    /// SBC source
    SourceSbc = 0,
    /// AAC source
    SourceAac = 1,
    /// aptX source
    SourceAptx = 2,
    /// aptX-HD source
    SourceAptxHd = 3,
    /// LDAC source
    SourceLdac = 4,
    /// LHDC V2 source
    SourceLhdcV2 = 5,
    /// LHDC V3 source (also carries the V4 and LLAC sub-revisions)
    SourceLhdcV3 = 6,
    /// LHDC V5 source
    SourceLhdcV5 = 7,
    /// Opus source
    SourceOpus = 8,
    /// SBC sink
    SinkSbc = 9,
    /// AAC sink
    SinkAac = 10,
    /// LDAC sink
    SinkLdac = 11,
    /// LHDC V3 sink
    SinkLhdcV3 = 12,
    /// LHDC V5 sink
    SinkLhdcV5 = 13,
    /// Opus sink
    SinkOpus = 14,
}

impl CodecIndex {
    /// Every codec index, in ascending index order
    pub const ALL: [Self; SOURCE_CODEC_COUNT + SINK_CODEC_COUNT] = [
        Self::SourceSbc,
        Self::SourceAac,
        Self::SourceAptx,
        Self::SourceAptxHd,
        Self::SourceLdac,
        Self::SourceLhdcV2,
        Self::SourceLhdcV3,
        Self::SourceLhdcV5,
        Self::SourceOpus,
        Self::SinkSbc,
        Self::SinkAac,
        Self::SinkLdac,
        Self::SinkLhdcV3,
        Self::SinkLhdcV5,
        Self::SinkOpus,
    ];

    /// Get the raw index value
    #[must_use]
    pub const fn value(self) -> u8 {
        self as u8
    }

    /// Convert a raw index value into a `CodecIndex`
    #[must_use]
    pub const fn from_value(value: u8) -> Option<Self> {
        if (value as usize) < Self::ALL.len() {
            Some(Self::ALL[value as usize])
        } else {
            None
        }
    }

    /// Role of the codec implementation identified by this index
    #[must_use]
    pub const fn role(self) -> Role {
        if (self as usize) < SOURCE_CODEC_COUNT {
            Role::Source
        } else {
            Role::Sink
        }
    }

    /// Check if this index identifies a source codec
    #[must_use]
    pub const fn is_source(self) -> bool {
        matches!(self.role(), Role::Source)
    }

    /// Default priority derived from the index value
    ///
    /// Every codec gets a distinct, nonzero default that grows with the index.
    #[must_use]
    pub const fn default_priority(self) -> CodecPriority {
        CodecPriority(1000 * (self as i32 + 1) + 1)
    }

    /// Human-readable name of the codec implementation
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::SourceSbc => "SBC",
            Self::SourceAac => "AAC",
            Self::SourceAptx => "aptX",
            Self::SourceAptxHd => "aptX-HD",
            Self::SourceLdac => "LDAC",
            Self::SourceLhdcV2 => "LHDC V2",
            Self::SourceLhdcV3 => "LHDC V3",
            Self::SourceLhdcV5 => "LHDC V5",
            Self::SourceOpus => "Opus",
            Self::SinkSbc => "SBC SINK",
            Self::SinkAac => "AAC SINK",
            Self::SinkLdac => "LDAC SINK",
            Self::SinkLhdcV3 => "LHDC V3 SINK",
            Self::SinkLhdcV5 => "LHDC V5 SINK",
            Self::SinkOpus => "Opus SINK",
        }
    }
}

impl core::fmt::Display for CodecIndex {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// Codec configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CodecError {
    /// Buffer too short, malformed or carrying an unexpected type tag
    InvalidCodecInfo,
    /// Codec is unknown or not enabled in the registry
    UnsupportedCodec,
    /// No field combination satisfies both local and peer capabilities
    NoCommonConfig,
    /// Peer configuration ignored because an explicit user configuration exists
    UserConfigOverride,
    /// Operation needs an active codec and none has been selected yet
    NoCurrentCodec,
    /// Fixed-capacity storage is full
    CapacityExceeded,
}

impl core::fmt::Display for CodecError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidCodecInfo => write!(f, "Invalid codec information element"),
            Self::UnsupportedCodec => write!(f, "Codec not supported"),
            Self::NoCommonConfig => write!(f, "No common codec configuration with peer"),
            Self::UserConfigOverride => {
                write!(f, "Peer configuration overridden by user configuration")
            }
            Self::NoCurrentCodec => write!(f, "No current codec selected"),
            Self::CapacityExceeded => write!(f, "Codec storage capacity exceeded"),
        }
    }
}

/// Hardware offload encoding errors
///
/// These only reject the offload encode. The negotiated configuration stays
/// valid and can still be streamed without offload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OffloadError {
    /// Source configuration is not a valid instance of its declared codec
    InvalidConfig,
    /// Protocol version field cannot be represented by the offload layout
    UnsupportedVersion(u8),
    /// Split (channel separation) mode cannot be represented
    UnsupportedSplitMode(u8),
    /// Frame duration cannot be represented
    UnsupportedFrameDuration(u8),
}

impl core::fmt::Display for OffloadError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidConfig => write!(f, "Invalid codec configuration for offload"),
            Self::UnsupportedVersion(v) => write!(f, "Unsupported codec version 0x{v:02X}"),
            Self::UnsupportedSplitMode(m) => write!(f, "Unsupported split mode 0x{m:02X}"),
            Self::UnsupportedFrameDuration(d) => {
                write!(f, "Unsupported frame duration 0x{d:02X}")
            }
        }
    }
}
