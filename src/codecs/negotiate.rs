//! Field selection shared by every codec family
//!
//! Each negotiable wire field maps its single-bit flags onto the common
//! [`FlagSet`] representation through a static table whose order is the
//! family's preference order (best first). A field is then chosen from the
//! flags both sides support, in this order:
//!
//! 1. the user override, if supported
//! 2. the audio override, if supported
//! 3. the family's default configuration, if supported
//! 4. the best available flag

use crate::CodecError;
use crate::codec_info::CodecInfo;
use crate::config::{CodecConfig, FlagSet, PeerParams};

/// Inputs of one negotiation run
#[derive(Debug, Clone, Copy)]
pub struct Negotiation<'a> {
    /// Explicit user override
    pub user: &'a CodecConfig,
    /// Audio pipeline override
    pub audio: &'a CodecConfig,
    /// Peer parameters
    pub peer_params: PeerParams,
    /// Peer buffer is a capability (several flags) rather than a configuration
    pub is_capability: bool,
}

impl<'a> Negotiation<'a> {
    /// Create a negotiation without overrides
    #[must_use]
    pub fn plain(empty: &'a CodecConfig, is_capability: bool) -> Self {
        Self {
            user: empty,
            audio: empty,
            peer_params: PeerParams::default(),
            is_capability,
        }
    }
}

/// Outcome of a successful negotiation
///
/// The snapshots carry the audio format and codec-specific fields; the
/// descriptor stamps codec type and priority on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Negotiated {
    /// Resulting wire configuration
    pub ota_config: CodecInfo,
    /// Selected configuration (one flag per field)
    pub config: CodecConfig,
    /// Negotiated ceiling
    pub capability: CodecConfig,
    /// Peer-intersected capability the user may choose from
    pub selectable: CodecConfig,
}

/// One negotiable wire field
#[derive(Debug, Clone, Copy)]
pub struct FieldChoice<'a, C: FlagSet> {
    table: &'a [(u8, C)],
    available: u8,
}

impl<'a, C: FlagSet> FieldChoice<'a, C> {
    /// Restrict a table to the wire flags both sides support
    #[must_use]
    pub fn new(table: &'a [(u8, C)], local: u8, peer: u8) -> Self {
        Self {
            table,
            available: local & peer,
        }
    }

    /// Wire flags both sides support
    #[must_use]
    pub const fn available(&self) -> u8 {
        self.available
    }

    /// First wire flag mapping to `wanted`
    #[must_use]
    pub fn preferred(&self, wanted: C) -> Option<(u8, C)> {
        if wanted.is_none() {
            return None;
        }
        self.table
            .iter()
            .find(|(wire, common)| self.available & wire != 0 && *common == wanted)
            .copied()
    }

    /// First available wire flag inside `mask`
    #[must_use]
    pub fn within(&self, mask: u8) -> Option<(u8, C)> {
        self.table
            .iter()
            .find(|(wire, _)| self.available & mask & wire != 0)
            .copied()
    }

    /// Select a flag: user, audio, default, then best available
    #[must_use]
    pub fn select(&self, user: C, audio: C, default_mask: u8) -> Option<(u8, C)> {
        self.preferred(user)
            .or_else(|| self.preferred(audio))
            .or_else(|| self.within(default_mask))
            .or_else(|| self.within(0xFF))
    }

    /// Common representation of every available flag
    #[must_use]
    pub fn capability(&self) -> C {
        self.table
            .iter()
            .filter(|(wire, _)| self.available & wire != 0)
            .fold(C::from_bits(0), |acc, (_, common)| acc.union(*common))
    }
}

/// Common representation of every flag in `wire` according to `table`
#[must_use]
pub fn to_common<C: FlagSet>(table: &[(u8, C)], wire: u8) -> C {
    FieldChoice::new(table, wire, 0xFF).capability()
}

/// Select one flag or fail the negotiation
///
/// # Errors
/// Returns `NoCommonConfig` if the sides share no flag.
pub fn select_or_fail<C: FlagSet>(
    choice: &FieldChoice<'_, C>,
    user: C,
    audio: C,
    default_mask: u8,
) -> Result<(u8, C), CodecError> {
    choice
        .select(user, audio, default_mask)
        .ok_or(CodecError::NoCommonConfig)
}

/// Check that a configuration field carries exactly one flag
pub(crate) fn single_flag(value: u8) -> Result<u8, CodecError> {
    if value.count_ones() == 1 {
        Ok(value)
    } else {
        Err(CodecError::InvalidCodecInfo)
    }
}

/// Check that a capability field carries at least one flag
pub(crate) fn any_flag(value: u8) -> Result<u8, CodecError> {
    if value == 0 {
        Err(CodecError::InvalidCodecInfo)
    } else {
        Ok(value)
    }
}

/// Check a field according to the buffer kind
pub(crate) fn check_flags(value: u8, is_capability: bool) -> Result<u8, CodecError> {
    if is_capability {
        any_flag(value)
    } else {
        single_flag(value)
    }
}

/// Pick the first flag of `order` present in `value`
pub(crate) fn first_of(value: u8, order: &[u8]) -> Option<u8> {
    order.iter().copied().find(|flag| value & flag != 0)
}
