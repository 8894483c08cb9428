//! Per-codec configuration state
//!
//! A [`CodecDescriptor`] owns every configuration snapshot of one codec
//! implementation and runs that codec's negotiation against peer elements.
//!
//! ## Snapshots
//!
//! - `config`: the negotiated configuration (one flag per field)
//! - `capability`: the negotiated ceiling
//! - `local_capability`: what the local implementation supports
//! - `selectable_capability`: local capabilities intersected with the peer's
//! - `user_config`: explicit user override, may be empty
//! - `audio_config`: audio pipeline override, may be empty
//!
//! plus the wire elements `ota_config`, `ota_peer_capability` and
//! `ota_peer_config`.
//!
//! Every mutating operation either succeeds completely or leaves the
//! descriptor exactly as it was before the call.

use core::fmt::{self, Write};

use crate::codec_info::CodecInfo;
use crate::codecs::negotiate::Negotiation;
use crate::codecs::vendor::ldac;
use crate::codecs::vendor::lhdc::LhdcQuality;
use crate::codecs::{self, CodecVariant};
use crate::config::{CodecConfig, CodecPriority, PeerParams};
use crate::offload::{OffloadCodecInfo, encode_offload};
use crate::{CodecError, CodecIndex, OffloadError, Role};

/// Outcome of a configuration change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConfigUpdate {
    /// Resulting wire configuration
    pub codec_info: CodecInfo,
    /// Audio input path must be restarted (audio format changed)
    pub restart_input: bool,
    /// Wire connection must be reconfigured (wire configuration changed)
    pub restart_output: bool,
    /// Anything observable changed
    pub config_updated: bool,
}

/// Configuration state of one codec implementation
#[derive(Debug, Clone)]
pub struct CodecDescriptor {
    index: CodecIndex,
    caps: CodecVariant,
    priority: CodecPriority,
    default_priority: CodecPriority,
    config: CodecConfig,
    capability: CodecConfig,
    local_capability: CodecConfig,
    selectable_capability: CodecConfig,
    user_config: CodecConfig,
    audio_config: CodecConfig,
    ota_config: CodecInfo,
    ota_peer_capability: CodecInfo,
    ota_peer_config: CodecInfo,
    peer_params: PeerParams,
}

impl CodecDescriptor {
    /// Create a descriptor with its local capabilities
    ///
    /// `priority` becomes the default priority; [`CodecPriority::DEFAULT`]
    /// resolves to the priority derived from the index.
    #[must_use]
    pub fn new(index: CodecIndex, priority: CodecPriority, aac_vbr_enabled: bool) -> Self {
        let caps = CodecVariant::local_caps(index, aac_vbr_enabled);
        let mut descriptor = Self {
            index,
            caps,
            priority,
            default_priority: priority,
            config: CodecConfig::default(),
            capability: CodecConfig::default(),
            local_capability: caps.local_capability(),
            selectable_capability: CodecConfig::default(),
            user_config: CodecConfig::default(),
            audio_config: CodecConfig::default(),
            ota_config: CodecInfo::new(),
            ota_peer_capability: CodecInfo::new(),
            ota_peer_config: CodecInfo::new(),
            peer_params: PeerParams::default(),
        };
        descriptor.set_codec_priority(priority);
        descriptor
    }

    /// Codec index
    #[must_use]
    pub const fn index(&self) -> CodecIndex {
        self.index
    }

    /// Role of the codec implementation
    #[must_use]
    pub const fn role(&self) -> Role {
        self.index.role()
    }

    /// Display name
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.index.name()
    }

    /// Local capability element
    #[must_use]
    pub const fn local_caps(&self) -> &CodecVariant {
        &self.caps
    }

    /// Current priority
    #[must_use]
    pub const fn priority(&self) -> CodecPriority {
        self.priority
    }

    /// Priority fixed at construction
    #[must_use]
    pub const fn default_priority(&self) -> CodecPriority {
        self.default_priority
    }

    /// Set the priority
    ///
    /// [`CodecPriority::DEFAULT`] restores the default priority.
    pub fn set_codec_priority(&mut self, priority: CodecPriority) {
        if priority.is_default() {
            self.set_default_priority();
        } else {
            self.priority = priority;
        }
    }

    /// Restore the default priority
    ///
    /// Falls back to the priority derived from the index when the descriptor
    /// was created without an explicit one.
    pub fn set_default_priority(&mut self) {
        self.priority = if self.default_priority.is_default() {
            self.index.default_priority()
        } else {
            self.default_priority
        };
    }

    fn stamped(&self, mut config: CodecConfig) -> CodecConfig {
        config.codec_type = Some(self.index);
        config.priority = self.priority;
        config
    }

    /// Negotiated configuration
    #[must_use]
    pub fn codec_config(&self) -> CodecConfig {
        self.stamped(self.config)
    }

    /// Negotiated capability
    #[must_use]
    pub fn codec_capability(&self) -> CodecConfig {
        self.stamped(self.capability)
    }

    /// Local capability
    #[must_use]
    pub fn local_capability(&self) -> CodecConfig {
        self.stamped(self.local_capability)
    }

    /// Local capability intersected with the peer's
    #[must_use]
    pub fn selectable_capability(&self) -> CodecConfig {
        self.stamped(self.selectable_capability)
    }

    /// User override
    #[must_use]
    pub const fn user_config(&self) -> CodecConfig {
        self.user_config
    }

    /// Audio pipeline override
    #[must_use]
    pub const fn audio_config(&self) -> CodecConfig {
        self.audio_config
    }

    /// Negotiated wire configuration
    #[must_use]
    pub const fn ota_config(&self) -> &CodecInfo {
        &self.ota_config
    }

    /// Last peer capability element
    #[must_use]
    pub const fn ota_peer_capability(&self) -> &CodecInfo {
        &self.ota_peer_capability
    }

    /// Last peer configuration element
    #[must_use]
    pub const fn ota_peer_config(&self) -> &CodecInfo {
        &self.ota_peer_config
    }

    /// Peer parameters of the last user configuration
    #[must_use]
    pub const fn peer_params(&self) -> PeerParams {
        self.peer_params
    }

    /// Check if a snapshot carries no explicit setting
    #[must_use]
    pub fn is_codec_config_empty(config: &CodecConfig) -> bool {
        config.is_empty()
    }

    /// Negotiate against a peer capability or configuration
    ///
    /// Uses the current user and audio overrides. On success the negotiated
    /// snapshots and the wire configuration are replaced.
    ///
    /// # Errors
    /// Returns `InvalidCodecInfo` if the peer element is not a valid element
    /// of this codec and `NoCommonConfig` if no configuration fits both sides.
    pub fn set_codec_config(
        &mut self,
        peer_info: &[u8],
        is_capability: bool,
    ) -> Result<CodecInfo, CodecError> {
        let peer = CodecInfo::from_bytes(peer_info)?;
        let negotiated = self.caps.negotiate(
            peer_info,
            &Negotiation {
                user: &self.user_config,
                audio: &self.audio_config,
                peer_params: self.peer_params,
                is_capability,
            },
        )?;

        self.config = negotiated.config;
        self.capability = negotiated.capability;
        self.selectable_capability = negotiated.selectable;
        self.ota_config = negotiated.ota_config;
        if is_capability {
            self.ota_peer_capability = peer;
        } else {
            self.ota_peer_config = peer;
        }
        debug!(
            "[{}] Negotiated config {}",
            self.index.name(),
            self.ota_config
        );
        Ok(self.ota_config)
    }

    /// Apply user and audio overrides, then negotiate again
    ///
    /// `restart_input` is set when the audio format changed and
    /// `restart_output` when the wire configuration changed.
    ///
    /// # Errors
    /// Same as [`CodecDescriptor::set_codec_config`]. Every snapshot is
    /// rolled back on failure.
    pub fn set_codec_user_config(
        &mut self,
        user_config: &CodecConfig,
        audio_config: &CodecConfig,
        peer_params: PeerParams,
        peer_info: &[u8],
        is_capability: bool,
    ) -> Result<ConfigUpdate, CodecError> {
        let saved = self.clone();

        self.user_config = *user_config;
        self.audio_config = *audio_config;
        self.peer_params = peer_params;

        match self.set_codec_config(peer_info, is_capability) {
            Ok(codec_info) => {
                let restart_input = saved.config.audio_format_differs(&self.config);
                let restart_output = saved.ota_config != self.ota_config;
                Ok(ConfigUpdate {
                    codec_info,
                    restart_input,
                    restart_output,
                    config_updated: restart_input || restart_output,
                })
            }
            Err(e) => {
                warn!(
                    "[{}] User config rejected: {}, restoring previous state",
                    self.index.name(),
                    e
                );
                *self = saved;
                Err(e)
            }
        }
    }

    /// Record a peer capability element
    ///
    /// The selectable capability becomes the intersection of both sides; it
    /// is empty when they share nothing.
    ///
    /// # Errors
    /// Returns `InvalidCodecInfo` if the element is not a valid capability of
    /// this codec.
    pub fn set_peer_codec_capabilities(&mut self, peer_caps: &[u8]) -> Result<(), CodecError> {
        let peer = CodecInfo::from_bytes(peer_caps)?;
        let parsed = CodecVariant::parse(peer_caps, true).map_err(|_| CodecError::InvalidCodecInfo)?;
        if parsed.family() != self.caps.family() {
            return Err(CodecError::InvalidCodecInfo);
        }

        let empty = CodecConfig::default();
        self.selectable_capability = self
            .caps
            .negotiate(peer_caps, &Negotiation::plain(&empty, true))
            .map(|negotiated| negotiated.selectable)
            .unwrap_or_default();
        self.ota_peer_capability = peer;
        Ok(())
    }

    /// Bits per sample of the negotiated configuration
    #[must_use]
    pub fn audio_bits_per_sample(&self) -> Option<u8> {
        self.config.bits_per_sample.bits_per_sample()
    }

    /// Bit rate of the negotiated configuration
    ///
    /// LDAC and LHDC report the nominal rate of their selected quality mode.
    #[must_use]
    pub fn track_bit_rate(&self) -> Option<u32> {
        match self.caps {
            CodecVariant::Ldac(_) => ldac::quality_bit_rate(self.config.codec_specific_1),
            CodecVariant::Lhdc(_) => LhdcQuality::from_specific(self.config.codec_specific_1)
                .and_then(LhdcQuality::bit_rate)
                .or_else(|| codecs::track_bit_rate(self.ota_config.as_bytes())),
            _ => codecs::track_bit_rate(self.ota_config.as_bytes()),
        }
    }

    /// Copy of the negotiated wire configuration
    ///
    /// # Errors
    /// Returns `InvalidCodecInfo` if nothing valid has been negotiated yet.
    pub fn copy_out_ota_codec_config(&self) -> Result<CodecInfo, CodecError> {
        let valid = match self.role() {
            Role::Source => codecs::is_source_codec_valid(self.ota_config.as_bytes()),
            Role::Sink => codecs::is_sink_codec_valid(self.ota_config.as_bytes()),
        };
        if valid {
            Ok(self.ota_config)
        } else {
            Err(CodecError::InvalidCodecInfo)
        }
    }

    /// Offload structure of the negotiated configuration
    ///
    /// # Errors
    /// See [`encode_offload`].
    pub fn offload_codec_info(&self) -> Result<OffloadCodecInfo, OffloadError> {
        encode_offload(self.ota_config.as_bytes(), &self.config)
    }

    /// Write the descriptor state
    ///
    /// # Errors
    /// Propagates writer errors.
    pub fn debug_dump(&self, f: &mut impl Write) -> fmt::Result {
        writeln!(f, "\nA2DP Codec State: {}", self.name())?;
        writeln!(f, "  Priority: {}", self.priority.0)?;
        writeln!(f, "  Config: {}", self.codec_config())?;
        writeln!(f, "  Selectable: {}", self.selectable_capability())?;
        writeln!(f, "  Local capability: {}", self.local_capability())?;
        writeln!(f, "  OTA config: {:?}", self.ota_config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codecs::aac::AacInfo;
    use crate::codecs::sbc::SbcInfo;
    use crate::codecs::vendor::ldac::{LDAC_QUALITY_MID, LdacInfo};
    use crate::config::{BitsPerSample, ChannelMode, SampleRate};

    fn sbc_source() -> CodecDescriptor {
        CodecDescriptor::new(CodecIndex::SourceSbc, CodecPriority::DEFAULT, false)
    }

    #[test]
    fn test_default_priorities() {
        let descriptor = sbc_source();
        assert_eq!(descriptor.priority(), CodecPriority(1001));
        assert_eq!(descriptor.default_priority(), CodecPriority::DEFAULT);

        let mut descriptor =
            CodecDescriptor::new(CodecIndex::SourceAac, CodecPriority(5000), false);
        assert_eq!(descriptor.priority(), CodecPriority(5000));
        descriptor.set_codec_priority(CodecPriority(7000));
        assert_eq!(descriptor.priority(), CodecPriority(7000));
        descriptor.set_codec_priority(CodecPriority::DEFAULT);
        assert_eq!(descriptor.priority(), CodecPriority(5000));
    }

    #[test]
    fn test_set_codec_config() {
        let mut descriptor = sbc_source();
        let peer = SbcInfo::SINK_CAPS.build();
        let result = descriptor.set_codec_config(peer.as_bytes(), true).unwrap();

        assert_eq!(result, SbcInfo::DEFAULT_CONFIG.build());
        assert_eq!(descriptor.ota_config(), &result);
        assert_eq!(descriptor.ota_peer_capability(), &peer);
        let config = descriptor.codec_config();
        assert!(config.is_valid());
        assert_eq!(config.codec_type, Some(CodecIndex::SourceSbc));
        assert_eq!(config.priority, CodecPriority(1001));
        assert_eq!(descriptor.audio_bits_per_sample(), Some(16));
        assert!(descriptor.copy_out_ota_codec_config().is_ok());
    }

    #[test]
    fn test_set_codec_config_rejects_other_codec() {
        let mut descriptor = sbc_source();
        let aac = AacInfo::SINK_CAPS.build();
        assert_eq!(
            descriptor.set_codec_config(aac.as_bytes(), true),
            Err(CodecError::InvalidCodecInfo)
        );
        assert!(descriptor.ota_config().is_empty());
        assert_eq!(
            descriptor.copy_out_ota_codec_config(),
            Err(CodecError::InvalidCodecInfo)
        );
    }

    #[test]
    fn test_user_config_restarts() {
        let mut descriptor = CodecDescriptor::new(CodecIndex::SourceAac, CodecPriority::DEFAULT, false);
        let peer = AacInfo::SINK_CAPS.build();
        let empty = CodecConfig::default();
        descriptor.set_codec_config(peer.as_bytes(), true).unwrap();

        let user = CodecConfig {
            sample_rate: SampleRate(SampleRate::HZ_48000),
            ..CodecConfig::new(CodecIndex::SourceAac, CodecPriority::DEFAULT)
        };
        let update = descriptor
            .set_codec_user_config(&user, &empty, PeerParams::default(), peer.as_bytes(), true)
            .unwrap();
        assert!(update.restart_input);
        assert!(update.restart_output);
        assert!(update.config_updated);
        assert_eq!(
            descriptor.codec_config().sample_rate,
            SampleRate(SampleRate::HZ_48000)
        );

        // Same request again changes nothing
        let update = descriptor
            .set_codec_user_config(&user, &empty, PeerParams::default(), peer.as_bytes(), true)
            .unwrap();
        assert!(!update.restart_input);
        assert!(!update.restart_output);
        assert!(!update.config_updated);
        assert_eq!(update.codec_info, *descriptor.ota_config());
    }

    #[test]
    fn test_user_config_rollback() {
        let mut descriptor = sbc_source();
        let peer = SbcInfo::SINK_CAPS.build();
        descriptor.set_codec_config(peer.as_bytes(), true).unwrap();
        let before = descriptor.clone();

        let user = CodecConfig {
            channel_mode: ChannelMode(ChannelMode::MONO),
            ..CodecConfig::default()
        };
        let garbage = [3, 0, 0x00, 0xFF];
        assert!(
            descriptor
                .set_codec_user_config(
                    &user,
                    &CodecConfig::default(),
                    PeerParams::with_mtu(895),
                    &garbage,
                    false,
                )
                .is_err()
        );
        assert_eq!(descriptor.user_config(), before.user_config());
        assert_eq!(descriptor.peer_params(), before.peer_params());
        assert_eq!(descriptor.codec_config(), before.codec_config());
        assert_eq!(descriptor.ota_config(), before.ota_config());
    }

    #[test]
    fn test_peer_capabilities() {
        let mut descriptor = CodecDescriptor::new(CodecIndex::SourceLdac, CodecPriority::DEFAULT, false);
        let mut peer = LdacInfo::SOURCE_CAPS;
        peer.sampling_frequency = LdacInfo::FREQ_96000;
        descriptor
            .set_peer_codec_capabilities(peer.build().as_bytes())
            .unwrap();
        let selectable = descriptor.selectable_capability();
        assert_eq!(selectable.sample_rate, SampleRate(SampleRate::HZ_96000));
        assert_eq!(selectable.codec_type, Some(CodecIndex::SourceLdac));

        let sbc = SbcInfo::SINK_CAPS.build();
        assert_eq!(
            descriptor.set_peer_codec_capabilities(sbc.as_bytes()),
            Err(CodecError::InvalidCodecInfo)
        );
    }

    #[test]
    fn test_ldac_track_bit_rate() {
        let mut descriptor = CodecDescriptor::new(CodecIndex::SourceLdac, CodecPriority::DEFAULT, false);
        let peer = LdacInfo::SINK_CAPS.build();
        descriptor.set_codec_config(peer.as_bytes(), true).unwrap();
        assert_eq!(descriptor.track_bit_rate(), None);
        assert_eq!(descriptor.audio_bits_per_sample(), Some(32));

        let user = CodecConfig {
            codec_specific_1: LDAC_QUALITY_MID,
            ..CodecConfig::default()
        };
        descriptor
            .set_codec_user_config(
                &user,
                &CodecConfig::default(),
                PeerParams::default(),
                peer.as_bytes(),
                true,
            )
            .unwrap();
        assert_eq!(descriptor.track_bit_rate(), Some(660_000));
    }

    #[test]
    fn test_debug_dump() {
        let mut descriptor = sbc_source();
        descriptor
            .set_codec_config(SbcInfo::SINK_CAPS.build().as_bytes(), true)
            .unwrap();
        let mut out = heapless::String::<512>::new();
        descriptor.debug_dump(&mut out).unwrap();
        assert!(out.contains("A2DP Codec State: SBC"));
        assert!(out.contains("Priority: 1001"));
        assert!(out.contains("Config: Rate=44100 Bits=16 Mode=STEREO"));
        let bits = BitsPerSample(BitsPerSample::BITS_16);
        assert_eq!(descriptor.codec_capability().bits_per_sample, bits);
    }
}
