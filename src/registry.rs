//! Codec registry
//!
//! Owns one [`CodecDescriptor`] per codec implementation, keeps the source and
//! sink codecs ordered by priority and tracks the codec currently streaming.
//!
//! Every public operation takes the registry lock exactly once and runs to
//! completion on the locked state, so composite operations (user
//! configuration, OTA configuration) are never interleaved across callers.
//! Descriptors are addressed by [`CodecIndex`]: the ordered lists and the
//! current codec are keys into the owning map.
//!
//! ## Usage
//!
//! ```rust
//! use birdsong::codecs::sbc::SbcInfo;
//! use birdsong::{CodecIndex, CodecRegistry, RegistryOptions};
//! use embassy_sync::blocking_mutex::raw::NoopRawMutex;
//!
//! let registry = CodecRegistry::<NoopRawMutex>::new(RegistryOptions::default());
//! registry.init().unwrap();
//!
//! let peer = SbcInfo::SINK_CAPS.build();
//! registry.set_peer_sink_codec_capabilities(peer.as_bytes()).unwrap();
//! registry.set_codec_config(peer.as_bytes(), true, true).unwrap();
//! assert_eq!(registry.current_codec(), Some(CodecIndex::SourceSbc));
//! ```

use core::cell::RefCell;
use core::fmt::{self, Write};

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::{CriticalSectionRawMutex, RawMutex};
use heapless::{FnvIndexMap, Vec};

use crate::codec_info::CodecInfo;
use crate::codecs::vendor::lhdc::LhdcInfo;
use crate::codecs::{
    CodecFamily, codec_name, is_peer_sink_codec_valid, is_peer_source_codec_valid,
    sink_codec_index, source_codec_index,
};
use crate::config::{CodecConfig, CodecPriority, FlagSet, PeerParams, RegistryOptions};
use crate::constants::MAX_CODECS;
use crate::descriptor::{CodecDescriptor, ConfigUpdate};
use crate::offload::OffloadCodecInfo;
use crate::{CodecError, CodecIndex, OffloadError, Role};

/// LHDC extended API: first get-specifics request version
pub const LHDC_GET_SPECIFICS_V1: u32 = 0x0100_0000;
/// LHDC extended API: get-specifics request version with capability metadata
pub const LHDC_GET_SPECIFICS_V2: u32 = 0x0200_0000;
/// LHDC extended API: get-specifics function code
pub const LHDC_FUNC_GET_SPECIFICS: u32 = 0x0A01_0001;

/// Get-specifics target: negotiated configuration
pub const LHDC_SPECIFICS_FINAL_CONFIG: u8 = 0x01;
/// Get-specifics target: negotiated capability
pub const LHDC_SPECIFICS_FINAL_CAPABILITY: u8 = 0x02;
/// Get-specifics target: local capability
pub const LHDC_SPECIFICS_LOCAL_CAPABILITY: u8 = 0x03;
/// Get-specifics target: selectable capability
pub const LHDC_SPECIFICS_SELECTABLE_CAPABILITY: u8 = 0x04;
/// Get-specifics target: user configuration
pub const LHDC_SPECIFICS_USER_CONFIG: u8 = 0x05;
/// Get-specifics target: audio configuration
pub const LHDC_SPECIFICS_AUDIO_CONFIG: u8 = 0x06;

const SPECIFICS_VERSION_HEAD: usize = 0;
const SPECIFICS_FUNC_CODE_HEAD: usize = 4;
const SPECIFICS_TARGET_HEAD: usize = 8;
const SPECIFICS_VALUES_HEAD: usize = 9;
const SPECIFICS_VALUE_SIZE: usize = 8;
const SPECIFICS_CAP_META_HEAD: usize = SPECIFICS_VALUES_HEAD + 4 * SPECIFICS_VALUE_SIZE;

/// Size of a V1 get-specifics reply
pub const LHDC_GET_SPECIFICS_V1_SIZE: usize = SPECIFICS_CAP_META_HEAD;
/// Size of a V2 get-specifics reply
pub const LHDC_GET_SPECIFICS_V2_SIZE: usize = SPECIFICS_CAP_META_HEAD + 2;

/// Current configuration and per-codec capabilities, as reported to the session layer
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CodecConfigAndCapabilities {
    /// Configuration of the current codec (empty if none)
    pub config: CodecConfig,
    /// Local capability of every enabled source codec, in priority order
    pub local_capabilities: Vec<CodecConfig, MAX_CODECS>,
    /// Peer-intersected capabilities that carry a rate, a depth and a channel mode
    pub selectable_capabilities: Vec<CodecConfig, MAX_CODECS>,
}

struct RegistryState {
    options: RegistryOptions,
    indexed: FnvIndexMap<CodecIndex, CodecDescriptor, MAX_CODECS>,
    disabled: FnvIndexMap<CodecIndex, CodecDescriptor, MAX_CODECS>,
    ordered_source: Vec<CodecIndex, MAX_CODECS>,
    ordered_sink: Vec<CodecIndex, MAX_CODECS>,
    current: Option<CodecIndex>,
    offload_codecs: Vec<CodecIndex, MAX_CODECS>,
}

/// Offload capability token and the source codec it enables
const OFFLOAD_TOKENS: [(&str, Option<CodecIndex>); 8] = [
    ("sbc", Some(CodecIndex::SourceSbc)),
    ("aac", Some(CodecIndex::SourceAac)),
    ("aptx", Some(CodecIndex::SourceAptx)),
    ("aptxhd", Some(CodecIndex::SourceAptxHd)),
    ("ldac", Some(CodecIndex::SourceLdac)),
    // LHDC is never offloaded
    ("lhdcv2", None),
    ("lhdcv3", None),
    ("lhdcv5", None),
];

impl RegistryState {
    fn new(options: RegistryOptions) -> Self {
        Self {
            options,
            indexed: FnvIndexMap::new(),
            disabled: FnvIndexMap::new(),
            ordered_source: Vec::new(),
            ordered_sink: Vec::new(),
            current: None,
            offload_codecs: Vec::new(),
        }
    }

    fn init(&mut self) -> Result<(), CodecError> {
        info!("[REGISTRY] Initializing codecs");
        self.indexed.clear();
        self.disabled.clear();
        self.ordered_source.clear();
        self.ordered_sink.clear();
        self.current = None;
        self.offload_codecs.clear();

        if self.options.offload_enabled() {
            self.parse_offload_capabilities()?;
        }

        for index in CodecIndex::ALL {
            let mut priority = self.options.priority_for(index);

            if index == CodecIndex::SourceOpus && !self.options.opus_enabled {
                priority = CodecPriority::DISABLED;
                info!("[REGISTRY] Opus disabled");
            }
            if !self.options.vendor_codecs_enabled && CodecFamily::of_index(index) != CodecFamily::Sbc {
                priority = CodecPriority::DISABLED;
            }

            let descriptor = CodecDescriptor::new(index, priority, self.options.aac_vbr_enabled);
            if !priority.is_default() {
                info!("[REGISTRY] {} priority set to {}", index.name(), priority.0);
            }

            if descriptor.priority().is_disabled() {
                self.disabled
                    .insert(index, descriptor)
                    .map_err(|_| CodecError::CapacityExceeded)?;
                continue;
            }

            self.indexed
                .insert(index, descriptor)
                .map_err(|_| CodecError::CapacityExceeded)?;
            let ordered = match index.role() {
                Role::Source => &mut self.ordered_source,
                Role::Sink => &mut self.ordered_sink,
            };
            ordered.push(index).map_err(|_| CodecError::CapacityExceeded)?;
        }
        self.sort_ordered();

        if self.ordered_source.is_empty() {
            error!("[REGISTRY] No source codecs were initialized");
        }
        for index in &self.ordered_source {
            info!("[REGISTRY] Initialized source codec {}", index.name());
        }
        if self.ordered_sink.is_empty() {
            error!("[REGISTRY] No sink codecs were initialized");
        }
        for index in &self.ordered_sink {
            info!("[REGISTRY] Initialized sink codec {}", index.name());
        }

        if self.ordered_source.is_empty() || self.ordered_sink.is_empty() {
            return Err(CodecError::UnsupportedCodec);
        }
        Ok(())
    }

    fn parse_offload_capabilities(&mut self) -> Result<(), CodecError> {
        for token in self.options.offload_capabilities.split('-') {
            let Some(&(name, index)) = OFFLOAD_TOKENS.iter().find(|(name, _)| *name == token) else {
                continue;
            };
            match index {
                Some(index)
                    if index == CodecIndex::SourceSbc || self.options.vendor_codecs_enabled =>
                {
                    info!("[REGISTRY] {} offload supported", index.name());
                    if !self.offload_codecs.contains(&index) {
                        self.offload_codecs
                            .push(index)
                            .map_err(|_| CodecError::CapacityExceeded)?;
                    }
                }
                Some(_) => {}
                None => info!("[REGISTRY] {} offload not supported", name),
            }
        }
        Ok(())
    }

    /// Re-sort both lists: higher priority first, then higher index first
    fn sort_ordered(&mut self) {
        let indexed = &self.indexed;
        let key = |index: &CodecIndex| (indexed.get(index).map(CodecDescriptor::priority), *index);
        self.ordered_source.sort_unstable_by(|a, b| key(b).cmp(&key(a)));
        self.ordered_sink.sort_unstable_by(|a, b| key(b).cmp(&key(a)));
    }

    fn descriptor_mut(&mut self, index: CodecIndex) -> Result<&mut CodecDescriptor, CodecError> {
        self.indexed.get_mut(&index).ok_or(CodecError::UnsupportedCodec)
    }

    fn find_source(&self, info: &[u8]) -> Option<CodecIndex> {
        source_codec_index(info).filter(|index| self.indexed.contains_key(index))
    }

    fn find_sink(&self, info: &[u8]) -> Option<CodecIndex> {
        sink_codec_index(info).filter(|index| self.indexed.contains_key(index))
    }

    fn set_codec_config(
        &mut self,
        index: Option<CodecIndex>,
        peer_info: &[u8],
        is_capability: bool,
        select_current: bool,
    ) -> Result<CodecInfo, CodecError> {
        let index = index.ok_or(CodecError::UnsupportedCodec)?;
        let result = self
            .descriptor_mut(index)?
            .set_codec_config(peer_info, is_capability)?;
        if select_current {
            self.current = Some(index);
        }
        Ok(result)
    }

    fn set_codec_user_config(
        &mut self,
        user_config: &CodecConfig,
        peer_params: PeerParams,
        peer_sink_capabilities: &[u8],
    ) -> Result<ConfigUpdate, CodecError> {
        info!("[REGISTRY] Configuring {}", user_config);
        let last = self.current;
        let target = match user_config.codec_type {
            Some(index) => index,
            None => last.ok_or(CodecError::NoCurrentCodec)?,
        };

        let descriptor = self.descriptor_mut(target)?;
        let audio_config = descriptor.audio_config();
        let mut update = descriptor.set_codec_user_config(
            user_config,
            &audio_config,
            peer_params,
            peer_sink_capabilities,
            true,
        )?;

        let old_priority = descriptor.priority();
        descriptor.set_codec_priority(user_config.priority);
        let new_priority = descriptor.priority();

        match last {
            None => {
                self.current = Some(target);
                update.restart_input = true;
                update.restart_output = true;
            }
            Some(last) if last == target => {
                if old_priority != new_priority {
                    update.config_updated = true;
                    // A lower-priority active codec must yield
                    if new_priority < old_priority {
                        update.restart_output = true;
                    }
                }
            }
            Some(_) if new_priority <= old_priority => {
                // A backup codec never disturbs the active stream
                if update.restart_input || update.restart_output || old_priority != new_priority {
                    update.config_updated = true;
                }
                update.restart_input = false;
                update.restart_output = false;
            }
            Some(last) => {
                update.config_updated = true;
                let last_priority = self
                    .indexed
                    .get(&last)
                    .map_or(CodecPriority::DISABLED, CodecDescriptor::priority);
                if new_priority >= last_priority {
                    info!(
                        "[REGISTRY] Switching from {} to {}",
                        last.name(),
                        target.name()
                    );
                    self.current = Some(target);
                    if let Some(previous) = self.indexed.get_mut(&last) {
                        previous.set_default_priority();
                    }
                    update.restart_input = true;
                    update.restart_output = true;
                }
            }
        }
        self.sort_ordered();

        if update.restart_input || update.restart_output {
            update.config_updated = true;
        }
        info!(
            "[REGISTRY] Configured: restart input {} restart output {} updated {}",
            update.restart_input,
            update.restart_output,
            update.config_updated
        );
        Ok(update)
    }

    fn set_codec_audio_config(
        &mut self,
        audio_config: &CodecConfig,
        peer_params: PeerParams,
        peer_sink_capabilities: &[u8],
    ) -> Result<ConfigUpdate, CodecError> {
        let current = self.current.ok_or(CodecError::NoCurrentCodec)?;
        let descriptor = self.descriptor_mut(current)?;
        let user_config = descriptor.user_config();
        let update = descriptor.set_codec_user_config(
            &user_config,
            audio_config,
            peer_params,
            peer_sink_capabilities,
            true,
        )?;
        // The input path was just restarted by whoever changed the audio config
        Ok(ConfigUpdate {
            restart_input: false,
            ..update
        })
    }

    fn set_codec_ota_config(
        &mut self,
        ota_config: &[u8],
        peer_params: PeerParams,
    ) -> Result<ConfigUpdate, CodecError> {
        if let Some(current) = self.current.and_then(|index| self.indexed.get(&index)) {
            if !CodecDescriptor::is_codec_config_empty(&current.user_config()) {
                warn!(
                    "[REGISTRY] Ignoring peer OTA configuration for {}: user configuration for current codec {}",
                    codec_name(ota_config),
                    current.name()
                );
                return Err(CodecError::UserConfigOverride);
            }
        }

        let Some(target) = source_codec_index(ota_config) else {
            warn!("[REGISTRY] Ignoring peer OTA configuration: invalid codec");
            return Err(CodecError::InvalidCodecInfo);
        };
        let Some(descriptor) = self.indexed.get_mut(&target) else {
            warn!(
                "[REGISTRY] No codec for peer OTA configuration {}",
                codec_name(ota_config)
            );
            return Err(CodecError::UnsupportedCodec);
        };
        let user_config = descriptor.user_config();
        if !CodecDescriptor::is_codec_config_empty(&user_config) {
            warn!(
                "[REGISTRY] Ignoring peer OTA configuration for {}: user configuration for same codec",
                codec_name(ota_config)
            );
            return Err(CodecError::UserConfigOverride);
        }

        let audio_config = descriptor.audio_config();
        let mut update = descriptor
            .set_codec_user_config(&user_config, &audio_config, peer_params, ota_config, false)
            .inspect_err(|_| {
                warn!(
                    "[REGISTRY] Cannot set configuration for peer OTA codec {}",
                    codec_name(ota_config)
                );
            })?;
        self.current = Some(target);

        if update.restart_input || update.restart_output {
            update.config_updated = true;
        }
        Ok(update)
    }

    fn codec_config_and_capabilities(&self) -> CodecConfigAndCapabilities {
        let mut result = CodecConfigAndCapabilities {
            config: self
                .current
                .and_then(|index| self.indexed.get(&index))
                .map(CodecDescriptor::codec_config)
                .unwrap_or_default(),
            ..CodecConfigAndCapabilities::default()
        };

        for descriptor in self.ordered_source.iter().filter_map(|i| self.indexed.get(i)) {
            result
                .local_capabilities
                .push(descriptor.local_capability())
                .ok();

            let selectable = descriptor.selectable_capability();
            if selectable.sample_rate.is_none()
                || selectable.bits_per_sample.is_none()
                || selectable.channel_mode.is_none()
            {
                continue;
            }
            result.selectable_capabilities.push(selectable).ok();
        }
        result
    }

    fn lhdc_codec_specifics(&self, request: &mut [u8]) -> Result<usize, CodecError> {
        let current = self.current.ok_or(CodecError::NoCurrentCodec)?;
        if !matches!(current, CodecIndex::SourceLhdcV3 | CodecIndex::SourceLhdcV5) {
            debug!("[REGISTRY] {} has no extended API", current.name());
            return Err(CodecError::UnsupportedCodec);
        }
        let descriptor = self.indexed.get(&current).ok_or(CodecError::NoCurrentCodec)?;

        if request.len() < SPECIFICS_VALUES_HEAD {
            error!("[LHDC] Request too small: {}", request.len());
            return Err(CodecError::InvalidCodecInfo);
        }
        let word = |head: usize| {
            u32::from_be_bytes([
                request[head],
                request[head + 1],
                request[head + 2],
                request[head + 3],
            ])
        };
        let version = word(SPECIFICS_VERSION_HEAD);
        let func_code = word(SPECIFICS_FUNC_CODE_HEAD);
        if func_code != LHDC_FUNC_GET_SPECIFICS {
            debug!("[LHDC] Invalid function code 0x{:X}", func_code);
            return Err(CodecError::UnsupportedCodec);
        }

        let config = match request[SPECIFICS_TARGET_HEAD] {
            LHDC_SPECIFICS_FINAL_CONFIG => descriptor.codec_config(),
            LHDC_SPECIFICS_FINAL_CAPABILITY => descriptor.codec_capability(),
            LHDC_SPECIFICS_LOCAL_CAPABILITY => descriptor.local_capability(),
            LHDC_SPECIFICS_SELECTABLE_CAPABILITY => descriptor.selectable_capability(),
            LHDC_SPECIFICS_USER_CONFIG => descriptor.user_config(),
            LHDC_SPECIFICS_AUDIO_CONFIG => descriptor.audio_config(),
            other => {
                error!("[LHDC] Unknown target 0x{:X}", other);
                return Err(CodecError::InvalidCodecInfo);
            }
        };

        let size = match version {
            LHDC_GET_SPECIFICS_V1 => LHDC_GET_SPECIFICS_V1_SIZE,
            LHDC_GET_SPECIFICS_V2 => LHDC_GET_SPECIFICS_V2_SIZE,
            _ => {
                debug!("[LHDC] Invalid function version 0x{:X}", version);
                return Err(CodecError::UnsupportedCodec);
            }
        };
        if request.len() < size {
            error!("[LHDC] Payload too small: {}", request.len());
            return Err(CodecError::InvalidCodecInfo);
        }

        let specifics = [
            config.codec_specific_1,
            config.codec_specific_2,
            config.codec_specific_3,
            config.codec_specific_4,
        ];
        let values = request[SPECIFICS_VALUES_HEAD..SPECIFICS_CAP_META_HEAD]
            .chunks_exact_mut(SPECIFICS_VALUE_SIZE);
        for (chunk, value) in values.zip(specifics) {
            chunk.copy_from_slice(&value.to_be_bytes());
        }

        if version == LHDC_GET_SPECIFICS_V2 {
            let features = LhdcInfo::V3_CAPS.features.0.to_be_bytes();
            request[SPECIFICS_CAP_META_HEAD..size].copy_from_slice(&features);
        }
        Ok(size)
    }

    fn debug_dump(&self, f: &mut impl Write) -> fmt::Result {
        write!(f, "\nA2DP Codecs State:\n")?;
        match self.current {
            Some(index) => writeln!(f, "  Current Codec: {}", index.name())?,
            None => writeln!(f, "  Current Codec: None")?,
        }
        for descriptor in self.ordered_source.iter().filter_map(|i| self.indexed.get(i)) {
            descriptor.debug_dump(f)?;
        }
        Ok(())
    }
}

/// Registry of every codec implementation of one audio session
///
/// Generic over the raw mutex guarding its state; the default
/// [`CriticalSectionRawMutex`] makes the registry shareable between
/// execution contexts.
pub struct CodecRegistry<M: RawMutex = CriticalSectionRawMutex> {
    state: Mutex<M, RefCell<RegistryState>>,
}

impl<M: RawMutex> CodecRegistry<M> {
    /// Create an empty registry; call [`Self::init`] before use
    #[must_use]
    pub fn new(options: RegistryOptions) -> Self {
        Self {
            state: Mutex::new(RefCell::new(RegistryState::new(options))),
        }
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut RegistryState) -> R) -> R {
        self.state.lock(|state| f(&mut state.borrow_mut()))
    }

    /// Create every codec descriptor and sort the source and sink lists
    ///
    /// Codecs whose priority ends up [`CodecPriority::DISABLED`] (explicitly,
    /// Opus when not enabled, or any codec but SBC when vendor codecs are
    /// disabled) are kept aside and never negotiated. Calling `init` again
    /// starts over from the options.
    ///
    /// # Errors
    /// Returns `UnsupportedCodec` if no source or no sink codec is enabled.
    pub fn init(&self) -> Result<(), CodecError> {
        self.with_state(RegistryState::init)
    }

    /// Enabled source codec handling an element
    #[must_use]
    pub fn find_source_codec_config(&self, codec_info: &[u8]) -> Option<CodecIndex> {
        self.with_state(|state| state.find_source(codec_info))
    }

    /// Enabled sink codec handling an element
    #[must_use]
    pub fn find_sink_codec_config(&self, codec_info: &[u8]) -> Option<CodecIndex> {
        self.with_state(|state| state.find_sink(codec_info))
    }

    /// Check if a codec is enabled
    #[must_use]
    pub fn is_supported_codec(&self, index: CodecIndex) -> bool {
        self.with_state(|state| state.indexed.contains_key(&index))
    }

    /// Negotiate the source codec matching a peer element
    ///
    /// # Errors
    /// Returns `UnsupportedCodec` if no enabled source codec handles the
    /// element, or the negotiation error of the codec.
    pub fn set_codec_config(
        &self,
        peer_info: &[u8],
        is_capability: bool,
        select_current: bool,
    ) -> Result<CodecInfo, CodecError> {
        self.with_state(|state| {
            let index = state.find_source(peer_info);
            state.set_codec_config(index, peer_info, is_capability, select_current)
        })
    }

    /// Negotiate the sink codec matching a peer element
    ///
    /// # Errors
    /// Returns `UnsupportedCodec` if no enabled sink codec handles the
    /// element, or the negotiation error of the codec.
    pub fn set_sink_codec_config(
        &self,
        peer_info: &[u8],
        is_capability: bool,
        select_current: bool,
    ) -> Result<CodecInfo, CodecError> {
        self.with_state(|state| {
            let index = state.find_sink(peer_info);
            state.set_codec_config(index, peer_info, is_capability, select_current)
        })
    }

    /// Apply a user configuration and reconcile codec priorities
    ///
    /// The target is `user_config.codec_type`, or the current codec when the
    /// type is unset. The new priority decides whether the target takes over
    /// the stream:
    /// - no current codec: the target becomes current, both paths restart
    /// - target is current: a priority change updates the configuration, a
    ///   decrease also restarts the output
    /// - target is a backup and its priority did not rise: nothing restarts
    /// - target is a backup and its priority rose to at least the current
    ///   codec's: the target becomes current, the old codec's priority goes
    ///   back to its default and both paths restart
    ///
    /// # Errors
    /// Returns `NoCurrentCodec` if no target resolves, `UnsupportedCodec` if
    /// the target is not enabled, or the negotiation error of the target. The
    /// current codec is unchanged on error.
    pub fn set_codec_user_config(
        &self,
        user_config: &CodecConfig,
        peer_params: PeerParams,
        peer_sink_capabilities: &[u8],
    ) -> Result<ConfigUpdate, CodecError> {
        self.with_state(|state| {
            state.set_codec_user_config(user_config, peer_params, peer_sink_capabilities)
        })
    }

    /// Apply an audio pipeline configuration to the current codec
    ///
    /// Never changes the codec selection and never requests an input restart.
    ///
    /// # Errors
    /// Returns `NoCurrentCodec` if no codec is current, or the negotiation
    /// error of the current codec.
    pub fn set_codec_audio_config(
        &self,
        audio_config: &CodecConfig,
        peer_params: PeerParams,
        peer_sink_capabilities: &[u8],
    ) -> Result<ConfigUpdate, CodecError> {
        self.with_state(|state| {
            state.set_codec_audio_config(audio_config, peer_params, peer_sink_capabilities)
        })
    }

    /// Apply a configuration chosen by the peer
    ///
    /// The matching codec becomes current.
    ///
    /// # Errors
    /// Returns `UserConfigOverride` if the current codec or the matching
    /// codec carries a user configuration, `InvalidCodecInfo` or
    /// `UnsupportedCodec` if no enabled source codec handles the element, or
    /// the negotiation error of the codec. The current codec is unchanged on
    /// error.
    pub fn set_codec_ota_config(
        &self,
        ota_config: &[u8],
        peer_params: PeerParams,
    ) -> Result<ConfigUpdate, CodecError> {
        self.with_state(|state| state.set_codec_ota_config(ota_config, peer_params))
    }

    /// Record the capabilities of a peer sink
    ///
    /// # Errors
    /// Returns `InvalidCodecInfo` if the element is not a valid peer sink
    /// element, or `UnsupportedCodec` if no enabled source codec handles it.
    pub fn set_peer_sink_codec_capabilities(&self, capabilities: &[u8]) -> Result<(), CodecError> {
        if !is_peer_sink_codec_valid(capabilities) {
            return Err(CodecError::InvalidCodecInfo);
        }
        self.with_state(|state| {
            let index = state.find_source(capabilities).ok_or(CodecError::UnsupportedCodec)?;
            state.descriptor_mut(index)?.set_peer_codec_capabilities(capabilities)
        })
    }

    /// Record the capabilities of a peer source
    ///
    /// # Errors
    /// Returns `InvalidCodecInfo` if the element is not a valid peer source
    /// element, or `UnsupportedCodec` if no enabled sink codec handles it.
    pub fn set_peer_source_codec_capabilities(
        &self,
        capabilities: &[u8],
    ) -> Result<(), CodecError> {
        if !is_peer_source_codec_valid(capabilities) {
            return Err(CodecError::InvalidCodecInfo);
        }
        self.with_state(|state| {
            let index = state.find_sink(capabilities).ok_or(CodecError::UnsupportedCodec)?;
            state.descriptor_mut(index)?.set_peer_codec_capabilities(capabilities)
        })
    }

    /// Current configuration with local and selectable source capabilities
    #[must_use]
    pub fn codec_config_and_capabilities(&self) -> CodecConfigAndCapabilities {
        self.with_state(|state| state.codec_config_and_capabilities())
    }

    /// Codec currently streaming
    #[must_use]
    pub fn current_codec(&self) -> Option<CodecIndex> {
        self.with_state(|state| state.current)
    }

    /// Enabled source codecs, highest priority first
    #[must_use]
    pub fn ordered_source_codecs(&self) -> Vec<CodecIndex, MAX_CODECS> {
        self.with_state(|state| state.ordered_source.clone())
    }

    /// Enabled sink codecs, highest priority first
    #[must_use]
    pub fn ordered_sink_codecs(&self) -> Vec<CodecIndex, MAX_CODECS> {
        self.with_state(|state| state.ordered_sink.clone())
    }

    /// Run `f` on an enabled or disabled descriptor
    ///
    /// `f` runs under the registry lock and must not call back into the
    /// registry.
    ///
    /// # Panics
    ///
    /// The registry is not re-entrant. This function panics if `f` calls any
    /// method of the same registry, since the state is already borrowed.
    pub fn with_descriptor<R>(
        &self,
        index: CodecIndex,
        f: impl FnOnce(&CodecDescriptor) -> R,
    ) -> Option<R> {
        self.with_state(|state| {
            state
                .indexed
                .get(&index)
                .or_else(|| state.disabled.get(&index))
                .map(f)
        })
    }

    /// Check if a source codec can be encoded by offload hardware
    #[must_use]
    pub fn is_offload_supported(&self, index: CodecIndex) -> bool {
        self.with_state(|state| {
            state.options.offload_enabled() && state.offload_codecs.contains(&index)
        })
    }

    /// Offload structure of the current codec
    ///
    /// # Errors
    /// Returns `InvalidConfig` if no codec is current, or the offload error
    /// of the current configuration.
    pub fn current_offload_codec_info(&self) -> Result<OffloadCodecInfo, OffloadError> {
        self.with_state(|state| {
            state
                .current
                .and_then(|index| state.indexed.get(&index))
                .ok_or(OffloadError::InvalidConfig)?
                .offload_codec_info()
        })
    }

    /// Answer an LHDC extended get-specifics request in place
    ///
    /// The request carries a big-endian version at `[0..4]`, a big-endian
    /// function code at `[4..8]` and the snapshot selector at `[8]`. The
    /// reply writes `codec_specific_1..4` of that snapshot as big-endian
    /// 64-bit values from byte 9; version 2 appends the local LHDC V3 feature
    /// flags. Only available while LHDC V3 or V5 is current.
    ///
    /// Returns the number of bytes written.
    ///
    /// # Errors
    /// Returns `NoCurrentCodec` or `UnsupportedCodec` if the current codec
    /// has no extended API or the version or function code are unknown, and
    /// `InvalidCodecInfo` if the request is too small or selects an unknown
    /// snapshot.
    pub fn lhdc_codec_specifics(&self, request: &mut [u8]) -> Result<usize, CodecError> {
        self.with_state(|state| state.lhdc_codec_specifics(request))
    }

    /// Write the state of the registry and every source codec
    ///
    /// # Errors
    /// Returns the error of the writer.
    pub fn debug_dump(&self, f: &mut impl Write) -> fmt::Result {
        self.with_state(|state| state.debug_dump(f))
    }
}
