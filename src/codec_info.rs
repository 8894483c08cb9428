//! Media codec information element buffer
//!
//! Every codec configuration crosses the wire as a fixed-size buffer:
//!
//! ```text
//! [0]      LOSC (length of service capability, counts bytes 1..=LOSC)
//! [1]      media type (upper nibble)
//! [2]      codec type tag
//! [3..]    codec-specific parameters
//! ```
//!
//! Vendor codecs additionally carry a little-endian 32-bit vendor ID at
//! `[3..7]` and a little-endian 16-bit codec ID at `[7..9]`.

use crate::CodecError;
use crate::constants::{
    A2DP_MEDIA_CT_NON_A2DP, AVDT_CODEC_SIZE, AVDT_CODEC_TYPE_INDEX, AVDT_LOSC_INDEX,
    AVDT_MEDIA_TYPE_AUDIO, AVDT_MEDIA_TYPE_INDEX, VENDOR_CODEC_ID_START_IDX,
    VENDOR_ID_START_IDX,
};

/// Owned media codec information element
#[derive(Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CodecInfo([u8; AVDT_CODEC_SIZE]);

impl CodecInfo {
    /// Create an all-zero buffer
    #[must_use]
    pub const fn new() -> Self {
        Self([0; AVDT_CODEC_SIZE])
    }

    /// Create a buffer with the common header filled in
    #[must_use]
    pub const fn with_header(losc: u8, codec_type: u8) -> Self {
        let mut bytes = [0; AVDT_CODEC_SIZE];
        bytes[AVDT_LOSC_INDEX] = losc;
        bytes[AVDT_MEDIA_TYPE_INDEX] = AVDT_MEDIA_TYPE_AUDIO << 4;
        bytes[AVDT_CODEC_TYPE_INDEX] = codec_type;
        Self(bytes)
    }

    /// Create a vendor codec buffer with the vendor and codec IDs filled in
    #[must_use]
    pub const fn with_vendor_header(losc: u8, vendor_id: u32, codec_id: u16) -> Self {
        let mut info = Self::with_header(losc, A2DP_MEDIA_CT_NON_A2DP);
        let vendor = vendor_id.to_le_bytes();
        let codec = codec_id.to_le_bytes();
        info.0[VENDOR_ID_START_IDX] = vendor[0];
        info.0[VENDOR_ID_START_IDX + 1] = vendor[1];
        info.0[VENDOR_ID_START_IDX + 2] = vendor[2];
        info.0[VENDOR_ID_START_IDX + 3] = vendor[3];
        info.0[VENDOR_CODEC_ID_START_IDX] = codec[0];
        info.0[VENDOR_CODEC_ID_START_IDX + 1] = codec[1];
        info
    }

    /// Copy a raw buffer
    ///
    /// Bytes beyond the declared LOSC are copied as well, up to the buffer size.
    ///
    /// # Errors
    /// Returns `InvalidCodecInfo` if the buffer is shorter than its header or
    /// declares a LOSC that does not fit.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        if bytes.len() <= AVDT_CODEC_TYPE_INDEX {
            return Err(CodecError::InvalidCodecInfo);
        }
        let losc = usize::from(bytes[AVDT_LOSC_INDEX]);
        if losc + 1 > bytes.len().min(AVDT_CODEC_SIZE) {
            return Err(CodecError::InvalidCodecInfo);
        }
        let mut info = Self::new();
        let len = bytes.len().min(AVDT_CODEC_SIZE);
        info.0[..len].copy_from_slice(&bytes[..len]);
        Ok(info)
    }

    /// Get the raw bytes
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; AVDT_CODEC_SIZE] {
        &self.0
    }

    /// Get the raw bytes for in-place adjustment
    pub fn as_bytes_mut(&mut self) -> &mut [u8; AVDT_CODEC_SIZE] {
        &mut self.0
    }

    /// Length Of Service Capability
    #[must_use]
    pub const fn losc(&self) -> u8 {
        self.0[AVDT_LOSC_INDEX]
    }

    /// Media type (upper nibble of byte 1)
    #[must_use]
    pub const fn media_type(&self) -> u8 {
        (self.0[AVDT_MEDIA_TYPE_INDEX] >> 4) & 0x0F
    }

    /// Codec type tag
    #[must_use]
    pub const fn codec_type(&self) -> u8 {
        self.0[AVDT_CODEC_TYPE_INDEX]
    }

    /// Check if no byte has been written
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }
}

impl AsRef<[u8]> for CodecInfo {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl core::fmt::Debug for CodecInfo {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let len = (usize::from(self.losc()) + 1).min(AVDT_CODEC_SIZE);
        write!(f, "CodecInfo[")?;
        for (i, byte) in self.0[..len].iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{byte:02X}")?;
        }
        write!(f, "]")
    }
}

/// Read the codec type tag of a raw buffer
#[must_use]
pub fn codec_type(info: &[u8]) -> Option<u8> {
    info.get(AVDT_CODEC_TYPE_INDEX).copied()
}

/// Read the media type of a raw buffer
#[must_use]
pub fn media_type(info: &[u8]) -> Option<u8> {
    info.get(AVDT_MEDIA_TYPE_INDEX).map(|b| (b >> 4) & 0x0F)
}

/// Read the little-endian vendor ID of a raw vendor codec buffer
#[must_use]
pub fn vendor_id(info: &[u8]) -> Option<u32> {
    let bytes = info.get(VENDOR_ID_START_IDX..VENDOR_ID_START_IDX + 4)?;
    Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Read the little-endian codec ID of a raw vendor codec buffer
#[must_use]
pub fn vendor_codec_id(info: &[u8]) -> Option<u16> {
    let bytes = info.get(VENDOR_CODEC_ID_START_IDX..VENDOR_CODEC_ID_START_IDX + 2)?;
    Some(u16::from_le_bytes([bytes[0], bytes[1]]))
}

/// Check the fixed header of a raw buffer
///
/// Succeeds when the buffer is long enough for `losc`, declares exactly that
/// LOSC, carries the audio media type and the expected codec type tag.
pub(crate) fn check_header(info: &[u8], losc: u8, codec_type: u8) -> Result<(), CodecError> {
    let len = usize::from(losc) + 1;
    if info.len() < len || len > AVDT_CODEC_SIZE {
        return Err(CodecError::InvalidCodecInfo);
    }
    if info[AVDT_LOSC_INDEX] != losc
        || media_type(info) != Some(AVDT_MEDIA_TYPE_AUDIO)
        || info[AVDT_CODEC_TYPE_INDEX] != codec_type
    {
        return Err(CodecError::InvalidCodecInfo);
    }
    Ok(())
}

/// Check the fixed header and vendor identifiers of a raw vendor codec buffer
pub(crate) fn check_vendor_header(
    info: &[u8],
    losc: u8,
    vendor: u32,
    codec: u16,
) -> Result<(), CodecError> {
    check_header(info, losc, A2DP_MEDIA_CT_NON_A2DP)?;
    if vendor_id(info) != Some(vendor) || vendor_codec_id(info) != Some(codec) {
        return Err(CodecError::InvalidCodecInfo);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{A2DP_MEDIA_CT_SBC, LDAC_CODEC_ID, LDAC_VENDOR_ID};

    #[test]
    fn test_header_layout() {
        let info = CodecInfo::with_header(6, A2DP_MEDIA_CT_SBC);
        assert_eq!(info.losc(), 6);
        assert_eq!(info.media_type(), AVDT_MEDIA_TYPE_AUDIO);
        assert_eq!(info.codec_type(), A2DP_MEDIA_CT_SBC);
        assert!(check_header(info.as_bytes(), 6, A2DP_MEDIA_CT_SBC).is_ok());
        assert!(check_header(info.as_bytes(), 8, A2DP_MEDIA_CT_SBC).is_err());
    }

    #[test]
    fn test_vendor_header_is_little_endian() {
        let info = CodecInfo::with_vendor_header(10, LDAC_VENDOR_ID, LDAC_CODEC_ID);
        assert_eq!(&info.as_bytes()[3..9], &[0x2D, 0x01, 0x00, 0x00, 0xAA, 0x00]);
        assert_eq!(vendor_id(info.as_bytes()), Some(LDAC_VENDOR_ID));
        assert_eq!(vendor_codec_id(info.as_bytes()), Some(LDAC_CODEC_ID));
        assert!(check_vendor_header(info.as_bytes(), 10, LDAC_VENDOR_ID, LDAC_CODEC_ID).is_ok());
        assert!(check_vendor_header(info.as_bytes(), 10, LDAC_VENDOR_ID, 0x0001).is_err());
    }

    #[test]
    fn test_from_bytes_rejects_short_buffers() {
        assert_eq!(CodecInfo::from_bytes(&[6, 0]), Err(CodecError::InvalidCodecInfo));
        // LOSC claims more bytes than provided
        assert_eq!(
            CodecInfo::from_bytes(&[6, 0, 0, 0x21]),
            Err(CodecError::InvalidCodecInfo)
        );
        let info = CodecInfo::from_bytes(&[3, 0, 0, 0x21]).unwrap();
        assert_eq!(info.as_bytes()[3], 0x21);
    }

    #[test]
    fn test_raw_accessors_on_short_buffers() {
        assert_eq!(codec_type(&[1, 0]), None);
        assert_eq!(vendor_id(&[9, 0, 0xFF, 1]), None);
    }
}
