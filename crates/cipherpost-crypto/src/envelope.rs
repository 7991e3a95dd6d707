//! Versioned envelope wire format.
//!
//! Layout (integers big-endian):
//!
//! ```text
//! +---------+-------------+-------------------+-----------+------------+---------+
//! | version | wrapped len | wrapped key block |   nonce   | ciphertext |   tag   |
//! |  1 byte |   2 bytes   |      L bytes      |  24 bytes |  N bytes   | 16 bytes|
//! +---------+-------------+-------------------+-----------+------------+---------+
//! ```
//!
//! The first three fields form the header, which doubles as the AEAD
//! associated data. A reader that sees an unknown version refuses the
//! envelope rather than guessing at its layout.

use thiserror::Error;

/// Current envelope format version.
pub const FORMAT_VERSION: u8 = 1;

/// XChaCha20 nonce size.
pub const NONCE_SIZE: usize = 24;

/// Poly1305 tag size.
pub const TAG_SIZE: usize = 16;

/// Version byte plus the 2-byte wrapped key length.
const PREFIX_SIZE: usize = 3;

/// Errors from parsing or assembling an envelope.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EnvelopeError {
    /// Input ends before the layout says it should
    #[error("envelope truncated: need at least {needed} bytes, got {actual}")]
    Truncated {
        /// Minimum length implied by the header
        needed: usize,
        /// Length actually available
        actual: usize,
    },

    /// Leading version byte is not one this build understands
    #[error("unsupported envelope version: {0}")]
    UnsupportedVersion(u8),

    /// Wrapped key block length is zero
    #[error("empty wrapped key block")]
    EmptyWrappedKey,

    /// Wrapped key block does not fit the 2-byte length prefix
    #[error("wrapped key block too long: {0} bytes")]
    WrappedKeyTooLong(usize),
}

/// A parsed hybrid envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// RSA-OAEP encryption of `symmetric key ‖ nonce`
    pub wrapped_key: Vec<u8>,
    /// XChaCha20 nonce, repeated inside the wrapped block
    pub nonce: [u8; NONCE_SIZE],
    /// Symmetric ciphertext without the tag
    pub ciphertext: Vec<u8>,
    /// Poly1305 authentication tag
    pub tag: [u8; TAG_SIZE],
}

impl Envelope {
    /// Assemble an envelope from AEAD output (`ciphertext ‖ tag`).
    ///
    /// # Errors
    ///
    /// - `Truncated`: `sealed` is shorter than a tag
    /// - `EmptyWrappedKey` / `WrappedKeyTooLong`: wrapped block unusable
    pub fn from_sealed(
        wrapped_key: Vec<u8>,
        nonce: [u8; NONCE_SIZE],
        mut sealed: Vec<u8>,
    ) -> Result<Self, EnvelopeError> {
        check_wrapped_len(wrapped_key.len())?;

        if sealed.len() < TAG_SIZE {
            return Err(EnvelopeError::Truncated { needed: TAG_SIZE, actual: sealed.len() });
        }

        let tag_start = sealed.len() - TAG_SIZE;
        let mut tag = [0u8; TAG_SIZE];
        tag.copy_from_slice(&sealed[tag_start..]);
        sealed.truncate(tag_start);

        Ok(Self { wrapped_key, nonce, ciphertext: sealed, tag })
    }

    /// Parse envelope bytes.
    ///
    /// Checks structure only. Authenticity is established by opening the
    /// envelope, not by parsing it.
    pub fn parse(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        let Some(&version) = bytes.first() else {
            return Err(EnvelopeError::Truncated { needed: PREFIX_SIZE, actual: 0 });
        };

        if version != FORMAT_VERSION {
            return Err(EnvelopeError::UnsupportedVersion(version));
        }

        if bytes.len() < PREFIX_SIZE {
            return Err(EnvelopeError::Truncated { needed: PREFIX_SIZE, actual: bytes.len() });
        }

        let wrapped_len = u16::from_be_bytes([bytes[1], bytes[2]]) as usize;
        if wrapped_len == 0 {
            return Err(EnvelopeError::EmptyWrappedKey);
        }

        let nonce_start = PREFIX_SIZE + wrapped_len;
        let body_start = nonce_start + NONCE_SIZE;
        let needed = body_start + TAG_SIZE;
        if bytes.len() < needed {
            return Err(EnvelopeError::Truncated { needed, actual: bytes.len() });
        }

        let tag_start = bytes.len() - TAG_SIZE;

        let mut nonce = [0u8; NONCE_SIZE];
        nonce.copy_from_slice(&bytes[nonce_start..body_start]);

        let mut tag = [0u8; TAG_SIZE];
        tag.copy_from_slice(&bytes[tag_start..]);

        Ok(Self {
            wrapped_key: bytes[PREFIX_SIZE..nonce_start].to_vec(),
            nonce,
            ciphertext: bytes[body_start..tag_start].to_vec(),
            tag,
        })
    }

    /// Serialize to the wire format.
    pub fn encode(&self) -> Vec<u8> {
        debug_assert!(check_wrapped_len(self.wrapped_key.len()).is_ok());

        let mut out = Vec::with_capacity(self.encoded_len());
        out.push(FORMAT_VERSION);
        out.extend_from_slice(&(self.wrapped_key.len() as u16).to_be_bytes());
        out.extend_from_slice(&self.wrapped_key);
        out.extend_from_slice(&self.nonce);
        out.extend_from_slice(&self.ciphertext);
        out.extend_from_slice(&self.tag);

        debug_assert_eq!(out.len(), self.encoded_len());
        out
    }

    /// Total encoded size in bytes.
    pub fn encoded_len(&self) -> usize {
        PREFIX_SIZE + self.wrapped_key.len() + NONCE_SIZE + self.ciphertext.len() + TAG_SIZE
    }

    /// Header bytes authenticated as AEAD associated data.
    pub fn associated_data(&self) -> Vec<u8> {
        header(&self.wrapped_key)
    }

    /// `ciphertext ‖ tag`, the form the AEAD opens.
    pub(crate) fn sealed(&self) -> Vec<u8> {
        let mut sealed = Vec::with_capacity(self.ciphertext.len() + TAG_SIZE);
        sealed.extend_from_slice(&self.ciphertext);
        sealed.extend_from_slice(&self.tag);
        sealed
    }
}

/// Header for a wrapped key block: `version ‖ len ‖ wrapped_key`.
///
/// # Errors
///
/// - `EmptyWrappedKey` / `WrappedKeyTooLong`: block cannot be framed
pub fn associated_data(wrapped_key: &[u8]) -> Result<Vec<u8>, EnvelopeError> {
    check_wrapped_len(wrapped_key.len())?;
    Ok(header(wrapped_key))
}

fn header(wrapped_key: &[u8]) -> Vec<u8> {
    let mut aad = Vec::with_capacity(PREFIX_SIZE + wrapped_key.len());
    aad.push(FORMAT_VERSION);
    aad.extend_from_slice(&(wrapped_key.len() as u16).to_be_bytes());
    aad.extend_from_slice(wrapped_key);
    aad
}

fn check_wrapped_len(len: usize) -> Result<(), EnvelopeError> {
    if len == 0 {
        return Err(EnvelopeError::EmptyWrappedKey);
    }
    if len > usize::from(u16::MAX) {
        return Err(EnvelopeError::WrappedKeyTooLong(len));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Envelope {
        Envelope {
            wrapped_key: vec![0xAA; 256],
            nonce: [0x11; NONCE_SIZE],
            ciphertext: b"opaque".to_vec(),
            tag: [0x22; TAG_SIZE],
        }
    }

    #[test]
    fn layout_offsets() {
        let bytes = sample().encode();

        assert_eq!(bytes[0], FORMAT_VERSION);
        assert_eq!(&bytes[1..3], &256u16.to_be_bytes());
        assert_eq!(&bytes[3..259], &[0xAA; 256][..]);
        assert_eq!(&bytes[259..283], &[0x11; NONCE_SIZE]);
        assert_eq!(&bytes[283..289], b"opaque");
        assert_eq!(&bytes[289..], &[0x22; TAG_SIZE]);
        assert_eq!(bytes.len(), sample().encoded_len());
    }

    #[test]
    fn parse_recovers_fields() {
        let parsed = Envelope::parse(&sample().encode()).unwrap();
        assert_eq!(parsed, sample());
    }

    #[test]
    fn empty_ciphertext_is_allowed() {
        let mut envelope = sample();
        envelope.ciphertext.clear();

        let parsed = Envelope::parse(&envelope.encode()).unwrap();
        assert!(parsed.ciphertext.is_empty());
    }

    #[test]
    fn empty_input_is_truncated() {
        assert_eq!(
            Envelope::parse(&[]),
            Err(EnvelopeError::Truncated { needed: PREFIX_SIZE, actual: 0 })
        );
    }

    #[test]
    fn unknown_version_rejected() {
        let mut bytes = sample().encode();
        bytes[0] = 2;

        assert_eq!(Envelope::parse(&bytes), Err(EnvelopeError::UnsupportedVersion(2)));
    }

    #[test]
    fn zero_wrapped_len_rejected() {
        let bytes = [FORMAT_VERSION, 0, 0, 1, 2, 3];
        assert_eq!(Envelope::parse(&bytes), Err(EnvelopeError::EmptyWrappedKey));
    }

    #[test]
    fn oversized_length_prefix_is_truncated() {
        let mut bytes = sample().encode();
        bytes[1] = 0xFF;
        bytes[2] = 0xFF;

        assert!(matches!(Envelope::parse(&bytes), Err(EnvelopeError::Truncated { .. })));
    }

    #[test]
    fn every_truncation_fails() {
        let bytes = sample().encode();
        let minimum = PREFIX_SIZE + 256 + NONCE_SIZE + TAG_SIZE;

        for len in 0..minimum {
            assert!(Envelope::parse(&bytes[..len]).is_err(), "length {len} should not parse");
        }
    }

    #[test]
    fn from_sealed_splits_tag() {
        let mut sealed = b"body".to_vec();
        sealed.extend_from_slice(&[0x33; TAG_SIZE]);

        let envelope = Envelope::from_sealed(vec![1; 8], [0; NONCE_SIZE], sealed.clone()).unwrap();

        assert_eq!(envelope.ciphertext, b"body");
        assert_eq!(envelope.tag, [0x33; TAG_SIZE]);
        assert_eq!(envelope.sealed(), sealed);
    }

    #[test]
    fn from_sealed_rejects_short_input() {
        let result = Envelope::from_sealed(vec![1; 8], [0; NONCE_SIZE], vec![0; TAG_SIZE - 1]);
        assert!(matches!(result, Err(EnvelopeError::Truncated { .. })));
    }

    #[test]
    fn associated_data_is_header() {
        let envelope = sample();
        let bytes = envelope.encode();

        assert_eq!(envelope.associated_data(), &bytes[..PREFIX_SIZE + 256]);
        assert_eq!(associated_data(&envelope.wrapped_key).unwrap(), envelope.associated_data());
    }

    #[test]
    fn associated_data_rejects_empty_block() {
        assert_eq!(associated_data(&[]), Err(EnvelopeError::EmptyWrappedKey));
    }
}
