//! Block cipher capability and the built-in DES implementation
//!
//! The search engine never talks to DES directly. Everything goes through
//! the `BlockCipher` trait so an alternative cipher can be substituted
//! without touching the search logic. Keys are plain integers in
//! `[0, 2^56)`; the codec packs them big-endian into the 8-byte key the
//! cipher expects.

use des::cipher::{generic_array::GenericArray, BlockDecrypt, BlockEncrypt, KeyInit};
use des::Des;

use crate::error::{CrackError, Result};

/// DES block size in bytes
pub const BLOCK_SIZE: usize = 8;

/// DES has a 56-bit effective key
pub const KEY_SPACE_BITS: u32 = 56;

/// Exclusive upper bound of the key space
pub const KEY_SPACE_END: u64 = 1 << KEY_SPACE_BITS;

/// Pack an integer key into the fixed 8-byte representation.
///
/// Big-endian packing gives a fixed bijection on `[0, 2^56)`, so two
/// workers never map distinct integers to the same byte key and results
/// are reproducible across runs.
#[inline(always)]
pub fn key_bytes(key: u64) -> [u8; 8] {
    key.to_be_bytes()
}

/// The 4 weak and 12 semi-weak DES keys, in their odd-parity form.
const WEAK_KEYS: [u64; 16] = [
    0x0101_0101_0101_0101,
    0xFEFE_FEFE_FEFE_FEFE,
    0xE0E0_E0E0_F1F1_F1F1,
    0x1F1F_1F1F_0E0E_0E0E,
    0x01FE_01FE_01FE_01FE,
    0xFE01_FE01_FE01_FE01,
    0x1FE0_1FE0_0EF1_0EF1,
    0xE01F_E01F_F10E_F10E,
    0x01E0_01E0_01F1_01F1,
    0xE001_E001_F101_F101,
    0x1FFE_1FFE_0EFE_0EFE,
    0xFE1F_FE1F_FE0E_FE0E,
    0x011F_011F_010E_010E,
    0x1F01_1F01_0E01_0E01,
    0xE0FE_E0FE_F1FE_F1FE,
    0xFEE0_FEE0_FEF1_FEF1,
];

/// Bit 0 of every byte is a parity bit and ignored by the key schedule.
const PARITY_MASK: u64 = 0xFEFE_FEFE_FEFE_FEFE;

/// Whether the key schedule would be degenerate for this key.
///
/// Parity bits are masked off on both sides, so any integer that differs
/// from a weak key only in parity positions is rejected too.
pub fn is_weak_key(key: u64) -> bool {
    let masked = key & PARITY_MASK;
    WEAK_KEYS.iter().any(|w| w & PARITY_MASK == masked)
}

/// Block cipher capability consumed by the search engine.
///
/// Buffers are processed as independent 8-byte ECB blocks; lengths must be
/// multiples of [`BLOCK_SIZE`]. A `WeakKey` error from `decrypt` means the
/// cipher refuses that key schedule; the scan loop treats it as a
/// non-match and keeps going, while the one-time setup encryption treats
/// it as fatal.
pub trait BlockCipher: Send + Sync {
    /// Encrypt `buf` in place under `key`.
    fn encrypt(&self, key: u64, buf: &mut [u8]) -> Result<()>;

    /// Decrypt `src` into `dst` (equal lengths) under `key`.
    fn decrypt(&self, key: u64, src: &[u8], dst: &mut [u8]) -> Result<()>;
}

/// DES in ECB mode, the sole built-in `BlockCipher`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DesCipher;

impl BlockCipher for DesCipher {
    fn encrypt(&self, key: u64, buf: &mut [u8]) -> Result<()> {
        debug_assert_eq!(buf.len() % BLOCK_SIZE, 0);
        if is_weak_key(key) {
            return Err(CrackError::WeakKey(key));
        }
        let des = Des::new(GenericArray::from_slice(&key_bytes(key)));
        for block in buf.chunks_exact_mut(BLOCK_SIZE) {
            des.encrypt_block(GenericArray::from_mut_slice(block));
        }
        Ok(())
    }

    fn decrypt(&self, key: u64, src: &[u8], dst: &mut [u8]) -> Result<()> {
        debug_assert_eq!(src.len() % BLOCK_SIZE, 0);
        debug_assert_eq!(src.len(), dst.len());
        if is_weak_key(key) {
            return Err(CrackError::WeakKey(key));
        }
        let des = Des::new(GenericArray::from_slice(&key_bytes(key)));
        dst.copy_from_slice(src);
        for block in dst.chunks_exact_mut(BLOCK_SIZE) {
            des.decrypt_block(GenericArray::from_mut_slice(block));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_bytes_is_big_endian() {
        assert_eq!(key_bytes(0), [0; 8]);
        assert_eq!(key_bytes(1), [0, 0, 0, 0, 0, 0, 0, 1]);
        assert_eq!(
            key_bytes(0x0012_3456_789A_BCDE),
            [0x00, 0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC, 0xDE]
        );
    }

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let cipher = DesCipher;
        let mut buf = *b"the quick brown fox jump"; // 24 bytes, 3 blocks
        let original = buf;

        cipher.encrypt(123_456, &mut buf).unwrap();
        assert_ne!(buf, original);

        let mut plain = [0u8; 24];
        cipher.decrypt(123_456, &buf, &mut plain).unwrap();
        assert_eq!(plain, original);
    }

    #[test]
    fn wrong_key_does_not_roundtrip() {
        let cipher = DesCipher;
        let mut buf = *b"16 bytes of text";
        cipher.encrypt(123_456, &mut buf).unwrap();

        let mut plain = [0u8; 16];
        cipher.decrypt(654_321, &buf, &mut plain).unwrap();
        assert_ne!(&plain, b"16 bytes of text");
    }

    #[test]
    fn weak_keys_are_rejected() {
        let cipher = DesCipher;
        let mut buf = [0u8; 8];

        // All-zero key is the first weak key with parity masked off.
        assert!(is_weak_key(0));
        assert!(cipher.encrypt(0, &mut buf).is_err());

        // The classic weak key, with and without parity bits.
        assert!(is_weak_key(0x0101_0101_0101_0101));
        assert!(is_weak_key(0xFEFE_FEFE_FEFE_FEFE));

        assert!(!is_weak_key(123_456));
        assert!(!is_weak_key(0x00AB_CDEF_0123_4567));
    }
}
