//! Traditional (PKWARE) ZIP encryption.
//!
//! The stream cipher keeps three 32-bit keys updated through a CRC-32 table,
//! as specified in APPNOTE.TXT. Each entry's ciphertext is preceded by a
//! 12-byte header of 11 pseudo-random bytes plus a check byte derived from
//! the entry CRC-32, which is why the writer must know the final CRC before
//! the first payload byte.
//!
//! This scheme is cryptographically weak and kept for format compatibility
//! only.

/// Size of the per-entry encryption header in bytes.
pub const CRYPT_HEADER_LEN: usize = 12;

/// CRC-32 table for the key schedule (polynomial 0xEDB88320, reflected).
const CRC32_TABLE: [u32; 256] = {
    let mut table = [0u32; 256];
    let mut i = 0usize;
    while i < 256 {
        let mut crc = i as u32;
        let mut j = 0;
        while j < 8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ 0xEDB88320;
            } else {
                crc >>= 1;
            }
            j += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
};

const INITIAL_KEY0: u32 = 0x12345678;
const INITIAL_KEY1: u32 = 0x23456789;
const INITIAL_KEY2: u32 = 0x34567890;

#[inline]
fn crc32_update(crc: u32, byte: u8) -> u32 {
    let index = ((crc ^ byte as u32) & 0xFF) as usize;
    CRC32_TABLE[index] ^ (crc >> 8)
}

/// The traditional ZIP stream cipher state.
#[derive(Debug, Clone)]
pub struct ZipCrypto {
    key0: u32,
    key1: u32,
    key2: u32,
}

impl ZipCrypto {
    /// Initialize the key state from a password.
    #[must_use]
    pub fn new(password: &[u8]) -> Self {
        let mut cipher = Self {
            key0: INITIAL_KEY0,
            key1: INITIAL_KEY1,
            key2: INITIAL_KEY2,
        };
        for &byte in password {
            cipher.update_keys(byte);
        }
        cipher
    }

    #[inline]
    fn update_keys(&mut self, byte: u8) {
        self.key0 = crc32_update(self.key0, byte);
        self.key1 = self
            .key1
            .wrapping_add(self.key0 & 0xFF)
            .wrapping_mul(134775813)
            .wrapping_add(1);
        self.key2 = crc32_update(self.key2, (self.key1 >> 24) as u8);
    }

    #[inline]
    fn stream_byte(&self) -> u8 {
        let temp = (self.key2 | 2) as u16;
        (temp.wrapping_mul(temp ^ 1) >> 8) as u8
    }

    /// Encrypt one byte and advance the key state.
    #[inline]
    pub fn encrypt_byte(&mut self, byte: u8) -> u8 {
        let cipher_byte = byte ^ self.stream_byte();
        self.update_keys(byte);
        cipher_byte
    }

    /// Decrypt one byte and advance the key state.
    #[inline]
    pub fn decrypt_byte(&mut self, byte: u8) -> u8 {
        let plain_byte = byte ^ self.stream_byte();
        self.update_keys(plain_byte);
        plain_byte
    }

    /// Encrypt a buffer in place.
    pub fn encrypt_in_place(&mut self, buffer: &mut [u8]) {
        for byte in buffer.iter_mut() {
            *byte = self.encrypt_byte(*byte);
        }
    }

    /// Decrypt a buffer in place.
    pub fn decrypt_in_place(&mut self, buffer: &mut [u8]) {
        for byte in buffer.iter_mut() {
            *byte = self.decrypt_byte(*byte);
        }
    }

    /// Build the encrypted 12-byte entry header.
    ///
    /// Eleven pseudo-random bytes are drawn from an LCG over `seed`, and the
    /// final byte is the high byte of `crc32` so a reader can cheaply reject
    /// a wrong password.
    pub fn crypt_header(&mut self, crc32: u32, seed: u64) -> [u8; CRYPT_HEADER_LEN] {
        let mut state = seed;
        let mut header = [0u8; CRYPT_HEADER_LEN];
        for slot in header.iter_mut().take(CRYPT_HEADER_LEN - 1) {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = self.encrypt_byte((state >> 56) as u8);
        }
        header[CRYPT_HEADER_LEN - 1] = self.encrypt_byte(check_byte(crc32));
        header
    }
}

/// The check byte a crypt header carries for a given entry CRC-32.
#[inline]
pub fn check_byte(crc32: u32) -> u8 {
    (crc32 >> 24) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_initialization_is_deterministic() {
        let a = ZipCrypto::new(b"test");
        let b = ZipCrypto::new(b"test");
        let c = ZipCrypto::new(b"different");
        assert_eq!((a.key0, a.key1, a.key2), (b.key0, b.key1, b.key2));
        assert_ne!((a.key0, a.key1, a.key2), (c.key0, c.key1, c.key2));
    }

    #[test]
    fn test_roundtrip_buffer() {
        let original = b"Hello, World! This is a test of ZIP encryption.";
        let mut data = original.to_vec();

        ZipCrypto::new(b"secret").encrypt_in_place(&mut data);
        assert_ne!(&data[..], &original[..]);

        ZipCrypto::new(b"secret").decrypt_in_place(&mut data);
        assert_eq!(&data[..], &original[..]);
    }

    #[test]
    fn test_different_passwords_different_output() {
        let mut first = b"Test data".to_vec();
        let mut second = b"Test data".to_vec();
        ZipCrypto::new(b"password1").encrypt_in_place(&mut first);
        ZipCrypto::new(b"password2").encrypt_in_place(&mut second);
        assert_ne!(first, second);
    }

    #[test]
    fn test_crypt_header_check_byte() {
        let crc32: u32 = 0xDEADBEEF;
        let mut header = ZipCrypto::new(b"testpassword").crypt_header(crc32, 12345);
        assert_eq!(header.len(), CRYPT_HEADER_LEN);

        ZipCrypto::new(b"testpassword").decrypt_in_place(&mut header);
        assert_eq!(header[CRYPT_HEADER_LEN - 1], check_byte(crc32));
    }

    #[test]
    fn test_crypt_header_wrong_password() {
        let crc32: u32 = 0xDEADBEEF;
        let header = ZipCrypto::new(b"correct").crypt_header(crc32, 12345);

        let mut with_right = header;
        ZipCrypto::new(b"correct").decrypt_in_place(&mut with_right);
        let mut with_wrong = header;
        ZipCrypto::new(b"wrong").decrypt_in_place(&mut with_wrong);

        assert_ne!(with_right, with_wrong);
    }
}
