use std::{fmt, num::NonZeroU32, str::FromStr};

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::Hmac;
use sha2::Sha256;

use crate::error::{DecryptError, Result};

type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;
type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;

/// Bytes produced by PBKDF2. Only the leading [`KEY_LEN`] bytes are used as the AES key.
const DERIVED_LEN: usize = 32 + 16;
const KEY_LEN: usize = 32;
const IV_LEN: usize = 16;

/// Parameters needed to decrypt a playlist, written as
/// `password|salt_hex|iv_hex|iterations`.
///
/// The recipe is split from the right, so the password itself may contain `|`.
#[derive(Clone, PartialEq, Eq)]
pub struct Recipe {
    password: String,
    salt: Vec<u8>,
    iv: [u8; IV_LEN],
    iterations: NonZeroU32,
}

impl Recipe {
    pub fn new(
        password: impl Into<String>,
        salt: Vec<u8>,
        iv: [u8; IV_LEN],
        iterations: NonZeroU32,
    ) -> Self {
        Self {
            password: password.into(),
            salt,
            iv,
            iterations,
        }
    }

    pub fn iterations(&self) -> NonZeroU32 {
        self.iterations
    }

    fn derive_key(&self) -> Result<[u8; KEY_LEN]> {
        let mut derived = [0u8; DERIVED_LEN];
        pbkdf2::pbkdf2::<Hmac<Sha256>>(
            self.password.as_bytes(),
            &self.salt,
            self.iterations.get(),
            &mut derived,
        )
        .map_err(|e| DecryptError::KeyDerivation(e.to_string()))?;

        let mut key = [0u8; KEY_LEN];
        key.copy_from_slice(&derived[..KEY_LEN]);
        Ok(key)
    }

    pub fn decrypt(&self, data: &[u8]) -> Result<String> {
        let key = self.derive_key()?;
        let decryptor = Aes256CbcDec::new_from_slices(&key, &self.iv)
            .map_err(|e| DecryptError::KeyDerivation(e.to_string()))?;
        let plain = decryptor.decrypt_padded_vec_mut::<Pkcs7>(data)?;
        Ok(String::from_utf8(plain)?)
    }

    pub fn encrypt(&self, plain: &[u8]) -> Result<Vec<u8>> {
        let key = self.derive_key()?;
        let encryptor = Aes256CbcEnc::new_from_slices(&key, &self.iv)
            .map_err(|e| DecryptError::KeyDerivation(e.to_string()))?;
        Ok(encryptor.encrypt_padded_vec_mut::<Pkcs7>(plain))
    }
}

impl FromStr for Recipe {
    type Err = DecryptError;

    fn from_str(recipe: &str) -> Result<Self> {
        let mut fields = recipe.rsplitn(4, '|');
        let iterations = fields.next().filter(|s| !s.is_empty());
        let iv = fields.next().filter(|s| !s.is_empty());
        let salt = fields.next().filter(|s| !s.is_empty());
        let password = fields.next().filter(|s| !s.is_empty());

        let (Some(password), Some(salt), Some(iv), Some(iterations)) =
            (password, salt, iv, iterations)
        else {
            return Err(DecryptError::MalformedRecipe(
                "expected password|salt|iv|iterations".to_string(),
            ));
        };

        let salt = hex::decode(salt)
            .map_err(|e| DecryptError::MalformedRecipe(format!("invalid salt: {e}")))?;
        let iv: [u8; IV_LEN] = hex::decode(iv)
            .map_err(|e| DecryptError::MalformedRecipe(format!("invalid iv: {e}")))?
            .try_into()
            .map_err(|v: Vec<u8>| {
                DecryptError::MalformedRecipe(format!("iv must be 16 bytes, got {}", v.len()))
            })?;
        let iterations = iterations.trim().parse::<NonZeroU32>().map_err(|_| {
            DecryptError::MalformedRecipe(format!("invalid iteration count: {iterations}"))
        })?;

        Ok(Self::new(password, salt, iv, iterations))
    }
}

impl fmt::Debug for Recipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recipe")
            .field("password", &"<redacted>")
            .field("salt", &hex::encode(&self.salt))
            .field("iv", &hex::encode(self.iv))
            .field("iterations", &self.iterations)
            .finish()
    }
}

/// Decrypt an encrypted playlist with a `password|salt|iv|iterations` recipe.
pub fn decrypt(data: &[u8], recipe: &str) -> Result<String> {
    recipe.parse::<Recipe>()?.decrypt(data)
}

/// Encrypt a playlist so that [`decrypt`] with the same recipe returns it unchanged.
pub fn encrypt(plain: &[u8], recipe: &str) -> Result<Vec<u8>> {
    recipe.parse::<Recipe>()?.encrypt(plain)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECIPE: &str = "hunter2|00112233445566778899aabbccddeeff|0f0e0d0c0b0a09080706050403020100|1000";

    #[test]
    fn test_recipe_parse() {
        let recipe: Recipe = RECIPE.parse().unwrap();
        assert_eq!(recipe.password, "hunter2");
        assert_eq!(recipe.salt.len(), 16);
        assert_eq!(recipe.iv[0], 0x0f);
        assert_eq!(recipe.iterations().get(), 1000);
    }

    #[test]
    fn test_recipe_password_with_separator() {
        let recipe: Recipe = "a|b|00|00000000000000000000000000000000|1".parse().unwrap();
        assert_eq!(recipe.password, "a|b");
        assert_eq!(recipe.salt, vec![0]);
    }

    #[test]
    fn test_recipe_malformed() {
        let cases = [
            "",
            "hunter2",
            "hunter2|0011|0f0e0d0c0b0a09080706050403020100",
            "|0011|0f0e0d0c0b0a09080706050403020100|1000",
            "hunter2|zz|0f0e0d0c0b0a09080706050403020100|1000",
            "hunter2|0011|0f0e|1000",
            "hunter2|0011|0f0e0d0c0b0a09080706050403020100|0",
            "hunter2|0011|0f0e0d0c0b0a09080706050403020100|-3",
            "hunter2|0011|0f0e0d0c0b0a09080706050403020100|many",
        ];
        for case in cases {
            assert!(
                matches!(case.parse::<Recipe>(), Err(DecryptError::MalformedRecipe(_))),
                "{case} should be rejected"
            );
        }
    }

    #[test]
    fn test_recipe_debug_hides_password() {
        let recipe: Recipe = RECIPE.parse().unwrap();
        let debug = format!("{recipe:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_decrypt_truncated_data() {
        let mut data = encrypt(b"#EXTM3U\n", RECIPE).unwrap();
        data.pop();
        assert_eq!(decrypt(&data, RECIPE), Err(DecryptError::CipherMismatch));
        assert_eq!(decrypt(&[], RECIPE), Err(DecryptError::CipherMismatch));
    }
}
