#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DecryptError {
    #[error("Malformed decryption recipe: {0}")]
    MalformedRecipe(String),

    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("Cipher text does not match the recipe")]
    CipherMismatch,
}

impl From<aes::cipher::block_padding::UnpadError> for DecryptError {
    fn from(_: aes::cipher::block_padding::UnpadError) -> Self {
        Self::CipherMismatch
    }
}

impl From<std::string::FromUtf8Error> for DecryptError {
    fn from(_: std::string::FromUtf8Error) -> Self {
        Self::CipherMismatch
    }
}

pub type Result<T> = std::result::Result<T, DecryptError>;
