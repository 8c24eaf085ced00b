//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// Password handling for accounts. Passwords are held asymmetrically encrypted at rest
// (RSA-OAEP with SHA-256, base64-encoded ciphertext); sign-in decrypts the stored material with
// the private key and compares it to the candidate. This is decrypt-then-compare, not a hash
// comparison.
//
// | Component        | Description                                                  |
// |------------------|--------------------------------------------------------------|
// | PasswordCipher   | Key pair holder: encrypt at sign-up, verify at sign-in.      |
// | AuthError        | Key-material and cipher failures.                            |
//--------------------------------------------------------------------------------------------------

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use rsa::pkcs8::DecodePrivateKey;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use thiserror::Error;

const KEY_BITS: usize = 2048;

/// Errors from key handling and password encryption/decryption.
#[derive(Error, Debug)]
pub enum AuthError {
    /// The private key PEM could not be parsed.
    #[error("invalid private key material: {0}")]
    InvalidKey(#[from] rsa::pkcs8::Error),

    /// Key generation failed.
    #[error("key generation failed: {0}")]
    KeyGeneration(rsa::Error),

    /// Encrypting a password failed.
    #[error("password encryption failed: {0}")]
    Encrypt(rsa::Error),

    /// The stored ciphertext did not decrypt; the stored material does not match this key.
    #[error("password decryption failed")]
    Decrypt,

    /// The stored ciphertext is not valid base64.
    #[error("stored password is not valid base64")]
    Encoding(#[from] base64::DecodeError),
}

/// Holds the marketplace key pair. The public key encrypts passwords at sign-up; the
/// private key decrypts them at sign-in for comparison.
#[derive(Clone)]
pub struct PasswordCipher {
    public_key: RsaPublicKey,
    private_key: RsaPrivateKey,
}

impl PasswordCipher {
    /// Builds a cipher around an existing private key.
    pub fn new(private_key: RsaPrivateKey) -> Self {
        let public_key = RsaPublicKey::from(&private_key);
        Self {
            public_key,
            private_key,
        }
    }

    /// Generates a fresh key pair. Intended for dev and test; production loads a PEM.
    pub fn generate() -> Result<Self, AuthError> {
        let mut rng = rand::thread_rng();
        let private_key =
            RsaPrivateKey::new(&mut rng, KEY_BITS).map_err(AuthError::KeyGeneration)?;
        Ok(Self::new(private_key))
    }

    /// Loads the private key from PKCS#8 PEM text.
    pub fn from_pem(pem: &str) -> Result<Self, AuthError> {
        let private_key = RsaPrivateKey::from_pkcs8_pem(pem)?;
        Ok(Self::new(private_key))
    }

    /// Encrypts a password for storage: RSA-OAEP(SHA-256), base64-encoded.
    pub fn encrypt(&self, password: &str) -> Result<String, AuthError> {
        let mut rng = rand::thread_rng();
        let ciphertext = self
            .public_key
            .encrypt(&mut rng, Oaep::new::<Sha256>(), password.as_bytes())
            .map_err(AuthError::Encrypt)?;
        Ok(BASE64.encode(ciphertext))
    }

    /// Decrypts stored password material back to the clear text.
    pub fn decrypt(&self, stored: &str) -> Result<String, AuthError> {
        let ciphertext = BASE64.decode(stored)?;
        let plaintext = self
            .private_key
            .decrypt(Oaep::new::<Sha256>(), &ciphertext)
            .map_err(|_| AuthError::Decrypt)?;
        String::from_utf8(plaintext).map_err(|_| AuthError::Decrypt)
    }

    /// Decrypt-then-compare: true iff the candidate matches the stored password.
    pub fn verify(&self, stored: &str, candidate: &str) -> Result<bool, AuthError> {
        Ok(self.decrypt(stored)? == candidate)
    }
}

//--------------------------------------------------------------------------------------------------
//  TESTS
//--------------------------------------------------------------------------------------------------
// | Name                          | Description                                              |
// |-------------------------------|----------------------------------------------------------|
// | test_verify_round_trip        | Encrypted password verifies; wrong candidate does not.   |
// | test_ciphertext_is_randomized | OAEP produces distinct ciphertexts for the same input.   |
// | test_garbage_ciphertext       | Tampered material fails as Decrypt, not a panic.         |
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_round_trip() {
        let cipher = PasswordCipher::generate().unwrap();
        let stored = cipher.encrypt("hunter2").unwrap();
        assert_ne!(stored, "hunter2");
        assert!(cipher.verify(&stored, "hunter2").unwrap());
        assert!(!cipher.verify(&stored, "hunter3").unwrap());
    }

    #[test]
    fn test_ciphertext_is_randomized() {
        let cipher = PasswordCipher::generate().unwrap();
        let first = cipher.encrypt("hunter2").unwrap();
        let second = cipher.encrypt("hunter2").unwrap();
        assert_ne!(first, second);
        assert!(cipher.verify(&first, "hunter2").unwrap());
        assert!(cipher.verify(&second, "hunter2").unwrap());
    }

    #[test]
    fn test_garbage_ciphertext() {
        let cipher = PasswordCipher::generate().unwrap();
        assert!(matches!(
            cipher.decrypt("not-base64!!!"),
            Err(AuthError::Encoding(_))
        ));
        let garbage = BASE64.encode([0u8; 256]);
        assert!(matches!(cipher.decrypt(&garbage), Err(AuthError::Decrypt)));
    }
}
