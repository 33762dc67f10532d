use aes::Aes128;
use base64::{Engine as _, engine::general_purpose};
use cbc::cipher::{BlockDecryptMut, KeyIvInit, block_padding::Pkcs7};
use zeroize::Zeroizing;

use crate::error::{AuthError, Result};

/// The size of the AES-128 key and CBC initialization vector in bytes.
pub const BLOCK_SIZE: usize = 16;

type Aes128CbcDec = cbc::Decryptor<Aes128>;

fn decode_b64(label: &str, value: &str) -> Result<Vec<u8>> {
    general_purpose::STANDARD
        .decode(value)
        .map_err(|e| AuthError::Decryption(format!("{label} is not valid base64: {e}")))
}

fn decode_block(label: &str, value: &str) -> Result<[u8; BLOCK_SIZE]> {
    let bytes = decode_b64(label, value)?;
    <[u8; BLOCK_SIZE]>::try_from(bytes.as_slice()).map_err(|_| {
        AuthError::Decryption(format!(
            "{label} must decode to {BLOCK_SIZE} bytes, got {}",
            bytes.len()
        ))
    })
}

/// Decrypts the client-encrypted profile payload.
///
/// The client encrypts the profile with AES-128-CBC (PKCS#7 padding) under
/// the provider-issued session key; key, iv and ciphertext all arrive
/// base64-encoded. The plaintext must parse as a JSON object.
///
/// # Arguments
///
/// * `session_key` - Base64-encoded 16-byte key material from the provider.
/// * `iv` - Base64-encoded 16-byte initialization vector, per request.
/// * `encrypted_data` - Base64-encoded ciphertext.
///
/// # Returns
///
/// A `Result` containing the decrypted profile as a JSON value.
pub fn decrypt_profile(
    session_key: &str,
    iv: &str,
    encrypted_data: &str,
) -> Result<serde_json::Value> {
    let key = Zeroizing::new(decode_block("session key", session_key)?);
    let iv = decode_block("iv", iv)?;
    let ciphertext = decode_b64("encrypted data", encrypted_data)?;

    let plaintext = Aes128CbcDec::new((&*key).into(), (&iv).into())
        .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
        .map_err(|_| {
            AuthError::Decryption("AES-CBC decryption failed: bad key, iv or ciphertext".to_string())
        })?;

    let profile: serde_json::Value = serde_json::from_slice(&plaintext)
        .map_err(|e| AuthError::Decryption(format!("decrypted payload is not valid JSON: {e}")))?;

    if !profile.is_object() {
        return Err(AuthError::Decryption(
            "decrypted payload is not a JSON object".to_string(),
        ));
    }

    Ok(profile)
}

/// Encrypts a plaintext the way the client SDK does. Test fixture builder only.
#[cfg(test)]
pub(crate) fn encrypt_profile(key: &[u8; BLOCK_SIZE], iv: &[u8; BLOCK_SIZE], plaintext: &[u8]) -> String {
    use cbc::cipher::BlockEncryptMut;

    type Aes128CbcEnc = cbc::Encryptor<Aes128>;

    let ciphertext = Aes128CbcEnc::new(key.into(), iv.into()).encrypt_padded_vec_mut::<Pkcs7>(plaintext);
    general_purpose::STANDARD.encode(ciphertext)
}
