//! Decryption of the `[location, case_no, encrypted_info]` credential form.

use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use ceac_core::{Credentials, QueryCredentials, QueryRequest, ResolvedQuery};
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::{Oaep, RsaPrivateKey};
use sha2::Sha256;

use crate::error::CredentialError;

/// Turns a base64 ciphertext into passport number and surname.
pub trait CredentialDecryptor: Send + Sync {
    /// # Errors
    ///
    /// Returns a [`CredentialError`] for malformed input or a key mismatch.
    fn decrypt(&self, ciphertext_b64: &str) -> Result<Credentials, CredentialError>;
}

/// RSA-OAEP (SHA-256 digest and MGF1, no label) decryptor.
pub struct RsaOaepDecryptor {
    key: RsaPrivateKey,
}

impl std::fmt::Debug for RsaOaepDecryptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RsaOaepDecryptor").finish_non_exhaustive()
    }
}

impl RsaOaepDecryptor {
    /// Loads a PEM private key in PKCS#8 (`BEGIN PRIVATE KEY`) or PKCS#1
    /// (`BEGIN RSA PRIVATE KEY`) form.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::KeyParse`] if neither encoding parses.
    pub fn from_pem(pem: &str) -> Result<Self, CredentialError> {
        let key = match RsaPrivateKey::from_pkcs8_pem(pem) {
            Ok(key) => key,
            Err(pkcs8_err) => RsaPrivateKey::from_pkcs1_pem(pem).map_err(|pkcs1_err| {
                CredentialError::KeyParse(format!("pkcs8: {pkcs8_err}; pkcs1: {pkcs1_err}"))
            })?,
        };
        Ok(Self { key })
    }

    /// # Errors
    ///
    /// Returns [`CredentialError::KeyIo`] if the file cannot be read, or
    /// [`CredentialError::KeyParse`] if it does not hold a private key.
    pub fn from_pem_file(path: &Path) -> Result<Self, CredentialError> {
        let pem = std::fs::read_to_string(path).map_err(|source| CredentialError::KeyIo {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_pem(&pem)
    }
}

impl CredentialDecryptor for RsaOaepDecryptor {
    fn decrypt(&self, ciphertext_b64: &str) -> Result<Credentials, CredentialError> {
        let ciphertext = STANDARD.decode(ciphertext_b64.trim())?;
        let plaintext = self.key.decrypt(Oaep::new::<Sha256>(), &ciphertext)?;
        split_credentials(&String::from_utf8(plaintext)?)
    }
}

/// Splits `"passport_number,surname"`; exactly one comma is allowed.
///
/// # Errors
///
/// Returns [`CredentialError::Format`] for any other shape.
pub fn split_credentials(plaintext: &str) -> Result<Credentials, CredentialError> {
    let (passport_number, surname) = plaintext.split_once(',').ok_or(CredentialError::Format)?;
    if surname.contains(',') {
        return Err(CredentialError::Format);
    }
    Ok(Credentials {
        passport_number: passport_number.to_string(),
        surname: surname.to_string(),
    })
}

/// Produces the submit-ready query, decrypting credentials when needed.
///
/// # Errors
///
/// Returns [`CredentialError::NotConfigured`] for encrypted credentials when
/// no decryptor is available, or the decryptor's own error.
pub fn resolve(
    request: &QueryRequest,
    decryptor: Option<&dyn CredentialDecryptor>,
) -> Result<ResolvedQuery, CredentialError> {
    let credentials = match &request.credentials {
        QueryCredentials::None => None,
        QueryCredentials::Plain(credentials) => Some(credentials.clone()),
        QueryCredentials::Encrypted(blob) => Some(
            decryptor
                .ok_or(CredentialError::NotConfigured)?
                .decrypt(blob)?,
        ),
    };
    Ok(ResolvedQuery {
        location: request.location.clone(),
        case_number: request.case_number.clone(),
        credentials,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PKCS8_KEY: &str = include_str!("../tests/fixtures/private_key.pem");
    const PKCS1_KEY: &str = include_str!("../tests/fixtures/private_key_pkcs1.pem");
    const CIPHERTEXT: &str = include_str!("../tests/fixtures/credentials.b64");
    const NO_COMMA: &str = include_str!("../tests/fixtures/no_comma.b64");
    const FOREIGN: &str = include_str!("../tests/fixtures/foreign_key.b64");

    fn request(credentials: QueryCredentials) -> QueryRequest {
        QueryRequest::new("BEJ", "AA00A38G49", credentials).unwrap()
    }

    #[test]
    fn decrypts_with_pkcs8_key() {
        let decryptor = RsaOaepDecryptor::from_pem(PKCS8_KEY).unwrap();
        let creds = decryptor.decrypt(CIPHERTEXT).unwrap();
        assert_eq!(creds.passport_number, "E12345678");
        assert_eq!(creds.surname, "ZHANG");
    }

    #[test]
    fn decrypts_with_pkcs1_key() {
        let decryptor = RsaOaepDecryptor::from_pem(PKCS1_KEY).unwrap();
        assert!(decryptor.decrypt(CIPHERTEXT).is_ok());
    }

    #[test]
    fn rejects_garbage_pem() {
        let err = RsaOaepDecryptor::from_pem("not a key").unwrap_err();
        assert!(matches!(err, CredentialError::KeyParse(_)), "got: {err:?}");
    }

    #[test]
    fn rejects_invalid_base64() {
        let decryptor = RsaOaepDecryptor::from_pem(PKCS8_KEY).unwrap();
        let err = decryptor.decrypt("@@not base64@@").unwrap_err();
        assert!(matches!(err, CredentialError::Base64(_)), "got: {err:?}");
    }

    #[test]
    fn rejects_ciphertext_for_another_key() {
        let decryptor = RsaOaepDecryptor::from_pem(PKCS8_KEY).unwrap();
        let err = decryptor.decrypt(FOREIGN).unwrap_err();
        assert!(matches!(err, CredentialError::Decrypt(_)), "got: {err:?}");
    }

    #[test]
    fn rejects_plaintext_without_comma() {
        let decryptor = RsaOaepDecryptor::from_pem(PKCS8_KEY).unwrap();
        let err = decryptor.decrypt(NO_COMMA).unwrap_err();
        assert!(matches!(err, CredentialError::Format), "got: {err:?}");
    }

    #[test]
    fn split_rejects_extra_fields() {
        assert!(split_credentials("E1,ZHANG,SAN").is_err());
        assert!(split_credentials("E1,").is_ok());
    }

    #[test]
    fn resolve_passes_plain_credentials_through() {
        let creds = Credentials {
            passport_number: "E1".to_string(),
            surname: "LI".to_string(),
        };
        let resolved = resolve(&request(QueryCredentials::Plain(creds.clone())), None).unwrap();
        assert_eq!(resolved.credentials, Some(creds));
        assert_eq!(resolved.case_number.as_str(), "AA00A38G49");
    }

    #[test]
    fn resolve_without_decryptor_fails_for_encrypted() {
        let err = resolve(
            &request(QueryCredentials::Encrypted(CIPHERTEXT.to_string())),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, CredentialError::NotConfigured), "got: {err:?}");
    }

    #[test]
    fn resolve_decrypts_encrypted_credentials() {
        let decryptor = RsaOaepDecryptor::from_pem(PKCS8_KEY).unwrap();
        let resolved = resolve(
            &request(QueryCredentials::Encrypted(CIPHERTEXT.to_string())),
            Some(&decryptor),
        )
        .unwrap();
        let creds = resolved.credentials.unwrap();
        assert_eq!(creds.surname, "ZHANG");
    }
}
