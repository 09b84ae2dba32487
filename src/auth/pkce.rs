// PKCE verifier and S256 challenge

use anyhow::Result;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use sha2::{Digest, Sha256};
use std::fmt::Write;

/// Random bytes behind the verifier; hex encoding doubles the length to 96
/// characters, inside the 43..=128 range the token endpoint accepts
const VERIFIER_BYTES: usize = 48;

/// Proof key for one authorization-code exchange
#[derive(Debug, Clone)]
pub struct PkceChallenge {
    /// Sent with the code exchange
    pub verifier: String,
    /// Sent with the consent URL
    pub challenge: String,
}

impl PkceChallenge {
    /// Fresh verifier from the OS random source
    pub fn generate() -> Result<Self> {
        let mut bytes = [0u8; VERIFIER_BYTES];
        getrandom::getrandom(&mut bytes)
            .map_err(|e| anyhow::anyhow!("Failed to generate PKCE verifier: {}", e))?;

        let mut verifier = String::with_capacity(VERIFIER_BYTES * 2);
        for b in bytes {
            let _ = write!(verifier, "{:02x}", b);
        }

        Ok(Self::from_verifier(verifier))
    }

    pub fn from_verifier(verifier: String) -> Self {
        let challenge = compute_code_challenge(&verifier);
        Self {
            verifier,
            challenge,
        }
    }
}

/// S256 method: base64url(sha256(verifier)) without padding
pub fn compute_code_challenge(verifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_challenge() {
        // RFC 7636 appendix B
        assert_eq!(
            compute_code_challenge("dBjftJeZ4CVP-mB92K27uhbUJU1p1r-wW1gFWFOEjXk"),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }

    #[test]
    fn test_generate() {
        let a = PkceChallenge::generate().unwrap();
        let b = PkceChallenge::generate().unwrap();

        assert_eq!(a.verifier.len(), 96);
        assert!(a.verifier.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a.verifier, b.verifier);
        assert_eq!(a.challenge, compute_code_challenge(&a.verifier));
        assert!(!a.challenge.contains('='));
    }
}
