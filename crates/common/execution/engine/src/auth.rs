use std::{
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use alloy_primitives::hex;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode, get_current_timestamp};
use ream_execution_rpc_types::utils::strip_prefix;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::{sync::RwLock, time::Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub const JWT_SECRET_LENGTH: usize = 32;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Failed to read jwt secret from {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Jwt secret is not valid hex: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("Jwt secret must be {JWT_SECRET_LENGTH} bytes, found {0}")]
    InvalidLength(usize),

    #[error("Could not encode jwt token: {0}")]
    Encode(#[from] jsonwebtoken::errors::Error),
}

/// 256 bit secret shared with the execution client.
#[derive(Clone, PartialEq, Eq)]
pub struct JwtSecret([u8; JWT_SECRET_LENGTH]);

impl JwtSecret {
    pub fn from_hex(value: &str) -> Result<Self, AuthError> {
        let bytes = hex::decode(strip_prefix(value.trim()))?;
        let secret = <[u8; JWT_SECRET_LENGTH]>::try_from(bytes.as_slice())
            .map_err(|_| AuthError::InvalidLength(bytes.len()))?;
        Ok(Self(secret))
    }

    pub fn from_file(path: &Path) -> Result<Self, AuthError> {
        let contents = std::fs::read_to_string(path).map_err(|source| AuthError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_hex(&contents)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for JwtSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("JwtSecret(..)")
    }
}

/// Claims struct as defined in https://github.com/ethereum/execution-apis/blob/main/src/engine/authentication.md#jwt-claims
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// issued-at claim. Represented as seconds passed since UNIX_EPOCH.
    pub iat: u64,
    /// Optional unique identifier for the CL node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Optional client version for the CL node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clv: Option<String>,
}

pub struct JwtAuth {
    key: EncodingKey,
    id: Option<String>,
    clv: Option<String>,
}

impl JwtAuth {
    pub fn new(secret: &JwtSecret, id: Option<String>, clv: Option<String>) -> Self {
        Self {
            key: EncodingKey::from_secret(secret.as_bytes()),
            id,
            clv,
        }
    }

    /// Generate a HS256 token with `iat` set to the current time.
    pub fn generate_token(&self) -> Result<String, AuthError> {
        let claims = Claims {
            iat: get_current_timestamp(),
            id: self.id.clone(),
            clv: self.clv.clone(),
        };
        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.key)?)
    }
}

struct IssuedToken {
    value: String,
    expires_at: Instant,
}

impl IssuedToken {
    fn is_fresh(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Owns the bearer token used for every engine call.
///
/// Callers share the read lock and only wait while a refresh holds the write lock. A token is
/// never handed out once `validity` has elapsed since it was issued; a caller that finds a stale
/// token re-issues it itself.
pub struct JwtTokenProvider {
    auth: JwtAuth,
    validity: Duration,
    current: RwLock<Option<IssuedToken>>,
}

impl JwtTokenProvider {
    pub fn new(auth: JwtAuth, validity: Duration) -> Self {
        Self {
            auth,
            validity,
            current: RwLock::new(None),
        }
    }

    pub async fn token(&self) -> Result<String, AuthError> {
        if let Some(token) = self.current.read().await.as_ref()
            && token.is_fresh(Instant::now())
        {
            return Ok(token.value.clone());
        }

        let mut current = self.current.write().await;
        // Another caller may have refreshed while we waited for the write lock.
        if let Some(token) = current.as_ref()
            && token.is_fresh(Instant::now())
        {
            return Ok(token.value.clone());
        }
        let token = self.issue()?;
        let value = token.value.clone();
        *current = Some(token);
        Ok(value)
    }

    pub async fn refresh(&self) -> Result<(), AuthError> {
        let token = self.issue()?;
        *self.current.write().await = Some(token);
        Ok(())
    }

    pub async fn expires_at(&self) -> Option<Instant> {
        self.current
            .read()
            .await
            .as_ref()
            .map(|token| token.expires_at)
    }

    pub async fn run_refresher(self: Arc<Self>, interval: Duration, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("Jwt refresher stopped");
                    return;
                }
                _ = ticker.tick() => {
                    if let Err(err) = self.refresh().await {
                        warn!("Failed to refresh jwt token: {err}");
                    }
                }
            }
        }
    }

    fn issue(&self) -> Result<IssuedToken, AuthError> {
        Ok(IssuedToken {
            value: self.auth.generate_token()?,
            expires_at: Instant::now() + self.validity,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use jsonwebtoken::{DecodingKey, Validation, decode};

    use super::*;

    const SECRET: &str = "0x7365637265747365637265747365637265747365637265747365637265747365";

    fn decode_claims(token: &str, secret: &JwtSecret) -> Claims {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.validate_exp = false;
        decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
            .expect("token should verify")
            .claims
    }

    #[test]
    fn test_secret_from_hex() {
        let secret = JwtSecret::from_hex(SECRET).expect("valid secret");
        assert_eq!(secret.as_bytes().len(), JWT_SECRET_LENGTH);
        assert_eq!(JwtSecret::from_hex(&SECRET[2..]).expect("valid secret"), secret);
        assert!(matches!(
            JwtSecret::from_hex("0xabcd"),
            Err(AuthError::InvalidLength(2))
        ));
        assert!(matches!(JwtSecret::from_hex("0xzz"), Err(AuthError::Hex(_))));
    }

    #[test]
    fn test_secret_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "{SECRET}").expect("write secret");

        let secret = JwtSecret::from_file(file.path()).expect("valid secret file");
        assert_eq!(secret, JwtSecret::from_hex(SECRET).expect("valid secret"));
    }

    #[test]
    fn test_token_claims() {
        let secret = JwtSecret::from_hex(SECRET).expect("valid secret");
        let auth = JwtAuth::new(
            &secret,
            Some("node-1".to_string()),
            Some("ream/v0.1.0".to_string()),
        );

        let claims = decode_claims(&auth.generate_token().expect("token"), &secret);
        assert_eq!(claims.id.as_deref(), Some("node-1"));
        assert_eq!(claims.clv.as_deref(), Some("ream/v0.1.0"));
        assert!(claims.iat.abs_diff(get_current_timestamp()) <= 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_token_not_used_past_validity() {
        let secret = JwtSecret::from_hex(SECRET).expect("valid secret");
        let provider =
            JwtTokenProvider::new(JwtAuth::new(&secret, None, None), Duration::from_secs(30));

        provider.token().await.expect("token");
        let first_expiry = provider.expires_at().await.expect("token issued");

        tokio::time::advance(Duration::from_secs(10)).await;
        provider.token().await.expect("token");
        assert_eq!(provider.expires_at().await, Some(first_expiry));

        tokio::time::advance(Duration::from_secs(20)).await;
        provider.token().await.expect("token");
        let second_expiry = provider.expires_at().await.expect("token issued");
        assert!(second_expiry > first_expiry);
        assert!(Instant::now() < second_expiry);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresher_renews_and_stops() {
        let secret = JwtSecret::from_hex(SECRET).expect("valid secret");
        let provider = Arc::new(JwtTokenProvider::new(
            JwtAuth::new(&secret, None, None),
            Duration::from_secs(30),
        ));
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(
            provider
                .clone()
                .run_refresher(Duration::from_secs(20), shutdown.clone()),
        );

        tokio::time::sleep(Duration::from_secs(1)).await;
        let first_expiry = provider.expires_at().await.expect("refreshed on first tick");

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert!(provider.expires_at().await.expect("refreshed") > first_expiry);

        shutdown.cancel();
        handle.await.expect("refresher exits");
    }
}
