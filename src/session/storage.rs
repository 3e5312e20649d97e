//! Session persistence between CLI invocations.
//!
//! Stores the session as JSON with the bearer token encrypted at rest
//! (AES-256-GCM, generated key file). A missing or undecryptable session
//! degrades to "not logged in", never to a crash.

use super::{SessionContext, UserProfile};
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use std::path::PathBuf;
use tokio::fs;
use tracing::{info, warn};

const SESSION_FILE: &str = "session.json";
const ENCRYPTION_KEY_FILE: &str = ".session_key";
const NONCE_SIZE: usize = 12;

/// On-disk session record; the `token` field holds ciphertext.
#[derive(serde::Serialize, serde::Deserialize)]
struct StoredSession {
    token: String,
    user: UserProfile,
    login_time: chrono::DateTime<chrono::Utc>,
}

/// Session storage manager.
pub struct SessionStorage {
    session_path: PathBuf,
    key_path: PathBuf,
}

impl SessionStorage {
    /// Storage under the platform data directory.
    pub fn new() -> Self {
        let base_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sendfleet");
        Self::with_path(base_dir)
    }

    /// Storage with a custom base directory (config override, tests).
    pub fn with_path(base_dir: PathBuf) -> Self {
        Self {
            session_path: base_dir.join(SESSION_FILE),
            key_path: base_dir.join(ENCRYPTION_KEY_FILE),
        }
    }

    async fn ensure_dir(&self) -> anyhow::Result<()> {
        if let Some(parent) = self.session_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Get or create the encryption key.
    async fn get_or_create_key(&self) -> anyhow::Result<[u8; 32]> {
        self.ensure_dir().await?;

        if self.key_path.exists() {
            let key_data = fs::read(&self.key_path).await?;
            let key_bytes = BASE64.decode(&key_data)?;
            if key_bytes.len() == 32 {
                let mut key = [0u8; 32];
                key.copy_from_slice(&key_bytes);
                return Ok(key);
            }
        }

        let key: [u8; 32] = rand::random();
        let key_b64 = BASE64.encode(key);
        fs::write(&self.key_path, key_b64).await?;

        // Restrict the key file (Unix only).
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&self.key_path, perms)?;
        }

        info!("Generated new encryption key for session storage");
        Ok(key)
    }

    fn encrypt(&self, plaintext: &str, key: &[u8; 32]) -> anyhow::Result<String> {
        let cipher = Aes256Gcm::new_from_slice(key)
            .map_err(|e| anyhow::anyhow!("Invalid key length: {}", e))?;
        let nonce_bytes: [u8; NONCE_SIZE] = rand::random();
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| anyhow::anyhow!("Encryption failed: {}", e))?;

        // nonce + ciphertext, base64 encoded.
        let mut combined = nonce_bytes.to_vec();
        combined.extend(ciphertext);
        Ok(BASE64.encode(&combined))
    }

    fn decrypt(&self, encrypted: &str, key: &[u8; 32]) -> anyhow::Result<String> {
        let combined = BASE64.decode(encrypted)?;
        if combined.len() < NONCE_SIZE {
            return Err(anyhow::anyhow!("Invalid encrypted data"));
        }

        let (nonce_bytes, ciphertext) = combined.split_at(NONCE_SIZE);
        let cipher = Aes256Gcm::new_from_slice(key)
            .map_err(|e| anyhow::anyhow!("Invalid key length: {}", e))?;
        let nonce = Nonce::from_slice(nonce_bytes);

        let plaintext = cipher
            .decrypt(nonce, ciphertext)
            .map_err(|e| anyhow::anyhow!("Decryption failed: {}", e))?;

        String::from_utf8(plaintext).map_err(Into::into)
    }

    /// Load the persisted session, if any. Corrupted state is treated as
    /// logged out.
    pub async fn load(&self) -> anyhow::Result<Option<SessionContext>> {
        if !self.session_path.exists() {
            return Ok(None);
        }

        let key = self.get_or_create_key().await?;
        let content = fs::read_to_string(&self.session_path).await?;
        let stored: StoredSession = match serde_json::from_str(&content) {
            Ok(stored) => stored,
            Err(e) => {
                warn!("Session file unreadable, treating as logged out: {}", e);
                return Ok(None);
            }
        };

        let token = match self.decrypt(&stored.token, &key) {
            Ok(token) => token,
            Err(e) => {
                warn!("Failed to decrypt session token, treating as logged out: {}", e);
                return Ok(None);
            }
        };

        let session = SessionContext::restore(token, stored.user, stored.login_time);
        info!("Loaded session from {:?}", self.session_path);
        Ok(Some(session))
    }

    /// Persist the session. Called at login.
    pub async fn save(&self, session: &SessionContext) -> anyhow::Result<()> {
        self.ensure_dir().await?;
        let key = self.get_or_create_key().await?;

        let stored = StoredSession {
            token: self.encrypt(session.raw_token(), &key)?,
            user: session.user.clone(),
            login_time: session.login_time,
        };

        let content = serde_json::to_string_pretty(&stored)?;
        fs::write(&self.session_path, content).await?;

        info!("Saved session to {:?}", self.session_path);
        Ok(())
    }

    /// Remove the persisted session. Called at logout.
    pub async fn clear(&self) -> anyhow::Result<()> {
        if self.session_path.exists() {
            fs::remove_file(&self.session_path).await?;
            info!("Cleared session at {:?}", self.session_path);
        }
        Ok(())
    }
}

impl Default for SessionStorage {
    fn default() -> Self {
        Self::new()
    }
}
