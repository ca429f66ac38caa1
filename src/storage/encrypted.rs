//! SQLite-backed store with AES-GCM encryption of biometric bundles.
//! Key derived from device-bound secret (in production: Secure Enclave / Keystore / DPAPI).

use super::{ProfileStore, UserRecord};
use crate::error::StoreError;
use crate::profile::ProfileBundle;
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rand::RngCore;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::info;

const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;
const CURRENT_USER_KEY: &str = "current_user";
const PROFILE_UPSERT: &str =
    "INSERT OR REPLACE INTO profiles (user_id, bundle_id, created_at, bundle_enc) VALUES (?1, ?2, ?3, ?4)";
const META_UPSERT: &str = "INSERT OR REPLACE INTO meta (k, v) VALUES (?1, ?2)";

fn derive_key(seed: &[u8]) -> [u8; KEY_LEN] {
    use ring::digest;
    let mut out = [0u8; KEY_LEN];
    let h = digest::digest(&digest::SHA256, seed);
    out[..h.as_ref().len().min(KEY_LEN)].copy_from_slice(h.as_ref());
    out
}

fn encrypt(key: &[u8; KEY_LEN], plaintext: &[u8]) -> Result<String, StoreError> {
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| StoreError::Cipher)?;
    let mut nonce = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce);
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|_| StoreError::Cipher)?;
    let mut out = nonce.to_vec();
    out.extend(ciphertext);
    Ok(BASE64.encode(&out))
}

fn decrypt(key: &[u8; KEY_LEN], encoded: &str) -> Result<Vec<u8>, StoreError> {
    let raw = BASE64.decode(encoded)?;
    if raw.len() < NONCE_LEN {
        return Err(StoreError::Truncated);
    }
    let (nonce, ct) = raw.split_at(NONCE_LEN);
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| StoreError::Cipher)?;
    cipher
        .decrypt(Nonce::from_slice(nonce), ct)
        .map_err(|_| StoreError::Cipher)
}

pub struct SecureStore {
    conn: Mutex<Connection>,
    key: [u8; KEY_LEN],
}

impl SecureStore {
    /// Open or create DB at path. Key is derived from `secret` (in production: device-bound).
    pub fn open(path: &Path, secret: &[u8]) -> Result<Self, StoreError> {
        Self::with_connection(Connection::open(path)?, secret)
    }

    /// Volatile store, gone when dropped.
    pub fn open_in_memory(secret: &[u8]) -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?, secret)
    }

    fn with_connection(conn: Connection, secret: &[u8]) -> Result<Self, StoreError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS profiles (
                user_id TEXT PRIMARY KEY,
                bundle_id TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                bundle_enc TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS meta (k TEXT PRIMARY KEY, v TEXT NOT NULL);
            "#,
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
            key: derive_key(secret),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn put_meta(&self, k: &str, plain: &[u8]) -> Result<(), StoreError> {
        let enc = encrypt(&self.key, plain)?;
        self.conn().execute(META_UPSERT, params![k, enc])?;
        Ok(())
    }

    fn get_meta(&self, k: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let enc: Option<String> = self
            .conn()
            .query_row("SELECT v FROM meta WHERE k = ?1", params![k], |row| row.get(0))
            .optional()?;
        enc.map(|e| decrypt(&self.key, &e)).transpose()
    }

    /// Remove a user's bundle. Returns whether one existed.
    pub fn delete_bundle(&self, user: &str) -> Result<bool, StoreError> {
        let n = self
            .conn()
            .execute("DELETE FROM profiles WHERE user_id = ?1", params![user])?;
        Ok(n > 0)
    }
}

impl ProfileStore for SecureStore {
    fn save_bundle(&self, bundle: &ProfileBundle) -> Result<(), StoreError> {
        let enc = encrypt(&self.key, &serde_json::to_vec(bundle)?)?;
        self.conn().execute(
            PROFILE_UPSERT,
            params![bundle.user, bundle.id, bundle.created_at.timestamp_millis(), enc],
        )?;
        info!(user = %bundle.user, bundle_id = %bundle.id, "profile bundle stored");
        Ok(())
    }

    fn commit_registration(&self, bundle: &ProfileBundle, user: &UserRecord) -> Result<(), StoreError> {
        let bundle_enc = encrypt(&self.key, &serde_json::to_vec(bundle)?)?;
        let user_enc = encrypt(&self.key, &serde_json::to_vec(user)?)?;
        let mut conn = self.conn();
        // Dropping the transaction without commit rolls both writes back.
        let tx = conn.transaction()?;
        tx.execute(
            PROFILE_UPSERT,
            params![bundle.user, bundle.id, bundle.created_at.timestamp_millis(), bundle_enc],
        )?;
        tx.execute(META_UPSERT, params![CURRENT_USER_KEY, user_enc])?;
        tx.commit()?;
        info!(user = %bundle.user, bundle_id = %bundle.id, "registration committed");
        Ok(())
    }

    fn load_bundle(&self, user: &str) -> Result<Option<ProfileBundle>, StoreError> {
        let enc: Option<String> = self
            .conn()
            .query_row(
                "SELECT bundle_enc FROM profiles WHERE user_id = ?1",
                params![user],
                |row| row.get(0),
            )
            .optional()?;
        match enc {
            Some(e) => {
                let plain = decrypt(&self.key, &e)?;
                Ok(Some(serde_json::from_slice(&plain)?))
            }
            None => Ok(None),
        }
    }

    fn set_current_user(&self, user: &UserRecord) -> Result<(), StoreError> {
        self.put_meta(CURRENT_USER_KEY, &serde_json::to_vec(user)?)
    }

    fn current_user(&self) -> Result<Option<UserRecord>, StoreError> {
        match self.get_meta(CURRENT_USER_KEY)? {
            Some(plain) => Ok(Some(serde_json::from_slice(&plain)?)),
            None => Ok(None),
        }
    }

    fn clear_current_user(&self) -> Result<(), StoreError> {
        self.conn()
            .execute("DELETE FROM meta WHERE k = ?1", params![CURRENT_USER_KEY])?;
        Ok(())
    }
}
