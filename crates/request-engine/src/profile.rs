//! Profile and secret lookup
//!
//! Profiles are plain JSON configuration; tokens live in the OS
//! keychain, addressed by `(spec_id, profile_name)`, and are wrapped in
//! a zeroizing secret type so they never linger in memory or logs.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use indexmap::IndexMap;
use keyring::Entry;
use serde::{Deserialize, Serialize};
use tracing::debug;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{EngineError, EngineResult};

/// Keychain service name for stored tokens
const SERVICE_NAME: &str = "oascli";

/// Profile used when none is configured
pub const DEFAULT_PROFILE: &str = "default";

/// A named connection profile
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_scheme: Option<String>,
}

/// A token that zeroizes its memory on drop
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SecretToken(String);

impl SecretToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SecretToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretToken(***)")
    }
}

/// Lookup interface for profiles and stored tokens
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// All profiles plus the configured default profile name
    async fn read_profiles(&self) -> EngineResult<(Vec<Profile>, Option<String>)>;

    /// A profile by name, or the default profile when `name` is `None`
    async fn get_profile(&self, name: Option<&str>) -> EngineResult<Option<Profile>>;

    /// Stored token for `(spec_id, profile)`
    async fn get_token(&self, spec_id: &str, profile: &str) -> EngineResult<Option<SecretToken>>;

    /// Persist a token for `(spec_id, profile)`
    async fn store_token(&self, spec_id: &str, profile: &str, token: &str) -> EngineResult<()>;

    /// Remove the token for `(spec_id, profile)`
    async fn delete_token(&self, spec_id: &str, profile: &str) -> EngineResult<()>;
}

// --- In-memory store (tests, programmatic embedding) ---

/// Profile store held entirely in memory
#[derive(Default)]
pub struct MemoryProfileStore {
    profiles: Vec<Profile>,
    default_profile: Option<String>,
    tokens: Mutex<HashMap<(String, String), String>>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profile(mut self, profile: Profile, default: bool) -> Self {
        if default {
            self.default_profile = Some(profile.name.clone());
        }
        self.profiles.push(profile);
        self
    }

    pub fn with_token(self, spec_id: &str, profile: &str, token: &str) -> Self {
        if let Ok(mut tokens) = self.tokens.lock() {
            tokens.insert((spec_id.to_string(), profile.to_string()), token.to_string());
        }
        self
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn read_profiles(&self) -> EngineResult<(Vec<Profile>, Option<String>)> {
        Ok((self.profiles.clone(), self.default_profile.clone()))
    }

    async fn get_profile(&self, name: Option<&str>) -> EngineResult<Option<Profile>> {
        let wanted = name.or(self.default_profile.as_deref());
        Ok(wanted.and_then(|wanted| self.profiles.iter().find(|p| p.name == wanted).cloned()))
    }

    async fn get_token(&self, spec_id: &str, profile: &str) -> EngineResult<Option<SecretToken>> {
        let tokens = self
            .tokens
            .lock()
            .map_err(|_| EngineError::Profile("token store poisoned".to_string()))?;
        Ok(tokens
            .get(&(spec_id.to_string(), profile.to_string()))
            .map(SecretToken::new))
    }

    async fn store_token(&self, spec_id: &str, profile: &str, token: &str) -> EngineResult<()> {
        let mut tokens = self
            .tokens
            .lock()
            .map_err(|_| EngineError::Profile("token store poisoned".to_string()))?;
        tokens.insert((spec_id.to_string(), profile.to_string()), token.to_string());
        Ok(())
    }

    async fn delete_token(&self, spec_id: &str, profile: &str) -> EngineResult<()> {
        let mut tokens = self
            .tokens
            .lock()
            .map_err(|_| EngineError::Profile("token store poisoned".to_string()))?;
        tokens.remove(&(spec_id.to_string(), profile.to_string()));
        Ok(())
    }
}

// --- File + keychain store ---

/// On-disk layout of `profiles.json`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfilesFile {
    #[serde(default)]
    profiles: IndexMap<String, ProfileEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    default_profile: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    server: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    auth_scheme: Option<String>,
}

/// Profile store backed by a JSON file and the OS keychain
pub struct FileProfileStore {
    profiles_path: PathBuf,
}

impl FileProfileStore {
    /// Store under the user's config directory
    pub fn new() -> EngineResult<Self> {
        let dirs = directories::ProjectDirs::from("", "", "oascli")
            .ok_or_else(|| EngineError::Profile("cannot determine config directory".to_string()))?;
        Ok(Self {
            profiles_path: dirs.config_dir().join("profiles.json"),
        })
    }

    /// Store rooted at an explicit path (tests)
    pub fn at(profiles_path: impl Into<PathBuf>) -> Self {
        Self {
            profiles_path: profiles_path.into(),
        }
    }

    fn load(&self) -> EngineResult<ProfilesFile> {
        load_profiles_file(&self.profiles_path)
    }

    fn entry(spec_id: &str, profile: &str) -> EngineResult<Entry> {
        Entry::new(SERVICE_NAME, &format!("{}:{}", spec_id, profile))
            .map_err(|e| EngineError::Profile(e.to_string()))
    }
}

fn load_profiles_file(path: &Path) -> EngineResult<ProfilesFile> {
    if !path.exists() {
        debug!("no profiles file at {:?}, using defaults", path);
        return Ok(ProfilesFile::default());
    }
    let contents =
        std::fs::read_to_string(path).map_err(|e| EngineError::Profile(e.to_string()))?;
    serde_json::from_str(&contents).map_err(|e| EngineError::Profile(e.to_string()))
}

#[async_trait]
impl ProfileStore for FileProfileStore {
    async fn read_profiles(&self) -> EngineResult<(Vec<Profile>, Option<String>)> {
        let file = self.load()?;
        let profiles = file
            .profiles
            .iter()
            .map(|(name, entry)| Profile {
                name: name.clone(),
                server: entry.server.clone(),
                auth_scheme: entry.auth_scheme.clone(),
            })
            .collect();
        Ok((profiles, file.default_profile))
    }

    async fn get_profile(&self, name: Option<&str>) -> EngineResult<Option<Profile>> {
        let file = self.load()?;
        let wanted = match name {
            Some(name) => Some(name.to_string()),
            None => file.default_profile.clone(),
        };
        let Some(wanted) = wanted else {
            return Ok(None);
        };
        Ok(file.profiles.get(&wanted).map(|entry| Profile {
            name: wanted.clone(),
            server: entry.server.clone(),
            auth_scheme: entry.auth_scheme.clone(),
        }))
    }

    async fn get_token(&self, spec_id: &str, profile: &str) -> EngineResult<Option<SecretToken>> {
        match Self::entry(spec_id, profile)?.get_password() {
            Ok(token) => Ok(Some(SecretToken::new(token))),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(EngineError::Profile(e.to_string())),
        }
    }

    async fn store_token(&self, spec_id: &str, profile: &str, token: &str) -> EngineResult<()> {
        Self::entry(spec_id, profile)?
            .set_password(token)
            .map_err(|e| EngineError::Profile(e.to_string()))
    }

    async fn delete_token(&self, spec_id: &str, profile: &str) -> EngineResult<()> {
        match Self::entry(spec_id, profile)?.delete_password() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(EngineError::Profile(e.to_string())),
        }
    }
}
