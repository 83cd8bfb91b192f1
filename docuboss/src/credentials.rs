//! Dust credentials and their persistence
//!
//! Credentials are all-or-nothing: a record with any blank field is treated
//! as absent. Stores are keyed by profile, one profile per user.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::agent::{AgentRole, AgentTarget};

/// Errors from credential validation and persistence
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Incomplete credentials: missing {0}")]
    Incomplete(String),

    #[error("Credential store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Credential store format error: {0}")]
    Format(#[from] serde_yaml::Error),
}

/// Workspace, API key and the three agent IDs
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Credentials {
    #[serde(default)]
    pub workspace_id: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub planning_agent_id: String,
    #[serde(default)]
    pub short_ask_agent_id: String,
    #[serde(default)]
    pub generic_agent_id: String,
}

impl Credentials {
    /// Names of blank fields, in form order
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("workspace-id", &self.workspace_id),
            ("api-key", &self.api_key),
            ("planning-agent-id", &self.planning_agent_id),
            ("short-ask-agent-id", &self.short_ask_agent_id),
            ("generic-agent-id", &self.generic_agent_id),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }

    pub fn validate(&self) -> Result<(), CredentialError> {
        let missing = self.missing_fields();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(CredentialError::Incomplete(missing.join(", ")))
        }
    }

    pub fn agent_id(&self, role: AgentRole) -> &str {
        match role {
            AgentRole::Planning => &self.planning_agent_id,
            AgentRole::ShortAsk => &self.short_ask_agent_id,
            AgentRole::Generic => &self.generic_agent_id,
        }
    }

    /// Address a call to the agent configured for `role`
    pub fn target(&self, role: AgentRole) -> AgentTarget {
        AgentTarget::new(&self.workspace_id, &self.api_key, self.agent_id(role))
    }

    /// API key with most characters hidden, for display
    pub fn masked_api_key(&self) -> String {
        mask_secret(&self.api_key)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("workspace_id", &self.workspace_id)
            .field("api_key", &self.masked_api_key())
            .field("planning_agent_id", &self.planning_agent_id)
            .field("short_ask_agent_id", &self.short_ask_agent_id)
            .field("generic_agent_id", &self.generic_agent_id)
            .finish()
    }
}

fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..3].iter().collect();
    let tail: String = chars[chars.len() - 2..].iter().collect();
    format!("{}…{}", head, tail)
}

/// Credential persistence collaborator
pub trait CredentialStore: Send + Sync {
    /// Load the active credentials; incomplete records read as `None`
    fn get(&self) -> Result<Option<Credentials>, CredentialError>;

    /// Save credentials; incomplete records are rejected
    fn put(&self, credentials: &Credentials) -> Result<(), CredentialError>;
}

/// On-disk layout: one entry per profile
#[derive(Debug, Default, Serialize, Deserialize)]
struct CredentialsFile {
    #[serde(default)]
    profiles: BTreeMap<String, Credentials>,
}

/// YAML file store
pub struct FileCredentialStore {
    path: PathBuf,
    profile: String,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>, profile: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            profile: profile.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn profile(&self) -> &str {
        &self.profile
    }

    fn read_file(&self) -> Result<CredentialsFile, CredentialError> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "read_file: no credentials file yet");
            return Ok(CredentialsFile::default());
        }
        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(CredentialsFile::default());
        }
        Ok(serde_yaml::from_str(&content)?)
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self) -> Result<Option<Credentials>, CredentialError> {
        debug!(profile = %self.profile, path = %self.path.display(), "FileCredentialStore::get: called");
        let file = self.read_file()?;
        Ok(file
            .profiles
            .get(&self.profile)
            .filter(|c| c.is_complete())
            .cloned())
    }

    fn put(&self, credentials: &Credentials) -> Result<(), CredentialError> {
        debug!(profile = %self.profile, path = %self.path.display(), "FileCredentialStore::put: called");
        credentials.validate()?;

        let mut file = self.read_file()?;
        file.profiles.insert(self.profile.clone(), credentials.clone());

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_yaml::to_string(&file)?)?;
        restrict_permissions(&self.path)?;

        info!(profile = %self.profile, "Saved credentials to {}", self.path.display());
        Ok(())
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

/// Process-local store, used when nothing should touch disk
#[derive(Default)]
pub struct MemoryCredentialStore {
    inner: Mutex<Option<Credentials>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(credentials: Credentials) -> Self {
        Self {
            inner: Mutex::new(Some(credentials)),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self) -> Result<Option<Credentials>, CredentialError> {
        let guard = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(guard.clone().filter(Credentials::is_complete))
    }

    fn put(&self, credentials: &Credentials) -> Result<(), CredentialError> {
        credentials.validate()?;
        let mut guard = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Some(credentials.clone());
        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn sample_credentials() -> Credentials {
    Credentials {
        workspace_id: "ws-1".to_string(),
        api_key: "sk-0123456789abcdef".to_string(),
        planning_agent_id: "plan-agent".to_string(),
        short_ask_agent_id: "ask-agent".to_string(),
        generic_agent_id: "chat-agent".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_fields() {
        let mut creds = sample_credentials();
        assert!(creds.is_complete());

        creds.api_key = " ".to_string();
        creds.generic_agent_id.clear();
        assert_eq!(creds.missing_fields(), vec!["api-key", "generic-agent-id"]);
        assert!(matches!(creds.validate(), Err(CredentialError::Incomplete(_))));
    }

    #[test]
    fn test_target_per_role() {
        let creds = sample_credentials();
        let target = creds.target(AgentRole::ShortAsk);
        assert_eq!(target.workspace_id, "ws-1");
        assert_eq!(target.api_key, "sk-0123456789abcdef");
        assert_eq!(target.agent_id, "ask-agent");
        assert_eq!(creds.agent_id(AgentRole::Planning), "plan-agent");
        assert_eq!(creds.agent_id(AgentRole::Generic), "chat-agent");
    }

    #[test]
    fn test_debug_masks_api_key() {
        let rendered = format!("{:?}", sample_credentials());
        assert!(!rendered.contains("sk-0123456789abcdef"));
        assert!(rendered.contains("sk-…ef"));
        assert_eq!(mask_secret("short"), "*****");
    }

    #[test]
    fn test_file_store_round_trip_per_profile() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("credentials.yml");

        let alice = FileCredentialStore::new(&path, "alice");
        let bob = FileCredentialStore::new(&path, "bob");
        assert!(alice.get().unwrap().is_none());

        alice.put(&sample_credentials()).unwrap();
        assert_eq!(alice.get().unwrap(), Some(sample_credentials()));
        assert!(bob.get().unwrap().is_none());

        let mut other = sample_credentials();
        other.workspace_id = "ws-bob".to_string();
        bob.put(&other).unwrap();
        assert_eq!(alice.get().unwrap().unwrap().workspace_id, "ws-1");
        assert_eq!(bob.get().unwrap().unwrap().workspace_id, "ws-bob");
    }

    #[cfg(unix)]
    #[test]
    fn test_file_store_restricts_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("credentials.yml");
        FileCredentialStore::new(&path, "default")
            .put(&sample_credentials())
            .unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_file_store_rejects_incomplete() {
        let dir = TempDir::new().unwrap();
        let store = FileCredentialStore::new(dir.path().join("c.yml"), "default");
        let mut creds = sample_credentials();
        creds.workspace_id.clear();
        assert!(matches!(store.put(&creds), Err(CredentialError::Incomplete(_))));
        assert!(!store.path().exists());
    }

    #[test]
    fn test_file_store_treats_incomplete_record_as_absent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("credentials.yml");
        fs::write(
            &path,
            "profiles:\n  default:\n    workspace-id: ws\n    api-key: sk\n",
        )
        .unwrap();
        let store = FileCredentialStore::new(&path, "default");
        assert!(store.get().unwrap().is_none());
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryCredentialStore::new();
        assert!(store.get().unwrap().is_none());
        store.put(&sample_credentials()).unwrap();
        assert_eq!(store.get().unwrap(), Some(sample_credentials()));
    }
}
