use crate::{
    challenge::riddle::RiddleBook, log_error, log_internal, title::TitleBook,
};
use anyhow::{anyhow, Result};
use serde::{de::DeserializeOwned, Serialize};
use serenity::all::UserId;
use std::{
    collections::{BTreeSet, HashMap},
    io::ErrorKind,
    marker::PhantomData,
    path::{Path, PathBuf},
};
use tokio::sync::Mutex;

/// State which persists across sessions
///
/// One JSON document per concern, all inside the same data directory.
pub struct PersistentState {
    pub users: JsonDocument<UserBook>,
    pub riddle_scores: JsonDocument<RiddleBook>,
    pub titles: JsonDocument<TitleBook>,
    pub message_counts: JsonDocument<MessageCounts>,
    pub ranks: JsonDocument<RankBook>,
    pub conversations: JsonDocument<ConversationBook>,
}

/// A single JSON file holding one top-level object.
///
/// Missing or malformed files read as the default document.  Read-modify-write cycles through
/// [`JsonDocument::update`] are serialized within this process; nothing guards against other
/// processes writing the same file.
pub struct JsonDocument<T> {
    path: PathBuf,
    write_lock: Mutex<()>,
    _document: PhantomData<fn() -> T>,
}

#[derive(Default, serde::Serialize, serde::Deserialize)]
pub struct UserBook {
    #[serde(default)]
    pub users: HashMap<UserId, UserRecord>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct UserRecord {
    #[serde(default)]
    pub experiments_completed: u64,
    #[serde(default)]
    pub achievements: BTreeSet<String>,
}

/// Messages sent per user.  Only ever goes up.
#[derive(Default, serde::Serialize, serde::Deserialize)]
pub struct MessageCounts(pub HashMap<UserId, u64>);

/// The rank each user was last promoted to.
#[derive(Default, serde::Serialize, serde::Deserialize)]
pub struct RankBook(pub HashMap<UserId, String>);

#[derive(Default, serde::Serialize, serde::Deserialize)]
pub struct ConversationBook(pub HashMap<UserId, Vec<ConversationEntry>>);

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ConversationEntry {
    /// UNIX timestamp in seconds
    pub timestamp: u64,
    pub message: String,
}

impl PersistentState {
    pub async fn open(dir: &Path) -> Result<Self> {
        tokio::fs::create_dir_all(dir).await.map_err(|e| {
            anyhow!(
                "Could not create data directory `{}`: {}",
                dir.to_string_lossy(),
                e
            )
        })?;

        log_internal!("Using data directory `{}`", dir.to_string_lossy());

        Ok(Self {
            users: JsonDocument::new(dir.join("users.json")),
            riddle_scores: JsonDocument::new(dir.join("riddle_scores.json")),
            titles: JsonDocument::new(dir.join("role_assignments.json")),
            message_counts: JsonDocument::new(dir.join("message_counts.json")),
            ranks: JsonDocument::new(dir.join("user_progression.json")),
            conversations: JsonDocument::new(dir.join("conversation_history.json")),
        })
    }
}

impl<T> JsonDocument<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
            _document: PhantomData,
        }
    }

    #[cfg(test)]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load(&self) -> T {
        let data = match tokio::fs::read(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return T::default(),
            Err(e) => {
                log_error!(
                    "Could not read `{}`, starting from an empty document: {}",
                    self.path.to_string_lossy(),
                    e
                );
                return T::default();
            }
        };

        match serde_json::from_slice(&data) {
            Ok(document) => document,
            Err(e) => {
                log_error!(
                    "Could not parse `{}`, starting from an empty document: {}",
                    self.path.to_string_lossy(),
                    e
                );
                T::default()
            }
        }
    }

    pub async fn save(&self, document: &T) -> Result<()> {
        let serialized = serde_json::to_string_pretty(document).map_err(|e| {
            anyhow!(
                "Could not serialize `{}`: {}",
                self.path.to_string_lossy(),
                e
            )
        })?;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                anyhow!(
                    "Could not create directory `{}`: {}",
                    parent.to_string_lossy(),
                    e
                )
            })?;
        }

        // Create a temporary file in the same directory.
        let tmp_path = self.path.with_extension("json.new");

        tokio::fs::write(&tmp_path, serialized).await.map_err(|e| {
            anyhow!(
                "Could not write temporary file `{}`: {}",
                tmp_path.to_string_lossy(),
                e
            )
        })?;

        // Atomically rename the temporary file over the target file.
        tokio::fs::rename(&tmp_path, &self.path).await.map_err(|e| {
            anyhow!(
                "Could not rename temporary file `{}` to `{}`: {}",
                tmp_path.to_string_lossy(),
                self.path.to_string_lossy(),
                e
            )
        })?;

        Ok(())
    }

    /// Load, apply `f`, save.  Returns whatever `f` returns.
    pub async fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R> {
        let _guard = self.write_lock.lock().await;
        let mut document = self.load().await;
        let result = f(&mut document);
        self.save(&document).await?;
        Ok(result)
    }
}

impl UserBook {
    #[cfg(test)]
    pub fn get(&self, user_id: UserId) -> Option<&UserRecord> {
        self.users.get(&user_id)
    }

    pub fn entry(&mut self, user_id: UserId) -> &mut UserRecord {
        self.users.entry(user_id).or_default()
    }
}

impl JsonDocument<ConversationBook> {
    /// Append a line to the user's conversation and return the updated conversation.
    pub async fn append(
        &self,
        user_id: UserId,
        timestamp: u64,
        message: String,
    ) -> Result<Vec<ConversationEntry>> {
        self.update(|book| {
            let conversation = book.0.entry(user_id).or_default();
            conversation.push(ConversationEntry { timestamp, message });
            conversation.clone()
        })
        .await
    }
}
