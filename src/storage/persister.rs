//! Fire-and-forget snapshot writer
//!
//! In background mode a tokio task owns the writes: callers push serialized
//! documents into a channel and return immediately. Writes land in the order
//! they were queued; a burst of saves is coalesced to the newest document.
//! Failures are logged and swallowed, the in-memory state stays authoritative.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use super::{KeyValueStore, StorageError, StorageResult, DEFAULT_STORAGE_KEY};

enum Command {
    Save(String),
    Flush(oneshot::Sender<()>),
}

enum Mode {
    Inline,
    Background(mpsc::UnboundedSender<Command>),
}

/// Writes learner-state documents to a [`KeyValueStore`]
pub struct Persister {
    store: Arc<dyn KeyValueStore>,
    key: String,
    mode: Mode,
}

impl Persister {
    /// Writes synchronously on every save
    pub fn inline(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            key: DEFAULT_STORAGE_KEY.to_string(),
            mode: Mode::Inline,
        }
    }

    /// Spawns a writer task on the current tokio runtime
    ///
    /// Outside a runtime this degrades to [`Persister::inline`].
    pub fn spawn(store: Arc<dyn KeyValueStore>) -> Self {
        Self::spawn_with_key(store, DEFAULT_STORAGE_KEY)
    }

    pub fn spawn_with_key(store: Arc<dyn KeyValueStore>, key: &str) -> Self {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                tracing::warn!("no tokio runtime, persisting inline");
                return Self::inline(store).with_key(key);
            }
        };

        let (tx, rx) = mpsc::unbounded_channel();
        handle.spawn(run_writer(Arc::clone(&store), key.to_string(), rx));

        Self {
            store,
            key: key.to_string(),
            mode: Mode::Background(tx),
        }
    }

    /// Overrides the storage key
    pub fn with_key(mut self, key: &str) -> Self {
        self.key = key.to_string();
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Reads the stored document, if any
    pub fn load(&self) -> StorageResult<Option<String>> {
        self.store.get_item(&self.key)
    }

    /// Reads the stored document on the blocking pool
    pub async fn load_async(&self) -> StorageResult<Option<String>> {
        let store = Arc::clone(&self.store);
        let key = self.key.clone();
        tokio::task::spawn_blocking(move || store.get_item(&key))
            .await
            .map_err(|e| StorageError::Task(e.to_string()))?
    }

    /// Queues (or, inline, performs) a write; never fails
    pub fn save(&self, document: String) {
        match &self.mode {
            Mode::Inline => write_logged(self.store.as_ref(), &self.key, &document),
            Mode::Background(tx) => {
                if let Err(mpsc::error::SendError(command)) = tx.send(Command::Save(document)) {
                    tracing::warn!(key = %self.key, "writer task gone, writing inline");
                    if let Command::Save(document) = command {
                        write_logged(self.store.as_ref(), &self.key, &document);
                    }
                }
            }
        }
    }

    /// Resolves once every queued write has been attempted
    pub async fn flush(&self) {
        if let Mode::Background(tx) = &self.mode {
            let (ack_tx, ack_rx) = oneshot::channel();
            if tx.send(Command::Flush(ack_tx)).is_ok() {
                let _ = ack_rx.await;
            }
        }
    }
}

async fn run_writer(
    store: Arc<dyn KeyValueStore>,
    key: String,
    mut rx: mpsc::UnboundedReceiver<Command>,
) {
    while let Some(command) = rx.recv().await {
        let mut document = match command {
            Command::Flush(ack) => {
                let _ = ack.send(());
                continue;
            }
            Command::Save(document) => document,
        };

        // coalesce queued saves; stop at a flush so it is acked after the write
        let mut pending_ack = None;
        while let Ok(next) = rx.try_recv() {
            match next {
                Command::Save(newer) => document = newer,
                Command::Flush(ack) => {
                    pending_ack = Some(ack);
                    break;
                }
            }
        }

        let task_store = Arc::clone(&store);
        let task_key = key.clone();
        let written =
            tokio::task::spawn_blocking(move || write_logged(task_store.as_ref(), &task_key, &document))
                .await;
        if let Err(err) = written {
            tracing::error!(key = %key, error = %err, "persistence task panicked");
        }

        if let Some(ack) = pending_ack {
            let _ = ack.send(());
        }
    }
    tracing::debug!(key = %key, "persistence writer stopped");
}

fn write_logged(store: &dyn KeyValueStore, key: &str, document: &str) {
    match store.set_item(key, document) {
        Ok(()) => tracing::trace!(key, bytes = document.len(), "state persisted"),
        Err(err) => tracing::error!(key, error = %err, "failed to persist state"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get_item(&self, _key: &str) -> StorageResult<Option<String>> {
            Err(StorageError::Io(std::io::Error::other("disk gone")))
        }

        fn set_item(&self, _key: &str, _value: &str) -> StorageResult<()> {
            Err(StorageError::Io(std::io::Error::other("disk gone")))
        }

        fn remove_item(&self, _key: &str) -> StorageResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_inline_save_and_load() {
        let store = Arc::new(MemoryStore::new());
        let persister = Persister::inline(store.clone());
        persister.save("doc-1".into());
        assert_eq!(persister.load().unwrap(), Some("doc-1".to_string()));
        assert_eq!(store.get_item(DEFAULT_STORAGE_KEY).unwrap(), Some("doc-1".to_string()));
    }

    #[test]
    fn test_spawn_outside_runtime_falls_back_inline() {
        let store = Arc::new(MemoryStore::new());
        let persister = Persister::spawn_with_key(store.clone(), "custom");
        persister.save("doc".into());
        assert_eq!(store.get_item("custom").unwrap(), Some("doc".to_string()));
    }

    #[test]
    fn test_write_failure_swallowed() {
        let persister = Persister::inline(Arc::new(BrokenStore));
        persister.save("doc".into());
        assert!(persister.load().is_err());
    }

    #[tokio::test]
    async fn test_background_writes_land_in_order() {
        let store = Arc::new(MemoryStore::new());
        let persister = Persister::spawn(store.clone());
        for i in 0..50 {
            persister.save(format!("doc-{i}"));
        }
        persister.flush().await;
        assert_eq!(store.get_item(DEFAULT_STORAGE_KEY).unwrap(), Some("doc-49".to_string()));

        persister.save("doc-final".into());
        persister.flush().await;
        assert_eq!(persister.load_async().await.unwrap(), Some("doc-final".to_string()));
    }
}
