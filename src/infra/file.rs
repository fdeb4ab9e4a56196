use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::Mutex;

use crate::domain::ticket::{LogEntry, Ticket, TicketStatus, TicketUpdate};
use crate::error::{AppError, AppResult};
use crate::services::ticket_store::{Insertion, TicketStore, newest_first};

#[derive(Default, Serialize, Deserialize)]
struct StoreFile {
    tickets: Vec<Ticket>,
}

/// Ticket store kept as a single JSON document. Every mutation rewrites the
/// whole file through a temporary sibling and a rename.
pub struct FileTicketStore {
    file_path: PathBuf,
    lock: Mutex<()>,
}

impl FileTicketStore {
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    async fn load(&self) -> AppResult<StoreFile> {
        match fs::read_to_string(&self.file_path).await {
            Ok(contents) if contents.trim().is_empty() => Ok(StoreFile::default()),
            Ok(contents) => serde_json::from_str::<StoreFile>(&contents).map_err(|err| {
                AppError::Store(format!(
                    "invalid ticket file {}: {err}",
                    self.file_path.display()
                ))
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(StoreFile::default()),
            Err(err) => Err(AppError::Io(err)),
        }
    }

    async fn save(&self, file: &StoreFile) -> AppResult<()> {
        if let Some(parent) = self.file_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let data = serde_json::to_string_pretty(file)?;
        let tmp = self.file_path.with_extension("json.tmp");
        fs::write(&tmp, data).await?;
        fs::rename(&tmp, &self.file_path).await?;
        tracing::debug!(path = %self.file_path.display(), tickets = file.tickets.len(), "ticket file saved");
        Ok(())
    }
}

#[async_trait]
impl TicketStore for FileTicketStore {
    async fn insert(&self, ticket: Ticket) -> AppResult<String> {
        let _guard = self.lock.lock().await;
        let mut file = self.load().await?;
        if file.tickets.iter().any(|existing| existing.id == ticket.id) {
            return Err(AppError::Store(format!("duplicate ticket id {}", ticket.id)));
        }
        let id = ticket.id.clone();
        file.tickets.push(ticket);
        self.save(&file).await?;
        Ok(id)
    }

    async fn insert_unique(&self, ticket: Ticket) -> AppResult<Insertion> {
        let _guard = self.lock.lock().await;
        let mut file = self.load().await?;
        if !ticket.submission_key.is_empty() {
            if let Some(existing) = file
                .tickets
                .iter()
                .find(|existing| existing.submission_key == ticket.submission_key)
            {
                return Ok(Insertion::Existing(existing.clone()));
            }
        }
        if file.tickets.iter().any(|existing| existing.id == ticket.id) {
            return Err(AppError::Store(format!("duplicate ticket id {}", ticket.id)));
        }
        let id = ticket.id.clone();
        file.tickets.push(ticket);
        self.save(&file).await?;
        Ok(Insertion::Inserted(id))
    }

    async fn fetch(&self, id: &str) -> AppResult<Option<Ticket>> {
        let _guard = self.lock.lock().await;
        let file = self.load().await?;
        Ok(file.tickets.into_iter().find(|ticket| ticket.id == id))
    }

    async fn update(&self, id: &str, update: TicketUpdate) -> AppResult<Option<Ticket>> {
        let _guard = self.lock.lock().await;
        let mut file = self.load().await?;
        let Some(ticket) = file.tickets.iter_mut().find(|ticket| ticket.id == id) else {
            return Ok(None);
        };
        ticket.apply(&update);
        let updated = ticket.clone();
        self.save(&file).await?;
        Ok(Some(updated))
    }

    async fn delete(&self, id: &str) -> AppResult<bool> {
        let _guard = self.lock.lock().await;
        let mut file = self.load().await?;
        let before = file.tickets.len();
        file.tickets.retain(|ticket| ticket.id != id);
        if file.tickets.len() == before {
            return Ok(false);
        }
        self.save(&file).await?;
        Ok(true)
    }

    async fn append_log(&self, id: &str, entry: LogEntry) -> AppResult<bool> {
        let _guard = self.lock.lock().await;
        let mut file = self.load().await?;
        let Some(ticket) = file.tickets.iter_mut().find(|ticket| ticket.id == id) else {
            return Ok(false);
        };
        ticket.log.push(entry);
        self.save(&file).await?;
        Ok(true)
    }

    async fn list(&self, status: Option<TicketStatus>) -> AppResult<Vec<Ticket>> {
        let _guard = self.lock.lock().await;
        let file = self.load().await?;
        let tickets = file
            .tickets
            .into_iter()
            .filter(|ticket| status.is_none_or(|wanted| ticket.status == wanted))
            .collect();
        Ok(newest_first(tickets))
    }
}
