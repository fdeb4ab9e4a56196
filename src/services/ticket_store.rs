use async_trait::async_trait;

use crate::domain::ticket::{LogEntry, Ticket, TicketStatus, TicketUpdate};
use crate::error::AppResult;

/// Minimum prefix length accepted for short-id lookups.
pub const MIN_PREFIX_LEN: usize = 6;

pub fn newest_first(mut tickets: Vec<Ticket>) -> Vec<Ticket> {
    tickets.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
    tickets
}

/// Result of a keyed insert.
#[derive(Debug, Clone, PartialEq)]
pub enum Insertion {
    Inserted(String),
    /// A ticket with the same submission key was already stored.
    Existing(Ticket),
}

/// Persistence port for ticket records. Identifiers are opaque strings.
#[async_trait]
pub trait TicketStore: Send + Sync {
    async fn insert(&self, ticket: Ticket) -> AppResult<String>;
    /// Inserts unless a ticket with the same non-empty `submission_key`
    /// exists. The check and the insert are one atomic step.
    async fn insert_unique(&self, ticket: Ticket) -> AppResult<Insertion>;
    async fn fetch(&self, id: &str) -> AppResult<Option<Ticket>>;
    /// Returns the updated record, or `None` when `id` is unknown.
    async fn update(&self, id: &str, update: TicketUpdate) -> AppResult<Option<Ticket>>;
    async fn delete(&self, id: &str) -> AppResult<bool>;
    async fn append_log(&self, id: &str, entry: LogEntry) -> AppResult<bool>;
    /// Newest first.
    async fn list(&self, status: Option<TicketStatus>) -> AppResult<Vec<Ticket>>;

    async fn find_by_submission_key(&self, key: &str) -> AppResult<Option<Ticket>> {
        Ok(self
            .list(None)
            .await?
            .into_iter()
            .find(|ticket| ticket.submission_key == key))
    }

    /// Resolves a full id or a short prefix to the most recent matching ticket.
    async fn find_by_prefix(&self, prefix: &str) -> AppResult<Option<Ticket>> {
        let prefix = prefix.trim();
        if let Some(ticket) = self.fetch(prefix).await? {
            return Ok(Some(ticket));
        }
        if prefix.chars().count() < MIN_PREFIX_LEN {
            return Ok(None);
        }
        Ok(self
            .list(None)
            .await?
            .into_iter()
            .find(|ticket| ticket.id.starts_with(prefix)))
    }
}
