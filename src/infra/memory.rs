use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::ticket::{LogEntry, Ticket, TicketStatus, TicketUpdate};
use crate::error::{AppError, AppResult};
use crate::services::ticket_store::{Insertion, TicketStore, newest_first};

#[derive(Default)]
pub struct InMemoryTicketStore {
    tickets: RwLock<HashMap<String, Ticket>>,
}

impl InMemoryTicketStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TicketStore for InMemoryTicketStore {
    async fn insert(&self, ticket: Ticket) -> AppResult<String> {
        let mut tickets = self.tickets.write().await;
        if tickets.contains_key(&ticket.id) {
            return Err(AppError::Store(format!("duplicate ticket id {}", ticket.id)));
        }
        let id = ticket.id.clone();
        tickets.insert(id.clone(), ticket);
        Ok(id)
    }

    async fn insert_unique(&self, ticket: Ticket) -> AppResult<Insertion> {
        let mut tickets = self.tickets.write().await;
        if !ticket.submission_key.is_empty() {
            if let Some(existing) = tickets
                .values()
                .find(|existing| existing.submission_key == ticket.submission_key)
            {
                return Ok(Insertion::Existing(existing.clone()));
            }
        }
        if tickets.contains_key(&ticket.id) {
            return Err(AppError::Store(format!("duplicate ticket id {}", ticket.id)));
        }
        let id = ticket.id.clone();
        tickets.insert(id.clone(), ticket);
        Ok(Insertion::Inserted(id))
    }

    async fn fetch(&self, id: &str) -> AppResult<Option<Ticket>> {
        Ok(self.tickets.read().await.get(id).cloned())
    }

    async fn update(&self, id: &str, update: TicketUpdate) -> AppResult<Option<Ticket>> {
        let mut tickets = self.tickets.write().await;
        Ok(tickets.get_mut(id).map(|ticket| {
            ticket.apply(&update);
            ticket.clone()
        }))
    }

    async fn delete(&self, id: &str) -> AppResult<bool> {
        Ok(self.tickets.write().await.remove(id).is_some())
    }

    async fn append_log(&self, id: &str, entry: LogEntry) -> AppResult<bool> {
        let mut tickets = self.tickets.write().await;
        match tickets.get_mut(id) {
            Some(ticket) => {
                ticket.log.push(entry);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list(&self, status: Option<TicketStatus>) -> AppResult<Vec<Ticket>> {
        let tickets = self
            .tickets
            .read()
            .await
            .values()
            .filter(|ticket| status.is_none_or(|wanted| ticket.status == wanted))
            .cloned()
            .collect();
        Ok(newest_first(tickets))
    }
}
