use async_trait::async_trait;
use reqwest::{
    Client, RequestBuilder, Response,
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
};
use serde::{Deserialize, Serialize};

use crate::domain::ticket::{FULL_ID_LEN, LogEntry, Ticket, TicketStatus, TicketUpdate};
use crate::error::{AppError, AppResult};
use crate::services::TicketStore;
use crate::services::ticket_store::{Insertion, MIN_PREFIX_LEN};

const TABLE: &str = "tickets";
const LIST_LIMIT: &str = "2000";

/// Ticket table on a hosted relational backend exposed through a
/// PostgREST-style API.
pub struct RestTicketStore {
    http: Client,
    base_url: String,
    api_key: String,
}

impl RestTicketStore {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            http: Client::new(),
            base_url,
            api_key,
        }
    }

    fn table_endpoint(base_url: &str) -> String {
        format!("{}/rest/v1/{TABLE}", base_url.trim_end_matches('/'))
    }

    fn request(&self, method: reqwest::Method) -> RequestBuilder {
        self.http
            .request(method, Self::table_endpoint(&self.base_url))
            .header("apikey", &self.api_key)
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header(ACCEPT, "application/json")
    }

    fn eq(value: &str) -> String {
        format!("eq.{value}")
    }

    async fn send(request: RequestBuilder) -> AppResult<Response> {
        let response = request
            .send()
            .await
            .map_err(|err| AppError::Store(format!("failed to reach ticket backend: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unable to read response>".to_string());
            return Err(AppError::Store(format!(
                "ticket backend responded with {status}: {body}"
            )));
        }
        Ok(response)
    }

    async fn rows(request: RequestBuilder) -> AppResult<Vec<Ticket>> {
        Self::send(request)
            .await?
            .json::<Vec<Ticket>>()
            .await
            .map_err(|err| AppError::Store(format!("failed to parse ticket rows: {err}")))
    }

    fn with_representation<T: Serialize + ?Sized>(request: RequestBuilder, body: &T) -> RequestBuilder {
        request
            .header(CONTENT_TYPE, "application/json")
            .header("Prefer", "return=representation")
            .json(body)
    }

    /// Most recent ids, newest first. The id column is a uuid, so prefixes
    /// are matched here rather than in a server-side filter.
    async fn recent_ids(&self) -> AppResult<Vec<String>> {
        let request = self.request(reqwest::Method::GET).query(&[
            ("select", "id"),
            ("order", "created_at.desc"),
            ("limit", LIST_LIMIT),
        ]);
        let rows = Self::send(request)
            .await?
            .json::<Vec<IdRow>>()
            .await
            .map_err(|err| AppError::Store(format!("failed to parse ticket ids: {err}")))?;
        Ok(rows.into_iter().map(|row| row.id).collect())
    }
}

#[derive(Serialize)]
struct LogPatch<'a> {
    log: &'a [LogEntry],
}

#[derive(Deserialize)]
struct IdRow {
    id: String,
}

#[async_trait]
impl TicketStore for RestTicketStore {
    async fn insert(&self, ticket: Ticket) -> AppResult<String> {
        let request = Self::with_representation(self.request(reqwest::Method::POST), &ticket);
        let rows = Self::rows(request).await?;
        let id = rows
            .into_iter()
            .next()
            .map(|row| row.id)
            .unwrap_or(ticket.id);
        tracing::debug!(ticket = %id, "ticket row inserted");
        Ok(id)
    }

    /// Relies on a unique constraint over `submission_key`; conflicting rows
    /// are ignored by the backend and the stored ticket is read back.
    async fn insert_unique(&self, ticket: Ticket) -> AppResult<Insertion> {
        if ticket.submission_key.is_empty() {
            return self.insert(ticket).await.map(Insertion::Inserted);
        }
        let request = self
            .request(reqwest::Method::POST)
            .query(&[("on_conflict", "submission_key")])
            .header(CONTENT_TYPE, "application/json")
            .header("Prefer", "resolution=ignore-duplicates,return=representation")
            .json(&ticket);
        if let Some(row) = Self::rows(request).await?.into_iter().next() {
            tracing::debug!(ticket = %row.id, "ticket row inserted");
            return Ok(Insertion::Inserted(row.id));
        }
        match self.find_by_submission_key(&ticket.submission_key).await? {
            Some(existing) => Ok(Insertion::Existing(existing)),
            None => Err(AppError::Store(format!(
                "ticket backend ignored insert of {} without a conflicting row",
                ticket.id
            ))),
        }
    }

    async fn fetch(&self, id: &str) -> AppResult<Option<Ticket>> {
        let request = self
            .request(reqwest::Method::GET)
            .query(&[("select", "*"), ("id", Self::eq(id).as_str())]);
        Ok(Self::rows(request).await?.into_iter().next())
    }

    async fn update(&self, id: &str, update: TicketUpdate) -> AppResult<Option<Ticket>> {
        if update.is_empty() {
            return self.fetch(id).await;
        }
        let request = Self::with_representation(
            self.request(reqwest::Method::PATCH)
                .query(&[("id", Self::eq(id))]),
            &update,
        );
        Ok(Self::rows(request).await?.into_iter().next())
    }

    async fn delete(&self, id: &str) -> AppResult<bool> {
        let request = self
            .request(reqwest::Method::DELETE)
            .query(&[("id", Self::eq(id))])
            .header("Prefer", "return=representation");
        Ok(!Self::rows(request).await?.is_empty())
    }

    async fn append_log(&self, id: &str, entry: LogEntry) -> AppResult<bool> {
        let Some(mut ticket) = self.fetch(id).await? else {
            return Ok(false);
        };
        ticket.log.push(entry);
        let request = Self::with_representation(
            self.request(reqwest::Method::PATCH)
                .query(&[("id", Self::eq(id))]),
            &LogPatch { log: &ticket.log },
        );
        Ok(!Self::rows(request).await?.is_empty())
    }

    async fn list(&self, status: Option<TicketStatus>) -> AppResult<Vec<Ticket>> {
        let mut query = vec![
            ("select", "*".to_string()),
            ("order", "created_at.desc".to_string()),
            ("limit", LIST_LIMIT.to_string()),
        ];
        if let Some(status) = status {
            query.push(("status", Self::eq(status.as_str())));
        }
        Self::rows(self.request(reqwest::Method::GET).query(&query)).await
    }

    async fn find_by_submission_key(&self, key: &str) -> AppResult<Option<Ticket>> {
        let request = self.request(reqwest::Method::GET).query(&[
            ("select", "*".to_string()),
            ("submission_key", Self::eq(key)),
            ("limit", "1".to_string()),
        ]);
        Ok(Self::rows(request).await?.into_iter().next())
    }

    async fn find_by_prefix(&self, prefix: &str) -> AppResult<Option<Ticket>> {
        let prefix = prefix.trim();
        if prefix.chars().count() == FULL_ID_LEN {
            match self.fetch(prefix).await {
                Ok(Some(ticket)) => return Ok(Some(ticket)),
                Ok(None) => {}
                Err(err) => tracing::debug!(id = prefix, "exact ticket lookup failed: {err}"),
            }
        }
        if prefix.chars().count() < MIN_PREFIX_LEN {
            return Ok(None);
        }
        let Some(id) = self
            .recent_ids()
            .await?
            .into_iter()
            .find(|id| id.starts_with(prefix))
        else {
            return Ok(None);
        };
        self.fetch(&id).await
    }
}
