use blake3::Hasher;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::context::AppContext;
use crate::domain::derivation::DerivationResult;
use crate::domain::metrics::TicketSummary;
use crate::domain::ticket::{LogEntry, Ticket, TicketStatus, TicketSubmission, TicketUpdate};
use crate::domain::urgency::UrgencyLevel;
use crate::error::{AppError, AppResult};
use crate::services::ticket_store::Insertion;

pub struct SubmissionOutcome {
    pub ticket: Ticket,
    pub derivation: DerivationResult,
    /// True when an identical submission was already stored.
    pub duplicate: bool,
}

pub fn submission_key(submission: &TicketSubmission) -> String {
    let mut hasher = Hasher::new();
    for part in [
        submission.category.as_str(),
        submission.subject.trim(),
        submission.description.trim(),
        submission.contact_email(),
    ] {
        hasher.update(part.as_bytes());
        hasher.update(&[0]);
    }
    hasher.finalize().to_hex().to_string()
}

pub async fn submit_ticket(
    ctx: &AppContext,
    submission: TicketSubmission,
) -> AppResult<SubmissionOutcome> {
    if submission.subject.trim().is_empty() {
        return Err(AppError::Validation("subject must not be empty".to_string()));
    }
    if submission.description.trim().is_empty() {
        return Err(AppError::Validation(
            "description must not be empty".to_string(),
        ));
    }

    let key = submission_key(&submission);
    let derivation = ctx
        .engine
        .snapshot()
        .derive(&submission.category, Some(submission.description.as_str()));

    let mut ticket = Ticket::from_submission(
        Uuid::new_v4().to_string(),
        &submission,
        derivation.clone(),
        key,
        Utc::now(),
    );
    ticket.log.push(LogEntry::new(
        "Creado",
        &ticket.user_email,
        &format!("Derivado a {} / {}", derivation.assigned_dept, derivation.assigned_unit),
    ));

    match ctx.store.insert_unique(ticket.clone()).await? {
        Insertion::Inserted(id) => ticket.id = id,
        Insertion::Existing(existing) => {
            tracing::info!(ticket = %existing.id, "identical submission already stored");
            let derivation = DerivationResult {
                assigned_dept: existing.assigned_dept.clone(),
                assigned_unit: existing.assigned_unit.clone(),
                sla_hours: existing.sla_hours,
                ai_urgency: existing.ai_urgency,
            };
            return Ok(SubmissionOutcome {
                ticket: existing,
                derivation,
                duplicate: true,
            });
        }
    }

    tracing::info!(
        ticket = %ticket.id,
        category = %ticket.category,
        dept = %derivation.assigned_dept,
        unit = %derivation.assigned_unit,
        sla_hours = derivation.sla_hours,
        urgency = %derivation.ai_urgency,
        "ticket submitted"
    );

    Ok(SubmissionOutcome {
        ticket,
        derivation,
        duplicate: false,
    })
}

pub async fn find_ticket(ctx: &AppContext, id_or_prefix: &str) -> AppResult<Ticket> {
    ctx.store
        .find_by_prefix(id_or_prefix)
        .await?
        .ok_or_else(|| AppError::NotFound(id_or_prefix.trim().to_string()))
}

async fn apply_with_log(
    ctx: &AppContext,
    id_or_prefix: &str,
    update: TicketUpdate,
    entry: LogEntry,
) -> AppResult<Ticket> {
    let ticket = find_ticket(ctx, id_or_prefix).await?;
    let mut updated = ctx
        .store
        .update(&ticket.id, update)
        .await?
        .ok_or_else(|| AppError::NotFound(ticket.id.clone()))?;

    // The update is already persisted; a failed log write must not report
    // the change as lost.
    match ctx.store.append_log(&updated.id, entry.clone()).await {
        Ok(true) => updated.log.push(entry),
        Ok(false) => {
            tracing::warn!(ticket = %updated.id, "ticket vanished before log entry was written")
        }
        Err(err) => {
            tracing::warn!(ticket = %updated.id, "failed to write log entry: {err}")
        }
    }
    Ok(updated)
}

pub async fn change_status(
    ctx: &AppContext,
    id_or_prefix: &str,
    status: TicketStatus,
    user: &str,
    observation: &str,
) -> AppResult<Ticket> {
    let update = TicketUpdate {
        status: Some(status),
        ..TicketUpdate::default()
    };
    let entry = LogEntry::new(&format!("Estado: {status}"), user, observation);
    let ticket = apply_with_log(ctx, id_or_prefix, update, entry).await?;
    tracing::info!(ticket = %ticket.id, status = %status, "ticket status changed");
    Ok(ticket)
}

pub async fn reassign(
    ctx: &AppContext,
    id_or_prefix: &str,
    department: &str,
    unit: &str,
    user: &str,
) -> AppResult<Ticket> {
    let update = TicketUpdate {
        assigned_dept: Some(department.to_string()),
        assigned_unit: Some(unit.to_string()),
        ..TicketUpdate::default()
    };
    let entry = LogEntry::new("Reasignado", user, &format!("{department} / {unit}"));
    apply_with_log(ctx, id_or_prefix, update, entry).await
}

pub async fn set_urgency(
    ctx: &AppContext,
    id_or_prefix: &str,
    urgency: UrgencyLevel,
    user: &str,
) -> AppResult<Ticket> {
    let update = TicketUpdate {
        urgency: Some(urgency),
        ..TicketUpdate::default()
    };
    let entry = LogEntry::new(&format!("Urgencia: {urgency}"), user, "");
    apply_with_log(ctx, id_or_prefix, update, entry).await
}

pub async fn list_tickets(
    ctx: &AppContext,
    status: Option<TicketStatus>,
) -> AppResult<Vec<Ticket>> {
    ctx.store.list(status).await
}

/// Removes the ticket and returns the record that was deleted.
pub async fn delete_ticket(ctx: &AppContext, id_or_prefix: &str) -> AppResult<Ticket> {
    let ticket = find_ticket(ctx, id_or_prefix).await?;
    if !ctx.store.delete(&ticket.id).await? {
        return Err(AppError::NotFound(ticket.id));
    }
    tracing::info!(ticket = %ticket.id, "ticket deleted");
    Ok(ticket)
}

pub async fn summary(ctx: &AppContext, now: DateTime<Utc>) -> AppResult<TicketSummary> {
    let tickets = ctx.store.list(None).await?;
    Ok(TicketSummary::from_tickets(&tickets, now))
}

/// Open tickets past their SLA, oldest deadline first.
pub async fn overdue_tickets(ctx: &AppContext, now: DateTime<Utc>) -> AppResult<Vec<Ticket>> {
    let mut overdue = ctx
        .store
        .list(None)
        .await?
        .into_iter()
        .filter(|ticket| ticket.is_overdue(now))
        .collect::<Vec<_>>();
    overdue.sort_by_key(Ticket::due_at);
    Ok(overdue)
}
