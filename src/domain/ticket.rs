use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::derivation::DerivationResult;
use crate::domain::urgency::UrgencyLevel;

pub const GUEST_EMAIL: &str = "vecino@invitado.cl";
const SHORT_ID_LEN: usize = 8;
/// Length of a hyphenated uuid, the form of every stored id.
pub const FULL_ID_LEN: usize = 36;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TicketStatus {
    Pendiente,
    #[serde(rename = "En Proceso")]
    EnProceso,
    Resuelto,
    Rechazado,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Pendiente => "Pendiente",
            TicketStatus::EnProceso => "En Proceso",
            TicketStatus::Resuelto => "Resuelto",
            TicketStatus::Rechazado => "Rechazado",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().replace(['_', '-'], " ").as_str() {
            "pendiente" => Some(TicketStatus::Pendiente),
            "en proceso" | "enproceso" => Some(TicketStatus::EnProceso),
            "resuelto" => Some(TicketStatus::Resuelto),
            "rechazado" => Some(TicketStatus::Rechazado),
            _ => None,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, TicketStatus::Pendiente | TicketStatus::EnProceso)
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// What a citizen fills in on the request form.
#[derive(Debug, Clone, Default)]
pub struct TicketSubmission {
    pub citizen_name: String,
    pub user_email: Option<String>,
    pub category: String,
    pub subject: String,
    pub description: String,
    pub address_ref: Option<String>,
}

impl TicketSubmission {
    pub fn contact_email(&self) -> &str {
        self.user_email
            .as_deref()
            .map(str::trim)
            .filter(|email| !email.is_empty())
            .unwrap_or(GUEST_EMAIL)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub action: String,
    pub user: String,
    #[serde(default)]
    pub observation: String,
}

impl LogEntry {
    pub fn new(action: &str, user: &str, observation: &str) -> Self {
        Self {
            timestamp: Utc::now(),
            action: action.to_string(),
            user: user.to_string(),
            observation: observation.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: String,
    pub user_email: String,
    pub citizen_name: String,
    pub category: String,
    pub subject: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_ref: Option<String>,
    pub status: TicketStatus,
    pub assigned_dept: String,
    pub assigned_unit: String,
    pub sla_hours: u32,
    pub ai_urgency: UrgencyLevel,
    pub urgency: UrgencyLevel,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub log: Vec<LogEntry>,
    #[serde(default)]
    pub submission_key: String,
}

impl Ticket {
    /// Merges a derivation into a fresh `Pendiente` record.
    pub fn from_submission(
        id: String,
        submission: &TicketSubmission,
        derivation: DerivationResult,
        submission_key: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_email: submission.contact_email().to_string(),
            citizen_name: submission.citizen_name.trim().to_string(),
            category: submission.category.clone(),
            subject: submission.subject.trim().to_string(),
            description: submission.description.clone(),
            address_ref: submission.address_ref.clone(),
            status: TicketStatus::Pendiente,
            assigned_dept: derivation.assigned_dept,
            assigned_unit: derivation.assigned_unit,
            sla_hours: derivation.sla_hours,
            ai_urgency: derivation.ai_urgency,
            urgency: derivation.ai_urgency,
            created_at,
            log: Vec::new(),
            submission_key,
        }
    }

    pub fn short_id(&self) -> &str {
        match self.id.char_indices().nth(SHORT_ID_LEN) {
            Some((idx, _)) => &self.id[..idx],
            None => &self.id,
        }
    }

    pub fn due_at(&self) -> DateTime<Utc> {
        self.created_at + Duration::hours(i64::from(self.sla_hours))
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status.is_open() && now > self.due_at()
    }

    pub fn apply(&mut self, update: &TicketUpdate) {
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(urgency) = update.urgency {
            self.urgency = urgency;
        }
        if let Some(dept) = &update.assigned_dept {
            self.assigned_dept = dept.clone();
        }
        if let Some(unit) = &update.assigned_unit {
            self.assigned_unit = unit.clone();
        }
    }
}

/// Partial record; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TicketUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TicketStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub urgency: Option<UrgencyLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_dept: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_unit: Option<String>,
}

impl TicketUpdate {
    pub fn is_empty(&self) -> bool {
        self == &TicketUpdate::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::derivation::derive;

    fn sample(sla_category: &str) -> Ticket {
        let submission = TicketSubmission {
            citizen_name: "Rosa Huenchual (12.345.678-9)".to_string(),
            user_email: None,
            category: sla_category.to_string(),
            subject: "Luminaria apagada".to_string(),
            description: "La luminaria de la esquina no enciende".to_string(),
            address_ref: Some("Calle Balmaceda 120".to_string()),
        };
        let derivation = derive(&submission.category, &submission.description);
        Ticket::from_submission(
            "3f2a9c1e-0000-4000-8000-000000000000".to_string(),
            &submission,
            derivation,
            "key".to_string(),
            Utc::now() - Duration::hours(50),
        )
    }

    #[test]
    fn guest_email_used_when_missing() {
        let ticket = sample("Alumbrado");
        assert_eq!(ticket.user_email, GUEST_EMAIL);
        assert_eq!(ticket.status, TicketStatus::Pendiente);
        assert_eq!(ticket.urgency, ticket.ai_urgency);
    }

    #[test]
    fn short_id_is_prefix() {
        let ticket = sample("Alumbrado");
        assert_eq!(ticket.short_id(), "3f2a9c1e");
    }

    #[test]
    fn open_ticket_past_sla_is_overdue() {
        let ticket = sample("Alumbrado");
        assert_eq!(ticket.sla_hours, 48);
        assert!(ticket.is_overdue(Utc::now()));
    }

    #[test]
    fn closed_or_within_sla_is_not_overdue() {
        let mut ticket = sample("Patentes");
        assert!(!ticket.is_overdue(Utc::now()));

        let mut late = sample("Alumbrado");
        late.apply(&TicketUpdate {
            status: Some(TicketStatus::Resuelto),
            ..TicketUpdate::default()
        });
        assert!(!late.is_overdue(Utc::now()));

        ticket.apply(&TicketUpdate {
            status: Some(TicketStatus::EnProceso),
            ..TicketUpdate::default()
        });
        assert!(ticket.is_overdue(ticket.due_at() + Duration::minutes(1)));
    }

    #[test]
    fn update_only_touches_given_fields() {
        let mut ticket = sample("Alumbrado");
        ticket.apply(&TicketUpdate {
            urgency: Some(UrgencyLevel::Critica),
            ..TicketUpdate::default()
        });
        assert_eq!(ticket.urgency, UrgencyLevel::Critica);
        assert_eq!(ticket.ai_urgency, UrgencyLevel::Media);
        assert_eq!(ticket.assigned_unit, "Alumbrado");
    }

    #[test]
    fn parses_status_labels() {
        assert_eq!(TicketStatus::from_str("En Proceso"), Some(TicketStatus::EnProceso));
        assert_eq!(TicketStatus::from_str("en_proceso"), Some(TicketStatus::EnProceso));
        assert_eq!(TicketStatus::from_str("RESUELTO"), Some(TicketStatus::Resuelto));
        assert_eq!(TicketStatus::from_str("cerrado"), None);
    }

    #[test]
    fn status_serializes_with_space() {
        let json = serde_json::to_string(&TicketStatus::EnProceso).unwrap();
        assert_eq!(json, "\"En Proceso\"");
    }
}
