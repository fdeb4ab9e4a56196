use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::ticket::Ticket;
use crate::domain::urgency::UrgencyLevel;

/// Aggregate counts over a set of tickets, as shown on the officials' dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TicketSummary {
    pub total: usize,
    /// Tickets whose current urgency is `Crítica`.
    pub critical: usize,
    pub overdue: usize,
    pub by_department: BTreeMap<String, usize>,
    pub by_status: BTreeMap<String, usize>,
    pub by_urgency: BTreeMap<String, usize>,
    pub by_category: BTreeMap<String, usize>,
}

impl TicketSummary {
    pub fn from_tickets(tickets: &[Ticket], now: DateTime<Utc>) -> Self {
        let mut summary = Self {
            total: tickets.len(),
            ..Self::default()
        };
        for ticket in tickets {
            if ticket.urgency == UrgencyLevel::Critica {
                summary.critical += 1;
            }
            if ticket.is_overdue(now) {
                summary.overdue += 1;
            }
            bump(&mut summary.by_department, &ticket.assigned_dept);
            bump(&mut summary.by_status, ticket.status.as_str());
            bump(&mut summary.by_urgency, ticket.urgency.as_str());
            bump(&mut summary.by_category, &ticket.category);
        }
        summary
    }

    /// Department with the most tickets; ties go to the name that sorts first.
    pub fn top_department(&self) -> Option<(&str, usize)> {
        self.by_department
            .iter()
            .fold(None, |best, (dept, &count)| match best {
                Some((_, best_count)) if best_count >= count => best,
                _ => Some((dept.as_str(), count)),
            })
    }
}

fn bump(counts: &mut BTreeMap<String, usize>, key: &str) {
    *counts.entry(key.to_string()).or_default() += 1;
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::domain::derivation::derive;
    use crate::domain::ticket::{TicketStatus, TicketSubmission, TicketUpdate};

    fn ticket(category: &str, description: &str, age_hours: i64) -> Ticket {
        let submission = TicketSubmission {
            citizen_name: "Ana Lincopi".to_string(),
            user_email: None,
            category: category.to_string(),
            subject: "Solicitud".to_string(),
            description: description.to_string(),
            address_ref: None,
        };
        Ticket::from_submission(
            format!("{category}-{age_hours}"),
            &submission,
            derive(&submission.category, &submission.description),
            String::new(),
            Utc::now() - Duration::hours(age_hours),
        )
    }

    #[test]
    fn empty_set_has_zero_counts() {
        let summary = TicketSummary::from_tickets(&[], Utc::now());
        assert_eq!(summary, TicketSummary::default());
        assert!(summary.top_department().is_none());
    }

    #[test]
    fn counts_each_dimension() {
        let mut critical = ticket("Alumbrado", "Poste caído", 1);
        critical.apply(&TicketUpdate {
            urgency: Some(UrgencyLevel::Critica),
            ..TicketUpdate::default()
        });
        let mut resolved = ticket("Obras", "Vereda rota", 100);
        resolved.apply(&TicketUpdate {
            status: Some(TicketStatus::Resuelto),
            ..TicketUpdate::default()
        });
        let tickets = vec![
            critical,
            resolved,
            ticket("Seguridad", "Hay ruido en la plaza", 3),
            ticket("Patentes", "Renovar patente", 1),
        ];

        let summary = TicketSummary::from_tickets(&tickets, Utc::now());

        assert_eq!(summary.total, 4);
        assert_eq!(summary.critical, 1);
        assert_eq!(summary.overdue, 1);
        assert_eq!(summary.by_department["DOM"], 2);
        assert_eq!(summary.by_department["DIDECO"], 1);
        assert_eq!(summary.by_department["DAF"], 1);
        assert_eq!(summary.by_status["Pendiente"], 3);
        assert_eq!(summary.by_status["Resuelto"], 1);
        assert_eq!(summary.by_urgency["Crítica"], 1);
        assert_eq!(summary.by_urgency["Alta"], 1);
        assert_eq!(summary.by_urgency["Media"], 2);
        assert_eq!(summary.by_category.len(), 4);
        assert_eq!(summary.top_department(), Some(("DOM", 2)));
    }

    #[test]
    fn top_department_tie_prefers_first_name() {
        let tickets = vec![ticket("Social", "Canasta", 1), ticket("Patentes", "Patente", 1)];
        let summary = TicketSummary::from_tickets(&tickets, Utc::now());
        assert_eq!(summary.top_department(), Some(("DAF", 1)));
    }
}
