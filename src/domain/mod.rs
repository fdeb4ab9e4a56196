pub mod derivation;
pub mod metrics;
pub mod rule;
pub mod ticket;
pub mod urgency;

pub use derivation::{DerivationEngine, DerivationResult};
pub use metrics::TicketSummary;
pub use rule::{CategoryRule, RuleTable};
pub use ticket::{LogEntry, Ticket, TicketStatus, TicketSubmission, TicketUpdate};
pub use urgency::{UrgencyClassifier, UrgencyLevel};
