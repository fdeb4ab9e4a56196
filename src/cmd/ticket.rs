use chrono::Utc;
use clap::{Args, Subcommand};

use crate::context::AppContext;
use crate::domain::metrics::TicketSummary;
use crate::domain::ticket::{Ticket, TicketStatus, TicketSubmission};
use crate::domain::urgency::UrgencyLevel;
use crate::error::{AppError, AppResult};
use crate::workflow::ticket::{
    change_status, delete_ticket, find_ticket, list_tickets, overdue_tickets, reassign,
    set_urgency, submit_ticket, summary,
};

#[derive(Args, Debug, Clone)]
pub struct TicketArgs {
    #[command(subcommand)]
    pub command: TicketCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum TicketCommand {
    /// File a new citizen request; routing is derived automatically.
    Submit(SubmitArgs),
    /// Show a ticket by full id or short id.
    Show { id: String },
    /// Change the status of a ticket.
    Status {
        id: String,
        /// Pendiente, "En Proceso", Resuelto or Rechazado.
        status: String,
        #[arg(long)]
        user: String,
        #[arg(long, default_value = "")]
        observation: String,
    },
    /// Override the urgency of a ticket.
    Urgency {
        id: String,
        /// Baja, Media, Alta or Crítica.
        urgency: String,
        #[arg(long)]
        user: String,
    },
    /// Reassign a ticket to another department and unit.
    Reassign {
        id: String,
        department: String,
        unit: String,
        #[arg(long)]
        user: String,
    },
    /// List tickets, newest first.
    List {
        /// Only tickets in this status.
        #[arg(long)]
        status: Option<String>,
    },
    /// Delete a ticket by full id or short id.
    Delete { id: String },
    /// List open tickets past their SLA.
    Overdue,
    /// Aggregate counts by department, status, urgency and category.
    Stats {
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug, Clone)]
pub struct SubmitArgs {
    #[arg(long)]
    pub category: String,
    #[arg(long)]
    pub subject: String,
    #[arg(long)]
    pub description: String,
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub email: Option<String>,
    #[arg(long)]
    pub address: Option<String>,
}

pub async fn run(ctx: &AppContext, command: TicketCommand) -> AppResult<()> {
    match command {
        TicketCommand::Submit(args) => run_submit(ctx, args).await,
        TicketCommand::Show { id } => {
            let ticket = find_ticket(ctx, &id).await?;
            print_ticket(&ticket);
            Ok(())
        }
        TicketCommand::Status {
            id,
            status,
            user,
            observation,
        } => {
            let status = parse_status(&status)?;
            let ticket = change_status(ctx, &id, status, &user, &observation).await?;
            println!("Ticket {} is now {}", ticket.short_id(), ticket.status);
            Ok(())
        }
        TicketCommand::Urgency { id, urgency, user } => {
            let urgency = UrgencyLevel::from_str(&urgency)
                .ok_or_else(|| AppError::Validation(format!("unknown urgency '{urgency}'")))?;
            let ticket = set_urgency(ctx, &id, urgency, &user).await?;
            println!("Ticket {} urgency set to {}", ticket.short_id(), ticket.urgency);
            Ok(())
        }
        TicketCommand::Reassign {
            id,
            department,
            unit,
            user,
        } => {
            let ticket = reassign(ctx, &id, &department, &unit, &user).await?;
            println!(
                "Ticket {} assigned to {} / {}",
                ticket.short_id(),
                ticket.assigned_dept,
                ticket.assigned_unit
            );
            Ok(())
        }
        TicketCommand::List { status } => {
            let status = status.as_deref().map(parse_status).transpose()?;
            run_list(ctx, status).await
        }
        TicketCommand::Delete { id } => {
            let ticket = delete_ticket(ctx, &id).await?;
            println!("Ticket {} deleted.", ticket.short_id());
            Ok(())
        }
        TicketCommand::Overdue => run_overdue(ctx).await,
        TicketCommand::Stats { json } => {
            let stats = summary(ctx, Utc::now()).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                print_summary(&stats);
            }
            Ok(())
        }
    }
}

fn parse_status(value: &str) -> AppResult<TicketStatus> {
    TicketStatus::from_str(value)
        .ok_or_else(|| AppError::Validation(format!("unknown status '{value}'")))
}

async fn run_submit(ctx: &AppContext, args: SubmitArgs) -> AppResult<()> {
    let submission = TicketSubmission {
        citizen_name: args.name,
        user_email: args.email,
        category: args.category,
        subject: args.subject,
        description: args.description,
        address_ref: args.address,
    };
    let outcome = submit_ticket(ctx, submission).await?;

    if outcome.duplicate {
        println!("Request already registered as {}", outcome.ticket.short_id());
    } else {
        println!("Request {} registered.", outcome.ticket.short_id());
    }
    println!(
        "Assigned to {} / {} (SLA {}h, urgency {})",
        outcome.derivation.assigned_dept,
        outcome.derivation.assigned_unit,
        outcome.derivation.sla_hours,
        outcome.derivation.ai_urgency
    );
    Ok(())
}

async fn run_overdue(ctx: &AppContext) -> AppResult<()> {
    let now = Utc::now();
    let overdue = overdue_tickets(ctx, now).await?;
    if overdue.is_empty() {
        println!("No overdue tickets.");
        return Ok(());
    }
    for ticket in &overdue {
        let late = now - ticket.due_at();
        println!(
            "{}  {:<10}  {:<8}  {}h late  {}",
            ticket.short_id(),
            ticket.status,
            ticket.urgency,
            late.num_hours(),
            ticket.subject
        );
    }
    println!("{} overdue ticket(s).", overdue.len());
    Ok(())
}

async fn run_list(ctx: &AppContext, status: Option<TicketStatus>) -> AppResult<()> {
    let tickets = list_tickets(ctx, status).await?;
    if tickets.is_empty() {
        println!("No tickets.");
        return Ok(());
    }
    for ticket in &tickets {
        println!(
            "{}  {}  {:<10}  {:<8}  {:<8}  {}",
            ticket.short_id(),
            ticket.created_at.format("%Y-%m-%d"),
            ticket.status,
            ticket.urgency,
            ticket.assigned_dept,
            ticket.subject
        );
    }
    println!("{} ticket(s).", tickets.len());
    Ok(())
}

fn print_summary(stats: &TicketSummary) {
    println!("Total: {}", stats.total);
    println!("Critical: {}", stats.critical);
    println!("Overdue: {}", stats.overdue);
    if let Some((dept, count)) = stats.top_department() {
        println!("Busiest department: {dept} ({count})");
    }
    for (title, counts) in [
        ("By department", &stats.by_department),
        ("By status", &stats.by_status),
        ("By urgency", &stats.by_urgency),
        ("By category", &stats.by_category),
    ] {
        println!();
        println!("{title}:");
        for (key, count) in counts {
            println!("  {key:<24} {count}");
        }
    }
}

fn print_ticket(ticket: &Ticket) {
    println!("Ticket {} ({})", ticket.short_id(), ticket.id);
    println!("Citizen: {} <{}>", ticket.citizen_name, ticket.user_email);
    println!("Subject: {}", ticket.subject);
    println!("Category: {}", ticket.category);
    println!("Status: {}", ticket.status);
    println!(
        "Assigned: {} / {} (SLA {}h, due {})",
        ticket.assigned_dept,
        ticket.assigned_unit,
        ticket.sla_hours,
        ticket.due_at().format("%Y-%m-%d %H:%M")
    );
    println!(
        "Urgency: {} (derived {})",
        ticket.urgency, ticket.ai_urgency
    );
    if let Some(address) = &ticket.address_ref {
        println!("Address: {address}");
    }
    println!();
    println!("{}", ticket.description);
    if !ticket.log.is_empty() {
        println!();
        for entry in &ticket.log {
            let observation = if entry.observation.is_empty() {
                String::new()
            } else {
                format!(" - {}", entry.observation)
            };
            println!(
                "{}  {}  {}{}",
                entry.timestamp.format("%Y-%m-%d %H:%M"),
                entry.user,
                entry.action,
                observation
            );
        }
    }
}
