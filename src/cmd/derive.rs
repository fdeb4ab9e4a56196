use clap::Args;

use crate::context::AppContext;
use crate::error::AppResult;

#[derive(Args, Debug, Clone)]
pub struct DeriveArgs {
    /// Category as selected by the citizen (exact, case-sensitive).
    pub category: String,
    /// Free-text description of the request.
    #[arg(default_value = "")]
    pub description: String,
}

pub fn run_derive(ctx: &AppContext, args: DeriveArgs) -> AppResult<()> {
    let result = ctx
        .engine
        .snapshot()
        .derive(&args.category, Some(args.description.as_str()));
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

pub fn run_rules(ctx: &AppContext) -> AppResult<()> {
    let engine = ctx.engine.snapshot();
    let rules = engine.rules().rules();
    let width = rules
        .iter()
        .map(|rule| rule.category_key.chars().count())
        .max()
        .unwrap_or(0);

    for rule in rules {
        println!(
            "{:<width$}  {:<8}  {:>4}h  {}",
            rule.category_key, rule.department, rule.sla_hours, rule.unit
        );
    }
    let fallback = engine.rules().fallback();
    println!(
        "{:<width$}  {:<8}  {:>4}h  {}",
        "*", fallback.department, fallback.sla_hours, fallback.unit
    );
    println!();
    println!(
        "Danger keywords: {}",
        engine.classifier().danger_keywords().join(", ")
    );
    println!(
        "Sensitive categories: {}",
        engine.classifier().sensitive_categories().join(", ")
    );
    Ok(())
}
