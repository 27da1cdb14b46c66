use std::{path::Path, time::Duration};
use clap::Parser;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use placement_matcher::{
    cli::{Cli, Commands, OutputFormat},
    config::Config,
    eligibility::{ClauseDecision, MatchSummary},
    error::{self, PlacementError},
    portal::{Portal, Refresher},
    storage::{Company, Database, Student},
    utils,
};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match Config::load(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{}", format!("Failed to load configuration: {}", e).red());
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter)),
        )
        .init();

    let result = match cli.command {
        Commands::Init => initialize(&config, &cli.config),
        Commands::ImportStudents { file } => import_students(&config, &file),
        Commands::RegisterCompany { file, format } => register_company(&config, &file, format),
        Commands::UpdateCompany { file, yes, format } => update_company(&config, &file, yes, format),
        Commands::Recompute { company_id, all } => recompute(&config, company_id.as_deref(), all),
        Commands::Check { company_id, role_id, student_id } => {
            check_eligibility(&config, &company_id, &role_id, &student_id)
        }
        Commands::Explain { company_id, role_id, student_id, format } => {
            explain(&config, &company_id, &role_id, &student_id, format)
        }
        Commands::Apply { company_id, role_id, student_id } => {
            apply(&config, &company_id, &role_id, &student_id)
        }
        Commands::Role { company_id, role_id, format } => {
            show_role(&config, &company_id, &role_id, format)
        }
        Commands::Offers { student_id, format } => show_offers(&config, &student_id, format),
        Commands::MarkPlaced { company_id, role_id, emails } => {
            mark_placed(&config, &company_id, &role_id, &emails)
        }
        Commands::List { format } => list_companies(&config, format),
        Commands::DeleteCompany { company_id, yes } => delete_company(&config, &company_id, yes),
        Commands::DeleteStudent { student_id, yes } => delete_student(&config, &student_id, yes),
        Commands::Auto { interval } => {
            let secs = interval.unwrap_or(config.matching.refresh_interval_secs);
            info!("Starting automated refresh service (interval: {}s)", secs);
            run_auto_service(&config, secs).await
        }
        Commands::Stats { format } => show_stats(&config, format),
    };

    if let Err(e) = result {
        error!("{}", format!("Error: {}", e).red());
        if e.is_transient() {
            eprintln!("{}", "The database is busy; retry the command.".yellow());
        }
        std::process::exit(1);
    }
}

fn open_portal(config: &Config) -> error::Result<Portal> {
    let db = Database::open(&config.database)?;
    Ok(Portal::new(db, config.matching.clone()))
}

fn print_json<T: serde::Serialize>(value: &T) -> error::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn initialize(config: &Config, config_path: &str) -> error::Result<()> {
    println!("{}", "Initializing placement portal...".green());
    let _db = Database::open(&config.database)?;
    println!("{}", "✓ Database initialized".green());

    let file = if Path::new(config_path).extension().is_some() {
        config_path.to_string()
    } else {
        format!("{}.toml", config_path)
    };
    if Path::new(&file).exists() {
        println!("{}", format!("✓ Using existing configuration {}", file).green());
    } else {
        if let Some(parent) = Path::new(&file).parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&file, config.to_toml()?)?;
        println!("{}", format!("✓ Wrote configuration {}", file).green());
    }

    println!("\n{}", "Configuration:".cyan());
    println!("  Database:       {}", config.database.path);
    println!("  Max CPI:        {}", config.matching.max_cpi);
    println!("  Refresh every:  {}s", config.matching.refresh_interval_secs);

    println!("\n{}", "Ready to use! Try running:".cyan());
    println!("  {} to load students", "placement import-students students.json".yellow());
    println!("  {} to add a company", "placement register-company company.json".yellow());
    Ok(())
}

fn import_students(config: &Config, file: &str) -> error::Result<()> {
    let students: Vec<Student> = utils::read_json(file)?;
    let portal = open_portal(config)?;
    let count = portal.import_students(&students)?;
    println!("{}", format!("✓ Imported {} students", count).green());
    println!(
        "{}",
        "Existing eligibility snapshots are not updated; run `placement recompute --all`.".yellow()
    );
    Ok(())
}

fn register_company(config: &Config, file: &str, format: OutputFormat) -> error::Result<()> {
    let company: Company = utils::read_json(file)?;
    let portal = open_portal(config)?;
    let summary = portal.register_company(&company)?;
    print_match_summary(&company.id, &summary, format)
}

fn update_company(config: &Config, file: &str, yes: bool, format: OutputFormat) -> error::Result<()> {
    let company: Company = utils::read_json(file)?;
    if !yes
        && !utils::confirm_action(&format!(
            "Update {} and clear all of its applications?",
            company.id
        ))?
    {
        println!("Cancelled");
        return Ok(());
    }

    let portal = open_portal(config)?;
    let summary = portal.update_company(&company)?;
    print_match_summary(&company.id, &summary, format)
}

fn recompute(config: &Config, company_id: Option<&str>, all: bool) -> error::Result<()> {
    let portal = open_portal(config)?;

    if let (Some(company_id), false) = (company_id, all) {
        let summary = portal.recompute(company_id)?;
        return print_match_summary(company_id, &summary, OutputFormat::Table);
    }

    let progress = ProgressBar::new(0);
    progress.set_style(
        ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} {msg}")
            .map_err(|e| PlacementError::Other(anyhow::anyhow!("invalid progress template: {}", e)))?,
    );
    let summary = Refresher::new(&portal).refresh_all(&progress)?;
    summary.print_summary();
    Ok(())
}

fn check_eligibility(config: &Config, company_id: &str, role_id: &str, student_id: &str) -> error::Result<()> {
    let portal = open_portal(config)?;
    if portal.can_apply(company_id, role_id, student_id)? {
        println!("{}", format!("✓ {} is eligible for {}/{}", student_id, company_id, role_id).green());
    } else {
        println!("{}", format!("✗ {} is not eligible for {}/{}", student_id, company_id, role_id).red());
    }
    Ok(())
}

fn explain(
    config: &Config,
    company_id: &str,
    role_id: &str,
    student_id: &str,
    format: OutputFormat,
) -> error::Result<()> {
    let portal = open_portal(config)?;
    let report = portal.explain(company_id, role_id, student_id)?;

    if format == OutputFormat::Json {
        return print_json(&report);
    }

    println!(
        "{}",
        format!("=== {} against {}/{} ===", student_id, company_id, role_id).cyan().bold()
    );
    for (clause, decision) in &report.decisions {
        match decision {
            ClauseDecision::Pass => println!("  {:<20} {}", clause, "pass".green()),
            ClauseDecision::Fail { reason } => {
                println!("  {:<20} {} {}", clause, "fail".red(), reason)
            }
        }
    }
    println!("Meets requirements: {}", utils::format_flag(report.is_eligible));

    let in_snapshot = portal.can_apply(company_id, role_id, student_id)?;
    if in_snapshot != report.is_eligible {
        println!(
            "{}",
            "Stored snapshot disagrees with current records; recompute this company.".yellow()
        );
    }
    Ok(())
}

fn apply(config: &Config, company_id: &str, role_id: &str, student_id: &str) -> error::Result<()> {
    let portal = open_portal(config)?;
    let application = portal.apply(company_id, role_id, student_id)?;
    println!(
        "{}",
        format!(
            "✓ {} applied to {}/{} at {}",
            student_id,
            company_id,
            role_id,
            utils::format_timestamp(&application.applied_at)
        )
        .green()
    );
    Ok(())
}

fn show_role(config: &Config, company_id: &str, role_id: &str, format: OutputFormat) -> error::Result<()> {
    let portal = open_portal(config)?;
    let role = portal.role_status(company_id, role_id)?;

    if format == OutputFormat::Json {
        return print_json(&role);
    }

    println!("{}", format!("=== {} / {} ({}) ===", company_id, role.id, role.title).cyan().bold());
    println!("CTC:          {}", utils::format_ctc(role.ctc));
    println!("Eligible:     {}", role.eligibles.len().to_string().green());
    println!("Applications: {}", role.applications.len());
    println!("Placed:       {}", role.placed.len());

    if !role.eligibles.is_empty() {
        utils::print_table_border(60);
        utils::print_table_row(&["Student", "Applied", "Placed"], &[24, 14, 14]);
        utils::print_table_border(60);
        for student_id in &role.eligibles {
            let applied = role.applications.iter().any(|a| &a.student_id == student_id);
            let placed = role.placed.contains(student_id);
            utils::print_table_row(
                &[student_id, &utils::format_flag(applied), &utils::format_flag(placed)],
                &[24, 14, 14],
            );
        }
        utils::print_table_border(60);
    }
    Ok(())
}

fn show_offers(config: &Config, student_id: &str, format: OutputFormat) -> error::Result<()> {
    let portal = open_portal(config)?;
    let offers = portal.offers(student_id)?;

    if format == OutputFormat::Json {
        return print_json(&offers);
    }

    if offers.is_empty() {
        println!("{}", format!("{} is not eligible for any role yet", student_id).yellow());
        return Ok(());
    }

    utils::print_table_border(90);
    utils::print_table_row(&["Company", "Role", "CTC", "Applied"], &[28, 28, 16, 10]);
    utils::print_table_border(90);
    for offer in &offers {
        utils::print_table_row(
            &[
                &offer.company_name,
                &offer.role_title,
                &utils::format_ctc(offer.ctc),
                &utils::format_flag(offer.applied),
            ],
            &[28, 28, 16, 10],
        );
    }
    utils::print_table_border(90);
    Ok(())
}

fn mark_placed(config: &Config, company_id: &str, role_id: &str, emails: &[String]) -> error::Result<()> {
    let portal = open_portal(config)?;
    let summary = portal.mark_placed(company_id, role_id, emails)?;

    println!("{}", format!("✓ Marked {} students placed", summary.placed.len()).green());
    for email in &summary.unknown_emails {
        println!("{}", format!("  ✗ no student with email {}", email).red());
    }
    Ok(())
}

fn list_companies(config: &Config, format: OutputFormat) -> error::Result<()> {
    let portal = open_portal(config)?;
    let companies = portal.list_companies()?;

    if format == OutputFormat::Json {
        return print_json(&companies);
    }

    utils::print_table_border(100);
    utils::print_table_row(
        &["Company", "Batch", "Role", "CTC", "Eligible", "Applied"],
        &[24, 8, 28, 14, 10, 10],
    );
    utils::print_table_border(100);
    for company in &companies {
        for role in &company.roles {
            utils::print_table_row(
                &[
                    &company.name,
                    &company.batch.to_string(),
                    &role.title,
                    &utils::format_ctc(role.ctc),
                    &role.eligibles.len().to_string(),
                    &role.applications.len().to_string(),
                ],
                &[24, 8, 28, 14, 10, 10],
            );
        }
    }
    utils::print_table_border(100);
    Ok(())
}

fn delete_company(config: &Config, company_id: &str, yes: bool) -> error::Result<()> {
    if !yes && !utils::confirm_action(&format!("Delete company {} and all its roles?", company_id))? {
        println!("Cancelled");
        return Ok(());
    }
    open_portal(config)?.delete_company(company_id)?;
    println!("{}", format!("✓ Deleted company {}", company_id).green());
    Ok(())
}

fn delete_student(config: &Config, student_id: &str, yes: bool) -> error::Result<()> {
    if !yes && !utils::confirm_action(&format!("Delete student {}?", student_id))? {
        println!("Cancelled");
        return Ok(());
    }
    open_portal(config)?.delete_student(student_id)?;
    println!("{}", format!("✓ Deleted student {}", student_id).green());
    Ok(())
}

async fn run_auto_service(config: &Config, interval_secs: u64) -> error::Result<()> {
    println!("{}", "Starting automated eligibility refresh...".green());
    println!("Interval: {} seconds", interval_secs);

    let portal = open_portal(config)?;
    let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                info!("Running refresh cycle...");
                match Refresher::new(&portal).refresh_all(&ProgressBar::hidden()) {
                    Ok(summary) => {
                        if summary.has_transient_failures() {
                            warn!("Some companies hit a busy database; they will be retried next cycle");
                        }
                        summary.print_summary();
                    }
                    Err(e) => warn!("Refresh cycle failed: {}", e),
                }
            }
            _ = &mut shutdown => {
                info!("Received Ctrl-C, stopping refresh service");
                break;
            }
        }
    }

    Ok(())
}

fn show_stats(config: &Config, format: OutputFormat) -> error::Result<()> {
    let portal = open_portal(config)?;
    let stats = portal.stats()?;

    if format == OutputFormat::Json {
        return print_json(&stats);
    }

    println!("{}", "=== Placement Statistics ===".cyan().bold());
    println!("\nStudents:");
    println!("  Total:       {}", stats.total_students);
    println!("  Selected:    {}", stats.selected_students.to_string().green());
    println!(
        "  Available:   {}",
        (stats.total_students - stats.selected_students).to_string().yellow()
    );

    println!("\nCompanies:");
    println!("  Companies:   {}", stats.companies);
    println!("  Roles:       {}", stats.roles);
    println!("  Eligible:    {}", stats.eligible_pairs);
    println!("  Applied:     {}", stats.applications);
    println!("  Placed:      {}", stats.placements.to_string().cyan());
    Ok(())
}

fn print_match_summary(company_id: &str, summary: &MatchSummary, format: OutputFormat) -> error::Result<()> {
    if format == OutputFormat::Json {
        return print_json(summary);
    }

    println!("\n{}", format!("=== Eligibility for {} ===", company_id).cyan().bold());
    println!("Batch:             {}", summary.batch);
    println!("Students scanned:  {}", summary.students_scanned);
    utils::print_table_border(50);
    utils::print_table_row(&["Role", "Eligible"], &[30, 10]);
    utils::print_table_border(50);
    for role in &summary.roles {
        utils::print_table_row(&[&role.role_id, &role.eligibles.len().to_string()], &[30, 10]);
    }
    utils::print_table_border(50);
    Ok(())
}
