use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "placement")]
#[command(about = "Campus placement portal: role eligibility, applications and placements")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, global = true, default_value = "config/default")]
    pub config: String,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize database and write a default configuration file
    Init,

    /// Import or update students from a JSON array
    ImportStudents {
        /// Path to the JSON file
        file: String,
    },

    /// Register a new company (JSON) and compute eligibility for its roles
    RegisterCompany {
        /// Path to the JSON file
        file: String,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Replace a company's details and roles (JSON), then recompute eligibility
    UpdateCompany {
        /// Path to the JSON file
        file: String,

        /// Skip confirmation prompt (existing applications are cleared)
        #[arg(short, long)]
        yes: bool,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Recompute eligibility snapshots
    Recompute {
        /// Company to recompute
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        company_id: Option<String>,

        /// Recompute every stored company
        #[arg(long)]
        all: bool,
    },

    /// Check whether a student may apply to a role
    Check {
        company_id: String,
        role_id: String,
        student_id: String,
    },

    /// Show which requirement clauses a student passes or fails for a role
    Explain {
        company_id: String,
        role_id: String,
        student_id: String,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Apply a student to a role they are eligible for
    Apply {
        company_id: String,
        role_id: String,
        student_id: String,
    },

    /// Show eligibles, applications and placements of a role
    Role {
        company_id: String,
        role_id: String,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// List the roles a student is currently eligible for
    Offers {
        student_id: String,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Mark students placed for a role by email
    MarkPlaced {
        company_id: String,
        role_id: String,

        /// Student emails
        #[arg(required = true)]
        emails: Vec<String>,
    },

    /// List registered companies and their roles
    List {
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Delete a company with its roles, applications and placements
    DeleteCompany {
        company_id: String,

        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Delete a student record
    DeleteStudent {
        student_id: String,

        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Periodically recompute every company's eligibility
    Auto {
        /// Refresh interval in seconds (defaults to matching.refresh_interval_secs)
        #[arg(short, long)]
        interval: Option<u64>,
    },

    /// Show statistics
    Stats {
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
}
