use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

#[derive(Debug, Parser)]
#[command(
    name = "tpcell",
    about = "Records and reporting for a college training and placement cell"
)]
pub struct Cli {
    /// MongoDB URI for the records database (or TPCELL_DB_URI)
    #[arg(long, global = true)]
    pub records_uri: Option<String>,

    /// MongoDB URI for the offer-letter database (or TPCELL_LETTERS_URI)
    #[arg(long, global = true)]
    pub letters_uri: Option<String>,

    /// Increase log verbosity (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log warnings and errors only
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Answer yes to every confirmation prompt
    #[arg(short = 'y', long, global = true)]
    pub yes: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage student records
    Student {
        #[command(subcommand)]
        action: StudentAction,
    },
    /// Manage company records
    Company {
        #[command(subcommand)]
        action: CompanyAction,
    },
    /// Manage placement records
    Placement {
        #[command(subcommand)]
        action: PlacementAction,
    },
    /// Manage stored offer-letter PDFs
    Letter {
        #[command(subcommand)]
        action: LetterAction,
    },
    /// Show aggregate chart data across all collections
    Dashboard(DashboardArgs),
    /// Export records and analytics to CSV or workbook files
    Export {
        #[command(subcommand)]
        action: ExportAction,
    },
    /// Show database connectivity and record counts
    Status(StatusArgs),
    /// Generate shell completions
    #[command(hide = true)]
    Completions(CompletionsArgs),
}

// -- Student subcommands --

#[derive(Debug, Subcommand)]
pub enum StudentAction {
    /// Add a student record
    Add(StudentAddArgs),
    /// Search student records
    Search(StudentSearchArgs),
    /// Update fields on an existing student record
    Edit(StudentEditArgs),
    /// Find and delete a student record
    Delete(StudentDeleteArgs),
}

#[derive(Debug, Parser)]
pub struct StudentAddArgs {
    /// Student name
    #[arg(long)]
    pub name: String,

    /// Branch (e.g. CSE)
    #[arg(long)]
    pub branch: String,

    /// Admission year
    #[arg(long)]
    pub year: String,

    /// 10-digit contact number
    #[arg(long)]
    pub contact: String,

    /// Email address
    #[arg(long)]
    pub email: Option<String>,
}

#[derive(Debug, Parser)]
pub struct StudentSearchArgs {
    /// Filter by name (substring)
    #[arg(long, default_value = "")]
    pub name: String,

    /// Filter by branch (substring)
    #[arg(long, default_value = "")]
    pub branch: String,

    /// Filter by admission year
    #[arg(long, default_value = "")]
    pub year: String,

    /// Filter by contact number
    #[arg(long, default_value = "")]
    pub contact: String,

    /// Result cap: a number, or "All"
    #[arg(long, default_value = "50")]
    pub limit: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Parser)]
pub struct StudentEditArgs {
    /// Id of the record to edit (shown by search)
    pub id: String,

    /// New student name
    #[arg(long)]
    pub name: Option<String>,

    /// New branch
    #[arg(long)]
    pub branch: Option<String>,

    /// New admission year
    #[arg(long)]
    pub year: Option<String>,

    /// New contact number
    #[arg(long)]
    pub contact: Option<String>,

    /// New email address
    #[arg(long)]
    pub email: Option<String>,
}

#[derive(Debug, Parser)]
pub struct StudentDeleteArgs {
    /// Target record id (skips the lookup)
    #[arg(long)]
    pub id: Option<String>,

    /// Look up by name (substring)
    #[arg(long, default_value = "")]
    pub name: String,

    /// Look up by contact number
    #[arg(long, default_value = "")]
    pub contact: String,
}

// -- Company subcommands --

#[derive(Debug, Subcommand)]
pub enum CompanyAction {
    /// Add a company record
    Add(CompanyAddArgs),
    /// Search company records
    Search(CompanySearchArgs),
    /// Update fields on an existing company record
    Edit(CompanyEditArgs),
    /// Find and delete a company record
    Delete(CompanyDeleteArgs),
    /// Show company analytics chart data
    Analytics(CompanyAnalyticsArgs),
}

#[derive(Debug, Parser)]
pub struct CompanyAddArgs {
    /// Company name
    #[arg(long)]
    pub name: String,

    /// Contact email
    #[arg(long)]
    pub email: String,

    /// Contact number
    #[arg(long)]
    pub contact: String,

    /// HR contact name
    #[arg(long)]
    pub hr_name: String,

    /// Offered package (free text, e.g. "12 LPA")
    #[arg(long)]
    pub package: String,

    /// Company website
    #[arg(long, default_value = "")]
    pub website: String,

    /// Company address
    #[arg(long, default_value = "")]
    pub address: String,
}

#[derive(Debug, Parser)]
pub struct CompanySearchArgs {
    /// Filter by company name (substring)
    #[arg(long, default_value = "")]
    pub name: String,

    /// Filter by email (substring)
    #[arg(long, default_value = "")]
    pub email: String,

    /// Filter by HR name (substring)
    #[arg(long, default_value = "")]
    pub hr_name: String,

    /// Filter by contact number
    #[arg(long, default_value = "")]
    pub contact: String,

    /// Minimum package ("8", "12 LPA", ...)
    #[arg(long, default_value = "")]
    pub package: String,

    /// Result cap: a number, or "All"
    #[arg(long, default_value = "50")]
    pub limit: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Parser)]
pub struct CompanyEditArgs {
    /// Id of the record to edit (shown by search)
    pub id: String,

    /// New company name
    #[arg(long)]
    pub name: Option<String>,

    /// New contact email
    #[arg(long)]
    pub email: Option<String>,

    /// New contact number
    #[arg(long)]
    pub contact: Option<String>,

    /// New HR contact name
    #[arg(long)]
    pub hr_name: Option<String>,

    /// New package
    #[arg(long)]
    pub package: Option<String>,

    /// New website
    #[arg(long)]
    pub website: Option<String>,

    /// New address
    #[arg(long)]
    pub address: Option<String>,
}

#[derive(Debug, Parser)]
pub struct CompanyDeleteArgs {
    /// Target record id (skips the lookup)
    #[arg(long)]
    pub id: Option<String>,

    /// Look up by company name (substring)
    #[arg(long, default_value = "")]
    pub name: String,

    /// Look up by exact email or contact number
    #[arg(long, default_value = "")]
    pub contact: String,
}

#[derive(Debug, Parser)]
pub struct CompanyAnalyticsArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// -- Placement subcommands --

#[derive(Debug, Subcommand)]
pub enum PlacementAction {
    /// Add a placement record, optionally attaching an offer letter
    Add(PlacementAddArgs),
    /// Search placement records
    Search(PlacementSearchArgs),
    /// Update fields on an existing placement record
    Edit(PlacementEditArgs),
    /// Find and delete a placement record
    Delete(PlacementDeleteArgs),
    /// Show placement analytics chart data
    Analytics(PlacementAnalyticsArgs),
}

#[derive(Debug, Parser)]
pub struct PlacementAddArgs {
    /// Student name
    #[arg(long)]
    pub student: String,

    /// Student branch
    #[arg(long)]
    pub branch: String,

    /// Batch label
    #[arg(long)]
    pub batch: String,

    /// Company name
    #[arg(long)]
    pub company: String,

    /// Position offered
    #[arg(long)]
    pub position: String,

    /// Year of placement
    #[arg(long)]
    pub year: String,

    /// Offered package (free text)
    #[arg(long)]
    pub package: String,

    /// Company contact email
    #[arg(long)]
    pub email: String,

    /// Company contact number
    #[arg(long)]
    pub contact: String,

    /// HR contact name
    #[arg(long)]
    pub hr_name: String,

    /// Company address
    #[arg(long, default_value = "")]
    pub address: String,

    /// Placement suggestion notes
    #[arg(long, default_value = "")]
    pub suggestion: String,

    /// Interview rounds / company levels
    #[arg(long, default_value = "")]
    pub levels: String,

    /// Skills required
    #[arg(long, default_value = "")]
    pub skills: String,

    /// Other important notes
    #[arg(long, default_value = "")]
    pub notes: String,

    /// Offer letter PDF to store alongside the record
    #[arg(long)]
    pub offer_letter: Option<PathBuf>,
}

#[derive(Debug, Parser)]
pub struct PlacementSearchArgs {
    /// Filter by student name (substring)
    #[arg(long, default_value = "")]
    pub student: String,

    /// Filter by company name (substring)
    #[arg(long, default_value = "")]
    pub company: String,

    /// Filter by branch (substring)
    #[arg(long, default_value = "")]
    pub branch: String,

    /// Filter by HR name (substring)
    #[arg(long, default_value = "")]
    pub hr_name: String,

    /// Minimum package ("8", "12 LPA", ...)
    #[arg(long, default_value = "")]
    pub package: String,

    /// Result cap: a number, or "All"
    #[arg(long, default_value = "50")]
    pub limit: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Parser)]
pub struct PlacementEditArgs {
    /// Id of the record to edit (shown by search)
    pub id: String,

    /// New student name
    #[arg(long)]
    pub student: Option<String>,

    /// New student branch
    #[arg(long)]
    pub branch: Option<String>,

    /// New batch label
    #[arg(long)]
    pub batch: Option<String>,

    /// New company name
    #[arg(long)]
    pub company: Option<String>,

    /// New position
    #[arg(long)]
    pub position: Option<String>,

    /// New year of placement
    #[arg(long)]
    pub year: Option<String>,

    /// New package
    #[arg(long)]
    pub package: Option<String>,

    /// New contact email
    #[arg(long)]
    pub email: Option<String>,

    /// New contact number
    #[arg(long)]
    pub contact: Option<String>,

    /// New HR contact name
    #[arg(long)]
    pub hr_name: Option<String>,

    /// New address
    #[arg(long)]
    pub address: Option<String>,

    /// New placement suggestion notes
    #[arg(long)]
    pub suggestion: Option<String>,

    /// New interview rounds / company levels
    #[arg(long)]
    pub levels: Option<String>,

    /// New skills required
    #[arg(long)]
    pub skills: Option<String>,

    /// New other important notes
    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(Debug, Parser)]
pub struct PlacementDeleteArgs {
    /// Target record id (skips the lookup)
    #[arg(long)]
    pub id: Option<String>,

    /// Look up by student name (substring)
    #[arg(long, default_value = "")]
    pub student: String,

    /// Look up by company name (substring)
    #[arg(long, default_value = "")]
    pub company: String,
}

#[derive(Debug, Parser)]
pub struct PlacementAnalyticsArgs {
    /// Restrict to students admitted in this batch year
    #[arg(long)]
    pub batch: Option<String>,

    /// Restrict to one branch (exact, case-insensitive)
    #[arg(long)]
    pub branch: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// -- Letter subcommands --

#[derive(Debug, Subcommand)]
pub enum LetterAction {
    /// Store a PDF and print its key
    Store {
        /// Path to the PDF file
        file: PathBuf,
        /// Student the letter belongs to
        #[arg(long)]
        student: String,
        /// Company that issued the letter
        #[arg(long)]
        company: String,
    },
    /// Show stored metadata for a letter
    Info {
        /// Letter key (id or legacy custom key)
        key: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Open a letter in the system PDF viewer
    View {
        /// Letter key (id or legacy custom key)
        key: String,
    },
    /// Retire a letter (soft delete), or remove it outright
    Delete {
        /// Letter key (id or legacy custom key)
        key: String,
        /// Remove the document instead of marking it inactive
        #[arg(long)]
        hard: bool,
        /// Reason recorded with a soft delete
        #[arg(long)]
        reason: Option<String>,
    },
    /// List stored letters
    List {
        /// Restrict to one student (exact)
        #[arg(long, default_value = "")]
        student: String,
        /// Restrict to one company (exact)
        #[arg(long, default_value = "")]
        company: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

// -- Dashboard --

#[derive(Debug, Parser)]
pub struct DashboardArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// -- Export --

#[derive(Debug, Subcommand)]
pub enum ExportAction {
    /// Export matching company records
    Companies(ExportCompaniesArgs),
    /// Export matching placement records
    Placements(ExportPlacementsArgs),
    /// Export the aggregate dashboard workbook
    Dashboard(ExportOutputArgs),
    /// Export the company analytics workbook
    CompanyAnalytics(ExportOutputArgs),
    /// Export the placement analytics workbook
    PlacementAnalytics(ExportPlacementAnalyticsArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    /// Comma-separated values
    Csv,
    /// Workbook manifest for the spreadsheet renderer
    Workbook,
}

#[derive(Debug, Parser)]
pub struct ExportCompaniesArgs {
    /// Filter by company name (substring)
    #[arg(long, default_value = "")]
    pub name: String,

    /// Filter by email (substring)
    #[arg(long, default_value = "")]
    pub email: String,

    /// Filter by HR name (substring)
    #[arg(long, default_value = "")]
    pub hr_name: String,

    /// Filter by contact number
    #[arg(long, default_value = "")]
    pub contact: String,

    /// Minimum package ("8", "12 LPA", ...)
    #[arg(long, default_value = "")]
    pub package: String,

    /// Result cap: a number, or "All"
    #[arg(long, default_value = "All")]
    pub limit: String,

    /// Output format
    #[arg(long, value_enum, default_value = "csv")]
    pub format: ExportFormat,

    /// Output path (default: companies_<timestamp>)
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Parser)]
pub struct ExportPlacementsArgs {
    /// Filter by student name (substring)
    #[arg(long, default_value = "")]
    pub student: String,

    /// Filter by company name (substring)
    #[arg(long, default_value = "")]
    pub company: String,

    /// Filter by branch (substring)
    #[arg(long, default_value = "")]
    pub branch: String,

    /// Filter by HR name (substring)
    #[arg(long, default_value = "")]
    pub hr_name: String,

    /// Minimum package ("8", "12 LPA", ...)
    #[arg(long, default_value = "")]
    pub package: String,

    /// Result cap: a number, or "All"
    #[arg(long, default_value = "All")]
    pub limit: String,

    /// Output format
    #[arg(long, value_enum, default_value = "csv")]
    pub format: ExportFormat,

    /// Output path (default: placements_<timestamp>)
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Parser)]
pub struct ExportOutputArgs {
    /// Output path (default: <prefix>_<timestamp>.json)
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Parser)]
pub struct ExportPlacementAnalyticsArgs {
    /// Restrict to students admitted in this batch year
    #[arg(long)]
    pub batch: Option<String>,

    /// Restrict to one branch (exact, case-insensitive)
    #[arg(long)]
    pub branch: Option<String>,

    /// Output path (default: placement_analytics_<timestamp>.json)
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,
}

// -- Status --

#[derive(Debug, Parser)]
pub struct StatusArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// -- Completions --

#[derive(Debug, Parser)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

impl CompletionsArgs {
    /// Generate shell completions and print to stdout.
    pub fn generate(&self) {
        let mut cmd = Cli::command();
        clap_complete::generate(
            self.shell,
            &mut cmd,
            "tpcell",
            &mut std::io::stdout(),
        );
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn parse_company_search_defaults() {
        let cli = Cli::parse_from(["tpcell", "company", "search"]);
        match cli.command {
            Command::Company {
                action: CompanyAction::Search(args),
            } => {
                assert_eq!(args.name, "");
                assert_eq!(args.package, "");
                assert_eq!(args.limit, "50");
                assert!(!args.json);
            }
            _ => panic!("expected company search"),
        }
        assert!(!cli.yes);
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn parse_placement_add_with_offer_letter() {
        let cli = Cli::parse_from([
            "tpcell",
            "placement",
            "add",
            "--student",
            "ravi",
            "--branch",
            "cse",
            "--batch",
            "a1",
            "--company",
            "acme",
            "--position",
            "engineer",
            "--year",
            "2025",
            "--package",
            "12 LPA",
            "--email",
            "hr@acme.in",
            "--contact",
            "9876543210",
            "--hr-name",
            "priya",
            "--offer-letter",
            "/tmp/offer.pdf",
        ]);
        match cli.command {
            Command::Placement {
                action: PlacementAction::Add(args),
            } => {
                assert_eq!(args.student, "ravi");
                assert_eq!(args.offer_letter, Some(PathBuf::from("/tmp/offer.pdf")));
                assert_eq!(args.suggestion, "");
            }
            _ => panic!("expected placement add"),
        }
    }

    #[test]
    fn placement_add_requires_the_form_fields() {
        let result =
            Cli::try_parse_from(["tpcell", "placement", "add", "--student", "ravi"]);
        assert!(result.is_err());
    }

    #[test]
    fn parse_letter_delete_defaults_to_soft() {
        let cli = Cli::parse_from(["tpcell", "letter", "delete", "64f0c2a9"]);
        match cli.command {
            Command::Letter {
                action: LetterAction::Delete { key, hard, reason },
            } => {
                assert_eq!(key, "64f0c2a9");
                assert!(!hard);
                assert_eq!(reason, None);
            }
            _ => panic!("expected letter delete"),
        }
    }

    #[test]
    fn parse_export_placement_analytics_filters() {
        let cli = Cli::parse_from([
            "tpcell",
            "export",
            "placement-analytics",
            "--batch",
            "2022",
            "--branch",
            "CSE",
        ]);
        match cli.command {
            Command::Export {
                action: ExportAction::PlacementAnalytics(args),
            } => {
                assert_eq!(args.batch.as_deref(), Some("2022"));
                assert_eq!(args.branch.as_deref(), Some("CSE"));
                assert_eq!(args.output, None);
            }
            _ => panic!("expected export placement-analytics"),
        }
    }

    #[test]
    fn parse_export_format() {
        let cli = Cli::parse_from([
            "tpcell",
            "export",
            "companies",
            "--format",
            "workbook",
        ]);
        match cli.command {
            Command::Export {
                action: ExportAction::Companies(args),
            } => {
                assert_eq!(args.format, ExportFormat::Workbook);
                assert_eq!(args.limit, "All");
            }
            _ => panic!("expected export companies"),
        }
    }

    #[test]
    fn global_flags_parse_after_the_subcommand() {
        let cli = Cli::parse_from([
            "tpcell",
            "status",
            "--records-uri",
            "mongodb://records.local",
            "-vv",
            "--yes",
        ]);
        assert_eq!(cli.records_uri.as_deref(), Some("mongodb://records.local"));
        assert_eq!(cli.verbose, 2);
        assert!(cli.yes);
    }
}
