use std::{
    io::{self, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use clap::Parser;
use mongodb::bson::{Document, doc, oid::ObjectId};
use serde::Serialize;
use tracing::warn;
use tracing_subscriber::EnvFilter;

pub mod cache;
pub mod charts;
pub mod cli;
pub mod company;
pub mod connection;
pub mod error;
pub mod export;
pub mod letters;
pub mod placement;
pub mod query;
pub mod search;
pub mod student;
pub mod validate;
pub mod warmup;

use cache::{CacheKind, SampleCache};
use cli::{
    Cli, Command, CompanyAction, ExportAction, ExportFormat, LetterAction, PlacementAction,
    StudentAction,
};
use company::{CompanyRecord, CompanyStore, NewCompany};
use connection::ConnectionProvider;
use error::{Error, Result, truncate_message};
use letters::{Delete, LetterPresence, LetterStore};
use placement::{NewPlacement, PlacementRecord, PlacementStore};
use search::SearchOutcome;
use student::{NewStudent, StudentRecord, StudentStore};

/// Cap applied to analytics fetches, independent of any user limit.
const ANALYTICS_CAP: i64 = 500;

/// Sample sizes for the dashboard view.
const DASHBOARD_STUDENTS: i64 = 500;
const DASHBOARD_COMPANIES: i64 = 300;
const DASHBOARD_PLACEMENTS: i64 = 300;

/// Companies listed in the dashboard's top-placements section.
const DASHBOARD_TOP_COMPANIES: usize = 8;

/// Companies listed in the placement analytics view and workbook.
const PLACEMENT_TOP_COMPANIES: usize = 10;

/// Error messages are cut to this many characters for display.
const MESSAGE_WIDTH: usize = 200;

fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if let Ok(env) = std::env::var("TPCELL_LOG") {
        EnvFilter::new(env)
    } else if quiet {
        EnvFilter::new("warn")
    } else {
        match verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    if let Err(err) = run(cli).await {
        match &err {
            Error::Connection { endpoint, .. } => {
                eprintln!("error: the {endpoint} database is unreachable");
                eprintln!("  {}", truncate_message(&err.to_string(), MESSAGE_WIDTH));
            }
            _ => eprintln!("error: {}", truncate_message(&err.to_string(), MESSAGE_WIDTH)),
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    if let Command::Completions(args) = &cli.command {
        args.generate();
        return Ok(());
    }

    let provider = Arc::new(ConnectionProvider::from_sources(
        cli.records_uri.clone(),
        cli.letters_uri.clone(),
    )?);
    let cache = Arc::new(SampleCache::new());

    match cli.command {
        Command::Student { action } => match action {
            StudentAction::Add(args) => student_add(&provider, &cache, &args).await,
            StudentAction::Search(args) => student_search(&provider, &args).await,
            StudentAction::Edit(args) => student_edit(&provider, &cache, &args).await,
            StudentAction::Delete(args) => student_delete(&provider, &args, cli.yes).await,
        },
        Command::Company { action } => match action {
            CompanyAction::Add(args) => company_add(&provider, &cache, &args, cli.yes).await,
            CompanyAction::Search(args) => company_search(&provider, &args).await,
            CompanyAction::Edit(args) => company_edit(&provider, &cache, &args).await,
            CompanyAction::Delete(args) => company_delete(&provider, &args, cli.yes).await,
            CompanyAction::Analytics(args) => company_analytics(&provider, args.json).await,
        },
        Command::Placement { action } => match action {
            PlacementAction::Add(args) => placement_add(&provider, &cache, &args, cli.yes).await,
            PlacementAction::Search(args) => placement_search(&provider, &args).await,
            PlacementAction::Edit(args) => placement_edit(&provider, &cache, &args).await,
            PlacementAction::Delete(args) => placement_delete(&provider, &args, cli.yes).await,
            PlacementAction::Analytics(args) => placement_analytics(&provider, &args).await,
        },
        Command::Letter { action } => letter_command(&provider, action, cli.yes).await,
        Command::Dashboard(args) => dashboard(provider, cache, args.json).await,
        Command::Export { action } => export_command(&provider, action).await,
        Command::Status(args) => status(&provider, args.json).await,
        Command::Completions(_) => Ok(()),
    }
}

// -- Students --

async fn student_add(
    provider: &ConnectionProvider,
    cache: &SampleCache,
    args: &cli::StudentAddArgs,
) -> Result<()> {
    validate::require_filled(&[
        ("name", &args.name),
        ("branch", &args.branch),
        ("admission year", &args.year),
        ("contact number", &args.contact),
    ])?;
    validate::check_phone(&args.contact)?;
    if let Some(email) = args.email.as_deref() {
        validate::check_optional_email(email)?;
    }

    let student = NewStudent {
        name: args.name.clone(),
        branch: args.branch.clone(),
        admission_year: args.year.clone(),
        contact_no: args.contact.clone(),
        email: args.email.clone(),
    };
    let store = StudentStore::open(provider).await?;
    let key = store.insert(&student).await?;
    cache.invalidate(CacheKind::Students);
    println!("Student record created ({key})");
    Ok(())
}

async fn student_search(
    provider: &ConnectionProvider,
    args: &cli::StudentSearchArgs,
) -> Result<()> {
    let filters = student::search_filters(&args.name, &args.branch, &args.year, &args.contact);
    let store = StudentStore::open(provider).await?;
    let outcome = search::run(
        store.collection(),
        &filters,
        &args.limit,
        student::search_projection(),
    )
    .await?;

    if args.json {
        return print_results_json(&outcome);
    }
    println!("{}", outcome.summary);
    if outcome.is_empty() {
        println!("No matching students.");
        return Ok(());
    }
    for doc in &outcome.documents {
        let record = StudentRecord::new(doc);
        println!(
            "{}  {} | {} | {} | {}",
            record_id(doc),
            record.name().unwrap_or("-"),
            record.branch().unwrap_or("-"),
            record.admission_year().as_deref().unwrap_or("-"),
            record.contact_no().unwrap_or("-"),
        );
    }
    println!("\n{} record(s)", outcome.documents.len());
    Ok(())
}

async fn student_edit(
    provider: &ConnectionProvider,
    cache: &SampleCache,
    args: &cli::StudentEditArgs,
) -> Result<()> {
    let id = ObjectId::parse_str(&args.id)?;
    let store = StudentStore::open(provider).await?;
    let existing = store
        .collection()
        .find_one(doc! { "_id": id })
        .await?
        .ok_or_else(|| Error::NotFound {
            kind: "student",
            name: args.id.clone(),
        })?;
    let current = StudentRecord::new(&existing);

    if let Some(contact) = args.contact.as_deref() {
        validate::check_phone(contact)?;
    }
    if let Some(email) = args.email.as_deref() {
        validate::check_optional_email(email)?;
    }

    let student = NewStudent {
        name: merge_field(args.name.as_deref(), current.name()),
        branch: merge_field(args.branch.as_deref(), current.branch()),
        admission_year: args
            .year
            .clone()
            .or_else(|| current.admission_year())
            .unwrap_or_default(),
        contact_no: merge_field(args.contact.as_deref(), current.contact_no()),
        email: args.email.clone().or_else(|| current.email().map(String::from)),
    };
    validate::require_filled(&[
        ("name", &student.name),
        ("branch", &student.branch),
        ("admission year", &student.admission_year),
        ("contact number", &student.contact_no),
    ])?;

    store.update(&id, &student).await?;
    cache.invalidate(CacheKind::Students);
    println!("Student record updated.");
    Ok(())
}

async fn student_delete(
    provider: &ConnectionProvider,
    args: &cli::StudentDeleteArgs,
    yes: bool,
) -> Result<()> {
    let store = StudentStore::open(provider).await?;
    let target = match &args.id {
        Some(raw) => fetch_by_id(store.collection(), raw, "student").await?,
        None => {
            validate::require_any(
                &[&args.name, &args.contact],
                "give --name or --contact to look up the record",
            )?;
            let filters = student::search_filters(&args.name, "", "", &args.contact);
            let outcome = search::run(
                store.collection(),
                &filters,
                "All",
                student::search_projection(),
            )
            .await?;
            single_match(outcome.documents, "student", &filters.summary(), |doc| {
                let record = StudentRecord::new(doc);
                format!(
                    "{} | {}",
                    record.name().unwrap_or("-"),
                    record.branch().unwrap_or("-")
                )
            })?
        }
    };

    let name = StudentRecord::new(&target)
        .name()
        .unwrap_or("this student")
        .to_string();
    if !confirm(&format!("Delete the record for {name}?"), yes)? {
        println!("Nothing deleted.");
        return Ok(());
    }
    let id = target.get_object_id("_id")?;
    if store.delete(&id).await? {
        println!("Student record deleted.");
    } else {
        println!("Record was already gone.");
    }
    Ok(())
}

// -- Companies --

async fn company_add(
    provider: &ConnectionProvider,
    cache: &SampleCache,
    args: &cli::CompanyAddArgs,
    yes: bool,
) -> Result<()> {
    validate::require_filled(&[
        ("company name", &args.name),
        ("email", &args.email),
        ("contact number", &args.contact),
        ("HR name", &args.hr_name),
        ("package", &args.package),
    ])?;
    validate::check_email(&args.email)?;

    let company = NewCompany {
        company_name: args.name.clone(),
        email: args.email.clone(),
        contact_info: args.contact.clone(),
        hr_name: args.hr_name.clone(),
        package: args.package.clone(),
        website: args.website.clone(),
        address: args.address.clone(),
    };
    let store = CompanyStore::open(provider).await?;

    if let Some(existing) = store.find_duplicate(&company).await? {
        let existing_name = CompanyRecord::new(&existing)
            .name()
            .unwrap_or("Unknown")
            .to_string();
        let prompt = format!(
            "A company with the same name or email already exists ({existing_name}). \
             Update it with the new details?"
        );
        if !confirm(&prompt, yes)? {
            println!("Nothing written; the existing record is unchanged.");
            return Ok(());
        }
        let id = existing.get_object_id("_id")?;
        store.update(&id, &company).await?;
        cache.invalidate(CacheKind::Companies);
        println!("Company '{existing_name}' updated.");
        return Ok(());
    }

    let key = store.insert(&company).await?;
    cache.invalidate(CacheKind::Companies);
    println!("Company record created ({key})");
    Ok(())
}

async fn company_search(
    provider: &ConnectionProvider,
    args: &cli::CompanySearchArgs,
) -> Result<()> {
    let filters = company::search_filters(&args.name, &args.email, &args.hr_name, &args.contact)
        .package(&args.package);
    let store = CompanyStore::open(provider).await?;
    let outcome = search::run(
        store.collection(),
        &filters,
        &args.limit,
        company::search_projection(),
    )
    .await?;

    if args.json {
        return print_results_json(&outcome);
    }
    println!("{}", outcome.summary);
    if outcome.is_empty() {
        println!("No matching companies.");
        return Ok(());
    }
    for doc in &outcome.documents {
        let record = CompanyRecord::new(doc);
        println!(
            "{}  {} | {} | {} | {} | {}",
            record_id(doc),
            record.name().unwrap_or("-"),
            record.email().unwrap_or("-"),
            record.contact().unwrap_or("-"),
            record.hr_name().unwrap_or("-"),
            record.package().unwrap_or("-"),
        );
    }
    println!("\n{} record(s)", outcome.documents.len());
    Ok(())
}

async fn company_edit(
    provider: &ConnectionProvider,
    cache: &SampleCache,
    args: &cli::CompanyEditArgs,
) -> Result<()> {
    let id = ObjectId::parse_str(&args.id)?;
    let store = CompanyStore::open(provider).await?;
    let existing = store
        .collection()
        .find_one(doc! { "_id": id })
        .await?
        .ok_or_else(|| Error::NotFound {
            kind: "company",
            name: args.id.clone(),
        })?;
    let current = CompanyRecord::new(&existing);

    if let Some(email) = args.email.as_deref() {
        validate::check_email(email)?;
    }

    let company = NewCompany {
        company_name: merge_field(args.name.as_deref(), current.name()),
        email: merge_field(args.email.as_deref(), current.email()),
        contact_info: merge_field(args.contact.as_deref(), current.contact()),
        hr_name: merge_field(args.hr_name.as_deref(), current.hr_name()),
        package: merge_field(args.package.as_deref(), current.package()),
        website: merge_field(args.website.as_deref(), current.website()),
        address: merge_field(args.address.as_deref(), current.address()),
    };
    validate::require_filled(&[
        ("company name", &company.company_name),
        ("email", &company.email),
        ("contact number", &company.contact_info),
        ("HR name", &company.hr_name),
        ("package", &company.package),
    ])?;

    store.update(&id, &company).await?;
    cache.invalidate(CacheKind::Companies);
    println!("Company record updated.");
    Ok(())
}

async fn company_delete(
    provider: &ConnectionProvider,
    args: &cli::CompanyDeleteArgs,
    yes: bool,
) -> Result<()> {
    let store = CompanyStore::open(provider).await?;
    let target = match &args.id {
        Some(raw) => fetch_by_id(store.collection(), raw, "company").await?,
        None => {
            let Some(predicate) = company::delete_search_predicate(&args.name, &args.contact)
            else {
                return Err(Error::Validation(
                    "give --name or --contact to look up the record".into(),
                ));
            };
            let candidates = store.find(predicate).await?;
            let lookup = [args.name.trim(), args.contact.trim()].join(" ");
            single_match(candidates, "company", lookup.trim(), |doc| {
                let record = CompanyRecord::new(doc);
                format!(
                    "{} | {}",
                    record.name().unwrap_or("-"),
                    record.email().unwrap_or("-")
                )
            })?
        }
    };

    let name = CompanyRecord::new(&target)
        .name()
        .unwrap_or("this company")
        .to_string();
    if !confirm(&format!("Delete the record for {name}?"), yes)? {
        println!("Nothing deleted.");
        return Ok(());
    }
    let id = target.get_object_id("_id")?;
    if store.delete(&id).await? {
        println!("Company record deleted.");
    } else {
        println!("Record was already gone.");
    }
    Ok(())
}

async fn company_analytics(provider: &ConnectionProvider, json: bool) -> Result<()> {
    let store = CompanyStore::open(provider).await?;
    let companies = store.sample(ANALYTICS_CAP).await?;
    let data = CompanyAnalyticsData {
        industry: charts::industry_distribution(&companies),
        package_distribution: charts::company_package_distribution(&companies),
        top_companies: charts::top_companies_by_package(&companies),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(());
    }
    print_chart("Industry distribution", &data.industry);
    print_chart("Package distribution", &data.package_distribution);
    print_chart_decimals("Top companies by package (LPA)", &data.top_companies);
    Ok(())
}

// -- Placements --

async fn placement_add(
    provider: &ConnectionProvider,
    cache: &SampleCache,
    args: &cli::PlacementAddArgs,
    yes: bool,
) -> Result<()> {
    validate::require_filled(&[
        ("student name", &args.student),
        ("student branch", &args.branch),
        ("company name", &args.company),
        ("email", &args.email),
        ("contact number", &args.contact),
        ("HR name", &args.hr_name),
        ("package", &args.package),
        ("year of placement", &args.year),
        ("position", &args.position),
        ("batch", &args.batch),
    ])?;

    let placement = NewPlacement {
        student_name: args.student.clone(),
        student_branch: args.branch.clone(),
        batch: args.batch.clone(),
        company_name: args.company.clone(),
        position: args.position.clone(),
        year_of_placement: args.year.clone(),
        package: args.package.clone(),
        email: args.email.clone(),
        contact_info: args.contact.clone(),
        hr_name: args.hr_name.clone(),
        address: args.address.clone(),
        placement_suggestion: args.suggestion.clone(),
        company_levels: args.levels.clone(),
        skills_required: args.skills.clone(),
        important_suggestions: args.notes.clone(),
    };

    // The letter goes in first, matching the form flow: a failed upload
    // offers to continue without the attachment.
    let letter_key = match &args.offer_letter {
        Some(path) => {
            match store_letter(provider, path, &args.student, &args.company).await {
                Ok(key) => Some(key),
                Err(err) => {
                    warn!(error = %err, "offer letter upload failed");
                    let prompt = format!(
                        "Storing the offer letter failed ({}). Continue without the attachment?",
                        truncate_message(&err.to_string(), MESSAGE_WIDTH)
                    );
                    if !confirm(&prompt, yes)? {
                        println!("Nothing written.");
                        return Ok(());
                    }
                    None
                }
            }
        }
        None => None,
    };

    let store = PlacementStore::open(provider).await?;
    if let Some(existing) = store.find_duplicate(&placement).await? {
        let record = PlacementRecord::new(&existing);
        let student = record.student_name().unwrap_or("Unknown").to_string();
        let company = record.company_name().unwrap_or("Unknown").to_string();
        let prompt = format!(
            "A placement for {student} at {company} already exists. \
             Update it with the new details?"
        );
        if !confirm(&prompt, yes)? {
            println!("Nothing written; the existing record is unchanged.");
            return Ok(());
        }
        let id = existing.get_object_id("_id")?;
        store.overwrite(&id, &placement, letter_key.as_deref()).await?;
        cache.invalidate(CacheKind::Placements);
        println!("Placement record for '{student}' updated.");
        if let Some(key) = &letter_key {
            println!("Offer letter stored ({key})");
        }
        return Ok(());
    }

    let record_key = store.insert(&placement, letter_key.as_deref()).await?;
    cache.invalidate(CacheKind::Placements);
    println!("Placement record created ({record_key})");
    if let Some(key) = &letter_key {
        println!("Offer letter stored ({key})");
    }
    Ok(())
}

async fn store_letter(
    provider: &ConnectionProvider,
    path: &Path,
    student: &str,
    company: &str,
) -> Result<String> {
    let letters = LetterStore::open(provider).await?;
    letters.store(path, student, company).await
}

async fn placement_search(
    provider: &ConnectionProvider,
    args: &cli::PlacementSearchArgs,
) -> Result<()> {
    let filters =
        placement::search_filters(&args.student, &args.company, &args.branch, &args.hr_name)
            .package(&args.package);
    let store = PlacementStore::open(provider).await?;
    let outcome = search::run(
        store.collection(),
        &filters,
        &args.limit,
        placement::search_projection(),
    )
    .await?;
    let statuses = letter_statuses(provider, &outcome.documents).await;

    if args.json {
        let payload = PlacementResultsJson {
            summary: &outcome.summary,
            count: outcome.documents.len(),
            records: &outcome.documents,
            offer_letters: statuses.iter().map(|s| s.label()).collect(),
        };
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }
    println!("{}", outcome.summary);
    if outcome.is_empty() {
        println!("No matching placements.");
        return Ok(());
    }
    for (doc, presence) in outcome.documents.iter().zip(&statuses) {
        let record = PlacementRecord::new(doc);
        println!(
            "{}  {} | {} | {} | {} | letter: {}",
            record_id(doc),
            record.student_name().unwrap_or("-"),
            record.company_name().unwrap_or("-"),
            record.package().unwrap_or("-"),
            record.hr_name().unwrap_or("-"),
            presence.label(),
        );
    }
    println!("\n{} record(s)", outcome.documents.len());
    Ok(())
}

/// Resolve the offer-letter column for each fetched placement. When the
/// letters database is unreachable every linked letter reads as
/// Missing rather than failing the whole view.
async fn letter_statuses(
    provider: &ConnectionProvider,
    documents: &[Document],
) -> Vec<LetterPresence> {
    let letters = match LetterStore::open(provider).await {
        Ok(store) => Some(store),
        Err(err) => {
            warn!(error = %err, "letters database unreachable; letter presence degraded");
            None
        }
    };
    let mut statuses = Vec::with_capacity(documents.len());
    for doc in documents {
        let key = PlacementRecord::new(doc).letter_key();
        let presence = match (&letters, key) {
            (Some(store), key) => store.presence(key).await,
            (None, Some(_)) => LetterPresence::Missing,
            (None, None) => LetterPresence::No,
        };
        statuses.push(presence);
    }
    statuses
}

async fn placement_edit(
    provider: &ConnectionProvider,
    cache: &SampleCache,
    args: &cli::PlacementEditArgs,
) -> Result<()> {
    let id = ObjectId::parse_str(&args.id)?;
    let store = PlacementStore::open(provider).await?;
    let existing = store
        .collection()
        .find_one(doc! { "_id": id })
        .await?
        .ok_or_else(|| Error::NotFound {
            kind: "placement",
            name: args.id.clone(),
        })?;
    let current = PlacementRecord::new(&existing);

    let placement = NewPlacement {
        student_name: merge_field(args.student.as_deref(), current.student_name()),
        student_branch: merge_field(args.branch.as_deref(), current.student_branch()),
        batch: merge_field(args.batch.as_deref(), current.batch()),
        company_name: merge_field(args.company.as_deref(), current.company_name()),
        position: merge_field(args.position.as_deref(), current.position()),
        year_of_placement: merge_field(args.year.as_deref(), current.year_of_placement()),
        package: merge_field(args.package.as_deref(), current.package()),
        email: merge_field(args.email.as_deref(), current.email()),
        contact_info: merge_field(args.contact.as_deref(), current.contact()),
        hr_name: merge_field(args.hr_name.as_deref(), current.hr_name()),
        address: merge_field(args.address.as_deref(), current.address()),
        placement_suggestion: merge_field(
            args.suggestion.as_deref(),
            current.placement_suggestion(),
        ),
        company_levels: merge_field(args.levels.as_deref(), current.company_levels()),
        skills_required: merge_field(args.skills.as_deref(), current.skills_required()),
        important_suggestions: merge_field(
            args.notes.as_deref(),
            current.important_suggestions(),
        ),
    };
    validate::require_filled(&[
        ("student name", &placement.student_name),
        ("student branch", &placement.student_branch),
        ("company name", &placement.company_name),
        ("email", &placement.email),
        ("contact number", &placement.contact_info),
        ("HR name", &placement.hr_name),
        ("package", &placement.package),
        ("year of placement", &placement.year_of_placement),
        ("position", &placement.position),
        ("batch", &placement.batch),
    ])?;

    store.update(&id, &placement).await?;
    cache.invalidate(CacheKind::Placements);
    println!("Placement record updated.");
    Ok(())
}

async fn placement_delete(
    provider: &ConnectionProvider,
    args: &cli::PlacementDeleteArgs,
    yes: bool,
) -> Result<()> {
    let store = PlacementStore::open(provider).await?;
    let target = match &args.id {
        Some(raw) => fetch_by_id(store.collection(), raw, "placement").await?,
        None => {
            validate::require_any(
                &[&args.student, &args.company],
                "give --student or --company to look up the record",
            )?;
            let filters = placement::lookup_filters(&args.student, &args.company);
            let candidates = store.find(filters.predicate()).await?;
            single_match(candidates, "placement", &filters.summary(), |doc| {
                let record = PlacementRecord::new(doc);
                format!(
                    "{} | {}",
                    record.student_name().unwrap_or("-"),
                    record.company_name().unwrap_or("-")
                )
            })?
        }
    };

    let record = PlacementRecord::new(&target);
    let student = record.student_name().unwrap_or("this student").to_string();
    let company = record.company_name().unwrap_or("this company").to_string();
    if !confirm(&format!("Delete the placement of {student} at {company}?"), yes)? {
        println!("Nothing deleted.");
        return Ok(());
    }
    let id = target.get_object_id("_id")?;
    if store.delete(&id).await? {
        println!("Placement record deleted.");
    } else {
        println!("Record was already gone.");
    }
    Ok(())
}

async fn placement_analytics(
    provider: &ConnectionProvider,
    args: &cli::PlacementAnalyticsArgs,
) -> Result<()> {
    let (data, _) =
        placement_analytics_data(provider, args.batch.as_deref(), args.branch.as_deref())
            .await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(());
    }
    println!("{}", data.status);
    print_chart("Placements by branch", &data.by_branch);
    print_chart("Placements by package", &data.by_package);
    print_chart("Top companies by placements", &data.top_companies);
    print_chart("Placements by HR", &data.by_hr);
    Ok(())
}

/// Fetch the analytics sample and apply the optional batch-year and
/// branch filters. Returns the shaped chart data and the filtered list
/// the workbook export runs over.
async fn placement_analytics_data(
    provider: &ConnectionProvider,
    batch: Option<&str>,
    branch: Option<&str>,
) -> Result<(PlacementAnalyticsData, Vec<Document>)> {
    let store = PlacementStore::open(provider).await?;
    let fetched = store.sample(ANALYTICS_CAP).await?;
    let total = fetched.len();

    let mut parts = Vec::new();
    let mut filtered = fetched;
    if let Some(raw) = batch {
        match raw.trim().parse::<i32>() {
            Ok(year) => {
                let students = StudentStore::open(provider).await?;
                let names = students.batch_names(year).await?;
                filtered = placement::filter_by_batch(filtered, &names);
                parts.push(format!("Batch {year}"));
            }
            Err(_) => parts.push("Invalid year".to_string()),
        }
    }
    if let Some(branch) = branch {
        if !branch.trim().is_empty() {
            filtered = placement::filter_by_branch(filtered, branch.trim());
            parts.push(format!("Branch: {}", branch.trim()));
        }
    }

    let data = PlacementAnalyticsData {
        status: placement::analytics_status(&parts, filtered.len(), total),
        by_branch: charts::placements_by_branch(&filtered),
        by_package: charts::placements_by_package(&filtered),
        top_companies: charts::top_companies_by_placements(&filtered, PLACEMENT_TOP_COMPANIES),
        by_hr: charts::placements_by_hr(&filtered),
    };
    Ok((data, filtered))
}

// -- Letters --

async fn letter_command(
    provider: &ConnectionProvider,
    action: LetterAction,
    yes: bool,
) -> Result<()> {
    let store = LetterStore::open(provider).await?;
    match action {
        LetterAction::Store {
            file,
            student,
            company,
        } => {
            validate::require_filled(&[("student", &student), ("company", &company)])?;
            let key = store.store(&file, &student, &company).await?;
            println!("{key}");
        }
        LetterAction::Info { key, json } => {
            let info = store.info(&key).await?.ok_or(Error::NotFound {
                kind: "offer letter",
                name: key,
            })?;
            if json {
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                println!("key:      {}", info.key);
                println!("student:  {}", info.student_name);
                println!("company:  {}", info.company_name);
                println!("filename: {}", info.filename);
                println!("size:     {} bytes", info.size);
                if let Some(uploaded) = info.uploaded {
                    println!("uploaded: {}", uploaded.format("%Y-%m-%d %H:%M"));
                }
            }
        }
        LetterAction::View { key } => {
            let opened = store.view(&key).await?;
            println!(
                "Opened {} ({} at {})",
                opened.path.display(),
                opened.student_name,
                opened.company_name
            );
        }
        LetterAction::Delete { key, hard, reason } => {
            let mode = if hard {
                Delete::Hard
            } else {
                Delete::Soft { reason }
            };
            let verb = if hard { "Remove" } else { "Retire" };
            if !confirm(&format!("{verb} offer letter {key}?"), yes)? {
                println!("Nothing deleted.");
                return Ok(());
            }
            if store.delete(&key, mode).await? {
                println!(
                    "Offer letter {}.",
                    if hard { "removed" } else { "retired" }
                );
            } else {
                println!("No letter found under that key.");
            }
        }
        LetterAction::List {
            student,
            company,
            json,
        } => {
            let letters = store
                .list(blank_to_none(&student), blank_to_none(&company))
                .await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&letters)?);
            } else if letters.is_empty() {
                println!("No letters stored.");
            } else {
                for info in &letters {
                    println!(
                        "{}  {} | {} | {} | {} bytes",
                        info.key,
                        info.student_name,
                        info.company_name,
                        info.filename,
                        info.size
                    );
                }
                println!("\n{} letter(s)", letters.len());
            }
        }
    }
    Ok(())
}

// -- Dashboard --

async fn dashboard(
    provider: Arc<ConnectionProvider>,
    cache: Arc<SampleCache>,
    json: bool,
) -> Result<()> {
    let warmup = warmup::spawn(provider.clone(), cache.clone());
    let result = dashboard_inner(&provider, &cache, json).await;
    warmup.shutdown().await;
    result
}

async fn dashboard_inner(
    provider: &ConnectionProvider,
    cache: &SampleCache,
    json: bool,
) -> Result<()> {
    let students_store = StudentStore::open(provider).await?;
    let companies_store = CompanyStore::open(provider).await?;
    let placements_store = PlacementStore::open(provider).await?;

    let students = cache
        .get_or_fetch(CacheKind::Students, DASHBOARD_STUDENTS, || {
            students_store.sample(DASHBOARD_STUDENTS)
        })
        .await?;
    let companies = cache
        .get_or_fetch(CacheKind::Companies, DASHBOARD_COMPANIES, || {
            companies_store.sample(DASHBOARD_COMPANIES)
        })
        .await?;
    let placements = cache
        .get_or_fetch(CacheKind::Placements, DASHBOARD_PLACEMENTS, || {
            placements_store.sample(DASHBOARD_PLACEMENTS)
        })
        .await?;

    let data = DashboardData {
        students_by_branch: charts::students_by_branch(&students),
        package_ranges: charts::company_package_ranges(&companies),
        records_count: charts::records_count(&students, &companies, &placements),
        students_vs_placed: charts::students_vs_placed_by_branch(&students, &placements),
        placement_stats: charts::placement_stats(&students, &placements),
        placement_rate_by_branch: charts::placement_rate_by_branch(&students, &placements),
        avg_package_by_branch: charts::avg_package_by_branch(&placements),
        placements_by_branch: charts::placements_by_branch_dashboard(&placements),
        top_companies: charts::top_companies_by_placements(&placements, DASHBOARD_TOP_COMPANIES),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(());
    }
    println!(
        "Students: {}   Companies: {}   Placements: {}",
        students.len(),
        companies.len(),
        placements.len()
    );
    print_chart("Students by branch", &data.students_by_branch);
    print_chart3("Company package ranges (LPA)", &data.package_ranges);
    print_chart3("Total records", &data.records_count);
    print_comparison(&data.students_vs_placed);
    print_chart("Placement status", &data.placement_stats);
    print_chart_decimals("Placement rate by branch (%)", &data.placement_rate_by_branch);
    print_chart_decimals("Average package by branch (LPA)", &data.avg_package_by_branch);
    print_chart3("Placements by branch", &data.placements_by_branch);
    print_chart("Top companies by placements", &data.top_companies);
    Ok(())
}

// -- Export --

async fn export_command(provider: &ConnectionProvider, action: ExportAction) -> Result<()> {
    match action {
        ExportAction::Companies(args) => export_companies(provider, &args).await,
        ExportAction::Placements(args) => export_placements(provider, &args).await,
        ExportAction::Dashboard(args) => export_dashboard(provider, args.output).await,
        ExportAction::CompanyAnalytics(args) => {
            export_company_analytics(provider, args.output).await
        }
        ExportAction::PlacementAnalytics(args) => {
            export_placement_analytics(provider, &args).await
        }
    }
}

async fn export_companies(
    provider: &ConnectionProvider,
    args: &cli::ExportCompaniesArgs,
) -> Result<()> {
    let filters = company::search_filters(&args.name, &args.email, &args.hr_name, &args.contact)
        .package(&args.package);
    let store = CompanyStore::open(provider).await?;
    let outcome = search::run(
        store.collection(),
        &filters,
        &args.limit,
        company::search_projection(),
    )
    .await?;
    if outcome.is_empty() {
        return Err(Error::Validation("no companies matched; nothing to export".into()));
    }

    let path = output_path(args.output.clone(), "companies", args.format);
    match args.format {
        ExportFormat::Csv => export::write_companies_csv(&path, &outcome.documents)?,
        ExportFormat::Workbook => export::companies_workbook(&outcome.documents).write(&path)?,
    }
    println!(
        "Exported {} companies to {}",
        outcome.documents.len(),
        path.display()
    );
    Ok(())
}

async fn export_placements(
    provider: &ConnectionProvider,
    args: &cli::ExportPlacementsArgs,
) -> Result<()> {
    let filters =
        placement::search_filters(&args.student, &args.company, &args.branch, &args.hr_name)
            .package(&args.package);
    let store = PlacementStore::open(provider).await?;
    let outcome = search::run(
        store.collection(),
        &filters,
        &args.limit,
        placement::search_projection(),
    )
    .await?;
    if outcome.is_empty() {
        return Err(Error::Validation(
            "no placements matched; nothing to export".into(),
        ));
    }
    let statuses = letter_statuses(provider, &outcome.documents).await;

    let path = output_path(args.output.clone(), "placements", args.format);
    match args.format {
        ExportFormat::Csv => {
            export::write_placements_csv(&path, &outcome.documents, &statuses)?
        }
        ExportFormat::Workbook => {
            export::placements_workbook(&outcome.documents, &statuses).write(&path)?
        }
    }
    println!(
        "Exported {} placements to {}",
        outcome.documents.len(),
        path.display()
    );
    Ok(())
}

async fn export_dashboard(provider: &ConnectionProvider, output: Option<PathBuf>) -> Result<()> {
    let students = StudentStore::open(provider).await?.all().await?;
    let companies = CompanyStore::open(provider).await?.all().await?;
    let placements = PlacementStore::open(provider).await?.all().await?;
    if students.is_empty() && companies.is_empty() && placements.is_empty() {
        return Err(Error::Validation("no data available to export".into()));
    }

    let path = output
        .unwrap_or_else(|| PathBuf::from(export::default_filename("home_dashboard", "json")));
    export::dashboard_workbook(&students, &companies, &placements).write(&path)?;
    println!("Exported dashboard workbook to {}", path.display());
    Ok(())
}

async fn export_company_analytics(
    provider: &ConnectionProvider,
    output: Option<PathBuf>,
) -> Result<()> {
    let store = CompanyStore::open(provider).await?;
    let companies = store.sample(ANALYTICS_CAP).await?;
    if companies.is_empty() {
        return Err(Error::Validation("no company data to export".into()));
    }

    let path = output
        .unwrap_or_else(|| PathBuf::from(export::default_filename("company_analytics", "json")));
    export::company_analytics_workbook(&companies).write(&path)?;
    println!("Exported company analytics workbook to {}", path.display());
    Ok(())
}

async fn export_placement_analytics(
    provider: &ConnectionProvider,
    args: &cli::ExportPlacementAnalyticsArgs,
) -> Result<()> {
    let (data, filtered) =
        placement_analytics_data(provider, args.batch.as_deref(), args.branch.as_deref())
            .await?;
    if filtered.is_empty() {
        return Err(Error::Validation("no placement data to export".into()));
    }

    let path = args.output.clone().unwrap_or_else(|| {
        PathBuf::from(export::default_filename("placement_analytics", "json"))
    });
    export::placement_analytics_workbook(&filtered).write(&path)?;
    println!("{}", data.status);
    println!(
        "Exported placement analytics workbook to {}",
        path.display()
    );
    Ok(())
}

fn output_path(explicit: Option<PathBuf>, prefix: &str, format: ExportFormat) -> PathBuf {
    explicit.unwrap_or_else(|| {
        let extension = match format {
            ExportFormat::Csv => "csv",
            ExportFormat::Workbook => "json",
        };
        PathBuf::from(export::default_filename(prefix, extension))
    })
}

// -- Status --

async fn status(provider: &ConnectionProvider, json: bool) -> Result<()> {
    let mut report = StatusReport::default();

    match provider.ping_records().await {
        Ok(()) => {
            report.records_reachable = true;
            report.students =
                Some(provider.students().await?.estimated_document_count().await?);
            report.companies =
                Some(provider.companies().await?.estimated_document_count().await?);
            report.placements =
                Some(provider.placements().await?.estimated_document_count().await?);
        }
        Err(err) => {
            report.records_error = Some(truncate_message(&err.to_string(), MESSAGE_WIDTH));
        }
    }
    match provider.ping_letters().await {
        Ok(()) => {
            report.letters_reachable = true;
            report.letters =
                Some(provider.letters().await?.estimated_document_count().await?);
        }
        Err(err) => {
            report.letters_error = Some(truncate_message(&err.to_string(), MESSAGE_WIDTH));
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    if report.records_reachable {
        println!("Records database: ok");
        println!("  students:   {}", report.students.unwrap_or(0));
        println!("  companies:  {}", report.companies.unwrap_or(0));
        println!("  placements: {}", report.placements.unwrap_or(0));
    } else {
        println!(
            "Records database: unreachable ({})",
            report.records_error.as_deref().unwrap_or("unknown")
        );
    }
    if report.letters_reachable {
        println!("Letters database: ok");
        println!("  letters:    {}", report.letters.unwrap_or(0));
    } else {
        println!(
            "Letters database: unreachable ({})",
            report.letters_error.as_deref().unwrap_or("unknown")
        );
    }
    Ok(())
}

// -- Shared helpers --

/// Ask before a destructive step. `--yes` answers every prompt.
fn confirm(prompt: &str, assume_yes: bool) -> Result<bool> {
    if assume_yes {
        return Ok(true);
    }
    print!("{prompt} [y/N] ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(matches!(line.trim().to_lowercase().as_str(), "y" | "yes"))
}

async fn fetch_by_id(
    collection: &mongodb::Collection<Document>,
    raw: &str,
    kind: &'static str,
) -> Result<Document> {
    let id = ObjectId::parse_str(raw)?;
    collection
        .find_one(doc! { "_id": id })
        .await?
        .ok_or_else(|| Error::NotFound {
            kind,
            name: raw.to_string(),
        })
}

/// Resolve a lookup to exactly one record. Several matches list the
/// candidates and ask for `--id`; none is a not-found.
fn single_match(
    mut documents: Vec<Document>,
    kind: &'static str,
    lookup: &str,
    label: impl Fn(&Document) -> String,
) -> Result<Document> {
    match documents.len() {
        0 => Err(Error::NotFound {
            kind,
            name: lookup.to_string(),
        }),
        1 => Ok(documents.remove(0)),
        n => {
            eprintln!("{n} records match:");
            for doc in &documents {
                eprintln!("  {}  {}", record_id(doc), label(doc));
            }
            Err(Error::Validation(
                "more than one record matched; re-run with --id".into(),
            ))
        }
    }
}

fn merge_field(new: Option<&str>, current: Option<&str>) -> String {
    new.or(current).unwrap_or_default().to_string()
}

fn blank_to_none(value: &str) -> Option<&str> {
    let value = value.trim();
    (!value.is_empty()).then_some(value)
}

fn record_id(doc: &Document) -> String {
    doc.get_object_id("_id")
        .map(|id| id.to_hex())
        .unwrap_or_else(|_| "-".to_string())
}

// -- Output --

#[derive(Serialize)]
struct ResultsJson<'a> {
    summary: &'a str,
    count: usize,
    records: &'a [Document],
}

fn print_results_json(outcome: &SearchOutcome) -> Result<()> {
    let payload = ResultsJson {
        summary: &outcome.summary,
        count: outcome.documents.len(),
        records: &outcome.documents,
    };
    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}

#[derive(Serialize)]
struct PlacementResultsJson<'a> {
    summary: &'a str,
    count: usize,
    records: &'a [Document],
    offer_letters: Vec<&'static str>,
}

#[derive(Serialize)]
struct CompanyAnalyticsData {
    industry: charts::ChartData,
    package_distribution: charts::ChartData,
    top_companies: charts::ChartData<f64>,
}

#[derive(Serialize)]
struct PlacementAnalyticsData {
    status: String,
    by_branch: charts::ChartData,
    by_package: charts::ChartData,
    top_companies: charts::ChartData,
    by_hr: charts::ChartData,
}

#[derive(Serialize)]
struct DashboardData {
    students_by_branch: charts::ChartData,
    package_ranges: charts::ChartData3,
    records_count: charts::ChartData3,
    students_vs_placed: charts::BranchComparison,
    placement_stats: charts::ChartData,
    placement_rate_by_branch: charts::ChartData<f64>,
    avg_package_by_branch: charts::ChartData<f64>,
    placements_by_branch: charts::ChartData3,
    top_companies: charts::ChartData,
}

#[derive(Default, Serialize)]
struct StatusReport {
    records_reachable: bool,
    letters_reachable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    records_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    letters_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    students: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    companies: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    placements: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    letters: Option<u64>,
}

fn print_chart(title: &str, data: &charts::ChartData) {
    println!("\n{title}");
    for (label, value) in data.labels.iter().zip(&data.values) {
        println!("  {label}: {value}");
    }
}

fn print_chart3(title: &str, data: &charts::ChartData3) {
    println!("\n{title}");
    for (label, value) in data.labels.iter().zip(&data.values) {
        println!("  {label}: {value}");
    }
}

fn print_chart_decimals(title: &str, data: &charts::ChartData<f64>) {
    println!("\n{title}");
    for (label, value) in data.labels.iter().zip(&data.values) {
        println!("  {label}: {value:.2}");
    }
}

fn print_comparison(data: &charts::BranchComparison) {
    println!("\nStudents vs placed by branch");
    for (branch, (total, placed)) in data
        .branches
        .iter()
        .zip(data.students.iter().zip(&data.placed))
    {
        println!("  {branch}: {placed} placed of {total}");
    }
}
