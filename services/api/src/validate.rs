use crate::infra::{load_resources, InMemoryArtefactRepository, InMemoryPayloadStore};
use clap::Args;
use court_publications::config::PublicationConfig;
use court_publications::error::AppError;
use court_publications::publication::sensitivity::can_view;
use court_publications::publication::{
    HeaderGroup, PreparedSubmission, PublicationService, SearchTerms, SubmittedHeaders,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct ValidateArgs {
    /// JSON payload to run through the ingestion stages
    #[arg(long)]
    pub(crate) payload: PathBuf,
    /// Submission header as NAME=VALUE (repeatable), e.g. x-list-type=SJP_PRESS_LIST
    #[arg(long = "header", short = 'H', value_parser = parse_header)]
    pub(crate) headers: Vec<(String, String)>,
    /// Directory of schema documents; defaults to the bundled schemas
    #[arg(long)]
    pub(crate) schema_dir: Option<PathBuf>,
    /// Search-term configuration; defaults to the bundled configuration
    #[arg(long)]
    pub(crate) search_config: Option<PathBuf>,
    /// Location reference CSV; defaults to the bundled locations
    #[arg(long)]
    pub(crate) locations_csv: Option<PathBuf>,
    /// User roster CSV; the report lists which of these users could read the artefact
    #[arg(long)]
    pub(crate) users_csv: Option<PathBuf>,
    /// Emit compact JSON instead of the human-readable summary
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct ValidationReport {
    pub(crate) headers: HeaderGroup,
    pub(crate) location_id: String,
    pub(crate) location_matched: bool,
    pub(crate) search: SearchTerms,
    pub(crate) readers: Vec<String>,
}

impl ValidationReport {
    fn new(prepared: PreparedSubmission, readers: Vec<String>) -> Self {
        Self {
            location_id: prepared.location.location_id().to_string(),
            location_matched: prepared.location.is_matched(),
            headers: prepared.headers,
            search: prepared.search,
            readers,
        }
    }
}

pub(crate) fn run_validate(args: ValidateArgs) -> Result<(), AppError> {
    let report = validate_payload(&args)?;

    if args.json {
        let rendered = serde_json::to_string(&report)
            .map_err(|err| AppError::Io(std::io::Error::other(err)))?;
        println!("{rendered}");
        return Ok(());
    }

    println!(
        "{} payload for {} is valid",
        report.headers.list_type, report.headers.provenance
    );
    println!(
        "Location: {}{}",
        report.location_id,
        if report.location_matched {
            ""
        } else {
            " (no match)"
        }
    );
    println!(
        "Display window: {} to {}",
        report.headers.display_from, report.headers.display_to
    );
    if report.search.is_empty() {
        println!("No search terms extracted");
    } else {
        println!("Search terms:");
        for (field, values) in report.search.clone().into_inner() {
            let rendered: Vec<String> = values.iter().map(ToString::to_string).collect();
            println!("  {field}: {}", rendered.join(", "));
        }
    }
    if !report.readers.is_empty() {
        println!("Readable by: {}", report.readers.join(", "));
    }

    Ok(())
}

pub(crate) fn validate_payload(args: &ValidateArgs) -> Result<ValidationReport, AppError> {
    let resources = load_resources(&PublicationConfig {
        schema_dir: args.schema_dir.clone(),
        search_config: args.search_config.clone(),
        locations_csv: args.locations_csv.clone(),
        users_csv: args.users_csv.clone(),
    })?;
    let users = Arc::new(resources.users);
    let service = PublicationService::new(
        Arc::new(resources.schemas),
        Arc::new(resources.search),
        Arc::new(InMemoryArtefactRepository::default()),
        Arc::new(InMemoryPayloadStore::default()),
        Arc::new(resources.locations),
        Arc::clone(&users),
    );

    let payload = std::fs::read_to_string(&args.payload)?;
    let headers: SubmittedHeaders = args
        .headers
        .iter()
        .map(|(name, value)| (name.to_ascii_lowercase(), value.clone()))
        .collect();

    let prepared = service.prepare(&headers, &payload)?;
    let (sensitivity, list_type) = (prepared.headers.sensitivity, prepared.headers.list_type);
    let readers = users.user_ids_where(|profile| can_view(sensitivity, list_type, Some(profile)));

    Ok(ValidationReport::new(prepared, readers))
}

fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("header '{raw}' must be written as NAME=VALUE"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("header '{raw}' has an empty name"));
    }
    Ok((name.to_string(), value.trim().to_string()))
}
