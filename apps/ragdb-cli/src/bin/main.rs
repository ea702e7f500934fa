use std::env;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{anyhow, bail, Result};
use serde::Serialize;

use ragdb_cli::{init_tracing, Services};
use ragdb_core::config::{resolve_with_base, Config, Settings};
use ragdb_core::filter::Filters;
use ragdb_core::types::{NewDocument, RagRequest, SearchQuery, SearchType};

const USAGE: &str = "Usage: ragdb [--config-dir <dir>] <command> [args...]

Commands:
  init [--force]                         create the index (recreate with --force)
  ingest [dir] [--limit N]               load *.json/*.jsonl documents and index them
  add <json>                             add one document {title, content, category, tags?, metadata?}
  search <query> [--type vector|text|hybrid] [--max N] [--min-score F] [--filters <json>]
  search --json <request>                search with a full JSON request body
  rag <query> [--max-context N] [--min-score F] [--no-sources]
  get <id>
  delete <id>
  stats
  health

get and delete exit with status 3 when the document does not exist.";

fn usage_exit() -> ! {
    eprintln!("{USAGE}");
    process::exit(1)
}

fn not_found_exit(err: &ragdb_core::Error) -> ! {
    eprintln!("❌ {err}");
    process::exit(3)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn flag_value<'a>(args: &'a [String], i: &mut usize, flag: &str) -> Result<&'a str> {
    *i += 1;
    args.get(*i).map(String::as_str).ok_or_else(|| anyhow!("{flag} requires a value"))
}

fn parse_search(args: &[String], settings: &Settings) -> Result<SearchQuery> {
    let mut query: Option<String> = None;
    let mut request = SearchQuery::new("")
        .with_max_results(settings.search.default_max_results)
        .with_min_score(settings.search.default_min_score);
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--json" => return Ok(SearchQuery::from_json(flag_value(args, &mut i, "--json")?)?),
            "--type" | "-t" => request = request.with_search_type(flag_value(args, &mut i, "--type")?.parse::<SearchType>()?),
            "--max" | "-n" => request = request.with_max_results(flag_value(args, &mut i, "--max")?.parse()?),
            "--min-score" => request = request.with_min_score(flag_value(args, &mut i, "--min-score")?.parse()?),
            "--filters" => {
                let filters: Filters = serde_json::from_str(flag_value(args, &mut i, "--filters")?)?;
                request = request.with_filters(filters);
            }
            other if !other.starts_with('-') && query.is_none() => query = Some(other.to_string()),
            other => bail!("unexpected argument: {other}"),
        }
        i += 1;
    }
    request.query = query.ok_or_else(|| anyhow!("search requires a query"))?;
    Ok(request)
}

fn parse_rag(args: &[String], settings: &Settings) -> Result<RagRequest> {
    let mut query: Option<String> = None;
    let mut request = RagRequest::new("")
        .with_max_context(settings.search.default_max_context)
        .with_min_score(settings.search.default_min_score);
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--json" => return Ok(RagRequest::from_json(flag_value(args, &mut i, "--json")?)?),
            "--max-context" | "-n" => request = request.with_max_context(flag_value(args, &mut i, "--max-context")?.parse()?),
            "--min-score" => request = request.with_min_score(flag_value(args, &mut i, "--min-score")?.parse()?),
            "--no-sources" => request = request.with_sources(false),
            other if !other.starts_with('-') && query.is_none() => query = Some(other.to_string()),
            other => bail!("unexpected argument: {other}"),
        }
        i += 1;
    }
    request.query = query.ok_or_else(|| anyhow!("rag requires a query"))?;
    Ok(request)
}

async fn run(cmd: &str, args: &[String], services: Services, base_dir: &Path) -> Result<()> {
    match cmd {
        "init" => {
            let force = args.iter().any(|a| a == "--force" || a == "-f");
            services.documents.ensure_index(force).await?;
            println!("✅ Index {} ready", services.backend.index_name());
        }
        "ingest" => {
            let mut dir = None;
            let mut limit = usize::MAX;
            let mut i = 0;
            while i < args.len() {
                match args[i].as_str() {
                    "--limit" => limit = flag_value(args, &mut i, "--limit")?.parse()?,
                    other if !other.starts_with('-') => dir = Some(PathBuf::from(other)),
                    other => bail!("unexpected argument: {other}"),
                }
                i += 1;
            }
            let dir = dir.unwrap_or_else(|| resolve_with_base(base_dir, &services.settings.data.documents_dir));
            println!("Ingesting from {}", dir.display());
            services.documents.ensure_index(false).await?;
            let report = services.ingest_dir(&dir, limit, true).await?;
            println!("✅ Ingest complete ({} indexed, {} failed)", report.indexed, report.failed);
        }
        "add" => {
            let raw = args.first().unwrap_or_else(|| usage_exit());
            let input: NewDocument = serde_json::from_str(raw)?;
            print_json(&services.documents.add_document(input).await?)?;
        }
        "search" => {
            let query = parse_search(args, &services.settings)?;
            print_json(&services.orchestrator.search(&query).await?)?;
        }
        "rag" => {
            let request = parse_rag(args, &services.settings)?;
            print_json(&services.orchestrator.rag_query(&request).await?)?;
        }
        "get" => {
            let id = args.first().unwrap_or_else(|| usage_exit());
            match services.documents.get_document(id).await {
                Ok(document) => print_json(&document)?,
                Err(e) if e.is_not_found() => not_found_exit(&e),
                Err(e) => return Err(e.into()),
            }
        }
        "delete" => {
            let id = args.first().unwrap_or_else(|| usage_exit());
            match services.documents.delete_document(id).await {
                Ok(deleted) => print_json(&deleted)?,
                Err(e) if e.is_not_found() => not_found_exit(&e),
                Err(e) => return Err(e.into()),
            }
        }
        "stats" => print_json(&services.documents.stats().await?)?,
        "health" => {
            let report = services.documents.health().await?;
            print_json(&report)?;
            if !report.is_healthy() {
                process::exit(2);
            }
        }
        _ => {
            eprintln!("Unknown command: {cmd}");
            usage_exit();
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let mut args: Vec<String> = env::args().skip(1).collect();
    let mut base_dir = PathBuf::from(".");
    if args.first().map(String::as_str) == Some("--config-dir") {
        if args.len() < 2 {
            usage_exit();
        }
        base_dir = PathBuf::from(args.remove(1));
        args.remove(0);
    }
    if args.is_empty() || args[0] == "--help" || args[0] == "-h" {
        usage_exit();
    }
    let cmd = args.remove(0);
    let config = Config::load_from(&base_dir).map_err(|e| {
        eprintln!("Error loading config: {e:#}");
        e
    })?;
    let settings = config.settings()?;
    init_tracing(&settings.log.level);

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let services = Services::build(settings, &base_dir).await?;
        run(&cmd, &args, services, &base_dir).await
    })
}
