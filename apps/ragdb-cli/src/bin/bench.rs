use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Result};
use serde::Serialize;
use tokio::task::JoinSet;

use ragdb_cli::latency::LatencySummary;
use ragdb_cli::{init_tracing, Services};
use ragdb_core::config::Config;
use ragdb_core::types::{RagRequest, SearchQuery, SearchType};

const SEARCH_QUERIES: [&str; 10] = [
    "machine learning algorithms",
    "cloud computing security",
    "sustainable business practices",
    "quantum computing applications",
    "microservices architecture",
    "artificial intelligence ethics",
    "database performance optimization",
    "renewable energy technologies",
    "gene therapy advances",
    "digital transformation strategy",
];

const RAG_QUERIES: [&str; 5] = [
    "How can businesses implement AI responsibly?",
    "What are the benefits of microservices?",
    "How does quantum computing work?",
    "What are sustainable energy solutions?",
    "How to optimize database performance?",
];

#[derive(Debug, Serialize)]
struct SearchBench {
    search_type: SearchType,
    queries: usize,
    iterations: usize,
    failures: usize,
    latency_ms: LatencySummary,
}

#[derive(Debug, Serialize)]
struct RagBench {
    queries: usize,
    iterations: usize,
    failures: usize,
    avg_context_count: f64,
    latency_ms: LatencySummary,
}

#[derive(Debug, Serialize)]
struct ConcurrentBench {
    concurrency: usize,
    total_requests: usize,
    successful_requests: usize,
    failed_requests: usize,
    total_time_ms: f64,
    requests_per_second: f64,
    latency_ms: LatencySummary,
}

#[derive(Debug, Default, Serialize)]
struct BenchReport {
    backend: String,
    embedding_model: String,
    search: Vec<SearchBench>,
    rag: Option<RagBench>,
    concurrent: Option<ConcurrentBench>,
}

struct Options {
    config_dir: PathBuf,
    iterations: usize,
    rag_iterations: usize,
    concurrency: usize,
    total_requests: usize,
    output: Option<PathBuf>,
    search: bool,
    rag: bool,
    concurrent: bool,
}

fn flag_value<'a>(args: &'a [String], i: &mut usize) -> Result<&'a str> {
    let flag = &args[*i];
    *i += 1;
    args.get(*i).map(String::as_str).ok_or_else(|| anyhow!("{flag} requires a value"))
}

fn parse_args() -> Result<Options> {
    let args: Vec<String> = env::args().skip(1).collect();
    let mut o = Options {
        config_dir: PathBuf::from("."),
        iterations: 10,
        rag_iterations: 5,
        concurrency: 10,
        total_requests: 100,
        output: None,
        search: true,
        rag: true,
        concurrent: true,
    };
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--config-dir" => o.config_dir = PathBuf::from(flag_value(&args, &mut i)?),
            "--iterations" => o.iterations = flag_value(&args, &mut i)?.parse()?,
            "--rag-iterations" => o.rag_iterations = flag_value(&args, &mut i)?.parse()?,
            "--concurrency" => o.concurrency = flag_value(&args, &mut i)?.parse()?,
            "--total" => o.total_requests = flag_value(&args, &mut i)?.parse()?,
            "--output" => o.output = Some(PathBuf::from(flag_value(&args, &mut i)?)),
            "--search-only" => (o.rag, o.concurrent) = (false, false),
            "--rag-only" => (o.search, o.concurrent) = (false, false),
            "--concurrent-only" => (o.search, o.rag) = (false, false),
            other => {
                eprintln!("Unknown argument: {}", other);
                eprintln!("Usage: ragdb-bench [--config-dir <dir>] [--iterations N] [--rag-iterations N] [--concurrency N] [--total N] [--output file] [--search-only|--rag-only|--concurrent-only]");
                std::process::exit(1);
            }
        }
        i += 1;
    }
    Ok(o)
}

fn ms_since(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

async fn bench_search(services: &Services, search_type: SearchType, iterations: usize) -> SearchBench {
    let mut samples = Vec::new();
    let mut failures = 0;
    for q in SEARCH_QUERIES {
        let query = SearchQuery::new(q).with_search_type(search_type).with_max_results(10).with_min_score(0.0);
        for _ in 0..iterations {
            let start = Instant::now();
            match services.orchestrator.search(&query).await {
                Ok(_) => samples.push(ms_since(start)),
                Err(e) => {
                    tracing::warn!("{} search {:?} failed: {}", search_type, q, e);
                    failures += 1;
                }
            }
        }
    }
    SearchBench {
        search_type,
        queries: SEARCH_QUERIES.len(),
        iterations,
        failures,
        latency_ms: LatencySummary::from_samples(&samples),
    }
}

async fn bench_rag(services: &Services, iterations: usize) -> RagBench {
    let mut samples = Vec::new();
    let mut contexts = Vec::new();
    let mut failures = 0;
    for q in RAG_QUERIES {
        let request = RagRequest::new(q).with_min_score(0.0);
        for _ in 0..iterations {
            let start = Instant::now();
            match services.orchestrator.rag_query(&request).await {
                Ok(response) => {
                    samples.push(ms_since(start));
                    contexts.push(response.context_sources.len() as f64);
                }
                Err(e) => {
                    tracing::warn!("rag {:?} failed: {}", q, e);
                    failures += 1;
                }
            }
        }
    }
    let avg_context_count = if contexts.is_empty() { 0.0 } else { contexts.iter().sum::<f64>() / contexts.len() as f64 };
    RagBench {
        queries: RAG_QUERIES.len(),
        iterations,
        failures,
        avg_context_count,
        latency_ms: LatencySummary::from_samples(&samples),
    }
}

async fn bench_concurrent(services: Arc<Services>, concurrency: usize, total: usize) -> Result<ConcurrentBench> {
    let semaphore = Arc::new(tokio::sync::Semaphore::new(concurrency.max(1)));
    let start = Instant::now();
    let mut tasks = JoinSet::new();
    for _ in 0..total {
        let services = Arc::clone(&services);
        let permit = Arc::clone(&semaphore).acquire_owned().await?;
        tasks.spawn(async move {
            let _permit = permit;
            let begin = Instant::now();
            let query = SearchQuery::new("test query").with_max_results(5).with_min_score(0.0);
            services.orchestrator.search(&query).await.map(|_| ms_since(begin))
        });
    }
    let mut samples = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        if let Ok(Ok(ms)) = joined {
            samples.push(ms);
        }
    }
    let total_time_ms = ms_since(start);
    Ok(ConcurrentBench {
        concurrency,
        total_requests: total,
        successful_requests: samples.len(),
        failed_requests: total - samples.len(),
        total_time_ms,
        requests_per_second: if total_time_ms > 0.0 { samples.len() as f64 / (total_time_ms / 1000.0) } else { 0.0 },
        latency_ms: LatencySummary::from_samples(&samples),
    })
}

fn print_summary(label: &str, s: &LatencySummary) {
    println!(
        "  {:<10} n={:<4} mean={:>8.2}ms median={:>8.2}ms p95={:>8.2}ms min={:>8.2}ms max={:>8.2}ms",
        label, s.count, s.mean, s.median, s.p95, s.min, s.max
    );
}

fn main() -> Result<()> {
    let options = parse_args()?;
    let settings = Config::load_from(&options.config_dir)?.settings()?;
    init_tracing(&settings.log.level);
    let runtime = tokio::runtime::Runtime::new()?;
    let report = runtime.block_on(async {
        let services = Arc::new(Services::build(settings, &options.config_dir).await?);
        let health = services.documents.health().await?;
        if !health.is_healthy() {
            return Err(anyhow!("backend is not healthy: {}", health.backend.cluster_status));
        }
        let mut report = BenchReport {
            backend: services.backend.name().to_string(),
            embedding_model: services.embedder.model_name().to_string(),
            ..BenchReport::default()
        };
        if options.search {
            for search_type in [SearchType::Vector, SearchType::Text, SearchType::Hybrid] {
                report.search.push(bench_search(&services, search_type, options.iterations).await);
            }
        }
        if options.rag {
            report.rag = Some(bench_rag(&services, options.rag_iterations).await);
        }
        if options.concurrent {
            report.concurrent = Some(bench_concurrent(Arc::clone(&services), options.concurrency, options.total_requests).await?);
        }
        Ok::<_, anyhow::Error>(report)
    })?;

    println!("📊 ragdb benchmark ({} backend, {} embeddings)", report.backend, report.embedding_model);
    for s in &report.search {
        print_summary(s.search_type.as_str(), &s.latency_ms);
    }
    if let Some(rag) = &report.rag {
        print_summary("rag", &rag.latency_ms);
        println!("  avg context documents: {:.2}", rag.avg_context_count);
    }
    if let Some(c) = &report.concurrent {
        print_summary("concurrent", &c.latency_ms);
        println!("  {} ok / {} failed, {:.1} req/s", c.successful_requests, c.failed_requests, c.requests_per_second);
    }
    if let Some(path) = &options.output {
        std::fs::write(path, serde_json::to_string_pretty(&report)?)?;
        println!("💾 Results saved to {}", path.display());
    }
    Ok(())
}
