use anyhow::{anyhow, bail, Context, Result};
use chunkflow::config::{BatchConfig, LogFormat};
use chunkflow::core::JobParameters;
use chunkflow::events::set_event_sink;
use chunkflow::job::{InMemoryJobRepository, JobLauncher};
use chunkflow_jobs::jobs::{build_job, simple_job, JobKind, SimpleJobLayout};
use chunkflow_jobs::teacher::{seed_teachers, teacher_table};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "chunkflow-jobs")]
#[command(version)]
#[command(about = "Runs a demo batch job over an in-memory teacher table")]
struct Cli {
    /// Job to run
    #[arg(value_enum)]
    job: JobKind,

    /// Job parameter as key=value or key(type)=value, repeatable
    #[arg(short, long = "param", value_name = "KEY=VALUE")]
    params: Vec<String>,

    /// JSON configuration file
    #[arg(short, long, env = "CHUNKFLOW_CONFIG")]
    config: Option<PathBuf>,

    /// Items per chunk (overrides config file)
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Build the simple job with only its first step
    #[arg(long)]
    single_step: bool,

    /// Print the job execution as JSON when done
    #[arg(long)]
    json: bool,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,
}

fn init_tracing(format: LogFormat, level: &str) {
    let filter = format!("chunkflow={level},chunkflow_jobs={level}");
    let json = format == LogFormat::Json;
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with((!json).then(fmt::layer))
        .with(json.then(|| fmt::layer().json()))
        .init();
}

fn parse_params(raw: &[String]) -> Result<JobParameters> {
    raw.iter()
        .map(|pair| {
            JobParameters::parse_pair(pair).ok_or_else(|| anyhow!("invalid job parameter '{pair}', expected KEY=VALUE or KEY(TYPE)=VALUE"))
        })
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => BatchConfig::from_json_file(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => BatchConfig::default(),
    };
    if let Some(chunk_size) = cli.chunk_size {
        config = config.with_chunk_size(chunk_size);
    }
    config.validate()?;

    init_tracing(config.log_format, &cli.log_level);
    set_event_sink(config.event_sink());

    let parameters = parse_params(&cli.params)?;
    let job = match cli.job {
        JobKind::Simple if cli.single_step => simple_job(SimpleJobLayout::OneStep)?,
        kind => build_job(kind, Arc::new(teacher_table(&seed_teachers())), &config)?,
    };
    info!(job = %job.name(), parameters = parameters.len(), "Launching job");

    let launcher = JobLauncher::new(Arc::new(InMemoryJobRepository::new()));
    let execution = launcher.run(&job, parameters).await?;

    for step in &execution.step_executions {
        info!(
            step = %step.step_name,
            status = %step.status,
            exit_status = %step.exit_status,
            read = step.read_count,
            filtered = step.filter_count,
            written = step.write_count,
            commits = step.commit_count,
            "Step finished"
        );
    }
    info!(
        job = %execution.job_name,
        status = %execution.status,
        exit_status = %execution.exit_status,
        duration_ms = execution.duration_ms().unwrap_or_default(),
        "Job finished"
    );

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&execution)?);
    }
    if !execution.is_successful() {
        bail!("job {} ended with {}", execution.job_name, execution.exit_status);
    }
    Ok(())
}
