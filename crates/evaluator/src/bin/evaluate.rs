use clap::{Parser, Subcommand};
use evaluator::{
    AnthropicClient, CriteriaProcessor, EvaluationStore, ExtractionConfig, FfmpegDecoder,
    FrameExtractor, JudgeClient, JudgeConfig, LocalFileStore, ProgressTracker, RunOutcome,
    SchedulerConfig, TournamentScheduler,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use storage::Database;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "evaluate")]
#[command(about = "Video submission evaluation pipeline", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract frames for every submission of a task, or a single submission
    Extract {
        task_id: Uuid,

        #[arg(long)]
        submission: Option<Uuid>,

        #[arg(long, env = "FRAMES_DIR", default_value = "./frames")]
        frames_dir: PathBuf,

        #[arg(long, env = "MAX_FRAMES", default_value_t = 8)]
        max_frames: usize,
    },
    /// Run the pairwise tournament for a task and print the ranking
    Run {
        task_id: Uuid,

        #[command(flatten)]
        judge: JudgeArgs,

        #[arg(long, env = "WORKER_POOL_SIZE", default_value_t = 4)]
        workers: usize,
    },
    /// Generate evaluation criteria from a job posting
    Criteria {
        #[arg(long)]
        job_title: String,

        #[arg(long, default_value = "")]
        job_description: String,

        /// File holding the employer's example task
        #[arg(long)]
        example_task: PathBuf,

        #[command(flatten)]
        judge: JudgeArgs,
    },
}

#[derive(clap::Args)]
struct JudgeArgs {
    #[arg(long, env = "ANTHROPIC_API_KEY", default_value = "", hide_env_values = true)]
    api_key: String,

    #[arg(long, env = "JUDGE_MODEL", default_value = "claude-3-5-sonnet-20241022")]
    model: String,

    #[arg(long, env = "JUDGE_BASE_URL", default_value = "https://api.anthropic.com")]
    base_url: String,
}

impl JudgeArgs {
    fn config(&self) -> JudgeConfig {
        JudgeConfig {
            api_key: self.api_key.clone(),
            model: self.model.clone(),
            base_url: self.base_url.clone(),
            ..Default::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("evaluate={},evaluator={}", log_level, log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Extract {
            task_id,
            submission,
            frames_dir,
            max_frames,
        } => {
            let db = connect(cli.database_url.as_deref()).await?;
            handle_extract(db, task_id, submission, frames_dir, max_frames).await?;
        }
        Commands::Run {
            task_id,
            judge,
            workers,
        } => {
            let db = connect(cli.database_url.as_deref()).await?;
            handle_run(db, task_id, &judge, workers).await?;
        }
        Commands::Criteria {
            job_title,
            job_description,
            example_task,
            judge,
        } => {
            handle_criteria(&job_title, &job_description, example_task, &judge).await?;
        }
    }

    Ok(())
}

async fn connect(database_url: Option<&str>) -> Result<Database, Box<dyn std::error::Error>> {
    let url = database_url.ok_or("DATABASE_URL is required for this command")?;
    let db = Database::new(url).await?;
    db.run_migrations().await?;
    Ok(db)
}

async fn handle_extract(
    db: Database,
    task_id: Uuid,
    submission: Option<Uuid>,
    frames_dir: PathBuf,
    max_frames: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let extractor = FrameExtractor::new(
        Arc::new(db),
        Arc::new(LocalFileStore::new()),
        Arc::new(FfmpegDecoder::default()),
        ExtractionConfig {
            frames_root: frames_dir,
            max_frames,
            ..Default::default()
        },
    );

    if let Some(submission_id) = submission {
        let frames = extractor.extract_submission(submission_id).await?;
        for frame in frames {
            println!("{:>3}  {:>8} ms  {}", frame.position, frame.timestamp_ms, frame.path);
        }
        return Ok(());
    }

    let summary = extractor.extract_task(task_id).await?;
    println!(
        "Processed {} submissions: {} succeeded, {} failed",
        summary.processed, summary.succeeded, summary.failed
    );
    for failure in &summary.failures {
        println!("  {}: {}", failure.submission_id, failure.reason);
    }
    Ok(())
}

async fn handle_run(
    db: Database,
    task_id: Uuid,
    judge: &JudgeArgs,
    workers: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let store: Arc<dyn EvaluationStore> = Arc::new(db);
    let scheduler = TournamentScheduler::new(
        store,
        Arc::new(LocalFileStore::new()),
        Arc::new(JudgeClient::new(&judge.config())?),
        ProgressTracker::new(),
        SchedulerConfig {
            worker_pool_size: workers,
            ..Default::default()
        },
    );

    match scheduler.run(task_id).await? {
        RunOutcome::Completed {
            run_id,
            rankings,
            degraded_pairs,
        } => {
            println!("Run {} completed ({} degraded comparisons)", run_id, degraded_pairs);
            for entry in rankings {
                println!(
                    "#{:<3} {:>4}  {}  W{} L{} T{}",
                    entry.rank,
                    entry
                        .percentile
                        .map(|p| format!("{}%", p))
                        .unwrap_or_else(|| "-".to_string()),
                    entry.submission_id,
                    entry.wins,
                    entry.losses,
                    entry.ties
                );
            }
            Ok(())
        }
        RunOutcome::Failed { run_id, reason } => {
            Err(format!("Run {} failed: {}", run_id, reason).into())
        }
    }
}

async fn handle_criteria(
    job_title: &str,
    job_description: &str,
    example_task: PathBuf,
    judge: &JudgeArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let example = tokio::fs::read_to_string(&example_task).await?;

    let processor = if judge.api_key.is_empty() {
        tracing::warn!("ANTHROPIC_API_KEY not set, using default criteria");
        CriteriaProcessor::offline()
    } else {
        let llm = AnthropicClient::new(
            judge.base_url.clone(),
            judge.api_key.clone(),
            judge.model.clone(),
            Duration::from_secs(60),
        )?;
        CriteriaProcessor::new(Arc::new(llm))
    };

    let response = processor.generate(job_title, job_description, &example).await;
    if response.fallback_used {
        tracing::warn!("Returned role defaults for '{}'", job_title);
    }
    println!("{}", serde_json::to_string_pretty(&response.criteria)?);
    Ok(())
}
