use anyhow::{Context, Result};
use evaluator::{ExtractionConfig, JudgeConfig, SchedulerConfig};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub anthropic_api_key: String,
    pub judge_model: Option<String>,
    pub judge_base_url: Option<String>,
    pub frames_dir: PathBuf,
    pub worker_pool_size: usize,
    pub max_frames: usize,
    pub sample_interval_ms: u64,
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            host: std::env::var("HOST").context("Cannot load HOST env variable")?,
            port: std::env::var("PORT")
                .context("PORT must be a number")?
                .parse()?,
            database_url: std::env::var("DATABASE_URL")
                .context("Cannot load DATABASE_URL env variable")?,
            anthropic_api_key: std::env::var("ANTHROPIC_API_KEY")
                .context("Cannot load ANTHROPIC_API_KEY env variable")?,
            judge_model: std::env::var("JUDGE_MODEL").ok(),
            judge_base_url: std::env::var("JUDGE_BASE_URL").ok(),
            frames_dir: std::env::var("FRAMES_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./frames")),
            worker_pool_size: parse_or("WORKER_POOL_SIZE", 4)?,
            max_frames: parse_or("MAX_FRAMES", 8)?,
            sample_interval_ms: parse_or("SAMPLE_INTERVAL_MS", 1_500)?,
            ffmpeg_path: std::env::var("FFMPEG_PATH").unwrap_or_else(|_| "ffmpeg".to_string()),
            ffprobe_path: std::env::var("FFPROBE_PATH").unwrap_or_else(|_| "ffprobe".to_string()),
        })
    }

    pub fn judge_config(&self) -> JudgeConfig {
        let defaults = JudgeConfig::default();
        JudgeConfig {
            api_key: self.anthropic_api_key.clone(),
            model: self.judge_model.clone().unwrap_or(defaults.model.clone()),
            base_url: self.judge_base_url.clone().unwrap_or(defaults.base_url.clone()),
            ..defaults
        }
    }

    pub fn extraction_config(&self) -> ExtractionConfig {
        ExtractionConfig {
            sample_interval: Duration::from_millis(self.sample_interval_ms),
            max_frames: self.max_frames,
            frames_root: self.frames_dir.clone(),
            ..Default::default()
        }
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            worker_pool_size: self.worker_pool_size,
            ..Default::default()
        }
    }
}

fn parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .with_context(|| format!("{} must be a number", key)),
        Err(_) => Ok(default),
    }
}
