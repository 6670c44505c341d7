//! CLI parsing and orchestration. Lists a fiction's chunks or compiles one chunk to text,
//! plain text or HTML.
//! Maps errors to exit codes.

use crate::cache::SqliteCache;
use crate::config::{self, Config};
use crate::error::{Error, Stage};
use crate::model::{ChapterIndex, CompileMode};
use crate::orchestrator::{ChapterProgress, Orchestrator};
use crate::scraper::royalroad::parse_fiction_id;
use crate::scraper::{Pacer, PoliteClient};
use clap::{Parser, Subcommand};
use std::cell::RefCell;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const DEFAULT_DELAY_SECS: u64 = 2;
const DEFAULT_JITTER_SECS: u64 = 2;
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// CLI error carrying exit code and message.
#[derive(Debug, Error)]
pub enum CliRunError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Pipeline(#[from] Error),

    #[error("Cannot write output {}: {source}", path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CliRunError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliRunError::InvalidInput(_) => 1,
            CliRunError::Pipeline(e) if e.stage() == Stage::ResolveUrl => 1,
            CliRunError::Pipeline(_) => 2,
            CliRunError::Output { .. } => 3,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "rrchunk")]
#[command(about = "Cache a Royal Road fiction and compile 10-chapter chunks to text or HTML")]
#[command(
    after_help = "Config file keys (cache_path, user_agent, request_delay_secs, request_jitter_secs, timeout_secs) are read from ./rrchunk.toml or the user config dir. CLI flags override config. RRCHUNK_CACHE_DB overrides cache_path."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// SQLite cache file (overrides RRCHUNK_CACHE_DB and config).
    #[arg(long, global = true)]
    pub cache: Option<PathBuf>,

    /// HTTP User-Agent (overrides config).
    #[arg(long, global = true)]
    pub user_agent: Option<String>,

    /// Minimum delay between requests in seconds (overrides config; default 2).
    #[arg(long, global = true)]
    pub delay: Option<u64>,

    /// Maximum random extra delay per request in seconds (overrides config; default 2).
    #[arg(long, global = true)]
    pub jitter: Option<u64>,

    /// Request timeout in seconds (overrides config; default 30).
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Suppress progress output (errors only).
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Print verbose error chain and debug logs.
    #[arg(long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch (or load from cache) the chapter index and list its chunks.
    Chunks {
        /// Royal Road fiction URL, e.g. https://www.royalroad.com/fiction/21220/mother-of-learning
        url: String,

        /// Re-fetch the index even when it is cached.
        #[arg(long)]
        refresh: bool,
    },

    /// Compile one chunk of a fiction.
    Compile {
        /// Royal Road fiction URL, or `id/slug`.
        fiction: String,

        /// 0-based chunk number (see `chunks`).
        #[arg(long)]
        chunk: usize,

        /// Output mode: text (escaped, bracket runs bolded), plain (raw text for .txt files), or html.
        #[arg(long, default_value = "text", value_parser = parse_mode)]
        mode: CompileMode,

        /// Output path. Default: stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

impl Args {
    /// Log filter used when RUST_LOG is not set.
    pub fn log_filter(&self) -> &'static str {
        if self.verbose {
            "rrchunk=debug"
        } else if self.quiet {
            "error"
        } else {
            "warn"
        }
    }
}

fn parse_mode(s: &str) -> Result<CompileMode, String> {
    match s.to_lowercase().as_str() {
        "text" | "txt" => Ok(CompileMode::Text),
        "plain" => Ok(CompileMode::Plain),
        "html" => Ok(CompileMode::Html),
        _ => Err(format!(
            "Invalid --mode value: '{}'. Use text, plain, or html.",
            s
        )),
    }
}

/// Effective runtime settings after merging flags, environment and config.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Settings {
    cache_path: PathBuf,
    user_agent: Option<String>,
    delay_secs: u64,
    jitter_secs: u64,
    timeout_secs: u64,
}

fn resolve_settings(args: &Args, env_cache: Option<String>, config: Option<&Config>) -> Settings {
    Settings {
        cache_path: config::resolve_cache_path(args.cache.clone(), env_cache, config),
        user_agent: args
            .user_agent
            .clone()
            .or_else(|| config.and_then(|c| c.user_agent.clone())),
        delay_secs: args
            .delay
            .or_else(|| config.and_then(|c| c.request_delay_secs))
            .unwrap_or(DEFAULT_DELAY_SECS),
        jitter_secs: args
            .jitter
            .or_else(|| config.and_then(|c| c.request_jitter_secs))
            .unwrap_or(DEFAULT_JITTER_SECS),
        timeout_secs: args
            .timeout
            .or_else(|| config.and_then(|c| c.timeout_secs))
            .unwrap_or(DEFAULT_TIMEOUT_SECS),
    }
}

/// Ensure output path parent exists.
fn validate_output_path(path: &Path) -> Result<(), CliRunError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            return Err(CliRunError::InvalidInput(format!(
                "Cannot write output: {}: parent directory does not exist.",
                path.display()
            )));
        }
    }
    Ok(())
}

/// One line per chunk: number, 1-based chapter range, first and last titles.
fn format_chunk_listing(index: &ChapterIndex) -> String {
    let chunks = crate::model::list_chunks(index);
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Fiction {}: {} chapters in {} chunk(s)",
        index.fiction,
        index.chapters.len(),
        chunks.len()
    );
    for chunk in &chunks {
        let chapters = &index.chapters[chunk.start..chunk.end];
        let first = chapters.first().map(|c| c.title.as_str()).unwrap_or("");
        let last = chapters.last().map(|c| c.title.as_str()).unwrap_or("");
        let _ = writeln!(
            out,
            "{:>4}  chapters {}-{}  {} .. {}",
            chunk.index,
            chunk.start + 1,
            chunk.end,
            first,
            last
        );
    }
    out
}

fn progress_style() -> Option<indicatif::ProgressStyle> {
    indicatif::ProgressStyle::default_bar()
        .template("{spinner} {msg} [{bar:40}] {pos}/{len} ({elapsed})")
        .ok()
        .map(|style| {
            style
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
                .progress_chars("█▉▊▋▌▍▎▏ ")
        })
}

/// Entry point for the CLI. Returns Ok(()) on success; Err with exit code and message on failure.
pub fn run(args: &Args) -> Result<(), CliRunError> {
    let config = config::load_config().map_err(CliRunError::InvalidInput)?;
    let settings = resolve_settings(
        args,
        std::env::var(config::CACHE_ENV_VAR).ok(),
        config.as_ref(),
    );
    tracing::debug!(?settings, "resolved settings");

    let mut builder = PoliteClient::builder().timeout_secs(settings.timeout_secs);
    if let Some(ua) = settings.user_agent.clone() {
        builder = builder.user_agent(ua);
    }
    let client = builder
        .build()
        .map_err(|e| CliRunError::InvalidInput(format!("Failed to create HTTP client: {}", e)))?;

    let cache = SqliteCache::open(&settings.cache_path).map_err(|source| Error::Cache {
        stage: Stage::CacheRead,
        key: settings.cache_path.display().to_string(),
        source,
    })?;

    let pacer = Pacer::new(
        Duration::from_secs(settings.delay_secs),
        Duration::from_secs(settings.jitter_secs),
    );
    let orchestrator = Orchestrator::new(client, cache, pacer);

    match &args.command {
        Command::Chunks { url, refresh } => {
            let index = if *refresh {
                orchestrator.refresh_index(url)?
            } else {
                orchestrator.resolve_index(url)?
            };
            print!("{}", format_chunk_listing(&index));
            Ok(())
        }
        Command::Compile {
            fiction,
            chunk,
            mode,
            output,
        } => {
            let fiction = parse_fiction_id(fiction).map_err(|e| {
                CliRunError::InvalidInput(format!(
                    "Expected a fiction URL or id/slug. Example: https://www.royalroad.com/fiction/12345/... Invalid: {}",
                    e
                ))
            })?;
            if let Some(path) = output {
                validate_output_path(path)?;
            }

            let progress_state: RefCell<Option<indicatif::ProgressBar>> = RefCell::new(None);
            let progress_cb = |p: &ChapterProgress| {
                let mut state = progress_state.borrow_mut();
                let pb = state.get_or_insert_with(|| {
                    let bar = indicatif::ProgressBar::new(p.total as u64);
                    if let Some(style) = progress_style() {
                        bar.set_style(style);
                    }
                    bar.enable_steady_tick(Duration::from_millis(80));
                    bar
                });
                pb.set_position(p.position as u64);
                let source = if p.cached { "cached" } else { "fetched" };
                pb.set_message(format!("Chapter {}/{} ({})", p.position, p.total, source));
            };
            let progress: Option<&dyn Fn(&ChapterProgress)> =
                if args.quiet { None } else { Some(&progress_cb) };

            let result =
                orchestrator.compile_chunk_with_progress(&fiction, *chunk, *mode, progress);
            if let Some(pb) = progress_state.borrow_mut().take() {
                pb.disable_steady_tick();
                pb.finish_and_clear();
            }
            let document = result?;

            match output {
                Some(path) => {
                    std::fs::write(path, document.to_string()).map_err(|source| {
                        CliRunError::Output {
                            path: path.clone(),
                            source,
                        }
                    })?;
                    if !args.quiet {
                        match document.title_range() {
                            Some((first, last)) => eprintln!(
                                "Wrote {} ({} .. {})",
                                path.display(),
                                first,
                                last
                            ),
                            None => eprintln!("Wrote {}", path.display()),
                        }
                    }
                }
                None => print!("{}", document),
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ChapterDescriptor, FictionId};
    use crate::scraper::{FetchError, ParseError};

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["rrchunk"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn parse_mode_all() {
        assert_eq!(parse_mode("text").unwrap(), CompileMode::Text);
        assert_eq!(parse_mode("txt").unwrap(), CompileMode::Text);
        assert_eq!(parse_mode("HTML").unwrap(), CompileMode::Html);
        assert_eq!(parse_mode("plain").unwrap(), CompileMode::Plain);
        assert!(parse_mode("pdf").is_err());
    }

    #[test]
    fn compile_subcommand_parses() {
        let a = args(&[
            "compile",
            "21220/mother-of-learning",
            "--chunk",
            "3",
            "--mode",
            "html",
            "-o",
            "out.html",
            "--delay",
            "5",
        ]);
        match a.command {
            Command::Compile {
                fiction,
                chunk,
                mode,
                output,
            } => {
                assert_eq!(fiction, "21220/mother-of-learning");
                assert_eq!(chunk, 3);
                assert_eq!(mode, CompileMode::Html);
                assert_eq!(output, Some(PathBuf::from("out.html")));
            }
            other => panic!("expected compile, got {:?}", other),
        }
        assert_eq!(a.delay, Some(5));
    }

    #[test]
    fn compile_mode_defaults_to_text() {
        let a = args(&["compile", "1/x", "--chunk", "0"]);
        assert!(matches!(
            a.command,
            Command::Compile {
                mode: CompileMode::Text,
                ..
            }
        ));
    }

    #[test]
    fn chunks_subcommand_parses_refresh() {
        let a = args(&["--quiet", "chunks", "https://www.royalroad.com/fiction/1/x", "--refresh"]);
        assert!(matches!(a.command, Command::Chunks { refresh: true, .. }));
        assert!(a.quiet);
        assert_eq!(a.log_filter(), "error");
    }

    #[test]
    fn missing_chunk_is_rejected() {
        assert!(Args::try_parse_from(["rrchunk", "compile", "1/x"]).is_err());
    }

    #[test]
    fn log_filter_levels() {
        assert_eq!(args(&["chunks", "1/x"]).log_filter(), "warn");
        assert_eq!(args(&["chunks", "1/x", "--verbose"]).log_filter(), "rrchunk=debug");
    }

    #[test]
    fn settings_merge_flags_over_config() {
        let config = Config {
            cache_path: Some(PathBuf::from("config.sqlite")),
            user_agent: Some("Config/1.0".to_string()),
            request_delay_secs: Some(7),
            request_jitter_secs: Some(3),
            timeout_secs: Some(90),
        };
        let a = args(&["--delay", "1", "--user-agent", "Flag/1.0", "chunks", "1/x"]);
        let s = resolve_settings(&a, None, Some(&config));
        assert_eq!(
            s,
            Settings {
                cache_path: PathBuf::from("config.sqlite"),
                user_agent: Some("Flag/1.0".to_string()),
                delay_secs: 1,
                jitter_secs: 3,
                timeout_secs: 90,
            }
        );
    }

    #[test]
    fn settings_defaults() {
        let s = resolve_settings(&args(&["chunks", "1/x"]), None, None);
        assert_eq!(s.delay_secs, DEFAULT_DELAY_SECS);
        assert_eq!(s.jitter_secs, DEFAULT_JITTER_SECS);
        assert_eq!(s.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(s.user_agent, None);
        assert_eq!(s.cache_path, config::default_cache_path());
    }

    #[test]
    fn settings_env_cache_path() {
        let a = args(&["chunks", "1/x"]);
        let s = resolve_settings(&a, Some("/tmp/env.sqlite".to_string()), None);
        assert_eq!(s.cache_path, PathBuf::from("/tmp/env.sqlite"));
    }

    #[test]
    fn chunk_listing_shows_ranges_and_titles() {
        let chapters = (1..=12u64)
            .map(|i| ChapterDescriptor {
                id: i,
                title: format!("Ch {}", i),
                url: format!("https://www.royalroad.com/fiction/9/s/chapter/{}/c", i),
            })
            .collect();
        let index = ChapterIndex {
            fiction: FictionId::new(9, Some("s".to_string())),
            source_url: "https://www.royalroad.com/fiction/9/s".to_string(),
            fetched_at: chrono::Utc::now(),
            chapters,
        };
        let listing = format_chunk_listing(&index);
        let lines: Vec<&str> = listing.lines().collect();
        assert_eq!(lines[0], "Fiction 9/s: 12 chapters in 2 chunk(s)");
        assert_eq!(lines[1], "   0  chapters 1-10  Ch 1 .. Ch 10");
        assert_eq!(lines[2], "   1  chapters 11-12  Ch 11 .. Ch 12");
    }

    #[test]
    fn validate_output_path_parent_exists() {
        let path = std::env::temp_dir().join("rrchunk_cli_test_output.txt");
        assert!(validate_output_path(&path).is_ok());
    }

    #[test]
    fn validate_output_path_parent_missing() {
        let path = PathBuf::from("/nonexistent_dir_rrchunk_xyz/output.txt");
        let result = validate_output_path(&path);
        assert!(result.is_err());
        if let Err(CliRunError::InvalidInput(msg)) = result {
            assert!(msg.contains("parent directory does not exist"));
        }
    }

    #[test]
    fn cli_run_error_exit_codes() {
        assert_eq!(CliRunError::InvalidInput("x".into()).exit_code(), 1);
        let bad_url = Error::InvalidFictionUrl(ParseError::InvalidFictionUrl {
            input: "x".into(),
            reason: "not a URL".into(),
        });
        assert_eq!(CliRunError::Pipeline(bad_url).exit_code(), 1);
        let fetch = Error::IndexFetch {
            fiction: FictionId::new(1, None),
            source: FetchError::Timeout {
                url: "https://www.royalroad.com/fiction/1".into(),
            },
        };
        assert_eq!(CliRunError::Pipeline(fetch).exit_code(), 2);
        let output = CliRunError::Output {
            path: PathBuf::from("out.txt"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(output.exit_code(), 3);
    }
}
