use crate::config::{Overrides, Settings, load_feed_config};
use crate::fetch::cache::ResponseCache;
use crate::fetch::transport::HttpTransport;
use crate::fetch::{Endpoint, RateLimitedFetcher, RequestParams, season_strings};
use crate::output::ndjson;
use crate::pipeline::{PipelineOptions, listed_games, play_by_play};
use anyhow::{Context, Result, bail};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "playfeed", version)]
#[command(
    about = "Fetch and normalize basketball play-by-play",
    long_about = "playfeed fetches per-game action data from the stats API through a throttled, cached client and emits one normalized, typed event per action as NDJSON."
)]
#[command(arg_required_else_help = true)]
#[command(after_long_help = "Examples:
  playfeed pbp 0022300061 0022300062 > events.ndjson
  playfeed pbp 0022300061 --output events.ndjson --delay-ms 1000
  playfeed seasons --from 2019 --to 2023
  playfeed cache-stats
  playfeed completion zsh > ~/.zsh/completions/_playfeed")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args, Debug, Clone)]
struct FetchArgs {
    #[arg(
        long,
        value_name = "MS",
        help = "Minimum delay between network requests (default: 600)"
    )]
    delay_ms: Option<u64>,
    #[arg(
        long,
        value_name = "PATH",
        help = "Path to response cache (default: $XDG_CACHE_HOME/playfeed/http_cache.sqlite)"
    )]
    cache: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Normalize play-by-play for one or more games")]
    #[command(arg_required_else_help = true)]
    Pbp {
        #[arg(value_name = "GAME_ID", required = true, help = "Game identifiers")]
        game_ids: Vec<String>,
        #[arg(long, value_name = "N", help = "Stop after N games have been normalized")]
        limit: Option<usize>,
        #[arg(long, value_name = "PATH", help = "Write NDJSON events to file instead of stdout (replaces existing content)")]
        output: Option<PathBuf>,
        #[arg(
            long,
            value_name = "VERSION",
            value_parser = clap::value_parser!(u8).range(2..=3),
            help = "Play-by-play schema version to read actions from"
        )]
        endpoint_version: Option<u8>,
        #[arg(long, help = "Do not join player slots from the tabular endpoint")]
        no_slots: bool,
        #[command(flatten)]
        fetch: FetchArgs,
    },
    #[command(about = "Fetch game listings for a range of seasons into the cache")]
    Seasons {
        #[arg(long, value_name = "YEAR", default_value_t = 1996)]
        from: u16,
        #[arg(long, value_name = "YEAR")]
        to: u16,
        #[command(flatten)]
        fetch: FetchArgs,
    },
    #[command(about = "Show cached response counts per endpoint")]
    CacheStats {
        #[arg(long, value_name = "PATH", help = "Path to response cache")]
        cache: Option<PathBuf>,
    },
    #[command(about = "Generate shell completion script")]
    #[command(arg_required_else_help = true)]
    Completion {
        #[arg(value_enum, value_name = "SHELL", help = "Target shell")]
        shell: Shell,
    },
    #[command(about = "Generate a man page")]
    Man {
        #[arg(
            long,
            value_name = "PATH",
            help = "Write man page to file (stdout when omitted)"
        )]
        output: Option<PathBuf>,
    },
}

fn settings(overrides: Overrides) -> Result<Settings> {
    let cwd = std::env::current_dir().context("resolve working directory")?;
    let file = load_feed_config(&cwd)?;
    Settings::resolve(file.as_ref(), &overrides)
}

fn fetcher(settings: &Settings) -> Result<RateLimitedFetcher<HttpTransport>> {
    let cache = ResponseCache::open(&settings.cache_path)?;
    let transport = HttpTransport::new(&settings.base_url, settings.timeout)?;
    Ok(RateLimitedFetcher::new(cache, transport, settings.delay))
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Pbp {
            game_ids,
            limit,
            output,
            endpoint_version,
            no_slots,
            fetch,
        } => {
            let settings = settings(Overrides {
                delay_ms: fetch.delay_ms,
                cache_path: fetch.cache,
                endpoint_version,
                no_slots,
            })?;
            let mut fetcher = fetcher(&settings)?;
            let options = PipelineOptions {
                endpoint: settings.endpoint,
                attach_slots: settings.attach_slots,
            };

            let requested = game_ids.len();
            let games = play_by_play(&mut fetcher, &game_ids, options)
                .take(limit.unwrap_or(usize::MAX));
            let mut out: Box<dyn Write> = match output.as_deref() {
                Some(path) => Box::new(ndjson::create_output(path)?),
                None => Box::new(io::stdout().lock()),
            };
            let (mut processed, mut written) = (0usize, 0usize);
            for game in games {
                processed += 1;
                written += ndjson::write_events(&mut out, &game.events)?;
            }
            out.flush()?;
            info!(requested, processed, events = written, "done");
            Ok(())
        }
        Commands::Seasons { from, to, fetch } => {
            if to < from {
                bail!("--to ({to}) must not be before --from ({from})");
            }
            let settings = settings(Overrides {
                delay_ms: fetch.delay_ms,
                cache_path: fetch.cache,
                ..Overrides::default()
            })?;
            let mut fetcher = fetcher(&settings)?;
            let seasons = season_strings(from, to);
            let params = seasons.iter().map(|s| RequestParams::season(s));
            for doc in fetcher.requests(Endpoint::LeagueGameFinder, params) {
                let season = doc.params.get("Season").unwrap_or_default();
                let rows = listed_games(&doc.body).unwrap_or(0);
                println!("{season}\t{rows}\t{}", if doc.from_cache { "cached" } else { "fetched" });
            }
            Ok(())
        }
        Commands::CacheStats { cache } => {
            let settings = settings(Overrides {
                cache_path: cache,
                ..Overrides::default()
            })?;
            let cache = ResponseCache::open(&settings.cache_path)?;
            println!("cache: {}", settings.cache_path.display());
            for row in cache.counts_by_endpoint()? {
                println!("{}\t{}", row.endpoint, row.entries);
            }
            Ok(())
        }
        Commands::Completion { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            clap_complete::generate(shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
        Commands::Man { output } => {
            let man = clap_mangen::Man::new(Cli::command());
            match output {
                Some(path) => {
                    let mut bytes = Vec::new();
                    man.render(&mut bytes)?;
                    fs::write(path, bytes)?;
                }
                None => {
                    man.render(&mut io::stdout())?;
                }
            }
            Ok(())
        }
    }
}
