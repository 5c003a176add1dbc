use std::{
    fs,
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use markdown_prerender_config::Config;
use markdown_prerender_engine::{
    CallerId, HighlightCache, HighlightCacheConfig, HighlightOutcome, Lookup, MarkdownParser,
    SyntectColorizer,
    highlight::segments,
    parse, parse_block_ranges,
    parsing::snapshot::{outline, violations},
};

#[derive(Parser)]
#[command(name = "markdown-prerender")]
#[command(about = "Preprocess markdown for rendering and highlight its code blocks")]
struct Cli {
    /// Config file (defaults to ~/.config/markdown-prerender/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the outline of the final tree and the math table
    Parse {
        file: PathBuf,
        /// Skip normalization and show the block parser's own nesting
        #[arg(long)]
        raw: bool,
    },
    /// Print the byte range of every top-level block
    Ranges { file: PathBuf },
    /// Colorize a source file
    Highlight {
        file: PathBuf,
        /// Language token or extension (defaults to the file extension)
        #[arg(short, long)]
        language: Option<String>,
        #[arg(short, long)]
        theme: Option<String>,
        /// Print spans instead of colored text
        #[arg(long)]
        spans: bool,
    },
    /// Replay a document as growing prefixes, re-parsing and highlighting each frame
    Stream {
        file: PathBuf,
        /// Characters added per frame
        #[arg(short, long)]
        step: Option<usize>,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(Config::config_path);
    let config = Config::load_or_default(&config_path)?;
    log::debug!("Using config from {}", config_path.display());

    match cli.command {
        Command::Parse { file, raw } => run_parse(&read(&file)?, raw),
        Command::Ranges { file } => run_ranges(&read(&file)?),
        Command::Highlight {
            file,
            language,
            theme,
            spans,
        } => {
            let language = language
                .or_else(|| extension(&file))
                .unwrap_or_else(|| "text".to_string());
            let theme = theme.unwrap_or_else(|| config.highlight.theme.clone());
            run_highlight(&config, &read(&file)?, &language, &theme, spans)
        }
        Command::Stream { file, step } => {
            let step = step.unwrap_or(config.stream.step).max(1);
            run_stream(&config, &read(&file)?, step)
        }
    }
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn extension(path: &Path) -> Option<String> {
    path.extension().map(|ext| ext.to_string_lossy().into_owned())
}

fn build_cache(config: &Config) -> Result<HighlightCache> {
    let colorizer = match &config.highlight.theme_dir {
        Some(dir) => SyntectColorizer::with_theme_folder(dir)?,
        None => SyntectColorizer::new(),
    };
    let cache_config = HighlightCacheConfig {
        ceiling: config.highlight.cache_ceiling,
        prefix_length: config.highlight.prefix_length,
    };
    HighlightCache::new(cache_config, colorizer).context("Failed to start highlight worker")
}

fn run_parse(markdown: &str, raw: bool) -> Result<()> {
    let result = MarkdownParser::new().with_normalize(!raw).parse(markdown);
    print!("{}", outline(&result.document));

    if !result.math.is_empty() {
        println!();
        println!("math:");
        for (index, entry) in result.math.iter() {
            println!("  #{index}: {:?}", entry.source);
        }
    }

    let found = violations(&result.document, &result.math);
    if !found.is_empty() {
        println!();
        println!("structure:");
        for violation in found {
            println!("  {violation}");
        }
    }
    Ok(())
}

fn run_ranges(markdown: &str) -> Result<()> {
    for block in parse_block_ranges(markdown) {
        println!(
            "{:>6}..{:<6} {:?}",
            block.range.start, block.range.end, block.kind
        );
    }
    Ok(())
}

fn run_highlight(
    config: &Config,
    content: &str,
    language: &str,
    theme: &str,
    spans: bool,
) -> Result<()> {
    let cache = build_cache(config)?;
    let (tx, rx) = std::sync::mpsc::channel();
    let submission = cache.submit(content, language, CallerId(0), theme, move |outcome| {
        let _ = tx.send(outcome);
    });
    let outcome = match submission.lookup {
        Lookup::Full(map) => HighlightOutcome::Success(map),
        _ => rx.recv().context("Highlight worker stopped")?,
    };
    let map = match outcome {
        HighlightOutcome::Success(map) => map,
        HighlightOutcome::Error(err) => return Err(err.into()),
        HighlightOutcome::Cancelled => anyhow::bail!("Highlight request was cancelled"),
    };

    if spans {
        for span in &map {
            println!(
                "{:>6}..{:<6} {} {:?}",
                span.range.start,
                span.range.end,
                span.color,
                &content[span.range.clone()]
            );
        }
        return Ok(());
    }

    let mut out = String::with_capacity(content.len() * 2);
    for (text, color) in segments(&map, content) {
        match color {
            Some(c) => out.push_str(&format!("\x1b[38;2;{};{};{}m{text}\x1b[0m", c.r, c.g, c.b)),
            None => out.push_str(text),
        }
    }
    print!("{out}");
    Ok(())
}

#[derive(Default)]
struct StreamCounters {
    success: AtomicUsize,
    cancelled: AtomicUsize,
    error: AtomicUsize,
}

fn run_stream(config: &Config, markdown: &str, step: usize) -> Result<()> {
    let cache = build_cache(config)?;
    let counters = Arc::new(StreamCounters::default());
    let theme = config.highlight.theme.as_str();
    let (mut full, mut prefix, mut none) = (0usize, 0usize, 0usize);

    let mut boundaries: Vec<usize> = markdown
        .char_indices()
        .map(|(i, _)| i)
        .skip(step)
        .step_by(step)
        .collect();
    boundaries.push(markdown.len());

    for (frame, end) in boundaries.iter().enumerate() {
        let result = parse(&markdown[..*end]);
        for (ordinal, block) in result.code_blocks().into_iter().enumerate() {
            let counters = Arc::clone(&counters);
            let submission = cache.submit(
                block.content,
                block.language.unwrap_or("text"),
                CallerId(ordinal as u64),
                theme,
                move |outcome| {
                    let counter = match outcome {
                        HighlightOutcome::Success(_) => &counters.success,
                        HighlightOutcome::Cancelled => &counters.cancelled,
                        HighlightOutcome::Error(_) => &counters.error,
                    };
                    counter.fetch_add(1, Ordering::Relaxed);
                },
            );
            log::debug!(
                "frame {frame}: code block {ordinal} ({} bytes) -> {} lookup, {} spans ready",
                block.content.len(),
                submission.lookup.kind_name(),
                submission.lookup.map().map_or(0, Vec::len)
            );
            match submission.lookup {
                Lookup::Full(_) => full += 1,
                Lookup::Prefix(_) => prefix += 1,
                Lookup::None => none += 1,
            }
        }
    }
    cache.wait_idle();

    println!("frames:          {}", boundaries.len());
    println!("lookups:         {full} full, {prefix} prefix, {none} none");
    println!(
        "outcomes:        {} success, {} cancelled, {} error",
        counters.success.load(Ordering::Relaxed),
        counters.cancelled.load(Ordering::Relaxed),
        counters.error.load(Ordering::Relaxed)
    );
    println!("cached maps:     {}", cache.len());
    Ok(())
}
