use clap::{Parser, Subcommand};
use pressroom::config::{BuildMode, EngineConfig, FileConfig};
use pressroom::content::{
    ContentController, ContentEntry, ContentItem, ContentMap, MarkdownController, StaticFileEntry,
    StaticFileMap,
};
use pressroom::engine::{BuildContext, CancelFlag, walk_source_files};
use pressroom::formatter::ContentFormatter;
use pressroom::formatters::{AssetLinkFormatter, HeadingAnchorFormatter};
use pressroom::processor::ProcessorRegistry;
use pressroom::processors::{CopyProcessor, ThumbnailProcessor};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Release builds report the crate version; dev builds report the short
/// git hash. One small string leaked for the process lifetime.
fn version_string() -> &'static str {
    if env!("ON_RELEASE_TAG") == "true" {
        return env!("CARGO_PKG_VERSION");
    }
    match env!("GIT_HASH") {
        "" => "dev@unknown",
        hash => Box::leak(format!("dev@{hash}").into_boxed_str()),
    }
}

#[derive(Parser)]
#[command(name = "pressroom")]
#[command(about = "Incremental build engine for static content")]
#[command(long_about = "\
Incremental build engine for static content

Your filesystem is the data source. Markdown files become rendered pages,
images get copied alongside a downscaled thumbnail, and everything else is
mirrored verbatim. Repeated builds only touch what changed: a source is
rebuilt when its outputs are missing or older than it, and nothing else.

Content structure:

  content/
  ├── pressroom.toml       # Engine config (optional)
  ├── posts/
  │   └── hello.md         # → build/posts/hello/index.html
  ├── images/
  │   └── a.png            # → build/images/a.png + a.thumb.png
  └── css/
      └── site.css         # → build/css/site.css (copied verbatim)

Rendered pages pass through the formatter chain (heading anchors, asset
link rewriting) before being written. Outputs are temp-written and renamed,
so a serving process never sees a half-written file.")]
#[command(version = version_string())]
struct Cli {
    /// Content directory
    #[arg(long, default_value = "content", global = true)]
    content: PathBuf,

    /// Output directory
    #[arg(long, default_value = "build", global = true)]
    out: PathBuf,

    /// Max concurrent per-path pipelines (default: CPU count, capped at 8)
    #[arg(long, global = true)]
    concurrency: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the output tree, skipping anything already fresh
    Build {
        /// Build mode: export gates content on timestamps, live always re-renders
        #[arg(long, value_enum, default_value = "export")]
        mode: BuildMode,
        /// Print the full report as JSON instead of a summary line
        #[arg(long)]
        json: bool,
    },
    /// Validate configuration and enumerate sources without building
    Check,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("pressroom=info")),
        )
        .init();

    let cli = Cli::parse();
    let file_config = FileConfig::load(&cli.content)?;

    let mut config = file_config.apply(EngineConfig::new(&cli.content, &cli.out));
    if let Some(n) = cli.concurrency {
        config = config.concurrency(n);
    }

    let mut registry = ProcessorRegistry::new();
    let thumb = match file_config.thumbnail_width {
        Some(width) => ThumbnailProcessor::with_width(width),
        None => ThumbnailProcessor::new(),
    };
    registry.register(Box::new(thumb))?;
    registry.register(Box::new(CopyProcessor::excluding(&["md"])))?;

    let content = collect_content(&cli.content)?;
    let static_files = collect_static_files(&registry, &cli.content, &content);

    match cli.command {
        Command::Build { mode, json } => {
            config = config.mode(mode);

            let formatters: Vec<Box<dyn ContentFormatter>> = vec![
                Box::new(HeadingAnchorFormatter),
                Box::new(AssetLinkFormatter::new()),
            ];
            let ctx = BuildContext::new(config, registry, formatters, content, static_files)?;

            let report = ctx.build_all(&CancelFlag::new()).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{report}");
                for (path, error) in report.failures() {
                    eprintln!("  {path}: {error}");
                }
            }
            if !report.is_clean() {
                std::process::exit(1);
            }
        }
        Command::Check => {
            config.validate()?;
            println!("==> Checking {}", cli.content.display());
            println!("Processors: {}", registry.names().join(", "));
            println!("Content items: {}", content.len());
            println!("Static files: {}", static_files.len());
            println!("==> Configuration is valid");
        }
    }

    Ok(())
}

/// Walk the content root for markdown sources and build the content map.
///
/// The logical path is the relative path minus the `.md` extension; the
/// title is the first `#` heading, falling back to the file stem.
fn collect_content(content_root: &Path) -> std::io::Result<ContentMap> {
    let mut content = ContentMap::new();
    let controller = Arc::new(MarkdownController);

    for entry in walk_source_files(content_root) {
        let Ok(rel) = entry.path().strip_prefix(content_root) else {
            continue;
        };
        if rel.extension().and_then(|e| e.to_str()) != Some("md") {
            continue;
        }

        let body = std::fs::read_to_string(entry.path())?;
        let last_updated = entry.metadata()?.modified()?;
        let logical = rel.with_extension("").to_string_lossy().into_owned();
        let title = body
            .lines()
            .find_map(|l| l.strip_prefix("# "))
            .map(|t| t.trim().to_string())
            .unwrap_or_else(|| {
                rel.file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| logical.clone())
            });

        content.insert(
            logical.clone(),
            ContentEntry {
                item: ContentItem {
                    path: logical,
                    title,
                    body,
                    last_updated,
                    source: Some(rel.to_path_buf()),
                },
                controller: Arc::clone(&controller) as Arc<dyn ContentController>,
            },
        );
    }
    Ok(content)
}

/// Resolve every static source path against the registry and record which
/// processor claims it. Formatters use this map to rewrite asset URLs.
fn collect_static_files(
    registry: &ProcessorRegistry,
    content_root: &Path,
    content: &ContentMap,
) -> StaticFileMap {
    let content_sources: std::collections::BTreeSet<PathBuf> = content
        .values()
        .filter_map(|e| e.item.source.clone())
        .collect();

    let mut map = StaticFileMap::new();
    for entry in walk_source_files(content_root) {
        let Ok(rel) = entry.path().strip_prefix(content_root) else {
            continue;
        };
        if rel == Path::new("pressroom.toml") || content_sources.contains(rel) {
            continue;
        }
        let rel_str = rel.to_string_lossy().into_owned();
        if let Some(processor) = registry.resolve(&rel_str) {
            map.insert(
                rel_str,
                StaticFileEntry {
                    processor: processor.name().to_string(),
                },
            );
        }
    }
    map
}
