use clap::{Parser, Subcommand};
use pinwall::config::{self, CONFIG_FILENAME, GalleryConfig};
use pinwall::emit::{self, JsonSink, ModuleSink, Sink};
use pinwall::layout::{Breakpoints, ColumnLayout};
use pinwall::loader::{self, ManifestLoader};
use pinwall::manifest::Manifest;
use pinwall::probe::{RuntimeScanner, RuntimeWatch};
use pinwall::types::{Gallery, GalleryImage, GallerySource};
use pinwall::{output, scan, watch};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser)]
#[command(name = "pinwall")]
#[command(about = "Folder-driven image gallery manifests")]
#[command(long_about = "\
Folder-driven image gallery manifests

Every folder under the images root is an album; the images inside it are the
album's images. pinwall scans that tree into a versioned manifest, publishes it
as a JSON file and an importable ES module, keeps both in sync while you work,
and can rediscover albums over HTTP when no manifest is available.

Images layout:

  public/images/
  ├── manifest.json          # Written by pinwall
  ├── nature/                # Album \"Nature\"
  │   ├── a.png              # Image \"A\" → /images/nature/a.png
  │   └── b.jpg
  └── city-lights/           # Album \"City Lights\"
      └── night_sky.webp     # Image \"Night Sky\"

Supported extensions: jpg jpeg png gif webp svg (any case).

Run 'pinwall gen-config' to generate a documented pinwall.toml.")]
#[command(version)]
struct Cli {
    /// Config file
    #[arg(long, default_value = CONFIG_FILENAME, global = true)]
    config: PathBuf,

    /// Images root (overrides images_dir)
    #[arg(long, global = true)]
    images_dir: Option<PathBuf>,

    /// Generated module path (overrides output_file)
    #[arg(long, global = true)]
    output_file: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan the images root and publish the manifest
    Generate {
        /// Create the images root if it does not exist
        #[arg(long)]
        create_root: bool,
    },
    /// Publish once, then republish whenever images are added or removed
    Watch,
    /// Discover albums over HTTP by probing common filenames
    Probe {
        /// Albums to probe (default: probe.albums, else the built-in list)
        albums: Vec<String>,
        /// Keep rescanning every runtime.poll_interval_secs
        #[arg(long)]
        poll: bool,
    },
    /// Load the gallery the way a client does: manifest first, probing second
    Load {
        /// Fetch manifest.json over HTTP instead of reading the module
        /// (default URL: <probe.base_url>/<public_path>/manifest.json)
        #[arg(long, value_name = "URL", num_args = 0..=1)]
        json_url: Option<Option<String>>,
        /// Skip the manifest and probe
        #[arg(long)]
        refresh: bool,
    },
    /// Show how an album is split into columns at a container width
    Layout {
        /// Container width in pixels
        #[arg(long)]
        width: u32,
        /// Album id (default: first album)
        #[arg(long)]
        album: Option<String>,
        /// Only images whose title contains this text
        #[arg(long)]
        search: Option<String>,
    },
    /// Print a stock pinwall.toml with all options documented
    GenConfig,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let Cli {
        config: config_path,
        images_dir,
        output_file,
        log_level,
        command,
    } = Cli::parse();
    init_logging(&log_level);
    let load_config = || resolve_config(&config_path, images_dir.as_ref(), output_file.as_ref());

    match command {
        Command::Generate { create_root } => {
            let config = load_config()?;
            if create_root && !config.images_dir.exists() {
                std::fs::create_dir_all(&config.images_dir)?;
                tracing::info!(path = %config.images_dir.display(), "created images root");
            }
            let manifest = Manifest::build(
                scan::scan(&config.images_dir)?,
                &config.public_path,
                chrono::Utc::now(),
            );
            let json = JsonSink::in_images_dir(&config.images_dir);
            let module = ModuleSink::new(&config.output_file);
            let report = emit::publish(&manifest, &[&json as &dyn Sink, &module])?;
            output::print_generate_output(&manifest, &report);
        }
        Command::Watch => {
            let config = load_config()?;
            let on_reload = |manifest: &Manifest, _: &emit::PublishReport| {
                output::print_reload(manifest);
            };
            let handle = watch::start(watch::WatchOptions::from(&config), on_reload)?;
            output::print_generate_output(handle.initial_manifest(), handle.initial_report());
            if handle.is_watching() {
                tokio::signal::ctrl_c().await?;
            }
            handle.stop().await;
        }
        Command::Probe { albums, poll } => {
            let config = load_config()?;
            let scanner = RuntimeScanner::from_config(&config)?;
            let found = Gallery {
                source: GallerySource::Fallback,
                albums: scanner.scan(&albums).await,
            };
            output::print_gallery(&found);
            if poll {
                let scanner = RuntimeScanner::from_config(&config)?.with_candidates(albums);
                let interval = Duration::from_secs(config.runtime.poll_interval_secs);
                let watch = RuntimeWatch::start_after(scanner, interval, &found.albums, |albums| {
                    output::print_gallery(&Gallery {
                        source: GallerySource::Fallback,
                        albums,
                    });
                });
                tokio::signal::ctrl_c().await?;
                watch.stop().await;
            }
        }
        Command::Load { json_url, refresh } => {
            let config = load_config()?;
            let url = json_url.map(|url| {
                url.unwrap_or_else(|| {
                    loader::manifest_url(&config.probe.base_url, &config.public_path)
                })
            });
            let gallery_loader = ManifestLoader::from_config(&config, url.as_deref())?;
            let gallery = if refresh {
                gallery_loader.refresh().await?
            } else {
                gallery_loader.load().await?
            };
            output::print_gallery(&gallery);
        }
        Command::Layout {
            width,
            album,
            search,
        } => {
            let config = load_config()?;
            let gallery = ManifestLoader::from_config(&config, None)?.load().await?;
            let selected = match &album {
                Some(id) => gallery
                    .album(id)
                    .ok_or_else(|| format!("album '{id}' not found"))?,
                None => gallery.albums.first().ok_or("gallery has no albums")?,
            };
            let images: Vec<&GalleryImage> = selected.search(search.as_deref().unwrap_or(""));
            let layout = ColumnLayout::new(Breakpoints::from(&config.layout), width);
            output::print_layout(&selected.name, width, &layout.columns(&images));
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Install the stderr subscriber. `RUST_LOG` wins over `--log-level`.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);
    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .init();
}

/// Config file merged over stock defaults, then command-line overrides.
fn resolve_config(
    path: &Path,
    images_dir: Option<&PathBuf>,
    output_file: Option<&PathBuf>,
) -> Result<GalleryConfig, config::ConfigError> {
    let mut config = config::load_config(path)?;
    if let Some(dir) = images_dir {
        config.images_dir = dir.clone();
    }
    if let Some(file) = output_file {
        config.output_file = file.clone();
    }
    config.validate()?;
    Ok(config)
}
