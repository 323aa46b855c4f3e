use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use simscope::align::{AlignMode, YNormMode};
use simscope::config::ExplorerConfig;
use simscope::filter::{FilterPatch, TimeRange};
use simscope::models::{FileStatus, InstanceStatus};
use simscope::prefs::{align_key, JsonFilePreferences, MemoryPreferences, PreferenceStore};
use simscope::render::render_tree;
use simscope::{Explorer, Store};

#[derive(Parser)]
#[command(name = "simx")]
#[command(about = "Explore versioned simulation records from the command line")]
struct Cli {
    /// Data set to load (falls back to the configured dataset_path)
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    /// Config file (defaults to <config_dir>/simscope/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print the tree as JSON instead of text (other commands always print JSON)
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Default)]
struct FilterArgs {
    /// Case-insensitive search over names, descriptions, tags and types
    #[arg(long)]
    keyword: Option<String>,

    /// Keep records with this status (repeatable)
    #[arg(long = "status")]
    statuses: Vec<String>,

    /// Keep records owned or created by this user (repeatable)
    #[arg(long = "owner")]
    owners: Vec<String>,

    /// Keep records carrying this tag (repeatable)
    #[arg(long = "tag")]
    tags: Vec<String>,

    /// Time range: 7d, 30d, 90d or all
    #[arg(long)]
    range: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the category / instance / folder tree
    Tree {
        /// Only list categories and instances
        #[arg(long)]
        no_folders: bool,
    },
    /// List the filtered instances of a category
    Instances {
        category: String,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// List the filtered folders of an instance
    Folders {
        instance: String,
        #[arg(long)]
        version: Option<String>,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// List one page of a folder's filtered files
    Files {
        instance: String,
        folder: String,
        #[arg(long)]
        version: Option<String>,
        #[arg(long, default_value = "1")]
        page: usize,
        #[arg(long)]
        page_size: Option<usize>,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// KPI table for a set of conditions
    Kpi {
        instance: String,
        /// Comma-separated condition ids
        #[arg(long, value_delimiter = ',', required = true)]
        conditions: Vec<String>,
        #[arg(long)]
        baseline: Option<String>,
        #[arg(long)]
        version: Option<String>,
    },
    /// Aligned curve series for a set of conditions
    Align {
        instance: String,
        /// Comma-separated condition ids
        #[arg(long, value_delimiter = ',', required = true)]
        conditions: Vec<String>,
        #[arg(long)]
        baseline: Option<String>,
        /// original or normalizedX (remembered per instance)
        #[arg(long)]
        x_mode: Option<String>,
        /// none, delta or percent (remembered per instance)
        #[arg(long)]
        y_mode: Option<String>,
        #[arg(long)]
        version: Option<String>,
    },
    /// Show an instance's version history, oldest first
    Versions { instance: String },
}

/// Initialize tracing with output to stderr so stdout stays clean for JSON
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "simscope=info".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

impl FilterArgs {
    fn patch(&self) -> anyhow::Result<FilterPatch> {
        let time_range = match &self.range {
            Some(range) => match TimeRange::from_str(range) {
                Some(range) => Some(range),
                None => bail!("Unknown time range: {} (expected 7d, 30d, 90d or all)", range),
            },
            None => None,
        };
        for status in &self.statuses {
            let status = status.trim().to_lowercase();
            if FileStatus::from_str(&status).is_none() && InstanceStatus::from_str(&status).is_none() {
                bail!("Unknown status: {}", status);
            }
        }
        Ok(FilterPatch {
            statuses: Some(self.statuses.iter().cloned().collect()),
            owners: Some(self.owners.iter().cloned().collect()),
            tags: Some(self.tags.iter().cloned().collect()),
            time_range,
        })
    }

    fn apply(&self, explorer: &mut Explorer) -> anyhow::Result<()> {
        explorer.set_filters(self.patch()?);
        if let Some(keyword) = &self.keyword {
            explorer.set_search_keyword(keyword);
        }
        Ok(())
    }
}

/// Select `instance` (at `version` when given) and fail on unknown ids.
fn select(explorer: &mut Explorer, instance: &str, version: Option<&str>) -> anyhow::Result<()> {
    if let Some(version) = version {
        explorer.change_version(instance, version);
    }
    let state = explorer.select_instance(instance);
    if state.selection.instance_id() != Some(instance) {
        bail!("Unknown instance: {}", instance);
    }
    Ok(())
}

fn open_preferences(config: &ExplorerConfig) -> anyhow::Result<Box<dyn PreferenceStore>> {
    Ok(match &config.preferences_path {
        Some(path) => Box::new(JsonFilePreferences::open(path)?),
        None => Box::new(MemoryPreferences::new()),
    })
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config = match &cli.config {
        Some(path) => ExplorerConfig::try_load(path)?.with_env(),
        None => ExplorerConfig::load(),
    };
    let data = cli
        .data
        .clone()
        .or_else(|| config.dataset_path.clone())
        .context("No data set given: pass --data or set dataset_path / SIMSCOPE_DATASET")?;

    let store = Store::load(&data).with_context(|| format!("Failed to load {}", data.display()))?;
    let mut explorer = Explorer::with_state(store, config.initial_state(), Box::new(simscope::clock::SystemClock));

    match cli.command {
        Commands::Tree { no_folders } => {
            if cli.json {
                print_json(&explorer.get_tree())?;
            } else {
                print!("{}", render_tree(explorer.get_tree(), !no_folders));
            }
        }
        Commands::Instances { category, filter } => {
            filter.apply(&mut explorer)?;
            let instances = explorer
                .get_filtered_instances(&category)
                .with_context(|| format!("Unknown category: {}", category))?;
            print_json(&instances)?;
        }
        Commands::Folders {
            instance,
            version,
            filter,
        } => {
            select(&mut explorer, &instance, version.as_deref())?;
            filter.apply(&mut explorer)?;
            let folders = explorer
                .get_filtered_folders(&instance)
                .with_context(|| format!("Unknown instance: {}", instance))?;
            print_json(&folders)?;
        }
        Commands::Files {
            instance,
            folder,
            version,
            page,
            page_size,
            filter,
        } => {
            select(&mut explorer, &instance, version.as_deref())?;
            filter.apply(&mut explorer)?;
            let page_size = page_size.unwrap_or(explorer.state().page_size);
            let files = explorer
                .get_filtered_files(&folder, page, page_size)
                .with_context(|| format!("Unknown folder: {}", folder))?;
            print_json(&files)?;
        }
        Commands::Kpi {
            instance,
            conditions,
            baseline,
            version,
        } => {
            select(&mut explorer, &instance, version.as_deref())?;
            let ids: Vec<&str> = conditions.iter().map(String::as_str).collect();
            let table = explorer
                .get_kpi_table(&ids, baseline.as_deref())
                .context("No active snapshot")?;
            print_json(&table)?;
        }
        Commands::Align {
            instance,
            conditions,
            baseline,
            x_mode,
            y_mode,
            version,
        } => {
            select(&mut explorer, &instance, version.as_deref())?;
            let mut prefs = open_preferences(&config)?;

            let x_key = align_key(&instance, "x");
            let y_key = align_key(&instance, "y");
            let x_mode = x_mode.or_else(|| prefs.get(&x_key));
            let y_mode = y_mode.or_else(|| prefs.get(&y_key));
            let align_mode = match x_mode.as_deref() {
                Some(s) => AlignMode::from_str(s).with_context(|| format!("Unknown x mode: {}", s))?,
                None => AlignMode::default(),
            };
            let y_norm_mode = match y_mode.as_deref() {
                Some(s) => YNormMode::from_str(s).with_context(|| format!("Unknown y mode: {}", s))?,
                None => YNormMode::default(),
            };

            let ids: Vec<&str> = conditions.iter().map(String::as_str).collect();
            let series = explorer
                .get_aligned_series(&ids, baseline.as_deref(), align_mode, y_norm_mode)
                .context("No active snapshot")?;
            print_json(&series)?;

            prefs.set(&x_key, align_mode.as_str());
            prefs.set(&y_key, y_norm_mode.as_str());
            prefs.save()?;
        }
        Commands::Versions { instance } => {
            let record = explorer
                .store()
                .instance(&instance)
                .with_context(|| format!("Unknown instance: {}", instance))?;

            #[derive(Serialize)]
            struct VersionLine<'a> {
                version: &'a str,
                current: bool,
                date: Option<&'a str>,
                author: Option<&'a str>,
                summary: Option<&'a str>,
            }

            let lines: Vec<VersionLine> = record
                .ordered_version_labels()
                .into_iter()
                .map(|label| {
                    let entry = record.version_history.iter().find(|e| e.version == label);
                    VersionLine {
                        version: label,
                        current: label == record.version,
                        date: entry.map(|e| e.date.as_str()),
                        author: entry.and_then(|e| e.author.as_deref()),
                        summary: entry.and_then(|e| e.summary.as_deref()),
                    }
                })
                .collect();
            print_json(&lines)?;
        }
    }

    Ok(())
}
