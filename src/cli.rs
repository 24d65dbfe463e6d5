use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};

use crate::app::{self, RunOptions};
use crate::catalog::{self, Catalog, CatalogItem, RawRecord, RawTags};
use crate::config::Config;
use crate::deeplink::DeepLink;
use crate::embed;
use crate::logging;
use crate::shelf::Shelf;
use crate::source::LocalSource;
use crate::view::{self, SortMode};

/// Browse a catalog of OneDrive-hosted movies from the terminal.
#[derive(Debug, Parser)]
#[command(name = "movie-shelf", version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to the user config directory).
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Catalog source: `local`, an http(s) URL, or a JSON file path.
    #[arg(long, global = true, value_name = "SPEC")]
    pub source: Option<String>,

    /// Address to start from; its query carries the open title.
    #[arg(long, global = true, value_name = "URL")]
    pub address: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print the catalog as the shelf would show it.
    List(ListArgs),
    /// Turn a share link or iframe snippet into an embed link.
    Normalize {
        /// Link or `<iframe>` embed code.
        raw: String,
    },
    /// Print the share link that opens a title.
    Open {
        id: String,
    },
    /// Append a title to the local catalog.
    Add(AddArgs),
    /// Remove a title from the local catalog.
    Remove {
        id: String,
    },
    /// Replace the local catalog with the records in a JSON file.
    Import {
        file: PathBuf,
    },
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Case-insensitive match on title or tags.
    #[arg(long, default_value = "")]
    pub filter: String,

    /// newest, az or za. Defaults to the configured sort.
    #[arg(long)]
    pub sort: Option<SortMode>,

    /// Emit normalized items as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct AddArgs {
    #[arg(long)]
    pub title: String,

    /// Share link, embed link or iframe snippet.
    #[arg(long)]
    pub link: String,

    #[arg(long)]
    pub id: Option<String>,

    #[arg(long)]
    pub poster: Option<String>,

    /// Comma-separated tags.
    #[arg(long)]
    pub tags: Option<String>,

    #[arg(long)]
    pub year: Option<String>,

    #[arg(long = "added-at")]
    pub added_at: Option<String>,
}

impl AddArgs {
    fn into_record(self) -> RawRecord {
        RawRecord {
            id: self.id,
            title: Some(self.title),
            poster: self.poster,
            tags: self.tags.map(RawTags::Joined),
            year: self.year,
            link: Some(self.link),
            added_at: Some(
                self.added_at
                    .unwrap_or_else(|| catalog::iso_timestamp(chrono::Utc::now())),
            ),
            ..RawRecord::default()
        }
    }
}

pub fn execute(cli: Cli) -> Result<()> {
    let opts = RunOptions {
        config_file: cli.config,
        source: cli.source,
        address: cli.address,
    };
    let Some(command) = cli.command else {
        return app::run(opts);
    };

    let cfg = app::load_config(&opts)?;
    let _log_guard = logging::init(&cfg.log, logging::Target::Stderr)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match command {
        Commands::List(args) => {
            let catalog = app::load_catalog(&cfg)?;
            write_list(&mut out, &catalog, &args, cfg.ui.default_sort)
        }
        Commands::Normalize { raw } => write_normalized(&mut out, &raw),
        Commands::Open { id } => {
            let catalog = app::load_catalog(&cfg)?;
            let link = share_link_for(&cfg, opts.address.as_deref(), catalog, &id)?;
            writeln!(out, "{link}")?;
            Ok(())
        }
        Commands::Add(args) => {
            let local = local_source(&cfg)?;
            let title = args.title.clone();
            let count = local.add_record(args.into_record()).context("add: write local catalog")?;
            writeln!(out, "Added {title} ({count} titles in local catalog).")?;
            Ok(())
        }
        Commands::Remove { id } => {
            let local = local_source(&cfg)?;
            if !local.remove_record(&id).context("remove: write local catalog")? {
                bail!("remove: no title with id {id:?} in local catalog");
            }
            writeln!(out, "Removed {id}.")?;
            Ok(())
        }
        Commands::Import { file } => {
            let body = std::fs::read_to_string(&file)
                .with_context(|| format!("import: read {}", file.display()))?;
            let records = catalog::parse_records(&body)
                .with_context(|| format!("import: parse {}", file.display()))?;
            let local = local_source(&cfg)?;
            local
                .replace_records(&records)
                .context("import: write local catalog")?;
            writeln!(out, "Imported {} titles.", records.len())?;
            Ok(())
        }
    }
}

fn local_source(cfg: &Config) -> Result<LocalSource> {
    Ok(LocalSource::new(app::open_store(cfg)?))
}

fn write_list(
    out: &mut impl Write,
    catalog: &Catalog,
    args: &ListArgs,
    default_sort: SortMode,
) -> Result<()> {
    let sort = args.sort.unwrap_or(default_sort);
    let items = view::derive(catalog.items(), &args.filter, sort);
    if args.json {
        serde_json::to_writer_pretty(&mut *out, &items).context("list: encode json")?;
        writeln!(out)?;
        return Ok(());
    }
    for item in items {
        writeln!(out, "{}", list_line(item))?;
    }
    Ok(())
}

fn list_line(item: &CatalogItem) -> String {
    let mut line = format!("{:<11}  {}", item.badge(), item.title);
    if !item.year.is_empty() {
        line.push_str(&format!(" ({})", item.year));
    }
    line.push_str(&format!("  [{}]", item.id));
    if !item.tags.is_empty() {
        line.push_str(&format!("  {}", item.tag_line()));
    }
    line
}

fn write_normalized(out: &mut impl Write, raw: &str) -> Result<()> {
    let normalized = embed::normalize(raw);
    writeln!(out, "{}", normalized.embed)?;
    writeln!(out, "confidence: {}", normalized.confidence)?;
    Ok(())
}

/// Share link for `id`, computed against the explicit address or the
/// configured base without touching the remembered one.
fn share_link_for(cfg: &Config, address: Option<&str>, catalog: Catalog, id: &str) -> Result<String> {
    let address = app::initial_address(cfg, address, None)?;
    let mut shelf = Shelf::new(
        DeepLink::with_param(address, cfg.deep_link.param.clone()),
        cfg.ui.default_sort,
    );
    shelf.replace_catalog(catalog);
    if shelf.open_item(id).is_none() {
        bail!("open: no title with id {id:?}");
    }
    Ok(shelf.share_link())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{LoadOptions, MissingTimestamp};

    fn catalog() -> Catalog {
        let body = r#"[
            {"title": "Dune", "addedAt": "2021-01-01", "tags": ["sci-fi"], "year": 2021,
             "link": "https://onedrive.live.com/?resid=D!1&authkey=K"},
            {"title": "Amadeus", "addedAt": "2023-01-01", "link": "https://1drv.ms/v/s!x"}
        ]"#;
        let records = catalog::parse_records(body).unwrap();
        Catalog::from_records(records, &LoadOptions::with_policy(MissingTimestamp::Epoch))
    }

    fn list(args: &ListArgs) -> String {
        let mut out = Vec::new();
        write_list(&mut out, &catalog(), args, SortMode::Newest).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn list_prints_badges_in_view_order() {
        let text = list(&ListArgs {
            filter: String::new(),
            sort: Some(SortMode::Az),
            json: false,
        });
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("Needs Embed  Amadeus  [amadeus]"));
        assert_eq!(lines[1], "Embed OK     Dune (2021)  [dune]  sci-fi");
    }

    #[test]
    fn list_json_carries_normalized_fields() {
        let text = list(&ListArgs {
            filter: "dune".into(),
            sort: None,
            json: true,
        });
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        let items = value.as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["id"], "dune");
        assert_eq!(items[0]["confidence"], true);
        assert_eq!(
            items[0]["embed"],
            "https://onedrive.live.com/embed?resid=D%211&authkey=K&em=2"
        );
        assert_eq!(items[0]["addedAt"], "2021-01-01");
    }

    #[test]
    fn normalize_prints_link_and_confidence() {
        let mut out = Vec::new();
        write_normalized(&mut out, "not a url").unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "not a url\nconfidence: false\n");
    }

    #[test]
    fn share_link_requires_known_id() {
        let cfg = Config::default();
        let link = share_link_for(&cfg, None, catalog(), "dune").unwrap();
        assert_eq!(link, "http://localhost/?id=dune");
        let keeps_query =
            share_link_for(&cfg, Some("https://shelf.test/?lang=en"), catalog(), "amadeus").unwrap();
        assert_eq!(keeps_query, "https://shelf.test/?lang=en&id=amadeus");
        assert!(share_link_for(&cfg, None, catalog(), "missing").is_err());
    }

    #[test]
    fn add_args_build_a_record() {
        let record = AddArgs {
            title: "Heat".into(),
            link: "https://1drv.ms/v/s!h".into(),
            id: None,
            poster: None,
            tags: Some("crime, drama".into()),
            year: Some("1995".into()),
            added_at: Some("2024-05-01".into()),
        }
        .into_record();
        let item = CatalogItem::from_raw(
            record,
            0,
            &LoadOptions::with_policy(MissingTimestamp::Epoch),
        );
        assert_eq!(item.id, "heat");
        assert_eq!(item.tags, ["crime", "drama"]);
        assert_eq!(item.added_at, "2024-05-01");
    }

    #[test]
    fn cli_parses_global_flags_and_sort() {
        let cli = Cli::try_parse_from([
            "movie-shelf",
            "--source",
            "movies.json",
            "list",
            "--sort",
            "new",
        ])
        .unwrap();
        assert_eq!(cli.source.as_deref(), Some("movies.json"));
        match cli.command {
            Some(Commands::List(args)) => assert_eq!(args.sort, Some(SortMode::Newest)),
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
