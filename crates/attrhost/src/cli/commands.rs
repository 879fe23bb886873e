use super::headless::{derive_controls, HeadlessControl};
use super::render::{self, Row};
use super::setup::{parse_cli, Cli, Commands};
use anyhow::{bail, Context, Result};
use attrhostapp::counters::CounterKind;
use attrhostapp::overlay::surface::MemSurface;
use attrhostapp::store::json::JsonFileStore;
use attrhostapp::store::AttributeStore;
use attrhostapp::{Direction, DocumentSession, HostConfig, HostEvent};
use directories::ProjectDirs;
use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

type Session = DocumentSession<MemSurface>;

pub fn run() -> Result<()> {
    init_logging();
    let cli = parse_cli();
    let config = load_config(&cli)?;

    match cli.command {
        Commands::Summary { file, json } => handle_summary(config, &file, json),
        Commands::Next {
            file,
            after,
            unviewed,
            invalid,
            backward,
        } => handle_next(config, &file, after, unviewed, invalid, backward),
        Commands::View { file, indexes, all } => handle_view(config, &file, &indexes, all),
        Commands::SaveCheck { file } => handle_save_check(config, &file),
        Commands::Config => handle_config(&config),
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("ATTRHOST_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn default_config_file() -> Option<PathBuf> {
    let dirs = ProjectDirs::from("", "", "attrhost")?;
    let path = dirs.config_dir().join("attrhost.toml");
    path.exists().then_some(path)
}

fn load_config(cli: &Cli) -> Result<HostConfig> {
    let file = match &cli.config {
        Some(path) => {
            if !path.exists() {
                bail!("config file not found: {}", path.display());
            }
            Some(path.clone())
        }
        None => default_config_file(),
    };
    debug!(file = ?file, "loading configuration");
    HostConfig::load(file.as_deref()).context("invalid configuration")
}

/// Loads `file` into a headless session. Unlike an interactive host, a document that
/// cannot be read is an error here rather than an empty form.
fn open(config: HostConfig, file: &Path) -> Result<(Session, JsonFileStore)> {
    let store = JsonFileStore::new(file);
    let tree = store
        .load()
        .with_context(|| format!("cannot read {}", file.display()))?;

    let mut session = DocumentSession::new(config, MemSurface::default());
    for spec in derive_controls(&tree) {
        let id = spec.id;
        session.register_control(spec, HeadlessControl::new(id))?;
    }
    session.load_tree(tree)?;
    info!(file = %file.display(), attributes = session.tree().len(), "document opened");
    Ok((session, store))
}

fn row_at(rows: &[Row], index: usize) -> Result<&Row> {
    if index == 0 || index > rows.len() {
        bail!(
            "no attribute at index {} (the document has {})",
            index,
            rows.len()
        );
    }
    Ok(&rows[index - 1])
}

fn handle_summary(config: HostConfig, file: &Path, json: bool) -> Result<()> {
    let (session, _) = open(config, file)?;
    let rows = render::rows(session.tree());
    if json {
        println!("{}", render::render_summary_json(session.counters(), &rows)?);
    } else {
        print!("{}", render::render_summary(session.counters(), &rows));
    }
    Ok(())
}

fn handle_next(
    config: HostConfig,
    file: &Path,
    after: Option<usize>,
    unviewed: bool,
    invalid: bool,
    backward: bool,
) -> Result<()> {
    let (mut session, _) = open(config, file)?;
    let rows = render::rows(session.tree());

    if let Some(index) = after {
        let start = row_at(&rows, index)?;
        session.propagate(start.id, true)?;
    }

    let (found, what) = if unviewed {
        (session.select_next_unviewed()?, "unviewed attribute")
    } else if invalid {
        (session.select_next_invalid()?, "invalid attribute")
    } else {
        let direction = if backward {
            Direction::Backward
        } else {
            Direction::Forward
        };
        (session.select_next(direction)?, "attribute")
    };

    let found = found.and_then(|id| rows.iter().find(|r| r.id == id));
    print!("{}", render::render_next(found, what));
    Ok(())
}

fn handle_view(config: HostConfig, file: &Path, indexes: &[usize], all: bool) -> Result<()> {
    let (mut session, store) = open(config, file)?;
    let rows = render::rows(session.tree());
    let before = session.counters().unviewed();

    let all_viewed = Rc::new(Cell::new(false));
    let flag = Rc::clone(&all_viewed);
    session.subscribe(move |event| {
        if let HostEvent::NoneLeft {
            kind: CounterKind::Unviewed,
        } = event
        {
            flag.set(true);
        }
    });

    if all {
        let mut scope = session.begin_update();
        for row in &rows {
            scope.set_viewed(row.id, true)?;
        }
    } else {
        let targets = indexes
            .iter()
            .map(|i| row_at(&rows, *i).map(|r| r.id))
            .collect::<Result<Vec<_>>>()?;
        for id in targets {
            session.propagate(id, true)?;
        }
    }

    session
        .save_to(&store)
        .with_context(|| format!("cannot write {}", file.display()))?;

    let counters = session.counters();
    let marked = before.saturating_sub(counters.unviewed());
    print!("{}", render::render_view(marked, counters, all_viewed.get()));
    Ok(())
}

fn handle_save_check(config: HostConfig, file: &Path) -> Result<()> {
    let (session, _) = open(config, file)?;
    let rows = render::rows(session.tree());
    print!("{}", render::render_verdict(&session.evaluate_save(), &rows));
    Ok(())
}

fn handle_config(config: &HostConfig) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}
