use std::path::Path;

use clap::Parser;
use dokang::{
    ConfigDb,
    DataDir,
    DocumentSet,
    IndexStore,
    cli::{Cli, Command, DocsetAction},
    error::{self, Error},
    events::TracingSink,
    harvest,
    operations,
    search,
    tantivy_index::FORMAT_VERSION,
};
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if let Ok(env) = std::env::var("DOKANG_LOG") {
        EnvFilter::new(env)
    } else if quiet {
        EnvFilter::new("warn")
    } else {
        match verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn main() -> error::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    if let Command::Completions(args) = &cli.command {
        args.generate();
        return Ok(());
    }

    let data_dir = DataDir::resolve(cli.data_dir.as_deref())?;
    let config_db = ConfigDb::open(&data_dir.config_db())?;
    let index = cli.index.unwrap_or_else(|| data_dir.index_dir());

    match cli.command {
        Command::Init(args) => {
            operations::initialize_index(&index, args.force, &TracingSink)?;
            println!("Initialized index at {}", index.display());
        }
        Command::Docset { action } => match action {
            DocsetAction::Add {
                path,
                name,
                ignore,
                selector,
            } => {
                docset_add(&config_db, &path, name, ignore, selector)?;
            }
            DocsetAction::Remove { name } => {
                docset_remove(&config_db, &index, &name)?;
            }
            DocsetAction::List { json } => {
                docset_list(&config_db, json)?;
            }
        },
        Command::Index(args) => {
            cmd_index(&config_db, &index, args.docset.as_deref())?;
        }
        Command::Search(args) => {
            let hits = match &args.docset {
                Some(set_id) => operations::query_set(
                    &index,
                    &args.query,
                    set_id,
                    args.count,
                )?,
                None => {
                    operations::query_index(&index, &args.query, args.count)?
                }
            };

            let mut out = std::io::stdout().lock();
            if args.json {
                search::write_json(&mut out, &args.query, &hits)?;
            } else {
                search::write_human(&mut out, &hits)?;
            }
        }
        Command::Status(args) => {
            cmd_status(&config_db, &data_dir, &index, args.json)?;
        }
        Command::Completions(_) => {}
    }

    Ok(())
}

fn docset_add(
    config_db: &ConfigDb,
    path: &Path,
    name: String,
    ignore: Vec<String>,
    selector: Option<String>,
) -> error::Result<()> {
    if !path.is_dir() {
        return Err(Error::Config(format!(
            "path is not a directory: {}",
            path.display()
        )));
    }

    let abs_path = path.canonicalize().map_err(|e| {
        Error::Config(format!("cannot resolve path {}: {e}", path.display()))
    })?;

    if config_db.get_doc_set(&name)?.is_some() {
        return Err(Error::Config(format!(
            "document set '{name}' already exists"
        )));
    }

    let mut set = DocumentSet::new(name, abs_path);
    set.ignore = ignore;
    set.content_selector = selector;

    harvest::validate(&set)?;

    config_db.set_doc_set(&set)?;
    println!("Added document set '{}' -> {}", set.id, set.root.display());
    Ok(())
}

fn docset_remove(
    config_db: &ConfigDb,
    index: &Path,
    name: &str,
) -> error::Result<()> {
    if config_db.get_doc_set(name)?.is_none() {
        return Err(Error::NotFound {
            kind: "document set",
            name: name.to_string(),
        });
    }

    match operations::remove_set(index, name, &TracingSink) {
        Ok(()) | Err(Error::NotInitialized(_)) => {}
        Err(e) => return Err(e),
    }
    config_db.remove_doc_set(name)?;

    println!("Removed document set '{name}'");
    Ok(())
}

fn docset_list(config_db: &ConfigDb, json: bool) -> error::Result<()> {
    let sets = config_db.list_doc_sets()?;

    if json {
        println!("{}", serde_json::to_string(&sets)?);
    } else if sets.is_empty() {
        println!("No document sets registered.");
    } else {
        for set in &sets {
            println!("{}\t{}", set.id, set.root.display());
        }
    }
    Ok(())
}

fn cmd_index(
    config_db: &ConfigDb,
    index: &Path,
    only: Option<&str>,
) -> error::Result<()> {
    let sets = if let Some(id) = only {
        let set = config_db.get_doc_set(id)?.ok_or_else(|| Error::NotFound {
            kind: "document set",
            name: id.to_string(),
        })?;
        vec![set]
    } else {
        config_db.list_doc_sets()?
    };

    if sets.is_empty() {
        eprintln!("No document sets to index.");
        return Ok(());
    }

    // Fail early, before any harvesting, if there is no index yet.
    IndexStore::open(index)?;

    for set in &sets {
        if !set.root.is_dir() {
            tracing::warn!(
                set = %set.id,
                root = %set.root.display(),
                "document set root does not exist, keeping its entries"
            );
            continue;
        }

        let count = operations::reindex(index, set, &TracingSink)?;
        eprintln!("Indexed {count} documents in '{}'", set.id);
    }

    Ok(())
}

fn cmd_status(
    config_db: &ConfigDb,
    data_dir: &DataDir,
    index: &Path,
    json: bool,
) -> error::Result<()> {
    let sets = config_db.list_doc_sets()?;
    let store = match IndexStore::open(index) {
        Ok(store) => Some(store),
        Err(Error::NotInitialized(_)) => None,
        Err(e) => return Err(e),
    };

    let mut counts = Vec::with_capacity(sets.len());
    for set in &sets {
        let count = match &store {
            Some(store) => Some(store.count(Some(&set.id))?),
            None => None,
        };
        counts.push((set, count));
    }
    let total = store.as_ref().map(|s| s.count(None)).transpose()?;

    if json {
        let doc_sets: Vec<_> = counts
            .iter()
            .map(|(set, count)| {
                serde_json::json!({
                    "id": set.id,
                    "root": set.root,
                    "documents": count,
                })
            })
            .collect();
        let status = serde_json::json!({
            "data_dir": data_dir.root(),
            "index": index,
            "initialized": store.is_some(),
            "format_version": FORMAT_VERSION,
            "documents": total,
            "doc_sets": doc_sets,
        });
        println!("{status}");
    } else {
        println!("Data directory: {}", data_dir.root().display());
        match total {
            Some(total) => {
                println!(
                    "Index: {} (format version {FORMAT_VERSION})",
                    index.display()
                );
                println!("Documents: {total}");
            }
            None => println!("Index: {} (not initialized)", index.display()),
        }
        println!("Document sets: {}", sets.len());
        for (set, count) in &counts {
            match count {
                Some(n) => println!(
                    "  {}: {} ({n} documents)",
                    set.id,
                    set.root.display()
                ),
                None => println!("  {}: {}", set.id, set.root.display()),
            }
        }
    }
    Ok(())
}
