// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod render;

use anyhow::{Context, Result, anyhow};
use config::Config;
use larder_db::Store;
use larder_testkit::RecipeFaker;
use larder_view::{KeyIndex, RecipeIndex, TreePath};
use std::env;
use std::path::PathBuf;
use std::rc::Rc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

const DEMO_SEED: u64 = 42;
const DEMO_RECIPES: usize = 40;

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }
    init_tracing(options.verbose);

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `larder --print-example-config` to generate a v1 template",
            options.config_path.display()
        )
    })?;

    let db_path = if options.demo {
        PathBuf::from(":memory:")
    } else {
        config.db_path()?
    };
    if options.print_db_path {
        println!("{}", db_path.display());
        return Ok(());
    }

    let store = Store::open(&db_path).with_context(|| {
        format!(
            "open database {} -- if this path is wrong, set [storage].db_path or LARDER_DB_PATH",
            db_path.display()
        )
    })?;
    store.bootstrap()?;
    if options.demo {
        for draft in RecipeFaker::new(DEMO_SEED).recipes(DEMO_RECIPES) {
            store.create_recipe(&draft)?;
        }
        info!(recipes = DEMO_RECIPES, "seeded demo recipes");
    }

    let recipe_view = config
        .recipe_view()
        .with_context(|| format!("invalid [view] config in {}", options.config_path.display()))?;
    let key_view = config.key_view();
    if options.check_only {
        return Ok(());
    }

    let store = Rc::new(store);
    let page = options.page.unwrap_or(1).saturating_sub(1);
    if options.keys {
        let mut index = KeyIndex::new(store, &key_view)?;
        if let Some(query) = &options.search {
            let by = options.by.as_deref().unwrap_or("ingkey");
            index.search_by_name(query, by, options.regex)?;
        }
        index.tree_mut().set_page(page)?;
        if !index.tree().view().is_empty() {
            index.tree_mut().expand(&TreePath::root(0))?;
        }
        debug!(page = index.tree().view().page(), "rendering key page");
        print!("{}", render::key_page(&index)?);
    } else {
        let mut index = RecipeIndex::new(store, &recipe_view)?;
        if let Some(query) = &options.search {
            let by = options.by.as_deref().unwrap_or("anywhere");
            index.search_by_name(query, by, options.regex)?;
        }
        index.view_mut().set_page(page)?;
        debug!(page = index.view().page(), "rendering recipe page");
        print!("{}", render::recipe_page(&index)?);
    }
    Ok(())
}

/// Logs go to stderr so page output stays clean. `RUST_LOG` wins over
/// `--verbose`.
fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_ansi(false)
        .compact()
        .try_init();
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    print_config_path: bool,
    print_db_path: bool,
    demo: bool,
    print_example: bool,
    check_only: bool,
    keys: bool,
    search: Option<String>,
    by: Option<String>,
    regex: bool,
    page: Option<usize>,
    verbose: bool,
    show_help: bool,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        print_config_path: false,
        print_db_path: false,
        demo: false,
        print_example: false,
        check_only: false,
        keys: false,
        search: None,
        by: None,
        regex: false,
        page: None,
        verbose: false,
        show_help: false,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--search" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--search requires a query"))?;
                options.search = Some(value.as_ref().to_owned());
            }
            "--by" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--by requires a column name"))?;
                options.by = Some(value.as_ref().to_owned());
            }
            "--page" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--page requires a page number"))?;
                let page = value
                    .as_ref()
                    .parse::<usize>()
                    .ok()
                    .filter(|page| *page > 0)
                    .ok_or_else(|| {
                        anyhow!(
                            "--page expects a positive number, got {:?}",
                            value.as_ref()
                        )
                    })?;
                options.page = Some(page);
            }
            "--regex" => {
                options.regex = true;
            }
            "--keys" => {
                options.keys = true;
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-path" => {
                options.print_db_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--demo" => {
                options.demo = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--verbose" | "-v" => {
                options.verbose = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown => {
                return Err(anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    Ok(options)
}

fn print_help() {
    println!("larder");
    println!("  --config <path>          Use a specific config path");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-path             Print resolved database path");
    println!("  --print-example-config   Print a v1 config template");
    println!("  --demo                   Browse seeded demo recipes (in-memory)");
    println!("  --check                  Validate config + DB, then exit");
    println!("  --keys                   Show the ingredient key tree instead of recipes");
    println!("  --search <text>          Filter rows by text");
    println!("  --by <column>            Column to search (default: anywhere, or ingkey with --keys)");
    println!("  --regex                  Treat --search as a regular expression");
    println!("  --page <n>               Page to show, starting at 1");
    println!("  --verbose, -v            Log debug output to stderr");
    println!("  --help                   Show this help");
}
