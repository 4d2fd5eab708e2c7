//! CLI entry point.
//!
//! # Responsibility
//! - Wire configuration, logging and the embedded store into a category service.
//! - Print the active category tree as indented lines for quick inspection.

use catalog_core::{
    core_version, init_logging_from_config, open_db, open_db_in_memory, CatalogConfig, Category,
    CategoryService, SqliteNodeStore,
};
use log::info;
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("catalog: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), String> {
    let config = CatalogConfig::from_env();
    init_logging_from_config(&config)?;

    let conn = match config.db_path.as_deref() {
        Some(path) => open_db(path),
        None => open_db_in_memory(),
    }
    .map_err(|err| err.to_string())?;
    let store = SqliteNodeStore::try_new(&conn).map_err(|err| err.to_string())?;
    let service = CategoryService::with_limits(store, config.limits);

    let tree = service.get_tree(false).map_err(|err| err.to_string())?;
    info!(
        "event=cli_tree module=cli status=ok version={} roots={}",
        core_version(),
        tree.len()
    );

    println!("catalog version={}", core_version());
    for root in &tree {
        print_category(root, 0);
    }
    Ok(())
}

fn print_category(category: &Category, depth: usize) {
    println!(
        "{:indent$}{} [{}] {}",
        "",
        category.position,
        category.id,
        category.path,
        indent = depth * 2
    );
    for child in &category.children {
        print_category(child, depth + 1);
    }
}
