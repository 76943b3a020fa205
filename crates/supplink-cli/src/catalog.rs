//! Catalog inspection commands. Neither touches the network or the database.

use clap::Subcommand;
use supplink_core::{AppConfig, Catalog};
use supplink_search::QueryBuilder;

#[derive(Debug, Subcommand)]
pub enum CatalogCommands {
    /// Validate the catalog file and print a short summary
    Check,
}

pub(crate) fn run_catalog_command(config: &AppConfig, command: &CatalogCommands) -> anyhow::Result<()> {
    match command {
        CatalogCommands::Check => {
            let catalog = crate::load_catalog(config)?;
            println!("{}", describe_catalog(&catalog, &config.catalog_path.display().to_string()));
            Ok(())
        }
    }
}

pub(crate) fn run_queries(config: &AppConfig, brand: &str, item: &str) -> anyhow::Result<()> {
    let catalog = crate::load_catalog(config)?;
    let builder = QueryBuilder::new(catalog.query_templates.iter().cloned());
    let queries = builder.build(brand, item);
    if queries.is_empty() {
        anyhow::bail!("no queries produced for brand '{brand}' and item '{item}'");
    }
    for (i, query) in queries.iter().enumerate() {
        println!("{}. {query}", i + 1);
    }
    Ok(())
}

fn describe_catalog(catalog: &Catalog, path: &str) -> String {
    let mut lines = vec![format!(
        "catalog {path}: {} brand(s), {} item(s), {} query template(s)",
        catalog.brands.len(),
        catalog.items.len(),
        catalog.query_templates.len()
    )];
    lines.extend(
        catalog
            .brands
            .iter()
            .map(|brand| format!("  {:<28} {}", brand.domain, brand.name)),
    );
    lines.join("\n")
}
