//! `supplink collect <ITEM>`: one item, printed and (unless `--dry-run`)
//! stored.

use supplink_core::{AppConfig, ProductLink};
use supplink_db::{persist, MemoryLinkStore};

use crate::Caps;

pub(crate) async fn run_collect(
    config: &AppConfig,
    item: &str,
    caps: Caps,
    dry_run: bool,
) -> anyhow::Result<()> {
    let catalog = crate::load_catalog(config)?;
    // Connect before searching so a bad DATABASE_URL fails before any API spend.
    let store = if dry_run {
        None
    } else {
        Some(crate::connect_store(config).await?)
    };
    let collector = crate::build_collector(config, &catalog)?;

    let links = collector.collect(item, caps.per_brand, caps.total).await?;
    print_links(item, &links);

    match store {
        Some(store) => {
            let key = persist(&store, item, &links).await?;
            println!("stored {} link(s) under '{key}'", links.len());
        }
        None => {
            // Still run the writer's validation so a dry run catches bad links.
            let key = persist(&MemoryLinkStore::new(), item, &links).await?;
            println!("dry-run: would store {} link(s) under '{key}'", links.len());
        }
    }
    Ok(())
}

pub(crate) fn print_links(item: &str, links: &[ProductLink]) {
    println!("{} link(s) for {item}:", links.len());
    for (i, link) in links.iter().enumerate() {
        println!("{}", format_link_line(i + 1, link));
    }
}

fn format_link_line(position: usize, link: &ProductLink) -> String {
    let rating = if link.rating > 0.0 {
        format!("{:.1}/5", link.rating)
    } else {
        "-".to_string()
    };
    let price = if link.price > 0.0 {
        format!("${:.2}", link.price)
    } else {
        "-".to_string()
    };
    format!(
        "{position:>3}. {:<22} {price:>9} {rating:>6}  {}",
        link.brand, link.url
    )
}
