use supplink_core::AppConfig;
use supplink_db::fetch;

pub(crate) async fn run_show(config: &AppConfig, item: &str) -> anyhow::Result<()> {
    let store = crate::connect_store(config).await?;
    match fetch(&store, item).await? {
        Some(stored) => {
            println!(
                "'{}' (key '{}'), updated {}",
                stored.display_name,
                stored.item_key,
                stored.updated_at.format("%Y-%m-%d %H:%M UTC")
            );
            crate::collect::print_links(&stored.display_name, &stored.links);
        }
        None => println!("no stored links for '{}'", item.trim()),
    }
    Ok(())
}
