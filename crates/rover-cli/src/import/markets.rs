use std::path::Path;

use super::load_rows;

/// Import a market master list.
///
/// Rows without an id or name are skipped and counted, never fatal. For
/// markets that already exist only the master-list columns change; visit
/// counters, coordinates and the rep assignment stay as they are.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, contains no
/// usable rows, or the batch write fails.
pub(crate) async fn run_import_markets(
    pool: &sqlx::PgPool,
    file: &Path,
    dry_run: bool,
) -> anyhow::Result<()> {
    let rows = load_rows(file)?;
    let import = rover_import::parse_markets(&rows)?;
    if import.markets.is_empty() {
        anyhow::bail!("no usable market rows in '{}'", file.display());
    }

    if dry_run {
        println!(
            "dry-run: would import {} markets ({} rows skipped)",
            import.markets.len(),
            import.skipped_rows
        );
        for market in import.markets.iter().take(10) {
            println!("  {:<12}{:<32}{}", market.id, market.name, market.chain);
        }
        if import.markets.len() > 10 {
            println!("  ... and {} more", import.markets.len() - 10);
        }
        return Ok(());
    }

    let records: Vec<rover_db::MarketUpsert> = import.markets.iter().map(to_upsert).collect();
    let (inserted, updated) = rover_db::upsert_markets(pool, &records).await?;
    println!(
        "imported {} markets: {inserted} new, {updated} updated, {} rows skipped",
        records.len(),
        import.skipped_rows
    );
    Ok(())
}

fn to_upsert(market: &rover_import::ParsedMarket) -> rover_db::MarketUpsert {
    rover_db::MarketUpsert {
        id: market.id.clone(),
        name: market.name.clone(),
        address: market.address.clone(),
        city: market.city.clone(),
        postal_code: market.postal_code.clone(),
        chain: market.chain.clone(),
        frequency: i32::try_from(market.frequency).unwrap_or(i32::MAX),
        is_active: market.active,
        channel: market.channel.clone(),
        banner: market.banner.clone(),
        branch: market.branch.clone(),
        customer_type: market.customer_type.clone(),
        phone: market.phone.clone(),
        email: market.email.clone(),
        maingroup: market.maingroup.clone(),
        subgroup: market.subgroup.clone(),
    }
}
