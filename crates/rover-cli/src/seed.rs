//! Database bootstrap: apply migrations and load the reference data set.

/// # Errors
///
/// Returns an error when the password is too short, a migration fails, or
/// the seed transaction fails.
pub(crate) async fn run_seed(
    pool: &sqlx::PgPool,
    admin_user: &str,
    admin_password: &str,
) -> anyhow::Result<()> {
    anyhow::ensure!(
        admin_password.len() >= 8,
        "admin password must be at least 8 characters"
    );

    let applied = rover_db::run_migrations(pool).await?;
    if applied > 0 {
        println!("applied {applied} pending migrations");
    }

    let digest = rover_db::hash_password(admin_password);
    let summary = rover_db::seed_reference_data(pool, admin_user.trim(), &digest).await?;
    println!(
        "seeded {} accounts, {} markets, {} products",
        summary.gebietsleiter, summary.markets, summary.products
    );
    Ok(())
}
