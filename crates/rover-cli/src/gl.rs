//! Account area of the CLI: bootstrap gebietsleiter and admin accounts
//! without going through the HTTP API.

use clap::Subcommand;
use rover_core::Role;

/// Sub-commands available under `gl`.
#[derive(Debug, Subcommand)]
pub enum GlCommands {
    /// Create a gebietsleiter or admin account
    Create {
        /// Login name, unique across accounts
        #[arg(long)]
        username: String,
        /// Name shown in the UI
        #[arg(long)]
        display_name: String,
        /// Contact address
        #[arg(long)]
        email: String,
        /// Account role (gl or admin)
        #[arg(long, default_value = "gl")]
        role: String,
        /// Initial password, at least 8 characters
        #[arg(long)]
        password: String,
    },
}

/// # Errors
///
/// Returns an error when the role or password is invalid, the username is
/// taken, or the insert fails.
pub(crate) async fn run_gl_create(
    pool: &sqlx::PgPool,
    username: &str,
    display_name: &str,
    email: &str,
    role: &str,
    password: &str,
) -> anyhow::Result<()> {
    anyhow::ensure!(password.len() >= 8, "password must be at least 8 characters");
    let role: Role = role.trim().to_ascii_lowercase().parse()?;

    let row = rover_db::create_gebietsleiter(
        pool,
        &rover_db::NewGebietsleiter {
            username: username.trim().to_owned(),
            display_name: display_name.trim().to_owned(),
            email: email.trim().to_owned(),
            role,
            password_digest: rover_db::hash_password(password),
        },
    )
    .await
    .map_err(|error| match &error {
        rover_db::DbError::Sqlx(sqlx::Error::Database(db)) if db.is_unique_violation() => {
            anyhow::anyhow!("username '{}' is already taken", username.trim())
        }
        _ => anyhow::Error::from(error),
    })?;

    println!("created {} account '{}' ({})", row.role, row.username, row.id);
    Ok(())
}
