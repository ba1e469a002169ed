mod gl;
mod import;
mod plan;
mod seed;
mod tour;


use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "rover")]
#[command(about = "Rover field sales command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Import master data from spreadsheets
    Import {
        #[command(subcommand)]
        command: import::ImportCommands,
    },
    /// Optimize a visiting order over a CSV of stops
    Plan {
        /// CSV file with id, name, latitude, longitude columns
        #[arg(long)]
        file: PathBuf,
    },
    /// Track progress through a planned tour
    Tour {
        #[command(subcommand)]
        command: tour::TourCommands,
    },
    /// Manage gebietsleiter accounts
    Gl {
        #[command(subcommand)]
        command: gl::GlCommands,
    },
    /// Apply migrations and load the built-in reference data
    Seed {
        /// Username for the bootstrap admin account
        #[arg(long, default_value = "admin")]
        admin_user: String,
        /// Password for the bootstrap admin account
        #[arg(long, env = "ROVER_ADMIN_PASSWORD")]
        admin_password: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let now = chrono::Utc::now();

    match cli.command {
        Commands::Import { command } => match command {
            import::ImportCommands::Preview { file, rows } => {
                import::run_import_preview(&file, rows)
            }
            import::ImportCommands::Markets { file, dry_run } => {
                let pool = connect().await?;
                import::run_import_markets(&pool, &file, dry_run).await
            }
            import::ImportCommands::Products {
                file,
                department,
                layout,
                mapping,
                dry_run,
            } => {
                let pool = connect().await?;
                import::run_import_products(
                    &pool,
                    &file,
                    &department,
                    layout.as_deref(),
                    &mapping,
                    dry_run,
                )
                .await
            }
        },
        Commands::Plan { file } => plan::run_plan(&file),
        Commands::Tour { command } => match command {
            tour::TourCommands::Start {
                file,
                force,
                state_file,
            } => tour::run_tour_start(&tour::FileStore::new(state_file), &file, force, now),
            tour::TourCommands::Status { state_file } => {
                tour::run_tour_status(&tour::FileStore::new(state_file), now)
            }
            tour::TourCommands::Complete { stop, state_file } => {
                tour::run_tour_complete(&tour::FileStore::new(state_file), &stop, now)
            }
            tour::TourCommands::End { state_file } => {
                tour::run_tour_end(&tour::FileStore::new(state_file), now)
            }
        },
        Commands::Gl { command } => match command {
            gl::GlCommands::Create {
                username,
                display_name,
                email,
                role,
                password,
            } => {
                let pool = connect().await?;
                gl::run_gl_create(&pool, &username, &display_name, &email, &role, &password).await
            }
        },
        Commands::Seed {
            admin_user,
            admin_password,
        } => {
            let pool = connect().await?;
            seed::run_seed(&pool, &admin_user, &admin_password).await
        }
    }
}

async fn connect() -> anyhow::Result<sqlx::PgPool> {
    Ok(rover_db::connect_pool_from_env().await?)
}
