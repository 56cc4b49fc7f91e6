use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use entity::{user, user_secret};
use migration::{Migrator, MigratorTrait};
use platform_db::{DatabaseSettings, DbPool, connect};
use platform_obs::{ObsConfig, init_tracing};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter, TransactionTrait,
};
use tracing::info;
use uuid::Uuid;

use server::{
    chatbot::ChatbotClient,
    config::AppConfig,
    content::ContentStore,
    http::{self, AppState, ServeConfig},
    session::hash_password,
};

#[derive(Parser, Debug)]
#[command(name = "taskdesk-server", version, about = "TaskDesk project server")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP server.
    Serve(ServeCommand),
    /// Run database migrations.
    #[command(subcommand)]
    Migrate(MigrateCommand),
    /// Create the initial admin account.
    Seed,
}

#[derive(Subcommand, Debug)]
enum MigrateCommand {
    /// Apply pending migrations.
    Up,
    /// Rollback the most recent migration.
    Down,
}

#[derive(Args, Debug)]
struct ServeCommand {
    #[arg(long, default_value = "0.0.0.0")]
    host: std::net::IpAddr,
    #[arg(long, default_value_t = 8080)]
    port: u16,
    #[arg(long, help = "Allow starting even when migrations are pending")]
    allow_dirty: bool,
}

impl From<&ServeCommand> for ServeConfig {
    fn from(value: &ServeCommand) -> Self {
        ServeConfig::new(value.host, value.port)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing(ObsConfig::default())?;
    let cli = Cli::parse();
    match cli.command {
        Command::Serve(cmd) => {
            let config = Arc::new(AppConfig::load()?);
            run_server(cmd, config).await
        }
        Command::Migrate(action) => match action {
            MigrateCommand::Up => migrate_up().await,
            MigrateCommand::Down => migrate_down().await,
        },
        Command::Seed => run_seed().await,
    }
}

async fn setup_pool() -> Result<DbPool> {
    let settings = DatabaseSettings::from_env();
    connect(&settings).await.map_err(Into::into)
}

async fn run_server(cmd: ServeCommand, config: Arc<AppConfig>) -> Result<()> {
    let pool = setup_pool().await?;
    ensure_migrations(&pool, cmd.allow_dirty).await?;
    let content = ContentStore::new(&config.uploads_dir);
    content.ensure_root().await?;
    let chatbot = ChatbotClient::new(config.chatbot_url.clone());
    let state = AppState {
        pool,
        config: config.clone(),
        content: Arc::new(content),
        chatbot: Arc::new(chatbot),
    };
    http::serve((&cmd).into(), state).await
}

async fn ensure_migrations(pool: &DbPool, allow_dirty: bool) -> Result<()> {
    let pending = Migrator::get_pending_migrations(pool).await?;
    if !pending.is_empty() && !allow_dirty {
        anyhow::bail!(
            "pending migrations detected; run `cargo run -p server -- migrate up` or pass --allow-dirty"
        );
    }
    Ok(())
}

async fn migrate_up() -> Result<()> {
    let pool = setup_pool().await?;
    Migrator::up(&pool, None).await?;
    info!("database migrations applied");
    Ok(())
}

async fn migrate_down() -> Result<()> {
    let pool = setup_pool().await?;
    Migrator::down(&pool, Some(1)).await?;
    info!("most recent migration rolled back");
    Ok(())
}

async fn run_seed() -> Result<()> {
    let pool = setup_pool().await?;
    let existing = user::Entity::find()
        .filter(user::Column::Username.eq("admin"))
        .one(&pool)
        .await?;
    if existing.is_some() {
        info!("admin account already present; nothing to seed");
        return Ok(());
    }
    let password = std::env::var("SEED_ADMIN_PASSWORD").unwrap_or_else(|_| "admin".into());
    let password_hash = hash_password(&password)?;
    let user_id = Uuid::new_v4();
    let now = Utc::now();
    let txn = pool.begin().await?;
    user::ActiveModel {
        id: Set(user_id),
        username: Set("admin".into()),
        display_name: Set("Administrator".into()),
        role: Set(user::Role::Admin),
        avatar_url: Set(None),
        is_active: Set(true),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&txn)
    .await?;
    user_secret::ActiveModel {
        user_id: Set(user_id),
        password_hash: Set(password_hash),
        updated_at: Set(now.into()),
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;
    info!(%user_id, "seeded admin account");
    Ok(())
}
