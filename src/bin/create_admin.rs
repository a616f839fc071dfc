//! Create or reset the admin account.
//!
//! Reads `ADMIN_EMAIL` / `ADMIN_PASSWORD` (defaults `admin@example.com` /
//! `admin123`) and upserts an ADMIN user with an Argon2id hash.

use portfolio_api::auth::{Argon2Hasher, PgUserStore, UserResponse, UserRole, UserStore};
use portfolio_api::config::{DatabaseConfig, HashingConfig};
use portfolio_api::db;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,portfolio_api=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let email = std::env::var("ADMIN_EMAIL").unwrap_or_else(|_| "admin@example.com".to_string());
    let password = std::env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "admin123".to_string());

    let hasher = Argon2Hasher::new(&HashingConfig::from_env()?)?;
    let password_hash = hasher.hash_password(&password)?;

    let pool = db::connect(&DatabaseConfig::from_env()?).await?;
    db::run_migrations(&pool).await?;

    let result = PgUserStore::new(pool.clone())
        .upsert_user(&email, &password_hash, UserRole::Admin)
        .await;
    pool.close().await;

    let admin = UserResponse::from(result?);
    println!("Admin user created: {}", serde_json::to_string_pretty(&admin)?);

    Ok(())
}
