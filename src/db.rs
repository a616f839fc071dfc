//! Database Lifecycle
//!
//! Pool construction and idempotent schema setup. The pool is created once in
//! the binary, injected into the stores, and closed on shutdown.

use crate::config::DatabaseConfig;

use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;

/// Create a database connection pool
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&config.url)
        .await?;

    tracing::info!(max_connections = config.max_connections, "Database pool created");
    Ok(pool)
}

/// Create enum types, tables and indexes if they do not exist yet
///
/// Primary keys default to `gen_random_uuid()`, which is built in from
/// PostgreSQL 13. Older servers need the `pgcrypto` extension installed first.
pub async fn run_migrations(db: &PgPool) -> Result<(), sqlx::Error> {
    tracing::info!("Running database migrations");

    // Create user role enum
    sqlx::query(
        r#"
        DO $$ BEGIN
            CREATE TYPE user_role AS ENUM ('ADMIN', 'USER');
        EXCEPTION
            WHEN duplicate_object THEN null;
        END $$;
        "#,
    )
    .execute(db)
    .await?;

    // Create project category enum
    sqlx::query(
        r#"
        DO $$ BEGIN
            CREATE TYPE project_category AS ENUM (
                'DEFAULT', 'FULL_STACK', 'FRONT_END', 'BACK_END', 'MOBILE', 'GAME'
            );
        EXCEPTION
            WHEN duplicate_object THEN null;
        END $$;
        "#,
    )
    .execute(db)
    .await?;

    // Token state lives on the user row so each check-and-mutate is one UPDATE
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            email VARCHAR(255) NOT NULL UNIQUE,
            password_hash VARCHAR(255) NOT NULL,
            role user_role NOT NULL DEFAULT 'USER',
            refresh_tokens TEXT[] NOT NULL DEFAULT '{}',
            used_token_ids UUID[] NOT NULL DEFAULT '{}',
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        );
        "#,
    )
    .execute(db)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS projects (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            title VARCHAR(255) NOT NULL,
            description TEXT NOT NULL,
            technologies TEXT[] NOT NULL DEFAULT '{}',
            image_url TEXT NOT NULL,
            live_url TEXT,
            github_url TEXT,
            featured BOOLEAN NOT NULL DEFAULT FALSE,
            importance INTEGER NOT NULL DEFAULT 0,
            category project_category NOT NULL DEFAULT 'DEFAULT',
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        );
        "#,
    )
    .execute(db)
    .await?;

    // Create indexes for project listings
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_projects_category ON projects(category);")
        .execute(db)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_projects_importance ON projects(importance);")
        .execute(db)
        .await?;

    tracing::info!("Database migrations completed successfully");
    Ok(())
}
