//! Application state for the PDF API

use std::time::Duration;

use anyhow::Result;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::auth::password::hash_password;
use crate::config::{AdminSeed, Config};
use crate::geo::GeoResolver;
use crate::history::HistoryStore;
use crate::users::{NewUser, UserStore};
use shared_types::Role;

pub struct AppState {
    pub db: SqlitePool,
    pub config: Config,
    pub geo: GeoResolver,
    pub history: HistoryStore,
    pub users: UserStore,
}

impl AppState {
    pub async fn new(config: Config) -> Result<Self> {
        let pool = connect(&config.database_url).await?;

        let geo = match &config.geoip_database_path {
            Some(path) => GeoResolver::open(path),
            None => {
                tracing::info!("GEOIP_DATABASE_PATH not set, geolocation disabled");
                GeoResolver::disabled()
            }
        };

        let state = Self::from_parts(pool, config, geo);
        if let Some(seed) = state.config.admin_seed.clone() {
            state.seed_admin(&seed).await?;
        }
        Ok(state)
    }

    /// Assemble state around an already-migrated pool
    pub fn from_parts(db: SqlitePool, config: Config, geo: GeoResolver) -> Self {
        Self {
            history: HistoryStore::new(db.clone()),
            users: UserStore::new(db.clone()),
            db,
            config,
            geo,
        }
    }

    async fn seed_admin(&self, seed: &AdminSeed) -> Result<()> {
        if self.users.find_by_email(&seed.email).await?.is_some() {
            return Ok(());
        }
        let password_hash = hash_password(&seed.password)?;
        let admin = self
            .users
            .create(NewUser {
                first_name: "Admin".into(),
                last_name: String::new(),
                email: seed.email.clone(),
                password_hash,
                role: Role::Admin,
            })
            .await?;
        tracing::info!(user_id = admin.id, "Created admin account {}", admin.email);
        Ok(())
    }
}

/// Open the pool and bring the schema up to date.
///
/// An in-memory database lives only as long as its connection, so it gets a
/// single connection that is never recycled.
pub async fn connect(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    tracing::info!("Connecting to database: {}", database_url);

    let options = if is_in_memory(database_url) {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(5)
    };
    let pool = options
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url)
        .await?;

    run_migrations(&pool).await?;
    Ok(pool)
}

fn is_in_memory(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}

pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    tracing::info!("Running database migrations...");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            role TEXT NOT NULL DEFAULT 'USER',
            enabled BOOLEAN NOT NULL DEFAULT 1
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS pdf_operation_history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES users(id),
            operation_type TEXT NOT NULL,
            timestamp TEXT NOT NULL,
            source_type TEXT NOT NULL,
            ip_address TEXT,
            country TEXT,
            state TEXT,
            user_agent TEXT,
            request_details TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Listings sort by timestamp
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_history_timestamp ON pdf_operation_history(timestamp)
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Migrations complete");
    Ok(())
}

/// Single-connection in-memory database with the schema applied
#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    connect("sqlite::memory:").await.unwrap()
}
