//! Pooled SQLite connection

use crate::config::Settings;
use di::{Ref, inject, injectable};
use log::{error, info};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::ops::{Deref, DerefMut};
use std::str::FromStr;

pub struct DatabaseConnection {
    connection: SqlitePool,
}

#[injectable]
impl DatabaseConnection {
    #[inject]
    pub fn create(settings: Ref<Settings>) -> DatabaseConnection {
        let pool = match SqliteConnectOptions::from_str(&settings.database_url) {
            Ok(options) => SqlitePoolOptions::new()
                .max_connections(5)
                .connect_lazy_with(options.foreign_keys(true)),
            Err(e) => {
                error!(
                    "invalid DATABASE_URL {:?} ({e}), using an in-memory database",
                    settings.database_url
                );
                // every connection to :memory: is its own database, so keep exactly one alive
                SqlitePoolOptions::new()
                    .max_connections(1)
                    .idle_timeout(None)
                    .max_lifetime(None)
                    .connect_lazy_with(SqliteConnectOptions::new().in_memory(true).foreign_keys(true))
            }
        };

        DatabaseConnection { connection: pool }
    }
}

impl DatabaseConnection {
    /// Wraps an already opened pool.
    pub fn from_pool(pool: SqlitePool) -> DatabaseConnection {
        DatabaseConnection { connection: pool }
    }

    /// Applies the embedded schema migrations.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!().run(&self.connection).await?;
        info!("database schema is up to date");
        Ok(())
    }
}

impl Deref for DatabaseConnection {
    type Target = SqlitePool;

    fn deref(&self) -> &Self::Target {
        &self.connection
    }
}

impl DerefMut for DatabaseConnection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.connection
    }
}
