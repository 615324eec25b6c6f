use anyhow::{Context, Result};
use std::str::FromStr;

pub struct AppConfig {
    pub database: DatabaseConfig,
    pub storage: StorageKind,
    pub rsvp: RsvpConfig,
    pub server: ServerConfig,
}

impl AppConfig {
    pub fn new() -> Result<Self> {
        let storage = match std::env::var("APP_STORAGE") {
            Ok(v) => v.parse()?,
            Err(_) => StorageKind::Postgres,
        };
        let database = match storage {
            StorageKind::Postgres => DatabaseConfig {
                host: std::env::var("DATABASE_HOST")?,
                port: std::env::var("DATABASE_PORT")?
                    .parse()
                    .context("DATABASE_PORT must be a port number")?,
                username: std::env::var("DATABASE_USERNAME")?,
                password: std::env::var("DATABASE_PASSWORD")?,
                database: std::env::var("DATABASE_NAME")?,
            },
            // インメモリで動かす場合、接続情報は使われない
            StorageKind::Memory => DatabaseConfig::default(),
        };
        let rsvp = RsvpConfig {
            max_conflict_retries: env_or("RSVP_MAX_CONFLICT_RETRIES", 5)?,
        };
        let server = ServerConfig {
            port: env_or("HTTP_PORT", 8080)?,
        };
        Ok(Self {
            database,
            storage,
            rsvp,
            server,
        })
    }
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(v) => v.parse().with_context(|| format!("invalid value for {key}")),
        Err(_) => Ok(default),
    }
}

#[derive(Default)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Postgres,
    Memory,
}

impl FromStr for StorageKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "postgres" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => anyhow::bail!("unknown APP_STORAGE: {other}"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RsvpConfig {
    // シリアライズ失敗などの競合時に、参加登録処理を何回までやり直すか
    pub max_conflict_retries: u32,
}

impl Default for RsvpConfig {
    fn default() -> Self {
        Self {
            max_conflict_retries: 5,
        }
    }
}

pub struct ServerConfig {
    pub port: u16,
}
