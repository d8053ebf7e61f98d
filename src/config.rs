use std::{env, path::PathBuf, str::FromStr};

use tracing::warn;

use crate::{models::images::UploadLimits, Error, Result};

const DEV_SESSION_SECRET: &str = "school-website-secret-key-change-this-in-production";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub session_secret: String,
    pub session_max_age_hours: i64,
    pub port: u16,
    pub production: bool,
    pub upload_dir: PathBuf,
    pub public_upload_dir: PathBuf,
    pub upload_limits: UploadLimits,
}

impl Config {
    pub fn init() -> Result<Config> {
        let database_url =
            env::var("DATABASE_URL").map_err(|_| Error::Config("DATABASE_URL must be set".into()))?;
        let production = env::var("APP_ENV").is_ok_and(|value| value == "production");

        let session_secret = match env::var("SESSION_SECRET") {
            Ok(secret) if !secret.is_empty() => secret,
            _ if production => {
                return Err(Error::Config(
                    "SESSION_SECRET must be set in production".into(),
                ))
            }
            _ => {
                warn!("SESSION_SECRET not set, using the development secret");
                DEV_SESSION_SECRET.to_string()
            }
        };

        Ok(Config {
            database_url,
            database_max_connections: parse_or("DATABASE_MAX_CONNECTIONS", 10)?,
            session_secret,
            session_max_age_hours: parse_or("SESSION_MAX_AGE_HOURS", 24)?,
            port: parse_or("PORT", 3000)?,
            production,
            upload_dir: PathBuf::from(env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".into())),
            public_upload_dir: PathBuf::from(
                env::var("PUBLIC_UPLOAD_DIR").unwrap_or_else(|_| "public/uploads".into()),
            ),
            upload_limits: UploadLimits {
                max_files: parse_or("UPLOAD_MAX_FILES", UploadLimits::default().max_files)?,
                max_file_size: parse_or(
                    "UPLOAD_MAX_FILE_SIZE",
                    UploadLimits::default().max_file_size,
                )?,
                allow_gif: parse_or("UPLOAD_ALLOW_GIF", false)?,
            },
        })
    }
}

fn parse_or<T: FromStr>(key: &str, default: T) -> Result<T> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("{key} has an invalid value: {raw}"))),
        Err(_) => Ok(default),
    }
}
