use std::{env, path::PathBuf, str::FromStr};

use crate::{
    constants::{
        DEFAULT_MAX_CONNECTIONS, DEFAULT_MEDIA_ROOT, DEFAULT_MEDIA_URL,
        DEFAULT_SESSION_LIFETIME_HOURS,
    },
    error::Error,
    images::MediaStore,
    jwt::SessionKeys,
};

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
    pub secret_key: String,
    pub session_lifetime_hours: i64,
    pub media_root: PathBuf,
    pub media_url: String,
}

fn required(key: &str) -> Result<String, Error> {
    env::var(key).map_err(|_| Error::Config(format!("{key} must be set")))
}

fn parsed_or<T: FromStr>(key: &str, default: T) -> Result<T, Error> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("{key} has an invalid value"))),
        Err(_) => Ok(default),
    }
}

impl Config {
    /// Reads the process environment, after loading `.env` when one exists.
    pub fn from_env() -> Result<Self, Error> {
        if let Err(e) = dotenvy::dotenv() {
            log::trace!("No .env file loaded: {e}");
        }

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            max_connections: parsed_or("DATABASE_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS)?,
            secret_key: required("SECRET_KEY")?,
            session_lifetime_hours: parsed_or(
                "SESSION_LIFETIME_HOURS",
                DEFAULT_SESSION_LIFETIME_HOURS,
            )?,
            media_root: env::var("MEDIA_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_MEDIA_ROOT)),
            media_url: env::var("MEDIA_URL").unwrap_or_else(|_| DEFAULT_MEDIA_URL.to_string()),
        })
    }

    pub fn session_keys(&self) -> Result<SessionKeys, Error> {
        SessionKeys::new(self.secret_key.as_bytes(), self.session_lifetime_hours)
    }

    pub fn media_store(&self) -> MediaStore {
        MediaStore::new(&self.media_root, &self.media_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_collaborators() {
        let config = Config {
            database_url: "postgres://localhost/foodgram".into(),
            max_connections: 2,
            secret_key: "secret".into(),
            session_lifetime_hours: 2,
            media_root: PathBuf::from("/tmp/media"),
            media_url: "/media".into(),
        };

        assert!(config.session_keys().is_ok());
        let store = config.media_store();
        assert_eq!(store.url("recipes/a.png"), "/media/recipes/a.png");
        assert_eq!(store.root(), PathBuf::from("/tmp/media").as_path());
    }

    #[test]
    fn unset_numbers_use_defaults() {
        assert_eq!(
            parsed_or("FOODGRAM_TEST_SURELY_UNSET_VARIABLE", 17u32).unwrap(),
            17
        );
    }
}
