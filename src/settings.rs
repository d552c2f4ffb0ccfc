//! Service settings. Defaults are built in, then `settings.toml` (optional),
//! then `SPLITLEDGER__*` environment variables, e.g.
//! `SPLITLEDGER__STORAGE__KIND=mongo` or `SPLITLEDGER__AUTH__SECRET=...`.
use config::{builder::DefaultState, Config, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Http {
    pub host: String,
    pub port: u16,
}

fn default_database() -> String {
    "splitledger".to_string()
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Storage {
    Memory,
    Mongo {
        uri: String,
        #[serde(default = "default_database")]
        database: String,
    },
}

#[derive(Debug, Deserialize)]
pub struct Auth {
    pub secret: String,
}

#[derive(Debug, Deserialize)]
pub struct Log {
    pub level: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct Cors {
    pub allowed_origin: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub http: Http,
    pub storage: Storage,
    pub auth: Auth,
    pub log: Log,
    #[serde(default)]
    pub cors: Cors,
}

impl Settings {
    fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("http.host", "0.0.0.0")?
            .set_default("http.port", 8080)?
            .set_default("storage.kind", "memory")?
            .set_default("log.level", "info")
    }

    pub fn new() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let settings = Self::defaults()?
            .add_source(File::with_name("settings").required(false))
            .add_source(
                Environment::with_prefix("SPLITLEDGER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_need_only_a_secret() {
        let settings: Settings = Settings::defaults()
            .unwrap()
            .set_override("auth.secret", "s3cret")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(settings.http.port, 8080);
        assert_eq!(settings.storage, Storage::Memory);
        assert_eq!(settings.log.level, "info");
        assert!(settings.cors.allowed_origin.is_none());
    }

    #[test]
    fn mongo_storage_defaults_database_name() {
        let settings: Settings = Settings::defaults()
            .unwrap()
            .set_override("auth.secret", "s3cret")
            .unwrap()
            .set_override("storage.kind", "mongo")
            .unwrap()
            .set_override("storage.uri", "mongodb://localhost:27017")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(
            settings.storage,
            Storage::Mongo {
                uri: "mongodb://localhost:27017".into(),
                database: "splitledger".into(),
            }
        );
    }

    #[test]
    fn missing_secret_is_an_error() {
        let result = Settings::defaults()
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize::<Settings>();
        assert!(result.is_err());
    }
}
