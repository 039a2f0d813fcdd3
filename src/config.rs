use std::env;
use std::fmt::Display;
use std::str::FromStr;

use tracing::{info, warn};

pub struct Config {
    pub port: u16,
    pub mongo_uri: String,
    pub mongo_db: String,
    pub jwt_secret: String,
}

impl Config {
    pub fn load() -> Self {
        Self {
            port: try_load("EDULEARN_PORT", "5000"),
            mongo_uri: try_load("MONGO_URI", "mongodb://localhost:27017"),
            mongo_db: try_load("MONGO_DB", "edulearn"),
            jwt_secret: require("JWT_SECRET"),
        }
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where T::Err: Display {
    env::var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| {
            warn!("invalid {key} value: {e}");
        })
        .expect("environment misconfigured")
}

fn require(key: &str) -> String {
    env::var(key)
        .map_err(|_| {
            warn!("{key} is not set");
        })
        .expect("environment misconfigured")
}
