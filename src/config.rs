use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::crypto::Issuer;
use crate::schema::{OwnershipPolicy, Variant};
use crate::{Error, Result};

pub const DEV_TOKEN_SECRET : &[u8] = b"super-secret";
pub const DEFAULT_SERVER_NAME : &str = "link-feed";

const DAYS : u64 = 60 * 60 * 24;

#[derive(Debug, Clone)]
pub struct Config {
    pub database :     PathBuf,
    pub addr :         SocketAddr,
    pub server_name :  String,
    pub token_secret : Vec<u8>,
    pub token_ttl :    Duration,
    pub variant :      Variant,
    pub ownership :    OwnershipPolicy,
}

impl Config {
    /// Reads `LINK_FEED_*` variables. Call `dotenvy::dotenv()` first to pick
    /// up a `.env` file.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup : F) -> Result<Self>
    where
        F : Fn(&str) -> Option<String>,
    {
        let database = lookup("LINK_FEED_DATABASE")
            .unwrap_or_else(|| "links.sqlite3".to_string())
            .into();

        let addr = lookup("LINK_FEED_ADDR")
            .unwrap_or_else(|| "127.0.0.1:4000".to_string())
            .parse()?;

        let server_name = lookup("LINK_FEED_SERVER_NAME")
            .unwrap_or_else(|| DEFAULT_SERVER_NAME.to_string());

        let token_secret = match lookup("LINK_FEED_TOKEN_SECRET") {
            Some(s) if !s.is_empty() => s.into_bytes(),
            _ => {
                tracing::warn!(
                    "LINK_FEED_TOKEN_SECRET not set, using the development secret"
                );
                DEV_TOKEN_SECRET.to_vec()
            },
        };

        let token_ttl = match lookup("LINK_FEED_TOKEN_DAYS") {
            Some(s) => {
                let days : u64 = s.parse().map_err(|_| {
                    Error::Config(format!("LINK_FEED_TOKEN_DAYS: {:?}", s))
                })?;
                Duration::from_secs(
                    days.checked_mul(DAYS)
                        .ok_or(Error::TokenDurationTooBig)?,
                )
            },
            None => Duration::from_secs(DAYS * 30),
        };

        let variant = match lookup("LINK_FEED_AUTH").as_deref() {
            None | Some("required") => Variant::Authenticated,
            Some("anonymous") => Variant::Unauthenticated,
            Some(other) => {
                return Err(Error::Config(format!("LINK_FEED_AUTH: {:?}", other)))
            },
        };

        let ownership = match lookup("LINK_FEED_OWNERSHIP").as_deref() {
            None | Some("any") => OwnershipPolicy::AnyAuthenticated,
            Some("owner") => OwnershipPolicy::OwnerOnly,
            Some(other) => {
                return Err(Error::Config(format!(
                    "LINK_FEED_OWNERSHIP: {:?}",
                    other
                )))
            },
        };

        Ok(Self {
            database,
            addr,
            server_name,
            token_secret,
            token_ttl,
            variant,
            ownership,
        })
    }

    pub fn issuer(&self) -> Issuer {
        Issuer {
            server_name : self.server_name.clone(),
            secret :      self.token_secret.clone(),
            ttl :         self.token_ttl,
        }
    }
}
