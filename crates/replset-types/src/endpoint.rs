//! Store node endpoints parsed from connection strings

use crate::error::{CommonError, Result};
use serde::{Deserialize, Serialize};
use url::Url;

/// Port a store node listens on when the connection string names none
pub const DEFAULT_STORE_PORT: u16 = 27017;

/// CA bundle handed to the shell client when TLS is enabled
pub const SYSTEM_CA_BUNDLE: &str = "/etc/ssl/certs/ca-certificates.crt";

/// TLS settings carried in the connection string query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TlsMode {
    Disabled,
    Verified,
    /// TLS without certificate verification (`x-sslVerify=false`)
    Unverified,
}

/// A store node endpoint with credentials and TLS options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeEndpoint {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
    pub tls: TlsMode,
}

impl NodeEndpoint {
    /// Parse `mongodb://[user[:pass]@]host[:port][/db][?ssl=true&x-sslVerify=false]`.
    ///
    /// The `uri.`-prefixed query keys used by older deployments are accepted too.
    pub fn parse(connection_string: &str) -> Result<Self> {
        let url = Url::parse(connection_string)?;

        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| CommonError::validation("URL must include hostname"))?
            .to_string();

        let username = Some(url.username())
            .filter(|u| !u.is_empty())
            .map(str::to_string);
        let password = url.password().map(str::to_string);
        let database = Some(url.path().trim_start_matches('/'))
            .filter(|db| !db.is_empty())
            .map(str::to_string);

        let mut use_tls = false;
        let mut verify_tls = true;
        for (key, value) in url.query_pairs() {
            match key.trim_start_matches("uri.") {
                "ssl" if value == "true" => use_tls = true,
                "x-sslVerify" if value == "false" => verify_tls = false,
                _ => {}
            }
        }

        let tls = match (use_tls, verify_tls) {
            (false, _) => TlsMode::Disabled,
            (true, true) => TlsMode::Verified,
            (true, false) => TlsMode::Unverified,
        };

        Ok(Self {
            host,
            port: url.port().unwrap_or(DEFAULT_STORE_PORT),
            username,
            password,
            database,
            tls,
        })
    }

    /// `host:port` address used to reach the node
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Options for the store's shell client connecting to this endpoint
    pub fn shell_options(&self) -> Vec<String> {
        let mut options = vec![
            "--host".to_string(),
            self.host.clone(),
            "--port".to_string(),
            self.port.to_string(),
        ];

        if let Some(username) = &self.username {
            options.extend(["--username".to_string(), username.clone()]);
        }
        if let Some(password) = &self.password {
            options.extend(["--password".to_string(), password.clone()]);
        }

        if self.tls != TlsMode::Disabled {
            options.extend([
                "--ssl".to_string(),
                "--sslCAFile".to_string(),
                SYSTEM_CA_BUNDLE.to_string(),
            ]);
            if self.tls == TlsMode::Unverified {
                options.push("--sslAllowInvalidCertificates".to_string());
            }
        }

        options
    }
}
