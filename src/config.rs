use anyhow::{bail, Context, Result};
use base64::Engine;
use serde::Deserialize;

/// Recognition model requested on the `/v1/recognize` endpoint.
pub const MODEL: &str = "en-US_BroadbandModel";

/// Username component of the HTTP Basic credentials pair.
const BASIC_AUTH_USER: &str = "apikey";

#[derive(Debug, Deserialize)]
pub struct Config {
    pub auth: AuthConfig,
}

#[derive(Debug, Deserialize)]
pub struct AuthConfig {
    pub region: Region,
    pub apikey: String,
}

/// Service regions and their fixed API hostnames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Region {
    UsEast,
    UsSouth,
    EuGb,
    EuDe,
    AuSyd,
    JpTok,
}

impl Region {
    pub fn hostname(&self) -> &'static str {
        match self {
            Region::UsEast => "api.us-east.speech-to-text.watson.cloud.ibm.com",
            Region::UsSouth => "api.us-south.speech-to-text.watson.cloud.ibm.com",
            Region::EuGb => "api.eu-gb.speech-to-text.watson.cloud.ibm.com",
            Region::EuDe => "api.eu-de.speech-to-text.watson.cloud.ibm.com",
            Region::AuSyd => "api.au-syd.speech-to-text.watson.cloud.ibm.com",
            Region::JpTok => "api.jp-tok.speech-to-text.watson.cloud.ibm.com",
        }
    }
}

impl Config {
    /// Load credentials from an INI file with an `[auth]` section holding
    /// `region` and `apikey`.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::new(path, config::FileFormat::Ini))
            .build()
            .with_context(|| format!("Failed to read credentials file {path}"))?;

        let cfg: Config = settings
            .try_deserialize()
            .with_context(|| format!("Invalid credentials in {path}"))?;

        if cfg.auth.apikey.trim().is_empty() {
            bail!("apikey in {path} is empty");
        }

        Ok(cfg)
    }

    /// WebSocket URL of the streaming recognition endpoint.
    pub fn recognize_url(&self) -> String {
        format!(
            "wss://{}/v1/recognize?model={}",
            self.auth.region.hostname(),
            MODEL
        )
    }

    /// `Authorization` header value for the connection handshake.
    pub fn authorization_header(&self) -> String {
        let userpass = format!("{}:{}", BASIC_AUTH_USER, self.auth.apikey);
        format!(
            "Basic {}",
            base64::engine::general_purpose::STANDARD.encode(userpass)
        )
    }
}
