use super::errors::{Result, UpdateError};
use super::repo_config::{ApiCfg, BotCfg, VerifySsl};
use log::info;
use reqwest::{Certificate, StatusCode};
use url::Url;

const RELOAD_PATH: &str = "api/v1/reload_config";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// Neither the bot nor the process declares an endpoint.
    NoEndpoint,
    Reloaded(StatusCode),
}

/// Asks running bots to re-read their configuration.
#[derive(Debug, Clone, Default)]
pub struct ReloadClient {
    default_api: Option<ApiCfg>,
}

pub fn reload_url(address: &str) -> Result<Url> {
    let base = format!("{}/", address.trim_end_matches('/'));
    Ok(Url::parse(&base)?.join(RELOAD_PATH)?)
}

fn http_client(api: &ApiCfg) -> Result<reqwest::Client> {
    let builder = reqwest::Client::builder();
    let builder = match &api.verify_ssl {
        VerifySsl::Enabled(verify) => builder.danger_accept_invalid_certs(!verify),
        VerifySsl::CaBundle(path) => {
            let pem = std::fs::read(path)?;
            builder.add_root_certificate(Certificate::from_pem(&pem)?)
        }
    };
    Ok(builder.build()?)
}

impl ReloadClient {
    pub fn new(default_api: Option<ApiCfg>) -> Self {
        Self { default_api }
    }

    pub fn endpoint_for<'a>(&'a self, bot: &'a BotCfg) -> Option<&'a ApiCfg> {
        bot.api.as_ref().or(self.default_api.as_ref())
    }

    /// One authenticated POST, no retry. A non-2xx answer is an error.
    pub async fn reload(&self, bot: &BotCfg) -> Result<ReloadOutcome> {
        let Some(api) = self.endpoint_for(bot) else {
            return Ok(ReloadOutcome::NoEndpoint);
        };
        let endpoint = reload_url(&api.address)?;
        info!("Reloading config {endpoint}");

        let response = http_client(api)?
            .post(endpoint.clone())
            .basic_auth(&api.user, Some(&api.pass))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(UpdateError::Status {
                endpoint: endpoint.to_string(),
                status,
                body: body.trim().to_string(),
            });
        }

        info!("{} answered {status}: {}", bot.name, body.trim());
        Ok(ReloadOutcome::Reloaded(status))
    }
}
