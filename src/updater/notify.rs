use super::config::TelegramCfg;
use super::errors::{Result, UpdateError};
use async_trait::async_trait;
use log::{info, warn};
use std::sync::{Arc, Mutex};
use url::Url;

/// A destination for status messages besides the log.
#[async_trait]
pub trait NotifySink: Send + Sync {
    fn name(&self) -> &str;
    async fn send(&self, text: &str) -> Result<()>;
}

/// Writes every message to the log and forwards it to the configured sinks.
/// Delivery problems are logged and otherwise ignored.
#[derive(Default)]
pub struct Notifier {
    sinks: Vec<Box<dyn NotifySink>>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(telegram: Option<&TelegramCfg>, client: reqwest::Client) -> Self {
        let mut notifier = Self::new();
        if let Some(cfg) = telegram {
            notifier.add_sink(TelegramSink::new(cfg.clone(), client));
        }
        notifier
    }

    pub fn add_sink(&mut self, sink: impl NotifySink + 'static) {
        self.sinks.push(Box::new(sink));
    }

    pub async fn notify(&self, text: &str) {
        info!("{text}");
        for sink in &self.sinks {
            if let Err(error) = sink.send(text).await {
                warn!("could not deliver notification via {}: {error}", sink.name());
            }
        }
    }
}

/// Sends messages through the Telegram bot API.
pub struct TelegramSink {
    cfg: TelegramCfg,
    client: reqwest::Client,
}

impl TelegramSink {
    pub fn new(cfg: TelegramCfg, client: reqwest::Client) -> Self {
        Self { cfg, client }
    }

    pub fn send_message_url(&self, text: &str) -> Result<Url> {
        let mut url = Url::parse(&self.cfg.api_base)?;
        url.path_segments_mut()
            .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .push(&format!("bot{}", self.cfg.token))
            .push("sendMessage");
        url.query_pairs_mut()
            .append_pair("chat_id", &self.cfg.chat_id.to_string())
            .append_pair("text", text);
        Ok(url)
    }
}

#[async_trait]
impl NotifySink for TelegramSink {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn send(&self, text: &str) -> Result<()> {
        let response = self.client.get(self.send_message_url(text)?).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(UpdateError::Status {
                endpoint: "telegram sendMessage".to_string(),
                status,
                body: response.text().await.unwrap_or_default(),
            });
        }
        Ok(())
    }
}

/// Keeps messages in memory; clones share the same buffer.
#[doc(hidden)]
#[derive(Default, Clone)]
pub struct MemorySink {
    messages: Arc<Mutex<Vec<String>>>,
}

impl MemorySink {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().map(|m| m.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl NotifySink for MemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    async fn send(&self, text: &str) -> Result<()> {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(text.to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::updater::config::ChatId;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn telegram(api_base: String) -> TelegramCfg {
        TelegramCfg {
            token: "123:abc".to_string(),
            chat_id: ChatId::Id(-42),
            api_base,
        }
    }

    #[test]
    fn reserved_characters_are_encoded() {
        let sink = TelegramSink::new(telegram("https://api.telegram.org".into()), reqwest::Client::new());

        let url = sink.send_message_url("a&b=c %20 #x").unwrap();

        assert_eq!(url.path(), "/bot123:abc/sendMessage");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("chat_id".to_string(), "-42".to_string()),
                ("text".to_string(), "a&b=c %20 #x".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn message_with_reserved_and_unicode_text_arrives_intact() {
        let server = MockServer::start().await;
        let text = "Updated 50% & reloaded: Grüße ✅";
        Mock::given(method("GET"))
            .and(path("/bot123:abc/sendMessage"))
            .and(query_param("chat_id", "-42"))
            .and(query_param("text", text))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let sink = TelegramSink::new(telegram(server.uri()), reqwest::Client::new());
        sink.send(text).await.unwrap();
    }

    #[tokio::test]
    async fn rejected_message_is_an_error_for_the_sink() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
            .mount(&server)
            .await;

        let sink = TelegramSink::new(telegram(server.uri()), reqwest::Client::new());
        let err = sink.send("hello").await.unwrap_err();
        assert!(matches!(err, UpdateError::Status { ref body, .. } if body == "Unauthorized"));
    }

    #[tokio::test]
    async fn failing_sink_does_not_stop_the_others() {
        let memory = MemorySink::default();
        let mut notifier = Notifier::new();
        // nothing listens on port 9 of the loopback interface
        notifier.add_sink(TelegramSink::new(
            telegram("http://127.0.0.1:9".into()),
            reqwest::Client::new(),
        ));
        notifier.add_sink(memory.clone());

        notifier.notify("still delivered").await;

        assert_eq!(memory.messages(), vec!["still delivered".to_string()]);
    }
}
