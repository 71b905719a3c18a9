//! Microsoft Graph `sendMail` delivery.
//!
//! Authenticates with the OAuth2 client-credentials grant and posts each
//! message on behalf of its sender. Tokens are cached until shortly before
//! they expire.

use crate::config::GraphCredentials;
use crate::delivery::{DeliveryClient, DeliveryError};
use crate::smtp::{ContentKind, Message};

use async_trait::async_trait;
use reqwest::Url;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

const GRAPH_SCOPE: &str = "https://graph.microsoft.com/.default";

/// Upper bound on each token and `sendMail` request
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Tokens are refreshed this long before the issuer says they expire.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Base URLs of the identity platform and the Graph API
#[derive(Debug, Clone)]
pub struct GraphEndpoints {
    pub authority: String,
    pub graph: String,
}

impl Default for GraphEndpoints {
    fn default() -> Self {
        Self {
            authority: "https://login.microsoftonline.com".to_string(),
            graph: "https://graph.microsoft.com".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug)]
struct CachedToken {
    value: String,
    expires_at: Instant,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendMailRequest<'a> {
    message: GraphMessage<'a>,
    save_to_sent_items: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GraphMessage<'a> {
    subject: &'a str,
    body: ItemBody<'a>,
    from: Recipient<'a>,
    to_recipients: Vec<Recipient<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ItemBody<'a> {
    content_type: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Recipient<'a> {
    email_address: EmailAddress<'a>,
}

#[derive(Debug, Serialize)]
struct EmailAddress<'a> {
    address: &'a str,
}

impl<'a> Recipient<'a> {
    fn new(address: &'a str) -> Self {
        Self {
            email_address: EmailAddress { address },
        }
    }
}

impl<'a> From<&'a Message> for SendMailRequest<'a> {
    fn from(message: &'a Message) -> Self {
        let content_type = match message.kind {
            ContentKind::PlainText => "Text",
            ContentKind::Html => "HTML",
        };

        Self {
            message: GraphMessage {
                subject: &message.subject,
                body: ItemBody {
                    content_type,
                    content: &message.body,
                },
                from: Recipient::new(&message.from),
                to_recipients: message.to.iter().map(|addr| Recipient::new(addr)).collect(),
            },
            save_to_sent_items: false,
        }
    }
}

/// Sends messages through the Graph API as the envelope sender
pub struct GraphClient {
    http: reqwest::Client,
    credentials: GraphCredentials,
    endpoints: GraphEndpoints,
    token: Mutex<Option<CachedToken>>,
}

impl GraphClient {
    pub fn new(credentials: GraphCredentials) -> Result<Self, DeliveryError> {
        Self::with_endpoints(credentials, GraphEndpoints::default())
    }

    pub fn with_endpoints(
        credentials: GraphCredentials,
        endpoints: GraphEndpoints,
    ) -> Result<Self, DeliveryError> {
        Self::with_timeout(credentials, endpoints, REQUEST_TIMEOUT)
    }

    /// Build a client whose HTTP requests give up after `timeout`
    pub fn with_timeout(
        credentials: GraphCredentials,
        endpoints: GraphEndpoints,
        timeout: Duration,
    ) -> Result<Self, DeliveryError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            credentials,
            endpoints,
            token: Mutex::new(None),
        })
    }

    fn token_url(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.endpoints.authority.trim_end_matches('/'),
            self.credentials.tenant_id
        )
    }

    /// `{graph}/v1.0/users/{sender}/sendMail`, with the sender encoded as one
    /// path segment
    fn send_mail_url(&self, sender: &str) -> Result<Url, DeliveryError> {
        // Url drops tabs and newlines before resolving dot segments
        if matches!(sender, "" | "." | "..") || sender.chars().any(char::is_control) {
            return Err(DeliveryError::InvalidSender(sender.to_string()));
        }

        let invalid = |reason: String| DeliveryError::InvalidEndpoint {
            url: self.endpoints.graph.clone(),
            reason,
        };

        let mut url = Url::parse(&self.endpoints.graph).map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| invalid("cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(["v1.0", "users", sender, "sendMail"]);

        Ok(url)
    }

    /// Return a valid access token, requesting a new one when needed
    async fn access_token(&self) -> Result<String, DeliveryError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.expires_at {
                return Ok(token.value.clone());
            }
        }

        tracing::debug!(tenant = %self.credentials.tenant_id, "Requesting Graph access token");

        let response = self
            .http
            .post(self.token_url())
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.credentials.client_id.as_str()),
                ("client_secret", self.credentials.client_secret.expose_secret()),
                ("scope", GRAPH_SCOPE),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Token(format!("{status}: {body}")));
        }

        let token: TokenResponse = response.json().await?;
        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_EXPIRY_MARGIN);
        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });

        Ok(token.access_token)
    }
}

#[async_trait]
impl DeliveryClient for GraphClient {
    async fn send_message(&self, message: &Message) -> Result<(), DeliveryError> {
        let url = self.send_mail_url(&message.from)?;
        let token = self.access_token().await?;

        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(&SendMailRequest::from(message))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}
