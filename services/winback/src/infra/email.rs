use std::time::Duration;

use anyhow::Context as _;

use crate::domain::repository::EmailGateway;
use crate::domain::types::{OutgoingEmail, SentEmail};
use crate::error::WinbackServiceError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Sends outbound email through the CRM's email integration endpoint.
#[derive(Clone)]
pub struct HttpEmailGateway {
    client: reqwest::Client,
    send_url: String,
}

impl HttpEmailGateway {
    pub fn new(send_url: String) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("build email http client")?;
        Ok(Self { client, send_url })
    }
}

impl EmailGateway for HttpEmailGateway {
    async fn send(&self, email: &OutgoingEmail) -> Result<SentEmail, WinbackServiceError> {
        let response = self
            .client
            .post(&self.send_url)
            .json(email)
            .send()
            .await
            .context("send email request")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("email integration returned {status}: {body}").into());
        }

        // The integration may answer with an empty body.
        Ok(response.json().await.unwrap_or_default())
    }
}
