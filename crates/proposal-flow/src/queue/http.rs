use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use tracing::debug;

use super::{QueueClient, QueueError, QueueMessage};

/// Client for a queue exposing the `ReceiveMessage` / `SendMessage` / `DeleteMessage` form API.
#[derive(Debug, Clone)]
pub struct HttpQueueClient {
    client: Client,
    queue_url: String,
    request_grace: Duration,
}

impl HttpQueueClient {
    pub fn new(queue_url: impl Into<String>, request_grace: Duration) -> Result<Self, QueueError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(transport_error)?;

        Ok(Self {
            client,
            queue_url: queue_url.into(),
            request_grace,
        })
    }

    pub fn queue_url(&self) -> &str {
        &self.queue_url
    }
}

#[async_trait]
impl QueueClient for HttpQueueClient {
    async fn poll(
        &self,
        max_messages: u32,
        wait_time: Duration,
    ) -> Result<Vec<QueueMessage>, QueueError> {
        let max_messages = max_messages.to_string();
        let wait_seconds = wait_time.as_secs().to_string();

        let response = self
            .client
            .get(&self.queue_url)
            .query(&[
                ("Action", "ReceiveMessage"),
                ("MaxNumberOfMessages", max_messages.as_str()),
                ("WaitTimeSeconds", wait_seconds.as_str()),
            ])
            .timeout(wait_time + self.request_grace)
            .send()
            .await
            .map_err(transport_error)?;

        let body = successful_body(response).await?;
        let messages = parse_receive_response(&body)?;
        debug!(count = messages.len(), queue = %self.queue_url, "received messages");
        Ok(messages)
    }

    async fn acknowledge(&self, receipt_handle: &str) -> Result<(), QueueError> {
        let response = self
            .client
            .post(&self.queue_url)
            .form(&[
                ("Action", "DeleteMessage"),
                ("ReceiptHandle", receipt_handle),
            ])
            .send()
            .await
            .map_err(transport_error)?;

        successful_body(response).await.map(|_| ())
    }

    async fn send(&self, body: String) -> Result<(), QueueError> {
        let response = self
            .client
            .post(&self.queue_url)
            .form(&[("Action", "SendMessage"), ("MessageBody", body.as_str())])
            .send()
            .await
            .map_err(transport_error)?;

        successful_body(response).await.map(|_| ())
    }
}

fn transport_error(err: reqwest::Error) -> QueueError {
    QueueError::Unavailable {
        reason: err.to_string(),
    }
}

async fn successful_body(response: Response) -> Result<String, QueueError> {
    let status = response.status();
    let body = response.text().await.map_err(transport_error)?;
    if !status.is_success() {
        return Err(QueueError::Rejected {
            status: status.as_u16(),
            body,
        });
    }
    Ok(body)
}

#[derive(Debug, Deserialize)]
struct ReceiveMessageResponse {
    #[serde(rename = "ReceiveMessageResult", default)]
    result: ReceiveMessageResult,
}

#[derive(Debug, Default, Deserialize)]
struct ReceiveMessageResult {
    #[serde(rename = "Message", default)]
    messages: Vec<WireMessage>,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    #[serde(rename = "MessageId")]
    message_id: String,
    #[serde(rename = "ReceiptHandle")]
    receipt_handle: String,
    #[serde(rename = "Body", default)]
    body: String,
}

fn parse_receive_response(xml: &str) -> Result<Vec<QueueMessage>, QueueError> {
    let response: ReceiveMessageResponse = quick_xml::de::from_str(xml)
        .map_err(|err| QueueError::MalformedResponse(err.to_string()))?;

    Ok(response
        .result
        .messages
        .into_iter()
        .map(|message| QueueMessage {
            id: message.message_id,
            receipt_handle: message.receipt_handle,
            body: message.body,
        })
        .collect())
}
