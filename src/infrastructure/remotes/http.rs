#[cfg(test)]
#[path = "http_test.rs"]
mod tests;

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::multipart;
use reqwest::RequestBuilder;
use reqwest::Response;
use serde_derive::Serialize;
use serde_json::Value;

use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::AssistantPrompt;
use crate::domain::models::Document;
use crate::domain::models::DocumentId;
use crate::domain::models::DocumentPatch;
use crate::domain::models::DocumentStatus;
use crate::domain::models::RemoteName;
use crate::domain::models::RemoteStore;
use crate::domain::models::SyncError;
use crate::domain::models::SyncResult;
use crate::domain::models::TextSource;

#[derive(Debug, Serialize)]
struct CreateRequest<'a> {
    title: &'a str,
    content: Value,
    status: DocumentStatus,
}

/// Failures the API reports with a 200 status: `{error, code, message}`.
fn envelope_error(body: &Value) -> Option<SyncError> {
    let error = body.get("error")?;
    let status = body
        .get("code")
        .and_then(Value::as_u64)
        .and_then(|code| return u16::try_from(code).ok());
    let message = body
        .get("message")
        .and_then(Value::as_str)
        .map(|message| return message.to_string())
        .or_else(|| return error.as_str().map(|error| return error.to_string()))
        .unwrap_or_else(|| return error.to_string());

    return Some(SyncError::Remote { status, message });
}

/// Error text of a non-2xx response, taken from a `{detail}` body when there
/// is one.
async fn status_error(res: Response) -> SyncError {
    let status = res.status();
    let detail = res
        .json::<Value>()
        .await
        .ok()
        .and_then(|body| {
            return body
                .get("detail")
                .and_then(Value::as_str)
                .map(|detail| return detail.to_string());
        })
        .unwrap_or_else(|| {
            return status
                .canonical_reason()
                .unwrap_or("Unexpected response")
                .to_string();
        });

    return SyncError::remote_status(status.as_u16(), detail);
}

fn parse_document(mut record: Value) -> SyncResult<Document> {
    if let Some(Value::Number(number)) = record.get("id") {
        let id = number.to_string();
        record["id"] = Value::String(id);
    }

    return serde_json::from_value::<Document>(record)
        .map_err(|err| return SyncError::remote(format!("Malformed document record: {err}")));
}

/// Single records come back as `{data: [record]}`.
fn first_record(body: Value) -> SyncResult<Document> {
    let record = body
        .get("data")
        .and_then(Value::as_array)
        .and_then(|data| return data.first())
        .cloned();

    match record {
        Some(record) => return parse_document(record),
        None => return Err(SyncError::remote("Response did not contain a document")),
    }
}

/// Lists come back as `{data: [[record, ...]]}`. Anything else is treated as
/// an empty list, and records that do not parse are skipped.
fn document_list(body: Value) -> Vec<Document> {
    let records = match body.get("data") {
        Some(Value::Array(data)) => match data.first() {
            Some(Value::Array(inner)) => inner.clone(),
            Some(Value::Object(_)) => data.clone(),
            _ => vec![],
        },
        _ => {
            tracing::warn!(body = %body, "Unexpected document list response");
            vec![]
        }
    };

    return records
        .into_iter()
        .filter_map(|record| match parse_document(record) {
            Ok(document) => return Some(document),
            Err(err) => {
                tracing::warn!(error = %err, "Skipping document record");
                return None;
            }
        })
        .collect();
}

pub struct HttpRemote {
    url: String,
    timeout: String,
    client: reqwest::Client,
}

impl Default for HttpRemote {
    fn default() -> HttpRemote {
        return HttpRemote {
            url: Config::get(ConfigKey::ApiUrl)
                .trim_end_matches('/')
                .to_string(),
            timeout: Config::get(ConfigKey::HealthCheckTimeout),
            client: reqwest::Client::new(),
        };
    }
}

impl HttpRemote {
    fn posts_url(&self) -> String {
        return format!("{url}/posts/", url = self.url);
    }

    fn post_url(&self, id: &DocumentId) -> String {
        return format!("{url}/posts/{id}", url = self.url);
    }

    /// Sends a CRUD request and returns its JSON body, `null` when the body
    /// is not JSON.
    async fn send(&self, req: RequestBuilder) -> SyncResult<Value> {
        let res = req.send().await?;
        if !res.status().is_success() {
            let err = status_error(res).await;
            tracing::error!(error = %err, "Document API request failed");
            return Err(err);
        }

        let text = res.text().await?;
        let body = serde_json::from_str::<Value>(&text).unwrap_or(Value::Null);
        if let Some(err) = envelope_error(&body) {
            tracing::error!(error = %err, "Document API reported an error");
            return Err(err);
        }

        return Ok(body);
    }
}

#[async_trait]
impl RemoteStore for HttpRemote {
    fn name(&self) -> RemoteName {
        return RemoteName::Http;
    }

    #[allow(clippy::implicit_return)]
    async fn health_check(&self) -> SyncResult<()> {
        let timeout = self
            .timeout
            .parse::<u64>()
            .map_err(|err| return SyncError::remote(format!("Invalid health check timeout: {err}")))?;

        let res = self
            .client
            .get(self.posts_url())
            .timeout(Duration::from_millis(timeout))
            .send()
            .await;

        let res = match res {
            Ok(res) => res,
            Err(err) => {
                tracing::error!(error = ?err, "Document API is not running");
                return Err(SyncError::remote(format!(
                    "Document API is not reachable at {}",
                    self.url
                )));
            }
        };

        if !res.status().is_success() {
            tracing::error!(status = res.status().as_u16(), "Document API health check failed");
            return Err(SyncError::remote_status(
                res.status().as_u16(),
                "Document API health check failed",
            ));
        }

        return Ok(());
    }

    #[allow(clippy::implicit_return)]
    async fn create(&self, title: &str, content: Value) -> SyncResult<Document> {
        let req = CreateRequest {
            title,
            content,
            status: DocumentStatus::Draft,
        };

        let body = self.send(self.client.post(self.posts_url()).json(&req)).await?;
        return first_record(body);
    }

    #[allow(clippy::implicit_return)]
    async fn fetch_all(&self) -> SyncResult<Vec<Document>> {
        let body = self.send(self.client.get(self.posts_url())).await?;
        return Ok(document_list(body));
    }

    #[allow(clippy::implicit_return)]
    async fn fetch(&self, id: &DocumentId) -> SyncResult<Document> {
        let body = self.send(self.client.get(self.post_url(id))).await?;
        return first_record(body);
    }

    #[allow(clippy::implicit_return)]
    async fn update(&self, id: &DocumentId, patch: &DocumentPatch) -> SyncResult<()> {
        self.send(self.client.patch(self.post_url(id)).json(patch))
            .await?;
        return Ok(());
    }

    #[allow(clippy::implicit_return)]
    async fn delete(&self, id: &DocumentId) -> SyncResult<()> {
        self.send(self.client.delete(self.post_url(id))).await?;
        return Ok(());
    }

    #[allow(clippy::implicit_return)]
    async fn generate(&self, prompt: AssistantPrompt) -> SyncResult<TextSource> {
        let mut form = multipart::Form::new().text("prompt", prompt.text);
        if let Some(image) = prompt.image {
            let part = multipart::Part::bytes(image.bytes)
                .file_name(image.file_name)
                .mime_str(&image.mime_type)?;
            form = form.part("image", part);
        }

        let res = self
            .client
            .post(format!("{url}/ai/generate", url = self.url))
            .multipart(form)
            .send()
            .await?;

        if !res.status().is_success() {
            let err = status_error(res).await;
            tracing::error!(error = %err, "Failed to make generation request");
            return Err(err);
        }

        let source = res.bytes_stream().map(|chunk| {
            return chunk
                .map(|bytes| return bytes.to_vec())
                .map_err(|err| return SyncError::Stream(err.to_string()));
        });

        return Ok(Box::pin(source));
    }
}
