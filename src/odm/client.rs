//! HTTP client for a NodeODM processing node
//!
//! Every public method swallows its failure: errors are logged and turned
//! into `false`/`None`/empty so callers only deal with outcomes.

use anyhow::{Context, Result};
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;

use super::task::{TaskInfo, TaskOption};
use super::OdmError;
use crate::config::AppConfig;

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);
const DETAIL_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(600);
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(600);

/// Endpoints tried in order by `test_connection`
const PROBE_ENDPOINTS: [&str; 3] = ["/info", "/", "/task/list"];

#[derive(Deserialize)]
struct TaskListEntry {
    #[serde(default)]
    uuid: Option<String>,
}

#[derive(Deserialize)]
struct ActionResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OdmClient {
    client: Client,
    base_url: String,
    token: String,
}

impl OdmClient {
    pub fn new(base_url: &str, token: &str) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(PROBE_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            token: token.trim().to_string(),
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::new(&config.base_url, &config.token)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn with_token(&self, request: RequestBuilder) -> RequestBuilder {
        if self.token.is_empty() {
            request
        } else {
            request.query(&[("token", self.token.as_str())])
        }
    }

    /// Anything but 200 is an error carrying the response body
    async fn expect_ok(response: Response) -> Result<Response, OdmError> {
        let status = response.status();
        if status == StatusCode::OK {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(OdmError::Status {
            status: status.as_u16(),
            body,
        })
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, OdmError> {
        let bytes = Self::expect_ok(response).await?.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, timeout: Duration) -> Result<T, OdmError> {
        let response = self
            .with_token(self.client.get(self.url(path)))
            .timeout(timeout)
            .send()
            .await?;
        Self::decode(response).await
    }

    /// Try `/info`, `/` and `/task/list`; any 200 means the node is reachable
    pub async fn test_connection(&self) -> bool {
        for endpoint in PROBE_ENDPOINTS {
            let result = self
                .client
                .get(self.url(endpoint))
                .timeout(PROBE_TIMEOUT)
                .send()
                .await;

            match result {
                Ok(response) if response.status() == StatusCode::OK => {
                    tracing::debug!("Connection probe {} succeeded", endpoint);
                    return true;
                }
                Ok(response) => {
                    tracing::debug!("Connection probe {} returned {}", endpoint, response.status());
                }
                Err(e) => {
                    tracing::debug!("Connection probe {} failed: {}", endpoint, e);
                }
            }
        }
        tracing::warn!("Could not reach NodeODM at {}", self.base_url);
        false
    }

    /// Upload images and start a new task
    pub async fn create_task(
        &self,
        images: &[PathBuf],
        options: &[TaskOption],
        name: Option<&str>,
    ) -> Option<TaskInfo> {
        match self.try_create_task(images, options, name).await {
            Ok(task) => {
                tracing::info!("Created task {} with {} images", task.uuid, images.len());
                Some(task)
            }
            Err(e) => {
                tracing::warn!("Error creating task: {}", e);
                None
            }
        }
    }

    async fn try_create_task(
        &self,
        images: &[PathBuf],
        options: &[TaskOption],
        name: Option<&str>,
    ) -> Result<TaskInfo, OdmError> {
        let mut form = Form::new();

        for path in images {
            let file = tokio::fs::File::open(path).await?;
            let length = file.metadata().await?.len();
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "image".to_string());
            let part = Part::stream_with_length(Body::from(file), length).file_name(file_name);
            form = form.part("images", part);
        }

        if !options.is_empty() {
            form = form.text("options", serde_json::to_string(options)?);
        }
        if let Some(name) = name.filter(|n| !n.is_empty()) {
            form = form.text("name", name.to_string());
        }

        let response = self
            .with_token(self.client.post(self.url("/task/new")))
            .multipart(form)
            .timeout(UPLOAD_TIMEOUT)
            .send()
            .await?;
        Self::decode(response).await
    }

    /// List all tasks with their details
    ///
    /// A task whose detail request fails is still listed, as a stub record.
    pub async fn get_tasks(&self) -> Vec<TaskInfo> {
        let entries: Vec<TaskListEntry> = match self.get_json("/task/list", REQUEST_TIMEOUT).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("Error getting tasks: {}", e);
                return Vec::new();
            }
        };

        let mut tasks = Vec::with_capacity(entries.len());
        for uuid in entries.into_iter().filter_map(|e| e.uuid) {
            let path = format!("/task/{}/info", uuid);
            match self.get_json::<TaskInfo>(&path, DETAIL_TIMEOUT).await {
                Ok(info) => tasks.push(info),
                Err(e) => {
                    tracing::debug!("No details for task {}: {}", uuid, e);
                    tasks.push(TaskInfo::stub(&uuid));
                }
            }
        }
        tasks
    }

    pub async fn get_task_info(&self, uuid: &str) -> Option<TaskInfo> {
        let path = format!("/task/{}/info", uuid);
        match self.get_json(&path, REQUEST_TIMEOUT).await {
            Ok(info) => Some(info),
            Err(e) => {
                tracing::debug!("Task info for {} unavailable: {}", uuid, e);
                None
            }
        }
    }

    /// Stream `all.zip` for a task to `output`
    ///
    /// `output` is only created once the server answered 200; a partial file
    /// is removed on failure, an existing file is left alone otherwise.
    pub async fn download_results(&self, uuid: &str, output: &Path) -> bool {
        match self.try_download(uuid, output).await {
            Ok(bytes) => {
                tracing::info!("Downloaded {} bytes of results to {}", bytes, output.display());
                true
            }
            Err(e) => {
                tracing::warn!("Download of task {} failed: {}", uuid, e);
                false
            }
        }
    }

    async fn try_download(&self, uuid: &str, output: &Path) -> Result<u64, OdmError> {
        let path = format!("/task/{}/download/all.zip", uuid);
        let response = self
            .with_token(self.client.get(self.url(&path)))
            .timeout(DOWNLOAD_TIMEOUT)
            .send()
            .await?;
        let mut response = Self::expect_ok(response).await?;

        let mut file = tokio::fs::File::create(output).await?;
        match Self::write_body(&mut response, &mut file).await {
            Ok(written) => Ok(written),
            Err(e) => {
                drop(file);
                let _ = tokio::fs::remove_file(output).await;
                Err(e)
            }
        }
    }

    async fn write_body(response: &mut Response, file: &mut tokio::fs::File) -> Result<u64, OdmError> {
        let mut written = 0u64;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        Ok(written)
    }

    /// Cancel a running task (the remote job, not a local request)
    pub async fn cancel_task(&self, uuid: &str) -> bool {
        self.task_action("/task/cancel", uuid).await
    }

    /// Remove a task and all its data from the node
    pub async fn delete_task(&self, uuid: &str) -> bool {
        self.task_action("/task/remove", uuid).await
    }

    async fn task_action(&self, path: &str, uuid: &str) -> bool {
        let result: Result<ActionResponse, OdmError> = async {
            let response = self
                .with_token(self.client.post(self.url(path)))
                .json(&serde_json::json!({ "uuid": uuid }))
                .timeout(REQUEST_TIMEOUT)
                .send()
                .await?;
            Self::decode(response).await
        }
        .await;

        match result {
            Ok(ActionResponse { success: true, .. }) => true,
            Ok(ActionResponse { error, .. }) => {
                tracing::warn!(
                    "{} for {} rejected: {}",
                    path,
                    uuid,
                    error.as_deref().unwrap_or("no reason given")
                );
                false
            }
            Err(e) => {
                tracing::warn!("{} for {} failed: {}", path, uuid, e);
                false
            }
        }
    }
}
