//! HTTP client for the CoxEdge workload API.

use crate::api::WorkloadApi;
use crate::credentials::Credentials;
use crate::error::{CoxError, Result};
use crate::types::{
    CreateWorkloadRequest, InstanceData, InstancesEnvelope, TaskData, TaskEnvelope, TaskHandle,
    WorkloadData, WorkloadEnvelope, WorkloadsEnvelope,
};
use async_trait::async_trait;
use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;

pub const DEFAULT_BASE_URL: &str = "https://portal.coxedge.com/api/v1/";

/// Maximum workload display-name length enforced by the portal.
pub const WORKLOAD_NAME_LIMIT: usize = 18;

const API_KEY_HEADER: &str = "MC-Api-Key";

/// Shorten a workload name to `limit` characters.
///
/// The final hyphen-delimited segment is kept as a suffix (it usually
/// carries the generated uniqueness token) and the prefix is truncated on
/// the right to make the whole name exactly `limit` long. The same
/// transform must run before every name-based lookup, since the remote
/// store only ever holds shortened names.
pub fn shorten_name(name: &str, limit: usize) -> String {
    if name.len() <= limit {
        return name.to_string();
    }
    let trim = name.len() - limit;
    match name.rfind('-') {
        Some(idx) if idx >= trim => {
            let (prefix, suffix) = name.split_at(idx);
            format!("{}{}", &prefix[..prefix.len() - trim], suffix)
        }
        // No hyphen, or a suffix too long to preserve: plain truncation.
        _ => name[..limit].to_string(),
    }
}

/// Client for one service/environment pair on the CoxEdge portal.
pub struct CoxClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: String,
    service: String,
    environment: String,
}

impl CoxClient {
    pub fn new(credentials: &Credentials) -> Result<Self> {
        let base = credentials
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL);
        let base_url =
            Url::parse(base).map_err(|_| CoxError::InvalidBaseUrl(base.to_string()))?;

        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
            api_key: credentials.api_key.clone(),
            service: credentials.service.clone(),
            environment: credentials.environment.clone(),
        })
    }

    fn workloads_path(&self) -> String {
        format!("services/{}/{}/workloads", self.service, self.environment)
    }

    fn instances_path(&self) -> String {
        format!("services/{}/{}/instances", self.service, self.environment)
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<T> {
        let url = self
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|_| CoxError::InvalidBaseUrl(path.to_string()))?;

        tracing::debug!(%method, %url, "CoxEdge API request");

        let mut request = self
            .http
            .request(method, url)
            .header(API_KEY_HEADER, &self.api_key);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if status == StatusCode::NOT_FOUND {
            return Err(CoxError::NotFound);
        }
        if status.as_u16() >= 300 {
            return Err(CoxError::Api {
                status: status.as_u16(),
                body: text,
            });
        }

        Ok(serde_json::from_str(&text)?)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.request(Method::GET, path, None).await
    }
}

#[async_trait]
impl WorkloadApi for CoxClient {
    async fn get_workload(&self, id: &str) -> Result<WorkloadData> {
        let envelope: WorkloadEnvelope =
            self.get(&format!("{}/{}", self.workloads_path(), id)).await?;
        Ok(envelope.data)
    }

    async fn list_workloads(&self) -> Result<Vec<WorkloadData>> {
        let envelope: WorkloadsEnvelope = self.get(&self.workloads_path()).await?;
        Ok(envelope.data)
    }

    async fn create_workload(&self, mut request: CreateWorkloadRequest) -> Result<TaskHandle> {
        request.name = shorten_name(&request.name, WORKLOAD_NAME_LIMIT);
        self.request(
            Method::POST,
            &self.workloads_path(),
            Some(serde_json::to_value(&request)?),
        )
        .await
    }

    async fn update_workload(&self, id: &str, mut workload: WorkloadData) -> Result<TaskHandle> {
        workload.name = shorten_name(&workload.name, WORKLOAD_NAME_LIMIT);
        self.request(
            Method::PUT,
            &format!("{}/{}", self.workloads_path(), id),
            Some(serde_json::to_value(&workload)?),
        )
        .await
    }

    async fn delete_workload(&self, id: &str) -> Result<TaskHandle> {
        // The delete endpoint requires the current workload body as payload.
        let workload = self.get_workload(id).await?;
        self.request(
            Method::POST,
            &format!("{}/{}?operation=delete", self.workloads_path(), id),
            Some(serde_json::to_value(&workload)?),
        )
        .await
    }

    async fn list_instances(&self, workload_id: &str) -> Result<Vec<InstanceData>> {
        let envelope: InstancesEnvelope = self
            .get(&format!("{}?workloadId={}", self.instances_path(), workload_id))
            .await?;
        Ok(envelope.data)
    }

    async fn get_task(&self, id: &str) -> Result<TaskData> {
        let envelope: TaskEnvelope = self.get(&format!("tasks/{}", id)).await?;
        Ok(envelope.data)
    }
}
