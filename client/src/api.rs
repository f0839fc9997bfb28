//! # Server API
//!
//! Thin adapter over the stampkeeper server's REST endpoints and view
//! fragments. Records travel as JSON; views travel as server-rendered HTML
//! snippets that callers swap into a container wholesale.
//!
//! The server is authoritative for every record. Update endpoints accept a
//! partial body holding only the changed fields and respond with the full
//! updated entity, so callers can re-render from the response instead of
//! guessing at the result. One exception: an instance update may come back
//! as 204 No Content, which means the server deleted the instance outright
//! (its quantity reached zero).
//!
//! No timeout is set here and nothing is retried; a request either lands
//! or its error is reported to the caller once.

use std::convert::Infallible;

use futures_util::StreamExt;
use reqwest::{
    Body, Client, Response, StatusCode,
    multipart::{Form, Part},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use crate::{
    error::ClientError,
    models::{NewInstance, NewStamp, Stamp, StampInstance, StorageBox},
    prefs::ViewName,
};

const UPLOAD_CHUNK: usize = 64 * 1024;

pub struct Api {
    http: Client,
    base_url: String,
}

/// Result of `PUT /api/instances/{id}`.
pub enum InstanceUpdate {
    Updated(StampInstance),
    /// 204 No Content: the server deleted the instance.
    Deleted,
}

#[derive(Deserialize)]
struct UploadResponse {
    image_url: String,
}

impl Api {
    pub fn new(server_url: &str) -> Self {
        Self {
            http: Client::new(),
            base_url: server_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    pub async fn create_stamp(&self, stamp: &NewStamp) -> Result<Stamp, ClientError> {
        let res = self
            .http
            .post(self.url("/api/stamps"))
            .json(stamp)
            .send()
            .await?;

        Ok(checked(res).await?.json().await?)
    }

    pub async fn update_stamp(&self, id: &str, updates: &Value) -> Result<Stamp, ClientError> {
        let res = self
            .http
            .put(self.url(&format!("/api/stamps/{id}")))
            .json(updates)
            .send()
            .await?;

        Ok(checked(res).await?.json().await?)
    }

    pub async fn delete_stamp(&self, id: &str) -> Result<(), ClientError> {
        let res = self
            .http
            .delete(self.url(&format!("/api/stamps/{id}")))
            .send()
            .await?;

        checked(res).await?;
        Ok(())
    }

    /// Multipart upload of the `image` form field, streamed in chunks so the
    /// caller can watch bytes go out. There is no way to cancel mid-flight.
    pub async fn upload_stamp_image<F>(
        &self,
        id: &str,
        filename: String,
        mime: &str,
        bytes: Vec<u8>,
        progress: F,
    ) -> Result<String, ClientError>
    where
        F: Fn(u64, u64) + Send + 'static,
    {
        let total = bytes.len() as u64;
        let chunks: Vec<Result<Vec<u8>, Infallible>> = bytes
            .chunks(UPLOAD_CHUNK)
            .map(|chunk| Ok(chunk.to_vec()))
            .collect();

        let mut sent = 0u64;
        let stream = futures_util::stream::iter(chunks).inspect(move |chunk| {
            if let Ok(chunk) = chunk {
                sent += chunk.len() as u64;
                progress(sent, total);
            }
        });

        let part = Part::stream_with_length(Body::wrap_stream(stream), total)
            .file_name(filename)
            .mime_str(mime)?;

        let res = self
            .http
            .post(self.url(&format!("/api/stamps/{id}/upload-image")))
            .multipart(Form::new().part("image", part))
            .send()
            .await?;

        let upload: UploadResponse = checked(res).await?.json().await?;
        info!("Image for stamp {id} uploaded to {}", upload.image_url);

        Ok(upload.image_url)
    }

    pub async fn get_boxes(&self) -> Result<Vec<StorageBox>, ClientError> {
        let res = self.http.get(self.url("/api/boxes")).send().await?;

        Ok(checked(res).await?.json().await?)
    }

    pub async fn create_box(&self, name: &str) -> Result<StorageBox, ClientError> {
        let res = self
            .http
            .post(self.url("/api/boxes"))
            .json(&json!({ "name": name }))
            .send()
            .await?;

        Ok(checked(res).await?.json().await?)
    }

    pub async fn update_box(&self, id: &str, name: &str) -> Result<StorageBox, ClientError> {
        let res = self
            .http
            .put(self.url(&format!("/api/boxes/{id}")))
            .json(&json!({ "name": name }))
            .send()
            .await?;

        Ok(checked(res).await?.json().await?)
    }

    pub async fn delete_box(&self, id: &str) -> Result<(), ClientError> {
        let res = self
            .http
            .delete(self.url(&format!("/api/boxes/{id}")))
            .send()
            .await?;

        checked(res).await?;
        Ok(())
    }

    pub async fn create_instance(
        &self,
        stamp_id: &str,
        instance: &NewInstance,
    ) -> Result<StampInstance, ClientError> {
        let res = self
            .http
            .post(self.url(&format!("/api/instances/{stamp_id}")))
            .json(instance)
            .send()
            .await?;

        Ok(checked(res).await?.json().await?)
    }

    pub async fn update_instance(
        &self,
        id: &str,
        updates: &Value,
    ) -> Result<InstanceUpdate, ClientError> {
        let res = self
            .http
            .put(self.url(&format!("/api/instances/{id}")))
            .json(updates)
            .send()
            .await?;

        let res = checked(res).await?;
        if res.status() == StatusCode::NO_CONTENT {
            return Ok(InstanceUpdate::Deleted);
        }

        Ok(InstanceUpdate::Updated(res.json().await?))
    }

    pub async fn delete_instance(&self, id: &str) -> Result<(), ClientError> {
        let res = self
            .http
            .delete(self.url(&format!("/api/instances/{id}")))
            .send()
            .await?;

        checked(res).await?;
        Ok(())
    }

    pub async fn stamps_view(
        &self,
        view: ViewName,
        query: &[(&str, String)],
    ) -> Result<String, ClientError> {
        let res = self
            .http
            .get(self.url(&format!("/views/stamps/{view}")))
            .query(query)
            .send()
            .await?;

        Ok(checked(res).await?.text().await?)
    }

    pub async fn stamp_detail(&self, id: &str) -> Result<String, ClientError> {
        let res = self
            .http
            .get(self.url(&format!("/views/stamps/detail/{id}")))
            .send()
            .await?;

        Ok(checked(res).await?.text().await?)
    }

    pub async fn new_instance_row(&self, stamp_id: &str) -> Result<String, ClientError> {
        let res = self
            .http
            .get(self.url(&format!("/views/stamps/{stamp_id}/new-instance-row")))
            .send()
            .await?;

        Ok(checked(res).await?.text().await?)
    }

    pub async fn boxes_view(&self) -> Result<String, ClientError> {
        let res = self.http.get(self.url("/views/boxes-list")).send().await?;

        Ok(checked(res).await?.text().await?)
    }
}

async fn checked(res: Response) -> Result<Response, ClientError> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }

    let message = res.text().await.unwrap_or_default();
    Err(ClientError::Server {
        status: status.as_u16(),
        message,
    })
}
