// src/storage/gcs.rs

use google_cloud_storage::{
    client::{Client, ClientConfig},
    http::objects::list::ListObjectsRequest,
};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use super::ObjectLister;
use crate::error::GenError;

/// Lists objects in Google Cloud Storage using application default credentials.
///
/// Authentication happens on the first listing, so runs that never chunk do
/// not need credentials.
#[derive(Default)]
pub struct GcsLister {
    client: OnceCell<Client>,
}

impl GcsLister {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_client(client: Client) -> Self {
        Self {
            client: OnceCell::new_with(Some(client)),
        }
    }

    async fn client(&self) -> Result<&Client, GenError> {
        self.client
            .get_or_try_init(|| async {
                info!("authenticating to GCS");
                let config = ClientConfig::default().with_auth().await.map_err(|e| {
                    GenError::storage("gs://", format!("authenticating to GCS: {}", e))
                })?;
                Ok(Client::new(config))
            })
            .await
    }
}

impl ObjectLister for GcsLister {
    /// Pages through `list_objects` under `prefix` until `next_page_token`
    /// runs out. The suffix is not sent; [`super::list_identifiers`] filters
    /// the keys that come back.
    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        suffix: &str,
    ) -> Result<Vec<String>, GenError> {
        let client = self.client().await?;
        let location = format!("gs://{}/{}", bucket, prefix);
        let mut keys = Vec::new();
        let mut page_token: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let request = list_request(bucket, prefix, page_token.take());
            let response = client
                .list_objects(&request)
                .await
                .map_err(|e| GenError::storage(&location, e))?;
            pages += 1;

            keys.extend(response.items.unwrap_or_default().into_iter().map(|o| o.name));
            debug!(location = %location, page = pages, keys = keys.len(), "listed page");

            match response.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        info!(location = %location, suffix, pages, keys = keys.len(), "listed objects");
        Ok(keys)
    }
}

fn list_request(bucket: &str, prefix: &str, page_token: Option<String>) -> ListObjectsRequest {
    ListObjectsRequest {
        bucket: bucket.to_string(),
        prefix: (!prefix.is_empty()).then(|| prefix.to_string()),
        page_token,
        ..Default::default()
    }
}
