//! Jellyfin catalog client
//!
//! Talks to the Jellyfin (Emby-compatible) REST API using the `X-Emby-Token`
//! header for authentication.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Method, RequestBuilder, Response, header};
use serde::Deserialize;
use tracing::{debug, trace};
use url::Url;

use super::{CatalogItem, CatalogSource, ImageProbe, RawImage};
use crate::config::UpstreamConfig;
use crate::errors::{UpstreamError, UpstreamResult};

const TOKEN_HEADER: &str = "X-Emby-Token";
const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ItemsResponse {
    #[serde(default)]
    items: Vec<CatalogItem>,
}

/// Jellyfin implementation of [`CatalogSource`].
#[derive(Debug, Clone)]
pub struct JellyfinClient {
    client: Client,
    base_url: Url,
    api_key: String,
}

impl JellyfinClient {
    /// Build a client with the configured timeouts.
    pub fn new(config: &UpstreamConfig) -> UpstreamResult<Self> {
        let mut base_url = Url::parse(&config.base_url)?;
        // Url::join replaces the last segment unless the base ends in '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| UpstreamError::Request {
                url: base_url.to_string(),
                source: e,
            })?;

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key.clone(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn items_url(&self, parent_id: &str) -> UpstreamResult<Url> {
        let mut url = self.base_url.join("Items")?;
        url.query_pairs_mut()
            .append_pair("parentId", parent_id)
            .append_pair("enableImages", "true");
        Ok(url)
    }

    fn primary_image_url(&self, item_id: &str) -> UpstreamResult<Url> {
        let path = format!("Items/{}/Images/Primary", urlencoding::encode(item_id));
        Ok(self.base_url.join(&path)?)
    }

    fn request(&self, method: Method, url: &Url) -> RequestBuilder {
        self.client
            .request(method, url.clone())
            .header(TOKEN_HEADER, &self.api_key)
    }

    async fn send(&self, method: Method, url: &Url) -> UpstreamResult<Response> {
        trace!("{} {}", method, url);
        let response = self
            .request(method, url)
            .send()
            .await
            .map_err(|e| UpstreamError::Request {
                url: url.to_string(),
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        Ok(response)
    }
}

/// Parse an HTTP-date `Last-Modified` value.
fn parse_last_modified(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[async_trait]
impl CatalogSource for JellyfinClient {
    async fn list_items(&self, parent_id: &str) -> UpstreamResult<Vec<CatalogItem>> {
        let url = self.items_url(parent_id)?;
        let response = self
            .send(Method::GET, &url)
            .await?
            .json::<ItemsResponse>()
            .await
            .map_err(|e| UpstreamError::InvalidResponse {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        debug!(
            "Listed {} item(s) under parent {}",
            response.items.len(),
            parent_id
        );
        Ok(response.items)
    }

    async fn head_image(&self, item_id: &str) -> UpstreamResult<ImageProbe> {
        let url = self.primary_image_url(item_id)?;
        let response = self.send(Method::HEAD, &url).await?;

        let last_modified = response
            .headers()
            .get(header::LAST_MODIFIED)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| {
                let parsed = parse_last_modified(value);
                if parsed.is_none() {
                    debug!("Unparsable Last-Modified '{}' for item {}", value, item_id);
                }
                parsed
            });

        Ok(ImageProbe { last_modified })
    }

    async fn get_image(&self, item_id: &str) -> UpstreamResult<RawImage> {
        let url = self.primary_image_url(item_id)?;
        let response = self.send(Method::GET, &url).await?;

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        let bytes = response.bytes().await.map_err(|e| UpstreamError::Request {
            url: url.to_string(),
            source: e,
        })?;

        Ok(RawImage {
            bytes,
            content_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use mockito::Matcher;
    use std::time::Duration;

    fn client_for(server: &mockito::ServerGuard) -> JellyfinClient {
        let config = UpstreamConfig {
            base_url: server.url(),
            api_key: "secret-token".to_string(),
            library_id: "library".to_string(),
            request_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(2),
        };
        JellyfinClient::new(&config).unwrap()
    }

    #[test]
    fn test_parse_last_modified() {
        let expected = Utc.with_ymd_and_hms(2015, 10, 21, 7, 28, 0).unwrap();
        assert_eq!(
            parse_last_modified("Wed, 21 Oct 2015 07:28:00 GMT"),
            Some(expected)
        );
        assert_eq!(parse_last_modified("yesterday"), None);
    }

    #[test]
    fn test_base_url_with_path_prefix_is_preserved() {
        let config = UpstreamConfig {
            base_url: "https://media.example.org/jellyfin".to_string(),
            ..UpstreamConfig::default()
        };
        let client = JellyfinClient::new(&config).unwrap();
        assert_eq!(
            client.primary_image_url("abc").unwrap().as_str(),
            "https://media.example.org/jellyfin/Items/abc/Images/Primary"
        );
    }

    #[tokio::test]
    async fn test_list_items_sends_token_and_parses_items() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/Items")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("parentId".into(), "library".into()),
                Matcher::UrlEncoded("enableImages".into(), "true".into()),
            ]))
            .match_header("x-emby-token", "secret-token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"Items":[
                    {"Id":"A","Name":"Extras","IsFolder":true,"Type":"Folder"},
                    {"Id":"B","Name":"Arrival","IsFolder":false,"Type":"Movie"}
                ],"TotalRecordCount":2}"#,
            )
            .create_async()
            .await;

        let client = client_for(&server);
        let items = client.list_items("library").await.unwrap();

        mock.assert_async().await;
        assert_eq!(items.len(), 2);
        assert!(items[0].is_folder);
        assert_eq!(items[1].id, "B");
    }

    #[tokio::test]
    async fn test_list_items_rejects_malformed_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/Items")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("<html>login</html>")
            .create_async()
            .await;

        let err = client_for(&server).list_items("library").await.unwrap_err();
        assert!(matches!(err, UpstreamError::InvalidResponse { .. }));
    }

    #[tokio::test]
    async fn test_head_image_reads_last_modified() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("HEAD", "/Items/B/Images/Primary")
            .with_status(200)
            .with_header("last-modified", "Wed, 21 Oct 2015 07:28:00 GMT")
            .create_async()
            .await;
        server
            .mock("HEAD", "/Items/C/Images/Primary")
            .with_status(200)
            .create_async()
            .await;

        let client = client_for(&server);
        let probe = client.head_image("B").await.unwrap();
        assert_eq!(
            probe.last_modified,
            Some(Utc.with_ymd_and_hms(2015, 10, 21, 7, 28, 0).unwrap())
        );

        let probe = client.head_image("C").await.unwrap();
        assert_eq!(probe.last_modified, None);
    }

    #[tokio::test]
    async fn test_get_image_returns_bytes_and_maps_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/Items/B/Images/Primary")
            .with_status(200)
            .with_header("content-type", "image/png")
            .with_body(vec![1u8, 2, 3, 4])
            .create_async()
            .await;
        server
            .mock("GET", "/Items/gone/Images/Primary")
            .with_status(404)
            .create_async()
            .await;
        server
            .mock("GET", "/Items/broken/Images/Primary")
            .with_status(500)
            .create_async()
            .await;

        let client = client_for(&server);

        let image = client.get_image("B").await.unwrap();
        assert_eq!(image.bytes.as_ref(), &[1, 2, 3, 4]);
        assert_eq!(image.content_type.as_deref(), Some("image/png"));

        let err = client.get_image("gone").await.unwrap_err();
        assert!(err.is_not_found());

        let err = client.get_image("broken").await.unwrap_err();
        assert!(matches!(err, UpstreamError::Status { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_request_error() {
        let config = UpstreamConfig {
            // Reserved port, nothing listens there
            base_url: "http://127.0.0.1:9".to_string(),
            request_timeout: Duration::from_secs(2),
            connect_timeout: Duration::from_secs(1),
            ..UpstreamConfig::default()
        };
        let client = JellyfinClient::new(&config).unwrap();
        let err = client.get_image("B").await.unwrap_err();
        assert!(matches!(err, UpstreamError::Request { .. }));
    }
}
