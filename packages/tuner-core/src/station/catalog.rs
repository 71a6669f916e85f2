//! Station catalog model and HTTP client.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::playback::StreamDescriptor;
use crate::protocol_constants::{
    DEFAULT_STATION_CODE, FALLBACK_METADATA_URL, FALLBACK_STREAM_URL,
};

/// A station as served by the catalog endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Station {
    #[serde(default)]
    pub id: Option<i64>,
    pub code: String,
    pub name: String,
    pub stream_url: String,
    #[serde(default)]
    pub metadata_url: Option<String>,
    #[serde(default)]
    pub album_art_url: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub tagline: Option<String>,
    #[serde(default)]
    pub stream_quality: Option<String>,
    #[serde(default)]
    pub stream_codec: Option<String>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub display_order: i32,
}

impl Station {
    /// Returns what the player needs to attach this station.
    pub fn descriptor(&self) -> StreamDescriptor {
        let descriptor = StreamDescriptor::new(self.stream_url.clone());
        match &self.stream_codec {
            Some(codec) => descriptor.with_codec_hint(codec.clone()),
            None => descriptor,
        }
    }

    /// The station offered when the catalog cannot be reached.
    pub fn fallback() -> Self {
        Self {
            id: Some(1),
            code: DEFAULT_STATION_CODE.to_string(),
            name: "RadioAwa English".to_string(),
            stream_url: FALLBACK_STREAM_URL.to_string(),
            metadata_url: Some(FALLBACK_METADATA_URL.to_string()),
            album_art_url: None,
            genre: None,
            tagline: None,
            stream_quality: None,
            stream_codec: None,
            is_active: true,
            display_order: 1,
        }
    }
}

/// Errors from the station catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP error status {0}: {1}")]
    HttpStatus(u16, String),

    #[error("Station not found: {0}")]
    NotFound(String),
}

/// Result type alias for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Read access to the list of stations.
#[async_trait]
pub trait StationCatalog: Send + Sync {
    /// Lists active stations in display order.
    async fn fetch_stations(&self) -> CatalogResult<Vec<Station>>;

    /// Fetches one station by code.
    async fn station_by_code(&self, code: &str) -> CatalogResult<Station>;
}

/// Catalog backed by the station REST endpoint.
pub struct HttpStationCatalog {
    client: Client,
    base_url: String,
}

impl HttpStationCatalog {
    /// `base_url` is the list endpoint, e.g. `http://host:8081/api/stations`.
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl StationCatalog for HttpStationCatalog {
    async fn fetch_stations(&self) -> CatalogResult<Vec<Station>> {
        let res = self.client.get(&self.base_url).send().await?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(CatalogError::HttpStatus(status.as_u16(), body));
        }
        Ok(res.json().await?)
    }

    async fn station_by_code(&self, code: &str) -> CatalogResult<Station> {
        let url = format!("{}/{}", self.base_url, code);
        let res = self.client.get(&url).send().await?;
        match res.status() {
            StatusCode::NOT_FOUND => Err(CatalogError::NotFound(code.to_string())),
            status if !status.is_success() => {
                let body = res.text().await.unwrap_or_default();
                Err(CatalogError::HttpStatus(status.as_u16(), body))
            }
            _ => Ok(res.json().await?),
        }
    }
}

/// Lists stations, substituting the built-in fallback list on any failure.
///
/// Returns the stations and whether the fallback was used.
pub async fn fetch_or_fallback(catalog: &dyn StationCatalog) -> (Vec<Station>, bool) {
    match catalog.fetch_stations().await {
        Ok(stations) => (stations, false),
        Err(e) => {
            log::warn!("[Stations] Catalog unavailable, using fallback: {}", e);
            (vec![Station::fallback()], true)
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    pub(crate) fn station(code: &str, active: bool, order: i32) -> Station {
        Station {
            id: None,
            code: code.to_string(),
            name: format!("RadioAwa {}", code),
            stream_url: format!("https://radio.example/{}/live.m3u8", code.to_lowercase()),
            metadata_url: None,
            album_art_url: None,
            genre: None,
            tagline: None,
            stream_quality: None,
            stream_codec: None,
            is_active: active,
            display_order: order,
        }
    }

    /// Serves exactly one HTTP response on an ephemeral port.
    async fn serve_once(status_line: &'static str, body: String) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.expect("accept");
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        });
        format!("http://{}/api/stations", addr)
    }

    #[test]
    fn parses_backend_payload() {
        let json = r#"{
            "id": 2,
            "code": "HINDI",
            "name": "RadioAwa Hindi",
            "streamUrl": "https://radio.example/hindi/live.m3u8",
            "metadataUrl": "/api/metadata/hindi",
            "streamCodec": "aac",
            "isActive": true,
            "displayOrder": 2
        }"#;

        let station: Station = serde_json::from_str(json).expect("parse");

        assert_eq!(station.code, "HINDI");
        assert_eq!(station.display_order, 2);
        let descriptor = station.descriptor();
        assert_eq!(descriptor.url, "https://radio.example/hindi/live.m3u8");
        assert_eq!(descriptor.codec_hint.as_deref(), Some("aac"));
    }

    #[test]
    fn fallback_station_is_active_english() {
        let station = Station::fallback();
        assert_eq!(station.code, "ENGLISH");
        assert!(station.is_active);
        assert_eq!(station.stream_url, FALLBACK_STREAM_URL);
    }

    #[tokio::test]
    async fn http_catalog_lists_stations() {
        let body = serde_json::to_string(&vec![station("ENGLISH", true, 1)]).expect("json");
        let url = serve_once("200 OK", body).await;
        let catalog = HttpStationCatalog::new(Client::new(), url);

        let stations = catalog.fetch_stations().await.expect("stations");

        assert_eq!(stations.len(), 1);
        assert_eq!(stations[0].code, "ENGLISH");
    }

    #[tokio::test]
    async fn http_catalog_maps_404_to_not_found() {
        let url = serve_once("404 Not Found", String::new()).await;
        let catalog = HttpStationCatalog::new(Client::new(), url);

        let err = catalog.station_by_code("TAMIL").await.unwrap_err();

        assert!(matches!(err, CatalogError::NotFound(ref code) if code == "TAMIL"));
    }

    #[tokio::test]
    async fn server_error_triggers_fallback() {
        let url = serve_once("500 Internal Server Error", "boom".to_string()).await;
        let catalog = HttpStationCatalog::new(Client::new(), url);

        let (stations, fallback) = fetch_or_fallback(&catalog).await;

        assert!(fallback);
        assert_eq!(stations, vec![Station::fallback()]);
    }
}
