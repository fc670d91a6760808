// VibraWatch — HTTP Remote Channel
//
// JSON POSTs to the monitoring API over the ESP-IDF HTTP client.  A fresh
// connection is opened per request; any transport failure is reported as the
// `-1` sentinel status.

use std::time::Duration;

use embedded_svc::http::client::Client as HttpClient;
use embedded_svc::http::{Method, Status};
use esp_idf_svc::http::client::{Configuration as HttpClientConfiguration, EspHttpConnection};
use esp_idf_svc::io::{Read, Write};

use crate::api::{append_capped, RemoteChannel, Response, STATUS_NOT_CONNECTED};
use crate::config::{HTTP_TIMEOUT_MS, MAX_HTTP_BODY};
use crate::error::{MonitorError, Result};
use crate::net::wifi::WifiManager;

pub struct HttpChannel {
    wifi: WifiManager,
    base_url: String,
}

impl HttpChannel {
    pub fn new(wifi: WifiManager, base_url: &str) -> Self {
        Self {
            wifi,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    fn post(&self, url: &str, body: &str) -> Result<Response> {
        let http_conf = HttpClientConfiguration {
            timeout: Some(Duration::from_millis(HTTP_TIMEOUT_MS)),
            ..Default::default()
        };
        let connection =
            EspHttpConnection::new(&http_conf).map_err(|e| MonitorError::Http(format!("{e:?}")))?;
        let mut client = HttpClient::wrap(connection);

        let content_length = body.len().to_string();
        let headers = [
            ("Content-Type", "application/json"),
            ("Content-Length", content_length.as_str()),
        ];

        let mut request = client
            .request(Method::Post, url, &headers)
            .map_err(|e| MonitorError::Http(format!("{e:?}")))?;
        request
            .write_all(body.as_bytes())
            .map_err(|e| MonitorError::Http(format!("{e:?}")))?;
        let mut response = request
            .submit()
            .map_err(|e| MonitorError::Http(format!("{e:?}")))?;

        let status = i32::from(response.status());

        let mut payload = Vec::new();
        let mut chunk = [0u8; 256];
        loop {
            let read = response
                .read(&mut chunk)
                .map_err(|e| MonitorError::Http(format!("{e:?}")))?;
            if read == 0 {
                break;
            }
            if !append_capped(&mut payload, &chunk[..read], MAX_HTTP_BODY) {
                log::warn!("Response from {} truncated at {} bytes", url, MAX_HTTP_BODY);
                break;
            }
        }

        Ok(Response::new(status, String::from_utf8_lossy(&payload)))
    }
}

impl RemoteChannel for HttpChannel {
    fn is_connected(&mut self) -> bool {
        self.wifi.is_connected()
    }

    fn reconnect(&mut self) {
        self.wifi.reconnect();
    }

    fn post_json(&mut self, path: &str, body: &str) -> Response {
        if !self.wifi.is_connected() {
            return Response::not_connected();
        }

        let url = self.url(path);
        log::debug!("POST {} {}", url, body);

        match self.post(&url, body) {
            Ok(response) => {
                log::debug!("Status {} body {}", response.status, response.body);
                response
            }
            Err(e) => {
                log::warn!("Request to {} failed: {}", url, e);
                Response::new(STATUS_NOT_CONNECTED, "Request failed")
            }
        }
    }
}
