#[derive(thiserror::Error, Debug)]
pub enum MonitorError {
    #[error("WiFi connection failed: {0}")]
    WifiConnection(String),

    #[error("HTTP transport error: {0}")]
    Http(String),

    #[error("Malformed threshold payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("System error: {0}")]
    System(String),
}

#[cfg(target_os = "espidf")]
impl From<esp_idf_sys::EspError> for MonitorError {
    fn from(err: esp_idf_sys::EspError) -> Self {
        MonitorError::System(format!("ESP error: {}", err))
    }
}

pub type Result<T> = core::result::Result<T, MonitorError>;
