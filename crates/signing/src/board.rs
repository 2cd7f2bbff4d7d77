use exn::{OptionExt, ResultExt};
use reqwest::header::ACCEPT;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use tracing::instrument;

use crate::error::{ErrorKind, Result};

pub const DEFAULT_DEVICE_API_URL: &str = "https://api.ipsw.me/v4/device/";

#[derive(Debug, Deserialize)]
struct DeviceInfo {
    #[serde(default)]
    boards: Vec<Board>,
}

#[derive(Debug, Deserialize)]
struct Board {
    boardconfig: String,
}

/// Looks up a device's board config (e.g. `N104AP`), which signing checks need
/// alongside the device identifier.
#[derive(Debug, Clone)]
pub struct DeviceApi {
    http: Client,
    base: Url,
}
impl DeviceApi {
    /// `base` is joined with the device identifier, so it should end in `/`;
    /// one is added if it doesn't.
    pub fn new(http: Client, base: &str) -> Result<Self> {
        let normalized = match base.ends_with('/') {
            true => base.to_string(),
            false => format!("{base}/"),
        };
        let base = Url::parse(&normalized).or_raise(|| ErrorKind::InvalidUrl(base.to_string()))?;
        Ok(Self { http, base })
    }

    pub fn url_for(&self, device: &str) -> Result<Url> {
        self.base.join(device).or_raise(|| ErrorKind::InvalidUrl(format!("{}{device}", self.base)))
    }

    /// The first board config listed for `device`.
    #[instrument(skip(self))]
    pub async fn board(&self, device: &str) -> Result<String> {
        let response = self
            .http
            .get(self.url_for(device)?)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .or_raise(|| ErrorKind::Network(format!("device lookup for {device} failed")))?;
        if response.status() == StatusCode::NOT_FOUND {
            exn::bail!(ErrorKind::BoardNotFound(device.to_string()));
        }
        let body = response
            .error_for_status()
            .or_raise(|| ErrorKind::Network(format!("device lookup for {device} failed")))?
            .text()
            .await
            .or_raise(|| ErrorKind::Network(format!("failed to read device lookup for {device}")))?;
        parse_board(device, &body)
    }
}

fn parse_board(device: &str, body: &str) -> Result<String> {
    let info: DeviceInfo =
        serde_json::from_str(body).or_raise(|| ErrorKind::BoardNotFound(device.to_string()))?;
    info.boards
        .into_iter()
        .map(|board| board.boardconfig)
        .find(|board| !board.is_empty())
        .ok_or_raise(|| ErrorKind::BoardNotFound(device.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_parse_board() {
        let body = r#"{
            "name": "iPhone 11",
            "identifier": "iPhone12,1",
            "boards": [
                {"boardconfig": "N104AP", "platform": "t8030", "cpid": 32816, "bdid": 4}
            ],
            "boardconfig": "N104AP",
            "platform": "t8030"
        }"#;
        assert_eq!(parse_board("iPhone12,1", body).unwrap(), "N104AP");
    }

    #[rstest]
    #[case(r#"{"name": "iPhone 11", "boards": []}"#)]
    #[case(r#"{"name": "iPhone 11"}"#)]
    #[case(r#"{"boards": [{"boardconfig": ""}]}"#)]
    #[case("Not Found")]
    fn test_no_board(#[case] body: &str) {
        let err = parse_board("iPhone12,1", body).unwrap_err();
        assert_eq!(&*err, &ErrorKind::BoardNotFound("iPhone12,1".to_string()));
    }

    #[rstest]
    #[case("https://api.ipsw.me/v4/device/")]
    #[case("https://api.ipsw.me/v4/device")]
    fn test_device_url(#[case] base: &str) {
        let api = DeviceApi::new(Client::new(), base).unwrap();
        assert_eq!(api.url_for("iPhone12,1").unwrap().as_str(), "https://api.ipsw.me/v4/device/iPhone12,1");
    }
}
