//! Alipay SDK boundary.

use serde::Deserialize;
use url::Url;

use crate::errors::ThirdError;

/// Host Alipay uses when it bounces back into the app after a payment.
pub const SAFEPAY_HOST: &str = "safepay";

/// Numeric `resultStatus` codes.
pub mod result_status {
    pub const SUCCESS: i32 = 9000;
    pub const USER_CANCEL: i32 = 6001;
}

/// Result dictionary the SDK hands to its callbacks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlipayReply {
    pub result_status: Option<String>,
    pub memo: Option<String>,
    pub result: Option<String>,
}

impl AlipayReply {
    pub fn with_status(status: impl Into<String>) -> Self {
        Self {
            result_status: Some(status.into()),
            ..Default::default()
        }
    }

    /// Parse the result dictionary as serialized by the host bridge.
    pub fn from_json(json: &str) -> Result<Self, ThirdError> {
        serde_json::from_str(json).map_err(|e| ThirdError::MalformedPayload(e.to_string()))
    }

    /// `resultStatus` as a number, if present and numeric.
    pub fn status_code(&self) -> Option<i32> {
        self.result_status.as_deref()?.trim().parse().ok()
    }
}

pub type AlipayCompletion = Box<dyn FnOnce(AlipayReply) + Send>;

/// Operations the host performs against the Alipay SDK.
pub trait AlipayApi: Send + Sync {
    /// Start an app payment for a server-signed `order_code`.
    fn pay_order(&self, order_code: &str, from_scheme: &str, completion: AlipayCompletion);

    /// Decode the result carried by a `safepay` return URL.
    fn process_auth_result(&self, url: &Url, completion: AlipayCompletion);
}
