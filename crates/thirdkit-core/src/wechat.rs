//! WeChat OpenSDK boundary.
//!
//! Request and response shapes mirror the SDK's `BaseReq`/`BaseResp` family
//! closely enough for the host bridge to marshal them one-to-one.

use serde::{Deserialize, Serialize};
use url::Url;

/// `WXErrCode` values reported in every response.
pub mod err_code {
    pub const SUCCESS: i32 = 0;
    pub const COMMON: i32 = -1;
    pub const USER_CANCEL: i32 = -2;
    pub const SENT_FAIL: i32 = -3;
    pub const AUTH_DENY: i32 = -4;
    pub const UNSUPPORT: i32 = -5;
}

/// Fixed `package` value the SDK expects on app payments.
pub const PAY_PACKAGE: &str = "Sign=WXPay";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WechatScene {
    Session,
    Timeline,
    Favorite,
}

impl WechatScene {
    pub fn raw(self) -> i32 {
        match self {
            Self::Session => 0,
            Self::Timeline => 1,
            Self::Favorite => 2,
        }
    }
}

/// Mini-program environment shared links open in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MiniProgramType {
    #[default]
    Release,
    Test,
    Preview,
}

impl MiniProgramType {
    pub fn raw(self) -> u32 {
        match self {
            Self::Release => 0,
            Self::Test => 1,
            Self::Preview => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayRequest {
    pub partner_id: String,
    pub prepay_id: String,
    pub nonce_str: String,
    pub time_stamp: u32,
    pub package: String,
    pub sign: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthRequest {
    pub scope: String,
    pub state: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendMessageRequest {
    pub scene: WechatScene,
    /// Always `false`: every share carries a media object.
    pub text_only: bool,
    pub message: MediaMessage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaMessage {
    pub title: String,
    pub description: String,
    pub thumb_data: Option<Vec<u8>>,
    pub object: MediaObject,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaObject {
    Image { data: Vec<u8> },
    Webpage { url: String },
    MiniProgram(MiniProgramObject),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MiniProgramObject {
    /// Fallback page for clients too old to open mini-programs.
    pub webpage_url: String,
    pub user_name: String,
    pub path: String,
    /// Preview image, 128 KiB at most.
    pub hd_image_data: Option<Vec<u8>>,
    pub with_share_ticket: bool,
    pub program_type: MiniProgramType,
}

/// Outgoing request handed to `WXApi.send`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WechatRequest {
    Pay(PayRequest),
    Auth(AuthRequest),
    SendMessage(SendMessageRequest),
}


/// Request initiated by WeChat itself (`onReq`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WechatInbound {
    ShowMessage { message_ext: Option<String> },
    LaunchFromWechat { message_ext: Option<String>, lang: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayResp {
    pub err_code: i32,
    pub err_str: Option<String>,
    pub return_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthResp {
    pub err_code: i32,
    pub code: Option<String>,
    pub state: Option<String>,
    pub lang: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendMessageResp {
    pub err_code: i32,
    pub lang: Option<String>,
    pub country: Option<String>,
}

/// Response to an earlier request (`onResp`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WechatResponse {
    Pay(PayResp),
    Auth(AuthResp),
    SendMessage(SendMessageResp),
    Other { err_code: i32, err_str: Option<String> },
}

impl WechatResponse {
    pub fn err_code(&self) -> i32 {
        match self {
            Self::Pay(r) => r.err_code,
            Self::Auth(r) => r.err_code,
            Self::SendMessage(r) => r.err_code,
            Self::Other { err_code, .. } => *err_code,
        }
    }
}

/// `NSUserActivity` reduced to what universal-link handling reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserActivity {
    pub activity_type: String,
    pub webpage_url: Option<String>,
}

/// Reports whether the SDK accepted the request for delivery.
pub type SendCompletion = Box<dyn FnOnce(bool) + Send>;

/// Operations the host performs against the WeChat SDK.
///
/// Replies to sent requests come back through the dispatch hub's
/// `on_resp`, not through this trait.
pub trait WechatApi: Send + Sync {
    fn register_app(&self, app_id: &str, universal_link: &str) -> bool;

    fn is_installed(&self) -> bool;

    fn is_supported(&self) -> bool;

    fn send(&self, request: WechatRequest, completion: SendCompletion);

    fn handle_open_url(&self, url: &Url) -> bool;

    fn handle_open_universal_link(&self, activity: &UserActivity) -> bool;
}
