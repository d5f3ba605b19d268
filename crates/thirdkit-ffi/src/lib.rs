//! UniFFI bindings for thirdkit-core.
//!
//! Provides a ThirdKitClient object that wraps the dispatch hub and the
//! payment, login and share managers into a single FFI-safe interface.
//! The host implements the vendor bridges; asynchronous vendor work is
//! correlated through tickets the host hands back on completion.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thirdkit_core::{
    alipay::{AlipayApi, AlipayCompletion, AlipayReply as CoreAlipayReply},
    apple_id::{
        AppleIdCredential as CoreAppleIdCredential, AppleIdProvider,
        AppleIdScope as CoreAppleIdScope, AuthorizationCompletion, AuthorizationErrorCode,
        PersonName,
    },
    hub::HubConfig as CoreHubConfig,
    wechat::{
        MediaMessage as CoreMediaMessage, MediaObject as CoreMediaObject, MiniProgramObject,
        MiniProgramType as CoreMiniProgramType, SendCompletion,
        UserActivity as CoreUserActivity, WechatApi, WechatInbound as CoreWechatInbound,
        WechatRequest as CoreWechatRequest, WechatResponse as CoreWechatResponse,
        WechatScene as CoreWechatScene,
    },
    LoginPayload as CoreLoginPayload, LoginPlatform as CoreLoginPlatform,
    LoginStatus as CoreLoginStatus, PayPlatform as CorePayPlatform, PayStatus as CorePayStatus,
    PlatformConfig, RegisterPlatform as CoreRegisterPlatform, ResultStatus,
    ShareMessage as CoreShareMessage, SharePlatform as CoreSharePlatform,
    ShareStatus as CoreShareStatus, ThirdError, ThirdKit, Vendors,
};
use url::Url;

uniffi::setup_scaffolding!();

// ── Namespace functions ──────────────────────────────────────────────

/// Initialize tracing/logging. Call once from the host before using ThirdKitClient.
#[uniffi::export]
pub fn init_logging() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("thirdkit_core=debug,thirdkit_ffi=debug")
            });
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .init();
    });
}

// ── FFI-safe type conversions ──────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum MiniProgramType {
    Release,
    Test,
    Preview,
}

impl From<MiniProgramType> for CoreMiniProgramType {
    fn from(t: MiniProgramType) -> Self {
        match t {
            MiniProgramType::Release => Self::Release,
            MiniProgramType::Test => Self::Test,
            MiniProgramType::Preview => Self::Preview,
        }
    }
}

impl From<CoreMiniProgramType> for MiniProgramType {
    fn from(t: CoreMiniProgramType) -> Self {
        match t {
            CoreMiniProgramType::Release => Self::Release,
            CoreMiniProgramType::Test => Self::Test,
            CoreMiniProgramType::Preview => Self::Preview,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum WechatScene {
    Session,
    Timeline,
    Favorite,
}

impl From<WechatScene> for CoreWechatScene {
    fn from(s: WechatScene) -> Self {
        match s {
            WechatScene::Session => Self::Session,
            WechatScene::Timeline => Self::Timeline,
            WechatScene::Favorite => Self::Favorite,
        }
    }
}

impl From<CoreWechatScene> for WechatScene {
    fn from(s: CoreWechatScene) -> Self {
        match s {
            CoreWechatScene::Session => Self::Session,
            CoreWechatScene::Timeline => Self::Timeline,
            CoreWechatScene::Favorite => Self::Favorite,
        }
    }
}

#[derive(Debug, Clone, uniffi::Enum)]
pub enum RegisterPlatform {
    Wechat {
        app_id: String,
        universal_link: String,
        mini_program: MiniProgramType,
    },
    Alipay {
        scheme: String,
    },
}

impl From<RegisterPlatform> for CoreRegisterPlatform {
    fn from(p: RegisterPlatform) -> Self {
        match p {
            RegisterPlatform::Wechat {
                app_id,
                universal_link,
                mini_program,
            } => Self::Wechat {
                app_id,
                universal_link,
                mini_program: mini_program.into(),
            },
            RegisterPlatform::Alipay { scheme } => Self::Alipay { scheme },
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct HubConfig {
    pub wechat_app_id: Option<String>,
    pub universal_link: Option<String>,
    pub scheme: Option<String>,
    pub mini_program: MiniProgramType,
}

impl From<CoreHubConfig> for HubConfig {
    fn from(c: CoreHubConfig) -> Self {
        Self {
            wechat_app_id: c.wechat_app_id,
            universal_link: c.universal_link,
            scheme: c.scheme,
            mini_program: c.mini_program.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum PayPlatform {
    Wechat {
        partner_id: String,
        prepay_id: String,
        nonce_str: String,
        time_stamp: String,
        sign: String,
        order_no: Option<String>,
    },
    Alipay {
        order_code: String,
        order_no: Option<String>,
    },
}

impl From<PayPlatform> for CorePayPlatform {
    fn from(p: PayPlatform) -> Self {
        match p {
            PayPlatform::Wechat {
                partner_id,
                prepay_id,
                nonce_str,
                time_stamp,
                sign,
                order_no,
            } => Self::Wechat {
                partner_id,
                prepay_id,
                nonce_str,
                time_stamp,
                sign,
                order_no,
            },
            PayPlatform::Alipay {
                order_code,
                order_no,
            } => Self::Alipay {
                order_code,
                order_no,
            },
        }
    }
}

impl From<CorePayPlatform> for PayPlatform {
    fn from(p: CorePayPlatform) -> Self {
        match p {
            CorePayPlatform::Wechat {
                partner_id,
                prepay_id,
                nonce_str,
                time_stamp,
                sign,
                order_no,
            } => Self::Wechat {
                partner_id,
                prepay_id,
                nonce_str,
                time_stamp,
                sign,
                order_no,
            },
            CorePayPlatform::Alipay {
                order_code,
                order_no,
            } => Self::Alipay {
                order_code,
                order_no,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum LoginPlatform {
    Wechat { scope: String, state: String },
    Apple,
}

impl From<LoginPlatform> for CoreLoginPlatform {
    fn from(p: LoginPlatform) -> Self {
        match p {
            LoginPlatform::Wechat { scope, state } => Self::Wechat { scope, state },
            LoginPlatform::Apple => Self::Apple,
        }
    }
}

impl From<CoreLoginPlatform> for LoginPlatform {
    fn from(p: CoreLoginPlatform) -> Self {
        match p {
            CoreLoginPlatform::Wechat { scope, state } => Self::Wechat { scope, state },
            CoreLoginPlatform::Apple => Self::Apple,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum LoginPayload {
    AuthorizationCode {
        code: String,
    },
    Identity {
        identity_token: Option<String>,
        user_id: String,
        display_name: Option<String>,
    },
}

impl From<CoreLoginPayload> for LoginPayload {
    fn from(p: CoreLoginPayload) -> Self {
        match p {
            CoreLoginPayload::AuthorizationCode(code) => Self::AuthorizationCode { code },
            CoreLoginPayload::Identity {
                identity_token,
                user_id,
                display_name,
            } => Self::Identity {
                identity_token,
                user_id,
                display_name,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum ShareMessage {
    Image {
        data: Vec<u8>,
    },
    Link {
        url: String,
        title: Option<String>,
        description: Option<String>,
        thumb: Option<Vec<u8>>,
    },
    MiniProgram {
        path: String,
        user_name: String,
        title: Option<String>,
        description: Option<String>,
        thumb: Option<Vec<u8>>,
    },
}

impl From<ShareMessage> for CoreShareMessage {
    fn from(m: ShareMessage) -> Self {
        match m {
            ShareMessage::Image { data } => Self::Image { data },
            ShareMessage::Link {
                url,
                title,
                description,
                thumb,
            } => Self::Link {
                url,
                title,
                description,
                thumb,
            },
            ShareMessage::MiniProgram {
                path,
                user_name,
                title,
                description,
                thumb,
            } => Self::MiniProgram {
                path,
                user_name,
                title,
                description,
                thumb,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum SharePlatform {
    Wechat {
        scene: WechatScene,
        message: ShareMessage,
    },
}

impl From<SharePlatform> for CoreSharePlatform {
    fn from(p: SharePlatform) -> Self {
        match p {
            SharePlatform::Wechat { scene, message } => Self::Wechat {
                scene: scene.into(),
                message: message.into(),
            },
        }
    }
}

/// Terminal outcome of a payment or share.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum ActionStatus {
    Fail,
    Success,
    Cancel,
    Unusual { message: String },
    Unknown,
}

impl<T> From<&ResultStatus<T>> for ActionStatus {
    fn from(s: &ResultStatus<T>) -> Self {
        match s {
            ResultStatus::Fail => Self::Fail,
            ResultStatus::Success(_) => Self::Success,
            ResultStatus::Cancel => Self::Cancel,
            ResultStatus::Unusual(message) => Self::Unusual {
                message: message.clone(),
            },
            ResultStatus::Unknown => Self::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum LoginStatus {
    Fail,
    Success { payload: Option<LoginPayload> },
    Cancel,
    Unusual { message: String },
    Unknown,
}

impl From<&CoreLoginStatus> for LoginStatus {
    fn from(s: &CoreLoginStatus) -> Self {
        match s {
            ResultStatus::Fail => Self::Fail,
            ResultStatus::Success(payload) => Self::Success {
                payload: payload.clone().map(LoginPayload::from),
            },
            ResultStatus::Cancel => Self::Cancel,
            ResultStatus::Unusual(message) => Self::Unusual {
                message: message.clone(),
            },
            ResultStatus::Unknown => Self::Unknown,
        }
    }
}

// ── WeChat wire types ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum MediaObject {
    Image {
        data: Vec<u8>,
    },
    Webpage {
        url: String,
    },
    MiniProgram {
        webpage_url: String,
        user_name: String,
        path: String,
        hd_image_data: Option<Vec<u8>>,
        with_share_ticket: bool,
        program_type: MiniProgramType,
    },
}

impl From<CoreMediaObject> for MediaObject {
    fn from(o: CoreMediaObject) -> Self {
        match o {
            CoreMediaObject::Image { data } => Self::Image { data },
            CoreMediaObject::Webpage { url } => Self::Webpage { url },
            CoreMediaObject::MiniProgram(MiniProgramObject {
                webpage_url,
                user_name,
                path,
                hd_image_data,
                with_share_ticket,
                program_type,
            }) => Self::MiniProgram {
                webpage_url,
                user_name,
                path,
                hd_image_data,
                with_share_ticket,
                program_type: program_type.into(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct MediaMessage {
    pub title: String,
    pub description: String,
    pub thumb_data: Option<Vec<u8>>,
    pub object: MediaObject,
}

impl From<CoreMediaMessage> for MediaMessage {
    fn from(m: CoreMediaMessage) -> Self {
        Self {
            title: m.title,
            description: m.description,
            thumb_data: m.thumb_data,
            object: m.object.into(),
        }
    }
}

/// A request the host forwards to `WXApi.send`.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum WechatRequest {
    Pay {
        partner_id: String,
        prepay_id: String,
        nonce_str: String,
        time_stamp: u32,
        package: String,
        sign: String,
    },
    Auth {
        scope: String,
        state: String,
    },
    SendMessage {
        scene: WechatScene,
        text_only: bool,
        message: MediaMessage,
    },
}

impl From<CoreWechatRequest> for WechatRequest {
    fn from(r: CoreWechatRequest) -> Self {
        match r {
            CoreWechatRequest::Pay(pay) => Self::Pay {
                partner_id: pay.partner_id,
                prepay_id: pay.prepay_id,
                nonce_str: pay.nonce_str,
                time_stamp: pay.time_stamp,
                package: pay.package,
                sign: pay.sign,
            },
            CoreWechatRequest::Auth(auth) => Self::Auth {
                scope: auth.scope,
                state: auth.state,
            },
            CoreWechatRequest::SendMessage(send) => Self::SendMessage {
                scene: send.scene.into(),
                text_only: send.text_only,
                message: send.message.into(),
            },
        }
    }
}

#[derive(Debug, Clone, uniffi::Enum)]
pub enum WechatResponse {
    Pay {
        err_code: i32,
        err_str: Option<String>,
        return_key: Option<String>,
    },
    Auth {
        err_code: i32,
        code: Option<String>,
        state: Option<String>,
        lang: Option<String>,
        country: Option<String>,
    },
    SendMessage {
        err_code: i32,
        lang: Option<String>,
        country: Option<String>,
    },
    Other {
        err_code: i32,
        err_str: Option<String>,
    },
}

impl From<WechatResponse> for CoreWechatResponse {
    fn from(r: WechatResponse) -> Self {
        use thirdkit_core::wechat::{AuthResp, PayResp, SendMessageResp};
        match r {
            WechatResponse::Pay {
                err_code,
                err_str,
                return_key,
            } => Self::Pay(PayResp {
                err_code,
                err_str,
                return_key,
            }),
            WechatResponse::Auth {
                err_code,
                code,
                state,
                lang,
                country,
            } => Self::Auth(AuthResp {
                err_code,
                code,
                state,
                lang,
                country,
            }),
            WechatResponse::SendMessage {
                err_code,
                lang,
                country,
            } => Self::SendMessage(SendMessageResp {
                err_code,
                lang,
                country,
            }),
            WechatResponse::Other { err_code, err_str } => Self::Other { err_code, err_str },
        }
    }
}

#[derive(Debug, Clone, uniffi::Enum)]
pub enum WechatInbound {
    ShowMessage {
        message_ext: Option<String>,
    },
    LaunchFromWechat {
        message_ext: Option<String>,
        lang: Option<String>,
    },
}

impl From<WechatInbound> for CoreWechatInbound {
    fn from(r: WechatInbound) -> Self {
        match r {
            WechatInbound::ShowMessage { message_ext } => Self::ShowMessage { message_ext },
            WechatInbound::LaunchFromWechat { message_ext, lang } => {
                Self::LaunchFromWechat { message_ext, lang }
            }
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct UserActivity {
    pub activity_type: String,
    pub webpage_url: Option<String>,
}

impl From<UserActivity> for CoreUserActivity {
    fn from(a: UserActivity) -> Self {
        Self {
            activity_type: a.activity_type,
            webpage_url: a.webpage_url,
        }
    }
}

impl From<CoreUserActivity> for UserActivity {
    fn from(a: CoreUserActivity) -> Self {
        Self {
            activity_type: a.activity_type,
            webpage_url: a.webpage_url,
        }
    }
}

// ── Alipay and Apple ID wire types ────────────────────────────────────

/// The result dictionary the Alipay SDK hands back.
#[derive(Debug, Clone, uniffi::Record)]
pub struct AlipayReply {
    pub result_status: Option<String>,
    pub memo: Option<String>,
    pub result: Option<String>,
}

impl From<AlipayReply> for CoreAlipayReply {
    fn from(r: AlipayReply) -> Self {
        Self {
            result_status: r.result_status,
            memo: r.memo,
            result: r.result,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum AppleIdScope {
    FullName,
    Email,
}

impl From<CoreAppleIdScope> for AppleIdScope {
    fn from(s: CoreAppleIdScope) -> Self {
        match s {
            CoreAppleIdScope::FullName => Self::FullName,
            CoreAppleIdScope::Email => Self::Email,
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct AppleIdCredential {
    pub user: String,
    pub identity_token: Option<Vec<u8>>,
    pub authorization_code: Option<Vec<u8>>,
    pub family_name: Option<String>,
    pub given_name: Option<String>,
    pub email: Option<String>,
}

impl From<AppleIdCredential> for CoreAppleIdCredential {
    fn from(c: AppleIdCredential) -> Self {
        let full_name = (c.family_name.is_some() || c.given_name.is_some()).then(|| PersonName {
            family_name: c.family_name,
            given_name: c.given_name,
        });
        Self {
            user: c.user,
            identity_token: c.identity_token,
            authorization_code: c.authorization_code,
            full_name,
            email: c.email,
        }
    }
}

// ── Error conversion ──────────────────────────────────────────────────

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum ThirdKitError {
    #[error("Invalid URL: {msg}")]
    InvalidUrl { msg: String },
    #[error("Image error: {msg}")]
    Image { msg: String },
    #[error("Resource too large: {msg}")]
    ResourceTooLarge { msg: String },
    #[error("Malformed payload: {msg}")]
    MalformedPayload { msg: String },
    #[error("Config error: {msg}")]
    Config { msg: String },
    #[error("IO error: {msg}")]
    Io { msg: String },
}

impl From<ThirdError> for ThirdKitError {
    fn from(e: ThirdError) -> Self {
        tracing::error!("ThirdError: {e}");
        match e {
            ThirdError::InvalidUrl(msg) => Self::InvalidUrl { msg },
            ThirdError::Image(msg) => Self::Image { msg },
            e @ ThirdError::ResourceTooLarge { .. } => Self::ResourceTooLarge {
                msg: e.to_string(),
            },
            ThirdError::MalformedPayload(msg) => Self::MalformedPayload { msg },
            ThirdError::Config(msg) => Self::Config { msg },
            ThirdError::Io(e) => Self::Io { msg: e.to_string() },
        }
    }
}

// ── Callback interfaces ───────────────────────────────────────────────

/// Host side of the WeChat SDK (`WXApi`).
///
/// `send` must eventually be answered with `ThirdKitClient::wechat_send_completed`
/// carrying the same ticket.
#[uniffi::export(callback_interface)]
pub trait WechatBridge: Send + Sync {
    fn register_app(&self, app_id: String, universal_link: String) -> bool;
    fn is_installed(&self) -> bool;
    fn is_supported(&self) -> bool;
    fn send(&self, request: WechatRequest, ticket: u64);
    fn handle_open_url(&self, url: String) -> bool;
    fn handle_open_universal_link(&self, activity: UserActivity) -> bool;
}

/// Host side of the Alipay SDK. Both calls are answered with
/// `ThirdKitClient::alipay_completed` carrying the ticket.
#[uniffi::export(callback_interface)]
pub trait AlipayBridge: Send + Sync {
    fn pay_order(&self, order_code: String, from_scheme: String, ticket: u64);
    fn process_auth_result(&self, url: String, ticket: u64);
}

/// Host side of Sign in with Apple. Answered with `apple_id_completed`
/// or `apple_id_failed`.
#[uniffi::export(callback_interface)]
pub trait AppleIdBridge: Send + Sync {
    fn perform_request(&self, scopes: Vec<AppleIdScope>, ticket: u64);
}

#[uniffi::export(callback_interface)]
pub trait PayObserver: Send + Sync {
    fn on_pay_complete(&self, status: ActionStatus, platform: Option<PayPlatform>);
}

#[uniffi::export(callback_interface)]
pub trait LoginObserver: Send + Sync {
    fn on_login_complete(&self, status: LoginStatus, platform: Option<LoginPlatform>);
}

#[uniffi::export(callback_interface)]
pub trait ShareObserver: Send + Sync {
    fn on_share_complete(&self, status: ActionStatus);
}

// ── Ticketed completions ──────────────────────────────────────────────

/// Completions parked while the host performs vendor work.
struct Tickets<C> {
    next: AtomicU64,
    waiting: Mutex<HashMap<u64, C>>,
}

impl<C> Tickets<C> {
    fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
            waiting: Mutex::new(HashMap::new()),
        }
    }

    fn issue(&self, completion: C) -> u64 {
        let ticket = self.next.fetch_add(1, Ordering::Relaxed);
        self.waiting().insert(ticket, completion);
        ticket
    }

    fn redeem(&self, ticket: u64) -> Option<C> {
        let completion = self.waiting().remove(&ticket);
        if completion.is_none() {
            tracing::debug!("no completion waiting on ticket {ticket}");
        }
        completion
    }

    /// Redeem `ticket` and discard every other parked completion with it.
    fn redeem_exclusive(&self, ticket: u64) -> Option<C> {
        let mut waiting = self.waiting();
        let Some(completion) = waiting.remove(&ticket) else {
            tracing::debug!("no completion waiting on ticket {ticket}");
            return None;
        };
        if !waiting.is_empty() {
            tracing::debug!("discarding {} sibling completion(s)", waiting.len());
            waiting.clear();
        }
        Some(completion)
    }

    fn clear(&self) {
        let mut waiting = self.waiting();
        if !waiting.is_empty() {
            tracing::debug!("discarding {} stale completion(s)", waiting.len());
            waiting.clear();
        }
    }

    fn waiting(&self) -> MutexGuard<'_, HashMap<u64, C>> {
        self.waiting.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ── Bridge adapters: FFI callback → core vendor trait ─────────────────

struct WechatAdapter {
    bridge: Box<dyn WechatBridge>,
    sends: Tickets<SendCompletion>,
}

impl WechatApi for WechatAdapter {
    fn register_app(&self, app_id: &str, universal_link: &str) -> bool {
        self.bridge
            .register_app(app_id.to_string(), universal_link.to_string())
    }

    fn is_installed(&self) -> bool {
        self.bridge.is_installed()
    }

    fn is_supported(&self) -> bool {
        self.bridge.is_supported()
    }

    fn send(&self, request: CoreWechatRequest, completion: SendCompletion) {
        let ticket = self.sends.issue(completion);
        self.bridge.send(request.into(), ticket);
    }

    fn handle_open_url(&self, url: &Url) -> bool {
        self.bridge.handle_open_url(url.to_string())
    }

    fn handle_open_universal_link(&self, activity: &CoreUserActivity) -> bool {
        self.bridge
            .handle_open_universal_link(activity.clone().into())
    }
}

/// The SDK answers a payment through either `pay_order` or the `safepay`
/// URL, never both, so parked replies belong to one payment at a time.
struct AlipayAdapter {
    bridge: Box<dyn AlipayBridge>,
    replies: Tickets<AlipayCompletion>,
}

impl AlipayAdapter {
    fn complete(&self, ticket: u64, reply: CoreAlipayReply) -> bool {
        match self.replies.redeem_exclusive(ticket) {
            Some(completion) => {
                completion(reply);
                true
            }
            None => false,
        }
    }
}

impl AlipayApi for AlipayAdapter {
    fn pay_order(&self, order_code: &str, from_scheme: &str, completion: AlipayCompletion) {
        self.replies.clear();
        let ticket = self.replies.issue(completion);
        self.bridge
            .pay_order(order_code.to_string(), from_scheme.to_string(), ticket);
    }

    fn process_auth_result(&self, url: &Url, completion: AlipayCompletion) {
        let ticket = self.replies.issue(completion);
        self.bridge.process_auth_result(url.to_string(), ticket);
    }
}

struct AppleIdAdapter {
    bridge: Box<dyn AppleIdBridge>,
    requests: Tickets<AuthorizationCompletion>,
}

impl AppleIdProvider for AppleIdAdapter {
    fn perform_request(&self, scopes: &[CoreAppleIdScope], completion: AuthorizationCompletion) {
        let ticket = self.requests.issue(completion);
        let scopes = scopes.iter().copied().map(AppleIdScope::from).collect();
        self.bridge.perform_request(scopes, ticket);
    }
}

// ── Bridge observers: core observer → FFI callback ────────────────────

struct BridgePayObserver {
    ffi_observer: Box<dyn PayObserver>,
}

impl thirdkit_core::PayObserver for BridgePayObserver {
    fn on_pay_complete(&self, status: &CorePayStatus, platform: Option<&CorePayPlatform>) {
        self.ffi_observer
            .on_pay_complete(status.into(), platform.cloned().map(PayPlatform::from));
    }
}

struct BridgeLoginObserver {
    ffi_observer: Box<dyn LoginObserver>,
}

impl thirdkit_core::LoginObserver for BridgeLoginObserver {
    fn on_login_complete(&self, status: &CoreLoginStatus, platform: Option<&CoreLoginPlatform>) {
        self.ffi_observer
            .on_login_complete(status.into(), platform.cloned().map(LoginPlatform::from));
    }
}

struct BridgeShareObserver {
    ffi_observer: Box<dyn ShareObserver>,
}

impl thirdkit_core::ShareObserver for BridgeShareObserver {
    fn on_share_complete(&self, status: &CoreShareStatus) {
        self.ffi_observer.on_share_complete(status.into());
    }
}

enum Registration {
    Pay(Arc<dyn thirdkit_core::PayObserver>),
    Login(Arc<dyn thirdkit_core::LoginObserver>),
    Share(Arc<dyn thirdkit_core::ShareObserver>),
}

/// Keeps an observer registered. Managers hold observers weakly, so the
/// registration ends when the host releases this handle.
#[derive(uniffi::Object)]
pub struct ObserverHandle {
    registration: Registration,
}

// ── ThirdKitClient: main FFI object ───────────────────────────────────

#[derive(uniffi::Object)]
pub struct ThirdKitClient {
    kit: ThirdKit,
    wechat: Arc<WechatAdapter>,
    alipay: Arc<AlipayAdapter>,
    apple_id: Arc<AppleIdAdapter>,
}

#[uniffi::export]
impl ThirdKitClient {
    #[uniffi::constructor]
    pub fn new(
        wechat: Box<dyn WechatBridge>,
        alipay: Box<dyn AlipayBridge>,
        apple_id: Box<dyn AppleIdBridge>,
    ) -> Arc<Self> {
        let wechat = Arc::new(WechatAdapter {
            bridge: wechat,
            sends: Tickets::new(),
        });
        let alipay = Arc::new(AlipayAdapter {
            bridge: alipay,
            replies: Tickets::new(),
        });
        let apple_id = Arc::new(AppleIdAdapter {
            bridge: apple_id,
            requests: Tickets::new(),
        });
        let kit = ThirdKit::new(Vendors::new(
            wechat.clone(),
            alipay.clone(),
            apple_id.clone(),
        ));
        tracing::info!("ThirdKitClient created");
        Arc::new(Self {
            kit,
            wechat,
            alipay,
            apple_id,
        })
    }

    pub fn register_platforms(&self, platforms: Vec<RegisterPlatform>) {
        let platforms: Vec<CoreRegisterPlatform> =
            platforms.into_iter().map(Into::into).collect();
        self.kit.hub().register_platforms(&platforms);
    }

    /// Register everything described by a platform config JSON document.
    pub fn register_config_json(&self, json: String) -> Result<(), ThirdKitError> {
        let config = PlatformConfig::from_json_str(&json)?;
        self.kit.hub().register_platforms(&config.registrations());
        Ok(())
    }

    pub fn config(&self) -> HubConfig {
        self.kit.hub().config().into()
    }

    pub fn is_wechat_installed(&self) -> bool {
        self.kit.hub().is_wechat_installed()
    }

    pub fn handle_open_url(&self, url: String) -> bool {
        self.kit.hub().handle_open_url(&url)
    }

    pub fn handle_open_universal_link(&self, activity: UserActivity) -> bool {
        self.kit.hub().handle_open_universal_link(&activity.into())
    }

    pub fn pay(&self, platform: PayPlatform) {
        self.kit.payment().pay(platform.into());
    }

    pub fn login(&self, platform: LoginPlatform) {
        self.kit.login().login(platform.into());
    }

    pub fn share(&self, platform: SharePlatform) {
        self.kit.share().share(platform.into());
    }

    pub fn add_pay_observer(&self, observer: Box<dyn PayObserver>) -> Arc<ObserverHandle> {
        let observer: Arc<dyn thirdkit_core::PayObserver> = Arc::new(BridgePayObserver {
            ffi_observer: observer,
        });
        self.kit.payment().add(&observer);
        Arc::new(ObserverHandle {
            registration: Registration::Pay(observer),
        })
    }

    pub fn add_login_observer(&self, observer: Box<dyn LoginObserver>) -> Arc<ObserverHandle> {
        let observer: Arc<dyn thirdkit_core::LoginObserver> = Arc::new(BridgeLoginObserver {
            ffi_observer: observer,
        });
        self.kit.login().add(&observer);
        Arc::new(ObserverHandle {
            registration: Registration::Login(observer),
        })
    }

    pub fn add_share_observer(&self, observer: Box<dyn ShareObserver>) -> Arc<ObserverHandle> {
        let observer: Arc<dyn thirdkit_core::ShareObserver> = Arc::new(BridgeShareObserver {
            ffi_observer: observer,
        });
        self.kit.share().add(&observer);
        Arc::new(ObserverHandle {
            registration: Registration::Share(observer),
        })
    }

    pub fn remove_observer(&self, handle: Arc<ObserverHandle>) -> bool {
        match &handle.registration {
            Registration::Pay(observer) => self.kit.payment().remove(observer),
            Registration::Login(observer) => self.kit.login().remove(observer),
            Registration::Share(observer) => self.kit.share().remove(observer),
        }
    }

    // ── Host → core completions ──

    /// Report whether WeChat accepted the request sent under `ticket`.
    pub fn wechat_send_completed(&self, ticket: u64, delivered: bool) -> bool {
        match self.wechat.sends.redeem(ticket) {
            Some(completion) => {
                completion(delivered);
                true
            }
            None => false,
        }
    }

    /// Forward a `WXApiDelegate.onResp` callback.
    pub fn wechat_on_resp(&self, resp: WechatResponse) {
        self.kit.hub().on_resp(&resp.into());
    }

    /// Forward a `WXApiDelegate.onReq` callback.
    pub fn wechat_on_req(&self, req: WechatInbound) {
        self.kit.hub().on_req(&req.into());
    }

    pub fn alipay_completed(&self, ticket: u64, reply: AlipayReply) -> bool {
        self.alipay.complete(ticket, reply.into())
    }

    /// Same as `alipay_completed`, taking the SDK's result dictionary as JSON.
    pub fn alipay_completed_json(&self, ticket: u64, json: String) -> Result<bool, ThirdKitError> {
        let reply = CoreAlipayReply::from_json(&json)?;
        Ok(self.alipay.complete(ticket, reply))
    }

    pub fn apple_id_completed(&self, ticket: u64, credential: AppleIdCredential) -> bool {
        match self.apple_id.requests.redeem(ticket) {
            Some(completion) => {
                completion(Ok(credential.into()));
                true
            }
            None => false,
        }
    }

    /// Report an `ASAuthorizationError` code for the request under `ticket`.
    pub fn apple_id_failed(&self, ticket: u64, code: i64) -> bool {
        match self.apple_id.requests.redeem(ticket) {
            Some(completion) => {
                completion(Err(AuthorizationErrorCode::from_raw(code)));
                true
            }
            None => false,
        }
    }
}
