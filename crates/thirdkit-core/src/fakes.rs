//! Recording vendor fakes and capturing observers for unit tests.

use std::sync::Mutex;

use url::Url;

use crate::alipay::{AlipayApi, AlipayCompletion, AlipayReply};
use crate::apple_id::{
    AppleIdCredential, AppleIdProvider, AppleIdScope, AuthorizationCompletion,
    AuthorizationErrorCode,
};
use crate::compress::ImageCompressor;
use crate::errors::ThirdError;
use crate::login::{LoginObserver, LoginPlatform, LoginStatus};
use crate::payment::{PayObserver, PayPlatform, PayStatus};
use crate::share::{ShareObserver, ShareStatus};
use crate::wechat::{SendCompletion, UserActivity, WechatApi, WechatRequest};

pub(crate) struct FakeWechat {
    pub sent: Mutex<Vec<WechatRequest>>,
    /// When set, every send completes immediately with this value.
    pub deliver: Mutex<Option<bool>>,
    pub registered: Mutex<Vec<(String, String)>>,
    pub opened_urls: Mutex<Vec<String>>,
    pub universal_links: Mutex<Vec<UserActivity>>,
    pub handles_urls: Mutex<bool>,
    pub installed: Mutex<bool>,
    pub supported: Mutex<bool>,
    completions: Mutex<Vec<SendCompletion>>,
}

impl Default for FakeWechat {
    fn default() -> Self {
        Self {
            sent: Mutex::default(),
            deliver: Mutex::default(),
            registered: Mutex::default(),
            opened_urls: Mutex::default(),
            universal_links: Mutex::default(),
            handles_urls: Mutex::default(),
            installed: Mutex::default(),
            supported: Mutex::new(true),
            completions: Mutex::default(),
        }
    }
}

impl FakeWechat {
    /// Fire the oldest outstanding send completion.
    pub fn complete_send(&self, delivered: bool) {
        let completion = {
            let mut completions = self.completions.lock().unwrap();
            (!completions.is_empty()).then(|| completions.remove(0))
        };
        if let Some(completion) = completion {
            completion(delivered);
        }
    }
}

impl WechatApi for FakeWechat {
    fn register_app(&self, app_id: &str, universal_link: &str) -> bool {
        self.registered
            .lock()
            .unwrap()
            .push((app_id.to_string(), universal_link.to_string()));
        true
    }

    fn is_installed(&self) -> bool {
        *self.installed.lock().unwrap()
    }

    fn is_supported(&self) -> bool {
        *self.supported.lock().unwrap()
    }

    fn send(&self, request: WechatRequest, completion: SendCompletion) {
        self.sent.lock().unwrap().push(request);
        let deliver = *self.deliver.lock().unwrap();
        match deliver {
            Some(delivered) => completion(delivered),
            None => self.completions.lock().unwrap().push(completion),
        }
    }

    fn handle_open_url(&self, url: &Url) -> bool {
        self.opened_urls.lock().unwrap().push(url.to_string());
        *self.handles_urls.lock().unwrap()
    }

    fn handle_open_universal_link(&self, activity: &UserActivity) -> bool {
        self.universal_links.lock().unwrap().push(activity.clone());
        true
    }
}

#[derive(Default)]
pub(crate) struct FakeAlipay {
    pub orders: Mutex<Vec<(String, String)>>,
    pub processed_urls: Mutex<Vec<String>>,
    /// Reply delivered synchronously by `process_auth_result`.
    pub url_reply: Mutex<Option<AlipayReply>>,
    completions: Mutex<Vec<AlipayCompletion>>,
}

impl FakeAlipay {
    /// Fire the oldest outstanding `pay_order` completion.
    pub fn complete_order(&self, reply: AlipayReply) {
        let completion = {
            let mut completions = self.completions.lock().unwrap();
            (!completions.is_empty()).then(|| completions.remove(0))
        };
        if let Some(completion) = completion {
            completion(reply);
        }
    }
}

impl AlipayApi for FakeAlipay {
    fn pay_order(&self, order_code: &str, from_scheme: &str, completion: AlipayCompletion) {
        self.orders
            .lock()
            .unwrap()
            .push((order_code.to_string(), from_scheme.to_string()));
        self.completions.lock().unwrap().push(completion);
    }

    fn process_auth_result(&self, url: &Url, completion: AlipayCompletion) {
        self.processed_urls.lock().unwrap().push(url.to_string());
        let reply = self.url_reply.lock().unwrap().clone();
        if let Some(reply) = reply {
            completion(reply);
        }
    }
}

#[derive(Default)]
pub(crate) struct FakeAppleId {
    pub requests: Mutex<Vec<Vec<AppleIdScope>>>,
    completions: Mutex<Vec<AuthorizationCompletion>>,
}

impl FakeAppleId {
    pub fn complete(&self, result: Result<AppleIdCredential, AuthorizationErrorCode>) {
        let completion = self.completions.lock().unwrap().pop();
        if let Some(completion) = completion {
            completion(result);
        }
    }
}

impl AppleIdProvider for FakeAppleId {
    fn perform_request(&self, scopes: &[AppleIdScope], completion: AuthorizationCompletion) {
        self.requests.lock().unwrap().push(scopes.to_vec());
        self.completions.lock().unwrap().push(completion);
    }
}

#[derive(Default)]
pub(crate) struct FakeCompressor {
    pub ceilings: Mutex<Vec<usize>>,
    pub fail: Mutex<bool>,
}

impl FakeCompressor {
    pub const OUTPUT: &'static [u8] = b"jpeg";
}

impl ImageCompressor for FakeCompressor {
    fn compress_under(&self, source: &[u8], ceiling: usize) -> Result<Vec<u8>, ThirdError> {
        self.ceilings.lock().unwrap().push(ceiling);
        if *self.fail.lock().unwrap() {
            return Err(ThirdError::ResourceTooLarge {
                size: source.len(),
                ceiling,
            });
        }
        Ok(Self::OUTPUT.to_vec())
    }
}

#[derive(Default)]
pub(crate) struct PayCapture {
    events: Mutex<Vec<(PayStatus, Option<PayPlatform>)>>,
}

impl PayCapture {
    pub fn events(&self) -> Vec<(PayStatus, Option<PayPlatform>)> {
        self.events.lock().unwrap().clone()
    }

    pub fn statuses(&self) -> Vec<PayStatus> {
        self.events().into_iter().map(|(status, _)| status).collect()
    }
}

impl PayObserver for PayCapture {
    fn on_pay_complete(&self, status: &PayStatus, platform: Option<&PayPlatform>) {
        self.events
            .lock()
            .unwrap()
            .push((status.clone(), platform.cloned()));
    }
}

#[derive(Default)]
pub(crate) struct LoginCapture {
    events: Mutex<Vec<(LoginStatus, Option<LoginPlatform>)>>,
}

impl LoginCapture {
    pub fn events(&self) -> Vec<(LoginStatus, Option<LoginPlatform>)> {
        self.events.lock().unwrap().clone()
    }

    pub fn statuses(&self) -> Vec<LoginStatus> {
        self.events().into_iter().map(|(status, _)| status).collect()
    }
}

impl LoginObserver for LoginCapture {
    fn on_login_complete(&self, status: &LoginStatus, platform: Option<&LoginPlatform>) {
        self.events
            .lock()
            .unwrap()
            .push((status.clone(), platform.cloned()));
    }
}

#[derive(Default)]
pub(crate) struct ShareCapture {
    statuses: Mutex<Vec<ShareStatus>>,
}

impl ShareCapture {
    pub fn statuses(&self) -> Vec<ShareStatus> {
        self.statuses.lock().unwrap().clone()
    }
}

impl ShareObserver for ShareCapture {
    fn on_share_complete(&self, status: &ShareStatus) {
        self.statuses.lock().unwrap().push(status.clone());
    }
}
