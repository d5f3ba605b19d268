use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use url::Url;

use crate::apple_id::{
    AppleIdCredential, AppleIdProvider, AppleIdScope, AuthorizationCompletion,
    AuthorizationErrorCode,
};
use crate::hub::{DispatchHub, VendorCallbackHandler};
use crate::observers::ObserverRegistry;
use crate::pending::Pending;
use crate::status::ResultStatus;
use crate::wechat::{AuthRequest, SendCompletion, WechatApi, WechatRequest, WechatResponse};

/// Scopes requested from Sign in with Apple.
const APPLE_SCOPES: [AppleIdScope; 2] = [AppleIdScope::FullName, AppleIdScope::Email];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginPlatform {
    /// WeChat OAuth. Both `scope` (e.g. `snsapi_userinfo`) and `state` are required.
    Wechat { scope: String, state: String },
    /// Sign in with Apple.
    Apple,
}

impl LoginPlatform {
    pub fn channel(&self) -> &'static str {
        match self {
            Self::Wechat { .. } => "wechat",
            Self::Apple => "apple",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginPayload {
    /// One-shot code the backend exchanges for a WeChat access token.
    AuthorizationCode(String),
    Identity {
        identity_token: Option<String>,
        user_id: String,
        display_name: Option<String>,
    },
}

pub type LoginStatus = ResultStatus<LoginPayload>;

pub trait LoginObserver: Send + Sync {
    fn on_login_complete(&self, status: &LoginStatus, platform: Option<&LoginPlatform>);
}

struct LoginState {
    pending: Pending<LoginPlatform>,
    observers: ObserverRegistry<dyn LoginObserver>,
}

pub struct LoginManager {
    wechat: Arc<dyn WechatApi>,
    apple_id: Arc<dyn AppleIdProvider>,
    state: Mutex<LoginState>,
    me: Weak<Self>,
}

impl LoginManager {
    pub fn new(
        hub: &DispatchHub,
        wechat: Arc<dyn WechatApi>,
        apple_id: Arc<dyn AppleIdProvider>,
    ) -> Arc<Self> {
        let manager = Arc::new_cyclic(|me| Self {
            wechat,
            apple_id,
            state: Mutex::new(LoginState {
                pending: Pending::new(),
                observers: ObserverRegistry::new(),
            }),
            me: me.clone(),
        });
        let handler: Arc<dyn VendorCallbackHandler> = manager.clone();
        hub.add_handler(&handler);
        manager
    }

    pub fn add(&self, observer: &Arc<dyn LoginObserver>) -> bool {
        self.state().observers.add(observer)
    }

    pub fn remove(&self, observer: &Arc<dyn LoginObserver>) -> bool {
        self.state().observers.remove(observer)
    }

    pub fn pending_platform(&self) -> Option<LoginPlatform> {
        self.state().pending.current().cloned()
    }

    pub fn login(&self, platform: LoginPlatform) {
        tracing::info!("login via {}", platform.channel());
        match platform {
            LoginPlatform::Wechat { scope, state } => {
                // Observers hear nothing for this case.
                if scope.is_empty() || state.is_empty() {
                    tracing::warn!(
                        "wechat login skipped: scope empty={} state empty={}",
                        scope.is_empty(),
                        state.is_empty()
                    );
                    return;
                }
                self.begin(LoginPlatform::Wechat {
                    scope: scope.clone(),
                    state: state.clone(),
                });
                self.wechat.send(
                    WechatRequest::Auth(AuthRequest { scope, state }),
                    self.delivery_completion(),
                );
            }
            LoginPlatform::Apple => {
                self.begin(LoginPlatform::Apple);
                self.apple_id
                    .perform_request(&APPLE_SCOPES, self.apple_completion());
            }
        }
    }

    fn begin(&self, platform: LoginPlatform) {
        let replaced = self.state().pending.begin(platform);
        if let Some(previous) = replaced {
            tracing::warn!("superseding in-flight {} login", previous.channel());
        }
    }

    fn apple_completion(&self) -> AuthorizationCompletion {
        let me = self.me.clone();
        Box::new(move |result| {
            if let Some(manager) = me.upgrade() {
                manager.finish(apple_status(result));
            }
        })
    }

    fn delivery_completion(&self) -> SendCompletion {
        let me = self.me.clone();
        Box::new(move |delivered| {
            if delivered {
                return;
            }
            if let Some(manager) = me.upgrade() {
                manager.finish(ResultStatus::unusual("wechat request not delivered"));
            }
        })
    }

    fn finish(&self, status: LoginStatus) {
        let (platform, observers) = {
            let mut state = self.state();
            let Some(platform) = state.pending.take() else {
                tracing::debug!("no login in flight, dropping {} result", status.kind());
                return;
            };
            (platform, state.observers.live())
        };
        tracing::info!("{} login finished: {}", platform.channel(), status.kind());
        for observer in observers {
            observer.on_login_complete(&status, Some(&platform));
        }
    }

    fn state(&self) -> MutexGuard<'_, LoginState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn apple_status(result: Result<AppleIdCredential, AuthorizationErrorCode>) -> LoginStatus {
    match result {
        Ok(credential) => {
            let display_name = credential.display_name();
            match credential.identity_token {
                Some(token) => ResultStatus::Success(Some(LoginPayload::Identity {
                    identity_token: String::from_utf8(token).ok(),
                    user_id: credential.user,
                    display_name,
                })),
                None => ResultStatus::unusual("authorization credential mismatch"),
            }
        }
        Err(code) => {
            tracing::warn!("apple authorization failed with code {}", code.raw());
            code.into()
        }
    }
}

impl VendorCallbackHandler for LoginManager {
    fn on_resp(&self, resp: &WechatResponse) {
        if let WechatResponse::Auth(resp) = resp {
            self.finish(ResultStatus::from_wechat(resp.err_code, || {
                Some(LoginPayload::AuthorizationCode(
                    resp.code.clone().unwrap_or_default(),
                ))
            }));
        }
    }

    fn handle_open_url(&self, _url: &Url) {}
}
