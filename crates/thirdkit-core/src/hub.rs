use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use url::Url;

use crate::alipay::SAFEPAY_HOST;
use crate::observers::ObserverRegistry;
use crate::wechat::{MiniProgramType, UserActivity, WechatApi, WechatInbound, WechatResponse};

/// Contract capability managers implement to receive vendor traffic from the hub.
///
/// The hub broadcasts everything to every handler; each handler picks out the
/// message types it understands and ignores the rest.
pub trait VendorCallbackHandler: Send + Sync {
    /// A request WeChat initiated. No manager acts on these today.
    fn on_req(&self, _req: &WechatInbound) {}

    fn on_resp(&self, resp: &WechatResponse);

    fn handle_open_url(&self, url: &Url);
}

/// Vendor configuration set at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HubConfig {
    pub wechat_app_id: Option<String>,
    pub universal_link: Option<String>,
    /// URL scheme Alipay returns to.
    pub scheme: Option<String>,
    pub mini_program: MiniProgramType,
}

/// One entry of a batch registration.
#[derive(Debug, Clone, PartialEq, Eq)]
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

/// Routes vendor callbacks and URL-open events to the capability managers.
///
/// Managers hold the hub strongly; the hub holds managers weakly, so a
/// dropped manager simply stops receiving traffic.
pub struct DispatchHub {
    wechat: Arc<dyn WechatApi>,
    config: RwLock<HubConfig>,
    handlers: Mutex<ObserverRegistry<dyn VendorCallbackHandler>>,
}

impl DispatchHub {
    pub fn new(wechat: Arc<dyn WechatApi>) -> Self {
        Self {
            wechat,
            config: RwLock::new(HubConfig::default()),
            handlers: Mutex::new(ObserverRegistry::new()),
        }
    }

    /// Apply a batch of vendor registrations. Later entries overwrite earlier ones.
    pub fn register_platforms(&self, platforms: &[RegisterPlatform]) {
        for platform in platforms {
            match platform {
                RegisterPlatform::Wechat {
                    app_id,
                    universal_link,
                    mini_program,
                } => {
                    {
                        let mut config = self.config_mut();
                        config.wechat_app_id = Some(app_id.clone());
                        config.universal_link = Some(universal_link.clone());
                        config.mini_program = *mini_program;
                    }
                    if self.wechat.register_app(app_id, universal_link) {
                        tracing::info!("wechat registered: app_id={app_id}");
                    } else {
                        tracing::warn!("wechat rejected registration for app_id={app_id}");
                    }
                }
                RegisterPlatform::Alipay { scheme } => {
                    self.config_mut().scheme = Some(scheme.clone());
                    tracing::info!("alipay registered: scheme={scheme}");
                }
            }
        }
    }

    pub fn config(&self) -> HubConfig {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn scheme(&self) -> Option<String> {
        self.config().scheme
    }

    pub fn mini_program_type(&self) -> MiniProgramType {
        self.config().mini_program
    }

    /// WeChat is present and recent enough for the OpenSDK.
    pub fn is_wechat_installed(&self) -> bool {
        self.wechat.is_installed() && self.wechat.is_supported()
    }

    pub fn add_handler(&self, handler: &Arc<dyn VendorCallbackHandler>) -> bool {
        self.registry().add(handler)
    }

    pub fn remove_handler(&self, handler: &Arc<dyn VendorCallbackHandler>) -> bool {
        self.registry().remove(handler)
    }

    /// Entry point for the host's URL-open hook. Returns whether the URL was consumed.
    pub fn handle_open_url(&self, url: &str) -> bool {
        let url = match Url::parse(url) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!("ignoring unparsable open url {url:?}: {e}");
                return false;
            }
        };
        tracing::info!("open url: {url}");

        for handler in self.handlers() {
            handler.handle_open_url(&url);
        }

        if url.host_str() == Some(SAFEPAY_HOST) {
            return true;
        }
        self.wechat.handle_open_url(&url)
    }

    /// Entry point for universal links; only WeChat uses them.
    pub fn handle_open_universal_link(&self, activity: &UserActivity) -> bool {
        tracing::info!("universal link: {:?}", activity.webpage_url);
        self.wechat.handle_open_universal_link(activity)
    }

    pub fn on_req(&self, req: &WechatInbound) {
        tracing::debug!("wechat onReq: {req:?}");
        for handler in self.handlers() {
            handler.on_req(req);
        }
    }

    pub fn on_resp(&self, resp: &WechatResponse) {
        tracing::debug!("wechat onResp: errCode={}", resp.err_code());
        for handler in self.handlers() {
            handler.on_resp(resp);
        }
    }

    pub(crate) fn handlers(&self) -> Vec<Arc<dyn VendorCallbackHandler>> {
        self.registry().live()
    }

    fn registry(&self) -> MutexGuard<'_, ObserverRegistry<dyn VendorCallbackHandler>> {
        self.handlers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn config_mut(&self) -> std::sync::RwLockWriteGuard<'_, HubConfig> {
        self.config.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::FakeWechat;
    use crate::wechat::{err_code, PayResp};

    #[derive(Default)]
    struct RecordingHandler {
        urls: Mutex<Vec<String>>,
        resps: Mutex<Vec<i32>>,
        reqs: Mutex<usize>,
    }

    impl VendorCallbackHandler for RecordingHandler {
        fn on_req(&self, _req: &WechatInbound) {
            *self.reqs.lock().unwrap() += 1;
        }

        fn on_resp(&self, resp: &WechatResponse) {
            self.resps.lock().unwrap().push(resp.err_code());
        }

        fn handle_open_url(&self, url: &Url) {
            self.urls.lock().unwrap().push(url.to_string());
        }
    }

    fn hub_with_handler() -> (Arc<FakeWechat>, DispatchHub, Arc<RecordingHandler>) {
        let wechat = Arc::new(FakeWechat::default());
        let hub = DispatchHub::new(wechat.clone());
        let handler = Arc::new(RecordingHandler::default());
        let as_dyn: Arc<dyn VendorCallbackHandler> = handler.clone();
        hub.add_handler(&as_dyn);
        (wechat, hub, handler)
    }

    #[test]
    fn removed_handler_receives_nothing() {
        let (_wechat, hub, handler) = hub_with_handler();
        let as_dyn: Arc<dyn VendorCallbackHandler> = handler.clone();

        assert!(hub.remove_handler(&as_dyn));
        assert!(!hub.remove_handler(&as_dyn));
        hub.on_resp(&WechatResponse::Pay(PayResp {
            err_code: err_code::SUCCESS,
            err_str: None,
            return_key: None,
        }));
        hub.handle_open_url("myapp://safepay/?result=x");

        assert!(handler.resps.lock().unwrap().is_empty());
        assert!(handler.urls.lock().unwrap().is_empty());
        assert!(hub.handlers().is_empty());
    }

    #[test]
    fn registration_is_last_write_wins() {
        let wechat = Arc::new(FakeWechat::default());
        let hub = DispatchHub::new(wechat.clone());

        hub.register_platforms(&[
            RegisterPlatform::Alipay {
                scheme: "first".into(),
            },
            RegisterPlatform::Wechat {
                app_id: "wx1".into(),
                universal_link: "https://example.com/app/".into(),
                mini_program: MiniProgramType::Test,
            },
            RegisterPlatform::Alipay {
                scheme: "second".into(),
            },
        ]);

        let config = hub.config();
        assert_eq!(config.scheme.as_deref(), Some("second"));
        assert_eq!(config.wechat_app_id.as_deref(), Some("wx1"));
        assert_eq!(config.mini_program, MiniProgramType::Test);
        assert_eq!(
            *wechat.registered.lock().unwrap(),
            vec![("wx1".to_string(), "https://example.com/app/".to_string())]
        );
    }

    #[test]
    fn safepay_url_is_consumed_without_wechat() {
        let (wechat, hub, handler) = hub_with_handler();

        assert!(hub.handle_open_url("myapp://safepay/?result=1"));

        assert_eq!(handler.urls.lock().unwrap().len(), 1);
        assert!(wechat.opened_urls.lock().unwrap().is_empty());
    }

    #[test]
    fn other_urls_fan_out_then_go_to_wechat() {
        let (wechat, hub, handler) = hub_with_handler();
        *wechat.handles_urls.lock().unwrap() = true;

        assert!(hub.handle_open_url("wx123://pay/?returnKey=&ret=0"));

        assert_eq!(handler.urls.lock().unwrap().len(), 1);
        assert_eq!(wechat.opened_urls.lock().unwrap().len(), 1);
    }

    #[test]
    fn unparsable_url_is_not_consumed() {
        let (wechat, hub, handler) = hub_with_handler();

        assert!(!hub.handle_open_url("not a url"));

        assert!(handler.urls.lock().unwrap().is_empty());
        assert!(wechat.opened_urls.lock().unwrap().is_empty());
    }

    #[test]
    fn responses_and_requests_broadcast_to_handlers() {
        let (_wechat, hub, handler) = hub_with_handler();

        hub.on_resp(&WechatResponse::Pay(PayResp {
            err_code: err_code::USER_CANCEL,
            err_str: None,
            return_key: None,
        }));
        hub.on_req(&WechatInbound::ShowMessage { message_ext: None });

        assert_eq!(*handler.resps.lock().unwrap(), vec![err_code::USER_CANCEL]);
        assert_eq!(*handler.reqs.lock().unwrap(), 1);
    }

    #[test]
    fn dropped_handler_stops_receiving() {
        let (_wechat, hub, handler) = hub_with_handler();
        let weak = Arc::downgrade(&handler);
        drop(handler);

        hub.on_resp(&WechatResponse::Other {
            err_code: 0,
            err_str: None,
        });

        assert!(weak.upgrade().is_none());
        assert!(hub.handlers().is_empty());
    }

    #[test]
    fn wechat_installed_requires_support() {
        let wechat = Arc::new(FakeWechat::default());
        let hub = DispatchHub::new(wechat.clone());
        *wechat.installed.lock().unwrap() = true;
        assert!(hub.is_wechat_installed());
        *wechat.supported.lock().unwrap() = false;
        assert!(!hub.is_wechat_installed());
    }

    #[test]
    fn universal_link_forwards_to_wechat() {
        let wechat = Arc::new(FakeWechat::default());
        let hub = DispatchHub::new(wechat.clone());
        let activity = UserActivity {
            activity_type: "NSUserActivityTypeBrowsingWeb".into(),
            webpage_url: Some("https://example.com/app/wx123/pay".into()),
        };

        hub.handle_open_universal_link(&activity);

        assert_eq!(*wechat.universal_links.lock().unwrap(), vec![activity]);
    }
}
