use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use url::Url;

use crate::alipay::{AlipayApi, AlipayCompletion, SAFEPAY_HOST};
use crate::hub::{DispatchHub, VendorCallbackHandler};
use crate::observers::ObserverRegistry;
use crate::pending::Pending;
use crate::status::ResultStatus;
use crate::wechat::{
    PayRequest, SendCompletion, WechatApi, WechatRequest, WechatResponse, PAY_PACKAGE,
};

pub type PayStatus = ResultStatus;

/// Payment channel and the server-issued parameters for one order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayPlatform {
    /// WeChat Pay. All fields come from the merchant backend's unified order call.
    Wechat {
        partner_id: String,
        prepay_id: String,
        nonce_str: String,
        time_stamp: String,
        sign: String,
        /// Merchant order number, for querying the backend afterwards.
        order_no: Option<String>,
    },
    /// Alipay app payment with a server-signed order string.
    Alipay {
        order_code: String,
        order_no: Option<String>,
    },
}

impl PayPlatform {
    pub fn order_no(&self) -> Option<&str> {
        match self {
            Self::Wechat { order_no, .. } | Self::Alipay { order_no, .. } => order_no.as_deref(),
        }
    }

    pub fn channel(&self) -> &'static str {
        match self {
            Self::Wechat { .. } => "wechat",
            Self::Alipay { .. } => "alipay",
        }
    }
}

pub trait PayObserver: Send + Sync {
    fn on_pay_complete(&self, status: &PayStatus, platform: Option<&PayPlatform>);
}

struct PaymentState {
    pending: Pending<PayPlatform>,
    observers: ObserverRegistry<dyn PayObserver>,
}

/// Starts payments and reports exactly one result per payment to its observers.
pub struct PaymentManager {
    hub: Arc<DispatchHub>,
    wechat: Arc<dyn WechatApi>,
    alipay: Arc<dyn AlipayApi>,
    state: Mutex<PaymentState>,
    me: Weak<Self>,
}

impl PaymentManager {
    /// Create the manager and register it with `hub` for vendor callbacks.
    pub fn new(
        hub: Arc<DispatchHub>,
        wechat: Arc<dyn WechatApi>,
        alipay: Arc<dyn AlipayApi>,
    ) -> Arc<Self> {
        let manager = Arc::new_cyclic(|me| Self {
            hub: hub.clone(),
            wechat,
            alipay,
            state: Mutex::new(PaymentState {
                pending: Pending::new(),
                observers: ObserverRegistry::new(),
            }),
            me: me.clone(),
        });
        let handler: Arc<dyn VendorCallbackHandler> = manager.clone();
        hub.add_handler(&handler);
        manager
    }

    pub fn add(&self, observer: &Arc<dyn PayObserver>) -> bool {
        self.state().observers.add(observer)
    }

    pub fn remove(&self, observer: &Arc<dyn PayObserver>) -> bool {
        self.state().observers.remove(observer)
    }

    /// Platform of the payment awaiting a result, if any.
    pub fn pending_platform(&self) -> Option<PayPlatform> {
        self.state().pending.current().cloned()
    }

    pub fn pay(&self, platform: PayPlatform) {
        tracing::info!(
            "pay via {} (order {:?})",
            platform.channel(),
            platform.order_no()
        );

        match platform.clone() {
            PayPlatform::Wechat {
                partner_id,
                prepay_id,
                nonce_str,
                time_stamp,
                sign,
                ..
            } => {
                let request = PayRequest {
                    partner_id,
                    prepay_id,
                    nonce_str,
                    time_stamp: time_stamp.trim().parse().unwrap_or(0),
                    package: PAY_PACKAGE.to_string(),
                    sign,
                };
                self.begin(platform);
                self.wechat
                    .send(WechatRequest::Pay(request), self.delivery_completion());
            }
            PayPlatform::Alipay { order_code, .. } => {
                // Rejected payments never occupy the pending slot.
                let Some(scheme) = self.hub.scheme() else {
                    tracing::warn!("alipay payment without a registered scheme");
                    self.notify(&platform, ResultStatus::unusual("missing scheme"));
                    return;
                };
                self.begin(platform);
                self.alipay
                    .pay_order(&order_code, &scheme, self.alipay_completion());
            }
        }
    }

    fn begin(&self, platform: PayPlatform) {
        let replaced = self.state().pending.begin(platform);
        if let Some(previous) = replaced {
            tracing::warn!("superseding in-flight {} payment", previous.channel());
        }
    }

    fn alipay_completion(&self) -> AlipayCompletion {
        let me = self.me.clone();
        Box::new(move |reply| {
            if let Some(manager) = me.upgrade() {
                tracing::debug!("alipay reply: {reply:?}");
                manager.finish(ResultStatus::from_alipay(&reply));
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

    /// Consume the pending payment and notify observers once.
    fn finish(&self, status: PayStatus) {
        let Some(platform) = self.state().pending.take() else {
            tracing::debug!("no payment in flight, dropping {} result", status.kind());
            return;
        };
        self.notify(&platform, status);
    }

    fn notify(&self, platform: &PayPlatform, status: PayStatus) {
        let observers = self.state().observers.live();
        tracing::info!(
            "{} payment finished: {} ({} observer(s))",
            platform.channel(),
            status.kind(),
            observers.len()
        );
        for observer in observers {
            observer.on_pay_complete(&status, Some(platform));
        }
    }

    fn state(&self) -> MutexGuard<'_, PaymentState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl VendorCallbackHandler for PaymentManager {
    fn on_resp(&self, resp: &WechatResponse) {
        if let WechatResponse::Pay(resp) = resp {
            self.finish(ResultStatus::from_wechat(resp.err_code, || None));
        }
    }

    fn handle_open_url(&self, url: &Url) {
        if url.host_str() == Some(SAFEPAY_HOST) {
            self.alipay.process_auth_result(url, self.alipay_completion());
        }
    }
}
