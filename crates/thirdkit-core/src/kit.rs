use std::sync::Arc;

use crate::alipay::AlipayApi;
use crate::apple_id::AppleIdProvider;
use crate::compress::{ImageCompressor, JpegCompressor};
use crate::config::PlatformConfig;
use crate::hub::DispatchHub;
use crate::login::LoginManager;
use crate::payment::PaymentManager;
use crate::share::ShareManager;
use crate::wechat::WechatApi;

/// Host-provided implementations of every vendor boundary.
#[derive(Clone)]
pub struct Vendors {
    pub wechat: Arc<dyn WechatApi>,
    pub alipay: Arc<dyn AlipayApi>,
    pub apple_id: Arc<dyn AppleIdProvider>,
    pub compressor: Arc<dyn ImageCompressor>,
}

impl Vendors {
    /// Vendors with the default JPEG compressor.
    pub fn new(
        wechat: Arc<dyn WechatApi>,
        alipay: Arc<dyn AlipayApi>,
        apple_id: Arc<dyn AppleIdProvider>,
    ) -> Self {
        Self {
            wechat,
            alipay,
            apple_id,
            compressor: Arc::new(JpegCompressor),
        }
    }

    pub fn with_compressor(mut self, compressor: Arc<dyn ImageCompressor>) -> Self {
        self.compressor = compressor;
        self
    }
}

/// The dispatch hub and the three capability managers, wired together.
///
/// Create one per process and hand it to whatever needs a manager.
pub struct ThirdKit {
    hub: Arc<DispatchHub>,
    payment: Arc<PaymentManager>,
    login: Arc<LoginManager>,
    share: Arc<ShareManager>,
}

impl ThirdKit {
    pub fn new(vendors: Vendors) -> Self {
        let hub = Arc::new(DispatchHub::new(vendors.wechat.clone()));
        let payment = PaymentManager::new(hub.clone(), vendors.wechat.clone(), vendors.alipay);
        let login = LoginManager::new(&hub, vendors.wechat.clone(), vendors.apple_id);
        let share = ShareManager::new(hub.clone(), vendors.wechat, vendors.compressor);
        Self {
            hub,
            payment,
            login,
            share,
        }
    }

    /// Build the kit and apply the registrations in `config`.
    pub fn with_config(vendors: Vendors, config: &PlatformConfig) -> Self {
        let kit = Self::new(vendors);
        kit.hub.register_platforms(&config.registrations());
        kit
    }

    pub fn hub(&self) -> &Arc<DispatchHub> {
        &self.hub
    }

    pub fn payment(&self) -> &Arc<PaymentManager> {
        &self.payment
    }

    pub fn login(&self) -> &Arc<LoginManager> {
        &self.login
    }

    pub fn share(&self) -> &Arc<ShareManager> {
        &self.share
    }
}
