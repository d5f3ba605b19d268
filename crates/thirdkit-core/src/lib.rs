//! ThirdKit core: payment, login and share through third-party vendor SDKs.
//!
//! Pure Rust crate with no platform dependencies. The vendor SDKs sit behind
//! traits the host implements; native shells consume it via UniFFI bindings.

pub mod alipay;
pub mod apple_id;
pub mod compress;
pub mod config;
pub mod errors;
pub mod hub;
pub mod kit;
pub mod login;
pub mod observers;
pub mod payment;
pub mod pending;
pub mod share;
pub mod status;
pub mod wechat;

#[cfg(test)]
mod fakes;

pub use config::PlatformConfig;
pub use errors::ThirdError;
pub use hub::{DispatchHub, HubConfig, RegisterPlatform, VendorCallbackHandler};
pub use kit::{ThirdKit, Vendors};
pub use login::{LoginManager, LoginObserver, LoginPayload, LoginPlatform, LoginStatus};
pub use observers::ObserverRegistry;
pub use payment::{PayObserver, PayPlatform, PayStatus, PaymentManager};
pub use share::{ShareManager, ShareMessage, ShareObserver, SharePlatform, ShareStatus};
pub use status::ResultStatus;
