use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::ThirdError;
use crate::hub::RegisterPlatform;
use crate::wechat::MiniProgramType;

/// Vendor credentials, usually shipped as a JSON file in the app bundle.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct PlatformConfig {
    #[serde(default)]
    pub wechat: Option<WechatConfig>,
    #[serde(default)]
    pub alipay: Option<AlipayConfig>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct WechatConfig {
    pub app_id: String,
    pub universal_link: String,
    #[serde(default)]
    pub mini_program: MiniProgramType,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct AlipayConfig {
    pub scheme: String,
}

impl PlatformConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ThirdError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        tracing::info!("loaded platform config from {}", path.display());
        Self::from_json_str(&contents)
    }

    pub fn from_json_str(json: &str) -> Result<Self, ThirdError> {
        serde_json::from_str(json).map_err(|e| ThirdError::Config(e.to_string()))
    }

    /// The batch registration this config describes, WeChat first.
    pub fn registrations(&self) -> Vec<RegisterPlatform> {
        let mut platforms = Vec::new();
        if let Some(wechat) = &self.wechat {
            platforms.push(RegisterPlatform::Wechat {
                app_id: wechat.app_id.clone(),
                universal_link: wechat.universal_link.clone(),
                mini_program: wechat.mini_program,
            });
        }
        if let Some(alipay) = &self.alipay {
            platforms.push(RegisterPlatform::Alipay {
                scheme: alipay.scheme.clone(),
            });
        }
        platforms
    }
}
