use crate::alipay::{result_status, AlipayReply};
use crate::apple_id::AuthorizationErrorCode;
use crate::wechat::err_code;

/// Terminal outcome of a payment, login or share action.
///
/// `T` is the success payload; capabilities that have none use `()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultStatus<T = ()> {
    /// Generic vendor failure.
    Fail,
    Success(Option<T>),
    /// The user backed out of the vendor UI.
    Cancel,
    /// Local precondition violation or malformed vendor payload.
    Unusual(String),
    /// Vendor code with no mapping.
    Unknown,
}

impl<T> ResultStatus<T> {
    pub fn unusual(message: impl Into<String>) -> Self {
        Self::Unusual(message.into())
    }

    /// Map a WeChat `errCode`. `payload` is only evaluated on success.
    pub fn from_wechat(code: i32, payload: impl FnOnce() -> Option<T>) -> Self {
        match code {
            err_code::SUCCESS => Self::Success(payload()),
            err_code::USER_CANCEL => Self::Cancel,
            _ => Self::Fail,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Fail => "fail",
            Self::Success(_) => "success",
            Self::Cancel => "cancel",
            Self::Unusual(_) => "unusual",
            Self::Unknown => "unknown",
        }
    }
}

impl ResultStatus {
    /// Map an Alipay result dictionary. A missing `resultStatus` is `Unknown`.
    pub fn from_alipay(reply: &AlipayReply) -> Self {
        if reply.result_status.is_none() {
            return Self::Unknown;
        }
        match reply.status_code() {
            Some(result_status::SUCCESS) => Self::Success(None),
            Some(result_status::USER_CANCEL) => Self::Cancel,
            _ => Self::Fail,
        }
    }
}

impl<T> From<AuthorizationErrorCode> for ResultStatus<T> {
    fn from(code: AuthorizationErrorCode) -> Self {
        match code {
            AuthorizationErrorCode::Canceled => Self::Cancel,
            AuthorizationErrorCode::Failed => Self::Fail,
            AuthorizationErrorCode::InvalidResponse => {
                Self::unusual("invalid authorization response")
            }
            AuthorizationErrorCode::NotHandled => {
                Self::unusual("authorization request not handled")
            }
            AuthorizationErrorCode::Unknown => Self::Unknown,
            AuthorizationErrorCode::NotInteractive | AuthorizationErrorCode::Other(_) => Self::Fail,
        }
    }
}
