//! Sign in with Apple boundary (`ASAuthorizationAppleIDProvider`).

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppleIdScope {
    FullName,
    Email,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonName {
    pub family_name: Option<String>,
    pub given_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppleIdCredential {
    /// Stable opaque user identifier.
    pub user: String,
    /// JWT bytes; absent on malformed authorizations.
    pub identity_token: Option<Vec<u8>>,
    pub authorization_code: Option<Vec<u8>>,
    pub full_name: Option<PersonName>,
    pub email: Option<String>,
}

impl AppleIdCredential {
    /// Family name followed by given name, `None` when both are missing or empty.
    pub fn display_name(&self) -> Option<String> {
        let name = self
            .full_name
            .as_ref()
            .map(|n| {
                format!(
                    "{}{}",
                    n.family_name.as_deref().unwrap_or_default(),
                    n.given_name.as_deref().unwrap_or_default()
                )
            })
            .unwrap_or_default();
        (!name.is_empty()).then_some(name)
    }
}

/// `ASAuthorizationError.Code`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationErrorCode {
    Unknown,
    Canceled,
    InvalidResponse,
    NotHandled,
    Failed,
    NotInteractive,
    Other(i64),
}

impl AuthorizationErrorCode {
    pub fn from_raw(raw: i64) -> Self {
        match raw {
            1000 => Self::Unknown,
            1001 => Self::Canceled,
            1002 => Self::InvalidResponse,
            1003 => Self::NotHandled,
            1004 => Self::Failed,
            1005 => Self::NotInteractive,
            other => Self::Other(other),
        }
    }

    pub fn raw(self) -> i64 {
        match self {
            Self::Unknown => 1000,
            Self::Canceled => 1001,
            Self::InvalidResponse => 1002,
            Self::NotHandled => 1003,
            Self::Failed => 1004,
            Self::NotInteractive => 1005,
            Self::Other(raw) => raw,
        }
    }
}

pub type AuthorizationCompletion =
    Box<dyn FnOnce(Result<AppleIdCredential, AuthorizationErrorCode>) + Send>;

/// Runs the system identity authorization sheet.
pub trait AppleIdProvider: Send + Sync {
    fn perform_request(&self, scopes: &[AppleIdScope], completion: AuthorizationCompletion);
}
