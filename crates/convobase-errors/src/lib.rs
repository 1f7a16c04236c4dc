pub mod prelude;

use serde::Serialize;

/// A stable error code plus the HTTP status it propagates as.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ErrorCode(pub &'static str, pub u16);

pub mod codes {
    use super::ErrorCode;

    pub const SCHEMA_VALIDATION: ErrorCode = ErrorCode("SCHEMA.VALIDATION", 400);
    pub const MODEL_UNKNOWN: ErrorCode = ErrorCode("MODEL.UNKNOWN", 400);
    pub const FILE_UNSUPPORTED_TYPE: ErrorCode = ErrorCode("FILE.UNSUPPORTED_TYPE", 400);
    pub const AUTH_UNAUTHENTICATED: ErrorCode = ErrorCode("AUTH.UNAUTHENTICATED", 401);
    pub const POLICY_FORBIDDEN_VISIBILITY: ErrorCode =
        ErrorCode("POLICY.FORBIDDEN_VISIBILITY", 403);
    pub const POLICY_FORBIDDEN_ROLE: ErrorCode = ErrorCode("POLICY.FORBIDDEN_ROLE", 403);
    pub const POLICY_FORBIDDEN_SCOPE: ErrorCode = ErrorCode("POLICY.FORBIDDEN_SCOPE", 403);
    pub const RESOURCE_NOT_FOUND: ErrorCode = ErrorCode("RESOURCE.NOT_FOUND", 404);
    pub const PROVIDER_UPSTREAM: ErrorCode = ErrorCode("PROVIDER.UPSTREAM", 500);
    pub const STORAGE_INTERNAL: ErrorCode = ErrorCode("STORAGE.INTERNAL", 500);
    pub const UNKNOWN_INTERNAL: ErrorCode = ErrorCode("UNKNOWN.INTERNAL", 500);
}

/// The transported error shape: a public user-facing message plus an
/// operator-facing cause that never leaves the logs.
#[derive(Clone, Debug)]
pub struct ErrorObj {
    pub code: ErrorCode,
    pub message_user: String,
    pub message_dev: Option<String>,
}

impl ErrorObj {
    pub fn http_status(&self) -> u16 {
        self.code.1
    }

    pub fn to_public(&self) -> PublicErrorView {
        PublicErrorView {
            code: self.code.0,
            message: self.message_user.clone(),
        }
    }
}

impl std::fmt::Display for ErrorObj {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code.0, self.message_user)?;
        if let Some(dev) = &self.message_dev {
            write!(f, " ({dev})")?;
        }
        Ok(())
    }
}

impl std::error::Error for ErrorObj {}

#[derive(Clone, Debug, Serialize)]
pub struct PublicErrorView {
    pub code: &'static str,
    pub message: String,
}

pub struct ErrorBuilder {
    code: ErrorCode,
    message_user: Option<String>,
    message_dev: Option<String>,
}

impl ErrorBuilder {
    pub fn new(code: ErrorCode) -> Self {
        Self {
            code,
            message_user: None,
            message_dev: None,
        }
    }

    pub fn user_msg(mut self, msg: impl Into<String>) -> Self {
        self.message_user = Some(msg.into());
        self
    }

    pub fn dev_msg(mut self, msg: impl Into<String>) -> Self {
        self.message_dev = Some(msg.into());
        self
    }

    pub fn build(self) -> ErrorObj {
        ErrorObj {
            code: self.code,
            message_user: self
                .message_user
                .unwrap_or_else(|| "Internal error.".to_string()),
            message_dev: self.message_dev,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_fills_defaults() {
        let obj = ErrorBuilder::new(codes::STORAGE_INTERNAL)
            .dev_msg("kv put failed")
            .build();
        assert_eq!(obj.http_status(), 500);
        assert_eq!(obj.message_user, "Internal error.");
        assert_eq!(obj.message_dev.as_deref(), Some("kv put failed"));
    }

    #[test]
    fn public_view_hides_dev_message() {
        let obj = ErrorBuilder::new(codes::AUTH_UNAUTHENTICATED)
            .user_msg("Authentication required.")
            .dev_msg("bearer missing")
            .build();
        let view = obj.to_public();
        assert_eq!(view.code, "AUTH.UNAUTHENTICATED");
        assert_eq!(view.message, "Authentication required.");
    }
}
