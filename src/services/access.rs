//! Resolution of the operator capability carried by each request.

use subtle::ConstantTimeEq;

use crate::error::ServiceError;

/// Header carrying the operator token.
pub const OPERATOR_TOKEN_HEADER: &str = "x-operator-token";

/// Whether the caller may drive the clock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OperatorAccess {
    pub privileged: bool,
}

impl OperatorAccess {
    /// A regular viewer.
    pub const VIEWER: Self = Self { privileged: false };
    /// A privileged operator.
    pub const OPERATOR: Self = Self { privileged: true };

    /// Compare the presented token with the configured one.
    ///
    /// Without a configured token nobody is privileged.
    pub fn resolve(configured: Option<&str>, presented: Option<&str>) -> Self {
        match (configured, presented) {
            (Some(expected), Some(presented))
                if bool::from(expected.as_bytes().ct_eq(presented.as_bytes())) =>
            {
                Self::OPERATOR
            }
            _ => Self::VIEWER,
        }
    }

    /// Fail with [`ServiceError::Unauthorized`] unless privileged.
    pub fn require_operator(self, action: &str) -> Result<(), ServiceError> {
        if self.privileged {
            Ok(())
        } else {
            Err(ServiceError::Unauthorized(format!(
                "operator privileges are required to {action}"
            )))
        }
    }
}
