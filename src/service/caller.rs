use crate::error::BookingError;

/// The capability a request arrives with. Authentication happens upstream;
/// this only carries its outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Caller {
    identity: Option<String>,
    is_admin: bool,
}

impl Caller {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn user(identity: impl Into<String>) -> Self {
        Self {
            identity: Some(identity.into()),
            is_admin: false,
        }
    }

    pub fn admin(identity: impl Into<String>) -> Self {
        Self {
            identity: Some(identity.into()),
            is_admin: true,
        }
    }

    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    pub fn is_admin(&self) -> bool {
        self.is_admin
    }

    pub fn require_identity(&self) -> Result<&str, BookingError> {
        self.identity().ok_or(BookingError::Unauthorized)
    }

    pub fn require_admin(&self) -> Result<&str, BookingError> {
        let identity = self.require_identity()?;
        if !self.is_admin {
            return Err(BookingError::Forbidden);
        }
        Ok(identity)
    }
}
