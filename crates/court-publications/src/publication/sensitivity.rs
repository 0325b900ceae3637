//! Sensitivity-based visibility decisions for artefact consumers.

use std::sync::Arc;

use tracing::debug;

use super::domain::{Artefact, ListType, Sensitivity, UserProfile, UserRole};

/// Account lookup backed by the external account-management service.
pub trait UserDirectory: Send + Sync {
    fn find_user(&self, user_id: &str) -> Result<Option<UserProfile>, UserDirectoryError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UserDirectoryError {
    #[error("account management unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SensitivityError {
    #[error("no user found with id {user_id}")]
    UserNotFound { user_id: String },
    #[error(transparent)]
    Directory(#[from] UserDirectoryError),
}

/// Whether `user` (or an anonymous caller) may see an artefact with this classification.
pub fn can_view(sensitivity: Sensitivity, list_type: ListType, user: Option<&UserProfile>) -> bool {
    match sensitivity {
        Sensitivity::Public => true,
        Sensitivity::Private => user.is_some_and(|user| user.role == UserRole::Verified),
        Sensitivity::Classified => user.is_some_and(|user| {
            user.role == UserRole::Verified && user.provenance == list_type.provenance()
        }),
    }
}

pub struct SensitivityFilter<U> {
    users: Arc<U>,
}

impl<U> Clone for SensitivityFilter<U> {
    fn clone(&self) -> Self {
        Self {
            users: Arc::clone(&self.users),
        }
    }
}

impl<U> SensitivityFilter<U>
where
    U: UserDirectory + 'static,
{
    pub fn new(users: Arc<U>) -> Self {
        Self { users }
    }

    /// Resolves the caller. `None` means anonymous; an unknown id is an error.
    pub fn resolve_user(&self, user_id: Option<&str>) -> Result<Option<UserProfile>, SensitivityError> {
        let Some(user_id) = user_id else {
            return Ok(None);
        };

        self.users
            .find_user(user_id)?
            .map(Some)
            .ok_or_else(|| SensitivityError::UserNotFound {
                user_id: user_id.to_string(),
            })
    }

    pub fn is_visible(
        &self,
        artefact: &Artefact,
        user_id: Option<&str>,
    ) -> Result<bool, SensitivityError> {
        let user = self.resolve_user(user_id)?;
        Ok(can_view(artefact.sensitivity, artefact.list_type, user.as_ref()))
    }

    /// Keeps the visible artefacts, preserving their order. The caller is resolved once.
    pub fn filter(
        &self,
        artefacts: Vec<Artefact>,
        user_id: Option<&str>,
    ) -> Result<Vec<Artefact>, SensitivityError> {
        let user = self.resolve_user(user_id)?;
        let total = artefacts.len();
        let visible: Vec<Artefact> = artefacts
            .into_iter()
            .filter(|artefact| can_view(artefact.sensitivity, artefact.list_type, user.as_ref()))
            .collect();

        debug!(total, visible = visible.len(), anonymous = user.is_none(), "sensitivity filter applied");
        Ok(visible)
    }
}
