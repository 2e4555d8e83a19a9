//! Lookup-or-create of the local user behind a successful external login.

use chrono::Utc;
use entity_api::error::{EntityApiErrorKind, Error as EntityApiError};
use log::*;
use sea_orm::DatabaseConnection;

use crate::authentication_framework::AuthenticationFramework;
use crate::error::Error;
use crate::role::RoleAssignment;
use crate::user_info::{ProviderUser, ProviderUserInfo};
use crate::{users, Id};

/// Outcome of a successful login: what the provider said, and the local user it maps to.
#[derive(Debug, Clone)]
pub struct Provisioned {
    pub provider_user: ProviderUser,
    pub user: users::Model,
}

/// Ensures a local user exists for `provider_user` and returns it.
///
/// An existing user is matched by email first, then by provider subject, and is
/// returned exactly as stored. Otherwise a new user is created with the roles the
/// role assignment grants the subject.
pub async fn on_login_success(
    db: &DatabaseConnection,
    role_assignment: &RoleAssignment,
    provider_user: ProviderUser,
) -> Result<Provisioned, Error> {
    let framework = provider_user.framework;
    let info = provider_user.user_info();

    let email = info.email().inspect_err(|_| {
        warn!("{framework} login did not supply an email address");
    })?;
    let external_id = info.id()?;
    let full_name = info.name();

    if let Some(user) = find_existing(db, framework, &email, &external_id).await? {
        debug!("{framework} login matched existing user {}", user.id);
        return Ok(Provisioned {
            provider_user,
            user,
        });
    }

    let roles = role_assignment.roles_for(&external_id);
    let now = Utc::now();
    let new_user = users::Model {
        id: Id::default(),
        authentication_framework: framework,
        external_id: external_id.clone(),
        full_name,
        email: email.clone(),
        created_at: now.into(),
        updated_at: now.into(),
        roles: vec![],
    };

    let created = entity_api::user::create_with_roles(db, new_user, roles).await;
    let user = settle_creation(db, framework, &email, &external_id, created).await?;

    Ok(Provisioned {
        provider_user,
        user,
    })
}

// A unique-constraint conflict means another request provisioned the same person
// between our lookup and insert; that stored user wins.
async fn settle_creation(
    db: &DatabaseConnection,
    framework: AuthenticationFramework,
    email: &str,
    external_id: &str,
    created: Result<users::Model, EntityApiError>,
) -> Result<users::Model, Error> {
    match created {
        Ok(user) => {
            info!(
                "Created {framework} user {} ({email}) with roles {:?}",
                user.id,
                user.role_names()
            );
            Ok(user)
        }
        Err(err) if err.error_kind == EntityApiErrorKind::RecordConflict => {
            warn!("Concurrent first login for {email}, using the stored user");
            find_existing(db, framework, email, external_id)
                .await?
                .ok_or_else(|| Error::provisioning_failure(err))
        }
        Err(err) => {
            error!("Failed to create {framework} user {email}: {err}");
            Err(Error::provisioning_failure(err))
        }
    }
}

async fn find_existing(
    db: &DatabaseConnection,
    framework: AuthenticationFramework,
    email: &str,
    external_id: &str,
) -> Result<Option<users::Model>, Error> {
    if let Some(user) = entity_api::user::find_by_email(db, email)
        .await
        .map_err(lookup_failure)?
    {
        return Ok(Some(user));
    }

    entity_api::user::find_by_framework_and_external_id(db, framework, external_id)
        .await
        .map_err(lookup_failure)
}

fn lookup_failure(err: EntityApiError) -> Error {
    error!("User lookup failed during login: {err}");
    Error::provisioning_failure(err)
}
