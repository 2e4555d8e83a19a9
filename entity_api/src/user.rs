use super::error::{EntityApiErrorKind, Error};
use chrono::Utc;

use entity::authentication_framework::AuthenticationFramework;
use entity::users::{ActiveModel, Column, Entity, Model};
use entity::{user_roles, Id};
use log::*;
use sea_orm::{
    entity::prelude::*, ActiveValue::NotSet, ConnectionTrait, Select, Set, TransactionTrait,
};

/// Inserts a user together with one `user_roles` row per role name, atomically.
///
/// A violated uniqueness constraint on email or (framework, external id) surfaces as
/// `EntityApiErrorKind::RecordConflict` so callers can tell a lost race from a broken
/// database.
pub async fn create_with_roles<I>(
    db: &impl TransactionTrait,
    user_model: Model,
    roles: I,
) -> Result<Model, Error>
where
    I: IntoIterator<Item = String>,
{
    debug!("New User Model to be inserted: {user_model:?}");

    let txn = db.begin().await?;
    let now = Utc::now();

    let user_active_model: ActiveModel = ActiveModel {
        id: NotSet,
        authentication_framework: Set(user_model.authentication_framework),
        external_id: Set(user_model.external_id),
        full_name: Set(user_model.full_name),
        email: Set(user_model.email),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };

    let mut created_user = user_active_model.insert(&txn).await?;

    let mut created_roles = Vec::new();
    for name in roles {
        let role = user_roles::ActiveModel {
            id: NotSet,
            user_id: Set(created_user.id),
            name: Set(name),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };
        created_roles.push(role.insert(&txn).await?);
    }

    txn.commit().await?;

    created_user.roles = created_roles;
    Ok(created_user)
}

pub async fn find_by_email(db: &impl ConnectionTrait, email: &str) -> Result<Option<Model>, Error> {
    find_one_with_roles(db, Entity::find().filter(Column::Email.eq(email))).await
}

pub async fn find_by_framework_and_external_id(
    db: &impl ConnectionTrait,
    framework: AuthenticationFramework,
    external_id: &str,
) -> Result<Option<Model>, Error> {
    find_one_with_roles(
        db,
        Entity::find()
            .filter(Column::AuthenticationFramework.eq(framework))
            .filter(Column::ExternalId.eq(external_id)),
    )
    .await
}

pub async fn find_by_id(db: &impl ConnectionTrait, id: Id) -> Result<Model, Error> {
    find_one_with_roles(db, Entity::find_by_id(id))
        .await?
        .ok_or(Error {
            source: None,
            error_kind: EntityApiErrorKind::RecordNotFound,
        })
}

async fn find_one_with_roles(
    db: &impl ConnectionTrait,
    select: Select<Entity>,
) -> Result<Option<Model>, Error> {
    let results = select.find_with_related(user_roles::Entity).all(db).await?;

    match results.into_iter().next() {
        Some((mut user, roles)) => {
            user.roles = roles;
            Ok(Some(user))
        }
        None => Ok(None),
    }
}

#[cfg(test)]
// We need to gate seaORM's mock feature behind conditional compilation because
// the feature removes the Clone trait implementation from seaORM's DatabaseConnection.
// see https://github.com/SeaQL/sea-orm/issues/830
#[cfg(feature = "mock")]
mod test {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn user_model(email: &str) -> Model {
        let now = chrono::Utc::now();
        Model {
            id: Id::new_v4(),
            authentication_framework: AuthenticationFramework::Github,
            external_id: "42".to_owned(),
            full_name: Some("Ada".to_owned()),
            email: email.to_owned(),
            created_at: now.into(),
            updated_at: now.into(),
            roles: vec![],
        }
    }

    fn role_model(user_id: Id, name: &str) -> user_roles::Model {
        let now = chrono::Utc::now();
        user_roles::Model {
            id: Id::new_v4(),
            user_id,
            name: name.to_owned(),
            created_at: now.into(),
            updated_at: now.into(),
        }
    }

    #[tokio::test]
    async fn find_by_email_populates_roles() -> Result<(), Error> {
        let user = user_model("ada@example.org");
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[
                (user.clone(), Some(role_model(user.id, "ROLE_USER"))),
                (user.clone(), Some(role_model(user.id, "ROLE_UBC"))),
            ]])
            .into_connection();

        let found = find_by_email(&db, "ada@example.org").await?.unwrap();

        assert_eq!(found.id, user.id);
        assert_eq!(found.role_names(), vec!["ROLE_USER", "ROLE_UBC"]);

        Ok(())
    }

    #[tokio::test]
    async fn find_by_email_returns_none_for_an_unknown_email() -> Result<(), Error> {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<(Model, Option<user_roles::Model>)>::new()])
            .into_connection();

        assert!(find_by_email(&db, "nobody@example.org").await?.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn find_by_framework_and_external_id_finds_the_subject() -> Result<(), Error> {
        let user = user_model("ada@example.org");
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[(user.clone(), Some(role_model(user.id, "ROLE_USER")))]])
            .into_connection();

        let found =
            find_by_framework_and_external_id(&db, AuthenticationFramework::Github, "42").await?;

        assert_eq!(found.map(|u| u.email), Some("ada@example.org".to_owned()));

        Ok(())
    }

    #[tokio::test]
    async fn find_by_id_reports_missing_records() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<(Model, Option<user_roles::Model>)>::new()])
            .into_connection();

        let result = find_by_id(&db, Id::new_v4()).await;

        assert_eq!(
            result.unwrap_err().error_kind,
            EntityApiErrorKind::RecordNotFound
        );
    }

    #[tokio::test]
    async fn create_with_roles_returns_the_user_with_its_roles() -> Result<(), Error> {
        let user = user_model("ada@example.org");
        let role_user = role_model(user.id, "ROLE_USER");
        let role_ubc = role_model(user.id, "ROLE_UBC");

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[user.clone()]])
            .append_query_results([[role_user.clone()]])
            .append_query_results([[role_ubc.clone()]])
            .into_connection();

        let created = create_with_roles(
            &db,
            user.clone(),
            ["ROLE_USER".to_owned(), "ROLE_UBC".to_owned()],
        )
        .await?;

        assert_eq!(created.id, user.id);
        assert_eq!(created.authentication_framework, AuthenticationFramework::Github);
        assert_eq!(created.external_id, "42");
        assert_eq!(created.role_names(), vec!["ROLE_USER", "ROLE_UBC"]);

        Ok(())
    }

    #[tokio::test]
    async fn create_with_roles_surfaces_database_errors() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_errors([sea_orm::DbErr::Custom("insert failed".to_string())])
            .into_connection();

        let result =
            create_with_roles(&db, user_model("ada@example.org"), ["ROLE_USER".to_owned()]).await;

        assert_eq!(result.unwrap_err().error_kind, EntityApiErrorKind::SystemError);
    }
}
