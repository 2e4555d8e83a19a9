use crate::authentication_framework::AuthenticationFramework;
use crate::{user_roles, Id};
use axum_login::AuthUser;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize, ToSchema)]
#[schema(as = domain::users::Model)] // OpenAPI schema
#[sea_orm(schema_name = "vgl_portal", table_name = "users")]
pub struct Model {
    #[serde(skip_deserializing)]
    #[sea_orm(primary_key)]
    pub id: Id,
    pub authentication_framework: AuthenticationFramework,
    pub external_id: String,
    pub full_name: Option<String>,
    #[sea_orm(unique)]
    pub email: String,
    #[serde(skip_deserializing)]
    #[schema(value_type = String, format = DateTime)] // Applies to OpenAPI schema
    pub created_at: DateTimeWithTimeZone,
    #[serde(skip_deserializing)]
    #[schema(value_type = String, format = DateTime)] // Applies to OpenAPI schema
    pub updated_at: DateTimeWithTimeZone,
    // Populated from user_roles by the user directory, never a column.
    #[sea_orm(ignore)]
    #[serde(default)]
    pub roles: Vec<user_roles::Model>,
}

impl Model {
    /// Role names held by this user, in storage order.
    pub fn role_names(&self) -> Vec<&str> {
        self.roles.iter().map(|role| role.name.as_str()).collect()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::user_roles::Entity")]
    UserRoles,
}

impl Related<super::user_roles::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserRoles.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl AuthUser for Model {
    type Id = Id;

    fn id(&self) -> Self::Id {
        self.id
    }

    // Users carry no local credential; the provider subject is stable for the
    // lifetime of the record since first-login attributes are never rewritten.
    fn session_auth_hash(&self) -> &[u8] {
        self.external_id.as_bytes()
    }
}
