use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// The external identity provider a user first authenticated with.
#[derive(
    Debug,
    Clone,
    Copy,
    Eq,
    PartialEq,
    Hash,
    EnumIter,
    Deserialize,
    Serialize,
    DeriveActiveEnum,
    ToSchema,
)]
#[serde(rename_all = "UPPERCASE")]
#[sea_orm(
    rs_type = "String",
    db_type = "Enum",
    enum_name = "authentication_framework"
)]
pub enum AuthenticationFramework {
    #[sea_orm(string_value = "google")]
    Google,
    #[sea_orm(string_value = "github")]
    Github,
    #[sea_orm(string_value = "aaf")]
    Aaf,
}

impl std::fmt::Display for AuthenticationFramework {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthenticationFramework::Google => write!(fmt, "GOOGLE"),
            AuthenticationFramework::Github => write!(fmt, "GITHUB"),
            AuthenticationFramework::Aaf => write!(fmt, "AAF"),
        }
    }
}
