use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE TYPE vgl_portal.authentication_framework AS ENUM ('google', 'github', 'aaf')",
            )
            .await?;

        // Email and (framework, external_id) are both unique. Concurrent first logins
        // for the same person race on these constraints rather than on any lock.
        let create_users_sql = r#"
            CREATE TABLE IF NOT EXISTS vgl_portal.users (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                authentication_framework vgl_portal.authentication_framework NOT NULL,
                external_id VARCHAR(255) NOT NULL,
                full_name VARCHAR(255),
                email VARCHAR(255) NOT NULL,

                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

                CONSTRAINT users_email_key UNIQUE (email),
                CONSTRAINT users_framework_external_id_key UNIQUE (authentication_framework, external_id)
            )
        "#;

        manager
            .get_connection()
            .execute_unprepared(create_users_sql)
            .await?;

        let create_user_roles_sql = r#"
            CREATE TABLE IF NOT EXISTS vgl_portal.user_roles (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                user_id UUID NOT NULL REFERENCES vgl_portal.users(id) ON DELETE CASCADE,
                name VARCHAR(255) NOT NULL,

                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

                CONSTRAINT user_roles_user_id_name_key UNIQUE (user_id, name)
            )
        "#;

        manager
            .get_connection()
            .execute_unprepared(create_user_roles_sql)
            .await?;

        manager
            .get_connection()
            .execute_unprepared(
                "CREATE INDEX IF NOT EXISTS idx_user_roles_user_id
                 ON vgl_portal.user_roles(user_id)",
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("DROP TABLE IF EXISTS vgl_portal.user_roles")
            .await?;

        manager
            .get_connection()
            .execute_unprepared("DROP TABLE IF EXISTS vgl_portal.users")
            .await?;

        manager
            .get_connection()
            .execute_unprepared("DROP TYPE IF EXISTS vgl_portal.authentication_framework")
            .await?;

        Ok(())
    }
}
