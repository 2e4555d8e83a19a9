use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("CREATE SCHEMA IF NOT EXISTS vgl_portal;")
            .await?;

        manager
            .get_connection()
            .execute_unprepared("SET search_path TO vgl_portal, public;")
            .await?;

        // The portal's DB user executes every query
        manager
            .get_connection()
            .execute_unprepared(
                r#"
                DO $$ BEGIN
                    GRANT ALL ON SCHEMA vgl_portal TO vgl;
                    ALTER DEFAULT PRIVILEGES IN SCHEMA vgl_portal GRANT ALL ON TABLES TO vgl;
                    ALTER DEFAULT PRIVILEGES IN SCHEMA vgl_portal GRANT ALL ON SEQUENCES TO vgl;
                END $$;
            "#,
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(
                r#"
                DO $$ BEGIN
                    ALTER DEFAULT PRIVILEGES IN SCHEMA vgl_portal REVOKE ALL ON SEQUENCES FROM vgl;
                    ALTER DEFAULT PRIVILEGES IN SCHEMA vgl_portal REVOKE ALL ON TABLES FROM vgl;
                    REVOKE ALL ON SCHEMA vgl_portal FROM vgl;
                END $$;
            "#,
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared("DROP SCHEMA IF EXISTS vgl_portal CASCADE;")
            .await?;

        Ok(())
    }
}
