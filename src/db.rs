use anyhow::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Schema, Statement};
use std::path::PathBuf;
use tokio::fs;

use crate::entity::{Items, OrderItems, Orders, UserOrders, Users};

/// Create a SeaORM connection.
pub async fn create_orm_conn(database_url: &str) -> Result<DatabaseConnection> {
    let conn = Database::connect(database_url).await?;
    Ok(conn)
}

/// Minimal migration runner that executes SQL files in `migrations/` in filename order.
pub async fn run_migrations(conn: &DatabaseConnection) -> Result<()> {
    let mut entries = fs::read_dir("migrations").await?;
    let mut files: Vec<PathBuf> = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "sql") {
            files.push(path);
        }
    }
    files.sort();

    let backend = conn.get_database_backend();
    for file in files {
        tracing::debug!(file = %file.display(), "applying migration");
        let sql = fs::read_to_string(&file).await?;
        // Postgres prepared statements cannot contain multiple commands,
        // so split the migration file and run each statement individually.
        for stmt in sql.split(';') {
            let stmt = stmt.trim();
            if stmt.is_empty() {
                continue;
            }
            let statement = format!("{stmt};");
            conn.execute(Statement::from_string(backend, statement))
                .await?;
        }
    }

    Ok(())
}

/// Creates every table straight from the entity definitions, parents first.
///
/// Backend-neutral, so it also serves in-memory SQLite databases.
pub async fn create_schema<C: ConnectionTrait>(conn: &C) -> Result<()> {
    let backend = conn.get_database_backend();
    let schema = Schema::new(backend);

    let mut users = schema.create_table_from_entity(Users);
    let mut items = schema.create_table_from_entity(Items);
    let mut orders = schema.create_table_from_entity(Orders);
    let mut order_items = schema.create_table_from_entity(OrderItems);
    let mut user_orders = schema.create_table_from_entity(UserOrders);

    for table in [
        users.if_not_exists(),
        items.if_not_exists(),
        orders.if_not_exists(),
        order_items.if_not_exists(),
        user_orders.if_not_exists(),
    ] {
        conn.execute(backend.build(&*table)).await?;
    }

    Ok(())
}
