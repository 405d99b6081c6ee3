use chrono::Utc;
use order_pricing_api::{
    config::AppConfig,
    db::{create_orm_conn, run_migrations},
    entity::{
        items::{ActiveModel as ItemActive, Column as ItemCol, Entity as Items},
        users::{ActiveModel as UserActive, Column as UserCol, Entity as Users},
    },
    services::auth_service::hash_password,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let orm = create_orm_conn(&config.database_url).await?;
    // Ensure migrations are applied.
    run_migrations(&orm).await?;

    let user_id = ensure_user(&orm, "Demo Shopper", "shopper@example.com", "shopper123").await?;
    seed_items(&orm).await?;

    println!("Seed completed. User ID: {user_id}");
    Ok(())
}

async fn ensure_user(
    orm: &DatabaseConnection,
    name: &str,
    email: &str,
    password: &str,
) -> anyhow::Result<i32> {
    if let Some(existing) = Users::find()
        .filter(UserCol::Email.eq(email))
        .one(orm)
        .await?
    {
        println!("User {email} already present");
        return Ok(existing.id);
    }

    let password_hash = hash_password(password).map_err(|e| anyhow::anyhow!(e.to_string()))?;
    let now = Utc::now();
    let user = UserActive {
        id: NotSet,
        name: Set(name.to_string()),
        email: Set(email.to_string()),
        password_hash: Set(password_hash),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
        deleted_at: Set(None),
    }
    .insert(orm)
    .await?;

    println!("Ensured user {email}");
    Ok(user.id)
}

async fn seed_items(orm: &DatabaseConnection) -> anyhow::Result<()> {
    let items = [
        ("Espresso Beans", "1kg bag of dark roast beans", 2400),
        ("Pour-over Kettle", "Gooseneck kettle, 1L", 5500),
        ("Paper Filters", "Pack of 100 cone filters", 500),
        ("Ceramic Mug", "350ml stoneware mug", 1200),
    ];

    for (name, description, price) in items {
        let exists = Items::find()
            .filter(ItemCol::Name.eq(name))
            .filter(ItemCol::DeletedAt.is_null())
            .one(orm)
            .await?
            .is_some();
        if exists {
            continue;
        }

        let now = Utc::now();
        ItemActive {
            id: NotSet,
            name: Set(name.to_string()),
            description: Set(description.to_string()),
            price: Set(price),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            deleted_at: Set(None),
        }
        .insert(orm)
        .await?;
    }

    println!("Seeded items");
    Ok(())
}
