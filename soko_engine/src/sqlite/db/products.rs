use sqlx::SqliteConnection;

use crate::{db_types::Product, traits::MarketplaceError};

pub async fn fetch_product(
    product_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Product>, MarketplaceError> {
    let product = sqlx::query_as::<_, Product>(
        "SELECT id, name, unit_price, seller_id, order_type FROM products WHERE id = $1 LIMIT 1",
    )
    .bind(product_id)
    .fetch_optional(conn)
    .await?;
    Ok(product)
}

pub async fn upsert_product(product: &Product, conn: &mut SqliteConnection) -> Result<(), MarketplaceError> {
    sqlx::query(
        r#"INSERT INTO products (id, name, unit_price, seller_id, order_type) VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (id) DO UPDATE SET name = excluded.name, unit_price = excluded.unit_price,
        seller_id = excluded.seller_id, order_type = excluded.order_type"#,
    )
    .bind(&product.id)
    .bind(&product.name)
    .bind(product.unit_price)
    .bind(&product.seller_id)
    .bind(product.order_type)
    .execute(conn)
    .await?;
    Ok(())
}
