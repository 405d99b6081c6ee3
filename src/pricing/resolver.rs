use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QuerySelect};

use super::PricedLine;
use crate::{
    entity::items::{Column as ItemCol, Entity as Items},
    error::{AppError, AppResult, OrderStep},
};

/// Current unit price of a live item, `NotFound` for unknown or soft-deleted ids.
pub async fn resolve_unit_price<C: ConnectionTrait>(conn: &C, item_id: i32) -> AppResult<i32> {
    let price = Items::find_by_id(item_id)
        .filter(ItemCol::DeletedAt.is_null())
        .select_only()
        .column(ItemCol::Price)
        .into_tuple::<i32>()
        .one(conn)
        .await
        .map_err(AppError::at(OrderStep::ResolvePrices))?;

    price.ok_or(AppError::NotFound)
}

/// Prices one requested line; an id that does not resolve is an `InvalidReference`.
pub async fn resolve_line<C: ConnectionTrait>(
    conn: &C,
    item_id: i32,
    quantity: i32,
) -> AppResult<PricedLine> {
    match resolve_unit_price(conn, item_id).await {
        Ok(price) => Ok(PricedLine::new(item_id, quantity, f64::from(price))),
        Err(AppError::NotFound) => Err(AppError::InvalidReference { item_id }),
        Err(err) => Err(err),
    }
}

/// Resolves every requested `(item_id, quantity)` line in request order.
///
/// Lines naming the same item stay separate. The first id that does not
/// resolve aborts the whole batch.
pub async fn resolve_lines<C: ConnectionTrait>(
    conn: &C,
    lines: &[(i32, i32)],
) -> AppResult<Vec<PricedLine>> {
    let mut priced = Vec::with_capacity(lines.len());
    for &(item_id, quantity) in lines {
        priced.push(resolve_line(conn, item_id, quantity).await?);
    }
    Ok(priced)
}
