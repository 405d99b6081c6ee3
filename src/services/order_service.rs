//! Transactional order operations.
//!
//! Every mutation runs inside one `DatabaseTransaction` that is handed to each
//! pricing component as the unit of work. Only this module commits or rolls
//! back; a failed step aborts the whole transaction.

use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::{Expr, LockType};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseTransaction, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};

use crate::{
    dto::orders::{
        CreateOrderRequest, OrderDetails, OrderLineRequest, OrderList, OrderWithLines,
        QuoteResponse, UpdateOrderRequest,
    },
    entity::{
        order_items::{
            ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems,
            Model as OrderItemModel,
        },
        orders::{
            ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel,
            OrderStatus,
        },
        user_orders::{ActiveModel as UserOrderActive, Column as UserOrderCol, Entity as UserOrders},
        users::{Column as UserCol, Entity as Users},
    },
    error::{AppError, AppResult, OrderStep},
    models::{OrderItem, OrderLine},
    pricing::{self, DiscountPolicy, PricedLine},
    response::Meta,
    routes::params::{OrderListQuery, SortOrder},
    state::AppState,
};

/// Outcome of a status transition. Only `Applied` means something was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Applied(OrderStatus),
    AlreadyInState(OrderStatus),
    NotFound,
}

pub async fn create_order(
    state: &AppState,
    user_id: i32,
    payload: CreateOrderRequest,
) -> AppResult<OrderDetails> {
    create_order_on(state, user_id, payload, Utc::now().date_naive()).await
}

/// Creates an order priced as of `today`.
pub async fn create_order_on(
    state: &AppState,
    user_id: i32,
    payload: CreateOrderRequest,
    today: NaiveDate,
) -> AppResult<OrderDetails> {
    validate_lines(&payload.items)?;

    let txn = state
        .orm
        .begin()
        .await
        .map_err(AppError::transaction(OrderStep::Begin))?;
    let outcome = create_in(&txn, &state.policy, user_id, &payload.items, today).await;
    let details = finish(txn, outcome).await?;

    tracing::info!(
        order_id = details.order.id,
        user_id,
        total_price = details.order.total_price,
        final_price = details.order.final_price,
        "order created"
    );
    Ok(details)
}

async fn create_in(
    txn: &DatabaseTransaction,
    policy: &DiscountPolicy,
    user_id: i32,
    lines: &[OrderLineRequest],
    today: NaiveDate,
) -> AppResult<OrderDetails> {
    ensure_live_user(txn, user_id).await?;

    let requested = requested_pairs(lines);
    let priced = pricing::resolve_lines(txn, &requested).await?;
    let discounts = pricing::compute_discounts(txn, policy, user_id, &priced, today).await?;
    let summary = pricing::calculate(&priced, &discounts);

    let now = Utc::now();
    let order = OrderActive {
        id: NotSet,
        user_id: Set(user_id),
        total_price: Set(summary.total_price),
        final_price: Set(summary.final_price),
        status: Set(OrderStatus::Pending),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
        deleted_at: Set(None),
    }
    .insert(txn)
    .await
    .map_err(AppError::at(OrderStep::InsertOrderHeader))?;

    let mut items = Vec::with_capacity(priced.len());
    for line in &priced {
        let item = insert_line(txn, order.id, line).await?;
        items.push(OrderItem::from(item));
    }

    UserOrders::insert(UserOrderActive {
        user_id: Set(user_id),
        order_id: Set(order.id),
    })
    .exec_without_returning(txn)
    .await
    .map_err(AppError::at(OrderStep::InsertUserOrderIndex))?;

    Ok(OrderDetails {
        order: order.into(),
        items,
        pricing: Some(summary),
    })
}

/// Replaces every line of a live order and recomputes its total.
///
/// Discounts are a creation-time concern: after an update the final price
/// equals the recalculated raw total.
pub async fn update_order(
    state: &AppState,
    order_id: i32,
    payload: UpdateOrderRequest,
) -> AppResult<OrderDetails> {
    validate_lines(&payload.items)?;

    let txn = state
        .orm
        .begin()
        .await
        .map_err(AppError::transaction(OrderStep::Begin))?;
    let outcome = update_in(&txn, order_id, &payload).await;
    let details = finish(txn, outcome).await?;

    tracing::info!(
        order_id,
        total_price = details.order.total_price,
        lines = details.items.len(),
        "order updated"
    );
    Ok(details)
}

async fn update_in(
    txn: &DatabaseTransaction,
    order_id: i32,
    payload: &UpdateOrderRequest,
) -> AppResult<OrderDetails> {
    let existing = find_live_order_for_update(txn, order_id)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut active: OrderActive = existing.clone().into();
    match payload.status {
        Some(status) if status != existing.status && existing.status == OrderStatus::Pending => {
            active.status = Set(status);
        }
        Some(status) if status != existing.status => {
            tracing::debug!(
                order_id,
                current = %existing.status,
                requested = %status,
                "status change ignored for non-pending order"
            );
        }
        _ => {}
    }

    OrderItems::delete_many()
        .filter(OrderItemCol::OrderId.eq(order_id))
        .exec(txn)
        .await
        .map_err(AppError::at(OrderStep::DeleteExistingLines))?;

    for line in &payload.items {
        let priced = pricing::resolve_line(txn, line.item_id, line.quantity).await?;
        insert_line(txn, order_id, &priced).await?;
    }

    let persisted = live_lines(txn, &[order_id])
        .await
        .map_err(AppError::at(OrderStep::RecalculateTotal))?;
    let total_price = pricing::raw_total(
        &persisted
            .iter()
            .map(|m| PricedLine::new(m.item_id, m.quantity, m.price))
            .collect::<Vec<_>>(),
    );

    active.total_price = Set(total_price);
    active.final_price = Set(total_price);
    active.updated_at = Set(Utc::now().into());
    let order = active
        .update(txn)
        .await
        .map_err(AppError::at(OrderStep::PersistTotal))?;

    Ok(OrderDetails {
        order: order.into(),
        items: persisted.into_iter().map(OrderItem::from).collect(),
        pricing: None,
    })
}

/// Moves a `Pending` order to `Confirmed`; any other status is reported back unchanged.
pub async fn confirm_order(state: &AppState, order_id: i32) -> AppResult<Transition> {
    let txn = state
        .orm
        .begin()
        .await
        .map_err(AppError::transaction(OrderStep::Begin))?;
    let outcome = confirm_in(&txn, order_id).await;
    let transition = finish(txn, outcome).await?;

    tracing::info!(order_id, ?transition, "order confirmation processed");
    Ok(transition)
}

async fn confirm_in(txn: &DatabaseTransaction, order_id: i32) -> AppResult<Transition> {
    let Some(order) = find_live_order_for_update(txn, order_id).await? else {
        return Ok(Transition::NotFound);
    };

    if order.status != OrderStatus::Pending {
        return Ok(Transition::AlreadyInState(order.status));
    }

    let mut active: OrderActive = order.into();
    active.status = Set(OrderStatus::Confirmed);
    active.updated_at = Set(Utc::now().into());
    active
        .update(txn)
        .await
        .map_err(AppError::at(OrderStep::UpdateStatus))?;

    Ok(Transition::Applied(OrderStatus::Confirmed))
}

/// Soft-deletes an order: marks it deleted and `Cancelled` in one write,
/// soft-deletes its lines and drops its user/order index row.
pub async fn delete_order(state: &AppState, order_id: i32) -> AppResult<Transition> {
    let txn = state
        .orm
        .begin()
        .await
        .map_err(AppError::transaction(OrderStep::Begin))?;
    let outcome = delete_in(&txn, order_id).await;
    let transition = finish(txn, outcome).await?;

    tracing::info!(order_id, ?transition, "order deletion processed");
    Ok(transition)
}

async fn delete_in(txn: &DatabaseTransaction, order_id: i32) -> AppResult<Transition> {
    // Deleted rows are included so a repeated delete can be told apart from an unknown id.
    let order = Orders::find_by_id(order_id)
        .lock(LockType::Update)
        .one(txn)
        .await
        .map_err(AppError::at(OrderStep::FetchExistingOrder))?;
    let Some(order) = order else {
        return Ok(Transition::NotFound);
    };
    if order.deleted_at.is_some() {
        return Ok(Transition::AlreadyInState(order.status));
    }

    let now = Utc::now();
    let user_id = order.user_id;
    let mut active: OrderActive = order.into();
    active.status = Set(OrderStatus::Cancelled);
    active.deleted_at = Set(Some(now.into()));
    active.updated_at = Set(now.into());
    active
        .update(txn)
        .await
        .map_err(AppError::at(OrderStep::MarkDeleted))?;

    OrderItems::update_many()
        .col_expr(OrderItemCol::DeletedAt, Expr::value(now.fixed_offset()))
        .filter(OrderItemCol::OrderId.eq(order_id))
        .filter(OrderItemCol::DeletedAt.is_null())
        .exec(txn)
        .await
        .map_err(AppError::at(OrderStep::MarkDeleted))?;

    UserOrders::delete_many()
        .filter(UserOrderCol::UserId.eq(user_id))
        .filter(UserOrderCol::OrderId.eq(order_id))
        .exec(txn)
        .await
        .map_err(AppError::at(OrderStep::RemoveUserOrderIndex))?;

    Ok(Transition::Applied(OrderStatus::Cancelled))
}

/// Prices a prospective order without writing anything.
pub async fn quote_order(
    state: &AppState,
    user_id: i32,
    payload: CreateOrderRequest,
) -> AppResult<QuoteResponse> {
    validate_lines(&payload.items)?;
    ensure_live_user(&state.orm, user_id).await?;

    let today = Utc::now().date_naive();
    let requested = requested_pairs(&payload.items);
    let priced = pricing::resolve_lines(&state.orm, &requested).await?;
    let discounts =
        pricing::compute_discounts(&state.orm, &state.policy, user_id, &priced, today).await?;
    let summary = pricing::calculate(&priced, &discounts);

    Ok(QuoteResponse {
        items: priced.into_iter().map(OrderLine::from).collect(),
        discounts,
        pricing: summary,
    })
}

pub async fn get_order(state: &AppState, order_id: i32) -> AppResult<OrderDetails> {
    let order = Orders::find_by_id(order_id)
        .filter(OrderCol::DeletedAt.is_null())
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let items = live_lines(&state.orm, &[order.id])
        .await?
        .into_iter()
        .map(OrderItem::from)
        .collect();

    Ok(OrderDetails {
        order: order.into(),
        items,
        pricing: None,
    })
}

/// Lists live orders with their lines merged per item for display.
pub async fn list_orders(state: &AppState, query: OrderListQuery) -> AppResult<(OrderList, Meta)> {
    let (page, limit, offset) = query.pagination().normalize();

    let mut finder = Orders::find().filter(OrderCol::DeletedAt.is_null());
    if let Some(status) = query.status {
        finder = finder.filter(OrderCol::Status.eq(status));
    }
    finder = match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder
            .order_by_asc(OrderCol::CreatedAt)
            .order_by_asc(OrderCol::Id),
        SortOrder::Desc => finder
            .order_by_desc(OrderCol::CreatedAt)
            .order_by_desc(OrderCol::Id),
    };

    let total = finder.clone().count(&state.orm).await?;
    let orders = finder.limit(limit).offset(offset).all(&state.orm).await?;

    let ids: Vec<i32> = orders.iter().map(|o| o.id).collect();
    let mut lines_by_order: HashMap<i32, Vec<PricedLine>> = HashMap::new();
    for line in live_lines(&state.orm, &ids).await? {
        lines_by_order
            .entry(line.order_id)
            .or_default()
            .push(PricedLine::new(line.item_id, line.quantity, line.price));
    }

    let items = orders
        .into_iter()
        .map(|order| {
            let lines = lines_by_order.remove(&order.id).unwrap_or_default();
            OrderWithLines {
                order: order.into(),
                items: pricing::aggregate_for_display(lines)
                    .into_iter()
                    .map(OrderLine::from)
                    .collect(),
            }
        })
        .collect();

    Ok((OrderList { items }, Meta::new(page, limit, total)))
}

/// Live orders owned by `user_id`, found through the user/order index.
pub async fn orders_for_user<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
) -> AppResult<Vec<OrderDetails>> {
    let order_ids: Vec<i32> = UserOrders::find()
        .filter(UserOrderCol::UserId.eq(user_id))
        .select_only()
        .column(UserOrderCol::OrderId)
        .into_tuple()
        .all(conn)
        .await?;

    let orders = Orders::find()
        .filter(OrderCol::Id.is_in(order_ids))
        .filter(OrderCol::DeletedAt.is_null())
        .order_by_asc(OrderCol::Id)
        .all(conn)
        .await?;

    let ids: Vec<i32> = orders.iter().map(|o| o.id).collect();
    let mut lines_by_order: HashMap<i32, Vec<OrderItem>> = HashMap::new();
    for line in live_lines(conn, &ids).await? {
        lines_by_order
            .entry(line.order_id)
            .or_default()
            .push(line.into());
    }

    Ok(orders
        .into_iter()
        .map(|order| OrderDetails {
            items: lines_by_order.remove(&order.id).unwrap_or_default(),
            order: order.into(),
            pricing: None,
        })
        .collect())
}

/// Commits on success; on failure rolls back and hands the original error on.
async fn finish<T>(txn: DatabaseTransaction, outcome: AppResult<T>) -> AppResult<T> {
    match outcome {
        Ok(value) => {
            txn.commit()
                .await
                .map_err(AppError::transaction(OrderStep::Commit))?;
            Ok(value)
        }
        Err(err) => {
            tracing::warn!(step = ?err.step(), error = %err, "order transaction aborted");
            txn.rollback()
                .await
                .map_err(AppError::transaction(OrderStep::Rollback))?;
            Err(err)
        }
    }
}

fn validate_lines(lines: &[OrderLineRequest]) -> AppResult<()> {
    if lines.is_empty() {
        return Err(AppError::Validation("order must contain at least one item".into()));
    }
    if let Some(line) = lines.iter().find(|l| l.quantity <= 0) {
        return Err(AppError::Validation(format!(
            "quantity for item {} must be positive",
            line.item_id
        )));
    }
    Ok(())
}

fn requested_pairs(lines: &[OrderLineRequest]) -> Vec<(i32, i32)> {
    lines.iter().map(|l| (l.item_id, l.quantity)).collect()
}

async fn ensure_live_user<C: ConnectionTrait>(conn: &C, user_id: i32) -> AppResult<()> {
    let user = Users::find_by_id(user_id)
        .filter(UserCol::DeletedAt.is_null())
        .one(conn)
        .await
        .map_err(AppError::at(OrderStep::Validate))?;
    match user {
        Some(_) => Ok(()),
        None => Err(AppError::UnknownUser { user_id }),
    }
}

async fn find_live_order_for_update(
    txn: &DatabaseTransaction,
    order_id: i32,
) -> AppResult<Option<OrderModel>> {
    Orders::find_by_id(order_id)
        .filter(OrderCol::DeletedAt.is_null())
        .lock(LockType::Update)
        .one(txn)
        .await
        .map_err(AppError::at(OrderStep::FetchExistingOrder))
}

async fn insert_line(
    txn: &DatabaseTransaction,
    order_id: i32,
    line: &PricedLine,
) -> AppResult<OrderItemModel> {
    let now = Utc::now();
    OrderItemActive {
        id: NotSet,
        order_id: Set(order_id),
        item_id: Set(line.item_id),
        quantity: Set(line.quantity),
        price: Set(line.unit_price),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
        deleted_at: Set(None),
    }
    .insert(txn)
    .await
    .map_err(AppError::at(OrderStep::InsertLineItems))
}

async fn live_lines<C: ConnectionTrait>(
    conn: &C,
    order_ids: &[i32],
) -> Result<Vec<OrderItemModel>, sea_orm::DbErr> {
    if order_ids.is_empty() {
        return Ok(Vec::new());
    }
    OrderItems::find()
        .filter(OrderItemCol::OrderId.is_in(order_ids.iter().copied()))
        .filter(OrderItemCol::DeletedAt.is_null())
        .order_by_asc(OrderItemCol::Id)
        .all(conn)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(item_id: i32, quantity: i32) -> OrderLineRequest {
        OrderLineRequest { item_id, quantity }
    }

    #[test]
    fn validation_rejects_empty_and_non_positive_lines() {
        assert!(matches!(validate_lines(&[]), Err(AppError::Validation(_))));
        assert!(matches!(
            validate_lines(&[line(1, 2), line(2, 0)]),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            validate_lines(&[line(1, -3)]),
            Err(AppError::Validation(_))
        ));
        assert!(validate_lines(&[line(1, 1), line(1, 10)]).is_ok());
    }
}
