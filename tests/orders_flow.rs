mod common;

use chrono::NaiveDate;
use order_pricing_api::{
    dto::orders::{CreateOrderRequest, OrderLineRequest, UpdateOrderRequest},
    entity::{
        order_items::{Column as OrderItemCol, Entity as OrderItems},
        orders::{Entity as Orders, OrderStatus},
        user_orders::{ActiveModel as UserOrderActive, Column as UserOrderCol, Entity as UserOrders},
    },
    error::{AppError, OrderStep},
    models::OrderLine,
    routes::params::OrderListQuery,
    services::order_service::{self, Transition},
    state::AppState,
};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, Set};

use common::{create_item, create_user, setup_state};

fn june() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
}

fn request(lines: &[(i32, i32)]) -> CreateOrderRequest {
    CreateOrderRequest {
        items: lines
            .iter()
            .map(|&(item_id, quantity)| OrderLineRequest { item_id, quantity })
            .collect(),
    }
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

async fn row_counts(state: &AppState) -> anyhow::Result<(u64, u64, u64)> {
    Ok((
        Orders::find().count(&state.orm).await?,
        OrderItems::find().count(&state.orm).await?,
        UserOrders::find().count(&state.orm).await?,
    ))
}

#[tokio::test]
async fn loyal_user_gets_volume_and_loyalty_discounts() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let user_id = create_user(&state, "Ada", "ada@example.com").await?;
    let beans = create_item(&state, "Beans", 10).await?;
    let filters = create_item(&state, "Filters", 5).await?;

    for _ in 0..6 {
        order_service::create_order_on(&state, user_id, request(&[(filters, 1)]), june()).await?;
    }

    let details = order_service::create_order_on(
        &state,
        user_id,
        request(&[(beans, 12), (filters, 1)]),
        june(),
    )
    .await?;

    let pricing = details.pricing.expect("pricing on create");
    assert!(approx(pricing.total_price, 125.0));
    assert!(approx(pricing.volume_discount, 12.0));
    assert!(approx(pricing.loyalty_discount, 6.25));
    assert!(approx(pricing.seasonal_discount, 0.0));
    assert!(approx(pricing.total_discount, 18.25));
    assert!(approx(details.order.final_price, 106.75));
    assert_eq!(details.order.status, OrderStatus::Pending);
    assert_eq!(details.items.len(), 2);

    let indexed = UserOrders::find()
        .filter(UserOrderCol::UserId.eq(user_id))
        .filter(UserOrderCol::OrderId.eq(details.order.id))
        .count(&state.orm)
        .await?;
    assert_eq!(indexed, 1);
    Ok(())
}

#[tokio::test]
async fn fifth_order_is_not_yet_loyal() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let user_id = create_user(&state, "Ada", "ada@example.com").await?;
    let item = create_item(&state, "Mug", 20).await?;

    for _ in 0..4 {
        order_service::create_order_on(&state, user_id, request(&[(item, 1)]), june()).await?;
    }
    let fifth = order_service::create_order_on(&state, user_id, request(&[(item, 1)]), june()).await?;
    assert!(approx(fifth.order.final_price, 20.0));

    let sixth = order_service::create_order_on(&state, user_id, request(&[(item, 1)]), june()).await?;
    assert!(approx(sixth.order.final_price, 19.0));
    Ok(())
}

#[tokio::test]
async fn seasonal_discount_applies_in_december_window() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let user_id = create_user(&state, "Ada", "ada@example.com").await?;
    let item = create_item(&state, "Kettle", 40).await?;

    let before = order_service::create_order_on(
        &state,
        user_id,
        request(&[(item, 1)]),
        NaiveDate::from_ymd_opt(2024, 12, 2).unwrap(),
    )
    .await?;
    assert!(approx(before.order.final_price, 40.0));

    let during = order_service::create_order_on(
        &state,
        user_id,
        request(&[(item, 1)]),
        NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
    )
    .await?;
    assert!(approx(during.order.total_price, 40.0));
    assert!(approx(during.order.final_price, 34.0));
    Ok(())
}

#[tokio::test]
async fn invalid_item_in_third_line_writes_nothing() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let user_id = create_user(&state, "Ada", "ada@example.com").await?;
    let a = create_item(&state, "A", 10).await?;
    let b = create_item(&state, "B", 5).await?;

    let err = order_service::create_order_on(
        &state,
        user_id,
        request(&[(a, 1), (b, 2), (9999, 1), (a, 3)]),
        june(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::InvalidReference { item_id: 9999 }));
    assert_eq!(err.step(), Some(OrderStep::ResolvePrices));

    assert_eq!(row_counts(&state).await?, (0, 0, 0));
    Ok(())
}

#[tokio::test]
async fn index_failure_rolls_back_header_and_lines() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let user_id = create_user(&state, "Ada", "ada@example.com").await?;
    let item = create_item(&state, "A", 10).await?;

    // The first order gets id 1, so its index insert collides with this row.
    UserOrders::insert(UserOrderActive {
        user_id: Set(user_id),
        order_id: Set(1),
    })
    .exec_without_returning(&state.orm)
    .await?;

    let err = order_service::create_order_on(&state, user_id, request(&[(item, 2)]), june())
        .await
        .unwrap_err();
    assert_eq!(err.step(), Some(OrderStep::InsertUserOrderIndex));

    assert_eq!(row_counts(&state).await?, (0, 0, 1));
    Ok(())
}

#[tokio::test]
async fn create_rejects_unknown_user_and_empty_orders() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let user_id = create_user(&state, "Ada", "ada@example.com").await?;
    let item = create_item(&state, "A", 10).await?;

    let err = order_service::create_order_on(&state, 4242, request(&[(item, 1)]), june())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::UnknownUser { user_id: 4242 }));
    assert_eq!(err.step(), Some(OrderStep::Validate));

    let err = order_service::create_order_on(&state, user_id, request(&[]), june())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    assert_eq!(row_counts(&state).await?, (0, 0, 0));
    Ok(())
}

#[tokio::test]
async fn update_replaces_lines_and_drops_discounts() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let user_id = create_user(&state, "Ada", "ada@example.com").await?;
    let beans = create_item(&state, "Beans", 10).await?;
    let filters = create_item(&state, "Filters", 5).await?;

    let created =
        order_service::create_order_on(&state, user_id, request(&[(beans, 12)]), june()).await?;
    assert!(approx(created.order.final_price, 108.0));
    let old_ids: Vec<i32> = created.items.iter().map(|i| i.id).collect();

    let updated = order_service::update_order(
        &state,
        created.order.id,
        UpdateOrderRequest {
            items: vec![OrderLineRequest {
                item_id: filters,
                quantity: 20,
            }],
            status: Some(OrderStatus::Confirmed),
        },
    )
    .await?;

    // A qualifying volume line after update is still charged the raw total.
    assert!(approx(updated.order.total_price, 100.0));
    assert!(approx(updated.order.final_price, 100.0));
    assert_eq!(updated.order.status, OrderStatus::Confirmed);
    assert!(updated.pricing.is_none());

    let remaining = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(created.order.id))
        .all(&state.orm)
        .await?;
    assert_eq!(remaining.len(), 1);
    assert!(remaining.iter().all(|line| !old_ids.contains(&line.id)));
    assert_eq!(remaining[0].item_id, filters);
    Ok(())
}

#[tokio::test]
async fn update_ignores_status_change_once_confirmed() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let user_id = create_user(&state, "Ada", "ada@example.com").await?;
    let item = create_item(&state, "A", 10).await?;

    let created = order_service::create_order_on(&state, user_id, request(&[(item, 1)]), june()).await?;
    order_service::confirm_order(&state, created.order.id).await?;

    let updated = order_service::update_order(
        &state,
        created.order.id,
        UpdateOrderRequest {
            items: vec![OrderLineRequest {
                item_id: item,
                quantity: 2,
            }],
            status: Some(OrderStatus::Pending),
        },
    )
    .await?;
    assert_eq!(updated.order.status, OrderStatus::Confirmed);
    assert!(approx(updated.order.total_price, 20.0));
    Ok(())
}

#[tokio::test]
async fn failed_update_keeps_previous_lines() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let user_id = create_user(&state, "Ada", "ada@example.com").await?;
    let a = create_item(&state, "A", 10).await?;
    let b = create_item(&state, "B", 5).await?;

    let created =
        order_service::create_order_on(&state, user_id, request(&[(a, 2), (b, 1)]), june()).await?;

    let err = order_service::update_order(
        &state,
        created.order.id,
        UpdateOrderRequest {
            items: vec![
                OrderLineRequest {
                    item_id: b,
                    quantity: 4,
                },
                OrderLineRequest {
                    item_id: 777,
                    quantity: 1,
                },
            ],
            status: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::InvalidReference { item_id: 777 }));

    let after = order_service::get_order(&state, created.order.id).await?;
    let before_ids: Vec<i32> = created.items.iter().map(|i| i.id).collect();
    let after_ids: Vec<i32> = after.items.iter().map(|i| i.id).collect();
    assert_eq!(before_ids, after_ids);
    assert!(approx(after.order.total_price, 25.0));
    Ok(())
}

#[tokio::test]
async fn failed_update_rolls_back_status_change() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let user_id = create_user(&state, "Ada", "ada@example.com").await?;
    let a = create_item(&state, "A", 10).await?;

    let created =
        order_service::create_order_on(&state, user_id, request(&[(a, 3)]), june()).await?;
    assert_eq!(created.order.status, OrderStatus::Pending);

    let err = order_service::update_order(
        &state,
        created.order.id,
        UpdateOrderRequest {
            items: vec![
                OrderLineRequest {
                    item_id: a,
                    quantity: 1,
                },
                OrderLineRequest {
                    item_id: 555,
                    quantity: 1,
                },
            ],
            status: Some(OrderStatus::Confirmed),
        },
    )
    .await
    .unwrap_err();
    assert_eq!(err.step(), Some(OrderStep::ResolvePrices));

    let after = order_service::get_order(&state, created.order.id).await?;
    assert_eq!(after.order.status, OrderStatus::Pending);
    assert!(approx(after.order.total_price, 30.0));
    assert_eq!(after.items.len(), 1);
    assert_eq!(after.items[0].id, created.items[0].id);
    Ok(())
}

#[tokio::test]
async fn confirm_is_a_no_op_outside_pending() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let user_id = create_user(&state, "Ada", "ada@example.com").await?;
    let item = create_item(&state, "A", 10).await?;

    let first = order_service::create_order_on(&state, user_id, request(&[(item, 1)]), june()).await?;
    assert_eq!(
        order_service::confirm_order(&state, first.order.id).await?,
        Transition::Applied(OrderStatus::Confirmed)
    );
    assert_eq!(
        order_service::confirm_order(&state, first.order.id).await?,
        Transition::AlreadyInState(OrderStatus::Confirmed)
    );

    let second = order_service::create_order_on(&state, user_id, request(&[(item, 1)]), june()).await?;
    order_service::update_order(
        &state,
        second.order.id,
        UpdateOrderRequest {
            items: vec![OrderLineRequest {
                item_id: item,
                quantity: 1,
            }],
            status: Some(OrderStatus::Cancelled),
        },
    )
    .await?;
    assert_eq!(
        order_service::confirm_order(&state, second.order.id).await?,
        Transition::AlreadyInState(OrderStatus::Cancelled)
    );

    assert_eq!(
        order_service::confirm_order(&state, 9999).await?,
        Transition::NotFound
    );
    Ok(())
}

#[tokio::test]
async fn delete_soft_deletes_and_clears_index() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let user_id = create_user(&state, "Ada", "ada@example.com").await?;
    let item = create_item(&state, "A", 10).await?;

    let created =
        order_service::create_order_on(&state, user_id, request(&[(item, 3)]), june()).await?;
    let order_id = created.order.id;

    assert_eq!(
        order_service::delete_order(&state, order_id).await?,
        Transition::Applied(OrderStatus::Cancelled)
    );
    assert_eq!(
        order_service::delete_order(&state, order_id).await?,
        Transition::AlreadyInState(OrderStatus::Cancelled)
    );
    assert_eq!(
        order_service::delete_order(&state, 9999).await?,
        Transition::NotFound
    );

    let stored = Orders::find_by_id(order_id)
        .one(&state.orm)
        .await?
        .expect("header is kept");
    assert!(stored.deleted_at.is_some());
    assert_eq!(stored.status, OrderStatus::Cancelled);

    let live_lines = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order_id))
        .filter(OrderItemCol::DeletedAt.is_null())
        .count(&state.orm)
        .await?;
    assert_eq!(live_lines, 0);
    assert_eq!(UserOrders::find().count(&state.orm).await?, 0);

    assert!(matches!(
        order_service::get_order(&state, order_id).await,
        Err(AppError::NotFound)
    ));
    assert!(matches!(
        order_service::confirm_order(&state, order_id).await?,
        Transition::NotFound
    ));
    assert!(order_service::orders_for_user(&state.orm, user_id).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn failed_delete_leaves_order_live() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let user_id = create_user(&state, "Ada", "ada@example.com").await?;
    let item = create_item(&state, "A", 10).await?;

    let created =
        order_service::create_order_on(&state, user_id, request(&[(item, 2)]), june()).await?;
    let order_id = created.order.id;

    // Header and line writes succeed, then the index removal fails.
    state.orm.execute_unprepared("DROP TABLE user_orders").await?;

    let err = order_service::delete_order(&state, order_id).await.unwrap_err();
    assert_eq!(err.step(), Some(OrderStep::RemoveUserOrderIndex));

    let stored = Orders::find_by_id(order_id)
        .one(&state.orm)
        .await?
        .expect("order row");
    assert!(stored.deleted_at.is_none());
    assert_eq!(stored.status, OrderStatus::Pending);

    let live_lines = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order_id))
        .filter(OrderItemCol::DeletedAt.is_null())
        .count(&state.orm)
        .await?;
    assert_eq!(live_lines, 1);
    Ok(())
}

#[tokio::test]
async fn update_of_missing_order_is_not_found() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let item = create_item(&state, "A", 10).await?;

    let err = order_service::update_order(
        &state,
        404,
        UpdateOrderRequest {
            items: vec![OrderLineRequest {
                item_id: item,
                quantity: 1,
            }],
            status: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::NotFound));
    Ok(())
}

#[tokio::test]
async fn listing_merges_lines_per_item() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let user_id = create_user(&state, "Ada", "ada@example.com").await?;
    let a = create_item(&state, "A", 10).await?;
    let b = create_item(&state, "B", 5).await?;

    let created =
        order_service::create_order_on(&state, user_id, request(&[(a, 2), (b, 1), (a, 3)]), june())
            .await?;
    assert_eq!(created.items.len(), 3);

    let (list, meta) = order_service::list_orders(&state, OrderListQuery::default()).await?;
    assert_eq!(meta.total, Some(1));
    assert_eq!(list.items.len(), 1);
    assert_eq!(
        list.items[0].items,
        vec![
            OrderLine {
                item_id: b,
                quantity: 1,
                price: 5.0
            },
            OrderLine {
                item_id: a,
                quantity: 5,
                price: 20.0
            },
        ]
    );

    let by_user = order_service::orders_for_user(&state.orm, user_id).await?;
    assert_eq!(by_user.len(), 1);
    assert_eq!(by_user[0].items.len(), 3);
    Ok(())
}

#[tokio::test]
async fn quote_prices_without_writing() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let user_id = create_user(&state, "Ada", "ada@example.com").await?;
    let item = create_item(&state, "A", 10).await?;

    let quote = order_service::quote_order(&state, user_id, request(&[(item, 10)])).await?;
    assert!(approx(quote.pricing.total_price, 100.0));
    assert!(approx(quote.discounts.volume_discount, 10.0));
    assert_eq!(row_counts(&state).await?, (0, 0, 0));
    Ok(())
}
