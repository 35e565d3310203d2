//! End-to-end routing over an in-memory store.

use std::sync::Arc;

use serde_json::{json, Value};
use tillbook_commerce::config::LedgerSettings;
use tillbook_service::{Method, PosService};
use tillbook_store::{record, MemoryStore, Sheet, TabularStore};

async fn service() -> (PosService, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    store
        .append(Sheet::Stock, record! { "item_name" => "Kopi", "quantity" => 10i64 })
        .await
        .unwrap();
    store
        .append(Sheet::Stock, record! { "item_name" => "Teh", "quantity" => 1i64 })
        .await
        .unwrap();
    let service = PosService::new(store.clone(), LedgerSettings::default());
    (service, store)
}

#[tokio::test]
async fn test_post_order_lists_missing_fields() {
    let (service, _) = service().await;
    let response = service
        .dispatch(Method::Post, "/api/order", Some(json!({ "item_name": "Kopi" })))
        .await;

    assert_eq!(response.status, 400);
    assert!(!response.success);
    let error = response.error.unwrap();
    assert!(error.contains("quantity"));
    assert!(error.contains("cashier"));
    assert_eq!(response.details.unwrap()["code"], "missing_fields");
}

#[tokio::test]
async fn test_post_order_without_stock_names_item() {
    let (service, store) = service().await;
    let response = service
        .dispatch(
            Method::Post,
            "/api/order",
            Some(json!({
                "item_name": "Teh",
                "quantity": 3,
                "unit_price": 5000,
                "cashier": "Sari",
            })),
        )
        .await;

    assert_eq!(response.status, 400);
    assert!(response.error.unwrap().contains("Teh"));
    let details = response.details.unwrap();
    assert_eq!(details["item_name"], "Teh");
    assert_eq!(details["available"], 1);
    assert_eq!(store.len(Sheet::Order).await, 0);
}

#[tokio::test]
async fn test_order_then_read_back() {
    let (service, _) = service().await;
    let created = service
        .dispatch(
            Method::Post,
            "/api/order",
            Some(json!({
                "transaction_id": "RTN-TEST1",
                "item_name": "Kopi",
                "quantity": "2",
                "unit_price": "12000",
                "cashier": "Sari",
                "payment_method": "QRIS",
            })),
        )
        .await;
    assert_eq!(created.status, 201);
    assert_eq!(created.data.as_ref().unwrap()["line_total"], 24000);

    let orders = service.dispatch(Method::Get, "/api/orders", None).await;
    let rows = orders.data.unwrap();
    assert_eq!(rows.as_array().unwrap().len(), 1);
    assert_eq!(rows[0]["transaction_id"], "RTN-TEST1");
    assert_eq!(rows[0]["payment_method"], "QRIS");

    let grouped = service.dispatch(Method::Get, "orders/grouped", None).await;
    assert_eq!(grouped.data.unwrap()[0]["item_count"], 2);

    let receipt = service.dispatch(Method::Get, "/api/orders/RTN-TEST1", None).await;
    assert!(receipt.is_success());
    assert_eq!(receipt.data.unwrap()["total"], 24000);

    let stock = service.dispatch(Method::Get, "/api/stock", None).await;
    let kopi = stock
        .data
        .unwrap()
        .as_array()
        .unwrap()
        .iter()
        .find(|row| row["item_name"] == "Kopi")
        .cloned()
        .unwrap();
    assert_eq!(kopi["quantity"], 8);
    assert_eq!(kopi["status"], "low");
}

#[tokio::test]
async fn test_lines_of_one_transaction_share_payment() {
    let (service, _) = service().await;
    for (item, quantity, price) in [("Kopi", 2, 10000), ("Teh", 1, 5000)] {
        let created = service
            .dispatch(
                Method::Post,
                "/api/order",
                Some(json!({
                    "order_id": "RTN-CART1",
                    "item_name": item,
                    "quantity_item": quantity,
                    "unit_price": price,
                    "cashier_name": "Sari",
                    "payment_method": "Cash",
                    "cash_paid": 30000,
                    "change": 5000,
                })),
            )
            .await;
        assert_eq!(created.status, 201, "{:?}", created.error);
    }

    let rows = service.dispatch(Method::Get, "/api/orders", None).await.data.unwrap();
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    for row in rows {
        assert_eq!(row["tendered"], 30000);
        assert_eq!(row["change"], 5000);
    }
    assert_eq!(rows[0]["line_total"], 20000);
    assert_eq!(rows[1]["line_total"], 5000);

    let receipt = service.dispatch(Method::Get, "/api/orders/RTN-CART1", None).await;
    assert!(receipt.is_success(), "{:?}", receipt.error);
    assert_eq!(receipt.data.unwrap()["total"], 25000);
}

#[tokio::test]
async fn test_change_above_tendered_is_rejected() {
    let (service, store) = service().await;
    let response = service
        .dispatch(
            Method::Post,
            "/api/order",
            Some(json!({
                "transaction_id": "RTN-CART2",
                "item_name": "Kopi",
                "quantity": 1,
                "unit_price": 10000,
                "cashier": "Sari",
                "tendered": 10000,
                "change": 15000,
            })),
        )
        .await;
    assert_eq!(response.status, 400);
    assert_eq!(store.len(Sheet::Order).await, 0);
}

#[tokio::test]
async fn test_put_stock_overwrites_by_row_key() {
    let (service, _) = service().await;
    let listed = service.dispatch(Method::Get, "/api/stock", None).await;
    let teh_key = listed.data.unwrap()[1]["key"].clone();

    let updated = service
        .dispatch(
            Method::Put,
            "/api/stock",
            Some(json!({ "row_key": teh_key, "item_name": "Teh", "quantity": 40 })),
        )
        .await;
    assert_eq!(updated.status, 200);
    assert_eq!(updated.data.unwrap()["quantity"], 40);

    let negative = service
        .dispatch(
            Method::Put,
            "/api/stock",
            Some(json!({ "row_key": teh_key, "item_name": "Teh", "quantity": -1 })),
        )
        .await;
    assert_eq!(negative.status, 400);

    let wrong_item = service
        .dispatch(
            Method::Put,
            "/api/stock",
            Some(json!({ "row_key": teh_key, "item_name": "Kopi", "quantity": 3 })),
        )
        .await;
    assert_eq!(wrong_item.status, 400);
}

#[tokio::test]
async fn test_master_item_creates_stock_row() {
    let (service, store) = service().await;
    let response = service
        .dispatch(
            Method::Post,
            "/api/master-items",
            Some(json!({
                "item_name": "Roti",
                "category": "Food",
                "base_cost": 4000,
                "sale_price": 9000,
                "status": "active",
            })),
        )
        .await;

    assert_eq!(response.status, 201);
    let data = response.data.unwrap();
    assert_eq!(data["item"]["net_sales"], 5000);
    assert_eq!(data["stock_warning"], Value::Null);
    assert_eq!(store.len(Sheet::Stock).await, 3);

    let items = service.dispatch(Method::Get, "/api/master-items", None).await;
    assert_eq!(items.data.unwrap().as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_shopping_and_report() {
    let (service, _) = service().await;
    let purchase = service
        .dispatch(
            Method::Post,
            "/api/shopping-list",
            Some(json!({
                "item_shopping": "Gula",
                "category": "bahan",
                "quantity": 2,
                "unit": "kg",
                "price": 30000,
            })),
        )
        .await;
    assert_eq!(purchase.status, 201);
    assert_eq!(purchase.data.unwrap()["category"], "Bahan");

    service
        .dispatch(
            Method::Post,
            "/api/order",
            Some(json!({
                "item_name": "Kopi",
                "quantity": 1,
                "unit_price": 12000,
                "cashier": "Sari",
            })),
        )
        .await;

    let report = service.dispatch(Method::Get, "/api/report?payment=cash", None).await;
    assert!(report.is_success());
    let data = report.data.unwrap();
    assert_eq!(data["total_revenue"], 12000);
    assert_eq!(data["total_orders"], 1);
    assert_eq!(data["supply_expenses"]["ingredients"], 30000);

    let bad = service
        .dispatch(Method::Get, "/api/report?start=2024-06-01&end=2024-05-01", None)
        .await;
    assert_eq!(bad.status, 400);
}
