//! Route handlers and dispatch.

use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use tillbook_commerce::analytics::{Analytics, LogicalOrder, Report};
use tillbook_commerce::catalog::{Catalog, CatalogItem, CreatedItem};
use tillbook_commerce::checkout::Receipt;
use tillbook_commerce::config::LedgerSettings;
use tillbook_commerce::ledger::{LineRequest, OrderLine, OrderLineWriter, Payment, PaymentMethod};
use tillbook_commerce::shopping::{NewPurchase, ShoppingCategory, ShoppingList, ShoppingListEntry};
use tillbook_commerce::stock::{StockEntry, StockLedger, StockView};
use tillbook_commerce::{
    CommerceError, Keyed, Money, ShoppingBatchId, SharedStore, TransactionId,
};
use tillbook_store::RowKey;

use crate::request::{
    CreateOrderRequest, CreatePurchaseRequest, CreateStockRequest, Method, ReportQuery, Request,
    UpdateStockRequest,
};
use crate::{ApiResponse, ServiceError};

type Result<T> = std::result::Result<T, ServiceError>;

/// The point-of-sale service over one shared store.
#[derive(Clone)]
pub struct PosService {
    settings: LedgerSettings,
    catalog: Catalog,
    stock: StockLedger,
    writer: OrderLineWriter,
    shopping: ShoppingList,
    analytics: Analytics,
}

impl PosService {
    pub fn new(store: SharedStore, settings: LedgerSettings) -> Self {
        let stock = StockLedger::new(store.clone());
        Self {
            catalog: Catalog::new(store.clone()),
            writer: OrderLineWriter::new(store.clone(), stock.clone()),
            shopping: ShoppingList::new(store.clone(), settings.shopping_prefix.clone()),
            analytics: Analytics::new(store, settings.top_n),
            stock,
            settings,
        }
    }

    pub fn settings(&self) -> &LedgerSettings {
        &self.settings
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn stock(&self) -> &StockLedger {
        &self.stock
    }

    pub fn writer(&self) -> &OrderLineWriter {
        &self.writer
    }

    pub fn shopping(&self) -> &ShoppingList {
        &self.shopping
    }

    pub fn analytics(&self) -> &Analytics {
        &self.analytics
    }

    /// Record one order line.
    ///
    /// A register posting a cart line by line sends the shared
    /// `transaction_id` with the cart's `tendered` and `change`; those
    /// are stored on every line as given. Otherwise the payment is worked
    /// out from this line alone, and without payment fields the line is
    /// taken as exact cash.
    pub async fn create_order(&self, body: CreateOrderRequest) -> Result<OrderLine> {
        let fields = body.required()?;
        let total = fields
            .unit_price
            .try_multiply(fields.quantity)
            .ok_or(CommerceError::Overflow)?;

        let method = match body.payment_method.as_deref().map(str::trim) {
            None | Some("") => PaymentMethod::Cash,
            Some(m) => m.parse::<PaymentMethod>()?,
        };
        let shared = body
            .transaction_id
            .as_deref()
            .is_some_and(|id| !id.trim().is_empty());
        let payment = match (method, body.tendered, body.change) {
            (method, Some(tendered), Some(change)) if shared => {
                Payment::recorded(method, tendered, change)?
            }
            (PaymentMethod::Qris, Some(tendered), None) if shared => {
                Payment::recorded(PaymentMethod::Qris, tendered, Money::zero())?
            }
            (PaymentMethod::Qris, _, _) => Payment::qris(total),
            (PaymentMethod::Cash, Some(tendered), _) => Payment::cash(tendered, total)?,
            (PaymentMethod::Cash, None, _) => Payment::exact_cash(total),
        };
        let transaction_id = body
            .transaction_id
            .filter(|id| !id.trim().is_empty())
            .map(TransactionId::new)
            .unwrap_or_else(|| TransactionId::generate(&self.settings.transaction_prefix));

        let line = self
            .writer
            .write_line(LineRequest {
                transaction_id,
                item_name: fields.item_name,
                quantity: fields.quantity,
                unit_price: fields.unit_price,
                cashier: fields.cashier,
                customer: body.customer,
                payment,
                note: body.note.unwrap_or_default(),
            })
            .await?;
        Ok(line)
    }

    pub async fn list_orders(&self) -> Result<Vec<Keyed<OrderLine>>> {
        Ok(self.writer.list().await?)
    }

    pub async fn grouped_orders(&self) -> Result<Vec<LogicalOrder>> {
        Ok(self.analytics.orders().await?)
    }

    /// Rebuild the receipt of one transaction from its ledger lines.
    pub async fn receipt(&self, transaction_id: &str) -> Result<Receipt> {
        let lines: Vec<OrderLine> = self
            .writer
            .list()
            .await?
            .into_iter()
            .map(|k| k.value)
            .filter(|line| line.transaction_id.as_str() == transaction_id)
            .collect();
        Receipt::from_lines(&lines)?
            .ok_or_else(|| ServiceError::NotFound(format!("transaction {transaction_id}")))
    }

    pub async fn list_stock(&self) -> Result<Vec<StockView>> {
        Ok(self
            .stock
            .list_with_status(self.settings.low_stock_threshold)
            .await?)
    }

    pub async fn update_stock(&self, body: UpdateStockRequest) -> Result<StockEntry> {
        let (key, item_name, quantity) = body.required()?;
        Ok(self
            .stock
            .set_quantity(RowKey(key), &item_name, quantity)
            .await?)
    }

    pub async fn create_stock(&self, body: CreateStockRequest) -> Result<Value> {
        let (item_name, quantity) = body.required()?;
        let key = self.stock.add_entry(&item_name, quantity).await?;
        Ok(json!({ "key": key, "item_name": item_name, "quantity": quantity }))
    }

    pub async fn list_items(&self) -> Result<Vec<Keyed<CatalogItem>>> {
        Ok(self.catalog.list().await?)
    }

    pub async fn create_item(&self, item: CatalogItem) -> Result<CreatedItem> {
        Ok(self.catalog.create(&self.stock, item).await?)
    }

    pub async fn list_shopping(&self) -> Result<Vec<Keyed<ShoppingListEntry>>> {
        Ok(self.shopping.list().await?)
    }

    pub async fn create_purchase(&self, body: CreatePurchaseRequest) -> Result<ShoppingListEntry> {
        let mut missing = Vec::new();
        for (name, present) in [
            ("item", body.item.as_ref().is_some_and(|s| !s.trim().is_empty())),
            ("category", body.category.is_some()),
            ("quantity", body.quantity.is_some()),
            ("unit", body.unit.as_ref().is_some_and(|s| !s.trim().is_empty())),
            ("price", body.price.is_some()),
        ] {
            if !present {
                missing.push(name);
            }
        }
        let (Some(item), Some(category), Some(quantity), Some(unit), Some(price)) =
            (body.item, body.category, body.quantity, body.unit, body.price)
        else {
            return Err(ServiceError::MissingFields(missing));
        };
        if !missing.is_empty() {
            return Err(ServiceError::MissingFields(missing));
        }

        let purchase = NewPurchase {
            item,
            category: category.parse::<ShoppingCategory>()?,
            quantity,
            unit,
            price,
        };
        let batch = body.shopping_id.map(ShoppingBatchId::new);
        Ok(self.shopping.record(purchase, batch).await?)
    }

    pub async fn report(&self, query: ReportQuery) -> Result<Report> {
        Ok(self.analytics.aggregate(query.window, query.filter).await?)
    }

    /// Route `method target` to its handler.
    ///
    /// `target` may carry a leading `/`, an `api/` prefix and a query
    /// string. A missing body is treated as an empty object.
    #[tracing::instrument(skip_all, fields(method = %method, target = %target))]
    pub async fn dispatch(&self, method: Method, target: &str, body: Option<Value>) -> ApiResponse {
        let request = Request::parse(method, target);
        let body = body.unwrap_or_else(|| Value::Object(Map::new()));

        let response = match self.route(&request, body).await {
            Ok(response) => response,
            Err(e) => ApiResponse::error(&e),
        };
        if response.is_server_error() {
            tracing::error!(status = response.status, error = ?response.error, "request failed");
        } else if !response.is_success() {
            tracing::warn!(status = response.status, error = ?response.error, "request rejected");
        } else {
            tracing::debug!(status = response.status, "request handled");
        }
        response
    }

    async fn route(&self, request: &Request, body: Value) -> Result<ApiResponse> {
        let segments: Vec<&str> = request.segments.iter().map(String::as_str).collect();
        let not_allowed = || ServiceError::MethodNotAllowed {
            method: request.method.to_string(),
            path: request.path(),
        };

        let response = match (segments.as_slice(), request.method) {
            (["orders"], Method::Get) => ApiResponse::ok(&self.list_orders().await?),
            (["order"] | ["orders"], Method::Post) => {
                let line = self.create_order(parse(body)?).await?;
                ApiResponse::created(&line).with_message("Order recorded")
            }
            (["orders", "grouped"], Method::Get) => ApiResponse::ok(&self.grouped_orders().await?),
            (["orders", id], Method::Get) => ApiResponse::ok(&self.receipt(id).await?),

            (["stock"], Method::Get) => ApiResponse::ok(&self.list_stock().await?),
            (["stock"], Method::Put) => {
                let entry = self.update_stock(parse(body)?).await?;
                ApiResponse::ok(&entry).with_message("Stock updated")
            }
            (["stock"], Method::Post) => {
                let created = self.create_stock(parse(body)?).await?;
                ApiResponse::created(&created).with_message("Stock row created")
            }

            (["master-items"], Method::Get) => ApiResponse::ok(&self.list_items().await?),
            (["master-items"], Method::Post) => {
                let created = self.create_item(parse(body)?).await?;
                let message = created
                    .stock_warning
                    .clone()
                    .unwrap_or_else(|| "Item created".to_string());
                ApiResponse::created(&created).with_message(message)
            }

            (["shopping-list"], Method::Get) => ApiResponse::ok(&self.list_shopping().await?),
            (["shopping-list"], Method::Post) => {
                let entry = self.create_purchase(parse(body)?).await?;
                ApiResponse::created(&entry).with_message("Purchase recorded")
            }

            (["report"], Method::Get) => {
                let query = ReportQuery::from_request(request)?;
                ApiResponse::ok(&self.report(query).await?)
            }

            (["order"] | ["orders"] | ["orders", "grouped"] | ["orders", _], _)
            | (["stock"] | ["master-items"] | ["shopping-list"] | ["report"], _) => {
                return Err(not_allowed())
            }
            _ => {
                return Err(ServiceError::RouteNotFound {
                    method: request.method.to_string(),
                    path: request.path(),
                })
            }
        };
        Ok(response)
    }
}

fn parse<T: DeserializeOwned>(body: Value) -> Result<T> {
    Ok(serde_json::from_value(body)?)
}
