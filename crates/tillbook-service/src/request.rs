//! Request routing types and request bodies.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};
use tillbook_commerce::analytics::{DateWindow, PaymentFilter};
use tillbook_commerce::Money;
use tillbook_store::lenient;

use crate::ServiceError;

/// Query string parameters.
pub type QueryParams = HashMap<String, String>;

/// HTTP methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    /// Convert to HTTP method string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "DELETE" => Ok(Method::Delete),
            other => Err(ServiceError::MethodNotAllowed {
                method: other.to_string(),
                path: String::new(),
            }),
        }
    }
}

/// A routed request.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    /// Path segments without the leading slash or `api/` prefix.
    pub segments: Vec<String>,
    pub query: QueryParams,
}

impl Request {
    /// Split a target like `/api/report?start=2024-05-01` into segments
    /// and query parameters.
    pub fn parse(method: Method, target: &str) -> Self {
        let (path, query) = target.split_once('?').unwrap_or((target, ""));
        let mut segments: Vec<String> = path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        if segments.first().map(String::as_str) == Some("api") {
            segments.remove(0);
        }
        let query = query
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| {
                let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
                (k.to_string(), v.to_string())
            })
            .collect();
        Self {
            method,
            segments,
            query,
        }
    }

    /// The path, re-joined.
    pub fn path(&self) -> String {
        self.segments.join("/")
    }

    /// Get a query parameter by name.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }
}

fn opt_int<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    #[derive(Deserialize)]
    struct Int(#[serde(deserialize_with = "lenient::int")] i64);

    Ok(Option::<Int>::deserialize(deserializer)?.map(|Int(v)| v))
}

fn require<T>(value: Option<T>, name: &'static str, missing: &mut Vec<&'static str>) -> Option<T> {
    if value.is_none() {
        missing.push(name);
    }
    value
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// Body of `POST order`.
///
/// The older register's field names (`order_id`, `quantity_item`,
/// `cashier_name`, `total_amount`, ...) are accepted too. Either
/// `unit_price` or `total_amount` must be given.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CreateOrderRequest {
    #[serde(default, alias = "order_id")]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub item_name: Option<String>,
    #[serde(default, alias = "quantity_item", deserialize_with = "opt_int")]
    pub quantity: Option<i64>,
    #[serde(default)]
    pub unit_price: Option<Money>,
    #[serde(default)]
    pub total_amount: Option<Money>,
    #[serde(default, alias = "cashier_name")]
    pub cashier: Option<String>,
    #[serde(default, alias = "customer_name")]
    pub customer: Option<String>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default, alias = "cash_paid")]
    pub tendered: Option<Money>,
    #[serde(default)]
    pub change: Option<Money>,
    #[serde(default, alias = "notes_order")]
    pub note: Option<String>,
}

/// Validated fields of a [`CreateOrderRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderFields {
    pub item_name: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub cashier: String,
}

impl CreateOrderRequest {
    /// Check required fields and work out the unit price.
    pub fn required(&self) -> Result<OrderFields, ServiceError> {
        let mut missing = Vec::new();
        let item_name = require(non_blank(self.item_name.clone()), "item_name", &mut missing);
        let quantity = require(self.quantity.filter(|q| *q != 0), "quantity", &mut missing);
        let cashier = require(non_blank(self.cashier.clone()), "cashier", &mut missing);
        let price = require(
            self.unit_price.map(PriceInput::Unit).or(self.total_amount.map(PriceInput::Total)),
            "unit_price",
            &mut missing,
        );
        let (Some(item_name), Some(quantity), Some(cashier), Some(price)) =
            (item_name, quantity, cashier, price)
        else {
            return Err(ServiceError::MissingFields(missing));
        };

        let unit_price = match price {
            PriceInput::Unit(p) => p,
            PriceInput::Total(total) => {
                if quantity <= 0 || total.amount() % quantity != 0 {
                    return Err(ServiceError::InvalidBody(format!(
                        "total_amount {} does not divide evenly by quantity {quantity}",
                        total.amount()
                    )));
                }
                total.try_divide(quantity).unwrap_or_default()
            }
        };
        Ok(OrderFields {
            item_name,
            quantity,
            unit_price,
            cashier,
        })
    }
}

enum PriceInput {
    Unit(Money),
    Total(Money),
}

/// Body of `PUT stock`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UpdateStockRequest {
    #[serde(default)]
    pub row_key: Option<u64>,
    #[serde(default)]
    pub item_name: Option<String>,
    #[serde(default, deserialize_with = "opt_int")]
    pub quantity: Option<i64>,
}

impl UpdateStockRequest {
    pub fn required(&self) -> Result<(u64, String, i64), ServiceError> {
        let mut missing = Vec::new();
        let key = require(self.row_key, "row_key", &mut missing);
        let item = require(non_blank(self.item_name.clone()), "item_name", &mut missing);
        let quantity = require(self.quantity, "quantity", &mut missing);
        match (key, item, quantity) {
            (Some(k), Some(i), Some(q)) => Ok((k, i, q)),
            _ => Err(ServiceError::MissingFields(missing)),
        }
    }
}

/// Body of `POST stock`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CreateStockRequest {
    #[serde(default)]
    pub item_name: Option<String>,
    #[serde(default, deserialize_with = "opt_int")]
    pub quantity: Option<i64>,
}

impl CreateStockRequest {
    pub fn required(&self) -> Result<(String, i64), ServiceError> {
        let mut missing = Vec::new();
        let item = require(non_blank(self.item_name.clone()), "item_name", &mut missing);
        let quantity = require(self.quantity, "quantity", &mut missing);
        match (item, quantity) {
            (Some(i), Some(q)) => Ok((i, q)),
            _ => Err(ServiceError::MissingFields(missing)),
        }
    }
}

/// Body of `POST shopping-list`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CreatePurchaseRequest {
    #[serde(default)]
    pub shopping_id: Option<String>,
    #[serde(default, alias = "item_shopping")]
    pub item: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "opt_int")]
    pub quantity: Option<i64>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub price: Option<Money>,
}

/// Query of `GET report`: `start`, `end` (YYYY-MM-DD) and `payment`
/// (`all`, `cash` or `qris`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportQuery {
    pub window: DateWindow,
    pub filter: PaymentFilter,
}

impl ReportQuery {
    /// Read from query parameters. A missing bound leaves that side open.
    pub fn from_request(request: &Request) -> Result<Self, ServiceError> {
        let date = |name: &'static str| -> Result<Option<NaiveDate>, ServiceError> {
            request
                .query_param(name)
                .map(|v| {
                    NaiveDate::parse_from_str(v, "%Y-%m-%d").map_err(|e| ServiceError::InvalidQuery {
                        name,
                        message: e.to_string(),
                    })
                })
                .transpose()
        };
        let open = DateWindow::all_time();
        let start = date("start")?.unwrap_or(open.start);
        let end = date("end")?.unwrap_or(open.end);
        let window = DateWindow::new(start, end).map_err(|e| ServiceError::InvalidQuery {
            name: "start",
            message: e.to_string(),
        })?;
        let filter = request
            .query_param("payment")
            .map(str::parse::<PaymentFilter>)
            .transpose()
            .map_err(|e| ServiceError::InvalidQuery {
                name: "payment",
                message: e.to_string(),
            })?
            .unwrap_or_default();
        Ok(Self { window, filter })
    }
}
