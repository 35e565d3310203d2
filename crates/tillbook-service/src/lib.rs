//! Transport-independent request surface for Tillbook.
//!
//! Routes method and path pairs to the domain services and wraps every
//! result in the same JSON envelope, so an HTTP adapter or the CLI can
//! sit on top without knowing the domain errors.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use serde_json::json;
//! use tillbook_commerce::config::LedgerSettings;
//! use tillbook_service::{Method, PosService};
//! use tillbook_store::MemoryStore;
//!
//! let service = PosService::new(Arc::new(MemoryStore::new()), LedgerSettings::default());
//!
//! let response = service
//!     .dispatch(
//!         Method::Post,
//!         "/api/order",
//!         Some(json!({
//!             "item_name": "Kopi Susu",
//!             "quantity": 2,
//!             "unit_price": 12000,
//!             "cashier": "Sari",
//!         })),
//!     )
//!     .await;
//!
//! println!("{} {}", response.status, response.to_json());
//! ```

mod error;
mod request;
mod response;
mod service;

pub use error::ServiceError;
pub use request::{
    CreateOrderRequest, CreatePurchaseRequest, CreateStockRequest, Method, OrderFields,
    QueryParams, ReportQuery, Request, UpdateStockRequest,
};
pub use response::ApiResponse;
pub use service::PosService;
