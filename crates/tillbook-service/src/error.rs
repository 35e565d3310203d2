//! Service error types.

use thiserror::Error;
use tillbook_commerce::CommerceError;

/// Errors that can occur while handling a request.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// No route matches the path.
    #[error("No route for {method} {path}")]
    RouteNotFound { method: String, path: String },

    /// The path exists but not for this method.
    #[error("Method {method} not allowed on {path}")]
    MethodNotAllowed { method: String, path: String },

    /// A resource addressed by the path does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The body could not be read as the expected shape.
    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    /// Required fields were absent.
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    /// A query parameter could not be parsed.
    #[error("Invalid query parameter {name}: {message}")]
    InvalidQuery { name: &'static str, message: String },

    /// Domain failure.
    #[error(transparent)]
    Commerce(#[from] CommerceError),
}

impl ServiceError {
    /// HTTP-style status code for the error.
    pub fn status(&self) -> u16 {
        match self {
            ServiceError::RouteNotFound { .. } | ServiceError::NotFound(_) => 404,
            ServiceError::MethodNotAllowed { .. } => 405,
            ServiceError::InvalidBody(_)
            | ServiceError::MissingFields(_)
            | ServiceError::InvalidQuery { .. } => 400,
            ServiceError::Commerce(e) => match e {
                CommerceError::Validation(_)
                | CommerceError::InsufficientStock { .. }
                | CommerceError::ItemNotFound(_)
                | CommerceError::ItemNotPurchasable(_)
                | CommerceError::Overflow => 400,
                CommerceError::InvalidCheckoutTransition { .. } => 409,
                CommerceError::StoreUnavailable(_)
                | CommerceError::OrphanedStockDecrement { .. }
                | CommerceError::PartialCheckoutFailure(_)
                | CommerceError::Serialization(_) => 500,
            },
        }
    }

    /// Short machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::RouteNotFound { .. } => "route_not_found",
            ServiceError::MethodNotAllowed { .. } => "method_not_allowed",
            ServiceError::NotFound(_) => "not_found",
            ServiceError::InvalidBody(_) => "invalid_body",
            ServiceError::MissingFields(_) => "missing_fields",
            ServiceError::InvalidQuery { .. } => "invalid_query",
            ServiceError::Commerce(e) => e.code(),
        }
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(e: serde_json::Error) -> Self {
        ServiceError::InvalidBody(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let stock = ServiceError::from(CommerceError::InsufficientStock {
            item_name: "Kopi".into(),
            requested: 2,
            available: 0,
        });
        assert_eq!(stock.status(), 400);
        assert_eq!(stock.code(), "insufficient_stock");

        let store = ServiceError::from(CommerceError::StoreUnavailable("down".into()));
        assert_eq!(store.status(), 500);

        let transition = ServiceError::from(CommerceError::InvalidCheckoutTransition {
            from: "empty".into(),
            to: "settling".into(),
        });
        assert_eq!(transition.status(), 409);

        let missing = ServiceError::MissingFields(vec!["item_name", "cashier"]);
        assert_eq!(missing.to_string(), "Missing required fields: item_name, cashier");
    }
}
