//! Structured responses.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tillbook_commerce::CommerceError;

use crate::ServiceError;

/// Response envelope shared by every route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    /// HTTP-style status code.
    pub status: u16,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ApiResponse {
    /// A 200 response carrying `data`.
    pub fn ok<T: Serialize>(data: &T) -> Self {
        match serde_json::to_value(data) {
            Ok(data) => Self {
                status: 200,
                success: true,
                message: None,
                data: Some(data),
                error: None,
                details: None,
            },
            Err(e) => Self::error(&ServiceError::Commerce(e.into())),
        }
    }

    /// A 201 response carrying `data`.
    pub fn created<T: Serialize>(data: &T) -> Self {
        let mut response = Self::ok(data);
        if response.success {
            response.status = 201;
        }
        response
    }

    /// Attach a human-readable message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// An error response. `details` always carries the error code.
    pub fn error(err: &ServiceError) -> Self {
        let mut details = json!({ "code": err.code() });
        if let ServiceError::Commerce(e) = err {
            merge(&mut details, commerce_details(e));
        }
        Self {
            status: err.status(),
            success: false,
            message: None,
            data: None,
            error: Some(err.to_string()),
            details: Some(details),
        }
    }

    /// Check if the response was successful (2xx status).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Check if the response was a client error (4xx status).
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }

    /// Check if the response was a server error (5xx status).
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }

    /// Parse `data` into a typed value.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ServiceError> {
        let data = self.data.clone().unwrap_or(Value::Null);
        Ok(serde_json::from_value(data)?)
    }

    /// Render the envelope as JSON text.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            r#"{"status":500,"success":false,"error":"unserializable response"}"#.to_string()
        })
    }
}

impl From<ServiceError> for ApiResponse {
    fn from(err: ServiceError) -> Self {
        ApiResponse::error(&err)
    }
}

fn commerce_details(e: &CommerceError) -> Value {
    match e {
        CommerceError::InsufficientStock {
            item_name,
            requested,
            available,
        } => json!({
            "item_name": item_name,
            "requested": requested,
            "available": available,
        }),
        CommerceError::OrphanedStockDecrement {
            item_name,
            quantity,
            reason,
        } => json!({
            "item_name": item_name,
            "quantity": quantity,
            "reason": reason,
        }),
        CommerceError::PartialCheckoutFailure(partial) => {
            serde_json::to_value(partial.as_ref()).unwrap_or(Value::Null)
        }
        CommerceError::ItemNotFound(name) | CommerceError::ItemNotPurchasable(name) => {
            json!({ "item_name": name })
        }
        _ => Value::Null,
    }
}

fn merge(target: &mut Value, extra: Value) {
    if let (Value::Object(target), Value::Object(extra)) = (target, extra) {
        target.extend(extra);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_envelope() {
        let response = ApiResponse::ok(&vec![1, 2]).with_message("done");
        assert!(response.is_success());
        let text = response.to_json();
        assert!(text.contains(r#""success":true"#));
        assert!(!text.contains("error"));
        assert_eq!(response.json::<Vec<i32>>().unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_error_envelope_names_item() {
        let err = ServiceError::from(CommerceError::InsufficientStock {
            item_name: "Teh".into(),
            requested: 3,
            available: 1,
        });
        let response = ApiResponse::from(err);
        assert_eq!(response.status, 400);
        assert!(response.is_client_error());
        assert!(!response.success);
        let details = response.details.unwrap();
        assert_eq!(details["code"], "insufficient_stock");
        assert_eq!(details["item_name"], "Teh");
        assert_eq!(details["available"], 1);
    }
}
