/*
[INPUT]:  `/exchange` and `post` reply bodies
[OUTPUT]: Typed exchange replies and per-order statuses
[POS]:    Data layer - response types for API communication
[UPDATE]: When API schema changes or new types added
*/

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Reply to a signed action: `{"status":"ok"|"err","response":…}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "response", rename_all = "lowercase")]
pub enum ExchangeResponse {
    Ok(ExchangeData),
    Err(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeData {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Option<Value>,
}

impl ExchangeData {
    /// Per-order statuses of an `order` / `batchModify` reply
    pub fn order_statuses(&self) -> Vec<OrderStatus> {
        self.data
            .as_ref()
            .and_then(|data| data.get("statuses"))
            .and_then(|statuses| serde_json::from_value(statuses.clone()).ok())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestingOrder {
    pub oid: u64,
    #[serde(default)]
    pub cloid: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilledOrder {
    #[serde(with = "rust_decimal::serde::str")]
    pub total_sz: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub avg_px: Decimal,
    pub oid: u64,
    #[serde(default)]
    pub cloid: Option<String>,
}

/// Outcome of a single order inside a bulk request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OrderStatus {
    Resting(RestingOrder),
    Filled(FilledOrder),
    Error(String),
    WaitingForFill(RestingOrder),
    WaitingForTrigger(RestingOrder),
    /// Plain string statuses such as `"success"` from cancels
    #[serde(untagged)]
    Other(Value),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_exchange_ok_with_statuses() {
        let response: ExchangeResponse = serde_json::from_value(json!({
            "status": "ok",
            "response": {
                "type": "order",
                "data": {"statuses": [
                    {"resting": {"oid": 77738308}},
                    {"filled": {"totalSz": "0.02", "avgPx": "1891.4", "oid": 77747314}},
                    {"error": "Order must have minimum value of $10."}
                ]}
            }
        }))
        .unwrap();

        let ExchangeResponse::Ok(data) = response else {
            panic!("expected ok response");
        };
        let statuses = data.order_statuses();
        assert_eq!(statuses.len(), 3);
        assert!(matches!(&statuses[0], OrderStatus::Resting(r) if r.oid == 77738308));
        assert!(matches!(&statuses[1], OrderStatus::Filled(f) if f.oid == 77747314));
        assert!(matches!(&statuses[2], OrderStatus::Error(msg) if msg.contains("minimum")));
    }

    #[test]
    fn test_exchange_err() {
        let response: ExchangeResponse = serde_json::from_value(json!({
            "status": "err",
            "response": "User or API Wallet does not exist."
        }))
        .unwrap();
        assert_eq!(
            response,
            ExchangeResponse::Err("User or API Wallet does not exist.".to_string())
        );
    }

    #[test]
    fn test_cancel_success_status() {
        let response: ExchangeResponse = serde_json::from_value(json!({
            "status": "ok",
            "response": {"type": "cancel", "data": {"statuses": ["success"]}}
        }))
        .unwrap();
        let ExchangeResponse::Ok(data) = response else {
            panic!("expected ok response");
        };
        assert_eq!(
            data.order_statuses(),
            vec![OrderStatus::Other(json!("success"))]
        );
    }
}
