/*
[INPUT]:  Raw WebSocket text frames
[OUTPUT]: Classified inbound frames, typed push messages, outbound frames
[POS]:    WebSocket layer - message parsing and validation
[UPDATE]: When adding new message types or changing format
*/

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::subscription::Subscription;
use crate::http::{HyperliquidError, Result};
use crate::types::{AllMids, Bbo, Candle, Fill, L2Book, OrderUpdate, Trade};

/// Greeting the exchange sends right after the upgrade
pub const CONNECTION_GREETING: &str = "Websocket connection established.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllMidsData {
    pub mids: AllMids,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserFillsData {
    pub user: String,
    #[serde(default)]
    pub is_snapshot: Option<bool>,
    pub fills: Vec<Fill>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveAssetCtxData {
    pub coin: String,
    pub ctx: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveAssetData {
    pub user: String,
    pub coin: String,
    #[serde(default)]
    pub leverage: Option<Value>,
    #[serde(default)]
    pub max_trade_szs: Option<Value>,
    #[serde(default)]
    pub available_to_trade: Option<Value>,
}

/// Typed push message delivered to subscription callbacks
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    AllMids(AllMidsData),
    L2Book(L2Book),
    Trades(Vec<Trade>),
    Candle(Candle),
    Bbo(Bbo),
    UserEvents(Value),
    UserFills(UserFillsData),
    OrderUpdates(Vec<OrderUpdate>),
    UserFundings(Value),
    UserNonFundingLedgerUpdates(Value),
    WebData2(Value),
    ActiveAssetCtx(ActiveAssetCtxData),
    ActiveAssetData(ActiveAssetData),
}

impl Message {
    /// Decode a data channel payload
    pub fn decode(channel: &str, data: Value) -> Result<Self> {
        let message = match channel {
            "allMids" => Message::AllMids(serde_json::from_value(data)?),
            "l2Book" => Message::L2Book(serde_json::from_value(data)?),
            "trades" => Message::Trades(serde_json::from_value(data)?),
            "candle" => Message::Candle(serde_json::from_value(data)?),
            "bbo" => Message::Bbo(serde_json::from_value(data)?),
            "user" => Message::UserEvents(data),
            "userFills" => Message::UserFills(serde_json::from_value(data)?),
            "orderUpdates" => Message::OrderUpdates(serde_json::from_value(data)?),
            "userFundings" => Message::UserFundings(data),
            "userNonFundingLedgerUpdates" => Message::UserNonFundingLedgerUpdates(data),
            "webData2" => Message::WebData2(data),
            "activeAssetCtx" | "activeSpotAssetCtx" => {
                Message::ActiveAssetCtx(serde_json::from_value(data)?)
            }
            "activeAssetData" => Message::ActiveAssetData(serde_json::from_value(data)?),
            other => {
                return Err(HyperliquidError::Protocol(format!(
                    "unknown channel {other}"
                )));
            }
        };
        Ok(message)
    }
}

/// Body of a `post` request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "lowercase")]
pub enum PostRequest {
    Info(Value),
    Action(Value),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "lowercase")]
pub enum PostResponse {
    Info(Value),
    Action(Value),
    Error(Value),
}

/// Reply to a `post` request, matched by `id`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostReply {
    pub id: u64,
    pub response: PostResponse,
}

impl PostReply {
    /// Turn the reply into the caller-facing outcome
    pub fn into_result(self) -> Result<Value> {
        match self.response {
            PostResponse::Info(payload) => Ok(payload),
            PostResponse::Action(payload) => {
                if payload.get("status").and_then(Value::as_str) == Some("err") {
                    let message = match payload.get("response") {
                        Some(Value::String(message)) => message.clone(),
                        Some(other) => other.to_string(),
                        None => payload.to_string(),
                    };
                    return Err(HyperliquidError::ActionRejected(message));
                }
                Ok(payload)
            }
            PostResponse::Error(payload) => Err(HyperliquidError::ClientFault {
                status: 400,
                code: None,
                message: match payload {
                    Value::String(message) => message,
                    other => other.to_string(),
                },
                data: None,
            }),
        }
    }
}

/// Frames written to the socket
#[derive(Debug, Serialize)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum Outbound<'a> {
    Subscribe {
        subscription: &'a Subscription,
    },
    Unsubscribe {
        subscription: &'a Subscription,
    },
    Ping,
    Post {
        id: u64,
        request: &'a PostRequest,
    },
}

impl Outbound<'_> {
    pub fn to_text(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[derive(Debug, Deserialize)]
struct RawFrame {
    channel: String,
    #[serde(default)]
    data: Value,
}

#[derive(Debug, Deserialize)]
struct SubscriptionAck {
    method: String,
    subscription: Subscription,
}

/// Inbound frame after channel classification
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Greeting,
    Pong,
    /// Subscribe echo for the entry with this routing key
    Acknowledged(String),
    Post(PostReply),
    Error(Value),
    /// Data push routed to `key`
    Data {
        key: String,
        channel: String,
        data: Value,
    },
    /// Push with nothing to route (e.g. empty trade list)
    Empty { channel: String },
}

fn str_field<'a>(data: &'a Value, field: &str, channel: &str) -> Result<&'a str> {
    data.get(field).and_then(Value::as_str).ok_or_else(|| {
        HyperliquidError::Protocol(format!("{channel} frame without {field}"))
    })
}

/// Routing key of a data push, matching `Subscription::routing_key`
pub fn routing_key(channel: &str, data: &Value) -> Result<Option<String>> {
    let key = match channel {
        "allMids" | "orderUpdates" => channel.to_string(),
        "user" => "userEvents".to_string(),
        "l2Book" | "bbo" => {
            format!("{channel}:{}", str_field(data, "coin", channel)?.to_lowercase())
        }
        "activeAssetCtx" | "activeSpotAssetCtx" => format!(
            "activeAssetCtx:{}",
            str_field(data, "coin", channel)?.to_lowercase()
        ),
        "trades" => {
            let Some(first) = data.as_array().and_then(|trades| trades.first()) else {
                return Ok(None);
            };
            format!("trades:{}", str_field(first, "coin", channel)?.to_lowercase())
        }
        "candle" => format!(
            "candle:{},{}",
            str_field(data, "s", channel)?.to_lowercase(),
            str_field(data, "i", channel)?
        ),
        "userFills" | "userFundings" | "userNonFundingLedgerUpdates" | "webData2" => {
            format!("{channel}:{}", str_field(data, "user", channel)?.to_lowercase())
        }
        "activeAssetData" => format!(
            "activeAssetData:{},{}",
            str_field(data, "coin", channel)?.to_lowercase(),
            str_field(data, "user", channel)?.to_lowercase()
        ),
        other => {
            return Err(HyperliquidError::Protocol(format!(
                "unknown channel {other}"
            )));
        }
    };
    Ok(Some(key))
}

/// Classify one inbound text frame
pub fn classify(text: &str) -> Result<Inbound> {
    if text == CONNECTION_GREETING {
        return Ok(Inbound::Greeting);
    }

    let frame: RawFrame = serde_json::from_str(text)?;
    match frame.channel.as_str() {
        "pong" => Ok(Inbound::Pong),
        "subscriptionResponse" => {
            let ack: SubscriptionAck = serde_json::from_value(frame.data)?;
            if ack.method == "subscribe" {
                Ok(Inbound::Acknowledged(ack.subscription.routing_key()))
            } else {
                Ok(Inbound::Empty {
                    channel: frame.channel,
                })
            }
        }
        "post" => Ok(Inbound::Post(serde_json::from_value(frame.data)?)),
        "error" => Ok(Inbound::Error(frame.data)),
        channel => match routing_key(channel, &frame.data)? {
            Some(key) => Ok(Inbound::Data {
                key,
                channel: frame.channel,
                data: frame.data,
            }),
            None => Ok(Inbound::Empty {
                channel: frame.channel,
            }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[test]
    fn test_outbound_frames() {
        let subscription = Subscription::l2_book("ETH");
        assert_eq!(
            Outbound::Subscribe {
                subscription: &subscription
            }
            .to_text()
            .unwrap(),
            r#"{"method":"subscribe","subscription":{"type":"l2Book","coin":"ETH"}}"#
        );
        assert_eq!(Outbound::Ping.to_text().unwrap(), r#"{"method":"ping"}"#);

        let request = PostRequest::Info(json!({"type": "allMids"}));
        let text = Outbound::Post {
            id: 7,
            request: &request,
        }
        .to_text()
        .unwrap();
        assert_eq!(
            serde_json::from_str::<Value>(&text).unwrap(),
            json!({"method": "post", "id": 7, "request": {"type": "info", "payload": {"type": "allMids"}}})
        );
    }

    #[rstest]
    #[case(json!({"channel": "l2Book", "data": {"coin": "ETH", "levels": [[], []], "time": 1}}), "l2Book:eth")]
    #[case(json!({"channel": "trades", "data": [{"coin": "BTC"}]}), "trades:btc")]
    #[case(json!({"channel": "candle", "data": {"s": "BTC", "i": "15m"}}), "candle:btc,15m")]
    #[case(json!({"channel": "user", "data": {"fills": []}}), "userEvents")]
    #[case(json!({"channel": "userFills", "data": {"user": "0xABC", "fills": []}}), "userFills:0xabc")]
    #[case(json!({"channel": "activeSpotAssetCtx", "data": {"coin": "@1", "ctx": {}}}), "activeAssetCtx:@1")]
    #[case(json!({"channel": "activeAssetData", "data": {"coin": "ETH", "user": "0xAB"}}), "activeAssetData:eth,0xab")]
    #[case(json!({"channel": "allMids", "data": {"mids": {}}}), "allMids")]
    fn test_data_routing(#[case] frame: Value, #[case] expected: &str) {
        match classify(&frame.to_string()).unwrap() {
            Inbound::Data { key, .. } => assert_eq!(key, expected),
            other => panic!("unexpected classification {other:?}"),
        }
    }

    #[test]
    fn test_control_frames() {
        assert_eq!(classify(CONNECTION_GREETING).unwrap(), Inbound::Greeting);
        assert_eq!(classify(r#"{"channel":"pong"}"#).unwrap(), Inbound::Pong);
        assert_eq!(
            classify(r#"{"channel":"trades","data":[]}"#).unwrap(),
            Inbound::Empty {
                channel: "trades".to_string()
            }
        );
        assert_eq!(
            classify(
                r#"{"channel":"subscriptionResponse","data":{"method":"subscribe","subscription":{"type":"l2Book","coin":"ETH"}}}"#
            )
            .unwrap(),
            Inbound::Acknowledged("l2Book:eth".to_string())
        );
    }

    #[test]
    fn test_protocol_errors() {
        assert!(classify("not json").is_err());
        assert!(classify(r#"{"data":{}}"#).is_err());
        assert!(matches!(
            classify(r#"{"channel":"l2Book","data":{}}"#),
            Err(HyperliquidError::Protocol(_))
        ));
        assert!(matches!(
            classify(r#"{"channel":"mystery","data":{}}"#),
            Err(HyperliquidError::Protocol(_))
        ));
    }

    #[test]
    fn test_post_reply_outcomes() {
        let Inbound::Post(reply) = classify(
            r#"{"channel":"post","data":{"id":3,"response":{"type":"info","payload":{"type":"l2Book","data":{}}}}}"#,
        )
        .unwrap() else {
            panic!("expected post reply");
        };
        assert_eq!(reply.id, 3);
        assert_eq!(
            reply.into_result().unwrap(),
            json!({"type": "l2Book", "data": {}})
        );

        let rejected = PostReply {
            id: 4,
            response: PostResponse::Action(json!({"status": "err", "response": "Insufficient margin"})),
        };
        assert!(matches!(
            rejected.into_result(),
            Err(HyperliquidError::ActionRejected(msg)) if msg == "Insufficient margin"
        ));

        let error = PostReply {
            id: 5,
            response: PostResponse::Error(json!("bad request")),
        };
        assert!(error.into_result().unwrap_err().is_client_fault());
    }

    #[test]
    fn test_decode_typed_payloads() {
        let message = Message::decode(
            "trades",
            json!([{"coin": "BTC", "side": "B", "px": "97000", "sz": "0.1", "hash": "0x0", "time": 1, "tid": 9}]),
        )
        .unwrap();
        let Message::Trades(trades) = message else {
            panic!("expected trades");
        };
        assert_eq!(trades[0].coin, "BTC");
        assert!(trades[0].side.is_buy());

        let mids = Message::decode("allMids", json!({"mids": {"ETH": "3500.5"}})).unwrap();
        let Message::AllMids(data) = mids else {
            panic!("expected mids");
        };
        assert_eq!(data.mids.get("ETH").map(|d| d.to_string()), Some("3500.5".to_string()));

        assert!(Message::decode("l2Book", json!({"coin": "ETH"})).is_err());
    }
}
