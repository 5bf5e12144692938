//! The six built-in tools. Order/stock/FAQ/customer
//! fixtures are process-scoped in-memory data — these are demo-agent tools,
//! not a catalog/CRM integration; only appointment booking is persisted
//! (it needs a durable double-booking guard across restarts).

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::PgPool;
use uuid::Uuid;

use voice_domain::error::{Error, Result};
use voice_domain::tool::ToolDefinition;

use crate::registry::Tool;

// ── check_order_status ─────────────────────────────────────────────────

pub struct CheckOrderStatus {
    orders: RwLock<HashMap<String, String>>,
}

impl Default for CheckOrderStatus {
    fn default() -> Self {
        let mut orders = HashMap::new();
        orders.insert("123".to_string(), "Shipped - Arriving Tuesday".to_string());
        orders.insert("456".to_string(), "Processing".to_string());
        orders.insert("789".to_string(), "Delivered".to_string());
        Self {
            orders: RwLock::new(orders),
        }
    }
}

#[derive(Deserialize)]
struct OrderArgs {
    order_id: String,
}

#[async_trait::async_trait]
impl Tool for CheckOrderStatus {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "check_order_status".into(),
            description: "Look up the shipping status of a customer order by order id.".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "order_id": {"type": "string", "description": "The order identifier"}
                },
                "required": ["order_id"]
            }),
        }
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let args: OrderArgs =
            serde_json::from_value(args).map_err(|e| Error::Other(e.to_string()))?;
        let status = self
            .orders
            .read()
            .get(&args.order_id)
            .cloned()
            .unwrap_or_else(|| "Not found".to_string());
        Ok(json!({ "status": status }))
    }
}

// ── check_item_stock ────────────────────────────────────────────────────

pub struct CheckItemStock {
    items: RwLock<HashMap<String, u32>>,
}

impl Default for CheckItemStock {
    fn default() -> Self {
        let mut items = HashMap::new();
        items.insert("widget".to_string(), 42);
        items.insert("gadget".to_string(), 0);
        items.insert("gizmo".to_string(), 7);
        Self {
            items: RwLock::new(items),
        }
    }
}

#[derive(Deserialize)]
struct StockArgs {
    item_name: String,
}

#[async_trait::async_trait]
impl Tool for CheckItemStock {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "check_item_stock".into(),
            description: "Check whether an item is in stock and how many are available.".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "item_name": {"type": "string", "description": "The item name"}
                },
                "required": ["item_name"]
            }),
        }
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let args: StockArgs =
            serde_json::from_value(args).map_err(|e| Error::Other(e.to_string()))?;
        let key = args.item_name.to_lowercase();
        match self.items.read().get(&key) {
            Some(&quantity) if quantity > 0 => Ok(json!({
                "available": true,
                "quantity": quantity,
                "message": format!("{quantity} in stock"),
            })),
            Some(_) => Ok(json!({
                "available": false,
                "quantity": 0,
                "message": "Out of stock",
            })),
            None => Ok(json!({
                "available": false,
                "quantity": 0,
                "message": "Unknown item",
            })),
        }
    }
}

// ── book_appointment ─────────────────────────────────────────────────────

pub struct BookAppointment {
    pool: PgPool,
}

impl BookAppointment {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Deserialize)]
struct BookingArgs {
    customer_name: String,
    date: String,
    time: String,
    #[serde(default)]
    service_type: Option<String>,
}

#[async_trait::async_trait]
impl Tool for BookAppointment {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "book_appointment".into(),
            description: "Book an appointment slot for a customer, rejecting double-bookings."
                .into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "customer_name": {"type": "string"},
                    "date": {"type": "string", "description": "YYYY-MM-DD"},
                    "time": {"type": "string", "description": "HH:MM"},
                    "service_type": {"type": "string"}
                },
                "required": ["customer_name", "date", "time"]
            }),
        }
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let args: BookingArgs =
            serde_json::from_value(args).map_err(|e| Error::Other(e.to_string()))?;

        let existing: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM call_reservations WHERE date = $1 AND time = $2")
                .bind(&args.date)
                .bind(&args.time)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| Error::Database(e.to_string()))?;

        if existing.is_some() {
            return Ok(json!({
                "success": false,
                "message": "This time slot is already booked",
            }));
        }

        let confirmation_number = format!("APT-{}", &Uuid::new_v4().to_string()[..8].to_uppercase());
        sqlx::query(
            r#"
            INSERT INTO call_reservations
                (id, customer_name, date, time, service_type, confirmation_number, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, now())
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&args.customer_name)
        .bind(&args.date)
        .bind(&args.time)
        .bind(&args.service_type)
        .bind(&confirmation_number)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        Ok(json!({
            "success": true,
            "confirmation_number": confirmation_number,
            "message": format!("Booked for {} at {}", args.date, args.time),
        }))
    }
}

// ── search_faq ────────────────────────────────────────────────────────

pub struct SearchFaq {
    entries: Vec<(Vec<String>, String)>,
}

impl Default for SearchFaq {
    fn default() -> Self {
        Self {
            entries: vec![
                (
                    vec!["return".into(), "refund".into()],
                    "You can return items within 30 days of purchase for a full refund.".into(),
                ),
                (
                    vec!["hours".into(), "open".into()],
                    "We're open Monday through Friday, 9am to 6pm.".into(),
                ),
                (
                    vec!["shipping".into(), "delivery".into()],
                    "Standard shipping takes 3-5 business days.".into(),
                ),
            ],
        }
    }
}

#[derive(Deserialize)]
struct FaqArgs {
    question: String,
}

#[async_trait::async_trait]
impl Tool for SearchFaq {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "search_faq".into(),
            description: "Keyword-match a customer question against frequently asked questions."
                .into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "question": {"type": "string"}
                },
                "required": ["question"]
            }),
        }
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let args: FaqArgs =
            serde_json::from_value(args).map_err(|e| Error::Other(e.to_string()))?;
        let question = args.question.to_lowercase();
        let hit = self
            .entries
            .iter()
            .find(|(keywords, _)| keywords.iter().any(|k| question.contains(k.as_str())));
        match hit {
            Some((_, answer)) => Ok(json!({ "found": true, "answer": answer })),
            None => Ok(json!({ "found": false, "answer": Value::Null })),
        }
    }
}

// ── get_customer_profile ─────────────────────────────────────────────────

#[derive(Clone, serde::Serialize)]
struct CustomerProfile {
    customer_id: String,
    name: String,
    email: String,
    loyalty_tier: String,
}

pub struct GetCustomerProfile {
    by_id: HashMap<String, CustomerProfile>,
    phone_to_id: HashMap<String, String>,
}

impl Default for GetCustomerProfile {
    fn default() -> Self {
        let mut by_id = HashMap::new();
        by_id.insert(
            "cust-1".to_string(),
            CustomerProfile {
                customer_id: "cust-1".into(),
                name: "Jordan Lee".into(),
                email: "jordan@example.com".into(),
                loyalty_tier: "gold".into(),
            },
        );
        let mut phone_to_id = HashMap::new();
        phone_to_id.insert("+15551234567".to_string(), "cust-1".to_string());
        Self { by_id, phone_to_id }
    }
}

#[derive(Deserialize, Default)]
struct ProfileArgs {
    #[serde(default)]
    customer_id: Option<String>,
    #[serde(default)]
    phone_number: Option<String>,
}

#[async_trait::async_trait]
impl Tool for GetCustomerProfile {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "get_customer_profile".into(),
            description: "Look up a customer profile by customer id or phone number.".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "customer_id": {"type": "string"},
                    "phone_number": {"type": "string"}
                }
            }),
        }
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let args: ProfileArgs =
            serde_json::from_value(args).map_err(|e| Error::Other(e.to_string()))?;

        let resolved_id = args.customer_id.or_else(|| {
            args.phone_number
                .as_ref()
                .and_then(|phone| self.phone_to_id.get(phone).cloned())
        });

        match resolved_id.and_then(|id| self.by_id.get(&id)) {
            Some(profile) => {
                let mut value = serde_json::to_value(profile).map_err(Error::Json)?;
                value["found"] = json!(true);
                Ok(value)
            }
            None => Ok(json!({ "found": false })),
        }
    }
}

// ── trigger_human_handoff ─────────────────────────────────────────────

#[derive(Default)]
pub struct TriggerHumanHandoff;

#[derive(Deserialize)]
struct HandoffArgs {
    #[allow(dead_code)]
    reason: String,
    #[serde(default)]
    priority: Option<String>,
}

#[async_trait::async_trait]
impl Tool for TriggerHumanHandoff {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "trigger_human_handoff".into(),
            description: "Escalate the call to a human agent.".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "reason": {"type": "string"},
                    "priority": {"type": "string", "enum": ["normal", "urgent"]}
                },
                "required": ["reason"]
            }),
        }
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let args: HandoffArgs =
            serde_json::from_value(args).map_err(|e| Error::Other(e.to_string()))?;
        let estimated_wait = if args.priority.as_deref() == Some("urgent") {
            "under 2 minutes"
        } else {
            "about 10 minutes"
        };
        Ok(json!({
            "handoff_initiated": true,
            "estimated_wait": estimated_wait,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn order_status_known_and_unknown() {
        let tool = CheckOrderStatus::default();
        let known = tool.execute(json!({"order_id": "123"})).await.unwrap();
        assert_eq!(known["status"], "Shipped - Arriving Tuesday");
        let unknown = tool.execute(json!({"order_id": "does-not-exist"})).await.unwrap();
        assert_eq!(unknown["status"], "Not found");
    }

    #[tokio::test]
    async fn stock_lookup_is_case_insensitive() {
        let tool = CheckItemStock::default();
        let hit = tool.execute(json!({"item_name": "WIDGET"})).await.unwrap();
        assert_eq!(hit["available"], true);
        assert_eq!(hit["quantity"], 42);
    }

    #[tokio::test]
    async fn stock_lookup_zero_quantity_is_unavailable() {
        let tool = CheckItemStock::default();
        let out = tool.execute(json!({"item_name": "gadget"})).await.unwrap();
        assert_eq!(out["available"], false);
        assert_eq!(out["quantity"], 0);
        assert_eq!(out["message"], "Out of stock");
    }

    #[tokio::test]
    async fn stock_lookup_unknown_item() {
        let tool = CheckItemStock::default();
        let out = tool.execute(json!({"item_name": "thingamajig"})).await.unwrap();
        assert_eq!(out["available"], false);
        assert_eq!(out["quantity"], 0);
        assert_eq!(out["message"], "Unknown item");
    }

    #[tokio::test]
    async fn faq_matches_by_keyword() {
        let tool = SearchFaq::default();
        let hit = tool
            .execute(json!({"question": "What's your return policy?"}))
            .await
            .unwrap();
        assert_eq!(hit["found"], true);
        assert!(hit["answer"].as_str().unwrap().contains("30 days"));
    }

    #[tokio::test]
    async fn faq_no_match_returns_not_found() {
        let tool = SearchFaq::default();
        let miss = tool.execute(json!({"question": "do you sell spaceships"})).await.unwrap();
        assert_eq!(miss["found"], false);
    }

    #[tokio::test]
    async fn customer_profile_resolves_by_phone_then_id() {
        let tool = GetCustomerProfile::default();
        let by_phone = tool
            .execute(json!({"phone_number": "+15551234567"}))
            .await
            .unwrap();
        assert_eq!(by_phone["found"], true);
        assert_eq!(by_phone["customer_id"], "cust-1");

        let by_id = tool.execute(json!({"customer_id": "cust-1"})).await.unwrap();
        assert_eq!(by_id["found"], true);

        let miss = tool.execute(json!({"phone_number": "+10000000000"})).await.unwrap();
        assert_eq!(miss["found"], false);
    }

    #[tokio::test]
    async fn handoff_urgent_priority_shortens_wait() {
        let tool = TriggerHumanHandoff;
        let urgent = tool
            .execute(json!({"reason": "angry customer", "priority": "urgent"}))
            .await
            .unwrap();
        assert_eq!(urgent["handoff_initiated"], true);
        assert_eq!(urgent["estimated_wait"], "under 2 minutes");

        let normal = tool.execute(json!({"reason": "general question"})).await.unwrap();
        assert_eq!(normal["estimated_wait"], "about 10 minutes");
    }
}
