//! In-process fixtures: memory store, recorded view invalidations and a
//! gateway that answers from a script.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Value, json};

use crate::config::test_config;
use crate::db::{MemoryStore, Store};
use crate::error::AppError;
use crate::models::order::{MealPlan, NewOrder, OrderDetails, OrderStatus};
use crate::services::access_service::create_subscription_access;
use crate::services::content::ContentCatalog;
use crate::services::paystack::PaymentGateway;
use crate::services::views::RecordingInvalidator;
use crate::state::AppState;

/// Answers verify calls from a per-reference script. Unscripted references
/// behave like an unreachable gateway.
#[derive(Debug, Default)]
pub struct ScriptedGateway {
    responses: Mutex<HashMap<String, Value>>,
}

impl ScriptedGateway {
    pub fn respond(&self, reference: &str, body: Value) {
        self.responses
            .lock()
            .unwrap()
            .insert(reference.to_string(), body);
    }
}

#[async_trait]
impl PaymentGateway for ScriptedGateway {
    async fn verify_transaction(&self, reference: &str) -> Result<Value, AppError> {
        self.responses
            .lock()
            .unwrap()
            .get(reference)
            .cloned()
            .ok_or_else(|| AppError::GatewayUnavailable("connection refused".to_string()))
    }
}

/// Verify payload with the given transaction status.
pub fn gateway_verdict(reference: &str, status: &str) -> Value {
    json!({
        "status": true,
        "message": "Verification successful",
        "data": {
            "status": status,
            "reference": reference,
            "amount": 2_500_000,
            "customer": { "email": "ada@example.com", "first_name": "Ada", "last_name": "Obi" }
        }
    })
}

/// Successful verify payload for `amount_kobo`.
pub fn gateway_success(reference: &str, amount_kobo: i64) -> Value {
    let mut body = gateway_verdict(reference, "success");
    body["data"]["amount"] = json!(amount_kobo);
    body
}

pub struct TestApp {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub gateway: Arc<ScriptedGateway>,
    pub views: Arc<RecordingInvalidator>,
}

impl TestApp {
    pub fn new() -> Self {
        let config = test_config();
        let store = Arc::new(MemoryStore::new());
        let gateway = Arc::new(ScriptedGateway::default());
        let views = Arc::new(RecordingInvalidator::default());

        let state = AppState {
            store: store.clone(),
            gateway: gateway.clone(),
            views: views.clone(),
            catalog: Arc::new(ContentCatalog::new(&config.content_base_url)),
            config: Arc::new(config),
        };

        Self {
            state,
            store,
            gateway,
            views,
        }
    }
}

/// A paid general-plan subscription that started at `start`, plus a token issued then.
pub async fn paid_subscription_with_token(
    app: &TestApp,
    reference: &str,
    start: DateTime<Utc>,
) -> String {
    let order = app
        .store
        .insert_order(&NewOrder {
            reference: reference.to_string(),
            email: "ada@example.com".into(),
            first_name: "Ada".into(),
            last_name: "Obi".into(),
            phone: "0803".into(),
            state: "Lagos".into(),
            details: OrderDetails::Subscription {
                meal_plan: MealPlan::General,
            },
            amount: 25_000,
        })
        .await
        .unwrap();
    app.store
        .set_status_if_pending(order.id, OrderStatus::Success)
        .await
        .unwrap();
    app.store.set_order_created_at(reference, start);

    create_subscription_access(app.store.as_ref(), "ada@example.com", Some(reference), start)
        .await
        .unwrap()
}
