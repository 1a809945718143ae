//! Order data models and API request/response types.
//!
//! This module defines:
//! - `Order`: a purchase attempt, addressed externally by its gateway `reference`
//! - `OrderDetails`: what was bought, one variant per order kind
//! - `OrderRow`: the raw `orders` table row and its decoding into `Order`
//! - `CheckoutRequest`: request body for starting a checkout
//! - `OrderStats`: admin dashboard aggregates
//!
//! # Column Layout
//!
//! The `orders` table keeps the historical flat layout where `apartment_type`
//! and `landmark` carry different payloads per order kind. `OrderDetails`
//! is the only place that knows how those columns are packed:
//!
//! | kind            | order_type      | apartment_type     | landmark                  |
//! |-----------------|-----------------|--------------------|---------------------------|
//! | routine download| `download`      | apartment type     | NULL                      |
//! | infant recipe   | `download`      | `infant-recipe`    | comma-joined preferences  |
//! | print & deliver | `print-deliver` | apartment type     | delivery landmark         |
//! | subscription    | `subscription`  | meal plan          | meal plan                 |

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// Sentinel stored in `apartment_type` for infant recipe plans.
pub const INFANT_RECIPE: &str = "infant-recipe";

/// Flat fee added to print & deliver orders, in Naira.
pub const DELIVERY_FEE: i64 = 9_000;

/// Price of the infant recipe plan, in Naira.
pub const INFANT_RECIPE_PRICE: i64 = 50_000;

/// Payment status of an order.
///
/// Only `Pending -> Success` and `Pending -> Failed` are legal changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Success,
    Failed,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Success => "success",
            OrderStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, OrderStatus::Pending)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "success" => Ok(OrderStatus::Success),
            "failed" => Ok(OrderStatus::Failed),
            other => Err(AppError::Validation(format!("Unknown order status: {other}"))),
        }
    }
}

/// Value of the `order_type` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderType {
    Download,
    PrintDeliver,
    Subscription,
}

impl OrderType {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderType::Download => "download",
            OrderType::PrintDeliver => "print-deliver",
            OrderType::Subscription => "subscription",
        }
    }
}

impl FromStr for OrderType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "download" => Ok(OrderType::Download),
            "print-deliver" => Ok(OrderType::PrintDeliver),
            "subscription" => Ok(OrderType::Subscription),
            other => Err(AppError::Validation(format!("Unknown order type: {other}"))),
        }
    }
}

/// Home layouts a routine guide is written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ApartmentType {
    Studio,
    Apartment,
    Bungalow,
    DuplexTerrace,
    DuplexBalcony,
}

impl ApartmentType {
    pub fn as_str(self) -> &'static str {
        match self {
            ApartmentType::Studio => "studio",
            ApartmentType::Apartment => "apartment",
            ApartmentType::Bungalow => "bungalow",
            ApartmentType::DuplexTerrace => "duplex-terrace",
            ApartmentType::DuplexBalcony => "duplex-balcony",
        }
    }

    /// Download price in Naira.
    pub fn price(self) -> i64 {
        match self {
            ApartmentType::Studio => 15_000,
            ApartmentType::Apartment => 20_000,
            ApartmentType::Bungalow => 25_000,
            ApartmentType::DuplexTerrace => 35_000,
            ApartmentType::DuplexBalcony => 30_000,
        }
    }
}

impl FromStr for ApartmentType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "studio" => Ok(ApartmentType::Studio),
            "apartment" => Ok(ApartmentType::Apartment),
            "bungalow" => Ok(ApartmentType::Bungalow),
            "duplex-terrace" => Ok(ApartmentType::DuplexTerrace),
            "duplex-balcony" => Ok(ApartmentType::DuplexBalcony),
            other => Err(AppError::Validation(format!("Unknown apartment type: {other}"))),
        }
    }
}

/// Meal plan bought with a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealPlan {
    General,
    Healthy,
    Both,
}

impl MealPlan {
    pub fn as_str(self) -> &'static str {
        match self {
            MealPlan::General => "general",
            MealPlan::Healthy => "healthy",
            MealPlan::Both => "both",
        }
    }

    /// Subscription price in Naira.
    pub fn price(self) -> i64 {
        match self {
            MealPlan::General => 25_000,
            MealPlan::Healthy => 35_000,
            MealPlan::Both => 50_000,
        }
    }
}

impl FromStr for MealPlan {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "general" => Ok(MealPlan::General),
            "healthy" => Ok(MealPlan::Healthy),
            "both" => Ok(MealPlan::Both),
            other => Err(AppError::Validation(format!("Unknown meal plan: {other}"))),
        }
    }
}

/// What an order is for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum OrderDetails {
    /// Downloadable routine guide for one home layout.
    Download { apartment_type: ApartmentType },

    /// Downloadable infant recipe plan, tailored by preference tags.
    InfantRecipe { preferences: Vec<String> },

    /// Printed routine guide delivered to an address.
    PrintDeliver {
        apartment_type: ApartmentType,
        delivery_address: String,
        landmark: Option<String>,
    },

    /// Four-week meal plan subscription.
    Subscription { meal_plan: MealPlan },
}

/// `OrderDetails` packed into the overloaded `orders` columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailColumns {
    pub order_type: &'static str,
    pub apartment_type: String,
    pub delivery_address: Option<String>,
    pub landmark: Option<String>,
}

impl OrderDetails {
    pub fn order_type(&self) -> OrderType {
        match self {
            OrderDetails::Download { .. } | OrderDetails::InfantRecipe { .. } => {
                OrderType::Download
            }
            OrderDetails::PrintDeliver { .. } => OrderType::PrintDeliver,
            OrderDetails::Subscription { .. } => OrderType::Subscription,
        }
    }

    /// Price in whole Naira.
    pub fn amount(&self) -> i64 {
        match self {
            OrderDetails::Download { apartment_type } => apartment_type.price(),
            OrderDetails::InfantRecipe { .. } => INFANT_RECIPE_PRICE,
            OrderDetails::PrintDeliver { apartment_type, .. } => {
                apartment_type.price() + DELIVERY_FEE
            }
            OrderDetails::Subscription { meal_plan } => meal_plan.price(),
        }
    }

    pub fn is_subscription(&self) -> bool {
        matches!(self, OrderDetails::Subscription { .. })
    }

    pub fn to_columns(&self) -> DetailColumns {
        let order_type = self.order_type().as_str();
        match self {
            OrderDetails::Download { apartment_type } => DetailColumns {
                order_type,
                apartment_type: apartment_type.as_str().to_string(),
                delivery_address: None,
                landmark: None,
            },
            OrderDetails::InfantRecipe { preferences } => DetailColumns {
                order_type,
                apartment_type: INFANT_RECIPE.to_string(),
                delivery_address: None,
                landmark: Some(preferences.join(",")),
            },
            OrderDetails::PrintDeliver {
                apartment_type,
                delivery_address,
                landmark,
            } => DetailColumns {
                order_type,
                apartment_type: apartment_type.as_str().to_string(),
                delivery_address: Some(delivery_address.clone()),
                landmark: landmark.clone(),
            },
            OrderDetails::Subscription { meal_plan } => DetailColumns {
                order_type,
                apartment_type: meal_plan.as_str().to_string(),
                delivery_address: None,
                landmark: Some(meal_plan.as_str().to_string()),
            },
        }
    }

    /// Decode the overloaded columns of a stored row.
    pub fn from_columns(
        order_type: &str,
        apartment_type: &str,
        delivery_address: Option<&str>,
        landmark: Option<&str>,
    ) -> Result<Self, AppError> {
        if apartment_type == INFANT_RECIPE {
            return Ok(OrderDetails::InfantRecipe {
                preferences: split_preferences(landmark.unwrap_or_default()),
            });
        }

        match order_type.parse::<OrderType>()? {
            OrderType::Download => Ok(OrderDetails::Download {
                apartment_type: apartment_type.parse()?,
            }),
            OrderType::PrintDeliver => Ok(OrderDetails::PrintDeliver {
                apartment_type: apartment_type.parse()?,
                delivery_address: delivery_address.unwrap_or_default().to_string(),
                landmark: landmark.filter(|l| !l.is_empty()).map(str::to_string),
            }),
            OrderType::Subscription => {
                // Older rows kept a placeholder apartment type and the plan in landmark.
                let meal_plan = landmark
                    .and_then(|l| l.parse::<MealPlan>().ok())
                    .map(Ok)
                    .unwrap_or_else(|| apartment_type.parse::<MealPlan>())?;
                Ok(OrderDetails::Subscription { meal_plan })
            }
        }
    }
}

/// Split a comma-joined preference list, dropping blanks.
pub fn split_preferences(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// Represents an order record from the database.
///
/// # Database Table
///
/// Maps to the `orders` table. Decoded into [`Order`] before use.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderRow {
    pub id: Uuid,
    pub reference: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub state: String,
    pub apartment_type: String,
    pub order_type: String,
    pub delivery_address: Option<String>,
    pub landmark: Option<String>,
    pub amount: i64,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A purchase attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,

    /// Unique, immutable reference shared with the payment gateway.
    pub reference: String,

    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,

    /// Free-text region.
    pub state: String,

    pub details: OrderDetails,

    /// Whole Naira, not kobo.
    pub amount: i64,

    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn order_type(&self) -> OrderType {
        self.details.order_type()
    }
}

impl TryFrom<OrderRow> for Order {
    type Error = AppError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let details = OrderDetails::from_columns(
            &row.order_type,
            &row.apartment_type,
            row.delivery_address.as_deref(),
            row.landmark.as_deref(),
        )
        .map_err(|e| corrupt_row(&row.reference, e))?;
        let status = row
            .status
            .parse()
            .map_err(|e| corrupt_row(&row.reference, e))?;

        Ok(Self {
            id: row.id,
            reference: row.reference,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            phone: row.phone,
            state: row.state,
            details,
            amount: row.amount,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn corrupt_row(reference: &str, cause: AppError) -> AppError {
    AppError::Persistence(format!("order {reference} does not decode: {cause}"))
}

/// Validated input for inserting an order. Always inserted as `pending`.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub reference: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub state: String,
    pub details: OrderDetails,
    pub amount: i64,
}

/// Request body for starting a checkout.
///
/// # JSON Example
///
/// ```json
/// {
///   "email": "ada@example.com",
///   "firstName": "Ada",
///   "lastName": "Obi",
///   "phone": "08030000000",
///   "state": "Lagos",
///   "orderType": "subscription",
///   "mealPlan": "healthy"
/// }
/// ```
///
/// Download orders send `apartmentType` (or `"infant-recipe"` with `preferences`),
/// print & deliver orders also send `deliveryAddress` and an optional `landmark`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    /// Client-generated reference; the server generates one when absent.
    pub reference: Option<String>,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    #[serde(default)]
    pub state: String,
    pub order_type: String,
    pub apartment_type: Option<String>,
    pub meal_plan: Option<String>,
    pub delivery_address: Option<String>,
    pub landmark: Option<String>,
    #[serde(default)]
    pub preferences: Vec<String>,
}

impl CheckoutRequest {
    /// Build the `OrderDetails` variant the request describes.
    pub fn details(&self) -> Result<OrderDetails, AppError> {
        let apartment = || -> Result<ApartmentType, AppError> {
            self.apartment_type
                .as_deref()
                .ok_or_else(|| AppError::Validation("apartmentType is required".to_string()))?
                .parse()
        };

        match self.order_type.parse::<OrderType>()? {
            OrderType::Download if self.apartment_type.as_deref() == Some(INFANT_RECIPE) => {
                Ok(OrderDetails::InfantRecipe {
                    preferences: self
                        .preferences
                        .iter()
                        .flat_map(|p| split_preferences(p))
                        .collect(),
                })
            }
            OrderType::Download => Ok(OrderDetails::Download {
                apartment_type: apartment()?,
            }),
            OrderType::PrintDeliver => {
                let delivery_address = self
                    .delivery_address
                    .as_deref()
                    .map(str::trim)
                    .filter(|a| !a.is_empty())
                    .ok_or_else(|| {
                        AppError::Validation("deliveryAddress is required".to_string())
                    })?;
                Ok(OrderDetails::PrintDeliver {
                    apartment_type: apartment()?,
                    delivery_address: delivery_address.to_string(),
                    landmark: self
                        .landmark
                        .as_deref()
                        .map(str::trim)
                        .filter(|l| !l.is_empty())
                        .map(str::to_string),
                })
            }
            OrderType::Subscription => {
                let meal_plan = self
                    .meal_plan
                    .as_deref()
                    .ok_or_else(|| AppError::Validation("mealPlan is required".to_string()))?
                    .parse()?;
                Ok(OrderDetails::Subscription { meal_plan })
            }
        }
    }
}

/// Order counts and revenue for the admin dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OrderStats {
    pub total: i64,
    pub pending: i64,
    pub success: i64,
    pub failed: i64,

    /// Sum of `amount` over successful orders, in Naira.
    pub total_revenue: i64,
}

/// Outcome of a status update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusChange {
    Updated,
    Unchanged,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checkout(order_type: &str) -> CheckoutRequest {
        CheckoutRequest {
            email: "ada@example.com".into(),
            first_name: "Ada".into(),
            last_name: "Obi".into(),
            phone: "0803".into(),
            order_type: order_type.into(),
            ..Default::default()
        }
    }

    #[test]
    fn prices_follow_the_catalogue() {
        assert_eq!(
            OrderDetails::Download {
                apartment_type: ApartmentType::DuplexTerrace
            }
            .amount(),
            35_000
        );
        assert_eq!(
            OrderDetails::PrintDeliver {
                apartment_type: ApartmentType::Studio,
                delivery_address: "1 Marina".into(),
                landmark: None,
            }
            .amount(),
            24_000
        );
        assert_eq!(
            OrderDetails::InfantRecipe {
                preferences: vec![]
            }
            .amount(),
            50_000
        );
        assert_eq!(
            OrderDetails::Subscription {
                meal_plan: MealPlan::General
            }
            .amount(),
            25_000
        );
    }

    #[test]
    fn infant_recipe_packs_preferences_into_landmark() {
        let details = OrderDetails::InfantRecipe {
            preferences: vec!["dairy-free".into(), "6-months".into()],
        };
        let columns = details.to_columns();
        assert_eq!(columns.order_type, "download");
        assert_eq!(columns.apartment_type, INFANT_RECIPE);
        assert_eq!(columns.landmark.as_deref(), Some("dairy-free,6-months"));

        let decoded = OrderDetails::from_columns(
            columns.order_type,
            &columns.apartment_type,
            None,
            columns.landmark.as_deref(),
        )
        .unwrap();
        assert_eq!(decoded, details);
    }

    #[test]
    fn legacy_subscription_rows_read_plan_from_landmark() {
        let decoded =
            OrderDetails::from_columns("subscription", "apartment", None, Some("healthy")).unwrap();
        assert_eq!(
            decoded,
            OrderDetails::Subscription {
                meal_plan: MealPlan::Healthy
            }
        );
    }

    #[test]
    fn unknown_columns_fail_to_decode() {
        assert!(OrderDetails::from_columns("download", "castle", None, None).is_err());
        assert!(OrderDetails::from_columns("rental", "studio", None, None).is_err());
    }

    #[test]
    fn checkout_builds_print_deliver_details() {
        let mut request = checkout("print-deliver");
        request.apartment_type = Some("bungalow".into());
        request.delivery_address = Some("  12 Allen Avenue ".into());
        request.landmark = Some("".into());

        assert_eq!(
            request.details().unwrap(),
            OrderDetails::PrintDeliver {
                apartment_type: ApartmentType::Bungalow,
                delivery_address: "12 Allen Avenue".into(),
                landmark: None,
            }
        );
    }

    #[test]
    fn checkout_requires_variant_fields() {
        assert!(matches!(
            checkout("subscription").details(),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            checkout("download").details(),
            Err(AppError::Validation(_))
        ));

        let mut request = checkout("print-deliver");
        request.apartment_type = Some("studio".into());
        assert!(matches!(request.details(), Err(AppError::Validation(_))));
    }

    #[test]
    fn checkout_splits_joined_preferences() {
        let mut request = checkout("download");
        request.apartment_type = Some(INFANT_RECIPE.into());
        request.preferences = vec!["egg-free, nut-free".into(), " ".into()];

        assert_eq!(
            request.details().unwrap(),
            OrderDetails::InfantRecipe {
                preferences: vec!["egg-free".into(), "nut-free".into()]
            }
        );
    }

    #[test]
    fn status_round_trips_through_text() {
        assert_eq!("failed".parse::<OrderStatus>().unwrap(), OrderStatus::Failed);
        assert!("refunded".parse::<OrderStatus>().is_err());
        assert!(!OrderStatus::Pending.is_terminal());
    }

    #[test]
    fn details_serialize_with_camel_case_fields() {
        let details = OrderDetails::PrintDeliver {
            apartment_type: ApartmentType::DuplexTerrace,
            delivery_address: "1 Marina".into(),
            landmark: None,
        };

        assert_eq!(
            serde_json::to_value(&details).unwrap(),
            serde_json::json!({
                "kind": "print-deliver",
                "apartmentType": "duplex-terrace",
                "deliveryAddress": "1 Marina",
                "landmark": null
            })
        );
    }
}
