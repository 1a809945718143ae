//! Where purchased documents live.
//!
//! Documents are static files in blob storage under `CONTENT_BASE_URL`.

use crate::models::order::{ApartmentType, MealPlan, OrderDetails};

/// Known-good document served when nothing better is available.
///
/// The infant recipe plan is not yet split by preference, so every infant
/// order gets this document.
pub const PLACEHOLDER_PDF: &str =
    "https://www.w3.org/WAI/ER/tests/xhtml/testfiles/resources/pdf/dummy.pdf";

/// A downloadable document and the name offered to the browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub url: String,
    pub file_name: String,
}

#[derive(Debug, Clone)]
pub struct ContentCatalog {
    base_url: String,
}

impl ContentCatalog {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn routine_pdf(&self, apartment_type: ApartmentType) -> String {
        format!("{}/sample-pdf-{}.pdf", self.base_url, apartment_type.as_str())
    }

    pub fn weekly_plan_pdf(&self, week: u8) -> String {
        format!("{}/subscription/week{week}.pdf", self.base_url)
    }

    /// Preview image per week, in week order.
    pub fn week_preview_images(&self) -> Vec<String> {
        (1..=crate::services::schedule::WEEK_COUNT)
            .map(|week| format!("{}/subscription/week{week}-preview.jpeg", self.base_url))
            .collect()
    }

    /// Document for a paid order.
    pub fn order_document(&self, details: &OrderDetails, preferences: &[String]) -> Document {
        match details {
            OrderDetails::Download { apartment_type }
            | OrderDetails::PrintDeliver { apartment_type, .. } => Document {
                url: self.routine_pdf(*apartment_type),
                file_name: format!("Effideli-{}-Routine.pdf", apartment_type.as_str()),
            },
            OrderDetails::InfantRecipe { .. } => {
                tracing::debug!(?preferences, "serving infant recipe plan");
                Document {
                    url: PLACEHOLDER_PDF.to_string(),
                    file_name: "Effideli-Infant-Recipe-Plan.pdf".to_string(),
                }
            }
            OrderDetails::Subscription { meal_plan } => Document {
                url: self.weekly_plan_pdf(1),
                file_name: format!("Effideli-{}-Meal-Plan.pdf", meal_plan_title(*meal_plan)),
            },
        }
    }
}

fn meal_plan_title(plan: MealPlan) -> &'static str {
    match plan {
        MealPlan::General => "General",
        MealPlan::Healthy => "Healthy",
        MealPlan::Both => "Complete",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routine_documents_are_named_by_layout() {
        let catalog = ContentCatalog::new("https://cdn.example.com/");
        let doc = catalog.order_document(
            &OrderDetails::Download {
                apartment_type: ApartmentType::DuplexBalcony,
            },
            &[],
        );
        assert_eq!(doc.url, "https://cdn.example.com/sample-pdf-duplex-balcony.pdf");
        assert_eq!(doc.file_name, "Effideli-duplex-balcony-Routine.pdf");
    }

    #[test]
    fn infant_plan_ignores_preferences() {
        let catalog = ContentCatalog::new("https://cdn.example.com");
        let details = OrderDetails::InfantRecipe {
            preferences: vec!["dairy-free".into()],
        };
        let with = catalog.order_document(&details, &["dairy-free".to_string()]);
        let without = catalog.order_document(&details, &[]);
        assert_eq!(with, without);
        assert_eq!(with.url, PLACEHOLDER_PDF);
    }

    #[test]
    fn one_preview_per_week() {
        let catalog = ContentCatalog::new("https://cdn.example.com");
        let images = catalog.week_preview_images();
        assert_eq!(images.len(), 4);
        assert_eq!(images[3], "https://cdn.example.com/subscription/week4-preview.jpeg");
    }
}
