//! Shared application state handed to every handler.

use std::sync::Arc;

use crate::config::Config;
use crate::db::Store;
use crate::services::content::ContentCatalog;
use crate::services::paystack::PaymentGateway;
use crate::services::views::ViewInvalidator;

/// Cheap to clone: every field is a shared handle.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub views: Arc<dyn ViewInvalidator>,
    pub catalog: Arc<ContentCatalog>,
    pub config: Arc<Config>,
}
