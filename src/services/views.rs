//! Invalidation of rendered views that display order or subscription state.
//!
//! Pages are rendered elsewhere; this service only announces which paths
//! became stale so the rendering layer can rebuild them.

/// Admin order list.
pub const ADMIN_ORDERS: &str = "/admin/orders";
/// Customer-facing order list.
pub const ORDERS: &str = "/orders";
/// Subscription download dashboard.
pub const SUBSCRIPTION_DASHBOARD: &str = "/subscription/dashboard";

/// Admin page for a single order.
pub fn admin_order(id: uuid::Uuid) -> String {
    format!("{ADMIN_ORDERS}/{id}")
}

pub trait ViewInvalidator: Send + Sync {
    fn revalidate(&self, path: &str);
}

/// Emits one structured event per stale path.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingInvalidator;

impl ViewInvalidator for TracingInvalidator {
    fn revalidate(&self, path: &str) {
        tracing::info!(target: "views", path, "revalidate");
    }
}

/// Keeps every revalidated path for assertions.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingInvalidator {
    paths: std::sync::Mutex<Vec<String>>,
}

#[cfg(test)]
impl RecordingInvalidator {
    pub fn paths(&self) -> Vec<String> {
        self.paths.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl ViewInvalidator for RecordingInvalidator {
    fn revalidate(&self, path: &str) {
        self.paths.lock().unwrap().push(path.to_string());
    }
}
