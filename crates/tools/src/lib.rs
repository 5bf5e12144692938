//! Built-in tools available to voice agents.

pub mod business;
pub mod registry;

pub use registry::{Tool, ToolRegistry};

/// Build the registry with every built-in tool.
pub fn builtin_registry(pool: sqlx::PgPool) -> ToolRegistry {
    use std::sync::Arc;
    ToolRegistry::new(vec![
        Arc::new(business::CheckOrderStatus::default()),
        Arc::new(business::CheckItemStock::default()),
        Arc::new(business::BookAppointment::new(pool)),
        Arc::new(business::SearchFaq::default()),
        Arc::new(business::GetCustomerProfile::default()),
        Arc::new(business::TriggerHumanHandoff),
    ])
}
