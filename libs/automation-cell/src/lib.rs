pub mod models;
pub mod services;
pub mod handlers;
pub mod router;

pub use models::*;
pub use services::generation::SlotAutomationService;
pub use services::runner::AutomationRunner;
pub use router::automation_routes;
