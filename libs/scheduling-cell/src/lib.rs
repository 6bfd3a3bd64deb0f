pub mod models;
pub mod error;
pub mod services;
pub mod handlers;
pub mod router;

pub use models::*;
pub use error::*;
pub use services::calendar::WorkingDayCalendarService;
pub use services::generator::generate_slots;
pub use services::slots::DailySlotStoreService;
pub use router::{slot_routes, working_day_routes};
