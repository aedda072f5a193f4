pub mod booking;
pub mod conflict;
pub mod slots;

pub use booking::BookingService;
pub use conflict::ConflictDetectionService;
pub use slots::{SlotSchedule, SlotService};
