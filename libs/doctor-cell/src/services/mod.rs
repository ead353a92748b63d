pub mod availability;
pub mod doctor;
pub mod slot_grid;

pub use availability::AvailabilityService;
pub use doctor::DoctorService;
pub use slot_grid::SlotGrid;
