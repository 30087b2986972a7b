// Reservation engine for a car rental company, with its inventory loader and request surface

pub mod car;
pub mod config;
pub mod engine;
pub mod error;
pub mod inventory;
pub mod logging;
pub mod quote;
pub mod script;
pub mod service;

// Re-export key types for convenience
pub use car::{Car, CarType, Period};
pub use config::ServerConfig;
pub use engine::{CarRentalCompany, EngineStatsReport, ReservationEngine};
pub use error::{LoadError, ReservationError};
pub use inventory::Inventory;
pub use quote::{Quote, Reservation, ReservationConstraints};
pub use service::{CompanyRegistry, LocalRentalService, RentalService, ServiceError};
