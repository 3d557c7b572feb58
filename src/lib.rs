// Core layer - config, errors, civil calendar
pub mod core;

// Features layer - scheduler, supervisor, assistant, rate limiting
pub mod features;

// Transport collaborator and delivery
pub mod transport;

// Event store
pub mod database;

// Application layer
pub mod command_handler;
pub mod router;

pub use crate::core::{Config, ReminderError};
pub use command_handler::CommandHandler;
pub use database::{Database, Event};
pub use features::{ConnectionSupervisor, ReminderScheduler};
pub use router::EventRouter;
pub use transport::{DeliveryGateway, DiscordTransport, InboundEvent, Transport};
