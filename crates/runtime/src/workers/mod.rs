//! Background tasks that back the runtime orchestration.
//!
//! The tick worker drives [`crate::PickupRuntime::on_tick`] on a fixed period,
//! while rule reloads run as short-lived tasks so file I/O never stalls a tick.

mod reload;
mod ticker;

pub(crate) use reload::reload_filters;
pub use ticker::{TickLoop, TickWorker};
