//! Scheduler module: per-pass orchestration, slot allocation and timelines.
//!
//! One pass loads a snapshot, orders the backlog, places fixed jobs, then
//! allocates every flexible job on the earliest feasible technician slot.

mod allocator;
mod core;
mod state;
mod timeline;

#[cfg(test)]
mod scenarios;

pub use allocator::{SlotAllocator, SlotOption};
pub use core::DispatchScheduler;
pub use state::{PassResult, PassState};
pub use timeline::{Booking, BookingKind, TechnicianTimeline};
