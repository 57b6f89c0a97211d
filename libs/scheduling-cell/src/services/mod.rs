pub mod calendar;
pub mod cancellation;
pub mod conflict;
pub mod engine;
pub mod schedule;
