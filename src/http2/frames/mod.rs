//! Per-frame-type control handlers dispatched from [`crate::http2::Session::run`].

pub mod goaway;
pub mod priority;
pub mod settings;
pub mod window_update;
