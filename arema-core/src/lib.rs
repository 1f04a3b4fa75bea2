#[cfg(test)]
#[macro_use]
mod test_macros;

pub mod api;
pub mod batcher;
pub mod clock;
pub mod column_width;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod loader;
pub mod models;
pub mod player;
pub mod services;
pub mod store;
pub mod timer;
pub mod timetable;
pub mod timetable_page;
pub mod tracing_ext;

mod file_util;

#[cfg(test)]
mod test_util;
