mod config;
mod cpu;
mod device_driver;
mod error;
mod file_system;
mod instruction;
mod interrupt;
mod keyboard;
mod long_term_scheduler;
mod memory;
mod memory_manager;
mod os;
mod process_control_block;
mod schedule;
mod short_term_scheduler;

pub mod driver;

pub use config::KernelConfig;
pub use driver::Driver;
pub use process_control_block::{ProcessControlBlock, Registers};
pub use schedule::ScheduleKind;
