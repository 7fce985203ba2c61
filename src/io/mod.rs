pub mod console;
pub mod disk;
pub mod loader;
pub mod monitor;
pub mod program;

pub use console::{BufferedConsole, Console};
pub use disk::{Disk, DiskLocation};
pub use monitor::{LogMonitor, Monitor, NullMonitor};
pub use program::Program;
