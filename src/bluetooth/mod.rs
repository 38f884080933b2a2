pub mod registry;
pub mod scanner;

pub use registry::PeripheralRegistry;
pub use scanner::scan_for_peripherals;
