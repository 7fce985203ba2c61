#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DriverStatus {
    Unloaded,
    Loaded,
}

/// A kernel-mode driver. `driver_entry` runs once when the kernel boots;
/// `isr` services one interrupt routed to the device.
pub trait DeviceDriver {
    type Request;
    type Response;

    fn driver_entry(&mut self);

    fn status(&self) -> DriverStatus;

    fn isr(&mut self, request: Self::Request) -> Self::Response;
}
