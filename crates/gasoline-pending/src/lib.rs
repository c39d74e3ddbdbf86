mod commands;
mod registry;

pub use commands::CommandQueue;
pub use commands::CommandRequest;
pub use commands::EnqueueError;
pub use commands::ExtensionState;
pub use commands::ExtensionStateCache;
pub use registry::DeliveredOutcome;
pub use registry::PendingQueryView;
pub use registry::Registry;
pub use registry::Status;
pub use registry::WaitResult;
pub use registry::wait;
