// OS counter acquisition
pub mod collector;
pub mod gpu;
pub mod source;

pub use collector::{describe_host, SystemCounterSource};
pub use gpu::NvidiaGpu;
pub use source::{CounterSource, PollRequest, ProcessCounters, RawTick, SystemCounters};
