//! rf-engine: the render core itself (§4). `AudioChannel`, `ProcessorChain`,
//! `MixGraph`, `MasterStage`, `Transport`, and the `Engine`/`RenderLoop`
//! handle that owns all of them and is driven by `rf-audio`.

mod channel;
mod config;
mod engine;
mod error;
mod master;
mod mixgraph;
mod processor;
mod transport;

pub use channel::AudioChannel;
pub use config::{EngineConfig, FeatureFlags};
pub use engine::{make_push_callback, start_push_driver, BounceRange, Engine, RenderLoop, RenderOutcome};
pub use error::{EngineError, EngineResult};
pub use master::MasterStage;
pub use mixgraph::{GatherOutcome, MixGraph};
pub use processor::{Processor, ProcessorChain, ProcessorSlot};
pub use transport::{Transport, TransportEvent};
