pub mod accumulator;
pub mod cancel;
pub mod detector;
pub mod error;
pub mod gate;
pub mod parser;
pub mod producer;
pub mod session;
pub mod store;
pub mod traits;

pub use accumulator::Accumulator;
pub use cancel::{CancellationHandler, HandlerState};
pub use error::{
    CodecError, Error, ParseError, ProducerError, RegistryError, Result, StoreError,
};
pub use gate::WaitGate;
pub use producer::CommandProducer;
pub use session::{PollOutcome, PollState, Session, SessionConfig, SnapshotOutcome, SnapshotTask};
pub use store::{AppendStore, CodecRegistry, CodecRegistryBuilder, FlushReport};
pub use traits::{Codec, SnapshotProducer};
