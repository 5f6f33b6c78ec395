//! Ring buffer, sequencer, sequence barriers, and wait strategies: the
//! ordered event transport the whole pipeline runs on (§4.1, §4.2, §5).

mod barrier;
mod sequence;
mod sequencer;
mod wait_strategy;

pub use barrier::SequenceBarrier;
pub use sequence::{INITIAL_SEQUENCE, Sequence, min_sequence};
pub use sequencer::{Cursored, RingBuffer};
pub use wait_strategy::{
    AlertFlag, AnyWaitStrategy, BlockingWaitStrategy, BusySpinWaitStrategy, WaitStrategy,
    YieldingWaitStrategy,
};
