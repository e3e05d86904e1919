//! Sample acquisition buffer
//!
//! Every mode reads its samples from one interrupt-fed ring buffer. See
//! [`SampleBuffer`] for the cursor and lap-count contract.

mod ring;

pub use ring::{Buffer, SampleBuffer, BUFFER_MARGIN, BUFFER_SIZE, FLUSH_PASSES};
