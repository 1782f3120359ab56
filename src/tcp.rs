//! TCP transport machinery: sequence-number arithmetic, the stream
//! reassembler, and the sender/receiver state machines.

pub mod reassembler;
pub mod receiver;
pub mod segment;
pub mod sender;
pub mod sequence;
