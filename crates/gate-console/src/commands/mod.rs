mod queue;
mod transport;

pub(crate) use queue::{CommandCompletion, CommandQueue};
pub(crate) use transport::{CommandTransport, HttpCommandTransport};

#[cfg(test)]
pub(crate) use queue::tests::{connected_queue, HeldTransport};
