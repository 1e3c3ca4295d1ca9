pub mod rpc_channel;
pub use rpc_channel::*;

pub mod remote_adapter;
pub use remote_adapter::*;
