pub mod consts;
pub mod errors;
pub mod events;
pub mod frame;
pub mod stream_center;
pub mod stream_source;
