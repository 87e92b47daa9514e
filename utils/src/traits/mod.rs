pub mod dynamic_sized_packet;
pub mod writer;
