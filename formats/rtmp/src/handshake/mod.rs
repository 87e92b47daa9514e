pub mod consts;
pub mod errors;
pub mod server;

/// +-------------+                +-------------+
/// |    Client   | TCP/IP Network |    Server   |
/// +-------------+       |        +-------------+
///        |              |               |
///  Uninitialized        |         Uninitialized
///        |      C0      |               |
///        |------------->|        C0     |
///        |              |-------------->|
///        |      C1      |               |
///        |------------->|        S0     |
///        |              |<--------------|
///        |              |     S1 S2     |
///        |              |<--------------|
///        |      C2      |               |
///        |------------->|               |
///   Handshake Done      |          Handshake Done
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeServerState {
    Uninitialized,
    C0C1Received,
    S0S1S2Sent,
    Done,
}
