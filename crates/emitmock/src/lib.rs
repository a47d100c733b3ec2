//! Mock traffic generator for a telemetry-ingestion service.
//!
//! emitmock opens one channel per producer and streams a header, optional
//! metadata and a body per payload on each, while draining whatever the
//! service sends back. The first transport fault anywhere ends the session.
//!
//! # Crate Structure
//!
//! - [`frame`]: Message model, ordering rules and the stream wire codec
//! - [`transport`]: Channel and session capabilities (memory, TCP, Unix sockets)
//! - [`session`]: Duplex pumps, producers and the session coordinator

/// Re-export frame types.
pub mod frame {
    pub use emitmock_frame::*;
}

/// Re-export transport types.
pub mod transport {
    pub use emitmock_transport::*;
}

/// Re-export session types.
pub mod session {
    pub use emitmock_session::*;
}
