//! Wire types for the tollgate RPC surface and telemetry stream.
//!
//! The module under [`tollgate::v1`] is committed `prost`/`tonic` build
//! output for `proto/tollgate/v1/tollgate.proto`, checked in so builds do
//! not need `protoc`. Regenerate with `tonic-build` when the proto changes.

pub mod conversions;

pub mod tollgate {
    pub mod v1 {
        include!("tollgate.v1.rs");
    }
}
