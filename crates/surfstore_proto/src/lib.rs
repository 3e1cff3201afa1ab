//! Generated message and service types for the SurfStore RPC surface.
//!
//! The `.proto` definitions in `proto/surfstore.proto` are the source of
//! truth for the wire format; everything in this crate is produced by
//! `tonic_build` at compile time and re-exported under [`surfstore`].

pub mod surfstore {
    tonic::include_proto!("surfstore");
}
