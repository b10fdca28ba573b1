//! Testigo - OpenCL kernel-launch interceptor with verification-ready traces
//!
//! This library is the core of an interposition shim: it reconstructs what a
//! kernel launch means from a stream of stateless host API calls correlated
//! only by opaque handles, and records each launch as a JSON element in a
//! per-run trace directory, alongside a fresh dump of the kernel's source.
//!
//! The physical hooking mechanism is not here. A hooking layer validates the
//! host's raw arguments, supplies a [`forward::Forwarder`] for the genuine
//! calls, and routes everything through one [`intercept::Interceptor`].
//!
//! # Limitations
//!
//! - Single-threaded host assumption; no internal locking.
//! - Object destruction is never observed: the shadow registry is append-only
//!   and handle reuse by the host is an open risk.
//! - Sub-buffers, images, samplers, and kernel enumeration are unsupported
//!   and fatal by design.

pub mod encoder;
pub mod error;
pub mod forward;
pub mod handles;
pub mod intercept;
pub mod registry;
pub mod trace_log;
pub mod tracer;

pub use error::{Result, TraceError};
pub use intercept::Interceptor;
pub use tracer::Tracer;
