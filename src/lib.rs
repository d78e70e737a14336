// -- Lint policy ---------------------------------------------------------
// This is the single source of truth for crate-wide lints.

// Broad lint groups
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![deny(clippy::nursery)]
// Documentation
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]
#![deny(rustdoc::bare_urls)]
// No panicking in library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
// No debug/print artifacts
#![deny(clippy::dbg_macro)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
// Import hygiene
#![deny(clippy::wildcard_imports)]
// Complexity limits
#![deny(clippy::cognitive_complexity)]
#![deny(clippy::excessive_nesting)]
// Function signature hygiene
#![deny(clippy::fn_params_excessive_bools)]
// Clone / pass-by-value hygiene
#![deny(clippy::needless_pass_by_value)]
#![deny(clippy::implicit_clone)]
// String hygiene
#![deny(clippy::inefficient_to_string)]
#![deny(clippy::redundant_closure_for_method_calls)]
#![deny(clippy::manual_string_new)]
#![deny(clippy::str_to_string)]
// Cargo lints (warn, not deny since cargo lints can be noisy)
#![warn(clippy::cargo)]
// Unused / redundant code
#![deny(unused_results)]
#![deny(unused_qualifications)]
// Cast hygiene
#![deny(trivial_casts)]
#![deny(trivial_numeric_casts)]

//! Particle simulation and screen-space emission core for GPU dissolve
//! effects, built on wgpu.
//!
//! An object "dissolves" as a threshold sweeps across its surface. The
//! fragments removed during a frame are rendered into an offscreen target,
//! read back to the CPU, and every surviving pixel is unprojected into a
//! world-space particle.
//!
//! # Key entry points
//!
//! - [`particle::ParticlePool`] - fixed-capacity pool with an alive/dead
//!   partition, swap-with-tail removal and back-to-front staging
//! - [`capture::OffscreenCapture`] - color + depth render target with CPU
//!   readback staging buffers
//! - [`emission::EmissionScanner`] - turns a [`capture::CapturedFrame`] into
//!   spawn requests
//! - [`dissolve::DissolveDriver`] - threshold state machine
//! - [`effect::DissolveEffect`] - per-frame orchestration of all of the above
//! - [`options::Options`] - TOML-backed tuning
//!
//! # Frame flow
//!
//! driver advances threshold → scene draws the removed band into the
//! capture → scanner unprojects captured pixels into the pool → pool
//! integrates and prunes → pool stages survivors farthest-first for an
//! instanced draw.

pub mod camera;
pub mod capture;
pub mod dissolve;
pub mod effect;
pub mod emission;
pub mod error;
pub mod gpu;
pub mod options;
pub mod particle;
pub mod util;
