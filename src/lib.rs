//! # abraxas
//!
//! A solar-position color temperature daemon: smoothly sets the display's
//! gamma ramps as a function of the sun's elevation, optionally attenuated
//! by cached cloud cover, with a user-initiated manual override that also
//! transitions smoothly.
//!
//! One long-running process (`abraxasd --daemon`) owns the screen's gamma
//! ramps; short-lived invocations of the same binary talk to it through
//! files in `${HOME}/.config/abraxas/`.
//!
//! ## Architecture
//!
//! - **ephemeris**: NOAA/Meeus sunrise/sunset and sun-elevation arithmetic.
//! - **sigmoid**: the dawn/dusk/manual transition curve and auto-resume scheduling.
//! - **colorramp**: blackbody-to-RGB gamma ramp generation.
//! - **backend**: the four gamma-control backends (DRM, X11, Wayland, GNOME)
//!   and the dispatcher that probes and selects among them.
//! - **location** / **override_state** / **weather::cache** / **pidfile** /
//!   **zipcode**: the small on-disk persistence formats.
//! - **weather::fetch**: the async, non-blocking NOAA weather fetcher.
//! - **sandbox**: post-init process hardening (landlock, seccomp, prctl).
//! - **event_loop**: the daemon's single-threaded kernel-multiplexed loop.
//! - **args** / **commands**: the CLI surface and its daemon coupling.

#[macro_use]
pub mod logger;

pub mod args;
pub mod backend;
pub mod colorramp;
pub mod commands;
pub mod common;
pub mod daemon_state;
pub mod ephemeris;
pub mod error;
pub mod event_loop;
pub mod location;
pub mod override_state;
pub mod paths;
pub mod pidfile;
pub mod sandbox;
pub mod sigmoid;
pub mod weather;
pub mod zipcode;

pub use error::AbraxasError;
