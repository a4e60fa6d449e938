//! Gamma-control backend abstraction.
//!
//! Four independent implementations write color temperature to the display:
//! kernel DRM, X11/RandR, Wayland's `wlr-gamma-control-unstable-v1`, and
//! GNOME/Mutter's `DisplayConfig` D-Bus interface. They are siblings with the
//! same small operation set, so a tagged dispatcher forwards to whichever one
//! probed successfully rather than boxing a trait object per backend.

#[cfg(feature = "drm")]
pub mod drm;
#[cfg(feature = "gnome")]
pub mod gnome;
#[cfg(feature = "wayland")]
pub mod wayland;
#[cfg(feature = "x11")]
pub mod x11;

use crate::error::AbraxasError;

/// Common contract every backend implements over its own CRTC/output handles.
///
/// `set_temperature`/`set_temperature_crtc` apply to usable CRTCs only
/// (`gamma_size > 1`); a call succeeds if at least one CRTC was written.
/// `free` must restore saved ramps before releasing backend resources.
pub trait GammaBackend {
    fn crtc_count(&self) -> usize;

    /// `0` means the CRTC at `index` is unusable and must be skipped.
    fn gamma_size(&self, index: usize) -> usize;

    fn set_temperature(&mut self, temp: u32, beta: f64) -> Result<(), AbraxasError>;

    fn set_temperature_crtc(&mut self, index: usize, temp: u32, beta: f64) -> Result<(), AbraxasError>;

    fn restore(&mut self) -> Result<(), AbraxasError>;

    fn free(&mut self);
}

/// The active backend, selected once at startup by [`Dispatcher::probe`] and
/// held for the daemon's lifetime.
pub enum Dispatcher {
    #[cfg(feature = "drm")]
    Drm(drm::DrmBackend),
    #[cfg(feature = "x11")]
    X11(x11::X11Backend),
    #[cfg(feature = "wayland")]
    Wlr(wayland::WaylandBackend),
    #[cfg(feature = "gnome")]
    Mutter(gnome::GnomeBackend),
}

impl Dispatcher {
    /// Probe in the fixed order the contract specifies and keep the first
    /// backend that reports at least one usable CRTC. Callers retry this
    /// across a startup window rather than failing on the first attempt,
    /// since a compositor's gamma protocol may not be ready instantly.
    ///
    /// 1. `$WAYLAND_DISPLAY` set and non-empty: Wayland/wlr, then GNOME/Mutter.
    /// 2. DRM — opened but with no usable CRTC is treated as a miss, not a hard error.
    /// 3. X11.
    pub fn probe() -> Result<Self, AbraxasError> {
        let on_wayland = std::env::var("WAYLAND_DISPLAY")
            .map(|v| !v.is_empty())
            .unwrap_or(false);

        if on_wayland {
            #[cfg(feature = "wayland")]
            if let Ok(backend) = wayland::WaylandBackend::init()
                && backend.crtc_count() > 0
            {
                return Ok(Dispatcher::Wlr(backend));
            }
            #[cfg(feature = "gnome")]
            if let Ok(backend) = gnome::GnomeBackend::init()
                && backend.crtc_count() > 0
            {
                return Ok(Dispatcher::Mutter(backend));
            }
        }

        #[cfg(feature = "drm")]
        if let Ok(backend) = drm::DrmBackend::init()
            && backend.crtc_count() > 0
        {
            return Ok(Dispatcher::Drm(backend));
        }

        #[cfg(feature = "x11")]
        if let Ok(backend) = x11::X11Backend::init()
            && backend.crtc_count() > 0
        {
            return Ok(Dispatcher::X11(backend));
        }

        Err(AbraxasError::NoCrtc)
    }

    /// User-visible short name for the active backend, used by `abraxas status`.
    pub fn name(&self) -> &'static str {
        match self {
            #[cfg(feature = "drm")]
            Dispatcher::Drm(_) => "drm",
            #[cfg(feature = "x11")]
            Dispatcher::X11(_) => "x11",
            #[cfg(feature = "wayland")]
            Dispatcher::Wlr(_) => "wayland",
            #[cfg(feature = "gnome")]
            Dispatcher::Mutter(_) => "gnome",
        }
    }

    pub fn set_temperature(&mut self, temp: u32, beta: f64) -> Result<(), AbraxasError> {
        match self {
            #[cfg(feature = "drm")]
            Dispatcher::Drm(b) => b.set_temperature(temp, beta),
            #[cfg(feature = "x11")]
            Dispatcher::X11(b) => b.set_temperature(temp, beta),
            #[cfg(feature = "wayland")]
            Dispatcher::Wlr(b) => b.set_temperature(temp, beta),
            #[cfg(feature = "gnome")]
            Dispatcher::Mutter(b) => b.set_temperature(temp, beta),
        }
    }

    pub fn restore(&mut self) -> Result<(), AbraxasError> {
        match self {
            #[cfg(feature = "drm")]
            Dispatcher::Drm(b) => b.restore(),
            #[cfg(feature = "x11")]
            Dispatcher::X11(b) => b.restore(),
            #[cfg(feature = "wayland")]
            Dispatcher::Wlr(b) => b.restore(),
            #[cfg(feature = "gnome")]
            Dispatcher::Mutter(b) => b.restore(),
        }
    }

    pub fn free(&mut self) {
        match self {
            #[cfg(feature = "drm")]
            Dispatcher::Drm(b) => b.free(),
            #[cfg(feature = "x11")]
            Dispatcher::X11(b) => b.free(),
            #[cfg(feature = "wayland")]
            Dispatcher::Wlr(b) => b.free(),
            #[cfg(feature = "gnome")]
            Dispatcher::Mutter(b) => b.free(),
        }
    }
}
