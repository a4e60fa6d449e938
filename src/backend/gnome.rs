//! GNOME/Mutter backend: `org.gnome.Mutter.DisplayConfig` over the user's
//! session message bus. Grounded on the `#[zbus::proxy]` blocking-connection
//! pattern established for the session's sleep/resume monitor, the one place
//! the daemon already talks D-Bus.
//!
//! Mutter doesn't expose a gamma ramp size, so every CRTC is treated as a
//! 256-entry ramp, and `restore` can't read back a "previous" ramp the way
//! the other three backends do — it writes the linear identity ramp instead.

use std::collections::HashMap;

use zbus::blocking::Connection;
use zbus::zvariant::OwnedValue;

use super::GammaBackend;
use crate::colorramp::build_gamma_ramps;
use crate::common::constants::GNOME_GAMMA_RAMP_SIZE;
use crate::error::AbraxasError;

type CrtcTuple = (u32, i64, i32, i32, i32, i32, i32, u32, Vec<u32>, HashMap<String, OwnedValue>);
type OutputTuple = (u32, i64, i32, Vec<u32>, String, Vec<u32>, Vec<u32>, HashMap<String, OwnedValue>);
type ModeTuple = (u32, i64, u32, u32, f64);

#[zbus::proxy(
    interface = "org.gnome.Mutter.DisplayConfig",
    default_service = "org.gnome.Mutter.DisplayConfig",
    default_path = "/org/gnome/Mutter/DisplayConfig"
)]
trait DisplayConfig {
    #[allow(clippy::type_complexity)]
    fn get_resources(
        &self,
    ) -> zbus::Result<(u32, Vec<CrtcTuple>, Vec<OutputTuple>, Vec<ModeTuple>, i32, i32)>;

    fn set_crtc_gamma(&self, serial: u32, crtc_id: u32, red: &[u16], green: &[u16], blue: &[u16]) -> zbus::Result<()>;
}

pub struct GnomeBackend {
    connection: Connection,
    serial: u32,
    crtc_ids: Vec<u32>,
}

impl GnomeBackend {
    pub fn init() -> Result<Self, AbraxasError> {
        let connection =
            Connection::session().map_err(|e| AbraxasError::BackendInit(format!("session bus: {e}")))?;
        let proxy = DisplayConfigProxyBlocking::new(&connection)
            .map_err(|e| AbraxasError::BackendInit(format!("proxy: {e}")))?;

        let (serial, crtcs, ..) = proxy
            .get_resources()
            .map_err(|e| AbraxasError::BackendInit(format!("GetResources: {e}")))?;
        let crtc_ids: Vec<u32> = crtcs.into_iter().map(|c| c.0).collect();

        if crtc_ids.is_empty() {
            return Err(AbraxasError::NoCrtc);
        }

        Ok(Self { connection, serial, crtc_ids })
    }

    fn write(&self, crtc_id: u32, r: &[u16], g: &[u16], b: &[u16]) -> Result<(), AbraxasError> {
        let proxy = DisplayConfigProxyBlocking::new(&self.connection)
            .map_err(|e| AbraxasError::BackendInit(format!("proxy: {e}")))?;
        proxy
            .set_crtc_gamma(self.serial, crtc_id, r, g, b)
            .map_err(|e| AbraxasError::BackendInit(format!("SetCrtcGamma: {e}")))
    }
}

impl GammaBackend for GnomeBackend {
    fn crtc_count(&self) -> usize {
        self.crtc_ids.len()
    }

    fn gamma_size(&self, index: usize) -> usize {
        if index < self.crtc_ids.len() { GNOME_GAMMA_RAMP_SIZE } else { 0 }
    }

    fn set_temperature(&mut self, temp: u32, beta: f64) -> Result<(), AbraxasError> {
        let ramps = build_gamma_ramps(temp, beta, GNOME_GAMMA_RAMP_SIZE);
        let mut any_ok = false;
        for &id in &self.crtc_ids {
            if self.write(id, &ramps.r, &ramps.g, &ramps.b).is_ok() {
                any_ok = true;
            }
        }
        if any_ok { Ok(()) } else { Err(AbraxasError::NoCrtc) }
    }

    fn set_temperature_crtc(&mut self, index: usize, temp: u32, beta: f64) -> Result<(), AbraxasError> {
        let Some(&id) = self.crtc_ids.get(index) else {
            return Err(AbraxasError::NoCrtc);
        };
        let ramps = build_gamma_ramps(temp, beta, GNOME_GAMMA_RAMP_SIZE);
        self.write(id, &ramps.r, &ramps.g, &ramps.b)
    }

    fn restore(&mut self) -> Result<(), AbraxasError> {
        let denom = (GNOME_GAMMA_RAMP_SIZE - 1) as f64;
        let linear: Vec<u16> = (0..GNOME_GAMMA_RAMP_SIZE)
            .map(|i| ((i as f64 / denom) * 65535.0).round() as u16)
            .collect();
        let mut any_ok = false;
        for &id in &self.crtc_ids {
            if self.write(id, &linear, &linear, &linear).is_ok() {
                any_ok = true;
            }
        }
        if any_ok { Ok(()) } else { Err(AbraxasError::NoCrtc) }
    }

    fn free(&mut self) {
        let _ = self.restore();
    }
}
