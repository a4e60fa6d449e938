//! X11/RandR backend, grounded on reddish-shift's `gamma_randr.rs` but
//! built directly against `x11rb`'s generated RandR protocol bindings
//! rather than a higher wrapper crate. `x11rb` speaks the X11 wire
//! protocol itself, so nothing here links `libX11`/`libXrandr` — the
//! daemon only pulls this module in when the dispatcher actually probes
//! X11, keeping Wayland/DRM sessions free of any X11 dependency.

use x11rb::connection::Connection as _;
use x11rb::protocol::randr::ConnectionExt;
use x11rb::rust_connection::RustConnection;

use super::GammaBackend;
use crate::colorramp::build_gamma_ramps;
use crate::error::AbraxasError;

struct Crtc {
    id: u32,
    ramp_size: u16,
    saved_r: Vec<u16>,
    saved_g: Vec<u16>,
    saved_b: Vec<u16>,
}

pub struct X11Backend {
    conn: RustConnection,
    crtcs: Vec<Crtc>,
}

impl X11Backend {
    pub fn init() -> Result<Self, AbraxasError> {
        let (conn, screen_num) =
            x11rb::connect(None).map_err(|e| AbraxasError::BackendInit(format!("connect failed: {e}")))?;

        let root = conn.setup().roots[screen_num].root;
        let resources = conn
            .randr_get_screen_resources_current(root)
            .and_then(|c| c.reply())
            .map_err(|e| AbraxasError::BackendInit(format!("get_screen_resources: {e}")))?;

        let mut crtcs = Vec::new();
        for id in resources.crtcs {
            let Ok(size_reply) = conn.randr_get_crtc_gamma_size(id).and_then(|c| c.reply()) else {
                continue;
            };
            if size_reply.size == 0 {
                continue;
            }
            let Ok(ramp_reply) = conn.randr_get_crtc_gamma(id).and_then(|c| c.reply()) else {
                continue;
            };
            crtcs.push(Crtc {
                id,
                ramp_size: size_reply.size,
                saved_r: ramp_reply.red,
                saved_g: ramp_reply.green,
                saved_b: ramp_reply.blue,
            });
        }

        if crtcs.is_empty() {
            return Err(AbraxasError::NoCrtc);
        }

        Ok(Self { conn, crtcs })
    }

    fn write_ramps(&self, crtc: &Crtc, r: &[u16], g: &[u16], b: &[u16]) -> Result<(), AbraxasError> {
        self.conn
            .randr_set_crtc_gamma(crtc.id, r, g, b)
            .and_then(|c| c.check())
            .map_err(|e| AbraxasError::BackendInit(format!("set_crtc_gamma: {e}")))
    }
}

impl GammaBackend for X11Backend {
    fn crtc_count(&self) -> usize {
        self.crtcs.len()
    }

    fn gamma_size(&self, index: usize) -> usize {
        self.crtcs.get(index).map(|c| c.ramp_size as usize).unwrap_or(0)
    }

    fn set_temperature(&mut self, temp: u32, beta: f64) -> Result<(), AbraxasError> {
        let mut any_ok = false;
        for crtc in &self.crtcs {
            let ramps = build_gamma_ramps(temp, beta, crtc.ramp_size as usize);
            if self.write_ramps(crtc, &ramps.r, &ramps.g, &ramps.b).is_ok() {
                any_ok = true;
            }
        }
        let _ = self.conn.flush();
        if any_ok { Ok(()) } else { Err(AbraxasError::NoCrtc) }
    }

    fn set_temperature_crtc(&mut self, index: usize, temp: u32, beta: f64) -> Result<(), AbraxasError> {
        let Some(crtc) = self.crtcs.get(index) else {
            return Err(AbraxasError::NoCrtc);
        };
        let ramps = build_gamma_ramps(temp, beta, crtc.ramp_size as usize);
        let result = self.write_ramps(crtc, &ramps.r, &ramps.g, &ramps.b);
        let _ = self.conn.flush();
        result
    }

    fn restore(&mut self) -> Result<(), AbraxasError> {
        let mut any_ok = false;
        for crtc in &self.crtcs {
            if self.write_ramps(crtc, &crtc.saved_r, &crtc.saved_g, &crtc.saved_b).is_ok() {
                any_ok = true;
            }
        }
        let _ = self.conn.flush();
        if any_ok { Ok(()) } else { Err(AbraxasError::NoCrtc) }
    }

    fn free(&mut self) {
        let _ = self.restore();
    }
}
