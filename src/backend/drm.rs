//! Kernel DRM backend: raw `DRM_IOCTL_MODE_*` calls against `/dev/dri/cardN`.
//!
//! Deliberately bypasses the high-level `drm` crate in favor of hand-rolled
//! ioctl structs, mirroring the kernel's own `drm_mode.h` ABI. The three
//! struct sizes below are fixed by that ABI and are compile-time asserted so
//! a layout mistake fails to build rather than corrupting a syscall.

use std::fs::{File, OpenOptions};
use std::os::fd::AsRawFd;
use std::os::unix::fs::OpenOptionsExt;

use nix::ioctl_readwrite;
use static_assertions::assert_eq_size;

use super::GammaBackend;
use crate::colorramp::{GammaRamps, build_gamma_ramps};
use crate::error::AbraxasError;

const DRM_IOCTL_BASE: u8 = b'd';
const DRM_IOCTL_MODE_GETRESOURCES: u8 = 0xA0;
const DRM_IOCTL_MODE_GETCRTC: u8 = 0xA1;
const DRM_IOCTL_MODE_SETCRTC: u8 = 0xA2;
const DRM_IOCTL_MODE_GETGAMMA: u8 = 0xA4;
const DRM_IOCTL_MODE_SETGAMMA: u8 = 0xA5;

#[repr(C)]
#[derive(Debug, Default)]
struct DrmModeCardRes {
    fb_id_ptr: u64,
    crtc_id_ptr: u64,
    connector_id_ptr: u64,
    encoder_id_ptr: u64,
    count_fbs: u32,
    count_crtcs: u32,
    count_connectors: u32,
    count_encoders: u32,
    min_width: u32,
    max_width: u32,
    min_height: u32,
    max_height: u32,
}
assert_eq_size!(DrmModeCardRes, [u8; 64]);

#[repr(C)]
#[derive(Debug, Default)]
struct DrmModeCrtc {
    set_connectors_ptr: u64,
    count_connectors: u32,
    crtc_id: u32,
    fb_id: u32,
    x: u32,
    y: u32,
    gamma_size: u32,
    mode_valid: u32,
    mode: [u8; 68], // struct drm_mode_modeinfo
}
assert_eq_size!(DrmModeCrtc, [u8; 104]);

#[repr(C)]
#[derive(Debug, Default)]
struct DrmModeCrtcLut {
    crtc_id: u32,
    gamma_size: u32,
    red: u64,
    green: u64,
    blue: u64,
}
assert_eq_size!(DrmModeCrtcLut, [u8; 32]);

ioctl_readwrite!(mode_getresources, DRM_IOCTL_BASE, DRM_IOCTL_MODE_GETRESOURCES, DrmModeCardRes);
ioctl_readwrite!(mode_getcrtc, DRM_IOCTL_BASE, DRM_IOCTL_MODE_GETCRTC, DrmModeCrtc);
ioctl_readwrite!(mode_setcrtc, DRM_IOCTL_BASE, DRM_IOCTL_MODE_SETCRTC, DrmModeCrtc);
ioctl_readwrite!(mode_getgamma, DRM_IOCTL_BASE, DRM_IOCTL_MODE_GETGAMMA, DrmModeCrtcLut);
ioctl_readwrite!(mode_setgamma, DRM_IOCTL_BASE, DRM_IOCTL_MODE_SETGAMMA, DrmModeCrtcLut);

struct Crtc {
    id: u32,
    gamma_size: u32,
    saved: GammaRamps,
}

pub struct DrmBackend {
    card: File,
    crtcs: Vec<Crtc>,
}

impl DrmBackend {
    /// Opens `/dev/dri/card0` and walks the two-step `MODE_GETRESOURCES`
    /// handshake the kernel ABI mandates: first call learns the counts,
    /// second call (with user-pointer buffers filled in) returns the IDs.
    pub fn init() -> Result<Self, AbraxasError> {
        Self::open_card(0)
    }

    fn open_card(card_num: u32) -> Result<Self, AbraxasError> {
        let path = format!("/dev/dri/card{card_num}");
        let card = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_CLOEXEC)
            .open(&path)
            .map_err(|e| match e.raw_os_error() {
                Some(libc::EACCES) => AbraxasError::BackendInit("permission".into()),
                _ => AbraxasError::BackendInit("open failed".into()),
            })?;
        let fd = card.as_raw_fd();

        let mut res = DrmModeCardRes::default();
        unsafe { mode_getresources(fd, &mut res) }
            .map_err(|e| AbraxasError::BackendInit(format!("GETRESOURCES: {e}")))?;

        if res.count_crtcs == 0 {
            return Err(AbraxasError::NoCrtc);
        }

        let mut crtc_ids = vec![0u32; res.count_crtcs as usize];
        res.crtc_id_ptr = crtc_ids.as_mut_ptr() as u64;
        unsafe { mode_getresources(fd, &mut res) }
            .map_err(|e| AbraxasError::BackendInit(format!("GETRESOURCES: {e}")))?;

        let mut crtcs = Vec::new();
        for &crtc_id in &crtc_ids {
            let mut info = DrmModeCrtc { crtc_id, ..Default::default() };
            if unsafe { mode_getcrtc(fd, &mut info) }.is_err() {
                continue;
            }
            if info.gamma_size <= 1 {
                continue;
            }

            let mut lut = DrmModeCrtcLut { crtc_id, gamma_size: info.gamma_size, ..Default::default() };
            let mut r = vec![0u16; info.gamma_size as usize];
            let mut g = vec![0u16; info.gamma_size as usize];
            let mut b = vec![0u16; info.gamma_size as usize];
            lut.red = r.as_mut_ptr() as u64;
            lut.green = g.as_mut_ptr() as u64;
            lut.blue = b.as_mut_ptr() as u64;
            if unsafe { mode_getgamma(fd, &mut lut) }.is_err() {
                continue;
            }

            crtcs.push(Crtc {
                id: crtc_id,
                gamma_size: info.gamma_size,
                saved: GammaRamps { r, g, b },
            });
        }

        if crtcs.is_empty() {
            return Err(AbraxasError::NoCrtc);
        }

        Ok(Self { card, crtcs })
    }

    fn write_ramps(&self, crtc: &Crtc, ramps: &GammaRamps) -> std::io::Result<()> {
        let fd = self.card.as_raw_fd();
        let mut lut = DrmModeCrtcLut { crtc_id: crtc.id, gamma_size: crtc.gamma_size, ..Default::default() };
        lut.red = ramps.r.as_ptr() as u64;
        lut.green = ramps.g.as_ptr() as u64;
        lut.blue = ramps.b.as_ptr() as u64;
        unsafe { mode_setgamma(fd, &mut lut) }.map(|_| ()).map_err(std::io::Error::from)
    }
}

impl GammaBackend for DrmBackend {
    fn crtc_count(&self) -> usize {
        self.crtcs.len()
    }

    fn gamma_size(&self, index: usize) -> usize {
        self.crtcs.get(index).map(|c| c.gamma_size as usize).unwrap_or(0)
    }

    fn set_temperature(&mut self, temp: u32, beta: f64) -> Result<(), AbraxasError> {
        let mut any_ok = false;
        for crtc in &self.crtcs {
            let ramps = build_gamma_ramps(temp, beta, crtc.gamma_size as usize);
            if self.write_ramps(crtc, &ramps).is_ok() {
                any_ok = true;
            }
        }
        if any_ok { Ok(()) } else { Err(AbraxasError::NoCrtc) }
    }

    fn set_temperature_crtc(&mut self, index: usize, temp: u32, beta: f64) -> Result<(), AbraxasError> {
        let Some(crtc) = self.crtcs.get(index) else {
            return Err(AbraxasError::NoCrtc);
        };
        let ramps = build_gamma_ramps(temp, beta, crtc.gamma_size as usize);
        self.write_ramps(crtc, &ramps).map_err(|e| AbraxasError::BackendInit(e.to_string()))
    }

    fn restore(&mut self) -> Result<(), AbraxasError> {
        let mut any_ok = false;
        for crtc in &self.crtcs {
            let saved = crtc.saved.clone();
            if self.write_ramps(crtc, &saved).is_ok() {
                any_ok = true;
            }
        }
        if any_ok { Ok(()) } else { Err(AbraxasError::NoCrtc) }
    }

    fn free(&mut self) {
        let _ = self.restore();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ioctl_struct_sizes_match_kernel_abi() {
        assert_eq!(std::mem::size_of::<DrmModeCardRes>(), 64);
        assert_eq!(std::mem::size_of::<DrmModeCrtc>(), 104);
        assert_eq!(std::mem::size_of::<DrmModeCrtcLut>(), 32);
    }
}
