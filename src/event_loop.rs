//! The daemon's single-threaded loop: one kernel wait per iteration,
//! multiplexing the tick timeout, termination signals, config-directory
//! inotify events, and the weather fetcher's pipe.

use std::os::fd::{AsRawFd, BorrowedFd};
use std::time::Duration;

use chrono::{Datelike, Utc};
use inotify::{Inotify, WatchMask};
use nix::fcntl::{FcntlArg, OFlag, fcntl};
use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
use nix::sys::signal::{SigSet, SigmaskHow, Signal, sigprocmask};
use nix::sys::signalfd::SignalFd;

use crate::backend::Dispatcher;
use crate::common::constants::{
    GAMMA_INIT_RETRY_ATTEMPTS, GAMMA_INIT_RETRY_SPACING_MS, TICK_PERIOD_SECS,
};
use crate::common::utils::{clamp_temp, minutes_between};
use crate::daemon_state::DaemonState;
use crate::error::AbraxasError;
use crate::location::Location;
use crate::override_state::OverrideState;
use crate::paths::Paths;
use crate::sigmoid;
use crate::weather::{self, fetch::WeatherFetcher};
use crate::{ephemeris, pidfile, sandbox};

pub struct EventLoop {
    paths: Paths,
    signal_fd: SignalFd,
    inotify: Inotify,
    dispatcher: Dispatcher,
    state: DaemonState,
    fetcher: WeatherFetcher,
    last_override_issued_at: Option<i64>,
}

impl EventLoop {
    /// Runs setup steps 1-9 in order, then [`Self::run`] until shutdown.
    pub fn start() -> Result<(), AbraxasError> {
        // 1. Block SIGTERM/SIGINT at the process level before anything that
        // could fail, so the user can still kill us mid-startup.
        let mut mask = SigSet::empty();
        mask.add(Signal::SIGTERM);
        mask.add(Signal::SIGINT);
        sigprocmask(SigmaskHow::SIG_BLOCK, Some(&mask), None)
            .map_err(|e| AbraxasError::BackendInit(format!("sigprocmask: {e}")))?;
        let signal_fd = SignalFd::new(&mask).map_err(|e| AbraxasError::BackendInit(format!("signalfd: {e}")))?;

        // 2. Probe the gamma dispatcher, retrying across the login-time window.
        let dispatcher = Self::probe_with_retry(&signal_fd)?;

        let paths = Paths::resolve()?;
        paths.ensure_config_dir().map_err(|e| AbraxasError::BackendInit(e.to_string()))?;

        // 3. Write the PID file.
        pidfile::write(&paths.pid_file).map_err(|e| AbraxasError::Filesystem { path: paths.pid_file.display().to_string(), source: e })?;

        let location = Location::read(&paths.config_ini);
        let weather = weather::cache::read(&paths.weather_cache);
        let mut state = DaemonState::new(location, weather);

        // 4. Apply the computed startup temperature immediately.
        let mut dispatcher = dispatcher;
        let startup_temp = clamp_temp(Self::compute_temperature(&state, &state.weather, None) as i64);
        let _ = dispatcher.set_temperature(startup_temp, 1.0);
        state.applied_temp = Some(startup_temp);

        // 5. inotify watch on the config directory, IN_CLOSE_WRITE only.
        let mut inotify = Inotify::init().map_err(|e| AbraxasError::BackendInit(format!("inotify_init: {e}")))?;
        inotify
            .watches()
            .add(&paths.config_dir, WatchMask::CLOSE_WRITE)
            .map_err(|e| AbraxasError::BackendInit(format!("inotify_add_watch: {e}")))?;
        let fd = inotify.as_raw_fd();
        let flags = fcntl(fd, FcntlArg::F_GETFL).unwrap_or(0);
        let _ = fcntl(fd, FcntlArg::F_SETFL(OFlag::from_bits_truncate(flags) | OFlag::O_NONBLOCK));

        // 6-8. Process hardening, filesystem sandbox, syscall allow-list.
        // Defense-in-depth only: a kernel too old for one of these must not
        // keep the daemon from starting, so failures are logged and ignored
        // rather than propagated.
        if let Err(e) = sandbox::harden_process() {
            log_warning!("process hardening unavailable: {e}");
        }
        if let Err(e) = sandbox::install_filesystem_sandbox(&paths.config_dir) {
            log_warning!("filesystem sandbox unavailable: {e}");
        }
        if let Err(e) = sandbox::install_syscall_filter() {
            log_warning!("syscall filter unavailable: {e}");
        }

        let mut event_loop = EventLoop {
            paths,
            signal_fd,
            inotify,
            dispatcher,
            state,
            fetcher: WeatherFetcher::new(),
            last_override_issued_at: None,
        };

        // 9. Recover any persisted override.
        event_loop.recover_override();

        event_loop.run()
    }

    fn probe_with_retry(signal_fd: &SignalFd) -> Result<Dispatcher, AbraxasError> {
        for attempt in 0..GAMMA_INIT_RETRY_ATTEMPTS {
            if let Ok(dispatcher) = Dispatcher::probe() {
                return Ok(dispatcher);
            }
            if attempt + 1 == GAMMA_INIT_RETRY_ATTEMPTS {
                break;
            }
            std::thread::sleep(Duration::from_millis(GAMMA_INIT_RETRY_SPACING_MS));
            if signalfd_has_pending(signal_fd) {
                return Err(AbraxasError::BackendInit("interrupted during startup".into()));
            }
        }
        Err(AbraxasError::NoCrtc)
    }

    fn recover_override(&mut self) {
        let Some(ov) = OverrideState::read(&self.paths.override_file) else {
            return;
        };
        if !ov.active {
            return;
        }

        let issued_at = chrono::DateTime::<Utc>::from_timestamp(ov.issued_at, 0).unwrap_or_else(Utc::now);
        let elapsed_minutes = (Utc::now() - issued_at).num_minutes();
        if elapsed_minutes >= ov.duration_minutes as i64 {
            let _ = OverrideState::clear(&self.paths.override_file);
            return;
        }

        let mut ov = ov;
        if ov.start_temp == 0 {
            ov.start_temp = self.state.applied_temp.unwrap_or_else(|| {
                Self::compute_temperature(&self.state, &self.state.weather, None)
            });
            let _ = ov.write(&self.paths.override_file);
        }

        let resume_time = sigmoid::next_transition_resume(
            Utc::now(),
            self.state.location.latitude,
            self.state.location.longitude,
            ephemeris::local_utc_offset_hours(),
        );
        self.state.enter_manual_mode(ov.start_temp, &ov, resume_time);
        self.last_override_issued_at = Some(ov.issued_at);
    }

    fn run(&mut self) -> Result<(), AbraxasError> {
        loop {
            let mut fds = vec![
                PollFd::new(self.signal_fd.as_fd(), PollFlags::POLLIN),
                PollFd::new(self.inotify.as_raw_fd_borrowed(), PollFlags::POLLIN),
            ];
            let weather_fd = self.fetcher.pipe_fd();
            if let Some(raw) = weather_fd {
                fds.push(PollFd::new(unsafe { BorrowedFd::borrow_raw(raw) }, PollFlags::POLLIN));
            }

            let timeout = PollTimeout::try_from(TICK_PERIOD_SECS as u16 * 1000).unwrap_or(PollTimeout::MAX);
            let _ = poll(&mut fds, timeout);

            let signal_ready = fds[0].revents().is_some_and(|r| r.contains(PollFlags::POLLIN));
            let inotify_ready = fds[1].revents().is_some_and(|r| r.contains(PollFlags::POLLIN));
            let weather_ready = weather_fd.is_some()
                && fds.get(2).and_then(|f| f.revents()).is_some_and(|r| r.contains(PollFlags::POLLIN));

            if signal_ready && self.signal_fd.read_signal().ok().flatten().is_some() {
                break;
            }

            if inotify_ready {
                self.handle_inotify_events();
            }

            if weather_ready {
                self.handle_weather_poll();
            }

            if self.state.weather.is_stale(Utc::now()) && !self.fetcher.is_in_flight() {
                let _ = self.fetcher.start(self.state.location.latitude, self.state.location.longitude);
            }

            self.tick();
        }

        self.shutdown();
        Ok(())
    }

    fn handle_inotify_events(&mut self) {
        let mut buffer = [0u8; 4096];
        let Ok(events) = self.inotify.read_events(&mut buffer) else {
            return;
        };
        let mut config_changed = false;
        let mut override_changed = false;
        let mut weather_changed = false;
        for event in events {
            let Some(name) = event.name else { continue };
            match name.to_string_lossy().as_ref() {
                "config.ini" => config_changed = true,
                "override.json" => override_changed = true,
                "weather_cache.json" => weather_changed = true,
                _ => {}
            }
        }

        if config_changed {
            let location = Location::read(&self.paths.config_ini);
            if location.valid {
                self.state.location = location;
            }
            self.state.weather = weather::cache::read(&self.paths.weather_cache);
        }

        if weather_changed && !config_changed {
            self.state.weather = weather::cache::read(&self.paths.weather_cache);
        }

        if override_changed {
            self.apply_override_change();
        }
    }

    fn apply_override_change(&mut self) {
        match OverrideState::read(&self.paths.override_file) {
            Some(ov) if ov.active => {
                if Some(ov.issued_at) != self.last_override_issued_at {
                    let start_temp = self.state.applied_temp.unwrap_or_else(|| {
                        Self::compute_temperature(&self.state, &self.state.weather, None)
                    });
                    let mut ov = ov;
                    if ov.start_temp == 0 {
                        ov.start_temp = start_temp;
                        let _ = ov.write(&self.paths.override_file);
                    }
                    let resume_time = sigmoid::next_transition_resume(
                        Utc::now(),
                        self.state.location.latitude,
                        self.state.location.longitude,
                        ephemeris::local_utc_offset_hours(),
                    );
                    self.state.enter_manual_mode(ov.start_temp, &ov, resume_time);
                    self.last_override_issued_at = Some(ov.issued_at);
                    log_decorated!(
                        "override: target {} K over {} min (from {} K)",
                        ov.target_temp, ov.duration_minutes, ov.start_temp
                    );
                }
            }
            _ => {
                if self.state.in_manual_mode() {
                    log_decorated!("override cleared; resuming solar mode");
                }
                self.state.exit_manual_mode();
                self.last_override_issued_at = None;
            }
        }
    }

    fn handle_weather_poll(&mut self) {
        use crate::weather::fetch::FetchOutcome;
        match self.fetcher.poll_read() {
            FetchOutcome::Pending | FetchOutcome::Advanced => {}
            FetchOutcome::Done(Ok(data)) => {
                self.state.weather = data;
                let _ = weather::cache::write(&self.paths.weather_cache, &self.state.weather);
            }
            FetchOutcome::Done(Err(_)) => {
                // Leave the previous (possibly stale) cache in place; the
                // next tick retries after the refresh window.
            }
        }
    }

    fn tick(&mut self) {
        if let Some(manual) = self.state.manual
            && Utc::now() >= manual.resume_time
            && minutes_between(manual.start_time, Utc::now()) >= manual.duration_minutes as f64
        {
            self.state.exit_manual_mode();
            self.last_override_issued_at = None;
            let _ = OverrideState::clear(&self.paths.override_file);
            log_decorated!("auto-resume: override window elapsed, resuming solar mode");
        }

        let target = clamp_temp(Self::compute_temperature(&self.state, &self.state.weather, self.state.manual) as i64);
        if self.state.applied_temp != Some(target) {
            if self.dispatcher.set_temperature(target, 1.0).is_ok() {
                self.state.applied_temp = Some(target);
                let mode = if self.state.in_manual_mode() { "manual" } else { "solar" };
                log_decorated!("temperature: {} K ({}, backend: {})", target, mode, self.dispatcher.name());
            }
        }
    }

    fn compute_temperature(
        state: &DaemonState,
        weather: &crate::weather::WeatherData,
        manual: Option<crate::daemon_state::ManualMode>,
    ) -> u32 {
        if let Some(manual) = manual {
            return sigmoid::calculate_manual_temp(
                manual.start_temp,
                manual.target_temp,
                manual.start_time,
                manual.duration_minutes,
                Utc::now(),
            );
        }

        let now = Utc::now();
        let tz_offset = ephemeris::local_utc_offset_hours();
        let sun_times = ephemeris::sunrise_sunset(
            now.date_naive().year(),
            now.date_naive().month(),
            now.date_naive().day(),
            state.location.latitude,
            state.location.longitude,
            tz_offset,
        );
        let (since_sunrise, until_sunset) = sigmoid::minutes_from_sun_events(now, &sun_times);
        let dark = sigmoid::is_dark_mode(weather.cloud_cover);
        sigmoid::calculate_solar_temp(since_sunrise, until_sunset, dark)
    }

    fn shutdown(&mut self) {
        self.fetcher.shutdown();
        let _ = self.dispatcher.restore();
        self.dispatcher.free();
        let _ = pidfile::remove(&self.paths.pid_file);
    }
}

fn signalfd_has_pending(signal_fd: &SignalFd) -> bool {
    let mut fds = [PollFd::new(signal_fd.as_fd(), PollFlags::POLLIN)];
    matches!(poll(&mut fds, PollTimeout::ZERO), Ok(n) if n > 0)
}

trait InotifyRawFdBorrow {
    fn as_raw_fd_borrowed(&self) -> BorrowedFd<'_>;
}

impl InotifyRawFdBorrow for Inotify {
    fn as_raw_fd_borrowed(&self) -> BorrowedFd<'_> {
        unsafe { BorrowedFd::borrow_raw(self.as_raw_fd()) }
    }
}
