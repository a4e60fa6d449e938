//! Async external-process weather fetcher.
//!
//! Two HTTPS GETs against the NOAA weather API, performed by an external
//! fetcher binary (`curl`) found on `PATH` rather than a linked HTTP/TLS
//! library — this keeps the daemon's post-init syscall filter minimal
//! (spec §9, "External HTTP fetcher"). The fetcher's stdout pipe is
//! non-blocking and drained from the event loop; the daemon never blocks
//! waiting on it.

use std::io::Read;
use std::os::fd::{AsRawFd, RawFd};
use std::process::{Child, Command, Stdio};

use nix::fcntl::{FcntlArg, OFlag, fcntl};
use nix::sys::signal::{self, Signal};
use nix::sys::wait::{WaitPidFlag, waitpid};
use nix::unistd::Pid;

use super::WeatherData;
use crate::common::constants::WEATHER_FETCH_TIMEOUT_SECS;

const USER_AGENT: &str = "abraxasd/0.1 (+https://github.com/psi4j/abraxas)";
const API_HOST: &str = "https://api.weather.gov";

/// Ordered, case-insensitive keyword table mapping a short forecast string
/// to a cloud-cover percentage. Order matters: more specific phrases must be
/// checked before the substrings they contain.
const CLOUD_KEYWORDS: &[(&[&str], u32)] = &[
    (&["rain", "storm", "snow", "drizzle", "showers"], 95),
    (&["overcast"], 90),
    (&["mostly cloudy"], 75),
    (&["cloudy"], 90),
    (&["partly"], 50),
    (&["mostly sunny", "mostly clear"], 25),
    (&["sunny", "clear"], 10),
];

pub fn cloud_cover_from_short_forecast(short_forecast: &str) -> u32 {
    let lower = short_forecast.to_ascii_lowercase();
    for (keywords, pct) in CLOUD_KEYWORDS {
        if keywords.iter().any(|kw| lower.contains(kw)) {
            return *pct;
        }
    }
    0
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    Idle,
    ReadingPoints,
    ReadingForecast,
}

pub enum FetchOutcome {
    /// Pipe had no data yet (`EAGAIN`); state unchanged.
    Pending,
    /// First leg finished; a new pipe fd is now in flight.
    Advanced,
    /// Terminal: either weather data or a failure description.
    Done(Result<WeatherData, String>),
}

pub struct WeatherFetcher {
    phase: Phase,
    child: Option<Child>,
    buffer: Vec<u8>,
    lat: f64,
    lon: f64,
}

impl WeatherFetcher {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            child: None,
            buffer: Vec::new(),
            lat: 0.0,
            lon: 0.0,
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.phase != Phase::Idle
    }

    /// Current fetch's readable fd, if a fetch is in flight.
    pub fn pipe_fd(&self) -> Option<RawFd> {
        self.child.as_ref().and_then(|c| c.stdout.as_ref()).map(|s| s.as_raw_fd())
    }

    /// Begin the two-step fetch: `points/{lat},{lon}` first.
    pub fn start(&mut self, lat: f64, lon: f64) -> std::io::Result<()> {
        self.lat = lat;
        self.lon = lon;
        let url = format!("{API_HOST}/points/{lat},{lon}");
        self.spawn(&url)?;
        self.phase = Phase::ReadingPoints;
        Ok(())
    }

    fn spawn(&mut self, url: &str) -> std::io::Result<()> {
        let mut cmd = Command::new("curl");
        cmd.arg("-s")
            .arg("-L")
            .arg("--max-time")
            .arg(WEATHER_FETCH_TIMEOUT_SECS.to_string())
            .arg("-A")
            .arg(USER_AGENT)
            .arg("-H")
            .arg("Accept: application/geo+json")
            .arg(url)
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .stdin(Stdio::null());

        let child = cmd.spawn()?;
        if let Some(stdout) = &child.stdout {
            let fd = stdout.as_raw_fd();
            let flags = fcntl(fd, FcntlArg::F_GETFL).unwrap_or(0);
            let _ = fcntl(
                fd,
                FcntlArg::F_SETFL(OFlag::from_bits_truncate(flags) | OFlag::O_NONBLOCK),
            );
        }
        self.buffer.clear();
        self.child = Some(child);
        Ok(())
    }

    /// Drain whatever is currently available on the pipe. Call when the
    /// event loop reports the pipe fd readable.
    pub fn poll_read(&mut self) -> FetchOutcome {
        let Some(child) = &mut self.child else {
            return FetchOutcome::Done(Err("no fetch in flight".into()));
        };
        let Some(stdout) = &mut child.stdout else {
            return FetchOutcome::Done(Err("fetcher has no stdout".into()));
        };

        let mut chunk = [0u8; 4096];
        loop {
            match stdout.read(&mut chunk) {
                Ok(0) => break, // EOF
                Ok(n) => self.buffer.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    return FetchOutcome::Pending;
                }
                Err(e) => return FetchOutcome::Done(Err(format!("read failed: {e}"))),
            }
        }

        // EOF observed: reap the child.
        let pid = Pid::from_raw(child.id() as i32);
        let status = waitpid(pid, Some(WaitPidFlag::empty()));
        self.child = None;
        let body = std::mem::take(&mut self.buffer);

        let exited_ok = matches!(
            status,
            Ok(nix::sys::wait::WaitStatus::Exited(_, 0))
        );
        if !exited_ok || body.is_empty() {
            self.phase = Phase::Idle;
            return FetchOutcome::Done(Err("fetcher process failed or returned empty body".into()));
        }

        match self.phase {
            Phase::ReadingPoints => self.advance_to_forecast(&body),
            Phase::ReadingForecast => {
                self.phase = Phase::Idle;
                FetchOutcome::Done(parse_forecast(&body))
            }
            Phase::Idle => FetchOutcome::Done(Err("no fetch in flight".into())),
        }
    }

    fn advance_to_forecast(&mut self, points_body: &[u8]) -> FetchOutcome {
        let Ok(text) = std::str::from_utf8(points_body) else {
            self.phase = Phase::Idle;
            return FetchOutcome::Done(Err("points response was not UTF-8".into()));
        };
        let Ok(json) = serde_json::from_str::<serde_json::Value>(text) else {
            self.phase = Phase::Idle;
            return FetchOutcome::Done(Err("points response was not valid JSON".into()));
        };
        let Some(forecast_url) = json
            .get("properties")
            .and_then(|p| p.get("forecastHourly"))
            .and_then(|u| u.as_str())
        else {
            self.phase = Phase::Idle;
            return FetchOutcome::Done(Err("points response missing forecastHourly".into()));
        };

        match self.spawn(forecast_url) {
            Ok(()) => {
                self.phase = Phase::ReadingForecast;
                FetchOutcome::Advanced
            }
            Err(e) => {
                self.phase = Phase::Idle;
                FetchOutcome::Done(Err(format!("failed to spawn forecast fetch: {e}")))
            }
        }
    }

    /// Kill and reap any in-flight fetch. Called on shutdown.
    pub fn shutdown(&mut self) {
        if let Some(mut child) = self.child.take() {
            let pid = Pid::from_raw(child.id() as i32);
            let _ = signal::kill(pid, Signal::SIGKILL);
            let _ = waitpid(pid, Some(WaitPidFlag::empty()));
            let _ = child.wait();
        }
        self.buffer.clear();
        self.phase = Phase::Idle;
    }
}

impl Default for WeatherFetcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Synchronous two-step fetch for the `--refresh` CLI command. The daemon
/// never calls this — its own fetch is always driven through
/// [`WeatherFetcher::poll_read`] so the event loop never blocks.
pub fn fetch_sync(lat: f64, lon: f64) -> Result<WeatherData, String> {
    let points_url = format!("{API_HOST}/points/{lat},{lon}");
    let points_body = curl_blocking(&points_url)?;

    let points_json: serde_json::Value = serde_json::from_str(
        std::str::from_utf8(&points_body).map_err(|_| "points response was not UTF-8")?,
    )
    .map_err(|_| "points response was not valid JSON")?;
    let forecast_url = points_json
        .get("properties")
        .and_then(|p| p.get("forecastHourly"))
        .and_then(|u| u.as_str())
        .ok_or("points response missing forecastHourly")?;

    let forecast_body = curl_blocking(forecast_url)?;
    parse_forecast(&forecast_body)
}

fn curl_blocking(url: &str) -> Result<Vec<u8>, String> {
    let output = Command::new("curl")
        .arg("-s")
        .arg("-L")
        .arg("--max-time")
        .arg(WEATHER_FETCH_TIMEOUT_SECS.to_string())
        .arg("-A")
        .arg(USER_AGENT)
        .arg("-H")
        .arg("Accept: application/geo+json")
        .arg(url)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| format!("failed to spawn fetcher: {e}"))?;

    if !output.status.success() || output.stdout.is_empty() {
        return Err("fetcher process failed or returned empty body".into());
    }
    Ok(output.stdout)
}

fn parse_forecast(body: &[u8]) -> Result<WeatherData, String> {
    let text = std::str::from_utf8(body).map_err(|_| "forecast response was not UTF-8")?;
    let json: serde_json::Value =
        serde_json::from_str(text).map_err(|_| "forecast response was not valid JSON")?;
    let period = json
        .get("properties")
        .and_then(|p| p.get("periods"))
        .and_then(|periods| periods.get(0))
        .ok_or("forecast response missing periods[0]")?;

    let short_forecast = period
        .get("shortForecast")
        .and_then(|s| s.as_str())
        .unwrap_or_default();
    let temperature_f = period.get("temperature").and_then(|t| t.as_f64()).unwrap_or(0.0);
    let is_day = period.get("isDaytime").and_then(|b| b.as_bool()).unwrap_or(true);

    Ok(WeatherData {
        cloud_cover: cloud_cover_from_short_forecast(short_forecast),
        forecast: short_forecast.to_string(),
        temperature_f,
        is_day,
        fetched_at: chrono::Utc::now().timestamp(),
        has_error: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mostly_cloudy_beats_cloudy() {
        assert_eq!(cloud_cover_from_short_forecast("Mostly Cloudy"), 75);
    }

    #[test]
    fn mostly_sunny_beats_sunny() {
        assert_eq!(cloud_cover_from_short_forecast("Mostly Sunny"), 25);
        assert_eq!(cloud_cover_from_short_forecast("Mostly Clear"), 25);
    }

    #[test]
    fn rain_outranks_everything() {
        assert_eq!(cloud_cover_from_short_forecast("Chance Rain Showers"), 95);
    }

    #[test]
    fn unmatched_forecast_is_zero() {
        assert_eq!(cloud_cover_from_short_forecast("Hazy"), 0);
    }

    #[test]
    fn case_insensitive_matching() {
        assert_eq!(cloud_cover_from_short_forecast("OVERCAST"), 90);
    }

    #[test]
    fn parse_forecast_extracts_first_period() {
        let body = br#"{"properties":{"periods":[{"shortForecast":"Partly Cloudy","temperature":68,"isDaytime":true}]}}"#;
        let data = parse_forecast(body).unwrap();
        assert_eq!(data.cloud_cover, 50);
        assert_eq!(data.temperature_f, 68.0);
        assert!(data.is_day);
        assert!(!data.has_error);
    }
}
