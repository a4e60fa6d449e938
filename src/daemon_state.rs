//! `DaemonState`: everything the daemon owns between ticks.

use chrono::{DateTime, Utc};

use crate::location::Location;
use crate::override_state::OverrideState;
use crate::weather::WeatherData;

/// Manual-mode fields, mirroring `OverrideState` but carrying the resolved
/// `start_time`/`resume_time` the daemon computes rather than persists raw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ManualMode {
    pub start_temp: u32,
    pub target_temp: u32,
    pub start_time: DateTime<Utc>,
    pub duration_minutes: u32,
    pub issued_at: i64,
    pub resume_time: DateTime<Utc>,
}

pub struct DaemonState {
    pub location: Location,
    pub weather: WeatherData,
    pub applied_temp: Option<u32>,
    pub manual: Option<ManualMode>,
}

impl DaemonState {
    pub fn new(location: Location, weather: WeatherData) -> Self {
        Self {
            location,
            weather,
            applied_temp: None,
            manual: None,
        }
    }

    pub fn in_manual_mode(&self) -> bool {
        self.manual.is_some()
    }

    pub fn enter_manual_mode(&mut self, start_temp: u32, ov: &OverrideState, resume_time: DateTime<Utc>) {
        self.manual = Some(ManualMode {
            start_temp,
            target_temp: ov.target_temp,
            start_time: DateTime::<Utc>::from_timestamp(ov.issued_at, 0).unwrap_or_else(Utc::now),
            duration_minutes: ov.duration_minutes,
            issued_at: ov.issued_at,
            resume_time,
        });
    }

    pub fn exit_manual_mode(&mut self) {
        self.manual = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enter_and_exit_manual_mode() {
        let mut state = DaemonState::new(Location::new(41.88, -87.63), WeatherData::erroneous());
        assert!(!state.in_manual_mode());

        let ov = OverrideState {
            active: true,
            target_temp: 3500,
            duration_minutes: 5,
            issued_at: Utc::now().timestamp(),
            start_temp: 0,
        };
        state.enter_manual_mode(6200, &ov, Utc::now() + chrono::Duration::hours(1));
        assert!(state.in_manual_mode());
        assert_eq!(state.manual.unwrap().start_temp, 6200);

        state.exit_manual_mode();
        assert!(!state.in_manual_mode());
    }
}
