use thiserror::Error;
use tracing::info;

use crate::protocol::Reading;
use crate::results::ResultTable;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please enter player name.")]
    EmptyPlayerName,
    #[error("Please enter team.")]
    EmptyTeam,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SessionState {
    pub is_measuring: bool,
    pub max_speed_kmh: f64,
    /// Readings folded into the maximum since the last start.
    pub samples: usize,
}

#[derive(Debug)]
struct Contestant {
    player_name: String,
    team: String,
}

/// Idle -> start -> Measuring -> stop -> Idle, plus the results it produced.
#[derive(Debug)]
pub struct Session {
    state: SessionState,
    contestant: Option<Contestant>,
    latest: Option<Reading>,
    results: ResultTable,
}

impl Session {
    pub fn new() -> Self {
        Self {
            state: SessionState::default(),
            contestant: None,
            latest: None,
            results: ResultTable::new(),
        }
    }

    pub fn start(&mut self, player_name: &str, team: &str) -> Result<(), ValidationError> {
        let player_name = player_name.trim();
        let team = team.trim();
        if player_name.is_empty() {
            return Err(ValidationError::EmptyPlayerName);
        }
        if team.is_empty() {
            return Err(ValidationError::EmptyTeam);
        }

        self.state = SessionState {
            is_measuring: true,
            max_speed_kmh: 0.0,
            samples: 0,
        };
        self.contestant = Some(Contestant {
            player_name: player_name.to_string(),
            team: team.to_string(),
        });
        info!(player = player_name, team, "measurement started");
        Ok(())
    }

    pub fn on_reading(&mut self, reading: Reading) {
        self.latest = Some(reading);
        if self.state.is_measuring {
            self.state.max_speed_kmh = self.state.max_speed_kmh.max(reading.speed_kmh);
            self.state.samples += 1;
        }
    }

    /// Ends the running measurement and files its result. Returns the rank
    /// the new record landed on, or `None` when nothing was running.
    pub fn stop(&mut self) -> Option<usize> {
        if !self.state.is_measuring {
            return None;
        }
        self.state.is_measuring = false;
        let contestant = self.contestant.take()?;
        let max_speed = self.state.max_speed_kmh;
        let rank = self
            .results
            .insert(contestant.player_name.clone(), contestant.team.clone(), max_speed);
        info!(
            player = %contestant.player_name,
            team = %contestant.team,
            max_speed,
            rank,
            "measurement stopped"
        );
        Some(rank)
    }

    pub fn is_measuring(&self) -> bool {
        self.state.is_measuring
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn latest(&self) -> Option<Reading> {
        self.latest
    }

    pub fn results(&self) -> &ResultTable {
        &self.results
    }

    pub fn results_mut(&mut self) -> &mut ResultTable {
        &mut self.results
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn reading(frequency_hz: f64, speed_kmh: f64) -> Reading {
        Reading {
            frequency_hz,
            speed_kmh,
        }
    }

    #[test]
    fn single_session_produces_one_record() {
        let mut session = Session::new();
        session.start("Alice", "Red").unwrap();
        session.on_reading(reading(10.0, 20.0));
        session.on_reading(reading(11.0, 15.0));
        assert_eq!(session.stop(), Some(1));

        let records = session.results().records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].rank, 1);
        assert_eq!(records[0].player_name, "Alice");
        assert_eq!(records[0].team, "Red");
        assert_eq!(records[0].max_speed_kmh, 20.0);
        assert!(!session.is_measuring());
    }

    #[test]
    fn start_requires_name_and_team() {
        let mut session = Session::new();
        assert_eq!(session.start("", "Red"), Err(ValidationError::EmptyPlayerName));
        assert_eq!(session.start("Bob", "  "), Err(ValidationError::EmptyTeam));
        assert!(!session.is_measuring());
    }

    #[test]
    fn surrounding_whitespace_is_not_stored() {
        let mut session = Session::new();
        session.start(" Alice ", "\tRed ").unwrap();
        session.stop();
        let record = &session.results().records()[0];
        assert_eq!(record.player_name, "Alice");
        assert_eq!(record.team, "Red");
    }

    #[test]
    fn failed_start_keeps_running_measurement() {
        let mut session = Session::new();
        session.start("Alice", "Red").unwrap();
        session.on_reading(reading(1.0, 12.0));
        assert!(session.start("", "").is_err());
        assert!(session.is_measuring());
        assert_eq!(session.state().max_speed_kmh, 12.0);
    }

    #[test]
    fn start_resets_maximum() {
        let mut session = Session::new();
        session.start("Alice", "Red").unwrap();
        session.on_reading(reading(1.0, 40.0));
        session.stop();
        session.start("Bob", "Blue").unwrap();
        assert_eq!(session.state().max_speed_kmh, 0.0);
        assert_eq!(session.state().samples, 0);
    }

    #[test]
    fn idle_readings_update_display_only() {
        let mut session = Session::new();
        session.on_reading(reading(5.0, 99.0));
        assert_eq!(session.latest(), Some(reading(5.0, 99.0)));
        assert_eq!(session.state().max_speed_kmh, 0.0);
        assert_eq!(session.stop(), None);
        assert!(session.results().is_empty());
    }

    proptest! {
        #[test]
        fn maximum_tracks_only_measured_readings(
            before in prop::collection::vec(0.0f64..500.0, 0..10),
            during in prop::collection::vec(0.0f64..500.0, 0..20),
            after in prop::collection::vec(0.0f64..500.0, 0..10),
        ) {
            let mut session = Session::new();
            for s in &before {
                session.on_reading(reading(1.0, *s));
            }
            session.start("p", "t").unwrap();
            for s in &during {
                session.on_reading(reading(1.0, *s));
            }
            session.stop();
            for s in &after {
                session.on_reading(reading(1.0, *s));
            }

            let expected = during.iter().copied().fold(0.0, f64::max);
            prop_assert_eq!(session.state().max_speed_kmh, expected);
            prop_assert_eq!(session.results().records()[0].max_speed_kmh, expected);
        }
    }
}
