use std::{fmt, str::FromStr};

use crate::{DualTrackError, Result};

/// Fixed-rate frame clock standing in for the display refresh.
#[derive(Debug, Clone)]
pub struct FrameClock {
    fps: u32,
    frame: u64,
}

impl FrameClock {
    pub fn new(fps: u32) -> Self {
        Self {
            fps: fps.max(1),
            frame: 0,
        }
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn delta_seconds(&self) -> f64 {
        1.0 / f64::from(self.fps)
    }

    /// Start time of the current frame. Computed by division so scripted
    /// times such as `0.3` land on the frame they name.
    pub fn elapsed_seconds(&self) -> f64 {
        self.frame as f64 / f64::from(self.fps)
    }

    pub fn frames_for(&self, seconds: f64) -> u64 {
        (seconds.max(0.0) * f64::from(self.fps)).round() as u64
    }

    pub fn advance(&mut self) {
        self.frame += 1;
    }
}

/// User action that can be scripted against a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Play,
    Stop,
    Switch,
}

impl FromStr for Action {
    type Err = DualTrackError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "play" => Ok(Action::Play),
            "stop" => Ok(Action::Stop),
            "switch" => Ok(Action::Switch),
            other => Err(DualTrackError::msg(format!("unknown action `{other}`"))),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::Play => "play",
            Action::Stop => "stop",
            Action::Switch => "switch",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledEvent {
    pub time_seconds: f64,
    pub action: Action,
}

impl ScheduledEvent {
    pub fn new(time_seconds: f64, action: Action) -> Self {
        Self {
            time_seconds,
            action,
        }
    }
}

/// Parses `SECONDS:ACTION`, e.g. `2.5:switch`.
impl FromStr for ScheduledEvent {
    type Err = DualTrackError;

    fn from_str(s: &str) -> Result<Self> {
        let (time, action) = s
            .split_once(':')
            .ok_or(DualTrackError::InvalidInput("expected SECONDS:ACTION"))?;
        let time_seconds: f64 = time
            .trim()
            .parse()
            .map_err(|_| DualTrackError::msg(format!("invalid time `{time}`")))?;
        if !time_seconds.is_finite() || time_seconds < 0.0 {
            return Err(DualTrackError::InvalidInput(
                "event time must be a non-negative number",
            ));
        }
        Ok(Self::new(time_seconds, action.parse()?))
    }
}

/// Time-ordered list of scripted actions.
#[derive(Debug, Default)]
pub struct Scheduler {
    events: Vec<ScheduledEvent>,
    next_event: usize,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_events(&mut self, events: Vec<ScheduledEvent>) {
        self.events = events;
        // Stable, so same-time events keep their given order.
        self.events
            .sort_by(|a, b| a.time_seconds.total_cmp(&b.time_seconds));
        self.next_event = 0;
    }

    /// Returns every action due at or before `elapsed_seconds` that has not
    /// fired yet.
    pub fn due(&mut self, elapsed_seconds: f64) -> Vec<Action> {
        let start = self.next_event;
        while self
            .events
            .get(self.next_event)
            .is_some_and(|event| event.time_seconds <= elapsed_seconds)
        {
            self.next_event += 1;
        }
        self.events[start..self.next_event]
            .iter()
            .map(|event| event.action)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_steps_by_frame() {
        let mut clock = FrameClock::new(50);
        assert_eq!(clock.delta_seconds(), 0.02);
        clock.advance();
        clock.advance();
        assert!((clock.elapsed_seconds() - 0.04).abs() < 1e-12);
        assert_eq!(clock.frames_for(1.0), 50);
    }

    #[test]
    fn elapsed_time_hits_scripted_instants_exactly() {
        let mut clock = FrameClock::new(10);
        for _ in 0..3 {
            clock.advance();
        }
        assert_eq!(clock.elapsed_seconds(), 0.3);

        let mut scheduler = Scheduler::new();
        scheduler.set_events(vec!["0.3:stop".parse().unwrap()]);
        assert_eq!(scheduler.due(clock.elapsed_seconds()), vec![Action::Stop]);
    }

    #[test]
    fn parses_scripted_events() {
        let event: ScheduledEvent = "2.5:Switch".parse().unwrap();
        assert_eq!(event, ScheduledEvent::new(2.5, Action::Switch));

        assert!("switch".parse::<ScheduledEvent>().is_err());
        assert!("-1:play".parse::<ScheduledEvent>().is_err());
        assert!("1:rewind".parse::<ScheduledEvent>().is_err());
    }

    #[test]
    fn fires_every_due_event_once_in_order() {
        let mut scheduler = Scheduler::new();
        scheduler.set_events(vec![
            ScheduledEvent::new(3.0, Action::Stop),
            ScheduledEvent::new(1.0, Action::Switch),
            ScheduledEvent::new(1.0, Action::Play),
        ]);

        assert!(scheduler.due(0.5).is_empty());
        assert_eq!(scheduler.due(1.0), vec![Action::Switch, Action::Play]);
        assert!(scheduler.due(2.0).is_empty());
        assert_eq!(scheduler.due(10.0), vec![Action::Stop]);
        assert!(scheduler.due(f64::MAX).is_empty());
    }
}
