//! Replay success/failure sequences through a degradation tracker.

use anyhow::{bail, Result};
use serde::Serialize;

use lifeline_core::{DegradationConfig, Level};
use lifeline_runtime::DegradationTracker;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Event {
    Success,
    Failure,
}

/// One row of simulation output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Step {
    pub step: usize,
    pub event: Event,
    pub level: Level,
    pub failure_count: u32,
    pub consecutive_successes: u32,
}

/// Parse `s`/`f` (also `+`/`-`) characters. Whitespace and commas are
/// ignored.
pub fn parse_events(input: &str) -> Result<Vec<Event>> {
    let mut events = Vec::new();
    for (position, ch) in input.chars().enumerate() {
        match ch {
            's' | 'S' | '+' => events.push(Event::Success),
            'f' | 'F' | '-' => events.push(Event::Failure),
            c if c.is_whitespace() || c == ',' => {}
            other => bail!("unexpected event '{}' at position {}", other, position),
        }
    }
    Ok(events)
}

pub fn run(config: DegradationConfig, events: &[Event]) -> Result<Vec<Step>> {
    let tracker = DegradationTracker::new(config)?;

    let steps = events
        .iter()
        .enumerate()
        .map(|(index, event)| {
            match event {
                Event::Success => tracker.record_success(),
                Event::Failure => tracker.record_failure(),
            };
            let snapshot = tracker.snapshot();
            Step {
                step: index + 1,
                event: *event,
                level: snapshot.level,
                failure_count: snapshot.failure_count,
                consecutive_successes: snapshot.consecutive_successes,
            }
        })
        .collect();

    Ok(steps)
}

pub fn render_table(steps: &[Step]) -> String {
    let mut out = format!(
        "{:<6}{:<9}{:<10}{:<10}{}\n",
        "STEP", "EVENT", "LEVEL", "FAILURES", "SUCCESSES"
    );
    for step in steps {
        let event = match step.event {
            Event::Success => "success",
            Event::Failure => "failure",
        };
        out.push_str(&format!(
            "{:<6}{:<9}{:<10}{:<10}{}\n",
            step.step, event, step.level, step.failure_count, step.consecutive_successes
        ));
    }
    out
}
