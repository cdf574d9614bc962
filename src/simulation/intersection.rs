//! Intersection logic for the traffic simulation
//!
//! Each intersection runs its own four-phase signal automaton:
//! NS green -> NS yellow -> EW green -> EW yellow -> NS green.
//! There is no coordination between intersections.

use serde::{Deserialize, Serialize};

use super::types::{IntersectionId, LightColor, LightPhase, SignalOverride, OVERRIDE_TIMER};

/// An intersection in the traffic simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intersection {
    pub id: IntersectionId,
    /// Human readable name
    pub label: String,
    /// Grid column
    pub x: u32,
    /// Grid row
    pub y: u32,
    pub light: LightPhase,
    /// Ticks remaining in the current phase
    pub timer: u32,
    /// Ticks each green phase lasts
    pub green_duration: u32,
    /// Operator-forced phase, if any
    pub signal_override: Option<SignalOverride>,
}

impl Intersection {
    /// Create an intersection that starts at the beginning of its NS green.
    pub fn new(id: IntersectionId, label: String, x: u32, y: u32, green_duration: u32) -> Self {
        Self {
            id,
            label,
            x,
            y,
            light: LightPhase::NS_GREEN,
            timer: green_duration,
            green_duration,
            signal_override: None,
        }
    }

    /// Advance the signal by one tick.
    ///
    /// While an override is active the phase is frozen and the timer stays
    /// pinned at [`OVERRIDE_TIMER`].
    pub fn advance(&mut self, yellow_duration: u32) {
        if let Some(forced) = self.signal_override {
            self.light = forced.phase();
            self.timer = OVERRIDE_TIMER;
            return;
        }

        self.timer = self.timer.saturating_sub(1);
        if self.timer > 0 {
            return;
        }

        let (next, duration) = match (self.light.ns, self.light.ew) {
            (LightColor::Green, _) => (LightPhase::NS_YELLOW, yellow_duration),
            (LightColor::Yellow, _) => (LightPhase::EW_GREEN, self.green_duration),
            (_, LightColor::Green) => (LightPhase::EW_YELLOW, yellow_duration),
            (_, LightColor::Yellow) => (LightPhase::NS_GREEN, self.green_duration),
            // All-red only exists under an override; restart the cycle.
            (LightColor::Red, LightColor::Red) => (LightPhase::NS_GREEN, self.green_duration),
        };
        self.light = next;
        self.timer = duration.max(1);
    }

    /// Force a phase, or release a previous override with `None`.
    ///
    /// Releasing resumes normal cycling from the start of a green phase: EW
    /// if the override held EW green, NS otherwise. The resumed green lasts
    /// `green_duration` advances, like any other.
    pub fn set_override(&mut self, signal_override: Option<SignalOverride>) {
        match signal_override {
            Some(forced) => {
                self.signal_override = Some(forced);
                self.light = forced.phase();
                self.timer = OVERRIDE_TIMER;
            }
            None => {
                if let Some(previous) = self.signal_override.take() {
                    self.light = match previous {
                        SignalOverride::EwGreen => LightPhase::EW_GREEN,
                        SignalOverride::NsGreen | SignalOverride::AllRed => LightPhase::NS_GREEN,
                    };
                    // Releases land between ticks, so the next advance still
                    // belongs to this green.
                    self.timer = self.green_duration + 1;
                }
            }
        }
    }

    /// Change the green length. The running phase keeps its timer; the new
    /// length applies from the next green onwards.
    pub fn set_green_duration(&mut self, green_duration: u32) {
        self.green_duration = green_duration.max(1);
    }

    pub fn is_overridden(&self) -> bool {
        self.signal_override.is_some()
    }
}
