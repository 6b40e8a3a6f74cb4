//! The envelope session: Idle -> Charging -> Revealed -> Idle.
//!
//! A [`Session`] owns the only copy of the UI state. Input arrives through
//! [`Session::click`] and [`Session::reset`], time arrives through
//! [`Session::tick`], and everything the renderer needs to react to comes back
//! out of `tick` as [`SessionEvent`]s. All delayed transitions live on a
//! [`Timeline`], so a reset can cancel them before they fire.

use std::time::Duration;

use bevy::log::{debug, info};
use uuid::Uuid;

use crate::reward::{RandomSource, RewardOutcome, RewardTable};
use crate::timeline::Timeline;

pub const CHARGE_DURATION: Duration = Duration::from_millis(2_000);
pub const REVEAL_DELAY: Duration = Duration::from_millis(300);
pub const GLOW_STEP: Duration = Duration::from_millis(100);
pub const CELEBRATION_CUE_DELAY: Duration = Duration::from_millis(100);

pub const GLOW_SCALE_STEP: f32 = 0.08;
pub const GLOW_SCALE_MAX: f32 = 1.8;
pub const GLOW_BRIGHTNESS_STEP: f32 = 0.2;
pub const GLOW_BRIGHTNESS_MAX: f32 = 3.0;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Charging,
    Revealed,
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Timing {
    pub charge: Duration,
    pub reveal_delay: Duration,
    pub glow_step: Duration,
    pub celebration_cue: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            charge: CHARGE_DURATION,
            reveal_delay: REVEAL_DELAY,
            glow_step: GLOW_STEP,
            celebration_cue: CELEBRATION_CUE_DELAY,
        }
    }
}

/// Envelope swell during the charge phase.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct ChargeGlow {
    pub scale: f32,
    pub brightness: f32,
}

impl Default for ChargeGlow {
    fn default() -> Self {
        Self {
            scale: 1.0,
            brightness: 1.0,
        }
    }
}

impl ChargeGlow {
    fn step(&mut self) {
        self.scale = (self.scale + GLOW_SCALE_STEP).min(GLOW_SCALE_MAX);
        self.brightness = (self.brightness + GLOW_BRIGHTNESS_STEP).min(GLOW_BRIGHTNESS_MAX);
    }
}

#[derive(Clone, PartialEq, Debug)]
pub enum SessionEvent {
    ChargeStarted,
    /// The envelope opened and the draw happened. Not yet visible.
    Opened(RewardOutcome),
    RewardShown(RewardOutcome),
    /// Confetti time. Only for good rewards, alongside `RewardShown`.
    Celebrate,
    /// Clap sound, shortly after a good reward shows.
    CelebrationCue,
    Reset,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ClickOutcome {
    Started,
    Ignored,
    Reset,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Scheduled {
    Open,
    Show,
    GlowStep,
    Cue,
}

pub struct Session<R> {
    state: SessionState,
    outcome: Option<RewardOutcome>,
    shown: bool,
    glow: ChargeGlow,
    timeline: Timeline<Scheduled>,
    outbox: Vec<SessionEvent>,
    table: RewardTable,
    timing: Timing,
    rng: R,
    cycle: Option<Uuid>,
    draws: u64,
}

impl<R: RandomSource> Session<R> {
    pub fn new(table: RewardTable, timing: Timing, rng: R) -> Self {
        Self {
            state: SessionState::Idle,
            outcome: None,
            shown: false,
            glow: ChargeGlow::default(),
            timeline: Timeline::default(),
            outbox: Vec::new(),
            table,
            timing,
            rng,
            cycle: None,
            draws: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Present exactly while the state is `Revealed`.
    pub fn outcome(&self) -> Option<&RewardOutcome> {
        self.outcome.as_ref()
    }

    /// The outcome once the reveal delay has passed.
    pub fn visible_outcome(&self) -> Option<&RewardOutcome> {
        self.outcome.as_ref().filter(|_| self.shown)
    }

    pub fn glow(&self) -> ChargeGlow {
        self.glow
    }

    pub fn draws(&self) -> u64 {
        self.draws
    }

    pub fn cycle_id(&self) -> Option<Uuid> {
        self.cycle
    }

    pub fn timing(&self) -> Timing {
        self.timing
    }

    pub fn table(&self) -> &RewardTable {
        &self.table
    }

    /// Envelope hit. Starts a charge from Idle, resets from Revealed and is
    /// ignored while charging.
    pub fn click(&mut self) -> ClickOutcome {
        match self.state {
            SessionState::Idle => {
                self.state = SessionState::Charging;
                let cycle = Uuid::new_v4();
                self.cycle = Some(cycle);
                self.timeline.schedule(self.timing.charge, Scheduled::Open);
                self.timeline.schedule(self.timing.glow_step, Scheduled::GlowStep);
                self.outbox.push(SessionEvent::ChargeStarted);
                info!("Envelope charging, cycle {}", cycle);
                ClickOutcome::Started
            }
            SessionState::Charging => {
                debug!("Click ignored while charging");
                ClickOutcome::Ignored
            }
            SessionState::Revealed => {
                self.reset();
                ClickOutcome::Reset
            }
        }
    }

    /// Back to Idle from anywhere. Pending timers are cancelled first so
    /// nothing scheduled by the old cycle can fire into the new one.
    pub fn reset(&mut self) {
        self.timeline.cancel_all();
        let was = self.state;
        self.state = SessionState::Idle;
        self.outcome = None;
        self.shown = false;
        self.glow = ChargeGlow::default();
        if let Some(cycle) = self.cycle.take() {
            info!("Envelope reset from {:?}, cycle {} closed", was, cycle);
        }
        self.outbox.push(SessionEvent::Reset);
    }

    /// Advances the session clock and returns every event produced since the
    /// last call, including those queued by `click` and `reset`.
    pub fn tick(&mut self, delta: Duration) -> Vec<SessionEvent> {
        let until = self.timeline.now() + delta;
        while let Some((_, action)) = self.timeline.pop_due(until) {
            self.fire(action);
        }
        self.timeline.settle(until);
        std::mem::take(&mut self.outbox)
    }

    fn fire(&mut self, action: Scheduled) {
        match action {
            Scheduled::GlowStep => {
                if self.state == SessionState::Charging {
                    self.glow.step();
                    self.timeline.schedule(self.timing.glow_step, Scheduled::GlowStep);
                }
            }
            Scheduled::Open => {
                debug_assert_eq!(self.state, SessionState::Charging);
                let outcome = self.table.resolve(&mut self.rng);
                self.draws += 1;
                info!(
                    "Envelope opened: {:?} ({}), cycle {:?}",
                    outcome.kind,
                    outcome.asset_ref,
                    self.cycle
                );
                self.state = SessionState::Revealed;
                self.glow = ChargeGlow::default();
                self.outcome = Some(outcome.clone());
                self.timeline.schedule(self.timing.reveal_delay, Scheduled::Show);
                self.outbox.push(SessionEvent::Opened(outcome));
            }
            Scheduled::Show => {
                let Some(outcome) = self.outcome.clone() else {
                    return;
                };
                self.shown = true;
                let good = outcome.kind.is_good();
                self.outbox.push(SessionEvent::RewardShown(outcome));
                if good {
                    self.outbox.push(SessionEvent::Celebrate);
                    self.timeline.schedule(self.timing.celebration_cue, Scheduled::Cue);
                }
            }
            Scheduled::Cue => {
                if self.state == SessionState::Revealed {
                    self.outbox.push(SessionEvent::CelebrationCue);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reward::{RewardKind, ScriptedSource};

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn session(values: &[f64]) -> Session<ScriptedSource> {
        Session::new(
            RewardTable::default(),
            Timing::default(),
            ScriptedSource::new(values.to_vec()),
        )
    }

    fn count(events: &[SessionEvent], pred: impl Fn(&SessionEvent) -> bool) -> usize {
        events.iter().filter(|e| pred(e)).count()
    }

    #[test]
    fn click_from_idle_only_charges() {
        let mut s = session(&[0.1]);
        assert_eq!(s.click(), ClickOutcome::Started);
        assert_eq!(s.state(), SessionState::Charging);
        assert!(s.outcome().is_none());

        let events = s.tick(ms(1_999));
        assert_eq!(events, [SessionEvent::ChargeStarted]);
        assert_eq!(s.state(), SessionState::Charging);
        assert_eq!(s.draws(), 0);
    }

    #[test]
    fn clicks_while_charging_are_ignored() {
        let mut s = session(&[0.1]);
        s.click();
        s.tick(ms(500));
        for _ in 0..5 {
            assert_eq!(s.click(), ClickOutcome::Ignored);
        }
        assert_eq!(s.state(), SessionState::Charging);

        // the first charge timer still fires on schedule
        s.tick(ms(1_500));
        assert_eq!(s.state(), SessionState::Revealed);
        assert_eq!(s.draws(), 1);

        s.tick(ms(10_000));
        assert_eq!(s.draws(), 1);
    }

    #[test]
    fn charge_expiry_draws_once_then_shows() {
        let mut s = session(&[0.95]);
        s.click();
        let events = s.tick(ms(2_000));
        assert_eq!(s.state(), SessionState::Revealed);
        assert_eq!(s.draws(), 1);
        assert!(s.outcome().is_some());
        assert!(s.visible_outcome().is_none());
        assert_eq!(count(&events, |e| matches!(e, SessionEvent::Opened(_))), 1);

        let events = s.tick(ms(299));
        assert!(events.is_empty());

        let events = s.tick(ms(1));
        let shown = s.visible_outcome().cloned().unwrap();
        assert_eq!(shown.kind, RewardKind::Bad);
        assert_eq!(events, [SessionEvent::RewardShown(shown)]);
    }

    #[test]
    fn one_large_tick_runs_the_whole_cycle() {
        let mut s = session(&[0.1]);
        s.click();
        let events = s.tick(ms(5_000));
        assert_eq!(events[0], SessionEvent::ChargeStarted);
        assert!(matches!(events[1], SessionEvent::Opened(_)));
        assert!(matches!(events[2], SessionEvent::RewardShown(_)));
        assert_eq!(events[3], SessionEvent::Celebrate);
        assert_eq!(events[4], SessionEvent::CelebrationCue);
        assert_eq!(events.len(), 5);
    }

    #[test]
    fn good_reveal_celebrates_once() {
        let mut s = session(&[0.1]);
        s.click();
        let mut events = s.tick(ms(2_300));
        events.extend(s.tick(ms(100)));
        events.extend(s.tick(ms(5_000)));
        assert_eq!(count(&events, |e| *e == SessionEvent::Celebrate), 1);
        assert_eq!(count(&events, |e| *e == SessionEvent::CelebrationCue), 1);
    }

    #[test]
    fn bad_reveal_never_celebrates() {
        let mut s = session(&[0.5]);
        s.click();
        let events = s.tick(ms(10_000));
        assert_eq!(count(&events, |e| *e == SessionEvent::Celebrate), 0);
        assert_eq!(count(&events, |e| *e == SessionEvent::CelebrationCue), 0);
    }

    #[test]
    fn reset_clears_outcome() {
        let mut s = session(&[0.1]);
        s.click();
        s.tick(ms(3_000));
        assert!(s.outcome().is_some());

        assert_eq!(s.click(), ClickOutcome::Reset);
        assert_eq!(s.state(), SessionState::Idle);
        assert!(s.outcome().is_none());
        assert!(s.visible_outcome().is_none());
        assert_eq!(s.tick(ms(1)), [SessionEvent::Reset]);
    }

    #[test]
    fn reset_cancels_pending_reveal() {
        let mut s = session(&[0.1]);
        s.click();
        s.tick(ms(2_100));
        assert_eq!(s.state(), SessionState::Revealed);
        s.reset();
        let events = s.tick(ms(1_000));
        assert_eq!(events, [SessionEvent::Reset]);
        assert_eq!(s.state(), SessionState::Idle);
        assert!(s.outcome().is_none());
    }

    #[test]
    fn reset_cancels_pending_cue() {
        let mut s = session(&[0.1]);
        s.click();
        s.tick(ms(2_350));
        s.reset();
        let events = s.tick(ms(1_000));
        assert_eq!(count(&events, |e| *e == SessionEvent::CelebrationCue), 0);
    }

    #[test]
    fn reset_during_charge_prevents_the_draw() {
        let mut s = session(&[0.1]);
        s.click();
        s.tick(ms(1_000));
        s.reset();
        s.tick(ms(5_000));
        assert_eq!(s.draws(), 0);
        assert_eq!(s.state(), SessionState::Idle);
    }

    #[test]
    fn cycles_repeat_indefinitely() {
        let mut s = session(&[0.1, 0.0, 0.9, 0.0]);
        for round in 1..=10 {
            assert_eq!(s.click(), ClickOutcome::Started);
            s.tick(ms(2_300));
            assert_eq!(s.draws(), round);
            assert!(s.visible_outcome().is_some());
            assert_eq!(s.click(), ClickOutcome::Reset);
        }
    }

    #[test]
    fn glow_ramps_and_caps() {
        let mut s = session(&[0.9]);
        s.click();
        s.tick(ms(100));
        let g = s.glow();
        assert!((g.scale - 1.08).abs() < 1e-4);
        assert!((g.brightness - 1.2).abs() < 1e-4);

        s.tick(ms(1_800));
        let g = s.glow();
        assert_eq!(g.scale, GLOW_SCALE_MAX);
        assert_eq!(g.brightness, GLOW_BRIGHTNESS_MAX);

        s.tick(ms(100));
        assert_eq!(s.glow(), ChargeGlow::default());
    }

    #[test]
    fn outcome_present_iff_revealed() {
        let mut s = session(&[0.3]);
        for step in 0..60 {
            if step % 25 == 0 {
                s.click();
            }
            s.tick(ms(100));
            assert_eq!(s.outcome().is_some(), s.state() == SessionState::Revealed);
        }
    }

    #[test]
    fn each_cycle_gets_a_fresh_id() {
        let mut s = session(&[0.9]);
        s.click();
        let first = s.cycle_id().unwrap();
        s.tick(ms(3_000));
        s.click();
        assert!(s.cycle_id().is_none());
        s.click();
        assert_ne!(s.cycle_id().unwrap(), first);
    }
}
