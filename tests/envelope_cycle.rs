use std::time::Duration;

use hongbao::reward::{ScriptedSource, SeededSource, BAD_ASSETS, GOOD_ASSETS};
use hongbao::share::{build_share_url, ShareMessageSet, SHARE_TEXT_PARAM};
use hongbao::{
    ClickOutcome, GachaConfig, RewardKind, RewardTable, Session, SessionEvent, SessionState,
    Timing,
};

fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}

/// Feeds the session in 16ms frames, like the render loop does.
fn run_frames(session: &mut Session<impl hongbao::RandomSource>, total: Duration) -> Vec<SessionEvent> {
    let frame = ms(16);
    let mut elapsed = Duration::ZERO;
    let mut events = Vec::new();
    while elapsed < total {
        events.extend(session.tick(frame));
        elapsed += frame;
    }
    events
}

#[test]
fn good_cycle_end_to_end() {
    let mut session = Session::new(
        RewardTable::default(),
        Timing::default(),
        ScriptedSource::new([0.10]),
    );

    assert_eq!(session.click(), ClickOutcome::Started);
    let events = run_frames(&mut session, ms(1_900));
    assert_eq!(events, [SessionEvent::ChargeStarted]);
    assert_eq!(session.state(), SessionState::Charging);
    assert!(session.glow().scale > 1.0);

    let events = run_frames(&mut session, ms(600));
    let outcome = session.visible_outcome().cloned().expect("reward visible");
    assert_eq!(outcome.kind, RewardKind::Good);
    assert_eq!(outcome.asset_ref, GOOD_ASSETS[0]);
    assert_eq!(
        events,
        [
            SessionEvent::Opened(outcome.clone()),
            SessionEvent::RewardShown(outcome.clone()),
            SessionEvent::Celebrate,
            SessionEvent::CelebrationCue,
        ]
    );

    let config = GachaConfig::default();
    let share = ShareMessageSet::new("0xCAFE0000000000000000000000000000000000CAFE");
    let message = share.pick_share_message(outcome.kind, &mut ScriptedSource::new([0.5]));
    assert!(message.contains("0xCAFE0000000000000000000000000000000000CAFE"));
    let url = build_share_url(&config.share_endpoint, &message);
    assert!(url
        .query_pairs()
        .any(|(k, v)| k == SHARE_TEXT_PARAM && v == message));

    assert_eq!(session.click(), ClickOutcome::Reset);
    assert_eq!(session.state(), SessionState::Idle);
    assert!(session.outcome().is_none());
    assert_eq!(run_frames(&mut session, ms(1_000)), [SessionEvent::Reset]);
}

#[test]
fn bad_cycle_uses_bad_assets() {
    let mut session = Session::new(
        RewardTable::default(),
        Timing::default(),
        ScriptedSource::new([0.95]),
    );
    session.click();
    run_frames(&mut session, ms(2_500));
    let outcome = session.outcome().expect("revealed");
    assert_eq!(outcome.kind, RewardKind::Bad);
    assert_eq!(outcome.asset_ref, BAD_ASSETS[0]);
}

#[test]
fn spamming_clicks_never_double_draws() {
    let mut session = Session::new(
        RewardTable::default(),
        Timing::default(),
        SeededSource::seeded(11),
    );
    session.click();
    for _ in 0..200 {
        session.click();
        session.tick(ms(16));
        if session.state() == SessionState::Revealed {
            break;
        }
    }
    run_frames(&mut session, ms(1_000));
    assert_eq!(session.draws(), 1);
}

#[test]
fn seeded_sessions_agree() {
    let draw_all = |seed| {
        let mut session = Session::new(
            RewardTable::default(),
            Timing::default(),
            SeededSource::seeded(seed),
        );
        (0..20)
            .map(|_| {
                session.click();
                session.tick(ms(2_300));
                let kind = session.outcome().map(|o| o.kind);
                session.reset();
                kind
            })
            .collect::<Vec<_>>()
    };
    assert_eq!(draw_all(2024), draw_all(2024));
}

#[test]
fn custom_timing_is_respected() {
    let timing = Timing {
        charge: ms(500),
        reveal_delay: ms(50),
        ..Timing::default()
    };
    let mut session = Session::new(RewardTable::default(), timing, ScriptedSource::new([0.9]));
    session.click();
    session.tick(ms(499));
    assert_eq!(session.state(), SessionState::Charging);
    session.tick(ms(1));
    assert_eq!(session.state(), SessionState::Revealed);
    assert!(session.visible_outcome().is_none());
    session.tick(ms(50));
    assert!(session.visible_outcome().is_some());
}
