
use std::sync::Arc;

use rampart_rollback::assert_no_violations;
use rampart_rollback::telemetry::{
    CollectingObserver, CompositeObserver, InvariantChecker, ViolationKind, ViolationObserver,
    ViolationSeverity,
};
use rampart_rollback::{
    PlayerKind, RampartError, RollbackSession, SessionBuilder, SessionConfig, Step,
};
use stubs::{GameStub, StateStub, StubConfig, StubInput};

fn session_16_100() -> RollbackSession<StubConfig> {
    SessionBuilder::<StubConfig>::new()
        .with_config(SessionConfig {
            update_interval_ms: 16.0,
            max_remote_ping_ms: 100,
        })
        .unwrap()
        .build()
}

/// Drives `session` with 16 ms ticks until it reaches `target`.
///
/// The throttle may stall individual ticks while remote inputs trail, so a
/// fixed tick count is not enough; the guard bounds runaway loops.
fn advance_to(session: &mut RollbackSession<StubConfig>, host: &mut GameStub, target: i32) {
    let mut guard = 0;
    while session.current_step() < Step::new(target) {
        session.update(16.0, host).unwrap();
        guard += 1;
        assert!(guard < 1000, "session failed to reach step {}", target);
    }
}

#[test]
fn advances_without_rollback() {
    let mut session = session_16_100();
    session.add_player(PlayerKind::Local);
    let mut host = GameStub::new();

    for _ in 0..3 {
        let report = session.update(16.0, &mut host).unwrap();
        assert!(report.advanced);
        assert!(report.rolled_back_to.is_none());
    }

    assert_eq!(host.saves(), 3);
    assert_eq!(host.simulations(), 3);
    assert_eq!(host.loads(), 0);
    assert_eq!(session.current_step(), Step::new(3));
    assert_eq!(host.gs.step, 3);
}

#[test]
fn rollback_restores_and_resimulates() {
    let mut session = session_16_100();
    session.add_player(PlayerKind::Local);
    let remote = session.add_player(PlayerKind::Remote);
    let mut host = GameStub::new();

    // run ahead to step 5 predicting the remote's input as default
    advance_to(&mut session, &mut host, 5);
    assert_eq!(host.loads(), 0);

    // the remote's first packets arrive in one burst: steps 0-2 match the
    // default prediction, step 3 contradicts it
    for s in 0..3 {
        assert!(session
            .add_remote_input(remote, Step::new(s), StubInput::default())
            .unwrap());
    }
    let corrected = StubInput { inp: 7 };
    assert!(session
        .add_remote_input(remote, Step::new(3), corrected)
        .unwrap());

    // a zero-length tick isolates the rollback phase from the throttle/advance
    host.clear_recording();
    let report = session.update(0.0, &mut host).unwrap();

    assert_eq!(report.rolled_back_to, Some(Step::new(3)));
    assert_eq!(report.resimulated_steps, 2);
    assert!(!report.advanced);
    assert_eq!(host.loads(), 1);
    assert_eq!(host.loaded_steps, vec![3]);
    assert_eq!(host.simulations(), 2); // steps 3 and 4
    assert_eq!(session.current_step(), Step::new(5));

    // the resimulated state matches a lockstep run: the correction applies
    // at step 3 and repeats as the prediction for step 4
    let mut reference = StateStub::default();
    for s in 0..5 {
        let remote_input = if s >= 3 { corrected } else { StubInput::default() };
        reference.advance(&[StubInput::default(), remote_input]);
    }
    assert_eq!(host.gs, reference);
    assert!(session.check_invariants().is_ok());
}

#[test]
fn stale_remote_input_is_dropped_and_signal_stays_consumed() {
    let mut session = session_16_100();
    session.add_player(PlayerKind::Local);
    let remote = session.add_player(PlayerKind::Remote);
    let mut host = GameStub::new();

    advance_to(&mut session, &mut host, 5);
    for s in 0..3 {
        session
            .add_remote_input(remote, Step::new(s), StubInput::default())
            .unwrap();
    }
    session
        .add_remote_input(remote, Step::new(3), StubInput { inp: 7 })
        .unwrap();
    session.update(0.0, &mut host).unwrap();

    // a second delivery for step 3 is stale: silently dropped
    assert!(!session
        .add_remote_input(remote, Step::new(3), StubInput { inp: 9 })
        .unwrap());

    // and with the signal consumed, no further rollback happens
    host.clear_recording();
    let report = session.update(0.0, &mut host).unwrap();
    assert!(report.rolled_back_to.is_none());
    assert_eq!(host.loads(), 0);
    assert_eq!(host.simulations(), 0);
}

#[test]
fn throttle_keeps_advancement_below_wall_time() {
    let mut session = session_16_100();
    session.add_player(PlayerKind::Local);
    // a remote player that never delivers input trails further every step
    session.add_player(PlayerKind::Remote);
    let mut host = GameStub::new();

    let mut advances = 0;
    for _ in 0..100 {
        if session.update(16.0, &mut host).unwrap().advanced {
            advances += 1;
        }
    }

    // 100 ticks of 16 ms is 1600 ms of wall time; a free-running session
    // would take all 100 steps
    assert!(advances < 100);
    assert!(advances > 0);
}

#[test]
fn throttle_delay_shrinks_as_remote_estimate_rises() {
    let mut session = session_16_100();
    session.add_player(PlayerKind::Local);
    let remote = session.add_player(PlayerKind::Remote);
    let mut host = GameStub::new();

    for s in 0..3 {
        session
            .add_remote_input(remote, Step::new(s), StubInput::default())
            .unwrap();
    }
    advance_to(&mut session, &mut host, 5);

    // raising the ping raises the estimate of the step the remote endpoint
    // has itself reached, shrinking its advantage
    let mut previous = f64::INFINITY;
    for ping in [0u32, 16, 32, 64, 96] {
        session.set_ping(remote, ping).unwrap();
        let report = session.update(0.0, &mut host).unwrap();
        assert!(!report.advanced);
        assert!(report.throttle_delay_ms <= previous);
        previous = report.throttle_delay_ms;
    }
    // by ping 96 the estimate has overtaken the local step entirely
    assert_eq!(previous, 0.0);
}

#[test]
fn broadcast_fires_once_per_accepted_local_input() {
    let mut session = session_16_100();
    let local = session.add_player(PlayerKind::Local);
    let mut host = GameStub::new();

    let input = StubInput { inp: 5 };
    assert!(session.add_local_input(local, input, &mut host).unwrap());
    assert_eq!(host.broadcasts, vec![(local, Step::new(0), input)]);

    // a duplicate at the same step is dropped without a broadcast
    assert!(!session.add_local_input(local, input, &mut host).unwrap());
    assert_eq!(host.broadcasts.len(), 1);

    session.update(16.0, &mut host).unwrap();
    let next = StubInput { inp: 6 };
    assert!(session.add_local_input(local, next, &mut host).unwrap());
    assert_eq!(host.broadcasts.len(), 2);
    assert_eq!(host.broadcasts[1], (local, Step::new(1), next));
}

#[test]
fn rollback_outside_window_is_a_contract_violation() {
    // max ping equal to the interval: the minimum window of 3
    let mut session = SessionBuilder::<StubConfig>::new()
        .with_config(SessionConfig {
            update_interval_ms: 16.0,
            max_remote_ping_ms: 16,
        })
        .unwrap()
        .build();
    assert_eq!(session.rollback_window(), 3);
    session.add_player(PlayerKind::Local);
    let mut host = GameStub::new();

    advance_to(&mut session, &mut host, 10);

    // a late-joining peer tries to correct step 0, which aged out long ago
    let remote = session.add_player(PlayerKind::Remote);
    assert!(session
        .add_remote_input(remote, Step::new(0), StubInput { inp: 7 })
        .unwrap());

    host.clear_recording();
    let err = session.update(0.0, &mut host).unwrap_err();
    assert!(matches!(err, RampartError::SnapshotEvicted { .. }));

    // the failed rollback never touched the host or the ring
    assert_eq!(host.loads(), 0);
    assert_eq!(host.simulations(), 0);
    assert_eq!(session.current_step(), Step::new(10));
    assert!(session.check_invariants().is_ok());

    // the signal was consumed, so the session keeps running
    advance_to(&mut session, &mut host, 11);
    assert_eq!(session.current_step(), Step::new(11));
}

#[test]
fn second_remote_signal_survives_into_the_next_update() {
    let mut session = session_16_100();
    let remote_a = session.add_player(PlayerKind::Remote);
    let remote_b = session.add_player(PlayerKind::Remote);
    let mut host = GameStub::new();

    advance_to(&mut session, &mut host, 6);

    // a's correction targets step 2, b's targets step 4
    let a_input = StubInput { inp: 5 };
    for s in 0..2 {
        session
            .add_remote_input(remote_a, Step::new(s), StubInput::default())
            .unwrap();
    }
    session
        .add_remote_input(remote_a, Step::new(2), a_input)
        .unwrap();
    let b_input = StubInput { inp: 6 };
    for s in 0..4 {
        session
            .add_remote_input(remote_b, Step::new(s), StubInput::default())
            .unwrap();
    }
    session
        .add_remote_input(remote_b, Step::new(4), b_input)
        .unwrap();

    // signals are consumed only while they improve the sync target, in
    // insertion order: a's step 2 wins this pass and b's step 4, no longer
    // an improvement on 2, is left pending
    host.clear_recording();
    let first = session.update(0.0, &mut host).unwrap();
    assert_eq!(first.rolled_back_to, Some(Step::new(2)));
    assert_eq!(first.resimulated_steps, 4);
    assert_eq!(host.loaded_steps, vec![2]);

    // the surviving signal triggers a second, redundant-but-correct rollback
    let second = session.update(0.0, &mut host).unwrap();
    assert_eq!(second.rolled_back_to, Some(Step::new(4)));
    assert_eq!(second.resimulated_steps, 2);
    assert_eq!(host.loaded_steps, vec![2, 4]);

    // after which everything is consumed
    let third = session.update(0.0, &mut host).unwrap();
    assert!(third.rolled_back_to.is_none());

    // both rollbacks replayed the same authoritative inputs
    let mut reference = StateStub::default();
    for s in 0..6 {
        let a = if s >= 2 { a_input } else { StubInput::default() };
        let b = if s >= 4 { b_input } else { StubInput::default() };
        reference.advance(&[a, b]);
    }
    assert_eq!(host.gs, reference);
    assert!(session.check_invariants().is_ok());
}

#[test]
fn real_violations_reach_the_configured_sink() {
    let collected = Arc::new(CollectingObserver::new());
    let mirrored = Arc::new(CollectingObserver::new());
    let fanout: Vec<Arc<dyn ViolationObserver>> = vec![collected.clone(), mirrored.clone()];
    let mut session = SessionBuilder::<StubConfig>::new()
        .with_config(SessionConfig {
            update_interval_ms: 16.0,
            max_remote_ping_ms: 16,
        })
        .unwrap()
        .with_violation_observer(Arc::new(CompositeObserver::from_observers(fanout)))
        .build();
    session.add_player(PlayerKind::Local);
    let remote = session.add_player(PlayerKind::Remote);
    let mut host = GameStub::new();

    // an input gap is rejected and reported
    assert!(session
        .add_remote_input(remote, Step::new(0), StubInput::default())
        .unwrap());
    assert!(session
        .add_remote_input(remote, Step::new(2), StubInput { inp: 8 })
        .is_err());
    assert!(collected.has_violation(ViolationKind::InputSequence));

    // a ping above the cap is rejected and reported
    assert!(session.set_ping(remote, 17).is_err());
    assert!(collected.has_violation(ViolationKind::Configuration));

    // a correction whose snapshot aged out of the window is rejected and
    // reported
    advance_to(&mut session, &mut host, 10);
    assert!(session
        .add_remote_input(remote, Step::new(1), StubInput { inp: 9 })
        .unwrap());
    let err = session.update(0.0, &mut host).unwrap_err();
    assert!(matches!(err, RampartError::SnapshotEvicted { .. }));
    assert!(collected.has_violation(ViolationKind::StateManagement));
    assert!(collected.has_severity(ViolationSeverity::Critical));

    // the composite fanned every violation out to both sinks
    assert_eq!(collected.len(), mirrored.len());

    // captured violations export as structured JSON
    let evicted = &collected.violations_of_kind(ViolationKind::StateManagement)[0];
    assert!(evicted.message.contains("discarded state"));
    let json = evicted.to_json().unwrap();
    assert!(json.contains(r#""kind":"state_management""#));
    assert!(json.contains(r#""severity":"critical""#));
}

#[test]
fn clean_sessions_report_no_violations() {
    let observer = Arc::new(CollectingObserver::new());
    let mut session = session_16_100();
    session.set_violation_observer(observer.clone());
    session.add_player(PlayerKind::Local);
    let remote = session.add_player(PlayerKind::Remote);
    let mut host = GameStub::new();

    advance_to(&mut session, &mut host, 5);
    for s in 0..3 {
        session
            .add_remote_input(remote, Step::new(s), StubInput::default())
            .unwrap();
    }
    session
        .add_remote_input(remote, Step::new(3), StubInput { inp: 7 })
        .unwrap();
    // an in-window rollback is normal operation, not a violation
    session.update(0.0, &mut host).unwrap();
    // and a stale duplicate is silently dropped, not a violation either
    assert!(!session
        .add_remote_input(remote, Step::new(3), StubInput { inp: 9 })
        .unwrap());
    session.update(0.0, &mut host).unwrap();

    assert_no_violations!(observer);
}

#[test]
fn late_remote_inputs_converge_to_the_lockstep_result() {
    const TARGET: i32 = 24;
    const LAG: i32 = 3;

    fn local_input(step: i32) -> StubInput {
        StubInput {
            inp: (step % 5) as u32,
        }
    }
    // changes every third step, so corrections keep arriving
    fn remote_input(step: i32) -> StubInput {
        StubInput {
            inp: (step / 3) as u32,
        }
    }

    let mut session = session_16_100();
    let local = session.add_player(PlayerKind::Local);
    let remote = session.add_player(PlayerKind::Remote);
    let mut host = GameStub::new();

    let mut delivered: i32 = 0;
    let mut guard = 0;
    while session.current_step() < Step::new(TARGET) {
        let current = session.current_step().as_i32();
        // duplicate local inputs on throttled ticks are silently dropped
        session
            .add_local_input(local, local_input(current), &mut host)
            .unwrap();
        while delivered <= current - LAG {
            assert!(session
                .add_remote_input(remote, Step::new(delivered), remote_input(delivered))
                .unwrap());
            delivered += 1;
        }
        session.update(16.0, &mut host).unwrap();
        guard += 1;
        assert!(guard < 1000);
    }

    // deliver the tail and resolve the final corrections
    while delivered < TARGET {
        session
            .add_remote_input(remote, Step::new(delivered), remote_input(delivered))
            .unwrap();
        delivered += 1;
    }
    session.update(0.0, &mut host).unwrap();

    let mut reference = StateStub::default();
    for s in 0..TARGET {
        reference.advance(&[local_input(s), remote_input(s)]);
    }
    assert_eq!(host.gs, reference);
    assert!(host.loads() > 0, "corrections should have caused rollbacks");
    assert!(session.check_invariants().is_ok());
}

#[test]
fn spectators_flow_through_input_gathering_as_default() {
    let mut session = session_16_100();
    let local = session.add_player(PlayerKind::Local);
    session.add_player(PlayerKind::Spectator);
    let mut host = GameStub::new();

    session
        .add_local_input(local, StubInput { inp: 4 }, &mut host)
        .unwrap();
    session.update(16.0, &mut host).unwrap();

    // two participants simulated: the local input plus the spectator default
    let mut reference = StateStub::default();
    reference.advance(&[StubInput { inp: 4 }, StubInput::default()]);
    assert_eq!(host.gs, reference);
}

#[test]
fn spectators_do_not_throttle_the_session() {
    let mut session = session_16_100();
    session.add_player(PlayerKind::Local);
    // an input-less spectator must not count as a trailing peer
    session.add_player(PlayerKind::Spectator);
    let mut host = GameStub::new();

    for _ in 0..20 {
        let report = session.update(16.0, &mut host).unwrap();
        assert!(report.advanced);
        assert_eq!(report.throttle_delay_ms, 0.0);
    }
    assert_eq!(session.current_step(), Step::new(20));
}
