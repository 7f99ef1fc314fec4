use approx::assert_relative_eq;
use spatial_motion_core::timing::{resolve, seconds_to_wall, TimingState};

const DURATIONS: [f64; 5] = [0.5, 1.0, 2.5, 7.0, 10.0];

fn elapsed_at(seconds: f64, duration: f64, looping: bool, ping_pong: bool) -> (f64, u64, bool) {
    let state = TimingState::reset(0.0);
    let r = resolve(seconds_to_wall(seconds), duration, looping, ping_pong, &state);
    assert!(r.local_time >= 0.0 && r.local_time <= duration);
    (r.local_time, r.loop_count, r.is_reversed)
}

#[test]
fn one_shot_clamps_and_stops() {
    for d in DURATIONS {
        let state = TimingState::reset(250.0);
        let start = resolve(250.0, d, false, false, &state);
        assert_eq!(start.local_time, 0.0);
        assert!(!start.should_stop);

        let end = resolve(250.0 + seconds_to_wall(d), d, false, false, &state);
        assert_relative_eq!(end.local_time, d, epsilon = 1e-9);
        assert!(end.should_stop);

        let later = resolve(250.0 + seconds_to_wall(d * 3.0 + 0.1), d, false, false, &state);
        assert_eq!(later.local_time, d);
        assert!(later.should_stop);
    }
}

#[test]
fn looping_is_periodic() {
    for d in DURATIONS {
        for step in 1..20 {
            let e = d * step as f64 / 20.0;
            let (base, _, _) = elapsed_at(e, d, true, false);
            for k in 1..6 {
                let (shifted, count, reversed) = elapsed_at(e + k as f64 * d, d, true, false);
                assert_relative_eq!(shifted, base, epsilon = 1e-9);
                assert_eq!(count, k);
                assert!(!reversed);
            }
        }
    }
}

#[test]
fn ping_pong_alternates_every_duration() {
    for d in DURATIONS {
        for n in 0..8u64 {
            for frac in [0.1, 0.5, 0.9] {
                let e = (n as f64 + frac) * d;
                let (local, count, reversed) = elapsed_at(e, d, true, true);
                assert_eq!(count, n);
                assert_eq!(reversed, n % 2 == 1, "d={d} n={n}");
                let expected = if reversed { d - frac * d } else { frac * d };
                assert_relative_eq!(local, expected, epsilon = 1e-9);
            }
        }
    }
}

#[test]
fn pause_resume_matches_unpaused_timeline() {
    let d = 10.0;
    for (t1, t2, delta) in [(1.0, 4.0, 2.0), (3.25, 3.5, 0.25), (12.0, 40.0, 5.5)] {
        for (looping, ping_pong) in [(false, false), (true, false), (true, true)] {
            let unpaused = TimingState::reset(0.0);
            let mut state = unpaused;
            let before = resolve(seconds_to_wall(t1), d, looping, ping_pong, &unpaused);

            state.pause(seconds_to_wall(t1));
            for probe in [t1, (t1 + t2) / 2.0, t2] {
                let frozen = resolve(seconds_to_wall(probe), d, looping, ping_pong, &state);
                assert_eq!(frozen.local_time, before.local_time);
            }

            state.resume(seconds_to_wall(t2));
            let after = resolve(seconds_to_wall(t2 + delta), d, looping, ping_pong, &state);
            let reference = resolve(seconds_to_wall(t1 + delta), d, looping, ping_pong, &unpaused);
            assert_relative_eq!(after.local_time, reference.local_time, epsilon = 1e-9);
            assert_eq!(after.is_reversed, reference.is_reversed);
        }
    }
}

#[test]
fn next_state_is_unchanged_bookkeeping() {
    let mut state = TimingState::reset(0.0);
    state.pause(1_500.0);
    let r = resolve(9_000.0, 2.0, true, true, &state);
    assert_eq!(r.next_state, state);
}
