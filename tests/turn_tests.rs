//! Turn sequencing integration tests.
//!
//! Fully automatic sessions of the sample game with a single participant,
//! who only has to acknowledge barriers.

use rust_lockstep::core::{EngineConfig, Phase};
use rust_lockstep::games::skirmish::Skirmish;
use rust_lockstep::moves::Move;
use rust_lockstep::present::Notification;
use rust_lockstep::replica::{Replica, Status};
use rust_lockstep::ParticipantId;

fn automatic(game: &Skirmish, config: EngineConfig) -> Replica {
    let setup = game.setup(1, &[]).with_config(config);
    Replica::new(&setup, ParticipantId::new(0), game.handlers())
}

/// Acknowledge barriers until the replica stops asking.
fn drive(replica: &mut Replica) -> Status {
    for _ in 0..10_000 {
        match replica.status() {
            Status::Confirm { .. } => {
                let record = replica.acknowledge().unwrap();
                replica.receive(record).unwrap();
            }
            Status::BudgetExhausted { .. } => {
                replica.resume();
            }
            status => return status,
        }
    }
    replica.status()
}

// =============================================================================
// Impulse Loop
// =============================================================================

/// Test that an action phase where nobody holds cards ends after one pass
/// each, with no random draws.
#[test]
fn test_all_pass_ends_action_phase() {
    let game = Skirmish::standard();
    let mut replica = automatic(&game, EngineConfig::default());

    let status = replica.start_with(vec![Move::Phase(Phase::Action)]);

    assert_eq!(status, Status::Idle);
    assert_eq!(replica.state().phase, Phase::Action);
    assert!(replica.state().all_passed());
    assert_eq!(replica.state().rng.draws(), 0);
}

/// Test that the impulse loop stops without spinning, leaving the rest of
/// the round to run.
#[test]
fn test_all_pass_then_next_phase() {
    let game = Skirmish::standard();
    let mut replica = automatic(&game, EngineConfig::default());

    replica.start_with(vec![Move::Phase(Phase::Action), Move::Phase(Phase::Winter)]);

    assert_eq!(replica.state().phase, Phase::Winter);
    let phases: Vec<Phase> = replica
        .drain_notifications()
        .into_iter()
        .filter_map(|n| match n {
            Notification::PhaseChanged { phase, .. } => Some(phase),
            _ => None,
        })
        .collect();
    assert_eq!(phases, [Phase::Action, Phase::Winter]);
}

// =============================================================================
// Rounds
// =============================================================================

/// Test that an automatic game ends, either by victory or after the last
/// round.
#[test]
fn test_game_finishes() {
    let game = Skirmish::standard();
    let mut replica = automatic(&game, EngineConfig::default().with_max_rounds(2).with_seed(9));
    replica.start();

    assert_eq!(drive(&mut replica), Status::Finished);
    let state = replica.state();
    assert_eq!(state.phase, Phase::GameOver);
    assert!(state.round <= 2);
    assert!(state.winner.is_some() || state.round == 2);
}

/// Test that every round draws cards and pays winter income.
#[test]
fn test_round_economy() {
    let game = Skirmish::standard();
    let mut replica = automatic(&game, EngineConfig::default().with_max_rounds(1));
    replica.start();
    drive(&mut replica);

    let state = replica.state();
    for faction in game.factions() {
        assert_eq!(state.path_int(&format!("hand.{faction}"), -1), 0);
        let controlled = state
            .touched_spaces()
            .filter(|(_, s)| s.controller.as_ref() == Some(faction))
            .count() as i64;
        assert_eq!(state.path_int(&format!("treasury.{faction}"), 0), controlled);
    }
}
