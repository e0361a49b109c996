//! Cards. Each is held by one faction and may be used once per game.

use tracing::{debug, info};

use crate::board::SpaceId;
use crate::core::{EngineState, FactionId};
use crate::handlers::{Dispatch, Flow, Handler, HandlerOwner, ReactionContext};
use crate::moves::{Choice, DecisionRequest, Move, RuleMove};
use crate::present::Notification;
use crate::turn::IMPULSE_ACTION;

use super::{hand_path, AMBUSH, ASSAULT_DECLARED, BUILD_MERCENARY, BUILD_REGULAR, EVENT_X, SPEND_CARD};

fn used_path(card: &str) -> String {
    format!("used.{card}")
}

fn is_used(state: &EngineState, card: &str) -> bool {
    state.path(&used_path(card)).is_some()
}

/// *Event X*: raise a regular and a mercenary at the holder's home, in
/// that order.
#[derive(Clone, Debug)]
pub struct EventX {
    holder: FactionId,
    home: SpaceId,
}

impl EventX {
    pub fn new(holder: FactionId, home: SpaceId) -> Self {
        Self { holder, home }
    }
}

impl Handler for EventX {
    fn owner(&self) -> HandlerOwner {
        HandlerOwner::card(EVENT_X)
    }

    fn opcodes(&self) -> &[&'static str] {
        &[EVENT_X]
    }

    fn decision_options(&self, request: &DecisionRequest, state: &EngineState) -> Vec<Choice> {
        let playable = request.faction == self.holder
            && request.purpose == IMPULSE_ACTION
            && state.path_int(&hand_path(&self.holder), 0) > 0
            && !is_used(state, EVENT_X);
        if !playable {
            return Vec::new();
        }
        let holder = self.holder.as_str();
        vec![Choice::new(
            format!("play {EVENT_X}"),
            vec![Move::rule(SPEND_CARD, [holder]), Move::rule(EVENT_X, [holder])],
        )]
    }

    fn on_popped(&self, cx: &mut Dispatch<'_>, depth: usize, _mv: &RuleMove) -> Flow {
        cx.finish(depth);
        cx.state.set_path(used_path(EVENT_X), self.holder.as_str());
        let (holder, home) = (self.holder.as_str(), self.home.as_str());
        cx.schedule(vec![
            Move::rule(BUILD_REGULAR, [holder, home]),
            Move::rule(BUILD_MERCENARY, [holder, home]),
        ]);
        Flow::Continue
    }
}

/// *Ambush*: when an assault is declared into a space the holder occupies,
/// the holder's controller may cancel the whole assault.
#[derive(Clone, Debug)]
pub struct Ambush {
    holder: FactionId,
}

impl Ambush {
    pub fn new(holder: FactionId) -> Self {
        Self { holder }
    }
}

impl Handler for Ambush {
    fn owner(&self) -> HandlerOwner {
        HandlerOwner::card(AMBUSH)
    }

    fn opcodes(&self) -> &[&'static str] {
        &[AMBUSH]
    }

    fn can_trigger(&self, ctx: &ReactionContext<'_>) -> bool {
        if ctx.event != ASSAULT_DECLARED || is_used(ctx.state, AMBUSH) {
            return false;
        }
        let Some(target) = ctx.args.get(2) else {
            return false;
        };
        ctx.state.seating.controller_of(&self.holder) == Some(ctx.participant)
            && ctx.state.space(&SpaceId::from(target.as_str())).units(&self.holder) > 0
    }

    fn menu_option(&self, _ctx: &ReactionContext<'_>) -> Option<Choice> {
        Some(Choice::single(AMBUSH, Move::rule(AMBUSH, [self.holder.as_str()])))
    }

    fn on_popped(&self, cx: &mut Dispatch<'_>, depth: usize, _mv: &RuleMove) -> Flow {
        cx.finish(depth);
        cx.state.set_path(used_path(AMBUSH), self.holder.as_str());

        let barrier = cx
            .queue
            .position(|m| matches!(m, Move::Barrier { event, .. } if event == ASSAULT_DECLARED));
        let Some(barrier) = barrier else {
            debug!("ambush played with no assault pending");
            return Flow::Continue;
        };
        let cancelled = cx
            .queue
            .remove_range_from(barrier + 1, |m| m.opcode().starts_with("assault_"));
        info!(holder = %self.holder, cancelled = cancelled.len(), "assault ambushed");
        cx.notify(Notification::Status(format!("{} ambushes the assault", self.holder)));
        Flow::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ParticipantId, Seating};
    use crate::moves::ChoiceDomain;
    use crate::queue::MoveQueue;

    fn state() -> EngineState {
        let mut seating = Seating::new(["north", "south"]);
        seating.seat("south", ParticipantId::new(1));
        EngineState::new(2, seating, 5)
    }

    fn opcodes(queue: &MoveQueue) -> Vec<String> {
        queue.iter_from_top().map(|m| m.opcode().to_string()).collect()
    }

    #[test]
    fn test_event_x_offered_once() {
        let mut state = state();
        let card = EventX::new("north".into(), "harbor".into());
        let request = DecisionRequest::new("north", ChoiceDomain::Action, IMPULSE_ACTION);
        assert!(card.decision_options(&request, &state).is_empty());

        state.set_path("hand.north", "2");
        let options = card.decision_options(&request, &state);
        assert_eq!(options.len(), 1);
        assert_eq!(options[0].moves.len(), 2);

        state.set_path(used_path(EVENT_X), "north");
        assert!(card.decision_options(&request, &state).is_empty());
    }

    #[test]
    fn test_event_x_schedules_builds_in_order() {
        let mut state = state();
        let mut queue: MoveQueue = [Move::rule(EVENT_X, ["north"]), Move::rule("later", Vec::<String>::new())]
            .into_iter()
            .collect();
        let mut notes = Vec::new();
        let rule = RuleMove::new(EVENT_X, ["north"]);
        let card = EventX::new("north".into(), "harbor".into());
        let flow = card.on_popped(&mut Dispatch::new(&mut state, &mut queue, &mut notes), 0, &rule);

        assert_eq!(flow, Flow::Continue);
        assert_eq!(opcodes(&queue), ["build_regular", "build_mercenary", "later"]);
    }

    #[test]
    fn test_ambush_triggers_for_holder_controller() {
        let mut state = state();
        state.update_space(&"fort".into(), |s| s.add_units(&"south".into(), 1));
        let args = ["north".to_string(), "keep".to_string(), "fort".to_string()];
        let card = Ambush::new("south".into());

        let ctx = |participant: u8, state: &EngineState| {
            card.can_trigger(&ReactionContext {
                event: ASSAULT_DECLARED,
                args: &args,
                participant: ParticipantId::new(participant),
                state,
            })
        };
        assert!(ctx(1, &state));
        assert!(!ctx(0, &state));

        state.set_path(used_path(AMBUSH), "south");
        assert!(!ctx(1, &state));
    }

    #[test]
    fn test_ambush_cancels_assault_beneath_barrier() {
        let mut state = state();
        let mut queue: MoveQueue = [
            Move::rule(AMBUSH, ["south"]),
            Move::barrier(ASSAULT_DECLARED, ["north", "keep", "fort"]),
            Move::rule("assault_roll", ["north", "keep", "fort"]),
            Move::rule("assault_casualties", ["north", "keep", "fort"]),
            Move::rule("impulse", Vec::<String>::new()),
        ]
        .into_iter()
        .collect();
        let mut notes = Vec::new();
        let rule = RuleMove::new(AMBUSH, ["south"]);
        Ambush::new("south".into()).on_popped(&mut Dispatch::new(&mut state, &mut queue, &mut notes), 0, &rule);

        assert_eq!(opcodes(&queue), ["barrier", "impulse"]);
        assert!(is_used(&state, AMBUSH));
        assert_eq!(notes.len(), 1);
    }
}
