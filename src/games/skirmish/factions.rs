//! Faction rules: one handler per faction, plus the victory check.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::board::{Board, GraphBoard, SpaceId, SpaceState};
use crate::core::{EngineState, FactionId};
use crate::handlers::{Dispatch, Flow, Handler, HandlerOwner, OwnerKind};
use crate::moves::{Choice, ChoiceDomain, DecisionRequest, Move, RuleMove};
use crate::present::Notification;
use crate::turn::{CARD_DRAW, DEPLOYMENT, DIPLOMACY, IMPULSE_ACTION, VICTORY_CHECK, WINTER};

use super::{
    hand_path, treasury_path, treaty_path, ASSAULT_CASUALTIES, ASSAULT_DECLARE, ASSAULT_DECLARED, ASSAULT_ROLL,
    BUILD_MERCENARY, BUILD_REGULAR, HAND_LIMIT, MARCH, PEACE, SPEND_CARD,
};

/// Path holding the last assault roll.
const ROLL_PATH: &str = "assault.roll";

/// Rules for a single faction. Claims only moves whose first argument is
/// its own faction.
#[derive(Clone, Debug)]
pub struct FactionRules {
    faction: FactionId,
    home: SpaceId,
    board: Arc<GraphBoard>,
}

impl FactionRules {
    pub fn new(faction: FactionId, home: SpaceId, board: Arc<GraphBoard>) -> Self {
        Self { faction, home, board }
    }

    fn f(&self) -> &str {
        self.faction.as_str()
    }

    /// Spaces where a regular may be built: home, occupied spaces and their
    /// neighbors, in board order.
    fn build_sites(&self, state: &EngineState) -> Vec<SpaceId> {
        self.board
            .spaces()
            .into_iter()
            .filter(|s| {
                *s == self.home
                    || state.space(s).units(&self.faction) > 0
                    || self
                        .board
                        .neighbors(s)
                        .iter()
                        .any(|n| state.space(n).units(&self.faction) > 0)
            })
            .collect()
    }

    fn at_peace(state: &EngineState, a: &FactionId, b: &FactionId) -> bool {
        state.path(&treaty_path(a)) == Some(b.as_str()) || state.path(&treaty_path(b)) == Some(a.as_str())
    }

    /// Marches and assaults from every occupied space.
    fn impulse_options(&self, state: &EngineState) -> Vec<Choice> {
        let mut options = Vec::new();
        for from in self.board.spaces() {
            if state.space(&from).units(&self.faction) == 0 {
                continue;
            }
            for to in self.board.neighbors(&from) {
                let target = state.space(&to);
                let defenders: Vec<_> = target
                    .occupants
                    .keys()
                    .filter(|f| **f != self.faction)
                    .cloned()
                    .collect();
                let spend = Move::rule(SPEND_CARD, [self.f()]);
                if defenders.is_empty() {
                    options.push(Choice::new(
                        format!("march {from} {to}"),
                        vec![spend, Move::rule(MARCH, [self.f(), from.as_str(), to.as_str()])],
                    ));
                } else if !defenders.iter().any(|d| Self::at_peace(state, &self.faction, d)) {
                    options.push(Choice::new(
                        format!("assault {from} {to}"),
                        vec![spend, Move::rule(ASSAULT_DECLARE, [self.f(), from.as_str(), to.as_str()])],
                    ));
                }
            }
        }
        options
    }

    fn space_arg(mv: &RuleMove, index: usize) -> Option<SpaceId> {
        mv.arg(index).map(SpaceId::from)
    }

    fn build(&self, cx: &mut Dispatch<'_>, mv: &RuleMove, mercenary: bool) {
        let Some(space) = Self::space_arg(mv, 1) else {
            warn!(opcode = %mv.opcode, "build without a space");
            return;
        };
        if mercenary {
            let treasury = treasury_path(&self.faction);
            if cx.state.path_int(&treasury, 0) < 1 {
                warn!(faction = %self.faction, "cannot afford a mercenary; skipped");
                return;
            }
            cx.state.modify_path(&treasury, -1);
        }
        let faction = self.faction.clone();
        cx.state.update_space(&space, |s| {
            s.add_units(&faction, 1);
            settle(s);
        });
        cx.notify(Notification::SpaceChanged(space));
    }

    fn march(&self, cx: &mut Dispatch<'_>, mv: &RuleMove) {
        let (Some(from), Some(to)) = (Self::space_arg(mv, 1), Self::space_arg(mv, 2)) else {
            warn!("march needs two spaces");
            return;
        };
        let faction = self.faction.clone();
        let mut moved = 0;
        cx.state.update_space(&from, |s| {
            moved = s.remove_units(&faction, 1);
            settle(s);
        });
        if moved == 0 {
            debug!(%from, "nothing left to march");
            return;
        }
        cx.state.update_space(&to, |s| {
            s.add_units(&faction, moved);
            settle(s);
        });
        cx.notify(Notification::SpaceChanged(from));
        cx.notify(Notification::SpaceChanged(to));
    }

    fn assault_declare(&self, cx: &mut Dispatch<'_>, mv: &RuleMove) {
        let args: Vec<String> = mv.args.iter().cloned().collect();
        cx.schedule(vec![
            Move::rule(ASSAULT_ROLL, args.iter().map(String::as_str)),
            Move::rule(ASSAULT_CASUALTIES, args.iter().map(String::as_str)),
        ]);
        cx.post_barrier(ASSAULT_DECLARED, args);
    }

    fn assault_casualties(&self, cx: &mut Dispatch<'_>, mv: &RuleMove) {
        let (Some(from), Some(to)) = (Self::space_arg(mv, 1), Self::space_arg(mv, 2)) else {
            warn!("assault needs two spaces");
            return;
        };
        let roll = cx.state.path_int(ROLL_PATH, 0);
        cx.state.clear_path(ROLL_PATH);

        let order = cx.state.seating.factions().to_vec();
        let target = cx.state.space(&to);
        let defender = order
            .iter()
            .find(|f| **f != self.faction && target.units(f) > 0)
            .cloned();

        let Some(defender) = defender else {
            debug!(%to, "defenders already gone");
            return;
        };
        if roll >= 4 {
            let mut cleared = false;
            cx.state.update_space(&to, |s| {
                s.remove_units(&defender, 1);
                cleared = s.occupants.iter().all(|(f, _)| *f == self.faction);
            });
            if cleared {
                let faction = self.faction.clone();
                let mut advanced = 0;
                cx.state.update_space(&from, |s| {
                    advanced = s.remove_units(&faction, 1);
                    settle(s);
                });
                cx.state.update_space(&to, |s| s.add_units(&faction, advanced));
            }
            cx.state.update_space(&to, settle);
        } else {
            let faction = self.faction.clone();
            cx.state.update_space(&from, |s| {
                s.remove_units(&faction, 1);
                settle(s);
            });
        }
        info!(attacker = %self.faction, %defender, roll, "assault resolved");
        cx.notify(Notification::SpaceChanged(from));
        cx.notify(Notification::SpaceChanged(to));
    }

    fn winter(&self, cx: &mut Dispatch<'_>) {
        cx.state.set_path(hand_path(&self.faction), "0");
        let controlled = cx
            .state
            .touched_spaces()
            .filter(|(_, s)| s.controller.as_ref() == Some(&self.faction))
            .count() as i64;
        cx.state.modify_path(&treasury_path(&self.faction), controlled);
    }
}

/// Give a space to its only occupant; contested or empty spaces keep their
/// controller.
pub(super) fn settle(space: &mut SpaceState) {
    let mut present = space.occupants.iter().filter(|(_, n)| **n > 0).map(|(f, _)| f);
    if let (Some(only), None) = (present.next(), present.next()) {
        space.controller = Some(only.clone());
    }
}

impl Handler for FactionRules {
    fn owner(&self) -> HandlerOwner {
        HandlerOwner::faction(self.f())
    }

    fn opcodes(&self) -> &[&'static str] {
        &[
            CARD_DRAW,
            DIPLOMACY,
            DEPLOYMENT,
            WINTER,
            SPEND_CARD,
            BUILD_REGULAR,
            BUILD_MERCENARY,
            MARCH,
            ASSAULT_DECLARE,
            ASSAULT_ROLL,
            ASSAULT_CASUALTIES,
        ]
    }

    fn decision_options(&self, request: &DecisionRequest, state: &EngineState) -> Vec<Choice> {
        if request.faction != self.faction {
            return Vec::new();
        }
        match request.purpose.as_str() {
            BUILD_REGULAR => self
                .build_sites(state)
                .into_iter()
                .map(|s| Choice::single(s.as_str(), Move::rule(BUILD_REGULAR, [self.f(), s.as_str()])))
                .collect(),
            PEACE => {
                let path = treaty_path(&self.faction);
                let mut options = vec![Choice::single("none", Move::set(path.clone(), "none"))];
                options.extend(
                    state
                        .seating
                        .factions()
                        .iter()
                        .filter(|f| **f != self.faction)
                        .map(|f| Choice::single(format!("peace {f}"), Move::set(path.clone(), f.as_str()))),
                );
                options
            }
            IMPULSE_ACTION if state.path_int(&hand_path(&self.faction), 0) > 0 => self.impulse_options(state),
            _ => Vec::new(),
        }
    }

    fn on_popped(&self, cx: &mut Dispatch<'_>, depth: usize, mv: &RuleMove) -> Flow {
        if mv.arg(0) != Some(self.f()) {
            return Flow::Unclaimed;
        }
        match mv.opcode.as_str() {
            CARD_DRAW => {
                let path = hand_path(&self.faction);
                let hand = (cx.state.path_int(&path, 0) + 2).min(HAND_LIMIT);
                cx.state.set_path(path, hand.to_string());
                cx.finish(depth)
            }
            DIPLOMACY => {
                cx.finish(depth);
                cx.decide(DecisionRequest::new(self.faction.clone(), ChoiceDomain::Faction, PEACE));
                Flow::Continue
            }
            DEPLOYMENT => {
                cx.finish(depth);
                cx.decide(DecisionRequest::new(self.faction.clone(), ChoiceDomain::Space, BUILD_REGULAR));
                Flow::Continue
            }
            WINTER => {
                self.winter(cx);
                cx.finish(depth)
            }
            SPEND_CARD => {
                let path = hand_path(&self.faction);
                let hand = (cx.state.path_int(&path, 0) - 1).max(0);
                cx.state.set_path(path, hand.to_string());
                cx.finish(depth)
            }
            BUILD_REGULAR | BUILD_MERCENARY => {
                self.build(cx, mv, mv.opcode == BUILD_MERCENARY);
                cx.finish(depth)
            }
            MARCH => {
                self.march(cx, mv);
                cx.finish(depth)
            }
            ASSAULT_DECLARE => {
                cx.finish(depth);
                self.assault_declare(cx, mv);
                Flow::Continue
            }
            ASSAULT_ROLL => {
                let roll = cx.state.rng.roll(6);
                cx.state.set_path(ROLL_PATH, roll.to_string());
                cx.finish(depth)
            }
            ASSAULT_CASUALTIES => {
                self.assault_casualties(cx, mv);
                cx.finish(depth)
            }
            _ => Flow::Unclaimed,
        }
    }
}

/// Declares the first faction (in impulse order) that controls enough
/// spaces the winner.
#[derive(Clone, Copy, Debug)]
pub struct VictoryRules {
    target: usize,
}

impl VictoryRules {
    pub const fn new(target: usize) -> Self {
        Self { target }
    }
}

impl Handler for VictoryRules {
    fn owner(&self) -> HandlerOwner {
        HandlerOwner::new(OwnerKind::Engine, "victory")
    }

    fn opcodes(&self) -> &[&'static str] {
        &[VICTORY_CHECK]
    }

    fn on_popped(&self, cx: &mut Dispatch<'_>, depth: usize, _mv: &RuleMove) -> Flow {
        let winner = cx.state.seating.factions().iter().find(|f| {
            cx.state
                .touched_spaces()
                .filter(|(_, s)| s.controller.as_ref() == Some(*f))
                .count()
                >= self.target
        });
        if let Some(winner) = winner.cloned() {
            info!(%winner, "victory");
            cx.notify(Notification::Status(format!("{winner} wins")));
            cx.state.winner = Some(winner);
        }
        cx.finish(depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Seating;
    use crate::queue::MoveQueue;

    fn board() -> Arc<GraphBoard> {
        Arc::new(GraphBoard::new().with_edge("harbor", "keep").with_edge("keep", "fort"))
    }

    fn north() -> FactionRules {
        FactionRules::new("north".into(), "harbor".into(), board())
    }

    fn state() -> EngineState {
        EngineState::new(1, Seating::new(["north", "south"]), 3)
    }

    fn pop(handler: &dyn Handler, state: &mut EngineState, mv: Move) -> (Flow, MoveQueue) {
        let mut queue: MoveQueue = [mv.clone()].into_iter().collect();
        let mut notes = Vec::new();
        let rule = mv.as_rule().cloned().unwrap();
        let flow = {
            let mut cx = Dispatch::new(state, &mut queue, &mut notes);
            handler.on_popped(&mut cx, 0, &rule)
        };
        (flow, queue)
    }

    #[test]
    fn test_claims_only_own_faction() {
        let mut state = state();
        let (flow, queue) = pop(&north(), &mut state, Move::rule(CARD_DRAW, ["south"]));
        assert_eq!(flow, Flow::Unclaimed);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_card_draw_respects_limit() {
        let mut state = state();
        for _ in 0..3 {
            pop(&north(), &mut state, Move::rule(CARD_DRAW, ["north"]));
        }
        assert_eq!(state.path_int("hand.north", 0), HAND_LIMIT);
    }

    #[test]
    fn test_build_sites_grow_with_units() {
        let mut state = state();
        let rules = north();
        assert_eq!(rules.build_sites(&state), vec![SpaceId::from("harbor")]);

        pop(&rules, &mut state, Move::rule(BUILD_REGULAR, ["north", "harbor"]));
        let sites: Vec<_> = rules.build_sites(&state).into_iter().map(|s| s.0).collect();
        assert_eq!(sites, ["harbor", "keep"]);
        assert_eq!(state.space(&"harbor".into()).controller, Some("north".into()));
    }

    #[test]
    fn test_mercenary_needs_coin() {
        let mut state = state();
        pop(&north(), &mut state, Move::rule(BUILD_MERCENARY, ["north", "harbor"]));
        assert_eq!(state.space(&"harbor".into()).units(&"north".into()), 0);

        state.set_path("treasury.north", "1");
        pop(&north(), &mut state, Move::rule(BUILD_MERCENARY, ["north", "harbor"]));
        assert_eq!(state.space(&"harbor".into()).units(&"north".into()), 1);
        assert_eq!(state.path_int("treasury.north", -1), 0);
    }

    #[test]
    fn test_impulse_options_march_and_assault() {
        let mut state = state();
        state.set_path("hand.north", "1");
        state.update_space(&"keep".into(), |s| s.add_units(&"north".into(), 1));
        state.update_space(&"fort".into(), |s| s.add_units(&"south".into(), 1));

        let request = DecisionRequest::new("north", ChoiceDomain::Action, IMPULSE_ACTION);
        let labels: Vec<_> = north()
            .decision_options(&request, &state)
            .into_iter()
            .map(|c| c.label)
            .collect();
        assert_eq!(labels, ["march keep harbor", "assault keep fort"]);

        state.set_path("treaty.south", "north");
        let labels: Vec<_> = north()
            .decision_options(&request, &state)
            .into_iter()
            .map(|c| c.label)
            .collect();
        assert_eq!(labels, ["march keep harbor"]);
    }

    #[test]
    fn test_no_impulse_options_without_cards() {
        let mut state = state();
        state.update_space(&"keep".into(), |s| s.add_units(&"north".into(), 1));
        let request = DecisionRequest::new("north", ChoiceDomain::Action, IMPULSE_ACTION);
        assert!(north().decision_options(&request, &state).is_empty());
    }

    #[test]
    fn test_assault_declare_posts_barrier() {
        let mut state = state();
        let (_, queue) = pop(&north(), &mut state, Move::rule(ASSAULT_DECLARE, ["north", "keep", "fort"]));
        let tags: Vec<_> = queue.iter_from_top().map(Move::opcode).collect();
        assert_eq!(tags, ["reset_confirm", "barrier", "assault_roll", "assault_casualties"]);
    }

    #[test]
    fn test_assault_casualties() {
        let mut state = state();
        state.update_space(&"keep".into(), |s| s.add_units(&"north".into(), 2));
        state.update_space(&"fort".into(), |s| s.add_units(&"south".into(), 1));

        state.set_path(ROLL_PATH, "6");
        pop(&north(), &mut state, Move::rule(ASSAULT_CASUALTIES, ["north", "keep", "fort"]));
        let fort = state.space(&"fort".into());
        assert_eq!(fort.units(&"south".into()), 0);
        assert_eq!(fort.units(&"north".into()), 1);
        assert_eq!(fort.controller, Some("north".into()));
        assert_eq!(state.space(&"keep".into()).units(&"north".into()), 1);
        assert_eq!(state.path(ROLL_PATH), None);

        state.update_space(&"fort".into(), |s| s.add_units(&"south".into(), 1));
        state.set_path(ROLL_PATH, "1");
        pop(&north(), &mut state, Move::rule(ASSAULT_CASUALTIES, ["north", "keep", "fort"]));
        assert_eq!(state.space(&"keep".into()).units(&"north".into()), 0);
        assert_eq!(state.space(&"fort".into()).units(&"south".into()), 1);
    }

    #[test]
    fn test_winter_pays_and_discards() {
        let mut state = state();
        state.set_path("hand.north", "3");
        pop(&north(), &mut state, Move::rule(BUILD_REGULAR, ["north", "harbor"]));
        pop(&north(), &mut state, Move::rule(WINTER, ["north"]));
        assert_eq!(state.path_int("hand.north", -1), 0);
        assert_eq!(state.path_int("treasury.north", 0), 1);
    }

    #[test]
    fn test_victory() {
        let mut state = state();
        for s in ["a", "b"] {
            state.update_space(&s.into(), |sp| {
                sp.add_units(&"south".into(), 1);
                settle(sp);
            });
        }
        pop(&VictoryRules::new(3), &mut state, Move::rule(VICTORY_CHECK, Vec::<String>::new()));
        assert_eq!(state.winner, None);

        pop(&VictoryRules::new(2), &mut state, Move::rule(VICTORY_CHECK, Vec::<String>::new()));
        assert_eq!(state.winner, Some("south".into()));
    }

    #[test]
    fn test_settle() {
        let mut space = SpaceState::default();
        space.add_units(&"north".into(), 1);
        settle(&mut space);
        assert_eq!(space.controller, Some("north".into()));

        space.add_units(&"south".into(), 1);
        settle(&mut space);
        assert_eq!(space.controller, Some("north".into()));
    }
}
