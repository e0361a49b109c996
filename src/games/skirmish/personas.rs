//! Personas: named leaders that give their faction an extra impulse option.

use crate::board::SpaceId;
use crate::core::{EngineState, FactionId};
use crate::handlers::{Dispatch, Flow, Handler, HandlerOwner};
use crate::moves::{Choice, DecisionRequest, Move, RuleMove};
use crate::present::Notification;
use crate::turn::IMPULSE_ACTION;

use super::{hand_path, CONVERT, SPEND_CARD};

/// Flag set on converted spaces.
pub const REFORMED: &str = "reformed";

/// *The Reformer*: spend a card to convert a space the holder controls.
/// Each space converts once.
#[derive(Clone, Debug)]
pub struct Reformer {
    holder: FactionId,
}

impl Reformer {
    pub fn new(holder: FactionId) -> Self {
        Self { holder }
    }
}

impl Handler for Reformer {
    fn owner(&self) -> HandlerOwner {
        HandlerOwner::persona("reformer")
    }

    fn opcodes(&self) -> &[&'static str] {
        &[CONVERT]
    }

    fn decision_options(&self, request: &DecisionRequest, state: &EngineState) -> Vec<Choice> {
        if request.faction != self.holder
            || request.purpose != IMPULSE_ACTION
            || state.path_int(&hand_path(&self.holder), 0) < 1
        {
            return Vec::new();
        }
        let holder = self.holder.as_str();
        state
            .touched_spaces()
            .filter(|(_, s)| s.controller.as_ref() == Some(&self.holder) && !s.has_flag(REFORMED))
            .map(|(space, _)| {
                Choice::new(
                    format!("{CONVERT} {space}"),
                    vec![Move::rule(SPEND_CARD, [holder]), Move::rule(CONVERT, [holder, space.as_str()])],
                )
            })
            .collect()
    }

    fn on_popped(&self, cx: &mut Dispatch<'_>, depth: usize, mv: &RuleMove) -> Flow {
        if let Some(space) = mv.arg(1).map(SpaceId::from) {
            cx.state.update_space(&space, |s| {
                s.flags.insert(REFORMED.to_string());
            });
            cx.notify(Notification::SpaceChanged(space));
        }
        cx.finish(depth)
    }
}
