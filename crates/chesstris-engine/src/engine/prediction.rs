//! Client-side optimistic application.
//!
//! A client applies its own commands immediately to a predicted copy of the
//! game and keeps them queued until the authority answers. The confirmed copy
//! only ever sees commands in authority order, so any rejection rolls the
//! prediction back to it and replays whatever is still pending.

use std::collections::VecDeque;

use super::{
    game::Game,
    protocol::{ActionResponse, Command},
};

#[derive(Debug, Clone)]
pub struct PredictedGame {
    confirmed: Game,
    predicted: Game,
    pending: VecDeque<Command>,
}

impl PredictedGame {
    #[must_use]
    pub fn new(confirmed: Game) -> Self {
        Self {
            predicted: confirmed.clone(),
            confirmed,
            pending: VecDeque::new(),
        }
    }

    /// Last state acknowledged by the authority.
    #[must_use]
    pub fn confirmed(&self) -> &Game {
        &self.confirmed
    }

    /// Confirmed state with every pending command applied on top.
    #[must_use]
    pub fn predicted(&self) -> &Game {
        &self.predicted
    }

    pub fn pending(&self) -> impl Iterator<Item = &Command> + '_ {
        self.pending.iter()
    }

    /// Applies a local command to the prediction. Commands the prediction
    /// already rejects are not queued.
    pub fn apply_local(&mut self, command: Command) -> ActionResponse {
        let response = self.predicted.apply(&command);
        if response.success {
            self.pending.push_back(command);
        }
        response
    }

    /// The authority accepted the oldest pending command.
    pub fn confirm(&mut self) -> Option<ActionResponse> {
        let command = self.pending.pop_front()?;
        let response = self.confirmed.apply(&command);
        if !response.success {
            // The authority's copy disagrees with ours; trust the order it saw.
            self.replay();
        }
        Some(response)
    }

    /// The authority rejected the oldest pending command: roll back and
    /// replay the rest.
    pub fn reject(&mut self) -> Option<Command> {
        let rejected = self.pending.pop_front()?;
        self.replay();
        Some(rejected)
    }

    /// A command from another client, in the order the authority applied it.
    pub fn observe(&mut self, command: &Command) -> ActionResponse {
        let response = self.confirmed.apply(command);
        self.replay();
        response
    }

    /// Replaces the confirmed state wholesale (e.g. after a reconnect) and
    /// drops every pending command.
    pub fn resync(&mut self, confirmed: Game) {
        self.predicted = confirmed.clone();
        self.confirmed = confirmed;
        self.pending.clear();
    }

    fn replay(&mut self) {
        self.predicted = self.confirmed.clone();
        let predicted = &mut self.predicted;
        self.pending.retain(|command| predicted.apply(command).success);
    }
}
