//! Frame channel: the in-process link between caller and observer
//!
//! One command travels handler-ward, one observation tuple travels back,
//! strictly alternating. Back-pressure is inherent: the game does not
//! advance past a frame until the observer has a command to answer with.

use std::sync::mpsc::{Receiver, Sender, channel};

use fightice_core::{FightIceError, FrameMessage, Result, StepOutcome};

/// Create the two endpoints of a frame channel.
pub fn frame_channel() -> (CallerEndpoint, HandlerEndpoint) {
    let (command_tx, command_rx) = channel();
    let (frame_tx, frame_rx) = channel();
    (
        CallerEndpoint {
            command_tx,
            frame_rx,
        },
        HandlerEndpoint {
            command_rx,
            frame_tx,
        },
    )
}

/// Caller-side endpoint: sends `Reset`/`Step`, blocks for observations
pub struct CallerEndpoint {
    command_tx: Sender<FrameMessage>,
    frame_rx: Receiver<FrameMessage>,
}

impl CallerEndpoint {
    pub fn send(&self, msg: FrameMessage) -> Result<()> {
        self.command_tx
            .send(msg)
            .map_err(|_| FightIceError::ChannelClosed)
    }

    /// Block until the observer delivers the next observation tuple.
    pub fn recv(&self) -> Result<StepOutcome> {
        match self
            .frame_rx
            .recv()
            .map_err(|_| FightIceError::ChannelClosed)?
        {
            FrameMessage::Observation { outcome } => Ok(outcome),
            other => Err(FightIceError::Protocol(format!(
                "expected observation on frame channel, got {:?}",
                other
            ))),
        }
    }
}

/// Handler-side endpoint: receives commands, sends observation tuples
pub struct HandlerEndpoint {
    command_rx: Receiver<FrameMessage>,
    frame_tx: Sender<FrameMessage>,
}

impl HandlerEndpoint {
    /// Block for the caller's next `Reset` or `Step`.
    pub fn recv(&self) -> Result<FrameMessage> {
        match self
            .command_rx
            .recv()
            .map_err(|_| FightIceError::ChannelClosed)?
        {
            msg @ (FrameMessage::Reset | FrameMessage::Step { .. }) => Ok(msg),
            other => Err(FightIceError::Protocol(format!(
                "expected command on frame channel, got {:?}",
                other
            ))),
        }
    }

    pub fn send(&self, outcome: StepOutcome) -> Result<()> {
        self.frame_tx
            .send(FrameMessage::Observation { outcome })
            .map_err(|_| FightIceError::ChannelClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fightice_core::{ActionId, Observation, StepStatus};

    fn outcome(reward: f64) -> StepOutcome {
        StepOutcome {
            observation: Observation::Vector(vec![reward]),
            reward,
            status: StepStatus::Continuing,
            info: Default::default(),
        }
    }

    #[test]
    fn command_and_observation_alternate() {
        let (caller, handler) = frame_channel();

        caller.send(FrameMessage::Reset).unwrap();
        assert!(matches!(handler.recv().unwrap(), FrameMessage::Reset));
        handler.send(outcome(0.0)).unwrap();
        assert_eq!(caller.recv().unwrap().reward, 0.0);

        caller
            .send(FrameMessage::Step {
                action: ActionId::new(12).unwrap(),
            })
            .unwrap();
        match handler.recv().unwrap() {
            FrameMessage::Step { action } => assert_eq!(action.index(), 12),
            other => panic!("wrong command: {:?}", other),
        }
        handler.send(outcome(3.0)).unwrap();
        assert_eq!(caller.recv().unwrap().reward, 3.0);
    }

    #[test]
    fn dropped_handler_surfaces_channel_closed() {
        let (caller, handler) = frame_channel();
        drop(handler);

        match caller.send(FrameMessage::Reset) {
            Err(FightIceError::ChannelClosed) => {}
            other => panic!("expected closed channel, got {:?}", other),
        }
        match caller.recv() {
            Err(FightIceError::ChannelClosed) => {}
            other => panic!("expected closed channel, got {:?}", other),
        }
    }

    #[test]
    fn dropped_caller_unblocks_handler() {
        let (caller, handler) = frame_channel();

        let waiter = std::thread::spawn(move || handler.recv());
        drop(caller);

        match waiter.join().unwrap() {
            Err(FightIceError::ChannelClosed) => {}
            other => panic!("expected closed channel, got {:?}", other),
        }
    }
}
