use crate::state::feed::FeedError;
use crate::state::pump::PumpCommand;

pub trait PumpActuator {
    /// Hands the pump a complete command document (full replace, no partial update)
    fn execute(&mut self, command: PumpCommand) -> Result<(), FeedError>;
}
