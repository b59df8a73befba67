//! The daemon's control loop
//!
//! One event at a time: read, decode, dispatch, and run the selected
//! command to completion before the next read. A command that hangs stalls
//! input processing; events queue up in the kernel meanwhile.

use std::convert::Infallible;

use altshift_config::{CommandIndex, CommandTable};
use tokio::io::AsyncRead;

use crate::device::EventReader;
use crate::dispatcher::ModeDispatcher;
use crate::error::DaemonError;
use crate::event::KeyEvent;
use crate::runner::CommandRunner;

pub struct EventLoop<R, C> {
    reader: EventReader<R>,
    dispatcher: ModeDispatcher,
    commands: CommandTable,
    runner: C,
}

impl<R: AsyncRead + Unpin, C: CommandRunner> EventLoop<R, C> {
    pub fn new(
        reader: EventReader<R>,
        dispatcher: ModeDispatcher,
        commands: CommandTable,
        runner: C,
    ) -> Self {
        Self {
            reader,
            dispatcher,
            commands,
            runner,
        }
    }

    #[cfg(test)]
    pub fn dispatcher(&self) -> &ModeDispatcher {
        &self.dispatcher
    }

    /// Process a single raw event, returning the command that ran, if any.
    pub async fn step(&mut self) -> Result<Option<CommandIndex>, DaemonError> {
        let event = self.reader.next_event().await?;

        let Some(key_event) = KeyEvent::from_input_event(&event) else {
            return Ok(None);
        };

        let Some(index) = self.dispatcher.handle(key_event) else {
            return Ok(None);
        };

        let command = self.commands.get(index);
        tracing::info!("Switching to {} layout: {}", index, command);

        self.runner
            .run(command)
            .await
            .map_err(|source| DaemonError::Command {
                command: command.to_string(),
                source,
            })?;

        tracing::debug!("Modes now {:?}", self.dispatcher.modes());
        Ok(Some(index))
    }

    /// Process events until a fatal error occurs.
    pub async fn run(&mut self) -> Result<Infallible, DaemonError> {
        loop {
            self.step().await?;
        }
    }
}
