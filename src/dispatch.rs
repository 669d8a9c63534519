use serde::Deserialize;
use tracing::debug;

use crate::error::{OutputError, Result};
use crate::instance::{InstanceContext, Toggle};

/// The only command group this output understands. Other groups are
/// reserved and ignored.
pub const GENERIC_GROUP: u32 = 1001;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputCommand {
    Backward,
    Forward,
    Stand,
    Left,
    Right,
    ToggleAuto,
    ToggleContinue,
}

impl OutputCommand {
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            1 => Some(OutputCommand::Backward),
            2 => Some(OutputCommand::Forward),
            3 => Some(OutputCommand::Stand),
            4 => Some(OutputCommand::Left),
            5 => Some(OutputCommand::Right),
            6 => Some(OutputCommand::ToggleAuto),
            7 => Some(OutputCommand::ToggleContinue),
            _ => None,
        }
    }

    pub fn code(&self) -> u32 {
        match self {
            OutputCommand::Backward => 1,
            OutputCommand::Forward => 2,
            OutputCommand::Stand => 3,
            OutputCommand::Left => 4,
            OutputCommand::Right => 5,
            OutputCommand::ToggleAuto => 6,
            OutputCommand::ToggleContinue => 7,
        }
    }

    fn toggle(&self) -> Option<Toggle> {
        match self {
            OutputCommand::ToggleAuto => Some(Toggle::Auto),
            OutputCommand::ToggleContinue => Some(Toggle::Continue),
            _ => None,
        }
    }
}

/// Byte written to the command channel for every command.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct SymbolMap {
    pub backward: char,
    pub forward: char,
    pub stand: char,
    pub left: char,
    pub right: char,
    pub toggle_auto: char,
    pub toggle_continue: char,
}

impl Default for SymbolMap {
    fn default() -> Self {
        Self {
            backward: 'b',
            forward: 'f',
            stand: 's',
            left: 'l',
            right: 'r',
            toggle_auto: 'z',
            toggle_continue: 'x',
        }
    }
}

impl SymbolMap {
    /// Checks that every symbol is a non-zero ascii character and packs the
    /// map into the table the dispatcher writes from.
    pub fn resolve(&self) -> Result<CommandSymbols> {
        let all = [
            self.backward,
            self.forward,
            self.stand,
            self.left,
            self.right,
            self.toggle_auto,
            self.toggle_continue,
        ];

        let mut table = [0u8; 7];
        for (slot, ch) in table.iter_mut().zip(all) {
            *slot = match u8::try_from(ch) {
                Ok(byte) if byte.is_ascii() && byte != 0 => byte,
                _ => {
                    return Err(OutputError::InvalidConfig(format!(
                        "command symbol {:?} is not a non-zero ascii character",
                        ch
                    )));
                }
            };
        }

        Ok(CommandSymbols(table))
    }
}

/// Validated command alphabet, one byte per [`OutputCommand`].
///
/// Only obtainable through [`SymbolMap::resolve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandSymbols([u8; 7]);

impl CommandSymbols {
    pub fn symbol(&self, cmd: OutputCommand) -> u8 {
        // codes are 1..=7
        self.0[cmd.code() as usize - 1]
    }
}

impl Default for CommandSymbols {
    fn default() -> Self {
        Self(*b"bfslrzx")
    }
}

impl InstanceContext {
    /// Translates a command into a single symbol on the command channel.
    ///
    /// Returns the new toggle state (0 or 1) for toggle commands and 0 for
    /// everything else, including unknown groups and commands which are
    /// ignored without touching the channel. A failed send does not undo a
    /// toggle flip.
    pub fn dispatch(&self, command: u32, group: u32, value: i32) -> Result<i32> {
        debug!(
            instance_id = self.id,
            "command ({}, value: {}) for group {} triggered", command, value, group
        );

        let channel = &self.config.channel;
        if !channel.is_available() {
            return Err(OutputError::ChannelUnavailable(self.id));
        }

        if group != GENERIC_GROUP {
            return Ok(0);
        }

        let Some(cmd) = OutputCommand::from_code(command) else {
            return Ok(0);
        };

        let rc = match cmd.toggle() {
            Some(toggle) => self.config.flip(toggle) as i32,
            None => 0,
        };

        let symbol = self.config.symbols.symbol(cmd);
        channel
            .send(symbol)
            .map_err(|err| self.channel_error(err))?;

        debug!(instance_id = self.id, "wrote {:?} to named pipe", symbol as char);

        Ok(rc)
    }
}
