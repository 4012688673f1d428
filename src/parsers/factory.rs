//! # Parser Factory
//!
//! Parsers are registered in a compile-time table, one entry per long poll,
//! holding the command, its protocol group and a constructor. Each client
//! builds its own [`ParserFactory`] from the table, keeping only parsers in
//! the groups it is configured for (per-client parsers always load).
//!
//! After construction a business handler can be injected per command with
//! [`ParserFactory::inject_handler`], typed by the long poll definition so a
//! handler can only ever see its own request shape.

use std::collections::HashMap;
use std::sync::Arc;

use super::bonus::InitiateLegacyBonusPay;
use super::control::{
    ConfigureBillDenominations, DisableBillAcceptor, EnableBillAcceptor, EnterMaintenanceMode,
    ExitMaintenanceMode, Shutdown, SoundOff, SoundOn, Startup,
};
use super::datetime::{CurrentDateAndTime, ReceiveDateAndTime};
use super::eft::EftTransferToGamingMachine;
use super::meters::{
    CurrentCredits, GamesPlayed, GamingMachineIdAndInformation, SasVersionAndSerialNumber,
    TotalCanceledCredits, TotalCoinIn, TotalCoinOut, TotalDrop, TotalJackpot,
};
use super::progressive::SingleLevelProgressiveBroadcast;
use super::validation::EnhancedValidationInformation;
use super::{LongPollDefinition, LongPollParser, Parser, UnhandledParser};
use crate::config::{SasClientConfig, SasGroups};
use crate::error::SasError;
use crate::sas::registry::LongPoll;

/// One entry of the registration table.
#[derive(Clone, Copy)]
pub struct ParserRegistration {
    pub command: LongPoll,
    pub group: SasGroups,
    pub construct: fn(&SasClientConfig) -> Arc<dyn LongPollParser>,
}

impl std::fmt::Debug for ParserRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParserRegistration")
            .field("command", &self.command)
            .field("group", &self.group)
            .finish()
    }
}

macro_rules! registrations {
    (@construct $def:ident) => {
        |_config| Arc::new(Parser::new($def))
    };
    (@construct $def:ident, $build:path) => {
        |config| Arc::new(Parser::new($build(config)))
    };
    ($($def:ident $(=> $build:path)?),* $(,)?) => {
        &[
            $(
                ParserRegistration {
                    command: <$def as LongPollDefinition>::COMMAND,
                    group: <$def as LongPollDefinition>::GROUP,
                    construct: registrations!(@construct $def $(, $build)?),
                },
            )*
        ]
    };
}

/// Every long poll parser the crate provides.
pub static PARSER_REGISTRATIONS: &[ParserRegistration] = registrations![
    Shutdown,
    Startup,
    SoundOff,
    SoundOn,
    EnableBillAcceptor,
    DisableBillAcceptor,
    ConfigureBillDenominations,
    EnterMaintenanceMode,
    ExitMaintenanceMode,
    TotalCanceledCredits,
    TotalCoinIn,
    TotalCoinOut,
    TotalDrop,
    TotalJackpot,
    GamesPlayed,
    CurrentCredits,
    GamingMachineIdAndInformation,
    EnhancedValidationInformation,
    SasVersionAndSerialNumber,
    EftTransferToGamingMachine,
    CurrentDateAndTime,
    ReceiveDateAndTime,
    SingleLevelProgressiveBroadcast,
    InitiateLegacyBonusPay => InitiateLegacyBonusPay::from_config,
];

/// Parsers loaded for one client, keyed by command byte.
pub struct ParserFactory {
    parsers: HashMap<u8, Arc<dyn LongPollParser>>,
}

impl ParserFactory {
    /// Loads every registered parser whose group is configured.
    pub fn new(config: &SasClientConfig) -> Self {
        Self::from_registrations(config, PARSER_REGISTRATIONS)
    }

    pub fn from_registrations(config: &SasClientConfig, table: &[ParserRegistration]) -> Self {
        let mut factory = Self::empty();
        for entry in table {
            let wanted = entry.group.contains(SasGroups::PER_CLIENT)
                || config.groups.intersects(entry.group);
            if wanted {
                factory.insert_parser((entry.construct)(config));
            }
        }
        log::debug!(
            target: "sas::client",
            "client {} loaded {} long poll parsers",
            config.client_id,
            factory.parsers.len()
        );
        factory
    }

    pub fn empty() -> Self {
        ParserFactory {
            parsers: HashMap::new(),
        }
    }

    /// Parser for `command`; unregistered commands get a parser that never answers.
    pub fn get(&self, command: u8) -> Arc<dyn LongPollParser> {
        self.parsers
            .get(&command)
            .cloned()
            .unwrap_or_else(|| Arc::new(UnhandledParser::new(command)))
    }

    pub fn is_registered(&self, command: u8) -> bool {
        self.parsers.contains_key(&command)
    }

    /// Registered commands, ascending.
    pub fn commands(&self) -> Vec<u8> {
        let mut commands: Vec<u8> = self.parsers.keys().copied().collect();
        commands.sort_unstable();
        commands
    }

    /// Installs a single parser, replacing any parser for the same command.
    pub fn insert_parser(&mut self, parser: Arc<dyn LongPollParser>) {
        self.parsers.insert(parser.command(), parser);
    }

    /// Attaches the business handler for `D`'s command.
    ///
    /// Fails when no parser is loaded for the command, or when the loaded
    /// parser is not a `Parser<D>` (e.g. replaced through
    /// [`insert_parser`](Self::insert_parser)).
    pub fn inject_handler<D, F>(&self, handler: F) -> Result<(), SasError>
    where
        D: LongPollDefinition,
        F: Fn(D::Request) -> D::Response + Send + Sync + 'static,
    {
        let command = D::COMMAND.code();
        let parser = self
            .parsers
            .get(&command)
            .ok_or(SasError::ParserNotRegistered(command))?;
        let typed = parser
            .as_any()
            .downcast_ref::<Parser<D>>()
            .ok_or(SasError::HandlerTypeMismatch(command))?;
        typed.set_handler(handler);
        Ok(())
    }
}

impl std::fmt::Debug for ParserFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParserFactory")
            .field("commands", &self.commands())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::calculate_and_append_crc;
    use crate::parsers::AckResponse;

    #[test]
    fn test_table_has_unique_commands() {
        let mut seen = std::collections::HashSet::new();
        for entry in PARSER_REGISTRATIONS {
            assert!(seen.insert(entry.command), "{:?} registered twice", entry.command);
            assert!(entry.command.info().is_supported());
        }
    }

    #[test]
    fn test_group_filtering() {
        let config = SasClientConfig {
            groups: SasGroups::VALIDATION,
            ..Default::default()
        };
        let factory = ParserFactory::new(&config);
        assert!(factory.is_registered(0x4D));
        assert!(!factory.is_registered(0x01));
        assert!(!factory.is_registered(0x69));
    }

    #[test]
    fn test_unregistered_command_is_silent() {
        let factory = ParserFactory::new(&SasClientConfig::default());
        assert!(!factory.is_registered(0x99));
        assert_eq!(factory.get(0x99).parse(&[0x01, 0x99]), None);
    }

    #[test]
    fn test_inject_handler() {
        let factory = ParserFactory::new(&SasClientConfig::default());
        factory
            .inject_handler::<Shutdown, _>(|()| AckResponse::Ack)
            .unwrap();
        let frame = calculate_and_append_crc(&[0x01, 0x01]);
        assert_eq!(factory.get(0x01).parse(&frame), Some(vec![0x01]));
    }

    #[test]
    fn test_inject_errors() {
        let mut factory = ParserFactory::empty();
        assert!(matches!(
            factory.inject_handler::<Shutdown, _>(|()| AckResponse::Ack),
            Err(SasError::ParserNotRegistered(0x01))
        ));

        // A different parser type installed under the same command.
        factory.insert_parser(Arc::new(UnhandledParser::new(0x01)));
        assert!(matches!(
            factory.inject_handler::<Shutdown, _>(|()| AckResponse::Ack),
            Err(SasError::HandlerTypeMismatch(0x01))
        ));
    }
}
