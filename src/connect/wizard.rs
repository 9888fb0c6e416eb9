//! Staged channel construction: start, name, attach locations, persist, end.

use thiserror::Error;

use crate::models::{Channel, Location, Module, NewChannel};
use crate::storage::{Storage, StorageError};

#[derive(Debug, Error)]
pub enum WizardError {
    #[error("cannot {step} while the channel wizard is {state}")]
    OutOfSequence {
        step: &'static str,
        state: &'static str,
    },
    #[error("a channel needs at least one location before it can be persisted")]
    NoLocations,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// A persisted channel together with the locations attached to it.
#[derive(Debug, Clone)]
pub struct ChannelWithLocations {
    pub channel: Channel,
    pub locations: Vec<Location>,
}

#[derive(Debug)]
enum WizardState {
    Started,
    Named {
        name: String,
    },
    Locating {
        name: String,
        locations: Vec<Location>,
    },
    Persisted(ChannelWithLocations),
}

impl WizardState {
    fn label(&self) -> &'static str {
        match self {
            WizardState::Started => "started",
            WizardState::Named { .. } => "named",
            WizardState::Locating { .. } => "collecting locations",
            WizardState::Persisted(_) => "persisted",
        }
    }
}

#[derive(Debug)]
pub struct ChannelWizard {
    module: Module,
    state: WizardState,
}

impl ChannelWizard {
    pub fn start(module: Module) -> Self {
        Self {
            module,
            state: WizardState::Started,
        }
    }

    pub fn module(&self) -> Module {
        self.module
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> Result<(), WizardError> {
        match &self.state {
            WizardState::Started | WizardState::Named { .. } => {}
            other => return Err(out_of_sequence("set the name", other)),
        }

        self.state = WizardState::Named { name: name.into() };
        Ok(())
    }

    pub fn add_location(&mut self, location: Location) -> Result<(), WizardError> {
        match &mut self.state {
            WizardState::Named { name } => {
                let name = std::mem::take(name);
                self.state = WizardState::Locating {
                    name,
                    locations: vec![location],
                };
                Ok(())
            }
            WizardState::Locating { locations, .. } => {
                locations.push(location);
                Ok(())
            }
            other => Err(out_of_sequence("add a location", other)),
        }
    }

    /// Insert the channel and attach its locations. On failure the wizard
    /// stays where it was.
    pub async fn persist(&mut self, storage: &dyn Storage) -> Result<(), WizardError> {
        let (name, mut locations) = match &self.state {
            WizardState::Locating { name, locations } => (name.clone(), locations.clone()),
            WizardState::Named { .. } => return Err(WizardError::NoLocations),
            other => return Err(out_of_sequence("persist", other)),
        };

        let location_ids: Vec<i64> = locations.iter().map(|location| location.id).collect();
        let channel = storage
            .create_channel(
                &NewChannel {
                    name,
                    module: self.module,
                },
                &location_ids,
            )
            .await?;

        for location in &mut locations {
            location.channel_id = Some(channel.id);
        }

        self.state = WizardState::Persisted(ChannelWithLocations { channel, locations });
        Ok(())
    }

    pub fn end(self) -> Result<ChannelWithLocations, WizardError> {
        match self.state {
            WizardState::Persisted(built) => Ok(built),
            other => Err(out_of_sequence("end", &other)),
        }
    }
}

fn out_of_sequence(step: &'static str, state: &WizardState) -> WizardError {
    WizardError::OutOfSequence {
        step,
        state: state.label(),
    }
}
