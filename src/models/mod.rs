pub mod entities;
pub mod remote;
pub mod token;

pub use entities::{
    Application, Channel, Location, Module, NewChannel, NewLocation, NewProfile, Profile,
};
pub use remote::{RemoteAccount, RemoteProfile, RemoteProfileRef, ALL_PROPERTIES};
pub use token::{NewToken, OAuthToken, TokenBinding};
