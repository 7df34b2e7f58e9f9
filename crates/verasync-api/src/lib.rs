// verasync-api: Async transport for Vera / MiOS home-automation hubs

pub mod cloud;
pub mod connection;
pub mod error;
pub mod transport;

pub use cloud::{
    AccountDevice, AccountSession, CloudAuthenticator, CloudEndpoints, DeviceInfo,
    IdentitySession, DEFAULT_AUTH_HOST,
};
pub use connection::{Connection, ConnectionKind, HubResponse, DEFAULT_LOCAL_PORT};
pub use error::{AuthStep, Error};
pub use transport::{TlsMode, TransportConfig};
