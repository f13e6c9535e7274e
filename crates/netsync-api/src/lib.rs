//! Transport layer for `netsync`.
//!
//! - **[`NetBoxClient`]**: async REST client for the NetBox inventory
//!   (`/api/dcim`, `/api/ipam`, `/api/extras`), token authenticated, with
//!   offset pagination collapsed into plain `Vec`s.
//! - **[`SshClient`]**: runs single commands on network devices through the
//!   system `ssh` binary, honouring the user's `~/.ssh/config`.
//!
//! Nothing here knows about reconciliation; `netsync-core` maps these wire
//! models into its own entity types.

pub mod error;
pub mod netbox;
pub mod ssh;
pub mod transport;

pub use error::Error;
pub use netbox::NetBoxClient;
pub use ssh::{SshClient, SshConfig};
pub use transport::{TlsMode, TransportConfig};
