//! IRC Relay Core
//! 
//! Keeps one connection per chat network, joins a channel on each, and
//! forwards channel messages from every network to its relay target with a
//! network tag and a colorized sender nick.

pub mod config;
pub mod error;
pub mod format;
pub mod message;
pub mod relay;
pub mod session;
pub mod topology;
pub mod transport;
pub mod utils;
pub mod validation;


pub use config::{Config, InvitePolicy, JoinTrigger, LoopGuard, NetworkConfig, RelaySettings};
pub use error::{Error, Result};
pub use format::colorize;
pub use message::{Command, Message};
pub use relay::{Relay, SessionOutcome, SessionReport};
pub use session::{Delivery, Session, SessionHandle, SessionState};
pub use transport::{BoxedStream, Connector, RelayStream, TcpConnector};
pub use validation::{ConfigValidator, ValidationResult, ValidationError, ValidationWarning, ErrorCategory, print_validation_result};

/// Re-exports for convenience
pub use async_trait::async_trait;
pub use tracing::{debug, error, info, warn};
