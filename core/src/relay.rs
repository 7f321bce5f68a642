//! Relay orchestration
//!
//! Builds one [`Session`] per configured network, wires relay targets,
//! connects every session concurrently and only then starts the read loops.
//! A session that fails is reported and dropped; the others keep running.

use crate::{
    config::Config,
    session::{Session, SessionHandle},
    topology,
    transport::Connector,
    Error, Result,
};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{error, info, info_span, Instrument};

/// How a session finished
#[derive(Debug)]
pub enum SessionOutcome {
    /// The stream could not be opened or registration failed
    ConnectFailed(Error),
    /// The server closed the stream
    Closed,
    /// The read loop stopped on an error
    Failed(Error),
}

/// Final state of one network
#[derive(Debug)]
pub struct SessionReport {
    pub network: String,
    pub outcome: SessionOutcome,
}

impl SessionReport {
    /// Whether the session ended without an error
    pub fn is_clean(&self) -> bool {
        matches!(self.outcome, SessionOutcome::Closed)
    }
}

/// All sessions of one relay deployment
pub struct Relay {
    sessions: Vec<Session>,
    connector: Arc<dyn Connector>,
}

impl Relay {
    /// Build sessions from `config` and wire their relay targets
    pub fn new(config: &Config, connector: Arc<dyn Connector>) -> Result<Self> {
        config.validate()?;

        let sessions: Vec<Session> = config
            .networks
            .iter()
            .map(|network| Session::new(network.clone(), config.relay.loop_guard))
            .collect();

        let targets = topology::resolve_targets(&config.networks)?;
        for (session, target) in sessions.iter().zip(targets) {
            if let Some(index) = target {
                session.set_relay_target(&sessions[index].handle())?;
            }
        }

        Ok(Self { sessions, connector })
    }

    /// Handles for sending into each network's channel
    pub fn handles(&self) -> Vec<SessionHandle> {
        self.sessions.iter().map(Session::handle).collect()
    }

    /// Connect all sessions, then listen on all of them until every stream
    /// has ended
    pub async fn run(self) -> Vec<SessionReport> {
        let mut reports = Vec::new();

        let mut connecting = JoinSet::new();
        for mut session in self.sessions {
            let connector = Arc::clone(&self.connector);
            let span = info_span!("session", network = %session.id());
            connecting.spawn(
                async move {
                    let result = session.connect(connector.as_ref()).await;
                    (session, result)
                }
                .instrument(span),
            );
        }

        let mut connected = Vec::new();
        while let Some(joined) = connecting.join_next().await {
            match joined {
                Ok((session, Ok(()))) => connected.push(session),
                Ok((session, Err(e))) => {
                    error!("[{}] Connection failed: {}", session.id(), e);
                    reports.push(SessionReport {
                        network: session.id().to_string(),
                        outcome: SessionOutcome::ConnectFailed(e),
                    });
                }
                Err(e) => error!("Connect task aborted: {}", e),
            }
        }

        info!("{} of {} networks connected", connected.len(), connected.len() + reports.len());

        let mut listening = JoinSet::new();
        for mut session in connected {
            let span = info_span!("session", network = %session.id());
            listening.spawn(
                async move {
                    let result = session.listen().await;
                    (session.id().to_string(), result)
                }
                .instrument(span),
            );
        }

        while let Some(joined) = listening.join_next().await {
            match joined {
                Ok((network, Ok(()))) => {
                    info!("[{}] Session closed", network);
                    reports.push(SessionReport {
                        network,
                        outcome: SessionOutcome::Closed,
                    });
                }
                Ok((network, Err(e))) => {
                    error!("[{}] Session ended: {}", network, e);
                    reports.push(SessionReport {
                        network,
                        outcome: SessionOutcome::Failed(e),
                    });
                }
                Err(e) => error!("Session task aborted: {}", e),
            }
        }

        reports
    }
}
