//! Service lifecycle: `Created -> Serving -> Stopped`, with no way back.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ServiceState {
    Created,
    Serving,
    Stopped,
}

impl ServiceState {
    pub fn as_str(self) -> &'static str {
        match self {
            ServiceState::Created => "Created",
            ServiceState::Serving => "Serving",
            ServiceState::Stopped => "Stopped",
        }
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cloneable view of a service's state that can also stop it.
#[derive(Clone, Debug)]
pub struct ServiceHandle {
    state: Arc<watch::Sender<ServiceState>>,
}

impl Default for ServiceHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceHandle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ServiceState::Created);
        Self { state: Arc::new(tx) }
    }

    pub fn state(&self) -> ServiceState {
        *self.state.borrow()
    }

    /// Move to `Stopped`. Returns false when already stopped.
    pub fn stop(&self) -> bool {
        self.state.send_if_modified(|s| {
            if *s == ServiceState::Stopped {
                return false;
            }
            *s = ServiceState::Stopped;
            true
        })
    }

    /// `Created -> Serving`; any other starting state is returned as the error.
    pub(crate) fn begin_serving(&self) -> Result<(), ServiceState> {
        let mut from = ServiceState::Created;
        let moved = self.state.send_if_modified(|s| {
            from = *s;
            if *s != ServiceState::Created {
                return false;
            }
            *s = ServiceState::Serving;
            true
        });
        if moved {
            Ok(())
        } else {
            Err(from)
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ServiceState> {
        self.state.subscribe()
    }

    /// Resolves once the service has stopped.
    pub fn stopped(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut rx = self.subscribe();
        async move {
            let _ = rx.wait_for(|s| *s == ServiceState::Stopped).await;
        }
    }

    /// Resolves once the service has left `Created`.
    pub fn started(&self) -> impl Future<Output = ServiceState> + Send + 'static {
        let mut rx = self.subscribe();
        async move {
            match rx.wait_for(|s| *s != ServiceState::Created).await {
                Ok(state) => *state,
                Err(_) => ServiceState::Stopped,
            }
        }
    }
}
