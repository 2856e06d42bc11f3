//! The FreeCAD session seam and its lifecycle.
//!
//! [`CadSession`] is everything the tool handlers may ask of FreeCAD.
//! [`SessionManager`] owns at most one live session: it is created lazily,
//! pinged once, and then kept until [`SessionManager::shutdown`]. A failed
//! remote call later on is reported by the handler that made it; the manager
//! does not reconnect.

use std::future::Future;

use serde_json::Value as Json;
use tracing::{error, info};

use crate::freecad::error::{ConnectionError, RpcResult};
use crate::freecad::types::{ObjectEdit, ObjectSpec, RemoteResult};

/// Requests a FreeCAD session can serve.
///
/// Implemented over XML-RPC by [`crate::freecad::RpcClient`]. Every method
/// is one blocking round trip; transport problems come back as errors.
pub trait CadSession {
    /// Human-readable endpoint, used in log lines and error messages.
    fn address(&self) -> &str;

    /// Liveness check.
    fn ping(&self) -> impl Future<Output = RpcResult<bool>>;

    /// Creates a new document.
    fn create_document(&self, name: &str) -> impl Future<Output = RpcResult<RemoteResult>>;

    /// Creates an object in a document.
    fn create_object(
        &self,
        doc_name: &str,
        spec: &ObjectSpec,
    ) -> impl Future<Output = RpcResult<RemoteResult>>;

    /// Sets properties on an existing object.
    fn edit_object(
        &self,
        doc_name: &str,
        obj_name: &str,
        edit: &ObjectEdit,
    ) -> impl Future<Output = RpcResult<RemoteResult>>;

    /// Removes an object from a document.
    fn delete_object(
        &self,
        doc_name: &str,
        obj_name: &str,
    ) -> impl Future<Output = RpcResult<RemoteResult>>;

    /// Inserts a part from the parts library addon.
    fn insert_part_from_library(
        &self,
        relative_path: &str,
    ) -> impl Future<Output = RpcResult<RemoteResult>>;

    /// Runs Python source inside FreeCAD; the success payload is its output.
    fn execute_code(&self, code: &str) -> impl Future<Output = RpcResult<RemoteResult>>;

    /// Describes every object in a document.
    fn get_objects(&self, doc_name: &str) -> impl Future<Output = RpcResult<Json>>;

    /// Describes one object.
    fn get_object(&self, doc_name: &str, obj_name: &str) -> impl Future<Output = RpcResult<Json>>;

    /// Lists the parts library, as paths relative to its root.
    fn get_parts_list(&self) -> impl Future<Output = RpcResult<Vec<String>>>;

    /// Lists the names of open documents.
    fn list_documents(&self) -> impl Future<Output = RpcResult<Vec<String>>>;

    /// Renders the active view from the named camera angle as PNG bytes.
    ///
    /// `Ok(None)` means FreeCAD sent no image. Callers should go through
    /// [`crate::feedback::try_screenshot`], which checks the view first.
    fn get_active_screenshot(
        &self,
        view_name: &str,
    ) -> impl Future<Output = RpcResult<Option<Vec<u8>>>>;
}

/// Builds sessions for a [`SessionManager`].
pub trait Connector {
    /// Session type produced.
    type Session: CadSession;

    /// Endpoint the sessions talk to.
    fn address(&self) -> String;

    /// Constructs a session without contacting FreeCAD.
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be set up.
    fn connect(&self) -> RpcResult<Self::Session>;
}

/// Holds the single FreeCAD session of the process.
pub struct SessionManager<C: Connector> {
    connector: C,
    session: Option<C::Session>,
}

impl<C: Connector> SessionManager<C> {
    /// Creates a manager that has not connected yet.
    #[must_use]
    pub const fn new(connector: C) -> Self {
        Self {
            connector,
            session: None,
        }
    }

    /// Returns `true` while a session is held.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    /// Returns the live session, connecting first if needed.
    ///
    /// A held session is returned as-is, without another ping.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError`] if a new session cannot be built or does
    /// not answer the ping. Nothing is kept in that case, so the next call
    /// tries again.
    pub async fn get(&mut self) -> Result<&C::Session, ConnectionError> {
        let session = match self.session.take() {
            Some(session) => session,
            None => self.connect().await?,
        };
        Ok(&*self.session.insert(session))
    }

    async fn connect(&self) -> Result<C::Session, ConnectionError> {
        let address = self.connector.address();
        let session = self
            .connector
            .connect()
            .map_err(ConnectionError::Setup)?;

        match session.ping().await {
            Ok(true) => {
                info!(address = %address, "Connected to FreeCAD");
                Ok(session)
            }
            Ok(false) => {
                error!(address = %address, "FreeCAD did not acknowledge ping");
                Err(ConnectionError::Unreachable {
                    address,
                    source: None,
                })
            }
            Err(e) => {
                error!(address = %address, error = %e, "Failed to ping FreeCAD");
                Err(ConnectionError::Unreachable {
                    address,
                    source: Some(e),
                })
            }
        }
    }

    /// Releases the session. Safe to call when none is held.
    pub fn shutdown(&mut self) {
        if let Some(session) = self.session.take() {
            info!(address = %session.address(), "Disconnecting from FreeCAD");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::freecad::error::RpcError;

    /// Session whose only working request is `ping`.
    #[derive(Debug)]
    struct PingOnly {
        alive: bool,
        pings: Rc<Cell<usize>>,
    }

    impl CadSession for PingOnly {
        fn address(&self) -> &str {
            "test"
        }

        async fn ping(&self) -> RpcResult<bool> {
            self.pings.set(self.pings.get() + 1);
            Ok(self.alive)
        }

        async fn create_document(&self, _: &str) -> RpcResult<RemoteResult> {
            unreachable!()
        }

        async fn create_object(&self, _: &str, _: &ObjectSpec) -> RpcResult<RemoteResult> {
            unreachable!()
        }

        async fn edit_object(&self, _: &str, _: &str, _: &ObjectEdit) -> RpcResult<RemoteResult> {
            unreachable!()
        }

        async fn delete_object(&self, _: &str, _: &str) -> RpcResult<RemoteResult> {
            unreachable!()
        }

        async fn insert_part_from_library(&self, _: &str) -> RpcResult<RemoteResult> {
            unreachable!()
        }

        async fn execute_code(&self, _: &str) -> RpcResult<RemoteResult> {
            unreachable!()
        }

        async fn get_objects(&self, _: &str) -> RpcResult<Json> {
            unreachable!()
        }

        async fn get_object(&self, _: &str, _: &str) -> RpcResult<Json> {
            unreachable!()
        }

        async fn get_parts_list(&self) -> RpcResult<Vec<String>> {
            unreachable!()
        }

        async fn list_documents(&self) -> RpcResult<Vec<String>> {
            unreachable!()
        }

        async fn get_active_screenshot(&self, _: &str) -> RpcResult<Option<Vec<u8>>> {
            unreachable!()
        }
    }

    /// Connector whose sessions answer the ping with the next scripted reply.
    struct Scripted {
        replies: Rc<Cell<Vec<bool>>>,
        built: Rc<Cell<usize>>,
        pings: Rc<Cell<usize>>,
        setup_fails: bool,
    }

    impl Scripted {
        fn new(replies: Vec<bool>) -> Self {
            Self {
                replies: Rc::new(Cell::new(replies)),
                built: Rc::new(Cell::new(0)),
                pings: Rc::new(Cell::new(0)),
                setup_fails: false,
            }
        }
    }

    impl Connector for Scripted {
        type Session = PingOnly;

        fn address(&self) -> String {
            "test".to_string()
        }

        fn connect(&self) -> RpcResult<PingOnly> {
            if self.setup_fails {
                return Err(RpcError::malformed("no client"));
            }
            self.built.set(self.built.get() + 1);
            let mut replies = self.replies.take();
            let alive = if replies.is_empty() {
                true
            } else {
                replies.remove(0)
            };
            self.replies.set(replies);
            Ok(PingOnly {
                alive,
                pings: Rc::clone(&self.pings),
            })
        }
    }

    #[tokio::test]
    async fn get_is_idempotent_without_second_ping() {
        let connector = Scripted::new(vec![true]);
        let pings = Rc::clone(&connector.pings);
        let built = Rc::clone(&connector.built);
        let mut manager = SessionManager::new(connector);

        let first: *const PingOnly = manager.get().await.unwrap();
        let second: *const PingOnly = manager.get().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(pings.get(), 1);
        assert_eq!(built.get(), 1);
        assert!(manager.is_connected());
    }

    #[tokio::test]
    async fn failed_ping_leaves_no_session_and_retries() {
        let connector = Scripted::new(vec![false, true]);
        let built = Rc::clone(&connector.built);
        let mut manager = SessionManager::new(connector);

        let err = manager.get().await.unwrap_err();
        assert!(matches!(err, ConnectionError::Unreachable { source: None, .. }));
        assert!(!manager.is_connected());

        assert!(manager.get().await.is_ok());
        assert_eq!(built.get(), 2);
    }

    #[tokio::test]
    async fn setup_failure_is_reported() {
        let mut connector = Scripted::new(vec![]);
        connector.setup_fails = true;
        let mut manager = SessionManager::new(connector);

        assert!(matches!(
            manager.get().await.unwrap_err(),
            ConnectionError::Setup(_)
        ));
        assert!(!manager.is_connected());
    }

    #[tokio::test]
    async fn shutdown_releases_and_is_idempotent() {
        let connector = Scripted::new(vec![true, true]);
        let pings = Rc::clone(&connector.pings);
        let mut manager = SessionManager::new(connector);

        manager.shutdown();
        manager.get().await.unwrap();
        manager.shutdown();
        manager.shutdown();
        assert!(!manager.is_connected());

        manager.get().await.unwrap();
        assert_eq!(pings.get(), 2);
    }
}
