// ── Device directory seam ──
//
// The engine talks to the cloud through this trait so the cycle runner
// and command dispatch can be exercised against an in-memory fake.

use std::future::Future;

use secrecy::SecretString;

use latchkey_api::{
    DirectoryClient, Error, LockOperation, LockSummary, OperateAck, RawLockRecord, Session,
};

/// Cloud directory operations the engine needs.
///
/// Mirrors the `DirectoryClient` surface. Errors use the API crate's
/// taxonomy so classification helpers (`is_auth_expired`,
/// `is_transient`) work uniformly.
pub trait DeviceDirectory: Send + Sync + 'static {
    fn authenticate(
        &self,
        identifier: &str,
        password: &SecretString,
        install_id: &str,
    ) -> impl Future<Output = Result<Session, Error>> + Send;

    fn list_locks(&self) -> impl Future<Output = Result<Vec<(String, LockSummary)>, Error>> + Send;

    fn get_lock(&self, lock_id: &str) -> impl Future<Output = Result<RawLockRecord, Error>> + Send;

    fn remote_operate(
        &self,
        lock_id: &str,
        op: LockOperation,
    ) -> impl Future<Output = Result<OperateAck, Error>> + Send;
}

impl DeviceDirectory for DirectoryClient {
    async fn authenticate(
        &self,
        identifier: &str,
        password: &SecretString,
        install_id: &str,
    ) -> Result<Session, Error> {
        DirectoryClient::authenticate(self, identifier, password, install_id).await
    }

    async fn list_locks(&self) -> Result<Vec<(String, LockSummary)>, Error> {
        DirectoryClient::list_locks(self).await
    }

    async fn get_lock(&self, lock_id: &str) -> Result<RawLockRecord, Error> {
        DirectoryClient::get_lock(self, lock_id).await
    }

    async fn remote_operate(&self, lock_id: &str, op: LockOperation) -> Result<OperateAck, Error> {
        DirectoryClient::remote_operate(self, lock_id, op).await
    }
}
