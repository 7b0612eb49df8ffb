//! One-shot lock / unlock handlers.

use latchkey_core::{Bridge, CommandResult, LockId, LockState, NoopRegistry};

use crate::cli::{GlobalOpts, OperateArgs};
use crate::config;
use crate::error::CliError;

use super::run::build_directory;

pub async fn handle(
    args: &OperateArgs,
    desired: LockState,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let cfg = config::resolve(global, None)?;
    let directory = build_directory(&cfg)?;

    let id = LockId::new(&args.lock_id);
    let raw = args.lock_id.clone();

    let result = Bridge::oneshot(cfg, directory, NoopRegistry, |bridge| async move {
        if !bridge.cache().contains(&id) {
            return Err(latchkey_core::CoreError::DeviceNotFound {
                id: id.to_string(),
            });
        }
        bridge.set_lock_state(id, desired).await
    })
    .await
    .map_err(|e| match e {
        latchkey_core::CoreError::DeviceNotFound { .. } => CliError::NotFound { identifier: raw },
        other => other.into(),
    })?;

    if !global.quiet {
        let CommandResult::Operated { status } = result;
        match status {
            Some(status) => eprintln!("Lock is now {status}"),
            None => eprintln!("Operation accepted"),
        }
    }
    Ok(())
}
