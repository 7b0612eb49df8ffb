//! Account verification: request and submit phone/email codes.
//!
//! These endpoints require an authenticated session, so each handler
//! logs in first with the configured credentials.

use secrecy::SecretString;

use latchkey_api::DirectoryClient;

use crate::cli::{GlobalOpts, VerifyAction, VerifyArgs, VerifyChannel};
use crate::config;
use crate::error::CliError;

use super::run::build_directory;

async fn authenticated_client(global: &GlobalOpts) -> Result<DirectoryClient, CliError> {
    let cfg = config::resolve(global, None)?;
    let client = build_directory(&cfg)?;
    let password: &SecretString = &cfg.password;
    client
        .authenticate(&cfg.identifier, password, &cfg.install_id)
        .await?;
    Ok(client)
}

pub async fn handle(args: VerifyArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let client = authenticated_client(global).await?;

    match args.action {
        VerifyAction::Send { channel, value } => {
            match channel {
                VerifyChannel::Phone => client.send_code_to_phone(&value).await?,
                VerifyChannel::Email => client.send_code_to_email(&value).await?,
            }
            if !global.quiet {
                eprintln!("Verification code sent to {value}");
            }
        }
        VerifyAction::Submit {
            channel,
            value,
            code,
        } => {
            match channel {
                VerifyChannel::Phone => client.validate_phone(&value, &code).await?,
                VerifyChannel::Email => client.validate_email(&value, &code).await?,
            }
            if !global.quiet {
                eprintln!("Verification accepted");
            }
        }
    }
    Ok(())
}
