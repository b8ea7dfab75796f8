// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `lc credential` - register, list, and remove stored login credentials.
//! The plaintext secret only ever passes through `--secret`; it's encrypted
//! before `Engine::create_credential` records anything.

use crate::output::{format_or_json, handle_list, OutputFormat};
use anyhow::{bail, Result};
use clap::{Args, Subcommand};
use lc_core::{Clock, CredentialId, TenantId};
use lc_engine::Engine;
use lc_wire::CredentialSummary;

#[derive(Subcommand)]
pub enum CredentialCommand {
    /// List credentials.
    Ls(LsArgs),
    /// Show one credential (never prints the secret).
    Show { id: String },
    /// Register a new credential.
    Create(CreateArgs),
    /// Delete a credential.
    Rm { id: String },
}

#[derive(Args)]
pub struct LsArgs {
    /// Only credentials owned by this tenant.
    #[arg(long)]
    owner: Option<String>,
}

#[derive(Args)]
pub struct CreateArgs {
    #[arg(long)]
    owner: String,
    #[arg(long)]
    login_name: String,
    #[arg(long)]
    secret: String,
    #[arg(long)]
    display_name: String,
}

pub async fn handle<C: Clock>(command: CredentialCommand, engine: &Engine<C>, format: OutputFormat) -> Result<()> {
    match command {
        CredentialCommand::Ls(args) => ls(engine, args, format),
        CredentialCommand::Show { id } => show(engine, &id, format),
        CredentialCommand::Create(args) => create(engine, args, format),
        CredentialCommand::Rm { id } => rm(engine, &id),
    }
}

fn ls<C: Clock>(engine: &Engine<C>, args: LsArgs, format: OutputFormat) -> Result<()> {
    let state = engine.state();
    let mut credentials: Vec<_> = match &args.owner {
        Some(owner) => {
            let owner_id: TenantId = owner.as_str().into();
            state.credentials.values().filter(|c| c.owner_id == owner_id).collect()
        }
        None => state.credentials.values().collect(),
    };
    credentials.sort_by_key(|c| c.login_name.clone());
    let summaries: Vec<CredentialSummary> = credentials.iter().map(|c| CredentialSummary::from(*c)).collect();

    handle_list(format, &summaries, "No credentials", |rows| {
        println!("{:<24}  LOGIN NAME       DISPLAY NAME", "CREDENTIAL ID");
        for r in rows {
            println!("{:<24}  {:<15}  {}", r.id, r.login_name, r.display_name);
        }
    })
}

fn show<C: Clock>(engine: &Engine<C>, id: &str, format: OutputFormat) -> Result<()> {
    let state = engine.state();
    let credential_id: CredentialId = id.into();
    let Some(credential) = state.credentials.get(&credential_id) else {
        bail!("credential {id} not found");
    };
    let summary = CredentialSummary::from(credential);
    format_or_json(format, &summary, || println!("{:#?}", summary))
}

fn create<C: Clock>(engine: &Engine<C>, args: CreateArgs, format: OutputFormat) -> Result<()> {
    let owner_id: TenantId = args.owner.as_str().into();
    let id = engine.create_credential(owner_id, args.login_name, &args.secret, args.display_name);
    engine.checkpoint()?;
    show(engine, id.as_str(), format)
}

fn rm<C: Clock>(engine: &Engine<C>, id: &str) -> Result<()> {
    let credential_id: CredentialId = id.into();
    engine.delete_credential(credential_id)?;
    engine.checkpoint()?;
    println!("deleted {id}");
    Ok(())
}
