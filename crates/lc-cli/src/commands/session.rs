// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `lc session` - list sessions, force a reconnect, or run a verify probe.
//!
//! Both `reconnect` and `verify` are bare credential-level operations with
//! no Run/Schedule to hang a job off of, so they bypass the job queue
//! entirely and drive the target-site driver directly (see
//! `lc_engine::Engine::{reconnect_session, verify_session}`).

use crate::output::{format_or_json, handle_list, OutputFormat};
use anyhow::{bail, Result};
use clap::Subcommand;
use lc_core::{Clock, CredentialId, SessionId};
use lc_engine::Engine;
use lc_wire::SessionSummary;

#[derive(Subcommand)]
pub enum SessionCommand {
    /// List sessions.
    Ls,
    /// Show one session.
    Show { id: String },
    /// Open (or reuse) a session for a credential and attempt first login.
    Init { credential_id: String },
    /// Move a terminal session back to PENDING and retry login.
    Reconnect { id: String },
    /// Run a verify probe against a session's current cookies.
    Verify { id: String },
}

pub async fn handle<C: Clock>(command: SessionCommand, engine: &Engine<C>, format: OutputFormat) -> Result<()> {
    match command {
        SessionCommand::Ls => ls(engine, format),
        SessionCommand::Show { id } => show(engine, &id, format),
        SessionCommand::Init { credential_id } => init(engine, &credential_id, format).await,
        SessionCommand::Reconnect { id } => reconnect(engine, &id, format).await,
        SessionCommand::Verify { id } => verify(engine, &id, format).await,
    }
}

fn ls<C: Clock>(engine: &Engine<C>, format: OutputFormat) -> Result<()> {
    let state = engine.state();
    let mut sessions: Vec<_> = state.sessions.values().collect();
    sessions.sort_by_key(|s| s.profile_handle.clone());
    let summaries: Vec<SessionSummary> = sessions.iter().map(|s| SessionSummary::from(*s)).collect();

    handle_list(format, &summaries, "No sessions", |rows| {
        println!("{:<24}  PROFILE          STATUS", "SESSION ID");
        for r in rows {
            println!("{:<24}  {:<15}  {}", r.id, r.profile_handle, r.status);
        }
    })
}

fn show<C: Clock>(engine: &Engine<C>, id: &str, format: OutputFormat) -> Result<()> {
    let state = engine.state();
    let session_id: SessionId = id.into();
    let Some(session) = state.sessions.get(&session_id) else {
        bail!("session {id} not found");
    };
    let summary = SessionSummary::from(session);
    format_or_json(format, &summary, || println!("{:#?}", summary))
}

async fn init<C: Clock>(engine: &Engine<C>, credential_id: &str, format: OutputFormat) -> Result<()> {
    let credential_id: CredentialId = credential_id.into();
    let session_id = engine.begin_session_init(credential_id).await?;
    engine.checkpoint()?;
    show(engine, session_id.as_str(), format)
}

async fn reconnect<C: Clock>(engine: &Engine<C>, id: &str, format: OutputFormat) -> Result<()> {
    let session_id: SessionId = id.into();
    engine.reconnect_session(session_id).await?;
    engine.checkpoint()?;
    show(engine, id, format)
}

async fn verify<C: Clock>(engine: &Engine<C>, id: &str, format: OutputFormat) -> Result<()> {
    let session_id: SessionId = id.into();
    engine.verify_session(session_id).await?;
    engine.checkpoint()?;
    show(engine, id, format)
}
