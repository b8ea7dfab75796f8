// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Template entity. Templates are immutable from the core's point of view —
//! CRUD lives entirely in the external template surface; the core only ever
//! reads them to render a job payload.

use crate::ids::{TemplateId, TenantId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single image attached to a template, ordered for upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateImage {
    pub order: u32,
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    pub id: TemplateId,
    pub owner_id: TenantId,
    pub target_board_key: String,
    pub subject_pattern: String,
    pub body_pattern: String,
    pub images: Vec<TemplateImage>,
    pub fixed_fields: HashMap<String, String>,
}
