// src/model/channel.rs

//! Channel registry entities.
//!
//! Channels are configuration-grade rows: created by administrators, read by
//! the recorder. Validation happens on insert (see `store`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{RecorderError, Result};
use crate::model::Id;

/// Optional grouping for channels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: Id,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A registered IPTV endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: Id,
    pub name: String,
    pub url: String,
    pub category: Option<Id>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert payload for a channel.
#[derive(Debug, Clone)]
pub struct NewChannel {
    pub name: String,
    pub url: String,
    pub category: Option<Id>,
}

/// Names must carry at least two characters (categories and channels alike).
pub fn validate_name(name: &str) -> Result<()> {
    if name.trim().chars().count() < 2 {
        return Err(RecorderError::Validation(format!(
            "name '{name}' is too short (minimum 2 characters)"
        )));
    }
    Ok(())
}

/// Channel URLs must parse as absolute URLs.
pub fn validate_url(raw: &str) -> Result<()> {
    url::Url::parse(raw)
        .map_err(|e| RecorderError::Validation(format!("invalid channel url '{raw}': {e}")))?;
    Ok(())
}
