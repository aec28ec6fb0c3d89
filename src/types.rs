//! Shared types: tenancy scope, memories, settings, and conversation turns

use crate::engagement::EngagementLevel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Isolation scope every persisted record belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tenant {
    pub user_id: String,
    pub tenant_id: String,
}

impl Tenant {
    pub fn new(user_id: impl Into<String>, tenant_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            tenant_id: tenant_id.into(),
        }
    }
}

/// A remembered piece of information about the user
///
/// Memories are extracted outside this core and consumed as read-only
/// context; the core only reads them by importance and deletes them on
/// explicit user request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Memory {
    /// Unique identifier
    pub id: String,
    pub user_id: String,
    pub tenant_id: String,
    /// The memory content
    pub content: String,
    /// Type of memory
    pub memory_type: MemoryType,
    /// Importance score (0 - 100)
    pub importance: u8,
    /// When the memory was created
    pub created_at: DateTime<Utc>,
}

impl Memory {
    /// Create a new memory with default importance for its type
    pub fn new(tenant: &Tenant, content: impl Into<String>, memory_type: MemoryType) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: tenant.user_id.clone(),
            tenant_id: tenant.tenant_id.clone(),
            content: content.into(),
            memory_type,
            importance: memory_type.default_importance(),
            created_at: Utc::now(),
        }
    }

    /// Set custom importance
    pub fn with_importance(mut self, importance: u8) -> Self {
        self.importance = importance.min(100);
        self
    }
}

/// Types of memories
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MemoryType {
    /// User preference
    Preference,
    /// Objective fact
    Fact,
    /// Situational context
    Context,
    /// Anything else
    Other,
}

impl MemoryType {
    /// Get default importance for this type
    pub fn default_importance(&self) -> u8 {
        match self {
            MemoryType::Preference => 70,
            MemoryType::Fact => 60,
            MemoryType::Context => 40,
            MemoryType::Other => 30,
        }
    }
}

impl std::fmt::Display for MemoryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MemoryType::Preference => write!(f, "preference"),
            MemoryType::Fact => write!(f, "fact"),
            MemoryType::Context => write!(f, "context"),
            MemoryType::Other => write!(f, "other"),
        }
    }
}

impl std::str::FromStr for MemoryType {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "preference" => Ok(MemoryType::Preference),
            "fact" => Ok(MemoryType::Fact),
            "context" => Ok(MemoryType::Context),
            _ => Ok(MemoryType::Other),
        }
    }
}

/// Per-user settings the core reads at session init and mutates explicitly
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserSettings {
    pub engagement_level: EngagementLevel,
    pub last_interaction: Option<DateTime<Utc>>,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            engagement_level: EngagementLevel::default(),
            last_interaction: None,
        }
    }
}

/// Who authored a conversation turn
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    User,
    Assistant,
}

impl std::fmt::Display for TurnRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TurnRole::User => write!(f, "user"),
            TurnRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// One stored conversation turn
///
/// Turns are written by the turn-handling boundary; the core reads them
/// for interaction counting, last-activity checks, and recent-topic
/// sampling.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationTurn {
    pub id: String,
    pub user_id: String,
    pub tenant_id: String,
    pub session_id: String,
    pub role: TurnRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn new(
        tenant: &Tenant,
        session_id: impl Into<String>,
        role: TurnRole,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: tenant.user_id.clone(),
            tenant_id: tenant.tenant_id.clone(),
            session_id: session_id.into(),
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}
