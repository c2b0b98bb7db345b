//! Enum types for CRM entities

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// ENTITY KINDS
// ============================================================================

/// Entity kind discriminator, used in error reporting and reference checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum EntityType {
    Company,
    Contact,
    Deal,
    Task,
}

impl EntityType {
    /// Every kind, in declaration order.
    pub const ALL: [EntityType; 4] = [
        EntityType::Company,
        EntityType::Contact,
        EntityType::Deal,
        EntityType::Task,
    ];

    /// Singular display name.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Company => "Company",
            EntityType::Contact => "Contact",
            EntityType::Deal => "Deal",
            EntityType::Task => "Task",
        }
    }

    /// Relational table backing this kind.
    pub fn table_name(&self) -> &'static str {
        match self {
            EntityType::Company => "companies",
            EntityType::Contact => "contacts",
            EntityType::Deal => "deals",
            EntityType::Task => "tasks",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// DEAL STAGE
// ============================================================================

/// Pipeline stage of a deal.
///
/// Closed set; any stage may move to any other stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum DealStage {
    #[default]
    #[serde(rename = "New Lead")]
    NewLead,
    #[serde(rename = "Qualified")]
    Qualified,
    #[serde(rename = "Proposal Sent")]
    ProposalSent,
    #[serde(rename = "Negotiation")]
    Negotiation,
    #[serde(rename = "Won")]
    Won,
    #[serde(rename = "Lost")]
    Lost,
}

impl DealStage {
    pub const ALL: [DealStage; 6] = [
        DealStage::NewLead,
        DealStage::Qualified,
        DealStage::ProposalSent,
        DealStage::Negotiation,
        DealStage::Won,
        DealStage::Lost,
    ];

    /// Convert to database string representation (the `deal_stage` enum label).
    pub fn as_db_str(&self) -> &'static str {
        match self {
            DealStage::NewLead => "New Lead",
            DealStage::Qualified => "Qualified",
            DealStage::ProposalSent => "Proposal Sent",
            DealStage::Negotiation => "Negotiation",
            DealStage::Won => "Won",
            DealStage::Lost => "Lost",
        }
    }

    /// Parse from database string representation.
    pub fn from_db_str(s: &str) -> Result<Self, DealStageParseError> {
        DealStage::ALL
            .into_iter()
            .find(|stage| stage.as_db_str() == s)
            .ok_or_else(|| DealStageParseError(s.to_string()))
    }

    /// Whether the deal has reached a terminal outcome.
    pub fn is_closed(&self) -> bool {
        matches!(self, DealStage::Won | DealStage::Lost)
    }
}

impl fmt::Display for DealStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_db_str())
    }
}

impl FromStr for DealStage {
    type Err = DealStageParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_db_str(s)
    }
}

/// Error when parsing an invalid deal stage string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DealStageParseError(pub String);

impl fmt::Display for DealStageParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid deal stage: {}", self.0)
    }
}

impl std::error::Error for DealStageParseError {}
