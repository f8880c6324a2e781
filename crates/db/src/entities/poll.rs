//! Poll entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle status of a poll.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum PollStatus {
    /// Created but not yet open for voting.
    #[sea_orm(string_value = "draft")]
    Draft,
    /// Open for voting.
    #[sea_orm(string_value = "active")]
    Active,
    /// Voting closed; results are final.
    #[sea_orm(string_value = "ended")]
    Ended,
    /// Hidden from listings but kept for history.
    #[sea_orm(string_value = "archived")]
    Archived,
}

/// A poll with its denormalized tally.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "poll")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// The question shown to voters.
    pub question: String,

    /// Poll options (JSON array of strings).
    #[sea_orm(column_type = "JsonBinary")]
    pub options: Json,

    /// Vote counts per option (JSON array of integers).
    ///
    /// Updated on every accepted vote; the vote rows remain the source
    /// of truth and exact tallies are recomputed from them.
    #[sea_orm(column_type = "JsonBinary")]
    pub vote_counts: Json,

    /// Total number of unique voters.
    pub voters_count: i32,

    /// Whether a winner is drawn from the leading option once voting ends.
    pub is_contest: bool,

    /// Whether this poll is the currently featured weekly poll.
    pub is_weekly: bool,

    /// Current lifecycle status.
    pub status: PollStatus,

    /// When voting closes (null for no scheduled end).
    #[sea_orm(nullable)]
    pub ends_at: Option<DateTimeWithTimeZone>,

    /// Optional illustration shown with the poll.
    #[sea_orm(nullable)]
    pub image_url: Option<String>,

    /// Fingerprint of the creator.
    pub created_by: String,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::poll_vote::Entity")]
    PollVote,

    #[sea_orm(has_one = "super::contest_winner::Entity")]
    ContestWinner,
}

impl Related<super::poll_vote::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PollVote.def()
    }
}

impl Related<super::contest_winner::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ContestWinner.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
