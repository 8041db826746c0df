//! Internal Diesel row structs.
//!
//! These types never leave the persistence layer. Conversions into domain
//! types validate stored enum strings and tokens, surfacing corruption as
//! query errors rather than panicking.

use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use super::schema::{
    borrow_requests, collection_members, collections, feedback_votes, invitations, items, users,
};

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserContactRow {
    pub id: Uuid,
    pub display_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ItemRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = collections)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct CollectionRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = collection_members)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct CollectionMemberRow {
    pub user_id: Uuid,
    pub collection_id: Uuid,
    pub role: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = collection_members)]
pub(crate) struct NewCollectionMemberRow<'a> {
    pub user_id: Uuid,
    pub collection_id: Uuid,
    pub role: &'a str,
    pub is_active: bool,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = invitations)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct InvitationRow {
    pub id: Uuid,
    pub token: String,
    pub kind: String,
    pub email: String,
    pub sender_id: Uuid,
    pub receiver_id: Option<Uuid>,
    pub target_id: Uuid,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = invitations)]
pub(crate) struct NewInvitationRow<'a> {
    pub id: Uuid,
    pub token: &'a str,
    pub kind: &'a str,
    pub email: &'a str,
    pub sender_id: Uuid,
    pub receiver_id: Option<Uuid>,
    pub target_id: Uuid,
    pub status: &'a str,
    pub created_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = borrow_requests)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct BorrowRequestRow {
    pub id: Uuid,
    pub item_id: Uuid,
    pub borrower_id: Uuid,
    pub lender_id: Uuid,
    pub status: String,
    pub request_message: String,
    pub requested_return_date: NaiveDate,
    pub response_token: String,
    pub video_url: Option<String>,
    pub pending_video_url: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub activated_at: Option<DateTime<Utc>>,
    pub returned_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = borrow_requests)]
pub(crate) struct NewBorrowRequestRow<'a> {
    pub id: Uuid,
    pub item_id: Uuid,
    pub borrower_id: Uuid,
    pub lender_id: Uuid,
    pub status: &'a str,
    pub request_message: &'a str,
    pub requested_return_date: NaiveDate,
    pub response_token: &'a str,
    pub video_url: Option<&'a str>,
    pub pending_video_url: Option<&'a str>,
    pub approved_at: Option<DateTime<Utc>>,
    pub activated_at: Option<DateTime<Utc>>,
    pub returned_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = feedback_votes)]
pub(crate) struct NewFeedbackVoteRow {
    pub issue_number: i32,
    pub user_id: Uuid,
}
