//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match `backend/migrations` exactly. Regenerate with
//! `diesel print-schema` after changing a migration.

diesel::table! {
    /// Registered neighbours and their contact details.
    users (id) {
        id -> Uuid,
        display_name -> Varchar,
        email -> Nullable<Varchar>,
        phone -> Nullable<Varchar>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Lendable items.
    items (id) {
        id -> Uuid,
        owner_id -> Uuid,
        title -> Varchar,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Lending libraries, each with exactly one owner.
    collections (id) {
        id -> Uuid,
        owner_id -> Uuid,
        name -> Varchar,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    collection_members (user_id, collection_id) {
        user_id -> Uuid,
        collection_id -> Uuid,
        role -> Varchar,
        is_active -> Bool,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    branches (id) {
        id -> Uuid,
        name -> Varchar,
    }
}

diesel::table! {
    branch_members (user_id, branch_id) {
        user_id -> Uuid,
        branch_id -> Uuid,
        is_active -> Bool,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Membership invitations. `token` is unique.
    invitations (id) {
        id -> Uuid,
        token -> Varchar,
        kind -> Varchar,
        email -> Varchar,
        sender_id -> Uuid,
        receiver_id -> Nullable<Uuid>,
        target_id -> Uuid,
        status -> Varchar,
        created_at -> Timestamptz,
        sent_at -> Nullable<Timestamptz>,
        accepted_at -> Nullable<Timestamptz>,
        expires_at -> Timestamptz,
    }
}

diesel::table! {
    /// Borrow requests. At most one open row per item
    /// (`borrow_requests_one_open_per_item`).
    borrow_requests (id) {
        id -> Uuid,
        item_id -> Uuid,
        borrower_id -> Uuid,
        lender_id -> Uuid,
        status -> Varchar,
        request_message -> Text,
        requested_return_date -> Date,
        response_token -> Varchar,
        video_url -> Nullable<Text>,
        pending_video_url -> Nullable<Text>,
        approved_at -> Nullable<Timestamptz>,
        activated_at -> Nullable<Timestamptz>,
        returned_at -> Nullable<Timestamptz>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    feedback_votes (issue_number, user_id) {
        issue_number -> Int4,
        user_id -> Uuid,
        created_at -> Timestamptz,
    }
}

diesel::joinable!(items -> users (owner_id));
diesel::joinable!(collection_members -> collections (collection_id));
diesel::joinable!(branch_members -> branches (branch_id));
diesel::joinable!(borrow_requests -> items (item_id));

diesel::allow_tables_to_appear_in_same_query!(
    users,
    items,
    collections,
    collection_members,
    branches,
    branch_members,
    invitations,
    borrow_requests,
    feedback_votes,
);
