//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match the database migrations exactly. They are
//! used by Diesel for compile-time query validation and type-safe SQL
//! generation; `diesel print-schema` can regenerate them from a live
//! database when the migrations change.

diesel::table! {
    /// Mentor-published batches of candidate slots.
    slot_batches (id) {
        /// Primary key: UUID v4 identifier.
        id -> Uuid,
        /// Mentor who published the batch.
        owner_id -> Uuid,
        title -> Varchar,
        description -> Nullable<Text>,
        /// One of `active`, `completed`, `cancelled`.
        status -> Varchar,
        /// IANA timezone name the batch was published in.
        timezone -> Varchar,
        /// Advisory expiry, checked at read time only.
        expires_at -> Nullable<Timestamptz>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Bookable windows inside a batch, keyed by position.
    slots (batch_id, slot_index) {
        batch_id -> Uuid,
        /// Position within the batch; stable for the batch's lifetime.
        slot_index -> Int4,
        start_at -> Timestamptz,
        end_at -> Timestamptz,
        duration_minutes -> Int4,
        max_participants -> Int4,
        booked_by -> Nullable<Uuid>,
        /// Conditional-write target: claims update this flag in one
        /// statement guarded by `is_booked = false`.
        is_booked -> Bool,
        booked_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    /// Student–mentor relationships. A unique index on
    /// `(student_id, mentor_id)` is the single arbiter of pair uniqueness.
    enrollments (id) {
        id -> Uuid,
        student_id -> Uuid,
        mentor_id -> Uuid,
        student_thread_id -> Nullable<Uuid>,
        mentor_thread_id -> Nullable<Uuid>,
        is_active -> Bool,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Append-only feedback entries on an enrollment.
    enrollment_feedback (id) {
        id -> Uuid,
        enrollment_id -> Uuid,
        author_id -> Uuid,
        /// 1 to 5.
        rating -> Int2,
        comment -> Nullable<Text>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Chat threads owned by enrollments, one per party.
    chat_threads (id) {
        id -> Uuid,
        enrollment_id -> Uuid,
        owner_id -> Uuid,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// System messages appended to chat threads by the meeting lifecycle.
    thread_messages (id) {
        id -> Uuid,
        thread_id -> Uuid,
        body -> Text,
        is_system -> Bool,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Negotiated meetings with their lifecycle state.
    meetings (id) {
        id -> Uuid,
        thread_id -> Uuid,
        student_id -> Uuid,
        mentor_id -> Uuid,
        reason -> Nullable<Text>,
        scheduled_time -> Nullable<Timestamptz>,
        link -> Nullable<Text>,
        room_id -> Nullable<Varchar>,
        /// One of `requested`, `scheduled`, `link_sent`, `completed`,
        /// `cancelled`.
        status -> Varchar,
        /// Append-only negotiation log, serialized as a JSONB array.
        reschedule_requests -> Jsonb,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::joinable!(slots -> slot_batches (batch_id));
diesel::joinable!(enrollment_feedback -> enrollments (enrollment_id));
diesel::joinable!(thread_messages -> chat_threads (thread_id));

diesel::allow_tables_to_appear_in_same_query!(
    slot_batches,
    slots,
    enrollments,
    enrollment_feedback,
    chat_threads,
    thread_messages,
    meetings,
);
