//! Diesel schema for task hierarchy persistence.

diesel::table! {
    /// Task records linked into a forest by parent code.
    tasks (id) {
        /// Store-assigned surrogate key.
        id -> Int8,
        /// Unique external task code.
        #[max_length = 10]
        code -> Varchar,
        /// Task title.
        #[max_length = 255]
        title -> Varchar,
        /// Optional description.
        #[max_length = 1000]
        description -> Nullable<Varchar>,
        /// Task status.
        #[max_length = 50]
        status -> Varchar,
        /// Optional assignment timestamp.
        assigned_date -> Nullable<Timestamptz>,
        /// Optional due timestamp.
        due_date -> Nullable<Timestamptz>,
        /// Optional creator reference.
        creator_id -> Nullable<Int8>,
        /// Optional assignee reference.
        assignee_id -> Nullable<Int8>,
        /// Optional parent task code.
        #[max_length = 10]
        parent_code -> Nullable<Varchar>,
        /// Optional priority label.
        #[max_length = 50]
        priority -> Nullable<Varchar>,
        /// Optional tag list.
        #[max_length = 255]
        tags -> Nullable<Varchar>,
        /// Optimistic concurrency version.
        version -> Int8,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last update timestamp.
        updated_at -> Timestamptz,
    }
}
