/// All notification timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Flight schedule times keep the airport's local offset.
pub type LocalTimestamp = chrono::DateTime<chrono::FixedOffset>;
