use crate::domain::{MessageCategory, Payload};

pub const PUSH_TO_APP_FIELDS: [&str; 4] = ["bucketType", "bucketID", "objectID", "modifiedAt"];
pub const PUSH_TO_USER_FIELDS: [&str; 1] = ["topic"];

/// Categorises a message by which well-known fields it carries.
///
/// Push-to-app fields win over push-to-user fields when both are present;
/// anything else is a direct push.
pub fn classify(payload: &Payload) -> MessageCategory {
    if PUSH_TO_APP_FIELDS
        .iter()
        .any(|field| payload.contains_key(field))
    {
        return MessageCategory::PushToApp;
    }
    if PUSH_TO_USER_FIELDS
        .iter()
        .any(|field| payload.contains_key(field))
    {
        return MessageCategory::PushToUser;
    }
    MessageCategory::DirectPush
}
