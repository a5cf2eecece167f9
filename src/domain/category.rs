use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageCategory {
    /// Bucket/object change events fanned out to every installation.
    PushToApp,
    /// Messages published to a topic the user subscribed to.
    PushToUser,
    /// Messages addressed directly to one user.
    DirectPush,
}

impl MessageCategory {
    pub fn label(&self) -> &'static str {
        match self {
            MessageCategory::PushToApp => "push_to_app",
            MessageCategory::PushToUser => "push_to_user",
            MessageCategory::DirectPush => "direct_push",
        }
    }
}
