use std::time::Duration;

use serde_json::json;

use crate::client::ApiClient;
use crate::error::ApiResult;
use crate::models::MeetingTicket;

/// Live classes end after 45 minutes; callers can use this to schedule a
/// "class ended" notice.
pub const CLASS_DURATION: Duration = Duration::from_secs(45 * 60);

impl ApiClient {
    /// Obtain a join ticket for a teacher room's live class. The returned
    /// URL is handed to the user's browser; the client never embeds the
    /// conference itself.
    pub async fn meeting_ticket(&self, teacher_room_id: &str) -> ApiResult<MeetingTicket> {
        self.post_json("/zoom/token", json!({ "teacherRoomId": teacher_room_id }))
            .await
    }
}
