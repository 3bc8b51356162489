use serde_json::json;

use crate::client::ApiClient;
use crate::error::ApiResult;
use crate::models::TeacherRoom;

impl ApiClient {
    /// All teacher rooms, including ones whose teacher record has since
    /// been deleted; use [`assigned_rooms`] to keep only joinable ones.
    pub async fn teacher_rooms(&self) -> ApiResult<Vec<TeacherRoom>> {
        self.get_json("/teacher-rooms").await
    }

    /// Create a room for an approved teacher (administrator operation).
    pub async fn create_teacher_room(
        &self,
        teacher_id: &str,
        subject: &str,
        description: Option<&str>,
    ) -> ApiResult<()> {
        self.post_unit(
            "/teacher-rooms/create-room",
            json!({
                "teacherId": teacher_id,
                "subject": subject,
                "description": description.unwrap_or(""),
            }),
        )
        .await
    }
}

/// Drop rooms without a live teacher reference; the enrollment screen only
/// offers rooms that can actually be taught.
pub fn assigned_rooms(rooms: Vec<TeacherRoom>) -> Vec<TeacherRoom> {
    rooms.into_iter().filter(|r| r.teacher.is_some()).collect()
}
