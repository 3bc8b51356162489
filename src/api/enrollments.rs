use serde_json::json;

use crate::client::ApiClient;
use crate::error::ApiResult;
use crate::models::Enrollment;

impl ApiClient {
    pub async fn student_enrollments(&self, student_id: &str) -> ApiResult<Vec<Enrollment>> {
        let path = format!("/enrollments/student/{}", urlencoding::encode(student_id));
        self.get_json(&path).await
    }

    pub async fn enroll(&self, student_id: &str, teacher_id: &str, room_id: &str) -> ApiResult<()> {
        self.post_unit(
            "/enrollments",
            json!({ "studentId": student_id, "teacherId": teacher_id, "roomId": room_id }),
        )
        .await
    }
}

/// Whether the student already has an enrollment with this teacher; the
/// enrollment screen disables paying twice for the same teacher.
pub fn already_enrolled(enrollments: &[Enrollment], teacher_id: &str) -> bool {
    enrollments
        .iter()
        .any(|e| e.teacher.as_ref().is_some_and(|t| t.id == teacher_id))
}
