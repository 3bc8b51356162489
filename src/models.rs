//! Wire types for the platform API. The backend owns these shapes; the
//! client only decodes what the screens display and encodes what the forms
//! submit. Records come back with Mongo-style `_id` identifiers and
//! camelCase field names, with a couple of legacy snake_case exceptions
//! (the meeting ticket) preserved as-is.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Subjects offered on the platform; used by the teacher-onboarding flow.
pub const SUBJECTS: &[&str] = &[
    "Mathematics",
    "Physics",
    "Chemistry",
    "Biology",
    "Computer Science",
    "English",
    "Economics",
];

/// The authenticated-user snapshot. Not authoritative: re-fetched from the
/// server on demand and dropped whenever the session ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub role: String,
    #[serde(rename = "profileUrl", default, skip_serializing_if = "Option::is_none")]
    pub profile_url: Option<String>,
    #[serde(default)]
    pub verified: bool,
}

/// Account-creation form. The server requires OTP verification before the
/// first login, so submitting this never yields a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub country: String,
    pub city: String,
    pub gender: String,
    pub tel: String,
}

/// Purpose tag attached to OTP submissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OtpPurpose {
    #[default]
    Verification,
    Reset,
}

impl OtpPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            OtpPurpose::Verification => "verification",
            OtpPurpose::Reset => "reset",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Teacher {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub subjects: Vec<String>,
    #[serde(rename = "hasRoom", default)]
    pub has_room: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<RoomSummary>,
}

impl Teacher {
    /// Whether a room already exists for this teacher, whichever way the
    /// server expressed it.
    pub fn is_roomed(&self) -> bool {
        self.has_room || self.room.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomSummary {
    #[serde(rename = "roomName")]
    pub room_name: String,
    pub subject: String,
    #[serde(rename = "isLive", default)]
    pub is_live: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeacherRoom {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    /// `None` when the owning teacher record was deleted server-side.
    pub teacher: Option<Teacher>,
    #[serde(rename = "roomName")]
    pub room_name: String,
    pub subject: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "isLive", default)]
    pub is_live: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enrollment {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub teacher: Option<Teacher>,
    pub room: Option<TeacherRoom>,
    #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseRef {
    pub subject: String,
    #[serde(rename = "roomName")]
    pub room_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub course: CourseRef,
    #[serde(rename = "progressPercent")]
    pub progress_percent: f32,
    #[serde(default)]
    pub completed: bool,
    #[serde(rename = "certificateIssued", default)]
    pub certificate_issued: bool,
}

impl Progress {
    /// Certificate availability as the progress screen words it.
    pub fn certificate_state(&self) -> &'static str {
        if self.certificate_issued {
            "available"
        } else if self.completed {
            "payment required"
        } else {
            "locked"
        }
    }
}

/// Ticket for joining a live class. The backend mixes naming conventions on
/// this record; the field renames pin the observed contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeetingTicket {
    #[serde(rename = "meetingId")]
    pub meeting_id: i64,
    pub join_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_url: Option<String>,
    #[serde(default)]
    pub moderator: bool,
}

impl MeetingTicket {
    /// Moderators get the host link when the server issued one.
    pub fn open_url(&self) -> &str {
        self.start_url.as_deref().unwrap_or(&self.join_url)
    }
}

/// A pending teacher-onboarding request, as listed for administrators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeacherRequest {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(rename = "profileUrl", default, skip_serializing_if = "Option::is_none")]
    pub profile_url: Option<String>,
    #[serde(default)]
    pub subjects: Vec<Subject>,
}

/// Requested subjects arrive either as bare names or as name+approval
/// records depending on the server version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Subject {
    Name(String),
    Detailed {
        name: String,
        #[serde(default)]
        approved: bool,
    },
}

impl Subject {
    pub fn name(&self) -> &str {
        match self {
            Subject::Name(n) => n,
            Subject::Detailed { name, .. } => name,
        }
    }

    pub fn approved(&self) -> bool {
        match self {
            Subject::Name(_) => false,
            Subject::Detailed { approved, .. } => *approved,
        }
    }
}

/// Sparse profile update; only the populated fields are sent.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(rename = "profileUrl", skip_serializing_if = "Option::is_none")]
    pub profile_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tel: Option<String>,
}
