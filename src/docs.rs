use crate::api::attendance::{
    BulkItemResponse, BulkMark, BulkResponse, DailyRecord, DailyResponse, ManualMark,
    MarkAttendance, MarkResponse,
};
use crate::api::student::{
    DeactivateStudent, RegisterStudent, RosterItem, StudentListResponse, StudentResponse,
    StudentView, UpdateStudent,
};
use crate::api::teacher::{RegisterTeacher, TeacherResponse, TeacherView};
use crate::api::{MessageResponse, Status};
use crate::model::attendance::MarkMethod;
use crate::service::{marking::StudentSummary, summary::AttendanceStatistics};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "School Attendance API",
        version = "1.0.0",
        description = r#"
## QR Code School Attendance

Teachers scan the QR code printed on a student's card and the student is marked
present for the day. A student is marked present at most once per calendar day;
a repeated scan answers with a `warning` and the original time.

### Key Features
- **Registration**: students and teachers are created on first sign-in and refreshed afterwards
- **Marking**: QR scan, manual and bulk marking, each attempt written to an audit log
- **Reporting**: daily records with present/absent counts and attendance rate

### Response Format
Every response carries a `status` of `success`, `warning` or `error` plus a `message`.
"#,
    ),
    paths(
        crate::api::student::register_student,
        crate::api::student::list_students,
        crate::api::student::update_student,
        crate::api::student::deactivate_student,
        crate::api::student::get_student,
        crate::api::student::student_history,

        crate::api::teacher::register_teacher,

        crate::api::attendance::mark_attendance,
        crate::api::attendance::mark_manual,
        crate::api::attendance::mark_bulk,
        crate::api::attendance::daily_attendance
    ),
    components(
        schemas(
            Status,
            MessageResponse,
            MarkMethod,
            RegisterStudent,
            UpdateStudent,
            DeactivateStudent,
            StudentView,
            StudentResponse,
            RosterItem,
            StudentListResponse,
            RegisterTeacher,
            TeacherView,
            TeacherResponse,
            MarkAttendance,
            ManualMark,
            BulkMark,
            StudentSummary,
            MarkResponse,
            BulkItemResponse,
            BulkResponse,
            DailyRecord,
            AttendanceStatistics,
            DailyResponse
        )
    ),
    tags(
        (name = "Student", description = "Student registration and roster APIs"),
        (name = "Teacher", description = "Teacher registration APIs"),
        (name = "Attendance", description = "Attendance marking and reporting APIs"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_route_is_documented() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/login/student",
            "/api/login/teacher",
            "/api/students",
            "/api/students/update",
            "/api/students/deactivate",
            "/api/students/{student_id}",
            "/api/students/{student_id}/history",
            "/api/attendance/mark",
            "/api/attendance/manual",
            "/api/attendance/bulk",
            "/api/attendance/daily",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
