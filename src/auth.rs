/// Roles and the capability matrix behind the router's authorization check.
///
/// The session context on a request is trusted as-is (there is no credential
/// handling); what gets decided here is only whether that role may call the
/// method at all. Row-level scoping stays inside the handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Student,
    Teacher,
    Admin,
}

impl Role {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "student" => Some(Self::Student),
            "teacher" => Some(Self::Teacher),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Teacher => "teacher",
            Self::Admin => "admin",
        }
    }

    pub fn allows(self, cap: Capability) -> bool {
        match self {
            Self::Admin => true,
            Self::Teacher => !matches!(cap, Capability::ManageUsers),
            Self::Student => matches!(
                cap,
                Capability::ViewDashboard
                    | Capability::ViewCourses
                    | Capability::ViewEnrollments
                    | Capability::ViewAssignments
                    | Capability::ViewGrades
                    | Capability::Messaging
                    | Capability::ViewAnnouncements
                    | Capability::ViewAttendance
                    | Capability::PlayGames
                    | Capability::UseAiTools
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    ViewDashboard,
    ViewCourses,
    ManageCourses,
    ViewEnrollments,
    ViewAssignments,
    ManageAssignments,
    ViewGrades,
    SetGrades,
    Messaging,
    ViewAnnouncements,
    PostAnnouncements,
    ViewAttendance,
    RecordAttendance,
    PlayGames,
    HostGames,
    UseAiTools,
    ManageUsers,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_passes_everything() {
        for cap in [
            Capability::ManageUsers,
            Capability::ManageCourses,
            Capability::SetGrades,
            Capability::PlayGames,
        ] {
            assert!(Role::Admin.allows(cap));
        }
    }

    #[test]
    fn teacher_cannot_manage_users() {
        assert!(!Role::Teacher.allows(Capability::ManageUsers));
        assert!(Role::Teacher.allows(Capability::ManageCourses));
        assert!(Role::Teacher.allows(Capability::RecordAttendance));
        assert!(Role::Teacher.allows(Capability::HostGames));
    }

    #[test]
    fn student_is_view_and_participate_only() {
        assert!(Role::Student.allows(Capability::ViewGrades));
        assert!(Role::Student.allows(Capability::Messaging));
        assert!(Role::Student.allows(Capability::PlayGames));
        assert!(!Role::Student.allows(Capability::SetGrades));
        assert!(!Role::Student.allows(Capability::RecordAttendance));
        assert!(!Role::Student.allows(Capability::HostGames));
        assert!(!Role::Student.allows(Capability::PostAnnouncements));
    }

    #[test]
    fn role_codes_round_trip() {
        for role in [Role::Student, Role::Teacher, Role::Admin] {
            assert_eq!(Role::parse(role.code()), Some(role));
        }
        assert_eq!(Role::parse("principal"), None);
    }
}
