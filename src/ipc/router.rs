use super::handlers;
use super::types::{AppState, Request};
use crate::auth::{Capability, Role};
use crate::ipc::error::err;

/// The authorization decision lives here, not in the client: every method is
/// mapped to the capability it needs before any handler sees the request.
/// `None` means the method is open (or unknown, which the dispatch chain
/// answers with not_implemented anyway).
fn capability_for(method: &str) -> Option<Capability> {
    match method {
        "health" => None,
        "dashboard.open" => Some(Capability::ViewDashboard),
        "users.list" => Some(Capability::ManageUsers),
        "courses.list" => Some(Capability::ViewCourses),
        "courses.freeze" | "courses.unfreeze" | "courses.continue" => {
            Some(Capability::ManageCourses)
        }
        "enrollments.list" => Some(Capability::ViewEnrollments),
        "assignments.list" => Some(Capability::ViewAssignments),
        "assignments.create" => Some(Capability::ManageAssignments),
        "grades.list" => Some(Capability::ViewGrades),
        "grades.set" => Some(Capability::SetGrades),
        "messages.list" | "messages.send" | "messages.markRead" | "messages.delete" => {
            Some(Capability::Messaging)
        }
        "announcements.list" => Some(Capability::ViewAnnouncements),
        "announcements.create" | "announcements.delete" => Some(Capability::PostAnnouncements),
        "attendance.monthOpen" => Some(Capability::ViewAttendance),
        "attendance.setStatus" => Some(Capability::RecordAttendance),
        "games.createRoom" | "games.closeRoom" => Some(Capability::HostGames),
        "games.joinRoom" | "games.roomState" => Some(Capability::PlayGames),
        "ai.tools.list" | "ai.tools.run" => Some(Capability::UseAiTools),
        _ => None,
    }
}

pub fn handle_request(state: &mut AppState, req: Request) -> serde_json::Value {
    let resp = authorize_and_dispatch(state, &req);
    if resp.get("ok").and_then(|v| v.as_bool()) == Some(false) {
        let code = resp
            .get("error")
            .and_then(|e| e.get("code"))
            .and_then(|v| v.as_str())
            .unwrap_or("unknown");
        log::warn!("{} failed: {}", req.method, code);
    }
    resp
}

fn authorize_and_dispatch(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Some(cap) = capability_for(&req.method) {
        let Some(session) = req.session.as_ref() else {
            return err(&req.id, "unauthorized", "session required", None);
        };
        let Some(role) = Role::parse(&session.role) else {
            return err(
                &req.id,
                "bad_params",
                format!("unknown role: {}", session.role),
                None,
            );
        };
        if !role.allows(cap) {
            return err(
                &req.id,
                "forbidden",
                format!("role {} may not call {}", role.code(), req.method),
                None,
            );
        }
    }

    if let Some(resp) = handlers::core::try_handle(state, req) {
        return resp;
    }
    if let Some(resp) = handlers::dashboard::try_handle(state, req) {
        return resp;
    }
    if let Some(resp) = handlers::users::try_handle(state, req) {
        return resp;
    }
    if let Some(resp) = handlers::courses::try_handle(state, req) {
        return resp;
    }
    if let Some(resp) = handlers::enrollments::try_handle(state, req) {
        return resp;
    }
    if let Some(resp) = handlers::assignments::try_handle(state, req) {
        return resp;
    }
    if let Some(resp) = handlers::grades::try_handle(state, req) {
        return resp;
    }
    if let Some(resp) = handlers::messages::try_handle(state, req) {
        return resp;
    }
    if let Some(resp) = handlers::announcements::try_handle(state, req) {
        return resp;
    }
    if let Some(resp) = handlers::attendance::try_handle(state, req) {
        return resp;
    }
    if let Some(resp) = handlers::games::try_handle(state, req) {
        return resp;
    }
    if let Some(resp) = handlers::ai_tools::try_handle(state, req) {
        return resp;
    }

    err(
        &req.id,
        "not_implemented",
        format!("unknown method: {}", req.method),
        None,
    )
}
