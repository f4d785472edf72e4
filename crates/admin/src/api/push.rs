//! Operator-initiated push notifications: published straight onto the
//! bus for the notification pipeline to deliver.

use axum::extract::{Path, State};
use axum::response::Response;
use axum::Form;
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use na_bus::topics;
use na_domain::error::Error;
use na_domain::user::Operator;

use crate::api::mutation_outcome;
use crate::session::middleware::OperatorContext;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PushForm {
    pub title: String,
    pub message: String,
}

pub async fn push_to_user(
    State(state): State<AppState>,
    OperatorContext(operator): OperatorContext,
    jar: CookieJar,
    Path(user_id): Path<Uuid>,
    Form(form): Form<PushForm>,
) -> Response {
    let result = send_push(&state, &operator, user_id, &form).await;
    mutation_outcome(&state, jar, result, "Notification sent.", "/admin/users")
}

async fn send_push(
    state: &AppState,
    operator: &Operator,
    user_id: Uuid,
    form: &PushForm,
) -> na_domain::error::Result<()> {
    if form.message.trim().is_empty() {
        return Err(Error::InvalidInput("message must not be empty".into()));
    }
    let payload = json!({
        "user_id": user_id,
        "title": form.title,
        "message": form.message,
        "sent_by": operator.username,
    });
    // Unlike config/prompt events there is no store commit behind this;
    // a publish failure is the operation failing.
    state.bus.publish(topics::PUSH_USER, &payload).await
}
