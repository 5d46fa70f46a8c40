use axum::response::Html;

/// Banner served at `/` so operators can see the process is up.
pub async fn index() -> Html<&'static str> {
    Html("<h1>Twilio Media Stream Server is running!</h1>")
}
