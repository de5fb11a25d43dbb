use axum::response::Html;

/// The browser UI: plain HTML and a little script talking to the JSON API.
const INDEX_HTML: &str = include_str!("../../static/index.html");

/// GET /
pub async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}
