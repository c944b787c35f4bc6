//! The `/time/` page: a bare document that opens the websocket and
//! shows whatever `time` value arrives.

const PAGE_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>webtime</title>
<style>
html, body { margin: 0; padding: 0; width: 100%; height: 100%; overflow: hidden; background: gray; }
#webtime { position: absolute; top: 48%; width: 100%; background: white; font-size: 3em; text-align: center; }
#error { position: absolute; top: 0.5em; left: 0.5em; right: 0.5em; padding: 0.5em; background: red; color: white; visibility: hidden; }
</style>
</head>
<body>
<div id="error"></div>
<div id="webtime"></div>
<script>
(function () {
    var timeDiv = document.getElementById("webtime");
    var errDiv = document.getElementById("error");

    function showError(msg) {
        errDiv.textContent = msg;
        errDiv.style.visibility = "visible";
    }

    if (!window.WebSocket) {
        showError("Your browser does not support WebSockets.");
        return;
    }

    var conn = new WebSocket("ws://{{HOST}}/ws/");
    conn.onmessage = function (evt) {
        var update = JSON.parse(evt.data);
        timeDiv.textContent = update.time;
    };
    conn.onclose = function () {
        showError("Connection closed.");
    };
})();
</script>
</body>
</html>
"#;

/// Renders the page with the websocket pointed at `host`.
pub fn render(host: &str) -> String {
    PAGE_TEMPLATE.replace("{{HOST}}", host)
}

/// Returns `host` if it is safe to embed in the page, otherwise `fallback`.
///
/// Accepts host names, IPv4/IPv6 literals and an optional port.
pub fn sanitize_host<'a>(host: Option<&'a str>, fallback: &'a str) -> &'a str {
    match host {
        Some(h)
            if !h.is_empty()
                && h.chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | ':' | '[' | ']')) =>
        {
            h
        }
        _ => fallback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_substitutes_host() {
        let page = render("example.com:8888");
        assert!(page.contains("ws://example.com:8888/ws/"));
        assert!(!page.contains("{{HOST}}"));
    }

    #[test]
    fn test_sanitize_accepts_hosts() {
        assert_eq!(sanitize_host(Some("localhost:8888"), "x"), "localhost:8888");
        assert_eq!(sanitize_host(Some("[::1]:80"), "x"), "[::1]:80");
    }

    #[test]
    fn test_sanitize_rejects_markup() {
        assert_eq!(
            sanitize_host(Some("evil\"/><script>"), "localhost:8888"),
            "localhost:8888"
        );
        assert_eq!(sanitize_host(Some(""), "fallback"), "fallback");
        assert_eq!(sanitize_host(None, "fallback"), "fallback");
    }
}
