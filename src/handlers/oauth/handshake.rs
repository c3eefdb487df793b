//! Pages served to the login popup. Both speak the CMS client's popup
//! protocol: announce `authorizing:<provider>` to `window.opener`, wait for
//! the opener to answer, then reply to the answering origin with
//! `authorization:<provider>:<success|error>:<json>`. Replies go only to the
//! opener window itself and only when its origin is on the allow list; the
//! popup can be opened by any site with a plain navigation.

use serde_json::json;

/// Success page. It carries no token itself: the token travels in the URL
/// fragment and is read client-side, so the page is the same on every GET.
pub fn success_page(provider: &str, allowed_origins: &[String]) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="referrer" content="no-referrer">
    <title>Authorization complete</title>
</head>
<body>
    <p id="status">Authorization complete. You may close this window.</p>
    <script>
    (function () {{
        var provider = {provider};
        var allowedOrigins = {allowed_origins};
        var params = new URLSearchParams(window.location.hash.slice(1));
        var token = params.get("token");
        if (window.history && window.history.replaceState) {{
            window.history.replaceState(null, "", window.location.pathname + window.location.search);
        }}
        if (!token) {{
            document.getElementById("status").textContent =
                "No access token was received. Please close this window and try logging in again.";
            return;
        }}
        if (!window.opener) {{
            return;
        }}
        var payload = JSON.stringify({{ token: token, provider: provider }});
        function receiveMessage(message) {{
            if (message.source !== window.opener || allowedOrigins.indexOf(message.origin) === -1) {{
                return;
            }}
            window.removeEventListener("message", receiveMessage, false);
            window.opener.postMessage("authorization:" + provider + ":success:" + payload, message.origin);
            window.close();
        }}
        window.addEventListener("message", receiveMessage, false);
        window.opener.postMessage("authorizing:" + provider, "*");
    }})();
    </script>
</body>
</html>
"#,
        provider = js_literal(&json!(provider)),
        allowed_origins = js_literal(&json!(allowed_origins)),
    )
}

/// Error page for failed exchanges. Shows the reason and forwards it to the
/// opener so the CMS can surface it next to its login button.
pub fn error_page(
    provider: &str,
    allowed_origins: &[String],
    code: &str,
    description: &str,
) -> String {
    let payload = json!({ "error": code, "error_description": description });
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>Authorization failed</title>
</head>
<body>
    <h1>Authorization failed</h1>
    <p><code>{code_html}</code>: {description_html}</p>
    <p>Close this window and start the login again.</p>
    <script>
    (function () {{
        var provider = {provider};
        var allowedOrigins = {allowed_origins};
        var payload = JSON.stringify({payload});
        if (!window.opener) {{
            return;
        }}
        function receiveMessage(message) {{
            if (message.source !== window.opener || allowedOrigins.indexOf(message.origin) === -1) {{
                return;
            }}
            window.removeEventListener("message", receiveMessage, false);
            window.opener.postMessage("authorization:" + provider + ":error:" + payload, message.origin);
        }}
        window.addEventListener("message", receiveMessage, false);
        window.opener.postMessage("authorizing:" + provider, "*");
    }})();
    </script>
</body>
</html>
"#,
        code_html = escape_html(code),
        description_html = escape_html(description),
        provider = js_literal(&json!(provider)),
        allowed_origins = js_literal(&json!(allowed_origins)),
        payload = js_literal(&payload),
    )
}

/// JSON is valid JavaScript; `<`, `>` and `&` are escaped so the value cannot
/// close the surrounding script element.
fn js_literal(value: &serde_json::Value) -> String {
    value
        .to_string()
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026")
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
