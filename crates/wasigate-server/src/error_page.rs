//! The fixed HTML error document.
//!
//! All failure variants collapse into this one page; the error's display
//! text is embedded so operators can see what went wrong without log
//! access, followed by a fixed explanatory sentence.

/// Sentence shown under every error message.
const EXPLANATION: &str = "The WASI runtime was unable to execute the module.";

/// Renders the 500 error page around the given failure text.
#[must_use]
pub fn render(message: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <title>wasigate error</title>
  <style>
    body {{ font-family: Arial, sans-serif; margin: 40px; }}
    .error {{ background: #f8d7da; color: #721c24; padding: 20px; border-radius: 5px; }}
  </style>
</head>
<body>
  <h1>wasigate error</h1>
  <div class="error">
    <p><strong>Error:</strong> {}</p>
    <p>{EXPLANATION}</p>
  </div>
</body>
</html>
"#,
        escape(message)
    )
}

/// Minimal HTML escaping for the embedded message.
fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embeds_message() {
        let page = render("module trapped: unreachable");
        assert!(page.contains("module trapped: unreachable"));
        assert!(page.contains(EXPLANATION));
        assert!(page.starts_with("<!DOCTYPE html>"));
    }

    #[test]
    fn test_escapes_markup_in_message() {
        let page = render("<script>alert(1)</script>");
        assert!(!page.contains("<script>"));
        assert!(page.contains("&lt;script&gt;"));
    }
}
