//! Cleanup and validation of model output before it is returned as a dashboard.

/// Markers of template or server-side code. A static dashboard contains none of them.
const BANNED_PATTERNS: [&str; 5] = ["<?", "?>", "{{", "{%", "%}"];

/// Trims the output and removes markdown code fences the model sometimes adds
/// despite being told not to.
pub fn strip_code_fences(output: &str) -> String {
    let trimmed = output.trim();
    if !trimmed.starts_with("```") {
        return trimmed.to_string();
    }
    trimmed
        .replace("```html", "")
        .replace("```", "")
        .trim()
        .to_string()
}

/// Returns the first banned pattern found in `html`.
pub fn find_template_artifact(html: &str) -> Option<&'static str> {
    BANNED_PATTERNS
        .into_iter()
        .find(|pattern| html.contains(pattern))
}

/// Places generated markup inside a styled container document.
pub fn wrap_dashboard(html: &str) -> String {
    format!(
        r#"<html>
<head>
<link href="https://fonts.googleapis.com/css2?family=Poppins:wght@300;400;600&display=swap" rel="stylesheet">
<style>
body {{
    background: linear-gradient(135deg, #eef2ff, #f8fafc);
    font-family: 'Poppins', sans-serif;
}}
.dashboard-container {{
    max-width: 1000px;
    margin: 30px auto;
    padding: 25px;
    background: white;
    border-radius: 18px;
    box-shadow: 0 25px 50px rgba(0,0,0,0.08);
}}
</style>
</head>
<body>
<div class="dashboard-container">
{html}
</div>
</body>
</html>"#
    )
}
