/// Renders the static landing page: one URL field that posts to `/api/download`
/// and lists the returned download links.
pub fn render_home() -> String {
    r#"<!DOCTYPE html>
<html lang="en" data-theme="dark">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Spidey</title>
<link rel="stylesheet" href="https://cdn.jsdelivr.net/npm/@picocss/pico@2/css/pico.min.css">
</head>
<body>
<main class="container">
<hgroup>
<h1>Spidey</h1>
<p>Download photos and videos from public Instagram posts, reels and stories</p>
</hgroup>

<form id="resolve">
<fieldset role="group">
<input type="text" name="url" placeholder="https://www.instagram.com/p/..." required>
<input type="submit" value="Fetch">
</fieldset>
</form>
<p id="status"></p>
<ul id="results"></ul>

<footer>
<p><small>Powered by Cloudflare Workers</small></p>
</footer>
</main>
<script>
const form = document.getElementById("resolve");
const status = document.getElementById("status");
const results = document.getElementById("results");
const sessionId = localStorage.getItem("spidey_session") || crypto.randomUUID();
localStorage.setItem("spidey_session", sessionId);

form.addEventListener("submit", async (event) => {
  event.preventDefault();
  results.replaceChildren();
  status.textContent = "Working...";
  const resp = await fetch("/api/download", {
    method: "POST",
    headers: { "Content-Type": "application/json" },
    body: JSON.stringify({ url: form.url.value, sessionId }),
  });
  const body = await resp.json();
  if (!body.success) {
    status.textContent = body.error;
    return;
  }
  status.textContent = `${body.count} item(s) found`;
  for (const item of body.media) {
    const link = document.createElement("a");
    link.href = item.downloadUrl;
    link.textContent = `${item.type} (${item.quality}) ${item.filename}`;
    const li = document.createElement("li");
    li.append(link);
    results.append(li);
  }
});
</script>
</body>
</html>"#
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn home_contains_title() {
        let html = render_home();
        assert!(html.contains("<title>Spidey</title>"));
    }

    #[test]
    fn home_posts_to_download_api() {
        let html = render_home();
        assert!(html.contains(r#"fetch("/api/download""#));
        assert!(html.contains("sessionId"));
    }
}
