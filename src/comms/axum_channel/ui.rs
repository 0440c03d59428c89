//! The single static chat page served at `/`.

use axum::response::Html;

const CHAT_HTML: &str = r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <title>Assistant</title>
  <style>
    *, *::before, *::after { box-sizing: border-box; margin: 0; padding: 0; }
    body {
      font-family: system-ui, -apple-system, sans-serif;
      background: #0f0f0f; color: #e0e0e0;
      display: grid; grid-template-columns: 1fr 320px; gap: 1rem;
      height: 100vh; padding: 1rem;
    }
    main, aside { display: flex; flex-direction: column; gap: 1rem; min-height: 0; }
    .panel {
      border: 1px solid #333; border-radius: 12px; background: #1a1a1a;
      padding: 1rem; white-space: pre-wrap; font-size: 0.9rem;
    }
    #log { flex: 1; overflow-y: auto; display: flex; flex-direction: column; gap: 0.6rem; }
    .msg { padding: 0.6rem 0.9rem; border-radius: 10px; max-width: 80%; white-space: pre-wrap; }
    .user { align-self: flex-end; background: #2a2a3a; }
    .bot  { align-self: flex-start; background: #222; border: 1px solid #333; }
    form { display: flex; gap: 0.5rem; }
    input {
      flex: 1; padding: 0.7rem; border-radius: 10px; border: 1px solid #333;
      background: #141414; color: inherit; font-size: 1rem;
    }
    button {
      padding: 0.6rem 1rem; border: 0; border-radius: 8px;
      background: #2a2a3a; color: #c0c0e0; cursor: pointer;
    }
    button:hover { background: #3a3a5a; }
    .row { display: flex; gap: 0.5rem; }
    #actions { flex: 1; overflow-y: auto; }
  </style>
</head>
<body>
  <main>
    <div id="log" class="panel"></div>
    <form id="form">
      <input id="input" autocomplete="off" placeholder="Book a meeting with Sara tomorrow at 3pm…" />
      <button type="submit">Send</button>
    </form>
  </main>
  <aside>
    <div id="status" class="panel">💬 **Idle**

Ready for your next request!</div>
    <div class="row">
      <button id="reset">New conversation</button>
      <button id="clear">Clear outbox</button>
    </div>
    <div id="actions" class="panel"></div>
  </aside>
  <script>
    const log = document.getElementById('log');
    const input = document.getElementById('input');
    const statusEl = document.getElementById('status');
    const actionsEl = document.getElementById('actions');
    let sessionId = localStorage.getItem('session_id');

    function add(cls, text) {
      const div = document.createElement('div');
      div.className = 'msg ' + cls;
      div.textContent = text;
      log.appendChild(div);
      log.scrollTop = log.scrollHeight;
    }

    async function refreshActions() {
      const res = await fetch('/api/actions');
      if (res.ok) actionsEl.textContent = (await res.json()).panel;
    }

    document.getElementById('form').addEventListener('submit', async (ev) => {
      ev.preventDefault();
      const message = input.value.trim();
      if (!message) return;
      input.value = '';
      add('user', message);
      const res = await fetch('/api/message', {
        method: 'POST',
        headers: { 'content-type': 'application/json' },
        body: JSON.stringify({ message, session_id: sessionId }),
      });
      const body = await res.json();
      if (!res.ok) { add('bot', body.message || 'Request failed'); return; }
      sessionId = body.session_id;
      localStorage.setItem('session_id', sessionId);
      add('bot', body.reply);
      statusEl.textContent = body.status;
      if (body.execution) refreshActions();
    });

    document.getElementById('reset').addEventListener('click', async () => {
      if (sessionId) {
        const res = await fetch('/api/session/' + sessionId + '/reset', { method: 'POST' });
        if (res.ok) statusEl.textContent = (await res.json()).status;
      }
      log.innerHTML = '';
    });

    document.getElementById('clear').addEventListener('click', async () => {
      await fetch('/api/actions', { method: 'DELETE' });
      refreshActions();
    });

    refreshActions();
  </script>
</body>
</html>
"#;

/// GET /
pub(super) async fn root() -> Html<&'static str> {
    Html(CHAT_HTML)
}
