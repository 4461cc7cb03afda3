use serde_json::Value;
use std::fs;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::{Arc, Mutex};
use std::thread;

const AS_OF: [&str; 4] = ["--as-of", "2026-02-15", "--timezone", "UTC"];

fn run_jobflow(args: &[&str], home: &Path, envs: &[(&str, &str)]) -> (bool, Vec<u8>, Vec<u8>) {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_jobflow"));
    cmd.args(args)
        .env("JOBFLOW_HOME", home)
        .env_remove("JOBFLOW_LOG")
        .env_remove("JOBFLOW_SUPABASE_URL")
        .env_remove("JOBFLOW_SUPABASE_ANON_KEY")
        .env_remove("SUPABASE_URL")
        .env_remove("SUPABASE_ANON_KEY")
        .stdin(Stdio::null());
    for (k, v) in envs {
        cmd.env(k, v);
    }
    let output = cmd.output().expect("run jobflow");
    (output.status.success(), output.stdout, output.stderr)
}

fn demo_json(args: &[&str], home: &Path) -> Value {
    let mut full = vec!["--demo", "-j"];
    full.extend(AS_OF);
    full.extend(args);
    let (ok, stdout, stderr) = run_jobflow(&full, home, &[]);
    assert!(ok, "stderr: {}", String::from_utf8_lossy(&stderr));
    serde_json::from_slice(&stdout).expect("json")
}

fn ids(rows: &Value) -> Vec<&str> {
    rows.as_array()
        .expect("array output")
        .iter()
        .filter_map(|r| r["id"].as_str())
        .collect()
}

#[test]
fn demo_dashboard_json_summarizes_fixtures() {
    let home = tempfile::tempdir().expect("temp dir");
    let json = demo_json(&["dashboard"], home.path());

    let summary = &json["summary"];
    assert_eq!(summary["total"], 6);
    assert_eq!(summary["active"], 5);
    assert_eq!(summary["offers"], 1);
    assert_eq!(summary["responded"], 5);
    assert_eq!(summary["response_rate"], 83.3);
    assert_eq!(summary["overdue_follow_ups"], 1);
    assert_eq!(summary["due_today"], 0);
    assert_eq!(summary["stale"], 2);

    assert_eq!(json["view"], "month");
    assert_eq!(json["activity"].as_array().map(Vec::len), Some(12));
    assert_eq!(json["months"][0]["key"], "2026-02");
    assert_eq!(json["selected_month"]["applications"], 2);
}

#[test]
fn demo_dashboard_day_view_and_month_pick() {
    let home = tempfile::tempdir().expect("temp dir");
    let json = demo_json(&["dashboard", "--view", "day", "--month", "2025-11"], home.path());
    let activity = json["activity"].as_array().expect("activity");
    assert_eq!(activity.len(), 14);
    assert_eq!(activity[13]["key"], "2026-02-15");
    assert_eq!(json["selected_month"]["key"], "2025-11");
}

#[test]
fn demo_list_json_is_newest_first_and_filters() {
    let home = tempfile::tempdir().expect("temp dir");
    let all = demo_json(&["list"], home.path());
    assert_eq!(
        ids(&all),
        ["demo-app-5", "demo-app-1", "demo-app-2", "demo-app-3", "demo-app-4", "demo-app-6"]
    );
    assert_eq!(all[0]["stage"], "OA");
    assert_eq!(all[0]["link"], "https://example.com/oa/platform-engineer");

    let overdue = demo_json(&["list", "--overdue"], home.path());
    assert_eq!(ids(&overdue), ["demo-app-2"]);

    let oldest_first = demo_json(&["--order", "asc", "list", "--since", "2026-01-01"], home.path());
    assert_eq!(
        ids(&oldest_first),
        ["demo-app-3", "demo-app-2", "demo-app-1", "demo-app-5"]
    );
}

#[test]
fn demo_list_csv_has_header_and_rows() {
    let home = tempfile::tempdir().expect("temp dir");
    let mut args = vec!["--demo", "--csv"];
    args.extend(AS_OF);
    args.push("list");
    let (ok, stdout, stderr) = run_jobflow(&args, home.path(), &[]);
    assert!(ok, "stderr: {}", String::from_utf8_lossy(&stderr));
    let text = String::from_utf8(stdout).expect("utf8");
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 7);
    assert!(lines[0].starts_with("id,company,role,stage,status"));
    assert!(lines[1].starts_with("demo-app-5,OrbitScale,Platform Engineer,OA,Active"));
}

#[test]
fn demo_show_includes_notes() {
    let home = tempfile::tempdir().expect("temp dir");
    let json = demo_json(&["show", "demo-app-2"], home.path());
    assert_eq!(json["company_name"], "BluePeak AI");
    assert_eq!(json["notes"].as_array().map(Vec::len), Some(1));

    let (ok, _, stderr) = run_jobflow(&["--demo", "show", "nope"], home.path(), &[]);
    assert!(!ok);
    assert!(String::from_utf8_lossy(&stderr).contains("Application not found: nope"));
}

#[test]
fn demo_mode_rejects_writes() {
    let home = tempfile::tempdir().expect("temp dir");
    let (ok, _, stderr) = run_jobflow(&["demo"], home.path(), &[]);
    assert!(ok, "stderr: {}", String::from_utf8_lossy(&stderr));

    let (ok, _, stderr) = run_jobflow(
        &["note", "demo-app-1", "Called the recruiter"],
        home.path(),
        &[],
    );
    assert!(!ok);
    assert!(String::from_utf8_lossy(&stderr).contains("Demo mode is read-only"));
}

#[test]
fn signed_out_without_backend_config_fails() {
    let home = tempfile::tempdir().expect("temp dir");
    let (ok, stdout, stderr) = run_jobflow(&["list"], home.path(), &[]);
    assert!(!ok);
    assert!(stdout.is_empty());
    assert!(String::from_utf8_lossy(&stderr).contains("Missing Supabase configuration"));
}

#[test]
fn unknown_stage_is_rejected_by_the_parser() {
    let home = tempfile::tempdir().expect("temp dir");
    let (ok, _, stderr) = run_jobflow(&["--demo", "list", "--stage", "Hired"], home.path(), &[]);
    assert!(!ok);
    assert!(String::from_utf8_lossy(&stderr).contains("Hired"));
}

#[test]
fn delete_without_yes_is_refused() {
    let home = tempfile::tempdir().expect("temp dir");
    let (ok, _, stderr) = run_jobflow(&["--demo", "delete", "demo-app-1"], home.path(), &[]);
    assert!(!ok);
    assert!(String::from_utf8_lossy(&stderr).contains("without --yes"));
}

#[test]
fn offline_without_session_is_not_signed_in() {
    let home = tempfile::tempdir().expect("temp dir");
    let (ok, _, stderr) = run_jobflow(&["--offline", "list"], home.path(), &[]);
    assert!(!ok);
    assert!(String::from_utf8_lossy(&stderr).contains("Not signed in"));
}

type Route = fn(&str, &str) -> (u16, &'static str);

struct FakeBackend {
    url: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl FakeBackend {
    fn start(route: Route) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let url = format!("http://{}", listener.local_addr().expect("local addr"));
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&requests);
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                let seen = Arc::clone(&seen);
                thread::spawn(move || serve_one(stream, route, &seen));
            }
        });
        Self { url, requests }
    }

    fn envs(&self) -> [(&str, &str); 2] {
        [
            ("JOBFLOW_SUPABASE_URL", self.url.as_str()),
            ("JOBFLOW_SUPABASE_ANON_KEY", "anon-key"),
        ]
    }

    fn seen(&self, prefix: &str) -> bool {
        self.requests
            .lock()
            .expect("requests")
            .iter()
            .any(|r| r.starts_with(prefix))
    }
}

fn read_body(reader: &mut BufReader<TcpStream>, content_length: usize, chunked: bool) {
    if !chunked {
        let mut body = vec![0; content_length];
        let _ = reader.read_exact(&mut body);
        return;
    }
    loop {
        let mut size = String::new();
        if reader.read_line(&mut size).unwrap_or(0) == 0 {
            return;
        }
        let n = usize::from_str_radix(size.trim(), 16).unwrap_or(0);
        let mut chunk = vec![0; n + 2];
        if reader.read_exact(&mut chunk).is_err() || n == 0 {
            return;
        }
    }
}

fn serve_one(mut stream: TcpStream, route: Route, seen: &Mutex<Vec<String>>) {
    let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));
    let mut request_line = String::new();
    if reader.read_line(&mut request_line).is_err() {
        return;
    }

    let mut content_length = 0;
    let mut chunked = false;
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).unwrap_or(0) == 0 {
            break;
        }
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            match name.trim().to_ascii_lowercase().as_str() {
                "content-length" => content_length = value.trim().parse().unwrap_or(0),
                "transfer-encoding" => chunked = value.to_ascii_lowercase().contains("chunked"),
                _ => {}
            }
        }
    }
    read_body(&mut reader, content_length, chunked);

    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default();
    let target = parts.next().unwrap_or_default();
    seen.lock().expect("requests").push(format!("{method} {target}"));

    let path = target.split('?').next().unwrap_or_default();
    let (status, body) = route(method, path);
    let response = format!(
        "HTTP/1.1 {status} OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    let _ = stream.write_all(response.as_bytes());
}

fn hosted(method: &str, path: &str) -> (u16, &'static str) {
    match (method, path) {
        ("POST", "/auth/v1/token") => (
            200,
            r#"{"access_token":"acc-1","refresh_token":"ref-1","expires_in":3600,"token_type":"bearer"}"#,
        ),
        ("GET", "/auth/v1/user") => (200, r#"{"id":"user-1","email":"ada@example.com"}"#),
        ("POST", "/auth/v1/logout") => (204, ""),
        ("GET", "/rest/v1/applications") => (
            200,
            r#"[
                {"id":"app-2","company_id":"co-1","role_title":"Data Engineer","stage":"Interview","status":"Active","applied_at":"2026-02-10","last_touch_at":"2026-02-12T10:00:00Z","created_at":"2026-02-10T09:00:00Z"},
                {"id":"app-1","company_id":"co-2","role_title":"SRE","stage":"Applied","status":"Active","applied_at":"2026-01-05","last_touch_at":"2026-01-05T10:00:00Z","created_at":"2026-01-05T09:00:00Z"}
            ]"#,
        ),
        ("GET", "/rest/v1/companies") => (
            200,
            r#"[{"id":"co-1","name":"Acme"},{"id":"co-2","name":"Globex"}]"#,
        ),
        ("GET", _) => (200, "[]"),
        _ => (404, r#"{"message":"not found"}"#),
    }
}

fn rejecting(method: &str, path: &str) -> (u16, &'static str) {
    match (method, path) {
        ("POST", "/auth/v1/token") => (
            400,
            r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#,
        ),
        _ => (404, "{}"),
    }
}

#[test]
fn login_then_list_then_offline_list() {
    let backend = FakeBackend::start(hosted);
    let home = tempfile::tempdir().expect("temp dir");
    let envs = backend.envs();

    let (ok, stdout, stderr) = run_jobflow(
        &["login", "--email", "ada@example.com", "--password", "secret-pass"],
        home.path(),
        &envs,
    );
    assert!(ok, "stderr: {}", String::from_utf8_lossy(&stderr));
    assert!(String::from_utf8_lossy(&stdout).contains("Signed in as ada@example.com"));
    assert!(backend.seen("POST /auth/v1/token?grant_type=password"));

    let session = read_session(home.path());
    assert_eq!(session["access_token"], "acc-1");
    assert_eq!(session["user_id"], "user-1");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = fs::metadata(home.path().join("session.json"))
            .expect("metadata")
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    let mut args = vec!["-j"];
    args.extend(AS_OF);
    args.push("list");
    let (ok, stdout, stderr) = run_jobflow(&args, home.path(), &envs);
    assert!(ok, "stderr: {}", String::from_utf8_lossy(&stderr));
    let online: Value = serde_json::from_slice(&stdout).expect("json");
    assert_eq!(ids(&online), ["app-2", "app-1"]);
    assert_eq!(online[0]["company"], "Acme");
    assert!(backend.seen("GET /rest/v1/applications?"));

    // no backend configured: only the snapshot can answer
    let mut args = vec!["-j", "--offline"];
    args.extend(AS_OF);
    args.push("list");
    let (ok, stdout, stderr) = run_jobflow(&args, home.path(), &[]);
    assert!(ok, "stderr: {}", String::from_utf8_lossy(&stderr));
    let offline: Value = serde_json::from_slice(&stdout).expect("json");
    assert_eq!(offline, online);

    let (ok, _, stderr) = run_jobflow(&["logout"], home.path(), &envs);
    assert!(ok, "stderr: {}", String::from_utf8_lossy(&stderr));
    assert!(backend.seen("POST /auth/v1/logout"));
    assert!(!home.path().join("session.json").exists());
}

#[test]
fn rejected_login_reports_the_service_message() {
    let backend = FakeBackend::start(rejecting);
    let home = tempfile::tempdir().expect("temp dir");
    let (ok, _, stderr) = run_jobflow(
        &["login", "--email", "ada@example.com", "--password", "wrong-pass"],
        home.path(),
        &backend.envs(),
    );
    assert!(!ok);
    assert!(String::from_utf8_lossy(&stderr).contains("Invalid login credentials"));
    assert!(!home.path().join("session.json").exists());
}

fn sign_in(backend: &FakeBackend, home: &Path) {
    let (ok, _, stderr) = run_jobflow(
        &["login", "--email", "ada@example.com", "--password", "secret-pass"],
        home,
        &backend.envs(),
    );
    assert!(ok, "stderr: {}", String::from_utf8_lossy(&stderr));
}

fn read_session(home: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(home.join("session.json")).expect("session"))
        .expect("session json")
}

#[test]
fn offline_writes_never_reach_the_backend() {
    let backend = FakeBackend::start(hosted);
    let home = tempfile::tempdir().expect("temp dir");
    sign_in(&backend, home.path());

    let (ok, _, stderr) = run_jobflow(
        &["--offline", "note", "app-1", "Called the recruiter"],
        home.path(),
        &backend.envs(),
    );
    assert!(!ok);
    assert!(String::from_utf8_lossy(&stderr).contains("Offline mode is read-only"));
    assert!(!backend.seen("POST /rest/v1/"));
    assert!(!backend.seen("PATCH /rest/v1/"));

    let (ok, _, stderr) = run_jobflow(
        &["--offline", "login", "--email", "ada@example.com", "--password", "secret-pass"],
        home.path(),
        &backend.envs(),
    );
    assert!(!ok);
    assert!(String::from_utf8_lossy(&stderr).contains("Offline mode is read-only"));
}

#[test]
fn demo_command_keeps_the_signed_in_session() {
    let backend = FakeBackend::start(hosted);
    let home = tempfile::tempdir().expect("temp dir");
    sign_in(&backend, home.path());

    let (ok, _, stderr) = run_jobflow(&["demo"], home.path(), &backend.envs());
    assert!(ok, "stderr: {}", String::from_utf8_lossy(&stderr));
    let session = read_session(home.path());
    assert_eq!(session["demo"], true);
    assert_eq!(session["access_token"], "acc-1");
    assert_eq!(session["refresh_token"], "ref-1");
    assert_eq!(session["user_id"], "user-1");

    // the live session still wins over the demo flag
    let mut args = vec!["-j"];
    args.extend(AS_OF);
    args.push("list");
    let (ok, stdout, stderr) = run_jobflow(&args, home.path(), &backend.envs());
    assert!(ok, "stderr: {}", String::from_utf8_lossy(&stderr));
    let rows: Value = serde_json::from_slice(&stdout).expect("json");
    assert_eq!(ids(&rows), ["app-2", "app-1"]);
}
