//! End-to-end tests for the `vt` binary.
//!
//! Each test gets its own HOME and database so nothing leaks between runs.
//! stdout is a pipe under test, so every command answers in JSON.

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

const ADMIN: &str = "ana@acme.io";

struct Env {
    home: TempDir,
}

impl Env {
    fn new() -> Self {
        Self {
            home: TempDir::new().unwrap(),
        }
    }

    fn db(&self) -> std::path::PathBuf {
        self.home.path().join("venturer.db")
    }

    fn vt(&self) -> Command {
        let mut cmd = Command::cargo_bin("vt").unwrap();
        cmd.env_clear()
            .env("HOME", self.home.path())
            .env("VT_USER", ADMIN)
            .arg("--db")
            .arg(self.db());
        cmd
    }

    fn json(&self, args: &[&str]) -> Value {
        let out = self.vt().args(args).assert().success().get_output().stdout.clone();
        serde_json::from_slice(&out).unwrap()
    }

    fn init(&self) {
        self.vt().args(["init", "--admin", ADMIN]).assert().success();
    }

    fn id(&self, args: &[&str]) -> String {
        self.json(args)["id"].as_str().unwrap().to_string()
    }
}

#[test]
fn test_commands_require_init() {
    let env = Env::new();
    env.vt().args(["venture", "list"]).assert().failure().code(2);
}

#[test]
fn test_init_refuses_to_overwrite() {
    let env = Env::new();
    env.init();
    env.vt().arg("init").assert().failure().code(2);
    env.vt().args(["init", "--force"]).assert().success();
}

#[test]
fn test_hierarchy_and_step_ordering() {
    let env = Env::new();
    env.init();

    let venture = env.id(&["venture", "create", "Acme Labs"]);
    let project = env.id(&["project", "create", "Launch", "--venture", &venture]);

    env.id(&["item", "create", "Low", "--project", &project, "-P", "low", "-S", "4"]);
    env.id(&["item", "create", "High", "--project", &project, "-P", "high", "-S", "2"]);
    env.id(&["item", "create", "Unset", "--project", &project]);

    let list = env.json(&["item", "list", "--project", &project]);
    let titles: Vec<&str> = list["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["High", "Low", "Unset"]);

    let filtered = env.json(&["item", "list", "--project", &project, "-S", "1,2"]);
    assert_eq!(filtered["count"], 1);

    let ventures = env.json(&["venture", "list"]);
    assert_eq!(ventures["count"], 1);
}

#[test]
fn test_step_values_are_range_checked() {
    let env = Env::new();
    env.init();

    env.vt()
        .args(["item", "create", "Too far", "-S", "7"])
        .assert()
        .failure()
        .code(4);
    env.vt()
        .args(["item", "create", "Too hard", "-E", "0"])
        .assert()
        .failure()
        .code(4);
}

#[test]
fn test_subtask_inherits_scope_and_complete() {
    let env = Env::new();
    env.init();

    let venture = env.id(&["venture", "create", "Acme"]);
    let project = env.id(&["project", "create", "Site", "--venture", &venture]);
    let parent = env.id(&["item", "create", "Redesign", "--project", &project]);
    let child = env.json(&["item", "create", "Wireframes", "--parent", &parent]);
    assert_eq!(child["project_id"].as_str(), Some(project.as_str()));

    let child_id = child["id"].as_str().unwrap();
    let done = env.json(&["item", "complete", child_id]);
    assert_eq!(done["items"][0]["status"], "completed");

    let shown = env.json(&["item", "show", &parent]);
    assert_eq!(shown["subtasks"].as_array().unwrap().len(), 1);
}

#[test]
fn test_associations_reject_self_links_and_duplicates() {
    let env = Env::new();
    env.init();

    let a = env.id(&["item", "create", "A"]);
    let b = env.id(&["item", "create", "B"]);

    env.json(&["assoc", "add", &a, "blocks", &b]);
    env.vt()
        .args(["assoc", "add", a.as_str(), "blocks", b.as_str()])
        .assert()
        .failure()
        .code(5);
    env.vt()
        .args(["assoc", "add", a.as_str(), "relates_to", a.as_str()])
        .assert()
        .failure()
        .code(4);

    let links = env.json(&["assoc", "list", &b]);
    assert_eq!(links["incoming"].as_array().unwrap().len(), 1);
}

#[test]
fn test_report_csv() {
    let env = Env::new();
    env.init();

    let venture = env.id(&["venture", "create", "Acme"]);
    env.id(&["item", "create", "One", "--venture", &venture, "-a", ADMIN]);

    let out = env
        .vt()
        .args(["report", "--venture", venture.as_str(), "--format", "csv"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8(out).unwrap();
    assert!(text.starts_with("metric,value"));
    assert!(text.contains("total,1"));
    assert!(text.contains(&format!("assignee.{ADMIN}.open,1")));
}

#[test]
fn test_template_export_import() {
    let env = Env::new();
    env.init();

    let venture = env.id(&["venture", "create", "Acme"]);
    let project = env.id(&["project", "create", "Launch", "--venture", &venture]);
    env.id(&["milestone", "create", "Beta", "--project", &project]);
    let task = env.id(&["item", "create", "Press kit", "--project", &project, "-S", "3"]);
    env.id(&["item", "create", "Logo", "--parent", &task]);

    let template = env.id(&["template", "create", "Launch kit", "--project", &project]);
    let file = env.home.path().join("launch.json");
    env.vt()
        .args(["template", "export", template.as_str(), "-o"])
        .arg(&file)
        .assert()
        .success();

    let imported = env.json(&["template", "import", file.to_str().unwrap()]);
    assert_eq!(imported["name"], "Launch kit (Imported)");
    assert_eq!(imported["milestones"], 1);
    assert_eq!(imported["items"], 2);

    let applied = env.json(&[
        "template",
        "apply",
        imported["id"].as_str().unwrap(),
        "--venture",
        &venture,
        "--name",
        "Relaunch",
    ]);
    assert_eq!(applied["items"], 2);
}

#[test]
fn test_invalid_template_file() {
    let env = Env::new();
    env.init();

    let file = env.home.path().join("bad.json");
    std::fs::write(&file, r#"{"template": {"name": "x"}}"#).unwrap();
    env.vt()
        .args(["template", "import"])
        .arg(&file)
        .assert()
        .failure()
        .code(6);
}

#[test]
fn test_user_token_and_plan() {
    let env = Env::new();
    env.init();

    let me = env.json(&["user", "me"]);
    assert_eq!(me["email"], ADMIN);
    assert_eq!(me["subscription"]["plan"], "free");

    let token = env.json(&["user", "token", ADMIN]);
    assert!(token["token"].as_str().unwrap().starts_with("vt_"));

    let plan = env.json(&["user", "plan", ADMIN, "--set", "pro"]);
    assert_eq!(plan["plan"], "pro");

    env.vt().args(["user", "token", "ghost@acme.io"]).assert().failure().code(3);
}
