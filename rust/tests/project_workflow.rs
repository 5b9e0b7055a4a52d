#![cfg(unix)]

mod common;

use cscope_project::indexer::UpdateLock;
use cscope_project::util::sha256_file;
use cscope_project::{
    CscopeError, ExCommandHost, FileSetCommand, ProjectContext, SessionEvent, Settings, Stage,
};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::{Path, PathBuf};

type Ctx = ProjectContext<ExCommandHost<Vec<u8>>>;

struct Fixture {
    dir: tempfile::TempDir,
    tools: tempfile::TempDir,
    root: PathBuf,
    cscope: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let tools = tempfile::tempdir().unwrap();
        let root = common::demo_project(dir.path());
        common::demo_config(dir.path(), &root);
        let cscope = {
            let _guard = common::spawn_guard();
            common::fake_cscope(tools.path())
        };
        Self {
            dir,
            tools,
            root,
            cscope,
        }
    }

    fn cwd(&self) -> &Path {
        self.dir.path()
    }

    fn base(&self) -> PathBuf {
        self.dir.path().join("cscope-base")
    }

    fn settings(&self) -> Settings {
        common::settings(&self.base(), &self.cscope)
    }

    fn context(&self) -> Ctx {
        ProjectContext::new(self.settings(), ExCommandHost::new(Vec::new()))
    }
}

fn host_lines(ctx: &Ctx) -> Vec<String> {
    String::from_utf8(ctx.host().get_ref().clone())
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn start_with_incomplete_config_creates_nothing() {
    let fx = Fixture::new();
    common::write_config(fx.cwd(), "cscope.cfg", "name = demo\nfiles = *.c\n");
    let mut ctx = fx.context();

    match ctx.start(None, fx.cwd()) {
        Err(CscopeError::ConfigMissingField { field, .. }) => assert_eq!(field, "path"),
        other => panic!("expected ConfigMissingField, got {:?}", other.map(|o| o.config_path)),
    }
    assert_eq!(ctx.stage(), Stage::Unconfigured);
    assert!(!fx.base().exists());
    assert!(host_lines(&ctx).is_empty());
}

#[test]
fn update_before_start_is_not_ready() {
    let fx = Fixture::new();
    let mut ctx = fx.context();

    assert!(matches!(ctx.update(), Err(CscopeError::FileListNotReady)));
    assert_eq!(ctx.file_set(), &FileSetCommand::NotReady);
    assert!(host_lines(&ctx).is_empty());
}

#[test]
fn start_update_and_refresh_cycle() {
    let fx = Fixture::new();
    let _guard = common::spawn_guard();
    let mut ctx = fx.context();

    let outcome = ctx.start(None, fx.cwd()).unwrap();
    assert_eq!(outcome.config_path, fx.cwd().join("cscope.cfg"));
    assert_eq!(outcome.workspace, fx.base().join("demo"));
    assert!(outcome.update.is_none());
    assert!(outcome.mapped_keys.is_none());
    assert_eq!(ctx.stage(), Stage::Configured);
    assert!(ctx.file_set().is_ready());

    let ws = ctx.workspace().unwrap().clone();
    assert!(ws.exists());

    let first = ctx.update().unwrap();
    assert!(first.is_success(), "{:?}", first.failures());
    assert_eq!(first.file_list.as_ref().unwrap().entries, 2);
    assert_eq!(
        first.session.as_ref().unwrap(),
        &Some(SessionEvent::Added(ws.index_path()))
    );
    assert_eq!(ctx.stage(), Stage::SessionActive);
    let listed = fs::read(ws.file_list_path()).unwrap();

    let second = ctx.update().unwrap();
    assert!(second.is_success());
    assert_eq!(second.session.unwrap(), Some(SessionEvent::Reset));
    assert_eq!(fs::read(ws.file_list_path()).unwrap(), listed);
    assert_eq!(common::cscope_invocations(fx.tools.path()).len(), 2);

    assert_eq!(
        host_lines(&ctx),
        vec![
            format!("cscope add {}", ws.index_path().display()),
            "cscope reset".to_string(),
        ]
    );
    assert!(!ws.lock_path().exists());
}

#[test]
fn explicit_config_argument_is_used() {
    let fx = Fixture::new();
    let other = fx.cwd().join("nested");
    fs::create_dir_all(&other).unwrap();
    common::write_config(
        &other,
        "alt.cfg",
        &format!("name = alt\npath = {}\nfiles = *.h\n", fx.root.display()),
    );
    let mut ctx = fx.context();

    let outcome = ctx.start(Some("nested/alt.cfg"), fx.cwd()).unwrap();
    assert_eq!(outcome.config_path, other.join("alt.cfg"));
    assert_eq!(ctx.config().unwrap().name, "alt");
    assert_eq!(outcome.workspace, fx.base().join("alt"));
}

#[test]
fn map_keys_registers_once() {
    let fx = Fixture::new();
    let mut ctx = fx.context();

    assert_eq!(ctx.map_keys().unwrap(), 25);
    assert_eq!(ctx.map_keys().unwrap(), 0);

    let lines = host_lines(&ctx);
    assert_eq!(lines.len(), 25);
    assert!(lines[..24].iter().all(|l| l.starts_with("nmap <unique> ")));
    assert_eq!(lines[24], "imap <C-@> <C-Space>");
    assert!(ctx.status().keys_mapped);
}

#[test]
fn start_runs_follow_ups_enabled_in_settings() {
    let fx = Fixture::new();
    let _guard = common::spawn_guard();
    let settings = Settings {
        update_on_start: true,
        map_keys: true,
        ..fx.settings()
    };
    let mut ctx = ProjectContext::new(settings, ExCommandHost::new(Vec::new()));

    let outcome = ctx.start(None, fx.cwd()).unwrap();
    let report = outcome.update.expect("update ran").unwrap();
    assert!(report.is_success());
    assert_eq!(outcome.mapped_keys.expect("keys mapped").unwrap(), 25);
    assert_eq!(ctx.stage(), Stage::SessionActive);
    assert_eq!(host_lines(&ctx).len(), 26);
}

#[test]
fn teardown_detaches_and_optionally_removes_workspace() {
    let fx = Fixture::new();
    let _guard = common::spawn_guard();
    let mut ctx = fx.context();
    ctx.start(None, fx.cwd()).unwrap();
    ctx.update().unwrap();
    let ws = ctx.workspace().unwrap().clone();

    assert_eq!(
        ctx.teardown(false).unwrap(),
        Some(SessionEvent::Detached(ws.index_path()))
    );
    assert_eq!(ctx.stage(), Stage::Indexed);
    assert!(ws.index_path().is_file());

    assert_eq!(ctx.teardown(true).unwrap(), None);
    assert_eq!(ctx.stage(), Stage::Unconfigured);
    assert!(!ws.exists());
    assert!(matches!(ctx.update(), Err(CscopeError::FileListNotReady)));

    assert_eq!(
        host_lines(&ctx).last().unwrap(),
        &format!("cscope kill {}", ws.index_path().display())
    );
}

#[test]
fn switching_projects_detaches_previous_index() {
    let fx = Fixture::new();
    let _guard = common::spawn_guard();
    let second = fx.cwd().join("second");
    fs::create_dir_all(&second).unwrap();
    common::write_config(
        &second,
        "cscope.cfg",
        &format!("name = second\npath = {}\nfiles = *.c\n", fx.root.display()),
    );
    let mut ctx = fx.context();

    ctx.start(None, fx.cwd()).unwrap();
    ctx.update().unwrap();
    let first_index = ctx.workspace().unwrap().index_path();

    ctx.start(None, fx.cwd()).unwrap();
    assert_eq!(ctx.stage(), Stage::SessionActive, "same project keeps its session");

    ctx.start(None, &second).unwrap();
    assert_eq!(ctx.stage(), Stage::Configured);
    let report = ctx.update().unwrap();
    let second_index = ctx.workspace().unwrap().index_path();
    assert_eq!(report.session.unwrap(), Some(SessionEvent::Added(second_index.clone())));

    assert_eq!(
        host_lines(&ctx),
        vec![
            format!("cscope add {}", first_index.display()),
            format!("cscope kill {}", first_index.display()),
            format!("cscope add {}", second_index.display()),
        ]
    );
}

#[test]
fn failed_discovery_still_builds_and_attaches() {
    let fx = Fixture::new();
    let _guard = common::spawn_guard();
    let settings = Settings {
        find_program: "no-such-find-program-xyz".to_string(),
        ..fx.settings()
    };
    let mut ctx = ProjectContext::new(settings, ExCommandHost::new(Vec::new()));
    ctx.start(None, fx.cwd()).unwrap();

    let report = ctx.update().unwrap();
    assert!(matches!(
        report.file_list,
        Err(CscopeError::FileListCommandError { .. })
    ));
    assert_eq!(report.index.as_ref().unwrap().bytes, 0);
    assert!(matches!(report.session, Ok(Some(SessionEvent::Added(_)))));

    let failures = report.failures();
    assert_eq!(failures.len(), 1);
    assert!(failures[0].starts_with("Couldn't update cscope.files: "));
}

#[test]
fn concurrent_update_is_refused() {
    let fx = Fixture::new();
    let mut ctx = fx.context();
    ctx.start(None, fx.cwd()).unwrap();

    let lock = UpdateLock::acquire(ctx.workspace().unwrap()).unwrap();
    match ctx.update() {
        Err(CscopeError::UpdateInProgress { project, .. }) => assert_eq!(project, "demo"),
        other => panic!("expected UpdateInProgress, got {:?}", other.map(|r| r.failures())),
    }
    drop(lock);
    assert!(host_lines(&ctx).is_empty());
}

#[test]
fn status_reports_configuration_and_artifacts() {
    let fx = Fixture::new();
    let _guard = common::spawn_guard();
    let mut ctx = fx.context();

    let idle = ctx.status();
    assert_eq!(idle.stage, Stage::Unconfigured);
    assert!(idle.project.is_none());
    assert!(idle.file_list.is_none());

    ctx.start(None, fx.cwd()).unwrap();
    let configured = ctx.status();
    assert_eq!(configured.stage, Stage::Configured);
    assert!(configured.file_list.is_none());
    assert_eq!(
        configured.file_set_command.as_deref(),
        Some(format!("find {} -name '*.c' -o -name '*.h'", fx.root.display()).as_str())
    );

    ctx.update().unwrap();
    let ws = ctx.workspace().unwrap().clone();
    let status = ctx.status();
    assert_eq!(status.project.as_deref(), Some("demo"));
    assert_eq!(status.root_path.as_deref(), Some(fx.root.as_path()));
    assert_eq!(status.file_patterns, vec!["*.c".to_string(), "*.h".to_string()]);
    assert!(status.library_paths.is_empty());
    assert_eq!(status.workspace, Some(ws.dir()));
    assert_eq!(status.session_index, Some(ws.index_path()));

    let list = status.file_list.as_ref().unwrap();
    assert_eq!(list.lines, Some(2));
    assert_eq!(
        list.sha256.as_deref(),
        Some(sha256_file(&ws.file_list_path()).unwrap().as_str())
    );
    let index = status.index.as_ref().unwrap();
    assert_eq!(index.bytes, list.bytes);
    assert!(index.sha256.is_none());

    let json = serde_json::to_value(&status).unwrap();
    assert_eq!(json["stage"], "session_active");
    assert_eq!(json["project"], "demo");
    assert_eq!(json["keys_mapped"], false);
}

#[test]
fn update_recreates_deleted_workspace() {
    let fx = Fixture::new();
    let _guard = common::spawn_guard();
    let mut ctx = fx.context();
    ctx.start(None, fx.cwd()).unwrap();
    let ws = ctx.workspace().unwrap().clone();

    fs::remove_dir_all(ws.dir()).unwrap();
    let report = ctx.update().unwrap();

    assert!(report.is_success(), "{:?}", report.failures());
    assert_eq!(report.file_list.unwrap().entries, 2);
    assert!(ws.index_path().is_file());
    assert!(!ws.lock_path().exists());
}

#[test]
fn unusable_workspace_is_reported_per_step() {
    let fx = Fixture::new();
    let mut ctx = fx.context();
    ctx.start(None, fx.cwd()).unwrap();
    let ws = ctx.workspace().unwrap().clone();

    fs::remove_dir_all(ws.dir()).unwrap();
    fs::write(ws.dir(), "not a directory").unwrap();
    let report = ctx.update().unwrap();

    assert!(matches!(
        report.file_list,
        Err(CscopeError::WorkspaceCreateError { .. })
    ));
    match &report.index {
        Err(CscopeError::IndexFileListMissing(path)) => assert_eq!(path, &ws.file_list_path()),
        other => panic!("expected IndexFileListMissing, got {:?}", other),
    }
    assert!(matches!(report.session, Ok(None)));
    assert_eq!(report.failures().len(), 2);
    assert_eq!(common::cscope_invocations(fx.tools.path()).len(), 0);
}

#[test]
fn removal_during_update_leaves_session_attached() {
    let fx = Fixture::new();
    let _guard = common::spawn_guard();
    let mut ctx = fx.context();
    ctx.start(None, fx.cwd()).unwrap();
    ctx.update().unwrap();
    let ws = ctx.workspace().unwrap().clone();
    let before = host_lines(&ctx);

    let lock = UpdateLock::acquire(&ws).unwrap();
    assert!(matches!(
        ctx.teardown(true),
        Err(CscopeError::UpdateInProgress { .. })
    ));
    assert_eq!(host_lines(&ctx), before);
    assert_eq!(ctx.stage(), Stage::SessionActive);
    assert!(ws.index_path().is_file());
    drop(lock);

    assert_eq!(
        ctx.teardown(true).unwrap(),
        Some(SessionEvent::Detached(ws.index_path()))
    );
    assert!(!ws.exists());
}

#[test]
fn inspect_touches_nothing_on_disk() {
    let fx = Fixture::new();
    let mut ctx = fx.context();

    let config_path = ctx.inspect(None, fx.cwd()).unwrap();
    assert_eq!(config_path, fx.cwd().join("cscope.cfg"));
    assert_eq!(ctx.stage(), Stage::Configured);
    assert!(!fx.base().exists());

    let status = ctx.status();
    assert_eq!(status.project.as_deref(), Some("demo"));
    assert!(status.file_list.is_none());
    assert!(status.index.is_none());

    assert_eq!(ctx.teardown(true).unwrap(), None);
    assert_eq!(ctx.stage(), Stage::Unconfigured);
    assert!(!fx.base().exists());
}
