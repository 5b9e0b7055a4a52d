//! Line-oriented command loop. One process keeps one project context, so the
//! index session survives between requests the way it does inside an editor.
//!
//! Commands, one per line: `start [CONFIG]`, `update`, `map-keys`, `status`,
//! `teardown [--remove]`, `quit`. The editor command names `CScopeStart`,
//! `CScopeUpdate` and `CScopeMapKeys` are accepted too.

use crate::error::{CscopeError, Result};
use crate::host::QueryHost;
use crate::project::{ProjectContext, StatusReport};
use std::io::BufRead;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Start(Option<String>),
    Update,
    MapKeys,
    Status,
    Teardown { remove: bool },
    Quit,
}

impl Request {
    pub fn parse(line: &str) -> std::result::Result<Option<Self>, String> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Ok(None);
        };
        let arg = words.next().map(str::to_string);
        let request = match verb.to_ascii_lowercase().as_str() {
            "start" | "cscopestart" => Request::Start(arg),
            "update" | "cscopeupdate" => Request::Update,
            "map-keys" | "mapkeys" | "cscopemapkeys" => Request::MapKeys,
            "status" => Request::Status,
            "teardown" => Request::Teardown {
                remove: arg.as_deref() == Some("--remove"),
            },
            "quit" | "exit" => Request::Quit,
            _ => return Err(format!("Unknown command: '{}'", verb)),
        };
        Ok(Some(request))
    }
}

/// Runs requests from `input` until `quit` or end of input. Command failures
/// are reported through the host and the loop goes on; only failing to talk
/// to the host ends it with an error.
pub fn run<H, R>(ctx: &mut ProjectContext<H>, input: R, cwd: &Path) -> Result<()>
where
    H: QueryHost,
    R: BufRead,
{
    for line in input.lines() {
        let line = line.map_err(CscopeError::Host)?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let request = match Request::parse(line) {
            Ok(Some(request)) => request,
            Ok(None) => continue,
            Err(msg) => {
                notify(ctx, &msg)?;
                continue;
            }
        };
        log::debug!("serve: {:?}", request);
        if request == Request::Quit {
            break;
        }
        handle(ctx, request, cwd)?;
    }
    Ok(())
}

fn handle<H: QueryHost>(ctx: &mut ProjectContext<H>, request: Request, cwd: &Path) -> Result<()> {
    match request {
        Request::Start(arg) => match ctx.start(arg.as_deref(), cwd) {
            Ok(outcome) => {
                if let Some(update) = outcome.update {
                    report_update(ctx, update)?;
                }
                if let Some(Err(e)) = outcome.mapped_keys {
                    surface(ctx, "Couldn't map keys", e)?;
                }
            }
            Err(e) => surface(ctx, "Couldn't start CScope", e)?,
        },
        Request::Update => {
            let update = ctx.update();
            report_update(ctx, update)?;
        }
        Request::MapKeys => {
            if let Err(e) = ctx.map_keys() {
                surface(ctx, "Couldn't map keys", e)?;
            }
        }
        Request::Status => {
            let line = status_line(&ctx.status());
            notify(ctx, &line)?;
        }
        Request::Teardown { remove } => {
            if let Err(e) = ctx.teardown(remove) {
                surface(ctx, "Couldn't tear down CScope", e)?;
            }
        }
        Request::Quit => {}
    }
    Ok(())
}

fn report_update<H: QueryHost>(
    ctx: &mut ProjectContext<H>,
    update: Result<crate::project::UpdateReport>,
) -> Result<()> {
    match update {
        Ok(report) => {
            for failure in report.failures() {
                notify(ctx, &failure)?;
            }
            Ok(())
        }
        Err(e) => surface(ctx, "Couldn't update CScope", e),
    }
}

/// Reports a command failure; a host failure is passed back instead.
fn surface<H: QueryHost>(ctx: &mut ProjectContext<H>, prefix: &str, err: CscopeError) -> Result<()> {
    if let CscopeError::Host(_) = err {
        return Err(err);
    }
    notify(ctx, &format!("{}: {}", prefix, err))
}

fn notify<H: QueryHost>(ctx: &mut ProjectContext<H>, text: &str) -> Result<()> {
    ctx.host_mut().message(text).map_err(CscopeError::Host)
}

pub fn status_line(status: &StatusReport) -> String {
    let Some(project) = &status.project else {
        return format!("cscope: {}", status.stage);
    };
    let listed = status.file_list.as_ref().and_then(|f| f.lines).unwrap_or(0);
    format!("cscope: {} ({}), {} files listed", project, status.stage, listed)
}
