//! Vizbench CLI — run sandboxes in the foreground and stream their output.

use std::path::PathBuf;
use std::process;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use vizbench_core::command::Command;
use vizbench_core::config::SandboxRegistry;
use vizbench_core::response::{Notification, ProgressState, Response};
use vizbench_core::workbench::Workbench;

/// The single foreground session the CLI drives.
const SESSION_ID: u32 = 0;


fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let arg_refs: Vec<&str> = args[1..].iter().map(|s| s.as_str()).collect();

    let invocation = match parse_args(&arg_refs) {
        Ok(i) => i,
        Err(e) => {
            eprintln!("vizbench: {}", e);
            process::exit(1);
        }
    };

    let result = match invocation {
        Invocation::Run(run) => cmd_run(run),
        Invocation::Sandboxes { config } => cmd_sandboxes(config),
        Invocation::Help { topic } => {
            println!("{}", vizbench_core::help::help_text(topic.as_deref()));
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("vizbench error: {:#}", e);
        process::exit(1);
    }
}


#[derive(Debug)]
enum Invocation {
    Run(RunArgs),
    Sandboxes { config: Option<PathBuf> },
    Help { topic: Option<String> },
}

#[derive(Debug, Default)]
struct RunArgs {
    script: Option<String>,
    sandbox: Option<String>,
    interpreter: Option<String>,
    script_args: Vec<String>,
    config: Option<PathBuf>,
    json: bool,
}


fn parse_args(args: &[&str]) -> Result<Invocation, String> {
    if args.is_empty() {
        return Err("No command specified. Run 'vizbench help' for usage.".into());
    }

    match args[0] {
        "run" => parse_run(&args[1..]).map(Invocation::Run),
        "sandboxes" => Ok(Invocation::Sandboxes {
            config: find_flag(args, "--config").map(PathBuf::from),
        }),
        "help" => Ok(Invocation::Help {
            topic: args.get(1).map(|s| s.to_string()),
        }),
        _ => Err(format!(
            "Unknown command: '{}'. Run 'vizbench help' for usage.",
            args[0]
        )),
    }
}


fn parse_run(args: &[&str]) -> Result<RunArgs, String> {
    let mut run = RunArgs::default();
    let mut i = 0;
    while i < args.len() {
        match args[i] {
            "--sandbox" => {
                run.sandbox = Some(take_value(args, &mut i, "--sandbox")?);
            }
            "--interpreter" => {
                run.interpreter = Some(take_value(args, &mut i, "--interpreter")?);
            }
            "--arg" => {
                run.script_args.push(take_value(args, &mut i, "--arg")?);
            }
            "--config" => {
                run.config = Some(PathBuf::from(take_value(args, &mut i, "--config")?));
            }
            "--json" => {
                run.json = true;
            }
            flag if flag.starts_with("--") => {
                return Err(format!("Unknown flag: '{}'", flag));
            }
            script => {
                if run.script.is_some() {
                    return Err("Only one script may be given".into());
                }
                run.script = Some(script.to_string());
            }
        }
        i += 1;
    }
    if run.script.is_none() && run.sandbox.is_none() {
        return Err("Usage: vizbench run <script> | vizbench run --sandbox <name>".into());
    }
    if run.script.is_some() && run.sandbox.is_some() {
        return Err("Give either a script or --sandbox, not both".into());
    }
    Ok(run)
}


fn take_value(args: &[&str], i: &mut usize, flag: &str) -> Result<String, String> {
    *i += 1;
    args.get(*i)
        .map(|s| s.to_string())
        .ok_or_else(|| format!("{} requires a value", flag))
}


fn find_flag(args: &[&str], flag: &str) -> Option<String> {
    for (i, arg) in args.iter().enumerate() {
        if *arg == flag {
            return args.get(i + 1).map(|s| s.to_string());
        }
    }
    None
}


fn resolve_config_path(explicit: Option<PathBuf>) -> PathBuf {
    if let Some(path) = explicit {
        return path;
    }
    if let Ok(path) = std::env::var("VIZBENCH_CONFIG") {
        return PathBuf::from(path);
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
    PathBuf::from(home)
        .join(".config")
        .join("vizbench")
        .join("sandboxes.yaml")
}


fn load_registry(config: Option<PathBuf>) -> Result<SandboxRegistry> {
    let path = resolve_config_path(config);
    SandboxRegistry::from_file(&path)
        .map_err(|e| anyhow::anyhow!(e))
        .with_context(|| format!("loading {}", path.display()))
}


fn cmd_sandboxes(config: Option<PathBuf>) -> Result<()> {
    let registry = load_registry(config)?;
    println!("{}", registry.to_json());
    Ok(())
}


fn cmd_run(run: RunArgs) -> Result<()> {
    let registry = load_registry(run.config.clone())?;
    let mut workbench = Workbench::new(registry);
    expect_ok(workbench.execute(Command::SessionCreate {
        session: SESSION_ID,
    }))?;

    let configure = match (&run.script, &run.sandbox) {
        (Some(script), None) => Command::SessionConfigure {
            session: SESSION_ID,
            interpreter: run
                .interpreter
                .clone()
                .unwrap_or_else(|| "python3".into()),
            script: script.clone(),
            args: run.script_args.clone(),
        },
        (None, Some(sandbox)) => Command::SessionSelect {
            session: SESSION_ID,
            sandbox: sandbox.clone(),
        },
        _ => unreachable!("run arguments were validated during parsing"),
    };
    expect_ok(workbench.execute(configure))?;
    expect_ok(workbench.execute(Command::SessionRestart {
        session: SESSION_ID,
    }))?;

    stream_run(&mut workbench)?;

    if run.json {
        match workbench.execute(Command::SessionRender {
            session: SESSION_ID,
        }) {
            Response::Ok { output } => println!("{}", output),
            Response::Error { message } => bail!(message),
        }
    }
    Ok(())
}


/// Pump the session until its worker is gone and the queue is drained,
/// printing captured views and notifications along the way.
fn stream_run(workbench: &mut Workbench) -> Result<()> {
    loop {
        let session = workbench
            .session_mut(SESSION_ID)
            .context("session disappeared mid-run")?;

        let seen = session.canvas().len();
        if let Some(event) = session.next_event(Duration::from_millis(200)) {
            session.apply_event(event);
            let state = session.render();
            for inspector in &state.inspectors[seen.min(state.inspectors.len())..] {
                if let Some(snapshot) = &inspector.snapshot {
                    println!(
                        "[view] {}:{} {}",
                        snapshot.file_path, snapshot.line_number, snapshot.view
                    );
                }
            }
        }

        for note in workbench.drain_notifications(SESSION_ID) {
            print_notification(&note);
        }

        let done = workbench
            .session(SESSION_ID)
            .map(|s| !s.is_running())
            .unwrap_or(true);
        if done {
            // Drain whatever the exiting worker left behind.
            workbench.poll_all();
            for note in workbench.drain_notifications(SESSION_ID) {
                print_notification(&note);
            }
            return Ok(());
        }
    }
}


fn print_notification(note: &Notification) {
    match note {
        Notification::Progress { state } => match state {
            ProgressState::Idle => {}
            ProgressState::Indeterminate => eprintln!("[run] restarting"),
            ProgressState::Determinate { percent } => {
                eprintln!("[run] pending change {:.0}%", percent)
            }
            ProgressState::Hidden => eprintln!("[run] finished"),
        },
        Notification::SpawnFailure { message } => eprintln!("[error] {}", message),
        Notification::MalformedLine { error } => eprintln!("[warn] {}", error),
        Notification::AnnotationPlace { .. } | Notification::AnnotationRelease => {}
    }
}


fn expect_ok(response: Response) -> Result<()> {
    match response {
        Response::Ok { .. } => Ok(()),
        Response::Error { message } => bail!(message),
    }
}
