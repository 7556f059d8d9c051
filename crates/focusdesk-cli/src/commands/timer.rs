use std::sync::Arc;

use clap::{Args, Subcommand};
use focusdesk_core::{
    Config, PomodoroEngine, RestTaskTracker, SessionKey, SpawningSink, TaskId, TimerService,
    TimerSession, TimerSettings,
};
use serde_json::json;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;

#[derive(Subcommand)]
pub enum TimerAction {
    /// Run a timer in the foreground, reading commands from stdin
    /// (start, pause, resume, skip, stop, complete, status, history, quit)
    Run(RunArgs),
    /// Print the idle display for a session that has not started yet
    Preview {
        /// Task ID
        #[arg(long)]
        task: Option<String>,
    },
}

#[derive(Args)]
pub struct RunArgs {
    /// Task ID to focus on; omit for a general session
    #[arg(long)]
    task: Option<String>,
    /// Task name shown in history
    #[arg(long)]
    name: Option<String>,
    /// Focus length in minutes
    #[arg(long)]
    focus: Option<u32>,
    /// Short break length in minutes
    #[arg(long = "break")]
    short_break: Option<u32>,
    /// Long break length in minutes
    #[arg(long)]
    long_break: Option<u32>,
    /// Focus sessions between long breaks
    #[arg(long)]
    sessions_until_long_break: Option<u32>,
    /// Focus sessions needed before the task can be completed
    #[arg(long)]
    target: Option<u32>,
    /// Do not report to the task backend
    #[arg(long)]
    offline: bool,
}

impl RunArgs {
    fn settings(&self, base: TimerSettings) -> TimerSettings {
        TimerSettings {
            focus_minutes: self.focus.unwrap_or(base.focus_minutes),
            break_minutes: self.short_break.unwrap_or(base.break_minutes),
            long_break_minutes: self.long_break.unwrap_or(base.long_break_minutes),
            sessions_until_long_break: self
                .sessions_until_long_break
                .unwrap_or(base.sessions_until_long_break),
            target_focus_sessions: self.target.unwrap_or(base.target_focus_sessions),
        }
    }
}

enum Command {
    Start,
    Pause,
    Resume,
    Skip,
    Stop,
    Complete,
    Status,
    History,
    Quit,
}

impl Command {
    fn parse(line: &str) -> Option<Self> {
        let cmd = match line.trim().to_ascii_lowercase().as_str() {
            "start" => Command::Start,
            "pause" => Command::Pause,
            "resume" => Command::Resume,
            "skip" => Command::Skip,
            "stop" | "reset" => Command::Stop,
            "complete" | "done" => Command::Complete,
            "status" => Command::Status,
            "history" => Command::History,
            "quit" | "exit" => Command::Quit,
            _ => return None,
        };
        Some(cmd)
    }
}

pub fn run(action: TimerAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    match action {
        TimerAction::Run(args) => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;
            let result = runtime.block_on(run_foreground(args, config));
            // A pending stdin read would otherwise block runtime shutdown.
            runtime.shutdown_background();
            result
        }
        TimerAction::Preview { task } => {
            let key = SessionKey::from(task.map(TaskId::from));
            let session = TimerSession::fresh(&key, &config.timer);
            println!("{}", status_json(&key, &session, &config.timer));
            Ok(())
        }
    }
}

async fn run_foreground(args: RunArgs, config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let key = SessionKey::from(args.task.clone().map(TaskId::from));

    let mut engine = PomodoroEngine::new(args.settings(config.timer))?;
    if let Some(bell) = config.notifications.terminal_bell() {
        engine = engine.with_notifier(Box::new(bell));
    }
    if config.backend.enabled && !args.offline {
        let tracker = RestTaskTracker::new(&config.backend)?;
        engine = engine.with_intent_sink(Arc::new(SpawningSink::on_current_runtime(tracker)));
    }
    if let (Some(id), Some(name)) = (key.task_id(), args.name.as_ref()) {
        engine.set_task_name(id.clone(), name.clone());
    }

    let service = TimerService::new(engine);
    let mut events = service.subscribe().await;
    service.start(&key).await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => println!("{}", serde_json::to_string(&event)?),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event output fell behind");
                }
                Err(RecvError::Closed) => break,
            },
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if line.trim().is_empty() {
                    continue;
                }
                let Some(command) = Command::parse(&line) else {
                    eprintln!("unknown command: {}", line.trim());
                    continue;
                };
                if matches!(command, Command::Quit) {
                    break;
                }
                if let Err(e) = apply(&service, &key, command).await {
                    eprintln!("error: {e}");
                }
            }
        }
    }

    while let Ok(event) = events.try_recv() {
        println!("{}", serde_json::to_string(&event)?);
    }
    Ok(())
}

async fn apply(
    service: &TimerService,
    key: &SessionKey,
    command: Command,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Start => {
            service.start(key).await;
        }
        Command::Pause => {
            service.pause(key).await?;
        }
        Command::Resume => {
            service.resume(key).await?;
        }
        Command::Skip => {
            service.skip(key).await?;
        }
        Command::Stop => {
            service.stop(key).await?;
        }
        Command::Complete => {
            let task_id = key
                .task_id()
                .ok_or("a general session has no task to complete")?;
            service.mark_task_complete(task_id).await?;
            println!("{}", json!({ "type": "task_completion_requested", "task_id": task_id }));
        }
        Command::Status => {
            let (settings, session) = service
                .with_engine(|engine| (*engine.settings(), engine.session(key)))
                .await;
            let session = session.unwrap_or_else(|| TimerSession::fresh(key, &settings));
            println!("{}", status_json(key, &session, &settings));
        }
        Command::History => {
            let history = service
                .with_engine(|engine| engine.history(key).to_vec())
                .await;
            println!("{}", json!({ "type": "history", "entries": history }));
        }
        Command::Quit => {}
    }
    Ok(())
}

fn status_json(key: &SessionKey, session: &TimerSession, settings: &TimerSettings) -> serde_json::Value {
    json!({
        "type": "status",
        "key": key,
        "title": session.phase.title(),
        "clock": session.clock(),
        "progress_pct": session.progress_pct(),
        "current_cycle": session.current_cycle(),
        "target_focus_sessions": settings.target_focus_sessions,
        "target_reached": session.completed_focus_sessions >= settings.target_focus_sessions,
        "can_resume": session.can_resume(),
        "session": session,
    })
}
