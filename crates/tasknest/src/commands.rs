use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use tasknest_app::config::user_from_env;
use tasknest_app::image::{content_type_for_name, resize_url};
use tasknest_app::{
    AccountService, AppError, DemoOutcome, HttpImageHost, IdentityProvider, ImageFile, ImageUploader, InitGate,
    InitOptions, ProjectConfig, Session, TodoBoard, UploadOutcome,
};
use tasknest_core::{
    InitState, Language, Priority, Route, RouteDecision, Task, TaskId, TaskInput, TaskPatch, Theme, TodoFilter,
};
use tasknest_store_json::{JsonStore, LocalIdentity};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};

use crate::{Command, ImageAction, LsFormat, PrefsAction};

/// Turn an application error into the message shown to the user.
trait Localize<T> {
    fn localized(self, language: Language) -> Result<T>;
}

impl<T, E: Into<AppError>> Localize<T> for Result<T, E> {
    fn localized(self, language: Language) -> Result<T> {
        self.map_err(|err| anyhow!(err.into().describe_user_facing(language)))
    }
}

/// Execute one CLI command against the data directory.
pub async fn run(data_dir: &Path, command: Command) -> Result<()> {
    let config = ProjectConfig::load(data_dir)?;
    let store = JsonStore::open(data_dir)?;
    let identity = LocalIdentity::open(data_dir)?;
    let mut session = Session::attach(&store, identity.subscribe(), config.preferences.to_preferences()).await;
    let language = session.context().preferences.language;

    let gate = InitGate::new(&store, &identity);
    guard_route(gate.check().await, command.route())?;

    match command {
        Command::Init { no_demo } => {
            let mut options = InitOptions::from_seed(&config.seed);
            if no_demo {
                options = options.without_demo();
            }
            let report = gate.initialize(&options).await.localized(language)?;
            println!("initialized by: {}", report.gate.initialized_by);
            println!("seeded categories: {}", report.categories.len());
            match report.demo {
                DemoOutcome::Created { principal, tasks } => {
                    println!(
                        "demo account: {} / {} ({tasks} tasks)",
                        principal.email, config.seed.demo.password
                    );
                }
                DemoOutcome::Failed(reason) => println!("demo account not created: {reason}"),
                DemoOutcome::Skipped => {}
            }
        }
        Command::Signup { email, password, name } => {
            let profile = AccountService::new(&identity, &store)
                .register(&email, &password, &name)
                .await
                .localized(language)?;
            println!("signed up: {} ({})", profile.email, profile.uid);
        }
        Command::Signin { email, password } => {
            let email = email
                .or_else(user_from_env)
                .context("no --email given and TASKNEST_USER is not set")?;
            let profile = AccountService::new(&identity, &store)
                .login(&email, &password)
                .await
                .localized(language)?;
            println!("signed in: {} ({})", profile.email, profile.uid);
        }
        Command::Signout => {
            AccountService::new(&identity, &store)
                .logout()
                .await
                .localized(language)?;
            println!("signed out");
        }
        Command::Whoami => {
            let context = session.context();
            match &context.principal {
                Some(principal) => {
                    println!("uid: {}", principal.id);
                    println!("email: {}", principal.email);
                    println!("name: {}", principal.display_name.as_deref().unwrap_or("-"));
                }
                None => println!("not signed in"),
            }
            print_preferences(context.preferences);
        }
        Command::ResetPassword { email } => {
            AccountService::new(&identity, &store)
                .reset_password(&email)
                .await
                .localized(language)?;
            println!("password reset requested for {email}");
        }
        Command::Prefs { action } => {
            if session.context().principal.is_none() {
                println!("not signed in; changes are not saved");
            }
            match action {
                None => {}
                Some(PrefsAction::Theme { value }) if value == "toggle" => {
                    let theme = session.toggle_theme().await;
                    println!("switched to {theme} theme");
                }
                Some(PrefsAction::Theme { value }) => session.set_theme(value.parse::<Theme>()?).await,
                Some(PrefsAction::Lang { value }) => session.set_language(value.parse()?).await,
                Some(PrefsAction::ShowCompleted { value }) => session.set_show_completed(value).await,
                Some(PrefsAction::DefaultPriority { value }) => {
                    session.set_default_priority(value.parse()?).await;
                }
            }
            print_preferences(session.context().preferences);
        }
        Command::Demo => {
            let created = gate.seed_demo_tasks().await.localized(language)?;
            println!("created {} demo tasks", created.len());
        }
        Command::Image {
            action: ImageAction::Resize { url, width, height },
        } => println!("{}", resize_url(&url, width, height)),
        other => {
            let owner = session.context().owner().cloned().localized(language)?;
            let mut board = TodoBoard::new(&store, owner);
            board.load().await.localized(language)?;
            run_board_command(other, &mut board, &config, &session).await?;
        }
    }

    Ok(())
}

fn guard_route(state: InitState, route: Route) -> Result<()> {
    match state.guard(route) {
        RouteDecision::Render(_) => Ok(()),
        RouteDecision::Redirect(Route::Initialize) => {
            bail!("tasknest is not initialized yet; run `tasknest init` first")
        }
        RouteDecision::Redirect(Route::Login) => {
            bail!("tasknest is already initialized; use `tasknest signin`")
        }
        RouteDecision::Redirect(other) => bail!("{other:?} is not reachable from here"),
        RouteDecision::Loading => bail!("initialization state is not known yet"),
    }
}

#[allow(clippy::too_many_lines)]
async fn run_board_command(
    command: Command,
    board: &mut TodoBoard<&JsonStore>,
    config: &ProjectConfig,
    session: &Session<&JsonStore>,
) -> Result<()> {
    let preferences = session.context().preferences;
    let language = preferences.language;
    match command {
        Command::Add {
            title,
            description,
            priority,
            category,
            due,
            image,
        } => {
            let input = TaskInput {
                description,
                priority: priority
                    .map(|token| token.parse::<Priority>())
                    .transpose()?
                    .unwrap_or(preferences.default_priority),
                category,
                due_date: due.as_deref().map(|raw| parse_instant(raw, false)).transpose()?,
                image_url: image,
                ..TaskInput::titled(title)
            };
            let task = board.create(input).await.localized(language)?;
            println!("created task: {}", task.id);
        }
        Command::Ls {
            status,
            priority,
            category,
            search,
            format,
        } => {
            let mut builder = TodoFilter::builder();
            match status {
                Some(token) => builder = builder.status_token(&token)?,
                None if !preferences.show_completed_tasks => builder = builder.completed(false),
                None => {}
            }
            if let Some(token) = priority {
                builder = builder.priority_token(&token)?;
            }
            if let Some(category) = category {
                builder = builder.category(category);
            }
            if let Some(search) = search {
                builder = builder.search(search);
            }
            board.set_filter(builder.build());

            let tasks = board.tasks();
            if tasks.is_empty() {
                if board.filter().is_empty() {
                    println!("No tasks found");
                } else {
                    println!("No tasks matched the provided filters ({})", board.filter());
                }
                return Ok(());
            }
            match format {
                LsFormat::Table => render_task_table(tasks),
                LsFormat::Json => println!("{}", serde_json::to_string_pretty(tasks)?),
            }
        }
        Command::Show { task } => {
            let id = owned_task(board, &task)?;
            let task = board
                .all_tasks()
                .iter()
                .find(|candidate| candidate.id == id)
                .ok_or_else(|| anyhow!("task not found: {id}"))?;
            println!("{}", serde_json::to_string_pretty(task)?);
        }
        Command::Stats => {
            let stats = board.stats();
            println!("total: {}", stats.total);
            println!("completed: {}", stats.completed);
            println!("pending: {}", stats.pending);
            println!("high priority: {}", stats.high_priority);
            println!("due soon: {}", stats.due_soon);
            let counts = board.priority_counts();
            for priority in Priority::ALL {
                println!("{priority}: {}", counts.get(priority));
            }
        }
        Command::Agenda { from, to } => {
            let start = parse_instant(&from, false)?;
            let end = parse_instant(&to, true)?;
            let due = board.due_between(start, end);
            if due.is_empty() {
                println!("Nothing due between {from} and {to}");
            } else {
                render_task_table(&due);
            }
        }
        Command::Done { task } => {
            let id = owned_task(board, &task)?;
            board.set_completed(&id, true).await.localized(language)?;
            println!("completed: {id}");
        }
        Command::Undone { task } => {
            let id = owned_task(board, &task)?;
            board.set_completed(&id, false).await.localized(language)?;
            println!("reopened: {id}");
        }
        Command::Toggle { task } => {
            let id = owned_task(board, &task)?;
            let completed = board.toggle(&id).await.localized(language)?;
            println!("{}: {id}", if completed { "completed" } else { "reopened" });
        }
        Command::Edit {
            task,
            title,
            description,
            clear_description,
            priority,
            category,
            clear_category,
            due,
            clear_due,
        } => {
            let id = owned_task(board, &task)?;
            let patch = TaskPatch {
                title,
                description: clearable(description, clear_description),
                priority: priority.map(|token| token.parse::<Priority>()).transpose()?,
                category: clearable(category, clear_category),
                due_date: clearable(
                    due.as_deref().map(|raw| parse_instant(raw, false)).transpose()?,
                    clear_due,
                ),
                ..TaskPatch::default()
            };
            if patch.is_empty() {
                println!("nothing to change");
                return Ok(());
            }
            board.edit(&id, &patch).await.localized(language)?;
            println!("updated: {id}");
        }
        Command::Rm { task } => {
            let id = owned_task(board, &task)?;
            board.remove(&id).await.localized(language)?;
            println!("deleted: {id}");
        }
        Command::BulkDone { tasks } => {
            let ids = owned_tasks(board, &tasks)?;
            let report = board.bulk_complete(&ids).await.localized(language)?;
            finish_bulk("completed", &report, language)?;
        }
        Command::BulkRm { tasks } => {
            let ids = owned_tasks(board, &tasks)?;
            let report = board.bulk_delete(&ids).await.localized(language)?;
            finish_bulk("deleted", &report, language)?;
        }
        Command::Categories => {
            if board.categories().is_empty() {
                println!("No categories");
            }
            for name in board.categories() {
                println!("{name}");
            }
        }
        Command::Image {
            action: ImageAction::Upload { task, file },
        } => {
            let id = owned_task(board, &task)?;
            let name = file
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            let bytes = fs::read(&file).with_context(|| format!("failed to read {}", file.display()))?;
            let content_type = content_type_for_name(&name).unwrap_or("application/octet-stream");
            let uploader = ImageUploader::new(HttpImageHost::new(config.image.clone()))
                .with_max_bytes(config.image.max_bytes);
            let outcome = uploader
                .upload(&ImageFile::new(name, content_type, bytes))
                .await
                .localized(language)?;
            board.set_image(&id, outcome.url()).await.localized(language)?;
            match outcome {
                UploadOutcome::Hosted { url } => println!("uploaded: {url}"),
                UploadOutcome::Inline { reason, .. } => println!("stored inline ({reason:?})"),
            }
        }
        other => bail!("{other:?} does not operate on tasks"),
    }
    Ok(())
}

/// Resolve a task id and make sure it belongs to the signed-in owner.
fn owned_task(board: &TodoBoard<&JsonStore>, raw: &str) -> Result<TaskId> {
    let id = TaskId::from(raw);
    if board.all_tasks().iter().any(|task| task.id == id) {
        Ok(id)
    } else {
        bail!("task not found: {id}")
    }
}

fn owned_tasks(board: &TodoBoard<&JsonStore>, raw: &[String]) -> Result<Vec<TaskId>> {
    raw.iter().map(|id| owned_task(board, id)).collect()
}

/// `Some(None)` clears the field, `Some(Some(_))` sets it.
fn clearable<T>(value: Option<T>, clear: bool) -> Option<Option<T>> {
    if clear { Some(None) } else { value.map(Some) }
}

/// Accept either an RFC 3339 timestamp or a calendar date in UTC.
///
/// A bare date resolves to the start of the day, or to its last second when
/// `end_of_day` is set so that ranges include the whole day.
fn parse_instant(raw: &str, end_of_day: bool) -> Result<OffsetDateTime> {
    if let Ok(instant) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Ok(instant);
    }
    let date = Date::parse(raw, format_description!("[year]-[month]-[day]"))
        .with_context(|| format!("invalid date '{raw}': expected YYYY-MM-DD or RFC 3339"))?;
    let time = if end_of_day {
        Time::from_hms(23, 59, 59)?
    } else {
        Time::MIDNIGHT
    };
    Ok(PrimitiveDateTime::new(date, time).assume_utc())
}

fn format_day(instant: Option<OffsetDateTime>) -> String {
    instant
        .and_then(|value| value.date().format(format_description!("[year]-[month]-[day]")).ok())
        .unwrap_or_else(|| "-".to_owned())
}

fn render_task_table(tasks: &[Task]) {
    println!("ID | Status | Priority | Title | Category | Due");
    for task in tasks {
        println!(
            "{} | {} | {} | {} | {} | {}",
            task.id,
            if task.completed { "done" } else { "pending" },
            task.priority,
            task.title,
            task.category.as_deref().unwrap_or("-"),
            format_day(task.due_date),
        );
    }
}

fn print_preferences(preferences: tasknest_core::UserPreferences) {
    println!("theme: {}", preferences.theme);
    println!("language: {}", preferences.language);
    println!("show completed: {}", preferences.show_completed_tasks);
    println!("default priority: {}", preferences.default_priority);
}

fn finish_bulk(verb: &str, report: &tasknest_app::BulkReport, language: Language) -> Result<()> {
    println!("{verb}: {}", report.succeeded.len());
    for (id, err) in &report.failed {
        eprintln!("failed {id}: {}", err.describe_user_facing(language));
    }
    if report.is_complete() {
        Ok(())
    } else {
        bail!("{} of {} tasks failed", report.failed.len(), report.failed.len() + report.succeeded.len())
    }
}
