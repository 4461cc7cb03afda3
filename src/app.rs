use chrono::{DateTime, NaiveDate, Utc};
use std::io::BufRead;
use std::sync::Arc;

use crate::auth::{AuthClient, AuthSession, SessionState, SessionStore, resolve_session};
use crate::cli::{ChartView, Cli, Commands};
use crate::config::{AppPaths, Config};
use crate::core::{
    ApplicationDetail, ApplicationsPageData, Credentials, DateRange, FollowUpForm, LinkForm,
    ListFilter, NewApplication, NoteForm, PasswordReset, RecoveryLink, RecoveryProof, SignupForm,
    Stage, StatsContext, Status, build_dashboard, build_rows, required_id,
};
use crate::error::{AppError, FormError, StoreError};
use crate::output::{
    output_dashboard_json, output_detail_json, output_list_csv, output_list_json,
    print_list_table, render_dashboard, render_detail,
};
use crate::remote::{Remote, UreqTransport};
use crate::store::{BoxedStore, DemoStore, SnapshotCache, SnapshotStore, SupabaseStore};
use crate::utils::{Timezone, parse_date};

pub(crate) struct CommandContext<'a> {
    pub(crate) cli: &'a Cli,
    pub(crate) config: &'a Config,
    pub(crate) paths: AppPaths,
    pub(crate) stats: StatsContext,
    pub(crate) now: DateTime<Utc>,
}

impl<'a> CommandContext<'a> {
    pub(crate) fn new(cli: &'a Cli, config: &'a Config, paths: AppPaths) -> Result<Self, AppError> {
        let timezone = Timezone::parse(cli.timezone.as_deref())?;
        let today = match cli.as_of.as_deref() {
            Some(day) => parse_date(day)?,
            None => timezone.today(),
        };
        Ok(Self {
            cli,
            config,
            paths,
            stats: StatsContext {
                today,
                timezone,
                stale_days: config.stale_days(),
            },
            now: Utc::now(),
        })
    }

    fn remote(&self) -> Result<Remote, AppError> {
        let env = self.config.supabase_env()?;
        Ok(Remote::new(env, Arc::new(UreqTransport::new())))
    }

    fn auth(&self) -> Result<AuthClient, AppError> {
        Ok(AuthClient::new(self.remote()?))
    }

    fn sessions(&self) -> SessionStore {
        SessionStore::new(self.paths.session_file.clone())
    }

    fn open_cache(&self) -> Option<SnapshotCache> {
        SnapshotCache::open(&self.paths.snapshot_db)
            .inspect_err(|e| tracing::warn!(error = %e, "offline snapshot unavailable"))
            .ok()
    }
}

/// The store a data command runs against, plus where to keep what it read
struct Backend {
    store: BoxedStore,
    snapshot: Option<(SnapshotCache, String)>,
}

impl Backend {
    fn demo() -> Self {
        Self {
            store: Box::new(DemoStore),
            snapshot: None,
        }
    }

    /// `--offline` always lands on the snapshot store, which refuses writes
    fn open(ctx: &CommandContext<'_>) -> Result<Self, AppError> {
        if ctx.cli.demo {
            return Ok(Self::demo());
        }

        let sessions = ctx.sessions();
        let stored = sessions.load();
        if stored.demo && stored.access_token.is_none() {
            return Ok(Self::demo());
        }

        if ctx.cli.offline {
            let user_id = stored.user_id.ok_or(AppError::NotSignedIn)?;
            let cache = SnapshotCache::open(&ctx.paths.snapshot_db)?;
            return Ok(Self {
                store: Box::new(SnapshotStore::new(cache, user_id)),
                snapshot: None,
            });
        }

        let remote = ctx.remote()?;
        let auth = AuthClient::new(remote.clone());
        match resolve_session(&auth, &sessions, ctx.now)? {
            SessionState::Authenticated { access_token, user } => {
                tracing::debug!(user = %user.id, "signed in");
                let snapshot = ctx.open_cache().map(|cache| (cache, user.id.clone()));
                Ok(Self {
                    store: Box::new(SupabaseStore::new(remote, access_token, user.id)),
                    snapshot,
                })
            }
            SessionState::Demo => Ok(Self::demo()),
        }
    }

    fn page_data(&self, now: DateTime<Utc>) -> Result<ApplicationsPageData, AppError> {
        let data = self.store.fetch_page_data()?;
        if let Some((cache, user_id)) = &self.snapshot
            && let Err(e) = cache.save_page(user_id, &data, now)
        {
            tracing::warn!(error = %e, "failed to save offline snapshot");
        }
        Ok(data)
    }

    fn detail(&self, id: &str, now: DateTime<Utc>) -> Result<ApplicationDetail, AppError> {
        let detail = self
            .store
            .fetch_detail(id)?
            .ok_or_else(|| AppError::ApplicationNotFound { id: id.to_string() })?;
        if let Some((cache, user_id)) = &self.snapshot
            && let Err(e) = cache.save_detail(user_id, &detail, now)
        {
            tracing::warn!(error = %e, "failed to save offline snapshot");
        }
        Ok(detail)
    }
}

fn read_password(given: Option<&str>) -> Result<String, AppError> {
    if let Some(password) = given {
        return Ok(password.to_string());
    }
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(AppError::Stdin)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn parse_optional_date(value: Option<&str>) -> Result<Option<NaiveDate>, AppError> {
    value.map(parse_date).transpose()
}

/// Keep freshly issued tokens together with the verified identity
fn store_session(
    ctx: &CommandContext<'_>,
    auth: &AuthClient,
    session: &AuthSession,
) -> Result<Option<String>, AppError> {
    let sessions = ctx.sessions();
    let mut stored = sessions.load();
    stored.apply(session, ctx.now);
    let user = auth.fetch_user(&session.access_token)?;
    if let Some(user) = &user {
        stored.remember_user(user);
    }
    sessions.save(&stored)?;
    tracing::debug!(path = %sessions.path().display(), "session saved");
    Ok(user.and_then(|u| u.email))
}

fn handle_login(
    ctx: &CommandContext<'_>,
    email: &str,
    password: Option<&str>,
) -> Result<(), AppError> {
    let password = read_password(password)?;
    let credentials = Credentials::new(email, &password)?;
    let auth = ctx.auth()?;
    let session = auth.sign_in(&credentials)?;
    let email = store_session(ctx, &auth, &session)?.unwrap_or(credentials.email);
    println!("Signed in as {email}.");
    Ok(())
}

fn handle_signup(
    ctx: &CommandContext<'_>,
    name: &str,
    email: &str,
    password: Option<&str>,
) -> Result<(), AppError> {
    let password = read_password(password)?;
    let form = SignupForm::new(name, email, &password)?;
    let auth = ctx.auth()?;
    match auth.sign_up(&form)? {
        Some(session) => {
            let email = store_session(ctx, &auth, &session)?.unwrap_or(form.email);
            println!("Account created. Signed in as {email}.");
        }
        None => println!("Check {} to confirm your account, then run `jobflow login`.", form.email),
    }
    Ok(())
}

fn handle_logout(ctx: &CommandContext<'_>) -> Result<(), AppError> {
    let sessions = ctx.sessions();
    let stored = sessions.load();
    match ctx.auth() {
        Ok(_) if ctx.cli.offline => tracing::debug!("offline, skipping remote sign out"),
        Ok(auth) => auth.sign_out(stored.access_token.as_deref()),
        Err(e) => tracing::debug!(error = %e, "skipping remote sign out"),
    }
    sessions.clear()?;
    if let Some(user_id) = stored.user_id.as_deref()
        && let Some(cache) = ctx.open_cache()
    {
        match cache.forget(user_id) {
            Ok(n) => tracing::debug!(snapshots = n, "dropped offline snapshots"),
            Err(e) => tracing::warn!(error = %e, "failed to drop offline snapshots"),
        }
    }
    println!("Signed out.");
    Ok(())
}

fn handle_forgot_password(
    ctx: &CommandContext<'_>,
    email: &str,
    redirect_to: Option<&str>,
) -> Result<(), AppError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(FormError::Missing("Email is required.").into());
    }
    let redirect_to = redirect_to.or(ctx.config.reset_redirect_url.as_deref());
    ctx.auth()?.send_password_reset(email, redirect_to)?;
    println!("If an account exists for {email}, a reset link is on its way.");
    Ok(())
}

struct ResetArgs<'a> {
    link: Option<&'a str>,
    access_token: Option<&'a str>,
    token_hash: Option<&'a str>,
    password: &'a str,
    confirm_password: &'a str,
}

fn handle_reset_password(ctx: &CommandContext<'_>, args: ResetArgs<'_>) -> Result<(), AppError> {
    let from_link = match args.link {
        Some(link) => RecoveryLink::parse(link)?,
        None => RecoveryLink::default(),
    };
    let access_token = args.access_token.map(str::to_string).or(from_link.access_token);
    let token_hash = args.token_hash.map(str::to_string).or(from_link.token_hash);
    let reset = PasswordReset::new(
        args.password,
        args.confirm_password,
        access_token.as_deref(),
        token_hash.as_deref(),
    )?;

    let auth = ctx.auth()?;
    let token = match reset.proof {
        RecoveryProof::AccessToken(token) => token,
        RecoveryProof::TokenHash(hash) => auth.verify_recovery(&hash)?.access_token,
    };
    auth.update_password(&token, &reset.password)?;
    println!("Password updated. Sign in with your new password.");
    Ok(())
}

fn handle_demo(ctx: &CommandContext<'_>) -> Result<(), AppError> {
    let sessions = ctx.sessions();
    let mut stored = sessions.load();
    stored.enter_demo();
    sessions.save(&stored)?;
    if stored.access_token.is_some() {
        println!(
            "Demo flag set, but you are still signed in. Run `jobflow logout` to see sample data."
        );
    } else {
        println!("Demo mode on. Changes are disabled; run `jobflow login` to use your own data.");
    }
    Ok(())
}

fn handle_whoami(ctx: &CommandContext<'_>) -> Result<(), AppError> {
    let (mode, user_id, email) = if ctx.cli.demo {
        ("demo", None, None)
    } else if ctx.cli.offline {
        let stored = ctx.sessions().load();
        if stored.demo && stored.access_token.is_none() {
            ("demo", None, None)
        } else {
            let user_id = stored.user_id.ok_or(AppError::NotSignedIn)?;
            ("offline", Some(user_id), stored.email)
        }
    } else {
        let stored = ctx.sessions().load();
        if stored.demo && stored.access_token.is_none() {
            ("demo", None, None)
        } else {
            match resolve_session(&ctx.auth()?, &ctx.sessions(), ctx.now)? {
                SessionState::Authenticated { user, .. } => {
                    ("signed-in", Some(user.id), user.email)
                }
                SessionState::Demo => ("demo", None, None),
            }
        }
    };

    if ctx.cli.json {
        let value = serde_json::json!({ "mode": mode, "user_id": user_id, "email": email });
        println!("{value}");
    } else if mode == "demo" {
        println!("Demo mode (sample data).");
    } else {
        let who = email.or(user_id).unwrap_or_default();
        println!("Signed in as {who}{}", if mode == "offline" { " (offline)." } else { "." });
    }
    Ok(())
}

fn handle_dashboard(
    ctx: &CommandContext<'_>,
    view: ChartView,
    month: Option<&str>,
) -> Result<(), AppError> {
    let backend = Backend::open(ctx)?;
    let data = backend.page_data(ctx.now)?;
    let dashboard = build_dashboard(&data, &ctx.stats, view.into(), month);
    if ctx.cli.json {
        println!("{}", output_dashboard_json(&dashboard));
    } else {
        print!("{}", render_dashboard(&dashboard, backend.store.label(), ctx.cli.use_color()));
    }
    Ok(())
}

struct ListArgs<'a> {
    stage: Option<Stage>,
    status: Option<Status>,
    company: Option<&'a str>,
    search: Option<&'a str>,
    since: Option<&'a str>,
    until: Option<&'a str>,
    overdue: bool,
    stale: bool,
}

fn handle_list(ctx: &CommandContext<'_>, args: ListArgs<'_>) -> Result<(), AppError> {
    let filter = ListFilter {
        stage: args.stage,
        status: args.status,
        company: args.company.map(str::to_string),
        search: args.search.map(str::to_string),
        dates: DateRange::new(
            parse_optional_date(args.since)?,
            parse_optional_date(args.until)?,
        ),
        overdue_only: args.overdue,
        stale_only: args.stale,
    };
    let backend = Backend::open(ctx)?;
    let data = backend.page_data(ctx.now)?;
    let rows = build_rows(&data, &filter, &ctx.stats);
    let order = ctx.cli.sort_order();

    if ctx.cli.json {
        println!("{}", output_list_json(&rows, order));
    } else if ctx.cli.csv {
        print!("{}", output_list_csv(&rows, order));
    } else {
        print_list_table(&rows, order, backend.store.label(), ctx.cli.use_color());
    }
    Ok(())
}

fn handle_show(ctx: &CommandContext<'_>, id: &str) -> Result<(), AppError> {
    let id = required_id(id)?;
    let backend = Backend::open(ctx)?;
    let detail = backend.detail(&id, ctx.now)?;
    if ctx.cli.json {
        println!("{}", output_detail_json(&detail));
    } else {
        print!("{}", render_detail(&detail, ctx.stats.timezone, ctx.cli.use_color()));
    }
    Ok(())
}

struct AddArgs<'a> {
    company: &'a str,
    role: &'a str,
    stage: Option<Stage>,
    applied: Option<&'a str>,
    link: Option<&'a str>,
    notes: Option<&'a str>,
}

fn handle_add(ctx: &CommandContext<'_>, args: AddArgs<'_>) -> Result<(), AppError> {
    let form = NewApplication::new(
        args.company,
        args.role,
        args.stage,
        parse_optional_date(args.applied)?,
        args.link,
        args.notes,
    )?;
    let backend = Backend::open(ctx)?;
    let id = backend.store.create_application(&form)?;
    if ctx.cli.json {
        println!("{}", serde_json::json!({ "id": id }));
    } else {
        println!("Added {} at {} ({id}).", form.role_title, form.company);
    }
    Ok(())
}

fn handle_update(
    ctx: &CommandContext<'_>,
    id: &str,
    stage: Option<Stage>,
    status: Option<Status>,
) -> Result<(), AppError> {
    let id = required_id(id)?;
    if stage.is_none() && status.is_none() {
        return Err(FormError::Missing("Pass --stage and/or --status.").into());
    }
    let backend = Backend::open(ctx)?;
    let (stage, status) = match (stage, status) {
        (Some(stage), Some(status)) => (stage, status),
        _ => {
            let current = backend.detail(&id, ctx.now)?.application;
            (
                stage.unwrap_or_else(|| current.stage()),
                status.unwrap_or_else(|| current.status()),
            )
        }
    };
    backend.store.update_stage_status(&id, stage, status)?;
    println!("Updated {id}: {stage} / {status}.");
    Ok(())
}

fn handle_follow_up(
    ctx: &CommandContext<'_>,
    id: &str,
    due: &str,
    note: Option<&str>,
) -> Result<(), AppError> {
    let form = FollowUpForm::new(id, due, note)?;
    let backend = Backend::open(ctx)?;
    backend.store.set_follow_up(&form)?;
    println!("Follow-up scheduled for {}.", due.trim());
    Ok(())
}

fn handle_done(
    ctx: &CommandContext<'_>,
    follow_up_id: &str,
    application: Option<&str>,
) -> Result<(), AppError> {
    let follow_up_id = required_id(follow_up_id)?;
    let backend = Backend::open(ctx)?;
    let application = application.map(str::trim).filter(|s| !s.is_empty());
    backend.store.mark_follow_up_done(&follow_up_id, application)?;
    println!("Follow-up {follow_up_id} marked done.");
    Ok(())
}

fn handle_note(ctx: &CommandContext<'_>, id: &str, content: &str) -> Result<(), AppError> {
    let form = NoteForm::new(id, content)?;
    let backend = Backend::open(ctx)?;
    backend.store.add_note(&form)?;
    println!("Note added.");
    Ok(())
}

fn handle_link(
    ctx: &CommandContext<'_>,
    id: &str,
    url: &str,
    label: Option<&str>,
) -> Result<(), AppError> {
    let form = LinkForm::new(id, url, label)?;
    let backend = Backend::open(ctx)?;
    backend.store.add_link(&form)?;
    println!("Link added: {}", form.url);
    Ok(())
}

fn handle_delete(ctx: &CommandContext<'_>, id: &str, yes: bool) -> Result<(), AppError> {
    let id = required_id(id)?;
    if !yes {
        return Err(AppError::DeleteNotConfirmed { id });
    }
    let backend = Backend::open(ctx)?;
    backend.store.delete_application(&id)?;
    println!("Deleted {id}.");
    Ok(())
}

/// Run one command; no subcommand shows the dashboard
pub(crate) fn run(ctx: &CommandContext<'_>) -> Result<(), AppError> {
    let Some(command) = &ctx.cli.command else {
        return handle_dashboard(ctx, ChartView::default(), None);
    };
    if ctx.cli.offline && command.needs_network() {
        return Err(StoreError::OfflineReadOnly.into());
    }

    match command {
        Commands::Login { email, password } => handle_login(ctx, email, password.as_deref()),
        Commands::Signup { name, email, password } => {
            handle_signup(ctx, name, email, password.as_deref())
        }
        Commands::Logout => handle_logout(ctx),
        Commands::ForgotPassword { email, redirect_to } => {
            handle_forgot_password(ctx, email, redirect_to.as_deref())
        }
        Commands::ResetPassword {
            link,
            access_token,
            token_hash,
            password,
            confirm_password,
        } => handle_reset_password(
            ctx,
            ResetArgs {
                link: link.as_deref(),
                access_token: access_token.as_deref(),
                token_hash: token_hash.as_deref(),
                password,
                confirm_password,
            },
        ),
        Commands::Demo => handle_demo(ctx),
        Commands::Whoami => handle_whoami(ctx),
        Commands::Dashboard { view, month } => handle_dashboard(ctx, *view, month.as_deref()),
        Commands::List {
            stage,
            status,
            company,
            search,
            since,
            until,
            overdue,
            stale,
        } => handle_list(
            ctx,
            ListArgs {
                stage: *stage,
                status: *status,
                company: company.as_deref(),
                search: search.as_deref(),
                since: since.as_deref(),
                until: until.as_deref(),
                overdue: *overdue,
                stale: *stale,
            },
        ),
        Commands::Show { id } => handle_show(ctx, id),
        Commands::Add {
            company,
            role,
            stage,
            applied,
            link,
            notes,
        } => handle_add(
            ctx,
            AddArgs {
                company,
                role,
                stage: *stage,
                applied: applied.as_deref(),
                link: link.as_deref(),
                notes: notes.as_deref(),
            },
        ),
        Commands::Update { id, stage, status } => handle_update(ctx, id, *stage, *status),
        Commands::FollowUp { id, due, note } => handle_follow_up(ctx, id, due, note.as_deref()),
        Commands::Done {
            follow_up_id,
            application,
        } => handle_done(ctx, follow_up_id, application.as_deref()),
        Commands::Note { id, content } => handle_note(ctx, id, content),
        Commands::Link { id, url, label } => handle_link(ctx, id, url, label.as_deref()),
        Commands::Delete { id, yes } => handle_delete(ctx, id, *yes),
    }
}
