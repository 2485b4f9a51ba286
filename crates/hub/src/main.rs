// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::{Parser, Subcommand};
use tokio::io::AsyncBufReadExt;
use tokio_util::sync::CancellationToken;
use tracing::error;

use mangahub::api::auth::{LoginPayload, RegisterPayload};
use mangahub::api::manga::ListParams;
use mangahub::api::oauth::{OAuthProvider, OAuthService};
use mangahub::config::HubConfig;
use mangahub::search::SuggestionDebouncer;
use mangahub::store::monitor::RefreshMonitor;
use mangahub::Hub;

#[derive(Debug, Parser)]
#[command(name = "mangahub", about = "MangaHub terminal client", version)]
struct Cli {
    #[command(flatten)]
    config: HubConfig,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Sign in with email and password.
    Login(LoginArgs),
    /// Create an account.
    Register(RegisterArgs),
    /// Sign out and clear the stored session.
    Logout,
    /// Show the signed-in user.
    Whoami,
    /// Show session and token status.
    Status,
    /// Verify an email address with a code.
    VerifyEmail(VerifyArgs),
    /// Resend the verification code.
    ResendCode(ResendArgs),
    /// OAuth sign-in hand-off.
    Oauth(OauthArgs),
    /// List the catalog.
    List(ListArgs),
    /// Search the catalog.
    Search(SearchArgs),
    /// Show a manga with its chapters.
    Detail(DetailArgs),
    /// List a chapter's page image URLs.
    Chapter(ChapterArgs),
    /// Manage followed manga.
    Follow(FollowArgs),
    /// Keep the session fresh in the foreground.
    Watch,
}

#[derive(Debug, clap::Args)]
struct LoginArgs {
    pub email: String,
    #[arg(long, env = "MANGAHUB_PASSWORD")]
    pub password: String,
}

#[derive(Debug, clap::Args)]
struct RegisterArgs {
    pub email: String,
    #[arg(long)]
    pub name: String,
    #[arg(long, env = "MANGAHUB_PASSWORD")]
    pub password: String,
}

#[derive(Debug, clap::Args)]
struct VerifyArgs {
    pub email: String,
    pub code: String,
}

#[derive(Debug, clap::Args)]
struct ResendArgs {
    pub email: String,
}

#[derive(Debug, clap::Args)]
struct OauthArgs {
    #[command(subcommand)]
    command: OauthCommand,
}

#[derive(Debug, Subcommand)]
enum OauthCommand {
    /// Print the provider sign-in URL to open in a browser.
    Url { provider: OAuthProvider },
    /// Complete sign-in from the callback URL.
    Callback { url: String },
}

#[derive(Debug, clap::Args)]
struct ListArgs {
    #[arg(long, default_value_t = 1)]
    pub page: u32,
    #[arg(long, default_value_t = 25)]
    pub limit: u32,
    /// Sort order (e.g. "latest").
    #[arg(long)]
    pub order: Option<String>,
    /// Filter by publication status (repeatable).
    #[arg(long)]
    pub status: Vec<String>,
    /// Filter by tag (repeatable).
    #[arg(long)]
    pub tag: Vec<String>,
}

#[derive(Debug, clap::Args)]
struct SearchArgs {
    /// Search term. Omit with --suggest for interactive suggestions.
    pub query: Option<String>,
    #[arg(long, default_value_t = 1)]
    pub page: u32,
    #[arg(long, default_value_t = 15)]
    pub limit: u32,
    #[arg(long)]
    pub status: Vec<String>,
    #[arg(long)]
    pub tag: Vec<String>,
    /// Read queries from stdin and print debounced suggestions.
    #[arg(long)]
    pub suggest: bool,
}

#[derive(Debug, clap::Args)]
struct DetailArgs {
    pub id: String,
}

#[derive(Debug, clap::Args)]
struct ChapterArgs {
    pub id: String,
}

#[derive(Debug, clap::Args)]
struct FollowArgs {
    #[command(subcommand)]
    command: FollowCommand,
}

#[derive(Debug, Subcommand)]
enum FollowCommand {
    /// List followed manga.
    List {
        #[arg(long, default_value_t = 100)]
        limit: u32,
        #[arg(long, default_value_t = 0)]
        offset: u32,
    },
    /// List followed manga ids only.
    Ids,
    /// Follow a manga.
    Add { manga_id: String },
    /// Unfollow a manga.
    Remove { manga_id: String },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = cli.config.validate() {
        eprintln!("error: {e}");
        std::process::exit(2);
    }

    init_tracing(&cli.config);
    ensure_crypto();

    let hub = Hub::new(&cli.config);
    let code = run(&cli, &hub).await;
    std::process::exit(code);
}

fn init_tracing(config: &HubConfig) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    match config.log_format.as_str() {
        "json" => {
            fmt::fmt().with_env_filter(filter).json().init();
        }
        _ => {
            fmt::fmt().with_env_filter(filter).init();
        }
    }
}

/// Install the ring crypto provider for reqwest/rustls.
fn ensure_crypto() {
    let _ = rustls::crypto::ring::default_provider().install_default();
}

async fn run(cli: &Cli, hub: &Hub) -> i32 {
    match &cli.command {
        Command::Login(args) => cmd_login(hub, args).await,
        Command::Register(args) => cmd_register(hub, args).await,
        Command::Logout => {
            hub.auth.logout().await;
            println!("Signed out.");
            0
        }
        Command::Whoami => cmd_whoami(hub).await,
        Command::Status => cmd_status(hub).await,
        Command::VerifyEmail(args) => cmd_verify_email(hub, args).await,
        Command::ResendCode(args) => cmd_resend_code(hub, args).await,
        Command::Oauth(args) => cmd_oauth(hub, args).await,
        Command::List(args) => cmd_list(hub, args).await,
        Command::Search(args) => cmd_search(hub, args).await,
        Command::Detail(args) => cmd_detail(hub, args).await,
        Command::Chapter(args) => cmd_chapter(hub, args).await,
        Command::Follow(args) => cmd_follow(hub, args).await,
        Command::Watch => cmd_watch(cli, hub).await,
    }
}

async fn cmd_login(hub: &Hub, args: &LoginArgs) -> i32 {
    let payload = LoginPayload { email: args.email.clone(), password: args.password.clone() };
    match hub.auth.login(&payload).await {
        Ok(Some(user)) => {
            println!("Signed in as {} <{}>", user.name, user.email);
            if !user.is_email_verified {
                println!("Note: email not verified yet. Run `mangahub verify-email`.");
            }
            0
        }
        Ok(None) => {
            println!("Signed in.");
            0
        }
        Err(e) => {
            eprintln!("error: {}", e.message());
            1
        }
    }
}

async fn cmd_register(hub: &Hub, args: &RegisterArgs) -> i32 {
    let payload = RegisterPayload {
        name: args.name.clone(),
        email: args.email.clone(),
        password: args.password.clone(),
    };
    match hub.auth.register(&payload).await {
        Ok(()) => {
            println!("Account created. Check {} for a verification code.", args.email);
            0
        }
        Err(e) => {
            eprintln!("error: {}", e.message());
            1
        }
    }
}

async fn cmd_whoami(hub: &Hub) -> i32 {
    match hub.session.user_from_token().await {
        Some(user) => {
            println!("{} <{}>{}", user.name, user.email, verified_suffix(user.is_email_verified));
            0
        }
        None => {
            println!("Not signed in.");
            1
        }
    }
}

fn verified_suffix(verified: bool) -> &'static str {
    if verified {
        ""
    } else {
        " (unverified)"
    }
}

async fn cmd_status(hub: &Hub) -> i32 {
    let info = hub.session.token_info().await;
    let auth = hub.session.auth_state().await;

    println!("authenticated:  {}", auth.is_authenticated);
    println!(
        "access token:   {}",
        token_summary(info.has_access_token, info.access_token_expired)
    );
    println!(
        "refresh token:  {}",
        token_summary(info.has_refresh_token, info.refresh_token_expired)
    );
    if let Some(claims) = info.access_claims {
        if let Some(exp) = claims.exp {
            println!("expires at:     {exp} (epoch seconds)");
        }
    }
    if hub.session.should_refresh().await {
        println!("refresh due:    yes (inside the early-refresh window)");
    }
    0
}

fn token_summary(present: bool, expired: bool) -> &'static str {
    match (present, expired) {
        (false, _) => "absent",
        (true, true) => "present, expired",
        (true, false) => "present, valid",
    }
}

async fn cmd_verify_email(hub: &Hub, args: &VerifyArgs) -> i32 {
    match hub.auth.verify_email(&args.email, &args.code).await {
        Ok(()) => {
            println!("Email verified.");
            0
        }
        Err(e) => {
            eprintln!("error: {}", e.message());
            1
        }
    }
}

async fn cmd_resend_code(hub: &Hub, args: &ResendArgs) -> i32 {
    match hub.auth.resend_verification(&args.email).await {
        Ok(()) => {
            println!("Verification code sent to {}.", args.email);
            0
        }
        Err(e) => {
            eprintln!("error: {}", e.message());
            1
        }
    }
}

async fn cmd_oauth(hub: &Hub, args: &OauthArgs) -> i32 {
    match &args.command {
        OauthCommand::Url { provider } => {
            println!("{}", hub.oauth.authorize_url(*provider));
            println!("Open the URL in a browser, then run `mangahub oauth callback <url>`.");
            0
        }
        OauthCommand::Callback { url } => {
            if !OAuthService::is_callback(url) {
                eprintln!("error: URL carries no token or error parameter");
                return 2;
            }
            let (outcome, _clean) = OAuthService::parse_callback(url);
            if let Some(err) = outcome.error {
                eprintln!("error: provider rejected sign-in: {err}");
                return 1;
            }
            let Some(token) = outcome.token else {
                eprintln!("error: callback had no token");
                return 1;
            };
            match hub.oauth.complete(&token).await {
                Ok(user) => {
                    println!("Signed in as {} <{}>", user.name, user.email);
                    0
                }
                Err(e) => {
                    eprintln!("error: {}", e.message());
                    1
                }
            }
        }
    }
}

async fn cmd_list(hub: &Hub, args: &ListArgs) -> i32 {
    let params = ListParams {
        limit: args.limit,
        offset: (args.page.saturating_sub(1)) * args.limit,
        order: args.order.clone(),
        status: args.status.clone(),
        tags: args.tag.clone(),
    };
    match hub.manga.list(&params).await {
        Ok(page) => {
            print_manga_table(&page.items);
            println!("{} of {} total", page.items.len(), page.total);
            0
        }
        Err(e) => {
            eprintln!("error: {}", e.message());
            1
        }
    }
}

async fn cmd_search(hub: &Hub, args: &SearchArgs) -> i32 {
    if args.suggest {
        return cmd_suggest(hub).await;
    }
    let Some(ref query) = args.query else {
        eprintln!("error: a search term is required (or pass --suggest)");
        return 2;
    };
    let params = ListParams {
        limit: args.limit,
        offset: (args.page.saturating_sub(1)) * args.limit,
        order: None,
        status: args.status.clone(),
        tags: args.tag.clone(),
    };
    match hub.manga.search(query, &params).await {
        Ok(page) => {
            print_manga_table(&page.items);
            println!("{} of {} total for \"{query}\"", page.items.len(), page.total);
            0
        }
        Err(e) => {
            eprintln!("error: {}", e.message());
            1
        }
    }
}

/// Interactive suggestion mode: each stdin line is a query; suggestions
/// print once the debounce window closes.
async fn cmd_suggest(hub: &Hub) -> i32 {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let debouncer = SuggestionDebouncer::for_catalog(std::sync::Arc::clone(&hub.manga), tx);

    let printer = tokio::spawn(async move {
        while let Some(suggestions) = rx.recv().await {
            if suggestions.is_empty() {
                println!("(no suggestions)");
                continue;
            }
            for s in &suggestions {
                match &s.author {
                    Some(author) => println!("  {}  {} by {}", s.id, s.title, author),
                    None => println!("  {}  {}", s.id, s.title),
                }
            }
        }
    });

    println!("Type to search (Ctrl-D to quit):");
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    while let Ok(Some(line)) = lines.next_line().await {
        debouncer.input(&line);
    }

    debouncer.cancel();
    drop(debouncer);
    let _ = printer.await;
    0
}

async fn cmd_detail(hub: &Hub, args: &DetailArgs) -> i32 {
    match hub.manga.detail(&args.id).await {
        Ok(detail) => {
            println!("{}", detail.manga.title);
            if let Some(ref author) = detail.manga.author {
                println!("by {author}");
            }
            if let Some(ref status) = detail.manga.status {
                println!("status: {status}");
            }
            if !detail.manga.tags.is_empty() {
                println!("tags: {}", detail.manga.tags.join(", "));
            }
            if let Some(ref description) = detail.description {
                println!("\n{description}\n");
            }
            println!("{:<38} {:<8} TITLE", "CHAPTER ID", "NO.");
            println!("{}", "-".repeat(60));
            for ch in &detail.chapters {
                println!(
                    "{:<38} {:<8} {}",
                    ch.id,
                    ch.chapter.as_deref().unwrap_or("-"),
                    ch.title.as_deref().unwrap_or(""),
                );
            }
            0
        }
        Err(e) => {
            eprintln!("error: {}", e.message());
            1
        }
    }
}

async fn cmd_chapter(hub: &Hub, args: &ChapterArgs) -> i32 {
    match hub.manga.chapter_images(&args.id).await {
        Ok(images) => {
            for url in &images {
                println!("{url}");
            }
            0
        }
        Err(e) => {
            eprintln!("error: {}", e.message());
            1
        }
    }
}

async fn cmd_follow(hub: &Hub, args: &FollowArgs) -> i32 {
    match &args.command {
        FollowCommand::List { limit, offset } => match hub.follow.list(*limit, *offset).await {
            Ok(items) => {
                print_manga_table(&items);
                0
            }
            Err(e) => {
                eprintln!("error: {}", e.message());
                1
            }
        },
        FollowCommand::Ids => match hub.follow.ids().await {
            Ok(ids) => {
                for id in &ids {
                    println!("{id}");
                }
                0
            }
            Err(e) => {
                eprintln!("error: {}", e.message());
                1
            }
        },
        FollowCommand::Add { manga_id } => match hub.follow.follow(manga_id).await {
            Ok(()) => {
                match hub.manga.by_id(manga_id).await {
                    Ok(manga) => println!("Following {}.", manga.title),
                    Err(_) => println!("Following {manga_id}."),
                }
                0
            }
            Err(e) => {
                eprintln!("error: {}", e.message());
                1
            }
        },
        FollowCommand::Remove { manga_id } => match hub.follow.unfollow(manga_id).await {
            Ok(()) => {
                println!("Unfollowed {manga_id}.");
                0
            }
            Err(e) => {
                eprintln!("error: {}", e.message());
                1
            }
        },
    }
}

async fn cmd_watch(cli: &Cli, hub: &Hub) -> i32 {
    let shutdown = CancellationToken::new();
    let monitor = RefreshMonitor::new(
        std::sync::Arc::clone(&hub.store),
        std::sync::Arc::clone(&hub.auth),
        cli.config.check_interval(),
    );
    let handle = monitor.spawn(shutdown.clone());

    println!("Watching session (Ctrl-C to stop).");
    if tokio::signal::ctrl_c().await.is_err() {
        error!("failed to listen for ctrl-c");
    }
    shutdown.cancel();
    let _ = handle.await;

    let snapshot = hub.store.snapshot().await;
    if snapshot.is_authenticated {
        println!("Session still active.");
    } else {
        println!("Session ended; sign in again with `mangahub login`.");
    }
    0
}

fn print_manga_table(items: &[mangahub::api::manga::Manga]) {
    if items.is_empty() {
        println!("No results.");
        return;
    }
    println!("{:<38} {:<40} AUTHOR", "ID", "TITLE");
    println!("{}", "-".repeat(90));
    for m in items {
        println!(
            "{:<38} {:<40} {}",
            m.id,
            truncate(&m.title, 40),
            m.author.as_deref().unwrap_or("Unknown"),
        );
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_owned();
    }
    let cut: String = s.chars().take(max.saturating_sub(1)).collect();
    format!("{cut}…")
}
