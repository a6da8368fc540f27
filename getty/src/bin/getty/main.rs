mod commands;
mod examples;
mod output;
mod theme;

use std::fmt::Write;
use std::io::{self, Write as IoWrite};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{
    ColorChoice, Command, CommandFactory, FromArgMatches, Parser, Subcommand,
    builder::{
        Styles,
        styling::{AnsiColor, Color as ClapColor, RgbColor, Style},
    },
    error::ErrorKind,
};
use colored::{Color as ThemeColor, Colorize, control::ShouldColorize};

use getty::{
    AnyStore, Calendar, GettyConfig, GettyService, LikeStrategy, WriteMode, config::StoreBackend,
};

use commands::{
    graph::{EdgeArgs, FriendsArgs, handle_audit, handle_follow, handle_friends, handle_repair, handle_unfollow},
    posts::{
        CommentArgs, FeedArgs, LikeArgs, PostArgs, PostRef, handle_comment, handle_feed, handle_like, handle_post,
        handle_posts, handle_show,
    },
    serve::{ServeArgs, handle_serve},
};
use examples::{ExampleGroup, command_examples};
use output::{GlobalOptions, OutputFormat, OutputManager};
use theme::{ICONS, THEME};

const ENVIRONMENT_VARIABLES: &[(&str, &str)] = &[
    ("GETTY_CONFIG", "Path to the config file (default: ./getty.toml)"),
    ("GETTY_BACKEND", "Store backend: memory or redis"),
    ("GETTY_REDIS_URL", "Redis connection URL, overrides [store].url"),
    ("REDIS_URL", "Referenced by the default [store].url"),
    ("RUST_LOG", "Log filter for env_logger, e.g. getty=debug"),
];

#[derive(Parser)]
#[command(name = "getty")]
#[command(version)]
#[command(
    about = "Posts, likes, comments and follow edges for daily-getty",
    long_about = r#"Consistency layer for daily-getty that provides:

• One post per user per day, replaced on re-post
• Likes with set semantics and conflict-checked writes
• Follow edges mirrored on both users' friend records
• A home feed built from everyone a user follows

Commands:
  serve     Serve the JSON API under /api/database
  post      Create or replace a day's post
  follow    Follow another user
  audit     Find one-sided follow edges
"#
)]
#[command(subcommand_required = true, arg_required_else_help = true)]
struct Cli {
    /// Output format
    #[arg(long, value_enum, default_value = "table", global = true)]
    output: OutputFormat,

    /// Suppress output (only errors will be shown)
    #[arg(short = 'q', long, global = true)]
    quiet: bool,

    /// Enable verbose output
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Config file to load
    #[arg(long, env = "GETTY_CONFIG")]
    config: Option<PathBuf>,

    /// Store backend
    #[arg(long, value_enum, env = "GETTY_BACKEND")]
    backend: Option<StoreBackend>,

    /// Redis connection URL
    #[arg(long, env = "GETTY_REDIS_URL")]
    redis_url: Option<String>,

    /// Key prefix in Redis
    #[arg(long)]
    prefix: Option<String>,

    /// How likes and comments are written back
    #[arg(long, value_enum)]
    like_strategy: Option<LikeStrategy>,

    /// How the two friend records of an edge are written
    #[arg(long, value_enum)]
    write_mode: Option<WriteMode>,

    /// Calendar that decides today's date key
    #[arg(long, value_enum)]
    calendar: Option<Calendar>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn parse_with_styles() -> Self {
        let command = build_cli_command();
        match command.styles(help_styles()).try_get_matches() {
            Ok(matches) => Cli::from_arg_matches(&matches).unwrap_or_else(|err| err.exit()),
            Err(err) => match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                    let _ = print_blank_line_stdout();
                    if let Err(print_err) = err.print()
                        && print_err.kind() != io::ErrorKind::BrokenPipe
                    {
                        eprintln!("Failed to display help: {print_err}");
                    }
                    let _ = print_blank_line_stdout();
                    std::process::exit(0);
                }
                ErrorKind::MissingSubcommand => {
                    handle_missing_subcommand(err);
                }
                _ => {
                    let exit_code = err.exit_code();
                    let _ = print_blank_line_stderr();
                    if let Err(print_err) = err.print()
                        && print_err.kind() != io::ErrorKind::BrokenPipe
                    {
                        eprintln!("Failed to display error: {print_err}");
                    }
                    let _ = print_blank_line_stderr();
                    std::process::exit(exit_code);
                }
            },
        }
    }

    /// Loads the config file and applies command-line overrides on top.
    fn resolve_config(&self) -> Result<GettyConfig> {
        let mut config = GettyConfig::discover(self.config.as_deref()).context("failed to load configuration")?;
        if let Some(backend) = self.backend {
            config.store.backend = backend;
        }
        if let Some(url) = &self.redis_url {
            config.store.url = url.clone();
        }
        if let Some(prefix) = &self.prefix {
            config.store.prefix = prefix.clone();
        }
        if let Some(strategy) = self.like_strategy {
            config.posts.like_strategy = strategy;
        }
        if let Some(calendar) = self.calendar {
            config.posts.calendar = calendar;
        }
        if let Some(mode) = self.write_mode {
            config.graph.write_mode = mode;
        }
        match &self.command {
            Commands::Feed(args) => {
                if args.include_own {
                    config.feed.include_own_posts = true;
                }
                if let Some(policy) = args.policy {
                    config.feed.policy = policy;
                }
            }
            Commands::Serve(args) => {
                if let Some(bind) = &args.bind {
                    config.server.bind = bind.clone();
                }
            }
            _ => {}
        }
        Ok(config)
    }
}

fn handle_missing_subcommand(error: clap::error::Error) -> ! {
    let mut command = build_cli_command();
    let command_name = command
        .get_display_name()
        .unwrap_or_else(|| command.get_name())
        .to_string();

    let _ = print_blank_line_stderr();
    eprintln!("error: '{command_name}' requires a subcommand but one was not provided");
    let _ = print_blank_line_stderr();

    command = command.styles(help_styles());

    let mut stderr = io::stderr();
    if command.write_long_help(&mut stderr).is_ok() {
        let _ = IoWrite::write_all(&mut stderr, b"\n");
        let _ = IoWrite::flush(&mut stderr);
    }

    let _ = print_blank_line_stderr();
    std::process::exit(error.exit_code());
}

fn build_cli_command() -> Command {
    let use_color = detect_color_support();
    let appendix = render_top_level_appendix(use_color);
    let mut command = Cli::command().after_long_help(appendix);
    command = command.color(if use_color { ColorChoice::Auto } else { ColorChoice::Never });
    attach_command_examples(&mut command, use_color);
    command
}

fn attach_command_examples(command: &mut Command, use_color: bool) {
    for example in command_examples() {
        if let Some(subcommand) = command.find_subcommand_mut(example.name) {
            let help_text = render_examples(example.groups, use_color);
            *subcommand = subcommand.clone().after_long_help(help_text);
        }
    }
}

fn render_examples(groups: &[ExampleGroup], use_color: bool) -> String {
    let theme = &THEME;
    let mut buffer = String::new();

    let heading = stylize("Examples:", theme.highlight, true, use_color);
    let _ = writeln!(buffer, "{heading}");

    for (index, group) in groups.iter().enumerate() {
        let title = stylize(group.title, theme.primary, true, use_color);
        let _ = writeln!(buffer, "  {title}");

        for command in group.commands {
            let arrow = stylize(ICONS.arrow, theme.secondary, false, use_color);
            let command_text = stylize(command, theme.secondary, false, use_color);
            let _ = writeln!(buffer, "    {arrow} {command_text}");
        }

        if index + 1 < groups.len() {
            buffer.push('\n');
        }
    }

    buffer
}

fn render_top_level_appendix(use_color: bool) -> String {
    let theme = &THEME;
    let mut buffer = String::new();

    let env_heading = stylize("Environment Variables:", theme.highlight, true, use_color);
    let _ = writeln!(buffer, "{env_heading}");
    for (key, description) in ENVIRONMENT_VARIABLES {
        let key_text = stylize(key, theme.key, true, use_color);
        let value_text = stylize(description, theme.value, false, use_color);
        let _ = writeln!(buffer, "  {key_text:<24} {value_text}");
    }

    buffer.push('\n');

    let tip_heading = stylize("Tip:", theme.highlight, true, use_color);
    let tip_text = stylize(
        "Without --backend redis every command runs against a fresh in-memory store.",
        theme.secondary,
        false,
        use_color,
    );
    let _ = writeln!(buffer, "{tip_heading} {tip_text}");

    buffer
}

fn print_blank_line_stdout() -> io::Result<()> {
    let mut stdout = io::stdout();
    IoWrite::write_all(&mut stdout, b"\n")?;
    IoWrite::flush(&mut stdout)
}

fn print_blank_line_stderr() -> io::Result<()> {
    let mut stderr = io::stderr();
    IoWrite::write_all(&mut stderr, b"\n")?;
    IoWrite::flush(&mut stderr)
}

fn stylize(text: &str, color: ThemeColor, bold: bool, use_color: bool) -> String {
    if !use_color {
        return text.to_string();
    }
    let styled = text.color(color);
    if bold { styled.bold().to_string() } else { styled.to_string() }
}

fn detect_color_support() -> bool {
    ShouldColorize::from_env().should_colorize()
}

fn help_styles() -> Styles {
    let theme = &THEME;
    Styles::styled()
        .usage(style_from_color(theme.primary).bold())
        .header(style_from_color(theme.highlight).bold())
        .literal(style_from_color(theme.secondary))
        .placeholder(style_from_color(theme.muted))
        .valid(style_from_color(theme.success))
        .invalid(style_from_color(theme.warning))
        .error(style_from_color(theme.error).bold())
}

fn style_from_color(color: ThemeColor) -> Style {
    Style::new().fg_color(Some(color_to_clap_color(color)))
}

fn color_to_clap_color(color: ThemeColor) -> ClapColor {
    match color {
        ThemeColor::Black => ClapColor::Ansi(AnsiColor::Black),
        ThemeColor::Red => ClapColor::Ansi(AnsiColor::Red),
        ThemeColor::Green => ClapColor::Ansi(AnsiColor::Green),
        ThemeColor::Yellow => ClapColor::Ansi(AnsiColor::Yellow),
        ThemeColor::Blue => ClapColor::Ansi(AnsiColor::Blue),
        ThemeColor::Magenta => ClapColor::Ansi(AnsiColor::Magenta),
        ThemeColor::Cyan => ClapColor::Ansi(AnsiColor::Cyan),
        ThemeColor::White => ClapColor::Ansi(AnsiColor::White),
        ThemeColor::BrightBlack => ClapColor::Ansi(AnsiColor::BrightBlack),
        ThemeColor::BrightRed => ClapColor::Ansi(AnsiColor::BrightRed),
        ThemeColor::BrightGreen => ClapColor::Ansi(AnsiColor::BrightGreen),
        ThemeColor::BrightYellow => ClapColor::Ansi(AnsiColor::BrightYellow),
        ThemeColor::BrightBlue => ClapColor::Ansi(AnsiColor::BrightBlue),
        ThemeColor::BrightMagenta => ClapColor::Ansi(AnsiColor::BrightMagenta),
        ThemeColor::BrightCyan => ClapColor::Ansi(AnsiColor::BrightCyan),
        ThemeColor::BrightWhite => ClapColor::Ansi(AnsiColor::BrightWhite),
        ThemeColor::TrueColor { r, g, b } => ClapColor::Rgb(RgbColor(r, g, b)),
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the JSON API
    Serve(ServeArgs),

    /// Create or replace a user's post for one day
    Post(PostArgs),

    /// Show one post
    Show(PostRef),

    /// List every post of a user, oldest first
    Posts {
        /// Owner of the posts
        user_id: String,
    },

    /// Like a post
    Like(LikeArgs),

    /// Remove a like
    Unlike(LikeArgs),

    /// Comment on a post
    Comment(CommentArgs),

    /// Follow another user
    Follow(EdgeArgs),

    /// Stop following another user
    Unfollow(EdgeArgs),

    /// Show who a user follows and who follows them
    Friends(FriendsArgs),

    /// Build a user's home feed
    Feed(FeedArgs),

    /// List follow edges that are recorded on one side only
    Audit {
        /// User whose edges to check
        user_id: String,
    },

    /// Rewrite follower lists from the user's following list and their followers' records
    Repair {
        /// User whose edges to repair
        user_id: String,
    },
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let cli = Cli::parse_with_styles();
    if cli.no_color {
        colored::control::set_override(false);
    }

    let output = OutputManager::new(GlobalOptions {
        output_format: cli.output.clone(),
        quiet: cli.quiet,
        verbose: cli.verbose,
        no_color: cli.no_color,
    });

    let _ = print_blank_line_stdout();

    match execute(cli, &output).await {
        Ok(()) => {
            let _ = print_blank_line_stdout();
        }
        Err(err) => {
            output.error(&format!("{err:#}"));
            let _ = print_blank_line_stdout();
            std::process::exit(1);
        }
    }
}

async fn execute(cli: Cli, output: &OutputManager) -> Result<()> {
    let config = cli.resolve_config()?;

    let store = AnyStore::from_config(&config.store)
        .await
        .context("failed to open the document store")?;
    let backend = store.backend();
    output.verbose(&format!(
        "store={} like_strategy={:?} write_mode={:?} feed_policy={:?}",
        backend.as_str(),
        config.posts.like_strategy,
        config.graph.write_mode,
        config.feed.policy
    ));
    if backend == StoreBackend::Memory && !matches!(cli.command, Commands::Serve(_)) {
        output.warning("Using the in-memory store; nothing is kept after this command exits");
    }

    let service = GettyService::new(store, &config);

    match cli.command {
        Commands::Serve(_) => handle_serve(&config.server.bind, backend, service, output).await?,
        Commands::Post(args) => handle_post(args, &service, output).await?,
        Commands::Show(args) => handle_show(args, &service, output).await?,
        Commands::Posts { user_id } => handle_posts(&user_id, &service, output).await?,
        Commands::Like(args) => handle_like(args, true, &service, output).await?,
        Commands::Unlike(args) => handle_like(args, false, &service, output).await?,
        Commands::Comment(args) => handle_comment(args, &service, output).await?,
        Commands::Follow(args) => handle_follow(args, &service, output).await?,
        Commands::Unfollow(args) => handle_unfollow(args, &service, output).await?,
        Commands::Friends(args) => handle_friends(args, &service, output).await?,
        Commands::Feed(args) => handle_feed(args, &service, output).await?,
        Commands::Audit { user_id } => handle_audit(&user_id, &service, output).await?,
        Commands::Repair { user_id } => handle_repair(&user_id, &service, output).await?,
    }

    Ok(())
}
