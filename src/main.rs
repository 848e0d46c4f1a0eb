use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use inkpad::api::{Blog, Login, Profile, Registration};
use inkpad::client::AppContext;
use inkpad::config::Config;
use inkpad::guard::{Capability, Decision};
use inkpad::logging::init_tracing;

/// Command-line client for the Inkpad blogging service
#[derive(Parser, Debug)]
#[command(name = "inkpad")]
#[command(version)]
struct Cli {
    /// Config file (defaults to the platform config dir)
    #[arg(long, env = "INKPAD_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and store the credential
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "INKPAD_PASSWORD")]
        password: String,
    },
    /// Create an account and sign in
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "INKPAD_PASSWORD")]
        password: String,
    },
    /// Forget the stored credential
    Logout,
    /// Show the signed-in identity
    Whoami,
    /// List published posts
    Blogs {
        /// Number of pages to load
        #[arg(long, default_value_t = 1)]
        pages: u32,
        /// Only show posts whose title contains this text
        #[arg(long)]
        search: Option<String>,
    },
    /// Show one post
    Blog { id: String },
    /// List your own posts
    MyBlogs,
    /// Delete one of your posts
    DeleteBlog { id: String },
    /// Administration commands
    #[command(subcommand)]
    Admin(AdminCommand),
}

#[derive(Subcommand, Debug)]
enum AdminCommand {
    /// List accounts
    Users {
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Delete an account
    DeleteUser { id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => {
            let mut config = Config::load_from(path)
                .with_context(|| format!("loading config from {}", path.display()))?;
            config.apply_env(|name| std::env::var(name).ok());
            config.validate().context("invalid config")?;
            config
        }
        None => Config::load().context("loading config")?,
    };

    let app = AppContext::new(config).context("opening credential store")?;
    app.start();
    run(&app, cli.command).await
}

async fn run(app: &AppContext, command: Command) -> Result<()> {
    match command {
        Command::Login { email, password } => {
            app.login(&Login { email, password })
                .await
                .context("login failed")?;
            print_identity(app).await
        }
        Command::Register {
            username,
            email,
            password,
        } => {
            app.register(&Registration {
                username,
                email,
                password,
            })
            .await
            .context("registration failed")?;
            print_identity(app).await
        }
        Command::Logout => {
            app.logout();
            println!("Logged out");
            Ok(())
        }
        Command::Whoami => print_identity(app).await,
        Command::Blogs { pages, search } => {
            let mut feed = app.blog_feed().await;
            while feed.pages.len() < pages as usize && feed.has_next() {
                match app.next_blogs().await {
                    Some(next) => feed = next,
                    None => break,
                }
            }
            if let Some(err) = &feed.error {
                bail!("could not load posts: {}", err);
            }
            let blogs = match search {
                Some(needle) => app.search_blogs(&needle),
                None => feed.items().cloned().collect(),
            };
            for blog in &blogs {
                print_blog_line(blog);
            }
            if feed.has_next() {
                println!("(more available: --pages {})", feed.pages.len() + 1);
            }
            Ok(())
        }
        Command::Blog { id } => {
            require(app, &Capability::Authenticated).await?;
            let blog = app.blog(&id).await.into_result().context("could not load post")?;
            println!("{}\n[{}] {}\n\n{}", blog.title, blog.category, blog.tags.join(" "), blog.content);
            if let Some(thumbnail) = &blog.thumbnail {
                println!("\nthumbnail: {}", thumbnail);
            }
            Ok(())
        }
        Command::MyBlogs => {
            require(app, &Capability::Authenticated).await?;
            let blogs = app.my_blogs().await.into_result().context("could not load posts")?;
            for blog in blogs.iter() {
                print_blog_line(blog);
            }
            Ok(())
        }
        Command::DeleteBlog { id } => {
            require(app, &Capability::Authenticated).await?;
            app.delete_blog(&id).await.context("delete failed")?;
            println!("Deleted {}", id);
            Ok(())
        }
        Command::Admin(AdminCommand::Users { page }) => {
            require(app, &Capability::admin()).await?;
            let users = app
                .admin_users(page)
                .await
                .into_result()
                .context("could not load users")?;
            for user in &users.items {
                print_user_line(user);
            }
            println!("page {}/{}", users.current_page, users.total_pages);
            Ok(())
        }
        Command::Admin(AdminCommand::DeleteUser { id }) => {
            require(app, &Capability::admin()).await?;
            app.delete_user(&id).await.context("delete failed")?;
            println!("Deleted user {}", id);
            Ok(())
        }
    }
}

async fn require(app: &AppContext, capability: &Capability) -> Result<()> {
    match app.authorize(capability).await {
        Decision::Allow => Ok(()),
        Decision::RedirectToLogin => bail!("not signed in; run `inkpad login` first"),
        Decision::RedirectToHome => bail!("this command needs the admin role"),
        Decision::Suspend => bail!("session is still loading"),
    }
}

async fn print_identity(app: &AppContext) -> Result<()> {
    let session = app.session().settled().await;
    match session.identity {
        Some(identity) => {
            println!(
                "{} <{}> roles: {}",
                identity.username,
                identity.email,
                identity.roles.join(", ")
            );
            Ok(())
        }
        None => match app.session().last_error() {
            Some(err) => bail!("not signed in: {}", err),
            None => bail!("not signed in"),
        },
    }
}

fn print_blog_line(blog: &Blog) {
    println!("{}  {}  [{}]", blog.id, blog.title, blog.category);
}

fn print_user_line(user: &Profile) {
    let admin = if user.is_admin { " (admin)" } else { "" };
    println!("{}  {} <{}>{}", user.id, user.username, user.email, admin);
}
