use anyhow::{anyhow, Result};
use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};
use quire::config::Config;
use quire::post::Post;
use serde::Serialize;
use serde_json::json;
use std::path::Path;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let matches = App::new("quire")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Indexes a directory of posts and answers blog queries as JSON")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(
            Arg::with_name("project")
                .long("project")
                .short("p")
                .takes_value(true)
                .help("Directory to search for quire.yaml (defaults to the current directory)"),
        )
        .subcommand(
            SubCommand::with_name("refresh")
                .about("Rebuilds the index store")
                .arg(Arg::with_name("key").required(true).help("The refresh secret")),
        )
        .subcommand(
            SubCommand::with_name("page")
                .about("Prints a listing page")
                .arg(Arg::with_name("number").help("The page number, starting at 1")),
        )
        .subcommand(
            SubCommand::with_name("post")
                .about("Prints a public post with its neighbours")
                .arg(Arg::with_name("url").required(true)),
        )
        .subcommand(
            SubCommand::with_name("draft")
                .about("Prints a draft")
                .arg(Arg::with_name("url").required(true)),
        )
        .subcommand(
            SubCommand::with_name("tag")
                .about("Prints the public posts carrying a tag")
                .arg(Arg::with_name("tag").required(true)),
        )
        .get_matches();

    let config = match matches.value_of("project") {
        Some(dir) => Config::from_directory(Path::new(dir))?,
        None => Config::from_directory(&std::env::current_dir()?)?,
    };
    run(&config, matches.subcommand())
}

fn run(config: &Config, subcommand: (&str, Option<&ArgMatches>)) -> Result<()> {
    let blog = config.blog();
    let format = config.date_format.as_str();
    match subcommand {
        ("refresh", Some(m)) => print(&config.refresher().refresh(required(m, "key")?)?),
        ("page", Some(m)) => {
            let number = match m.value_of("number") {
                Some(number) => number.parse::<usize>()?,
                None => 1,
            };
            let page = blog.page(number)?;
            print(&json!({
                "number": page.number,
                "is_first": page.listing.is_first,
                "is_last": page.listing.is_last,
                "skipped": page.listing.skipped,
                "posts": Dated::all(&page.listing.posts, format),
            }))
        }
        ("post", Some(m)) => {
            let url = required(m, "url")?;
            let view = blog
                .post_view(url)?
                .ok_or_else(|| anyhow!("post `{}` not found", url))?;
            print(&json!({
                "post": Dated::new(&view.post, format),
                "older": view.older.as_ref().map(|p| Dated::new(p, format)),
                "newer": view.newer.as_ref().map(|p| Dated::new(p, format)),
            }))
        }
        ("draft", Some(m)) => {
            let url = required(m, "url")?;
            let draft = blog
                .draft_view(url)?
                .ok_or_else(|| anyhow!("draft `{}` not found", url))?;
            print(&Dated::new(&draft, format))
        }
        ("tag", Some(m)) => {
            let tag = required(m, "tag")?;
            let listing = blog.get_posts_by_tag(tag)?;
            print(&json!({
                "tag": tag,
                "skipped": listing.skipped,
                "posts": Dated::all(&listing.posts, format),
            }))
        }
        (name, _) => Err(anyhow!("unknown command `{}`", name)),
    }
}

fn required<'a>(m: &'a ArgMatches, name: &str) -> Result<&'a str> {
    m.value_of(name)
        .ok_or_else(|| anyhow!("missing argument `{}`", name))
}

/// A post as handed to the presentation layer: every field plus the date
/// formatted for display.
#[derive(Serialize)]
struct Dated<'a> {
    #[serde(flatten)]
    post: &'a Post,
    display_date: String,
}

impl<'a> Dated<'a> {
    fn new(post: &'a Post, format: &str) -> Dated<'a> {
        Dated {
            post,
            display_date: post.display_date(format),
        }
    }

    fn all(posts: &'a [Post], format: &str) -> Vec<Dated<'a>> {
        posts.iter().map(|post| Dated::new(post, format)).collect()
    }
}

fn print<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
