use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use downline::mirror::render_text;
use downline::{AccountStore, NewAccount, PlacementConfig, Registry, DEFAULT_FANOUT_LIMIT};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "downline", about = "Sponsorship and bounded fan-out placement")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Register every entry of a roster file and print the placement tree.
    ///
    /// Roster lines: `root <email> <first> <last>` or
    /// `<email> <first> <last> [<ref>]`, where `<ref>` is an external id or
    /// `@<email>` of an earlier entry. `#` starts a comment.
    Place {
        /// Roster file
        roster: PathBuf,
        /// Direct children allowed per node.
        #[arg(long, default_value_t = DEFAULT_FANOUT_LIMIT)]
        fanout: usize,
        /// Spaces per tree level.
        #[arg(long, default_value_t = 2)]
        indent: usize,
        /// Base URL for referral links.
        #[arg(long, default_value = "http://localhost:8000")]
        base_url: String,
        /// Also list every account with sponsor, placement and referral link.
        #[arg(long)]
        links: bool,
        /// Print the tree as JSON (requires the `visualize` feature).
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, PartialEq)]
enum RosterEntry {
    Root(NewAccount),
    Member(NewAccount, Option<String>),
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Place {
            roster,
            fanout,
            indent,
            base_url,
            links,
            json,
        } => {
            let config = PlacementConfig::default()
                .with_fanout_limit(fanout)
                .with_referral_base_url(base_url);
            let registry = run_place(roster, config)?;

            if json {
                return print_json(&registry);
            }

            print!("{}", render_text(&registry.tree(), indent));
            if links {
                print_links(&registry);
            }
        }
    }

    Ok(())
}

fn run_place(roster_path: PathBuf, config: PlacementConfig) -> Result<Registry> {
    let entries = read_roster(&roster_path)?;
    let mut registry = Registry::new(config).context("invalid placement configuration")?;

    for (line_no, entry) in entries {
        match entry {
            RosterEntry::Root(account) => {
                registry
                    .register_root(account)
                    .with_context(|| format!("root registration failed on line {line_no}"))?;
            }
            RosterEntry::Member(account, reference) => {
                let token = match reference {
                    Some(reference) => Some(resolve_reference(&registry, &reference, line_no)?),
                    None => None,
                };
                registry
                    .register(account, token.as_deref())
                    .with_context(|| format!("registration failed on line {line_no}"))?;
            }
        }
    }

    Ok(registry)
}

/// `@<email>` names an earlier roster entry; anything else is an external id.
fn resolve_reference(registry: &Registry, reference: &str, line_no: usize) -> Result<String> {
    let Some(email) = reference.strip_prefix('@') else {
        return Ok(reference.to_string());
    };
    registry
        .accounts()
        .find_by_email(email)
        .map(|sponsor| sponsor.external_id.to_string())
        .with_context(|| format!("line {line_no}: no earlier entry with email {email}"))
}

fn read_roster(path: &PathBuf) -> Result<Vec<(usize, RosterEntry)>> {
    let reader = BufReader::new(
        File::open(path).with_context(|| format!("failed to open roster {}", path.display()))?,
    );
    let mut entries = Vec::new();

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let content = line.split('#').next().unwrap_or("").trim();
        if content.is_empty() {
            continue;
        }
        entries.push((idx + 1, parse_roster_line(content, idx + 1)?));
    }

    Ok(entries)
}

fn parse_roster_line(line: &str, line_no: usize) -> Result<RosterEntry> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    match fields.as_slice() {
        ["root", email, first, last] => Ok(RosterEntry::Root(NewAccount::new(*email, *first, *last))),
        [email, first, last] => Ok(RosterEntry::Member(NewAccount::new(*email, *first, *last), None)),
        [email, first, last, reference] => Ok(RosterEntry::Member(
            NewAccount::new(*email, *first, *last),
            Some(reference.to_string()),
        )),
        _ => bail!("line {line_no}: expected `<email> <first> <last> [<ref>]`"),
    }
}

#[cfg(feature = "visualize")]
fn print_json(registry: &Registry) -> Result<()> {
    println!("{}", downline::mirror::to_json(&registry.tree())?);
    Ok(())
}

#[cfg(not(feature = "visualize"))]
fn print_json(_registry: &Registry) -> Result<()> {
    bail!("JSON output requires building with the `visualize` feature")
}

fn print_links(registry: &Registry) {
    println!();
    for account in registry.accounts().accounts() {
        println!(
            "{}\t{}\treferred_by={}\tplaced_under={}\t{}",
            account.external_id,
            account.email,
            registry.referred_by(account.id).unwrap_or_default(),
            registry.placed_under(account.id).unwrap_or_default(),
            registry.referral_link(account.id).unwrap_or_default(),
        );
    }
}
