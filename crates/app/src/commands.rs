use std::fs;
use std::path::Path;

use anyhow::{anyhow, bail, Context};

use tally_engine::{RuleUpdate, Session};

use crate::store::Store;
use crate::{loader, Command, ConfigCommand, MapArgs, RulesCommand};

pub fn run(command: Command, session: &mut Session, store: &Store) -> anyhow::Result<()> {
    match command {
        Command::Import { path, no_headers, name } => {
            import(session, store, &path, !no_headers, name)
        }
        Command::Files => {
            files(session);
            Ok(())
        }
        Command::Remove { file } => remove(session, store, &file),
        Command::Rename { file, name } => rename(session, store, &file, &name),
        Command::Map(args) => map(session, store, args),
        Command::Rules(command) => rules(session, store, command),
        Command::Apply { json } => apply(session, json),
        Command::Config(command) => config(session, store, command),
        Command::Reset => {
            session.reset();
            store.save(session)?;
            println!("workspace cleared");
            Ok(())
        }
    }
}

fn import(
    session: &mut Session,
    store: &Store,
    path: &Path,
    has_headers: bool,
    name: Option<String>,
) -> anyhow::Result<()> {
    let mut file = loader::load(path, has_headers)
        .with_context(|| format!("failed to load {}", path.display()))?;
    if let Some(name) = name {
        file.name = name;
    }
    if session.data_file(&file.name).is_some() {
        bail!("a file named '{}' is already loaded", file.name);
    }

    let columns = file.rows.iter().map(Vec::len).max().unwrap_or(0);
    println!("loaded '{}': {} rows, {} columns", file.name, file.rows.len(), columns);
    for (index, column) in file.mapping.column_names.iter().enumerate() {
        println!("  [{index}] {column}");
    }
    if file.mapping.amount_index.is_none() {
        println!("run `tally map {}` to assign date/amount/description columns", file.name);
    }

    session.add_data_file(file);
    store.save(session)?;
    Ok(())
}

fn files(session: &Session) {
    if session.data_files().is_empty() {
        println!("no files loaded");
        return;
    }
    for file in session.data_files() {
        let m = &file.mapping;
        println!("{}  ({} rows)  id={}", file.name, file.rows.len(), file.id);
        println!(
            "  date={} format={}  amount={} decimal='{}'  description={:?}  headers={}",
            fmt_index(m.date_index),
            m.date_format,
            fmt_index(m.amount_index),
            m.decimal_separator,
            m.description_indices,
            m.has_headers,
        );
    }
}

fn fmt_index(index: Option<usize>) -> String {
    match index {
        Some(i) => i.to_string(),
        None => "unset".to_string(),
    }
}

fn remove(session: &mut Session, store: &Store, key: &str) -> anyhow::Result<()> {
    let Some(id) = session.data_file(key).map(|f| f.id.clone()) else {
        bail!("no such file: {key}");
    };
    session.remove_data_file(&id);
    store.save(session)?;
    println!("removed {key}");
    Ok(())
}

fn rename(session: &mut Session, store: &Store, key: &str, name: &str) -> anyhow::Result<()> {
    let Some(id) = session.data_file(key).map(|f| f.id.clone()) else {
        bail!("no such file: {key}");
    };
    session.rename_data_file(&id, name);
    store.save(session)?;
    println!("renamed {key} -> {name}");
    Ok(())
}

fn map(session: &mut Session, store: &Store, args: MapArgs) -> anyhow::Result<()> {
    let Some(file) = session.data_file(&args.file) else {
        bail!("no such file: {}", args.file);
    };

    let mut mapping = file.mapping.clone();
    if let Some(index) = args.date {
        mapping.date_index = Some(index);
    }
    if let Some(format) = &args.date_format {
        mapping.date_format = format.parse().map_err(|e: String| anyhow!(e))?;
    }
    if let Some(index) = args.amount {
        mapping.amount_index = Some(index);
    }
    if let Some(separator) = &args.decimal {
        mapping.decimal_separator = separator.parse().map_err(|e: String| anyhow!(e))?;
    }
    if let Some(indices) = args.description {
        mapping.description_indices = indices;
    }
    if let Some(has_headers) = args.headers {
        mapping.has_headers = has_headers;
    }

    session.update_mapping(&args.file, mapping);
    store.save(session)?;
    println!("mapping updated for {}", args.file);
    Ok(())
}

fn rules(session: &mut Session, store: &Store, command: RulesCommand) -> anyhow::Result<()> {
    match command {
        RulesCommand::Add => {
            let id = session.add_rule().id.clone();
            store.save(session)?;
            println!("added rule {id}");
        }
        RulesCommand::List => {
            if session.rules().is_empty() {
                println!("no rules defined");
            }
            for (position, rule) in session.rules().iter().enumerate() {
                let labels = format!("{}/{}", rule.category, rule.subcategory);
                let status = if rule.is_valid { "" } else { "  [invalid]" };
                println!("{position:3}  {}  {labels:<28}  {}{status}", rule.id, rule.code);
                if let Some(error) = &rule.error {
                    println!("       {error}");
                }
            }
        }
        RulesCommand::Set { id, category, subcategory, code } => {
            let update = RuleUpdate { category, subcategory, code };
            if !session.update_rule(&id, update) {
                bail!("no such rule: {id}");
            }
            store.save(session)?;
            let error = session
                .rules()
                .iter()
                .find(|r| r.id == id)
                .and_then(|r| r.error.clone());
            match error {
                Some(error) => println!("rule {id} saved but does not compile: {error}"),
                None => println!("rule {id} updated"),
            }
        }
        RulesCommand::Remove { id } => {
            if !session.delete_rule(&id) {
                bail!("no such rule: {id}");
            }
            store.save(session)?;
            println!("removed rule {id}");
        }
        RulesCommand::Move { id, to } => {
            if !session.move_rule(&id, to) {
                bail!("no such rule: {id}");
            }
            store.save(session)?;
            println!("rule {id} moved to position {to}");
        }
        RulesCommand::Validate => {
            let invalid = session.validate_rules();
            store.save(session)?;
            if invalid.is_empty() {
                println!("all {} rules compile", session.rules().len());
            } else {
                println!("{} of {} rules are invalid:", invalid.len(), session.rules().len());
                for rule in session.rules().iter().filter(|r| !r.is_valid) {
                    println!("  {}  {}", rule.id, rule.error.as_deref().unwrap_or("unknown error"));
                }
            }
        }
    }
    Ok(())
}

fn apply(session: &mut Session, json: bool) -> anyhow::Result<()> {
    let date_errors = session.apply();

    if json {
        println!("{}", serde_json::to_string_pretty(session.transactions())?);
    } else {
        for tx in session.transactions() {
            let labels = match (&tx.category, &tx.subcategory) {
                (Some(category), Some(subcategory)) => format!("{category}/{subcategory}"),
                _ => "-".to_string(),
            };
            println!(
                "{:<12}  {:>12.2}  {:<28}  {}",
                tx.date_string, tx.amount, labels, tx.description
            );
        }
        let unmatched = session.transactions().iter().filter(|t| !t.is_classified()).count();
        println!("{} transactions, {} unmatched", session.transactions().len(), unmatched);
    }

    if date_errors > 0 {
        eprintln!("warning: {date_errors} date values could not be parsed");
    }
    Ok(())
}

fn config(session: &mut Session, store: &Store, command: ConfigCommand) -> anyhow::Result<()> {
    match command {
        ConfigCommand::Export { out } => {
            let json = session.export_config()?;
            match out {
                Some(path) => {
                    fs::write(&path, json)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    println!("exported {} rules to {}", session.rules().len(), path.display());
                }
                None => println!("{json}"),
            }
        }
        ConfigCommand::Import { path } => {
            let text = fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            session.import_config(&text)?;
            store.save(session)?;
            let invalid = session.rules().iter().filter(|r| !r.is_valid).count();
            println!("imported {} rules ({invalid} invalid)", session.rules().len());
        }
    }
    Ok(())
}
