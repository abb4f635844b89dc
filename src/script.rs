//! A minimal command language for driving the registry.
//!
//! Scripts are semicolon-separated commands with `#` comments:
//!
//! ```text
//! declare item apple, carrot;
//! declare fluid water;
//! declare category ore_iron: iron_ore, deep_iron_ore;
//! add pre [item(apple) * 4, 8], [fluid(water) * 500, 6];
//! add post [item(apple), 5];
//! compute;
//! worth item(apple);
//! show snapshot;
//! ```
//!
//! The engine executes against a borrowed [`Registry`] and the
//! [`DeclaredDirectory`] standing in for the host's own registries.

use lazy_static::lazy_static;
use regex::Regex;

use tracing::debug;

use crate::error::{ExchequerError, Result};
use crate::registry::{Registry, Tier};
use crate::stack::{DeclaredDirectory, Directory, Stack};
use crate::worth::Worth;

lazy_static! {
    static ref DECLARE: Regex = Regex::new(r"^declare (item|fluid|category) (.+)$").unwrap();
    static ref CATEGORY: Regex =
        Regex::new(r"^([A-Za-z0-9_.:/-]+)\s*(?::\s*(.+))?$").unwrap();
    static ref ADD: Regex = Regex::new(r"^add (pre|post) (.+)$").unwrap();
    static ref TUPLE: Regex = Regex::new(r"\[[^\[\]]+\]").unwrap();
    static ref TUPLE_PARTS: Regex =
        Regex::new(r"^\[\s*(.+?)\s*,\s*([0-9eE+\-.]+)\s*\]$").unwrap();
    static ref WORTH_OF: Regex = Regex::new(r"^worth (.+)$").unwrap();
    static ref SHOW: Regex = Regex::new(r"^show (snapshot|pre|post)$").unwrap();
    static ref IDENTIFIER: Regex = Regex::new(r"^[A-Za-z0-9_.:/-]+$").unwrap();
}

/// Everything a script run produced, one printable row per result.
#[derive(Debug, Default)]
pub struct ScriptOutcome {
    pub rows: Vec<String>,
    pub commands: usize,
}

pub struct Engine<'en> {
    registry: &'en Registry,
    directory: &'en DeclaredDirectory,
}

impl<'en> Engine<'en> {
    pub fn new(registry: &'en Registry, directory: &'en DeclaredDirectory) -> Self {
        Self { registry, directory }
    }

    /// Executes a script and prints its rows, REPL style.
    pub fn execute(&self, script: &str) {
        match self.execute_collect(script) {
            Ok(outcome) => {
                for row in &outcome.rows {
                    println!("{}", row);
                }
            }
            Err(error) => println!("{}", error),
        }
    }

    /// Executes a script and returns its rows. The first failing command
    /// aborts the rest of the script.
    pub fn execute_collect(&self, script: &str) -> Result<ScriptOutcome> {
        let stripped = strip(script);
        debug!(script = %stripped.trim(), "executing");
        let mut outcome = ScriptOutcome::default();
        let commands = stripped.split(';').map(str::trim).filter(|c| !c.is_empty());
        for (index, command) in commands.enumerate() {
            self.execute_command(index, command, &mut outcome)?;
            outcome.commands += 1;
        }
        Ok(outcome)
    }

    fn execute_command(
        &self,
        index: usize,
        command: &str,
        outcome: &mut ScriptOutcome,
    ) -> Result<()> {
        if let Some(captures) = DECLARE.captures(command) {
            let kind = captures[1].to_string();
            return self.declare(index, &kind, &captures[2], outcome);
        }
        if let Some(captures) = ADD.captures(command) {
            let tier = if &captures[1] == "pre" { Tier::Pre } else { Tier::Post };
            return self.add(index, tier, &captures[2], outcome);
        }
        if let Some(captures) = WORTH_OF.captures(command) {
            let stack: Stack = captures[1].parse().map_err(|e| at(e, index))?;
            match self.registry.worth_of(&stack)? {
                Some(worth) => {
                    outcome.rows.push(format!("{} = {}", stack.clone().with_quantity(1), worth));
                }
                None => {
                    outcome.rows.push(format!("{} has no worth", stack.clone().with_quantity(1)));
                }
            }
            return Ok(());
        }
        if let Some(captures) = SHOW.captures(command) {
            return self.show(&captures[1], outcome);
        }
        match command {
            "compute" => {
                self.registry.compute()?;
                outcome.rows.push(format!("computed {} worths", self.registry.snapshot().len()));
                Ok(())
            }
            "save" => {
                self.registry.save()?;
                outcome.rows.push("saved".to_string());
                Ok(())
            }
            "load" => {
                self.registry.load()?;
                outcome.rows.push(format!("loaded {} worths", self.registry.snapshot().len()));
                Ok(())
            }
            _ => Err(ExchequerError::Parse {
                message: format!("unrecognized command: {}", command),
                command: Some(index + 1),
            }),
        }
    }

    fn declare(
        &self,
        index: usize,
        kind: &str,
        rest: &str,
        outcome: &mut ScriptOutcome,
    ) -> Result<()> {
        if kind == "category" {
            let captures = CATEGORY.captures(rest.trim()).ok_or_else(|| ExchequerError::Parse {
                message: format!("not a category declaration: {}", rest.trim()),
                command: Some(index + 1),
            })?;
            let name = captures[1].to_string();
            let members = match captures.get(2) {
                Some(members) => identifiers(index, members.as_str())?,
                None => Vec::new(),
            };
            self.directory.declare_category(&name, &members);
            outcome.rows.push(format!(
                "declared category {} ({} members)",
                name,
                self.directory.category_members(&name).len()
            ));
            return Ok(());
        }
        for identifier in identifiers(index, rest)? {
            let previously_known = match kind {
                "item" => self.directory.declare_item(&identifier),
                _ => self.directory.declare_fluid(&identifier),
            };
            if previously_known {
                outcome.rows.push(format!("declared {} {} (already known)", kind, identifier));
            } else {
                outcome.rows.push(format!("declared {} {}", kind, identifier));
            }
        }
        Ok(())
    }

    fn add(&self, index: usize, tier: Tier, rest: &str, outcome: &mut ScriptOutcome) -> Result<()> {
        let mut tuples = 0;
        for tuple in TUPLE.find_iter(rest) {
            let captures =
                TUPLE_PARTS.captures(tuple.as_str()).ok_or_else(|| ExchequerError::Parse {
                    message: format!("not a worth tuple: {}", tuple.as_str()),
                    command: Some(index + 1),
                })?;
            let stack: Stack = captures[1].parse().map_err(|e| at(e, index))?;
            let scalar: f64 = captures[2].parse().map_err(|e| ExchequerError::Parse {
                message: format!("not a worth: {}", e),
                command: Some(index + 1),
            })?;
            let worth = Worth::new(scalar)?;
            self.registry.register(&stack, worth, tier, false)?;
            outcome.rows.push(format!("added {} [{}, {}]", tier, stack, worth));
            tuples += 1;
        }
        if tuples == 0 {
            return Err(ExchequerError::Parse {
                message: format!("expected [stack, worth] tuples: {}", rest),
                command: Some(index + 1),
            });
        }
        Ok(())
    }

    fn show(&self, which: &str, outcome: &mut ScriptOutcome) -> Result<()> {
        match which {
            "snapshot" => {
                for (key, worth) in self.registry.snapshot().iter() {
                    outcome.rows.push(format!("{} = {}", key, worth));
                }
            }
            _ => {
                let keeper = if which == "pre" {
                    self.registry.pre_keeper()
                } else {
                    self.registry.post_keeper()
                };
                let keeper = keeper.lock().map_err(|e| ExchequerError::Lock(e.to_string()))?;
                for (key, worth) in keeper.iter() {
                    outcome.rows.push(format!("{} = {}", key, worth));
                }
            }
        }
        Ok(())
    }
}

// strips comments and collapses whitespace so commands parse line-agnostic
fn strip(script: &str) -> String {
    let mut stripped = String::new();
    let mut in_comment = false;
    let mut previous = ' ';
    for c in script.chars() {
        if c == '#' {
            in_comment = true;
        } else if c == '\n' || c == '\r' {
            in_comment = false;
        }
        if in_comment {
            continue;
        }
        let c = if c.is_whitespace() { ' ' } else { c };
        if c == ' ' && previous == ' ' {
            continue;
        }
        stripped.push(c);
        previous = c;
    }
    stripped
}

fn identifiers(index: usize, list: &str) -> Result<Vec<String>> {
    let mut identifiers = Vec::new();
    for identifier in list.split(',').map(str::trim) {
        if !IDENTIFIER.is_match(identifier) {
            return Err(ExchequerError::Parse {
                message: format!("not an identifier: {}", identifier),
                command: Some(index + 1),
            });
        }
        identifiers.push(identifier.to_string());
    }
    Ok(identifiers)
}

fn at(error: ExchequerError, index: usize) -> ExchequerError {
    match error {
        ExchequerError::Parse { message, .. } => {
            ExchequerError::Parse { message, command: Some(index + 1) }
        }
        other => other,
    }
}
