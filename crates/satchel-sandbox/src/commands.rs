//! Line-oriented command scripts.
//!
//! Stands in for the input layer: each line names one player action, e.g.
//! `add Potion 3`, `bind 0 up` or `quick up`. Blank lines and lines starting
//! with `#` are ignored.

use anyhow::{anyhow, Result};
use thiserror::Error;
use tracing::{info, warn};

use satchel_common::ItemTypeId;
use satchel_core::{Direction, EquipSocket, ItemRequirement};

use crate::session::GameSession;

/// Errors raised while parsing a command line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Command word not recognized
    #[error("unknown command '{0}'")]
    UnknownCommand(String),
    /// Missing argument
    #[error("'{command}' expects {expected}")]
    MissingArgument {
        /// Command word
        command: String,
        /// Argument description
        expected: &'static str,
    },
    /// Argument not a number
    #[error("'{0}' is not a number")]
    InvalidNumber(String),
    /// Argument not a direction
    #[error("'{0}' is not a direction (up, down, left, right)")]
    InvalidDirection(String),
    /// Argument not a socket
    #[error("'{0}' is not a socket (amulet, ring, cape)")]
    InvalidSocket(String),
}

/// One player action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Add units of an item
    Add {
        /// Catalog name
        item: String,
        /// Units
        count: usize,
    },
    /// Pick up units from the world
    Collect {
        /// Catalog name
        item: String,
        /// Units
        count: usize,
    },
    /// Remove units of an item
    Remove {
        /// Catalog name
        item: String,
        /// Units
        count: usize,
    },
    /// Consume the item in a slot
    Use(usize),
    /// Throw away the item in a slot
    Discard(usize),
    /// Exchange two slots
    Swap(usize, usize),
    /// Equip the first held instance of an item
    Equip(String),
    /// Equip the instance in a slot
    EquipSlot(usize),
    /// Unequip a socket
    Unequip(EquipSocket),
    /// Bind the instance in a slot to a direction
    Bind(usize, Direction),
    /// Bind the first unbound instance of an item to a direction
    BindItem(String, Direction),
    /// Clear a direction
    Unbind(Direction),
    /// Use a quick slot
    Quick(Direction),
    /// Clear stale quick slots
    Reconcile,
    /// Damage the player
    Hurt(u32),
    /// Force quest protection on an item
    Protect(String),
    /// Lift quest protection from an item
    Unprotect(String),
    /// Turn in items for a quest
    TurnIn(Vec<(String, usize)>),
    /// Save to a slot
    Save(Option<String>),
    /// Load from a slot
    Load(Option<String>),
    /// Print the inventory
    Show,
}

fn number<T: std::str::FromStr>(arg: &str) -> Result<T, ParseError> {
    arg.parse()
        .map_err(|_| ParseError::InvalidNumber(arg.to_string()))
}

fn direction(arg: &str) -> Result<Direction, ParseError> {
    Direction::parse(&arg.to_ascii_lowercase())
        .ok_or_else(|| ParseError::InvalidDirection(arg.to_string()))
}

fn socket(arg: &str) -> Result<EquipSocket, ParseError> {
    EquipSocket::parse(&arg.to_ascii_lowercase())
        .ok_or_else(|| ParseError::InvalidSocket(arg.to_string()))
}

impl Command {
    /// Parses one line. Returns `Ok(None)` for blank lines and comments.
    pub fn parse(line: &str) -> Result<Option<Self>, ParseError> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }

        let mut words = line.split_whitespace();
        let name = words.next().unwrap_or_default().to_ascii_lowercase();
        let args: Vec<&str> = words.collect();
        let arg = |index: usize, expected: &'static str| {
            args.get(index).copied().ok_or_else(|| ParseError::MissingArgument {
                command: name.clone(),
                expected,
            })
        };
        let count_arg = |index: usize| args.get(index).map_or(Ok(1), |s| number(s));

        let command = match name.as_str() {
            "add" => Self::Add {
                item: arg(0, "an item name")?.to_string(),
                count: count_arg(1)?,
            },
            "collect" => Self::Collect {
                item: arg(0, "an item name")?.to_string(),
                count: count_arg(1)?,
            },
            "remove" => Self::Remove {
                item: arg(0, "an item name")?.to_string(),
                count: count_arg(1)?,
            },
            "use" => Self::Use(number(arg(0, "a slot index")?)?),
            "discard" => Self::Discard(number(arg(0, "a slot index")?)?),
            "swap" => Self::Swap(
                number(arg(0, "two slot indices")?)?,
                number(arg(1, "two slot indices")?)?,
            ),
            "equip" => Self::Equip(arg(0, "an item name")?.to_string()),
            "equip-slot" => Self::EquipSlot(number(arg(0, "a slot index")?)?),
            "unequip" => Self::Unequip(socket(arg(0, "a socket")?)?),
            "bind" => Self::Bind(
                number(arg(0, "a slot index and a direction")?)?,
                direction(arg(1, "a slot index and a direction")?)?,
            ),
            "bind-item" => Self::BindItem(
                arg(0, "an item name and a direction")?.to_string(),
                direction(arg(1, "an item name and a direction")?)?,
            ),
            "unbind" => Self::Unbind(direction(arg(0, "a direction")?)?),
            "quick" => Self::Quick(direction(arg(0, "a direction")?)?),
            "reconcile" => Self::Reconcile,
            "hurt" => Self::Hurt(number(arg(0, "an amount")?)?),
            "protect" => Self::Protect(arg(0, "an item name")?.to_string()),
            "unprotect" => Self::Unprotect(arg(0, "an item name")?.to_string()),
            "turn-in" => {
                arg(0, "item name and count pairs")?;
                let mut pairs = Vec::new();
                for pair in args.chunks(2) {
                    let count = pair.get(1).map_or(Ok(1), |s| number(s))?;
                    pairs.push((pair[0].to_string(), count));
                }
                Self::TurnIn(pairs)
            },
            "save" => Self::Save(args.first().map(ToString::to_string)),
            "load" => Self::Load(args.first().map(ToString::to_string)),
            "show" => Self::Show,
            _ => return Err(ParseError::UnknownCommand(name.clone())),
        };
        Ok(Some(command))
    }
}

fn item_id(session: &GameSession, name: &str) -> Result<ItemTypeId> {
    session
        .inventory()
        .catalog()
        .by_name(name)
        .map(|item| item.id)
        .ok_or_else(|| anyhow!("no item named '{name}' in the catalog"))
}

/// Applies a command to the session. Returns a one-line (or, for `show`,
/// multi-line) description of what happened.
pub fn execute(session: &mut GameSession, command: &Command) -> Result<String> {
    let message = match command {
        Command::Add { item, count } => {
            let id = item_id(session, item)?;
            let placed = session.inventory_mut().add_item(id, *count);
            format!("added {placed}/{count} {item}")
        },
        Command::Collect { item, count } => {
            let id = item_id(session, item)?;
            let outcome = session.inventory_mut().collect(id, *count);
            format!(
                "picked up {} {item}, left {} behind",
                outcome.placed, outcome.left_behind
            )
        },
        Command::Remove { item, count } => {
            let id = item_id(session, item)?;
            if session.inventory_mut().remove_item(id, *count) {
                format!("removed {count} {item}")
            } else {
                format!("removed fewer than {count} {item}")
            }
        },
        Command::Use(slot) => {
            session.inventory_mut().use_item(*slot)?;
            format!("used slot {slot}")
        },
        Command::Discard(slot) => {
            let mut discarded = String::new();
            session
                .inventory_mut()
                .discard_item(*slot, |item| discarded = item.label().to_string())?;
            format!("discarded {discarded}")
        },
        Command::Swap(a, b) => {
            session.inventory_mut().swap_slots(*a, *b)?;
            format!("swapped slots {a} and {b}")
        },
        Command::Equip(item) => {
            let id = item_id(session, item)?;
            let socket = session.inventory_mut().equip_item(id)?;
            format!("equipped {item} in {socket}")
        },
        Command::EquipSlot(slot) => {
            let socket = session.inventory_mut().equip_slot(*slot)?;
            format!("equipped slot {slot} in {socket}")
        },
        Command::Unequip(socket) => {
            session.inventory_mut().unequip_item(*socket)?;
            format!("unequipped {socket}")
        },
        Command::Bind(slot, dir) => {
            let instance = session
                .inventory()
                .store()
                .checked_slot(*slot)?
                .instance();
            session.inventory_mut().assign_quick_slot(instance, *dir)?;
            format!("bound slot {slot} to {dir}")
        },
        Command::BindItem(item, dir) => {
            let id = item_id(session, item)?;
            let instance = session.inventory_mut().assign_quick_slot_item(id, *dir)?;
            format!("bound {item} #{instance} to {dir}")
        },
        Command::Unbind(dir) => {
            if session.inventory_mut().clear_quick_slot(*dir) {
                format!("cleared {dir}")
            } else {
                format!("{dir} was not bound")
            }
        },
        Command::Quick(dir) => {
            session.inventory_mut().use_quick_slot(*dir)?;
            format!("used quick slot {dir}")
        },
        Command::Reconcile => {
            let cleared = session.inventory_mut().reconcile_quick_slots();
            format!("cleared {} stale quick slot(s)", cleared.len())
        },
        Command::Hurt(amount) => {
            session.player().borrow_mut().damage(*amount);
            format!("took {amount} damage")
        },
        Command::Protect(item) => {
            let id = item_id(session, item)?;
            session.inventory_mut().protect_item(id);
            format!("{item} is now protected")
        },
        Command::Unprotect(item) => {
            let id = item_id(session, item)?;
            session.inventory_mut().lift_protection(id);
            format!("{item} is no longer protected")
        },
        Command::TurnIn(pairs) => {
            let requirements = pairs
                .iter()
                .map(|(item, count)| -> Result<ItemRequirement> {
                    Ok(ItemRequirement::new(item_id(session, item)?, *count))
                })
                .collect::<Result<Vec<_>>>()?;
            if session.inventory_mut().turn_in(&requirements) {
                "turn-in accepted".to_string()
            } else {
                "turn-in refused: not enough items".to_string()
            }
        },
        Command::Save(slot) => {
            session.save(slot.as_deref())?;
            "saved".to_string()
        },
        Command::Load(slot) => {
            let report = session.load(slot.as_deref())?;
            format!(
                "loaded {} item(s), {} equipped, {} skipped",
                report.restored_items,
                report.restored_equipment,
                report.skipped_items + report.skipped_equipment
            )
        },
        Command::Show => session.describe(),
    };
    Ok(message)
}

/// Outcome of a script run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScriptReport {
    /// Commands that succeeded
    pub executed: usize,
    /// Lines that failed to parse or were refused
    pub failed: usize,
}

/// Runs every line of a script. Failing lines are logged and skipped.
pub fn run_script(session: &mut GameSession, script: &str) -> ScriptReport {
    let mut report = ScriptReport::default();
    for (number, line) in script.lines().enumerate() {
        let command = match Command::parse(line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                warn!("line {}: {e}", number + 1);
                report.failed += 1;
                continue;
            },
        };

        match execute(session, &command) {
            Ok(message) => {
                info!("{message}");
                report.executed += 1;
            },
            Err(e) => {
                warn!("line {}: {e:#}", number + 1);
                report.failed += 1;
            },
        }
        session.poll_notifications();
    }
    report
}
