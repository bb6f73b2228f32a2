//! These structs provide the CLI interface for the bommel CLI.

use crate::model::NodeId;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;

/// bommel: A command-line tool for an organization's budget hierarchy.
///
/// An organization's money is booked onto Bommels, budget nodes arranged in a tree under one
/// root Bommel. This program pulls the tree from the backend into a local working copy, lets you
/// add, rename, move and delete Bommels, shows income and expenses rolled up through the tree,
/// and pushes your edits back.
///
/// Set BOMMEL_IN_TEST_MODE to a non-empty value to run against a seeded in-memory backend
/// instead of the ledger in the bommel home directory.
#[derive(Debug, Parser, Clone)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn new(common: Common, command: Command) -> Self {
        Self { common, command }
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the data directory and the configuration file.
    ///
    /// This is the first command you should run. Decide what directory you want to store data in
    /// and pass this as --bommel-home. By default, it will be $HOME/bommel.
    Init(InitArgs),
    /// Replace the working tree with the backend's current tree.
    ///
    /// Local edits that have not been pushed are discarded.
    Pull,
    /// Print the working tree with each Bommel's statistics.
    Show(ShowArgs),
    /// Add a Bommel to the working tree.
    Add(AddArgs),
    /// Rename a Bommel, or change its emoji.
    Rename(RenameArgs),
    /// Delete a Bommel from the working tree.
    Delete(DeleteArgs),
    /// Move a Bommel under a new parent.
    Move(MoveArgs),
    /// List the changes that `push` would send.
    Status,
    /// Send the working tree's changes to the backend.
    Push,
    /// Print statistics for the organization or for one Bommel.
    Stats(StatsArgs),
    /// Book an amount on a Bommel. Negative amounts are expenses.
    Book(BookArgs),
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where bommel data and configuration is held. Defaults to ~/bommel
    #[arg(long, env = "BOMMEL_HOME", default_value_t = default_bommel_home())]
    bommel_home: DisplayPath,
}

impl Common {
    pub fn new(log_level: LevelFilter, bommel_home: PathBuf) -> Self {
        Self {
            log_level,
            bommel_home: bommel_home.into(),
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn bommel_home(&self) -> &DisplayPath {
        &self.bommel_home
    }
}

/// (Not shown): Args for the `bommel init` command.
#[derive(Debug, Parser, Clone)]
pub struct InitArgs {
    /// The backend id of your organization.
    #[arg(long)]
    organization_id: i64,

    /// The name of your organization. The root Bommel gets this name if the backend does not
    /// have one yet.
    #[arg(long)]
    organization_name: Option<String>,

    /// The currency symbol printed after amounts. Defaults to €.
    #[arg(long)]
    currency: Option<String>,
}

impl InitArgs {
    pub fn new(
        organization_id: i64,
        organization_name: Option<String>,
        currency: Option<String>,
    ) -> Self {
        Self {
            organization_id,
            organization_name,
            currency,
        }
    }

    pub fn organization_id(&self) -> i64 {
        self.organization_id
    }

    pub fn organization_name(&self) -> Option<&str> {
        self.organization_name.as_deref()
    }

    pub fn currency(&self) -> Option<&str> {
        self.currency.as_deref()
    }
}

/// Whether statistics include draft transactions and descendants.
#[derive(Debug, Default, Parser, Clone, Copy)]
pub struct StatisticsArgs {
    /// Roll each Bommel's statistics up over all of its descendants.
    #[arg(long)]
    aggregate: bool,

    /// Count draft transactions. Also enabled by `include_drafts` in config.json.
    #[arg(long)]
    include_drafts: bool,
}

impl StatisticsArgs {
    pub fn new(aggregate: bool, include_drafts: bool) -> Self {
        Self {
            aggregate,
            include_drafts,
        }
    }

    pub fn aggregate(&self) -> bool {
        self.aggregate
    }

    pub fn include_drafts(&self) -> bool {
        self.include_drafts
    }
}

/// (Not shown): Args for the `bommel show` command.
#[derive(Debug, Default, Parser, Clone)]
pub struct ShowArgs {
    #[clap(flatten)]
    statistics: StatisticsArgs,
}

impl ShowArgs {
    pub fn new(statistics: StatisticsArgs) -> Self {
        Self { statistics }
    }

    pub fn statistics(&self) -> StatisticsArgs {
        self.statistics
    }
}

/// (Not shown): Args for the `bommel add` command.
#[derive(Debug, Parser, Clone)]
pub struct AddArgs {
    /// The id of the parent Bommel. Use the root's id, or 0, for the top level.
    parent: NodeId,

    /// The name of the new Bommel.
    label: String,

    /// An emoji shown in front of the name.
    #[arg(long)]
    emoji: Option<String>,
}

impl AddArgs {
    pub fn new(parent: NodeId, label: impl Into<String>, emoji: Option<String>) -> Self {
        Self {
            parent,
            label: label.into(),
            emoji,
        }
    }

    pub fn parent(&self) -> NodeId {
        self.parent
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn emoji(&self) -> Option<&str> {
        self.emoji.as_deref()
    }
}

/// (Not shown): Args for the `bommel rename` command.
#[derive(Debug, Parser, Clone)]
pub struct RenameArgs {
    /// The id of the Bommel to rename.
    id: NodeId,

    /// The new name. Leave it out to only change the emoji.
    label: Option<String>,

    /// The new emoji. An empty string removes it.
    #[arg(long)]
    emoji: Option<String>,
}

impl RenameArgs {
    pub fn new(id: NodeId, label: Option<String>, emoji: Option<String>) -> Self {
        Self { id, label, emoji }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn emoji(&self) -> Option<&str> {
        self.emoji.as_deref()
    }
}

/// (Not shown): Args for the `bommel delete` command.
#[derive(Debug, Parser, Clone)]
pub struct DeleteArgs {
    /// The id of the Bommel to delete.
    id: NodeId,

    /// Also delete everything beneath the Bommel. Without this, a Bommel with children cannot be
    /// deleted.
    #[arg(long)]
    recursive: bool,
}

impl DeleteArgs {
    pub fn new(id: NodeId, recursive: bool) -> Self {
        Self { id, recursive }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn recursive(&self) -> bool {
        self.recursive
    }
}

/// (Not shown): Args for the `bommel move` command.
#[derive(Debug, Parser, Clone)]
pub struct MoveArgs {
    /// The id of the Bommel to move.
    id: NodeId,

    /// The id of the new parent. Use the root's id, or 0, for the top level.
    target: NodeId,
}

impl MoveArgs {
    pub fn new(id: NodeId, target: NodeId) -> Self {
        Self { id, target }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn target(&self) -> NodeId {
        self.target
    }
}

/// (Not shown): Args for the `bommel stats` command.
#[derive(Debug, Default, Parser, Clone)]
pub struct StatsArgs {
    /// Show one Bommel instead of the whole organization.
    #[arg(long)]
    bommel: Option<NodeId>,

    #[clap(flatten)]
    statistics: StatisticsArgs,
}

impl StatsArgs {
    pub fn new(bommel: Option<NodeId>, statistics: StatisticsArgs) -> Self {
        Self { bommel, statistics }
    }

    pub fn bommel(&self) -> Option<NodeId> {
        self.bommel
    }

    pub fn statistics(&self) -> StatisticsArgs {
        self.statistics
    }
}

/// (Not shown): Args for the `bommel book` command.
#[derive(Debug, Parser, Clone)]
pub struct BookArgs {
    /// The id of the Bommel to book on. It must exist on the backend, so push new Bommels first.
    bommel: NodeId,

    /// The amount, e.g. 12.50 or -80. Negative amounts are expenses.
    #[arg(allow_hyphen_values = true)]
    amount: Decimal,

    /// Book the amount as a draft.
    #[arg(long)]
    draft: bool,
}

impl BookArgs {
    pub fn new(bommel: NodeId, amount: Decimal, draft: bool) -> Self {
        Self {
            bommel,
            amount,
            draft,
        }
    }

    pub fn bommel(&self) -> NodeId {
        self.bommel
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn draft(&self) -> bool {
        self.draft
    }
}

fn default_bommel_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join("bommel"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --bommel-home or BOMMEL_HOME instead of relying on the default \
                bommel home directory. If you continue using the program right now, you may have \
                problems!",
            );
            PathBuf::from("bommel")
        }
    })
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn path(&self) -> &Path {
        &self.0
    }
}
