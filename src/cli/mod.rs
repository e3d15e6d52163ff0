//! CLI definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format for list/query commands.
#[derive(ValueEnum, Clone, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable table (default)
    #[default]
    Table,
    /// JSON (same as --json)
    Json,
    /// Comma-separated values
    Csv,
}

pub mod commands;

/// Venturer - ventures, projects and STEP-prioritized work
#[derive(Parser, Debug)]
#[command(name = "vt", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Database path (default: ~/.venturer/data/venturer.db)
    #[arg(long, global = true, env = "VT_DB")]
    pub db: Option<PathBuf>,

    /// Actor name for the audit trail
    #[arg(long, global = true, env = "VT_ACTOR")]
    pub actor: Option<String>,

    /// Act as this user (email)
    #[arg(long, global = true, env = "VT_USER")]
    pub user: Option<String>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Output format (table, json, csv)
    #[arg(long, value_enum, global = true, default_value_t)]
    pub format: OutputFormat,

    /// Output only the ID (for scripting)
    #[arg(long, global = true)]
    pub silent: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the database
    Init {
        /// Recreate an existing database
        #[arg(long)]
        force: bool,

        /// Register this email as the first (admin) user
        #[arg(long)]
        admin: Option<String>,
    },

    /// Print version information
    Version,

    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Show or change settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Venture management
    Venture {
        #[command(subcommand)]
        command: VentureCommands,
    },

    /// Project management
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },

    /// Milestone management
    Milestone {
        #[command(subcommand)]
        command: MilestoneCommands,
    },

    /// Workstream management
    Workstream {
        #[command(subcommand)]
        command: WorkstreamCommands,
    },

    /// Tasks, notes and ideas
    Item {
        #[command(subcommand)]
        command: ItemCommands,
    },

    /// Links between tasks, milestones and workstreams
    #[command(alias = "association")]
    Assoc {
        #[command(subcommand)]
        command: AssocCommands,
    },

    /// Team management
    Team {
        #[command(subcommand)]
        command: TeamCommands,
    },

    /// Project templates
    Template {
        #[command(subcommand)]
        command: TemplateCommands,
    },

    /// Aggregate item statistics
    Report(ReportArgs),

    /// Users, session tokens and plans
    User {
        #[command(subcommand)]
        command: UserCommands,
    },

    /// Run the HTTP server hosting /analyzeTask
    Serve {
        /// Address to bind (default: 127.0.0.1:8787)
        #[arg(long, env = "VT_BIND")]
        bind: Option<String>,
    },

    /// Show the audit trail of a record
    History {
        /// Record kind (venture, project, milestone, workstream, item, association, team, template, user)
        entity_type: String,

        /// Record ID
        id: String,

        /// Maximum events to show
        #[arg(short, long, default_value = "50")]
        limit: u32,
    },
}

/// Supported shells for completions.
#[derive(ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    #[value(name = "powershell")]
    PowerShell,
    Elvish,
}

// ============================================================================
// Config
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show effective settings (API key masked)
    Show,

    /// Set a key (empty value clears it)
    Set {
        /// Dotted key, e.g. llm.model
        key: String,
        value: String,
    },

    /// Delete the settings file
    Reset,
}

// ============================================================================
// Ventures / Projects / Milestones / Workstreams
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum VentureCommands {
    /// Create a venture owned by the current user
    Create {
        name: String,
        #[arg(short, long)]
        description: Option<String>,
        /// Team collaborating on the venture
        #[arg(long)]
        team: Option<String>,
        /// Display color (hex)
        #[arg(long)]
        color: Option<String>,
    },

    /// List ventures visible to the current user
    List {
        /// Filter by status (active, paused, archived)
        #[arg(short, long)]
        status: Option<String>,
        /// Include every venture, not just the current user's
        #[arg(long)]
        all: bool,
    },

    /// Show one venture with its projects
    Show { id: String },

    /// Update a venture
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(short, long)]
        status: Option<String>,
        #[arg(long)]
        team: Option<String>,
        #[arg(long)]
        color: Option<String>,
    },

    /// Delete a venture and everything under it
    Delete { id: String },
}

#[derive(Subcommand, Debug)]
pub enum ProjectCommands {
    /// Create a project in a venture
    Create {
        name: String,
        #[arg(long)]
        venture: String,
        #[arg(short, long)]
        description: Option<String>,
        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        start: Option<String>,
        /// Target date (YYYY-MM-DD)
        #[arg(long)]
        target: Option<String>,
    },

    /// List projects
    List {
        #[arg(long)]
        venture: Option<String>,
    },

    /// Show one project with milestones and workstreams
    Show { id: String },

    /// Update a project
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        /// planning, active, on_hold, completed, archived
        #[arg(short, long)]
        status: Option<String>,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        target: Option<String>,
    },

    /// Delete a project and everything under it
    Delete { id: String },
}

#[derive(Subcommand, Debug)]
pub enum MilestoneCommands {
    /// Add a milestone to a project
    Create {
        title: String,
        #[arg(long)]
        project: String,
        #[arg(short, long)]
        description: Option<String>,
        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<String>,
        /// Position within the project (default: last)
        #[arg(long)]
        position: Option<i64>,
    },

    /// List a project's milestones in order
    List {
        #[arg(long)]
        project: String,
    },

    /// Show one milestone
    Show { id: String },

    /// Update a milestone
    Update {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(long)]
        due: Option<String>,
        /// pending, in_progress, completed
        #[arg(short, long)]
        status: Option<String>,
        #[arg(long)]
        position: Option<i64>,
    },

    /// Delete a milestone
    Delete { id: String },
}

#[derive(Subcommand, Debug)]
pub enum WorkstreamCommands {
    /// Add a workstream to a project
    Create {
        name: String,
        #[arg(long)]
        project: String,
        #[arg(short, long)]
        description: Option<String>,
        /// Email of the lead
        #[arg(long)]
        lead: Option<String>,
    },

    /// List a project's workstreams
    List {
        #[arg(long)]
        project: String,
    },

    /// Show one workstream
    Show { id: String },

    /// Update a workstream
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(long)]
        lead: Option<String>,
        /// active, paused, completed
        #[arg(short, long)]
        status: Option<String>,
    },

    /// Delete a workstream
    Delete { id: String },
}

// ============================================================================
// Items
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum ItemCommands {
    /// Create an item
    Create(ItemCreateArgs),

    /// List items with STEP filters
    List(ItemListArgs),

    /// Show one item with its subtasks and links
    Show { id: String },

    /// Update an item
    Update(ItemUpdateArgs),

    /// Mark items completed
    Complete {
        #[arg(required = true, num_args = 1..)]
        ids: Vec<String>,
    },

    /// Delete items (subtasks go with them)
    Delete {
        #[arg(required = true, num_args = 1..)]
        ids: Vec<String>,
    },

    /// Bulk create items from a JSONL file
    Import {
        file: PathBuf,
        /// Venture for lines that don't name one
        #[arg(long)]
        venture: Option<String>,
        /// Project for lines that don't name one
        #[arg(long)]
        project: Option<String>,
    },

    /// Ask the configured model who should take an item
    Suggest {
        id: String,
        /// Fields to apply: assignee, priority, sextant, subtasks (comma-separated)
        #[arg(long, value_delimiter = ',')]
        apply: Vec<String>,
    },
}

#[derive(Args, Debug, Default)]
pub struct StepArgs {
    /// Sextant 1-6 (also S1..S6)
    #[arg(short = 'S', long)]
    pub sextant: Option<String>,
    /// Time 1-3 or short/medium/long
    #[arg(short = 'T', long)]
    pub time: Option<String>,
    /// Effort 1-3 or low/medium/high
    #[arg(short = 'E', long)]
    pub effort: Option<String>,
    /// Priority 1-3 or low/medium/high
    #[arg(short = 'P', long)]
    pub priority: Option<String>,
}

#[derive(Args, Debug)]
pub struct ItemCreateArgs {
    pub title: String,

    #[arg(short, long)]
    pub description: Option<String>,

    /// task, note or idea
    #[arg(short = 't', long = "type", default_value = "task")]
    pub item_type: String,

    #[arg(long)]
    pub venture: Option<String>,

    #[arg(long)]
    pub project: Option<String>,

    #[arg(long)]
    pub milestone: Option<String>,

    #[arg(long)]
    pub workstream: Option<String>,

    /// Parent item (makes this a subtask)
    #[arg(long)]
    pub parent: Option<String>,

    /// Assignee email
    #[arg(short, long)]
    pub assign: Option<String>,

    /// Due date (YYYY-MM-DD)
    #[arg(long)]
    pub due: Option<String>,

    #[command(flatten)]
    pub step: StepArgs,
}

#[derive(Args, Debug)]
pub struct ItemListArgs {
    #[arg(long)]
    pub venture: Option<String>,

    #[arg(long)]
    pub project: Option<String>,

    #[arg(long)]
    pub milestone: Option<String>,

    #[arg(long)]
    pub workstream: Option<String>,

    /// task, note or idea
    #[arg(short = 't', long = "type")]
    pub item_type: Option<String>,

    /// Filter by status
    #[arg(short, long)]
    pub status: Option<String>,

    /// Filter by assignee email ("me" for the current user)
    #[arg(short, long)]
    pub assignee: Option<String>,

    /// Sextant values to include (comma-separated)
    #[arg(short = 'S', long, value_delimiter = ',')]
    pub sextant: Vec<String>,

    /// Time values to include
    #[arg(short = 'T', long, value_delimiter = ',')]
    pub time: Vec<String>,

    /// Effort values to include
    #[arg(short = 'E', long, value_delimiter = ',')]
    pub effort: Vec<String>,

    /// Priority values to include
    #[arg(short = 'P', long, value_delimiter = ',')]
    pub priority: Vec<String>,

    /// Text to find in title or description
    #[arg(long)]
    pub search: Option<String>,

    /// Only top-level items
    #[arg(long)]
    pub roots: bool,

    /// Maximum items to show
    #[arg(short, long, default_value = "100")]
    pub limit: usize,
}

#[derive(Args, Debug)]
pub struct ItemUpdateArgs {
    pub id: String,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(short, long)]
    pub description: Option<String>,

    #[arg(short = 't', long = "type")]
    pub item_type: Option<String>,

    #[arg(short, long)]
    pub status: Option<String>,

    #[arg(long)]
    pub project: Option<String>,

    #[arg(long)]
    pub milestone: Option<String>,

    #[arg(long)]
    pub workstream: Option<String>,

    /// Assignee email (empty string unassigns)
    #[arg(short, long)]
    pub assign: Option<String>,

    #[arg(long)]
    pub due: Option<String>,

    #[command(flatten)]
    pub step: StepArgs,
}

// ============================================================================
// Associations
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum AssocCommands {
    /// Link two entities: `vt assoc add task:A blocks task:B`
    Add {
        /// Source entity (kind:id, or an item_/ms_/ws_ ID)
        from: String,
        /// blocks, blocked_by, depends_on, aids, aided_by, relates_to, parent_of, child_of
        relationship: String,
        /// Target entity
        to: String,
        #[arg(long)]
        note: Option<String>,
    },

    /// Show an entity's outgoing and incoming links
    List { entity: String },

    /// Remove a link
    Remove { id: String },
}

// ============================================================================
// Teams
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum TeamCommands {
    /// Create a team led by the current user
    Create {
        name: String,
        #[arg(short, long)]
        description: Option<String>,
    },

    /// List teams the current user belongs to
    List {
        /// Every team
        #[arg(long)]
        all: bool,
    },

    /// Show a team and its members
    Show { id: String },

    /// Delete a team
    Delete { id: String },

    /// Add a member
    AddMember {
        team: String,
        email: String,
        /// lead, member or viewer
        #[arg(short, long, default_value = "member")]
        role: String,
        /// Display name
        #[arg(long)]
        name: Option<String>,
    },

    /// Remove a member
    RemoveMember { team: String, email: String },

    /// Change a member's role
    SetRole {
        team: String,
        email: String,
        role: String,
    },

    /// Estimated weekly load of each member
    Capacity { team: String },
}

// ============================================================================
// Templates
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum TemplateCommands {
    /// Snapshot a project into a template
    Create {
        /// Project to snapshot
        #[arg(long)]
        project: String,
        /// Template name
        name: String,
        #[arg(long)]
        category: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
    },

    /// List templates
    List {
        #[arg(long)]
        category: Option<String>,
    },

    /// Show a template's milestones and tasks
    Show { id: String },

    /// Create a project from a template
    Apply {
        id: String,
        #[arg(long)]
        venture: String,
        /// Name of the new project
        #[arg(long)]
        name: String,
        /// Start date; milestone due dates are offset from it
        #[arg(long)]
        start: Option<String>,
    },

    /// Write a template to a JSON file
    Export {
        id: String,
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Read a template from a JSON file
    Import { file: PathBuf },

    /// Delete a template
    Delete { id: String },
}

// ============================================================================
// Reports
// ============================================================================

#[derive(Args, Debug)]
pub struct ReportArgs {
    /// Limit to one venture
    #[arg(long, conflicts_with = "project")]
    pub venture: Option<String>,

    /// Limit to one project
    #[arg(long)]
    pub project: Option<String>,

    /// Write to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

// ============================================================================
// Users
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum UserCommands {
    /// Show the current user
    Me,

    /// List users
    List,

    /// Register an active user
    Add {
        email: String,
        #[arg(long)]
        name: Option<String>,
        /// admin or user
        #[arg(short, long, default_value = "user")]
        role: String,
    },

    /// Record an invitation (no email is sent)
    Invite {
        email: String,
        /// admin or user
        #[arg(short, long, default_value = "user")]
        role: String,
    },

    /// Issue a session token for the HTTP server
    Token { email: String },

    /// Show or change a user's plan
    Plan {
        email: String,
        /// free, pro or team
        #[arg(long)]
        set: Option<String>,
        /// active, trialing or canceled
        #[arg(long, default_value = "active")]
        status: String,
    },
}
